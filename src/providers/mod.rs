pub mod github;
pub mod trending;
