use std::fmt;

/// API token for the repository metadata service.
///
/// Debug output is redacted so the value never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_trims_whitespace() {
        let token = Token::from("  ghp_abc\n");
        assert_eq!(token.as_str(), "ghp_abc");
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = Token::from("ghp_secret");
        assert_eq!(format!("{token:?}"), "Token(***)");
    }
}
