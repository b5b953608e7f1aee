use crate::core::domain::error::ValidationError;
use secrecy::{ExposeSecret, SecretString};

/// The secret half of an API token.
///
/// Never printed: `Debug` goes through `SecretString`, which redacts.
#[derive(Debug, Clone)]
pub struct ApiTokenSecret(SecretString);

impl ApiTokenSecret {
    /// Creates a new secret without validation.
    pub(crate) fn new_unchecked(secret: SecretString) -> Self {
        Self(secret)
    }

    /// Exposes the secret for header construction.
    pub(crate) fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// Validates a token secret.
pub(crate) fn validate_token_secret(secret: &str) -> Result<(), ValidationError> {
    if secret.trim().is_empty() {
        return Err(ValidationError::Field {
            field: "token_secret".to_string(),
            message: "Token secret cannot be empty".to_string(),
        });
    }
    if secret.len() > 128 {
        return Err(ValidationError::Format(
            "Token secret cannot exceed 128 characters".to_string(),
        ));
    }
    if secret.chars().any(|c| c.is_whitespace() || c == '=') {
        return Err(ValidationError::Format(
            "Token secret cannot contain whitespace or '='".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_token_secret() {
        assert!(validate_token_secret("5f2c1e0a-8d7b-4b5e-9a43-0c1d2e3f4a5b").is_ok());
        assert!(validate_token_secret("").is_err());
        assert!(validate_token_secret("   ").is_err());
        assert!(validate_token_secret("abc def").is_err());
        assert!(validate_token_secret("abc=def").is_err());
        assert!(validate_token_secret(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_debug_does_not_leak() {
        let secret = ApiTokenSecret::new_unchecked(SecretString::from("hunter2-token"));
        assert!(!format!("{:?}", secret).contains("hunter2"));
        assert_eq!(secret.expose(), "hunter2-token");
    }
}
