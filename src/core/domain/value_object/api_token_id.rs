use crate::core::domain::error::ValidationError;

/// A validated API token identity in `USER@REALM!TOKENID` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiTokenId(String);

impl ApiTokenId {
    /// Creates a new token id without validation.
    pub(crate) fn new_unchecked(token_id: String) -> Self {
        Self(token_id)
    }

    /// Returns the token id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `USER@REALM` part.
    pub fn user(&self) -> &str {
        self.0.split('!').next().unwrap_or_default()
    }
}

/// Validates a token identity.
pub(crate) fn validate_token_id(token_id: &str) -> Result<(), ValidationError> {
    if token_id.is_empty() {
        return Err(ValidationError::Field {
            field: "token_id".to_string(),
            message: "Token id cannot be empty".to_string(),
        });
    }

    let Some((user_realm, token_name)) = token_id.split_once('!') else {
        return Err(ValidationError::Format(
            "Token id must be in format USER@REALM!TOKENID".to_string(),
        ));
    };

    let Some((user, realm)) = user_realm.rsplit_once('@') else {
        return Err(ValidationError::Format(
            "Token id must name a realm (USER@REALM!TOKENID)".to_string(),
        ));
    };

    if user.is_empty() || realm.is_empty() || token_name.is_empty() {
        return Err(ValidationError::Format(
            "User, realm and token name must all be non-empty".to_string(),
        ));
    }

    let allowed =
        |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' || c == '@';
    if !user.chars().all(allowed) || !realm.chars().all(allowed) {
        return Err(ValidationError::Format(
            "User and realm may only contain alphanumeric characters, -, _, ., @".to_string(),
        ));
    }

    if !token_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::Format(
            "Token name may only contain alphanumeric characters, - and _".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_token_id_valid() {
        assert!(validate_token_id("root@pam!homeassistant").is_ok());
        assert!(validate_token_id("monitor@pve!ha-sync_1").is_ok());
        assert!(validate_token_id("jane.doe@corp.example@ldap!t1").is_ok());
    }

    #[test]
    fn test_validate_token_id_invalid() {
        assert!(validate_token_id("").is_err());
        assert!(validate_token_id("root@pam").is_err()); // no token name
        assert!(validate_token_id("root!token").is_err()); // no realm
        assert!(validate_token_id("@pam!token").is_err());
        assert!(validate_token_id("root@pam!").is_err());
        assert!(validate_token_id("root@pam!to ken").is_err());
    }

    #[test]
    fn test_user_part() {
        let id = ApiTokenId::new_unchecked("root@pam!ha".to_string());
        assert_eq!(id.user(), "root@pam");
    }
}
