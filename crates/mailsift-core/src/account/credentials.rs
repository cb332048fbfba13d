//! Secure token storage using the system keyring.
//!
//! Each account's `OAuth2` token is stored as JSON under its nickname, using the
//! platform's native credential storage:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use keyring::Entry;
use mailsift_oauth::Token;
use tracing::{debug, warn};

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "mailsift";

/// Credential type identifier for `OAuth2` tokens.
const OAUTH_TOKEN_CREDENTIAL: &str = "oauth_token";

/// Error type for credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Failed to access keyring.
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// Stored token could not be (de)serialized.
    #[error("Stored token is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

/// Result type for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

/// Generates the keyring entry key for an account.
fn credential_key(nickname: &str) -> String {
    format!("{SERVICE_NAME}_{OAUTH_TOKEN_CREDENTIAL}_{nickname}")
}

fn entry(nickname: &str) -> CredentialResult<Entry> {
    Ok(Entry::new(SERVICE_NAME, &credential_key(nickname))?)
}

/// Stores an `OAuth2` token for an account.
///
/// # Errors
///
/// Returns an error if serialization or the keyring operation fails.
pub fn store_oauth_token(nickname: &str, token: &Token) -> CredentialResult<()> {
    let token_json = serde_json::to_string(token)?;
    entry(nickname)?.set_password(&token_json)?;
    debug!("Stored OAuth2 token for account {nickname}");
    Ok(())
}

/// Retrieves an account's `OAuth2` token.
///
/// # Errors
///
/// Returns an error if the keyring operation or deserialization fails.
pub fn get_oauth_token(nickname: &str) -> CredentialResult<Option<Token>> {
    match entry(nickname)?.get_password() {
        Ok(token_json) => Ok(Some(serde_json::from_str(&token_json)?)),
        Err(keyring::Error::NoEntry) => {
            debug!("No OAuth2 token found for account {nickname}");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Deletes an account's `OAuth2` token. Missing entries are not an error.
///
/// # Errors
///
/// Returns an error if the keyring operation fails.
pub fn delete_oauth_token(nickname: &str) -> CredentialResult<()> {
    match entry(nickname)?.delete_credential() {
        Ok(()) => {
            debug!("Deleted OAuth2 token for account {nickname}");
            Ok(())
        }
        Err(keyring::Error::NoEntry) => {
            debug!("No OAuth2 token to delete for account {nickname}");
            Ok(())
        }
        Err(e) => {
            warn!("Failed to delete OAuth2 token: {e}");
            Err(e.into())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    // These tests interact with the actual system keyring and are ignored by
    // default. Run manually with `cargo test -- --ignored`.

    use super::*;

    #[test]
    fn test_credential_key() {
        assert_eq!(credential_key("work"), "mailsift_oauth_token_work");
    }

    #[test]
    #[ignore = "Interacts with system keyring"]
    fn test_store_and_retrieve_token() {
        let nickname = "mailsift-test-account";
        let token = Token::bearer("ya29.test").with_refresh_token("1//refresh");

        store_oauth_token(nickname, &token).unwrap();
        assert_eq!(get_oauth_token(nickname).unwrap(), Some(token));

        delete_oauth_token(nickname).unwrap();
        assert_eq!(get_oauth_token(nickname).unwrap(), None);
    }

    #[test]
    #[ignore = "Interacts with system keyring"]
    fn test_delete_missing_token_is_ok() {
        delete_oauth_token("mailsift-never-stored").unwrap();
    }
}
