//! Error types for the core library.

use std::path::PathBuf;

use thiserror::Error;

use crate::provider::{MailboxError, ModelError};

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Mailbox provider call failed.
    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    /// Language model call failed.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// HTTP request failed outside a provider call.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A pending run is stored and must be applied or discarded first.
    #[error("Pending results exist; apply or discard them first")]
    PendingExists,

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Account nickname already in use.
    #[error("Account '{0}' already exists")]
    DuplicateAccount(String),

    /// Refused to remove the only configured account.
    #[error("Cannot remove last account")]
    LastAccount,

    /// User supplied value rejected.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Google client secrets file is absent.
    #[error("credentials.json not found at {}", .0.display())]
    CredentialsMissing(PathBuf),

    /// Credential storage error.
    #[error("Credential error: {0}")]
    Credential(#[from] crate::account::credentials::CredentialError),

    /// `OAuth2` flow failed.
    #[error("OAuth error: {0}")]
    OAuth(#[from] mailsift_oauth::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
