//! Mailbox and language model seams.
//!
//! The triage pipeline only talks to these traits. [`gmail`] and [`ollama`]
//! hold the production implementations.

pub mod gmail;
pub mod ollama;
mod retry;

use std::sync::Arc;

use async_trait::async_trait;

use crate::account::credentials::CredentialError;
use crate::triage::MessageRef;

pub use retry::RetryPolicy;

/// Failure of a mailbox provider call.
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an error status.
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// Access was revoked or the token is no longer valid.
    #[error("Authorization expired or revoked")]
    AuthExpired,

    /// Token refresh failed.
    #[error("OAuth error: {0}")]
    OAuth(#[from] mailsift_oauth::Error),

    /// Keyring access failed.
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// No token stored for the account.
    #[error("No stored token for account '{0}'")]
    MissingToken(String),

    /// The account is not configured.
    #[error("Unknown account '{0}'")]
    UnknownAccount(String),

    /// Unexpected response shape.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Failure of a language model call.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Transport failure (connection refused, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The model server answered with an error status.
    #[error("Model server returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// Unexpected response shape.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Identifier of a mailbox label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelHandle {
    /// Provider label id.
    pub id: String,
    /// Label display name.
    pub name: String,
}

/// One account's mailbox.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Lists inbox messages carrying none of `exclude_labels`, newest first, at most `limit`.
    async fn list_candidate_messages(
        &self,
        exclude_labels: &[String],
        limit: usize,
    ) -> Result<Vec<MessageRef>, MailboxError>;

    /// Returns the label with this exact name, creating it if absent.
    async fn ensure_label(&self, name: &str) -> Result<LabelHandle, MailboxError>;

    /// Adds `label` to the message and, if `archive`, removes it from the inbox.
    async fn apply_label_and_archive(
        &self,
        message_id: &str,
        label: &LabelHandle,
        archive: bool,
    ) -> Result<(), MailboxError>;
}

#[async_trait]
impl<T: Mailbox + ?Sized> Mailbox for Arc<T> {
    async fn list_candidate_messages(
        &self,
        exclude_labels: &[String],
        limit: usize,
    ) -> Result<Vec<MessageRef>, MailboxError> {
        (**self).list_candidate_messages(exclude_labels, limit).await
    }

    async fn ensure_label(&self, name: &str) -> Result<LabelHandle, MailboxError> {
        (**self).ensure_label(name).await
    }

    async fn apply_label_and_archive(
        &self,
        message_id: &str,
        label: &LabelHandle,
        archive: bool,
    ) -> Result<(), MailboxError> {
        (**self).apply_label_and_archive(message_id, label, archive).await
    }
}

/// Opens the mailbox of a configured account by nickname.
#[async_trait]
pub trait MailboxConnector: Send + Sync {
    /// Opens the account's mailbox.
    async fn open(&self, account: &str) -> Result<Box<dyn Mailbox>, MailboxError>;
}

/// Single-turn, stateless text completion.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Sends `prompt` to `model` and returns the reply text.
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, ModelError>;
}

/// A model backend paired with the model name to use.
#[derive(Clone)]
pub struct ModelHandle {
    backend: Arc<dyn LanguageModel>,
    name: String,
}

impl ModelHandle {
    /// Creates a handle.
    #[must_use]
    pub fn new(backend: Arc<dyn LanguageModel>, name: impl Into<String>) -> Self {
        Self {
            backend,
            name: name.into(),
        }
    }

    /// Model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs one completion.
    ///
    /// # Errors
    ///
    /// Returns the backend's error.
    pub async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        self.backend.complete(&self.name, prompt).await
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
