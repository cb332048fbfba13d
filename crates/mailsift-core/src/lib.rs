//! # mailsift-core
//!
//! Core logic for the `mailsift` Gmail triage tool.
//!
//! This crate provides:
//! - Account nicknames and keyring-backed OAuth tokens
//! - Configuration and on-disk paths
//! - Gmail and Ollama providers behind the [`provider::Mailbox`] and
//!   [`provider::LanguageModel`] seams
//! - **Triage pipeline** - classification, summaries, review, apply, and the
//!   single-slot pending run

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
pub mod config;
mod error;
pub mod provider;
pub mod storage;
pub mod triage;

#[cfg(test)]
mod testing;

pub use account::credentials;
pub use account::{Account, CredentialError, CredentialResult, normalize_nickname};
pub use config::{Config, Paths};
pub use error::{Error, Result};
pub use provider::gmail::{GmailConnector, GmailMailbox};
pub use provider::ollama::OllamaClient;
pub use provider::{
    LabelHandle, LanguageModel, Mailbox, MailboxConnector, MailboxError, ModelError, ModelHandle,
};
pub use triage::{
    ApplyReport, Category, ClassificationResult, MessageRef, PendingRun, PendingStore,
    PolicyTable, ReviewItem, ReviewSession,
};
