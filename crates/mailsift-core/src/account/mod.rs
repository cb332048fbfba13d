//! Account management module.
//!
//! Accounts are identified by a user-chosen nickname; their OAuth tokens live in
//! the system keyring.

pub mod credentials;
mod model;

pub use credentials::{CredentialError, CredentialResult};
pub use model::{Account, normalize_nickname};
