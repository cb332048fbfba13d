//! Account data model.

use serde::{Deserialize, Serialize};

/// A configured Gmail account, keyed by nickname in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Address reported by the Gmail profile at authorization time.
    pub email: String,
}

impl Account {
    /// Creates a new account entry.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

/// Normalizes a nickname: trimmed, lowercase, spaces replaced by `-`.
///
/// Returns `None` when nothing is left.
#[must_use]
pub fn normalize_nickname(raw: &str) -> Option<String> {
    let nickname = raw.trim().to_lowercase().replace(' ', "-");
    if nickname.is_empty() {
        None
    } else {
        Some(nickname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_nickname() {
        assert_eq!(normalize_nickname("  Work Mail "), Some("work-mail".to_string()));
        assert_eq!(normalize_nickname("personal"), Some("personal".to_string()));
        assert_eq!(normalize_nickname("   "), None);
        assert_eq!(normalize_nickname(""), None);
    }
}
