//! Configuration directory and `config.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use mailsift_oauth::ClientSecrets;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::account::{Account, normalize_nickname};
use crate::provider::ollama::DEFAULT_OLLAMA_URL;
use crate::storage::write_atomic;
use crate::triage::{Category, PolicyTable};
use crate::{Error, Result};

/// Environment variable overriding the configuration directory.
pub const CONFIG_DIR_ENV: &str = "MAILSIFT_CONFIG_DIR";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "mistral:7b";

/// Messages fetched per run when not configured.
pub const DEFAULT_MAX_EMAILS_PER_RUN: usize = 100;

const CONFIG_FILE: &str = "config.json";
const CREDENTIALS_FILE: &str = "credentials.json";
const PENDING_FILE: &str = "pending.json";

/// Locations of the files mailsift keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    root: PathBuf,
}

impl Paths {
    /// Uses `root` as the configuration directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The platform configuration directory, e.g. `~/.config/mailsift`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform has no configuration directory.
    pub fn platform_default() -> Result<Self> {
        dirs::config_dir()
            .map(|dir| Self::new(dir.join("mailsift")))
            .ok_or_else(|| Error::Config("could not determine the configuration directory".into()))
    }

    /// Creates the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if creation fails.
    pub fn ensure(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// The configuration directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `config.json`.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// `credentials.json` (Google client secrets).
    #[must_use]
    pub fn credentials_file(&self) -> PathBuf {
        self.root.join(CREDENTIALS_FILE)
    }

    /// `pending.json`.
    #[must_use]
    pub fn pending_file(&self) -> PathBuf {
        self.root.join(PENDING_FILE)
    }
}

/// Reads and validates `credentials.json`.
///
/// # Errors
///
/// Returns [`Error::CredentialsMissing`] if the file does not exist and
/// [`Error::Config`] if it is not a valid client secrets document.
pub fn load_client_secrets(path: &Path) -> Result<ClientSecrets> {
    ClientSecrets::from_file(path).map_err(|e| match e {
        mailsift_oauth::Error::SecretsNotFound(path) => Error::CredentialsMissing(path),
        mailsift_oauth::Error::Json(_) => {
            Error::Config("credentials.json contains malformed JSON".into())
        }
        other => Error::Config(format!("credentials.json: {other}")),
    })
}

fn default_labels() -> BTreeMap<String, String> {
    Category::ALL
        .into_iter()
        .map(|c| (c.as_str().to_string(), c.default_label().to_string()))
        .collect()
}

/// User settings stored in `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ollama model name.
    pub model: String,
    /// Ollama base URL.
    pub ollama_url: String,
    /// Messages fetched per account and run. Always positive.
    pub max_emails_per_run: usize,
    /// Category value to label name.
    pub labels: BTreeMap<String, String>,
    /// Accounts by nickname.
    pub accounts: BTreeMap<String, Account>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            max_emails_per_run: DEFAULT_MAX_EMAILS_PER_RUN,
            labels: default_labels(),
            accounts: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Loads `path`, falling back to defaults if it is missing or malformed.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                warn!("Cannot read {}: {e}; using defaults", path.display());
                return Self::default();
            }
        };

        match serde_json::from_str::<Self>(&contents) {
            Ok(mut config) => {
                if config.max_emails_per_run == 0 {
                    warn!("max_emails_per_run must be positive, using {DEFAULT_MAX_EMAILS_PER_RUN}");
                    config.max_emails_per_run = DEFAULT_MAX_EMAILS_PER_RUN;
                }
                config
            }
            Err(e) => {
                warn!("Malformed {}: {e}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Writes the configuration atomically as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path, json.as_bytes())?;
        debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Category policies built from the configured labels.
    #[must_use]
    pub fn policies(&self) -> PolicyTable {
        PolicyTable::from_labels(&self.labels)
    }

    /// Looks up an account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] if no account has this nickname.
    pub fn account(&self, nickname: &str) -> Result<&Account> {
        self.accounts
            .get(nickname)
            .ok_or_else(|| Error::AccountNotFound(nickname.to_string()))
    }

    /// Normalizes a nickname and checks it is free.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty nickname or
    /// [`Error::DuplicateAccount`] if it is taken.
    pub fn check_new_nickname(&self, raw: &str) -> Result<String> {
        let nickname = normalize_nickname(raw)
            .ok_or_else(|| Error::InvalidInput("account nickname cannot be empty".into()))?;
        if self.accounts.contains_key(&nickname) {
            return Err(Error::DuplicateAccount(nickname));
        }
        Ok(nickname)
    }

    /// Adds an account and returns its normalized nickname.
    ///
    /// # Errors
    ///
    /// See [`Config::check_new_nickname`].
    pub fn add_account(&mut self, raw_nickname: &str, email: impl Into<String>) -> Result<String> {
        let nickname = self.check_new_nickname(raw_nickname)?;
        let account = Account::new(email);
        info!("Added account {nickname} ({})", account.email);
        self.accounts.insert(nickname.clone(), account);
        Ok(nickname)
    }

    /// Removes an account. The last account cannot be removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] or [`Error::LastAccount`].
    pub fn remove_account(&mut self, nickname: &str) -> Result<Account> {
        self.account(nickname)?;
        if self.accounts.len() <= 1 {
            return Err(Error::LastAccount);
        }
        let account = self
            .accounts
            .remove(nickname)
            .ok_or_else(|| Error::AccountNotFound(nickname.to_string()))?;
        info!("Removed account {nickname}");
        Ok(account)
    }

    /// Sets the model name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank name.
    pub fn set_model(&mut self, model: &str) -> Result<()> {
        let model = model.trim();
        if model.is_empty() {
            return Err(Error::InvalidInput("model name cannot be empty".into()));
        }
        self.model = model.to_string();
        Ok(())
    }

    /// Sets how many messages a run fetches per account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] unless `value` is a positive integer.
    pub fn set_max_emails(&mut self, value: &str) -> Result<()> {
        let max: i64 = value
            .trim()
            .parse()
            .map_err(|_| Error::InvalidInput(format!("'{value}' is not a number")))?;
        let max = usize::try_from(max)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| Error::InvalidInput("must be a positive number".into()))?;
        self.max_emails_per_run = max;
        Ok(())
    }

    /// Renames the label used for a category.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank name.
    pub fn set_label(&mut self, category: Category, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("label name cannot be empty".into()));
        }
        self.labels
            .insert(category.as_str().to_string(), name.to_string());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.model, "mistral:7b");
        assert_eq!(config.ollama_url, "http://localhost:11434");
        assert_eq!(config.max_emails_per_run, 100);
        assert_eq!(config.labels["NEEDS_ACTION"], "Auto/Needs Action");
        assert!(config.accounts.is_empty());
    }

    #[test]
    fn test_load_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(Config::load(&path), Config::default());

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load(&path), Config::default());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"model": "llama3:8b", "max_emails_per_run": 0,
                "labels": {"ARCHIVE": "Later"},
                "accounts": {"work": {"email": "me@work.com"}}}"#,
        )
        .unwrap();

        let config = Config::load(&path);
        assert_eq!(config.model, "llama3:8b");
        assert_eq!(config.ollama_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.max_emails_per_run, DEFAULT_MAX_EMAILS_PER_RUN);
        assert_eq!(config.account("work").unwrap().email, "me@work.com");

        let policies = config.policies();
        assert_eq!(policies.label(Category::Archive), "Later");
        assert_eq!(policies.label(Category::Ignore), "Auto/Ignore");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.json");
        let mut config = Config::default();
        config.add_account("Work Mail", "me@work.com").unwrap();
        config.set_label(Category::Fyi, "Read Later").unwrap();

        config.save(&path).unwrap();
        assert_eq!(Config::load(&path), config);
    }

    #[test]
    fn test_account_rules() {
        let mut config = Config::default();
        assert_eq!(config.add_account(" Work ", "a@x.com").unwrap(), "work");
        assert!(matches!(
            config.add_account("WORK", "b@x.com"),
            Err(Error::DuplicateAccount(_))
        ));
        assert!(matches!(
            config.add_account("  ", "c@x.com"),
            Err(Error::InvalidInput(_))
        ));

        assert!(matches!(
            config.remove_account("work"),
            Err(Error::LastAccount)
        ));
        config.add_account("home", "h@x.com").unwrap();
        assert!(matches!(
            config.remove_account("nope"),
            Err(Error::AccountNotFound(_))
        ));
        assert_eq!(config.remove_account("work").unwrap().email, "a@x.com");
        assert_eq!(config.accounts.len(), 1);
    }

    #[test]
    fn test_settings_validation() {
        let mut config = Config::default();
        config.set_max_emails("25").unwrap();
        assert_eq!(config.max_emails_per_run, 25);

        for bad in ["0", "-3", "ten", ""] {
            assert!(config.set_max_emails(bad).is_err(), "{bad} accepted");
        }
        assert_eq!(config.max_emails_per_run, 25);

        assert!(config.set_model(" ").is_err());
        config.set_model("qwen2.5:7b").unwrap();
        assert_eq!(config.model, "qwen2.5:7b");

        assert!(config.set_label(Category::Ignore, "").is_err());
    }

    #[test]
    fn test_client_secrets_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = Paths::new(dir.path()).credentials_file();
        assert!(matches!(
            load_client_secrets(&path),
            Err(Error::CredentialsMissing(_))
        ));

        std::fs::write(&path, "{oops").unwrap();
        assert!(matches!(load_client_secrets(&path), Err(Error::Config(_))));

        std::fs::write(&path, r#"{"installed": {"client_id": "cid"}}"#).unwrap();
        assert_eq!(load_client_secrets(&path).unwrap().client_id, "cid");
    }

    #[test]
    fn test_paths() {
        let paths = Paths::new("/tmp/mailsift-test");
        assert_eq!(
            paths.pending_file(),
            PathBuf::from("/tmp/mailsift-test/pending.json")
        );
        assert_eq!(paths.root(), Path::new("/tmp/mailsift-test"));
    }
}
