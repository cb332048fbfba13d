//! Paths, configuration, and provider construction shared by all commands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use mailsift_core::config::load_client_secrets;
use mailsift_core::{
    Config, GmailConnector, ModelHandle, OllamaClient, Paths, PendingStore, PolicyTable,
};
use mailsift_oauth::{OAuthClient, Provider};

const SETUP_INSTRUCTIONS: &str = "
mailsift setup
==============

mailsift needs Google Cloud OAuth credentials to read your mailbox:

1. Go to the Google Cloud Console:
   https://console.cloud.google.com/

2. Create a new project or select an existing one

3. Enable the Gmail API:
   https://console.cloud.google.com/apis/library/gmail.googleapis.com

4. Create OAuth 2.0 credentials:
   https://console.cloud.google.com/apis/credentials
   - Click \"Create Credentials\" > \"OAuth client ID\"
   - Application type: \"Desktop app\"
   - Download the JSON file

5. Save the downloaded file as:
   {path}

After saving credentials.json, run mailsift again.
";

/// Loaded configuration plus where it lives.
pub struct Context {
    pub paths: Paths,
    pub config: Config,
}

impl Context {
    /// Resolves the configuration directory, creating it, and loads `config.json`.
    pub fn load(config_dir: Option<PathBuf>) -> Result<Self> {
        let paths = match config_dir {
            Some(dir) => Paths::new(dir),
            None => Paths::platform_default()?,
        };
        paths
            .ensure()
            .with_context(|| format!("creating {}", paths.root().display()))?;
        let config = Config::load(&paths.config_file());
        Ok(Self { paths, config })
    }

    pub fn save_config(&self) -> Result<()> {
        self.config
            .save(&self.paths.config_file())
            .context("saving config.json")
    }

    pub fn pending(&self) -> PendingStore {
        PendingStore::new(self.paths.pending_file())
    }

    pub fn policies(&self) -> PolicyTable {
        self.config.policies()
    }

    pub fn has_credentials(&self) -> bool {
        self.paths.credentials_file().exists()
    }

    pub fn setup_instructions(&self) -> String {
        SETUP_INSTRUCTIONS.replace(
            "{path}",
            &self.paths.credentials_file().display().to_string(),
        )
    }

    /// OAuth client from `credentials.json`.
    ///
    /// A missing file prints the setup instructions before failing.
    pub fn oauth_client(&self) -> Result<OAuthClient> {
        let secrets = match load_client_secrets(&self.paths.credentials_file()) {
            Ok(secrets) => secrets,
            Err(e @ mailsift_core::Error::CredentialsMissing(_)) => {
                println!("{}", self.setup_instructions());
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };
        let provider = Provider::gmail_for(&secrets)?;
        Ok(OAuthClient::from_secrets(&secrets, provider))
    }

    pub fn connector(&self) -> Result<GmailConnector> {
        Ok(GmailConnector::new(
            self.oauth_client()?,
            self.config.accounts.keys().cloned(),
        ))
    }

    pub fn ollama(&self) -> OllamaClient {
        OllamaClient::new(&self.config.ollama_url)
    }

    pub fn model(&self) -> ModelHandle {
        ModelHandle::new(Arc::new(self.ollama()), self.config.model.clone())
    }
}
