//! Google `OAuth2` provider configuration and client secrets.

use std::path::Path;

use crate::error::{Error, Result};
use serde::Deserialize;
use url::Url;

/// Google authorization endpoint.
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google token endpoint.
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Scopes needed to read the inbox, manage labels, and archive.
pub const GMAIL_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/gmail.modify",
    "https://www.googleapis.com/auth/gmail.labels",
];

/// `OAuth2` provider configuration.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Provider name.
    pub name: String,
    /// Authorization endpoint URL.
    pub auth_url: Url,
    /// Token endpoint URL.
    pub token_url: Url,
    /// Default scopes.
    pub default_scopes: Vec<String>,
}

impl Provider {
    /// Creates a new provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if URLs are invalid.
    pub fn new(
        name: impl Into<String>,
        auth_url: impl AsRef<str>,
        token_url: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            auth_url: Url::parse(auth_url.as_ref())?,
            token_url: Url::parse(token_url.as_ref())?,
            default_scopes: Vec::new(),
        })
    }

    /// Sets the default scopes.
    #[must_use]
    pub fn with_default_scopes(mut self, scopes: Vec<String>) -> Self {
        self.default_scopes = scopes;
        self
    }

    /// Google with the Gmail scopes used for triage.
    ///
    /// # Errors
    ///
    /// Returns an error if URL parsing fails.
    pub fn gmail() -> Result<Self> {
        Ok(Self::new("Google", GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL)?
            .with_default_scopes(GMAIL_SCOPES.iter().map(ToString::to_string).collect()))
    }

    /// Gmail provider using the endpoints listed in the client secrets.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoints in the secrets are not valid URLs.
    pub fn gmail_for(secrets: &ClientSecrets) -> Result<Self> {
        Ok(Self::new("Google", &secrets.auth_uri, &secrets.token_uri)?
            .with_default_scopes(GMAIL_SCOPES.iter().map(ToString::to_string).collect()))
    }
}

/// Client identity from a Google Cloud Console `credentials.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret (desktop clients get one, but it is not confidential).
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Authorization endpoint.
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    /// Token endpoint.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URL.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

#[derive(Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Parses the JSON document downloaded from Google Cloud Console.
    ///
    /// Desktop clients are nested under `installed`, web clients under `web`.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or holds neither section.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: SecretsFile = serde_json::from_str(json)?;
        file.installed.or(file.web).ok_or_else(|| {
            Error::InvalidConfig("credentials.json has no \"installed\" or \"web\" client".into())
        })
    }

    /// Reads and parses a client secrets file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SecretsNotFound`] when the file does not exist, or a parse error.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::SecretsNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_gmail_provider() {
        let provider = Provider::gmail().unwrap();
        assert_eq!(provider.name, "Google");
        assert_eq!(provider.default_scopes.len(), 3);
        assert!(
            provider
                .default_scopes
                .iter()
                .any(|s| s.ends_with("gmail.modify"))
        );
    }

    #[test]
    fn test_installed_secrets() {
        let json = r#"{"installed":{
            "client_id":"123.apps.googleusercontent.com",
            "project_id":"triage",
            "auth_uri":"https://accounts.google.com/o/oauth2/auth",
            "token_uri":"https://oauth2.googleapis.com/token",
            "client_secret":"GOCSPX-abc",
            "redirect_uris":["http://localhost"]
        }}"#;
        let secrets = ClientSecrets::from_json(json).unwrap();
        assert_eq!(secrets.client_id, "123.apps.googleusercontent.com");
        assert_eq!(secrets.client_secret.as_deref(), Some("GOCSPX-abc"));

        let provider = Provider::gmail_for(&secrets).unwrap();
        assert_eq!(
            provider.auth_url.as_str(),
            "https://accounts.google.com/o/oauth2/auth"
        );
    }

    #[test]
    fn test_web_secrets_use_default_endpoints() {
        let secrets = ClientSecrets::from_json(r#"{"web":{"client_id":"abc"}}"#).unwrap();
        assert_eq!(secrets.token_uri, GOOGLE_TOKEN_URL);
        assert!(secrets.client_secret.is_none());
    }

    #[test]
    fn test_secrets_without_client_section() {
        assert!(matches!(
            ClientSecrets::from_json(r#"{"other":{}}"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            ClientSecrets::from_json("{not json"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_missing_secrets_file() {
        let path = Path::new("/nonexistent/mailsift/credentials.json");
        assert!(matches!(
            ClientSecrets::from_file(path),
            Err(Error::SecretsNotFound(_))
        ));
    }
}
