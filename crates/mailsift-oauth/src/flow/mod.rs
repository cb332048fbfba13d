//! `OAuth2` authorization flows.

mod code;
mod loopback;
mod pkce;

pub use code::AuthorizationCodeFlow;
pub use loopback::LoopbackFlow;
pub use pkce::PkceChallenge;

use crate::error::Result;
use crate::provider::{ClientSecrets, Provider};
use crate::token::{ErrorResponse, Token, TokenResponse};
use chrono::Utc;
use reqwest::Client;
use tracing::debug;

/// Common `OAuth2` client configuration.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    /// Client ID from provider.
    pub client_id: String,
    /// Client secret (optional for public clients).
    pub client_secret: Option<String>,
    /// Redirect URI for authorization code flow.
    pub redirect_uri: Option<String>,
    /// Provider configuration.
    pub provider: Provider,
    /// HTTP client.
    http_client: Client,
}

impl OAuthClient {
    /// Creates a new OAuth client.
    #[must_use]
    pub fn new(client_id: impl Into<String>, provider: Provider) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: None,
            provider,
            http_client: Client::new(),
        }
    }

    /// Creates a client from a parsed `credentials.json`.
    #[must_use]
    pub fn from_secrets(secrets: &ClientSecrets, provider: Provider) -> Self {
        let client = Self::new(secrets.client_id.clone(), provider);
        match &secrets.client_secret {
            Some(secret) => client.with_client_secret(secret.clone()),
            None => client,
        }
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sets the redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    /// Refreshes an access token using its refresh token.
    ///
    /// The returned token keeps the previous refresh token when the server does not rotate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh fails or if the token has no refresh token.
    pub async fn refresh_token(&self, token: &Token) -> Result<Token> {
        let refresh_token = token.refresh_token()?;

        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
        ];
        if let Some(secret) = &self.client_secret {
            params.push(("client_secret", secret));
        }

        let mut new_token = self.post_token_request(&params).await?;
        new_token.inherit_refresh_token(token);
        debug!("Refreshed access token with {}", self.provider.name);
        Ok(new_token)
    }

    /// Exchanges an authorization code for tokens.
    pub(crate) async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
        code_verifier: Option<&str>,
    ) -> Result<Token> {
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
        ];
        if let Some(uri) = redirect_uri.or(self.redirect_uri.as_deref()) {
            params.push(("redirect_uri", uri));
        }
        if let Some(secret) = &self.client_secret {
            params.push(("client_secret", secret));
        }
        if let Some(verifier) = code_verifier {
            params.push(("code_verifier", verifier));
        }

        self.post_token_request(&params).await
    }

    async fn post_token_request(&self, params: &[(&str, &str)]) -> Result<Token> {
        let response = self
            .http_client
            .post(self.provider.token_url.clone())
            .form(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let error: ErrorResponse = response.json().await?;
            return Err(error.into_error());
        }

        let token_response: TokenResponse = response.json().await?;
        Ok(Token::from_response(token_response, Utc::now()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_client_from_secrets() {
        let secrets = ClientSecrets::from_json(
            r#"{"installed":{"client_id":"id-1","client_secret":"shh"}}"#,
        )
        .unwrap();
        let client = OAuthClient::from_secrets(&secrets, Provider::gmail().unwrap());
        assert_eq!(client.client_id, "id-1");
        assert_eq!(client.client_secret.as_deref(), Some("shh"));
        assert!(client.redirect_uri.is_none());
    }

    #[tokio::test]
    async fn test_refresh_requires_refresh_token() {
        let client = OAuthClient::new("id", Provider::gmail().unwrap());
        let result = client.refresh_token(&Token::bearer("expired")).await;
        assert!(matches!(result, Err(crate::Error::NoRefreshToken)));
    }
}
