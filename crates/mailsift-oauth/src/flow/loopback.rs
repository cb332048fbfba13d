//! Loopback redirect capture for installed applications.
//!
//! Google redirects the browser to `http://127.0.0.1:<port>/?code=...&state=...`.
//! A one-shot listener on that port reads the request line, answers the browser
//! with a short page, and hands the code to the token exchange.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};
use url::Url;

use super::pkce::random_state;
use super::{AuthorizationCodeFlow, OAuthClient};
use crate::error::{Error, Result};
use crate::token::Token;

/// What the browser sent to the loopback listener.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Redirect {
    /// Authorization granted.
    Code { code: String, state: Option<String> },
    /// Authorization refused (`error=access_denied` and friends).
    Denied(String),
    /// Some other request, e.g. `/favicon.ico`.
    Unrelated,
}

/// Authorization code flow bound to a loopback listener.
#[derive(Debug)]
pub struct LoopbackFlow {
    flow: AuthorizationCodeFlow,
    listener: TcpListener,
    state: String,
}

impl LoopbackFlow {
    /// Binds `127.0.0.1` on a random port and prepares a PKCE flow redirecting there.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn bind(client: OAuthClient) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let client = client.with_redirect_uri(format!("http://127.0.0.1:{port}"));
        debug!("Listening for OAuth redirect on port {port}");

        Ok(Self {
            flow: AuthorizationCodeFlow::new(client).with_pkce(),
            listener,
            state: random_state(),
        })
    }

    /// The consent URL to open in the user's browser.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be constructed.
    pub fn authorization_url(&self) -> Result<Url> {
        self.flow.authorization_url(None, Some(&self.state))
    }

    /// Waits for the browser redirect, then exchanges the code for tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if no redirect arrives in time, [`Error::AccessDenied`]
    /// when the user refuses consent, [`Error::StateMismatch`] for a forged redirect,
    /// or the token exchange error.
    pub async fn wait_for_token(self, timeout: Duration) -> Result<Token> {
        let code = tokio::time::timeout(timeout, self.accept_code())
            .await
            .map_err(|_| Error::Timeout(timeout.as_secs()))??;
        info!("Received authorization code, exchanging for tokens");
        self.flow.exchange_code(&code).await
    }

    async fn accept_code(&self) -> Result<String> {
        loop {
            let (mut stream, _) = self.listener.accept().await?;
            let mut buffer = vec![0u8; 8192];
            let n = stream.read(&mut buffer).await?;
            let request = String::from_utf8_lossy(&buffer[..n]);

            match parse_redirect(&request) {
                Redirect::Unrelated => {
                    respond(&mut stream, "404 Not Found", "Not found.").await;
                }
                Redirect::Denied(reason) => {
                    debug!("Authorization denied: {reason}");
                    respond(
                        &mut stream,
                        "200 OK",
                        "Authorization denied. You can close this tab.",
                    )
                    .await;
                    return Err(Error::AccessDenied);
                }
                Redirect::Code { code, state } => {
                    if state.as_deref() != Some(self.state.as_str()) {
                        respond(&mut stream, "400 Bad Request", "State mismatch.").await;
                        return Err(Error::StateMismatch);
                    }
                    if code.is_empty() {
                        respond(&mut stream, "400 Bad Request", "No authorization code.").await;
                        return Err(Error::MissingCode);
                    }
                    respond(
                        &mut stream,
                        "200 OK",
                        "Authorization successful! You can close this tab and return to the terminal.",
                    )
                    .await;
                    return Ok(code);
                }
            }
        }
    }
}

/// Extracts the redirect parameters from a raw HTTP request.
fn parse_redirect(request: &str) -> Redirect {
    let Some(target) = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
    else {
        return Redirect::Unrelated;
    };
    let Ok(url) = Url::parse(&format!("http://127.0.0.1{target}")) else {
        return Redirect::Unrelated;
    };
    if url.path() != "/" {
        return Redirect::Unrelated;
    }

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => return Redirect::Denied(value.into_owned()),
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }

    code.map_or(Redirect::Unrelated, |code| Redirect::Code { code, state })
}

async fn respond(stream: &mut TcpStream, status: &str, message: &str) {
    let body = format!(
        "<html><body style=\"font-family: system-ui; text-align: center; padding: 40px;\">\
         <h2>{message}</h2></body></html>"
    );
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        debug!("Failed to answer browser: {e}");
    }
    let _ = stream.flush().await;
}
