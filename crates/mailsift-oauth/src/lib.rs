//! # mailsift-oauth
//!
//! Google `OAuth2` authorization for installed (desktop/CLI) applications.
//!
//! ## Features
//!
//! - **Client secrets**: parse the `credentials.json` downloaded from Google Cloud Console
//! - **Authorization Code Flow**: PKCE (S256) with a loopback redirect listener
//! - **Token management**: expiration checking and refresh that keeps the refresh token
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailsift_oauth::{ClientSecrets, LoopbackFlow, OAuthClient, Provider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let secrets = ClientSecrets::from_file("credentials.json".as_ref())?;
//!     let client = OAuthClient::from_secrets(&secrets, Provider::gmail()?);
//!
//!     // Binds 127.0.0.1 on a random port and waits for the browser redirect
//!     let flow = LoopbackFlow::bind(client).await?;
//!     println!("Visit: {}", flow.authorization_url()?);
//!     let token = flow.wait_for_token(std::time::Duration::from_secs(300)).await?;
//!
//!     println!("Access token: {}", token.access_token);
//!     Ok(())
//! }
//! ```
//!
//! ### Token Refresh
//!
//! ```ignore
//! if token.is_expired() {
//!     let token = client.refresh_token(&token).await?;
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod flow;
pub mod provider;
pub mod token;

pub use error::{Error, Result};
pub use flow::{AuthorizationCodeFlow, LoopbackFlow, OAuthClient, PkceChallenge};
pub use provider::{ClientSecrets, Provider};
pub use token::Token;
