//! Example: authorize a Gmail account from the terminal.
//!
//! Reads a Google Cloud Console `credentials.json` (desktop app client),
//! runs the loopback authorization flow, and refreshes the resulting token.
//!
//! ## Running
//!
//! ```bash
//! cargo run --example gmail_login -- path/to/credentials.json
//! ```

use std::path::PathBuf;
use std::time::Duration;

use mailsift_oauth::{ClientSecrets, LoopbackFlow, OAuthClient, Provider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("credentials.json"), PathBuf::from);

    let secrets = ClientSecrets::from_file(&path)?;
    let provider = Provider::gmail_for(&secrets)?;
    println!("Provider: {}", provider.name);
    println!("Scopes: {:?}\n", provider.default_scopes);

    let client = OAuthClient::from_secrets(&secrets, provider);
    let flow = LoopbackFlow::bind(client.clone()).await?;

    let url = flow.authorization_url()?;
    println!("Open this URL in your browser:\n\n  {url}\n");
    if opener::open(url.as_str()).is_err() {
        println!("(could not open a browser automatically)");
    }

    let token = flow.wait_for_token(Duration::from_secs(300)).await?;
    println!("Access token expires at: {:?}", token.expires_at);
    println!("Refresh token received: {}", token.refresh_token.is_some());

    if token.refresh_token.is_some() {
        let refreshed = client.refresh_token(&token).await?;
        println!("Refreshed, new expiry: {:?}", refreshed.expires_at);
    }

    Ok(())
}
