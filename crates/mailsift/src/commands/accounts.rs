//! `mailsift accounts`: add, list, and remove Gmail accounts.

use std::time::Duration;

use anyhow::{Context as _, Result};
use mailsift_core::credentials;
use mailsift_core::provider::gmail::fetch_profile_email;
use mailsift_oauth::LoopbackFlow;
use tracing::{info, warn};

use crate::context::Context;
use crate::prompt;

/// How long to wait for the browser to come back with a code.
const AUTHORIZATION_TIMEOUT: Duration = Duration::from_secs(300);

pub fn list(ctx: &Context) {
    if ctx.config.accounts.is_empty() {
        println!("No accounts configured. Add one with `mailsift accounts add`.");
        return;
    }
    for (nickname, account) in &ctx.config.accounts {
        println!("{nickname:<16} {}", account.email);
    }
}

/// Authorizes a new account in the browser and saves it.
///
/// Prompts for the nickname when none is given; an empty answer cancels.
pub async fn add(ctx: &mut Context, nickname: Option<String>) -> Result<()> {
    let raw = match nickname {
        Some(raw) => raw,
        None => match prompt::text(
            "Enter a nickname for this account (e.g., 'personal', 'work'):",
            None,
        )? {
            Some(raw) => raw,
            None => {
                println!("Account addition cancelled.");
                return Ok(());
            }
        },
    };
    let nickname = ctx.config.check_new_nickname(&raw)?;

    let flow = LoopbackFlow::bind(ctx.oauth_client()?).await?;
    let url = flow.authorization_url()?;
    println!("\nOpen this URL in your browser to authorize mailsift:\n\n  {url}\n");
    if let Err(e) = opener::open(url.as_str()) {
        warn!("Could not open a browser: {e}");
    }

    let token = flow
        .wait_for_token(AUTHORIZATION_TIMEOUT)
        .await
        .context("authorization failed")?;
    if token.refresh_token.is_none() {
        warn!("Google did not return a refresh token; you will need to re-add '{nickname}' when it expires");
    }

    let email = fetch_profile_email(&token.access_token)
        .await
        .context("fetching the account address")?;
    credentials::store_oauth_token(&nickname, &token)?;

    ctx.config.add_account(&nickname, email.clone())?;
    ctx.save_config()?;
    info!("Stored token for {nickname}");
    println!("Account '{nickname}' ({email}) added successfully!");
    Ok(())
}

/// Removes an account and its keyring token. The last account cannot be removed.
pub fn remove(ctx: &mut Context, nickname: &str, yes: bool) -> Result<()> {
    let mut updated = ctx.config.clone();
    let account = updated.remove_account(nickname)?;

    if !yes && !prompt::confirm(&format!("Remove {}?", account.email), false)? {
        println!("Cancelled.");
        return Ok(());
    }

    ctx.config = updated;
    ctx.save_config()?;
    if let Err(e) = credentials::delete_oauth_token(nickname) {
        warn!("Could not delete the stored token for {nickname}: {e}");
    }
    println!("Account '{nickname}' removed.");
    Ok(())
}

/// Menu flow: pick an account to remove.
pub fn remove_interactive(ctx: &mut Context) -> Result<()> {
    if ctx.config.accounts.len() <= 1 {
        println!("Cannot remove last account.");
        return Ok(());
    }

    let names: Vec<String> = ctx.config.accounts.keys().cloned().collect();
    let mut choices: Vec<String> = ctx
        .config
        .accounts
        .iter()
        .map(|(name, account)| format!("{name} ({})", account.email))
        .collect();
    choices.push("Cancel".to_string());

    match prompt::select("Select account to remove:", &choices)? {
        Some(i) if i < names.len() => remove(ctx, &names[i], false),
        _ => Ok(()),
    }
}
