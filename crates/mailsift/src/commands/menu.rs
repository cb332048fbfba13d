//! Interactive main menu.

use anyhow::Result;

use super::{accounts, pending, run, settings};
use crate::cli::{RunAction, RunArgs};
use crate::context::Context;
use crate::{ollama, prompt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    ApplyPending,
    Run,
    AddAccount,
    RemoveAccount,
    Settings,
    Exit,
}

impl Entry {
    const fn label(self) -> &'static str {
        match self {
            Self::ApplyPending => "Apply pending results",
            Self::Run => "Run triage",
            Self::AddAccount => "Add account",
            Self::RemoveAccount => "Remove account",
            Self::Settings => "Settings",
            Self::Exit => "Exit",
        }
    }
}

/// Entries shown for the current state.
fn entries(pending: bool, accounts: usize) -> Vec<Entry> {
    let mut entries = Vec::with_capacity(6);
    if pending {
        entries.push(Entry::ApplyPending);
    }
    entries.push(Entry::Run);
    entries.push(Entry::AddAccount);
    if accounts > 1 {
        entries.push(Entry::RemoveAccount);
    }
    entries.push(Entry::Settings);
    entries.push(Entry::Exit);
    entries
}

pub async fn run(ctx: &mut Context) -> Result<()> {
    if !ctx.has_credentials() {
        println!("{}", ctx.setup_instructions());
        return Ok(());
    }
    // Rejects a malformed credentials.json before anything else happens.
    ctx.oauth_client()?;

    if ctx.config.accounts.is_empty() {
        println!("Welcome to mailsift!\n");
        if prompt::confirm("Add your first account?", true)? {
            if let Err(e) = accounts::add(ctx, None).await {
                println!("Authentication failed: {e:#}");
            }
        }
        if ctx.config.accounts.is_empty() {
            println!("No accounts configured. Run again to add an account.");
            return Ok(());
        }
    }

    ollama::warn_if_unready(&ctx.ollama(), &ctx.config.model).await?;

    loop {
        let entries = entries(ctx.pending().is_present(), ctx.config.accounts.len());
        let labels: Vec<String> = entries.iter().map(|e| e.label().to_string()).collect();
        let Some(picked) = prompt::select("mailsift - Main Menu", &labels)? else {
            return Ok(());
        };

        let outcome = match entries[picked] {
            Entry::ApplyPending => pending::apply(ctx).await,
            Entry::Run => {
                let args = RunArgs {
                    account: None,
                    all: false,
                    action: RunAction::Ask,
                };
                run::execute(ctx, &args).await
            }
            Entry::AddAccount => accounts::add(ctx, None).await,
            Entry::RemoveAccount => accounts::remove_interactive(ctx),
            Entry::Settings => settings::menu(ctx).await,
            Entry::Exit => return Ok(()),
        };
        if let Err(e) = outcome {
            println!("Error: {e:#}");
        }
    }
}
