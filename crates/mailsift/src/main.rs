//! `mailsift` - Gmail inbox triage with a local language model.
//!
//! Classifies untriaged inbox mail with Ollama, prints a digest, and labels
//! (or archives) messages once the user confirms.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;
mod commands;
mod context;
mod ollama;
mod progress;
mod prompt;
mod review;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{AccountsAction, Cli, Command, PendingAction, SettingsAction};
use commands::{accounts, menu, pending, run, settings};
use context::Context;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "mailsift=debug,mailsift_core=debug,mailsift_oauth=debug"
    } else {
        "mailsift=info,mailsift_core=info,mailsift_oauth=info"
    };
    // Logs go to stderr so menus and digests on stdout stay readable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let mut ctx = Context::load(cli.config_dir)?;
    debug!("Using configuration in {}", ctx.paths.root().display());

    match cli.command.unwrap_or(Command::Menu) {
        Command::Menu => menu::run(&mut ctx).await,
        Command::Run(args) => run::execute(&ctx, &args).await,
        Command::Pending { action } => match action {
            PendingAction::Show => {
                pending::show(&ctx);
                Ok(())
            }
            PendingAction::Apply => pending::apply(&ctx).await,
            PendingAction::Discard => pending::discard(&ctx),
        },
        Command::Accounts { action } => match action {
            AccountsAction::List => {
                accounts::list(&ctx);
                Ok(())
            }
            AccountsAction::Add { nickname } => accounts::add(&mut ctx, nickname).await,
            AccountsAction::Remove { nickname, yes } => accounts::remove(&mut ctx, &nickname, yes),
        },
        Command::Settings { action } => match action {
            SettingsAction::Show => {
                settings::show(&ctx);
                Ok(())
            }
            SettingsAction::Model { name } => settings::set_model(&mut ctx, &name).await,
            SettingsAction::MaxEmails { value } => settings::set_max_emails(&mut ctx, &value),
            SettingsAction::Label { category, name } => {
                settings::set_label(&mut ctx, &category, &name)
            }
        },
    }
}
