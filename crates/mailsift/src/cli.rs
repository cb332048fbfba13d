//! Command line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use mailsift_core::config::CONFIG_DIR_ENV;

/// Sort your Gmail inbox with a local language model.
#[derive(Debug, Parser)]
#[command(name = "mailsift", version, about, long_about = None)]
pub struct Cli {
    /// Configuration directory (defaults to the platform config dir)
    #[arg(long, global = true, env = CONFIG_DIR_ENV, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive main menu (the default)
    Menu,

    /// Fetch, classify, summarize, and act on untriaged inbox mail
    Run(RunArgs),

    /// Inspect or act on the saved run
    Pending {
        #[command(subcommand)]
        action: PendingAction,
    },

    /// Manage Gmail accounts
    Accounts {
        #[command(subcommand)]
        action: AccountsAction,
    },

    /// View or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Debug, clap::Args)]
pub struct RunArgs {
    /// Account nickname to triage
    #[arg(long, conflicts_with = "all")]
    pub account: Option<String>,

    /// Triage every configured account
    #[arg(long)]
    pub all: bool,

    /// What to do once classification finishes
    #[arg(long, value_enum, default_value_t = RunAction::Ask)]
    pub action: RunAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunAction {
    /// Offer a review, then ask
    Ask,
    /// Apply labels immediately
    Apply,
    /// Save the run for later
    Save,
    /// Show the summary only
    Discard,
}

#[derive(Debug, Subcommand)]
pub enum PendingAction {
    /// Print the saved run
    Show,
    /// Apply the saved run and clear it
    Apply,
    /// Delete the saved run
    Discard,
}

#[derive(Debug, Subcommand)]
pub enum AccountsAction {
    /// List configured accounts
    List,
    /// Authorize a new account in the browser
    Add {
        /// Nickname such as "personal" or "work"
        nickname: Option<String>,
    },
    /// Forget an account and its stored token
    Remove {
        nickname: String,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    /// Print the current settings
    Show,
    /// Change the Ollama model (must already be pulled)
    Model { name: String },
    /// Messages fetched per account and run
    MaxEmails { value: String },
    /// Rename the label used for a category
    Label {
        /// NEEDS_REPLY, NEEDS_ACTION, FYI, ARCHIVE or IGNORE
        category: String,
        name: String,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_flags() {
        let cli = Cli::try_parse_from(["mailsift", "run", "--all", "--action", "save"]).unwrap();
        match cli.command {
            Some(Command::Run(args)) => {
                assert!(args.all);
                assert_eq!(args.action, RunAction::Save);
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(
            Cli::try_parse_from(["mailsift", "run", "--all", "--account", "work"]).is_err()
        );
    }

    #[test]
    fn test_no_subcommand_means_menu() {
        let cli = Cli::try_parse_from(["mailsift", "--verbose"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.verbose);
    }
}
