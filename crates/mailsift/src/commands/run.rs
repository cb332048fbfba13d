//! `mailsift run`: fetch, classify, summarize, review, act.

use anyhow::{Context as _, Result, bail};
use mailsift_core::triage::{apply_items, ensure_ready, fetch_and_classify, summarize};
use mailsift_core::{MailboxConnector, ReviewSession};
use tracing::info;

use super::{pending, report_applied};
use crate::cli::{RunAction, RunArgs};
use crate::context::Context;
use crate::progress::{ClassifyProgress, spinner};
use crate::{ollama, prompt, review};

pub async fn execute(ctx: &Context, args: &RunArgs) -> Result<()> {
    let interactive = args.action == RunAction::Ask;
    let store = ctx.pending();

    if interactive && store.is_present() {
        let choices = [
            "Apply pending results".to_string(),
            "Discard pending results".to_string(),
            "Cancel".to_string(),
        ];
        match prompt::select("You have pending results. What would you like to do?", &choices)? {
            Some(0) => return pending::apply(ctx).await,
            Some(1) => {
                store.discard()?;
                println!("Pending results discarded.");
            }
            _ => return Ok(()),
        }
    }
    ensure_ready(&store)?;

    let Some(accounts) = select_accounts(ctx, args)? else {
        return Ok(());
    };
    let connector = ctx.connector()?;
    ollama::ensure_ready(&ctx.ollama(), &ctx.config.model, interactive).await?;

    let model = ctx.model();
    let policies = ctx.policies();
    let mut session = ReviewSession::default();

    for account in &accounts {
        let email = &ctx.config.account(account)?.email;
        println!("\nFetching emails from {email}...");
        let mailbox = connector
            .open(account)
            .await
            .with_context(|| format!("opening mailbox for '{account}'"))?;

        let progress = ClassifyProgress::new(model.name());
        let batch = fetch_and_classify(
            account,
            mailbox.as_ref(),
            &model,
            &policies,
            ctx.config.max_emails_per_run,
            progress.callback(),
        )
        .await;
        progress.finish();
        let batch = batch.with_context(|| format!("fetching mail for '{account}'"))?;

        println!("Found {} emails to process.", batch.messages.len());
        session.extend(batch.into_review_items());
    }

    if session.is_empty() {
        println!("No unprocessed emails found.");
        return Ok(());
    }

    let digest = summarize(&session.messages(), &session.results(), &model).await;
    println!("{digest}\n");

    let action = if interactive {
        review::drill_down(&mut session)?;
        choose_action()?
    } else {
        args.action
    };

    match action {
        RunAction::Apply => {
            let bar = spinner(format!("Applying labels to {} emails...", session.len()));
            let report = apply_items(&connector, &policies, session.items()).await;
            bar.finish_and_clear();
            info!(
                "Run finished: applied {}, skipped {}, failed {}",
                report.applied, report.skipped, report.failed
            );
            report_applied(&report)
        }
        RunAction::Save => {
            store.save_run(&session.to_pending_run())?;
            println!(
                "Results saved. Apply them later with `mailsift pending apply` \
                 or \"Apply pending results\" in the menu."
            );
            Ok(())
        }
        RunAction::Discard | RunAction::Ask => {
            println!("Results discarded. Nothing was changed.");
            Ok(())
        }
    }
}

/// Accounts to triage, or `None` if the user cancelled.
fn select_accounts(ctx: &Context, args: &RunArgs) -> Result<Option<Vec<String>>> {
    let accounts = &ctx.config.accounts;
    if accounts.is_empty() {
        bail!("No accounts configured. Add one with `mailsift accounts add`.");
    }

    if args.all {
        return Ok(Some(accounts.keys().cloned().collect()));
    }
    if let Some(name) = &args.account {
        ctx.config.account(name)?;
        return Ok(Some(vec![name.clone()]));
    }
    if accounts.len() == 1 {
        return Ok(Some(accounts.keys().cloned().collect()));
    }
    if args.action != RunAction::Ask {
        bail!("Several accounts are configured; pass --account NAME or --all.");
    }

    let names: Vec<&String> = accounts.keys().collect();
    let mut choices: Vec<String> = accounts
        .iter()
        .map(|(name, account)| format!("{name} ({})", account.email))
        .collect();
    choices.push("All accounts".to_string());
    choices.push("Cancel".to_string());

    Ok(match prompt::select("Select account:", &choices)? {
        Some(i) if i < names.len() => Some(vec![names[i].clone()]),
        Some(i) if i == names.len() => Some(names.into_iter().cloned().collect()),
        _ => None,
    })
}

fn choose_action() -> Result<RunAction> {
    let choices = [
        "Apply now".to_string(),
        "Save for later".to_string(),
        "Discard".to_string(),
    ];
    Ok(match prompt::select("What would you like to do?", &choices)? {
        Some(0) => RunAction::Apply,
        Some(1) => RunAction::Save,
        _ => RunAction::Discard,
    })
}
