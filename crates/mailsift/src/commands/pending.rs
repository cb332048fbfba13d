//! `mailsift pending`: the saved run.

use anyhow::Result;
use chrono::Local;
use mailsift_core::triage::{PendingState, apply_pending};

use super::report_applied;
use crate::context::Context;
use crate::progress::spinner;

pub fn show(ctx: &Context) {
    let PendingState::Present(run) = ctx.pending().state() else {
        println!("No pending results.");
        return;
    };

    println!(
        "Saved {}: {} emails, {} to apply.\n",
        run.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        run.entries.len(),
        run.actionable()
    );
    for entry in &run.entries {
        let skip = if entry.result.skip() { " (skip)" } else { "" };
        println!(
            "  [{}] {}{skip}  {} - {}",
            entry.account,
            entry.result.category(),
            entry.sender,
            entry.subject
        );
    }
}

pub async fn apply(ctx: &Context) -> Result<()> {
    let store = ctx.pending();
    if !store.is_present() {
        println!("No pending results.");
        return Ok(());
    }

    let connector = ctx.connector()?;
    let bar = spinner("Applying pending results...");
    let report = apply_pending(&store, &connector, &ctx.policies()).await;
    bar.finish_and_clear();

    match report? {
        Some(report) => report_applied(&report),
        None => {
            println!("No pending results.");
            Ok(())
        }
    }
}

pub fn discard(ctx: &Context) -> Result<()> {
    if ctx.pending().discard()? {
        println!("Pending results discarded.");
    } else {
        println!("No pending results.");
    }
    Ok(())
}
