//! Subcommand implementations.

pub mod accounts;
pub mod menu;
pub mod pending;
pub mod run;
pub mod settings;

use anyhow::{Result, bail};
use mailsift_core::triage::ApplyReport;

/// Prints the counts of an apply pass and fails if any message was not updated.
fn report_applied(report: &ApplyReport) -> Result<()> {
    println!("Done. Applied to {} emails.", report.applied);
    if report.skipped > 0 {
        println!("Skipped {} emails.", report.skipped);
    }
    if report.failed > 0 {
        bail!(
            "{} emails could not be updated; they stay unlabelled and will show up in the next run",
            report.failed
        );
    }
    Ok(())
}
