//! Applies finalized results to a mailbox.

use std::collections::HashMap;
use std::ops::AddAssign;

use tracing::{debug, warn};

use super::model::{Category, ClassificationResult, PolicyTable};
use crate::provider::{LabelHandle, Mailbox};

/// Outcome of an apply pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Messages labelled (and archived where the policy says so).
    pub applied: usize,
    /// Messages marked skip; untouched.
    pub skipped: usize,
    /// Messages whose label lookup or modification failed.
    pub failed: usize,
}

impl ApplyReport {
    /// Total messages considered.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.applied + self.skipped + self.failed
    }
}

impl AddAssign for ApplyReport {
    fn add_assign(&mut self, other: Self) {
        self.applied += other.applied;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Labels and archives each non-skipped result in order.
///
/// Labels are resolved lazily, once per category; skipped results never
/// trigger a lookup. Failures are counted and never stop the pass.
pub async fn apply(
    mailbox: &dyn Mailbox,
    policies: &PolicyTable,
    results: &[ClassificationResult],
) -> ApplyReport {
    let mut report = ApplyReport::default();
    let mut labels: HashMap<Category, Option<LabelHandle>> = HashMap::new();

    for result in results {
        if result.skip() {
            report.skipped += 1;
            continue;
        }

        let policy = policies.get(result.category());
        let label = match labels.get(&policy.category) {
            Some(cached) => cached.clone(),
            None => {
                let resolved = match mailbox.ensure_label(&policy.label).await {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        warn!("Could not resolve label '{}': {e}", policy.label);
                        None
                    }
                };
                labels.insert(policy.category, resolved.clone());
                resolved
            }
        };

        let Some(label) = label else {
            report.failed += 1;
            continue;
        };

        match mailbox
            .apply_label_and_archive(result.message_id(), &label, policy.archives_on_apply)
            .await
        {
            Ok(()) => {
                debug!(
                    "Applied '{}' to {} (archive: {})",
                    label.name,
                    result.message_id(),
                    policy.archives_on_apply
                );
                report.applied += 1;
            }
            Err(e) => {
                warn!("Failed to modify message {}: {e}", result.message_id());
                report.failed += 1;
            }
        }
    }

    report
}
