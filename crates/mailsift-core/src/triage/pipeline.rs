//! Run orchestration: fetch, classify, apply, and the pending round-trip.

use tracing::{info, warn};

use super::apply::{ApplyReport, apply};
use super::classifier::classify_all;
use super::model::{ClassificationResult, MessageRef, PolicyTable};
use super::pending::PendingStore;
use super::review::ReviewItem;
use crate::Result;
use crate::provider::{Mailbox, MailboxConnector, ModelHandle};

/// One account's fetched and classified messages.
#[derive(Debug, Clone)]
pub struct AccountBatch {
    /// Account nickname.
    pub account: String,
    /// Candidate messages in fetch order.
    pub messages: Vec<MessageRef>,
    /// Results, index-aligned with `messages`.
    pub results: Vec<ClassificationResult>,
}

impl AccountBatch {
    /// Whether nothing was fetched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Converts into review items.
    #[must_use]
    pub fn into_review_items(self) -> Vec<ReviewItem> {
        let account = self.account;
        self.messages
            .into_iter()
            .zip(self.results)
            .map(|(message, result)| ReviewItem {
                account: account.clone(),
                message,
                result,
            })
            .collect()
    }
}

/// Refuses to start a run while a pending run is stored.
///
/// # Errors
///
/// Returns [`crate::Error::PendingExists`] if the slot is occupied.
pub fn ensure_ready(store: &PendingStore) -> Result<()> {
    store.ensure_absent()
}

/// Fetches untriaged inbox messages and classifies them.
///
/// Every category label is excluded from the fetch, so messages labelled by an
/// earlier run are never seen again.
///
/// # Errors
///
/// Returns an error if the candidate listing fails. Classification never fails.
pub async fn fetch_and_classify<F>(
    account: &str,
    mailbox: &dyn Mailbox,
    model: &ModelHandle,
    policies: &PolicyTable,
    limit: usize,
    progress: F,
) -> Result<AccountBatch>
where
    F: FnMut(usize, usize),
{
    let messages = mailbox
        .list_candidate_messages(&policies.exclusion_labels(), limit)
        .await?;
    info!("Fetched {} candidate messages for {account}", messages.len());

    let results = classify_all(&messages, model, progress).await;
    Ok(AccountBatch {
        account: account.to_string(),
        messages,
        results,
    })
}

/// Applies decisions grouped by account, opening each mailbox once.
///
/// Accounts are processed in first-seen order. If a mailbox cannot be opened,
/// its non-skipped results count as failed.
pub async fn apply_grouped<'a, I>(
    connector: &dyn MailboxConnector,
    policies: &PolicyTable,
    decisions: I,
) -> ApplyReport
where
    I: IntoIterator<Item = (&'a str, &'a ClassificationResult)>,
{
    let mut groups: Vec<(&str, Vec<ClassificationResult>)> = Vec::new();
    for (account, result) in decisions {
        match groups.iter_mut().find(|(a, _)| *a == account) {
            Some((_, results)) => results.push(result.clone()),
            None => groups.push((account, vec![result.clone()])),
        }
    }

    let mut report = ApplyReport::default();
    for (account, results) in groups {
        match connector.open(account).await {
            Ok(mailbox) => {
                let account_report = apply(mailbox.as_ref(), policies, &results).await;
                info!(
                    "{account}: applied {}, skipped {}, failed {}",
                    account_report.applied, account_report.skipped, account_report.failed
                );
                report += account_report;
            }
            Err(e) => {
                warn!("Cannot open mailbox for {account}: {e}");
                let skipped = results.iter().filter(|r| r.skip()).count();
                report += ApplyReport {
                    applied: 0,
                    skipped,
                    failed: results.len() - skipped,
                };
            }
        }
    }
    report
}

/// Applies reviewed items immediately.
pub async fn apply_items(
    connector: &dyn MailboxConnector,
    policies: &PolicyTable,
    items: &[ReviewItem],
) -> ApplyReport {
    apply_grouped(
        connector,
        policies,
        items.iter().map(|i| (i.account.as_str(), &i.result)),
    )
    .await
}

/// Applies the stored run, then clears the slot.
///
/// Returns `None` when nothing is stored. The slot is cleared even if some
/// messages failed; a later run picks them up again since they carry no label.
///
/// # Errors
///
/// Returns an error if the pending file cannot be removed.
pub async fn apply_pending(
    store: &PendingStore,
    connector: &dyn MailboxConnector,
    policies: &PolicyTable,
) -> Result<Option<ApplyReport>> {
    let Some(run) = store.load() else {
        return Ok(None);
    };

    let report = apply_grouped(
        connector,
        policies,
        run.entries
            .iter()
            .map(|e| (e.account.as_str(), &e.result)),
    )
    .await;
    store.discard()?;
    Ok(Some(report))
}
