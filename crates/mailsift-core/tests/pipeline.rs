//! End-to-end triage runs against in-memory providers.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mailsift_core::triage::{apply_pending, ensure_ready, fetch_and_classify, summarize};
use mailsift_core::{
    Category, Config, Error, LabelHandle, LanguageModel, Mailbox, MailboxConnector, MailboxError,
    MessageRef, ModelError, ModelHandle, Paths, PendingStore, ReviewSession,
};

#[derive(Default)]
struct Inbox {
    messages: Vec<MessageRef>,
    labels: BTreeMap<String, String>,
    tagged: HashMap<String, Vec<String>>,
    archived: Vec<String>,
}

#[derive(Default, Clone)]
struct MemoryMailbox(Arc<Mutex<Inbox>>);

impl MemoryMailbox {
    fn new(messages: Vec<MessageRef>) -> Self {
        let inbox = Inbox {
            messages,
            ..Inbox::default()
        };
        Self(Arc::new(Mutex::new(inbox)))
    }

    fn tags(&self, id: &str) -> Vec<String> {
        self.0.lock().unwrap().tagged.get(id).cloned().unwrap_or_default()
    }

    fn archived(&self) -> Vec<String> {
        self.0.lock().unwrap().archived.clone()
    }
}

#[async_trait]
impl Mailbox for MemoryMailbox {
    async fn list_candidate_messages(
        &self,
        exclude_labels: &[String],
        limit: usize,
    ) -> Result<Vec<MessageRef>, MailboxError> {
        let inbox = self.0.lock().unwrap();
        Ok(inbox
            .messages
            .iter()
            .filter(|m| !inbox.archived.contains(&m.id))
            .filter(|m| {
                inbox
                    .tagged
                    .get(&m.id)
                    .is_none_or(|tags| tags.iter().all(|t| !exclude_labels.contains(t)))
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn ensure_label(&self, name: &str) -> Result<LabelHandle, MailboxError> {
        let mut inbox = self.0.lock().unwrap();
        let next = format!("Label_{}", inbox.labels.len());
        let id = inbox.labels.entry(name.to_string()).or_insert(next).clone();
        Ok(LabelHandle {
            id,
            name: name.to_string(),
        })
    }

    async fn apply_label_and_archive(
        &self,
        message_id: &str,
        label: &LabelHandle,
        archive: bool,
    ) -> Result<(), MailboxError> {
        let mut inbox = self.0.lock().unwrap();
        inbox
            .tagged
            .entry(message_id.to_string())
            .or_default()
            .push(label.name.clone());
        if archive {
            inbox.archived.push(message_id.to_string());
        }
        Ok(())
    }
}

struct Connector(HashMap<String, MemoryMailbox>);

#[async_trait]
impl MailboxConnector for Connector {
    async fn open(&self, account: &str) -> Result<Box<dyn Mailbox>, MailboxError> {
        self.0
            .get(account)
            .cloned()
            .map(|m| Box::new(m) as Box<dyn Mailbox>)
            .ok_or_else(|| MailboxError::UnknownAccount(account.to_string()))
    }
}

/// Classifies by keyword in the subject and summarizes with a fixed bullet.
struct KeywordModel;

#[async_trait]
impl LanguageModel for KeywordModel {
    async fn complete(&self, _model: &str, prompt: &str) -> Result<String, ModelError> {
        if prompt.starts_with("Summarize") {
            return Ok("- Invoice from Acme is due Friday".to_string());
        }
        let category = if prompt.contains("Subject: Invoice") {
            "NEEDS_REPLY"
        } else if prompt.contains("Subject: Sale") {
            "ARCHIVE"
        } else if prompt.contains("Subject: Lottery") {
            "IGNORE"
        } else {
            "FYI"
        };
        Ok(format!(
            "Sure! {{\"category\": \"{category}\", \"reason\": \"keyword\"}}"
        ))
    }
}

fn message(id: &str, subject: &str) -> MessageRef {
    MessageRef::new(
        id,
        id,
        "Acme <billing@acme.test>",
        subject,
        "body preview",
        "Mon, 13 Oct 2025 10:00:00 +0000",
    )
}

#[tokio::test]
async fn test_save_then_apply_pending_run() {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::new(dir.path());
    let mut config = Config::default();
    config.add_account("Work", "me@work.test").unwrap();
    config.save(&paths.config_file()).unwrap();

    let config = Config::load(&paths.config_file());
    let policies = config.policies();
    let store = PendingStore::new(paths.pending_file());
    let model = ModelHandle::new(Arc::new(KeywordModel), config.model.clone());

    let mailbox = MemoryMailbox::new(vec![
        message("1", "Invoice 42"),
        message("2", "Sale ends tonight"),
        message("3", "Lottery winner"),
        message("4", "Team offsite"),
    ]);
    let connector = Connector(HashMap::from([("work".to_string(), mailbox.clone())]));

    ensure_ready(&store).unwrap();
    let batch = fetch_and_classify("work", &mailbox, &model, &policies, 10, |_, _| {})
        .await
        .unwrap();
    let summary = summarize(&batch.messages, &batch.results, &model).await;
    assert!(summary.contains("NEEDS REPLY (1 email):"));
    assert!(summary.contains("ARCHIVE: 1 email"));

    let mut session = ReviewSession::new(batch.into_review_items());
    session.set_category(3, Category::Archive).unwrap();
    store.save_run(&session.to_pending_run()).unwrap();

    assert!(matches!(ensure_ready(&store), Err(Error::PendingExists)));
    assert!(mailbox.archived().is_empty());

    let report = apply_pending(&store, &connector, &policies)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.applied, 4);
    assert_eq!(report.failed, 0);
    assert!(!store.is_present());

    assert_eq!(mailbox.tags("1"), vec!["Auto/Needs Reply".to_string()]);
    assert_eq!(mailbox.tags("4"), vec!["Auto/Archive".to_string()]);
    let mut archived = mailbox.archived();
    archived.sort();
    assert_eq!(archived, vec!["2", "3", "4"]);

    let again = fetch_and_classify("work", &mailbox, &model, &policies, 10, |_, _| {})
        .await
        .unwrap();
    assert!(again.is_empty());
}

#[tokio::test]
async fn test_custom_labels_are_used_for_exclusion() {
    let mut config = Config::default();
    config.set_label(Category::Fyi, "Triage/Later").unwrap();
    let policies = config.policies();
    let model = ModelHandle::new(Arc::new(KeywordModel), "any");

    let mailbox = MemoryMailbox::new(vec![message("1", "Team offsite")]);
    let connector = Connector(HashMap::from([("work".to_string(), mailbox.clone())]));

    let batch = fetch_and_classify("work", &mailbox, &model, &policies, 10, |_, _| {})
        .await
        .unwrap();
    let session = ReviewSession::new(batch.into_review_items());
    let report = mailsift_core::triage::apply_items(&connector, &policies, session.items()).await;
    assert_eq!(report.applied, 1);
    assert_eq!(mailbox.tags("1"), vec!["Triage/Later".to_string()]);
    assert!(mailbox.archived().is_empty());

    let again = fetch_and_classify("work", &mailbox, &model, &policies, 10, |_, _| {})
        .await
        .unwrap();
    assert!(again.is_empty());
}
