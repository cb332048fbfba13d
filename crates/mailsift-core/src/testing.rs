//! Scripted fakes for the provider traits.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::provider::{
    LabelHandle, LanguageModel, Mailbox, MailboxConnector, MailboxError, ModelError, ModelHandle,
};
use crate::triage::MessageRef;

/// A message with predictable metadata.
pub fn message(id: &str) -> MessageRef {
    MessageRef::new(
        id,
        format!("thread-{id}"),
        format!("sender-{id}@example.com"),
        format!("Subject {id}"),
        "snippet",
        "Mon, 13 Oct 2025 10:00:00 +0000",
    )
}

/// Answers prompts from a script; `Err(())` simulates an unreachable server.
pub struct ScriptedModel {
    answers: Mutex<VecDeque<Result<String, ()>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedModel {
    pub fn handle(
        answers: impl IntoIterator<Item = Result<String, ()>>,
    ) -> (ModelHandle, Arc<Mutex<Vec<String>>>) {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let model = Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: Arc::clone(&prompts),
        };
        (ModelHandle::new(Arc::new(model), "test-model"), prompts)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, _model: &str, prompt: &str) -> Result<String, ModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.answers.lock().unwrap().pop_front() {
            Some(Ok(answer)) => Ok(answer),
            Some(Err(())) | None => Err(ModelError::Status {
                status: 503,
                message: "model offline".to_string(),
            }),
        }
    }
}

/// One recorded `apply_label_and_archive` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub message_id: String,
    pub label: String,
    pub archive: bool,
}

#[derive(Default)]
struct MailboxState {
    inbox: Vec<MessageRef>,
    labels: Vec<LabelHandle>,
    message_labels: BTreeMap<String, HashSet<String>>,
    archived: HashSet<String>,
    applied: Vec<Applied>,
    label_lookups: usize,
    failing: HashSet<String>,
}

/// In-memory mailbox honoring label exclusion.
#[derive(Default)]
pub struct FakeMailbox {
    state: Mutex<MailboxState>,
}

impl FakeMailbox {
    pub fn with_inbox(messages: Vec<MessageRef>) -> Arc<Self> {
        let mailbox = Self::default();
        mailbox.state.lock().unwrap().inbox = messages;
        Arc::new(mailbox)
    }

    pub fn fail_on(&self, message_id: &str) {
        self.state.lock().unwrap().failing.insert(message_id.to_string());
    }

    pub fn applied(&self) -> Vec<Applied> {
        self.state.lock().unwrap().applied.clone()
    }

    pub fn label_names(&self) -> Vec<String> {
        self.state.lock().unwrap().labels.iter().map(|l| l.name.clone()).collect()
    }

    pub fn label_lookups(&self) -> usize {
        self.state.lock().unwrap().label_lookups
    }

    pub fn labels_of(&self, message_id: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut names: Vec<_> = state
            .message_labels
            .get(message_id)
            .map(|ids| {
                state
                    .labels
                    .iter()
                    .filter(|l| ids.contains(&l.id))
                    .map(|l| l.name.clone())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn is_archived(&self, message_id: &str) -> bool {
        self.state.lock().unwrap().archived.contains(message_id)
    }
}

#[async_trait]
impl Mailbox for FakeMailbox {
    async fn list_candidate_messages(
        &self,
        exclude_labels: &[String],
        limit: usize,
    ) -> Result<Vec<MessageRef>, MailboxError> {
        let state = self.state.lock().unwrap();
        let excluded: HashSet<&str> = state
            .labels
            .iter()
            .filter(|l| exclude_labels.contains(&l.name))
            .map(|l| l.id.as_str())
            .collect();

        Ok(state
            .inbox
            .iter()
            .filter(|m| !state.archived.contains(&m.id))
            .filter(|m| {
                state
                    .message_labels
                    .get(&m.id)
                    .is_none_or(|ids| ids.iter().all(|id| !excluded.contains(id.as_str())))
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn ensure_label(&self, name: &str) -> Result<LabelHandle, MailboxError> {
        let mut state = self.state.lock().unwrap();
        state.label_lookups += 1;
        if let Some(existing) = state.labels.iter().find(|l| l.name == name) {
            return Ok(existing.clone());
        }
        let handle = LabelHandle {
            id: format!("Label_{}", state.labels.len() + 1),
            name: name.to_string(),
        };
        state.labels.push(handle.clone());
        Ok(handle)
    }

    async fn apply_label_and_archive(
        &self,
        message_id: &str,
        label: &LabelHandle,
        archive: bool,
    ) -> Result<(), MailboxError> {
        let mut state = self.state.lock().unwrap();
        if state.failing.contains(message_id) {
            return Err(MailboxError::Api {
                status: 404,
                message: format!("Requested entity {message_id} was not found."),
            });
        }
        state
            .message_labels
            .entry(message_id.to_string())
            .or_default()
            .insert(label.id.clone());
        if archive {
            state.archived.insert(message_id.to_string());
        }
        state.applied.push(Applied {
            message_id: message_id.to_string(),
            label: label.name.clone(),
            archive,
        });
        Ok(())
    }
}

/// Connector over a fixed set of fake mailboxes.
#[derive(Default)]
pub struct FakeConnector {
    mailboxes: BTreeMap<String, Arc<FakeMailbox>>,
}

impl FakeConnector {
    pub fn with(mut self, account: &str, mailbox: Arc<FakeMailbox>) -> Self {
        self.mailboxes.insert(account.to_string(), mailbox);
        self
    }
}

#[async_trait]
impl MailboxConnector for FakeConnector {
    async fn open(&self, account: &str) -> Result<Box<dyn Mailbox>, MailboxError> {
        self.mailboxes
            .get(account)
            .map(|m| Box::new(Arc::clone(m)) as Box<dyn Mailbox>)
            .ok_or_else(|| MailboxError::UnknownAccount(account.to_string()))
    }
}
