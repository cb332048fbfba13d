//! Gmail API v1 mailbox.
//!
//! Lists inbox messages (metadata only: From, Subject, Date and the snippet),
//! manages labels, and modifies messages. Access tokens are refreshed on
//! demand and the refreshed token is written back to the keyring.

use std::collections::BTreeSet;

use async_trait::async_trait;
use mailsift_oauth::{OAuthClient, Token};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::retry::{RetryPolicy, send_with_retry};
use super::{LabelHandle, Mailbox, MailboxConnector, MailboxError};
use crate::account::credentials;
use crate::triage::MessageRef;

/// Base URL of the signed-in user's Gmail resources.
pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Largest `maxResults` Gmail accepts for a message list.
const MAX_PAGE_SIZE: usize = 500;

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageStub>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageStub {
    id: String,
    #[serde(default)]
    thread_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageDetail {
    #[serde(default)]
    thread_id: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    payload: Option<MessagePayload>,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    headers: Vec<Header>,
}

#[derive(Debug, Deserialize)]
struct Header {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct LabelList {
    #[serde(default)]
    labels: Vec<LabelItem>,
}

#[derive(Debug, Deserialize)]
struct LabelItem {
    id: String,
    name: String,
}

impl From<LabelItem> for LabelHandle {
    fn from(item: LabelItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    email_address: String,
}

// ============================================================================
// Request helpers
// ============================================================================

/// Gmail search query for inbox messages carrying none of `labels`.
#[must_use]
pub fn build_exclusion_query(labels: &[String]) -> String {
    labels.iter().fold(String::from("is:inbox"), |mut query, label| {
        query.push_str(" AND NOT label:\"");
        query.push_str(&label.replace('"', "\\\""));
        query.push('"');
        query
    })
}

fn modify_body(label_id: &str, archive: bool) -> serde_json::Value {
    let mut body = serde_json::json!({ "addLabelIds": [label_id] });
    if archive {
        body["removeLabelIds"] = serde_json::json!(["INBOX"]);
    }
    body
}

fn message_from_detail(stub: &MessageStub, detail: MessageDetail) -> MessageRef {
    let headers = detail.payload.map(|p| p.headers).unwrap_or_default();
    let header = |name: &str| {
        headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.clone())
    };

    let thread_id = if detail.thread_id.is_empty() {
        stub.thread_id.clone()
    } else {
        detail.thread_id
    };

    MessageRef::new(
        stub.id.clone(),
        thread_id,
        header("From").unwrap_or_else(|| "Unknown".to_string()),
        header("Subject").unwrap_or_else(|| "(no subject)".to_string()),
        &detail.snippet,
        header("Date").unwrap_or_default(),
    )
}

async fn check_status(response: Response) -> Result<Response, MailboxError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(MailboxError::AuthExpired);
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(MailboxError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

/// Fetches the address of the account a token belongs to.
///
/// # Errors
///
/// Returns an error if the request fails or the token is rejected.
pub async fn fetch_profile_email(access_token: &str) -> Result<String, MailboxError> {
    let request = Client::new()
        .get(format!("{GMAIL_API_BASE}/profile"))
        .bearer_auth(access_token);
    let response = check_status(send_with_retry(request, &RetryPolicy::default()).await?).await?;
    let profile: Profile = response.json().await?;
    Ok(profile.email_address)
}

// ============================================================================
// Mailbox
// ============================================================================

/// One Gmail account.
#[derive(Debug)]
pub struct GmailMailbox {
    account: String,
    api_base: String,
    http: Client,
    oauth: OAuthClient,
    token: Mutex<Token>,
    retry: RetryPolicy,
}

impl GmailMailbox {
    /// Creates a mailbox for `account` authorized by `token`.
    #[must_use]
    pub fn new(account: impl Into<String>, token: Token, oauth: OAuthClient) -> Self {
        Self {
            account: account.into(),
            api_base: GMAIL_API_BASE.to_string(),
            http: Client::new(),
            oauth,
            token: Mutex::new(token),
            retry: RetryPolicy::default(),
        }
    }

    /// Points the mailbox at another API base URL.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Current access token, refreshed and persisted first if it expired.
    async fn access_token(&self) -> Result<String, MailboxError> {
        let mut token = self.token.lock().await;
        if token.is_expired() {
            debug!("Access token for {} expired, refreshing", self.account);
            let refreshed = self.oauth.refresh_token(&token).await?;
            if let Err(e) = credentials::store_oauth_token(&self.account, &refreshed) {
                warn!("Could not persist refreshed token for {}: {e}", self.account);
            }
            *token = refreshed;
        }
        Ok(token.access_token.clone())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, MailboxError> {
        let token = self.access_token().await?;
        let response = send_with_retry(request.bearer_auth(token), &self.retry).await?;
        check_status(response).await
    }

    async fn fetch_metadata(&self, stub: &MessageStub) -> Result<MessageRef, MailboxError> {
        let request = self
            .http
            .get(format!("{}/messages/{}", self.api_base, stub.id))
            .query(&[
                ("format", "metadata"),
                ("metadataHeaders", "From"),
                ("metadataHeaders", "Subject"),
                ("metadataHeaders", "Date"),
            ]);
        let detail: MessageDetail = self.send(request).await?.json().await?;
        Ok(message_from_detail(stub, detail))
    }
}

#[async_trait]
impl Mailbox for GmailMailbox {
    async fn list_candidate_messages(
        &self,
        exclude_labels: &[String],
        limit: usize,
    ) -> Result<Vec<MessageRef>, MailboxError> {
        let query = build_exclusion_query(exclude_labels);
        debug!("Listing {} with q={query}", self.account);

        let mut stubs: Vec<MessageStub> = Vec::new();
        let mut page_token: Option<String> = None;
        while stubs.len() < limit {
            let page_size = (limit - stubs.len()).min(MAX_PAGE_SIZE).to_string();
            let mut request = self
                .http
                .get(format!("{}/messages", self.api_base))
                .query(&[("q", query.as_str()), ("maxResults", page_size.as_str())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: MessageListResponse = self.send(request).await?.json().await?;
            stubs.extend(page.messages);
            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }
        stubs.truncate(limit);

        let mut messages = Vec::with_capacity(stubs.len());
        for stub in &stubs {
            match self.fetch_metadata(stub).await {
                Ok(message) => messages.push(message),
                Err(e) => warn!("Skipping message {}: {e}", stub.id),
            }
        }
        info!("{}: {} untriaged messages", self.account, messages.len());
        Ok(messages)
    }

    async fn ensure_label(&self, name: &str) -> Result<LabelHandle, MailboxError> {
        let request = self.http.get(format!("{}/labels", self.api_base));
        let existing: LabelList = self.send(request).await?.json().await?;
        if let Some(label) = existing.labels.into_iter().find(|l| l.name == name) {
            return Ok(label.into());
        }

        let body = serde_json::json!({
            "name": name,
            "labelListVisibility": "labelShow",
            "messageListVisibility": "show",
        });
        let request = self
            .http
            .post(format!("{}/labels", self.api_base))
            .json(&body);
        let created: LabelItem = self.send(request).await?.json().await?;
        info!("Created label '{}' for {}", created.name, self.account);
        Ok(created.into())
    }

    async fn apply_label_and_archive(
        &self,
        message_id: &str,
        label: &LabelHandle,
        archive: bool,
    ) -> Result<(), MailboxError> {
        let request = self
            .http
            .post(format!("{}/messages/{message_id}/modify", self.api_base))
            .json(&modify_body(&label.id, archive));
        self.send(request).await?;
        Ok(())
    }
}

/// Opens Gmail mailboxes from tokens stored in the keyring.
#[derive(Debug, Clone)]
pub struct GmailConnector {
    oauth: OAuthClient,
    accounts: BTreeSet<String>,
}

impl GmailConnector {
    /// Creates a connector for the configured account nicknames.
    #[must_use]
    pub fn new(oauth: OAuthClient, accounts: impl IntoIterator<Item = String>) -> Self {
        Self {
            oauth,
            accounts: accounts.into_iter().collect(),
        }
    }
}

#[async_trait]
impl MailboxConnector for GmailConnector {
    async fn open(&self, account: &str) -> Result<Box<dyn Mailbox>, MailboxError> {
        if !self.accounts.contains(account) {
            return Err(MailboxError::UnknownAccount(account.to_string()));
        }
        let token = credentials::get_oauth_token(account)?
            .ok_or_else(|| MailboxError::MissingToken(account.to_string()))?;
        Ok(Box::new(GmailMailbox::new(
            account,
            token,
            self.oauth.clone(),
        )))
    }
}
