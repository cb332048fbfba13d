//! Triage data models.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Longest snippet kept on a [`MessageRef`], in characters.
pub const SNIPPET_MAX_CHARS: usize = 200;

/// Action category assigned to one message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// Requires a response from the user.
    NeedsReply,
    /// Requires the user to do something other than reply.
    NeedsAction,
    /// Informational. Also the safe fallback for anything unclassifiable.
    #[default]
    Fyi,
    /// Low value; labelled and moved out of the inbox.
    Archive,
    /// Spam or irrelevant; labelled and moved out of the inbox.
    Ignore,
}

impl Category {
    /// Every category, in summary order.
    pub const ALL: [Self; 5] = [
        Self::NeedsReply,
        Self::NeedsAction,
        Self::Fyi,
        Self::Archive,
        Self::Ignore,
    ];

    /// Exact parse of a stored or model-produced value.
    ///
    /// Only the wire names match; `"archive"` or `" IGNORE"` do not.
    #[must_use]
    pub fn try_parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    /// Case-insensitive match for config keys and command-line arguments.
    ///
    /// Never used for model answers or stored results.
    #[must_use]
    pub fn from_key(s: &str) -> Option<Self> {
        let key = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(key))
    }

    /// Total parse; anything but an exact wire name becomes [`Category::Fyi`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        Self::try_parse(s).unwrap_or_default()
    }

    /// Wire representation (`NEEDS_REPLY`, `FYI`, ...).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NeedsReply => "NEEDS_REPLY",
            Self::NeedsAction => "NEEDS_ACTION",
            Self::Fyi => "FYI",
            Self::Archive => "ARCHIVE",
            Self::Ignore => "IGNORE",
        }
    }

    /// Human-readable name used in summaries.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::NeedsReply => "NEEDS REPLY",
            Self::NeedsAction => "NEEDS ACTION",
            Self::Fyi => "FYI",
            Self::Archive => "ARCHIVE",
            Self::Ignore => "IGNORE",
        }
    }

    /// One-line description given to the model.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::NeedsReply => "Requires a response from me",
            Self::NeedsAction => "Requires me to do something (not a reply)",
            Self::Fyi => "Informational, read later, no action needed",
            Self::Archive => "Low value, newsletters I don't read, notifications",
            Self::Ignore => "Spam, marketing, completely irrelevant",
        }
    }

    /// Default mailbox label name.
    #[must_use]
    pub const fn default_label(&self) -> &'static str {
        match self {
            Self::NeedsReply => "Auto/Needs Reply",
            Self::NeedsAction => "Auto/Needs Action",
            Self::Fyi => "Auto/FYI",
            Self::Archive => "Auto/Archive",
            Self::Ignore => "Auto/Ignore",
        }
    }

    /// Whether applying this category also removes the message from the inbox.
    #[must_use]
    pub const fn archives_on_apply(&self) -> bool {
        matches!(self, Self::Archive | Self::Ignore)
    }

    /// Whether the summary lists these messages (otherwise it only counts them).
    #[must_use]
    pub const fn summarized(&self) -> bool {
        matches!(self, Self::NeedsReply | Self::NeedsAction | Self::Fyi)
    }

    const fn index(self) -> usize {
        match self {
            Self::NeedsReply => 0,
            Self::NeedsAction => 1,
            Self::Fyi => 2,
            Self::Archive => 3,
            Self::Ignore => 4,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// How one category is applied to a mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPolicy {
    /// The category this policy covers.
    pub category: Category,
    /// Label name in the mailbox.
    pub label: String,
    /// Remove from inbox when applied.
    pub archives_on_apply: bool,
    /// Listed in the summary rather than only counted.
    pub summarized: bool,
}

impl CategoryPolicy {
    fn new(category: Category, label: String) -> Self {
        Self {
            category,
            label,
            archives_on_apply: category.archives_on_apply(),
            summarized: category.summarized(),
        }
    }
}

/// Policy for every category. Always total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    policies: [CategoryPolicy; 5],
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            policies: Category::ALL.map(|c| CategoryPolicy::new(c, c.default_label().to_string())),
        }
    }
}

impl PolicyTable {
    /// Builds the table from a `category value -> label name` map.
    ///
    /// Missing or blank entries use the default label; unknown keys are ignored.
    #[must_use]
    pub fn from_labels(labels: &BTreeMap<String, String>) -> Self {
        let mut table = Self::default();
        for (key, name) in labels {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            if let Some(category) = Category::from_key(key) {
                table.policies[category.index()].label = name.to_string();
            }
        }
        table
    }

    /// Policy for one category.
    #[must_use]
    pub const fn get(&self, category: Category) -> &CategoryPolicy {
        &self.policies[category.index()]
    }

    /// Label name for one category.
    #[must_use]
    pub fn label(&self, category: Category) -> &str {
        &self.get(category).label
    }

    /// Every category label, used to exclude already-triaged messages.
    #[must_use]
    pub fn exclusion_labels(&self) -> Vec<String> {
        self.policies.iter().map(|p| p.label.clone()).collect()
    }

    /// Iterates policies in category order.
    pub fn iter(&self) -> impl Iterator<Item = &CategoryPolicy> {
        self.policies.iter()
    }
}

/// Metadata of one inbox message. Never carries the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    /// Provider message id.
    pub id: String,
    /// Provider thread id.
    pub thread_id: String,
    /// `From` header.
    pub sender: String,
    /// `Subject` header.
    pub subject: String,
    /// Body preview, at most [`SNIPPET_MAX_CHARS`] characters.
    pub snippet: String,
    /// `Date` header, verbatim.
    pub date: String,
}

impl MessageRef {
    /// Creates a message reference, truncating the snippet.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        thread_id: impl Into<String>,
        sender: impl Into<String>,
        subject: impl Into<String>,
        snippet: &str,
        date: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            thread_id: thread_id.into(),
            sender: sender.into(),
            subject: subject.into(),
            snippet: truncate_chars(snippet, SNIPPET_MAX_CHARS).to_string(),
            date: date.into(),
        }
    }
}

/// Where a result's category came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    /// Parsed from a well-formed model answer.
    #[default]
    Model,
    /// Safe default after a model or parse failure. Always [`Category::Fyi`].
    Fallback,
    /// Set by the user during review.
    Manual,
}

/// Category and rationale for one message.
///
/// Fields are private so a fallback can only ever carry [`Category::Fyi`];
/// only [`ClassificationResult::set_category`] can pick an arbitrary category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    message_id: String,
    category: Category,
    reason: String,
    skip: bool,
    source: ResultSource,
}

impl ClassificationResult {
    /// A result taken from the model's answer.
    #[must_use]
    pub fn classified(
        message_id: impl Into<String>,
        category: Category,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            category,
            reason: reason.into(),
            skip: false,
            source: ResultSource::Model,
        }
    }

    /// The safe default used whenever classification fails.
    #[must_use]
    pub fn fallback(message_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            category: Category::Fyi,
            reason: reason.into(),
            skip: false,
            source: ResultSource::Fallback,
        }
    }

    /// Rebuilds a stored result with its recorded source.
    ///
    /// A [`ResultSource::Fallback`] source on anything but FYI is not
    /// believed and is kept as [`ResultSource::Manual`].
    #[must_use]
    pub fn restored(
        message_id: impl Into<String>,
        category: Category,
        reason: impl Into<String>,
        skip: bool,
        source: ResultSource,
    ) -> Self {
        let source = match source {
            ResultSource::Fallback if category != Category::Fyi => ResultSource::Manual,
            other => other,
        };
        Self {
            message_id: message_id.into(),
            category,
            reason: reason.into(),
            skip,
            source,
        }
    }

    /// Manual override. Any category is allowed and the result is no longer skipped.
    pub fn set_category(&mut self, category: Category) {
        self.category = category;
        self.skip = false;
        self.source = ResultSource::Manual;
    }

    /// Excludes this message from labelling and archiving.
    pub const fn set_skip(&mut self) {
        self.skip = true;
        self.source = ResultSource::Manual;
    }

    /// Message this result belongs to.
    #[must_use]
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Assigned category.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    /// One-sentence rationale (may be empty).
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Whether the message is left untouched on apply.
    #[must_use]
    pub const fn skip(&self) -> bool {
        self.skip
    }

    /// Origin of the category.
    #[must_use]
    pub const fn source(&self) -> ResultSource {
        self.source
    }
}

/// Returns at most `max` characters of `s`, cut on a char boundary.
#[must_use]
pub fn truncate_chars(s: &str, max: usize) -> &str {
    s.char_indices().nth(max).map_or(s, |(idx, _)| &s[..idx])
}
