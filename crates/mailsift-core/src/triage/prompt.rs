//! Prompt construction and model answer parsing.

use std::fmt::Write as _;

use serde_json::Value;

use super::model::{Category, MessageRef, truncate_chars};

/// Snippet characters included per message in a summary prompt.
const SUMMARY_SNIPPET_CHARS: usize = 100;

/// Builds the classification prompt for one message.
#[must_use]
pub fn classification_prompt(message: &MessageRef) -> String {
    let mut prompt = String::from("Classify this email into exactly one category:\n");
    for category in Category::ALL {
        let _ = writeln!(prompt, "- {}: {}", category.as_str(), category.description());
    }
    let _ = write!(
        prompt,
        "\nEmail:\nFrom: {}\nSubject: {}\nPreview: {}\nDate: {}\n\n\
         Respond with JSON only:\n{{\"category\": \"...\", \"reason\": \"one sentence\"}}",
        message.sender, message.subject, message.snippet, message.date
    );
    prompt
}

/// Builds the prompt asking for one bullet per message.
#[must_use]
pub fn summary_prompt(messages: &[&MessageRef]) -> String {
    let emails = messages
        .iter()
        .map(|m| {
            format!(
                "- From: {}, Subject: {}, Preview: {}",
                m.sender,
                m.subject,
                truncate_chars(&m.snippet, SUMMARY_SNIPPET_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Summarize these emails in a bullet list. Each bullet should be one short sentence \
         describing what the email is about.\n\nEmails:\n{emails}\n\n\
         Respond with bullet points only, one per email."
    )
}

/// Outcome of parsing a classification answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedAnswer {
    /// A valid category was found.
    Classified {
        /// The category.
        category: Category,
        /// The model's reason (may be empty).
        reason: String,
    },
    /// The answer was unusable; the reason says why.
    Unusable(String),
}

/// Parses `{"category": "...", "reason": "..."}` out of a model answer.
///
/// Text around the object is ignored. A missing `category` means FYI; a
/// non-string `reason` is kept in its JSON form.
#[must_use]
pub fn parse_classification(answer: &str) -> ParsedAnswer {
    let trimmed = answer.trim();
    let candidate = extract_json_object(trimmed).unwrap_or(trimmed);

    let value: Value = match serde_json::from_str(candidate) {
        Ok(value) => value,
        Err(e) => return ParsedAnswer::Unusable(format!("Failed to parse response: {e}")),
    };
    let Value::Object(fields) = value else {
        return ParsedAnswer::Unusable(
            "Failed to parse response: expected a JSON object".to_string(),
        );
    };

    let raw_category = match fields.get("category") {
        None | Some(Value::Null) => Category::Fyi.as_str().to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    let Some(category) = Category::try_parse(&raw_category) else {
        return ParsedAnswer::Unusable(format!("Unknown category: {raw_category}"));
    };

    let reason = match fields.get("reason") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    ParsedAnswer::Classified { category, reason }
}

/// Returns the first balanced `{...}` span, honoring JSON string escapes.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}
