//! Digest of a classification run.

use tracing::warn;

use super::model::{Category, ClassificationResult, MessageRef, truncate_chars};
use super::prompt::summary_prompt;
use crate::provider::ModelHandle;

/// Subject characters kept in a fallback bullet.
const FALLBACK_SUBJECT_CHARS: usize = 50;

/// Builds the run digest.
///
/// Summarized categories get a header and one model call producing a bullet
/// per message; if that call fails or returns nothing the bullets are built
/// locally as `sender: subject`. Archiving categories only get a count line.
/// Empty categories are omitted. `messages` and `results` are index-aligned.
pub async fn summarize(
    messages: &[MessageRef],
    results: &[ClassificationResult],
    model: &ModelHandle,
) -> String {
    let mut lines = Vec::new();

    for category in Category::ALL {
        let group: Vec<&MessageRef> = messages
            .iter()
            .zip(results)
            .filter(|(_, r)| r.category() == category)
            .map(|(m, _)| m)
            .collect();
        if group.is_empty() {
            continue;
        }
        let count = group.len();

        if !category.summarized() {
            lines.push(format!("\n{}: {count} {}", category.as_str(), plural(count)));
            continue;
        }

        lines.push(format!(
            "\n{} ({count} {}):",
            category.display_name(),
            plural(count)
        ));

        let bullets = match model.complete(&summary_prompt(&group)).await {
            Ok(answer) => normalize_bullets(&answer),
            Err(e) => {
                warn!("Summary for {category} failed: {e}");
                Vec::new()
            }
        };
        if bullets.is_empty() {
            lines.extend(group.iter().map(|m| fallback_bullet(m)));
        } else {
            lines.extend(bullets);
        }
    }

    lines.join("\n")
}

const fn plural(count: usize) -> &'static str {
    if count == 1 { "email" } else { "emails" }
}

fn fallback_bullet(message: &MessageRef) -> String {
    format!(
        "• {}: {}",
        message.sender,
        truncate_chars(&message.subject, FALLBACK_SUBJECT_CHARS)
    )
}

/// Rewrites each non-blank line as a `• ` bullet, whatever marker the model used.
fn normalize_bullets(answer: &str) -> Vec<String> {
    answer
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let text = line.trim_start_matches(['*', '-', '•', ' ']);
            format!("• {text}")
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedModel, message};

    fn classified(id: &str, category: Category) -> ClassificationResult {
        ClassificationResult::classified(id, category, "")
    }

    #[tokio::test]
    async fn test_disposable_categories_are_counted_only() {
        let messages = vec![message("a"), message("b"), message("c")];
        let results = vec![
            classified("a", Category::Archive),
            classified("b", Category::Ignore),
            classified("c", Category::Archive),
        ];
        let (model, prompts) = ScriptedModel::handle([]);

        let digest = summarize(&messages, &results, &model).await;

        assert_eq!(digest, "\nARCHIVE: 2 emails\n\nIGNORE: 1 email");
        assert!(prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summarized_category_lists_bullets() {
        let messages = vec![message("a"), message("b")];
        let results = vec![
            classified("a", Category::NeedsReply),
            classified("b", Category::Archive),
        ];
        let (model, prompts) =
            ScriptedModel::handle([Ok("* John asks if you are free Thursday".to_string())]);

        let digest = summarize(&messages, &results, &model).await;

        assert_eq!(
            digest,
            "\nNEEDS REPLY (1 email):\n• John asks if you are free Thursday\n\nARCHIVE: 1 email"
        );
        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Subject: Subject a"));
        assert!(!prompts[0].contains("Subject: Subject b"));
    }

    #[tokio::test]
    async fn test_summary_order_and_fallback() {
        let messages = vec![message("fyi"), message("act"), message("reply")];
        let results = vec![
            classified("fyi", Category::Fyi),
            classified("act", Category::NeedsAction),
            classified("reply", Category::NeedsReply),
        ];
        let (model, _) = ScriptedModel::handle([
            Ok("- replied bullet".to_string()),
            Err(()),
            Ok("   \n".to_string()),
        ]);

        let digest = summarize(&messages, &results, &model).await;

        assert_eq!(
            digest,
            "\nNEEDS REPLY (1 email):\n• replied bullet\
             \n\nNEEDS ACTION (1 email):\n• sender-act@example.com: Subject act\
             \n\nFYI (1 email):\n• sender-fyi@example.com: Subject fyi"
        );
    }

    #[test]
    fn test_normalize_bullets() {
        let answer = "Here is the list:\n\n* first\n- second\n  • third\n** nested";
        assert_eq!(
            normalize_bullets(answer),
            vec![
                "• Here is the list:",
                "• first",
                "• second",
                "• third",
                "• nested"
            ]
        );
    }

    #[test]
    fn test_fallback_bullet_truncates_subject() {
        let mut msg = message("a");
        msg.subject = "s".repeat(80);
        assert_eq!(
            fallback_bullet(&msg),
            format!("• sender-a@example.com: {}", "s".repeat(50))
        );
    }
}
