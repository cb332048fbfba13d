//! Classification engine and batch classifier.

use tracing::{debug, warn};

use super::model::{ClassificationResult, MessageRef};
use super::prompt::{ParsedAnswer, classification_prompt, parse_classification};
use crate::provider::ModelHandle;

/// Classifies one message with exactly one model call.
///
/// Never fails: model errors and unusable answers produce an FYI fallback
/// whose reason records what went wrong.
pub async fn classify(message: &MessageRef, model: &ModelHandle) -> ClassificationResult {
    let prompt = classification_prompt(message);

    let answer = match model.complete(&prompt).await {
        Ok(answer) => answer,
        Err(e) => {
            warn!("Classification of {} failed: {e}", message.id);
            return ClassificationResult::fallback(
                message.id.clone(),
                format!("Classification failed: {e}"),
            );
        }
    };

    match parse_classification(&answer) {
        ParsedAnswer::Classified { category, reason } => {
            debug!("Classified {} as {category}", message.id);
            ClassificationResult::classified(message.id.clone(), category, reason)
        }
        ParsedAnswer::Unusable(reason) => {
            warn!("Falling back to FYI for {}: {reason}", message.id);
            ClassificationResult::fallback(message.id.clone(), reason)
        }
    }
}

/// Classifies messages sequentially, in input order.
///
/// The output is index-aligned with `messages` and always the same length.
/// `progress` is called with `(completed, total)` after each message.
pub async fn classify_all<F>(
    messages: &[MessageRef],
    model: &ModelHandle,
    mut progress: F,
) -> Vec<ClassificationResult>
where
    F: FnMut(usize, usize),
{
    let total = messages.len();
    let mut results = Vec::with_capacity(total);
    for (i, message) in messages.iter().enumerate() {
        results.push(classify(message, model).await);
        progress(i + 1, total);
    }
    results
}
