//! Email triage pipeline.
//!
//! Messages are classified by a local language model into one of five
//! [`Category`] values, summarized, reviewed, and then either applied to the
//! mailbox as labels (archiving low-value categories) or saved to the
//! single-slot [`PendingStore`] for later.
//!
//! # Idempotency
//!
//! There is no local record of processed messages. Candidate messages are
//! listed with every category label excluded, so anything labelled by an
//! earlier run is invisible to the next one.
//!
//! # Example
//!
//! ```ignore
//! use mailsift_core::triage::{PolicyTable, fetch_and_classify, summarize};
//!
//! let policies = PolicyTable::from_labels(&config.labels);
//! let batch = fetch_and_classify("work", &mailbox, &model, &policies, 100, |done, total| {
//!     eprint!("\rClassifying... [{done}/{total}]");
//! })
//! .await?;
//!
//! println!("{}", summarize(&batch.messages, &batch.results, &model).await);
//! ```

mod apply;
mod classifier;
mod model;
mod pending;
mod pipeline;
pub mod prompt;
mod review;
mod summary;

pub use apply::{ApplyReport, apply};
pub use classifier::{classify, classify_all};
pub use model::{
    Category, CategoryPolicy, ClassificationResult, MessageRef, PolicyTable, ResultSource,
    SNIPPET_MAX_CHARS, truncate_chars,
};
pub use pending::{PendingEntry, PendingRun, PendingState, PendingStore};
pub use pipeline::{
    AccountBatch, apply_grouped, apply_items, apply_pending, ensure_ready, fetch_and_classify,
};
pub use review::{ReviewItem, ReviewSession};
pub use summary::summarize;
