//! Interactive drill-down over a classified run.

use anyhow::Result;
use mailsift_core::triage::truncate_chars;
use mailsift_core::{Category, ReviewItem, ReviewSession};

use crate::prompt;

/// Lets the user browse categories and recategorize or skip messages.
///
/// Returns when the user picks "Done" or input ends.
pub fn drill_down(session: &mut ReviewSession) -> Result<()> {
    loop {
        let groups = session.groups();
        let mut choices: Vec<String> = groups
            .iter()
            .map(|(category, indices)| format!("{category} ({} emails)", indices.len()))
            .collect();
        choices.push("Done - continue".to_string());

        let Some(picked) = prompt::select("Drill down into category?", &choices)? else {
            return Ok(());
        };
        let Some((category, indices)) = groups.get(picked) else {
            return Ok(());
        };

        let mut rows: Vec<String> = indices
            .iter()
            .filter_map(|&i| session.item(i))
            .map(row)
            .collect();
        rows.push("Back".to_string());

        let Some(picked) = prompt::select(&format!("Emails in {category}:"), &rows)? else {
            return Ok(());
        };
        let Some(&index) = indices.get(picked) else {
            continue;
        };

        edit(session, index, *category)?;
    }
}

fn edit(session: &mut ReviewSession, index: usize, current: Category) -> Result<()> {
    let Some(item) = session.item(index) else {
        return Ok(());
    };
    let subject = truncate_chars(&item.message.subject, 50).to_string();

    let targets: Vec<Category> = Category::ALL
        .into_iter()
        .filter(|c| *c != current)
        .collect();
    let mut actions: Vec<String> = targets.iter().map(|c| format!("Change to {c}")).collect();
    actions.push("Skip this email".to_string());
    actions.push("Back".to_string());

    match prompt::select(&format!("Action for: {subject}"), &actions)? {
        Some(i) if i < targets.len() => session.set_category(index, targets[i])?,
        Some(i) if i == targets.len() => session.set_skip(index)?,
        _ => {}
    }
    Ok(())
}

fn row(item: &ReviewItem) -> String {
    let marker = if item.result.skip() { "[skip] " } else { "" };
    format!(
        "{marker}{} - {}",
        truncate_chars(&item.message.sender, 30),
        truncate_chars(&item.message.subject, 40)
    )
}
