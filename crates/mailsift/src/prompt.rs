//! Line-based terminal prompts.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

/// Asks the user to pick one of `choices`. Returns `None` on end of input.
///
/// Choices are numbered from 1; the question repeats until the answer is valid.
pub fn select(question: &str, choices: &[String]) -> Result<Option<usize>> {
    println!("\n{question}");
    for (i, choice) in choices.iter().enumerate() {
        println!("  {}) {choice}", i + 1);
    }
    loop {
        let Some(line) = read_line("> ")? else {
            return Ok(None);
        };
        match parse_choice(&line, choices.len()) {
            Some(index) => return Ok(Some(index)),
            None => println!("Enter a number between 1 and {}.", choices.len()),
        }
    }
}

/// Yes/no question. An empty answer or end of input gives `default`.
pub fn confirm(question: &str, default: bool) -> Result<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    loop {
        let Some(line) = read_line(&format!("{question} {hint} "))? else {
            return Ok(default);
        };
        match parse_yes_no(&line, default) {
            Some(answer) => return Ok(answer),
            None => println!("Please answer y or n."),
        }
    }
}

/// Free text with an optional default shown in brackets.
///
/// Returns `None` when the answer is empty and there is no default, or on end of input.
pub fn text(question: &str, default: Option<&str>) -> Result<Option<String>> {
    let label = match default {
        Some(d) => format!("{question} [{d}] "),
        None => format!("{question} "),
    };
    let Some(line) = read_line(&label)? else {
        return Ok(None);
    };
    let answer = line.trim();
    if answer.is_empty() {
        return Ok(default.map(ToString::to_string));
    }
    Ok(Some(answer.to_string()))
}

fn read_line(label: &str) -> Result<Option<String>> {
    print!("{label}");
    io::stdout().flush().context("flushing stdout")?;

    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading from stdin")?;
    if read == 0 {
        println!();
        return Ok(None);
    }
    Ok(Some(line))
}

/// 1-based menu answer to a 0-based index.
fn parse_choice(input: &str, count: usize) -> Option<usize> {
    input
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=count).contains(n))
        .map(|n| n - 1)
}

fn parse_yes_no(input: &str, default: bool) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}
