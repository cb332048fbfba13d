//! `mailsift settings`: model, labels, and run size.

use anyhow::{Context as _, Result, anyhow, bail};
use mailsift_core::Category;

use crate::context::Context;
use crate::prompt;

pub fn show(ctx: &Context) {
    let config = &ctx.config;
    println!("Config file:        {}", ctx.paths.config_file().display());
    println!("Model:              {}", config.model);
    println!("Ollama URL:         {}", config.ollama_url);
    println!("Max emails per run: {}", config.max_emails_per_run);
    println!("Labels:");
    for policy in ctx.policies().iter() {
        let archive = if policy.archives_on_apply {
            " (archives)"
        } else {
            ""
        };
        println!("  {:<13} {}{archive}", policy.category, policy.label);
    }
}

/// Switches the model, provided Ollama already has it.
pub async fn set_model(ctx: &mut Context, name: &str) -> Result<()> {
    let name = name.trim();
    let available = ctx
        .ollama()
        .has_model(name)
        .await
        .context("could not reach Ollama to check the model")?;
    if !available {
        bail!("Model '{name}' not found in Ollama.");
    }
    ctx.config.set_model(name)?;
    ctx.save_config()?;
    println!("Model changed to {name}");
    Ok(())
}

pub fn set_max_emails(ctx: &mut Context, value: &str) -> Result<()> {
    ctx.config.set_max_emails(value)?;
    ctx.save_config()?;
    println!("Max emails set to {}", ctx.config.max_emails_per_run);
    Ok(())
}

pub fn set_label(ctx: &mut Context, category: &str, name: &str) -> Result<()> {
    let category = parse_category(category)?;
    ctx.config.set_label(category, name)?;
    ctx.save_config()?;
    println!("{category} messages will be labelled '{}'", name.trim());
    Ok(())
}

/// Menu flow. Errors from individual changes are printed, not returned.
pub async fn menu(ctx: &mut Context) -> Result<()> {
    loop {
        let choices = [
            format!("Change model (current: {})", ctx.config.model),
            "Customize label names".to_string(),
            format!(
                "Max emails per run (current: {})",
                ctx.config.max_emails_per_run
            ),
            "Back".to_string(),
        ];

        let outcome = match prompt::select("Settings:", &choices)? {
            Some(0) => match prompt::text("Enter model name:", Some(ctx.config.model.as_str()))? {
                Some(name) => set_model(ctx, &name).await,
                None => Ok(()),
            },
            Some(1) => edit_labels(ctx),
            Some(2) => {
                let current = ctx.config.max_emails_per_run.to_string();
                match prompt::text("Enter max emails per run:", Some(current.as_str()))? {
                    Some(value) => set_max_emails(ctx, &value),
                    None => Ok(()),
                }
            }
            _ => return Ok(()),
        };
        if let Err(e) = outcome {
            println!("{e:#}");
        }
    }
}

fn edit_labels(ctx: &mut Context) -> Result<()> {
    let policies = ctx.policies();
    println!("\nCurrent label mappings:");
    for policy in policies.iter() {
        println!("  {}: {}", policy.category, policy.label);
    }
    println!();

    for policy in policies.iter() {
        let question = format!("Label for {}:", policy.category);
        if let Some(name) = prompt::text(&question, Some(policy.label.as_str()))? {
            ctx.config.set_label(policy.category, &name)?;
        }
    }
    ctx.save_config()?;
    println!("Labels updated.");
    Ok(())
}

fn parse_category(value: &str) -> Result<Category> {
    Category::from_key(value).ok_or_else(|| {
        let known: Vec<&str> = Category::ALL.iter().map(Category::as_str).collect();
        anyhow!(
            "Unknown category '{value}'; expected one of {}",
            known.join(", ")
        )
    })
}
