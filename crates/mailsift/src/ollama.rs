//! Checks that the local model runtime is usable before a run.

use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{Result, bail};
use mailsift_core::OllamaClient;
use tracing::{debug, warn};

use crate::prompt;

/// How long `ollama serve` gets before the runtime is checked again.
const STARTUP_WAIT: Duration = Duration::from_secs(2);

/// Fails unless Ollama answers and `model` is pulled.
///
/// When the runtime is down and `interactive` is set, offers to start it.
pub async fn ensure_ready(client: &OllamaClient, model: &str, interactive: bool) -> Result<()> {
    if !client.is_running().await && !(interactive && offer_start(client).await?) {
        bail!(
            "Ollama is not running at {}. Start it with `ollama serve`.",
            client.base_url()
        );
    }

    if !client.has_model(model).await? {
        bail!("Model '{model}' not found. Install with: ollama pull {model}");
    }
    Ok(())
}

/// Startup check for the menu: prints a warning instead of failing.
pub async fn warn_if_unready(client: &OllamaClient, model: &str) -> Result<()> {
    if !client.is_running().await {
        if !offer_start(client).await? {
            println!("Warning: Ollama is not running. Start it before classifying emails.");
        }
        return Ok(());
    }
    match client.has_model(model).await {
        Ok(true) => {}
        Ok(false) => println!("Model '{model}' not found. Install with: ollama pull {model}"),
        Err(e) => warn!("Could not list Ollama models: {e}"),
    }
    Ok(())
}

async fn offer_start(client: &OllamaClient) -> Result<bool> {
    if !prompt::confirm("Ollama not running. Start it now?", true)? {
        return Ok(false);
    }

    match Command::new("ollama")
        .arg("serve")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => debug!("Spawned ollama serve (pid {})", child.id()),
        Err(e) => {
            println!("Could not start Ollama: {e}");
            return Ok(false);
        }
    }

    println!("Started Ollama. Waiting for it to be ready...");
    tokio::time::sleep(STARTUP_WAIT).await;
    Ok(client.is_running().await)
}
