//! `prospector memory`: inspect and edit remembered facts.

use anyhow::bail;
use prospector_config::AppConfig;
use prospector_memory::{MemoryStore, backend_from_name};
use serde_json::Value;
use std::path::Path;

fn store(config: &AppConfig) -> MemoryStore {
    MemoryStore::new(backend_from_name(&config.memory.backend, &config.memory_path()))
}

/// Parse as JSON when possible so numbers and booleans keep their type.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub async fn list(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let entries = store(&config).entries().await?;

    println!("🧠 Memory ({}, {})", config.memory.backend, config.memory_path().display());
    if entries.is_empty() {
        println!("   Nothing remembered yet.");
    }
    for (key, value) in &entries {
        println!("  {key} = {value}");
    }
    Ok(())
}

pub async fn get(config_path: Option<&Path>, key: &str) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let recalled = store(&config).recall(key, None).await?;
    println!("{}", serde_json::to_string_pretty(&recalled.value)?);
    Ok(())
}

pub async fn set(config_path: Option<&Path>, key: &str, value: &str) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let value = parse_value(value);
    store(&config).remember(key, value.clone()).await?;
    println!("Remembered {key} = {value}");
    Ok(())
}

pub async fn clear(config_path: Option<&Path>, confirm: bool) -> anyhow::Result<()> {
    if !confirm {
        bail!("Refusing to clear memory without --confirm");
    }
    let config = super::load_config(config_path)?;
    store(&config).clear().await?;
    println!("Memory cleared.");
    Ok(())
}
