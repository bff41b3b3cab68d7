//! `prospector config`: configuration checks.

use prospector_config::AppConfig;
use std::path::Path;

/// Environment secret each adapter reads, by adapter name.
const ADAPTER_SECRETS: [(&str, &str); 5] = [
    ("apollo", "APOLLO_API_KEY"),
    ("firecrawl", "FIRECRAWL_API_KEY"),
    ("sendgrid", "SENDGRID_API_KEY"),
    ("mailersend", "MAILERSEND_API_KEY"),
    ("airtable", "AIRTABLE_API_KEY"),
];

/// Adapters named in the config whose secret is not set.
fn missing_secrets(config: &AppConfig, lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
    let configured: Vec<&String> = config
        .leads
        .sources
        .iter()
        .chain(&config.scraper.sources)
        .chain(&config.email.providers)
        .chain(&config.crm.backends)
        .collect();

    ADAPTER_SECRETS
        .iter()
        .filter(|(adapter, _)| configured.iter().any(|c| c.as_str() == *adapter))
        .filter(|(_, var)| lookup(var).is_none_or(|v| v.trim().is_empty()))
        .map(|(adapter, var)| format!("{adapter}: {var} not set (falls back to the next adapter)"))
        .collect()
}

pub fn validate(config_path: Option<&Path>) -> anyhow::Result<()> {
    println!("🔍 Validating configuration...");
    let path = super::config_path(config_path);

    match AppConfig::load_with_env(&path) {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();
            if !config.has_api_key() {
                warnings.push("No oracle API key set (set DEEPSEEK_API_KEY)".to_string());
            }
            if config.email.template.as_ref().is_some_and(|t| !t.exists()) {
                warnings.push(
                    "email.template does not exist; the built-in prompt will be used".to_string(),
                );
            }
            if config.crm.backends.iter().any(|b| b == "airtable")
                && config.crm.airtable_base.is_none()
            {
                warnings.push(
                    "crm.airtable_base is not set; Airtable logging will be skipped".to_string(),
                );
            }
            warnings.extend(missing_secrets(&config, |var| std::env::var(var).ok()));

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Provider:  {}", config.default_provider);
            println!("   Model:     {}", config.default_model);
            println!("   Mode:      {:?}", config.agent.mode);
            println!("   Dry run:   {}", config.dry_run);
            println!("   Leads:     {}", config.leads.sources.join(" → "));
            println!("   Scraper:   {}", config.scraper.sources.join(" → "));
            println!("   Email:     {}", config.email.providers.join(" → "));
            println!("   CRM:       {}", config.crm.backends.join(" → "));
            Ok(())
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            Err(e.into())
        }
    }
}

/// Print the effective configuration with secrets masked.
pub fn show(config_path: Option<&Path>) -> anyhow::Result<()> {
    let mut config = super::load_config(config_path)?;
    if config.api_key.is_some() {
        config.api_key = Some("***".into());
    }
    for provider in config.providers.values_mut() {
        if provider.api_key.is_some() {
            provider.api_key = Some("***".into());
        }
    }
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
