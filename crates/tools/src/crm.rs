//! `log_to_crm`: record an outreach interaction.
//!
//! Airtable when configured, else an append-only JSONL log on disk.

use async_trait::async_trait;
use chrono::Utc;
use prospector_config::AppConfig;
use prospector_core::error::{AdapterError, ToolError};
use prospector_core::tool::{Capability, Tool, ToolResult};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::adapter::{
    Adapter, AdapterChain, ensure_success, env_secret, http_client, request_error, require,
};
use crate::args::{optional_str, required_str};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmEntry {
    pub name: String,
    pub email: String,
    pub company: String,
    pub status: String,
    pub notes: String,
}

pub struct AirtableBackend {
    api_key: Option<String>,
    base: Option<String>,
    table: String,
    client: reqwest::Client,
}

impl AirtableBackend {
    pub fn new(api_key: Option<String>, base: Option<String>, table: impl Into<String>) -> Self {
        Self {
            api_key,
            base,
            table: table.into(),
            client: http_client(Duration::from_secs(30)),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            env_secret("AIRTABLE_API_KEY"),
            config.crm.airtable_base.clone(),
            config.crm.airtable_table.clone(),
        )
    }
}

#[async_trait]
impl Adapter<CrmEntry, String> for AirtableBackend {
    fn name(&self) -> &str {
        "airtable"
    }

    async fn call(&self, entry: &CrmEntry) -> Result<String, AdapterError> {
        let key = require(&self.api_key, "AIRTABLE_API_KEY")?;
        let base = require(&self.base, "crm.airtable_base")?;
        let body = json!({
            "fields": {
                "Name": entry.name,
                "Email": entry.email,
                "Company": entry.company,
                "Status": entry.status,
                "Notes": entry.notes,
                "Last Contact": Utc::now().to_rfc3339(),
            }
        });

        let response = self
            .client
            .post(format!("https://api.airtable.com/v0/{base}/{}", self.table))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;
        ensure_success(response).await?;

        Ok(format!("Logged {} to Airtable", entry.email))
    }
}

/// One JSON object per line.
pub struct LocalCrmLog {
    path: PathBuf,
}

impl LocalCrmLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Adapter<CrmEntry, String> for LocalCrmLog {
    fn name(&self) -> &str {
        "local"
    }

    async fn call(&self, entry: &CrmEntry) -> Result<String, AdapterError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let line = json!({
            "name": entry.name,
            "email": entry.email,
            "company": entry.company,
            "status": entry.status,
            "notes": entry.notes,
            "timestamp": Utc::now().to_rfc3339(),
        });

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{line}\n").as_bytes()).await?;
        file.flush().await?;

        Ok(format!("Logged {} to {}", entry.email, self.path.display()))
    }
}

/// Build the CRM chain from `[crm]`. The local log is always last.
pub fn crm_chain(config: &AppConfig) -> AdapterChain<CrmEntry, String> {
    let mut chain = AdapterChain::new("crm");
    for backend in &config.crm.backends {
        if backend == "airtable" && !config.dry_run {
            chain = chain.with(Arc::new(AirtableBackend::from_config(config)));
        }
    }
    chain.with(Arc::new(LocalCrmLog::new(config.crm_path())))
}

pub struct LogToCrmTool {
    chain: AdapterChain<CrmEntry, String>,
}

impl LogToCrmTool {
    pub fn new(chain: AdapterChain<CrmEntry, String>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl Tool for LogToCrmTool {
    fn capability(&self) -> Capability {
        Capability::LogToCrm
    }

    fn description(&self) -> &str {
        "Record an outreach interaction with a lead in the CRM."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "email": { "type": "string" },
                "company": { "type": "string" },
                "status": {
                    "type": "string",
                    "description": "e.g. Contacted, Replied, Meeting Booked"
                },
                "notes": { "type": "string" }
            },
            "required": ["name", "email", "company", "status"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        let entry = CrmEntry {
            name: required_str(&arguments, "name")?.to_string(),
            email: required_str(&arguments, "email")?.to_string(),
            company: required_str(&arguments, "company")?.to_string(),
            status: required_str(&arguments, "status")?.to_string(),
            notes: optional_str(&arguments, "notes").unwrap_or_default().to_string(),
        };

        let handled = self.chain.try_in_order(&entry).await?;
        info!(email = %entry.email, backend = %handled.adapter, "Interaction logged");
        Ok(ToolResult::success(json!({
            "backend": handled.adapter,
            "message": handled.value,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Value {
        json!({
            "name": "Alice Smith",
            "email": "alice@growthai.io",
            "company": "GrowthAI",
            "status": "Contacted"
        })
    }

    #[tokio::test]
    async fn missing_airtable_base_falls_back_to_local_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crm.jsonl");
        let chain = AdapterChain::new("crm")
            .with(Arc::new(AirtableBackend::new(Some("key".into()), None, "Leads")))
            .with(Arc::new(LocalCrmLog::new(&path)));
        let tool = LogToCrmTool::new(chain);

        let result = tool.execute(args()).await.unwrap();
        assert_eq!(result.get("backend"), Some(&json!("local")));
        tool.execute(args()).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["company"], "GrowthAI");
        assert_eq!(lines[0]["notes"], "");
        assert!(lines[1]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn all_backends_failing_is_an_error() {
        let chain =
            AdapterChain::new("crm").with(Arc::new(AirtableBackend::new(None, None, "Leads")));
        let err = LogToCrmTool::new(chain).execute(args()).await.unwrap_err();
        assert!(err.to_string().contains("AIRTABLE_API_KEY is not configured"));
    }

    #[test]
    fn dry_run_skips_airtable() {
        let config = AppConfig {
            dry_run: true,
            ..AppConfig::default()
        };
        assert_eq!(crm_chain(&config).names(), vec!["local"]);
        assert_eq!(crm_chain(&AppConfig::default()).names(), vec!["airtable", "local"]);
    }
}
