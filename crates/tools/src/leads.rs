//! `get_leads`: find prospects matching the ICP.
//!
//! Sources are tried in configured order (`apollo`, `local`). Leads found
//! remotely are appended to the local JSONL store so later runs and dry
//! runs can reuse them.

use async_trait::async_trait;
use prospector_config::AppConfig;
use prospector_core::domain::Lead;
use prospector_core::error::{AdapterError, ToolError};
use prospector_core::tool::{Capability, Tool, ToolResult};
use prospector_memory::MemoryStore;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::adapter::{
    Adapter, AdapterChain, ensure_success, env_secret, http_client, request_error, require,
};
use crate::args::required_str;

pub const LEADS_COUNT_KEY: &str = "leads_count";

const APOLLO_URL: &str = "https://api.apollo.io/v1/people/search";
const APOLLO_KEY_VAR: &str = "APOLLO_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadQuery {
    pub industry: String,
    pub role: String,
    pub location: String,
    pub count: usize,
}

/// The JSONL file of known leads, one `Lead` per line.
#[derive(Debug, Clone)]
pub struct LeadStore {
    path: PathBuf,
}

impl LeadStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored lead. Unparseable lines are skipped.
    pub async fn load(&self) -> Result<Vec<Lead>, AdapterError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<Lead>(line) {
                Ok(lead) => Some(lead),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Skipping unreadable lead");
                    None
                }
            })
            .collect())
    }

    pub async fn append(&self, leads: &[Lead]) -> Result<(), AdapterError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut buf = String::new();
        for lead in leads {
            let line = serde_json::to_string(lead).map_err(|e| AdapterError::Parse(e.to_string()))?;
            buf.push_str(&line);
            buf.push('\n');
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(buf.as_bytes()).await?;
        file.flush().await?;
        debug!(path = %self.path.display(), count = leads.len(), "Leads appended");
        Ok(())
    }

    /// Write the sample leads when the store doesn't exist yet.
    pub async fn seed_if_missing(&self) -> Result<(), AdapterError> {
        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(());
        }
        info!(path = %self.path.display(), "Creating sample lead store");
        self.append(&sample_leads()).await
    }
}

fn sample_lead(name: &str, title: &str, company: &str, domain: &str, location: &str) -> Lead {
    let first = name.split_whitespace().next().unwrap_or(name).to_lowercase();
    let handle = name.to_lowercase().replace(' ', "");
    Lead {
        name: name.into(),
        title: title.into(),
        company: company.into(),
        email: format!("{first}@{domain}"),
        linkedin: format!("https://linkedin.com/in/{handle}"),
        industry: "AI SaaS".into(),
        location: location.into(),
        website: format!("https://{domain}"),
    }
}

/// Demo data for dry runs and first launches.
pub fn sample_leads() -> Vec<Lead> {
    vec![
        sample_lead("Alice Smith", "Founder", "GrowthAI", "growthai.io", "United States"),
        sample_lead("Bob Johnson", "CTO", "TechBoost", "techboost.io", "United States"),
        sample_lead("Carol Williams", "CEO", "DataFlow", "dataflow.ai", "United Kingdom"),
        sample_lead("David Brown", "Founder", "AIScale", "aiscale.io", "Germany"),
        sample_lead("Emma Davis", "CEO", "NeuralWorks", "neuralworks.ai", "France"),
        sample_lead("Frank Miller", "CTO", "AIConnect", "aiconnect.io", "Canada"),
        sample_lead("Grace Wilson", "Founder", "SmartAI", "smartai.tech", "Australia"),
        sample_lead("Henry Taylor", "CEO", "AIVenture", "aiventure.io", "Singapore"),
        sample_lead("Irene Clark", "Founder", "BrainTech", "braintech.ai", "Netherlands"),
        sample_lead("Jack Roberts", "CTO", "IntelliSoft", "intellisoft.io", "Sweden"),
    ]
}

/// Empty filters match everything; otherwise a case-insensitive substring either way.
fn matches_filter(field: &str, filter: &str) -> bool {
    let filter = filter.trim().to_lowercase();
    if filter.is_empty() {
        return true;
    }
    let field = field.to_lowercase();
    field.contains(&filter) || (!field.is_empty() && filter.contains(&field))
}

/// Reads the local JSONL store.
pub struct LocalLeadSource {
    store: LeadStore,
}

impl LocalLeadSource {
    pub fn new(store: LeadStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Adapter<LeadQuery, Vec<Lead>> for LocalLeadSource {
    fn name(&self) -> &str {
        "local"
    }

    async fn call(&self, query: &LeadQuery) -> Result<Vec<Lead>, AdapterError> {
        self.store.seed_if_missing().await?;
        let leads: Vec<Lead> = self
            .store
            .load()
            .await?
            .into_iter()
            .filter(|l| {
                matches_filter(&l.industry, &query.industry)
                    && matches_filter(&l.title, &query.role)
                    && matches_filter(&l.location, &query.location)
            })
            .take(query.count)
            .collect();
        debug!(found = leads.len(), "Local leads matched");
        Ok(leads)
    }
}

#[derive(Debug, Deserialize)]
struct ApolloResponse {
    #[serde(default)]
    people: Vec<ApolloPerson>,
}

#[derive(Debug, Deserialize)]
struct ApolloPerson {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    linkedin_url: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    organization: Option<ApolloOrganization>,
}

#[derive(Debug, Deserialize)]
struct ApolloOrganization {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    website_url: Option<String>,
}

impl ApolloPerson {
    fn into_lead(self, query: &LeadQuery) -> Lead {
        let name = [self.first_name, self.last_name]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let location = [self.city, self.country]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        let organization = self.organization;
        Lead {
            name,
            title: self.title.unwrap_or_default(),
            company: organization
                .as_ref()
                .and_then(|o| o.name.clone())
                .unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            linkedin: self.linkedin_url.unwrap_or_default(),
            industry: query.industry.clone(),
            location: if location.is_empty() {
                query.location.clone()
            } else {
                location
            },
            website: organization
                .and_then(|o| o.website_url)
                .unwrap_or_default(),
        }
    }
}

/// Apollo.io people search.
pub struct ApolloSource {
    client: reqwest::Client,
    api_key: Option<String>,
    store: Option<LeadStore>,
}

impl ApolloSource {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: http_client(Duration::from_secs(30)),
            api_key,
            store: None,
        }
    }

    pub fn from_env() -> Self {
        Self::new(env_secret(APOLLO_KEY_VAR))
    }

    /// Also append every batch found to `store`.
    pub fn with_store(mut self, store: LeadStore) -> Self {
        self.store = Some(store);
        self
    }
}

#[async_trait]
impl Adapter<LeadQuery, Vec<Lead>> for ApolloSource {
    fn name(&self) -> &str {
        "apollo"
    }

    async fn call(&self, query: &LeadQuery) -> Result<Vec<Lead>, AdapterError> {
        let api_key = require(&self.api_key, APOLLO_KEY_VAR)?;
        let payload = json!({
            "page": 1,
            "per_page": query.count,
            "person_titles": [query.role],
            "person_locations": [query.location],
            "q_keywords": query.industry,
        });

        let response = self
            .client
            .post(APOLLO_URL)
            .header("X-Api-Key", api_key)
            .header("Cache-Control", "no-cache")
            .json(&payload)
            .send()
            .await
            .map_err(request_error)?;
        let body: ApolloResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))?;

        let leads: Vec<Lead> = body
            .people
            .into_iter()
            .map(|p| p.into_lead(query))
            .collect();
        if leads.is_empty() {
            return Err(AdapterError::Empty("Apollo returned no people".into()));
        }

        if let Some(store) = &self.store {
            if let Err(e) = store.append(&leads).await {
                warn!(error = %e, "Could not cache Apollo leads locally");
            }
        }
        Ok(leads)
    }
}

/// Build the lead chain from `[leads].sources`; dry run keeps only `local`.
pub fn lead_chain(config: &AppConfig) -> AdapterChain<LeadQuery, Vec<Lead>> {
    let store = LeadStore::new(config.leads_path());
    let mut chain = AdapterChain::new("leads");
    for source in &config.leads.sources {
        match source.as_str() {
            "apollo" if !config.dry_run => {
                chain = chain.with(Arc::new(ApolloSource::from_env().with_store(store.clone())));
            }
            "local" => chain = chain.with(Arc::new(LocalLeadSource::new(store.clone()))),
            _ => {}
        }
    }
    if config.dry_run && chain.is_empty() {
        chain = chain.with(Arc::new(LocalLeadSource::new(store)));
    }
    chain
}

pub struct GetLeadsTool {
    memory: Arc<MemoryStore>,
    chain: AdapterChain<LeadQuery, Vec<Lead>>,
    default_count: usize,
}

impl GetLeadsTool {
    pub fn new(
        memory: Arc<MemoryStore>,
        chain: AdapterChain<LeadQuery, Vec<Lead>>,
        default_count: usize,
    ) -> Self {
        Self {
            memory,
            chain,
            default_count,
        }
    }

    /// Explicit argument, then remembered `leads_count`, then the configured default.
    async fn resolve_count(&self, arguments: &Value) -> usize {
        if let Some(n) = arguments.get("count").and_then(Value::as_u64) {
            return (n as usize).max(1);
        }
        if let Ok(recalled) = self.memory.recall(LEADS_COUNT_KEY, None).await {
            let remembered = match &recalled.value {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            };
            if let Some(n) = remembered {
                debug!(count = n, "Using remembered lead count");
                return (n as usize).max(1);
            }
        }
        self.default_count.max(1)
    }
}

#[async_trait]
impl Tool for GetLeadsTool {
    fn capability(&self) -> Capability {
        Capability::GetLeads
    }

    fn description(&self) -> &str {
        "Find leads (name, title, company, email, website) matching an industry, \
         role and location."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "industry": { "type": "string" },
                "role": { "type": "string", "description": "Job title to target, e.g. Founder" },
                "location": { "type": "string" },
                "count": { "type": "integer", "description": "How many leads to return" }
            },
            "required": ["industry", "role", "location"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        let query = LeadQuery {
            industry: required_str(&arguments, "industry")?.to_string(),
            role: required_str(&arguments, "role")?.to_string(),
            location: required_str(&arguments, "location")?.to_string(),
            count: self.resolve_count(&arguments).await,
        };
        info!(
            industry = %query.industry,
            role = %query.role,
            location = %query.location,
            count = query.count,
            "Looking for leads"
        );

        let handled = self.chain.try_in_order(&query).await?;
        Ok(ToolResult::success(json!({
            "count": handled.value.len(),
            "leads": handled.value,
            "source": handled.adapter,
        })))
    }
}
