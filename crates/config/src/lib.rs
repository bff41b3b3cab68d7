//! Configuration loading, validation, and management for prospector.
//!
//! Loads configuration from `~/.prospector/config.toml` (or the path in
//! `PROSPECTOR_CONFIG`) with environment variable overrides. Validates all
//! settings at startup; a malformed configuration is the one fatal error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Lead sources the tools crate knows how to build.
pub const LEAD_SOURCES: [&str; 2] = ["apollo", "local"];
/// Website scrapers the tools crate knows how to build.
pub const SCRAPERS: [&str; 2] = ["firecrawl", "http"];
/// Mail transports the tools crate knows how to build.
pub const EMAIL_PROVIDERS: [&str; 3] = ["sendgrid", "mailersend", "outbox"];
/// CRM backends the tools crate knows how to build.
pub const CRM_BACKENDS: [&str; 2] = ["airtable", "local"];

/// The root configuration structure.
///
/// Maps directly to `~/.prospector/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Oracle API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default oracle provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Oracle temperature; kept low so capability selection is stable
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Use only local adapters: no mail leaves the machine, no paid lookups
    #[serde(default)]
    pub dry_run: bool,

    /// Planning loop settings
    #[serde(default)]
    pub agent: AgentSettings,

    /// Where state lives on disk
    #[serde(default)]
    pub paths: PathsConfig,

    /// Memory snapshot backend
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Lead lookup
    #[serde(default)]
    pub leads: LeadsConfig,

    /// Website enrichment
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Email drafting and sending
    #[serde(default)]
    pub email: EmailConfig,

    /// CRM logging
    #[serde(default)]
    pub crm: CrmConfig,

    /// Additional oracle providers, tried in name order after the default
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "deepseek".into()
}
fn default_model() -> String {
    "deepseek-chat".into()
}
fn default_temperature() -> f32 {
    0.2
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("dry_run", &self.dry_run)
            .field("agent", &self.agent)
            .field("paths", &self.paths)
            .field("memory", &self.memory)
            .field("leads", &self.leads)
            .field("scraper", &self.scraper)
            .field("email", &self.email)
            .field("crm", &self.crm)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// How the run treats failures and who answers questions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// A person is at the console; turn failures ask whether to continue
    #[default]
    Interactive,
    /// Unattended; the first turn failure stops the run
    Auto,
    /// Unattended and dry-run
    Test,
}

impl RunMode {
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Interactive)
    }
}

impl std::str::FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "interactive" => Ok(Self::Interactive),
            "auto" => Ok(Self::Auto),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::ValidationError(format!(
                "unknown mode '{other}' (expected interactive, auto or test)"
            ))),
        }
    }
}

/// How the task graph is populated before the first turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskSeeding {
    /// The oracle builds the plan itself through `add_task`
    #[default]
    None,
    /// The fixed eight-step outreach plan
    Default,
    /// Ask the oracle for a plan up front, falling back to the default plan
    Oracle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Hard ceiling on planning turns
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Pause between turns, in milliseconds
    #[serde(default = "default_turn_delay_ms")]
    pub turn_delay_ms: u64,

    #[serde(default)]
    pub mode: RunMode,

    #[serde(default)]
    pub task_seeding: TaskSeeding,

    /// Words in a final message that end the run
    #[serde(default = "default_completion_keywords")]
    pub completion_keywords: Vec<String>,
}

fn default_max_turns() -> usize {
    50
}
fn default_turn_delay_ms() -> u64 {
    1000
}
fn default_completion_keywords() -> Vec<String> {
    vec!["completed".into(), "finished".into()]
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            turn_delay_ms: default_turn_delay_ms(),
            mode: RunMode::default(),
            task_seeding: TaskSeeding::default(),
            completion_keywords: default_completion_keywords(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root for leads, outbox, website cache, CRM log and memory
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Memory snapshot file; defaults to `<data_dir>/memory.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_file: Option<PathBuf>,

    /// Markdown progress report re-rendered on every task change
    #[serde(default = "default_task_log")]
    pub task_log: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_task_log() -> PathBuf {
    PathBuf::from("logs").join("tasks.md")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            memory_file: None,
            task_log: default_task_log(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// "file", "in_memory" or "none"
    #[serde(default = "default_memory_backend")]
    pub backend: String,
}

fn default_memory_backend() -> String {
    "file".into()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadsConfig {
    /// Sources tried in order
    #[serde(default = "default_lead_sources")]
    pub sources: Vec<String>,

    /// Batch size when neither the call nor memory names one
    #[serde(default = "default_lead_count")]
    pub default_count: u32,

    /// Local lead store; defaults to `<data_dir>/leads/leads.jsonl`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_file: Option<PathBuf>,
}

fn default_lead_sources() -> Vec<String> {
    vec!["apollo".into(), "local".into()]
}
fn default_lead_count() -> u32 {
    5
}

impl Default for LeadsConfig {
    fn default() -> Self {
        Self {
            sources: default_lead_sources(),
            default_count: default_lead_count(),
            local_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    #[serde(default = "default_scrapers")]
    pub sources: Vec<String>,

    /// Cached pages younger than this are reused
    #[serde(default = "default_cache_ttl_days")]
    pub cache_ttl_days: u32,
}

fn default_scrapers() -> Vec<String> {
    vec!["firecrawl".into(), "http".into()]
}
fn default_cache_ttl_days() -> u32 {
    7
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            sources: default_scrapers(),
            cache_ttl_days: default_cache_ttl_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Transports tried in order
    #[serde(default = "default_email_providers")]
    pub providers: Vec<String>,

    #[serde(default = "default_from_email")]
    pub from_email: String,

    #[serde(default = "default_from_name")]
    pub from_name: String,

    /// Template file with `{{name}}`-style placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
}

fn default_email_providers() -> Vec<String> {
    vec!["sendgrid".into(), "mailersend".into(), "outbox".into()]
}
fn default_from_email() -> String {
    "sdr@example.com".into()
}
fn default_from_name() -> String {
    "Prospector".into()
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            providers: default_email_providers(),
            from_email: default_from_email(),
            from_name: default_from_name(),
            template: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    #[serde(default = "default_crm_backends")]
    pub backends: Vec<String>,

    /// Local interaction log; defaults to `<data_dir>/crm.jsonl`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airtable_base: Option<String>,

    #[serde(default = "default_airtable_table")]
    pub airtable_table: String,
}

fn default_crm_backends() -> Vec<String> {
    vec!["airtable".into(), "local".into()]
}
fn default_airtable_table() -> String {
    "Leads".into()
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            backends: default_crm_backends(),
            local_file: None,
            airtable_base: None,
            airtable_table: default_airtable_table(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from `PROSPECTOR_CONFIG` or `~/.prospector/config.toml`,
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("PROSPECTOR_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"));
        Self::load_with_env(&path)
    }

    /// Load a specific file, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment-like lookup.
    ///
    /// - `PROSPECTOR_API_KEY`, then `DEEPSEEK_API_KEY` fill a missing api key
    /// - `PROSPECTOR_PROVIDER`, `DEEPSEEK_MODEL`, `PROSPECTOR_DATA_DIR` replace their settings
    /// - `TEST_MODE` set to a truthy value turns on dry run
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("PROSPECTOR_API_KEY").or_else(|| lookup("DEEPSEEK_API_KEY"));
        }

        if let Some(provider) = lookup("PROSPECTOR_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("DEEPSEEK_MODEL") {
            self.default_model = model;
        }

        if let Some(dir) = lookup("PROSPECTOR_DATA_DIR") {
            self.paths.data_dir = PathBuf::from(dir);
        }

        if lookup("TEST_MODE").is_some_and(|v| is_truthy(&v)) {
            self.dry_run = true;
        }
    }

    /// Switch run mode; `test` implies dry run.
    pub fn set_mode(&mut self, mode: RunMode) {
        self.agent.mode = mode;
        if mode == RunMode::Test {
            self.dry_run = true;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".prospector")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_turns must be at least 1".into(),
            ));
        }

        if !["file", "in_memory", "none"].contains(&self.memory.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown memory backend '{}'",
                self.memory.backend
            )));
        }

        check_order("leads.sources", &self.leads.sources, &LEAD_SOURCES)?;
        check_order("scraper.sources", &self.scraper.sources, &SCRAPERS)?;
        check_order("email.providers", &self.email.providers, &EMAIL_PROVIDERS)?;
        check_order("crm.backends", &self.crm.backends, &CRM_BACKENDS)?;

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn memory_path(&self) -> PathBuf {
        self.paths
            .memory_file
            .clone()
            .unwrap_or_else(|| self.paths.data_dir.join("memory.json"))
    }

    pub fn leads_path(&self) -> PathBuf {
        self.leads
            .local_file
            .clone()
            .unwrap_or_else(|| self.paths.data_dir.join("leads").join("leads.jsonl"))
    }

    pub fn outbox_dir(&self) -> PathBuf {
        self.paths.data_dir.join("emails")
    }

    pub fn website_cache_dir(&self) -> PathBuf {
        self.paths.data_dir.join("websites")
    }

    pub fn crm_path(&self) -> PathBuf {
        self.crm
            .local_file
            .clone()
            .unwrap_or_else(|| self.paths.data_dir.join("crm.jsonl"))
    }

    /// Every directory a run writes into.
    pub fn state_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![
            self.paths.data_dir.clone(),
            self.paths.data_dir.join("leads"),
            self.outbox_dir(),
            self.website_cache_dir(),
        ];
        if let Some(parent) = self.paths.task_log.parent().filter(|p| !p.as_os_str().is_empty()) {
            dirs.push(parent.to_path_buf());
        }
        dirs
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn check_order(field: &str, order: &[String], known: &[&str]) -> Result<(), ConfigError> {
    if order.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{field} must name at least one adapter"
        )));
    }
    if let Some(unknown) = order.iter().find(|name| !known.contains(&name.as_str())) {
        return Err(ConfigError::ValidationError(format!(
            "{field}: unknown adapter '{unknown}' (expected one of {})",
            known.join(", ")
        )));
    }
    Ok(())
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            dry_run: false,
            agent: AgentSettings::default(),
            paths: PathsConfig::default(),
            memory: MemoryConfig::default(),
            leads: LeadsConfig::default(),
            scraper: ScraperConfig::default(),
            email: EmailConfig::default(),
            crm: CrmConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "deepseek");
        assert_eq!(config.agent.max_turns, 50);
        assert_eq!(config.agent.mode, RunMode::Interactive);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.leads.sources, config.leads.sources);
        assert_eq!(parsed.agent.turn_delay_ms, 1000);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_turn_budget_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_turns = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_adapter_rejected() {
        let mut config = AppConfig::default();
        config.email.providers = vec!["carrier_pigeon".into()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("carrier_pigeon"));

        config.email.providers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.default_model, "deepseek-chat");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[agent]\nmax_turns = 7\nmode = \"auto\"\ntask_seeding = \"default\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.agent.max_turns, 7);
        assert_eq!(config.agent.mode, RunMode::Auto);
        assert_eq!(config.agent.task_seeding, TaskSeeding::Default);
        assert_eq!(config.agent.turn_delay_ms, 1000);
        assert_eq!(config.scraper.cache_ttl_days, 7);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "agent = [").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| match key {
            "DEEPSEEK_API_KEY" => Some("sk-test".into()),
            "DEEPSEEK_MODEL" => Some("deepseek-reasoner".into()),
            "TEST_MODE" => Some("true".into()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.default_model, "deepseek-reasoner");
        assert!(config.dry_run);
    }

    #[test]
    fn configured_key_wins_over_env() {
        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config.apply_overrides(|_| Some("from-env".into()));
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_mode_implies_dry_run() {
        let mut config = AppConfig::default();
        config.set_mode("test".parse().unwrap());
        assert!(config.dry_run);
        assert!(!config.agent.mode.is_interactive());
        assert!("sideways".parse::<RunMode>().is_err());
    }

    #[test]
    fn derived_paths_follow_data_dir() {
        let mut config = AppConfig::default();
        config.paths.data_dir = PathBuf::from("/srv/sdr");
        assert_eq!(config.memory_path(), PathBuf::from("/srv/sdr/memory.json"));
        assert_eq!(config.leads_path(), PathBuf::from("/srv/sdr/leads/leads.jsonl"));
        assert!(config.state_dirs().contains(&PathBuf::from("logs")));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
