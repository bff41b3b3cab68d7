//! `scrape_website`: company research for email personalization.
//!
//! Pages are cached per domain under the website cache directory and reused
//! while younger than the configured TTL. On a miss the scraper chain
//! (`firecrawl`, `http`) is tried in order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prospector_config::AppConfig;
use prospector_core::error::{AdapterError, ToolError};
use prospector_core::tool::{Capability, Tool, ToolResult};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::adapter::{
    Adapter, AdapterChain, ensure_success, env_secret, http_client, request_error, require,
};
use crate::args::required_str;

const FIRECRAWL_URL: &str = "https://api.firecrawl.dev/v1/scrape";
const FIRECRAWL_KEY_VAR: &str = "FIRECRAWL_API_KEY";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
/// Stored page text is capped at this many characters.
const MAX_CONTENT_CHARS: usize = 8000;

static TITLE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").ok());
static META_NAME_FIRST: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?is)<meta[^>]*name\s*=\s*["']description["'][^>]*content\s*=\s*["']([^"']*)["']"#).ok()
});
static META_CONTENT_FIRST: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?is)<meta[^>]*content\s*=\s*["']([^"']*)["'][^>]*name\s*=\s*["']description["']"#).ok()
});

/// What a scraper pulls from a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
}

impl PageContent {
    /// A short company summary: the meta description, else the start of the page text.
    pub fn company_info(&self) -> String {
        if !self.description.trim().is_empty() {
            return self.description.trim().to_string();
        }
        let full = format!("{} {}", self.title, self.content);
        let full = full.split_whitespace().collect::<Vec<_>>().join(" ");
        truncate(&full, 200)
    }
}

/// Cut `text` to at most `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte, _)) => format!("{}...", &text[..byte]),
        None => text.to_string(),
    }
}

/// Add `https://` when no scheme is given.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Cache key for a URL: the host without `www.`, safe as a file name.
pub fn domain_key(url: &str) -> String {
    let rest = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url);
    let host = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let host = host.split(':').next().unwrap_or(host).to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    host.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

/// The part of a `<title>` before the first `|`.
fn first_title_segment(title: &str) -> String {
    title.split('|').next().unwrap_or(title).trim().to_string()
}

fn capture(re: &LazyLock<Option<Regex>>, html: &str) -> Option<String> {
    re.as_ref()?
        .captures(html)?
        .get(1)
        .map(|m| m.as_str().trim().to_string())
}

/// Pull title, meta description and readable text out of raw HTML.
pub fn extract_page(html: &str) -> PageContent {
    let title = capture(&TITLE, html)
        .map(|t| first_title_segment(&t))
        .unwrap_or_default();
    let description = capture(&META_NAME_FIRST, html)
        .or_else(|| capture(&META_CONTENT_FIRST, html))
        .unwrap_or_default();
    let text = html2text::from_read(html.as_bytes(), 120).unwrap_or_default();
    PageContent {
        title,
        description,
        content: truncate(text.trim(), MAX_CONTENT_CHARS),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedPage {
    url: String,
    fetched_at: DateTime<Utc>,
    #[serde(flatten)]
    page: PageContent,
}

/// One JSON file per domain.
#[derive(Debug, Clone)]
pub struct WebsiteCache {
    dir: PathBuf,
    ttl: chrono::Duration,
}

impl WebsiteCache {
    pub fn new(dir: impl Into<PathBuf>, ttl_days: u32) -> Self {
        Self {
            dir: dir.into(),
            ttl: chrono::Duration::days(i64::from(ttl_days)),
        }
    }

    fn path(&self, domain: &str) -> PathBuf {
        self.dir.join(format!("{domain}.json"))
    }

    /// A fresh cached page, if any. Stale or unreadable entries count as misses.
    pub async fn get(&self, domain: &str) -> Option<PageContent> {
        let raw = tokio::fs::read_to_string(self.path(domain)).await.ok()?;
        let cached: CachedPage = match serde_json::from_str(&raw) {
            Ok(c) => c,
            Err(e) => {
                warn!(domain, error = %e, "Ignoring unreadable website cache entry");
                return None;
            }
        };
        if Utc::now() - cached.fetched_at > self.ttl {
            debug!(domain, "Website cache entry is stale");
            return None;
        }
        Some(cached.page)
    }

    pub async fn put(
        &self,
        domain: &str,
        url: &str,
        page: &PageContent,
    ) -> Result<(), AdapterError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let entry = CachedPage {
            url: url.to_string(),
            fetched_at: Utc::now(),
            page: page.clone(),
        };
        let json =
            serde_json::to_string_pretty(&entry).map_err(|e| AdapterError::Parse(e.to_string()))?;
        tokio::fs::write(self.path(domain), json).await?;
        Ok(())
    }
}

/// Firecrawl hosted scraping.
pub struct FirecrawlScraper {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl FirecrawlScraper {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: http_client(Duration::from_secs(60)),
            api_key,
        }
    }

    pub fn from_env() -> Self {
        Self::new(env_secret(FIRECRAWL_KEY_VAR))
    }
}

#[derive(Debug, Deserialize)]
struct FirecrawlResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<FirecrawlData>,
}

#[derive(Debug, Deserialize)]
struct FirecrawlData {
    #[serde(default)]
    markdown: String,
    #[serde(default)]
    metadata: FirecrawlMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct FirecrawlMetadata {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[async_trait]
impl Adapter<String, PageContent> for FirecrawlScraper {
    fn name(&self) -> &str {
        "firecrawl"
    }

    async fn call(&self, url: &String) -> Result<PageContent, AdapterError> {
        let api_key = require(&self.api_key, FIRECRAWL_KEY_VAR)?;
        let response = self
            .client
            .post(FIRECRAWL_URL)
            .bearer_auth(api_key)
            .json(&json!({ "url": url, "formats": ["markdown"], "onlyMainContent": true }))
            .send()
            .await
            .map_err(request_error)?;
        let body: FirecrawlResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))?;

        let data = match (body.success, body.data) {
            (true, Some(data)) => data,
            (_, _) => {
                return Err(AdapterError::Api {
                    status: 200,
                    message: body.error.unwrap_or_else(|| "scrape unsuccessful".into()),
                });
            }
        };

        Ok(PageContent {
            title: first_title_segment(&data.metadata.title.unwrap_or_default()),
            description: data.metadata.description.unwrap_or_default(),
            content: truncate(data.markdown.trim(), MAX_CONTENT_CHARS),
        })
    }
}

/// Plain GET plus HTML-to-text conversion.
pub struct HttpScraper {
    client: reqwest::Client,
}

impl HttpScraper {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for HttpScraper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter<String, PageContent> for HttpScraper {
    fn name(&self) -> &str {
        "http"
    }

    async fn call(&self, url: &String) -> Result<PageContent, AdapterError> {
        let response = self.client.get(url).send().await.map_err(request_error)?;
        let html = ensure_success(response)
            .await?
            .text()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))?;
        let page = extract_page(&html);
        if page.title.is_empty() && page.description.is_empty() && page.content.is_empty() {
            return Err(AdapterError::Empty(format!("no readable content at {url}")));
        }
        Ok(page)
    }
}

/// A page as returned to callers.
#[derive(Debug, Clone)]
pub struct ScrapedSite {
    pub url: String,
    pub page: PageContent,
    pub cached: bool,
    /// Adapter name, or "cache"
    pub source: String,
}

/// Cache in front of the scraper chain. Shared by `scrape_website` and `write_email`.
pub struct WebsiteScraper {
    cache: WebsiteCache,
    chain: AdapterChain<String, PageContent>,
}

impl WebsiteScraper {
    pub fn new(cache: WebsiteCache, chain: AdapterChain<String, PageContent>) -> Self {
        Self { cache, chain }
    }

    /// Build from `[scraper]`; dry run skips the hosted scraper.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut chain = AdapterChain::new("scraper");
        for source in &config.scraper.sources {
            match source.as_str() {
                "firecrawl" if !config.dry_run => {
                    chain = chain.with(Arc::new(FirecrawlScraper::from_env()));
                }
                "http" => chain = chain.with(Arc::new(HttpScraper::new())),
                _ => {}
            }
        }
        if chain.is_empty() {
            chain = chain.with(Arc::new(HttpScraper::new()));
        }
        Self::new(
            WebsiteCache::new(config.website_cache_dir(), config.scraper.cache_ttl_days),
            chain,
        )
    }

    pub async fn scrape(&self, url: &str) -> Result<ScrapedSite, AdapterError> {
        let url = normalize_url(url);
        let domain = domain_key(&url);

        if let Some(page) = self.cache.get(&domain).await {
            info!(url = %url, "Using cached website content");
            return Ok(ScrapedSite {
                url,
                page,
                cached: true,
                source: "cache".into(),
            });
        }

        let handled = self.chain.try_in_order(&url).await?;
        if let Err(e) = self.cache.put(&domain, &url, &handled.value).await {
            warn!(domain = %domain, error = %e, "Could not cache website content");
        }
        Ok(ScrapedSite {
            url,
            page: handled.value,
            cached: false,
            source: handled.adapter,
        })
    }
}

pub struct ScrapeWebsiteTool {
    scraper: Arc<WebsiteScraper>,
}

impl ScrapeWebsiteTool {
    pub fn new(scraper: Arc<WebsiteScraper>) -> Self {
        Self { scraper }
    }
}

#[async_trait]
impl Tool for ScrapeWebsiteTool {
    fn capability(&self) -> Capability {
        Capability::ScrapeWebsite
    }

    fn description(&self) -> &str {
        "Read a company website and summarize it (title, description, company info) \
         for personalizing outreach."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "Website URL; https:// is added when missing"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        let url = required_str(&arguments, "url")?;
        let site = self.scraper.scrape(url).await?;
        Ok(ToolResult::success(json!({
            "url": site.url,
            "company_info": site.page.company_info(),
            "title": site.page.title,
            "description": site.page.description,
            "content": truncate(&site.page.content, 1000),
            "cached": site.cached,
            "source": site.source,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::testing::Spy;

    const HTML: &str = r#"<html><head>
        <title>GrowthAI | Revenue intelligence</title>
        <meta name="description" content="GrowthAI helps SaaS teams forecast pipeline.">
        </head><body><h1>Forecast with confidence</h1><p>Trusted by 500 teams.</p></body></html>"#;

    #[test]
    fn url_normalization_and_domain_key() {
        assert_eq!(normalize_url("growthai.io"), "https://growthai.io");
        assert_eq!(normalize_url(" http://a.com "), "http://a.com");
        assert_eq!(domain_key("https://www.GrowthAI.io/about?x=1"), "growthai.io");
        assert_eq!(domain_key("https://localhost:8080/"), "localhost");
    }

    #[test]
    fn extracts_title_description_and_text() {
        let page = extract_page(HTML);
        assert_eq!(page.title, "GrowthAI");
        assert_eq!(page.description, "GrowthAI helps SaaS teams forecast pipeline.");
        assert!(page.content.contains("Trusted by 500 teams."));
        assert_eq!(page.company_info(), "GrowthAI helps SaaS teams forecast pipeline.");
    }

    #[test]
    fn meta_with_content_before_name() {
        let page =
            extract_page(r#"<meta content="Reversed order" name="description"><title>X</title>"#);
        assert_eq!(page.description, "Reversed order");
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate("héllo wörld", 5), "héllo...");
        assert_eq!(truncate("short", 10), "short");
    }

    #[tokio::test]
    async fn second_scrape_comes_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let spy = Arc::new(Spy::ok("spy", extract_page(HTML)));
        let scraper = WebsiteScraper::new(
            WebsiteCache::new(dir.path(), 7),
            AdapterChain::new("scraper").with(spy.clone()),
        );

        let first = scraper.scrape("www.growthai.io").await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.source, "spy");
        assert_eq!(first.url, "https://www.growthai.io");

        let second = scraper.scrape("https://growthai.io/pricing").await.unwrap();
        assert!(second.cached);
        assert_eq!(second.page.title, "GrowthAI");
        assert_eq!(spy.call_count(), 1);
        assert!(dir.path().join("growthai.io.json").exists());
    }

    #[tokio::test]
    async fn zero_ttl_always_refetches() {
        let dir = tempfile::tempdir().unwrap();
        let spy = Arc::new(Spy::ok("spy", PageContent::default()));
        let scraper = WebsiteScraper::new(
            WebsiteCache::new(dir.path(), 0),
            AdapterChain::new("scraper").with(spy.clone()),
        );
        scraper.scrape("a.com").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        scraper.scrape("a.com").await.unwrap();
        assert_eq!(spy.call_count(), 2);
    }

    #[tokio::test]
    async fn all_scrapers_failing_is_an_error_result() {
        let dir = tempfile::tempdir().unwrap();
        let scraper = WebsiteScraper::new(
            WebsiteCache::new(dir.path(), 7),
            AdapterChain::new("scraper").with(Arc::new(Spy::<String, PageContent>::failing(
                "firecrawl",
                AdapterError::NotConfigured(FIRECRAWL_KEY_VAR.into()),
            ))),
        );
        let mut registry = prospector_core::ToolRegistry::new();
        registry.register(Box::new(ScrapeWebsiteTool::new(Arc::new(scraper))));

        let result = registry.dispatch("scrape_website", json!({"url": "a.com"})).await;
        assert_eq!(result.status(), "error");
        assert!(result.to_value()["error"].as_str().unwrap().contains("FIRECRAWL_API_KEY"));
    }
}
