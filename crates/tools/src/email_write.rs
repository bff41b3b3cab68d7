//! `write_email`: draft a personalized cold email.
//!
//! The company website is scraped when given (best-effort) and a truncated
//! summary is folded into the drafting prompt. The oracle writes the email;
//! without one, in dry run, or when it fails, a fixed template is filled in
//! instead.

use async_trait::async_trait;
use prospector_config::AppConfig;
use prospector_core::error::ToolError;
use prospector_core::message::Message;
use prospector_core::provider::{Provider, ProviderRequest};
use prospector_core::tool::{Capability, Tool, ToolResult};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::args::{optional_str, required_str};
use crate::scrape::{WebsiteScraper, truncate};

/// Company summaries longer than this are cut before prompting.
const COMPANY_INFO_CHARS: usize = 500;

const PERSONA: &str =
    "You are an expert SDR who writes highly effective, personalized cold emails.";

pub const DEFAULT_PROMPT_TEMPLATE: &str = "Write a personalized cold email to {{name}}, the {{title}} of {{company}}.

Context: They run a {{industry}} company.

About their company: {{company_info}}

Product: {{product}}

Tone: Conversational and value-driven. Keep it concise (3-4 sentences max).

Include:
1. Personalized opening based on their role/company and website content
2. Brief value proposition
3. One clear call-to-action (schedule a call)

Do NOT use generic phrases like \"I hope this email finds you well.\"
Do NOT include pricing or technical details.
Start with a line of the form \"Subject: ...\".
";

const FALLBACK_EMAIL: &str = "Subject: Quick question about {{company}}

Hi {{name}},

I noticed {{company}} is doing interesting work in the {{industry}} space. Our {{product}} might be a good fit for your needs.

Do you have 15 minutes to chat this week?

Best,
{{sender}}";

/// Replace every `{{key}}` with its value. Unknown placeholders are left alone.
pub fn render_template(template: &str, values: &BTreeMap<&str, String>) -> String {
    values.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{{{key}}}}}"), value)
    })
}

/// Split a drafted email into subject and body.
///
/// Uses a `Subject:` line when present, otherwise the first line. The
/// subject always names the company.
pub fn parse_email(text: &str, company: &str) -> (String, String) {
    let text = text.trim();
    let lines: Vec<&str> = text.lines().collect();

    let subject_line = lines.iter().position(|l| {
        l.trim()
            .trim_start_matches(['*', '#', ' '])
            .to_lowercase()
            .starts_with("subject:")
    });

    let (mut subject, body) = match subject_line {
        Some(i) => {
            let line = lines[i].trim().trim_start_matches(['*', '#', ' ']);
            let subject = line["subject:".len()..].trim().trim_matches('*').trim().to_string();
            (subject, lines[i + 1..].join("\n").trim().to_string())
        }
        None => match lines.split_first() {
            Some((first, rest)) => (first.trim().to_string(), rest.join("\n").trim().to_string()),
            None => (String::new(), String::new()),
        },
    };

    if subject.is_empty() {
        subject = format!("Quick question about {company}");
    }
    if !company.is_empty() && !subject.to_lowercase().contains(&company.to_lowercase()) {
        subject = format!("{subject} - {company}");
    }
    (subject, body)
}

pub struct WriteEmailTool {
    scraper: Arc<WebsiteScraper>,
    oracle: Option<Arc<dyn Provider>>,
    model: String,
    prompt_template: String,
    sender: String,
    use_oracle: bool,
}

impl WriteEmailTool {
    pub fn new(scraper: Arc<WebsiteScraper>) -> Self {
        Self {
            scraper,
            oracle: None,
            model: String::new(),
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            sender: "Prospector".to_string(),
            use_oracle: true,
        }
    }

    /// Apply `[email]` settings: sender name, prompt template file, dry run.
    pub fn configured(mut self, config: &AppConfig) -> Self {
        self.sender = config.email.from_name.clone();
        self.use_oracle = !config.dry_run;
        if let Some(path) = &config.email.template {
            match std::fs::read_to_string(path) {
                Ok(template) => self.prompt_template = template,
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "Email template unreadable, using built-in"
                ),
            }
        }
        self
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        self.oracle = Some(oracle);
        self.model = model.into();
        self
    }

    async fn company_info(&self, company: &str, industry: &str, website: Option<&str>) -> String {
        if let Some(url) = website {
            match self.scraper.scrape(url).await {
                Ok(site) => {
                    let info = site.page.company_info();
                    if !info.is_empty() {
                        return info;
                    }
                }
                Err(e) => warn!(url, error = %e, "Website research failed, writing without it"),
            }
        }
        format!("{company} is a company in the {industry} industry.")
    }

    async fn draft_with_oracle(&self, prompt: String) -> Option<String> {
        if !self.use_oracle {
            return None;
        }
        let oracle = self.oracle.as_ref()?;
        let request = ProviderRequest::new(
            &self.model,
            vec![Message::user(format!("{PERSONA}\n\n{prompt}"))],
        )
        .with_temperature(0.7);

        match oracle.complete(request).await {
            Ok(response) if !response.message.content.trim().is_empty() => {
                Some(response.message.content)
            }
            Ok(_) => {
                warn!("Oracle returned an empty email draft, using template");
                None
            }
            Err(e) => {
                warn!(error = %e, "Oracle email draft failed, using template");
                None
            }
        }
    }
}

#[async_trait]
impl Tool for WriteEmailTool {
    fn capability(&self) -> Capability {
        Capability::WriteEmail
    }

    fn description(&self) -> &str {
        "Draft a personalized cold email to a lead. Returns subject and body; \
         nothing is sent."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Recipient's name" },
                "title": { "type": "string", "description": "Recipient's job title" },
                "company": { "type": "string" },
                "industry": { "type": "string" },
                "product_description": { "type": "string", "description": "What we are offering" },
                "website": { "type": "string", "description": "Company website, used for research" }
            },
            "required": ["name", "title", "company", "industry", "product_description"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        let name = required_str(&arguments, "name")?;
        let title = required_str(&arguments, "title")?;
        let company = required_str(&arguments, "company")?;
        let industry = required_str(&arguments, "industry")?;
        let product = required_str(&arguments, "product_description")?;
        let website = optional_str(&arguments, "website");

        let company_info = self.company_info(company, industry, website).await;
        let values: BTreeMap<&str, String> = BTreeMap::from([
            ("name", name.to_string()),
            ("title", title.to_string()),
            ("company", company.to_string()),
            ("industry", industry.to_string()),
            ("product", product.to_string()),
            ("company_info", truncate(&company_info, COMPANY_INFO_CHARS)),
            ("sender", self.sender.clone()),
        ]);

        let prompt = render_template(&self.prompt_template, &values);
        let (draft, drafted_by) = match self.draft_with_oracle(prompt).await {
            Some(text) => (text, "oracle"),
            None => (render_template(FALLBACK_EMAIL, &values), "template"),
        };
        debug!(drafted_by, "Email drafted");

        let (subject, body) = parse_email(&draft, company);
        info!(company, subject = %subject, "Email written");
        Ok(ToolResult::success(json!({
            "subject": subject,
            "body": body,
            "drafted_by": drafted_by,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterChain;
    use crate::adapter::testing::Spy;
    use crate::scrape::{PageContent, WebsiteCache};
    use async_trait::async_trait;
    use prospector_core::error::ProviderError;
    use prospector_core::provider::ProviderResponse;
    use std::sync::Mutex;

    struct RecordingOracle {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Provider for RecordingOracle {
        fn name(&self) -> &str {
            "recording"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            self.prompts
                .lock()
                .unwrap()
                .push(request.messages[0].content.clone());
            Ok(ProviderResponse {
                message: Message::assistant(self.reply.clone()),
                usage: None,
                model: "m".into(),
            })
        }
    }

    fn scraper(dir: &std::path::Path, page: PageContent) -> Arc<WebsiteScraper> {
        Arc::new(WebsiteScraper::new(
            WebsiteCache::new(dir, 7),
            AdapterChain::new("scraper").with(Arc::new(Spy::ok("spy", page))),
        ))
    }

    fn args() -> Value {
        json!({
            "name": "Alice Smith",
            "title": "Founder",
            "company": "GrowthAI",
            "industry": "AI SaaS",
            "product_description": "AI scheduling assistant",
            "website": "growthai.io"
        })
    }

    #[test]
    fn subject_line_is_parsed() {
        let (subject, body) =
            parse_email("Subject: Faster demos\n\nHi Alice,\nLet's talk.", "GrowthAI");
        assert_eq!(subject, "Faster demos - GrowthAI");
        assert_eq!(body, "Hi Alice,\nLet's talk.");
    }

    #[test]
    fn bold_subject_and_company_already_named() {
        let (subject, _) = parse_email("**Subject:** GrowthAI + faster demos\nHi", "growthai");
        assert_eq!(subject, "GrowthAI + faster demos");
    }

    #[test]
    fn first_line_used_without_subject_marker() {
        let (subject, body) = parse_email("Idea for GrowthAI\nHi Alice", "GrowthAI");
        assert_eq!(subject, "Idea for GrowthAI");
        assert_eq!(body, "Hi Alice");
        let (subject, _) = parse_email("", "GrowthAI");
        assert_eq!(subject, "Quick question about GrowthAI");
    }

    #[test]
    fn placeholders_render() {
        let values = BTreeMap::from([("name", "Bob".to_string())]);
        assert_eq!(render_template("Hi {{name}} {{other}}", &values), "Hi Bob {{other}}");
    }

    #[tokio::test]
    async fn oracle_draft_includes_website_research() {
        let dir = tempfile::tempdir().unwrap();
        let page = PageContent {
            title: "GrowthAI".into(),
            description: "GrowthAI forecasts pipeline for SaaS teams.".into(),
            content: String::new(),
        };
        let oracle = Arc::new(RecordingOracle {
            reply: "Subject: Pipeline forecasting\n\nHi Alice, ...".into(),
            prompts: Mutex::new(Vec::new()),
        });
        let tool = WriteEmailTool::new(scraper(dir.path(), page)).with_oracle(oracle.clone(), "m");

        let result = tool.execute(args()).await.unwrap();
        assert_eq!(result.get("subject"), Some(&json!("Pipeline forecasting - GrowthAI")));
        assert_eq!(result.get("drafted_by"), Some(&json!("oracle")));
        let prompt = &oracle.prompts.lock().unwrap()[0];
        assert!(prompt.contains("GrowthAI forecasts pipeline for SaaS teams."));
        assert!(prompt.contains("Alice Smith, the Founder of GrowthAI"));
    }

    #[tokio::test]
    async fn template_without_oracle() {
        let dir = tempfile::tempdir().unwrap();
        let tool = WriteEmailTool::new(scraper(dir.path(), PageContent::default()));

        let result = tool.execute(args()).await.unwrap();
        assert_eq!(result.get("subject"), Some(&json!("Quick question about GrowthAI")));
        assert_eq!(result.get("drafted_by"), Some(&json!("template")));
        let body = result.get("body").unwrap().as_str().unwrap();
        assert!(body.starts_with("Hi Alice Smith,"));
        assert!(body.contains("Our AI scheduling assistant"));
        assert!(body.ends_with("Prospector"));
    }

    #[tokio::test]
    async fn dry_run_never_calls_the_oracle() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = Arc::new(RecordingOracle {
            reply: "Subject: x".into(),
            prompts: Mutex::new(Vec::new()),
        });
        let config = AppConfig {
            dry_run: true,
            ..AppConfig::default()
        };
        let tool = WriteEmailTool::new(scraper(dir.path(), PageContent::default()))
            .configured(&config)
            .with_oracle(oracle.clone(), "m");

        let result = tool.execute(args()).await.unwrap();
        assert_eq!(result.get("drafted_by"), Some(&json!("template")));
        assert!(oracle.prompts.lock().unwrap().is_empty());
    }
}
