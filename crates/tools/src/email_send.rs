//! `send_email`: deliver a drafted email through the transport chain.
//!
//! This is the only capability with an external side effect; the registry
//! gates it behind explicit user confirmation before `execute` runs.

use async_trait::async_trait;
use chrono::Utc;
use prospector_config::AppConfig;
use prospector_core::error::{AdapterError, ToolError};
use prospector_core::tool::{Capability, Tool, ToolResult};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::adapter::{
    Adapter, AdapterChain, ensure_success, env_secret, http_client, request_error, require,
};
use crate::args::required_str;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// What a transport reports back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: Option<String>,
    pub file_path: Option<PathBuf>,
}

/// Sender identity shared by the hosted transports.
#[derive(Debug, Clone)]
pub struct Sender {
    pub email: String,
    pub name: String,
}

impl Sender {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            email: config.email.from_email.clone(),
            name: config.email.from_name.clone(),
        }
    }
}

pub struct SendGridTransport {
    api_key: Option<String>,
    sender: Sender,
    client: reqwest::Client,
}

impl SendGridTransport {
    pub fn new(api_key: Option<String>, sender: Sender) -> Self {
        Self {
            api_key,
            sender,
            client: http_client(Duration::from_secs(30)),
        }
    }

    pub fn from_env(sender: Sender) -> Self {
        Self::new(env_secret("SENDGRID_API_KEY"), sender)
    }
}

#[async_trait]
impl Adapter<OutgoingEmail, Delivery> for SendGridTransport {
    fn name(&self) -> &str {
        "sendgrid"
    }

    async fn call(&self, email: &OutgoingEmail) -> Result<Delivery, AdapterError> {
        let key = require(&self.api_key, "SENDGRID_API_KEY")?;
        let body = json!({
            "personalizations": [{ "to": [{ "email": email.to }] }],
            "from": { "email": self.sender.email, "name": self.sender.name },
            "subject": email.subject,
            "content": [{ "type": "text/plain", "value": email.body }],
        });

        let response = self
            .client
            .post("https://api.sendgrid.com/v3/mail/send")
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;
        let response = ensure_success(response).await?;

        let message_id = response
            .headers()
            .get("X-Message-Id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(Delivery {
            message_id,
            file_path: None,
        })
    }
}

pub struct MailerSendTransport {
    api_key: Option<String>,
    sender: Sender,
    client: reqwest::Client,
}

impl MailerSendTransport {
    pub fn new(api_key: Option<String>, sender: Sender) -> Self {
        Self {
            api_key,
            sender,
            client: http_client(Duration::from_secs(30)),
        }
    }

    pub fn from_env(sender: Sender) -> Self {
        Self::new(env_secret("MAILERSEND_API_KEY"), sender)
    }
}

#[async_trait]
impl Adapter<OutgoingEmail, Delivery> for MailerSendTransport {
    fn name(&self) -> &str {
        "mailersend"
    }

    async fn call(&self, email: &OutgoingEmail) -> Result<Delivery, AdapterError> {
        let key = require(&self.api_key, "MAILERSEND_API_KEY")?;
        let body = json!({
            "from": { "email": self.sender.email, "name": self.sender.name },
            "to": [{ "email": email.to }],
            "subject": email.subject,
            "text": email.body,
        });

        let response = self
            .client
            .post("https://api.mailersend.com/v1/email")
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;
        let response = ensure_success(response).await?;

        let message_id = response
            .headers()
            .get("X-Message-Id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(Delivery {
            message_id,
            file_path: None,
        })
    }
}

/// Writes each email to a JSON file instead of sending it. Always available.
pub struct Outbox {
    dir: PathBuf,
}

impl Outbox {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_name(recipient: &str) -> String {
        let recipient = recipient.replace('@', "_at_").replace('.', "_");
        format!("{}_{recipient}.json", Utc::now().format("%Y%m%d_%H%M%S"))
    }
}

#[async_trait]
impl Adapter<OutgoingEmail, Delivery> for Outbox {
    fn name(&self) -> &str {
        "outbox"
    }

    async fn call(&self, email: &OutgoingEmail) -> Result<Delivery, AdapterError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AdapterError::Io(e.to_string()))?;

        let path = self.dir.join(Self::file_name(&email.to));
        let record = json!({
            "to": email.to,
            "subject": email.subject,
            "body": email.body,
            "timestamp": Utc::now().to_rfc3339(),
        });
        let text =
            serde_json::to_string_pretty(&record).map_err(|e| AdapterError::Parse(e.to_string()))?;
        tokio::fs::write(&path, text)
            .await
            .map_err(|e| AdapterError::Io(e.to_string()))?;

        Ok(Delivery {
            message_id: None,
            file_path: Some(path),
        })
    }
}

/// Build the transport chain from `[email]`. Dry run writes to the outbox only.
pub fn transport_chain(config: &AppConfig) -> AdapterChain<OutgoingEmail, Delivery> {
    let sender = Sender::from_config(config);
    let outbox = || Arc::new(Outbox::new(config.outbox_dir()));

    if config.dry_run {
        return AdapterChain::new("email").with(outbox());
    }

    let mut chain = AdapterChain::new("email");
    for provider in &config.email.providers {
        chain = match provider.as_str() {
            "sendgrid" => chain.with(Arc::new(SendGridTransport::from_env(sender.clone()))),
            "mailersend" => chain.with(Arc::new(MailerSendTransport::from_env(sender.clone()))),
            "outbox" => chain.with(outbox()),
            _ => chain,
        };
    }
    if chain.is_empty() {
        chain = chain.with(outbox());
    }
    chain
}

pub struct SendEmailTool {
    chain: AdapterChain<OutgoingEmail, Delivery>,
}

impl SendEmailTool {
    pub fn new(chain: AdapterChain<OutgoingEmail, Delivery>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl Tool for SendEmailTool {
    fn capability(&self) -> Capability {
        Capability::SendEmail
    }

    fn description(&self) -> &str {
        "Send an email to a lead. The user is asked to confirm before anything is sent."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "recipient_email": { "type": "string" },
                "subject": { "type": "string" },
                "body": { "type": "string" }
            },
            "required": ["recipient_email", "subject", "body"]
        })
    }

    fn preview(&self, arguments: &Value) -> String {
        let field = |key: &str| arguments.get(key).and_then(Value::as_str).unwrap_or_default();
        format!(
            "To: {}\nSubject: {}\n\n{}",
            field("recipient_email"),
            field("subject"),
            field("body")
        )
    }

    fn confirmation_label(&self) -> String {
        "send this email".into()
    }

    fn cancellation_message(&self) -> String {
        "Email sending cancelled by user".into()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        let email = OutgoingEmail {
            to: required_str(&arguments, "recipient_email")?.to_string(),
            subject: required_str(&arguments, "subject")?.to_string(),
            body: required_str(&arguments, "body")?.to_string(),
        };

        let handled = self.chain.try_in_order(&email).await?;
        info!(to = %email.to, provider = %handled.adapter, "Email delivered");

        let mut result = json!({ "provider": handled.adapter });
        if let Some(id) = handled.value.message_id {
            result["message_id"] = json!(id);
        }
        if let Some(path) = handled.value.file_path {
            result["file_path"] = json!(path.display().to_string());
        }
        Ok(ToolResult::success(result))
    }
}
