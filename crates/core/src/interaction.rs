//! Interaction trait: how the agent talks to the person running it.
//!
//! Implementations: console (stdin/stdout) and scripted (tests, unattended
//! runs). Blocking reads are `.await` points; the planning loop never has
//! more than one outstanding question.

use async_trait::async_trait;
use crate::error::ChannelError;

#[async_trait]
pub trait Interaction: Send + Sync {
    /// Short name for logs (e.g., "console").
    fn name(&self) -> &str;

    /// Show `prompt` and read one line of input.
    async fn ask(&self, prompt: &str) -> Result<String, ChannelError>;

    /// Display text to the user.
    async fn show(&self, text: &str) -> Result<(), ChannelError>;

    /// Ask for free-form input, optionally restricted to `options`.
    ///
    /// An empty answer takes `default`. Answers outside `options` are
    /// rejected and the question is asked again.
    async fn get_user_input(
        &self,
        prompt: &str,
        default: Option<&str>,
        options: &[String],
    ) -> Result<String, ChannelError> {
        let mut question = prompt.to_string();
        if !options.is_empty() {
            question.push_str(&format!(" ({})", options.join("/")));
        }
        if let Some(default) = default {
            question.push_str(&format!(" [default: {default}]"));
        }

        loop {
            let raw = self.ask(&question).await?;
            let answer = match raw.trim() {
                "" => default.unwrap_or_default().to_string(),
                other => other.to_string(),
            };

            if options.is_empty() || options.contains(&answer) {
                return Ok(answer);
            }
            self.show(&format!("Please choose one of: {}", options.join(", ")))
                .await?;
        }
    }

    /// Ask a yes/no question. An empty answer takes `default`; only
    /// `y`, `yes`, `true` and `1` count as yes.
    async fn confirm(&self, description: &str, default: bool) -> Result<bool, ChannelError> {
        let hint = if default { "Y/n" } else { "y/N" };
        let raw = self
            .ask(&format!("Do you want to {description}? ({hint})"))
            .await?;
        Ok(match raw.trim().to_lowercase().as_str() {
            "" => default,
            "y" | "yes" | "true" | "1" => true,
            _ => false,
        })
    }
}
