//! Scripted channel: canned answers for tests and unattended runs.
//!
//! Answers are consumed in order. When they run out, `ask` fails with
//! `ChannelError::InputClosed`, which callers treat like a closed terminal.

use async_trait::async_trait;
use prospector_core::error::ChannelError;
use prospector_core::interaction::Interaction;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::debug;

#[derive(Default)]
pub struct ScriptedChannel {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
    shown: Mutex<Vec<String>>,
}

impl ScriptedChannel {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    /// A channel with no answers: every question fails as if stdin were closed.
    pub fn silent() -> Self {
        Self::default()
    }

    /// Questions asked so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Messages shown so far, in order.
    pub fn shown(&self) -> Vec<String> {
        self.shown.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Answers not yet consumed.
    pub fn remaining(&self) -> usize {
        self.answers.lock().map(|v| v.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Interaction for ScriptedChannel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn ask(&self, prompt: &str) -> Result<String, ChannelError> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(prompt.to_string());
        }
        let answer = self
            .answers
            .lock()
            .map_err(|e| ChannelError::ConnectionLost(e.to_string()))?
            .pop_front()
            .ok_or_else(|| ChannelError::InputClosed(prompt.to_string()))?;
        debug!(prompt, answer = %answer, "Scripted answer");
        Ok(answer)
    }

    async fn show(&self, text: &str) -> Result<(), ChannelError> {
        if let Ok(mut shown) = self.shown.lock() {
            shown.push(text.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answers_in_order_then_closes() {
        let ch = ScriptedChannel::new(["one", "two"]);
        assert_eq!(ch.ask("q1").await.unwrap(), "one");
        assert_eq!(ch.remaining(), 1);
        assert_eq!(ch.ask("q2").await.unwrap(), "two");
        assert!(matches!(ch.ask("q3").await, Err(ChannelError::InputClosed(_))));
        assert_eq!(ch.asked(), vec!["q1", "q2", "q3"]);
    }

    #[tokio::test]
    async fn records_shown_text() {
        let ch = ScriptedChannel::silent();
        ch.show("hello").await.unwrap();
        assert_eq!(ch.shown(), vec!["hello"]);
    }
}
