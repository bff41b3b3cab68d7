//! CLI channel: questions and answers over the terminal.
//!
//! Reads answers from stdin, writes prompts and messages to stdout.
//! Used for `prospector run` in interactive mode.

use async_trait::async_trait;
use prospector_core::error::ChannelError;
use prospector_core::interaction::Interaction;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;

type LineSource = Lines<Box<dyn AsyncBufRead + Unpin + Send>>;
type Sink = Box<dyn AsyncWrite + Unpin + Send>;

/// Interactive terminal channel.
pub struct CliChannel {
    lines: Mutex<LineSource>,
    out: Mutex<Sink>,
}

impl CliChannel {
    /// A channel over the process's stdin and stdout.
    pub fn new() -> Self {
        Self::with_io(BufReader::new(io::stdin()), io::stdout())
    }

    /// A channel over arbitrary streams.
    pub fn with_io(
        input: impl AsyncBufRead + Unpin + Send + 'static,
        output: impl AsyncWrite + Unpin + Send + 'static,
    ) -> Self {
        let input: Box<dyn AsyncBufRead + Unpin + Send> = Box::new(input);
        Self {
            lines: Mutex::new(input.lines()),
            out: Mutex::new(Box::new(output)),
        }
    }

    async fn write(&self, text: &str) -> Result<(), ChannelError> {
        let mut out = self.out.lock().await;
        out.write_all(text.as_bytes())
            .await
            .map_err(|e| ChannelError::ConnectionLost(e.to_string()))?;
        out.flush()
            .await
            .map_err(|e| ChannelError::ConnectionLost(e.to_string()))
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Interaction for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn ask(&self, prompt: &str) -> Result<String, ChannelError> {
        self.write(&format!("{prompt}\n> ")).await?;

        match self.lines.lock().await.next_line().await {
            Ok(Some(line)) => Ok(line.trim_end_matches('\r').to_string()),
            Ok(None) => Err(ChannelError::InputClosed(prompt.to_string())), // EOF (Ctrl+D)
            Err(e) => Err(ChannelError::ConnectionLost(e.to_string())),
        }
    }

    async fn show(&self, text: &str) -> Result<(), ChannelError> {
        self.write(&format!("{text}\n")).await
    }
}
