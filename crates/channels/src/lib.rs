//! User interaction channels for prospector.
//!
//! - **CLI** - terminal questions and answers (stdin/stdout)
//! - **Scripted** - canned answers for tests and unattended runs

pub mod cli;
pub mod scripted;

pub use cli::CliChannel;
pub use scripted::ScriptedChannel;
