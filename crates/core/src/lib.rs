//! # prospector core
//!
//! Domain types, traits, and error definitions for the prospector outreach
//! agent. Every subsystem is defined as a trait here; implementations live
//! in their respective crates and depend inward on this one.

pub mod error;
pub mod message;
pub mod provider;
pub mod interaction;
pub mod tool;
pub mod memory;
pub mod domain;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{Message, Role, Conversation, ConversationId, MessageToolCall};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use interaction::Interaction;
pub use tool::{Capability, Tool, ToolResult, ToolRegistry};
pub use memory::{RecallSource, Recalled, Snapshot, SnapshotBackend};
pub use domain::{Icp, Lead};
