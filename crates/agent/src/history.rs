//! Projection of the run's conversation into oracle input.
//!
//! The chat APIs behind the oracle accept only `user` and `assistant`
//! turns, so system text is folded into the first user message and
//! observations are replayed as assistant messages marked as function
//! output.

use prospector_core::message::{Conversation, Message, Role};

/// Prefix that marks a replayed capability result.
pub const OBSERVATION_PREFIX: &str = "Function response: ";

/// Rebuild the oracle-facing message list from `conversation`.
pub fn project(conversation: &Conversation) -> Vec<Message> {
    let system: Vec<&str> = conversation
        .messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();

    let mut projected: Vec<Message> = conversation
        .messages
        .iter()
        .filter_map(|m| match m.role {
            Role::System => None,
            Role::User => Some(Message::user(m.content.clone())),
            Role::Assistant if m.content.trim().is_empty() => None,
            Role::Assistant => Some(Message::assistant(m.content.clone())),
            Role::Observation => Some(Message::assistant(format!(
                "{OBSERVATION_PREFIX}{}",
                m.content
            ))),
        })
        .collect();

    if !system.is_empty() {
        let preamble = system.join("\n\n");
        match projected.first_mut() {
            Some(first) if first.role == Role::User => {
                first.content = format!("{preamble}\n\n{}", first.content);
            }
            _ => projected.insert(0, Message::user(preamble)),
        }
    }

    projected
}
