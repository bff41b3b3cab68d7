//! Reasoning oracle providers for prospector.
//!
//! All providers implement the `prospector_core::Provider` trait.
//! The router builds the oracle (with fallback) from configuration.

pub mod chain;
pub mod chat;
pub mod router;

pub use chain::OracleChain;
pub use chat::ChatCompletionsProvider;
pub use router::{ProviderRouter, build_from_config, build_oracle};
