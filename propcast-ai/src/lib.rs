pub mod agent_description;
pub mod client;
pub mod models;

pub use agent_description::AgentDescriptionGenerator;
pub use client::{AiError, CompletionClient};
pub use models::{ChatMessage, ProviderConfig};
