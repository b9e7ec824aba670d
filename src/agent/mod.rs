//! Research agents (planner/executor delegation over Ollama).

pub mod client;
pub mod delegator;
pub mod tools;

pub use delegator::{AgentConfig, TrendAgent};
