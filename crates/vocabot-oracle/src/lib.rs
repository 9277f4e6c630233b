//! vocabot-oracle: answer oracles.
//!
//! Implements the `AnswerOracle` trait on top of a local Ollama instance,
//! plus a scripted mock used by tests.

pub mod error;
pub mod mock;
pub mod ollama;

pub use error::OracleError;
pub use mock::MockOracle;
pub use ollama::{ModelInfo, OllamaOracle};
