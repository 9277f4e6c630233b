//! vocabot-core: Question model, markup extraction, and the driver loop.
//!
//! This crate defines the data model, the session state and its files, and
//! the traits the HTTP client and the answer oracle implement.

pub mod config;
pub mod cookies;
pub mod engine;
pub mod error;
pub mod extract;
pub mod model;
pub mod session;
pub mod statistics;
pub mod traits;

pub use error::{ExtractError, SessionError, StateError};
