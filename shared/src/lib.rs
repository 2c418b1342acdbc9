//! Shared types for the storefront platform
//!
//! Models, the unified error system and utility types used by the
//! storefront server and any future admin tooling.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};
