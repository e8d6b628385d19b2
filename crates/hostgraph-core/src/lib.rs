//! Hostgraph Core - Shared types, the transcript store boundary, and error handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
