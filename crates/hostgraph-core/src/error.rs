//! Error types for Hostgraph

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to launch process: {0}")]
    Launch(String),

    #[error("stream read failed: {0}")]
    StreamRead(String),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn launch(reason: impl Into<String>) -> Self {
        Self::Launch(reason.into())
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    pub fn node_not_found(node_id: impl Into<String>) -> Self {
        Self::NodeNotFound(node_id.into())
    }
}
