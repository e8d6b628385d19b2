//! Hostgraph Gateway - HTTP surface over the graph store and execution engine

pub mod error;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, start_server, AppState};
