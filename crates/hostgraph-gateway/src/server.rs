//! Server wiring — state, router, and listener

use crate::routes;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use hostgraph_core::ServerConfig;
use hostgraph_exec::ExecEngine;
use hostgraph_store::GraphStore;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub struct AppState {
    pub store: Arc<GraphStore>,
    pub engine: Arc<ExecEngine>,
}

impl AppState {
    pub fn new(store: Arc<GraphStore>) -> Self {
        let engine = Arc::new(ExecEngine::new(store.clone()));
        Self { store, engine }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/graph", get(routes::get_graph).delete(routes::clear_graph))
        .route("/graph/nodes", post(routes::add_node))
        .route(
            "/graph/nodes/:node_id",
            put(routes::update_node).delete(routes::delete_node),
        )
        .route("/graph/edges", post(routes::add_edge))
        .route("/graph/edges/:edge_id", delete(routes::delete_edge))
        .route("/graph/nodes/:node_id/execute", post(routes::execute_command))
        .route(
            "/graph/nodes/:node_id/persist-command",
            post(routes::persist_command),
        )
        .route(
            "/graph/nodes/:node_id/delete-command",
            delete(routes::delete_command),
        );

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/v1", api)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(state)
}

async fn health_handler(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "nodes": state.store.get_graph().nodes.len(),
        "active_executions": state.engine.registry().active_count(),
    }))
}

pub async fn start_server(config: ServerConfig, db_path: impl AsRef<Path>) -> anyhow::Result<()> {
    let store = Arc::new(GraphStore::open(db_path.as_ref())?);
    let state = Arc::new(AppState::new(store));
    let app = build_router(state);

    let bind_addr: SocketAddr = format!("{}:{}", config.bind.to_addr(), config.port).parse()?;

    info!("Hostgraph v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: {}", bind_addr);
    info!("  Graph file:   {}", db_path.as_ref().display());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
