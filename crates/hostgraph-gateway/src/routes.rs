//! Route handlers for the graph and execution API

use crate::error::ApiError;
use crate::server::AppState;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use hostgraph_core::{NodeId, TranscriptStore};
use hostgraph_store::NodeUpdate;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct AddNodeRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub owned: bool,
}

#[derive(Deserialize)]
pub struct AddEdgeRequest {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub target: String,
    pub label: Option<String>,
}

#[derive(Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub command: String,
}

#[derive(Deserialize)]
pub struct PersistCommandRequest {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub output: String,
}

#[derive(Deserialize)]
pub struct DeleteCommandRequest {
    pub index: Option<i64>,
}

pub async fn get_graph(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.get_graph())
}

pub async fn clear_graph(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    state.store.clear()?;
    Ok(Json(json!({ "message": "Graph cleared" })))
}

pub async fn add_node(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddNodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state.store.add_node(&body.name, &body.notes, body.owned)?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn update_node(
    Path(node_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<NodeUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.update_node(&node_id, &body)?;
    Ok(Json(json!({ "message": "Updated" })))
}

pub async fn delete_node(
    Path(node_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.remove_node(&node_id)?;
    Ok(Json(json!({ "message": "Node deleted" })))
}

pub async fn add_edge(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddEdgeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.source.is_empty() || body.target.is_empty() {
        return Err(ApiError::bad_request("source/target required"));
    }
    let id = state
        .store
        .add_edge(&body.source, &body.target, body.label.as_deref())?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn delete_edge(
    Path(edge_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.remove_edge(&edge_id)?;
    Ok(Json(json!({ "message": "Removed" })))
}

/// Run a command for a node and stream its output as it arrives: zero or more
/// raw chunks, then exactly one trailing status line. The transcript persists
/// whether or not the client stays connected.
pub async fn execute_command(
    Path(node_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<ExecuteRequest>,
) -> Result<Response, ApiError> {
    let node = NodeId::from(node_id.as_str());
    let stream = state.engine.execute(&node, &body.command)?;
    let body = Body::from_stream(stream.map(Ok::<_, Infallible>));
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response())
}

/// Append a command record out-of-band, not tied to a live process.
pub async fn persist_command(
    Path(node_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<PersistCommandRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !state
        .store
        .persist_command(&node_id, &body.command, &body.output)
    {
        return Err(ApiError::not_found("Node not found"));
    }
    Ok(Json(json!({ "commands": state.store.get_node_commands(&node_id) })))
}

pub async fn delete_command(
    Path(node_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<DeleteCommandRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(index) = body.index else {
        return Err(ApiError::bad_request("Index required"));
    };
    let index = usize::try_from(index)
        .map_err(|_| ApiError::not_found("Node not found or invalid index"))?;
    if !state.store.delete_command(&node_id, index) {
        return Err(ApiError::not_found("Node not found or invalid index"));
    }
    Ok(Json(json!({ "commands": state.store.get_node_commands(&node_id) })))
}
