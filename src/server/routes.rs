use super::error::AppError;
use super::state::AppState;
use crate::streaming::{materialize, Facet, Materialized};
use axum::{
    body::Body,
    extract::State,
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::info;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

pub async fn new_search_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    info!("Received request for new search");
    state.store.replace()?;
    Ok(Json(json!({ "message": "New search sample generated" })))
}

pub async fn clusters_handler(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    stream_facet(&state, Facet::Categories)
}

pub async fn products_handler(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    stream_facet(&state, Facet::Products)
}

pub async fn associations_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Response, AppError> {
    stream_facet(&state, Facet::Associations)
}

pub async fn clusters_materialized_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Materialized>, AppError> {
    materialize_facet(&state, Facet::Categories)
}

pub async fn products_materialized_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Materialized>, AppError> {
    materialize_facet(&state, Facet::Products)
}

pub async fn associations_materialized_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Materialized>, AppError> {
    materialize_facet(&state, Facet::Associations)
}

fn stream_facet(state: &AppState, facet: Facet) -> Result<Response, AppError> {
    info!("Received request for {} stream", facet);
    // One snapshot per request; a concurrent new search does not affect it
    let sample = state.store.get_or_init()?;
    let lines = state
        .producer
        .stream(facet, sample, Arc::clone(state.store.catalog()))
        .map(Ok::<_, Infallible>);

    Ok(([(CONTENT_TYPE, TEXT_PLAIN)], Body::from_stream(lines)).into_response())
}

fn materialize_facet(state: &AppState, facet: Facet) -> Result<Json<Materialized>, AppError> {
    info!("Received request for materialized {}", facet);
    let sample = state.store.get_or_init()?;
    Ok(Json(materialize(facet, &sample, state.store.catalog())))
}
