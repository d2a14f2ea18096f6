use crate::error::AppError;
use crate::state::SharedState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use treegrant_core::{Listing, TreeHandle};
use uuid::Uuid;

// POST /list_files
#[derive(Deserialize)]
pub struct ListFilesRequest {
    pub uri: String,
}

pub async fn list_files(
    State(state): State<SharedState>,
    payload: Result<Json<ListFilesRequest>, JsonRejection>,
) -> Result<Json<Listing>, AppError> {
    let Json(req) = payload.map_err(AppError::bad_request_body)?;
    let start = Instant::now();
    let request_id = Uuid::new_v4();

    let result = state.listing.list_children(&req.uri).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(listing) => {
            tracing::info!(
                %request_id,
                uri = %req.uri,
                count = listing.len(),
                duration_ms,
                "POST /list_files"
            );
            Ok(Json(listing))
        }
        Err(err) => {
            tracing::info!(
                %request_id,
                uri = %req.uri,
                kind = %err.kind(),
                duration_ms,
                "POST /list_files failed"
            );
            Err(err.into())
        }
    }
}

// GET /grants
#[derive(Serialize)]
pub struct GrantsResponse {
    pub grants: Vec<TreeHandle>,
}

pub async fn grants(State(state): State<SharedState>) -> Result<Json<GrantsResponse>, AppError> {
    let grants = state.listing.grants().granted().await?;
    Ok(Json(GrantsResponse { grants }))
}

// POST /grants/revoke
#[derive(Deserialize)]
pub struct RevokeRequest {
    pub uri: String,
}

#[derive(Serialize)]
pub struct RevokeResponse {
    pub revoked: TreeHandle,
}

pub async fn revoke_grant(
    State(state): State<SharedState>,
    payload: Result<Json<RevokeRequest>, JsonRejection>,
) -> Result<Json<RevokeResponse>, AppError> {
    let Json(req) = payload.map_err(AppError::bad_request_body)?;
    let tree = TreeHandle::parse(&req.uri)?;
    state.listing.grants().revoke(&tree).await?;
    tracing::info!(uri = %tree, "POST /grants/revoke");
    Ok(Json(RevokeResponse { revoked: tree }))
}

// GET /status
#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub providers: Vec<String>,
}

pub async fn status(State(state): State<SharedState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        providers: state.authorities.clone(),
    })
}
