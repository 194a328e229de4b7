//! REST routes over the grievance service
//!
//! Response envelopes follow the `{"status": ..., "data": ...}` shape the
//! frontend consumes. Error payloads carry the taxonomy's message and map
//! onto status codes: validation 400, bad transition 422, unknown record
//! 404, ledger outage 503, ledger rejection 409.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use base64::{engine::general_purpose, Engine as _};
use prometheus::{Registry, TextEncoder};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use redress_common::{
    GrievanceStatus, LedgerError, RedressError, ValidationError, EVIDENCE_MAX_BYTES,
};
use redress_sync::{GrievanceFilter, GrievanceService, SubmitGrievance};

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<GrievanceService>,
    pub registry: Arc<Registry>,
}

/// Error wrapper mapping the taxonomy onto HTTP status codes
#[derive(Debug)]
pub struct ApiError(RedressError);

impl From<RedressError> for ApiError {
    fn from(err: RedressError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RedressError::Validation(ValidationError::EvidenceTooLarge { .. }) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            RedressError::Validation(_) => StatusCode::BAD_REQUEST,
            RedressError::Transition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RedressError::Ledger(LedgerError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            RedressError::Ledger(LedgerError::Rejected(_)) => StatusCode::CONFLICT,
            RedressError::Ledger(LedgerError::RecordNotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(json!({ "status": "error", "message": self.0.to_string() })),
        )
            .into_response()
    }
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api/grievances", post(submit_grievance).get(list_grievances))
        .route("/api/grievances/:ledger_id", get(grievance_detail))
        .route("/api/grievances/:ledger_id/status", patch(update_status))
        .route("/api/grievances/:ledger_id/transactions", get(audit_trail))
        .route("/api/admins/:admin_id/stats", get(admin_stats))
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn metrics(State(state): State<AppState>) -> Result<String, ApiError> {
    let mut buffer = String::new();
    TextEncoder::new()
        .encode_utf8(&state.registry.gather(), &mut buffer)
        .map_err(|err| RedressError::Internal(err.to_string()))?;
    Ok(buffer)
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    title: String,
    category: String,
    submitter_row_id: i64,
    submitter_id: String,
    /// Base64-encoded evidence bytes
    evidence: String,
}

async fn submit_grievance(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let evidence = general_purpose::STANDARD
        .decode(request.evidence.as_bytes())
        .map_err(|_| RedressError::from(ValidationError::MalformedEvidence))?;
    if evidence.len() > EVIDENCE_MAX_BYTES {
        return Err(RedressError::from(ValidationError::EvidenceTooLarge {
            actual: evidence.len(),
            limit: EVIDENCE_MAX_BYTES,
        })
        .into());
    }

    let row = state
        .service
        .submit_grievance(SubmitGrievance {
            title: request.title,
            category: request.category,
            submitter_row_id: request.submitter_row_id,
            submitter_id: request.submitter_id,
            evidence,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "success", "data": { "grievance": row } })),
    ))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    submitter: Option<i64>,
    status: Option<String>,
}

async fn list_grievances(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let status = params.status.as_deref().map(parse_status).transpose()?;
    let rows = state
        .service
        .list_grievances(GrievanceFilter {
            submitter_row_id: params.submitter,
            status,
        })
        .await?;

    Ok(Json(json!({
        "status": "success",
        "results": rows.len(),
        "data": { "grievances": rows },
    })))
}

async fn grievance_detail(
    State(state): State<AppState>,
    Path(ledger_id): Path<u64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let record = state.service.get_detail(ledger_id).await?;
    Ok(Json(json!({
        "status": "success",
        "data": { "grievance": record },
    })))
}

#[derive(Debug, Deserialize)]
struct StatusUpdateRequest {
    status: String,
    actor_row_id: i64,
}

async fn update_status(
    State(state): State<AppState>,
    Path(ledger_id): Path<u64>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let target = parse_status(&request.status)?;
    state
        .service
        .request_status_change(ledger_id, target, request.actor_row_id)
        .await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Grievance status updated",
    })))
}

async fn audit_trail(
    State(state): State<AppState>,
    Path(ledger_id): Path<u64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let trail = state.service.audit_trail(ledger_id).await?;
    Ok(Json(json!({
        "status": "success",
        "results": trail.len(),
        "data": { "transactions": trail },
    })))
}

async fn admin_stats(
    State(state): State<AppState>,
    Path(admin_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let stats = state.service.resolution_stats(admin_id).await?;
    Ok(Json(json!({
        "status": "success",
        "data": { "stats": stats },
    })))
}

/// Accept either a numeric status code or a human-readable label
fn parse_status(raw: &str) -> Result<GrievanceStatus, ApiError> {
    if let Ok(code) = raw.parse::<u8>() {
        return GrievanceStatus::from_code(code)
            .ok_or_else(|| RedressError::from(ValidationError::UnknownStatus(raw.to_string())).into());
    }
    GrievanceStatus::from_label(raw)
        .ok_or_else(|| RedressError::from(ValidationError::UnknownStatus(raw.to_string())).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_accepts_code_and_label() {
        assert_eq!(parse_status("2").unwrap(), GrievanceStatus::UnderInvestigation);
        assert_eq!(
            parse_status("Pending Committee Review").unwrap(),
            GrievanceStatus::PendingCommitteeReview
        );
        assert!(parse_status("7").is_err());
        assert!(parse_status("Escalated").is_err());
    }
}
