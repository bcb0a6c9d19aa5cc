//! REST endpoints for access resolution, guard checks, onboarding and scans.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::access::{AccessStateResolver, get_redirect_path};
use crate::auth::{Identity, StaticIdentity};
use crate::error::ScoreError;
use crate::guard::{GuardKind, GuardMount, GuardPhase, RecordingNavigator, RouteGuard};
use crate::scores::{ScoreCache, normalize_scores};
use crate::store::ProfileStore;

/// Header carrying the authenticated user id, set by the auth proxy.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProfileStore>,
    pub resolver: AccessStateResolver,
    pub scores: Arc<ScoreCache>,
}

impl AppState {
    pub fn new(store: Arc<dyn ProfileStore>, scores: Arc<ScoreCache>) -> Self {
        Self {
            resolver: AccessStateResolver::new(Arc::clone(&store)),
            store,
            scores,
        }
    }
}

/// Build the Axum router.
pub fn gate_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/access/{id}", get(get_access))
        .route("/api/guards/{guard}", get(check_guard))
        .route("/api/onboarding/{id}", post(submit_onboarding))
        .route("/api/scans/{id}", post(create_scan))
        .route("/api/scans/{id}/scores", get(get_scores))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}

/// Identity forwarded by the auth proxy. A missing or blank header is a guest.
fn caller_identity(headers: &HeaderMap) -> Option<Identity> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Identity::new)
}

/// Require the caller to be signed in as `user_id`.
///
/// Guests get 401; a signed-in caller naming another user gets 403.
fn authorize(headers: &HeaderMap, user_id: &str) -> Result<Identity, Response> {
    let Some(caller) = caller_identity(headers) else {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            format!("Missing {USER_ID_HEADER} header"),
        ));
    };
    if caller.user_id != user_id {
        warn!(caller = %caller, user_id, "Rejected request for another user");
        return Err(error_response(
            StatusCode::FORBIDDEN,
            "Requests may only act on the caller's own profile",
        ));
    }
    Ok(caller)
}

fn error_response(status: StatusCode, message: impl std::fmt::Display) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.to_string() })),
    )
        .into_response()
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "scan-gate"
    }))
}

// ── Access ──────────────────────────────────────────────────────────────

async fn get_access(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let identity = match authorize(&headers, &user_id) {
        Ok(identity) => identity,
        Err(response) => return response,
    };
    match state.resolver.resolve(&identity).await {
        Ok(access) => Json(serde_json::json!({
            "user_id": identity.user_id,
            "state": access,
            "redirect": get_redirect_path(access).path(),
        }))
        .into_response(),
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, e),
    }
}

#[derive(Serialize)]
struct GuardCheckResponse {
    guard: GuardKind,
    #[serde(flatten)]
    phase: GuardPhase,
}

/// GET /api/guards/{guard}
///
/// Runs one guard check for the caller. Guests are callers without the
/// user id header.
async fn check_guard(
    State(state): State<AppState>,
    Path(guard): Path<String>,
    headers: HeaderMap,
) -> Response {
    let Some(kind) = GuardKind::parse(&guard) else {
        return error_response(StatusCode::NOT_FOUND, format!("Unknown guard: {guard}"));
    };

    let identity = caller_identity(&headers);

    let navigator = Arc::new(RecordingNavigator::new());
    let route_guard = RouteGuard::new(
        kind.policy(),
        Arc::new(StaticIdentity::new(identity)),
        state.resolver.clone(),
        navigator,
    );
    let mount = GuardMount::new();
    let phase = route_guard
        .check(&mount)
        .await
        .unwrap_or(GuardPhase::Pending);

    Json(GuardCheckResponse { guard: kind, phase }).into_response()
}

// ── Onboarding ──────────────────────────────────────────────────────────

async fn submit_onboarding(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    if let Err(response) = authorize(&headers, &user_id) {
        return response;
    }

    let answers = match body {
        serde_json::Value::Object(map) if !map.is_empty() => map,
        _ => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Onboarding answers must be a non-empty JSON object",
            );
        }
    };

    match state.store.complete_onboarding(&user_id, &answers).await {
        Ok(record) => {
            info!(user_id = %user_id, "Onboarding submitted");
            Json(serde_json::json!({
                "user_id": user_id,
                "onboarding": record,
            }))
            .into_response()
        }
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Failed to store onboarding");
            error_response(StatusCode::SERVICE_UNAVAILABLE, e)
        }
    }
}

// ── Scans ───────────────────────────────────────────────────────────────

async fn create_scan(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    Json(analysis): Json<serde_json::Value>,
) -> Response {
    if let Err(response) = authorize(&headers, &user_id) {
        return response;
    }

    if !analysis.is_object() {
        return error_response(StatusCode::BAD_REQUEST, ScoreError::NotAnObject);
    }

    let scan = match state.store.record_scan(&user_id, &analysis).await {
        Ok(scan) => scan,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Failed to record scan");
            return error_response(StatusCode::SERVICE_UNAVAILABLE, e);
        }
    };

    // The scan counts as paid even when its scores are unreadable.
    let scores = match normalize_scores(&analysis) {
        Ok(card) => {
            state.scores.insert(scan.id, card.clone()).await;
            Some(card)
        }
        Err(e) => {
            warn!(scan_id = %scan.id, error = %e, "Scan analysis has no usable scores");
            None
        }
    };

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "scan_id": scan.id,
            "user_id": scan.user_id,
            "scores": scores,
        })),
    )
        .into_response()
}

async fn get_scores(State(state): State<AppState>, Path(scan_id): Path<Uuid>) -> Response {
    match state.scores.get_or_load(scan_id, state.store.as_ref()).await {
        Ok(card) => Json(card).into_response(),
        Err(e @ ScoreError::ScanNotFound { .. }) => error_response(StatusCode::NOT_FOUND, e),
        Err(e @ (ScoreError::NoScores | ScoreError::NotAnObject)) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e)
        }
        Err(e @ ScoreError::Database(_)) => error_response(StatusCode::SERVICE_UNAVAILABLE, e),
    }
}
