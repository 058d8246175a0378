use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use summary_core::{IndexOptions, RetrievalIndex, SummaryStore, TopK};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const DEFAULT_TOP_K: usize = 3;

#[derive(Deserialize)]
pub struct SummaryParams {
    pub patient_id: Option<String>,
    pub query: Option<String>,
    /// Parsed in the handler so malformed values get the JSON error body.
    pub top_k: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SummaryResponse {
    Exact { patient_id: String, summary: String },
    Ranked { results: Vec<SummaryHit> },
}

#[derive(Debug, Serialize)]
pub struct SummaryHit {
    pub patient_id: String,
    pub summary: String,
    pub score: f32,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(d) => (StatusCode::BAD_REQUEST, d),
            ApiError::NotFound(d) => (StatusCode::NOT_FOUND, d),
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

/// Store and index are built once at startup and shared read-only by every request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SummaryStore>,
    pub index: Arc<RetrievalIndex>,
    pub default_top_k: usize,
}

impl AppState {
    pub fn new(store: SummaryStore, options: &IndexOptions, default_top_k: usize) -> Self {
        let index = RetrievalIndex::build(store.documents().map(str::to_string), options);
        tracing::info!(
            num_docs = index.len(),
            num_terms = index.vocabulary().len(),
            "retrieval index ready"
        );
        Self { store: Arc::new(store), index: Arc::new(index), default_top_k }
    }
}

pub fn build_app(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/summary", get(summary_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Exact id lookup first; otherwise rank summaries against `query`, falling
/// back to the unknown `patient_id` as query text.
pub async fn summary_handler(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<SummaryResponse>, ApiError> {
    if let Some(pid) = params.patient_id.as_deref().filter(|p| !p.is_empty()) {
        if let Some(summary) = state.store.get(pid) {
            return Ok(Json(SummaryResponse::Exact { patient_id: pid.to_string(), summary: summary.to_string() }));
        }
    }

    let q = params
        .query
        .as_deref()
        .filter(|q| !q.is_empty())
        .or(params.patient_id.as_deref().filter(|p| !p.is_empty()))
        .ok_or_else(|| ApiError::BadRequest("Either patient_id or query must be provided".into()))?;

    let top_k = match params.top_k.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        Some(raw) => {
            let k: i64 = raw
                .parse()
                .map_err(|_| ApiError::BadRequest(format!("top_k must be an integer, got '{raw}'")))?;
            TopK::try_from(k).map_err(|e| ApiError::BadRequest(e.to_string()))?
        }
        None => TopK::from(state.default_top_k),
    };

    let hits = state.index.query(q, top_k);
    tracing::debug!(query = q, hits = hits.len(), "ranked summaries");
    if hits.is_empty() {
        return Err(ApiError::NotFound("No summaries found for the given query".into()));
    }

    // Index positions line up with store positions, so duplicate texts keep their own ids.
    let results = hits
        .into_iter()
        .filter_map(|hit| {
            state.store.at(hit.doc_id).map(|entry| SummaryHit {
                patient_id: entry.patient_id.clone(),
                summary: hit.document.to_string(),
                score: hit.score,
            })
        })
        .collect();
    Ok(Json(SummaryResponse::Ranked { results }))
}
