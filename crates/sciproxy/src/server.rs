//! HTTP server for the DOI proxy
//!
//! Provides /health, /cache/keys, /cache/purge and /{doi} endpoints.

use crate::types::{CachedDocument, DocumentQuery, HealthResponse, PurgeRequest, PurgeResponse};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use doi_fetch::SourceChain;
use pdf_cache::PdfCache;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Shared state for the HTTP server
pub struct ServerState {
    pub cache: PdfCache,
    pub sources: SourceChain,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(cache: PdfCache, sources: SourceChain) -> Self {
        Self {
            cache,
            sources,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/favicon.ico", get(favicon))
        .route("/cache/keys", get(list_cached))
        .route("/cache/purge", post(purge_cache))
        .route("/{*doi}", get(get_document))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server and run until `shutdown` resolves
pub async fn start_server(
    state: SharedState,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let router = create_router(state);
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let cache_stats = state.cache.stats().await;
    let uptime_secs = (Utc::now() - state.started_at).num_seconds() as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        cache: cache_stats,
    })
}

async fn favicon() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// List documents currently held in the cache
async fn list_cached(State(state): State<SharedState>) -> Json<Vec<CachedDocument>> {
    let scan = state.cache.scan().await;
    Json(scan.entries.into_iter().map(CachedDocument::from).collect())
}

/// Run a purge with the limits given in the request body
async fn purge_cache(
    State(state): State<SharedState>,
    Json(request): Json<PurgeRequest>,
) -> Json<PurgeResponse> {
    let max_age = request.max_age_secs.map(Duration::from_secs);
    let mut purged: Vec<String> = state
        .cache
        .purge(max_age, request.max_size_bytes)
        .await
        .into_iter()
        .collect();
    purged.sort();

    info!(count = purged.len(), "Purge requested over HTTP");
    Json(PurgeResponse { purged })
}

/// Serve the PDF for a DOI, from the cache or from the upstream sources
async fn get_document(
    State(state): State<SharedState>,
    Path(doi): Path<String>,
    Query(query): Query<DocumentQuery>,
) -> Response {
    let doi = doi.trim_start_matches('/');

    if !query.refresh {
        if let Some(data) = state.cache.get_data(doi).await {
            return pdf_response(data, true);
        }
    } else {
        debug!(doi, "Refresh requested, skipping cache");
    }

    match state.sources.fetch(doi).await {
        Ok(fetched) => {
            // The response does not wait for normalization and storage
            let cache = state.cache.clone();
            let key = doi.to_string();
            let payload = fetched.data.clone();
            tokio::spawn(async move {
                cache.put(&key, payload).await;
            });

            pdf_response(fetched.data, false)
        }
        Err(e) => {
            warn!(doi, error = %e, "Failed to fetch document");
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("Document not found: {}", doi),
                }),
            )
                .into_response()
        }
    }
}

fn pdf_response(data: Vec<u8>, from_cache: bool) -> Response {
    let cache_header = if from_cache { "HIT" } else { "MISS" };
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (X_CACHE, cache_header),
        ],
        data,
    )
        .into_response()
}
