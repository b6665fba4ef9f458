//! HTTP server for the browser UI.
//!
//! Serves a single search page and a JSON search endpoint backed by any
//! [`SearchEngine`]. A failed search aborts only its own request; the loaded
//! resources are shared read-only and stay usable for the next one.
//!
//! Routes:
//! - `GET /` - the search page
//! - `GET /api/search?query=..&k=..` - run a search
//! - `GET /health` - liveness and corpus size

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::models::QueryResult;
use crate::query::{QueryError, SearchEngine, SearchQuery};
use crate::{DEFAULT_TOP_K, MAX_TOP_K};

const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// Errors that can occur while serving requests.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Search execution failed
    #[error("Search failed: {0}")]
    SearchError(#[from] QueryError),

    /// Server could not start
    #[error("Initialization error: {0}")]
    InitializationError(String),
}

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::SearchError(QueryError::InvalidQuery(_)) => StatusCode::BAD_REQUEST,
            ServerError::SearchError(QueryError::ProviderError(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::SearchError(_) | ServerError::InitializationError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// JSON body sent with every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Query parameters for the search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPapersRequest {
    /// The search query text; blank means "no search"
    #[serde(default)]
    pub query: String,

    /// Number of results to return, 1 to 10
    #[serde(default = "default_paper_count")]
    pub k: usize,
}

fn default_paper_count() -> usize {
    DEFAULT_TOP_K
}

impl SearchPapersRequest {
    /// Check `k` against the range the UI offers.
    pub fn validate(&self) -> ServerResult<()> {
        if !(1..=MAX_TOP_K).contains(&self.k) {
            return Err(ServerError::InvalidRequest(format!(
                "k must be between 1 and {}, got {}",
                MAX_TOP_K, self.k
            )));
        }
        Ok(())
    }
}

/// Response payload for the search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPapersResponse {
    /// The original query text
    pub query: String,

    /// False when the query was blank and no search ran
    pub searched: bool,

    /// Results, nearest first
    pub results: Vec<SearchResultDto>,

    /// Number of results returned
    pub count: usize,

    /// Search time in seconds
    pub elapsed_secs: f64,

    /// Number of papers in the record store
    pub corpus_size: usize,

    /// Human-readable status line, absent when no search ran
    pub message: Option<String>,
}

/// A single result row as rendered by the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultDto {
    /// 1-based position in the result list
    pub rank: usize,

    /// Distance to the query (lower is better)
    pub score: f32,

    pub title: String,

    #[serde(rename = "abstract")]
    pub abstract_text: String,

    pub url: String,
}

impl SearchResultDto {
    fn from_result(rank: usize, result: QueryResult) -> Self {
        Self {
            rank,
            score: result.distance,
            title: result.record.title,
            abstract_text: result.record.abstract_text,
            url: result.record.url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub corpus_size: usize,
}

/// Network settings for the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host address
    pub host: String,

    /// Server port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<dyn SearchEngine>,
}

impl AppState {
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self { engine }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/health", get(health))
        .route("/api/search", get(search_papers))
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
///
/// # Errors
/// Returns `ServerError::InitializationError` if the address cannot be bound
/// or the server stops with an IO error
pub async fn serve(config: &ServerConfig, engine: Arc<dyn SearchEngine>) -> ServerResult<()> {
    let address = config.address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| ServerError::InitializationError(format!("Failed to bind {}: {}", address, e)))?;

    info!("Listening on http://{}", address);

    axum::serve(listener, router(AppState::new(engine)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::InitializationError(e.to_string()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutting down");
}

async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        corpus_size: state.engine.corpus_size(),
    })
}

/// Handle a search request.
///
/// Blank queries return an empty response with `searched: false` without
/// touching the engine. Malformed query strings get the same JSON error body
/// as every other failure.
pub async fn search_papers(
    State(state): State<AppState>,
    request: Result<Query<SearchPapersRequest>, QueryRejection>,
) -> ServerResult<Json<SearchPapersResponse>> {
    let Query(request) = request.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    request.validate()?;

    let corpus_size = state.engine.corpus_size();
    if request.query.trim().is_empty() {
        return Ok(Json(SearchPapersResponse {
            query: request.query,
            searched: false,
            results: Vec::new(),
            count: 0,
            elapsed_secs: 0.0,
            corpus_size,
            message: None,
        }));
    }

    let query = SearchQuery::new(request.query.clone(), request.k);
    let (results, summary) = state
        .engine
        .search_with_summary(&query)
        .await
        .map_err(|e| {
            error!("Search for {:?} failed: {}", request.query, e);
            ServerError::from(e)
        })?;

    info!("{}", summary);

    let results: Vec<SearchResultDto> = results
        .into_iter()
        .enumerate()
        .map(|(i, result)| SearchResultDto::from_result(i + 1, result))
        .collect();

    Ok(Json(SearchPapersResponse {
        query: request.query,
        searched: true,
        count: results.len(),
        results,
        elapsed_secs: summary.elapsed_secs(),
        corpus_size: summary.corpus_size,
        message: Some(summary.to_string()),
    }))
}
