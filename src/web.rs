use std::{path::PathBuf, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{signal, sync::RwLock};
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};

use crate::{
    app::{AppError, Library},
    config::Config,
    search::{SearchHit, SearchOptions},
};

struct SharedState {
    library: Arc<RwLock<Library>>,
    config: Config,
}

pub fn router(library: Arc<RwLock<Library>>, config: Config) -> Router {
    let shared_state = Arc::new(SharedState { library, config });

    Router::new()
        .route("/api/status", get(status))
        .route("/api/index/update", post(update_index))
        .route("/api/search", post(search))
        .layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                    .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
            ),
        )
        .with_state(shared_state)
}

async fn start_app(library: Library, config: Config, listen_addr: &str) -> anyhow::Result<()> {
    let library = Arc::new(RwLock::new(library));

    async fn shutdown_signal(library: Arc<RwLock<Library>>) {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
            return;
        }

        let mut library = library.write().await;
        log::warn!("waiting for queues to stop");
        tokio::task::block_in_place(|| {
            if let Err(err) = library.close() {
                log::error!("failed to close library: {err}");
            }
        });
    }

    let app = router(library.clone(), config);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    log::info!("listening on {listen_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(library))
        .await?;

    Ok(())
}

pub fn start_daemon(library: Library, config: Config, listen_addr: &str) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(start_app(library, config, listen_addr))
}

#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            AppError::Query(_) => StatusCode::BAD_REQUEST,
            AppError::Archive(_) => StatusCode::NOT_FOUND,
            AppError::QueueClosed => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Index(_) | AppError::Other(_) => {
                log::error!("{self:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Serialize)]
struct StatusResponse {
    version: &'static str,
}

async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Deserialize)]
pub struct UpdateIndexRequest {
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct UpdateIndexResponse {
    pub queued: PathBuf,
}

async fn update_index(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<UpdateIndexRequest>,
) -> Result<(StatusCode, Json<UpdateIndexResponse>), HttpError> {
    log::debug!("payload: {payload:?}");

    let library = state.library.read().await;
    let queued = library.update_index(&payload.path)?;

    Ok((StatusCode::ACCEPTED, Json(UpdateIndexResponse { queued })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    pub highlight: Option<bool>,
    pub snippet_size: Option<u32>,
    pub max_count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub matches: Vec<SearchHit>,
}

async fn search(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, HttpError> {
    log::debug!("payload: {payload:?}");

    let defaults = state.config.search.options();
    let opts = SearchOptions {
        highlight: payload.highlight.unwrap_or(defaults.highlight),
        snippet_size: payload.snippet_size.unwrap_or(defaults.snippet_size),
        max_count: payload.max_count.unwrap_or(defaults.max_count),
    };

    let library = state.library.clone();
    tokio::task::block_in_place(move || {
        let library = library.blocking_read();
        let matches = library.search(&payload.query, &opts)?;
        Ok(Json(SearchResponse { matches }))
    })
}
