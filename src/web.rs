use crate::{
    app::{UrlValidation, VideoError, VideoService},
    auth::{AccessTokens, Capability},
    metadata::VideoRecord,
};
use axum::{
    body::Bytes,
    extract::{RawQuery, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

struct SharedState {
    service: Arc<VideoService>,
    tokens: AccessTokens,
}

/// Build the api router around an already constructed service.
pub fn router(service: Arc<VideoService>, tokens: AccessTokens) -> Router {
    let state = Arc::new(SharedState { service, tokens });

    let edit_routes = Router::new()
        .route("/api/videos/import", post(import))
        .route("/api/videos/validate", get(validate))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_edit));

    let admin_routes = Router::new()
        .route("/api/videos/cache", delete(clear_cache))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .merge(edit_routes)
        .merge(admin_routes)
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::warn!("shutting down");
}

async fn start_app(
    service: Arc<VideoService>,
    tokens: AccessTokens,
    listen_addr: &str,
) -> anyhow::Result<()> {
    let app = router(service, tokens);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    log::info!("listening on {listen_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn start_daemon(
    service: Arc<VideoService>,
    tokens: AccessTokens,
    listen_addr: &str,
) -> anyhow::Result<()> {
    if tokens.is_open() {
        log::warn!("no api tokens configured, every caller may import and clear the cache");
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(start_app(service, tokens, listen_addr))
}

#[derive(Debug)]
enum HttpError {
    Video(VideoError),
    BadRequest(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            HttpError::Video(err) => {
                let status = match err {
                    VideoError::InvalidUrl => StatusCode::BAD_REQUEST,
                    VideoError::FetchFailed => StatusCode::BAD_GATEWAY,
                    VideoError::Forbidden => StatusCode::FORBIDDEN,
                    VideoError::Storage(_) => {
                        log::error!("{self:?}");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.code(), err.to_string())
            }
            HttpError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, "invalid_request", message.clone())
            }
        };

        (status, Json(json!({ "code": code, "message": message }))).into_response()
    }
}

impl From<VideoError> for HttpError {
    fn from(err: VideoError) -> Self {
        Self::Video(err)
    }
}

async fn require_edit(
    State(state): State<Arc<SharedState>>,
    request: Request,
    next: Next,
) -> Response {
    require(&state, Capability::Edit, request, next).await
}

async fn require_admin(
    State(state): State<Arc<SharedState>>,
    request: Request,
    next: Next,
) -> Response {
    require(&state, Capability::Admin, request, next).await
}

async fn require(
    state: &SharedState,
    capability: Capability,
    request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if !state.tokens.authorize(authorization, capability) {
        log::warn!(
            "forbidden: {} {} needs {capability:?}",
            request.method(),
            request.uri().path()
        );
        return HttpError::from(VideoError::Forbidden).into_response();
    }

    next.run(request).await
}

/// `None` for an empty body, `BadRequest` for anything that is not valid json.
fn parse_json_body<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>, HttpError> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(None);
    }

    serde_json::from_slice(body)
        .map(Some)
        .map_err(|err| HttpError::BadRequest(format!("invalid json body: {err}")))
}

fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub url: String,
}

/// Body is parsed by hand so rejections carry the usual error shape.
async fn import(
    State(state): State<Arc<SharedState>>,
    body: Bytes,
) -> Result<Json<VideoRecord>, HttpError> {
    let payload = parse_json_body::<ImportRequest>(&body)?.unwrap_or_default();
    log::debug!("payload: {payload:?}");

    let service = state.service.clone();

    tokio::task::block_in_place(move || service.import_by_url(&payload.url))
        .map(Json)
        .map_err(Into::into)
}

/// Malformed or missing input is answered with `valid: false`.
async fn validate(
    State(state): State<Arc<SharedState>>,
    RawQuery(query): RawQuery,
) -> Json<UrlValidation> {
    let url = query_param(query.as_deref(), "url").unwrap_or_default();
    Json(state.service.validate_url(&url))
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ClearCacheRequest {
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ClearCacheResponse {
    pub success: bool,
    pub cleared: usize,
}

/// Slug comes from the json body or `?slug=`. Neither means everything.
async fn clear_cache(
    State(state): State<Arc<SharedState>>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Json<ClearCacheResponse>, HttpError> {
    let from_body = parse_json_body::<ClearCacheRequest>(&body)?.and_then(|req| req.slug);

    let slug = from_body
        .or_else(|| query_param(query.as_deref(), "slug"))
        .map(|slug| slug.trim().to_string())
        .filter(|slug| !slug.is_empty());

    log::debug!("clear cache slug={slug:?}");

    let service = state.service.clone();
    let cleared = tokio::task::block_in_place(move || service.clear_cache(slug.as_deref()))?;

    Ok(Json(ClearCacheResponse {
        success: true,
        cleared,
    }))
}
