use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::handler::HandlerWithoutStateExt;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum::routing::{get, post, put};
use log::warn;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use uuid::Uuid;

use crate::audio::device::AudioDeviceInfo;
use crate::audio::engine::{EngineError, SoundEngine};
use crate::store::{ButtonStore, SoundButton, StoreError, ordering};

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ButtonStore>,
    pub engine: Arc<SoundEngine>,
    /// Directory served for the web view (`index.html` and its assets)
    pub web_root: PathBuf,
}

impl AppState {
    pub fn new(store: Arc<ButtonStore>, engine: Arc<SoundEngine>, web_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            engine,
            web_root: web_root.into(),
        }
    }
}

/// HTTP error variants mapped to JSON responses.
#[derive(Debug)]
pub enum ApiError {
    NotFound(&'static str),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.to_string()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        warn!("Store operation failed: {}", err);
        Self::Internal(err.to_string())
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Device lists for the web view's pickers.
#[derive(Debug, Serialize)]
pub struct DevicesResponse {
    pub output: Vec<AudioDeviceInfo>,
    pub input: Vec<AudioDeviceInfo>,
}

/// Build the Axum router with all handlers.
///
/// Anything outside `/api` is served from the web root; unknown paths
/// redirect to `/index.html`. CORS is open to any origin.
pub fn build_router(state: AppState) -> Router {
    let web_view = ServeDir::new(&state.web_root).fallback(redirect_to_index.into_service());

    Router::new()
        .route("/api/buttons", get(list_buttons).post(create_button))
        .route("/api/buttons/:id", put(update_button).delete(delete_button))
        .route("/api/groups", get(list_groups))
        .route("/api/play/:id", post(play_button))
        .route("/api/stop", post(stop))
        .route("/api/devices", get(list_devices))
        .fallback_service(web_view)
        .with_state(state)
        .layer(CorsLayer::permissive())
}

async fn redirect_to_index(uri: Uri) -> Response {
    if uri.path() == "/index.html" {
        // Pas de web view installée
        return ApiError::NotFound("web view not installed").into_response();
    }
    Redirect::temporary("/index.html").into_response()
}

/// Malformed ids answer 404 like unknown ones
fn button_id(id: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    id.map(|Path(id)| id)
        .map_err(|_| ApiError::NotFound("button not found"))
}

/// Run the HTTP server loop.
pub async fn run_http_server(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, build_router(state)).await
}

/// Store and engine calls block (file writes, device retries)
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
}

async fn list_buttons(State(state): State<AppState>) -> Result<Json<Vec<SoundButton>>, ApiError> {
    let buttons = blocking(move || Ok(state.store.get_all())).await?;
    Ok(Json(buttons))
}

async fn create_button(
    State(state): State<AppState>,
    Json(draft): Json<SoundButton>,
) -> Result<Json<SoundButton>, ApiError> {
    let created = blocking(move || Ok(ordering::add_button(&state.store, draft)?)).await?;
    Ok(Json(created))
}

async fn update_button(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    Json(values): Json<SoundButton>,
) -> Result<StatusCode, ApiError> {
    let id = button_id(id)?;
    let updated = blocking(move || Ok(ordering::edit_button(&state.store, id, &values)?)).await?;
    if updated {
        Ok(StatusCode::OK)
    } else {
        Err(ApiError::NotFound("button not found"))
    }
}

async fn delete_button(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = button_id(id)?;
    let deleted = blocking(move || Ok(ordering::delete_button(&state.store, id)?)).await?;
    if deleted {
        Ok(StatusCode::OK)
    } else {
        Err(ApiError::NotFound("button not found"))
    }
}

async fn list_groups(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let groups = blocking(move || Ok(state.store.list_groups())).await?;
    Ok(Json(groups))
}

async fn play_button(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = button_id(id)?;
    blocking(move || {
        let button = state
            .store
            .get_by_id(id)
            .ok_or(ApiError::NotFound("button not found"))?;
        state.engine.play(&button.file_path)?;
        Ok(StatusCode::OK)
    })
    .await
}

async fn stop(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    blocking(move || {
        state.engine.stop();
        Ok(StatusCode::OK)
    })
    .await
}

async fn list_devices(State(state): State<AppState>) -> Result<Json<DevicesResponse>, ApiError> {
    let devices = blocking(move || {
        Ok(DevicesResponse {
            output: state.engine.output_devices(),
            input: state.engine.input_devices(),
        })
    })
    .await?;
    Ok(Json(devices))
}
