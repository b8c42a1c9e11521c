//! HTTP API server.

// Allow clippy lint triggered by utoipa's OpenApi derive macro
#![allow(clippy::needless_for_each)]

mod chat;
mod files;

use std::sync::Arc;

use agent_protocol::OpeningDelta;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::build_info;
use crate::config::{Config, ServerCapabilities, ServerKeys};
use crate::core::Error;
use crate::core::runner::AgentRunner;
use crate::core::sandbox::{SandboxError, SandboxKind};
use crate::core::secret::mask_secrets;
use crate::core::session::{SessionId, SessionRegistry};

pub use chat::ChatRequest;
pub use files::{FileList, WriteFileRequest, WriteFileResponse};

/// Shared application state.
pub struct AppState {
    /// Agent backend, if one is configured.
    pub runner: Option<Arc<dyn AgentRunner>>,

    pub sessions: SessionRegistry,

    /// Keys the server resolves `server-default` settings against.
    pub keys: ServerKeys,

    pub opening: OpeningDelta,

    pub max_steps: u32,
}

impl AppState {
    pub fn new(runner: Option<Arc<dyn AgentRunner>>, sessions: SessionRegistry) -> Self {
        Self {
            runner,
            sessions,
            keys: ServerKeys::default(),
            opening: OpeningDelta::default(),
            max_steps: 15,
        }
    }

    /// Build state from configuration, resolving provider keys once.
    #[must_use]
    pub fn from_config(config: &Config, runner: Option<Arc<dyn AgentRunner>>) -> Self {
        let sessions = SessionRegistry::new(&config.sandbox.workspace, config.use_cloud_sandbox());
        Self {
            runner,
            sessions,
            keys: config.providers.server_keys(),
            opening: config.agent.opening_delta,
            max_steps: config.agent.max_steps,
        }
    }
}

pub type SharedState = Arc<AppState>;

/// JSON error body returned by every failing route.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// Error converted into a `{error}` response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::warn!(status = %self.status, error = %self.message, "request failed");
        }
        let body = ErrorBody {
            error: mask_secrets(&self.message).into_owned(),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<SandboxError> for ApiError {
    fn from(e: SandboxError) -> Self {
        let status = match &e {
            SandboxError::OutsideWorkspace(_) => StatusCode::FORBIDDEN,
            SandboxError::NotFound(_) => StatusCode::NOT_FOUND,
            SandboxError::Unsupported => StatusCode::NOT_IMPLEMENTED,
            SandboxError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let status = if matches!(e, Error::NoBackend) {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::new(status, e.to_string())
    }
}

fn parse_session(raw: Option<&str>) -> Result<SessionId, ApiError> {
    match raw {
        None => Ok(SessionId::default()),
        Some(id) => id
            .parse::<SessionId>()
            .map_err(|e| ApiError::bad_request(e.to_string())),
    }
}

/// `OpenAPI` documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "agent-chat API",
        description = "Chat with a deep agent over Server-Sent Events",
        version = "0.1.0",
        license(name = "MIT")
    ),
    paths(
        health,
        get_config,
        sandbox_info,
        chat::chat,
        files::get_files,
        files::write_file,
        files::remove_sandbox
    ),
    components(schemas(
        HealthResponse,
        ServerCapabilities,
        SandboxInfo,
        SandboxKind,
        ErrorBody,
        ChatRequest,
        FileList,
        WriteFileRequest,
        WriteFileResponse
    ))
)]
struct ApiDoc;

/// Build the application router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/config", get(get_config))
        .route("/api/sandbox-info", get(sandbox_info))
        .route("/api/chat", post(chat::chat))
        .route(
            "/api/sandboxes/{id}/files",
            get(files::get_files).post(files::write_file),
        )
        .route("/api/sandboxes/{id}", delete(files::remove_sandbox))
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP API server.
pub async fn serve(host: &str, port: u16, state: AppState) -> anyhow::Result<()> {
    let backend = state.runner.as_ref().map_or("none", |r| r.name());
    let cloud = state.sessions.is_cloud();
    let state = Arc::new(state);
    let app = router(Arc::clone(&state));

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        addr = %addr,
        backend,
        cloud,
        build = %build_info::short_version(),
        "starting HTTP API server"
    );
    if backend == "none" {
        tracing::warn!("no agent backend configured, /api/chat will return 503");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    state.sessions.clear();

    Ok(())
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service healthy", body = HealthResponse))
)]
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: build_info::version_string(),
    })
}

/// Which provider keys the server holds.
#[utoipa::path(
    get,
    path = "/api/config",
    responses((status = 200, description = "Server key availability", body = ServerCapabilities))
)]
async fn get_config(State(state): State<SharedState>) -> Json<ServerCapabilities> {
    Json(ServerCapabilities::from(&state.keys))
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SandboxInfo {
    pub is_cloud_environment: bool,
    pub has_active_sandbox: bool,
    pub remote_sandbox_id: Option<String>,
    #[schema(value_type = String, example = "local")]
    pub sandbox_type: SandboxKind,
}

/// Sandbox state for a session.
#[utoipa::path(
    get,
    path = "/api/sandbox-info",
    params(("session" = Option<String>, Query, description = "Session id, `default` when omitted")),
    responses(
        (status = 200, description = "Sandbox details", body = SandboxInfo),
        (status = 400, description = "Invalid session id", body = ErrorBody)
    )
)]
async fn sandbox_info(
    State(state): State<SharedState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<SandboxInfo>, ApiError> {
    let id = parse_session(query.session.as_deref())?;
    let cloud = state.sessions.is_cloud();

    let remote_sandbox_id = state
        .sessions
        .get(&id)
        .and_then(|session| session.lock().sandbox.remote_id().map(str::to_string));
    let has_active_sandbox = if cloud {
        remote_sandbox_id.is_some()
    } else {
        state.sessions.get(&id).is_some()
    };

    Ok(Json(SandboxInfo {
        is_cloud_environment: cloud,
        has_active_sandbox,
        remote_sandbox_id,
        sandbox_type: if cloud {
            SandboxKind::Cloud
        } else {
            SandboxKind::Local
        },
    }))
}
