//! Sandbox file routes.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::{ApiError, ErrorBody, SharedState, parse_session};
use crate::core::sandbox::{Sandbox, SandboxError};

#[derive(Debug, Deserialize)]
pub(super) struct FileQuery {
    path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    pub files: Vec<String>,
    pub sandbox_id: String,
}

#[derive(Debug, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct WriteFileRequest {
    pub path: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WriteFileResponse {
    pub success: bool,
    pub sandbox_id: String,
    pub path: String,
}

/// Snapshot of a live session's sandbox, taken without holding the lock
/// across IO. Unknown sessions yield `None` and are not created.
fn existing_sandbox(state: &SharedState, id: &str) -> Result<Option<Sandbox>, ApiError> {
    let id = parse_session(Some(id))?;
    Ok(state
        .sessions
        .get(&id)
        .map(|session| session.lock().sandbox.clone()))
}

/// Like [`existing_sandbox`], but creates the session on first use.
fn sandbox_for(state: &SharedState, id: &str) -> Result<Sandbox, ApiError> {
    let id = parse_session(Some(id))?;
    let session = state.sessions.get_or_create(&id);
    let sandbox = session.lock().sandbox.clone();
    Ok(sandbox)
}

/// List the sandbox's files, or read one when `path` is given.
///
/// A session that does not exist lists as empty and has no files to read.
#[utoipa::path(
    get,
    path = "/api/sandboxes/{id}/files",
    params(
        ("id" = String, Path, description = "Session id owning the sandbox"),
        ("path" = Option<String>, Query, description = "File to read, relative to the sandbox root")
    ),
    responses(
        (status = 200, description = "File list, or file content as text/plain", body = FileList),
        (status = 403, description = "Path outside the workspace", body = ErrorBody),
        (status = 404, description = "File not found", body = ErrorBody),
        (status = 501, description = "Cloud sandbox", body = ErrorBody)
    )
)]
pub(super) async fn get_files(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<FileQuery>,
) -> Result<Response, ApiError> {
    let Some(sandbox) = existing_sandbox(&state, &id)? else {
        if let Some(path) = query.path {
            return Err(SandboxError::NotFound(path).into());
        }
        return Ok(Json(FileList {
            files: Vec::new(),
            sandbox_id: id,
        })
        .into_response());
    };

    if let Some(path) = query.path {
        let content = sandbox.read_file(&path).await?;
        tracing::debug!(sandbox = %id, path = %path, bytes = content.len(), "file read");
        return Ok((
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            content,
        )
            .into_response());
    }

    let files = sandbox.list_files()?;
    Ok(Json(FileList {
        files,
        sandbox_id: id,
    })
    .into_response())
}

/// Write a file into the sandbox.
#[utoipa::path(
    post,
    path = "/api/sandboxes/{id}/files",
    params(("id" = String, Path, description = "Session id owning the sandbox")),
    request_body = WriteFileRequest,
    responses(
        (status = 200, description = "File written", body = WriteFileResponse),
        (status = 400, description = "Missing path or content", body = ErrorBody),
        (status = 403, description = "Path outside the workspace", body = ErrorBody),
        (status = 501, description = "Cloud sandbox", body = ErrorBody)
    )
)]
pub(super) async fn write_file(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<WriteFileResponse>, ApiError> {
    let request: WriteFileRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::bad_request("Invalid JSON body"))?;
    let (Some(path), Some(content)) = (request.path, request.content) else {
        return Err(ApiError::bad_request("Missing path or content"));
    };

    let sandbox = sandbox_for(&state, &id)?;
    sandbox.write_file(&path, &content).await?;
    tracing::info!(sandbox = %id, path = %path, bytes = content.len(), "file written");

    Ok(Json(WriteFileResponse {
        success: true,
        sandbox_id: id,
        path,
    }))
}

/// Drop a session and its sandbox handle.
#[utoipa::path(
    delete,
    path = "/api/sandboxes/{id}",
    params(("id" = String, Path, description = "Session id owning the sandbox")),
    responses(
        (status = 204, description = "Session removed"),
        (status = 400, description = "Invalid session id", body = ErrorBody),
        (status = 404, description = "No such session", body = ErrorBody)
    )
)]
pub(super) async fn remove_sandbox(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let session = parse_session(Some(&id))?;
    if state.sessions.remove(&session) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::new(StatusCode::NOT_FOUND, format!("no session {id}")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::api::{AppState, SharedState, router};
    use crate::core::session::SessionRegistry;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
    };
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn state(dir: &TempDir, cloud: bool) -> SharedState {
        Arc::new(AppState::new(
            None,
            SessionRegistry::new(dir.path(), cloud),
        ))
    }

    fn app(state: &SharedState) -> Router {
        router(Arc::clone(state))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, String, Option<String>) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap(), content_type)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn delete(uri: &str) -> Request<Body> {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn write_then_list_and_read() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, false);

        let (status, body, _) = send(
            app(&state),
            post(
                "/api/sandboxes/s1/files",
                r#"{"path":"src/main.rs","content":"fn main() {}"}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let written: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            written,
            serde_json::json!({"success": true, "sandboxId": "s1", "path": "src/main.rs"})
        );
        assert!(dir.path().join("s1/src/main.rs").is_file());

        let (status, body, _) = send(app(&state), get("/api/sandboxes/s1/files")).await;
        assert_eq!(status, StatusCode::OK);
        let listed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(listed["files"], serde_json::json!(["src/main.rs"]));
        assert_eq!(listed["sandboxId"], "s1");

        let (status, body, content_type) = send(
            app(&state),
            get("/api/sandboxes/s1/files?path=src/main.rs"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "fn main() {}");
        assert_eq!(content_type.as_deref(), Some("text/plain; charset=utf-8"));
    }

    #[tokio::test]
    async fn traversal_is_forbidden() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, false);
        state.sessions.get_or_create(&"s1".parse().unwrap());
        std::fs::write(dir.path().join("secret.txt"), "nope").unwrap();

        let (status, body, _) = send(
            app(&state),
            get("/api/sandboxes/s1/files?path=../secret.txt"),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("outside workspace"));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, false);
        state.sessions.get_or_create(&"s1".parse().unwrap());
        let (status, _, _) = send(
            app(&state),
            get("/api/sandboxes/s1/files?path=nope.txt"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn write_requires_path_and_content() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, false);
        let (status, body, _) = send(
            app(&state),
            post("/api/sandboxes/s1/files", r#"{"path":"a.txt"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, r#"{"error":"Missing path or content"}"#);
    }

    #[tokio::test]
    async fn cloud_sandbox_files_are_not_implemented() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, true);
        state.sessions.get_or_create(&"s1".parse().unwrap());

        let (status, _, _) = send(app(&state), get("/api/sandboxes/s1/files")).await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn reading_unknown_session_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, false);

        let (status, body, _) = send(app(&state), get("/api/sandboxes/ghost/files")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&body).unwrap(),
            serde_json::json!({"files": [], "sandboxId": "ghost"})
        );

        let (status, _, _) = send(
            app(&state),
            get("/api/sandboxes/ghost/files?path=a.txt"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        assert!(state.sessions.is_empty());
        assert!(!dir.path().join("ghost").exists());
    }

    #[tokio::test]
    async fn delete_removes_the_session() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, false);
        state.sessions.get_or_create(&"s1".parse().unwrap());

        let (status, _, _) = send(app(&state), delete("/api/sandboxes/s1")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(state.sessions.is_empty());

        let (status, _, _) = send(app(&state), delete("/api/sandboxes/s1")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_sandbox_id_is_rejected() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, false);
        let (status, _, _) = send(app(&state), get("/api/sandboxes/a.b/files")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
