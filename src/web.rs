//! HTTP routes for the avatar workflow
//!
//! Provides a small JSON API plus static serving of stored assets.

use crate::avatar::{AvatarService, AvatarView};
use crate::session::SessionStore;
use crate::store::Upload;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::path::PathBuf;
use tower_http::services::ServeDir;

/// Header carrying the session id in both directions
pub const SESSION_HEADER: &str = "x-session-id";

/// Multipart field holding the uploaded photo
pub const PHOTO_FIELD: &str = "photo";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub avatars: AvatarService,
    pub sessions: SessionStore,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Build the router
///
/// `media_dir` is served under `/{media_subdir}`, matching the public paths
/// the store hands out.
pub fn router(
    state: AppState,
    media_subdir: &str,
    media_dir: PathBuf,
    max_upload_bytes: usize,
) -> Router {
    Router::new()
        .route("/upload/photo", get(show_photo).post(upload_photo))
        .route("/upload/clear", post(clear_photo))
        .nest_service(&format!("/{}", media_subdir), ServeDir::new(media_dir))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Session id from the request, or a freshly minted one
fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(SessionStore::new_session_id)
}

/// JSON body with the session id echoed back
fn respond<T: Serialize>(id: &str, body: ApiResponse<T>) -> Response {
    let mut response = Json(body).into_response();
    if let Ok(value) = HeaderValue::from_str(id) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

/// Show the current avatar
async fn show_photo(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let id = session_id(&headers);
    let session = state.sessions.get(&id).unwrap_or_default();
    let view = state.avatars.show(&session);
    respond(&id, ApiResponse::success(view))
}

/// Accept a multipart upload and make it the current avatar
async fn upload_photo(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let id = session_id(&headers);

    let mut upload = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                log::warn!("Malformed upload form: {}", e);
                return respond(&id, ApiResponse::<AvatarView>::error(e.body_text()));
            }
        };
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        match field.bytes().await {
            Ok(bytes) => upload = Some(Upload::from_filename(bytes.to_vec(), &filename)),
            Err(e) => {
                log::warn!("Failed to read upload body: {}", e);
                return respond(&id, ApiResponse::<AvatarView>::error(e.body_text()));
            }
        }
    }

    // Hashing and file I/O are blocking and run without the session lock
    let avatars = state.avatars.clone();
    let result = tokio::task::spawn_blocking(move || avatars.store_upload(upload.as_ref())).await;

    match result {
        Ok(path) => {
            let view = state
                .sessions
                .with_session(&id, |session| state.avatars.remember(session, path));
            respond(&id, ApiResponse::success(view))
        }
        Err(e) => {
            log::error!("Upload task failed: {}", e);
            respond(&id, ApiResponse::<AvatarView>::error("upload failed".to_string()))
        }
    }
}

/// Reset the avatar to the default
async fn clear_photo(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let id = session_id(&headers);
    let view = state
        .sessions
        .with_session(&id, |session| state.avatars.clear(session));
    respond(&id, ApiResponse::success(view))
}
