//! HTTP API.
//!
//! - POST   /register_face       multipart `name`, `file`
//! - POST   /recognize_face      multipart `file`
//! - DELETE /delete_face/{name}
//! - DELETE /faces/{id}
//! - GET    /list_known_faces
//! - GET    /status
//! - POST   /refresh_db_faces
//! - GET    /health

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use facekit_gallery::{
    DeleteResult, EnrollResult, FaceGallery, GalleryError, GalleryStatus, Identifier, KnownFaces,
    RecognitionResult, RefreshResult,
};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

type AppState = Arc<FaceGallery>;

/// Error returned by handlers, rendered as `{"detail": ...}`.
#[derive(Debug)]
pub enum ApiError {
    Gallery(GalleryError),
    BadRequest(String),
}

impl From<GalleryError> for ApiError {
    fn from(e: GalleryError) -> Self {
        ApiError::Gallery(e)
    }
}

fn status_for(e: &GalleryError) -> StatusCode {
    match e {
        GalleryError::InvalidImage(_)
        | GalleryError::NoFaceDetected
        | GalleryError::InvalidName(_)
        | GalleryError::EmbeddingDimensionMismatch { .. } => StatusCode::BAD_REQUEST,
        GalleryError::NotFound { .. } => StatusCode::NOT_FOUND,
        GalleryError::DuplicateFace { .. } => StatusCode::CONFLICT,
        GalleryError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        GalleryError::EmbedderUnavailable(_) => StatusCode::BAD_GATEWAY,
        GalleryError::InvalidConfig(_) | GalleryError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Gallery(e) => (status_for(&e), e.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        if status.is_server_error() {
            tracing::error!(%status, %detail, "request failed");
        } else {
            tracing::debug!(%status, %detail, "request rejected");
        }
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Build the router over a shared gallery.
pub fn router(gallery: AppState) -> Router {
    Router::new()
        .route("/register_face", post(register_face))
        .route("/recognize_face", post(recognize_face))
        .route("/delete_face/{name}", delete(delete_face_by_name))
        .route("/faces/{id}", delete(delete_face_by_id))
        .route("/list_known_faces", get(list_known_faces))
        .route("/status", get(status))
        .route("/refresh_db_faces", post(refresh_db_faces))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(gallery)
}

/// Bind `addr` and serve until the process exits.
pub async fn serve(addr: &str, gallery: AppState) -> Result<()> {
    let addr = parse_addr(addr)?;
    let app = router(gallery);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server: listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Parse an address, allowing the `:8000` shorthand.
fn parse_addr(addr: &str) -> Result<SocketAddr> {
    let addr = if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    };
    Ok(addr.parse()?)
}

#[derive(Default)]
struct UploadForm {
    name: Option<String>,
    file: Option<Vec<u8>>,
}

fn bad_form(e: impl std::fmt::Display) -> ApiError {
    ApiError::BadRequest(format!("invalid form: {e}"))
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => form.name = Some(field.text().await.map_err(bad_form)?),
            "file" => form.file = Some(field.bytes().await.map_err(bad_form)?.to_vec()),
            _ => {}
        }
    }
    Ok(form)
}

fn require_file(form: &mut UploadForm) -> Result<Vec<u8>, ApiError> {
    match form.file.take() {
        Some(file) if !file.is_empty() => Ok(file),
        _ => Err(ApiError::BadRequest("missing image file".into())),
    }
}

async fn register_face(
    State(gallery): State<AppState>,
    multipart: Multipart,
) -> Result<Json<EnrollResult>, ApiError> {
    let mut form = read_form(multipart).await?;
    let image = require_file(&mut form)?;
    let name = form
        .name
        .ok_or_else(|| ApiError::BadRequest("missing name".into()))?;
    Ok(Json(gallery.enroll(&name, &image).await?))
}

async fn recognize_face(
    State(gallery): State<AppState>,
    multipart: Multipart,
) -> Result<Json<RecognitionResult>, ApiError> {
    let mut form = read_form(multipart).await?;
    let image = require_file(&mut form)?;
    Ok(Json(gallery.recognize(&image).await?))
}

async fn delete_face_by_name(
    State(gallery): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DeleteResult>, ApiError> {
    Ok(Json(gallery.delete_identity(&Identifier::Name(name)).await?))
}

async fn delete_face_by_id(
    State(gallery): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResult>, ApiError> {
    Ok(Json(gallery.delete_identity(&Identifier::Id(id)).await?))
}

async fn list_known_faces(State(gallery): State<AppState>) -> Json<KnownFaces> {
    Json(gallery.list_known())
}

async fn status(State(gallery): State<AppState>) -> Json<GalleryStatus> {
    Json(gallery.status().await)
}

async fn refresh_db_faces(
    State(gallery): State<AppState>,
) -> Result<Json<RefreshResult>, ApiError> {
    Ok(Json(gallery.refresh().await?))
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    timestamp: DateTime<Utc>,
    known_faces_count: usize,
}

async fn health(State(gallery): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "healthy",
        timestamp: Utc::now(),
        known_faces_count: gallery.list_known().count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use facekit_embed::{EmbedError, Embedder};
    use facekit_gallery::{GalleryConfig, MemoryStore};

    struct FixedEmbedder;

    #[async_trait::async_trait]
    impl Embedder for FixedEmbedder {
        async fn extract(&self, image: &[u8]) -> Result<Vec<f32>, EmbedError> {
            match image {
                b"alice" => Ok(vec![0.1, 0.0]),
                b"bob" => Ok(vec![0.0, 0.9]),
                _ => Err(EmbedError::NoFaceDetected),
            }
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    async fn state() -> AppState {
        let cfg = GalleryConfig {
            dimension: 2,
            ..GalleryConfig::default()
        };
        let gallery = FaceGallery::open(cfg, Arc::new(MemoryStore::new()), Arc::new(FixedEmbedder))
            .await
            .unwrap();
        Arc::new(gallery)
    }

    #[test]
    fn error_status_mapping() {
        let cases = [
            (GalleryError::InvalidImage("x".into()), StatusCode::BAD_REQUEST),
            (GalleryError::NoFaceDetected, StatusCode::BAD_REQUEST),
            (GalleryError::InvalidName(" ".into()), StatusCode::BAD_REQUEST),
            (
                GalleryError::EmbeddingDimensionMismatch { expected: 128, got: 3 },
                StatusCode::BAD_REQUEST,
            ),
            (
                GalleryError::NotFound { identifier: "bob".into() },
                StatusCode::NOT_FOUND,
            ),
            (
                GalleryError::DuplicateFace { existing_name: "alice".into(), distance: 0.1 },
                StatusCode::CONFLICT,
            ),
            (
                GalleryError::StoreUnavailable("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                GalleryError::EmbedderUnavailable("connection refused".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                GalleryError::InvalidConfig("bad".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, want) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), want);
        }
        assert_eq!(
            ApiError::BadRequest("missing name".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn parse_addr_shorthand() {
        assert_eq!(parse_addr(":8000").unwrap().to_string(), "0.0.0.0:8000");
        assert_eq!(parse_addr("127.0.0.1:9000").unwrap().port(), 9000);
        assert!(parse_addr("nonsense").is_err());
    }

    #[tokio::test]
    async fn list_and_delete_handlers() {
        let gallery = state().await;
        gallery.enroll("alice", b"alice").await.unwrap();
        gallery.enroll("bob", b"bob").await.unwrap();

        let Json(list) = list_known_faces(State(gallery.clone())).await;
        assert_eq!(list.count, 2);

        let Json(deleted) = delete_face_by_name(State(gallery.clone()), Path("bob".into()))
            .await
            .unwrap();
        assert!(deleted.person_id > 0);

        let err = delete_face_by_name(State(gallery.clone()), Path("bob".into()))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let err = delete_face_by_id(State(gallery.clone()), Path(9999)).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let Json(health) = health(State(gallery)).await;
        assert_eq!(health.known_faces_count, 1);
        assert_eq!(health.status, "healthy");
    }

    #[tokio::test]
    async fn refresh_and_status_handlers() {
        let gallery = state().await;
        gallery.enroll("alice", b"alice").await.unwrap();

        let Json(refreshed) = refresh_db_faces(State(gallery.clone())).await.unwrap();
        assert_eq!(refreshed.total, 1);

        let Json(st) = status(State(gallery)).await;
        assert_eq!(st.loaded_count, 1);
        assert!(st.store_connected);
    }
}
