//! Share server: the authoritative document store behind [`HttpShareClient`].
//!
//! [`HttpShareClient`]: crate::remote::HttpShareClient

pub mod storage;

pub use storage::{CreateResult, DocumentStore, DocumentStoreError};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::hash::ContentHasher;
use crate::models::{LinkMetadata, ShareableLink};
use crate::remote::protocol::{
    DocumentRequest, ErrorBody, ExistingDocument, MetadataRequest, MetadataResponse,
};

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    store: Arc<DocumentStore>,
}

enum ApiError {
    NotFound(Uuid),
    KeyTaken(Uuid),
    Storage(DocumentStoreError),
}

impl From<DocumentStoreError> for ApiError {
    fn from(e: DocumentStoreError) -> Self {
        ApiError::Storage(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(key) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("No document with key {}", key),
            ),
            ApiError::KeyTaken(key) => (
                StatusCode::CONFLICT,
                "key_taken",
                format!("Key {} is already in use", key),
            ),
            ApiError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage",
                    "Document storage failed".to_string(),
                )
            }
        };
        let body = ErrorBody {
            error: error.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// Builds the share server's routes over `store`.
pub fn router(store: DocumentStore) -> Router {
    let state = AppState {
        store: Arc::new(store),
    };

    Router::new()
        .route("/", post(create_document))
        .route("/health", get(health))
        .route("/metadata", post(metadata))
        .route("/{key}", get(fetch_document).put(update_document))
        .with_state(state)
}

/// Digest of the submitted entries. A client that hashes differently is
/// logged and overruled.
fn verified_digest(request: &DocumentRequest) -> String {
    let digest = ContentHasher::digest(&request.worklog);
    if digest != request.content_hash {
        tracing::warn!(
            key = %request.key,
            client = %request.content_hash,
            server = %digest,
            "Client digest does not match content"
        );
    }
    digest
}

async fn create_document(
    State(state): State<AppState>,
    Json(request): Json<DocumentRequest>,
) -> Result<Response, ApiError> {
    let digest = verified_digest(&request);

    match state
        .store
        .create(request.key, &request.worklog, &digest)
        .await?
    {
        CreateResult::Created(meta) => {
            tracing::info!(key = %meta.key, entries = request.worklog.len(), "Created document");
            Ok(Json(meta).into_response())
        }
        CreateResult::Duplicate(existing) => {
            tracing::info!(key = %existing, "Duplicate content; returning existing document");
            let body = ExistingDocument {
                existing_document: existing,
            };
            Ok((StatusCode::BAD_REQUEST, Json(body)).into_response())
        }
        CreateResult::KeyTaken => Err(ApiError::KeyTaken(request.key)),
    }
}

async fn fetch_document(
    State(state): State<AppState>,
    Path(key): Path<Uuid>,
) -> Result<Json<ShareableLink>, ApiError> {
    state
        .store
        .fetch_and_count(key)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(key))
}

async fn update_document(
    State(state): State<AppState>,
    Path(key): Path<Uuid>,
    Json(request): Json<DocumentRequest>,
) -> Result<Json<LinkMetadata>, ApiError> {
    if request.key != key {
        tracing::warn!(path = %key, body = %request.key, "Body key differs from path; using path");
    }
    let digest = verified_digest(&request);

    if let Some(expected) = &request.expected_hash {
        if let Some(current) = state.store.content_hash(key).await? {
            if &current != expected {
                tracing::warn!(
                    %key,
                    expected = %expected,
                    current = %current,
                    "Overwriting a document the client had not seen"
                );
            }
        }
    }

    let meta = state
        .store
        .update(key, &request.worklog, &digest)
        .await?
        .ok_or(ApiError::NotFound(key))?;
    tracing::info!(%key, entries = request.worklog.len(), "Updated document");
    Ok(Json(meta))
}

async fn metadata(
    State(state): State<AppState>,
    Json(request): Json<MetadataRequest>,
) -> Result<Json<MetadataResponse>, ApiError> {
    let url_keys = state.store.metadata(&request.url_keys).await?;
    Ok(Json(MetadataResponse { url_keys }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// A live server on an ephemeral port, for client tests.
#[cfg(test)]
pub(crate) struct TestServer {
    pub base_url: String,
    _temp_dir: tempfile::TempDir, // Keep alive for duration of test
}

#[cfg(test)]
pub(crate) async fn spawn_test_server() -> TestServer {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let store = DocumentStore::open(&temp_dir.path().join("documents.db"))
        .await
        .unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(store)).await.unwrap();
    });
    TestServer {
        base_url: format!("http://{}", addr),
        _temp_dir: temp_dir,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{WorkDate, WorkLogEntry};
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct TestContext {
        app: Router,
        _temp_dir: TempDir, // Keep alive for duration of test
    }

    async fn setup_app() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let store = DocumentStore::open(&temp_dir.path().join("documents.db"))
            .await
            .unwrap();
        TestContext {
            app: router(store),
            _temp_dir: temp_dir,
        }
    }

    fn document(key: Uuid, seconds: u64) -> DocumentRequest {
        let worklog = vec![WorkLogEntry::new("X", seconds, WorkDate(2023, 0, 1))];
        DocumentRequest {
            content_hash: ContentHasher::digest(&worklog),
            worklog,
            key,
            expected_hash: None,
        }
    }

    async fn send<T: Serialize>(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<&T>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let ctx = setup_app().await;
        let (status, body) = send::<()>(&ctx.app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_returns_metadata() {
        let ctx = setup_app().await;
        let key = Uuid::new_v4();
        let request = document(key, 60);

        let (status, body) = send(&ctx.app, Method::POST, "/", Some(&request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["key"], key.to_string());
        assert_eq!(body["contentHash"], request.content_hash);
        assert_eq!(body["viewCount"], 0);
    }

    #[tokio::test]
    async fn test_duplicate_content_returns_existing_key() {
        let ctx = setup_app().await;
        let first = Uuid::new_v4();
        send(&ctx.app, Method::POST, "/", Some(&document(first, 60))).await;

        let (status, body) = send(
            &ctx.app,
            Method::POST,
            "/",
            Some(&document(Uuid::new_v4(), 60)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["existing-document"], first.to_string());
    }

    #[tokio::test]
    async fn test_key_collision_is_conflict() {
        let ctx = setup_app().await;
        let key = Uuid::new_v4();
        send(&ctx.app, Method::POST, "/", Some(&document(key, 60))).await;

        let (status, body) = send(&ctx.app, Method::POST, "/", Some(&document(key, 90))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "key_taken");
    }

    #[tokio::test]
    async fn test_server_digest_wins_over_client_digest() {
        let ctx = setup_app().await;
        let mut request = document(Uuid::new_v4(), 60);
        let real = request.content_hash.clone();
        request.content_hash = "bogus".into();

        let (_, body) = send(&ctx.app, Method::POST, "/", Some(&request)).await;
        assert_eq!(body["contentHash"], real);
    }

    #[tokio::test]
    async fn test_fetch_increments_views() {
        let ctx = setup_app().await;
        let key = Uuid::new_v4();
        send(&ctx.app, Method::POST, "/", Some(&document(key, 60))).await;

        let uri = format!("/{}", key);
        send::<()>(&ctx.app, Method::GET, &uri, None).await;
        let (status, body) = send::<()>(&ctx.app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["viewCount"], 2);
        assert_eq!(body["worklog"][0]["projectName"], "X");
    }

    #[tokio::test]
    async fn test_unknown_key_is_not_found() {
        let ctx = setup_app().await;
        let uri = format!("/{}", Uuid::new_v4());

        let (status, body) = send::<()>(&ctx.app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");

        let (status, _) = send(
            &ctx.app,
            Method::PUT,
            &uri,
            Some(&document(Uuid::new_v4(), 1)),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_overwrites_content() {
        let ctx = setup_app().await;
        let key = Uuid::new_v4();
        let original = document(key, 60);
        send(&ctx.app, Method::POST, "/", Some(&original)).await;

        let mut changed = document(key, 120);
        changed.expected_hash = Some("stale".into());
        let (status, body) =
            send(&ctx.app, Method::PUT, &format!("/{}", key), Some(&changed)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["contentHash"], changed.content_hash);
        assert!(body["dateModification"].is_string());
    }

    #[tokio::test]
    async fn test_metadata_batch() {
        let ctx = setup_app().await;
        let a = Uuid::new_v4();
        send(&ctx.app, Method::POST, "/", Some(&document(a, 60))).await;

        let request = MetadataRequest {
            url_keys: vec![a, Uuid::new_v4()],
        };
        let (status, body) = send(&ctx.app, Method::POST, "/metadata", Some(&request)).await;
        assert_eq!(status, StatusCode::OK);
        let keys = body["urlKeys"].as_array().unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0]["key"], a.to_string());
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let ctx = setup_app().await;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = ctx.app.clone().oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
    }
}
