#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use pluto_api::analysis::AnalysisClient;
use pluto_api::auth::jwt::{generate_access_token, JwtConfig};
use pluto_api::config::ServerConfig;
use pluto_api::router::build_app_router;
use pluto_api::state::AppState;
use pluto_api::storage::LocalBlobStore;
use pluto_core::roles::Role;
use pluto_core::types::DbId;
use pluto_core::workflow::memory::{InMemoryIdentityDirectory, InMemorySubmissionStore};
use pluto_core::workflow::{AssessmentEngine, IdentityDirectory};

pub const CALLBACK_TOKEN: &str = "test-callback-token";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(storage_root: &std::path::Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        storage_root: storage_root.to_path_buf(),
        max_upload_bytes: 1024,
        analysis_service_url: None,
        analysis_callback_token: Some(CALLBACK_TOKEN.to_string()),
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// A running application over in-memory seams.
///
/// Holds the temp upload directory so it outlives the test body.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub uploads: TempDir,
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Register a user directly in the directory and mint a token for them.
    pub async fn user(&self, email: &str, role: Role) -> TestUser {
        let identity = self
            .state
            .directory()
            .register(email, "not-a-real-hash", role)
            .await
            .expect("registration should succeed");
        let token = generate_access_token(identity.id, role, &self.state.config.jwt)
            .expect("token generation should succeed");
        TestUser {
            id: identity.id,
            token,
        }
    }
}

pub struct TestUser {
    pub id: DbId,
    pub token: String,
}

/// Build the full application router, with the production middleware
/// stack, over an in-memory store and directory.
pub fn build_test_app() -> TestApp {
    build_test_app_with(None)
}

/// Like [`build_test_app`], with an Analysis Service client wired in.
pub fn build_test_app_with(analysis: Option<AnalysisClient>) -> TestApp {
    let uploads = tempfile::tempdir().expect("tempdir should be creatable");
    let mut config = test_config(uploads.path());
    if analysis.is_some() {
        config.analysis_service_url = Some("http://analysis.test".to_string());
    }

    let engine = AssessmentEngine::new(
        Arc::new(InMemorySubmissionStore::new()),
        Arc::new(InMemoryIdentityDirectory::new()),
    );
    let state = AppState {
        engine: Arc::new(engine),
        blobs: Arc::new(LocalBlobStore::new(uploads.path())),
        analysis: analysis.map(Arc::new),
        config: Arc::new(config.clone()),
        pool: None,
    };

    TestApp {
        router: build_app_router(state.clone(), &config),
        state,
        uploads,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.expect("router is infallible")
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn put_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Build a `multipart/form-data` upload with a single `file` part.
pub fn multipart_upload(uri: &str, token: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "pluto-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap()
}

/// Collect a response body as raw bytes.
pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes()
        .to_vec()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be valid JSON")
}
