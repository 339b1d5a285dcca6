//! In-process HTTP harness over the full router

use super::db_utils::create_test_store;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use kvt_common::auth::{PasswordHasher, Sha256PasswordHasher};
use kvt_common::config::AppConfig;
use kvt_server::services::DiskFileStore;
use kvt_server::store::SqliteEntityStore;
use kvt_server::{build_router, AppContext};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Router plus direct handles on its collaborators
pub struct TestServer {
    _dir: TempDir,
    pub router: Router,
    pub store: Arc<SqliteEntityStore>,
    pub files: Arc<DiskFileStore>,
    pub passwords: Arc<Sha256PasswordHasher>,
    pub library: PathBuf,
}

/// Raw response parts
pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

impl TestServer {
    pub async fn new() -> Self {
        let (dir, store) = create_test_store().await;
        let library = dir.path().join("library");
        let store = Arc::new(store);
        let files = Arc::new(DiskFileStore::new(&library));
        // Low round count keeps login tests fast
        let passwords = Arc::new(Sha256PasswordHasher::with_rounds(16));

        let ctx = AppContext::new(
            Arc::new(AppConfig::default()),
            store.clone(),
            files.clone(),
            passwords.clone(),
        );

        Self {
            _dir: dir,
            router: build_router(ctx),
            store,
            files,
            passwords,
            library,
        }
    }

    pub fn hash(&self, password: &str) -> String {
        self.passwords.hash(password)
    }

    pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }

        let request = match body {
            Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();

        TestResponse {
            status,
            content_type,
            body,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request(Method::POST, path, Some(body)).await
    }
}
