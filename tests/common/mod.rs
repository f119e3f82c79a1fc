#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response, StatusCode},
};
use serde_json::Value;
use std::path::PathBuf;
use tiktok_publish_proxy::test_utils::TestServerBuilder;
use tower::ServiceExt;
use wiremock::MockServer;

/// Test harness: a fully assembled app pointed at a wiremock provider.
pub struct TestHarness {
    pub app: Router,
    pub provider: MockServer,
    files_dir: PathBuf,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_builder(TestServerBuilder::new()).await
    }

    pub async fn with_builder(builder: TestServerBuilder) -> Self {
        let provider = MockServer::start().await;
        let uri = provider.uri();
        let server = builder
            .with_config(|config| {
                config.tiktok.api_base_url = uri.clone();
                config.tiktok.auth_base_url = uri;
            })
            .build();

        Self {
            files_dir: PathBuf::from(&server.config.media.files_dir),
            app: server.create_app(),
            provider,
        }
    }

    pub fn files_dir_path(&self) -> PathBuf {
        self.files_dir.clone()
    }

    pub async fn request(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, path: &str) -> Response<Body> {
        self.request(
            Request::builder()
                .method(Method::GET)
                .uri(path)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn get_with_cookie(&self, path: &str, cookie: &str) -> Response<Body> {
        self.request(
            Request::builder()
                .method(Method::GET)
                .uri(path)
                .header("cookie", cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Response<Body> {
        self.request(
            Request::builder()
                .method(Method::POST)
                .uri(path)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(body).unwrap()))
                .unwrap(),
        )
        .await
    }
}

/// Read a response body as JSON, asserting the expected status first.
pub async fn json_body(response: Response<Body>, expected: StatusCode) -> Value {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(
        status,
        expected,
        "unexpected status; body: {}",
        String::from_utf8_lossy(&bytes)
    );
    serde_json::from_slice(&bytes).unwrap()
}
