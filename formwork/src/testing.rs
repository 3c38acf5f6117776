//! In-process client for driving the router in tests, without a socket.

use crate::store::MemoryStore;
use crate::{Site, SiteConf};
use axum::Router;
use axum::body::{self, Body, Bytes};
use axum::http::{HeaderMap, Method, Request, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tower::ServiceExt;

/// Configuration for tests: in-memory friendly, cheap password hashing and
/// no log files.
pub fn test_conf() -> SiteConf {
    let mut conf = SiteConf::default();
    conf.secret_key = "test-secret".to_string();
    conf.auth.password_iterations = 1_000;
    conf.log.dir = None;
    conf
}

/// A site over a fresh [`MemoryStore`].
pub async fn memory_site() -> Site {
    Site::builder(test_conf())
        .with_store(MemoryStore::new())
        .build()
        .await
        .expect("Failed to build test site")
}

pub struct TestClient {
    app: Router,
}

impl TestClient {
    pub fn new(site: Site) -> Self {
        let app = site.router();
        Self { app }
    }

    pub async fn memory() -> Self {
        Self::new(memory_site().await)
    }

    pub fn request(&self, method: Method, path: &str) -> TestRequestBuilder {
        TestRequestBuilder::new(self.app.clone(), method, path)
    }

    pub fn get(&self, path: &str) -> TestRequestBuilder {
        self.request(Method::GET, path)
    }
    pub fn post(&self, path: &str) -> TestRequestBuilder {
        self.request(Method::POST, path)
    }
    pub fn put(&self, path: &str) -> TestRequestBuilder {
        self.request(Method::PUT, path)
    }
    pub fn delete(&self, path: &str) -> TestRequestBuilder {
        self.request(Method::DELETE, path)
    }
}

pub struct TestRequestBuilder {
    app: Router,
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    body: Option<Body>,
}

impl TestRequestBuilder {
    pub fn new(app: Router, method: Method, path: &str) -> Self {
        Self {
            app,
            method,
            path: path.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("authorization", &format!("Bearer {token}"))
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        let json = serde_json::to_vec(value).expect("Failed to serialize JSON");
        self.body = Some(Body::from(json));
        self.headers.push(("content-type".to_string(), "application/json".to_string()));
        self
    }

    pub async fn send(self) -> TestResponse {
        let mut req = Request::builder().method(self.method).uri(self.path);
        for (k, v) in self.headers {
            req = req.header(&k, &v);
        }
        let req = req.body(self.body.unwrap_or_else(Body::empty)).expect("Failed to build request");
        let resp = self.app.clone().oneshot(req).await.expect("Router is infallible");
        TestResponse { resp }
    }
}

#[derive(Debug)]
pub struct TestResponse {
    resp: Response<Body>,
}

impl TestResponse {
    pub fn status(&self) -> StatusCode {
        self.resp.status()
    }
    pub fn headers(&self) -> &HeaderMap {
        self.resp.headers()
    }
    pub async fn text(self) -> String {
        let bytes = self.bytes().await;
        String::from_utf8(bytes.to_vec()).expect("Response was not valid UTF-8")
    }
    pub async fn bytes(self) -> Bytes {
        body::to_bytes(self.resp.into_body(), usize::MAX).await.expect("Failed to read body")
    }
    pub async fn json<T: DeserializeOwned>(self) -> T {
        let bytes = self.bytes().await;
        serde_json::from_slice(&bytes).expect("Response was not valid JSON")
    }
    pub async fn assert_json<T: DeserializeOwned + PartialEq + std::fmt::Debug>(
        self,
        expected_status: StatusCode,
        expected_json: &T,
    ) {
        assert_eq!(self.status(), expected_status);
        let body: T = self.json().await;
        assert_eq!(&body, expected_json);
    }
}
