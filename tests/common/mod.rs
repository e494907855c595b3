//! Shared harness: a full server over a temporary data directory

#![allow(dead_code)]

use std::sync::Arc;

use base64::Engine;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Response, StatusCode};
use school_cms::{BlobStore, CmsDb, Config, HttpServer, ImageStore, PositionRegistry, Services};
use serde_json::Value;
use tempfile::TempDir;

pub const ADMIN_TOKEN: &str = "test-admin-token-0123456789";

pub struct TestApp {
    pub server: HttpServer,
    pub blobs: Arc<BlobStore>,
    _temp: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_registry(PositionRegistry::school_default()).await
    }

    pub async fn with_registry(registry: PositionRegistry) -> Self {
        let temp = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp.path().to_path_buf(),
            admin_token: Some(ADMIN_TOKEN.to_string()),
            default_per_page: 2,
            ..Config::default()
        };

        let db = Arc::new(CmsDb::open(&config.data_dir).unwrap());
        let blobs = Arc::new(
            BlobStore::new(config.media_dir(), &config.public_base_url)
                .await
                .unwrap(),
        );
        let images: Arc<dyn ImageStore> = blobs.clone();
        let services = Arc::new(Services::with_registry(db.clone(), images, &config, registry));
        let server = HttpServer::new(
            services,
            blobs.clone(),
            db,
            &config,
            "127.0.0.1:0".parse().unwrap(),
        );

        Self {
            server,
            blobs,
            _temp: temp,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let body = body.map(|v| Bytes::from(v.to_string())).unwrap_or_default();
        let response = self.server.handle_request(builder.body(Full::new(body)).unwrap()).await;
        TestResponse::read(response).await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None, None).await
    }

    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        self.request(method, uri, Some(ADMIN_TOKEN), body).await
    }

    pub async fn raw_admin(&self, method: Method, uri: &str, body: &'static str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {}", ADMIN_TOKEN))
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap();
        TestResponse::read(self.server.handle_request(request).await).await
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: hyper::HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    async fn read(response: Response<Full<Bytes>>) -> Self {
        let (parts, body) = response.into_parts();
        Self {
            status: parts.status,
            headers: parts.headers,
            body: body.collect().await.unwrap().to_bytes(),
        }
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Bytes that sniff as a PNG
pub fn png(seed: u8) -> Vec<u8> {
    let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&[seed; 16]);
    data
}

/// An image field as the admin forms submit it
pub fn upload(mime_type: &str, data: &[u8]) -> Value {
    serde_json::json!({
        "mimeType": mime_type,
        "data": base64::engine::general_purpose::STANDARD.encode(data),
    })
}
