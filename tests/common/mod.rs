#![allow(dead_code)]

use std::{
    io::{Cursor, Write},
    sync::Arc,
};

use arcade_back::{
    config::AppConfig,
    dao::store::sqlite::{SqliteConfig, SqliteStore},
    routes,
    services::ai_service::{AiError, AiService, TextGenerator},
    state::{AppState, SharedState},
};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use futures::future::BoxFuture;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use zip::{ZipWriter, write::SimpleFileOptions};

const BOUNDARY: &str = "arcade-test-boundary";
pub const PASSWORD: &str = "secret123";

/// Generator answering every prompt with the same text.
pub struct CannedGenerator(pub String);

impl TextGenerator for CannedGenerator {
    fn generate(&self, _prompt: String) -> BoxFuture<'static, Result<String, AiError>> {
        let answer = self.0.clone();
        Box::pin(async move { Ok(answer) })
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: SharedState,
    pub dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(None).await
    }

    pub async fn with_ai_answer(answer: &str) -> Self {
        Self::build(Some(answer)).await
    }

    async fn build(answer: Option<&str>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.uploads_dir = dir.path().join("uploads");
        config.storage.executables_dir = dir.path().join("executables");
        config.storage.database_url = "sqlite::memory:".into();
        config.auth.jwt_secret = "integration-secret".into();

        let ai = match answer {
            Some(answer) => {
                config.ai.api_key = Some("test-key".into());
                AiService::with_generator(
                    config.ai.clone(),
                    Arc::new(CannedGenerator(answer.to_owned())),
                )
            }
            None => AiService::from_config(config.ai.clone()),
        };
        let state = AppState::with_ai(config, ai);
        state.paths().ensure_roots().await.unwrap();

        let store = SqliteStore::connect(SqliteConfig::from_url("sqlite::memory:").unwrap())
            .await
            .unwrap();
        state.install_store(Arc::new(store)).await;

        Self {
            router: routes::build_router(state.clone()),
            state,
            dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    /// Register `name` and return its id and bearer token.
    pub async fn register(&self, name: &str, ai_enabled: bool) -> (i64, String) {
        let (status, body) = self
            .send(json_request(
                Method::POST,
                "/auth/register",
                None,
                json!({
                    "name": name,
                    "email": format!("{name}@example.com"),
                    "password": PASSWORD,
                    "ai_enabled": ai_enabled,
                }),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["user"]["id"].as_i64().unwrap(),
            body["token"].as_str().unwrap().to_owned(),
        )
    }

    /// Upload a game whose archive holds `entries`; returns the raw response.
    pub async fn upload_game(
        &self,
        token: &str,
        title: &str,
        entries: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        self.send(multipart_request(
            Method::POST,
            "/games",
            Some(token),
            &[
                Part::text("title", title),
                Part::text("description", "A small browser game"),
                Part::file("archive", "game.zip", "application/zip", zip_bytes(entries)),
                Part::file("image", "cover.png", "image/png", b"\x89PNG".to_vec()),
            ],
        ))
        .await
    }

    /// Upload a playable game and return its id.
    pub async fn publish(&self, token: &str, title: &str) -> i64 {
        let (status, body) = self
            .upload_game(token, title, &[("index.html", "<html></html>")])
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    pub async fn play(&self, token: &str, game_id: i64, hours: f64) {
        let (status, body) = self
            .send(json_request(
                Method::POST,
                &format!("/games/{game_id}/playtime"),
                Some(token),
                json!({ "hours": hours }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    pub fn uploads_count(&self) -> usize {
        std::fs::read_dir(self.state.paths().uploads_root())
            .unwrap()
            .count()
    }

    pub fn executables_count(&self) -> usize {
        std::fs::read_dir(self.state.paths().executables_root())
            .unwrap()
            .count()
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn authed(method: Method, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub enum Part {
    Text {
        name: &'static str,
        value: String,
    },
    File {
        name: &'static str,
        file_name: String,
        content_type: &'static str,
        bytes: Vec<u8>,
    },
}

impl Part {
    pub fn text(name: &'static str, value: &str) -> Self {
        Part::Text {
            name,
            value: value.to_owned(),
        }
    }

    pub fn file(
        name: &'static str,
        file_name: &str,
        content_type: &'static str,
        bytes: Vec<u8>,
    ) -> Self {
        Part::File {
            name,
            file_name: file_name.to_owned(),
            content_type,
            bytes,
        }
    }
}

pub fn multipart_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    parts: &[Part],
) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder().method(method).uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries {
        writer
            .start_file(name.to_string(), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
