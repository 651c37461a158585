//! Application-level configuration: an optional JSON file overlaid with environment variables.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "ARCADE_BACK_CONFIG_PATH";

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;
const DEFAULT_DATABASE_URL: &str = "sqlite://arcade.db?mode=rwc";
const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub ai: AiConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Upper bound on a multipart request body.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Database and filesystem locations.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// `sqlite:` or `mongodb://` URL; the scheme selects the backend.
    pub database_url: String,
    /// Database name used with a MongoDB URL.
    pub mongo_database: Option<String>,
    /// Root of the raw uploaded archives and cover images.
    pub uploads_dir: PathBuf,
    /// Root of the extracted games, one directory per game id.
    pub executables_dir: PathBuf,
    /// Public origin prefixed to static file URLs, without trailing slash.
    pub static_base_url: String,
    /// URL segment under which `uploads_dir` is served.
    pub uploads_mount: String,
    /// URL segment under which `executables_dir` is served.
    pub executables_mount: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            mongo_database: None,
            uploads_dir: PathBuf::from("uploads"),
            executables_dir: PathBuf::from("executables"),
            static_base_url: format!("http://localhost:{DEFAULT_PORT}"),
            uploads_mount: "uploads".to_owned(),
            executables_mount: "executables".to_owned(),
        }
    }
}

/// Bearer token settings.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC secret used to sign and verify tokens.
    pub jwt_secret: String,
    pub token_ttl: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: random_secret(),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
        }
    }
}

/// Settings of the external text generator used for reactions and recommendations.
#[derive(Clone)]
pub struct AiConfig {
    /// Without a key every AI feature is disabled.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Minimum distance between a rating and the game average that triggers a reaction.
    pub rating_threshold: f64,
    /// Minimum number of comments on a game before reactions are considered.
    pub min_comments: usize,
    pub timeout: Duration,
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("rating_threshold", &self.rating_threshold)
            .field("min_comments", &self.min_comments)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_owned(),
            base_url: "https://generativelanguage.googleapis.com/v1".to_owned(),
            max_tokens: 1024,
            temperature: 0.7,
            rating_threshold: 0.5,
            min_comments: 0,
            timeout: Duration::from_secs(20),
        }
    }
}

impl AppConfig {
    /// Load the configuration file (if any) and apply environment overrides on top of it.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = Self::from_file(&path);
        config.apply_overrides(|key| env::var(key).ok());
        if config.ai.api_key.is_none() {
            info!("no AI API key configured; AI features disabled");
        }
        config
    }

    fn from_file(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded configuration file");
                    raw.into()
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Overlay values found through `lookup`, typically the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(port) = lookup("PORT").or_else(|| lookup("SERVER_PORT")) {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(err) => warn!(value = %port, error = %err, "ignoring invalid port"),
            }
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.storage.database_url = url;
        }
        if let Some(name) = lookup("MONGO_DB") {
            self.storage.mongo_database = Some(name);
        }
        if let Some(dir) = lookup("UPLOADS_DIR") {
            self.storage.uploads_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("EXECUTABLES_DIR") {
            self.storage.executables_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("STATIC_BASE_URL") {
            self.storage.static_base_url = url.trim_end_matches('/').to_owned();
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(ttl) = lookup("TOKEN_TTL_SECS") {
            match ttl.parse() {
                Ok(secs) => self.auth.token_ttl = Duration::from_secs(secs),
                Err(err) => warn!(value = %ttl, error = %err, "ignoring invalid token TTL"),
            }
        }
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.ai.api_key = Some(key);
        }
        if let Some(model) = lookup("AI_MODEL") {
            self.ai.model = model;
        }
        if let Some(url) = lookup("AI_BASE_URL") {
            self.ai.base_url = url.trim_end_matches('/').to_owned();
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    port: Option<u16>,
    max_upload_mb: Option<usize>,
    database_url: Option<String>,
    mongo_database: Option<String>,
    uploads_dir: Option<PathBuf>,
    executables_dir: Option<PathBuf>,
    static_base_url: Option<String>,
    jwt_secret: Option<String>,
    token_ttl_secs: Option<u64>,
    ai: RawAiConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAiConfig {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    rating_threshold: Option<f64>,
    min_comments: Option<usize>,
    timeout_secs: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let mut config = Self::default();
        let server = &mut config.server;
        if let Some(port) = raw.port {
            server.port = port;
        }
        if let Some(mb) = raw.max_upload_mb {
            server.max_upload_bytes = mb * 1024 * 1024;
        }

        let storage = &mut config.storage;
        if let Some(url) = raw.database_url {
            storage.database_url = url;
        }
        storage.mongo_database = raw.mongo_database;
        if let Some(dir) = raw.uploads_dir {
            storage.uploads_dir = dir;
        }
        if let Some(dir) = raw.executables_dir {
            storage.executables_dir = dir;
        }
        if let Some(url) = raw.static_base_url {
            storage.static_base_url = url.trim_end_matches('/').to_owned();
        }

        if let Some(secret) = raw.jwt_secret {
            config.auth.jwt_secret = secret;
        }
        if let Some(secs) = raw.token_ttl_secs {
            config.auth.token_ttl = Duration::from_secs(secs);
        }

        let ai = &mut config.ai;
        ai.api_key = raw.ai.api_key;
        if let Some(model) = raw.ai.model {
            ai.model = model;
        }
        if let Some(url) = raw.ai.base_url {
            ai.base_url = url.trim_end_matches('/').to_owned();
        }
        if let Some(max_tokens) = raw.ai.max_tokens {
            ai.max_tokens = max_tokens;
        }
        if let Some(temperature) = raw.ai.temperature {
            ai.temperature = temperature;
        }
        if let Some(threshold) = raw.ai.rating_threshold {
            ai.rating_threshold = threshold;
        }
        if let Some(min_comments) = raw.ai.min_comments {
            ai.min_comments = min_comments;
        }
        if let Some(secs) = raw.ai.timeout_secs {
            ai.timeout = Duration::from_secs(secs);
        }
        config
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Per-process secret used when none is configured; tokens do not survive a restart.
fn random_secret() -> String {
    rand::random::<[u8; 32]>()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn env_overrides_take_precedence() {
        let vars: HashMap<&str, &str> = [
            ("SERVER_PORT", "9000"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("STATIC_BASE_URL", "https://play.example.com/"),
            ("GEMINI_API_KEY", "key"),
            ("TOKEN_TTL_SECS", "60"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|value| value.to_string()));

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.database_url, "sqlite::memory:");
        assert_eq!(config.storage.static_base_url, "https://play.example.com");
        assert_eq!(config.ai.api_key.as_deref(), Some("key"));
        assert_eq!(config.auth.token_ttl, Duration::from_secs(60));
    }

    #[test]
    fn invalid_and_blank_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| match key {
            "PORT" => Some("not-a-port".to_owned()),
            "GEMINI_API_KEY" => Some("   ".to_owned()),
            _ => None,
        });

        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(config.ai.api_key.is_none());
    }

    #[test]
    fn file_values_fill_missing_fields_with_defaults() {
        let raw: RawConfig = serde_json::from_str(
            r#"{ "port": 3000, "uploads_dir": "/srv/uploads", "ai": { "min_comments": 5 } }"#,
        )
        .unwrap();
        let config: AppConfig = raw.into();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.uploads_dir, PathBuf::from("/srv/uploads"));
        assert_eq!(config.storage.executables_dir, PathBuf::from("executables"));
        assert_eq!(config.ai.min_comments, 5);
        assert_eq!(config.ai.rating_threshold, 0.5);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::from_file(&dir.path().join("absent.json"));
        assert_eq!(config.storage.database_url, DEFAULT_DATABASE_URL);
    }
}
