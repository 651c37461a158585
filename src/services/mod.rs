/// AI reactions and recommendations.
pub mod ai_service;
/// Zip extraction and entry point discovery.
pub mod archive;
/// Registration, login and bearer tokens.
pub mod auth_service;
/// Ratings and reviews.
pub mod comment_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Game upload, replacement and removal.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Derived rating averages.
pub mod rating;
/// Per-user play time.
pub mod stats_service;
/// Filesystem layout of uploads and extracted games.
pub mod storage_paths;
/// Storage connection supervisor with backoff.
pub mod storage_supervisor;
/// Account management.
pub mod user_service;
