use axum::{Router, extract::DefaultBodyLimit};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::warn;

use crate::state::SharedState;

pub mod ai;
pub mod auth;
pub mod comment;
pub mod docs;
pub mod game;
pub mod guard;
pub mod health;
pub mod stats;
pub mod user;

/// Compose all route trees, wiring in shared state, static mounts and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(auth::router(state.clone()))
        .merge(user::router(state.clone()))
        .merge(game::router(state.clone()))
        .merge(comment::router(state.clone()))
        .merge(stats::router(state.clone()))
        .merge(ai::router(state.clone()));

    let docs_router = docs::router(state.clone());
    let max_upload_bytes = state.config().server.max_upload_bytes;
    let static_router = static_files(&state);

    api_router
        .merge(docs_router)
        .merge(static_router)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Build the top-level router and attach cross-cutting middleware layers.
pub fn build_router(state: SharedState) -> Router<()> {
    router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve raw uploads and extracted games from their roots.
fn static_files(state: &SharedState) -> Router<SharedState> {
    let storage = &state.config().storage;
    let mut router = Router::new();

    for (mount, root) in [
        (&storage.uploads_mount, state.paths().uploads_root()),
        (&storage.executables_mount, state.paths().executables_root()),
    ] {
        let mount = mount.trim_matches('/');
        if mount.is_empty() {
            warn!(root = %root.display(), "empty static mount; files under this root are not served");
            continue;
        }
        router = router.nest_service(&format!("/{mount}"), ServeDir::new(root));
    }

    router
}
