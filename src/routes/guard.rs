//! Authentication and ownership middleware shared by the resource routers.

use axum::{
    Extension,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};

use crate::{
    error::{AppError, ServiceError},
    services::{
        auth_service::{self, Actor},
        comment_service,
    },
    state::SharedState,
};

/// Resolve the bearer token into an [`Actor`] stored in the request extensions.
pub async fn require_auth(
    State(state): State<SharedState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;
    let actor = auth_service::authenticate(&state, &token).await?;

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

/// Resolve the game named by the path and make sure the actor owns it.
pub async fn require_game_owner(
    State(state): State<SharedState>,
    Path(game_id): Path<i64>,
    Extension(actor): Extension<Actor>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let store = state.require_store().await?;
    let game = store
        .find_game(game_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| AppError::NotFound(format!("game `{game_id}` not found")))?;
    ensure_owner(game.user_id, &actor, "game")?;

    request.extensions_mut().insert(game);
    Ok(next.run(request).await)
}

/// Resolve the comment named by the path within its game and make sure the actor wrote it.
pub async fn require_comment_owner(
    State(state): State<SharedState>,
    Path((game_id, comment_id)): Path<(i64, i64)>,
    Extension(actor): Extension<Actor>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let store = state.require_store().await?;
    let comment = comment_service::find_game_comment(store.as_ref(), game_id, comment_id).await?;
    ensure_owner(comment.user_id, &actor, "comment")?;

    request.extensions_mut().insert(comment);
    Ok(next.run(request).await)
}

fn ensure_owner(owner: Option<i64>, actor: &Actor, resource: &str) -> Result<(), AppError> {
    match owner {
        Some(owner) if owner == actor.id() => Ok(()),
        _ => Err(AppError::Forbidden(format!(
            "only the author of this {resource} may modify it"
        ))),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_owned())
}
