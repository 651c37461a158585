use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    middleware,
    routing::{get, post},
};

use crate::{
    dto::stats::{PlayTimeLookup, PlayTimeQuery, PlayTimeRequest, PlayTimeResponse},
    error::AppError,
    routes::guard,
    services::{auth_service::Actor, stats_service},
    state::SharedState,
};

/// Heartbeat ticks and play time lookups.
pub fn router(state: SharedState) -> Router<SharedState> {
    let auth = middleware::from_fn_with_state(state, guard::require_auth);

    Router::new().route(
        "/games/{id}/playtime",
        get(get_play_time).merge(post(add_play_time).route_layer(auth)),
    )
}

/// Add a heartbeat increment to the caller's play time on a game.
#[utoipa::path(
    post,
    path = "/games/{id}/playtime",
    tag = "playtime",
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "Game identifier")),
    request_body = PlayTimeRequest,
    responses(
        (status = 200, description = "New total", body = PlayTimeResponse),
        (status = 400, description = "Hours missing, non-numeric or not positive"),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn add_play_time(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path(game_id): Path<i64>,
    payload: Result<Json<PlayTimeRequest>, JsonRejection>,
) -> Result<Json<PlayTimeResponse>, AppError> {
    let Json(payload) = payload?;
    Ok(Json(
        stats_service::add_play_time(&state, &actor, game_id, payload).await?,
    ))
}

/// One user's play time, or every user's when `user_id` is omitted.
#[utoipa::path(
    get,
    path = "/games/{id}/playtime",
    tag = "playtime",
    params(("id" = i64, Path, description = "Game identifier"), PlayTimeQuery),
    responses(
        (status = 200, description = "Play time", body = PlayTimeLookup),
        (status = 404, description = "Unknown game or no record for the user")
    )
)]
pub async fn get_play_time(
    State(state): State<SharedState>,
    Path(game_id): Path<i64>,
    Query(query): Query<PlayTimeQuery>,
) -> Result<Json<PlayTimeLookup>, AppError> {
    Ok(Json(
        stats_service::get_play_time(&state, game_id, query.user_id).await?,
    ))
}
