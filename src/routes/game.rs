use axum::{
    Extension, Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
};

use crate::{
    dao::models::GameEntity,
    dto::game::{GameResponse, GameUpload, GameUploadForm},
    error::AppError,
    routes::guard,
    services::{auth_service::Actor, game_service},
    state::SharedState,
};

/// Game catalogue and the upload lifecycle of game packages.
pub fn router(state: SharedState) -> Router<SharedState> {
    let auth = middleware::from_fn_with_state(state.clone(), guard::require_auth);
    let owner = middleware::from_fn_with_state(state, guard::require_game_owner);

    Router::new()
        .route(
            "/games",
            get(list_games).merge(post(create_game).route_layer(auth.clone())),
        )
        .route(
            "/games/{id}",
            get(get_game).merge(
                put(update_game)
                    .delete(delete_game)
                    .route_layer(owner)
                    .route_layer(auth),
            ),
        )
}

#[utoipa::path(
    get,
    path = "/games",
    tag = "games",
    responses((status = 200, description = "Published games", body = [GameResponse]))
)]
pub async fn list_games(
    State(state): State<SharedState>,
) -> Result<Json<Vec<GameResponse>>, AppError> {
    Ok(Json(game_service::list_games(&state).await?))
}

/// Upload a zipped game and its cover image. The archive must contain an `index.html`.
#[utoipa::path(
    post,
    path = "/games",
    tag = "games",
    security(("bearer" = [])),
    request_body(content = GameUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Game published", body = GameResponse),
        (status = 400, description = "Invalid form or archive without entry point"),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<GameResponse>), AppError> {
    let upload = GameUpload::from_multipart(multipart).await?;
    let game = game_service::create_game(&state, &actor, upload).await?;
    Ok((StatusCode::CREATED, Json(game)))
}

/// Game detail, including the URL of its playable entry point.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "games",
    params(("id" = i64, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Game", body = GameResponse),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<GameResponse>, AppError> {
    Ok(Json(game_service::get_game(&state, id).await?))
}

/// Replace any subset of the title, description, archive and image of an owned game.
#[utoipa::path(
    put,
    path = "/games/{id}",
    tag = "games",
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "Game identifier")),
    request_body(content = GameUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Game updated", body = GameResponse),
        (status = 400, description = "Invalid form or archive without entry point"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn update_game(
    State(state): State<SharedState>,
    Extension(game): Extension<GameEntity>,
    multipart: Multipart,
) -> Result<Json<GameResponse>, AppError> {
    let upload = GameUpload::from_multipart(multipart).await?;
    Ok(Json(game_service::update_game(&state, game, upload).await?))
}

/// Delete an owned game with its files, comments and play time.
#[utoipa::path(
    delete,
    path = "/games/{id}",
    tag = "games",
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "Game identifier")),
    responses(
        (status = 204, description = "Game deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn delete_game(
    State(state): State<SharedState>,
    Extension(game): Extension<GameEntity>,
) -> Result<StatusCode, AppError> {
    game_service::delete_game(&state, game).await?;
    Ok(StatusCode::NO_CONTENT)
}
