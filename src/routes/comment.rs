use axum::{
    Extension, Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
};

use crate::{
    dao::models::CommentEntity,
    dto::comment::{
        CommentResponse, CreateCommentRequest, CreateCommentResponse, UpdateCommentRequest,
    },
    error::AppError,
    routes::guard,
    services::{auth_service::Actor, comment_service},
    state::SharedState,
};

pub fn router(state: SharedState) -> Router<SharedState> {
    let auth = middleware::from_fn_with_state(state.clone(), guard::require_auth);
    let owner = middleware::from_fn_with_state(state, guard::require_comment_owner);

    Router::new()
        .route(
            "/games/{id}/comments",
            get(list_comments).merge(post(create_comment).route_layer(auth.clone())),
        )
        .route(
            "/games/{id}/comments/{comment_id}",
            get(get_comment).merge(
                put(update_comment)
                    .delete(delete_comment)
                    .route_layer(owner)
                    .route_layer(auth),
            ),
        )
}

/// Comments of a game, newest first.
#[utoipa::path(
    get,
    path = "/games/{id}/comments",
    tag = "comments",
    params(("id" = i64, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Comments", body = [CommentResponse]),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn list_comments(
    State(state): State<SharedState>,
    Path(game_id): Path<i64>,
) -> Result<Json<Vec<CommentResponse>>, AppError> {
    Ok(Json(comment_service::list_comments(&state, game_id).await?))
}

/// Rate and review a game. Requires recorded play time; one comment per user and game.
#[utoipa::path(
    post,
    path = "/games/{id}/comments",
    tag = "comments",
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "Game identifier")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CreateCommentResponse),
        (status = 400, description = "Invalid payload or no play time recorded"),
        (status = 404, description = "Unknown game"),
        (status = 409, description = "Already commented")
    )
)]
pub async fn create_comment(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path(game_id): Path<i64>,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateCommentResponse>), AppError> {
    let Json(payload) = payload?;
    let created = comment_service::create_comment(&state, &actor, game_id, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/games/{id}/comments/{comment_id}",
    tag = "comments",
    params(
        ("id" = i64, Path, description = "Game identifier"),
        ("comment_id" = i64, Path, description = "Comment identifier")
    ),
    responses(
        (status = 200, description = "Comment", body = CommentResponse),
        (status = 404, description = "Unknown comment on this game")
    )
)]
pub async fn get_comment(
    State(state): State<SharedState>,
    Path((game_id, comment_id)): Path<(i64, i64)>,
) -> Result<Json<CommentResponse>, AppError> {
    Ok(Json(
        comment_service::get_comment(&state, game_id, comment_id).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/games/{id}/comments/{comment_id}",
    tag = "comments",
    security(("bearer" = [])),
    params(
        ("id" = i64, Path, description = "Game identifier"),
        ("comment_id" = i64, Path, description = "Comment identifier")
    ),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = CommentResponse),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Unknown comment on this game")
    )
)]
pub async fn update_comment(
    State(state): State<SharedState>,
    Extension(comment): Extension<CommentEntity>,
    payload: Result<Json<UpdateCommentRequest>, JsonRejection>,
) -> Result<Json<CommentResponse>, AppError> {
    let Json(payload) = payload?;
    Ok(Json(
        comment_service::update_comment(&state, comment, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/games/{id}/comments/{comment_id}",
    tag = "comments",
    security(("bearer" = [])),
    params(
        ("id" = i64, Path, description = "Game identifier"),
        ("comment_id" = i64, Path, description = "Comment identifier")
    ),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Unknown comment on this game")
    )
)]
pub async fn delete_comment(
    State(state): State<SharedState>,
    Extension(comment): Extension<CommentEntity>,
) -> Result<StatusCode, AppError> {
    comment_service::delete_comment(&state, comment).await?;
    Ok(StatusCode::NO_CONTENT)
}
