use axum::{
    Extension, Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    routing::{get, put},
};

use crate::{
    dto::user::{UpdateUserRequest, UserDetailResponse, UserResponse},
    error::AppError,
    routes::guard,
    services::{auth_service::Actor, user_service},
    state::SharedState,
};

pub fn router(state: SharedState) -> Router<SharedState> {
    let auth = middleware::from_fn_with_state(state, guard::require_auth);

    Router::new().route("/users", get(list_users)).route(
        "/users/{id}",
        get(get_user).merge(
            put(update_user).delete(delete_user).route_layer(auth),
        ),
    )
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    responses((status = 200, description = "Registered users", body = [UserResponse]))
)]
pub async fn list_users(
    State(state): State<SharedState>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    Ok(Json(user_service::list_users(&state).await?))
}

/// A user together with the games they published.
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User identifier")),
    responses(
        (status = 200, description = "User", body = UserDetailResponse),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn get_user(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<UserDetailResponse>, AppError> {
    Ok(Json(user_service::get_user(&state, id).await?))
}

/// Edit the caller's own profile. The current password is always required.
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "User identifier")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Missing current password or no changes"),
        (status = 401, description = "Wrong current password"),
        (status = 403, description = "Not the caller's account")
    )
)]
pub async fn update_user(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let Json(payload) = payload?;
    Ok(Json(
        user_service::update_user(&state, &actor, id, payload).await?,
    ))
}

/// Delete the caller's account. Their games and comments stay online without an author.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "User identifier")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 403, description = "Not the caller's account")
    )
)]
pub async fn delete_user(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    user_service::delete_user(&state, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
