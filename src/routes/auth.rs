use axum::{
    Extension, Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    routing::{get, post},
};

use crate::{
    dto::{
        auth::{AuthResponse, LoginRequest, RegisterRequest},
        user::UserResponse,
    },
    error::AppError,
    routes::guard,
    services::auth_service::{self, Actor},
    state::SharedState,
};

/// Registration, login and identity of the bearer.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route(
            "/auth/me",
            get(me).route_layer(middleware::from_fn_with_state(state, guard::require_auth)),
        )
}

/// Create an account and return a bearer token for it.
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Name or email already registered")
    )
)]
pub async fn register(
    State(state): State<SharedState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let Json(payload) = payload?;
    let response = auth_service::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Exchange credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(
    State(state): State<SharedState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(payload) = payload?;
    Ok(Json(auth_service::login(&state, payload).await?))
}

/// Account the bearer token was issued for.
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn me(Extension(actor): Extension<Actor>) -> Json<UserResponse> {
    Json(actor.0.into())
}
