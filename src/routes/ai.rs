use axum::{Extension, Json, Router, extract::State, middleware, routing::get};

use crate::{
    dto::ai::RecommendationsResponse,
    error::AppError,
    routes::guard,
    services::{ai_service, auth_service::Actor},
    state::SharedState,
};

pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new().route(
        "/ai/recommendations",
        get(recommendations).route_layer(middleware::from_fn_with_state(
            state,
            guard::require_auth,
        )),
    )
}

/// Games the caller has not played yet, picked from the ones they rated well.
#[utoipa::path(
    get,
    path = "/ai/recommendations",
    tag = "ai",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Recommendations, possibly empty with a message", body = RecommendationsResponse),
        (status = 403, description = "AI features disabled in the caller's profile")
    )
)]
pub async fn recommendations(
    State(state): State<SharedState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<RecommendationsResponse>, AppError> {
    Ok(Json(ai_service::recommend(&state, &actor).await?))
}
