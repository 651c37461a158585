use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Arcade Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::me,
        crate::routes::user::list_users,
        crate::routes::user::get_user,
        crate::routes::user::update_user,
        crate::routes::user::delete_user,
        crate::routes::game::list_games,
        crate::routes::game::create_game,
        crate::routes::game::get_game,
        crate::routes::game::update_game,
        crate::routes::game::delete_game,
        crate::routes::comment::list_comments,
        crate::routes::comment::create_comment,
        crate::routes::comment::get_comment,
        crate::routes::comment::update_comment,
        crate::routes::comment::delete_comment,
        crate::routes::stats::add_play_time,
        crate::routes::stats::get_play_time,
        crate::routes::ai::recommendations,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::auth::RegisterRequest,
            crate::dto::auth::LoginRequest,
            crate::dto::auth::AuthResponse,
            crate::dto::user::UserResponse,
            crate::dto::user::UserDetailResponse,
            crate::dto::user::UpdateUserRequest,
            crate::dto::game::GameResponse,
            crate::dto::game::GameUploadForm,
            crate::dto::comment::CommentResponse,
            crate::dto::comment::CreateCommentRequest,
            crate::dto::comment::CreateCommentResponse,
            crate::dto::comment::UpdateCommentRequest,
            crate::dto::stats::PlayTimeRequest,
            crate::dto::stats::PlayTimeResponse,
            crate::dto::stats::PlayTimeLookup,
            crate::dto::ai::RecommendationsResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and login"),
        (name = "users", description = "Accounts"),
        (name = "games", description = "Game uploads and catalogue"),
        (name = "comments", description = "Ratings and reviews"),
        (name = "playtime", description = "Play time heartbeats"),
        (name = "ai", description = "AI recommendations"),
    )
)]
pub struct ApiDoc;

/// Declares the `bearer` security scheme referenced by protected routes.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
