use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::UserEntity,
    dto::{format_system_time, game::GameResponse},
};

/// Public projection of an account; the password hash never leaves the service layer.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub ai_enabled: bool,
    pub verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<UserEntity> for UserResponse {
    fn from(user: UserEntity) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            ai_enabled: user.ai_enabled,
            verified: user.verified,
            created_at: format_system_time(user.created_at),
            updated_at: format_system_time(user.updated_at),
        }
    }
}

/// Account together with the games it published.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserDetailResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub games: Vec<GameResponse>,
}

/// Profile edit. `current_password` is mandatory; every other field is optional.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    pub current_password: Option<String>,
    #[validate(length(min = 2, max = 50))]
    pub name: Option<String>,
    #[validate(length(min = 6))]
    pub new_password: Option<String>,
    pub ai_enabled: Option<bool>,
}
