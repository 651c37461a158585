use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::CommentEntity,
    dto::{UNKNOWN_AUTHOR, format_system_time, validation::validate_not_blank},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCommentRequest {
    #[validate(range(min = 1, max = 5))]
    pub quality: i64,
    #[validate(range(min = 1, max = 5))]
    pub difficulty: i64,
    #[validate(custom(function = validate_not_blank))]
    pub body: String,
    pub script: Option<String>,
}

/// Partial comment edit; absent fields keep their value.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCommentRequest {
    #[validate(range(min = 1, max = 5))]
    pub quality: Option<i64>,
    #[validate(range(min = 1, max = 5))]
    pub difficulty: Option<i64>,
    #[validate(custom(function = validate_not_blank))]
    pub body: Option<String>,
    pub script: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentResponse {
    pub id: i64,
    pub game_id: i64,
    pub user_id: Option<i64>,
    pub author_name: String,
    pub quality: i64,
    pub difficulty: i64,
    pub body: String,
    pub script: Option<String>,
    /// Author play time when the comment was written.
    pub play_time_hours: f64,
    /// Author play time now.
    pub current_play_time_hours: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl CommentResponse {
    pub fn new(
        comment: CommentEntity,
        author_name: Option<String>,
        current_play_time_hours: f64,
    ) -> Self {
        Self {
            id: comment.id,
            game_id: comment.game_id,
            user_id: comment.user_id,
            author_name: author_name.unwrap_or_else(|| UNKNOWN_AUTHOR.to_owned()),
            quality: comment.quality,
            difficulty: comment.difficulty,
            body: comment.body,
            script: comment.script,
            play_time_hours: comment.play_time_hours,
            current_play_time_hours,
            created_at: format_system_time(comment.created_at),
            updated_at: format_system_time(comment.updated_at),
        }
    }
}

/// Result of a comment creation; `ai_response` is only present when a reaction was generated.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateCommentResponse {
    #[serde(flatten)]
    pub comment: CommentResponse,
    pub ai_response: Option<String>,
}
