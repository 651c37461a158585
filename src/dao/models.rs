use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Registered account as persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserEntity {
    /// Storage-assigned identifier.
    pub id: i64,
    /// Unique public handle.
    pub name: String,
    /// Unique contact address, also used to log in.
    pub email: String,
    /// Argon2 PHC string; never leaves the service layer.
    pub password_hash: String,
    /// Whether the user opted in to AI reactions and recommendations.
    pub ai_enabled: bool,
    /// Whether the contact address has been verified.
    pub verified: bool,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time the row was updated.
    pub updated_at: SystemTime,
}

/// Values required to insert a new user.
#[derive(Debug, Clone)]
pub struct NewUserEntity {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub ai_enabled: bool,
}

/// Partial update applied to a user; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub ai_enabled: Option<bool>,
}

impl UserChanges {
    /// True when the update would not touch any column.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.password_hash.is_none() && self.ai_enabled.is_none()
    }
}

/// Uploaded game package together with its derived rating fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameEntity {
    /// Storage-assigned identifier, also the name of the extraction directory.
    pub id: i64,
    /// Display title.
    pub title: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Owning user; `None` once the author deleted their account.
    pub user_id: Option<i64>,
    /// File name of the original archive inside the uploads root.
    pub archive_file: String,
    /// File name of the cover image inside the uploads root.
    pub image_file: String,
    /// `{id}/{entry dir}/` once extraction found an entry point.
    pub playable_path: Option<String>,
    /// Mean quality over all comments, `0` without comments.
    pub avg_quality: f64,
    /// Mean difficulty over all comments, `0` without comments.
    pub avg_difficulty: f64,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time the row was updated.
    pub updated_at: SystemTime,
}

/// Values required to insert a provisional game row (no playable path yet).
#[derive(Debug, Clone)]
pub struct NewGameEntity {
    pub title: String,
    pub description: Option<String>,
    pub user_id: i64,
    pub archive_file: String,
    pub image_file: String,
}

/// Partial update applied to a game; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct GameChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub archive_file: Option<String>,
    pub image_file: Option<String>,
    pub playable_path: Option<String>,
}

/// Rating and review left by a user on a game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentEntity {
    pub id: i64,
    /// Author; `None` once the author deleted their account.
    pub user_id: Option<i64>,
    pub game_id: i64,
    /// Quality score in `1..=5`.
    pub quality: i64,
    /// Difficulty score in `1..=5`.
    pub difficulty: i64,
    pub body: String,
    /// Optional embedded snippet.
    pub script: Option<String>,
    /// Play time of the author on this game when the comment was written.
    pub play_time_hours: f64,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

/// Values required to insert a comment.
#[derive(Debug, Clone)]
pub struct NewCommentEntity {
    pub user_id: i64,
    pub game_id: i64,
    pub quality: i64,
    pub difficulty: i64,
    pub body: String,
    pub script: Option<String>,
    pub play_time_hours: f64,
}

/// Partial update applied to a comment; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct CommentChanges {
    pub quality: Option<i64>,
    pub difficulty: Option<i64>,
    pub body: Option<String>,
    pub script: Option<String>,
}

impl CommentChanges {
    /// True when the update would not touch any column.
    pub fn is_empty(&self) -> bool {
        self.quality.is_none()
            && self.difficulty.is_none()
            && self.body.is_none()
            && self.script.is_none()
    }
}

/// Accumulated play time of one user on one game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameStatsEntity {
    pub id: i64,
    pub user_id: i64,
    pub game_id: i64,
    /// Sum of every accepted heartbeat increment, in hours.
    pub play_time_hours: f64,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}
