use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sqlx::FromRow;

use crate::dao::models::{CommentEntity, GameEntity, GameStatsEntity, UserEntity};

/// Current time as milliseconds since the Unix epoch, the unit timestamps are stored in.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

fn to_system_time(millis: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(millis.max(0) as u64)
}

#[derive(Debug, FromRow)]
pub struct UserRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    ai_enabled: bool,
    verified: bool,
    created_at: i64,
    updated_at: i64,
}

impl From<UserRow> for UserEntity {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            ai_enabled: row.ai_enabled,
            verified: row.verified,
            created_at: to_system_time(row.created_at),
            updated_at: to_system_time(row.updated_at),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct GameRow {
    id: i64,
    title: String,
    description: Option<String>,
    user_id: Option<i64>,
    archive_file: String,
    image_file: String,
    playable_path: Option<String>,
    avg_quality: f64,
    avg_difficulty: f64,
    created_at: i64,
    updated_at: i64,
}

impl From<GameRow> for GameEntity {
    fn from(row: GameRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            user_id: row.user_id,
            archive_file: row.archive_file,
            image_file: row.image_file,
            playable_path: row.playable_path,
            avg_quality: row.avg_quality,
            avg_difficulty: row.avg_difficulty,
            created_at: to_system_time(row.created_at),
            updated_at: to_system_time(row.updated_at),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct CommentRow {
    id: i64,
    user_id: Option<i64>,
    game_id: i64,
    quality: i64,
    difficulty: i64,
    body: String,
    script: Option<String>,
    play_time_hours: f64,
    created_at: i64,
    updated_at: i64,
}

impl From<CommentRow> for CommentEntity {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            game_id: row.game_id,
            quality: row.quality,
            difficulty: row.difficulty,
            body: row.body,
            script: row.script,
            play_time_hours: row.play_time_hours,
            created_at: to_system_time(row.created_at),
            updated_at: to_system_time(row.updated_at),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct GameStatsRow {
    id: i64,
    user_id: i64,
    game_id: i64,
    play_time_hours: f64,
    created_at: i64,
    updated_at: i64,
}

impl From<GameStatsRow> for GameStatsEntity {
    fn from(row: GameStatsRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            game_id: row.game_id,
            play_time_hours: row.play_time_hours,
            created_at: to_system_time(row.created_at),
            updated_at: to_system_time(row.updated_at),
        }
    }
}
