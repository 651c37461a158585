use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

use crate::dao::models::{CommentEntity, GameEntity, GameStatsEntity, UserEntity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserDocument {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub ai_enabled: bool,
    #[serde(default)]
    pub verified: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl From<MongoUserDocument> for UserEntity {
    fn from(value: MongoUserDocument) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            password_hash: value.password_hash,
            ai_enabled: value.ai_enabled,
            verified: value.verified,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub user_id: Option<i64>,
    pub archive_file: String,
    pub image_file: String,
    pub playable_path: Option<String>,
    #[serde(default)]
    pub avg_quality: f64,
    #[serde(default)]
    pub avg_difficulty: f64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl From<MongoGameDocument> for GameEntity {
    fn from(value: MongoGameDocument) -> Self {
        Self {
            id: value.id,
            title: value.title,
            description: value.description,
            user_id: value.user_id,
            archive_file: value.archive_file,
            image_file: value.image_file,
            playable_path: value.playable_path,
            avg_quality: value.avg_quality,
            avg_difficulty: value.avg_difficulty,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCommentDocument {
    #[serde(rename = "_id")]
    pub id: i64,
    pub user_id: Option<i64>,
    pub game_id: i64,
    pub quality: i64,
    pub difficulty: i64,
    pub body: String,
    pub script: Option<String>,
    #[serde(default)]
    pub play_time_hours: f64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl From<MongoCommentDocument> for CommentEntity {
    fn from(value: MongoCommentDocument) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            game_id: value.game_id,
            quality: value.quality,
            difficulty: value.difficulty,
            body: value.body,
            script: value.script,
            play_time_hours: value.play_time_hours,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoStatsDocument {
    #[serde(rename = "_id")]
    pub id: i64,
    pub user_id: i64,
    pub game_id: i64,
    pub play_time_hours: f64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl From<MongoStatsDocument> for GameStatsEntity {
    fn from(value: MongoStatsDocument) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            game_id: value.game_id,
            play_time_hours: value.play_time_hours,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}
