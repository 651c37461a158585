use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::{dao::models::GameStatsEntity, dto::format_system_time};

/// Heartbeat tick. `hours` may be a JSON number or a numeric string.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PlayTimeRequest {
    #[serde(default)]
    #[schema(value_type = f64, example = 0.25)]
    pub hours: Option<Value>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PlayTimeQuery {
    /// Restrict the result to one user.
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlayTimeResponse {
    pub game_id: i64,
    pub user_id: i64,
    pub play_time_hours: f64,
    pub updated_at: String,
}

impl From<GameStatsEntity> for PlayTimeResponse {
    fn from(stats: GameStatsEntity) -> Self {
        Self {
            game_id: stats.game_id,
            user_id: stats.user_id,
            play_time_hours: stats.play_time_hours,
            updated_at: format_system_time(stats.updated_at),
        }
    }
}

/// Either a single user's record or every record of the game.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum PlayTimeLookup {
    One(PlayTimeResponse),
    All(Vec<PlayTimeResponse>),
}
