use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::game::GameResponse;

/// Recommended games; `message` explains an empty list.
#[derive(Debug, Serialize, ToSchema)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<GameResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RecommendationsResponse {
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            recommendations: Vec::new(),
            message: Some(message.into()),
        }
    }
}
