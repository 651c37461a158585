use tracing::debug;
use validator::ValidationErrors;

use crate::{
    dto::{
        stats::{PlayTimeLookup, PlayTimeRequest, PlayTimeResponse},
        validation::parse_hours,
    },
    error::ServiceError,
    services::auth_service::Actor,
    state::SharedState,
};

/// Add a heartbeat increment to the actor's play time on a game.
pub async fn add_play_time(
    state: &SharedState,
    actor: &Actor,
    game_id: i64,
    request: PlayTimeRequest,
) -> Result<PlayTimeResponse, ServiceError> {
    let hours = request
        .hours
        .as_ref()
        .ok_or_else(|| validator::ValidationError::new("required"))
        .and_then(parse_hours)
        .map_err(|err| {
            let mut errors = ValidationErrors::new();
            errors.add("hours", err);
            ServiceError::Validation(errors)
        })?;

    let store = state.require_store().await?;
    if store.find_game(game_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    }

    let stats = store.add_play_time(actor.id(), game_id, hours).await?;
    debug!(
        game_id,
        user_id = actor.id(),
        hours,
        total = stats.play_time_hours,
        "play time recorded"
    );
    Ok(stats.into())
}

/// One user's play time on a game, or every user's when `user_id` is absent.
pub async fn get_play_time(
    state: &SharedState,
    game_id: i64,
    user_id: Option<i64>,
) -> Result<PlayTimeLookup, ServiceError> {
    let store = state.require_store().await?;
    if store.find_game(game_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    }

    match user_id {
        Some(user_id) => store
            .find_stats(user_id, game_id)
            .await?
            .map(|stats| PlayTimeLookup::One(stats.into()))
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "no play time recorded for user `{user_id}` on game `{game_id}`"
                ))
            }),
        None => {
            let stats = store.list_stats_by_game(game_id).await?;
            Ok(PlayTimeLookup::All(stats.into_iter().map(Into::into).collect()))
        }
    }
}
