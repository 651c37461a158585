use std::collections::HashMap;

use tracing::info;
use validator::Validate;

use crate::{
    dao::{
        models::{CommentChanges, CommentEntity, NewCommentEntity},
        store::Store,
    },
    dto::comment::{
        CommentResponse, CreateCommentRequest, CreateCommentResponse, UpdateCommentRequest,
    },
    error::ServiceError,
    services::{auth_service::Actor, rating, user_service},
    state::SharedState,
};

/// Rate and review a game the actor has played.
pub async fn create_comment(
    state: &SharedState,
    actor: &Actor,
    game_id: i64,
    request: CreateCommentRequest,
) -> Result<CreateCommentResponse, ServiceError> {
    request.validate()?;
    let store = state.require_store().await?;

    let game = store
        .find_game(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))?;
    let stats = store
        .find_stats(actor.id(), game_id)
        .await?
        .ok_or_else(|| {
            ServiceError::InvalidInput("play the game before rating it".into())
        })?;

    let comment = store
        .insert_comment(NewCommentEntity {
            user_id: actor.id(),
            game_id,
            quality: request.quality,
            difficulty: request.difficulty,
            body: request.body.trim().to_owned(),
            script: request.script,
            play_time_hours: stats.play_time_hours,
        })
        .await
        .map_err(|err| match ServiceError::from(err) {
            ServiceError::Conflict(_) => {
                ServiceError::Conflict("you already commented on this game".into())
            }
            other => other,
        })?;
    info!(game_id, comment_id = comment.id, user_id = actor.id(), "comment created");

    let (averages, count) = rating::recompute(store.as_ref(), game_id).await?;
    let ai_response = state
        .ai()
        .maybe_react(&comment, averages, count, &game.title)
        .await;

    Ok(CreateCommentResponse {
        comment: CommentResponse::new(
            comment,
            Some(actor.0.name.clone()),
            stats.play_time_hours,
        ),
        ai_response,
    })
}

/// Comments of a game, newest first.
pub async fn list_comments(
    state: &SharedState,
    game_id: i64,
) -> Result<Vec<CommentResponse>, ServiceError> {
    let store = state.require_store().await?;
    if store.find_game(game_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    }

    let comments = store.list_comments_by_game(game_id).await?;
    let author_ids: Vec<i64> = comments.iter().filter_map(|c| c.user_id).collect();
    let names = user_service::author_names(state, &author_ids).await?;
    let play_times: HashMap<i64, f64> = store
        .list_stats_by_game(game_id)
        .await?
        .into_iter()
        .map(|stats| (stats.user_id, stats.play_time_hours))
        .collect();

    Ok(comments
        .into_iter()
        .map(|comment| {
            let author = comment.user_id.and_then(|id| names.get(&id).cloned());
            let current = comment
                .user_id
                .and_then(|id| play_times.get(&id).copied())
                .unwrap_or_default();
            CommentResponse::new(comment, author, current)
        })
        .collect())
}

/// Resolve a comment of a game; comments of other games are reported missing.
pub async fn find_game_comment(
    store: &dyn Store,
    game_id: i64,
    comment_id: i64,
) -> Result<CommentEntity, ServiceError> {
    store
        .find_comment(comment_id)
        .await?
        .filter(|comment| comment.game_id == game_id)
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "comment `{comment_id}` not found on game `{game_id}`"
            ))
        })
}

pub async fn get_comment(
    state: &SharedState,
    game_id: i64,
    comment_id: i64,
) -> Result<CommentResponse, ServiceError> {
    let store = state.require_store().await?;
    let comment = find_game_comment(store.as_ref(), game_id, comment_id).await?;
    render(state, store.as_ref(), comment).await
}

/// Merge a partial edit into a comment already resolved by the ownership guard.
pub async fn update_comment(
    state: &SharedState,
    comment: CommentEntity,
    request: UpdateCommentRequest,
) -> Result<CommentResponse, ServiceError> {
    request.validate()?;
    let changes = CommentChanges {
        quality: request.quality,
        difficulty: request.difficulty,
        body: request.body.map(|body| body.trim().to_owned()),
        script: request.script,
    };
    if changes.is_empty() {
        return Err(ServiceError::InvalidInput("no changes supplied".into()));
    }

    let store = state.require_store().await?;
    let updated = store
        .update_comment(comment.id, changes)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("comment `{}` not found", comment.id)))?;
    rating::recompute(store.as_ref(), updated.game_id).await?;
    info!(game_id = updated.game_id, comment_id = updated.id, "comment updated");

    render(state, store.as_ref(), updated).await
}

pub async fn delete_comment(state: &SharedState, comment: CommentEntity) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    if !store.delete_comment(comment.id).await? {
        return Err(ServiceError::NotFound(format!(
            "comment `{}` not found",
            comment.id
        )));
    }
    rating::recompute(store.as_ref(), comment.game_id).await?;
    info!(game_id = comment.game_id, comment_id = comment.id, "comment deleted");
    Ok(())
}

async fn render(
    state: &SharedState,
    store: &dyn Store,
    comment: CommentEntity,
) -> Result<CommentResponse, ServiceError> {
    let Some(user_id) = comment.user_id else {
        return Ok(CommentResponse::new(comment, None, 0.0));
    };

    let author = user_service::author_names(state, &[user_id])
        .await?
        .remove(&user_id);
    let current = store
        .find_stats(user_id, comment.game_id)
        .await?
        .map(|stats| stats.play_time_hours)
        .unwrap_or_default();
    Ok(CommentResponse::new(comment, author, current))
}
