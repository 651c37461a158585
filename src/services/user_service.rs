use std::collections::HashMap;

use tracing::info;
use validator::Validate;

use crate::{
    dao::models::UserChanges,
    dto::{
        game::GameResponse,
        user::{UpdateUserRequest, UserDetailResponse, UserResponse},
    },
    error::ServiceError,
    services::auth_service::{self, Actor},
    state::SharedState,
};

pub async fn list_users(state: &SharedState) -> Result<Vec<UserResponse>, ServiceError> {
    let store = state.require_store().await?;
    let users = store.list_users().await?;
    Ok(users.into_iter().map(Into::into).collect())
}

/// A user with every game they published.
pub async fn get_user(state: &SharedState, id: i64) -> Result<UserDetailResponse, ServiceError> {
    let store = state.require_store().await?;
    let user = store
        .find_user(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user `{id}` not found")))?;

    let games = store
        .list_games_by_user(id)
        .await?
        .into_iter()
        .map(|game| GameResponse::new(game, Some(user.name.clone()), state.paths()))
        .collect();

    Ok(UserDetailResponse {
        user: user.into(),
        games,
    })
}

/// Profile edit gated by the current password.
pub async fn update_user(
    state: &SharedState,
    actor: &Actor,
    id: i64,
    request: UpdateUserRequest,
) -> Result<UserResponse, ServiceError> {
    ensure_self(actor, id)?;
    request.validate()?;

    let Some(current_password) = request.current_password.filter(|p| !p.is_empty()) else {
        return Err(ServiceError::InvalidInput(
            "current_password is required".into(),
        ));
    };
    if !auth_service::verify_password(current_password, actor.0.password_hash.clone()).await? {
        return Err(ServiceError::Unauthenticated(
            "current password is incorrect".into(),
        ));
    }

    let password_hash = match request.new_password {
        Some(password) => Some(auth_service::hash_password(password).await?),
        None => None,
    };
    let changes = UserChanges {
        name: request.name.map(|name| name.trim().to_owned()),
        password_hash,
        ai_enabled: request.ai_enabled,
    };
    if changes.is_empty() {
        return Err(ServiceError::InvalidInput("no changes supplied".into()));
    }

    let store = state.require_store().await?;
    let user = store
        .update_user(id, changes)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user `{id}` not found")))?;
    info!(user_id = id, "user profile updated");
    Ok(user.into())
}

/// Remove the account; games and comments stay with an unknown author.
pub async fn delete_user(state: &SharedState, actor: &Actor, id: i64) -> Result<(), ServiceError> {
    ensure_self(actor, id)?;
    let store = state.require_store().await?;
    if !store.delete_user(id).await? {
        return Err(ServiceError::NotFound(format!("user `{id}` not found")));
    }
    info!(user_id = id, "user deleted; authored content kept");
    Ok(())
}

fn ensure_self(actor: &Actor, id: i64) -> Result<(), ServiceError> {
    if actor.id() != id {
        return Err(ServiceError::Forbidden(
            "users can only modify their own account".into(),
        ));
    }
    Ok(())
}

/// Map user ids to names, for rendering authors of games and comments.
pub async fn author_names(
    state: &SharedState,
    ids: &[i64],
) -> Result<HashMap<i64, String>, ServiceError> {
    let store = state.require_store().await?;
    let mut names = HashMap::new();
    for &id in ids {
        if names.contains_key(&id) {
            continue;
        }
        if let Some(user) = store.find_user(id).await? {
            names.insert(id, user.name);
        }
    }
    Ok(names)
}
