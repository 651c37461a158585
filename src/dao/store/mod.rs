#[cfg(feature = "mongo-store")]
pub mod mongodb;
#[cfg(feature = "sqlite-store")]
pub mod sqlite;

use futures::future::BoxFuture;

use crate::dao::models::{
    CommentChanges, CommentEntity, GameChanges, GameEntity, GameStatsEntity, NewCommentEntity,
    NewGameEntity, NewUserEntity, UserChanges, UserEntity,
};
use crate::dao::storage::StorageResult;

/// Persistence of registered accounts.
pub trait UserStore: Send + Sync {
    /// Insert a user; a taken name or email yields a conflict.
    fn insert_user(&self, user: NewUserEntity) -> BoxFuture<'static, StorageResult<UserEntity>>;
    fn find_user(&self, id: i64) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    fn find_user_by_email(
        &self,
        email: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>>;
    fn update_user(
        &self,
        id: i64,
        changes: UserChanges,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    /// Remove the user row. Their games and comments survive with a null author while their
    /// play-time rows are dropped.
    fn delete_user(&self, id: i64) -> BoxFuture<'static, StorageResult<bool>>;
}

/// Persistence of uploaded games.
pub trait GameStore: Send + Sync {
    fn insert_game(&self, game: NewGameEntity) -> BoxFuture<'static, StorageResult<GameEntity>>;
    fn find_game(&self, id: i64) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    fn list_games_by_user(
        &self,
        user_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    fn update_game(
        &self,
        id: i64,
        changes: GameChanges,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Overwrite the derived rating averages of a game.
    fn update_game_ratings(
        &self,
        id: i64,
        avg_quality: f64,
        avg_difficulty: f64,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Remove the game together with its comments and play-time rows.
    fn delete_game(&self, id: i64) -> BoxFuture<'static, StorageResult<bool>>;
}

/// Persistence of ratings and reviews.
pub trait CommentStore: Send + Sync {
    /// Insert a comment; a second comment by the same user on the same game yields a conflict.
    fn insert_comment(
        &self,
        comment: NewCommentEntity,
    ) -> BoxFuture<'static, StorageResult<CommentEntity>>;
    fn find_comment(&self, id: i64) -> BoxFuture<'static, StorageResult<Option<CommentEntity>>>;
    /// Comments of a game, newest first.
    fn list_comments_by_game(
        &self,
        game_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<CommentEntity>>>;
    fn list_comments_by_user(
        &self,
        user_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<CommentEntity>>>;
    fn update_comment(
        &self,
        id: i64,
        changes: CommentChanges,
    ) -> BoxFuture<'static, StorageResult<Option<CommentEntity>>>;
    fn delete_comment(&self, id: i64) -> BoxFuture<'static, StorageResult<bool>>;
}

/// Persistence of per-user play time.
pub trait StatsStore: Send + Sync {
    /// Create the (user, game) row with `hours` or add `hours` to it, atomically.
    fn add_play_time(
        &self,
        user_id: i64,
        game_id: i64,
        hours: f64,
    ) -> BoxFuture<'static, StorageResult<GameStatsEntity>>;
    fn find_stats(
        &self,
        user_id: i64,
        game_id: i64,
    ) -> BoxFuture<'static, StorageResult<Option<GameStatsEntity>>>;
    fn list_stats_by_game(
        &self,
        game_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<GameStatsEntity>>>;
    fn list_stats_by_user(
        &self,
        user_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<GameStatsEntity>>>;
}

/// Abstraction over the whole persistence layer.
pub trait Store: UserStore + GameStore + CommentStore + StatsStore {
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
