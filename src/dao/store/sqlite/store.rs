use futures::future::BoxFuture;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use tracing::debug;

use super::{
    config::SqliteConfig,
    error::{SqliteDaoError, SqliteResult},
    models::{CommentRow, GameRow, GameStatsRow, UserRow, now_millis},
    schema::STATEMENTS,
};
use crate::dao::{
    models::{
        CommentChanges, CommentEntity, GameChanges, GameEntity, GameStatsEntity,
        NewCommentEntity, NewGameEntity, NewUserEntity, UserChanges, UserEntity,
    },
    storage::StorageResult,
    store::{CommentStore, GameStore, StatsStore, Store, UserStore},
};

/// `Store` implementation backed by a SQLite connection pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open the pool and make sure every table exists.
    pub async fn connect(config: SqliteConfig) -> SqliteResult<Self> {
        let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);
        if config.in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(config.options)
            .await
            .map_err(|source| SqliteDaoError::Connect { source })?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> SqliteResult<()> {
        for &(statement, sql) in STATEMENTS {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|source| SqliteDaoError::Schema { statement, source })?;
        }
        debug!(statements = STATEMENTS.len(), "SQLite schema ready");
        Ok(())
    }

    /// Run a raw statement against the pool, for tests that need to shape the schema.
    #[cfg(test)]
    pub(crate) async fn execute_raw(&self, sql: &str) {
        sqlx::query(sql).execute(&self.pool).await.unwrap();
    }

    async fn ping(&self) -> SqliteResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|source| SqliteDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn insert_user(&self, user: NewUserEntity) -> SqliteResult<UserEntity> {
        let now = now_millis();
        let row: UserRow = sqlx::query_as(
            "INSERT INTO users (name, email, password_hash, ai_enabled, verified, created_at, updated_at)
             VALUES (?, ?, ?, ?, 0, ?, ?)
             RETURNING *",
        )
        .bind(user.name)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.ai_enabled)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(SqliteDaoError::query("insert user"))?;
        Ok(row.into())
    }

    async fn find_user(&self, id: i64) -> SqliteResult<Option<UserEntity>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(SqliteDaoError::query("load user"))?;
        Ok(row.map(Into::into))
    }

    async fn find_user_by_email(&self, email: String) -> SqliteResult<Option<UserEntity>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(SqliteDaoError::query("load user by email"))?;
        Ok(row.map(Into::into))
    }

    async fn list_users(&self) -> SqliteResult<Vec<UserEntity>> {
        let rows: Vec<UserRow> = sqlx::query_as("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(SqliteDaoError::query("list users"))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> SqliteResult<Option<UserEntity>> {
        let row: Option<UserRow> = sqlx::query_as(
            "UPDATE users SET
                name = COALESCE(?, name),
                password_hash = COALESCE(?, password_hash),
                ai_enabled = COALESCE(?, ai_enabled),
                updated_at = ?
             WHERE id = ?
             RETURNING *",
        )
        .bind(changes.name)
        .bind(changes.password_hash)
        .bind(changes.ai_enabled)
        .bind(now_millis())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(SqliteDaoError::query("update user"))?;
        Ok(row.map(Into::into))
    }

    async fn delete_user(&self, id: i64) -> SqliteResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(SqliteDaoError::query("delete user"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_game(&self, game: NewGameEntity) -> SqliteResult<GameEntity> {
        let now = now_millis();
        let row: GameRow = sqlx::query_as(
            "INSERT INTO games (title, description, user_id, archive_file, image_file, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(game.title)
        .bind(game.description)
        .bind(game.user_id)
        .bind(game.archive_file)
        .bind(game.image_file)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(SqliteDaoError::query("insert game"))?;
        Ok(row.into())
    }

    async fn find_game(&self, id: i64) -> SqliteResult<Option<GameEntity>> {
        let row: Option<GameRow> = sqlx::query_as("SELECT * FROM games WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(SqliteDaoError::query("load game"))?;
        Ok(row.map(Into::into))
    }

    async fn list_games(&self) -> SqliteResult<Vec<GameEntity>> {
        let rows: Vec<GameRow> =
            sqlx::query_as("SELECT * FROM games ORDER BY created_at DESC, id DESC")
                .fetch_all(&self.pool)
                .await
                .map_err(SqliteDaoError::query("list games"))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_games_by_user(&self, user_id: i64) -> SqliteResult<Vec<GameEntity>> {
        let rows: Vec<GameRow> = sqlx::query_as(
            "SELECT * FROM games WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(SqliteDaoError::query("list games by user"))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_game(&self, id: i64, changes: GameChanges) -> SqliteResult<Option<GameEntity>> {
        let row: Option<GameRow> = sqlx::query_as(
            "UPDATE games SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                archive_file = COALESCE(?, archive_file),
                image_file = COALESCE(?, image_file),
                playable_path = COALESCE(?, playable_path),
                updated_at = ?
             WHERE id = ?
             RETURNING *",
        )
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.archive_file)
        .bind(changes.image_file)
        .bind(changes.playable_path)
        .bind(now_millis())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(SqliteDaoError::query("update game"))?;
        Ok(row.map(Into::into))
    }

    async fn update_game_ratings(
        &self,
        id: i64,
        avg_quality: f64,
        avg_difficulty: f64,
    ) -> SqliteResult<()> {
        sqlx::query("UPDATE games SET avg_quality = ?, avg_difficulty = ? WHERE id = ?")
            .bind(avg_quality)
            .bind(avg_difficulty)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(SqliteDaoError::query("update game ratings"))?;
        Ok(())
    }

    async fn delete_game(&self, id: i64) -> SqliteResult<bool> {
        let result = sqlx::query("DELETE FROM games WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(SqliteDaoError::query("delete game"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_comment(&self, comment: NewCommentEntity) -> SqliteResult<CommentEntity> {
        let now = now_millis();
        let row: CommentRow = sqlx::query_as(
            "INSERT INTO comments (user_id, game_id, quality, difficulty, body, script, play_time_hours, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(comment.user_id)
        .bind(comment.game_id)
        .bind(comment.quality)
        .bind(comment.difficulty)
        .bind(comment.body)
        .bind(comment.script)
        .bind(comment.play_time_hours)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(SqliteDaoError::query("insert comment"))?;
        Ok(row.into())
    }

    async fn find_comment(&self, id: i64) -> SqliteResult<Option<CommentEntity>> {
        let row: Option<CommentRow> = sqlx::query_as("SELECT * FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(SqliteDaoError::query("load comment"))?;
        Ok(row.map(Into::into))
    }

    async fn list_comments_by_game(&self, game_id: i64) -> SqliteResult<Vec<CommentEntity>> {
        let rows: Vec<CommentRow> = sqlx::query_as(
            "SELECT * FROM comments WHERE game_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await
        .map_err(SqliteDaoError::query("list comments by game"))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_comments_by_user(&self, user_id: i64) -> SqliteResult<Vec<CommentEntity>> {
        let rows: Vec<CommentRow> = sqlx::query_as(
            "SELECT * FROM comments WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(SqliteDaoError::query("list comments by user"))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_comment(
        &self,
        id: i64,
        changes: CommentChanges,
    ) -> SqliteResult<Option<CommentEntity>> {
        let row: Option<CommentRow> = sqlx::query_as(
            "UPDATE comments SET
                quality = COALESCE(?, quality),
                difficulty = COALESCE(?, difficulty),
                body = COALESCE(?, body),
                script = COALESCE(?, script),
                updated_at = ?
             WHERE id = ?
             RETURNING *",
        )
        .bind(changes.quality)
        .bind(changes.difficulty)
        .bind(changes.body)
        .bind(changes.script)
        .bind(now_millis())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(SqliteDaoError::query("update comment"))?;
        Ok(row.map(Into::into))
    }

    async fn delete_comment(&self, id: i64) -> SqliteResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(SqliteDaoError::query("delete comment"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_play_time(
        &self,
        user_id: i64,
        game_id: i64,
        hours: f64,
    ) -> SqliteResult<GameStatsEntity> {
        let now = now_millis();
        let row: GameStatsRow = sqlx::query_as(
            "INSERT INTO game_stats (user_id, game_id, play_time_hours, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (user_id, game_id) DO UPDATE SET
                play_time_hours = game_stats.play_time_hours + excluded.play_time_hours,
                updated_at = excluded.updated_at
             RETURNING *",
        )
        .bind(user_id)
        .bind(game_id)
        .bind(hours)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(SqliteDaoError::query("add play time"))?;
        Ok(row.into())
    }

    async fn find_stats(&self, user_id: i64, game_id: i64) -> SqliteResult<Option<GameStatsEntity>> {
        let row: Option<GameStatsRow> =
            sqlx::query_as("SELECT * FROM game_stats WHERE user_id = ? AND game_id = ?")
                .bind(user_id)
                .bind(game_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(SqliteDaoError::query("load play time"))?;
        Ok(row.map(Into::into))
    }

    async fn list_stats(&self, column: StatsColumn, id: i64) -> SqliteResult<Vec<GameStatsEntity>> {
        let sql = match column {
            StatsColumn::Game => "SELECT * FROM game_stats WHERE game_id = ? ORDER BY id",
            StatsColumn::User => "SELECT * FROM game_stats WHERE user_id = ? ORDER BY id",
        };
        let rows: Vec<GameStatsRow> = sqlx::query_as(sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(SqliteDaoError::query("list play time"))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(Clone, Copy)]
enum StatsColumn {
    Game,
    User,
}

impl UserStore for SqliteStore {
    fn insert_user(&self, user: NewUserEntity) -> BoxFuture<'static, StorageResult<UserEntity>> {
        let store = self.clone();
        Box::pin(async move { store.insert_user(user).await.map_err(Into::into) })
    }

    fn find_user(&self, id: i64) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_user(id).await.map_err(Into::into) })
    }

    fn find_user_by_email(
        &self,
        email: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_user_by_email(email).await.map_err(Into::into) })
    }

    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_users().await.map_err(Into::into) })
    }

    fn update_user(
        &self,
        id: i64,
        changes: UserChanges,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.update_user(id, changes).await.map_err(Into::into) })
    }

    fn delete_user(&self, id: i64) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_user(id).await.map_err(Into::into) })
    }
}

impl GameStore for SqliteStore {
    fn insert_game(&self, game: NewGameEntity) -> BoxFuture<'static, StorageResult<GameEntity>> {
        let store = self.clone();
        Box::pin(async move { store.insert_game(game).await.map_err(Into::into) })
    }

    fn find_game(&self, id: i64) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(id).await.map_err(Into::into) })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_games().await.map_err(Into::into) })
    }

    fn list_games_by_user(
        &self,
        user_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_games_by_user(user_id).await.map_err(Into::into) })
    }

    fn update_game(
        &self,
        id: i64,
        changes: GameChanges,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.update_game(id, changes).await.map_err(Into::into) })
    }

    fn update_game_ratings(
        &self,
        id: i64,
        avg_quality: f64,
        avg_difficulty: f64,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_game_ratings(id, avg_quality, avg_difficulty)
                .await
                .map_err(Into::into)
        })
    }

    fn delete_game(&self, id: i64) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_game(id).await.map_err(Into::into) })
    }
}

impl CommentStore for SqliteStore {
    fn insert_comment(
        &self,
        comment: NewCommentEntity,
    ) -> BoxFuture<'static, StorageResult<CommentEntity>> {
        let store = self.clone();
        Box::pin(async move { store.insert_comment(comment).await.map_err(Into::into) })
    }

    fn find_comment(&self, id: i64) -> BoxFuture<'static, StorageResult<Option<CommentEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_comment(id).await.map_err(Into::into) })
    }

    fn list_comments_by_game(
        &self,
        game_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<CommentEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_comments_by_game(game_id).await.map_err(Into::into) })
    }

    fn list_comments_by_user(
        &self,
        user_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<CommentEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_comments_by_user(user_id).await.map_err(Into::into) })
    }

    fn update_comment(
        &self,
        id: i64,
        changes: CommentChanges,
    ) -> BoxFuture<'static, StorageResult<Option<CommentEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.update_comment(id, changes).await.map_err(Into::into) })
    }

    fn delete_comment(&self, id: i64) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_comment(id).await.map_err(Into::into) })
    }
}

impl StatsStore for SqliteStore {
    fn add_play_time(
        &self,
        user_id: i64,
        game_id: i64,
        hours: f64,
    ) -> BoxFuture<'static, StorageResult<GameStatsEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .add_play_time(user_id, game_id, hours)
                .await
                .map_err(Into::into)
        })
    }

    fn find_stats(
        &self,
        user_id: i64,
        game_id: i64,
    ) -> BoxFuture<'static, StorageResult<Option<GameStatsEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_stats(user_id, game_id).await.map_err(Into::into) })
    }

    fn list_stats_by_game(
        &self,
        game_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<GameStatsEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_stats(StatsColumn::Game, game_id)
                .await
                .map_err(Into::into)
        })
    }

    fn list_stats_by_user(
        &self,
        user_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<GameStatsEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_stats(StatsColumn::User, user_id)
                .await
                .map_err(Into::into)
        })
    }
}

impl Store for SqliteStore {
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        // The pool replaces broken connections on its own; a successful ping is enough.
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}
