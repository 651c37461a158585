use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{self, DateTime, Document, doc},
    options::{IndexOptions, ReturnDocument},
};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult, is_duplicate_key},
    models::{MongoCommentDocument, MongoGameDocument, MongoStatsDocument, MongoUserDocument},
};
use crate::dao::{
    models::{
        CommentChanges, CommentEntity, GameChanges, GameEntity, GameStatsEntity,
        NewCommentEntity, NewGameEntity, NewUserEntity, UserChanges, UserEntity,
    },
    storage::StorageResult,
    store::{CommentStore, GameStore, StatsStore, Store, UserStore},
};

const USERS: &str = "users";
const GAMES: &str = "games";
const COMMENTS: &str = "comments";
const STATS: &str = "game_stats";
const COUNTERS: &str = "counters";

/// `Store` implementation backed by MongoDB. Ids come from a counters collection so they stay
/// integers across backends.
#[derive(Clone)]
pub struct MongoStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.state.read().await.database.clone();
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let store = Self {
            inner: Arc::new(MongoInner {
                state: RwLock::new(MongoState { client, database }),
                config,
            }),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let unique = |name: &str| {
            IndexOptions::builder()
                .name(Some(name.to_owned()))
                .unique(Some(true))
                .build()
        };

        let indexes: [(&'static str, &'static str, IndexModel); 5] = [
            (
                USERS,
                "email",
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique("user_email_idx"))
                    .build(),
            ),
            (
                USERS,
                "name",
                IndexModel::builder()
                    .keys(doc! { "name": 1 })
                    .options(unique("user_name_idx"))
                    .build(),
            ),
            (
                GAMES,
                "user_id",
                IndexModel::builder()
                    .keys(doc! { "user_id": 1 })
                    .options(
                        IndexOptions::builder()
                            .name(Some("game_user_idx".to_owned()))
                            .build(),
                    )
                    .build(),
            ),
            (
                COMMENTS,
                "user_id,game_id",
                // Comments of deleted users keep a null author and must not collide.
                IndexModel::builder()
                    .keys(doc! { "user_id": 1, "game_id": 1 })
                    .options(
                        IndexOptions::builder()
                            .name(Some("comment_author_game_idx".to_owned()))
                            .unique(Some(true))
                            .partial_filter_expression(Some(doc! { "user_id": { "$type": "long" } }))
                            .build(),
                    )
                    .build(),
            ),
            (
                STATS,
                "user_id,game_id",
                IndexModel::builder()
                    .keys(doc! { "user_id": 1, "game_id": 1 })
                    .options(unique("stats_user_game_idx"))
                    .build(),
            ),
        ];

        let database = self.database().await;
        for (collection, index, model) in indexes {
            database
                .collection::<Document>(collection)
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index,
                    source,
                })?;
        }
        Ok(())
    }

    async fn database(&self) -> Database {
        self.inner.state.read().await.database.clone()
    }

    async fn collection<T: Send + Sync>(&self, name: &'static str) -> Collection<T> {
        self.database().await.collection::<T>(name)
    }

    async fn next_id(&self, collection: &'static str) -> MongoResult<i64> {
        let counters = self.collection::<Document>(COUNTERS).await;
        let counter = counters
            .find_one_and_update(doc! { "_id": collection }, doc! { "$inc": { "seq": 1_i64 } })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::NextId {
                collection,
                source: Some(source),
            })?;

        counter
            .and_then(|counter| counter.get_i64("seq").ok())
            .ok_or(MongoDaoError::NextId {
                collection,
                source: None,
            })
    }

    async fn find_many<T>(
        &self,
        name: &'static str,
        filter: Document,
        operation: &'static str,
    ) -> MongoResult<Vec<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        self.collection::<T>(name)
            .await
            .find(filter)
            .sort(doc! { "created_at": -1, "_id": -1 })
            .await
            .map_err(MongoDaoError::query(operation))?
            .try_collect()
            .await
            .map_err(MongoDaoError::query(operation))
    }

    /// Apply `$set` to one document and return it as stored afterwards.
    async fn set_fields<T>(
        &self,
        name: &'static str,
        id: i64,
        mut fields: Document,
        operation: &'static str,
    ) -> MongoResult<Option<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        fields.insert("updated_at", DateTime::now());
        self.collection::<T>(name)
            .await
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": fields })
            .return_document(ReturnDocument::After)
            .await
            .map_err(MongoDaoError::query(operation))
    }

    async fn insert_user(&self, user: NewUserEntity) -> MongoResult<UserEntity> {
        let now = DateTime::now();
        let document = MongoUserDocument {
            id: self.next_id(USERS).await?,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            ai_enabled: user.ai_enabled,
            verified: false,
            created_at: now,
            updated_at: now,
        };
        self.collection::<MongoUserDocument>(USERS)
            .await
            .insert_one(&document)
            .await
            .map_err(MongoDaoError::query("insert user"))?;
        Ok(document.into())
    }

    async fn find_user(&self, filter: Document) -> MongoResult<Option<UserEntity>> {
        let document = self
            .collection::<MongoUserDocument>(USERS)
            .await
            .find_one(filter)
            .await
            .map_err(MongoDaoError::query("load user"))?;
        Ok(document.map(Into::into))
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> MongoResult<Option<UserEntity>> {
        let mut fields = Document::new();
        if let Some(name) = changes.name {
            fields.insert("name", name);
        }
        if let Some(password_hash) = changes.password_hash {
            fields.insert("password_hash", password_hash);
        }
        if let Some(ai_enabled) = changes.ai_enabled {
            fields.insert("ai_enabled", ai_enabled);
        }
        let document: Option<MongoUserDocument> =
            self.set_fields(USERS, id, fields, "update user").await?;
        Ok(document.map(Into::into))
    }

    /// Detach authored content, drop play time, then remove the account.
    async fn delete_user(&self, id: i64) -> MongoResult<bool> {
        let detach = doc! { "$set": { "user_id": bson::Bson::Null } };
        self.collection::<Document>(GAMES)
            .await
            .update_many(doc! { "user_id": id }, detach.clone())
            .await
            .map_err(MongoDaoError::query("detach games from user"))?;
        self.collection::<Document>(COMMENTS)
            .await
            .update_many(doc! { "user_id": id }, detach)
            .await
            .map_err(MongoDaoError::query("detach comments from user"))?;
        self.collection::<Document>(STATS)
            .await
            .delete_many(doc! { "user_id": id })
            .await
            .map_err(MongoDaoError::query("delete play time of user"))?;

        let result = self
            .collection::<Document>(USERS)
            .await
            .delete_one(doc! { "_id": id })
            .await
            .map_err(MongoDaoError::query("delete user"))?;
        Ok(result.deleted_count > 0)
    }

    async fn insert_game(&self, game: NewGameEntity) -> MongoResult<GameEntity> {
        let now = DateTime::now();
        let document = MongoGameDocument {
            id: self.next_id(GAMES).await?,
            title: game.title,
            description: game.description,
            user_id: Some(game.user_id),
            archive_file: game.archive_file,
            image_file: game.image_file,
            playable_path: None,
            avg_quality: 0.0,
            avg_difficulty: 0.0,
            created_at: now,
            updated_at: now,
        };
        self.collection::<MongoGameDocument>(GAMES)
            .await
            .insert_one(&document)
            .await
            .map_err(MongoDaoError::query("insert game"))?;
        Ok(document.into())
    }

    async fn find_game(&self, id: i64) -> MongoResult<Option<GameEntity>> {
        let document = self
            .collection::<MongoGameDocument>(GAMES)
            .await
            .find_one(doc! { "_id": id })
            .await
            .map_err(MongoDaoError::query("load game"))?;
        Ok(document.map(Into::into))
    }

    async fn update_game(&self, id: i64, changes: GameChanges) -> MongoResult<Option<GameEntity>> {
        let mut fields = Document::new();
        let GameChanges {
            title,
            description,
            archive_file,
            image_file,
            playable_path,
        } = changes;
        for (key, value) in [
            ("title", title),
            ("description", description),
            ("archive_file", archive_file),
            ("image_file", image_file),
            ("playable_path", playable_path),
        ] {
            if let Some(value) = value {
                fields.insert(key, value);
            }
        }
        let document: Option<MongoGameDocument> =
            self.set_fields(GAMES, id, fields, "update game").await?;
        Ok(document.map(Into::into))
    }

    async fn update_game_ratings(
        &self,
        id: i64,
        avg_quality: f64,
        avg_difficulty: f64,
    ) -> MongoResult<()> {
        self.collection::<Document>(GAMES)
            .await
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "avg_quality": avg_quality, "avg_difficulty": avg_difficulty } },
            )
            .await
            .map_err(MongoDaoError::query("update game ratings"))?;
        Ok(())
    }

    async fn delete_game(&self, id: i64) -> MongoResult<bool> {
        self.collection::<Document>(COMMENTS)
            .await
            .delete_many(doc! { "game_id": id })
            .await
            .map_err(MongoDaoError::query("delete comments of game"))?;
        self.collection::<Document>(STATS)
            .await
            .delete_many(doc! { "game_id": id })
            .await
            .map_err(MongoDaoError::query("delete play time of game"))?;

        let result = self
            .collection::<Document>(GAMES)
            .await
            .delete_one(doc! { "_id": id })
            .await
            .map_err(MongoDaoError::query("delete game"))?;
        Ok(result.deleted_count > 0)
    }

    async fn insert_comment(&self, comment: NewCommentEntity) -> MongoResult<CommentEntity> {
        let now = DateTime::now();
        let document = MongoCommentDocument {
            id: self.next_id(COMMENTS).await?,
            user_id: Some(comment.user_id),
            game_id: comment.game_id,
            quality: comment.quality,
            difficulty: comment.difficulty,
            body: comment.body,
            script: comment.script,
            play_time_hours: comment.play_time_hours,
            created_at: now,
            updated_at: now,
        };
        self.collection::<MongoCommentDocument>(COMMENTS)
            .await
            .insert_one(&document)
            .await
            .map_err(MongoDaoError::query("insert comment"))?;
        Ok(document.into())
    }

    async fn find_comment(&self, id: i64) -> MongoResult<Option<CommentEntity>> {
        let document = self
            .collection::<MongoCommentDocument>(COMMENTS)
            .await
            .find_one(doc! { "_id": id })
            .await
            .map_err(MongoDaoError::query("load comment"))?;
        Ok(document.map(Into::into))
    }

    async fn update_comment(
        &self,
        id: i64,
        changes: CommentChanges,
    ) -> MongoResult<Option<CommentEntity>> {
        let mut fields = Document::new();
        if let Some(quality) = changes.quality {
            fields.insert("quality", quality);
        }
        if let Some(difficulty) = changes.difficulty {
            fields.insert("difficulty", difficulty);
        }
        if let Some(body) = changes.body {
            fields.insert("body", body);
        }
        if let Some(script) = changes.script {
            fields.insert("script", script);
        }
        let document: Option<MongoCommentDocument> =
            self.set_fields(COMMENTS, id, fields, "update comment").await?;
        Ok(document.map(Into::into))
    }

    async fn delete_comment(&self, id: i64) -> MongoResult<bool> {
        let result = self
            .collection::<Document>(COMMENTS)
            .await
            .delete_one(doc! { "_id": id })
            .await
            .map_err(MongoDaoError::query("delete comment"))?;
        Ok(result.deleted_count > 0)
    }

    async fn increment_play_time(
        &self,
        user_id: i64,
        game_id: i64,
        hours: f64,
    ) -> MongoResult<Option<MongoStatsDocument>> {
        self.collection::<MongoStatsDocument>(STATS)
            .await
            .find_one_and_update(
                doc! { "user_id": user_id, "game_id": game_id },
                doc! {
                    "$inc": { "play_time_hours": hours },
                    "$set": { "updated_at": DateTime::now() },
                },
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(MongoDaoError::query("add play time"))
    }

    /// Increment the existing row, or insert it. A concurrent first tick that wins the insert
    /// race turns our insert into a duplicate, after which the increment is retried.
    async fn add_play_time(
        &self,
        user_id: i64,
        game_id: i64,
        hours: f64,
    ) -> MongoResult<GameStatsEntity> {
        if let Some(document) = self.increment_play_time(user_id, game_id, hours).await? {
            return Ok(document.into());
        }

        let now = DateTime::now();
        let document = MongoStatsDocument {
            id: self.next_id(STATS).await?,
            user_id,
            game_id,
            play_time_hours: hours,
            created_at: now,
            updated_at: now,
        };
        match self
            .collection::<MongoStatsDocument>(STATS)
            .await
            .insert_one(&document)
            .await
        {
            Ok(_) => Ok(document.into()),
            Err(err) if is_duplicate_key(&err) => self
                .increment_play_time(user_id, game_id, hours)
                .await?
                .map(Into::into)
                .ok_or(MongoDaoError::Query {
                    operation: "add play time",
                    source: err,
                }),
            Err(source) => Err(MongoDaoError::Query {
                operation: "add play time",
                source,
            }),
        }
    }

    async fn find_stats(&self, user_id: i64, game_id: i64) -> MongoResult<Option<GameStatsEntity>> {
        let document = self
            .collection::<MongoStatsDocument>(STATS)
            .await
            .find_one(doc! { "user_id": user_id, "game_id": game_id })
            .await
            .map_err(MongoDaoError::query("load play time"))?;
        Ok(document.map(Into::into))
    }
}

fn entities<D, E: From<D>>(documents: Vec<D>) -> Vec<E> {
    documents.into_iter().map(Into::into).collect()
}

impl UserStore for MongoStore {
    fn insert_user(&self, user: NewUserEntity) -> BoxFuture<'static, StorageResult<UserEntity>> {
        let store = self.clone();
        Box::pin(async move { store.insert_user(user).await.map_err(Into::into) })
    }

    fn find_user(&self, id: i64) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_user(doc! { "_id": id }).await.map_err(Into::into) })
    }

    fn find_user_by_email(
        &self,
        email: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_user(doc! { "email": email })
                .await
                .map_err(Into::into)
        })
    }

    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoUserDocument> = store
                .collection::<MongoUserDocument>(USERS)
                .await
                .find(doc! {})
                .sort(doc! { "_id": 1 })
                .await
                .map_err(MongoDaoError::query("list users"))?
                .try_collect()
                .await
                .map_err(MongoDaoError::query("list users"))?;
            Ok(entities(documents))
        })
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

impl GameStore for MongoStore {
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
        Box::pin(async move {
            let documents: Vec<MongoGameDocument> =
                store.find_many(GAMES, doc! {}, "list games").await?;
            Ok(entities(documents))
        })
    }

    fn list_games_by_user(
        &self,
        user_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoGameDocument> = store
                .find_many(GAMES, doc! { "user_id": user_id }, "list games by user")
                .await?;
            Ok(entities(documents))
        })
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

impl CommentStore for MongoStore {
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
        Box::pin(async move {
            let documents: Vec<MongoCommentDocument> = store
                .find_many(COMMENTS, doc! { "game_id": game_id }, "list comments by game")
                .await?;
            Ok(entities(documents))
        })
    }

    fn list_comments_by_user(
        &self,
        user_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<CommentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoCommentDocument> = store
                .find_many(COMMENTS, doc! { "user_id": user_id }, "list comments by user")
                .await?;
            Ok(entities(documents))
        })
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

impl StatsStore for MongoStore {
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
            let documents: Vec<MongoStatsDocument> = store
                .find_many(STATS, doc! { "game_id": game_id }, "list play time by game")
                .await?;
            Ok(entities(documents))
        })
    }

    fn list_stats_by_user(
        &self,
        user_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<GameStatsEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoStatsDocument> = store
                .find_many(STATS, doc! { "user_id": user_id }, "list play time by user")
                .await?;
            Ok(entities(documents))
        })
    }
}

impl Store for MongoStore {
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
