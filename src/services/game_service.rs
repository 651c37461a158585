//! Game record lifecycle: upload, extraction, replacement and removal of game packages.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tokio::fs;
use tracing::{info, warn};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dao::{
        models::{GameChanges, GameEntity, NewGameEntity},
        store::Store,
    },
    dto::game::{GameResponse, GameUpload, UploadedFile},
    error::ServiceError,
    services::{
        archive,
        auth_service::Actor,
        storage_paths::{StoragePaths, allocate_upload_name, playable_path, sanitized_extension},
        user_service,
    },
    state::SharedState,
};

const ZIP_CONTENT_TYPES: &[&str] = &[
    "application/zip",
    "application/x-zip",
    "application/x-zip-compressed",
    "multipart/x-zip",
];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

pub async fn list_games(state: &SharedState) -> Result<Vec<GameResponse>, ServiceError> {
    let store = state.require_store().await?;
    let games = store.list_games().await?;
    let author_ids: Vec<i64> = games.iter().filter_map(|g| g.user_id).collect();
    let names = user_service::author_names(state, &author_ids).await?;

    Ok(games
        .into_iter()
        .map(|game| {
            let author = game.user_id.and_then(|id| names.get(&id).cloned());
            GameResponse::new(game, author, state.paths())
        })
        .collect())
}

pub async fn get_game(state: &SharedState, id: i64) -> Result<GameResponse, ServiceError> {
    let store = state.require_store().await?;
    let game = store
        .find_game(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{id}` not found")))?;
    render(state, game).await
}

/// Publish a new game: store both uploads, insert the row, then extract the archive.
///
/// Any failure after the first file write rolls every completed step back.
pub async fn create_game(
    state: &SharedState,
    actor: &Actor,
    upload: GameUpload,
) -> Result<GameResponse, ServiceError> {
    upload.fields.validate()?;
    let title = upload.fields.title.ok_or_else(|| required("title"))?;
    let archive = upload.archive.ok_or_else(|| required("archive"))?;
    let image = upload.image.ok_or_else(|| required("image"))?;
    check_archive(&archive)?;
    check_image(&image)?;

    let store = state.require_store().await?;
    let new_game = NewGameEntity {
        title,
        description: upload.fields.description,
        user_id: actor.id(),
        archive_file: allocate_upload_name(archive.file_name.as_deref()),
        image_file: allocate_upload_name(image.file_name.as_deref()),
    };

    let mut rollback = Rollback::default();
    let result = publish(
        store.as_ref(),
        state.paths(),
        new_game,
        &archive,
        &image,
        &mut rollback,
    )
    .await;

    match result {
        Ok(game) => {
            info!(
                game_id = game.id,
                user_id = actor.id(),
                playable_path = game.playable_path.as_deref().unwrap_or_default(),
                "game published"
            );
            Ok(GameResponse::new(
                game,
                Some(actor.0.name.clone()),
                state.paths(),
            ))
        }
        Err(err) => {
            warn!(user_id = actor.id(), error = %err, "game creation failed; rolling back");
            rollback.run(store.as_ref(), state.paths()).await;
            Err(err)
        }
    }
}

async fn publish(
    store: &dyn Store,
    paths: &StoragePaths,
    new_game: NewGameEntity,
    archive: &UploadedFile,
    image: &UploadedFile,
    rollback: &mut Rollback,
) -> Result<GameEntity, ServiceError> {
    let archive_path = paths.uploads_path(&new_game.archive_file);
    rollback.remove(archive_path.clone());
    paths
        .store_upload(&new_game.archive_file, &archive.bytes)
        .await
        .map_err(upload_failed)?;

    rollback.remove(paths.uploads_path(&new_game.image_file));
    paths
        .store_upload(&new_game.image_file, &image.bytes)
        .await
        .map_err(upload_failed)?;

    let game = store.insert_game(new_game).await?;
    rollback.delete_row(game.id);

    let destination = paths.executables_path(game.id);
    rollback.remove(destination.clone());
    let entry_dir = archive::extract(archive_path, destination).await?;

    let changes = GameChanges {
        playable_path: Some(playable_path(game.id, &entry_dir)),
        ..GameChanges::default()
    };
    store
        .update_game(game.id, changes)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{}` vanished", game.id)))
}

/// Replace any subset of the text fields, archive and image of a game already resolved by the
/// ownership guard. A replacement archive is unpacked next to the live directory and only swapped
/// in once its entry point was found.
pub async fn update_game(
    state: &SharedState,
    game: GameEntity,
    upload: GameUpload,
) -> Result<GameResponse, ServiceError> {
    upload.fields.validate()?;
    if upload.fields.title.is_none()
        && upload.fields.description.is_none()
        && upload.archive.is_none()
        && upload.image.is_none()
    {
        return Err(ServiceError::InvalidInput("no changes supplied".into()));
    }
    if let Some(archive) = &upload.archive {
        check_archive(archive)?;
    }
    if let Some(image) = &upload.image {
        check_image(image)?;
    }

    let store = state.require_store().await?;
    let paths = state.paths();
    let mut changes = GameChanges {
        title: upload.fields.title,
        description: upload.fields.description,
        ..GameChanges::default()
    };
    let mut rollback = Rollback::default();
    let mut obsolete = Vec::new();

    if let Some(image) = &upload.image {
        let name = allocate_upload_name(image.file_name.as_deref());
        rollback.remove(paths.uploads_path(&name));
        if let Err(err) = paths.store_upload(&name, &image.bytes).await {
            rollback.run(store.as_ref(), paths).await;
            return Err(upload_failed(err));
        }
        obsolete.push(paths.uploads_path(&game.image_file));
        changes.image_file = Some(name);
    }

    let mut swap = None;
    if let Some(archive) = &upload.archive {
        match replace_archive(paths, &game, archive, &mut rollback).await {
            Ok(done) => {
                obsolete.push(paths.uploads_path(&game.archive_file));
                obsolete.extend(previous_extraction_dir(paths, &game));
                changes.archive_file = Some(done.archive_file.clone());
                changes.playable_path = Some(done.playable_path.clone());
                swap = Some(done);
            }
            Err(err) => {
                warn!(game_id = game.id, error = %err, "archive replacement failed; game kept");
                rollback.run(store.as_ref(), paths).await;
                return Err(err);
            }
        }
    }

    let result = store
        .update_game(game.id, changes)
        .await
        .map_err(ServiceError::from)
        .and_then(|updated| {
            updated.ok_or_else(|| ServiceError::NotFound(format!("game `{}` not found", game.id)))
        });
    let updated = match result {
        Ok(updated) => updated,
        Err(err) => {
            warn!(game_id = game.id, error = %err, "game update failed; restoring previous files");
            if let Some(swap) = swap {
                restore_extraction(paths, game.id, swap.backup.as_deref()).await;
            }
            rollback.run(store.as_ref(), paths).await;
            return Err(err);
        }
    };

    if let Some(backup) = swap.and_then(|swap| swap.backup) {
        paths.remove_if_exists(&backup).await;
    }
    for path in obsolete {
        paths.remove_if_exists(&path).await;
    }

    info!(game_id = updated.id, "game updated");
    render(state, updated).await
}

/// Outcome of a replacement archive moved into place but not yet committed to the row.
#[derive(Debug)]
struct ArchiveSwap {
    archive_file: String,
    playable_path: String,
    /// Previous extraction directory, parked until the row update succeeds.
    backup: Option<PathBuf>,
}

/// Store and unpack a replacement archive, then swap it into the extraction directory. The
/// previous directory is parked in the backup slot rather than deleted.
async fn replace_archive(
    paths: &StoragePaths,
    game: &GameEntity,
    archive: &UploadedFile,
    rollback: &mut Rollback,
) -> Result<ArchiveSwap, ServiceError> {
    let name = allocate_upload_name(archive.file_name.as_deref());
    let archive_path = paths.uploads_path(&name);
    rollback.remove(archive_path.clone());
    paths
        .store_upload(&name, &archive.bytes)
        .await
        .map_err(upload_failed)?;

    let staging = paths.staging_path(game.id);
    paths.remove_if_exists(&staging).await;
    rollback.remove(staging.clone());
    let entry_dir = archive::extract(archive_path, staging.clone()).await?;

    let destination = paths.executables_path(game.id);
    let backup = paths.backup_path(game.id);
    paths.remove_if_exists(&backup).await;
    let backup = match fs::rename(&destination, &backup).await {
        Ok(()) => Some(backup),
        Err(err) if err.kind() == ErrorKind::NotFound => None,
        Err(err) => return Err(move_failed(&destination, err)),
    };

    if let Err(err) = fs::rename(&staging, &destination).await {
        restore_extraction(paths, game.id, backup.as_deref()).await;
        return Err(move_failed(&staging, err));
    }

    Ok(ArchiveSwap {
        archive_file: name,
        playable_path: playable_path(game.id, &entry_dir),
        backup,
    })
}

/// Put the parked extraction directory back in place of whatever the swap left there.
async fn restore_extraction(paths: &StoragePaths, game_id: i64, backup: Option<&Path>) {
    let destination = paths.executables_path(game_id);
    paths.remove_if_exists(&destination).await;
    let Some(backup) = backup else {
        return;
    };
    match fs::rename(backup, &destination).await {
        Ok(()) => info!(game_id, "previous extraction directory restored"),
        Err(err) => warn!(
            game_id,
            error = %err,
            backup = %backup.display(),
            "failed to restore previous extraction directory"
        ),
    }
}

fn move_failed(path: &Path, err: std::io::Error) -> ServiceError {
    ServiceError::Internal(format!("failed to move `{}`: {err}", path.display()))
}

/// Extraction directory named by the first segment of the stored playable path, when it differs
/// from the id-derived one.
fn previous_extraction_dir(paths: &StoragePaths, game: &GameEntity) -> Option<PathBuf> {
    let segment = game
        .playable_path
        .as_deref()?
        .split('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.starts_with('.'))?;
    let path = paths.executables_root().join(segment);
    (path != paths.executables_path(game.id)).then_some(path)
}

/// Remove the files of a game, then its row (comments and play time go with it).
pub async fn delete_game(state: &SharedState, game: GameEntity) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    let paths = state.paths();

    paths
        .remove_if_exists(&paths.uploads_path(&game.archive_file))
        .await;
    paths
        .remove_if_exists(&paths.uploads_path(&game.image_file))
        .await;
    if let Some(previous) = previous_extraction_dir(paths, &game) {
        paths.remove_if_exists(&previous).await;
    }
    paths
        .remove_if_exists(&paths.executables_path(game.id))
        .await;

    if !store.delete_game(game.id).await? {
        return Err(ServiceError::NotFound(format!("game `{}` not found", game.id)));
    }
    info!(game_id = game.id, "game deleted");
    Ok(())
}

async fn render(state: &SharedState, game: GameEntity) -> Result<GameResponse, ServiceError> {
    let author = match game.user_id {
        Some(user_id) => user_service::author_names(state, &[user_id])
            .await?
            .remove(&user_id),
        None => None,
    };
    Ok(GameResponse::new(game, author, state.paths()))
}

/// Ordered undo steps of a partially applied upload. The row goes first, then files in the order
/// they were registered.
#[derive(Debug, Default)]
struct Rollback {
    row: Option<i64>,
    paths: Vec<PathBuf>,
}

impl Rollback {
    fn delete_row(&mut self, game_id: i64) {
        self.row = Some(game_id);
    }

    fn remove(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    async fn run(self, store: &dyn Store, paths: &StoragePaths) {
        if let Some(game_id) = self.row {
            match store.delete_game(game_id).await {
                Ok(_) => info!(game_id, "rolled back game row"),
                Err(err) => warn!(game_id, error = %err, "failed to roll back game row"),
            }
        }
        for path in self.paths {
            paths.remove_if_exists(&path).await;
        }
    }
}

fn required(field: &'static str) -> ServiceError {
    let mut errors = ValidationErrors::new();
    errors.add(field, ValidationError::new("required"));
    ServiceError::Validation(errors)
}

fn upload_failed(err: std::io::Error) -> ServiceError {
    ServiceError::Internal(format!("failed to store upload: {err}"))
}

fn check_archive(file: &UploadedFile) -> Result<(), ServiceError> {
    let by_extension = file
        .file_name
        .as_deref()
        .and_then(sanitized_extension)
        .is_some_and(|ext| ext == "zip");
    let by_mime = file
        .content_type
        .as_deref()
        .is_some_and(|mime| ZIP_CONTENT_TYPES.contains(&mime));
    if by_extension || by_mime {
        Ok(())
    } else {
        Err(ServiceError::InvalidInput(
            "`archive` must be a .zip file".into(),
        ))
    }
}

fn check_image(file: &UploadedFile) -> Result<(), ServiceError> {
    let by_extension = file
        .file_name
        .as_deref()
        .and_then(sanitized_extension)
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()));
    let by_mime = file
        .content_type
        .as_deref()
        .is_some_and(|mime| mime.starts_with("image/"));
    if by_extension || by_mime {
        Ok(())
    } else {
        Err(ServiceError::InvalidInput(
            "`image` must be a png, jpg, jpeg, webp or gif file".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[cfg(feature = "sqlite-store")]
    mod swap {
        use std::sync::Arc;

        use bytes::Bytes;

        use super::super::*;
        use crate::{
            config::AppConfig,
            dao::{
                models::NewUserEntity,
                store::{
                    GameStore, UserStore,
                    sqlite::{SqliteConfig, SqliteStore},
                },
            },
            dto::game::GameFields,
            state::AppState,
        };

        fn zip_file(dir: &std::path::Path, entries: &[(&str, &str)]) -> UploadedFile {
            let path = dir.join("source.zip");
            archive::tests::write_zip(&path, entries);
            UploadedFile {
                file_name: Some("game.zip".into()),
                content_type: Some("application/zip".into()),
                bytes: Bytes::from(std::fs::read(&path).unwrap()),
            }
        }

        fn count(dir: &std::path::Path) -> usize {
            std::fs::read_dir(dir).unwrap().count()
        }

        #[tokio::test]
        async fn failed_row_update_restores_the_previous_extraction() {
            let dir = tempfile::tempdir().unwrap();
            let mut config = AppConfig::default();
            config.storage.uploads_dir = dir.path().join("uploads");
            config.storage.executables_dir = dir.path().join("executables");
            let state = AppState::new(config);
            state.paths().ensure_roots().await.unwrap();

            let store = SqliteStore::connect(SqliteConfig::from_url("sqlite::memory:").unwrap())
                .await
                .unwrap();
            state.install_store(Arc::new(store.clone())).await;
            let user = UserStore::insert_user(
                &store,
                NewUserEntity {
                    name: "alice".into(),
                    email: "alice@example.com".into(),
                    password_hash: "hash".into(),
                    ai_enabled: false,
                },
            )
            .await
            .unwrap();

            let created = create_game(
                &state,
                &Actor(user),
                GameUpload {
                    fields: GameFields {
                        title: Some("Stable Game".into()),
                        description: None,
                    },
                    archive: Some(zip_file(dir.path(), &[("index.html", "<html>v1</html>")])),
                    image: Some(UploadedFile {
                        file_name: Some("cover.png".into()),
                        content_type: Some("image/png".into()),
                        bytes: Bytes::from_static(b"png"),
                    }),
                },
            )
            .await
            .unwrap();
            let game = GameStore::find_game(&store, created.id)
                .await
                .unwrap()
                .unwrap();

            store
                .execute_raw(
                    "CREATE TRIGGER reject_archive_change BEFORE UPDATE OF archive_file ON games
                     BEGIN SELECT RAISE(ABORT, 'archive changes rejected'); END",
                )
                .await;

            let result = update_game(
                &state,
                game.clone(),
                GameUpload {
                    archive: Some(zip_file(
                        dir.path(),
                        &[("dist/index.html", "<html>v2</html>")],
                    )),
                    ..GameUpload::default()
                },
            )
            .await;
            assert!(result.is_err());

            let stored = GameStore::find_game(&store, game.id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(stored.archive_file, game.archive_file);
            assert_eq!(stored.playable_path, Some(format!("{}/", game.id)));

            let paths = state.paths();
            let live = paths.executables_path(game.id);
            assert!(live.join("index.html").is_file());
            assert!(!live.join("dist").exists());
            assert_eq!(count(paths.executables_root()), 1);
            assert_eq!(count(paths.uploads_root()), 2);
        }
    }

    fn file(name: Option<&str>, mime: Option<&str>) -> UploadedFile {
        UploadedFile {
            file_name: name.map(str::to_owned),
            content_type: mime.map(str::to_owned),
            bytes: Bytes::from_static(b"data"),
        }
    }

    #[test]
    fn archives_are_accepted_by_extension_or_mime() {
        assert!(check_archive(&file(Some("game.ZIP"), None)).is_ok());
        assert!(check_archive(&file(Some("blob"), Some("application/zip"))).is_ok());
        assert!(check_archive(&file(Some("game.rar"), Some("application/octet-stream"))).is_err());
    }

    #[test]
    fn images_are_accepted_by_extension_or_mime() {
        assert!(check_image(&file(Some("cover.webp"), None)).is_ok());
        assert!(check_image(&file(None, Some("image/png"))).is_ok());
        assert!(check_image(&file(Some("cover.svg"), Some("text/xml"))).is_err());
    }

    #[test]
    fn previous_directory_comes_from_the_playable_path() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StoragePaths::new(&crate::config::StorageConfig {
            uploads_dir: dir.path().join("uploads"),
            executables_dir: dir.path().join("executables"),
            ..Default::default()
        });
        let mut game = GameEntity {
            id: 4,
            title: "Game".into(),
            description: None,
            user_id: Some(1),
            archive_file: "a.zip".into(),
            image_file: "a.png".into(),
            playable_path: Some("4/sub/".into()),
            avg_quality: 0.0,
            avg_difficulty: 0.0,
            created_at: std::time::SystemTime::now(),
            updated_at: std::time::SystemTime::now(),
        };
        assert_eq!(previous_extraction_dir(&paths, &game), None);

        game.playable_path = Some("legacy/".into());
        assert_eq!(
            previous_extraction_dir(&paths, &game),
            Some(dir.path().join("executables").join("legacy"))
        );
    }
}
