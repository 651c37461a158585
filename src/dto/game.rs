//! Game payloads, including the multipart upload form.

use axum::extract::Multipart;
use bytes::Bytes;
use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::GameEntity,
    dto::{UNKNOWN_AUTHOR, format_system_time},
    error::AppError,
    services::storage_paths::StoragePaths,
};

/// Game as exposed by the API, with resolved author and public URLs.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// `None` once the author deleted their account.
    pub user_id: Option<i64>,
    pub author_name: String,
    pub image_url: String,
    pub archive_url: String,
    pub playable_path: Option<String>,
    /// URL to embed in an iframe; absent until extraction succeeded.
    pub playable_url: Option<String>,
    pub avg_quality: f64,
    pub avg_difficulty: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl GameResponse {
    pub fn new(game: GameEntity, author_name: Option<String>, paths: &StoragePaths) -> Self {
        Self {
            id: game.id,
            image_url: paths.upload_url(&game.image_file),
            archive_url: paths.upload_url(&game.archive_file),
            playable_url: game
                .playable_path
                .as_deref()
                .map(|path| paths.playable_url(path)),
            title: game.title,
            description: game.description,
            user_id: game.user_id,
            author_name: author_name.unwrap_or_else(|| UNKNOWN_AUTHOR.to_owned()),
            playable_path: game.playable_path,
            avg_quality: game.avg_quality,
            avg_difficulty: game.avg_difficulty,
            created_at: format_system_time(game.created_at),
            updated_at: format_system_time(game.updated_at),
        }
    }
}

/// Multipart form accepted by game creation and update (documentation only).
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct GameUploadForm {
    /// 3 to 100 characters; required on creation.
    pub title: Option<String>,
    /// Up to 1000 characters.
    pub description: Option<String>,
    /// Zip package containing an `index.html`.
    #[schema(value_type = Option<String>, format = Binary)]
    pub archive: Option<Vec<u8>>,
    /// Cover image (png, jpg, jpeg, webp or gif).
    #[schema(value_type = Option<String>, format = Binary)]
    pub image: Option<Vec<u8>>,
}

/// File part received in a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Text fields of a game form, validated before any file is written.
#[derive(Debug, Default, Validate)]
pub struct GameFields {
    #[validate(length(min = 3, max = 100))]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

/// Parsed multipart game form.
#[derive(Debug, Default)]
pub struct GameUpload {
    pub fields: GameFields,
    pub archive: Option<UploadedFile>,
    pub image: Option<UploadedFile>,
}

impl GameUpload {
    /// Drain the multipart stream. Unknown parts are ignored; a repeated file part is rejected.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut upload = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            match name.as_str() {
                "title" => upload.fields.title = non_blank(field.text().await?),
                "description" => upload.fields.description = non_blank(field.text().await?),
                "archive" | "image" => {
                    let file_name = field.file_name().map(str::to_owned);
                    let content_type = field.content_type().map(str::to_owned);
                    let bytes = field.bytes().await?;
                    if bytes.is_empty() && file_name.as_deref().is_none_or(str::is_empty) {
                        continue;
                    }

                    let slot = if name == "archive" {
                        &mut upload.archive
                    } else {
                        &mut upload.image
                    };
                    if slot.is_some() {
                        return Err(AppError::BadRequest(format!(
                            "only one `{name}` file may be uploaded"
                        )));
                    }
                    *slot = Some(UploadedFile {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
                other => debug!(field = other, "ignoring unknown multipart field"),
            }
        }

        Ok(upload)
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
