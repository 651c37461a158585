//! Derived rating averages of a game.

use tracing::debug;

use crate::{dao::models::CommentEntity, dao::store::Store, error::ServiceError};

/// Arithmetic means of the quality and difficulty scores of a game.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatingAverages {
    pub quality: f64,
    pub difficulty: f64,
}

/// Mean of each axis over `comments`; both are `0` without comments.
pub fn average_ratings(comments: &[CommentEntity]) -> RatingAverages {
    if comments.is_empty() {
        return RatingAverages::default();
    }

    let count = comments.len() as f64;
    let (quality, difficulty) = comments.iter().fold((0.0, 0.0), |(q, d), comment| {
        (q + comment.quality as f64, d + comment.difficulty as f64)
    });

    RatingAverages {
        quality: quality / count,
        difficulty: difficulty / count,
    }
}

/// Reload the comments of a game and store fresh averages. Returns the new averages together
/// with the number of comments they were computed from.
pub async fn recompute(
    store: &dyn Store,
    game_id: i64,
) -> Result<(RatingAverages, usize), ServiceError> {
    let comments = store.list_comments_by_game(game_id).await?;
    let averages = average_ratings(&comments);
    store
        .update_game_ratings(game_id, averages.quality, averages.difficulty)
        .await?;
    debug!(
        game_id,
        comments = comments.len(),
        avg_quality = averages.quality,
        avg_difficulty = averages.difficulty,
        "game ratings recomputed"
    );
    Ok((averages, comments.len()))
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn comment(quality: i64, difficulty: i64) -> CommentEntity {
        CommentEntity {
            id: 1,
            user_id: Some(1),
            game_id: 1,
            quality,
            difficulty,
            body: "ok".into(),
            script: None,
            play_time_hours: 0.0,
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
        }
    }

    #[test]
    fn no_comments_average_to_zero() {
        assert_eq!(average_ratings(&[]), RatingAverages::default());
    }

    #[test]
    fn averages_are_arithmetic_means() {
        let averages = average_ratings(&[comment(5, 3), comment(4, 2)]);
        assert_eq!(averages.quality, 4.5);
        assert_eq!(averages.difficulty, 2.5);

        let averages = average_ratings(&[comment(5, 4), comment(3, 2)]);
        assert_eq!(
            averages,
            RatingAverages {
                quality: 4.0,
                difficulty: 3.0
            }
        );
    }
}
