//! Best-effort reactions to outlier ratings and game recommendations backed by an external text
//! generator.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    config::AiConfig,
    dao::models::{CommentEntity, GameEntity},
    dto::{ai::RecommendationsResponse, game::GameResponse},
    error::ServiceError,
    services::{auth_service::Actor, rating::RatingAverages, user_service},
    state::SharedState,
};

/// Quality score from which a rating counts as a positive signal for recommendations.
pub const POSITIVE_QUALITY: i64 = 4;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI features are disabled")]
    Disabled,
    #[error("request to the text generator failed")]
    Request(#[source] reqwest::Error),
    #[error("text generator answered with status {status}")]
    Status { status: u16, body: String },
    #[error("unexpected text generator response: {0}")]
    UpstreamFormat(String),
}

/// Anything able to turn a prompt into text.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: String) -> BoxFuture<'static, Result<String, AiError>>;
}

/// Client of the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &AiConfig, api_key: String) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(AiError::Request)?;
        Ok(Self {
            http,
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    async fn call(&self, prompt: String) -> Result<String, AiError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        };

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(AiError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GenerateResponse = response.json().await.map_err(AiError::Request)?;
        let candidate = payload
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AiError::UpstreamFormat("no candidates".into()))?;
        if candidate.finish_reason.as_deref() == Some("MAX_TOKENS") {
            warn!("text generator response truncated at the token limit");
        }
        candidate
            .content
            .and_then(|content| content.parts.into_iter().next())
            .map(|part| part.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| AiError::UpstreamFormat("candidate without text".into()))
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, prompt: String) -> BoxFuture<'static, Result<String, AiError>> {
        let client = self.clone();
        Box::pin(async move { client.call(prompt).await })
    }
}

/// Entry point of every AI feature. Disabled when no generator is configured.
#[derive(Clone)]
pub struct AiService {
    generator: Option<Arc<dyn TextGenerator>>,
    config: AiConfig,
}

impl AiService {
    /// Build the Gemini-backed service when an API key is configured.
    pub fn from_config(config: AiConfig) -> Self {
        let generator = config.api_key.clone().and_then(|key| {
            match GeminiClient::new(&config, key) {
                Ok(client) => Some(Arc::new(client) as Arc<dyn TextGenerator>),
                Err(err) => {
                    warn!(error = %err, "failed to build AI client; AI features disabled");
                    None
                }
            }
        });
        Self { generator, config }
    }

    pub fn with_generator(config: AiConfig, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator: Some(generator),
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.generator.is_some()
    }

    /// True when a rating is far enough from the game averages to deserve a reaction.
    pub fn should_react(
        &self,
        comment: &CommentEntity,
        averages: RatingAverages,
        comment_count: usize,
    ) -> bool {
        if comment_count < self.config.min_comments {
            return false;
        }
        let quality_gap = (comment.quality as f64 - averages.quality).abs();
        let difficulty_gap = (comment.difficulty as f64 - averages.difficulty).abs();
        quality_gap > self.config.rating_threshold || difficulty_gap > self.config.rating_threshold
    }

    /// Short reply to a rating that stands out. Failures are logged and swallowed.
    pub async fn maybe_react(
        &self,
        comment: &CommentEntity,
        averages: RatingAverages,
        comment_count: usize,
        game_title: &str,
    ) -> Option<String> {
        let generator = self.generator.as_ref()?;
        if !self.should_react(comment, averages, comment_count) {
            return None;
        }

        let prompt = reaction_prompt(comment, averages, game_title);
        match generator.generate(prompt).await {
            Ok(text) => {
                debug!(comment_id = comment.id, "AI reaction generated");
                Some(text.trim().to_owned())
            }
            Err(err) => {
                warn!(comment_id = comment.id, error = %err, "AI reaction failed");
                None
            }
        }
    }

    /// Ask the generator to pick games among `candidates` given the games the user liked.
    /// Only ids present in `candidates` are returned, in the generator's order.
    pub async fn pick_games(
        &self,
        liked: &[(GameEntity, i64, i64)],
        candidates: &[GameEntity],
    ) -> Result<Vec<i64>, AiError> {
        let generator = self.generator.as_ref().ok_or(AiError::Disabled)?;
        let text = generator
            .generate(recommendation_prompt(liked, candidates))
            .await?;
        let allowed: HashSet<i64> = candidates.iter().map(|game| game.id).collect();

        let mut seen = HashSet::new();
        Ok(parse_game_ids(&text)?
            .into_iter()
            .filter(|id| allowed.contains(id) && seen.insert(*id))
            .collect())
    }
}

/// Parse a JSON array of integers, tolerating surrounding prose and markdown code fences.
pub fn parse_game_ids(text: &str) -> Result<Vec<i64>, AiError> {
    let start = text.find('[');
    let end = text.rfind(']');
    let (Some(start), Some(end)) = (start, end) else {
        return Err(AiError::UpstreamFormat(format!(
            "expected a JSON array of ids, got `{}`",
            text.trim()
        )));
    };
    if end < start {
        return Err(AiError::UpstreamFormat("unbalanced brackets".into()));
    }

    serde_json::from_str::<Vec<i64>>(&text[start..=end])
        .map_err(|err| AiError::UpstreamFormat(format!("invalid id list: {err}")))
}

fn reaction_prompt(comment: &CommentEntity, averages: RatingAverages, game_title: &str) -> String {
    format!(
        "You are a friendly assistant on an indie game sharing platform.\n\n\
         A player just reviewed the game \"{game_title}\":\n\
         - Their quality rating: {quality}/5 (average {avg_quality:.2}/5)\n\
         - Their difficulty rating: {difficulty}/5 (average {avg_difficulty:.2}/5)\n\
         - Review: \"{body}\"\n\n\
         Quality gap: {quality_gap:.2} points. Difficulty gap: {difficulty_gap:.2} points.\n\n\
         Write a SHORT reply (two lines at most) acknowledging their distinct perspective. \
         Be friendly and avoid repetition. No emojis, no markdown, plain text only.",
        quality = comment.quality,
        avg_quality = averages.quality,
        difficulty = comment.difficulty,
        avg_difficulty = averages.difficulty,
        body = comment.body,
        quality_gap = (comment.quality as f64 - averages.quality).abs(),
        difficulty_gap = (comment.difficulty as f64 - averages.difficulty).abs(),
    )
}

fn recommendation_prompt(liked: &[(GameEntity, i64, i64)], candidates: &[GameEntity]) -> String {
    let liked = liked
        .iter()
        .map(|(game, quality, difficulty)| {
            format!(
                "- {} (quality {quality}/5, difficulty {difficulty}/5, description: {})",
                game.title,
                game.description.as_deref().unwrap_or("none")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let available = candidates
        .iter()
        .map(|game| {
            format!(
                "- ID:{} | {} | {}",
                game.id,
                game.title,
                game.description.as_deref().unwrap_or("no description")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a recommendation system for indie games.\n\n\
         GAMES THE USER PLAYED AND RATED POSITIVELY (quality >= {POSITIVE_QUALITY}):\n{liked}\n\n\
         GAMES AVAILABLE ON THE PLATFORM:\n{available}\n\n\
         Based on the user's taste, recommend 3 to 5 games from the available list. \
         Answer ONLY with a JSON array of game IDs, for example: [1, 5, 8]. No explanations."
    )
}

/// Recommend games the actor has neither rated nor played.
pub async fn recommend(
    state: &SharedState,
    actor: &Actor,
) -> Result<RecommendationsResponse, ServiceError> {
    if !actor.0.ai_enabled {
        return Err(ServiceError::Forbidden(
            "AI recommendations are disabled in your profile".into(),
        ));
    }
    let ai = state.ai();
    if !ai.is_enabled() {
        return Ok(RecommendationsResponse::empty(
            "AI recommendations are not configured on this server",
        ));
    }

    let store = state.require_store().await?;
    let comments = store.list_comments_by_user(actor.id()).await?;
    let positives: Vec<&CommentEntity> = comments
        .iter()
        .filter(|comment| comment.quality >= POSITIVE_QUALITY)
        .collect();
    if positives.is_empty() {
        return Ok(RecommendationsResponse::empty(
            "you do not have enough positive ratings for recommendations yet",
        ));
    }

    let mut played: HashSet<i64> = comments.iter().map(|comment| comment.game_id).collect();
    played.extend(
        store
            .list_stats_by_user(actor.id())
            .await?
            .into_iter()
            .map(|stats| stats.game_id),
    );

    let candidates: Vec<GameEntity> = store
        .list_games()
        .await?
        .into_iter()
        .filter(|game| !played.contains(&game.id))
        .collect();
    if candidates.is_empty() {
        return Ok(RecommendationsResponse::empty(
            "you have already played every available game",
        ));
    }

    let mut liked = Vec::with_capacity(positives.len());
    for comment in positives {
        if let Some(game) = store.find_game(comment.game_id).await? {
            liked.push((game, comment.quality, comment.difficulty));
        }
    }

    let ids = match ai.pick_games(&liked, &candidates).await {
        Ok(ids) => ids,
        Err(err @ AiError::UpstreamFormat(_)) => {
            warn!(user_id = actor.id(), error = %err, "unusable recommendation response");
            return Ok(RecommendationsResponse::empty(
                "the recommendation service returned an unexpected answer",
            ));
        }
        Err(err) => {
            warn!(user_id = actor.id(), error = %err, "recommendation request failed");
            return Ok(RecommendationsResponse::empty(
                "recommendations are temporarily unavailable",
            ));
        }
    };

    let mut by_id: HashMap<i64, GameEntity> =
        candidates.into_iter().map(|game| (game.id, game)).collect();
    let picked: Vec<GameEntity> = ids.iter().filter_map(|id| by_id.remove(id)).collect();
    let author_ids: Vec<i64> = picked.iter().filter_map(|game| game.user_id).collect();
    let names = user_service::author_names(state, &author_ids).await?;

    info!(user_id = actor.id(), count = picked.len(), "recommendations generated");
    let recommendations = picked
        .into_iter()
        .map(|game| {
            let author = game.user_id.and_then(|id| names.get(&id).cloned());
            GameResponse::new(game, author, state.paths())
        })
        .collect();
    Ok(RecommendationsResponse {
        recommendations,
        message: None,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        sync::Mutex,
        time::{Duration, SystemTime},
    };

    use super::*;

    /// Generator replaying a canned answer and recording prompts.
    pub(crate) struct StubGenerator {
        pub answer: Result<String, String>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl StubGenerator {
        pub(crate) fn answering(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(answer.to_owned()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn failing() -> Arc<Self> {
            Arc::new(Self {
                answer: Err("upstream down".to_owned()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    impl TextGenerator for StubGenerator {
        fn generate(&self, prompt: String) -> BoxFuture<'static, Result<String, AiError>> {
            self.prompts.lock().unwrap().push(prompt);
            let answer = self.answer.clone().map_err(|message| AiError::Status {
                status: 503,
                body: message,
            });
            Box::pin(async move { answer })
        }
    }

    fn config() -> AiConfig {
        AiConfig {
            api_key: Some("key".into()),
            timeout: Duration::from_secs(1),
            ..AiConfig::default()
        }
    }

    fn comment(quality: i64, difficulty: i64) -> CommentEntity {
        CommentEntity {
            id: 9,
            user_id: Some(1),
            game_id: 1,
            quality,
            difficulty,
            body: "hard but fun".into(),
            script: None,
            play_time_hours: 1.0,
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
        }
    }

    fn game(id: i64, title: &str) -> GameEntity {
        GameEntity {
            id,
            title: title.into(),
            description: None,
            user_id: Some(1),
            archive_file: "a.zip".into(),
            image_file: "a.png".into(),
            playable_path: Some(format!("{id}/")),
            avg_quality: 0.0,
            avg_difficulty: 0.0,
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
        }
    }

    #[test]
    fn parses_plain_and_fenced_id_lists() {
        assert_eq!(parse_game_ids("[1, 5, 8]").unwrap(), vec![1, 5, 8]);
        assert_eq!(parse_game_ids("```json\n[3,4]\n```").unwrap(), vec![3, 4]);
        assert_eq!(parse_game_ids("Sure! [7]").unwrap(), vec![7]);
    }

    #[test]
    fn malformed_id_lists_are_upstream_format_errors() {
        assert!(matches!(
            parse_game_ids("I recommend Space Blaster"),
            Err(AiError::UpstreamFormat(_))
        ));
        assert!(matches!(
            parse_game_ids("[\"one\", \"two\"]"),
            Err(AiError::UpstreamFormat(_))
        ));
        assert!(matches!(parse_game_ids("] ["), Err(AiError::UpstreamFormat(_))));
    }

    #[test]
    fn reactions_need_a_gap_above_the_threshold() {
        let service = AiService::with_generator(config(), StubGenerator::answering("hi"));
        let averages = RatingAverages {
            quality: 3.0,
            difficulty: 3.0,
        };

        assert!(service.should_react(&comment(5, 3), averages, 1));
        assert!(service.should_react(&comment(3, 1), averages, 2));
        assert!(!service.should_react(&comment(3, 3), averages, 3));

        let at_threshold = RatingAverages {
            quality: 4.5,
            difficulty: 3.0,
        };
        assert!(!service.should_react(&comment(5, 3), at_threshold, 2));
    }

    #[test]
    fn min_comments_holds_reactions_back_when_configured() {
        let service = AiService::with_generator(
            AiConfig {
                min_comments: 3,
                ..config()
            },
            StubGenerator::answering("hi"),
        );
        let averages = RatingAverages {
            quality: 3.0,
            difficulty: 3.0,
        };

        assert!(!service.should_react(&comment(5, 3), averages, 2));
        assert!(service.should_react(&comment(5, 3), averages, 3));
    }

    #[tokio::test]
    async fn reaction_failures_are_swallowed() {
        let averages = RatingAverages {
            quality: 2.0,
            difficulty: 2.0,
        };

        let ok = AiService::with_generator(config(), StubGenerator::answering(" Bold take! "));
        assert_eq!(
            ok.maybe_react(&comment(5, 5), averages, 4, "Space Blaster")
                .await
                .as_deref(),
            Some("Bold take!")
        );

        let failing = AiService::with_generator(config(), StubGenerator::failing());
        assert!(
            failing
                .maybe_react(&comment(5, 5), averages, 4, "Space Blaster")
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn disabled_service_never_reacts() {
        let service = AiService::from_config(AiConfig::default());
        assert!(!service.is_enabled());
        let averages = RatingAverages {
            quality: 1.0,
            difficulty: 1.0,
        };
        assert!(
            service
                .maybe_react(&comment(5, 5), averages, 10, "x")
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn picked_ids_are_limited_to_candidates() {
        let stub = StubGenerator::answering("[2, 99, 3, 2]");
        let service = AiService::with_generator(config(), stub.clone());

        let liked = vec![(game(1, "Liked"), 5, 2)];
        let candidates = vec![game(2, "Two"), game(3, "Three")];
        let ids = service.pick_games(&liked, &candidates).await.unwrap();

        assert_eq!(ids, vec![2, 3]);
        let prompts = stub.prompts.lock().unwrap();
        assert!(prompts[0].contains("ID:2 | Two"));
        assert!(prompts[0].contains("- Liked (quality 5/5"));
    }
}
