//! Registration, login and bearer token handling.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tokio::task;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    config::AuthConfig,
    dao::models::{NewUserEntity, UserEntity},
    dto::auth::{AuthResponse, LoginRequest, RegisterRequest},
    error::ServiceError,
    state::SharedState,
};

const INVALID_CREDENTIALS: &str = "invalid email or password";

/// Authenticated user attached to a request by the bearer middleware.
#[derive(Debug, Clone)]
pub struct Actor(pub UserEntity);

impl Actor {
    pub fn id(&self) -> i64 {
        self.0.id
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: u64,
    exp: u64,
}

/// HS256 signing material derived from the configured secret.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            ttl: config.token_ttl,
        }
    }

    /// Sign a token for `user_id` expiring after the configured TTL.
    pub fn issue(&self, user_id: i64) -> Result<String, ServiceError> {
        let now = unix_now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + self.ttl.as_secs(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| ServiceError::Internal(format!("failed to sign token: {err}")))
    }

    /// Check signature and expiry, returning the user id the token was issued for.
    pub fn verify(&self, token: &str) -> Result<i64, ServiceError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|err| ServiceError::Unauthenticated(format!("invalid token: {err}")))?;
        data.claims
            .sub
            .parse()
            .map_err(|_| ServiceError::Unauthenticated("invalid token subject".into()))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

/// Hash a password with Argon2id on the blocking pool.
pub async fn hash_password(password: String) -> Result<String, ServiceError> {
    task::spawn_blocking(move || {
        let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
            .map_err(|err| ServiceError::Internal(format!("failed to build salt: {err}")))?;
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| ServiceError::Internal(format!("failed to hash password: {err}")))
    })
    .await
    .map_err(|err| ServiceError::Internal(format!("hashing task failed: {err}")))?
}

/// Compare a password with a stored PHC string. Unparseable hashes never match.
pub async fn verify_password(password: String, hash: String) -> Result<bool, ServiceError> {
    task::spawn_blocking(move || {
        let Ok(parsed) = PasswordHash::new(&hash) else {
            warn!("stored password hash is not a valid PHC string");
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
    .await
    .map_err(|err| ServiceError::Internal(format!("verification task failed: {err}")))
}

pub async fn register(
    state: &SharedState,
    request: RegisterRequest,
) -> Result<AuthResponse, ServiceError> {
    request.validate()?;
    let store = state.require_store().await?;

    let user = store
        .insert_user(NewUserEntity {
            name: request.name.trim().to_owned(),
            email: request.email.trim().to_ascii_lowercase(),
            password_hash: hash_password(request.password).await?,
            ai_enabled: request.ai_enabled,
        })
        .await
        .map_err(|err| match ServiceError::from(err) {
            ServiceError::Conflict(_) => {
                ServiceError::Conflict("name or email already registered".into())
            }
            other => other,
        })?;

    info!(user_id = user.id, "user registered");
    let token = state.tokens().issue(user.id)?;
    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

pub async fn login(
    state: &SharedState,
    request: LoginRequest,
) -> Result<AuthResponse, ServiceError> {
    request.validate()?;
    let store = state.require_store().await?;

    let user = store
        .find_user_by_email(request.email.trim().to_ascii_lowercase())
        .await?
        .ok_or_else(|| ServiceError::Unauthenticated(INVALID_CREDENTIALS.into()))?;

    if !verify_password(request.password, user.password_hash.clone()).await? {
        return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.into()));
    }

    let token = state.tokens().issue(user.id)?;
    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

/// Resolve a bearer token into the user it was issued for.
pub async fn authenticate(state: &SharedState, token: &str) -> Result<Actor, ServiceError> {
    let user_id = state.tokens().verify(token)?;
    let store = state.require_store().await?;
    store
        .find_user(user_id)
        .await?
        .map(Actor)
        .ok_or_else(|| ServiceError::Unauthenticated("user no longer exists".into()))
}
