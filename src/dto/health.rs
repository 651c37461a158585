use serde::Serialize;
use utoipa::ToSchema;

/// Payload of the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" or "degraded".
    pub status: &'static str,
    /// Whether storage-backed routes currently answer 503.
    pub degraded: bool,
}

impl HealthResponse {
    pub fn from_degraded(degraded: bool) -> Self {
        Self {
            status: if degraded { "degraded" } else { "ok" },
            degraded,
        }
    }
}
