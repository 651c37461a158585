use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod ai;
pub mod auth;
pub mod comment;
pub mod game;
pub mod health;
pub mod stats;
pub mod user;
pub mod validation;

/// Placeholder rendered in place of the author of orphaned content.
pub const UNKNOWN_AUTHOR: &str = "unknown author";

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
