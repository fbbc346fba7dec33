pub mod auth;
pub mod error;
pub mod middleware;
pub mod notes;
pub mod password;
pub mod policy;
pub mod routes;
pub mod token;

use chrono::{DateTime, Utc};
use tracing::warn;

/// Parse a stored RFC 3339 timestamp, tolerating corrupt rows rather than
/// failing the whole response.
pub(crate) fn parse_timestamp(value: &str, field: &str, record_id: &str) -> DateTime<Utc> {
    value.parse::<DateTime<Utc>>().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on record '{}': {}", field, value, record_id, e);
        DateTime::default()
    })
}
