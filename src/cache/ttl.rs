//! Type-specific retention windows.

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::CacheConfig;
use crate::model::ObjectKind;

/// How long each kind of object stays servable from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub search: TimeDelta,
    pub creator: TimeDelta,
    /// Albums and streams
    pub media: TimeDelta,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            search: TimeDelta::hours(2),
            creator: TimeDelta::hours(12),
            media: TimeDelta::days(30),
        }
    }
}

fn from_secs(secs: i64) -> TimeDelta {
    TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::MAX)
}

impl TtlPolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            search: from_secs(config.search_ttl_secs),
            creator: from_secs(config.creator_ttl_secs),
            media: from_secs(config.media_ttl_secs),
        }
    }

    /// Retention for a kind; error objects are never retained.
    pub fn ttl_for(&self, kind: ObjectKind) -> Option<TimeDelta> {
        match kind {
            ObjectKind::Search => Some(self.search),
            ObjectKind::Creator => Some(self.creator),
            ObjectKind::Album | ObjectKind::Stream => Some(self.media),
            ObjectKind::Error => None,
        }
    }

    /// Expiry for an object of `kind` written at `now`.
    pub fn expiry_for(&self, kind: ObjectKind, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let ttl = self.ttl_for(kind)?;
        Some(now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }
}
