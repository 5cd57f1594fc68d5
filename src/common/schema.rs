use crate::common::key;

use serde::{Deserialize, Serialize};
use std::time;

/// Record shape with the primary key, version and lifecycle timestamps.
///
/// Embed it with `#[serde(flatten)]` in application records. Timestamps are epoch
/// seconds; `ExpireTime` is meant to be the table's TTL attribute.
///
/// ```rust
/// use dynamodb_service::common::schema::BaseSchema;
/// use std::time::Duration;
///
/// let mut schema = BaseSchema::new("Test#id1", "Test");
/// assert!(!schema.expired());
/// schema.set_ttl(Duration::from_secs(60));
/// assert!(schema.ttl().is_some());
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaseSchema {
    /// Partition key value.
    #[serde(rename = "PK")]
    pub partition_key: String,
    /// Sort key value.
    #[serde(rename = "SK")]
    pub sort_key: String,
    /// Application-defined version tag.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// Creation time, epoch seconds.
    #[serde(default)]
    pub create_time: i64,
    /// Last update time, epoch seconds.
    #[serde(default)]
    pub update_time: i64,
    /// Expiry time, epoch seconds; `None` never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_time: Option<i64>,
}

fn now() -> i64 {
    time::SystemTime::now()
        .duration_since(time::UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX)
        })
}

impl BaseSchema {
    /// A record for `partition_key`/`sort_key`, created and updated now.
    pub fn new(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        let now = now();
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
            create_time: now,
            update_time: now,
            ..Default::default()
        }
    }

    /// The primary key of this record.
    pub fn key(&self) -> key::PrimaryKey {
        key::PrimaryKey::new(self.partition_key.clone(), self.sort_key.clone())
    }

    /// Whether the expiry time has passed.
    pub fn expired(&self) -> bool {
        self.expire_time.is_some_and(|expire_time| expire_time <= now())
    }

    /// Time left before expiry; zero once expired, `None` without an expiry time.
    pub fn ttl(&self) -> Option<time::Duration> {
        self.expire_time.map(|expire_time| {
            let left = expire_time.saturating_sub(now()).max(0);
            time::Duration::from_secs(left.unsigned_abs())
        })
    }

    /// Expire `ttl` from now.
    pub fn set_ttl(&mut self, ttl: time::Duration) {
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        self.expire_time = Some(now().saturating_add(ttl));
    }

    /// Expire at `expire_time`, epoch seconds.
    pub fn expire_at(&mut self, expire_time: i64) {
        self.expire_time = Some(expire_time);
    }

    /// Stamp the update time with now.
    pub fn touch(&mut self) {
        self.update_time = now();
    }
}
