//! Per-tenant level assignment
//!
//! Each tenant has a single current-state assignment record: its level, the
//! level it came from, and an optional scheduled fallback. There is no
//! history log, and there is no background scheduler; expiry is evaluated
//! lazily whenever the record is read.

use crate::catalog::LevelCatalog;
use crate::error::{LevelError, LevelResult};
use crate::slug;
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit reason attached to the update emitted by lazy expiry.
pub const REASON_TIME_ELAPSED: &str = "TIME_ELAPSED";

/// Audit reason attached to the update emitted by stale-reference repair.
pub const REASON_STALE_REFERENCE: &str = "STALE_REFERENCE";

fn default_slug() -> String {
    slug::UNASSIGNED.to_string()
}

/// Unix timestamp of the most recent midnight (UTC) before `now`.
///
/// Expiry works at day granularity: an assignment expires on the first read
/// in a day strictly later than its expiry date.
pub fn start_of_day(now: DateTime<Utc>) -> i64 {
    now.date_naive().and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// A tenant's current level assignment.
///
/// Stored per tenant under the `level_details` key. Every slug field may be
/// the synthetic `unassigned`. Partial stored records deserialize with
/// `unassigned` defaults, so reads of records written by older builds stay
/// well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelAssignment {
    /// Current level slug
    #[serde(default = "default_slug")]
    pub level: String,

    /// Level slug before the last transition
    #[serde(default = "default_slug")]
    pub previous_level: String,

    /// Level slug to fall back to when the assignment expires
    #[serde(default = "default_slug")]
    pub revert_level: String,

    /// Whether the assignment is scheduled to expire
    #[serde(default)]
    pub can_expire: bool,

    /// Expiry date as a unix timestamp; present iff `can_expire`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

impl Default for LevelAssignment {
    fn default() -> Self {
        Self {
            level: default_slug(),
            previous_level: default_slug(),
            revert_level: default_slug(),
            can_expire: false,
            expiry_date: None,
        }
    }
}

impl LevelAssignment {
    /// Whether the assignment should expire when read at `now`.
    ///
    /// True when expiry is scheduled, the current day (midnight UTC) is
    /// strictly past the expiry date, and reverting would actually change
    /// the level. Records missing an expiry date despite `can_expire` are
    /// treated as not expirable; the update path refuses to write them.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if !self.can_expire {
            return false;
        }
        let Some(expiry) = self.expiry_date else {
            return false;
        };
        if self.level == self.revert_level {
            return false;
        }
        start_of_day(now) > expiry
    }

    /// Apply the expiry transition in place.
    ///
    /// Moves the current level into `previous_level`, promotes the revert
    /// level, and clears the schedule.
    pub fn expire(&mut self) {
        self.previous_level = std::mem::replace(&mut self.level, self.revert_level.clone());
        self.can_expire = false;
        self.expiry_date = None;
    }
}

/// Requested change to a tenant's assignment.
///
/// Carries everything an admin update supplies; `previous_level` is never
/// part of a request; it is derived from the record being replaced.
///
/// # Examples
///
/// ```
/// use warden_levels::{AssignmentChange, LevelCatalog};
///
/// let catalog = LevelCatalog::defaults();
/// let change = AssignmentChange::new("premium")
///     .with_revert_level("basic")
///     .with_expiry(1_893_456_000);
/// assert!(change.validate(&catalog).is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentChange {
    /// New level slug
    pub level: String,

    /// Fallback slug on expiry
    #[serde(default = "default_slug")]
    pub revert_level: String,

    /// Whether the new assignment is scheduled to expire
    #[serde(default)]
    pub can_expire: bool,

    /// Expiry date as a unix timestamp; required iff `can_expire`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

impl AssignmentChange {
    /// Create a non-expiring change to the given level.
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            revert_level: default_slug(),
            can_expire: false,
            expiry_date: None,
        }
    }

    /// Set the fallback level on expiry.
    pub fn with_revert_level(mut self, revert_level: impl Into<String>) -> Self {
        self.revert_level = revert_level.into();
        self
    }

    /// Schedule expiry at the given unix timestamp.
    pub fn with_expiry(mut self, expiry_date: i64) -> Self {
        self.can_expire = true;
        self.expiry_date = Some(expiry_date);
        self
    }

    /// Validate the change against a catalog.
    ///
    /// Both slugs must be stored levels or the synthetic `unassigned`, and
    /// a scheduled expiry must carry a date.
    pub fn validate(&self, catalog: &LevelCatalog) -> LevelResult<()> {
        if !catalog.is_known(&self.level) {
            return Err(LevelError::UnknownLevel {
                slug: self.level.clone(),
            });
        }
        if !catalog.is_known(&self.revert_level) {
            return Err(LevelError::UnknownRevertLevel {
                slug: self.revert_level.clone(),
            });
        }
        if self.can_expire && self.expiry_date.is_none() {
            return Err(LevelError::MissingExpiryDate);
        }
        Ok(())
    }

    /// Produce the record that replaces `current`.
    ///
    /// `previous_level` becomes the level being replaced; the expiry date is
    /// dropped when the change is not expirable.
    pub fn apply_to(&self, current: &LevelAssignment) -> LevelAssignment {
        LevelAssignment {
            level: self.level.clone(),
            previous_level: current.level.clone(),
            revert_level: self.revert_level.clone(),
            can_expire: self.can_expire,
            expiry_date: if self.can_expire { self.expiry_date } else { None },
        }
    }
}
