//! Notification feed pipeline
//!
//! Raw backend records flow through the pipeline in a fixed order:
//! normalize (heterogeneous records -> uniform items) -> dedupe/filter
//! (first-seen-wins on `(kind, id)`, tiered validity) -> sort/group
//! (newest first, calendar-day buckets).
//!
//! Every stage is a pure function of its inputs plus an injected `now`, so
//! the whole pipeline is deterministic and testable at a fixed instant.
//! Items are derived values: reconstructed on every fetch cycle, never
//! persisted.

pub mod filter;
pub mod group;
pub mod normalize;

use campus_common::events::{ItemKey, ItemKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Viewer role, determining which backend sources are fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Instructor,
    Student,
    Admin,
    Commandant,
    Superadmin,
}

impl Role {
    /// Parse a backend role name; unknown names behave like Admin
    /// (no notification sources).
    pub fn from_name(name: &str) -> Role {
        match name.to_ascii_lowercase().as_str() {
            "instructor" | "teacher" => Role::Instructor,
            "student" => Role::Student,
            "commandant" => Role::Commandant,
            "superadmin" => Role::Superadmin,
            _ => Role::Admin,
        }
    }
}

/// The user this service instance aggregates notifications for
#[derive(Debug, Clone, Copy)]
pub struct Viewer {
    /// Backend user id, used for self-authored exclusion
    pub id: Option<i64>,
    pub role: Role,
}

/// Backend persistence state of a read transition.
///
/// The local `read` flag on an item is optimistic and monotonic; this state
/// tracks whether the backend has been told yet. `Failed` items stay in the
/// retry queue and are re-attempted on the next poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Never marked read
    Unsynced,
    /// Marked read locally, backend call not yet completed
    Pending,
    /// Backend acknowledged (or the item has no backend read endpoint)
    Confirmed,
    /// Backend call failed; queued for background retry
    Failed,
}

/// Expiry semantics of a notice.
///
/// An expiry field that is present but not parseable still means "this
/// notice was given a lifetime"; without the deadline value the notice is
/// treated as not-yet-expired rather than demoted to the stale window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expiry {
    /// No expiry field on the record
    None,
    /// Parsed expiry deadline
    At(DateTime<Utc>),
    /// Expiry present but unparseable; valid indefinitely
    Indefinite,
}

/// Uniform feed item derived from a raw backend record
#[derive(Debug, Clone, Serialize)]
pub struct NotificationItem {
    pub key: ItemKey,
    pub title: String,
    /// Parsed item date; `None` survives the filter only for exams and
    /// expiry-bearing notices
    pub date: Option<DateTime<Utc>>,
    pub subject: Option<String>,
    pub class_name: Option<String>,
    /// Class scope, when present: routes read-marking to the class-notice
    /// endpoint instead of the general one
    pub class_id: Option<i64>,
    /// Coerced creator id (used for self-authored exclusion)
    pub created_by: Option<i64>,
    pub expiry: Expiry,
    pub body: Option<String>,
    pub read: bool,
    pub sync: SyncState,
}

impl NotificationItem {
    pub fn kind(&self) -> ItemKind {
        self.key.kind
    }

    /// Whether a backend read-marking endpoint exists for this item.
    /// Only notices have one; exams and results are read locally only.
    pub fn has_read_endpoint(&self) -> bool {
        self.key.kind == ItemKind::Notice
    }
}
