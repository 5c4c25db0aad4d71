//! Record normalization
//!
//! Maps heterogeneous backend records (notices, exams, results) into the
//! uniform `NotificationItem` shape using a fixed field-priority list per
//! kind. Normalization is deterministic and total: every record either
//! yields an item or is explicitly dropped, it never errors.

use super::{Expiry, NotificationItem, SyncState, Viewer};
use campus_common::events::{ItemKey, ItemKind};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Raw notice record (general, urgent, active, or class feed)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNotice {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub class_id: Option<Value>,
    #[serde(default)]
    pub created_by: Option<Value>,
}

/// Raw exam or exam-schedule record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExam {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub exam_date: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Raw exam result record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawResult {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
}

/// Coerce a JSON id value (number or numeric string) to i64.
///
/// The backend serializes ids inconsistently across endpoints; coercing both
/// sides to i64 before comparison avoids numeric/string mismatches.
pub fn coerce_id(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Lenient date parsing over the formats the backend actually emits:
/// RFC 3339, naive datetime (with or without 'T'), and bare date.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// First parseable date from an ordered field-priority list
fn first_date(candidates: &[&Option<String>]) -> Option<DateTime<Utc>> {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .find_map(parse_date)
}

/// Expiry semantics from the raw expiry field: absent (or blank) means no
/// expiry, parseable means a deadline, anything else means "has a lifetime
/// but no usable deadline" and stays valid indefinitely.
fn parse_expiry(raw: Option<&str>) -> Expiry {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Expiry::None,
        Some(s) => match parse_date(s) {
            Some(deadline) => Expiry::At(deadline),
            None => Expiry::Indefinite,
        },
    }
}

fn first_text(candidates: &[&Option<String>], fallback: &str) -> String {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

/// Normalize a notice record.
///
/// Returns `None` (drop) when the record has no coercible id, or when it was
/// authored by the viewer: instructors do not see their own notices in their
/// own feed.
pub fn normalize_notice(raw: &RawNotice, viewer: &Viewer) -> Option<NotificationItem> {
    let id = coerce_id(raw.id.as_ref())?;

    let creator = coerce_id(raw.created_by.as_ref());
    if let (Some(creator), Some(viewer_id)) = (creator, viewer.id) {
        if creator == viewer_id {
            return None;
        }
    }

    Some(NotificationItem {
        key: ItemKey::new(ItemKind::Notice, id),
        title: first_text(&[&raw.title, &raw.message, &raw.body], "Notice"),
        date: first_date(&[&raw.expiry_date, &raw.start_date, &raw.created_at, &raw.created]),
        subject: None,
        class_name: raw.class_name.clone(),
        class_id: coerce_id(raw.class_id.as_ref()),
        created_by: creator,
        expiry: parse_expiry(raw.expiry_date.as_deref()),
        body: raw.body.clone().or_else(|| raw.message.clone()),
        read: false,
        sync: SyncState::Unsynced,
    })
}

/// Normalize an exam or exam-schedule record.
pub fn normalize_exam(raw: &RawExam) -> Option<NotificationItem> {
    let id = coerce_id(raw.id.as_ref())?;

    Some(NotificationItem {
        key: ItemKey::new(ItemKind::Exam, id),
        title: first_text(&[&raw.title, &raw.name], "Exam"),
        date: first_date(&[&raw.exam_date, &raw.date, &raw.start_date, &raw.created_at]),
        subject: raw.subject.clone(),
        class_name: raw.class_name.clone(),
        class_id: None,
        created_by: None,
        expiry: Expiry::None,
        body: None,
        read: false,
        sync: SyncState::Unsynced,
    })
}

/// Normalize an exam result record.
pub fn normalize_result(raw: &RawResult) -> Option<NotificationItem> {
    let id = coerce_id(raw.id.as_ref())?;

    Some(NotificationItem {
        key: ItemKey::new(ItemKind::Result, id),
        title: first_text(&[&raw.title], "Result"),
        date: first_date(&[&raw.created_at, &raw.created]),
        subject: raw.subject.clone(),
        class_name: raw.class_name.clone(),
        class_id: None,
        created_by: None,
        expiry: Expiry::None,
        body: None,
        read: false,
        sync: SyncState::Unsynced,
    })
}
