//! Shared API envelope and response-normalization types
//!
//! The backend's list endpoints return either a bare JSON array or a
//! `{count, results}` page envelope depending on whether pagination was
//! applied. `Listing<T>` accepts both shapes once, at the boundary, instead
//! of shape-sniffing at every call site.
//!
//! Backend payload keys arrive in mixed casing (camelCase from some
//! serializers, snake_case from others). `normalize_keys` rewrites keys to
//! snake_case before typed deserialization, excluding an allowlist of
//! technical fields (ids, codes, roles, flags) that must pass through
//! unaltered to preserve comparison correctness.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ========================================
// List envelope
// ========================================

/// Page envelope returned by paginated list endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Page<T> {
    pub count: usize,
    pub results: Vec<T>,
}

/// A list response in either of the backend's two shapes
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    /// `{count, results}` page envelope
    Paged(Page<T>),
    /// Bare JSON array
    Plain(Vec<T>),
}

impl<T> Listing<T> {
    /// Unify both response shapes into a plain vector
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Paged(page) => page.results,
            Listing::Plain(items) => items,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Listing::Paged(page) => page.results.len(),
            Listing::Plain(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ========================================
// Key normalization
// ========================================

/// Technical fields that bypass key normalization entirely.
///
/// These carry identifiers, codes, roles, and flags that downstream code
/// compares by value; rewriting them (or their nested content) risks
/// breaking equality checks against locally held values.
const PASSTHROUGH_KEYS: &[&str] = &[
    "id",
    "pk",
    "code",
    "role",
    "roles",
    "token",
    "access",
    "refresh",
    "is_active",
    "is_read",
    "read",
];

/// Recursively rewrite object keys from camelCase to snake_case.
///
/// Keys on the passthrough allowlist are kept verbatim and their values are
/// not descended into. Arrays are normalized element-wise. Non-container
/// values pass through unchanged.
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, val) in map {
                if PASSTHROUGH_KEYS.contains(&key.as_str()) {
                    out.insert(key, val);
                } else {
                    out.insert(snake_case(&key), normalize_keys(val));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

/// camelCase -> snake_case; keys already in snake_case are unchanged.
fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower = false;
        } else {
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
            out.push(ch);
        }
    }
    out
}

// ========================================
// Error payloads
// ========================================

/// Error body returned by the backend on 4xx responses
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiErrorBody {
    /// Machine-readable error identifier (optional)
    #[serde(default)]
    pub error: Option<String>,
    /// Human-readable message (optional)
    #[serde(default)]
    pub message: Option<String>,
    /// Per-field validation detail (optional)
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ApiErrorBody {
    /// User-facing message: known-safe backend detail for client errors,
    /// nothing else. Callers use this for 4xx only; 5xx responses get a
    /// generic message before ever reaching this type.
    pub fn sanitized_message(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| "Request failed".to_string())
    }
}
