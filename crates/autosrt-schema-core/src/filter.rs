//! Soft-delete filters and partial filter evaluation.
//!
//! Documents are soft-deleted by setting `deleted_at`. Unique indexes carry a
//! partial filter so that deleted documents drop out of the constraint.

use std::fmt;
use std::str::FromStr;

use bson::{doc, Bson, Document};
use serde::{Deserialize, Serialize};

/// Field that marks a document as soft-deleted.
pub const DELETED_AT: &str = "deleted_at";

/// Predicate that selects active (not soft-deleted) documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoftDeleteFilter {
    /// `{ deleted_at: null }`: the field is missing or explicitly null.
    #[default]
    Null,
    /// `{ deleted_at: { $exists: false } }`: the field is missing.
    Absent,
}

impl SoftDeleteFilter {
    /// The field the filter inspects.
    #[must_use]
    pub const fn field(self) -> &'static str {
        DELETED_AT
    }

    /// Render the filter as a partial filter expression.
    #[must_use]
    pub fn to_document(self) -> Document {
        match self {
            Self::Null => doc! { DELETED_AT: Bson::Null },
            Self::Absent => doc! { DELETED_AT: { "$exists": false } },
        }
    }

    /// Whether `document` counts as active under this filter.
    #[must_use]
    pub fn is_active(self, document: &Document) -> bool {
        matches!(
            (self, document.get(DELETED_AT)),
            (_, None) | (Self::Null, Some(Bson::Null))
        )
    }
}

impl fmt::Display for SoftDeleteFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Absent => f.write_str("absent"),
        }
    }
}

/// Error returned when a soft-delete filter name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown soft-delete filter {0:?} (expected \"null\" or \"absent\")")]
pub struct UnknownFilter(pub String);

impl FromStr for SoftDeleteFilter {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "null" => Ok(Self::Null),
            "absent" | "exists-false" | "exists_false" => Ok(Self::Absent),
            other => Err(UnknownFilter(other.to_string())),
        }
    }
}

/// Look up a field by dotted path, descending into embedded documents.
///
/// `"profile.email"` resolves `{ profile: { email: .. } }`. A path that runs
/// into a non-document value (including an array) resolves to nothing.
#[must_use]
pub fn get_path<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut value = document.get(segments.next()?)?;
    for segment in segments {
        match value {
            Bson::Document(inner) => value = inner.get(segment)?,
            _ => return None,
        }
    }
    Some(value)
}

/// Evaluate a partial filter expression against a document.
///
/// Supports the subset used for partial indexes here: equality on a
/// (possibly dotted) field, where `null` also matches a missing field, plus
/// `$eq` and `$exists`. Any other operator does not match.
#[must_use]
pub fn matches_filter(filter: &Document, document: &Document) -> bool {
    filter
        .iter()
        .all(|(field, condition)| matches_condition(get_path(document, field), condition))
}

fn matches_condition(value: Option<&Bson>, condition: &Bson) -> bool {
    match condition {
        Bson::Document(ops) if ops.keys().any(|k| k.starts_with('$')) => {
            ops.iter().all(|(op, operand)| match op.as_str() {
                "$exists" => operand_truthy(operand) == value.is_some(),
                "$eq" => matches_equality(value, operand),
                _ => false,
            })
        }
        other => matches_equality(value, other),
    }
}

fn matches_equality(value: Option<&Bson>, expected: &Bson) -> bool {
    match (value, expected) {
        (None | Some(Bson::Null), Bson::Null) => true,
        (Some(actual), expected) => actual == expected,
        (None, _) => false,
    }
}

fn operand_truthy(operand: &Bson) -> bool {
    match operand {
        Bson::Boolean(b) => *b,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => n.abs() > 0.0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}
