//! Event source document model.
//!
//! Documents in the event source collection look like:
//!
//! ```text
//! { _id: ..., attributes: { "asoc-es-count": 5, "asoc-es-type": "syslog", ... } }
//! ```
//!
//! The attribute map is loosely typed. [`EventSourceDocument`] is a read-only view
//! that isolates the identifier and the attribute sub-document; field-level typing
//! is left to the caller.

use std::fmt;

use mongodb::bson::{Bson, Document};
use thiserror::Error;

/// Name of the sub-document holding the dynamic attributes.
pub const ATTRIBUTES_FIELD: &str = "attributes";

/// Name of the identifier field.
pub const ID_FIELD: &str = "_id";

/// Coarse kind of a stored value, used in decode errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Integer,
    Double,
    Boolean,
    Document,
    Array,
    Null,
    ObjectId,
    DateTime,
    Other,
}

impl ValueKind {
    /// Classify a BSON value.
    pub fn of(value: &Bson) -> Self {
        match value {
            Bson::String(_) => ValueKind::String,
            Bson::Int32(_) | Bson::Int64(_) => ValueKind::Integer,
            Bson::Double(_) => ValueKind::Double,
            Bson::Boolean(_) => ValueKind::Boolean,
            Bson::Document(_) => ValueKind::Document,
            Bson::Array(_) => ValueKind::Array,
            Bson::Null => ValueKind::Null,
            Bson::ObjectId(_) => ValueKind::ObjectId,
            Bson::DateTime(_) => ValueKind::DateTime,
            _ => ValueKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Double => "double",
            ValueKind::Boolean => "boolean",
            ValueKind::Document => "document",
            ValueKind::Array => "array",
            ValueKind::Null => "null",
            ValueKind::ObjectId => "objectId",
            ValueKind::DateTime => "date",
            ValueKind::Other => "other",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field of one document held a value of the wrong kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("document '{document}': field '{field}' expected {expected}, found {actual}")]
pub struct DecodeError {
    /// Identifier of the offending document.
    pub document: String,
    /// Name of the offending field.
    pub field: &'static str,
    /// Kind the schema requires.
    pub expected: ValueKind,
    /// Kind actually stored.
    pub actual: ValueKind,
}

/// Read-only view of one event source document.
#[derive(Debug, Clone, Copy)]
pub struct EventSourceDocument<'a> {
    id: &'a Bson,
    attributes: Option<&'a Document>,
}

impl<'a> EventSourceDocument<'a> {
    /// Split a raw document into identifier and attribute map.
    ///
    /// A missing or null `attributes` field is an empty map. Any other
    /// non-document value is rejected.
    pub fn from_raw(raw: &'a Document) -> Result<Self, DecodeError> {
        let id = raw.get(ID_FIELD).unwrap_or(&Bson::Null);

        let attributes = match raw.get(ATTRIBUTES_FIELD) {
            None | Some(Bson::Null) => None,
            Some(Bson::Document(attributes)) => Some(attributes),
            Some(other) => {
                return Err(DecodeError {
                    document: render_id(id),
                    field: ATTRIBUTES_FIELD,
                    expected: ValueKind::Document,
                    actual: ValueKind::of(other),
                });
            }
        };

        Ok(Self { id, attributes })
    }

    /// The document identifier as a label-friendly string.
    pub fn id(&self) -> String {
        render_id(self.id)
    }

    /// Look up an attribute, treating null as absent.
    pub fn attribute(&self, name: &str) -> Option<&'a Bson> {
        match self.attributes?.get(name)? {
            Bson::Null => None,
            value => Some(value),
        }
    }
}

/// Render an `_id` value: ObjectIds as hex, strings verbatim.
pub fn render_id(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        Bson::Null => String::new(),
        other => other.to_string(),
    }
}
