//! Projection of event source attribute maps onto a fixed record shape.
//!
//! Each recognised attribute is optional. Absent (or null) attributes decode to
//! the zero value of their field; unrecognised attributes are ignored. Only the
//! attributes in the caller's field set are read. A present attribute of the
//! wrong kind in that set rejects the whole document with a [`DecodeError`]
//! naming the field.

use esm_common::bson::{Bson, Document};
use esm_common::{DecodeError, EventSourceDocument, ValueKind};

pub const ATTR_TYPE: &str = "asoc-es-type";
pub const ATTR_IP: &str = "asoc-es-ip";
pub const ATTR_ADDRESS: &str = "asoc-es-address";
pub const ATTR_LOG_COLLECTOR: &str = "asoc-es-logCollector";
pub const ATTR_LOG_DECODER: &str = "asoc-es-logDecoder";
pub const ATTR_COUNT: &str = "asoc-es-count";
pub const ATTR_LAST_SEEN: &str = "asoc-es-lastSeen";

/// Every recognised attribute.
pub const ALL_FIELDS: &[&str] = &[
    ATTR_TYPE,
    ATTR_IP,
    ATTR_ADDRESS,
    ATTR_LOG_COLLECTOR,
    ATTR_LOG_DECODER,
    ATTR_COUNT,
    ATTR_LAST_SEEN,
];

/// Fixed-shape view of one event source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedRecord {
    /// Document identifier.
    pub id: String,
    pub kind: String,
    pub ip: String,
    pub address: String,
    pub log_collector: String,
    pub log_decoder: String,
    pub count: f64,
    pub last_seen: f64,
}

impl DecodedRecord {
    /// The string dimensions in label order: type, ip, address, logCollector, logDecoder.
    pub fn label_tuple(&self) -> [&str; 5] {
        [
            self.kind.as_str(),
            self.ip.as_str(),
            self.address.as_str(),
            self.log_collector.as_str(),
            self.log_decoder.as_str(),
        ]
    }
}

/// Decode one raw document, reading only the attributes named in `wanted`.
///
/// Attributes outside `wanted` keep their zero value whatever is stored.
pub fn decode(raw: &Document, wanted: &[&str]) -> Result<DecodedRecord, DecodeError> {
    let document = EventSourceDocument::from_raw(raw)?;
    let fields = Fields {
        document: &document,
        wanted,
    };

    Ok(DecodedRecord {
        id: document.id(),
        kind: fields.string(ATTR_TYPE)?,
        ip: fields.string(ATTR_IP)?,
        address: fields.string(ATTR_ADDRESS)?,
        log_collector: fields.string(ATTR_LOG_COLLECTOR)?,
        log_decoder: fields.string(ATTR_LOG_DECODER)?,
        count: fields.integer(ATTR_COUNT)?,
        last_seen: fields.integer(ATTR_LAST_SEEN)?,
    })
}

/// Decode a batch, keeping the good records and collecting the failures.
pub fn decode_all<'a, I>(
    documents: I,
    wanted: &[&str],
) -> (Vec<DecodedRecord>, Vec<DecodeError>)
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut records = Vec::new();
    let mut errors = Vec::new();

    for raw in documents {
        match decode(raw, wanted) {
            Ok(record) => records.push(record),
            Err(e) => errors.push(e),
        }
    }

    (records, errors)
}

struct Fields<'d, 'a> {
    document: &'d EventSourceDocument<'a>,
    wanted: &'d [&'d str],
}

impl<'a> Fields<'_, 'a> {
    fn lookup(&self, field: &str) -> Option<&'a Bson> {
        if self.wanted.iter().any(|wanted| *wanted == field) {
            self.document.attribute(field)
        } else {
            None
        }
    }

    fn string(&self, field: &'static str) -> Result<String, DecodeError> {
        match self.lookup(field) {
            None => Ok(String::new()),
            Some(Bson::String(value)) => Ok(value.clone()),
            Some(other) => Err(self.mismatch(field, ValueKind::String, other)),
        }
    }

    fn integer(&self, field: &'static str) -> Result<f64, DecodeError> {
        match self.lookup(field) {
            None => Ok(0.0),
            Some(Bson::Int32(value)) => Ok(f64::from(*value)),
            Some(Bson::Int64(value)) => Ok(*value as f64),
            Some(other) => Err(self.mismatch(field, ValueKind::Integer, other)),
        }
    }

    fn mismatch(&self, field: &'static str, expected: ValueKind, actual: &Bson) -> DecodeError {
        DecodeError {
            document: self.document.id(),
            field,
            expected,
            actual: ValueKind::of(actual),
        }
    }
}
