//! Mapping from decoded event source records to Prometheus metric families.

use serde::{Deserialize, Serialize};

use crate::decoder::{ALL_FIELDS, ATTR_LAST_SEEN, DecodedRecord};
use crate::publisher::SeriesKey;

/// A metric family: name, help text and the label names its series carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricFamily {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

/// Label names of the event source families, in label tuple order.
pub const EVENT_SOURCE_LABELS: &[&str] = &[
    "asocestype",
    "asocesip",
    "asocesaddress",
    "asoceslogCollector",
    "asoceslogDecoder",
];

pub const ASOC_ES_COUNT: MetricFamily = MetricFamily {
    name: "asoc_es_count",
    help: "MongoDB esm database export asoc-es-count",
    labels: EVENT_SOURCE_LABELS,
};

pub const ASOC_ES_LAST_SEEN: MetricFamily = MetricFamily {
    name: "asoc_es_last_Seen",
    help: "MongoDB esm database export asoc-es-last-Seen",
    labels: EVENT_SOURCE_LABELS,
};

pub const ASOC_ES_IP_BY_ID: MetricFamily = MetricFamily {
    name: "asoc_es_ip",
    help: "MongoDB esm database export asoc-es-lastSeen per event source id",
    labels: &["_id"],
};

/// Which family layout decoded records are published under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportProfile {
    /// Count and last-seen counters keyed by the five descriptive attributes.
    #[default]
    EventSource,
    /// Last-seen counter keyed by document id.
    ById,
}

/// One value destined for one series.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub key: SeriesKey,
    pub value: f64,
}

impl ExportProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportProfile::EventSource => "event_source",
            ExportProfile::ById => "by_id",
        }
    }

    /// Families in render order.
    pub fn families(&self) -> &'static [MetricFamily] {
        match self {
            ExportProfile::EventSource => &[ASOC_ES_COUNT, ASOC_ES_LAST_SEEN],
            ExportProfile::ById => &[ASOC_ES_IP_BY_ID],
        }
    }

    /// Attributes a record needs for this profile's samples.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            ExportProfile::EventSource => ALL_FIELDS,
            ExportProfile::ById => &[ATTR_LAST_SEEN],
        }
    }

    /// Samples contributed by one record.
    pub fn samples(&self, record: &DecodedRecord) -> Vec<Sample> {
        match self {
            ExportProfile::EventSource => vec![
                Sample {
                    key: SeriesKey::new(&ASOC_ES_COUNT, &record.label_tuple()),
                    value: record.count,
                },
                Sample {
                    key: SeriesKey::new(&ASOC_ES_LAST_SEEN, &record.label_tuple()),
                    value: record.last_seen,
                },
            ],
            ExportProfile::ById => vec![Sample {
                key: SeriesKey::new(&ASOC_ES_IP_BY_ID, &[record.id.as_str()]),
                value: record.last_seen,
            }],
        }
    }
}

impl std::fmt::Display for ExportProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
