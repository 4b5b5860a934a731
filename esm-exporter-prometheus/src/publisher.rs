//! Scrape-scoped metric accumulation and exposition rendering.

use std::collections::BTreeMap;
use std::fmt::Write;

use tracing::trace;

use crate::decoder::DecodedRecord;
use crate::mapping::{ExportProfile, MetricFamily};

/// A unique identifier for a metric time series.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeriesKey {
    /// The Prometheus metric name.
    pub name: &'static str,
    /// Label key-value pairs in the family's declared order.
    pub labels: Vec<(&'static str, String)>,
}

impl SeriesKey {
    /// Pair a family's label names with a label tuple.
    pub fn new(family: &MetricFamily, values: &[&str]) -> Self {
        let labels = family
            .labels
            .iter()
            .copied()
            .zip(values.iter().map(|v| v.to_string()))
            .collect();

        Self {
            name: family.name,
            labels,
        }
    }

    /// Format labels for Prometheus exposition format.
    pub fn format_labels(&self) -> String {
        if self.labels.is_empty() {
            return String::new();
        }

        let parts: Vec<String> = self
            .labels
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
            .collect();

        format!("{{{}}}", parts.join(","))
    }
}

/// Counter values accumulated for one scrape.
///
/// Every scrape owns its accumulator; nothing here is shared between requests.
/// Samples with the same series key add up.
#[derive(Debug)]
pub struct ScrapeAccumulator {
    profile: ExportProfile,
    series: BTreeMap<SeriesKey, f64>,
}

impl ScrapeAccumulator {
    pub fn new(profile: ExportProfile) -> Self {
        Self {
            profile,
            series: BTreeMap::new(),
        }
    }

    /// Add a record's numeric fields to the series keyed by its labels.
    pub fn publish(&mut self, record: &DecodedRecord) {
        for sample in self.profile.samples(record) {
            trace!(
                metric = sample.key.name,
                document = %record.id,
                value = sample.value,
                "Publishing sample"
            );
            *self.series.entry(sample.key).or_insert(0.0) += sample.value;
        }
    }

    /// Current value of a series, if it has been published this scrape.
    pub fn value(&self, key: &SeriesKey) -> Option<f64> {
        self.series.get(key).copied()
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Drop every series.
    pub fn reset(&mut self) {
        self.series.clear();
    }

    /// Write all families that have at least one series.
    pub fn render(&self, output: &mut String) {
        for family in self.profile.families() {
            let mut series = self
                .series
                .iter()
                .filter(|(key, _)| key.name == family.name)
                .peekable();

            if series.peek().is_none() {
                continue;
            }

            writeln!(output, "# HELP {} {}", family.name, escape_help(family.help)).ok();
            writeln!(output, "# TYPE {} counter", family.name).ok();

            for (key, value) in series {
                writeln!(
                    output,
                    "{}{} {}",
                    key.name,
                    key.format_labels(),
                    format_value(*value)
                )
                .ok();
            }
        }
    }
}

/// Write a single unlabeled sample with its TYPE comment.
pub(crate) fn write_sample(output: &mut String, name: &str, kind: &str, help: &str, value: f64) {
    writeln!(output, "# HELP {} {}", name, escape_help(help)).ok();
    writeln!(output, "# TYPE {} {}", name, kind).ok();
    writeln!(output, "{} {}", name, format_value(value)).ok();
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape HELP text (backslash and newline only).
fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{ASOC_ES_COUNT, ASOC_ES_LAST_SEEN};

    fn record(kind: &str, ip: &str, count: f64, last_seen: f64) -> DecodedRecord {
        DecodedRecord {
            id: format!("{}-{}", kind, ip),
            kind: kind.to_string(),
            ip: ip.to_string(),
            count,
            last_seen,
            ..Default::default()
        }
    }

    #[test]
    fn test_series_key_format_labels() {
        let key = SeriesKey::new(&ASOC_ES_COUNT, &["x", "10.0.0.1", "", "", ""]);

        assert_eq!(
            key.format_labels(),
            "{asocestype=\"x\",asocesip=\"10.0.0.1\",asocesaddress=\"\",asoceslogCollector=\"\",asoceslogDecoder=\"\"}"
        );
    }

    #[test]
    fn test_identical_label_tuples_sum() {
        let mut accumulator = ScrapeAccumulator::new(ExportProfile::EventSource);
        accumulator.publish(&record("x", "10.0.0.1", 3.0, 10.0));
        accumulator.publish(&record("x", "10.0.0.1", 4.0, 20.0));

        let labels = ["x", "10.0.0.1", "", "", ""];
        assert_eq!(accumulator.series_count(), 2);
        assert_eq!(
            accumulator.value(&SeriesKey::new(&ASOC_ES_COUNT, &labels)),
            Some(7.0)
        );
        assert_eq!(
            accumulator.value(&SeriesKey::new(&ASOC_ES_LAST_SEEN, &labels)),
            Some(30.0)
        );
    }

    #[test]
    fn test_distinct_label_tuples_stay_separate() {
        let mut accumulator = ScrapeAccumulator::new(ExportProfile::EventSource);
        accumulator.publish(&record("x", "10.0.0.1", 3.0, 0.0));
        accumulator.publish(&record("x", "10.0.0.2", 4.0, 0.0));

        assert_eq!(accumulator.series_count(), 4);
    }

    #[test]
    fn test_render_families() {
        let mut accumulator = ScrapeAccumulator::new(ExportProfile::EventSource);
        accumulator.publish(&record("x", "10.0.0.1", 5.0, 1000.0));

        let mut output = String::new();
        accumulator.render(&mut output);

        assert!(output.contains("# HELP asoc_es_count MongoDB esm database export asoc-es-count"));
        assert!(output.contains("# TYPE asoc_es_count counter"));
        assert!(output.contains("# TYPE asoc_es_last_Seen counter"));
        assert!(output.contains("asoc_es_count{asocestype=\"x\",asocesip=\"10.0.0.1\","));
        assert!(output.contains("asoceslogDecoder=\"\"} 5\n"));
        assert!(output.contains("asoceslogDecoder=\"\"} 1000\n"));

        // count family renders before last-seen
        let count_at = output.find("# TYPE asoc_es_count").unwrap();
        let seen_at = output.find("# TYPE asoc_es_last_Seen").unwrap();
        assert!(count_at < seen_at);
    }

    #[test]
    fn test_render_empty_accumulator() {
        let accumulator = ScrapeAccumulator::new(ExportProfile::EventSource);

        let mut output = String::new();
        accumulator.render(&mut output);

        assert!(output.is_empty());
    }

    #[test]
    fn test_render_by_id() {
        let mut accumulator = ScrapeAccumulator::new(ExportProfile::ById);
        accumulator.publish(&DecodedRecord {
            id: "a".to_string(),
            last_seen: 1700000000.0,
            ..Default::default()
        });

        let mut output = String::new();
        accumulator.render(&mut output);

        assert!(output.contains("# TYPE asoc_es_ip counter"));
        assert!(output.contains("asoc_es_ip{_id=\"a\"} 1700000000\n"));
        assert!(!output.contains("asoc_es_count"));
    }

    #[test]
    fn test_reset_clears_series() {
        let mut accumulator = ScrapeAccumulator::new(ExportProfile::EventSource);
        accumulator.publish(&record("x", "10.0.0.1", 1.0, 1.0));
        assert!(!accumulator.is_empty());

        accumulator.reset();

        assert!(accumulator.is_empty());
        let mut output = String::new();
        accumulator.render(&mut output);
        assert!(output.is_empty());
    }

    #[test]
    fn test_label_values_are_escaped() {
        let mut accumulator = ScrapeAccumulator::new(ExportProfile::EventSource);
        accumulator.publish(&record("say \"hi\"", "a\\b", 1.0, 0.0));

        let mut output = String::new();
        accumulator.render(&mut output);

        assert!(output.contains("asocestype=\"say \\\"hi\\\"\""));
        assert!(output.contains("asocesip=\"a\\\\b\""));
    }

    #[test]
    fn test_write_sample() {
        let mut output = String::new();
        write_sample(&mut output, "esm_exporter_up", "gauge", "Up", 1.0);

        assert_eq!(
            output,
            "# HELP esm_exporter_up Up\n# TYPE esm_exporter_up gauge\nesm_exporter_up 1\n"
        );
    }

    #[test]
    fn test_escape_label_value() {
        assert_eq!(escape_label_value("simple"), "simple");
        assert_eq!(escape_label_value("with\"quote"), "with\\\"quote");
        assert_eq!(escape_label_value("with\\backslash"), "with\\\\backslash");
        assert_eq!(escape_label_value("with\nnewline"), "with\\nnewline");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(42.0), "42");
        assert_eq!(format_value(0.25), "0.25");
        assert_eq!(format_value(-3.0), "-3");
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
    }
}
