//! Chart data for the analysis panel.
//!
//! A `graph_data` payload is either a ready series of
//! `{time, glucose, insulin}` points, or an analysis object holding
//! biological-age records and raw Kraft curve samples. Raw samples are
//! grouped by timestamp, pivoted into glucose/insulin columns, and given
//! synthetic relative labels at a fixed interval.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One normalized chart point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDataPoint {
    pub time_label: String,
    pub glucose_value: f64,
    pub insulin_value: f64,
}

impl GraphDataPoint {
    pub fn new(time_label: impl Into<String>, glucose_value: f64, insulin_value: f64) -> Self {
        Self {
            time_label: time_label.into(),
            glucose_value,
            insulin_value,
        }
    }
}

/// Which bio-age record a row represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BioAgeTag {
    /// Measured baseline.
    Clinical,
    /// Goal.
    Target,
}

/// One timestamped biological-age record.
#[derive(Debug, Clone, PartialEq)]
pub struct BioAgeRecord {
    pub timestamp: String,
    pub tag: BioAgeTag,
    pub value: f64,
}

/// Baseline vs. target biological age.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BioAgeMetric {
    pub baseline: f64,
    pub target: f64,
    pub improvement: f64,
}

/// Shown in place of a missing metric.
pub const BIO_AGE_FALLBACK: &str = "--";

impl BioAgeMetric {
    /// Latest `CLINICAL` record against latest `TARGET` record. `None` when
    /// either is absent.
    pub fn from_records(records: &[BioAgeRecord]) -> Option<Self> {
        let latest = |tag: BioAgeTag| {
            records
                .iter()
                .filter(|r| r.tag == tag)
                .max_by_key(|r| timestamp_key(&r.timestamp))
                .map(|r| r.value)
        };

        let baseline = latest(BioAgeTag::Clinical)?;
        let target = latest(BioAgeTag::Target)?;

        Some(Self {
            baseline,
            target,
            improvement: baseline - target,
        })
    }

    /// Render an optional metric for display, e.g. `"52.0 → 47.5 (-4.5 yrs)"`.
    /// The bracketed change is target minus baseline, always signed.
    pub fn display(metric: Option<&Self>) -> String {
        match metric {
            Some(m) => format!(
                "{:.1} → {:.1} ({:+.1} yrs)",
                m.baseline, m.target, -m.improvement
            ),
            None => BIO_AGE_FALLBACK.to_string(),
        }
    }
}

/// Result of parsing one `graph_data` payload.
///
/// `None` fields mean "leave the current value alone".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphUpdate {
    pub series: Option<Vec<GraphDataPoint>>,
    pub bio_age_records: Option<Vec<BioAgeRecord>>,
}

// ---------------------------------------------------------------------------
// Default series
// ---------------------------------------------------------------------------

/// Minutes covered by the default curve, one point per 30 minutes.
const DEFAULT_MINUTES: [u32; 11] = [0, 30, 60, 90, 120, 150, 180, 210, 240, 270, 300];
const DEFAULT_GLUCOSE: [f64; 11] = [
    90.0, 145.0, 168.0, 152.0, 128.0, 106.0, 92.0, 84.0, 87.0, 89.0, 90.0,
];
const DEFAULT_INSULIN: [f64; 11] = [6.0, 48.0, 82.0, 71.0, 54.0, 36.0, 21.0, 12.0, 8.0, 7.0, 6.0];

/// The 11-point, five-hour Kraft curve shown before any analysis arrives.
pub fn default_series() -> Vec<GraphDataPoint> {
    DEFAULT_MINUTES
        .iter()
        .zip(DEFAULT_GLUCOSE)
        .zip(DEFAULT_INSULIN)
        .map(|((min, g), i)| GraphDataPoint::new(minutes_label(*min), g, i))
        .collect()
}

fn minutes_label(minutes: u32) -> String {
    format!("{minutes} min")
}

// ---------------------------------------------------------------------------
// Payload parsing
// ---------------------------------------------------------------------------

const SERIES_KEYS: &[&str] = &["points", "series", "graph"];
const KRAFT_KEYS: &[&str] = &["kraft_curve", "kraft", "samples"];
const BIO_AGE_KEYS: &[&str] = &["biological_age", "bio_age", "bio_age_records"];

/// Parse a `graph_data` payload.
///
/// `payload` is usually a JSON-encoded string; an inline array or object is
/// accepted as well. Any malformed part fails the whole parse so the caller
/// can keep what it already shows.
pub fn parse_payload(payload: &Value, interval_minutes: u32) -> Result<GraphUpdate> {
    let decoded;
    let value = match payload {
        Value::String(raw) => {
            decoded = serde_json::from_str::<Value>(raw)
                .context("graph payload is not valid JSON")?;
            &decoded
        }
        other => other,
    };

    match value {
        Value::Array(items) => Ok(GraphUpdate {
            series: Some(parse_points(items)?),
            bio_age_records: None,
        }),
        Value::Object(obj) => parse_analysis(obj, interval_minutes),
        _ => anyhow::bail!("graph payload must be an array or an object"),
    }
}

fn parse_analysis(obj: &Map<String, Value>, interval_minutes: u32) -> Result<GraphUpdate> {
    let mut update = GraphUpdate::default();

    if let Some(items) = first_array(obj, SERIES_KEYS) {
        update.series = Some(parse_points(items)?);
    } else if let Some(items) = first_array(obj, KRAFT_KEYS) {
        // Pre-pivoted points are accepted under the Kraft keys too.
        let already_points = items
            .first()
            .and_then(Value::as_object)
            .is_some_and(|o| o.contains_key("glucose") || o.contains_key("glucose_value"));
        update.series = Some(if already_points {
            parse_points(items)?
        } else {
            pivot_kraft_samples(items, interval_minutes)?
        });
    }

    if let Some(items) = first_array(obj, BIO_AGE_KEYS) {
        update.bio_age_records = Some(parse_bio_age(items)?);
    }

    if update.series.is_none() && update.bio_age_records.is_none() {
        anyhow::bail!("graph payload object has no series, Kraft samples, or bio-age records");
    }

    Ok(update)
}

fn first_array<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|key| obj.get(*key)).and_then(Value::as_array)
}

/// Parse an array of ready `{time, glucose, insulin}` points.
fn parse_points(items: &[Value]) -> Result<Vec<GraphDataPoint>> {
    if items.is_empty() {
        anyhow::bail!("graph series is empty");
    }

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let obj = item
                .as_object()
                .with_context(|| format!("point {idx} is not an object"))?;
            let time_label = label_from(obj, &["time", "time_label", "label"])
                .with_context(|| format!("point {idx} has no time"))?;
            let glucose = number_field(obj, &["glucose", "glucose_value"])
                .with_context(|| format!("point {idx} has no glucose value"))?;
            let insulin = number_field(obj, &["insulin", "insulin_value"])
                .with_context(|| format!("point {idx} has no insulin value"))?;
            Ok(GraphDataPoint::new(time_label, glucose, insulin))
        })
        .collect()
}

/// Group raw `{timestamp, analyte, value}` rows by timestamp, pivot the
/// analyte into columns, and label each group `interval * index` minutes.
///
/// Labels come from a group's position among all groups, so a group missing
/// either analyte is dropped without shifting the ones after it.
pub fn pivot_kraft_samples(items: &[Value], interval_minutes: u32) -> Result<Vec<GraphDataPoint>> {
    #[derive(Default)]
    struct Row {
        glucose: Option<f64>,
        insulin: Option<f64>,
    }

    /// Parsed instants sort first and compare by value alone; unparsed
    /// timestamps follow, lexically.
    #[derive(PartialEq, Eq, PartialOrd, Ord)]
    enum GroupKey {
        At(i64),
        Raw(String),
    }

    let mut groups: BTreeMap<GroupKey, Row> = BTreeMap::new();

    for (idx, item) in items.iter().enumerate() {
        let obj = item
            .as_object()
            .with_context(|| format!("sample {idx} is not an object"))?;
        let timestamp = label_from(obj, &["timestamp", "time", "collected_at"])
            .with_context(|| format!("sample {idx} has no timestamp"))?;
        let analyte = label_from(obj, &["analyte", "name", "test"])
            .with_context(|| format!("sample {idx} has no analyte"))?
            .to_ascii_lowercase();
        let value = number_field(obj, &["value", "result"])
            .with_context(|| format!("sample {idx} has no value"))?;

        let key = match timestamp_key(&timestamp) {
            Some(millis) => GroupKey::At(millis),
            None => GroupKey::Raw(timestamp),
        };
        let row = groups.entry(key).or_default();
        if analyte.contains("glucose") {
            row.glucose = Some(value);
        } else if analyte.contains("insulin") {
            row.insulin = Some(value);
        }
    }

    let series: Vec<GraphDataPoint> = groups
        .into_values()
        .enumerate()
        .filter_map(|(idx, row)| {
            let minutes = (idx as u32).saturating_mul(interval_minutes);
            Some(GraphDataPoint::new(
                minutes_label(minutes),
                row.glucose?,
                row.insulin?,
            ))
        })
        .collect();

    if series.is_empty() {
        anyhow::bail!("Kraft samples contain no paired glucose/insulin readings");
    }

    Ok(series)
}

fn parse_bio_age(items: &[Value]) -> Result<Vec<BioAgeRecord>> {
    items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| parse_bio_age_record(idx, item).transpose())
        .collect()
}

/// `Ok(None)` for records tagged neither `CLINICAL` nor `TARGET`.
fn parse_bio_age_record(idx: usize, item: &Value) -> Result<Option<BioAgeRecord>> {
    let obj = item
        .as_object()
        .with_context(|| format!("bio-age record {idx} is not an object"))?;

    let tag = label_from(obj, &["tag", "type", "source"]).unwrap_or_default();
    let tag = match tag.to_ascii_uppercase().as_str() {
        "CLINICAL" => BioAgeTag::Clinical,
        "TARGET" => BioAgeTag::Target,
        _ => return Ok(None),
    };

    let value = number_field(obj, &["value", "bio_age", "age"])
        .with_context(|| format!("bio-age record {idx} has no value"))?;
    let timestamp = label_from(obj, &["timestamp", "date", "recorded_at"]).unwrap_or_default();

    Ok(Some(BioAgeRecord {
        timestamp,
        tag,
        value,
    }))
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Leading number in a string such as `"95"` or `"95.5 mg/dL"`.
static LEADING_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(-?\d+(?:\.\d+)?)").expect("leading number regex must compile")
});

/// Numeric value of a JSON number or numeric string.
pub fn number_from(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => LEADING_NUMBER_RE
            .captures(s)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok()),
        _ => None,
    }
}

fn number_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().filter_map(|key| obj.get(*key)).find_map(number_from)
}

/// A string field, or a number rendered as text.
fn label_from(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// Sortable epoch-millis for RFC 3339, naive ISO datetimes, or plain
/// numbers. `None` sorts after every parsed key, then lexically.
fn timestamp_key(raw: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp_millis());
    }
    raw.parse::<f64>().ok().map(|n| n as i64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_series_has_eleven_points() {
        let series = default_series();
        assert_eq!(series.len(), 11);
        assert_eq!(series[0].time_label, "0 min");
        assert_eq!(series[10].time_label, "300 min");
    }

    #[test]
    fn parses_point_array_from_string() {
        let payload = json!(r#"[{"time":"0","glucose":92,"insulin":5},{"time":"30","glucose":"150","insulin":60.5}]"#);
        let update = parse_payload(&payload, 30).unwrap();
        let series = update.series.unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[1], GraphDataPoint::new("30", 150.0, 60.5));
        assert!(update.bio_age_records.is_none());
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(parse_payload(&json!("[not json"), 30).is_err());
        assert!(parse_payload(&json!("42"), 30).is_err());
        assert!(parse_payload(&json!("[]"), 30).is_err());
        assert!(parse_payload(&json!(r#"[{"time":"0","glucose":90}]"#), 30).is_err());
        assert!(parse_payload(&json!(r#"{"unrelated":true}"#), 30).is_err());
    }

    #[test]
    fn pivots_raw_kraft_samples() {
        let samples = json!([
            { "timestamp": "2026-03-01T08:30:00Z", "analyte": "Insulin", "value": 40 },
            { "timestamp": "2026-03-01T08:00:00Z", "analyte": "Glucose", "value": 88 },
            { "timestamp": "2026-03-01T08:00:00Z", "analyte": "Insulin", "value": 4 },
            { "timestamp": "2026-03-01T08:30:00Z", "analyte": "Glucose", "value": "142 mg/dL" },
            { "timestamp": "2026-03-01T09:00:00Z", "analyte": "Glucose", "value": 160 },
            { "timestamp": "2026-03-01T09:00:00Z", "analyte": "Cortisol", "value": 12 }
        ]);
        let series = pivot_kraft_samples(samples.as_array().unwrap(), 30).unwrap();
        assert_eq!(
            series,
            vec![
                GraphDataPoint::new("0 min", 88.0, 4.0),
                GraphDataPoint::new("30 min", 142.0, 40.0),
            ]
        );
    }

    #[test]
    fn missing_analyte_keeps_later_labels() {
        let samples = json!([
            { "timestamp": "2026-03-01T08:00:00Z", "analyte": "glucose", "value": 90 },
            { "timestamp": "2026-03-01T08:00:00Z", "analyte": "insulin", "value": 6 },
            { "timestamp": "2026-03-01T08:30:00Z", "analyte": "glucose", "value": 150 },
            { "timestamp": "2026-03-01T09:00:00Z", "analyte": "glucose", "value": 170 },
            { "timestamp": "2026-03-01T09:00:00Z", "analyte": "insulin", "value": 80 }
        ]);
        let series = pivot_kraft_samples(samples.as_array().unwrap(), 30).unwrap();
        assert_eq!(
            series,
            vec![
                GraphDataPoint::new("0 min", 90.0, 6.0),
                GraphDataPoint::new("60 min", 170.0, 80.0),
            ]
        );
    }

    #[test]
    fn same_instant_in_different_notation_groups_together() {
        let samples = json!([
            { "timestamp": "2026-03-01T08:00:00Z", "analyte": "glucose", "value": 90 },
            { "timestamp": "2026-03-01T08:00:00+00:00", "analyte": "insulin", "value": 6 },
            { "timestamp": "2026-03-01T08:30:00.000Z", "analyte": "glucose", "value": 150 },
            { "timestamp": "2026-03-01T09:30:00+01:00", "analyte": "insulin", "value": 60 }
        ]);
        let series = pivot_kraft_samples(samples.as_array().unwrap(), 30).unwrap();
        assert_eq!(
            series,
            vec![
                GraphDataPoint::new("0 min", 90.0, 6.0),
                GraphDataPoint::new("30 min", 150.0, 60.0),
            ]
        );
    }

    #[test]
    fn unparsed_timestamps_group_after_parsed_ones() {
        let samples = json!([
            { "timestamp": "baseline", "analyte": "glucose", "value": 85 },
            { "timestamp": "baseline", "analyte": "insulin", "value": 5 },
            { "timestamp": "2026-03-01T08:00:00Z", "analyte": "glucose", "value": 90 },
            { "timestamp": "2026-03-01T08:00:00Z", "analyte": "insulin", "value": 6 }
        ]);
        let series = pivot_kraft_samples(samples.as_array().unwrap(), 30).unwrap();
        assert_eq!(series[0], GraphDataPoint::new("0 min", 90.0, 6.0));
        assert_eq!(series[1], GraphDataPoint::new("30 min", 85.0, 5.0));
    }

    #[test]
    fn parses_analysis_object_with_bio_age() {
        let payload = json!({
            "biological_age": [
                { "timestamp": "2025-01-01", "tag": "CLINICAL", "value": 55 },
                { "timestamp": "2025-06-01", "tag": "CLINICAL", "value": 52 },
                { "timestamp": "2025-06-01", "tag": "TARGET", "value": 47.5 },
                { "timestamp": "2025-06-01", "tag": "ESTIMATE", "value": 50 }
            ],
            "kraft_curve": [
                { "timestamp": 0, "analyte": "glucose", "value": 90 },
                { "timestamp": 0, "analyte": "insulin", "value": 6 },
                { "timestamp": 1800, "analyte": "glucose", "value": 150 },
                { "timestamp": 1800, "analyte": "insulin", "value": 55 }
            ]
        });
        let encoded = Value::String(payload.to_string());
        let update = parse_payload(&encoded, 60).unwrap();

        let series = update.series.unwrap();
        assert_eq!(series[1].time_label, "60 min");

        let records = update.bio_age_records.unwrap();
        assert_eq!(records.len(), 3);
        let metric = BioAgeMetric::from_records(&records).unwrap();
        assert_eq!(metric.baseline, 52.0);
        assert_eq!(metric.target, 47.5);
        assert_eq!(metric.improvement, 4.5);
    }

    #[test]
    fn bio_age_metric_needs_both_records() {
        let only_clinical = vec![BioAgeRecord {
            timestamp: "2025-01-01".to_string(),
            tag: BioAgeTag::Clinical,
            value: 50.0,
        }];
        assert!(BioAgeMetric::from_records(&only_clinical).is_none());
        assert!(BioAgeMetric::from_records(&[]).is_none());
        assert_eq!(BioAgeMetric::display(None), BIO_AGE_FALLBACK);
    }

    #[test]
    fn bio_age_display_signs_the_change() {
        let younger = BioAgeMetric {
            baseline: 52.0,
            target: 47.5,
            improvement: 4.5,
        };
        assert_eq!(BioAgeMetric::display(Some(&younger)), "52.0 → 47.5 (-4.5 yrs)");

        let older = BioAgeMetric {
            baseline: 45.0,
            target: 47.0,
            improvement: -2.0,
        };
        assert_eq!(BioAgeMetric::display(Some(&older)), "45.0 → 47.0 (+2.0 yrs)");
    }

    #[test]
    fn number_from_handles_strings_and_numbers() {
        assert_eq!(number_from(&json!(5)), Some(5.0));
        assert_eq!(number_from(&json!("7.25 uIU/mL")), Some(7.25));
        assert_eq!(number_from(&json!("high")), None);
        assert_eq!(number_from(&json!(null)), None);
    }

    #[test]
    fn timestamp_key_orders_mixed_formats() {
        assert!(timestamp_key("2026-03-01T08:00:00Z") < timestamp_key("2026-03-01T08:30:00+00:00"));
        assert!(timestamp_key("2026-03-01 08:00:00").is_some());
        assert!(timestamp_key("2025-01-01") < timestamp_key("2025-06-01"));
        assert_eq!(timestamp_key("1800"), Some(1800));
        assert_eq!(timestamp_key("morning"), None);
    }
}
