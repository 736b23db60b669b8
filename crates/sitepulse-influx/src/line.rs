//! Line-protocol encoding for batch writes.
//!
//! One line per point: `measurement,tag=v field=1,other="x" <ts-ms>`.
//! Non-finite float fields are dropped; a point whose fields all drop is
//! skipped (line protocol requires at least one field).

use sitepulse_core::model::{FieldValue, MeasurementPoint};
use std::fmt::Write;

pub(crate) fn encode_batch(batch: &[MeasurementPoint]) -> String {
    let mut out = String::new();
    for point in batch {
        if let Some(line) = encode_point(point) {
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

fn encode_point(point: &MeasurementPoint) -> Option<String> {
    let mut fields = String::new();
    for (key, value) in &point.fields {
        let encoded = match value {
            FieldValue::Float(v) if v.is_finite() => format!("{v}"),
            FieldValue::Float(_) => continue,
            FieldValue::Int(v) => format!("{v}i"),
            FieldValue::Text(s) => format!("\"{}\"", escape_string(s)),
        };
        if !fields.is_empty() {
            fields.push(',');
        }
        let _ = write!(fields, "{}={}", escape_key(key), encoded);
    }
    if fields.is_empty() {
        return None;
    }

    let mut line = escape_measurement(&point.measurement);
    for (key, value) in &point.tags {
        let _ = write!(line, ",{}={}", escape_key(key), escape_key(value));
    }
    let _ = write!(line, " {} {}", fields, point.time.timestamp_millis());
    Some(line)
}

fn escape_measurement(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace(',', "\\,").replace(' ', "\\ ")
}

/// Tag keys, tag values and field keys share one escape set.
fn escape_key(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

fn escape_string(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;

    #[test]
    fn encodes_tags_fields_and_millisecond_timestamp() {
        let t = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let point = MeasurementPoint::new("speedIndex", t)
            .tag("testId", "run_1")
            .tag("pageUrl", "https://a.test")
            .float_field("median", 1234.0)
            .int_field("iterations", 3);
        let line = encode_batch(&[point]);
        assert_eq!(
            line,
            "speedIndex,pageUrl=https://a.test,testId=run_1 median=1234,iterations=3i 1700000000000\n"
        );
    }

    #[test]
    fn escapes_reserved_characters() {
        let t = Utc.timestamp_millis_opt(0).unwrap();
        let point = MeasurementPoint::new("my metric", t)
            .tag("page url", "https://a.test/?q=1, b")
            .string_field("title", "say \"hi\"");
        let line = encode_batch(&[point]);
        assert_eq!(
            line,
            "my\\ metric,page\\ url=https://a.test/?q\\=1\\,\\ b title=\"say \\\"hi\\\"\" 0\n"
        );
    }

    #[test]
    fn drops_points_whose_fields_all_drop() {
        let t = Utc.timestamp_millis_opt(0).unwrap();
        let point = MeasurementPoint::new("bad", t).float_field("value", f64::NAN);
        assert!(encode_batch(&[point]).is_empty());
    }
}
