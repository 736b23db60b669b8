//! Flux query construction and annotated-CSV response parsing.

use crate::error::{InfluxError, InfluxResult};
use chrono::{DateTime, Utc};
use sitepulse_core::model::{FieldValue, PointRecord, TagSet};
use sitepulse_core::store::TagFilter;

/// Columns the CSV response carries that are not tags.
const META_COLUMNS: [&str; 5] = ["", "result", "table", "_start", "_stop"];

/// Build the records query for a tag filter. An empty id list ranges over
/// every run in the lookback window.
pub(crate) fn records_query(bucket: &str, lookback_days: u32, filter: &TagFilter) -> String {
    let mut flux = format!(
        "from(bucket: \"{}\")\n  |> range(start: -{}d)",
        escape_flux_string(bucket),
        lookback_days
    );
    if !filter.test_ids.is_empty() {
        let clauses: Vec<String> = filter
            .test_ids
            .iter()
            .map(|id| format!("r[\"testId\"] == \"{}\"", escape_flux_string(id)))
            .collect();
        flux.push_str(&format!(
            "\n  |> filter(fn: (r) => {})",
            clauses.join(" or ")
        ));
    }
    if let Some(measurement) = &filter.measurement {
        flux.push_str(&format!(
            "\n  |> filter(fn: (r) => r[\"_measurement\"] == \"{}\")",
            escape_flux_string(measurement)
        ));
    }
    flux
}

fn escape_flux_string(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Parse an annotated-CSV query response into records.
///
/// The response may contain several tables, each introduced by annotation
/// lines (`#datatype`, `#group`, `#default`) followed by a header row.
/// Unknown columns are treated as tags; rows missing the value or time
/// column are skipped rather than failing the whole response.
pub(crate) fn parse_annotated_csv(body: &str) -> InfluxResult<Vec<PointRecord>> {
    let mut records = Vec::new();
    let mut datatypes: Vec<String> = Vec::new();
    let mut header: Option<Vec<String>> = None;

    for raw_line in body.lines() {
        let line = raw_line.trim_end_matches('\r');
        if line.is_empty() {
            // Blank line ends the current table; the next block re-announces
            // itself.
            header = None;
            datatypes.clear();
            continue;
        }
        if line.starts_with('#') {
            let cells = split_csv_line(line);
            // The `#datatype` marker occupies the first column, so the cell
            // vector stays index-aligned with the header row.
            if cells.first().map(String::as_str) == Some("#datatype") {
                datatypes = cells;
                header = None;
            }
            continue;
        }
        let cells = split_csv_line(line);
        match &header {
            None => header = Some(cells),
            Some(columns) => {
                if let Some(record) = parse_row(columns, &datatypes, &cells)? {
                    records.push(record);
                }
            }
        }
    }
    Ok(records)
}

fn parse_row(
    columns: &[String],
    datatypes: &[String],
    cells: &[String],
) -> InfluxResult<Option<PointRecord>> {
    let mut measurement = None;
    let mut field = None;
    let mut value = None;
    let mut time = None;
    let mut tags = TagSet::new();

    for (idx, column) in columns.iter().enumerate() {
        let Some(cell) = cells.get(idx) else { break };
        match column.as_str() {
            "_measurement" => measurement = Some(cell.clone()),
            "_field" => field = Some(cell.clone()),
            "_value" => value = Some(parse_value(cell, datatypes.get(idx))),
            "_time" => time = Some(parse_time(cell)?),
            name if META_COLUMNS.contains(&name) => {}
            name => {
                if !cell.is_empty() {
                    tags.insert(name.to_string(), cell.clone());
                }
            }
        }
    }

    let (Some(measurement), Some(field), Some(value), Some(time)) =
        (measurement, field, value, time)
    else {
        // Summary tables (yields, errors) lack these columns; not our rows.
        return Ok(None);
    };
    Ok(Some(PointRecord {
        measurement,
        field,
        value,
        tags,
        time,
    }))
}

fn parse_value(cell: &str, datatype: Option<&String>) -> FieldValue {
    match datatype.map(String::as_str) {
        Some("long") | Some("unsignedLong") => cell
            .parse::<i64>()
            .map(FieldValue::Int)
            .unwrap_or_else(|_| FieldValue::Text(cell.to_string())),
        Some("double") => cell
            .parse::<f64>()
            .map(FieldValue::Float)
            .unwrap_or_else(|_| FieldValue::Text(cell.to_string())),
        Some("string") => FieldValue::Text(cell.to_string()),
        // No annotation: infer, narrowest numeric first.
        _ => cell
            .parse::<i64>()
            .map(FieldValue::Int)
            .or_else(|_| cell.parse::<f64>().map(FieldValue::Float))
            .unwrap_or_else(|_| FieldValue::Text(cell.to_string())),
    }
}

fn parse_time(cell: &str) -> InfluxResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(cell)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| InfluxError::InvalidResponse {
            message: format!("bad _time value {cell:?}: {e}"),
        })
}

/// Split one CSV line, honoring double-quoted cells with doubled escapes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                cells.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    cells.push(current);
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_filters_by_run_ids_and_measurement() {
        let filter = TagFilter::for_runs(&["a".into(), "b".into()]).with_measurement("speedIndex");
        let flux = records_query("perf", 30, &filter);
        assert!(flux.contains("from(bucket: \"perf\")"));
        assert!(flux.contains("range(start: -30d)"));
        assert!(flux.contains("r[\"testId\"] == \"a\" or r[\"testId\"] == \"b\""));
        assert!(flux.contains("r[\"_measurement\"] == \"speedIndex\""));
    }

    #[test]
    fn empty_filter_ranges_over_all_runs() {
        let flux = records_query("perf", 7, &TagFilter::all_runs());
        assert!(flux.contains("range(start: -7d)"));
        assert!(!flux.contains("testId"));
    }

    #[test]
    fn parses_annotated_csv_into_records() {
        let body = "\
#datatype,string,long,dateTime:RFC3339,dateTime:RFC3339,dateTime:RFC3339,double,string,string,string,string\n\
#group,false,false,true,true,false,false,true,true,true,true\n\
#default,_result,,,,,,,,,\n\
,result,table,_start,_stop,_time,_value,_field,_measurement,testId,browser\n\
,,0,2026-08-01T00:00:00Z,2026-08-31T00:00:00Z,2026-08-06T12:00:00Z,1234,median,speedIndex,run_1,chrome\n";
        let records = parse_annotated_csv(body).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.measurement, "speedIndex");
        assert_eq!(r.field, "median");
        assert_eq!(r.value, FieldValue::Float(1234.0));
        assert_eq!(r.tags.get("testId").map(String::as_str), Some("run_1"));
        assert_eq!(r.tags.get("browser").map(String::as_str), Some("chrome"));
        assert!(!r.tags.contains_key("_start"));
    }

    #[test]
    fn parses_multiple_tables_and_quoted_strings() {
        let body = "\
#datatype,string,long,dateTime:RFC3339,dateTime:RFC3339,dateTime:RFC3339,string,string,string,string\n\
#group,false,false,true,true,false,false,true,true,true\n\
#default,_result,,,,,,,,\n\
,result,table,_start,_stop,_time,_value,_field,_measurement,adviceId\n\
,,0,2026-08-01T00:00:00Z,2026-08-31T00:00:00Z,2026-08-06T12:00:00Z,\"Avoid scaling, \"\"please\"\"\",title,performance,avoidScalingImages\n\
\n\
#datatype,string,long,dateTime:RFC3339,dateTime:RFC3339,dateTime:RFC3339,long,string,string,string\n\
#group,false,false,true,true,false,false,true,true,true\n\
#default,_result,,,,,,,,\n\
,result,table,_start,_stop,_time,_value,_field,_measurement,contentType\n\
,,1,2026-08-01T00:00:00Z,2026-08-31T00:00:00Z,2026-08-06T12:00:00Z,5,requests,javascript,javascript\n";
        let records = parse_annotated_csv(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].value,
            FieldValue::Text("Avoid scaling, \"please\"".into())
        );
        assert_eq!(records[1].value, FieldValue::Int(5));
        assert_eq!(
            records[1].tags.get("contentType").map(String::as_str),
            Some("javascript")
        );
    }

    #[test]
    fn bad_time_is_a_response_error() {
        let body = "\
,result,table,_time,_value,_field,_measurement\n\
,,0,not-a-time,1,value,firstPaint\n";
        assert!(parse_annotated_csv(body).is_err());
    }
}
