use crate::core::DiagnosticSink;
use crate::domain::model::{parse_bool_like, parse_date_value, RecordSet};
use crate::utils::error::{EtlError, Result, RowValidationError};
use chrono::NaiveDate;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

fn ensure_field(set: &RecordSet, field: &str) -> Result<()> {
    if set.has_column(field) {
        Ok(())
    } else {
        Err(EtlError::FieldNotFound {
            field: field.to_string(),
            available: set.columns.join(", "),
        })
    }
}

/// Whether a stored value equals the filter target.
///
/// A boolean target also matches bool-like text (`"N"` equals `false`), and a
/// string target matches numbers and booleans by their text, so data read
/// back from CSV filters the same as the JSON it came from.
pub fn value_matches(value: &Value, target: &Value) -> bool {
    if value == target {
        return true;
    }
    match (value, target) {
        (_, Value::Bool(expected)) => parse_bool_like(value) == Some(*expected),
        (Value::Number(n), Value::String(s)) => n.to_string() == *s,
        (Value::Bool(b), Value::String(s)) => parse_bool_like(&Value::String(s.clone())) == Some(*b),
        (Value::String(s), Value::Number(n)) => s.trim() == n.to_string(),
        _ => false,
    }
}

/// Keeps records whose `field` equals `target`, in their original order.
pub fn filter_by_field(set: &RecordSet, field: &str, target: &Value) -> Result<RecordSet> {
    ensure_field(set, field)?;

    let kept = set
        .records
        .iter()
        .filter(|r| r.get(field).is_some_and(|v| value_matches(v, target)))
        .cloned()
        .collect();
    Ok(set.with_records(kept))
}

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(EtlError::InvalidConfigValueError {
                field: "date_range".to_string(),
                value: format!("{} to {}", start, end),
                reason: "start date is after end date".to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl FromStr for DateRange {
    type Err = EtlError;

    /// Accepts `2024-01-01 to 2024-01-31` or `2024-01-01..2024-01-31`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| EtlError::InvalidConfigValueError {
            field: "date_range".to_string(),
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let (start, end) = s
            .split_once(" to ")
            .or_else(|| s.split_once(".."))
            .ok_or_else(|| invalid("expected 'YYYY-MM-DD to YYYY-MM-DD'"))?;
        let parse = |raw: &str| {
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| invalid("dates must be YYYY-MM-DD"))
        };
        DateRange::new(parse(start)?, parse(end)?)
    }
}

/// Keeps records whose date `field` falls within `range`. Records whose date
/// does not parse are reported and dropped.
pub fn filter_by_date_range(
    set: &RecordSet,
    field: &str,
    range: &DateRange,
    source: &str,
    sink: &dyn DiagnosticSink,
) -> Result<RecordSet> {
    ensure_field(set, field)?;

    let mut kept = Vec::new();
    for (index, record) in set.records.iter().enumerate() {
        let value = record.get(field).unwrap_or(&Value::Null);
        match parse_date_value(value) {
            Some(date) if range.contains(date) => kept.push(record.clone()),
            Some(_) => {}
            None => sink.row_skipped(
                source,
                &RowValidationError::new(index as u64 + 1, field, &value.to_string(), "expected YYYY-MM-DD"),
            ),
        }
    }
    Ok(set.with_records(kept))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Record;
    use crate::utils::diagnostics::CollectingSink;
    use serde_json::json;

    fn customers() -> RecordSet {
        let rows = vec![
            json!({"id": 1, "created_date": "2024-01-05", "opt_in": "Y"}),
            json!({"id": 2, "created_date": "2024-01-20", "opt_in": "N"}),
            json!({"id": 3, "created_date": "2024-02-10", "opt_in": false}),
            json!({"id": 4, "created_date": "2023-12-31", "opt_in": true}),
        ];
        RecordSet::from_records(
            rows.into_iter()
                .map(|v| Record::new(v.as_object().cloned().unwrap()))
                .collect(),
        )
    }

    fn ids(set: &RecordSet) -> Vec<i64> {
        set.records.iter().map(|r| r.get("id").unwrap().as_i64().unwrap()).collect()
    }

    #[test]
    fn test_filter_not_opted_in() {
        let filtered = filter_by_field(&customers(), "opt_in", &json!(false)).unwrap();
        assert_eq!(ids(&filtered), vec![2, 3]);
        assert_eq!(filtered.columns, customers().columns);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let once = filter_by_field(&customers(), "opt_in", &json!(false)).unwrap();
        let twice = filter_by_field(&once, "opt_in", &json!(false)).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_filter_exact_string_target() {
        let filtered = filter_by_field(&customers(), "opt_in", &json!("N")).unwrap();
        assert_eq!(ids(&filtered), vec![2]);
    }

    #[test]
    fn test_filter_unknown_field() {
        let err = filter_by_field(&customers(), "consent", &json!(false)).unwrap_err();
        assert!(matches!(err, EtlError::FieldNotFound { ref field, .. } if field == "consent"));
    }

    #[test]
    fn test_string_target_matches_numbers() {
        assert!(value_matches(&json!(5), &json!("5")));
        assert!(value_matches(&json!("5"), &json!(5)));
        assert!(value_matches(&json!(true), &json!("Y")));
        assert!(!value_matches(&json!("x"), &json!(false)));
    }

    #[test]
    fn test_date_range_parsing() {
        let range: DateRange = "2024-01-01 to 2024-01-31".parse().unwrap();
        assert_eq!(range.to_string(), "2024-01-01 to 2024-01-31");
        assert!("2024-01-01..2024-01-31".parse::<DateRange>().is_ok());
        assert!("2024-02-01 to 2024-01-01".parse::<DateRange>().is_err());
        assert!("January".parse::<DateRange>().is_err());
    }

    #[test]
    fn test_filter_by_date_range_is_inclusive() {
        let range: DateRange = "2024-01-05 to 2024-01-31".parse().unwrap();
        let sink = CollectingSink::new();
        let filtered = filter_by_date_range(&customers(), "created_date", &range, "customers.json", &sink).unwrap();
        assert_eq!(ids(&filtered), vec![1, 2]);
        assert_eq!(sink.count(), 0);
    }
}
