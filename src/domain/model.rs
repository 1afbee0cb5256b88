use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A loosely typed row: field name to scalar value, in source column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }
}

/// Records together with the schema they were loaded under.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    /// Column names in first-seen order.
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>, records: Vec<Record>) -> Self {
        Self { columns, records }
    }

    /// Builds a set whose schema is the union of the records' keys.
    #[cfg(test)]
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for key in record.data.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        Self { columns, records }
    }

    pub fn has_column(&self, field: &str) -> bool {
        self.columns.iter().any(|c| c == field)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Same schema, different rows.
    pub fn with_records(&self, records: Vec<Record>) -> Self {
        Self {
            columns: self.columns.clone(),
            records,
        }
    }
}

/// Which keys a customer entry must carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSchema {
    pub opt_in_field: String,
    pub created_field: String,
}

impl Default for CustomerSchema {
    fn default() -> Self {
        Self {
            opt_in_field: "opt_in".to_string(),
            created_field: "created_date".to_string(),
        }
    }
}

impl CustomerSchema {
    pub fn required_fields(&self) -> [&str; 2] {
        [self.opt_in_field.as_str(), self.created_field.as_str()]
    }
}

/// Typed view of one customer entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerRecord {
    pub id: Option<Value>,
    pub name: Option<String>,
    pub created_date: NaiveDate,
    pub opt_in: bool,
    /// Every other field, untouched.
    pub extra: Map<String, Value>,
}

impl CustomerRecord {
    /// Builds the typed view from a validated record. `None` when `opt_in` is
    /// not bool-like or the created date does not parse.
    pub fn from_record(record: &Record, schema: &CustomerSchema) -> Option<Self> {
        let opt_in = parse_bool_like(record.get(&schema.opt_in_field)?)?;
        let created_date = parse_date_value(record.get(&schema.created_field)?)?;
        let extra = record
            .data
            .iter()
            .filter(|(k, _)| {
                !matches!(k.as_str(), "id" | "name") && !schema.required_fields().contains(&k.as_str())
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Some(Self {
            id: record.get("id").cloned(),
            name: record.get("name").and_then(|v| v.as_str()).map(str::to_string),
            created_date,
            opt_in,
            extra,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub date: NaiveDate,
    pub category: String,
    pub amount: f64,
    pub description: String,
}

/// Per-category figures handed to the advisor and written to the savings report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub total_spent: f64,
    pub transaction_count: usize,
    pub average_transaction: f64,
    pub percentage_of_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SavingsProjection {
    Projected {
        annual_savings: f64,
        /// Savings over the period covered by the data.
        period_savings: f64,
        distinct_days: usize,
    },
    InsufficientData {
        reason: String,
    },
}

impl SavingsProjection {
    pub fn annual_savings(&self) -> Option<f64> {
        match self {
            SavingsProjection::Projected { annual_savings, .. } => Some(*annual_savings),
            SavingsProjection::InsufficientData { .. } => None,
        }
    }
}

/// Loader output plus how many rows were skipped on the way.
#[derive(Debug, Clone, Default)]
pub struct Loaded<T> {
    pub data: T,
    pub skipped_rows: usize,
}

/// Outcome of one pipeline run, as shown to the user.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub pipeline: String,
    pub written: Vec<String>,
    pub rows_in: usize,
    pub rows_out: usize,
    pub skipped_rows: usize,
    /// Free-form text from the advisor, displayed verbatim.
    pub advice: Option<String>,
    /// Pre-rendered tables for the presentation layer.
    pub tables: Vec<(String, String)>,
}

/// Accepts `Y`/`N`, `yes`/`no`, `true`/`false`, `1`/`0` and JSON booleans.
pub fn parse_bool_like(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" | "true" | "1" => Some(true),
            "n" | "no" | "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Parses `YYYY-MM-DD`, also accepting a longer timestamp that starts with one.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| raw.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

pub fn parse_date_value(value: &Value) -> Option<NaiveDate> {
    value.as_str().and_then(parse_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => Record::new(map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_parse_bool_like() {
        assert_eq!(parse_bool_like(&json!("Y")), Some(true));
        assert_eq!(parse_bool_like(&json!("n")), Some(false));
        assert_eq!(parse_bool_like(&json!(false)), Some(false));
        assert_eq!(parse_bool_like(&json!(1)), Some(true));
        assert_eq!(parse_bool_like(&json!("maybe")), None);
        assert_eq!(parse_bool_like(&json!(null)), None);
    }

    #[test]
    fn test_parse_date_accepts_timestamp_prefix() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(parse_date("2024-01-15"), Some(expected));
        assert_eq!(parse_date("2024-01-15T10:30:00Z"), Some(expected));
        assert_eq!(parse_date("15/01/2024"), None);
        assert_eq!(parse_date("bad-date"), None);
    }

    #[test]
    fn test_record_set_schema_is_union_in_first_seen_order() {
        let set = RecordSet::from_records(vec![
            record(json!({"id": 1, "name": "Ann"})),
            record(json!({"id": 2, "email": "b@example.com"})),
        ]);
        assert_eq!(set.columns, vec!["id", "name", "email"]);
        assert!(set.has_column("email"));
        assert!(!set.has_column("opt_in"));
    }

    #[test]
    fn test_customer_from_record() {
        let r = record(json!({
            "id": 7,
            "name": "Ann",
            "created_date": "2024-02-01",
            "opt_in": "N",
            "email": "ann@example.com"
        }));
        let customer = CustomerRecord::from_record(&r, &CustomerSchema::default()).unwrap();
        assert!(!customer.opt_in);
        assert_eq!(customer.name.as_deref(), Some("Ann"));
        assert_eq!(customer.extra.len(), 1);
        assert!(customer.extra.contains_key("email"));
    }
}
