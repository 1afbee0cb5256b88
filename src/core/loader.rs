//! Reading source files into validated records.
//!
//! Fatal problems (missing file, missing column) abort the load. Bad values in
//! a single row are reported to the [`DiagnosticSink`] and the row is skipped.

use crate::core::{DiagnosticSink, Storage};
use crate::domain::model::{
    parse_bool_like, parse_date_value, CustomerSchema, ExpenseRecord, Record, RecordSet,
};
use crate::utils::error::{EtlError, Result, RowValidationError};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::io::Read;

pub const EXPENSE_COLUMNS: [&str; 4] = ["date", "category", "amount", "description"];

/// Parses an expense CSV, returning rows sorted ascending by date.
pub fn parse_expenses<R: Read>(
    reader: R,
    source: &str,
    sink: &dyn DiagnosticSink,
) -> Result<Vec<ExpenseRecord>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let position = |name: &str| headers.iter().position(|h| h.trim() == name);
    let missing: Vec<&str> = EXPENSE_COLUMNS
        .iter()
        .copied()
        .filter(|c| position(c).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(EtlError::schema(
            source,
            format!("missing required column(s): {}", missing.join(", ")),
        ));
    }
    let [date_idx, category_idx, amount_idx, description_idx] =
        EXPENSE_COLUMNS.map(|c| position(c).unwrap_or_default());

    let mut expenses = Vec::new();
    for result in rdr.byte_records() {
        let raw = result?;
        let line = raw.position().map(|p| p.line()).unwrap_or_default();

        if raw.len() != headers.len() {
            sink.row_skipped(
                source,
                &RowValidationError::new(
                    line,
                    "row",
                    &raw.len().to_string(),
                    format!("expected {} fields, found {}", headers.len(), raw.len()),
                ),
            );
            continue;
        }

        let row = match csv::StringRecord::from_byte_record(raw) {
            Ok(row) => row,
            Err(e) => {
                let index = e.utf8_error().field();
                let field = headers.get(index).unwrap_or("row");
                let value = String::from_utf8_lossy(e.into_byte_record().get(index).unwrap_or_default()).into_owned();
                sink.row_skipped(source, &RowValidationError::new(line, field, &value, "invalid UTF-8"));
                continue;
            }
        };

        let raw_amount = row.get(amount_idx).unwrap_or_default();
        let amount = match raw_amount.trim().parse::<f64>() {
            Ok(amount) if amount.is_finite() => amount,
            Ok(_) => {
                sink.row_skipped(source, &RowValidationError::new(line, "amount", raw_amount, "amount must be a finite number"));
                continue;
            }
            Err(e) => {
                sink.row_skipped(source, &RowValidationError::new(line, "amount", raw_amount, e.to_string()));
                continue;
            }
        };

        let raw_date = row.get(date_idx).unwrap_or_default();
        let date = match NaiveDate::parse_from_str(raw_date.trim(), "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                sink.row_skipped(source, &RowValidationError::new(line, "date", raw_date, "expected YYYY-MM-DD"));
                continue;
            }
        };

        expenses.push(ExpenseRecord {
            date,
            category: row.get(category_idx).unwrap_or_default().to_string(),
            amount,
            description: row.get(description_idx).unwrap_or_default().to_string(),
        });
    }

    // Stable, so same-day rows keep their file order.
    expenses.sort_by_key(|e| e.date);
    Ok(expenses)
}

/// Parses a JSON array of customer objects, keeping source order.
pub fn parse_customers(
    bytes: &[u8],
    source: &str,
    schema: &CustomerSchema,
    sink: &dyn DiagnosticSink,
) -> Result<RecordSet> {
    let document: Value = serde_json::from_slice(bytes)?;
    let Value::Array(items) = document else {
        return Err(EtlError::schema(source, "expected a JSON array of customer objects"));
    };

    let mut columns: Vec<String> = Vec::new();
    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let line = index as u64 + 1;
        let Value::Object(data) = item else {
            return Err(EtlError::schema(source, format!("entry {} is not an object", line)));
        };
        add_columns(&mut columns, data.keys().map(String::as_str));

        let missing: Vec<&str> = schema
            .required_fields()
            .into_iter()
            .filter(|f| !data.contains_key(*f))
            .collect();
        if !missing.is_empty() {
            return Err(EtlError::schema(
                source,
                format!("entry {} is missing required key(s): {}", line, missing.join(", ")),
            ));
        }

        let opt_in = &data[schema.opt_in_field.as_str()];
        if parse_bool_like(opt_in).is_none() {
            sink.row_skipped(source, &RowValidationError::new(line, &schema.opt_in_field, &value_text(opt_in), "expected Y/N or true/false"));
            continue;
        }
        let created = &data[schema.created_field.as_str()];
        if parse_date_value(created).is_none() {
            sink.row_skipped(source, &RowValidationError::new(line, &schema.created_field, &value_text(created), "expected YYYY-MM-DD"));
            continue;
        }

        records.push(Record::new(data));
    }

    // Skipped and empty files still expose the schema's fields.
    add_columns(&mut columns, schema.required_fields());
    Ok(RecordSet::new(columns, records))
}

fn add_columns<'a>(columns: &mut Vec<String>, keys: impl IntoIterator<Item = &'a str>) {
    for key in keys {
        if !columns.iter().any(|c| c == key) {
            columns.push(key.to_string());
        }
    }
}

/// Reads any CSV with a header row; every value stays a string.
pub fn parse_records_csv<R: Read>(reader: R) -> Result<RecordSet> {
    let mut rdr = csv::Reader::from_reader(reader);
    let columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        let data: Map<String, Value> = columns
            .iter()
            .zip(row.iter())
            .map(|(c, v)| (c.clone(), Value::String(v.to_string())))
            .collect();
        records.push(Record::new(data));
    }

    Ok(RecordSet::new(columns, records))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub async fn load_expenses<S: Storage>(
    storage: &S,
    path: &str,
    sink: &dyn DiagnosticSink,
) -> Result<Vec<ExpenseRecord>> {
    tracing::debug!("Reading expenses from: {}", path);
    let bytes = storage.read_file(path).await?;
    let expenses = parse_expenses(bytes.as_slice(), path, sink)?;
    tracing::info!("📥 Loaded {} expense records from {}", expenses.len(), path);
    Ok(expenses)
}

pub async fn load_customers<S: Storage>(
    storage: &S,
    path: &str,
    schema: &CustomerSchema,
    sink: &dyn DiagnosticSink,
) -> Result<RecordSet> {
    tracing::debug!("Reading customers from: {}", path);
    let bytes = storage.read_file(path).await?;
    let customers = parse_customers(&bytes, path, schema, sink)?;
    tracing::info!("📥 Loaded {} customer records from {}", customers.len(), path);
    Ok(customers)
}

pub async fn load_records_csv<S: Storage>(storage: &S, path: &str) -> Result<RecordSet> {
    let bytes = storage.read_file(path).await?;
    parse_records_csv(bytes.as_slice())
}
