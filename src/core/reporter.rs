//! Writing records and statistics to CSV or JSON files.
//!
//! Each pipeline picks one [`OutputNaming`] convention and sticks to it. A
//! reporter captures its timestamp once, so every file of one run shares it.

use crate::core::Storage;
use crate::domain::model::RecordSet;
use crate::utils::error::{EtlError, Result};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(EtlError::InvalidConfigValueError {
                field: "load.output_formats".to_string(),
                value: other.to_string(),
                reason: "Unsupported format. Valid formats: csv, json".to_string(),
            }),
        }
    }
}

/// How output files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputNaming {
    /// `<prefix>.<ext>`; a later run overwrites an earlier one.
    Fixed,
    /// `YYYYMMDD_HHMMSS_<prefix>.<ext>`; unique per run.
    Timestamped,
}

impl OutputNaming {
    pub fn file_name(&self, prefix: &str, format: OutputFormat, at: NaiveDateTime) -> String {
        match self {
            OutputNaming::Fixed => format!("{}.{}", prefix, format.extension()),
            OutputNaming::Timestamped => format!(
                "{}_{}.{}",
                at.format("%Y%m%d_%H%M%S"),
                prefix,
                format.extension()
            ),
        }
    }
}

impl fmt::Display for OutputNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputNaming::Fixed => write!(f, "fixed"),
            OutputNaming::Timestamped => write!(f, "timestamped"),
        }
    }
}

pub struct Reporter<S: Storage> {
    storage: S,
    naming: OutputNaming,
    run_started_at: NaiveDateTime,
}

impl<S: Storage> Reporter<S> {
    pub fn new(storage: S, naming: OutputNaming) -> Self {
        Self::with_timestamp(storage, naming, Local::now().naive_local())
    }

    pub fn with_timestamp(storage: S, naming: OutputNaming, run_started_at: NaiveDateTime) -> Self {
        Self {
            storage,
            naming,
            run_started_at,
        }
    }

    pub fn with_run_timestamp(mut self, run_started_at: NaiveDateTime) -> Self {
        self.run_started_at = run_started_at;
        self
    }

    pub fn naming(&self) -> OutputNaming {
        self.naming
    }

    async fn write(&self, prefix: &str, format: OutputFormat, data: &[u8]) -> Result<String> {
        let file_name = self.naming.file_name(prefix, format, self.run_started_at);
        tracing::debug!("Writing {} bytes to {}", data.len(), file_name);
        self.storage.write_file(&file_name, data).await?;

        let location = self.storage.location(&file_name);
        tracing::info!("📁 Wrote {}", location);
        Ok(location)
    }

    /// One row per record, columns in schema order.
    pub async fn write_records(&self, set: &RecordSet, prefix: &str, format: OutputFormat) -> Result<String> {
        let data = match format {
            OutputFormat::Csv => records_to_csv(set)?,
            OutputFormat::Json => serde_json::to_vec_pretty(&set.records.iter().map(|r| &r.data).collect::<Vec<_>>())?,
        };
        self.write(prefix, format, &data).await
    }

    /// Key/value statistics: two CSV columns, or a JSON object.
    pub async fn write_stats(
        &self,
        stats: &BTreeMap<String, f64>,
        prefix: &str,
        key_header: &str,
        value_header: &str,
        format: OutputFormat,
    ) -> Result<String> {
        let data = match format {
            OutputFormat::Csv => stats_to_csv(stats, key_header, value_header)?,
            OutputFormat::Json => serde_json::to_vec_pretty(stats)?,
        };
        self.write(prefix, format, &data).await
    }

    pub async fn write_json<T: Serialize + Sync>(&self, value: &T, prefix: &str) -> Result<String> {
        let data = serde_json::to_vec_pretty(value)?;
        self.write(prefix, OutputFormat::Json, &data).await
    }
}

fn csv_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn records_to_csv(set: &RecordSet) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&set.columns)?;
    for record in &set.records {
        writer.write_record(set.columns.iter().map(|c| csv_cell(record.get(c))))?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

pub fn stats_to_csv(stats: &BTreeMap<String, f64>, key_header: &str, value_header: &str) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([key_header, value_header])?;
    for (key, value) in stats {
        writer.write_record([key.as_str(), value.to_string().as_str()])?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}
