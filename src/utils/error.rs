use thiserror::Error;

/// A single row that failed validation during loading. Reported to the
/// diagnostic sink; the row is skipped and the run continues.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("row {line}: invalid {field} '{value}': {reason}")]
pub struct RowValidationError {
    pub line: u64,
    pub field: String,
    pub value: String,
    pub reason: String,
}

impl RowValidationError {
    pub fn new(line: u64, field: &str, value: &str, reason: impl Into<String>) -> Self {
        Self {
            line,
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Input file not found: {path}")]
    NotFound { path: String },

    #[error("Schema error in {source_name}: {message}")]
    SchemaError { source_name: String, message: String },

    #[error("Field '{field}' not found in record schema (available: {available})")]
    FieldNotFound { field: String, available: String },

    #[error("Advisor request failed: {0}")]
    AdvisorError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Data,
    Configuration,
    External,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn schema(source_name: &str, message: impl Into<String>) -> Self {
        EtlError::SchemaError {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::NotFound { .. } | EtlError::SchemaError { .. } => ErrorCategory::Input,
            EtlError::FieldNotFound { .. }
            | EtlError::CsvError(_)
            | EtlError::SerializationError(_) => ErrorCategory::Data,
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            EtlError::AdvisorError(_) => ErrorCategory::External,
            EtlError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::AdvisorError(_) => ErrorSeverity::Medium,
            EtlError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::NotFound { path } => {
                format!("Check that '{}' exists and the path is correct", path)
            }
            EtlError::SchemaError { .. } => {
                "Expense CSV files must contain the columns: date,category,amount,description; \
                 customer JSON files must be an array of objects with opt_in and a created date"
                    .to_string()
            }
            EtlError::FieldNotFound { available, .. } => {
                format!("Filter on one of the available fields: {}", available)
            }
            EtlError::AdvisorError(_) => {
                "Check the advisor endpoint and credentials, then retry".to_string()
            }
            EtlError::CsvError(_) => "Check the CSV file for malformed quoting".to_string(),
            EtlError::IoError(_) => "Check file permissions and free disk space".to_string(),
            EtlError::SerializationError(_) => "Check that the file is valid JSON".to_string(),
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => {
                "Review the configuration file and command line flags".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::NotFound { path } => format!("Could not find input file: {}", path),
            EtlError::SchemaError { message, .. } => format!("The input file is missing data: {}", message),
            EtlError::FieldNotFound { field, .. } => {
                format!("Cannot filter on '{}': no such field", field)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
