use crate::core::filter::DateRange;
use crate::core::reporter::{OutputFormat, OutputNaming};
use crate::domain::model::CustomerSchema;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub optin: OptInConfig,
    #[serde(default)]
    pub savings: SavingsConfig,
    #[serde(default)]
    pub load: LoadConfig,
    #[serde(default)]
    pub advisor: AdvisorConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "optin-savings".to_string(),
            description: String::new(),
        }
    }
}

/// Customer opt-in pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptInConfig {
    pub input: String,
    pub opt_in_field: String,
    pub created_field: String,
    pub filter_field: String,
    /// Records whose `filter_field` equals this value are kept.
    pub filter_value: serde_json::Value,
    /// `YYYY-MM-DD to YYYY-MM-DD`, applied to `created_field` before filtering.
    pub date_range: Option<String>,
    pub output_prefix: String,
    pub naming: OutputNaming,
}

impl Default for OptInConfig {
    fn default() -> Self {
        let schema = CustomerSchema::default();
        Self {
            input: "data/customers.json".to_string(),
            filter_field: schema.opt_in_field.clone(),
            opt_in_field: schema.opt_in_field,
            created_field: schema.created_field,
            filter_value: serde_json::Value::Bool(false),
            date_range: None,
            output_prefix: "filtered_customers".to_string(),
            naming: OutputNaming::Fixed,
        }
    }
}

impl OptInConfig {
    pub fn schema(&self) -> CustomerSchema {
        CustomerSchema {
            opt_in_field: self.opt_in_field.clone(),
            created_field: self.created_field.clone(),
        }
    }

    pub fn date_range(&self) -> Result<Option<DateRange>> {
        self.date_range.as_deref().map(str::parse::<DateRange>).transpose()
    }
}

/// Savings planner pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SavingsConfig {
    pub input: String,
    /// Category to percentage (0-100) reduction.
    pub reduction_targets: BTreeMap<String, f64>,
    pub naming: OutputNaming,
}

impl Default for SavingsConfig {
    fn default() -> Self {
        Self {
            input: "data/expenses.csv".to_string(),
            reduction_targets: BTreeMap::new(),
            naming: OutputNaming::Timestamped,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            output_formats: vec!["csv".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            api_key: None,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl TomlConfig {
    /// Loads and parses a TOML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EtlError::NotFound {
                path: path.display().to_string(),
            },
            _ => EtlError::IoError(e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from TOML text, after environment substitution.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unset variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn parsed_output_formats(&self) -> Result<Vec<OutputFormat>> {
        self.load.output_formats.iter().map(|f| f.parse()).collect()
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }

    /// Checks paths, formats, field names, reduction targets and the advisor endpoint.
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("load.output_path", &self.load.output_path)?;
        if self.parsed_output_formats()?.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "load.output_formats".to_string(),
            });
        }

        validation::validate_file_extension("optin.input", &self.optin.input, &["json"])?;
        validation::validate_non_empty_string("optin.opt_in_field", &self.optin.opt_in_field)?;
        validation::validate_non_empty_string("optin.created_field", &self.optin.created_field)?;
        validation::validate_non_empty_string("optin.filter_field", &self.optin.filter_field)?;
        validation::validate_non_empty_string("optin.output_prefix", &self.optin.output_prefix)?;
        self.optin.date_range()?;

        validation::validate_file_extension("savings.input", &self.savings.input, &["csv"])?;
        for (category, pct) in &self.savings.reduction_targets {
            validation::validate_range(
                &format!("savings.reduction_targets.{}", category),
                *pct,
                0.0,
                100.0,
            )?;
        }

        if self.advisor.enabled {
            let endpoint = validation::validate_required_field("advisor.endpoint", &self.advisor.endpoint)?;
            validation::validate_url("advisor.endpoint", endpoint)?;
            validation::validate_positive_number("advisor.timeout_seconds", self.advisor.timeout_seconds, 1)?;
        }

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[pipeline]
name = "crew-data"
description = "Opt-in and savings pipelines"

[optin]
input = "data/customers.json"
filter_value = "N"
date_range = "2024-01-01 to 2024-01-31"
naming = "timestamped"

[savings]
input = "data/expenses.csv"

[savings.reduction_targets]
Food = 10
Entertainment = 25.5

[load]
output_path = "./test-output"
output_formats = ["csv", "json"]
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.pipeline.name, "crew-data");
        assert_eq!(config.optin.filter_value, serde_json::json!("N"));
        assert_eq!(config.optin.filter_field, "opt_in");
        assert_eq!(config.optin.naming, OutputNaming::Timestamped);
        assert!(config.optin.date_range().unwrap().is_some());
        assert_eq!(config.savings.reduction_targets["Food"], 10.0);
        assert_eq!(config.savings.naming, OutputNaming::Timestamped);
        assert_eq!(
            config.parsed_output_formats().unwrap(),
            vec![OutputFormat::Csv, OutputFormat::Json]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.optin.input, "data/customers.json");
        assert_eq!(config.optin.filter_value, serde_json::Value::Bool(false));
        assert_eq!(config.optin.naming, OutputNaming::Fixed);
        assert_eq!(config.savings.naming, OutputNaming::Timestamped);
        assert!(!config.advisor.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_ADVISOR_ENDPOINT", "https://advisor.example.com/v1/advise");

        let toml_content = r#"
[advisor]
enabled = true
endpoint = "${TEST_ADVISOR_ENDPOINT}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.advisor.endpoint.as_deref(),
            Some("https://advisor.example.com/v1/advise")
        );
        assert!(config.validate().is_ok());

        std::env::remove_var("TEST_ADVISOR_ENDPOINT");
    }

    #[test]
    fn test_config_validation() {
        let out_of_range = r#"
[savings.reduction_targets]
Food = 120
"#;
        let config = TomlConfig::from_toml_str(out_of_range).unwrap();
        assert!(config.validate().is_err());

        let advisor_without_endpoint = r#"
[advisor]
enabled = true
"#;
        let config = TomlConfig::from_toml_str(advisor_without_endpoint).unwrap();
        assert!(matches!(
            config.validate(),
            Err(EtlError::MissingConfigError { .. })
        ));

        let bad_format = r#"
[load]
output_formats = ["tsv"]
"#;
        let config = TomlConfig::from_toml_str(bad_format).unwrap();
        assert!(config.validate().is_err());

        let wrong_extension = r#"
[savings]
input = "data/expenses.xlsx"
"#;
        let config = TomlConfig::from_toml_str(wrong_extension).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[pipeline]
name = "file-test"

[load]
output_path = "./output"
output_formats = ["csv"]
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.pipeline.name, "file-test");
    }

    #[test]
    fn test_missing_config_file() {
        let err = TomlConfig::from_file("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, EtlError::NotFound { .. }));
    }
}
