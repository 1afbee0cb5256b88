pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use args::{CliConfig, Command, OptInArgs, SavingsArgs};

#[cfg(feature = "cli")]
mod args {
    use super::toml_config::TomlConfig;
    use crate::core::reporter::OutputNaming;
    use crate::utils::error::Result;
    use crate::utils::logger::LogFormat;
    use clap::{Args, Parser, Subcommand};
    use serde_json::Value;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "optin-savings")]
    #[command(about = "Customer opt-in filtering and expense savings planning")]
    pub struct CliConfig {
        /// Path to a TOML configuration file
        #[arg(short, long, global = true)]
        pub config: Option<String>,

        /// Directory the reports are written to
        #[arg(long, global = true)]
        pub output_path: Option<String>,

        /// Comma separated output formats (csv, json)
        #[arg(long, value_delimiter = ',', global = true)]
        pub output_formats: Vec<String>,

        /// Output file naming, overriding the pipeline's default
        #[arg(long, value_enum, global = true)]
        pub naming: Option<OutputNaming>,

        /// Enable verbose output
        #[arg(short, long, global = true)]
        pub verbose: bool,

        /// Log CPU and memory usage per phase
        #[arg(long, global = true)]
        pub monitor: bool,

        #[arg(long, value_enum, default_value = "compact", global = true)]
        pub log_format: LogFormat,

        /// Enable the advisor and send requests to this endpoint
        #[arg(long, global = true)]
        pub advisor_endpoint: Option<String>,

        /// Never contact the advisor, even if the config enables it
        #[arg(long, global = true)]
        pub no_advisor: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// Select customers by their opt-in flag and write them to a file
        Optin(OptInArgs),
        /// Summarise expenses per category and project annual savings
        Savings(SavingsArgs),
    }

    #[derive(Debug, Clone, Args)]
    pub struct OptInArgs {
        /// Customers JSON file
        #[arg(long)]
        pub input: Option<String>,

        /// Created-date range, e.g. "2024-01-01 to 2024-03-31"
        #[arg(long)]
        pub date_range: Option<String>,

        #[arg(long)]
        pub filter_field: Option<String>,

        /// Value to keep; parsed as JSON when possible, e.g. `false`, `"N"`, `3`
        #[arg(long)]
        pub filter_value: Option<String>,
    }

    #[derive(Debug, Clone, Args)]
    pub struct SavingsArgs {
        /// Expenses CSV file
        #[arg(long)]
        pub input: Option<String>,

        /// Reduction target as Category=percent, may be repeated
        #[arg(long = "target", value_parser = parse_target)]
        pub targets: Vec<(String, f64)>,
    }

    fn parse_target(s: &str) -> std::result::Result<(String, f64), String> {
        let (category, pct) = s
            .split_once('=')
            .ok_or_else(|| format!("expected Category=percent, got '{}'", s))?;
        let pct = pct
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid percent '{}': {}", pct, e))?;
        Ok((category.trim().to_string(), pct))
    }

    fn parse_filter_value(s: &str) -> Value {
        serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))
    }

    impl CliConfig {
        /// Loads the TOML file, if any, and applies the command-line overrides.
        pub fn resolve(&self) -> Result<TomlConfig> {
            let mut config = match &self.config {
                Some(path) => {
                    tracing::info!("📁 Loading configuration from: {}", path);
                    TomlConfig::from_file(path)?
                }
                None => TomlConfig::default(),
            };

            if let Some(path) = &self.output_path {
                config.load.output_path = path.clone();
            }
            if !self.output_formats.is_empty() {
                config.load.output_formats = self.output_formats.clone();
            }
            if self.monitor {
                config.monitoring.enabled = true;
            }
            if let Some(endpoint) = &self.advisor_endpoint {
                config.advisor.enabled = true;
                config.advisor.endpoint = Some(endpoint.clone());
            }
            if self.no_advisor {
                config.advisor.enabled = false;
            }

            match &self.command {
                Command::Optin(args) => {
                    if let Some(input) = &args.input {
                        config.optin.input = input.clone();
                    }
                    if let Some(range) = &args.date_range {
                        config.optin.date_range = Some(range.clone());
                    }
                    if let Some(field) = &args.filter_field {
                        config.optin.filter_field = field.clone();
                    }
                    if let Some(value) = &args.filter_value {
                        config.optin.filter_value = parse_filter_value(value);
                    }
                    if let Some(naming) = self.naming {
                        config.optin.naming = naming;
                    }
                }
                Command::Savings(args) => {
                    if let Some(input) = &args.input {
                        config.savings.input = input.clone();
                    }
                    for (category, pct) in &args.targets {
                        config.savings.reduction_targets.insert(category.clone(), *pct);
                    }
                    if let Some(naming) = self.naming {
                        config.savings.naming = naming;
                    }
                }
            }

            Ok(config)
        }
    }

}
