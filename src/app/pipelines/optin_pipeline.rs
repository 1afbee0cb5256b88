use crate::adapters::request_advice;
use crate::config::toml_config::TomlConfig;
use crate::core::filter::{filter_by_date_range, filter_by_field};
use crate::core::loader::load_customers;
use crate::core::reporter::Reporter;
use crate::core::{Advisor, DiagnosticSink, Pipeline, RecordSet, Storage};
use crate::domain::model::{CustomerRecord, Loaded, RunReport};
use crate::domain::ports::AdvisoryRequest;
use crate::utils::diagnostics::CountingSink;
use crate::utils::error::Result;
use crate::utils::table::render_records_table;
use chrono::NaiveDateTime;
use std::sync::Arc;

const ADVISOR_TASK: &str = "Identify the customers who have not opted in to marketing emails \
and suggest how to ask them for consent.";

/// Result of filtering customers: the full set and the selected subset.
#[derive(Debug, Clone)]
pub struct OptInOutput {
    pub customers: RecordSet,
    pub selected: RecordSet,
    pub skipped_rows: usize,
}

/// Customer opt-in pipeline: load customers, optionally narrow to a created
/// date range, keep those whose opt-in field equals the configured value.
pub struct OptInPipeline<S: Storage> {
    input: S,
    reporter: Reporter<S>,
    config: TomlConfig,
    sink: Arc<dyn DiagnosticSink>,
    advisor: Option<Box<dyn Advisor>>,
}

impl<S: Storage> OptInPipeline<S> {
    pub fn new(input: S, output: S, config: TomlConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        let reporter = Reporter::new(output, config.optin.naming);
        Self {
            input,
            reporter,
            config,
            sink,
            advisor: None,
        }
    }

    pub fn with_advisor(mut self, advisor: Box<dyn Advisor>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    /// Fixes the timestamp used for timestamped output names.
    pub fn with_run_timestamp(mut self, at: NaiveDateTime) -> Self {
        self.reporter = self.reporter.with_run_timestamp(at);
        self
    }

    /// Typed customer views, as handed to the advisor.
    pub fn typed_customers(&self, set: &RecordSet) -> Vec<CustomerRecord> {
        let schema = self.config.optin.schema();
        set.records
            .iter()
            .filter_map(|r| CustomerRecord::from_record(r, &schema))
            .collect()
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for OptInPipeline<S> {
    type Loaded = Loaded<RecordSet>;
    type Output = OptInOutput;

    fn name(&self) -> &str {
        "opt-in"
    }

    async fn extract(&self) -> Result<Self::Loaded> {
        let sink = CountingSink::new(self.sink.as_ref());
        let customers =
            load_customers(&self.input, &self.config.optin.input, &self.config.optin.schema(), &sink).await?;

        Ok(Loaded {
            data: customers,
            skipped_rows: sink.count(),
        })
    }

    async fn transform(&self, data: Self::Loaded) -> Result<Self::Output> {
        let optin = &self.config.optin;
        let customers = data.data;
        let sink = CountingSink::new(self.sink.as_ref());

        let in_range = match optin.date_range()? {
            Some(range) => {
                let narrowed = filter_by_date_range(&customers, &optin.created_field, &range, &optin.input, &sink)?;
                tracing::info!("📅 {} of {} customers created {}", narrowed.len(), customers.len(), range);
                narrowed
            }
            None => customers.clone(),
        };

        let selected = filter_by_field(&in_range, &optin.filter_field, &optin.filter_value)?;
        tracing::info!(
            "🔍 {} customer(s) with {} = {}",
            selected.len(),
            optin.filter_field,
            optin.filter_value
        );

        Ok(OptInOutput {
            customers,
            selected,
            skipped_rows: data.skipped_rows + sink.count(),
        })
    }

    async fn load(&self, output: Self::Output) -> Result<RunReport> {
        let mut written = Vec::new();
        for format in self.config.parsed_output_formats()? {
            let path = self
                .reporter
                .write_records(&output.selected, &self.config.optin.output_prefix, format)
                .await?;
            written.push(path);
        }

        let customers = self.typed_customers(&output.customers);
        let request = AdvisoryRequest::new(
            ADVISOR_TASK,
            serde_json::json!({
                "not_opted_in": customers.iter().filter(|c| !c.opt_in).count(),
                "customers": customers,
            }),
        );
        let advice = request_advice(self.advisor.as_deref(), request).await;

        Ok(RunReport {
            pipeline: self.name().to_string(),
            written,
            rows_in: output.customers.len(),
            rows_out: output.selected.len(),
            skipped_rows: output.skipped_rows,
            advice,
            tables: vec![
                ("Customers".to_string(), render_records_table(&output.customers)),
                ("Selected customers".to_string(), render_records_table(&output.selected)),
            ],
        })
    }
}
