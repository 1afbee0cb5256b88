use crate::adapters::request_advice;
use crate::config::toml_config::TomlConfig;
use crate::core::aggregator::{category_breakdown, category_totals, daily_averages, project_annual_savings};
use crate::core::loader::load_expenses;
use crate::core::reporter::Reporter;
use crate::core::{Advisor, DiagnosticSink, ExpenseRecord, Pipeline, Record, RecordSet, Storage};
use crate::domain::model::{CategoryBreakdown, Loaded, RunReport, SavingsProjection};
use crate::domain::ports::AdvisoryRequest;
use crate::utils::diagnostics::CountingSink;
use crate::utils::error::Result;
use crate::utils::table::{render_records_table, render_stats_table};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

const ADVISOR_TASK: &str = "Analyze these expenses: point out recurring spending, flag unusual \
transactions and recommend where spending can be reduced.";

#[derive(Debug, Clone, Serialize)]
pub struct SavingsOutput {
    #[serde(skip)]
    pub expenses: Vec<ExpenseRecord>,
    pub category_totals: BTreeMap<String, f64>,
    /// Per-transaction averages; see [`daily_averages`].
    pub daily_averages: BTreeMap<String, f64>,
    pub category_breakdown: BTreeMap<String, CategoryBreakdown>,
    pub reduction_targets: BTreeMap<String, f64>,
    pub projection: SavingsProjection,
    #[serde(skip)]
    pub skipped_rows: usize,
}

/// Savings planner pipeline: load expenses, aggregate per category, project
/// savings from the configured reduction targets.
pub struct SavingsPipeline<S: Storage> {
    input: S,
    reporter: Reporter<S>,
    config: TomlConfig,
    sink: Arc<dyn DiagnosticSink>,
    advisor: Option<Box<dyn Advisor>>,
}

impl<S: Storage> SavingsPipeline<S> {
    pub fn new(input: S, output: S, config: TomlConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        let reporter = Reporter::new(output, config.savings.naming);
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
}

fn expenses_to_records(expenses: &[ExpenseRecord]) -> Result<RecordSet> {
    let mut records = Vec::with_capacity(expenses.len());
    for expense in expenses {
        if let serde_json::Value::Object(data) = serde_json::to_value(expense)? {
            records.push(Record::new(data));
        }
    }
    let columns = ["date", "category", "amount", "description"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    Ok(RecordSet::new(columns, records))
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for SavingsPipeline<S> {
    type Loaded = Loaded<Vec<ExpenseRecord>>;
    type Output = SavingsOutput;

    fn name(&self) -> &str {
        "savings"
    }

    async fn extract(&self) -> Result<Self::Loaded> {
        let sink = CountingSink::new(self.sink.as_ref());
        let expenses = load_expenses(&self.input, &self.config.savings.input, &sink).await?;

        Ok(Loaded {
            data: expenses,
            skipped_rows: sink.count(),
        })
    }

    async fn transform(&self, data: Self::Loaded) -> Result<Self::Output> {
        let expenses = data.data;
        let reduction_targets = self.config.savings.reduction_targets.clone();

        let projection = project_annual_savings(&expenses, &reduction_targets);
        match &projection {
            SavingsProjection::Projected { annual_savings, .. } => {
                tracing::info!("💰 Projected annual savings: {:.2}", annual_savings)
            }
            SavingsProjection::InsufficientData { reason } => {
                tracing::warn!("⚠️ Cannot project savings: {}", reason)
            }
        }

        Ok(SavingsOutput {
            category_totals: category_totals(&expenses),
            daily_averages: daily_averages(&expenses),
            category_breakdown: category_breakdown(&expenses),
            reduction_targets,
            projection,
            skipped_rows: data.skipped_rows,
            expenses,
        })
    }

    async fn load(&self, output: Self::Output) -> Result<RunReport> {
        let mut written = Vec::new();
        for format in self.config.parsed_output_formats()? {
            written.push(
                self.reporter
                    .write_stats(&output.category_totals, "category_totals", "category", "total", format)
                    .await?,
            );
            written.push(
                self.reporter
                    .write_stats(&output.daily_averages, "daily_averages", "category", "daily_average", format)
                    .await?,
            );
        }
        written.push(self.reporter.write_json(&output, "savings_report").await?);

        let expense_records = expenses_to_records(&output.expenses)?;
        let request = AdvisoryRequest::new(
            ADVISOR_TASK,
            serde_json::json!({
                "expenses": &output.expenses,
                "category_totals": &output.category_totals,
                "daily_averages": &output.daily_averages,
                "reduction_targets": &output.reduction_targets,
            }),
        );
        let advice = request_advice(self.advisor.as_deref(), request).await;

        let projection_text = match &output.projection {
            SavingsProjection::Projected {
                annual_savings,
                distinct_days,
                ..
            } => format!("{:.2} per year (from {} day(s) of data)", annual_savings, distinct_days),
            SavingsProjection::InsufficientData { reason } => format!("insufficient data: {}", reason),
        };

        Ok(RunReport {
            pipeline: self.name().to_string(),
            written,
            rows_in: output.expenses.len(),
            rows_out: output.category_totals.len(),
            skipped_rows: output.skipped_rows,
            advice,
            tables: vec![
                ("Expenses".to_string(), render_records_table(&expense_records)),
                (
                    "Category totals".to_string(),
                    render_stats_table(&output.category_totals, "category", "total"),
                ),
                (
                    "Daily averages".to_string(),
                    render_stats_table(&output.daily_averages, "category", "daily_average"),
                ),
                ("Projected savings".to_string(), projection_text),
            ],
        })
    }
}
