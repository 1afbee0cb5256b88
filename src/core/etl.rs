use crate::core::Pipeline;
use crate::domain::model::RunReport;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Runs a pipeline's extract, transform and load steps in order, handing each
/// step's output straight to the next.
pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<RunReport> {
        let name = self.pipeline.name().to_string();
        tracing::info!("🚀 Starting {} pipeline", name);
        self.monitor.log_phase("start");

        tracing::info!("Extracting data...");
        let loaded = self.pipeline.extract().await?;
        self.monitor.log_phase("extract");

        tracing::info!("Transforming data...");
        let output = self.pipeline.transform(loaded).await?;
        self.monitor.log_phase("transform");

        tracing::info!("Writing reports...");
        let report = self.pipeline.load(output).await?;
        self.monitor.log_phase("load");

        tracing::info!(
            "✅ {} pipeline finished: {} rows in, {} rows out, {} skipped, {} file(s) written",
            name,
            report.rows_in,
            report.rows_out,
            report.skipped_rows,
            report.written.len()
        );
        self.monitor.log_final_stats();
        Ok(report)
    }
}
