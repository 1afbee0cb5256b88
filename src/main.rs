use clap::Parser;
use optin_savings::adapters::HttpAdvisor;
use optin_savings::config::Command;
use optin_savings::core::Pipeline;
use optin_savings::domain::model::RunReport;
use optin_savings::utils::diagnostics::TracingSink;
use optin_savings::utils::error::ErrorSeverity;
use optin_savings::utils::{logger, validation::Validate};
use optin_savings::{CliConfig, EtlEngine, LocalStorage, OptInPipeline, SavingsPipeline, TomlConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose, cli.log_format);
    tracing::info!("🚀 Starting optin-savings");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    match execute(&cli).await {
        Ok(report) => print_report(&report),
        Err(e) => {
            tracing::error!(
                "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
                command_name(&cli.command),
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Optin(_) => "opt-in",
        Command::Savings(_) => "savings",
    }
}

async fn execute(cli: &CliConfig) -> optin_savings::Result<RunReport> {
    let config = cli.resolve()?;
    config.validate()?;
    tracing::info!("✅ Configuration loaded and validated");
    display_config_summary(&config, &cli.command);

    let monitor_enabled = config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let input = LocalStorage::new(".");
    let output = LocalStorage::new(config.load.output_path.clone());
    let advisor = HttpAdvisor::from_config(&config.advisor)?;
    let sink = Arc::new(TracingSink);

    match cli.command {
        Command::Optin(_) => {
            let mut pipeline = OptInPipeline::new(input, output, config, sink);
            if let Some(advisor) = advisor {
                pipeline = pipeline.with_advisor(Box::new(advisor));
            }
            run(pipeline, monitor_enabled).await
        }
        Command::Savings(_) => {
            let mut pipeline = SavingsPipeline::new(input, output, config, sink);
            if let Some(advisor) = advisor {
                pipeline = pipeline.with_advisor(Box::new(advisor));
            }
            run(pipeline, monitor_enabled).await
        }
    }
}

async fn run<P: Pipeline>(pipeline: P, monitor_enabled: bool) -> optin_savings::Result<RunReport> {
    EtlEngine::new_with_monitoring(pipeline, monitor_enabled).run().await
}

fn display_config_summary(config: &TomlConfig, command: &Command) {
    tracing::info!("📋 Configuration Summary:");
    tracing::info!("  Pipeline: {}", config.pipeline.name);
    match command {
        Command::Optin(_) => {
            tracing::info!("  Input: {}", config.optin.input);
            tracing::info!("  Filter: {} = {}", config.optin.filter_field, config.optin.filter_value);
            if let Some(range) = &config.optin.date_range {
                tracing::info!("  Created: {}", range);
            }
            tracing::info!("  Naming: {}", config.optin.naming);
        }
        Command::Savings(_) => {
            tracing::info!("  Input: {}", config.savings.input);
            tracing::info!("  Reduction targets: {:?}", config.savings.reduction_targets);
            tracing::info!("  Naming: {}", config.savings.naming);
        }
    }
    tracing::info!("  Output: {} ({})", config.load.output_path, config.load.output_formats.join(", "));
    if config.advisor.enabled {
        tracing::info!("  Advisor: {}", config.advisor.endpoint.as_deref().unwrap_or("-"));
    }
}

fn print_report(report: &RunReport) {
    for (title, table) in &report.tables {
        println!("\n== {} ==", title);
        println!("{}", table);
    }

    if let Some(advice) = &report.advice {
        println!("\n== Advisor ==");
        println!("{}", advice);
    }

    println!(
        "\n✅ {} pipeline completed: {} row(s) in, {} row(s) out, {} skipped",
        report.pipeline, report.rows_in, report.rows_out, report.skipped_rows
    );
    for path in &report.written {
        println!("📁 Output saved to: {}", path);
    }
}
