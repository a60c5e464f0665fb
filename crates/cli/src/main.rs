use std::process::ExitCode;

use clap::Parser;

use batchinfer_cli::Args;

fn main() -> ExitCode {
    let args = Args::parse();
    batchinfer_observability::init(args.log_format);

    let config = match args.job_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid job configuration");
            return ExitCode::from(2);
        }
    };

    match batchinfer_cli::run(&args, &config) {
        Ok(report) => {
            tracing::info!(
                run_id = %report.run_id,
                records = report.total_records(),
                failed = report.total_failed(),
                "processing completed"
            );
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::warn!(error = %e, "failed to encode run report"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "processing failed");
            ExitCode::FAILURE
        }
    }
}
