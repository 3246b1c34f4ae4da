// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use pulse::config::{load_and_validate_config, PipelineBuilder, ReleaseMode};
use pulse::engine::RunReport;

/// Scatter/gather image search over a social graph
#[derive(Parser)]
#[command(name = "pulse")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the pipeline configuration (.yaml, .yml or .toml)
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Override the number of requests to send
    #[arg(short, long)]
    requests: Option<usize>,

    /// Release one request at a time
    #[arg(long)]
    serialized: bool,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let mut config = load_and_validate_config(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    if let Some(requests) = cli.requests {
        config.source.request_count = requests;
    }
    if cli.serialized {
        config.release_mode = ReleaseMode::Serialized;
    }

    let pipeline = PipelineBuilder::from_config(config).context("Failed to build pipeline")?;
    println!(
        "Running {} request(s) over the {} backend ({:?} release, chain depth {})",
        pipeline.config().source.request_count,
        pipeline.backend_name(),
        pipeline.config().release_mode,
        pipeline.config().chain_depth,
    );

    let report = pipeline.run().await;
    print_summary(&report);

    if !report.is_complete() {
        anyhow::bail!("{} request(s) did not complete", report.missing);
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    println!("Completed: {}", report.completed.len());
    println!("Missing:   {}", report.missing);
    println!("Restarts:  {}", report.restarts);
    println!("Elapsed:   {}", millis(report.elapsed));
    if let (Some(mean), Some(max)) = (report.mean_latency(), report.max_latency()) {
        println!("Latency:   mean {}, max {}", millis(mean), millis(max));
    }
    for completion in &report.completed {
        println!(
            "  {:<32} {:>10}  {}",
            completion.request_id.as_str(),
            millis(completion.latency),
            completion.result
        );
    }
}

fn millis(duration: Duration) -> String {
    format!("{:.2}ms", duration.as_secs_f64() * 1000.0)
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}
