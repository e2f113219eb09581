use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use advisor_collector::collector::run_collection;
use advisor_collector::config::CollectorConfig;
use advisor_collector::{model, output};
use console_client::{ConsoleClient, ConsoleConfig};

/// Sign in to the console with a one-time token and collect every service's
/// actions into one aggregate JSON document.
#[derive(Parser)]
#[command(name = "advisor-collector", version)]
struct Cli {
    /// One-time federation signin token.
    signin_token: String,
    /// Path the aggregate JSON document is written to.
    output_file: PathBuf,
    /// Also write the formatted per-service action map here.
    #[arg(long)]
    formatted: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("advisor_collector=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    info!("Advisor collector starting...");

    let console = ConsoleClient::new(ConsoleConfig::from_env())?;
    let report = run_collection(console, &cli.signin_token, CollectorConfig::from_env()).await?;

    output::write_json(&report, &cli.output_file)?;
    info!(
        path = %cli.output_file.display(),
        services = report.actions.len(),
        "aggregate written"
    );

    if let Some(path) = &cli.formatted {
        let map = model::build_service_map(&report);
        output::write_json(&map, path)?;
        info!(path = %path.display(), services = map.len(), "formatted service map written");
    }

    Ok(())
}
