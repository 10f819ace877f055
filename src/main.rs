// src/main.rs

use clap::Parser;
use std::io;
use tracing::error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stock_analysis::analysis;
use stock_analysis::config::{Cli, RunConfig};
use stock_analysis::error::AnalysisError;
use stock_analysis::loader::MarketDataClient;
use stock_analysis::report::{ChartBackend, SvgChartBackend, ViewerChartBackend};

// Fetches run one at a time, so a single-threaded runtime is enough
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Logs go to stderr, the report owns stdout
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "stock_analysis=info".into()))
        .init();

    let cli = Cli::parse();

    // Every failure ends up here once; the process still exits normally
    if let Err(e) = run(cli).await {
        error!(error = %e, "run failed");
        println!("An error occurred: {}", e);
    }
}

async fn run(cli: Cli) -> Result<(), AnalysisError> {
    let mut stdout = io::stdout();
    let config = {
        let mut stdin = io::stdin().lock();
        RunConfig::resolve(cli, &mut stdin, &mut stdout)?
    };

    let client = MarketDataClient::new(config.base_url.clone())?;
    let mut charts: Box<dyn ChartBackend> = match &config.save_charts {
        Some(dir) => Box::new(SvgChartBackend::new(dir.clone())),
        None => Box::new(ViewerChartBackend::new()),
    };

    analysis::run(&config, &client, charts.as_mut(), &mut stdout).await?;
    if let Some(dir) = &config.save_charts {
        println!("Charts written to {}", dir.display());
    }
    Ok(())
}
