// src/analysis.rs

use std::io::Write;
use tracing::{debug, info};

use crate::config::RunConfig;
use crate::error::AnalysisError;
use crate::loader::MarketDataClient;
use crate::models::{MetricKind, PairwiseMetric, ReturnSeries, RunReport, SummaryStatistics};
use crate::report::{
    cumulative_returns_figure, daily_returns_figure, volatility_figure, write_beta_comparison,
    write_betas, write_correlations, write_statistics, ChartBackend,
};
use crate::stats;

/// One full pass: fetch, compute and report for every configured ticker,
/// then beta against the market index.
///
/// Fetches run one after another. The first error ends the run; charts and
/// text already emitted are left as they are.
pub async fn run<B, W>(
    config: &RunConfig,
    client: &MarketDataClient,
    charts: &mut B,
    out: &mut W,
) -> Result<RunReport, AnalysisError>
where
    B: ChartBackend + ?Sized,
    W: Write + ?Sized,
{
    let period = format!("{} to {}", config.start, config.end);
    let mut report = RunReport::default();

    // Daily returns, one chart per ticker
    let mut daily = Vec::with_capacity(config.tickers.len());
    for ticker in &config.tickers {
        let returns = fetch_returns(client, config, ticker).await?;
        charts.show(&daily_returns_figure(&returns, &period))?;
        daily.push(returns);
    }

    for returns in &daily {
        let cumulative = stats::cumulative_returns(returns);
        charts.show(&cumulative_returns_figure(&cumulative, &period))?;
    }

    for returns in &daily {
        let volatility = stats::volatility(returns)?;
        debug!(ticker = %returns.label, volatility, "volatility");
        report.volatilities.push((returns.label.clone(), volatility));
    }
    charts.show(&volatility_figure(&report.volatilities, &period))?;

    report.summaries = daily
        .iter()
        .map(SummaryStatistics::from_returns)
        .collect::<Result<Vec<_>, _>>()?;
    write_statistics(out, &report.summaries)?;

    report.correlations = correlations(&daily)?;
    write_correlations(out, &report.correlations)?;

    let market = fetch_returns(client, config, &config.market_ticker).await?;
    for returns in &daily {
        report.betas.push(PairwiseMetric {
            kind: MetricKind::Beta,
            first: returns.label.clone(),
            second: market.label.clone(),
            value: stats::beta(returns, &market)?,
        });
    }
    write_betas(out, &report.betas)?;
    if let [first, second] = report.betas.as_slice() {
        write_beta_comparison(out, first, second)?;
    }

    info!(
        tickers = config.tickers.len(),
        market = %config.market_ticker,
        "analysis complete"
    );
    Ok(report)
}

async fn fetch_returns(
    client: &MarketDataClient,
    config: &RunConfig,
    ticker: &str,
) -> Result<ReturnSeries, AnalysisError> {
    let prices = client.fetch(ticker, config.start, config.end).await?;
    Ok(stats::daily_returns(&prices))
}

// Every ordered pair of distinct series
fn correlations(daily: &[ReturnSeries]) -> Result<Vec<PairwiseMetric>, AnalysisError> {
    let mut metrics = Vec::new();
    for a in daily {
        for b in daily {
            if a.label == b.label {
                continue;
            }
            metrics.push(PairwiseMetric {
                kind: MetricKind::Correlation,
                first: a.label.clone(),
                second: b.label.clone(),
                value: stats::correlation(a, b)?,
            });
        }
    }
    Ok(metrics)
}
