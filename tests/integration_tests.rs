// tests/integration_tests.rs

use chrono::NaiveDate;
use mockito::{mock, Matcher, Mock};
use std::error::Error;
use stock_analysis::analysis;
use stock_analysis::config::RunConfig;
use stock_analysis::error::{AnalysisError, ComputeError, FetchError, RenderError};
use stock_analysis::loader::MarketDataClient;
use stock_analysis::report::{render_svg, ChartBackend, Figure, FigureData};

// 2024-01-02 14:30 UTC, one bar per day after that
const FIRST_BAR: i64 = 1704205800;

#[derive(Default)]
struct RecordingBackend {
    figures: Vec<Figure>,
}

impl ChartBackend for RecordingBackend {
    fn show(&mut self, figure: &Figure) -> Result<(), RenderError> {
        self.figures.push(figure.clone());
        Ok(())
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn chart_body(closes: &[f64]) -> String {
    let timestamps: Vec<String> = (0..closes.len())
        .map(|i| (FIRST_BAR + i as i64 * 86400).to_string())
        .collect();
    let prices: Vec<String> = closes.iter().map(|c| c.to_string()).collect();
    let volumes: Vec<String> = (0..closes.len()).map(|i| (1000 + i).to_string()).collect();
    let prices = prices.join(",");

    format!(
        r#"{{"chart":{{"result":[{{"timestamp":[{ts}],"indicators":{{"quote":[{{"open":[{p}],"high":[{p}],"low":[{p}],"close":[{p}],"volume":[{v}]}}],"adjclose":[{{"adjclose":[{p}]}}]}}}}],"error":null}}}}"#,
        ts = timestamps.join(","),
        p = prices,
        v = volumes.join(",")
    )
}

// Prices whose daily returns are `factor` times those of `closes`
fn scaled(closes: &[f64], factor: f64) -> Vec<f64> {
    let mut prices = vec![closes[0]];
    for window in closes.windows(2) {
        let r = window[1] / window[0] - 1.0;
        let last = *prices.last().expect("non-empty");
        prices.push(last * (1.0 + factor * r));
    }
    prices
}

fn mock_chart(ticker: &str, closes: &[f64]) -> Mock {
    mock("GET", format!("/v8/finance/chart/{}", ticker).as_str())
        .match_query(Matcher::UrlEncoded("interval".into(), "1d".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chart_body(closes))
        .create()
}

fn config(tickers: &[&str], market: &str) -> RunConfig {
    RunConfig {
        tickers: tickers.iter().map(|t| t.to_string()).collect(),
        start: date(2024, 1, 1),
        end: date(2024, 1, 10),
        market_ticker: market.to_string(),
        base_url: mockito::server_url(),
        save_charts: None,
    }
}

const MARKET: [f64; 6] = [100.0, 101.0, 99.0, 102.0, 103.0, 101.0];

#[tokio::test]
async fn test_fetch_price_history() -> Result<(), Box<dyn Error>> {
    let _mock = mock("GET", "/v8/finance/chart/IBM")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("period1".into(), "1704067200".into()),
            Matcher::UrlEncoded("period2".into(), "1704844800".into()),
            Matcher::UrlEncoded("interval".into(), "1d".into()),
            Matcher::UrlEncoded("includeAdjustedClose".into(), "true".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chart_body(&[201.5, 203.0, 199.25]))
        .create();

    let client = MarketDataClient::new(mockito::server_url())?;
    let series = client.fetch("IBM", date(2024, 1, 1), date(2024, 1, 10)).await?;

    assert_eq!(series.ticker, "IBM");
    assert_eq!(
        series.adjusted_closes(),
        vec![
            (date(2024, 1, 2), 201.5),
            (date(2024, 1, 3), 203.0),
            (date(2024, 1, 4), 199.25),
        ]
    );
    assert_eq!(series.bars()[2].volume, 1002);

    Ok(())
}

#[tokio::test]
async fn test_fetch_unknown_ticker() -> Result<(), Box<dyn Error>> {
    let _mock = mock("GET", "/v8/finance/chart/NOSUCH")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#)
        .create();

    let client = MarketDataClient::new(mockito::server_url())?;
    let result = client.fetch("NOSUCH", date(2024, 1, 1), date(2024, 1, 10)).await;

    match result {
        Err(FetchError::Provider { ticker, description, .. }) => {
            assert_eq!(ticker, "NOSUCH");
            assert!(description.contains("delisted"));
        }
        other => panic!("Expected Provider error, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_fetch_server_error() -> Result<(), Box<dyn Error>> {
    let _mock = mock("GET", "/v8/finance/chart/BROKEN")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("<html>Internal Server Error</html>")
        .create();

    let client = MarketDataClient::new(mockito::server_url())?;
    let result = client.fetch("BROKEN", date(2024, 1, 1), date(2024, 1, 10)).await;

    assert!(matches!(result, Err(FetchError::Status { status: 500, .. })));

    Ok(())
}

#[tokio::test]
async fn test_full_run() -> Result<(), Box<dyn Error>> {
    let _market = mock_chart("RUNMKT", &MARKET);
    let _first = mock_chart("RUNA", &MARKET);
    let _second = mock_chart("RUNB", &scaled(&MARKET, 2.0));

    let config = config(&["RUNA", "RUNB"], "RUNMKT");
    let client = MarketDataClient::new(config.base_url.clone())?;
    let mut charts = RecordingBackend::default();
    let mut out = Vec::new();

    let report = analysis::run(&config, &client, &mut charts, &mut out).await?;

    // Two daily charts, two cumulative charts, one volatility chart
    let titles: Vec<&str> = charts.figures.iter().map(|f| f.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Daily Returns for RUNA (2024-01-01 to 2024-01-10)",
            "Daily Returns for RUNB (2024-01-01 to 2024-01-10)",
            "Cumulative Returns for RUNA (2024-01-01 to 2024-01-10)",
            "Cumulative Returns for RUNB (2024-01-01 to 2024-01-10)",
            "Volatility Comparison (2024-01-01 to 2024-01-10)",
        ]
    );
    assert!(matches!(charts.figures[4].data, FigureData::Bars(ref bars) if bars.len() == 2));

    assert_eq!(report.volatilities.len(), 2);
    assert!((report.volatilities[1].1 - 2.0 * report.volatilities[0].1).abs() < 1e-9);

    assert_eq!(report.correlations.len(), 2);
    assert_eq!(report.correlations[0].label(), "RUNA-RUNB");
    assert_eq!(report.correlations[1].label(), "RUNB-RUNA");
    assert!((report.correlations[0].value - 1.0).abs() < 1e-9);

    assert_eq!(report.betas.len(), 2);
    assert!(report.betas.iter().all(|b| b.second == "RUNMKT"));
    assert!((report.betas[0].value - 1.0).abs() < 1e-9);
    assert!((report.betas[1].value - 2.0).abs() < 1e-9);

    let text = String::from_utf8(out)?;
    assert!(text.contains("RUNA:\nMean Daily Return: "));
    assert!(text.contains("Correlation between stocks:\nRUNA-RUNB: 1.000000\nRUNB-RUNA: 1.000000\n"));
    assert!(text.contains("Beta for RUNA: 1.000000\nBeta for RUNB: 2.000000\n"));
    assert!(text.ends_with("RUNB is more volatile (higher Beta) than RUNA\n"));

    Ok(())
}

#[tokio::test]
async fn test_run_stops_at_market_fetch_failure() -> Result<(), Box<dyn Error>> {
    let _first = mock_chart("HALTA", &MARKET);
    let _second = mock_chart("HALTB", &scaled(&MARKET, 0.5));
    let _market = mock("GET", "/v8/finance/chart/HALTMKT")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#)
        .create();

    let config = config(&["HALTA", "HALTB"], "HALTMKT");
    let client = MarketDataClient::new(config.base_url.clone())?;
    let mut charts = RecordingBackend::default();
    let mut out = Vec::new();

    let result = analysis::run(&config, &client, &mut charts, &mut out).await;

    assert!(matches!(result, Err(AnalysisError::Fetch(FetchError::Provider { .. }))));
    // Output produced before the failure stays
    assert_eq!(charts.figures.len(), 5);
    let text = String::from_utf8(out)?;
    assert!(text.contains("Correlation between stocks:"));
    assert!(!text.contains("Beta for"));

    Ok(())
}

#[tokio::test]
async fn test_run_with_flat_market() -> Result<(), Box<dyn Error>> {
    let _first = mock_chart("FLATA", &MARKET);
    let _market = mock_chart("FLATMKT", &[50.0, 50.0, 50.0, 50.0, 50.0, 50.0]);

    let config = config(&["FLATA"], "FLATMKT");
    let client = MarketDataClient::new(config.base_url.clone())?;
    let mut charts = RecordingBackend::default();
    let mut out = Vec::new();

    let result = analysis::run(&config, &client, &mut charts, &mut out).await;

    assert!(matches!(
        result,
        Err(AnalysisError::Compute(ComputeError::DivisionByZero("market variance")))
    ));

    Ok(())
}

#[tokio::test]
async fn test_run_with_single_bar_ticker() -> Result<(), Box<dyn Error>> {
    let _only = mock_chart("ONEBAR", &[42.0]);

    let config = config(&["ONEBAR"], "ONEBARMKT");
    let client = MarketDataClient::new(config.base_url.clone())?;
    let mut charts = RecordingBackend::default();
    let mut out = Vec::new();

    let result = analysis::run(&config, &client, &mut charts, &mut out).await;

    // The empty charts still render; the volatility step reports the real problem
    assert!(matches!(
        result,
        Err(AnalysisError::Compute(ComputeError::InsufficientData { needed: 2, found: 0 }))
    ));
    assert_eq!(charts.figures.len(), 2);
    for figure in &charts.figures {
        let svg = render_svg(figure)?;
        assert!(svg.contains(&figure.title));
    }
    assert!(out.is_empty());

    Ok(())
}
