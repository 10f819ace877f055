// src/loader.rs

use chrono::{DateTime, NaiveDate, NaiveTime};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::models::{PriceBar, PriceSeries};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

// The chart endpoint rejects requests without a browser-like agent
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) stock_analysis/0.1";

// Define the Chart API structure
#[derive(Deserialize, Debug)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Deserialize, Debug)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<QuoteColumns>,
    #[serde(default)]
    adjclose: Vec<AdjCloseColumn>,
}

// Column-oriented OHLCV values, one entry per timestamp
#[derive(Deserialize, Debug)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Deserialize, Debug)]
struct AdjCloseColumn {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Client for the daily price history of a ticker.
///
/// Every call to [`MarketDataClient::fetch`] issues one request; nothing is
/// cached between calls.
#[derive(Debug, Clone)]
pub struct MarketDataClient {
    client: Client,
    base_url: String,
}

impl MarketDataClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::Client)?;

        Ok(MarketDataClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // Fetch daily bars for [start, end), end exclusive
    pub async fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, FetchError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        info!(ticker, %start, %end, "fetching price history");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", unix_midnight(start).to_string()),
                ("period2", unix_midnight(end).to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
                ("includeAdjustedClose", "true".to_string()),
            ])
            .send()
            .await
            .map_err(|source| FetchError::Request {
                ticker: ticker.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| FetchError::Request {
            ticker: ticker.to_string(),
            source,
        })?;
        debug!(ticker, %status, bytes = body.len(), "received chart response");

        let parsed = parse_chart(ticker, &body);
        if !status.is_success() {
            // Unknown tickers come back as 404 with an error payload
            return match parsed {
                Err(e @ FetchError::Provider { .. }) => Err(e),
                _ => Err(FetchError::Status {
                    ticker: ticker.to_string(),
                    status: status.as_u16(),
                }),
            };
        }

        let series = parsed?;
        info!(ticker, rows = series.len(), "fetched price history");
        Ok(series)
    }
}

fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

// Turn a chart payload into a date-ascending series, skipping incomplete rows
fn parse_chart(ticker: &str, body: &str) -> Result<PriceSeries, FetchError> {
    let response: ChartResponse =
        serde_json::from_str(body).map_err(|source| FetchError::Parse {
            ticker: ticker.to_string(),
            source,
        })?;

    if let Some(error) = response.chart.error {
        return Err(FetchError::Provider {
            ticker: ticker.to_string(),
            code: error.code,
            description: error.description,
        });
    }

    let no_data = || FetchError::NoData(ticker.to_string());
    let results = response.chart.result.ok_or_else(no_data)?;
    let data = results.first().ok_or_else(no_data)?;
    let quote = data.indicators.quote.first().ok_or_else(no_data)?;
    let adj_close = data.indicators.adjclose.first();

    let column = |values: &Vec<Option<f64>>, i: usize| values.get(i).copied().flatten();

    let mut bars = Vec::with_capacity(data.timestamp.len());
    let mut skipped = 0;
    for (i, &timestamp) in data.timestamp.iter().enumerate() {
        let date = DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive());
        let row = (
            date,
            column(&quote.open, i),
            column(&quote.high, i),
            column(&quote.low, i),
            column(&quote.close, i),
            quote.volume.get(i).copied().flatten(),
        );

        if let (Some(date), Some(open), Some(high), Some(low), Some(close), Some(volume)) = row {
            let adj_close = adj_close
                .and_then(|column_values| column(&column_values.adjclose, i))
                .unwrap_or(close);
            bars.push(PriceBar {
                date,
                open,
                high,
                low,
                close,
                adj_close,
                volume,
            });
        } else {
            skipped += 1;
        }
    }

    if skipped > 0 {
        warn!(ticker, skipped, "dropped incomplete price rows");
    }
    if bars.is_empty() {
        return Err(no_data());
    }

    Ok(PriceSeries::new(ticker, bars))
}
