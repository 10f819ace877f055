// src/error.rs

use thiserror::Error;

// Top-level error, one variant per failure family
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Compute(#[from] ComputeError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Input(#[from] InputError),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Request for {ticker} failed: {source}")]
    Request {
        ticker: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Market data provider returned HTTP {status} for {ticker}")]
    Status { ticker: String, status: u16 },
    #[error("Market data provider rejected {ticker} [{code}]: {description}")]
    Provider {
        ticker: String,
        code: String,
        description: String,
    },
    #[error("Could not parse price history for {ticker}: {source}")]
    Parse {
        ticker: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("No price data returned for {0}")]
    NoData(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ComputeError {
    #[error("Division by zero: {0} is zero")]
    DivisionByZero(&'static str),
    #[error("Not enough data: need at least {needed} defined values, found {found}")]
    InsufficientData { needed: usize, found: usize },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Could not write output: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not open chart viewer: {0}")]
    Viewer(#[from] opener::OpenError),
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("No stock tickers given")]
    NoTickers,
    #[error("Empty ticker in list '{0}'")]
    EmptyTicker(String),
    #[error("Could not read console input: {0}")]
    Read(#[from] std::io::Error),
    #[error("Invalid run configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}
