// src/models.rs

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::error::ComputeError;
use crate::stats;

// One trading day of OHLCV data
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: u64,
}

// Daily price history for one ticker, date-ascending
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub ticker: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|bar| bar.date);
        PriceSeries {
            ticker: ticker.into(),
            bars,
        }
    }

    // Convenience constructor from (date, adjusted close) pairs
    pub fn from_adjusted_closes(ticker: impl Into<String>, closes: &[(NaiveDate, f64)]) -> Self {
        let bars = closes
            .iter()
            .map(|&(date, price)| PriceBar {
                date,
                open: price,
                high: price,
                low: price,
                close: price,
                adj_close: price,
                volume: 0,
            })
            .collect();
        Self::new(ticker, bars)
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn adjusted_closes(&self) -> Vec<(NaiveDate, f64)> {
        self.bars.iter().map(|bar| (bar.date, bar.adj_close)).collect()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Per-date fractional returns derived from a single price series.
///
/// `None` marks an undefined entry; the first entry of a daily return
/// series is always undefined.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    pub label: String,
    pub points: Vec<(NaiveDate, Option<f64>)>,
}

impl ReturnSeries {
    pub fn new(label: impl Into<String>, points: Vec<(NaiveDate, Option<f64>)>) -> Self {
        ReturnSeries {
            label: label.into(),
            points,
        }
    }

    pub fn defined(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.points
            .iter()
            .filter_map(|&(date, value)| value.map(|v| (date, v)))
    }

    pub fn defined_values(&self) -> Vec<f64> {
        self.defined().map(|(_, v)| v).collect()
    }

    // Date -> value lookup of the defined entries
    pub fn by_date(&self) -> BTreeMap<NaiveDate, f64> {
        self.defined().collect()
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|&(_, v)| v).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStatistics {
    pub ticker: String,
    pub mean_return: f64,
    pub std_dev: f64,
    // None when the standard deviation is exactly zero
    pub sharpe_ratio: Option<f64>,
}

impl SummaryStatistics {
    pub fn from_returns(returns: &ReturnSeries) -> Result<Self, ComputeError> {
        let mean_return = stats::mean_return(returns)?;
        let std_dev = stats::volatility(returns)?;
        let sharpe_ratio = match stats::sharpe_ratio(returns) {
            Ok(ratio) => Some(ratio),
            Err(ComputeError::DivisionByZero(_)) => None,
            Err(e) => return Err(e),
        };

        Ok(SummaryStatistics {
            ticker: returns.label.clone(),
            mean_return,
            std_dev,
            sharpe_ratio,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Correlation,
    Beta,
}

/// A scalar relating two series.
///
/// For `Correlation` both sides are stocks. For `Beta` the second side is
/// always the market index the stock was measured against.
#[derive(Debug, Clone, PartialEq)]
pub struct PairwiseMetric {
    pub kind: MetricKind,
    pub first: String,
    pub second: String,
    pub value: f64,
}

impl PairwiseMetric {
    pub fn label(&self) -> String {
        format!("{}-{}", self.first, self.second)
    }
}

// Everything one run computed, in reporting order
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub volatilities: Vec<(String, f64)>,
    pub summaries: Vec<SummaryStatistics>,
    pub correlations: Vec<PairwiseMetric>,
    pub betas: Vec<PairwiseMetric>,
}
