// src/stats.rs

use ndarray::Array1;

use crate::error::ComputeError;
use crate::models::{PriceSeries, ReturnSeries};

// Spreads this small relative to the values are floating point noise
const RELATIVE_EPSILON: f64 = 1e-12;

// Fractional change of the adjusted close from one trading day to the next.
// The first entry has no previous day and is left undefined.
pub fn daily_returns(prices: &PriceSeries) -> ReturnSeries {
    let closes = prices.adjusted_closes();
    let mut points = Vec::with_capacity(closes.len());

    if let Some(&(first_date, _)) = closes.first() {
        points.push((first_date, None));
    }
    for window in closes.windows(2) {
        let (_, previous) = window[0];
        let (date, current) = window[1];
        points.push((date, Some(current / previous - 1.0)));
    }

    ReturnSeries::new(prices.ticker.clone(), points)
}

// Compounded growth since the start of the period, minus one.
// Undefined daily returns stay undefined and do not break the product.
pub fn cumulative_returns(returns: &ReturnSeries) -> ReturnSeries {
    let mut growth = 1.0;
    let points = returns
        .points
        .iter()
        .map(|&(date, value)| {
            let cumulative = value.map(|r| {
                growth *= 1.0 + r;
                growth - 1.0
            });
            (date, cumulative)
        })
        .collect();

    ReturnSeries::new(returns.label.clone(), points)
}

pub fn mean_return(returns: &ReturnSeries) -> Result<f64, ComputeError> {
    let values = Array1::from(returns.defined_values());
    values.mean().ok_or(ComputeError::InsufficientData {
        needed: 1,
        found: 0,
    })
}

// Sample variance (divisor n - 1) of the defined entries
pub fn variance(returns: &ReturnSeries) -> Result<f64, ComputeError> {
    let values = Array1::from(returns.defined_values());
    sample_covariance(&values, &values)
}

// Volatility is the sample standard deviation of the defined entries
pub fn volatility(returns: &ReturnSeries) -> Result<f64, ComputeError> {
    Ok(variance(returns)?.sqrt())
}

/// Mean return divided by its standard deviation, risk-free rate omitted.
///
/// Fails with `DivisionByZero` when the standard deviation is zero, or is
/// only rounding residue next to the mean (constant non-zero returns).
pub fn sharpe_ratio(returns: &ReturnSeries) -> Result<f64, ComputeError> {
    let mean = mean_return(returns)?;
    let std_dev = volatility(returns)?;
    if std_dev <= mean.abs() * RELATIVE_EPSILON {
        return Err(ComputeError::DivisionByZero("standard deviation"));
    }
    Ok(mean / std_dev)
}

// Sample covariance over the dates where both series are defined
pub fn covariance(a: &ReturnSeries, b: &ReturnSeries) -> Result<f64, ComputeError> {
    let (x, y) = align(a, b);
    sample_covariance(&x, &y)
}

/// Pearson correlation over the date-aligned intersection of two series.
pub fn correlation(a: &ReturnSeries, b: &ReturnSeries) -> Result<f64, ComputeError> {
    let (x, y) = align(a, b);
    let cov = sample_covariance(&x, &y)?;
    let std_x = sample_covariance(&x, &x)?.sqrt();
    let std_y = sample_covariance(&y, &y)?.sqrt();

    let denominator = std_x * std_y;
    if denominator == 0.0 {
        return Err(ComputeError::DivisionByZero("standard deviation"));
    }
    Ok(cov / denominator)
}

/// Sensitivity of `returns` to `market`: cov(r, market) / var(market).
///
/// The covariance uses the date-aligned pairs, the variance uses every
/// defined market entry.
pub fn beta(returns: &ReturnSeries, market: &ReturnSeries) -> Result<f64, ComputeError> {
    let cov = covariance(returns, market)?;
    let market_variance = variance(market)?;
    if market_variance == 0.0 {
        return Err(ComputeError::DivisionByZero("market variance"));
    }
    Ok(cov / market_variance)
}

// Pairs of values whose dates are defined in both series, in date order
fn align(a: &ReturnSeries, b: &ReturnSeries) -> (Array1<f64>, Array1<f64>) {
    let lookup = b.by_date();
    let (x, y): (Vec<f64>, Vec<f64>) = a
        .defined()
        .filter_map(|(date, va)| lookup.get(&date).map(|&vb| (va, vb)))
        .unzip();
    (Array1::from(x), Array1::from(y))
}

fn sample_covariance(x: &Array1<f64>, y: &Array1<f64>) -> Result<f64, ComputeError> {
    let n = x.len();
    if n < 2 {
        return Err(ComputeError::InsufficientData { needed: 2, found: n });
    }
    let mean_x = x.sum() / n as f64;
    let mean_y = y.sum() / n as f64;
    let centered_x = x - mean_x;
    let centered_y = y - mean_y;
    Ok(centered_x.dot(&centered_y) / (n - 1) as f64)
}
