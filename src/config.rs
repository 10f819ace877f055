// src/config.rs

use chrono::NaiveDate;
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use validator::Validate;

use crate::error::InputError;
use crate::loader::DEFAULT_BASE_URL;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Command-line flags. Anything left out is asked for on the console.
#[derive(Parser, Debug, Default)]
#[command(name = "stock_analysis")]
#[command(about = "Returns, volatility, correlation and beta report for a set of stocks", long_about = None)]
pub struct Cli {
    /// Stock tickers separated by comma (e.g. MSFT,NVDA)
    #[arg(short, long)]
    pub tickers: Option<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(short, long)]
    pub start: Option<String>,

    /// End date (YYYY-MM-DD), exclusive
    #[arg(short, long)]
    pub end: Option<String>,

    /// Market index ticker used for beta (e.g. ^GSPC)
    #[arg(short, long)]
    pub market: Option<String>,

    /// Base URL of the market data provider
    #[arg(long, env = "MARKET_DATA_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Save charts as SVG files in this directory instead of opening them
    #[arg(long, env = "CHART_DIR")]
    pub save_charts: Option<PathBuf>,
}

// Everything a run needs, built once at startup
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct RunConfig {
    #[validate(length(min = 1))]
    pub tickers: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[validate(length(min = 1, max = 16))]
    pub market_ticker: String,
    #[validate(length(min = 1))]
    pub base_url: String,
    // None shows charts in the system viewer
    pub save_charts: Option<PathBuf>,
}

impl RunConfig {
    /// Fill the gaps left by `cli` from the console, in prompt order:
    /// tickers, start date, end date, market index.
    ///
    /// A malformed value stops the prompting right away.
    pub fn resolve<R: BufRead, W: Write>(
        cli: Cli,
        input: &mut R,
        output: &mut W,
    ) -> Result<Self, InputError> {
        let tickers = value_or_prompt(
            cli.tickers,
            input,
            output,
            "Enter stock tickers separated by comma (e.g., MSFT, NVDA): ",
        )?;
        let tickers = parse_tickers(&tickers)?;

        let start = value_or_prompt(cli.start, input, output, "Enter start date (YYYY-MM-DD): ")?;
        let start = parse_date(&start)?;

        let end = value_or_prompt(cli.end, input, output, "Enter end date (YYYY-MM-DD): ")?;
        let end = parse_date(&end)?;

        let market_ticker = value_or_prompt(
            cli.market,
            input,
            output,
            "Enter market index ticker (e.g., ^GSPC for S&P 500): ",
        )?;

        let config = RunConfig {
            tickers,
            start,
            end,
            market_ticker: market_ticker.trim().to_string(),
            base_url: cli.base_url,
            save_charts: cli.save_charts,
        };
        config.validate()?;

        Ok(config)
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, InputError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| InputError::InvalidDate(value.to_string()))
}

// Split on commas, trim, drop repeats while keeping first-seen order
pub fn parse_tickers(value: &str) -> Result<Vec<String>, InputError> {
    if value.trim().is_empty() {
        return Err(InputError::NoTickers);
    }

    let mut tickers: Vec<String> = Vec::new();
    for ticker in value.split(',').map(str::trim) {
        if ticker.is_empty() {
            return Err(InputError::EmptyTicker(value.trim().to_string()));
        }
        if !tickers.iter().any(|seen| seen == ticker) {
            tickers.push(ticker.to_string());
        }
    }

    Ok(tickers)
}

fn value_or_prompt<R: BufRead, W: Write>(
    value: Option<String>,
    input: &mut R,
    output: &mut W,
    message: &str,
) -> Result<String, InputError> {
    if let Some(value) = value {
        return Ok(value);
    }

    write!(output, "{}", message)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn cli() -> Cli {
        Cli {
            base_url: "http://localhost".to_string(),
            ..Cli::default()
        }
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-03-31").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).expect("valid date")
        );
        assert_eq!(
            parse_date(" 2024-01-02\n").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).expect("valid date")
        );
    }

    #[test]
    fn test_parse_date_invalid() {
        for value in ["2024/01/01", "2024-13-01", "2024-02-30", "yesterday", ""] {
            match parse_date(value) {
                Err(InputError::InvalidDate(_)) => {}
                other => panic!("Expected InvalidDate for {:?}, got {:?}", value, other),
            }
        }
    }

    #[test]
    fn test_parse_tickers() {
        assert_eq!(parse_tickers("MSFT, NVDA").unwrap(), vec!["MSFT", "NVDA"]);
        assert_eq!(parse_tickers("AAPL").unwrap(), vec!["AAPL"]);
        assert_eq!(
            parse_tickers("MSFT,NVDA,MSFT").unwrap(),
            vec!["MSFT", "NVDA"]
        );
    }

    #[test]
    fn test_parse_tickers_invalid() {
        assert!(matches!(parse_tickers("  "), Err(InputError::NoTickers)));
        assert!(matches!(
            parse_tickers("MSFT,,NVDA"),
            Err(InputError::EmptyTicker(_))
        ));
    }

    #[test]
    fn test_resolve_from_prompts() {
        let mut input = Cursor::new("MSFT, NVDA\n2024-01-01\n2024-03-31\n^GSPC\n");
        let mut output = Vec::new();

        let config = RunConfig::resolve(cli(), &mut input, &mut output).unwrap();

        assert_eq!(config.tickers, vec!["MSFT", "NVDA"]);
        assert_eq!(config.start, NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"));
        assert_eq!(config.end, NaiveDate::from_ymd_opt(2024, 3, 31).expect("valid date"));
        assert_eq!(config.market_ticker, "^GSPC");

        let prompts = String::from_utf8(output).unwrap();
        assert!(prompts.contains("Enter stock tickers"));
        assert!(prompts.contains("Enter market index ticker"));
    }

    #[test]
    fn test_resolve_prefers_flags() {
        let cli = Cli {
            tickers: Some("AAPL".to_string()),
            start: Some("2023-01-01".to_string()),
            end: Some("2023-06-30".to_string()),
            market: Some("SPY".to_string()),
            ..cli()
        };
        let mut input = Cursor::new("");
        let mut output = Vec::new();

        let config = RunConfig::resolve(cli, &mut input, &mut output).unwrap();

        assert_eq!(config.tickers, vec!["AAPL"]);
        assert_eq!(config.market_ticker, "SPY");
        assert!(output.is_empty());
    }

    #[test]
    fn test_resolve_stops_at_malformed_date() {
        let mut input = Cursor::new("MSFT\n01/02/2024\n2024-03-31\n^GSPC\n");
        let mut output = Vec::new();

        let result = RunConfig::resolve(cli(), &mut input, &mut output);

        assert!(matches!(result, Err(InputError::InvalidDate(ref value)) if value == "01/02/2024"));
        let prompts = String::from_utf8(output).unwrap();
        assert!(!prompts.contains("Enter end date"));
    }

    #[test]
    fn test_resolve_rejects_empty_market() {
        let mut input = Cursor::new("MSFT\n2024-01-01\n2024-03-31\n\n");
        let mut output = Vec::new();

        let result = RunConfig::resolve(cli(), &mut input, &mut output);

        assert!(matches!(result, Err(InputError::Validation(_))));
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "stock_analysis",
            "--tickers",
            "MSFT,NVDA",
            "--start",
            "2024-01-01",
            "--market",
            "^GSPC",
            "--base-url",
            "http://127.0.0.1:9999",
        ]);

        assert_eq!(cli.tickers.as_deref(), Some("MSFT,NVDA"));
        assert_eq!(cli.end, None);
        assert_eq!(cli.base_url, "http://127.0.0.1:9999");
    }

    #[test]
    fn test_save_charts_flag() {
        let cli = Cli::parse_from(["stock_analysis", "--save-charts", "out/charts"]);
        let mut input = Cursor::new("MSFT\n2024-01-01\n2024-03-31\n^GSPC\n");
        let mut output = Vec::new();

        let config = RunConfig::resolve(cli, &mut input, &mut output).unwrap();

        assert_eq!(config.save_charts, Some(PathBuf::from("out/charts")));
        assert!(self::cli().save_charts.is_none());
    }
}
