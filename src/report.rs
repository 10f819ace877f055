// src/report.rs

use chrono::NaiveDate;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::RenderError;
use crate::models::{PairwiseMetric, ReturnSeries, SummaryStatistics};

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 450.0;
const PADDING: f64 = 64.0;
const Y_TICKS: usize = 5;
const BAR_GAP: f64 = 0.5;
const PALETTE: [&str; 6] = ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendPosition {
    TopRight,
    TopLeft,
    Hidden,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<(NaiveDate, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FigureData {
    Lines(Vec<LineSeries>),
    Bars(Vec<Bar>),
}

/// Backend-independent description of one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub legend: LegendPosition,
    pub data: FigureData,
}

/// Anything that can display a [`Figure`].
pub trait ChartBackend {
    fn show(&mut self, figure: &Figure) -> Result<(), RenderError>;
}

fn line_series(returns: &ReturnSeries) -> LineSeries {
    LineSeries {
        name: returns.label.clone(),
        points: returns.defined().collect(),
    }
}

pub fn daily_returns_figure(returns: &ReturnSeries, period: &str) -> Figure {
    Figure {
        title: format!("Daily Returns for {} ({})", returns.label, period),
        x_label: "Date".to_string(),
        y_label: "Daily Return".to_string(),
        legend: LegendPosition::TopRight,
        data: FigureData::Lines(vec![line_series(returns)]),
    }
}

pub fn cumulative_returns_figure(cumulative: &ReturnSeries, period: &str) -> Figure {
    Figure {
        title: format!("Cumulative Returns for {} ({})", cumulative.label, period),
        x_label: "Date".to_string(),
        y_label: "Cumulative Return".to_string(),
        legend: LegendPosition::TopLeft,
        data: FigureData::Lines(vec![line_series(cumulative)]),
    }
}

pub fn volatility_figure(volatilities: &[(String, f64)], period: &str) -> Figure {
    Figure {
        title: format!("Volatility Comparison ({})", period),
        x_label: "Stock".to_string(),
        y_label: "Volatility (Standard Deviation)".to_string(),
        legend: LegendPosition::Hidden,
        data: FigureData::Bars(
            volatilities
                .iter()
                .map(|(label, value)| Bar {
                    label: label.clone(),
                    value: *value,
                })
                .collect(),
        ),
    }
}

type Opener = Box<dyn FnMut(&Path) -> Result<(), RenderError>>;

/// Pops every figure up in the system's default SVG viewer.
///
/// Each chart is rendered into its own temporary file, which is left in
/// place for the viewer to read.
pub struct ViewerChartBackend {
    dir: PathBuf,
    open: Opener,
}

impl ViewerChartBackend {
    pub fn new() -> Self {
        Self::with_opener(env::temp_dir(), |path: &Path| Ok(opener::open(path)?))
    }

    pub fn with_opener<F>(dir: impl Into<PathBuf>, open: F) -> Self
    where
        F: FnMut(&Path) -> Result<(), RenderError> + 'static,
    {
        ViewerChartBackend {
            dir: dir.into(),
            open: Box::new(open),
        }
    }
}

impl Default for ViewerChartBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartBackend for ViewerChartBackend {
    fn show(&mut self, figure: &Figure) -> Result<(), RenderError> {
        let svg = render_svg(figure)?;

        let prefix = format!("{}-", slug(&figure.title));
        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".svg")
            .tempfile_in(&self.dir)?;
        file.write_all(svg.as_bytes())?;
        let (_, path) = file.keep().map_err(|e| e.error)?;
        info!(path = %path.display(), title = %figure.title, "opening chart");

        (self.open)(&path)
    }
}

/// Writes every figure as a standalone SVG document into one directory.
///
/// Files are numbered in display order, so titles that slug to the same
/// name never overwrite each other.
#[derive(Debug)]
pub struct SvgChartBackend {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl SvgChartBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SvgChartBackend {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ChartBackend for SvgChartBackend {
    fn show(&mut self, figure: &Figure) -> Result<(), RenderError> {
        let svg = render_svg(figure)?;
        fs::create_dir_all(&self.dir)?;

        let name = format!("{:02}-{}.svg", self.written.len() + 1, slug(&figure.title));
        let path = self.dir.join(name);
        fs::write(&path, svg)?;
        info!(path = %path.display(), title = %figure.title, "chart written");

        self.written.push(path);
        Ok(())
    }
}

// Lowercase ASCII alphanumerics, everything else collapses into one '-'
fn slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// Value range padded so flat data still gets a visible band
fn value_range(values: impl Iterator<Item = f64>, include_zero: bool) -> (f64, f64) {
    let (mut min, mut max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    // Nothing to plot, keep the axes around zero
    if min > max {
        min = 0.0;
        max = 0.0;
    }
    if include_zero {
        min = min.min(0.0);
        max = max.max(0.0);
    }
    if min == max {
        let pad = if min == 0.0 { 1.0 } else { min.abs() * 0.1 };
        min -= pad;
        max += pad;
    }
    (min, max)
}

fn scale_y(value: f64, min: f64, max: f64) -> f64 {
    let plot_height = HEIGHT - 2.0 * PADDING;
    HEIGHT - PADDING - (value - min) / (max - min) * plot_height
}

/// Standalone SVG document for `figure`. Figures without data still get
/// their title and axes.
pub fn render_svg(figure: &Figure) -> Result<String, RenderError> {
    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><style>text{{font-family:Arial,sans-serif;font-size:12px;fill:#444}}</style>"#,
        w = WIDTH,
        h = HEIGHT
    ));
    svg.push_str(&format!(
        r#"<rect x="0" y="0" width="{}" height="{}" fill="white"/>"#,
        WIDTH, HEIGHT
    ));
    svg.push_str(&format!(
        r#"<text x="{}" y="{}" text-anchor="middle" style="font-size:16px">{}</text>"#,
        WIDTH / 2.0,
        PADDING / 2.0,
        escape(&figure.title)
    ));

    match &figure.data {
        FigureData::Lines(series) => draw_lines(&mut svg, series, figure.legend),
        FigureData::Bars(bars) => draw_bars(&mut svg, bars),
    }

    // Axes and labels
    svg.push_str(&format!(
        r##"<line x1="{l}" y1="{b}" x2="{r}" y2="{b}" stroke="#888"/><line x1="{l}" y1="{t}" x2="{l}" y2="{b}" stroke="#888"/>"##,
        l = PADDING,
        r = WIDTH - PADDING,
        t = PADDING,
        b = HEIGHT - PADDING
    ));
    svg.push_str(&format!(
        r#"<text x="{}" y="{}" text-anchor="middle">{}</text>"#,
        WIDTH / 2.0,
        HEIGHT - 12.0,
        escape(&figure.x_label)
    ));
    svg.push_str(&format!(
        r#"<text x="16" y="{y}" text-anchor="middle" transform="rotate(-90 16 {y})">{}</text>"#,
        escape(&figure.y_label),
        y = HEIGHT / 2.0
    ));

    svg.push_str("</svg>");
    Ok(svg)
}

fn draw_y_ticks(svg: &mut String, min: f64, max: f64) {
    for i in 0..=Y_TICKS {
        let value = min + (max - min) * i as f64 / Y_TICKS as f64;
        let y = scale_y(value, min, max);
        svg.push_str(&format!(
            r##"<line x1="{l}" y1="{y:.2}" x2="{r}" y2="{y:.2}" stroke="#eee"/><text x="{tx}" y="{ty:.2}" text-anchor="end">{value:.4}</text>"##,
            l = PADDING,
            r = WIDTH - PADDING,
            tx = PADDING - 6.0,
            ty = y + 4.0,
        ));
    }
}

fn draw_lines(svg: &mut String, series: &[LineSeries], legend: LegendPosition) {
    let (min_y, max_y) = value_range(
        series.iter().flat_map(|s| s.points.iter().map(|&(_, v)| v)),
        false,
    );
    draw_y_ticks(svg, min_y, max_y);

    let dates = series.iter().flat_map(|s| s.points.iter().map(|&(d, _)| d));
    let first = dates.clone().min();
    let last = dates.max();
    let (first, last) = match (first, last) {
        (Some(first), Some(last)) => (first, last),
        _ => return,
    };
    let span = (last - first).num_days().max(1) as f64;
    let plot_width = WIDTH - 2.0 * PADDING;
    let scale_x = |date: NaiveDate| PADDING + (date - first).num_days() as f64 / span * plot_width;

    if min_y < 0.0 && max_y > 0.0 {
        let zero = scale_y(0.0, min_y, max_y);
        svg.push_str(&format!(
            r##"<line x1="{}" y1="{zero:.2}" x2="{}" y2="{zero:.2}" stroke="#bbb" stroke-dasharray="4 3"/>"##,
            PADDING,
            WIDTH - PADDING,
        ));
    }

    for (i, s) in series.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let points: Vec<String> = s
            .points
            .iter()
            .map(|&(date, value)| format!("{:.2},{:.2}", scale_x(date), scale_y(value, min_y, max_y)))
            .collect();
        svg.push_str(&format!(
            r#"<polyline fill="none" stroke="{}" stroke-width="1.5" points="{}"/>"#,
            color,
            points.join(" ")
        ));
    }

    // Date labels at both ends of the x axis
    svg.push_str(&format!(
        r#"<text x="{}" y="{}" text-anchor="start">{}</text><text x="{}" y="{}" text-anchor="end">{}</text>"#,
        PADDING,
        HEIGHT - PADDING + 18.0,
        first,
        WIDTH - PADDING,
        HEIGHT - PADDING + 18.0,
        last
    ));

    let legend_x = match legend {
        LegendPosition::Hidden => return,
        LegendPosition::TopLeft => PADDING + 12.0,
        LegendPosition::TopRight => WIDTH - PADDING - 120.0,
    };
    for (i, s) in series.iter().enumerate() {
        let y = PADDING + 14.0 + i as f64 * 16.0;
        svg.push_str(&format!(
            r#"<line x1="{x1}" y1="{ly}" x2="{x2}" y2="{ly}" stroke="{c}" stroke-width="2"/><text x="{tx}" y="{ty}">{name}</text>"#,
            x1 = legend_x,
            x2 = legend_x + 18.0,
            ly = y - 4.0,
            c = PALETTE[i % PALETTE.len()],
            tx = legend_x + 24.0,
            ty = y,
            name = escape(&s.name)
        ));
    }
}

fn draw_bars(svg: &mut String, bars: &[Bar]) {
    let (min_y, max_y) = value_range(bars.iter().map(|b| b.value), true);
    draw_y_ticks(svg, min_y, max_y);

    let plot_width = WIDTH - 2.0 * PADDING;
    let slot = plot_width / bars.len() as f64;
    let bar_width = slot * (1.0 - BAR_GAP);
    let zero = scale_y(0.0, min_y, max_y);

    for (i, bar) in bars.iter().enumerate() {
        let x = PADDING + slot * i as f64 + (slot - bar_width) / 2.0;
        let y = scale_y(bar.value, min_y, max_y);
        let (top, height) = if y < zero { (y, zero - y) } else { (zero, y - zero) };
        svg.push_str(&format!(
            r#"<rect x="{x:.2}" y="{top:.2}" width="{w:.2}" height="{height:.2}" fill="{c}"/>"#,
            w = bar_width,
            c = PALETTE[0],
        ));
        svg.push_str(&format!(
            r#"<text x="{cx:.2}" y="{ty:.2}" text-anchor="middle">{value:.6}</text><text x="{cx:.2}" y="{ly:.2}" text-anchor="middle">{label}</text>"#,
            cx = x + bar_width / 2.0,
            ty = top - 6.0,
            value = bar.value,
            ly = HEIGHT - PADDING + 18.0,
            label = escape(&bar.label)
        ));
    }
}

pub fn write_statistics<W: Write + ?Sized>(
    out: &mut W,
    summaries: &[SummaryStatistics],
) -> Result<(), RenderError> {
    for summary in summaries {
        writeln!(out, "{}:", summary.ticker)?;
        writeln!(out, "Mean Daily Return: {:.6}", summary.mean_return)?;
        writeln!(out, "Standard Deviation of Daily Return: {:.6}", summary.std_dev)?;
        match summary.sharpe_ratio {
            Some(ratio) => writeln!(out, "Sharpe Ratio: {:.6}", ratio)?,
            None => writeln!(out, "Sharpe Ratio: undefined (zero standard deviation)")?,
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn write_correlations<W: Write + ?Sized>(
    out: &mut W,
    correlations: &[PairwiseMetric],
) -> Result<(), RenderError> {
    writeln!(out, "Correlation between stocks:")?;
    for correlation in correlations {
        writeln!(out, "{}: {:.6}", correlation.label(), correlation.value)?;
    }
    Ok(())
}

pub fn write_betas<W: Write + ?Sized>(
    out: &mut W,
    betas: &[PairwiseMetric],
) -> Result<(), RenderError> {
    for beta in betas {
        writeln!(out, "Beta for {}: {:.6}", beta.first, beta.value)?;
    }
    Ok(())
}

// One-line verdict for a two-stock run
pub fn write_beta_comparison<W: Write + ?Sized>(
    out: &mut W,
    first: &PairwiseMetric,
    second: &PairwiseMetric,
) -> Result<(), RenderError> {
    if first.value > second.value {
        writeln!(out, "{} is more volatile (higher Beta) than {}", first.first, second.first)?;
    } else if second.value > first.value {
        writeln!(out, "{} is more volatile (higher Beta) than {}", second.first, first.first)?;
    } else {
        writeln!(out, "{} and {} have the same Beta", first.first, second.first)?;
    }
    Ok(())
}
