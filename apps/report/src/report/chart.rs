//! Temporal statistics chart.
//!
//! `build` turns the series into a `TimeSeriesPage` whose `ChartLayout` holds
//! everything the PDF writer needs in plot-relative coordinates (0..1 on both
//! axes): one polyline per metric, date ticks and value ticks. Points keep the
//! order they were received in; nothing is resampled.

use chrono::{Datelike, Months, NaiveDate};

use crate::report::model::TimeSeriesPage;
use crate::stats_client::TimeSeriesPoint;

pub const CHART_TITLE: &str = "Temporal Graph";
pub const X_LABEL: &str = "Date";
pub const Y_LABEL: &str = "Values";
/// Rotation of the date tick labels, degrees counter-clockwise.
pub const X_TICK_ROTATION_DEG: f32 = 45.0;

const MAX_DATE_TICKS: i64 = 8;
const TARGET_VALUE_TICKS: f64 = 5.0;
const VALUE_MARGIN: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Mean,
    Max,
    Min,
    Std,
    Median,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Mean,
        Metric::Max,
        Metric::Min,
        Metric::Std,
        Metric::Median,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Metric::Mean => "Mean",
            Metric::Max => "Max",
            Metric::Min => "Min",
            Metric::Std => "Std",
            Metric::Median => "Median",
        }
    }

    /// Line colour as RGB in 0..1.
    pub fn color(self) -> [f32; 3] {
        match self {
            Metric::Mean => [0.122, 0.467, 0.706],
            Metric::Max => [1.000, 0.498, 0.055],
            Metric::Min => [0.173, 0.627, 0.173],
            Metric::Std => [0.839, 0.153, 0.157],
            Metric::Median => [0.580, 0.404, 0.741],
        }
    }

    pub fn value(self, point: &TimeSeriesPoint) -> f64 {
        match self {
            Metric::Mean => point.mean,
            Metric::Max => point.max,
            Metric::Min => point.min,
            Metric::Std => point.std,
            Metric::Median => point.median,
        }
    }
}

/// One metric's polyline. `None` marks a missing value and breaks the line.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLine {
    pub metric: Metric,
    pub points: Vec<Option<(f32, f32)>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub position: f32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartLayout {
    pub lines: Vec<ChartLine>,
    pub x_ticks: Vec<Tick>,
    pub y_ticks: Vec<Tick>,
}

#[cfg(test)]
impl ChartLayout {
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.points.is_empty())
    }
}

/// Builds the chart page. An empty series gives empty axes with the legend.
pub fn build(series: &[TimeSeriesPoint]) -> TimeSeriesPage {
    TimeSeriesPage {
        chart: layout_chart(series),
    }
}

fn layout_chart(series: &[TimeSeriesPoint]) -> ChartLayout {
    let date_range = series
        .iter()
        .map(|p| p.date)
        .fold(None, |acc: Option<(NaiveDate, NaiveDate)>, d| match acc {
            None => Some((d, d)),
            Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        });

    let (y_lo, y_hi) = value_range(series);
    let y_ticks = value_ticks(y_lo, y_hi);

    let x_of = |date: NaiveDate| -> f32 {
        match date_range {
            Some((lo, hi)) if hi > lo => {
                (date - lo).num_days() as f32 / (hi - lo).num_days() as f32
            }
            _ => 0.5,
        }
    };
    let y_of = |v: f64| -> f32 { ((v - y_lo) / (y_hi - y_lo)) as f32 };

    let lines = Metric::ALL
        .into_iter()
        .map(|metric| ChartLine {
            metric,
            points: series
                .iter()
                .map(|p| {
                    let v = metric.value(p);
                    v.is_finite().then(|| (x_of(p.date), y_of(v)))
                })
                .collect(),
        })
        .collect();

    let x_ticks = match date_range {
        Some((lo, hi)) => date_ticks(lo, hi)
            .into_iter()
            .map(|(date, label)| Tick {
                position: x_of(date),
                label,
            })
            .collect(),
        None => Vec::new(),
    };

    ChartLayout {
        lines,
        x_ticks,
        y_ticks,
    }
}

/// Padded `[lo, hi]` over every finite value; `[0, 1]` when there is none.
fn value_range(series: &[TimeSeriesPoint]) -> (f64, f64) {
    let mut values = series
        .iter()
        .flat_map(|p| Metric::ALL.into_iter().map(move |m| m.value(p)))
        .filter(|v| v.is_finite())
        .peekable();
    if values.peek().is_none() {
        return (0.0, 1.0);
    }
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if hi > lo {
        let pad = (hi - lo) * VALUE_MARGIN;
        (lo - pad, hi + pad)
    } else {
        let pad = if lo == 0.0 { 0.5 } else { lo.abs() * VALUE_MARGIN };
        (lo - pad, hi + pad)
    }
}

/// Ticks on a 1/2/5 × 10^k step inside `[lo, hi]`.
fn value_ticks(lo: f64, hi: f64) -> Vec<Tick> {
    let step = nice_step((hi - lo) / TARGET_VALUE_TICKS);
    let decimals = (-step.log10().floor()).max(0.0) as usize;
    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    (first..=last)
        .map(|k| {
            let v = k as f64 * step;
            Tick {
                position: ((v - lo) / (hi - lo)) as f32,
                label: format!("{v:.decimals$}"),
            }
        })
        .collect()
}

fn nice_step(raw: f64) -> f64 {
    let magnitude = 10f64.powf(raw.log10().floor());
    let fraction = raw / magnitude;
    let nice = if fraction <= 1.0 {
        1.0
    } else if fraction <= 2.0 {
        2.0
    } else if fraction <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Date ticks in the spirit of an automatic date locator: daily steps for short
/// spans, month starts for medium spans, year starts beyond that. Label
/// precision follows the step.
pub fn date_ticks(lo: NaiveDate, hi: NaiveDate) -> Vec<(NaiveDate, String)> {
    let span = (hi - lo).num_days();

    if let Some(step) = [1i64, 2, 3, 7, 14]
        .into_iter()
        .find(|step| span / step < MAX_DATE_TICKS)
    {
        return (0..=span / step)
            .filter_map(|k| lo.checked_add_days(chrono::Days::new((k * step) as u64)))
            .map(|d| (d, d.format("%Y-%m-%d").to_string()))
            .collect();
    }

    let month_span = months_between(lo, hi);
    if let Some(step) = [1u32, 2, 3, 6]
        .into_iter()
        .find(|step| month_span / i64::from(*step) < MAX_DATE_TICKS)
    {
        let mut ticks = Vec::new();
        let mut cursor = first_of_next_month(lo);
        while cursor <= hi {
            if cursor.month0() % step == 0 {
                ticks.push((cursor, cursor.format("%Y-%m").to_string()));
            }
            match cursor.checked_add_months(Months::new(1)) {
                Some(next) => cursor = next,
                None => break,
            }
        }
        return ticks;
    }

    let year_span = i64::from(hi.year() - lo.year());
    let step = ((year_span + MAX_DATE_TICKS - 1) / MAX_DATE_TICKS).max(1) as i32;
    ((lo.year() + 1)..=hi.year())
        .filter(|y| y % step == 0)
        .filter_map(|y| NaiveDate::from_ymd_opt(y, 1, 1))
        .map(|d| (d, d.format("%Y").to_string()))
        .collect()
}

fn months_between(lo: NaiveDate, hi: NaiveDate) -> i64 {
    i64::from(hi.year() - lo.year()) * 12 + i64::from(hi.month0()) - i64::from(lo.month0())
}

/// `lo` itself when it is a month start, otherwise the first of the next month.
fn first_of_next_month(lo: NaiveDate) -> NaiveDate {
    if lo.day() == 1 {
        return lo;
    }
    let (y, m) = if lo.month() == 12 {
        (lo.year() + 1, 1)
    } else {
        (lo.year(), lo.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1).unwrap_or(lo)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn point(d: &str, mean: f64) -> TimeSeriesPoint {
        TimeSeriesPoint {
            date: date(d),
            mean,
            max: mean + 0.2,
            min: mean - 0.2,
            std: 0.05,
            median: mean + 0.01,
        }
    }

    #[test]
    fn test_empty_series_builds_empty_axes() {
        let page = build(&[]);
        assert!(page.chart.is_empty());
        assert_eq!(page.chart.lines.len(), 5, "legend still lists every metric");
        assert!(page.chart.x_ticks.is_empty());
        assert!(!page.chart.y_ticks.is_empty());
    }

    #[test]
    fn test_five_lines_in_fixed_order() {
        let page = build(&[point("2024-01-01", 0.5), point("2024-01-11", 0.6)]);
        let labels: Vec<&str> = page.chart.lines.iter().map(|l| l.metric.label()).collect();
        assert_eq!(labels, vec!["Mean", "Max", "Min", "Std", "Median"]);
        assert!(page.chart.lines.iter().all(|l| l.points.len() == 2));
    }

    #[test]
    fn test_points_keep_received_order() {
        let page = build(&[
            point("2024-01-10", 0.5),
            point("2024-01-01", 0.4),
            point("2024-01-05", 0.6),
        ]);
        let xs: Vec<f32> = page.chart.lines[0]
            .points
            .iter()
            .map(|p| p.unwrap().0)
            .collect();
        assert_eq!(xs[0], 1.0);
        assert_eq!(xs[1], 0.0);
        assert!((xs[2] - 4.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_points_stay_inside_plot() {
        let page = build(&[point("2024-01-01", -0.3), point("2024-03-01", 0.9)]);
        for line in &page.chart.lines {
            for (x, y) in line.points.iter().flatten() {
                assert!((0.0..=1.0).contains(x));
                assert!((0.0..=1.0).contains(y), "y={y}");
            }
        }
    }

    #[test]
    fn test_missing_value_is_a_gap() {
        let mut p = point("2024-01-02", 0.5);
        p.max = f64::NAN;
        let page = build(&[point("2024-01-01", 0.5), p]);
        assert!(page.chart.lines[1].points[1].is_none());
        assert!(page.chart.lines[0].points[1].is_some());
    }

    #[test]
    fn test_single_point_is_centred() {
        let page = build(&[point("2024-01-01", 0.5)]);
        let (x, y) = page.chart.lines[0].points[0].unwrap();
        assert_eq!(x, 0.5);
        assert!((0.0..=1.0).contains(&y));
        assert_eq!(page.chart.x_ticks.len(), 1);
        assert_eq!(page.chart.x_ticks[0].label, "2024-01-01");
    }

    #[test]
    fn test_date_ticks_daily_for_short_spans() {
        let ticks = date_ticks(date("2024-01-01"), date("2024-01-05"));
        let labels: Vec<&str> = ticks.iter().map(|(_, l)| l.as_str()).collect();
        assert_eq!(
            labels,
            vec!["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05"]
        );
    }

    #[test]
    fn test_date_ticks_monthly_for_medium_spans() {
        let ticks = date_ticks(date("2024-01-15"), date("2024-06-20"));
        let labels: Vec<&str> = ticks.iter().map(|(_, l)| l.as_str()).collect();
        assert_eq!(labels, vec!["2024-02", "2024-03", "2024-04", "2024-05", "2024-06"]);
    }

    #[test]
    fn test_date_ticks_yearly_for_long_spans() {
        let ticks = date_ticks(date("2015-03-01"), date("2024-06-01"));
        assert!(ticks.len() as i64 <= MAX_DATE_TICKS);
        assert!(ticks.iter().all(|(d, l)| d.month() == 1 && d.day() == 1 && l.len() == 4));
    }

    #[test]
    fn test_value_ticks_are_round_numbers() {
        let ticks = value_ticks(0.0, 1.0);
        let labels: Vec<&str> = ticks.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["0.0", "0.2", "0.4", "0.6", "0.8", "1.0"]);
    }
}
