//! Temporal statistics client. The only place the external statistics API is called.
//!
//! The service returns per-date `[mean, max, min, std, median]` rows for a farm and
//! index. Any non-200 answer is surfaced as `StatsError::Status` so the report is
//! aborted instead of rendering an empty chart.
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_ATTEMPTS: u32 = 2;
const STAT_COLUMNS: usize = 5;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("statistics API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One date of the temporal series. Missing values are `NaN` and render as line gaps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    pub std: f64,
    pub median: f64,
}

/// Raw response body of the statistics endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct StatsResponse {
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub stats: Vec<Vec<Option<f64>>>,
}

/// Source of the temporal series. Carried in `AppState` as `Arc<dyn StatsSource>`.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn fetch(&self, farm_id: i64, index: &str) -> Result<Vec<TimeSeriesPoint>, StatsError>;
}

/// HTTP client for the statistics endpoint.
#[derive(Clone)]
pub struct StatsClient {
    client: Client,
    url: String,
}

impl StatsClient {
    pub fn new(url: String) -> Result<Self, StatsError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl StatsSource for StatsClient {
    /// Retries once on transport errors and 5xx; every other non-200 fails immediately.
    async fn fetch(&self, farm_id: i64, index: &str) -> Result<Vec<TimeSeriesPoint>, StatsError> {
        let farm_param = farm_id.to_string();
        let mut last_error: Option<StatsError> = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let delay = std::time::Duration::from_millis(500 * u64::from(attempt));
                warn!(
                    "Statistics fetch attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .get(&self.url)
                .query(&[("farmID", farm_param.as_str()), ("index", index)])
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(StatsError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(StatsError::Status {
                    status: status.as_u16(),
                    body,
                });
                continue;
            }
            if status.as_u16() != 200 {
                let body = response.text().await.unwrap_or_default();
                return Err(StatsError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let body = response.bytes().await?;
            let parsed: StatsResponse = serde_json::from_slice(&body)?;
            debug!(
                "Statistics for farm {farm_id}/{index}: {} dates, {} rows",
                parsed.dates.len(),
                parsed.stats.len()
            );
            return Ok(parse_series(parsed));
        }

        Err(last_error.unwrap_or(StatsError::Status {
            status: 0,
            body: "no attempt made".to_string(),
        }))
    }
}

/// Zips dates with stat rows in the order received.
///
/// Mismatched lengths are truncated to the shorter side; rows with an unparsable
/// date or fewer than five values are skipped.
pub fn parse_series(response: StatsResponse) -> Vec<TimeSeriesPoint> {
    if response.dates.len() != response.stats.len() {
        warn!(
            "Statistics misaligned: {} dates vs {} rows; truncating",
            response.dates.len(),
            response.stats.len()
        );
    }

    response
        .dates
        .iter()
        .zip(response.stats.iter())
        .filter_map(|(raw_date, row)| {
            let Some(date) = parse_series_date(raw_date) else {
                warn!("Skipping statistics row with unparsable date '{raw_date}'");
                return None;
            };
            if row.len() < STAT_COLUMNS {
                warn!(
                    "Skipping statistics row for {date}: expected {STAT_COLUMNS} values, got {}",
                    row.len()
                );
                return None;
            }
            let value = |i: usize| row[i].unwrap_or(f64::NAN);
            Some(TimeSeriesPoint {
                date,
                mean: value(0),
                max: value(1),
                min: value(2),
                std: value(3),
                median: value(4),
            })
        })
        .collect()
}

fn parse_series_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
}
