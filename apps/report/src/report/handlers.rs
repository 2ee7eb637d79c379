use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::report::pipeline::{compose_preview, compose_report};
use crate::state::AppState;

pub const TITLE_HEADER: &str = "x-report-title";
pub const DATES_HEADER: &str = "x-report-dates";

/// GET /report/:farm_id/:index
/// Inline PNG grid of every artifact for the farm and index.
pub async fn handle_preview(
    State(state): State<AppState>,
    Path((farm_id, index)): Path<(i64, String)>,
) -> Result<Response, AppError> {
    validate_index(&index)?;
    info!("Preview requested for farm {farm_id} / {index}");
    let preview = compose_preview(&state, farm_id, &index).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    insert_text_header(&mut headers, TITLE_HEADER, &preview.title);
    insert_text_header(&mut headers, DATES_HEADER, &preview.dates.join(","));

    Ok((headers, preview.png).into_response())
}

/// GET /download/:farm_id/:index
/// Builds and stores the PDF report, then redirects to its signed link.
pub async fn handle_download(
    State(state): State<AppState>,
    Path((farm_id, index)): Path<(i64, String)>,
) -> Result<Response, AppError> {
    validate_index(&index)?;
    info!("Report requested for farm {farm_id} / {index}");
    let handle = compose_report(&state, farm_id, &index).await?;

    let location = HeaderValue::from_str(&handle.url)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("unusable report URL: {e}")))?;
    Ok((StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response())
}

fn validate_index(index: &str) -> Result<(), AppError> {
    if index.is_empty() || !index.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::Validation(format!(
            "index must be a non-empty alphanumeric name, got '{index}'"
        )));
    }
    Ok(())
}

fn insert_text_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(name, v);
        }
        Err(_) => warn!("Dropping {name} header; value is not header-safe"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_index() {
        assert!(validate_index("NDVI").is_ok());
        assert!(validate_index("ndre2").is_ok());
        assert!(validate_index("").is_err());
        assert!(validate_index("ND VI").is_err());
        assert!(validate_index("../x").is_err());
    }
}
