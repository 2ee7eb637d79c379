//! Document sink: PDF rendering, the write to the report bucket and the
//! time-bounded download link.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::report::model::ReportDocument;
use crate::report::pdf::render_pdf;
use crate::storage::ObjectStore;

pub const REPORT_PREFIX: &str = "reports/";
const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Where a persisted report can be fetched without credentials, and until when.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalHandle {
    pub key: String,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Object key for one persisted report. `run_id` keeps keys of reports
/// generated within the same second apart.
pub fn report_key(
    farm_id: i64,
    index: &str,
    generated_at: DateTime<Utc>,
    run_id: Uuid,
) -> String {
    format!(
        "{REPORT_PREFIX}{farm_id}_{index}_{}_{}.pdf",
        generated_at.format("%Y%m%dT%H%M%SZ"),
        run_id.simple()
    )
}

pub struct DocumentSink {
    store: Arc<dyn ObjectStore>,
    link_ttl: Duration,
}

impl DocumentSink {
    pub fn new(store: Arc<dyn ObjectStore>, link_ttl: Duration) -> Self {
        Self { store, link_ttl }
    }

    /// Renders and writes the document, then signs a read link for it.
    ///
    /// The object is written with a single put of the complete body, so a
    /// failed or abandoned request never leaves a partial report behind.
    pub async fn persist(&self, report: ReportDocument) -> Result<RetrievalHandle, AppError> {
        let key = report_key(
            report.farm_id(),
            report.index(),
            report.generated_at(),
            Uuid::new_v4(),
        );

        let pdf = tokio::task::spawn_blocking(move || render_pdf(&report))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("PDF render task failed: {e}")))??;
        let size = pdf.len();

        self.store
            .put(&key, Bytes::from(pdf), PDF_CONTENT_TYPE)
            .await
            .map_err(|e| {
                error!("Failed to store report '{key}': {e}");
                AppError::Persist(e.to_string())
            })?;

        let issued_at = Utc::now();
        let url = self.store.presign_get(&key, self.link_ttl).await?;
        let expires_at = issued_at
            + chrono::Duration::from_std(self.link_ttl).unwrap_or_else(|_| chrono::Duration::zero());

        info!("Stored report '{key}' ({size} bytes), link valid until {expires_at}");
        Ok(RetrievalHandle {
            key,
            url,
            expires_at,
        })
    }
}
