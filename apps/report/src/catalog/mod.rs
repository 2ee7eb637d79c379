//! Artifact catalog: picks the colourized index PNGs for one farm and index.
//!
//! Keys follow `"{farm_id}_{farm name...}/{date}_..._{INDEX}.png"`. Selection is a
//! pure function over a listing so it can be tested without a bucket; the listing
//! itself is `list_artifacts`.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::storage::{ObjectStore, ObjectSummary, StorageError};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A previously rendered index raster for one farm and capture date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageArtifact {
    pub key: String,
    pub farm_id: i64,
    pub captured_date: NaiveDate,
    pub index: String,
}

impl ImageArtifact {
    /// The date token exactly as it appears in the key, used as the grid label.
    pub fn date_label(&self) -> &str {
        date_token(&self.key).unwrap_or_default()
    }
}

/// Artifacts of a single `(farm_id, index)` pair, unique by key, ascending by capture date.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSet {
    farm_id: i64,
    index: String,
    artifacts: Vec<ImageArtifact>,
}

impl ArtifactSet {
    pub fn farm_id(&self) -> i64 {
        self.farm_id
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn as_slice(&self) -> &[ImageArtifact] {
        &self.artifacts
    }

    /// Human-readable farm name taken from the first key's folder
    /// (`"42_Green_Acres/..."` → `"Green Acres"`). `None` for an empty set
    /// or a folder that carries only the farm id.
    pub fn farm_display_name(&self) -> Option<String> {
        let first = self.artifacts.first()?;
        let folder = first.key.split('/').next()?;
        let name = folder.split('_').skip(1).collect::<Vec<_>>().join(" ");
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }
}

/// Listing prefix shared by every key of a farm.
pub fn farm_prefix(farm_id: i64) -> String {
    format!("{farm_id}_")
}

/// Date token of a key: last path segment, first underscore-delimited token.
pub fn date_token(key: &str) -> Option<&str> {
    let file = key.rsplit('/').next()?;
    file.split('_').next().filter(|t| !t.is_empty())
}

/// Filters and orders a listing for `(farm_id, index)`.
///
/// Keeps keys under the farm prefix ending in `_{INDEX}.png` (index upper-cased),
/// drops duplicates and keys whose date token is not a `YYYY-MM-DD` date, and
/// sorts ascending by capture date (key as tie-break).
pub fn select(listing: &[ObjectSummary], farm_id: i64, index: &str) -> ArtifactSet {
    let index = index.trim().to_uppercase();
    let prefix = farm_prefix(farm_id);
    let suffix = format!("_{index}.png");
    let mut seen: HashSet<&str> = HashSet::new();

    let mut artifacts: Vec<ImageArtifact> = listing
        .iter()
        .filter(|o| o.key.starts_with(&prefix) && o.key.ends_with(&suffix))
        .filter(|o| seen.insert(o.key.as_str()))
        .filter_map(|o| {
            let token = date_token(&o.key)?;
            match NaiveDate::parse_from_str(token, DATE_FORMAT) {
                Ok(captured_date) => Some(ImageArtifact {
                    key: o.key.clone(),
                    farm_id,
                    captured_date,
                    index: index.clone(),
                }),
                Err(_) => {
                    warn!("Skipping artifact '{}': date token '{token}' is not a date", o.key);
                    None
                }
            }
        })
        .collect();

    artifacts.sort_by(|a, b| {
        a.captured_date
            .cmp(&b.captured_date)
            .then_with(|| a.key.cmp(&b.key))
    });

    ArtifactSet {
        farm_id,
        index,
        artifacts,
    }
}

/// Lists the farm's prefix in `store` and selects the artifacts for `index`.
pub async fn list_artifacts(
    store: &dyn ObjectStore,
    farm_id: i64,
    index: &str,
) -> Result<ArtifactSet, StorageError> {
    let listing = store.list(&farm_prefix(farm_id)).await?;
    let set = select(&listing, farm_id, index);
    debug!(
        "Selected {} of {} listed objects for farm {farm_id}/{}",
        set.len(),
        listing.len(),
        set.index()
    );
    Ok(set)
}
