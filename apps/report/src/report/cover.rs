//! Boundary metadata for the cover page.
//!
//! The boundary bucket holds one GeoJSON feature per farm field; the cover only
//! needs `properties.area` (acres) and the object's last-modified header. A
//! malformed document degrades to a partial `BoundaryMeta`; it never fails the
//! report.

use serde_json::Value;
use tracing::{info, warn};

use crate::catalog::farm_prefix;
use crate::report::model::BoundaryMeta;
use crate::storage::{ObjectStore, StorageError};

/// Extracts the cover metadata from a boundary document.
///
/// `area` may be a JSON number or a numeric string; anything else (including a
/// body that is not JSON at all) leaves `area_acres` empty.
pub fn parse_boundary_meta(body: &[u8], last_modified: Option<String>) -> BoundaryMeta {
    let area_acres = match serde_json::from_slice::<Value>(body) {
        Ok(doc) => match doc.pointer("/properties/area") {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|a| a.is_finite()),
        Err(e) => {
            warn!("Boundary document is not valid JSON: {e}");
            None
        }
    };
    if area_acres.is_none() {
        warn!("Boundary area missing or not numeric; omitting it from the cover");
    }

    BoundaryMeta {
        area_acres,
        date_added: last_modified,
    }
}

/// Loads the farm's boundary metadata, if the farm has a boundary document.
///
/// With several documents under the farm prefix the most recently modified one
/// wins. Storage failures propagate; content problems do not.
pub async fn load_boundary_meta(
    store: &dyn ObjectStore,
    farm_id: i64,
) -> Result<Option<BoundaryMeta>, StorageError> {
    let listing = store.list(&farm_prefix(farm_id)).await?;
    let Some(latest) = listing.iter().max_by(|a, b| {
        a.last_modified
            .cmp(&b.last_modified)
            .then_with(|| a.key.cmp(&b.key))
    }) else {
        info!("No boundary document for farm {farm_id}");
        return Ok(None);
    };

    let object = store.get(&latest.key).await?;
    Ok(Some(parse_boundary_meta(&object.body, object.last_modified)))
}
