//! Slug assignment for snapshots and changesets
//!
//! Slugs are human-readable aliases of the form
//! `<prefix>_YYYYMMDD-HHMMSS_NNN`, where NNN is a per-second collision
//! counter. A node keeps its first slug forever.

use intentgraph_store::{GraphTx, NodeId, Result};

/// Assign (or return the pre-existing) slug for a node, inside the caller's
/// transaction.
pub fn assign_slug(tx: &GraphTx<'_>, prefix: &str, id: &NodeId) -> Result<String> {
    if let Some(existing) = tx.slug_of(id)? {
        return Ok(existing);
    }
    let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S").to_string();
    let serial = tx.count_slugs_like(&format!("{}_{}_%", prefix, stamp))?;
    let slug = format!("{}_{}_{:03}", prefix, stamp, serial);
    tx.put_slug(id, &slug)?;
    Ok(slug)
}
