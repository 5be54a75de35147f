//! JSON snapshot persistence.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::store::state::StoreState;
use crate::store::StoreError;

/// Load a state image, or `None` if the file does not exist yet.
pub fn load_state(path: &Path) -> Result<Option<StoreState>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path)?;
    let state: StoreState = serde_json::from_reader(BufReader::new(file))?;
    tracing::info!(
        path = %path.display(),
        users = state.users.len(),
        pool_entries = state.pool.len(),
        allocations = state.allocations.len(),
        "Loaded state from disk"
    );
    Ok(Some(state))
}

/// Write a state image.
///
/// Writes to a sibling temp file and renames it over the target only once
/// the temp file is flushed and synced. Any write error leaves the previous
/// file in place.
pub fn save_state(path: &Path, state: &StoreState) -> Result<(), StoreError> {
    let tmp = path.with_extension("json.tmp");
    if let Err(e) = write_synced(&tmp, state) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), allocations = state.allocations.len(), "Saved state to disk");
    Ok(())
}

fn write_synced(tmp: &Path, state: &StoreState) -> Result<(), StoreError> {
    let mut writer = BufWriter::new(File::create(tmp)?);
    serde_json::to_writer_pretty(&mut writer, state)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}
