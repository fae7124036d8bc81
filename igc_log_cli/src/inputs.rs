use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

pub fn is_igc_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_ascii_lowercase().ends_with(".igc"))
        .unwrap_or(false)
}

/// Expand the command-line inputs into the list of IGC files to analyse.
///
/// Directories contribute their direct children, sorted by name. Other
/// paths are kept when they look like IGC files; a missing file surfaces
/// later as a read failure for that file alone.
pub fn collect_igc_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let entries = fs::read_dir(input)
                .with_context(|| format!("failed to list {}", input.display()))?;
            let mut found = Vec::new();
            for entry in entries {
                let path = entry
                    .with_context(|| format!("failed to list {}", input.display()))?
                    .path();
                if path.is_file() && is_igc_file(&path) {
                    found.push(path);
                }
            }
            found.sort();
            debug!("{}: {} IGC files", input.display(), found.len());
            files.extend(found);
        } else if is_igc_file(input) {
            files.push(input.clone());
        } else {
            debug!("Skipping non-IGC input {}", input.display());
        }
    }
    Ok(files)
}
