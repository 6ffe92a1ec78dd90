//! Level files live at `<maps_dir>/level_<n>.map`, one grid row per line.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("map for level {level} not found: {}", path.display())]
    NotFound { level: u32, path: PathBuf },
    #[error("map file {} is invalid: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
    #[error("failed to read map file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub fn map_path(maps_dir: &Path, level: u32) -> PathBuf {
    maps_dir.join(format!("level_{}.map", level))
}

/// Reads the rows of a level. Blank lines are skipped and line endings stripped.
pub fn load_map(maps_dir: impl AsRef<Path>, level: u32) -> Result<Vec<String>, MapError> {
    let path = map_path(maps_dir.as_ref(), level);
    let text = fs::read_to_string(&path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => MapError::NotFound {
            level,
            path: path.clone(),
        },
        _ => MapError::Io {
            path: path.clone(),
            source,
        },
    })?;

    let rows: Vec<String> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect();

    if rows.is_empty() {
        return Err(MapError::Invalid {
            path,
            reason: "no rows".to_string(),
        });
    }
    Ok(rows)
}
