use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::error::DasError;

/// Expands a leading `~` to the caller's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf, DasError> {
    let Some(rest) = path.strip_prefix('~') else {
        return Ok(PathBuf::from(path));
    };
    let home = BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or_else(|| DasError::Filesystem("unable to resolve home directory".to_string()))?;
    Ok(home.join(rest.trim_start_matches('/')))
}

pub fn read_file(path: &Path) -> Result<Vec<u8>, DasError> {
    fs::read(path).map_err(|err| DasError::Filesystem(format!("read {}: {err}", path.display())))
}
