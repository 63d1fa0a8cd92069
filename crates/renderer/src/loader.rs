use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
#[error("failed to read shader source {}: {source}", path.display())]
pub struct LoaderError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Reads a shader stage from disk as UTF-8 text.
pub fn read_shader(path: &Path) -> Result<String, LoaderError> {
    fs::read_to_string(path).map_err(|source| LoaderError {
        path: path.to_path_buf(),
        source,
    })
}
