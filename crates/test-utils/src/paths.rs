//! Temporary data directories laid out like the server's `static/data`.

use std::path::PathBuf;

/// Creates a temporary directory with a specific prefix.
///
/// The directory is automatically cleaned up when the returned `TempDir` is dropped.
pub fn temp_test_dir_with_prefix(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temporary test directory")
}

/// An archive directory with a `styles/` subdirectory.
pub struct DataDir {
    pub root: tempfile::TempDir,
}

impl DataDir {
    pub fn new() -> Self {
        let root = temp_test_dir_with_prefix("chart_tiles_");
        std::fs::create_dir_all(root.path().join("styles"))
            .expect("Failed to create styles directory");
        Self { root }
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    pub fn styles(&self) -> PathBuf {
        self.root.path().join("styles")
    }
}

impl Default for DataDir {
    fn default() -> Self {
        Self::new()
    }
}
