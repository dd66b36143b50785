//! Error types for the tile archive engine and tile service.

use thiserror::Error;

/// Result type alias using TileError.
pub type TileResult<T> = Result<T, TileError>;

/// Primary error type for archive and tile operations.
#[derive(Debug, Error)]
pub enum TileError {
    // === Archive Errors ===
    #[error("Failed to open archive {path}: {message}")]
    ArchiveOpen { path: String, message: String },

    #[error("Failed to read metadata of {path}: {message}")]
    MetadataQuery { path: String, message: String },

    // === Tile Errors ===
    #[error("Tile query failed on {path}: {message}")]
    TileQuery { path: String, message: String },

    #[error("Failed to decompress tile {tile} of {path}: {message}")]
    TileDecode {
        path: String,
        tile: String,
        message: String,
    },

    // === Request Errors ===
    #[error("Invalid archive name: {0}")]
    InvalidArchiveName(String),

    #[error("Invalid tile coordinate: {0}")]
    InvalidCoordinate(String),

    // === Infrastructure Errors ===
    #[error("Failed to scan archive directory {path}: {message}")]
    DirectoryScan { path: String, message: String },

    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl TileError {
    /// Get the HTTP status code for this error.
    ///
    /// Decode failures map to 500 here; the tile service decides separately
    /// whether to fold them into a 404.
    pub fn http_status_code(&self) -> u16 {
        match self {
            TileError::InvalidArchiveName(_) | TileError::InvalidCoordinate(_) => 400,

            TileError::Timeout(_) => 504,

            TileError::ArchiveOpen { .. }
            | TileError::MetadataQuery { .. }
            | TileError::TileQuery { .. }
            | TileError::TileDecode { .. }
            | TileError::DirectoryScan { .. } => 500,
        }
    }

    /// Short machine-readable kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            TileError::ArchiveOpen { .. } => "archive_open",
            TileError::MetadataQuery { .. } => "metadata_query",
            TileError::TileQuery { .. } => "tile_query",
            TileError::TileDecode { .. } => "tile_decode",
            TileError::InvalidArchiveName(_) => "invalid_archive_name",
            TileError::InvalidCoordinate(_) => "invalid_coordinate",
            TileError::DirectoryScan { .. } => "directory_scan",
            TileError::Timeout(_) => "timeout",
        }
    }

    /// True when the failure is a payload that claimed gzip but did not inflate.
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, TileError::TileDecode { .. })
    }
}
