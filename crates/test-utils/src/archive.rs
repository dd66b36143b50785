//! Builder for small MBTiles archives written to disk.
//!
//! Archives are written in rollback-journal mode so the single `.mbtiles`
//! file is complete once [`ArchiveBuilder::write`] returns.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::{ConnectOptions, Connection};

/// Declarative description of an MBTiles archive.
///
/// # Example
///
/// ```ignore
/// use test_utils::ArchiveBuilder;
///
/// ArchiveBuilder::new()
///     .metadata("format", "png")
///     .tile(1, 1, 1, vec![0x89, 0x50, 0x4e, 0x47])
///     .write(&dir.path().join("world.mbtiles"))
///     .await
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    metadata: Vec<(String, String)>,
    tiles: Vec<(u32, u32, u32, Vec<u8>)>,
    metadata_table: bool,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            metadata: Vec::new(),
            tiles: Vec::new(),
            metadata_table: true,
        }
    }

    /// Add a `metadata` row.
    pub fn metadata(mut self, name: &str, value: &str) -> Self {
        self.metadata.push((name.to_string(), value.to_string()));
        self
    }

    /// Add a `tiles` row. `y` is the stored (TMS) row.
    pub fn tile(mut self, z: u32, x: u32, y: u32, data: impl Into<Vec<u8>>) -> Self {
        self.tiles.push((z, x, y, data.into()));
        self
    }

    /// Omit the `metadata` relation entirely.
    pub fn without_metadata_table(mut self) -> Self {
        self.metadata_table = false;
        self
    }

    /// Write the archive to `path`, creating the file.
    pub async fn write(&self, path: &Path) -> Result<(), sqlx::Error> {
        let mut conn = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Delete)
            .connect()
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE tiles (
                zoom_level INTEGER NOT NULL,
                tile_column INTEGER NOT NULL,
                tile_row INTEGER NOT NULL,
                tile_data BLOB NOT NULL,
                PRIMARY KEY (zoom_level, tile_column, tile_row)
            )
            "#,
        )
        .execute(&mut conn)
        .await?;

        if self.metadata_table {
            sqlx::query(
                r#"
                CREATE TABLE metadata (
                    name TEXT NOT NULL,
                    value TEXT,
                    UNIQUE(name)
                )
                "#,
            )
            .execute(&mut conn)
            .await?;

            for (name, value) in &self.metadata {
                sqlx::query("INSERT INTO metadata (name, value) VALUES (?, ?)")
                    .bind(name)
                    .bind(value)
                    .execute(&mut conn)
                    .await?;
            }
        }

        for (z, x, y, data) in &self.tiles {
            sqlx::query(
                "INSERT INTO tiles (zoom_level, tile_column, tile_row, tile_data) VALUES (?, ?, ?, ?)",
            )
            .bind(*z as i64)
            .bind(*x as i64)
            .bind(*y as i64)
            .bind(data.as_slice())
            .execute(&mut conn)
            .await?;
        }

        conn.close().await
    }
}

/// Write a vector style descriptor where the tile service expects it:
/// `<styles_dir>/<archive_name>/style.json`.
pub fn write_style(styles_dir: &Path, archive_name: &str) -> std::io::Result<()> {
    let dir = styles_dir.join(archive_name);
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join("style.json"), br#"{"version":8,"layers":[]}"#)
}
