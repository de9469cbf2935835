use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use rusqlite::Connection;

/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "songs.sqlite";

/// Open (creating if needed) the song catalog at `path` and run the lazy
/// migrations.
pub fn ensure_schema(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open song catalog at {}", path.display()))?;
    create_tables(&conn)?;
    Ok(conn)
}

/// Catalog living only in memory.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory catalog")?;
    create_tables(&conn)?;
    Ok(conn)
}

fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            short_name TEXT,
            num_plays_public INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )
    .context("failed to create songs table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS songs_name_nocase ON songs (name COLLATE NOCASE)",
        [],
    )
    .context("failed to create song name index")?;

    Ok(())
}

/// Resolve the default catalog path inside the platform data directory.
pub fn default_db_path() -> Result<PathBuf> {
    let dirs = data_dirs()?;
    Ok(dirs.data_dir().join(DB_FILE_NAME))
}

pub(crate) fn data_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "databruce", "setlist-search")
        .ok_or_else(|| anyhow!("could not locate home directory"))
}
