use std::fs;
use std::path::Path;

use anyhow::{Context, Error, Result};
use tokio_rusqlite::Connection;

pub const DB_FILE_NAME: &str = "chat.db";

/// Opens (creating if needed) the sqlite database that backs the
/// session store in `db_dir`.
pub async fn async_db(db_dir: &str) -> Result<Connection, Error> {
    fs::create_dir_all(db_dir)
        .with_context(|| format!("Failed to create storage directory {}", db_dir))?;
    let db_path = Path::new(db_dir).join(DB_FILE_NAME);
    let db = Connection::open(&db_path)
        .await
        .with_context(|| format!("Failed to open db at {}", db_path.display()))?;
    Ok(db)
}

pub fn initialize_db(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv (
             key TEXT PRIMARY KEY,
             value TEXT NOT NULL
         );",
    )
}

/// Opens the database and makes sure the schema exists. Any failure
/// here is fatal for the program.
pub async fn open_and_initialize(db_dir: &str) -> Result<Connection, Error> {
    let db = async_db(db_dir).await?;
    db.call(|conn| {
        initialize_db(conn)?;
        Ok(())
    })
    .await
    .context("DB initialization failed")?;
    Ok(db)
}
