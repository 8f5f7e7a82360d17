use anyhow::{Error, Result};
use rusqlite::OptionalExtension;
use serde_json::Value;
use tokio_rusqlite::Connection;

pub async fn kv_get(db: &Connection, key: &str) -> Result<Option<Value>, Error> {
    let k = key.to_owned();
    let raw = db
        .call(move |conn| {
            let raw = conn
                .query_row("SELECT value FROM kv WHERE key = ?", [k], |row| {
                    row.get::<_, String>(0)
                })
                .optional()?;
            Ok(raw)
        })
        .await?;

    match raw {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub async fn kv_set(db: &Connection, key: &str, value: &Value) -> Result<(), Error> {
    let k = key.to_owned();
    let data = value.to_string();
    db.call(move |conn| {
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [k, data],
        )?;
        Ok(())
    })
    .await?;

    Ok(())
}
