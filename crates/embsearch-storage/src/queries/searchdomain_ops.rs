//! Create, get, list, rename, re-configure, and delete searchdomains.

use rusqlite::{params, Connection};
use tracing::warn;

use embsearch_core::errors::{EmbsearchError, EmbsearchResult};
use embsearch_core::models::{SearchdomainRecord, SearchdomainSettings};

use super::OptionalRow;
use crate::to_storage_err;

/// Insert a new searchdomain. An existing row under the same name is a
/// conflict; use `get` + `create` at the façade for get-or-create.
pub fn create(
    conn: &Connection,
    name: &str,
    settings: &SearchdomainSettings,
) -> EmbsearchResult<SearchdomainRecord> {
    if get_by_name(conn, name)?.is_some() {
        return Err(EmbsearchError::Conflict {
            reason: format!("searchdomain '{name}' already exists"),
        });
    }
    conn.execute(
        "INSERT INTO searchdomain (name, settings) VALUES (?1, ?2)",
        params![name, settings.to_json()?],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(SearchdomainRecord {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        settings: settings.clone(),
    })
}

/// Get a searchdomain by name.
pub fn get_by_name(conn: &Connection, name: &str) -> EmbsearchResult<Option<SearchdomainRecord>> {
    let mut stmt = conn
        .prepare("SELECT id, name, settings FROM searchdomain WHERE name = ?1")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let row = stmt
        .query_row(params![name], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(row.map(|(id, name, settings_json)| SearchdomainRecord {
        id,
        name,
        settings: parse_settings(id, &settings_json),
    }))
}

/// List every searchdomain.
pub fn get_all(conn: &Connection) -> EmbsearchResult<Vec<SearchdomainRecord>> {
    let mut stmt = conn
        .prepare("SELECT id, name, settings FROM searchdomain ORDER BY id")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut records = Vec::new();
    for row in rows {
        let (id, name, settings_json) = row.map_err(|e| to_storage_err(e.to_string()))?;
        records.push(SearchdomainRecord {
            id,
            name,
            settings: parse_settings(id, &settings_json),
        });
    }
    Ok(records)
}

/// Delete a searchdomain; cascades to its entities, datapoints,
/// attributes, and embeddings. Returns whether a row was removed.
pub fn delete(conn: &Connection, id: i64) -> EmbsearchResult<bool> {
    let rows = conn
        .execute("DELETE FROM searchdomain WHERE id = ?1", params![id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows > 0)
}

/// Rename a searchdomain.
pub fn update_name(conn: &Connection, id: i64, new_name: &str) -> EmbsearchResult<bool> {
    let rows = conn
        .execute(
            "UPDATE searchdomain SET name = ?1 WHERE id = ?2",
            params![new_name, id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows > 0)
}

/// Persist the full settings record for a searchdomain.
pub fn update_settings(
    conn: &Connection,
    id: i64,
    settings: &SearchdomainSettings,
) -> EmbsearchResult<bool> {
    let rows = conn
        .execute(
            "UPDATE searchdomain SET settings = ?1 WHERE id = ?2",
            params![settings.to_json()?, id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows > 0)
}

/// Parse a stored settings column. Malformed JSON falls back to defaults;
/// ingress validation keeps that path cold.
fn parse_settings(id: i64, json: &str) -> SearchdomainSettings {
    SearchdomainSettings::from_json(json).unwrap_or_else(|e| {
        warn!(searchdomain_id = id, error = %e, "malformed settings column, using defaults");
        SearchdomainSettings::default()
    })
}
