//! v001: searchdomain, entity, attribute, datapoint, embedding tables.

use rusqlite::Connection;

use embsearch_core::errors::EmbsearchResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> EmbsearchResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS searchdomain (
            id       INTEGER PRIMARY KEY AUTOINCREMENT,
            name     TEXT NOT NULL UNIQUE,
            settings TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS entity (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            name            TEXT NOT NULL,
            probmethod      TEXT NOT NULL,
            id_searchdomain INTEGER NOT NULL
                REFERENCES searchdomain(id) ON DELETE CASCADE,
            UNIQUE(id_searchdomain, name)
        );

        CREATE INDEX IF NOT EXISTS idx_entity_searchdomain
            ON entity(id_searchdomain);

        CREATE TABLE IF NOT EXISTS attribute (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            id_entity INTEGER NOT NULL
                REFERENCES entity(id) ON DELETE CASCADE,
            attribute TEXT NOT NULL,
            value     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_attribute_entity
            ON attribute(id_entity);

        CREATE TABLE IF NOT EXISTS datapoint (
            id                   INTEGER PRIMARY KEY AUTOINCREMENT,
            id_entity            INTEGER NOT NULL
                REFERENCES entity(id) ON DELETE CASCADE,
            name                 TEXT NOT NULL,
            probmethod_embedding TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_datapoint_entity
            ON datapoint(id_entity);

        CREATE TABLE IF NOT EXISTS embedding (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            id_datapoint INTEGER NOT NULL
                REFERENCES datapoint(id) ON DELETE CASCADE,
            model        TEXT NOT NULL,
            embedding    BLOB NOT NULL,
            UNIQUE(id_datapoint, model)
        );

        CREATE INDEX IF NOT EXISTS idx_embedding_datapoint
            ON embedding(id_datapoint);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
