//! Entity row operations: upsert-by-name, delete, attribute edits.

use rusqlite::{params, Connection};

use embsearch_core::errors::EmbsearchResult;
use embsearch_core::models::{Attribute, DatapointSpec, Entity};

use super::datapoint_ops::{self, PackedVectors};
use crate::to_storage_err;

/// Insert an entity with its attributes, datapoints, and pre-packed
/// embeddings, atomically. A prior entity under the same
/// (searchdomain, name) is deleted first — with cascade — which is what
/// keeps the name-unique invariant an upsert rather than a conflict.
/// `packed` is parallel to `datapoints`.
pub fn insert(
    conn: &Connection,
    searchdomain_id: i64,
    name: &str,
    probmethod: &str,
    attributes: &[(String, String)],
    datapoints: &[DatapointSpec],
    packed: &[PackedVectors],
) -> EmbsearchResult<Entity> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("entity insert begin: {e}")))?;

    match insert_inner(
        &tx,
        searchdomain_id,
        name,
        probmethod,
        attributes,
        datapoints,
        packed,
    ) {
        Ok(entity) => {
            tx.commit()
                .map_err(|e| to_storage_err(format!("entity insert commit: {e}")))?;
            Ok(entity)
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

fn insert_inner(
    conn: &Connection,
    searchdomain_id: i64,
    name: &str,
    probmethod: &str,
    attributes: &[(String, String)],
    datapoints: &[DatapointSpec],
    packed: &[PackedVectors],
) -> EmbsearchResult<Entity> {
    // Upsert-by-name: drop the previous entity and everything under it.
    conn.execute(
        "DELETE FROM entity WHERE id_searchdomain = ?1 AND name = ?2",
        params![searchdomain_id, name],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    conn.execute(
        "INSERT INTO entity (name, probmethod, id_searchdomain) VALUES (?1, ?2, ?3)",
        params![name, probmethod, searchdomain_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    let entity_id = conn.last_insert_rowid();

    let mut attribute_rows = Vec::with_capacity(attributes.len());
    for (attribute, value) in attributes {
        conn.execute(
            "INSERT INTO attribute (id_entity, attribute, value) VALUES (?1, ?2, ?3)",
            params![entity_id, attribute, value],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
        attribute_rows.push(Attribute {
            id: conn.last_insert_rowid(),
            entity_id,
            name: attribute.clone(),
            value: value.clone(),
        });
    }

    let mut datapoint_rows = Vec::with_capacity(datapoints.len());
    for (spec, vectors) in datapoints.iter().zip(packed.iter()) {
        datapoint_rows.push(datapoint_ops::insert_inner(conn, entity_id, spec, vectors)?);
    }

    Ok(Entity {
        id: entity_id,
        name: name.to_string(),
        probmethod: probmethod.to_string(),
        searchdomain_id,
        attributes: attribute_rows,
        datapoints: datapoint_rows,
    })
}

/// Delete an entity by name; children cascade. Returns whether a row
/// was removed.
pub fn delete_by_name(
    conn: &Connection,
    searchdomain_id: i64,
    name: &str,
) -> EmbsearchResult<bool> {
    let rows = conn
        .execute(
            "DELETE FROM entity WHERE id_searchdomain = ?1 AND name = ?2",
            params![searchdomain_id, name],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows > 0)
}

/// Update an attribute's value, inserting it when absent and
/// `create_if_missing` is set.
pub fn update_attribute(
    conn: &Connection,
    entity_id: i64,
    attribute: &str,
    value: &str,
    create_if_missing: bool,
) -> EmbsearchResult<bool> {
    let rows = conn
        .execute(
            "UPDATE attribute SET value = ?1 WHERE id_entity = ?2 AND attribute = ?3",
            params![value, entity_id, attribute],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    if rows > 0 {
        return Ok(true);
    }
    if !create_if_missing {
        return Ok(false);
    }
    conn.execute(
        "INSERT INTO attribute (id_entity, attribute, value) VALUES (?1, ?2, ?3)",
        params![entity_id, attribute, value],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(true)
}

/// Delete a single named attribute of an entity.
pub fn delete_attribute(
    conn: &Connection,
    entity_id: i64,
    attribute: &str,
) -> EmbsearchResult<bool> {
    let rows = conn
        .execute(
            "DELETE FROM attribute WHERE id_entity = ?1 AND attribute = ?2",
            params![entity_id, attribute],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows > 0)
}
