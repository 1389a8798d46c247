//! Entity hydration: materialize complete entity graphs from four flat
//! result sets in one round-trip batch.
//!
//! Four selects per call (embeddings, datapoints, attributes, entities),
//! two intermediate maps bucketed by foreign key, then two attachment
//! passes. Constant query count regardless of entity count — this is
//! what makes coarse entity-cache invalidation affordable.

use std::collections::HashMap;

use rusqlite::{params, Connection};

use embsearch_core::errors::EmbsearchResult;
use embsearch_core::models::{Attribute, Datapoint, Entity, StoredEmbedding};

use crate::to_storage_err;

const SELECT_EMBEDDINGS: &str = "
    SELECT e.id, e.id_datapoint, e.model, e.embedding
    FROM embedding e
    JOIN datapoint d ON d.id = e.id_datapoint
    JOIN entity en ON en.id = d.id_entity
    WHERE en.id_searchdomain = ?1";

const SELECT_DATAPOINTS: &str = "
    SELECT d.id, d.id_entity, d.name, d.probmethod_embedding
    FROM datapoint d
    JOIN entity en ON en.id = d.id_entity
    WHERE en.id_searchdomain = ?1";

const SELECT_ATTRIBUTES: &str = "
    SELECT a.id, a.id_entity, a.attribute, a.value
    FROM attribute a
    JOIN entity en ON en.id = a.id_entity
    WHERE en.id_searchdomain = ?1";

// Two fixed statements for the entity predicate; the WHERE clause is
// never assembled from caller strings.
const SELECT_ENTITIES_ALL: &str = "
    SELECT id, name, probmethod, id_searchdomain
    FROM entity
    WHERE id_searchdomain = ?1
    ORDER BY id";

const SELECT_ENTITIES_BY_NAME: &str = "
    SELECT id, name, probmethod, id_searchdomain
    FROM entity
    WHERE id_searchdomain = ?1 AND name = ?2
    ORDER BY id";

/// Hydrate every entity in a searchdomain.
pub fn entity_get_all(conn: &Connection, searchdomain_id: i64) -> EmbsearchResult<Vec<Entity>> {
    hydrate(conn, searchdomain_id, None)
}

/// Hydrate a single entity by name.
pub fn entity_get_by_name(
    conn: &Connection,
    searchdomain_id: i64,
    name: &str,
) -> EmbsearchResult<Option<Entity>> {
    Ok(hydrate(conn, searchdomain_id, Some(name))?.into_iter().next())
}

fn hydrate(
    conn: &Connection,
    searchdomain_id: i64,
    name: Option<&str>,
) -> EmbsearchResult<Vec<Entity>> {
    // Bucket embeddings by owning datapoint.
    let mut embeddings_by_datapoint: HashMap<i64, Vec<StoredEmbedding>> = HashMap::new();
    {
        let mut stmt = conn
            .prepare(SELECT_EMBEDDINGS)
            .map_err(|e| to_storage_err(e.to_string()))?;
        let rows = stmt
            .query_map(params![searchdomain_id], |row| {
                Ok(StoredEmbedding {
                    id: row.get(0)?,
                    datapoint_id: row.get(1)?,
                    model: row.get(2)?,
                    bytes: row.get(3)?,
                })
            })
            .map_err(|e| to_storage_err(e.to_string()))?;
        for row in rows {
            let embedding = row.map_err(|e| to_storage_err(e.to_string()))?;
            embeddings_by_datapoint
                .entry(embedding.datapoint_id)
                .or_default()
                .push(embedding);
        }
    }

    // Bucket datapoints by owning entity, attaching embeddings as they
    // leave the intermediate map.
    let mut datapoints_by_entity: HashMap<i64, Vec<Datapoint>> = HashMap::new();
    {
        let mut stmt = conn
            .prepare(SELECT_DATAPOINTS)
            .map_err(|e| to_storage_err(e.to_string()))?;
        let rows = stmt
            .query_map(params![searchdomain_id], |row| {
                Ok(Datapoint {
                    id: row.get(0)?,
                    entity_id: row.get(1)?,
                    name: row.get(2)?,
                    probmethod_embedding: row.get(3)?,
                    embeddings: Vec::new(),
                })
            })
            .map_err(|e| to_storage_err(e.to_string()))?;
        for row in rows {
            let mut datapoint = row.map_err(|e| to_storage_err(e.to_string()))?;
            if let Some(embeddings) = embeddings_by_datapoint.remove(&datapoint.id) {
                datapoint.embeddings = embeddings;
            }
            datapoints_by_entity
                .entry(datapoint.entity_id)
                .or_default()
                .push(datapoint);
        }
    }
    drop(embeddings_by_datapoint);

    // Bucket attributes by owning entity.
    let mut attributes_by_entity: HashMap<i64, Vec<Attribute>> = HashMap::new();
    {
        let mut stmt = conn
            .prepare(SELECT_ATTRIBUTES)
            .map_err(|e| to_storage_err(e.to_string()))?;
        let rows = stmt
            .query_map(params![searchdomain_id], |row| {
                Ok(Attribute {
                    id: row.get(0)?,
                    entity_id: row.get(1)?,
                    name: row.get(2)?,
                    value: row.get(3)?,
                })
            })
            .map_err(|e| to_storage_err(e.to_string()))?;
        for row in rows {
            let attribute = row.map_err(|e| to_storage_err(e.to_string()))?;
            attributes_by_entity
                .entry(attribute.entity_id)
                .or_default()
                .push(attribute);
        }
    }

    // Final pass: entities matching the predicate, draining both maps.
    let mut stmt = conn
        .prepare(match name {
            Some(_) => SELECT_ENTITIES_BY_NAME,
            None => SELECT_ENTITIES_ALL,
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let map_entity = |row: &rusqlite::Row<'_>| -> rusqlite::Result<Entity> {
        Ok(Entity {
            id: row.get(0)?,
            name: row.get(1)?,
            probmethod: row.get(2)?,
            searchdomain_id: row.get(3)?,
            attributes: Vec::new(),
            datapoints: Vec::new(),
        })
    };
    let rows = match name {
        Some(name) => stmt.query_map(params![searchdomain_id, name], map_entity),
        None => stmt.query_map(params![searchdomain_id], map_entity),
    }
    .map_err(|e| to_storage_err(e.to_string()))?;

    let mut entities = Vec::new();
    for row in rows {
        let mut entity = row.map_err(|e| to_storage_err(e.to_string()))?;
        if let Some(attributes) = attributes_by_entity.remove(&entity.id) {
            entity.attributes = attributes;
        }
        if let Some(datapoints) = datapoints_by_entity.remove(&entity.id) {
            entity.datapoints = datapoints;
        }
        entities.push(entity);
    }

    Ok(entities)
}
