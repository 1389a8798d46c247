//! Datapoint and embedding row operations.

use rusqlite::{params, Connection};

use embsearch_core::errors::EmbsearchResult;
use embsearch_core::models::{Datapoint, DatapointSpec, StoredEmbedding};

use crate::to_storage_err;

/// Pre-packed vectors for one datapoint: `(model, packed blob)` pairs,
/// computed before any connection is taken so embed calls never hold
/// the writer.
pub type PackedVectors = Vec<(String, Vec<u8>)>;

/// Insert a datapoint with its embeddings as a standalone operation.
pub fn insert(
    conn: &Connection,
    entity_id: i64,
    spec: &DatapointSpec,
    packed: &PackedVectors,
) -> EmbsearchResult<Datapoint> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("datapoint insert begin: {e}")))?;

    match insert_inner(&tx, entity_id, spec, packed) {
        Ok(datapoint) => {
            tx.commit()
                .map_err(|e| to_storage_err(format!("datapoint insert commit: {e}")))?;
            Ok(datapoint)
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

/// Inner insert logic, operating on the provided connection (or
/// transaction via Deref).
pub(crate) fn insert_inner(
    conn: &Connection,
    entity_id: i64,
    spec: &DatapointSpec,
    packed: &PackedVectors,
) -> EmbsearchResult<Datapoint> {
    conn.execute(
        "INSERT INTO datapoint (id_entity, name, probmethod_embedding) VALUES (?1, ?2, ?3)",
        params![entity_id, spec.name, spec.probmethod_embedding],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    let datapoint_id = conn.last_insert_rowid();

    let mut embeddings = Vec::with_capacity(packed.len());
    for (model, blob) in packed {
        conn.execute(
            "INSERT INTO embedding (id_datapoint, model, embedding)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(id_datapoint, model) DO UPDATE SET
                embedding = excluded.embedding",
            params![datapoint_id, model, blob],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
        embeddings.push(StoredEmbedding {
            id: conn.last_insert_rowid(),
            datapoint_id,
            model: model.clone(),
            bytes: blob.clone(),
        });
    }

    Ok(Datapoint {
        id: datapoint_id,
        entity_id,
        name: spec.name.clone(),
        probmethod_embedding: spec.probmethod_embedding.clone(),
        embeddings,
    })
}

/// Replace (or merge into) a datapoint's stored embeddings.
/// With `clear` set, embeddings for models not in `packed` are dropped.
pub fn update_embeddings(
    conn: &Connection,
    datapoint_id: i64,
    packed: &PackedVectors,
    clear: bool,
) -> EmbsearchResult<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("embedding update begin: {e}")))?;

    let result = (|| -> EmbsearchResult<()> {
        if clear {
            tx.execute(
                "DELETE FROM embedding WHERE id_datapoint = ?1",
                params![datapoint_id],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        }
        for (model, blob) in packed {
            tx.execute(
                "INSERT INTO embedding (id_datapoint, model, embedding)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(id_datapoint, model) DO UPDATE SET
                    embedding = excluded.embedding",
                params![datapoint_id, model, blob],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        }
        Ok(())
    })();

    match result {
        Ok(()) => {
            tx.commit()
                .map_err(|e| to_storage_err(format!("embedding update commit: {e}")))?;
            Ok(())
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

/// Rename a datapoint.
pub fn update_name(conn: &Connection, datapoint_id: i64, new_name: &str) -> EmbsearchResult<bool> {
    let rows = conn
        .execute(
            "UPDATE datapoint SET name = ?1 WHERE id = ?2",
            params![new_name, datapoint_id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows > 0)
}

/// Change how a datapoint's per-model scores are reduced.
pub fn update_probmethod(
    conn: &Connection,
    datapoint_id: i64,
    new_probmethod: &str,
) -> EmbsearchResult<bool> {
    let rows = conn
        .execute(
            "UPDATE datapoint SET probmethod_embedding = ?1 WHERE id = ?2",
            params![new_probmethod, datapoint_id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows > 0)
}

/// Delete a datapoint; its embeddings cascade.
pub fn delete(conn: &Connection, datapoint_id: i64) -> EmbsearchResult<bool> {
    let rows = conn
        .execute("DELETE FROM datapoint WHERE id = ?1", params![datapoint_id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows > 0)
}
