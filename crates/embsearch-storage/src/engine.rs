//! StorageEngine — owns the ConnectionPool, runs migrations on open, and
//! exposes every searchdomain/entity/datapoint operation. Write
//! operations go through the single writer; reads use the read pool when
//! the database is file-backed.
//!
//! Embedding vectors are computed through the provider *before* any
//! connection is taken, so remote embed calls never hold a lock or a
//! transaction.

use std::path::Path;

use embsearch_core::codec;
use embsearch_core::errors::EmbsearchResult;
use embsearch_core::models::{DatapointSpec, Entity, SearchdomainRecord, SearchdomainSettings};
use embsearch_core::traits::IEmbeddingProvider;
use embsearch_core::Datapoint;

use crate::migrations;
use crate::pool::ConnectionPool;
use crate::queries::datapoint_ops::PackedVectors;
use crate::queries::{datapoint_ops, entity_ops, hydrate, searchdomain_ops};

/// The main storage engine. Owns the connection pool.
pub struct StorageEngine {
    pool: ConnectionPool,
    /// When true, use the read pool for read operations (file-backed mode).
    /// When false, route all reads through the writer (in-memory mode,
    /// because in-memory read pool connections are isolated databases).
    use_read_pool: bool,
}

impl StorageEngine {
    /// Open a storage engine backed by a file on disk.
    pub fn open(path: &Path, read_pool_size: usize) -> EmbsearchResult<Self> {
        let pool = ConnectionPool::open(path, read_pool_size)?;
        let engine = Self {
            pool,
            use_read_pool: true,
        };
        engine.initialize()?;
        Ok(engine)
    }

    /// Open an in-memory storage engine (for testing).
    pub fn open_in_memory() -> EmbsearchResult<Self> {
        let pool = ConnectionPool::open_in_memory(1)?;
        let engine = Self {
            pool,
            use_read_pool: false,
        };
        engine.initialize()?;
        Ok(engine)
    }

    /// Run migrations.
    fn initialize(&self) -> EmbsearchResult<()> {
        self.pool.writer.with_conn_sync(|conn| {
            migrations::run_migrations(conn)?;
            Ok(())
        })
    }

    /// Execute a read-only query on the best available connection.
    fn with_reader<F, T>(&self, f: F) -> EmbsearchResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> EmbsearchResult<T>,
    {
        if self.use_read_pool {
            self.pool.readers.with_conn(f)
        } else {
            self.pool.writer.with_conn_sync(f)
        }
    }

    // --- Searchdomains ---

    pub fn searchdomain_create(
        &self,
        name: &str,
        settings: &SearchdomainSettings,
    ) -> EmbsearchResult<SearchdomainRecord> {
        self.pool
            .writer
            .with_conn_sync(|conn| searchdomain_ops::create(conn, name, settings))
    }

    pub fn searchdomain_get(&self, name: &str) -> EmbsearchResult<Option<SearchdomainRecord>> {
        self.with_reader(|conn| searchdomain_ops::get_by_name(conn, name))
    }

    pub fn searchdomain_get_all(&self) -> EmbsearchResult<Vec<SearchdomainRecord>> {
        self.with_reader(searchdomain_ops::get_all)
    }

    pub fn searchdomain_delete(&self, id: i64) -> EmbsearchResult<bool> {
        self.pool
            .writer
            .with_conn_sync(|conn| searchdomain_ops::delete(conn, id))
    }

    pub fn searchdomain_update_name(&self, id: i64, new_name: &str) -> EmbsearchResult<bool> {
        self.pool
            .writer
            .with_conn_sync(|conn| searchdomain_ops::update_name(conn, id, new_name))
    }

    pub fn searchdomain_update_settings(
        &self,
        id: i64,
        settings: &SearchdomainSettings,
    ) -> EmbsearchResult<bool> {
        self.pool
            .writer
            .with_conn_sync(|conn| searchdomain_ops::update_settings(conn, id, settings))
    }

    // --- Entities ---

    /// Hydrate every entity in a searchdomain.
    pub fn entity_get_all(&self, searchdomain_id: i64) -> EmbsearchResult<Vec<Entity>> {
        self.with_reader(|conn| hydrate::entity_get_all(conn, searchdomain_id))
    }

    /// Hydrate one entity by name.
    pub fn entity_get_by_name(
        &self,
        searchdomain_id: i64,
        name: &str,
    ) -> EmbsearchResult<Option<Entity>> {
        self.with_reader(|conn| hydrate::entity_get_by_name(conn, searchdomain_id, name))
    }

    /// Upsert an entity with its attributes and datapoints. The text of
    /// every datapoint is embedded once per listed model.
    pub fn entity_insert(
        &self,
        searchdomain_id: i64,
        name: &str,
        probmethod: &str,
        attributes: &[(String, String)],
        datapoints: &[DatapointSpec],
        provider: &dyn IEmbeddingProvider,
    ) -> EmbsearchResult<Entity> {
        let packed: Vec<PackedVectors> = datapoints
            .iter()
            .map(|spec| pack_spec(spec, provider))
            .collect::<EmbsearchResult<_>>()?;
        self.pool.writer.with_conn_sync(|conn| {
            entity_ops::insert(
                conn,
                searchdomain_id,
                name,
                probmethod,
                attributes,
                datapoints,
                &packed,
            )
        })
    }

    pub fn entity_delete(&self, searchdomain_id: i64, name: &str) -> EmbsearchResult<bool> {
        self.pool
            .writer
            .with_conn_sync(|conn| entity_ops::delete_by_name(conn, searchdomain_id, name))
    }

    // --- Datapoints ---

    /// Add a datapoint to an existing entity.
    pub fn entity_insert_datapoint(
        &self,
        entity_id: i64,
        spec: &DatapointSpec,
        provider: &dyn IEmbeddingProvider,
    ) -> EmbsearchResult<Datapoint> {
        let packed = pack_spec(spec, provider)?;
        self.pool
            .writer
            .with_conn_sync(|conn| datapoint_ops::insert(conn, entity_id, spec, &packed))
    }

    /// Re-embed a datapoint's text. With `clear_embeddings`, vectors for
    /// models outside the list are dropped first.
    pub fn datapoint_update_embeddings(
        &self,
        datapoint_id: i64,
        text: &str,
        models: &[String],
        clear_embeddings: bool,
        provider: &dyn IEmbeddingProvider,
    ) -> EmbsearchResult<()> {
        let packed = pack_models(models, text, provider)?;
        self.pool.writer.with_conn_sync(|conn| {
            datapoint_ops::update_embeddings(conn, datapoint_id, &packed, clear_embeddings)
        })
    }

    pub fn entity_update_attribute(
        &self,
        entity_id: i64,
        attribute: &str,
        value: &str,
        create_if_missing: bool,
    ) -> EmbsearchResult<bool> {
        self.pool.writer.with_conn_sync(|conn| {
            entity_ops::update_attribute(conn, entity_id, attribute, value, create_if_missing)
        })
    }

    pub fn entity_delete_attribute(
        &self,
        entity_id: i64,
        attribute: &str,
    ) -> EmbsearchResult<bool> {
        self.pool
            .writer
            .with_conn_sync(|conn| entity_ops::delete_attribute(conn, entity_id, attribute))
    }

    pub fn entity_delete_datapoint(&self, datapoint_id: i64) -> EmbsearchResult<bool> {
        self.pool
            .writer
            .with_conn_sync(|conn| datapoint_ops::delete(conn, datapoint_id))
    }

    pub fn entity_update_datapoint_name(
        &self,
        datapoint_id: i64,
        new_name: &str,
    ) -> EmbsearchResult<bool> {
        self.pool
            .writer
            .with_conn_sync(|conn| datapoint_ops::update_name(conn, datapoint_id, new_name))
    }

    pub fn entity_update_datapoint_probmethod(
        &self,
        datapoint_id: i64,
        new_probmethod: &str,
    ) -> EmbsearchResult<bool> {
        self.pool
            .writer
            .with_conn_sync(|conn| datapoint_ops::update_probmethod(conn, datapoint_id, new_probmethod))
    }
}

/// Embed a datapoint spec's text with each of its models and pack the
/// vectors for storage.
fn pack_spec(
    spec: &DatapointSpec,
    provider: &dyn IEmbeddingProvider,
) -> EmbsearchResult<PackedVectors> {
    pack_models(&spec.models, &spec.text, provider)
}

fn pack_models(
    models: &[String],
    text: &str,
    provider: &dyn IEmbeddingProvider,
) -> EmbsearchResult<PackedVectors> {
    models
        .iter()
        .map(|model| {
            let vector = provider.embed(model, text)?;
            Ok((model.clone(), codec::pack(&vector)))
        })
        .collect()
}
