//! The hydrated entity aggregate: entity → datapoints → embeddings,
//! plus flat key-value attributes.

/// A packed embedding row: one vector produced by one model for one datapoint.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEmbedding {
    pub id: i64,
    pub datapoint_id: i64,
    /// Opaque model identifier, e.g. `ollama:bge-m3`. Matched exactly.
    pub model: String,
    /// Little-endian f32s, no header. See `codec`.
    pub bytes: Vec<u8>,
}

/// A named text field of an entity, embedded separately per model.
#[derive(Debug, Clone, PartialEq)]
pub struct Datapoint {
    pub id: i64,
    pub entity_id: i64,
    /// Field name within the entity, e.g. `title`, `text`, `filepath`.
    pub name: String,
    /// How this datapoint's per-model scores reduce to one scalar.
    pub probmethod_embedding: String,
    pub embeddings: Vec<StoredEmbedding>,
}

/// Flat key-value provenance metadata. Not searched.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub id: i64,
    pub entity_id: i64,
    pub name: String,
    pub value: String,
}

/// A searchable record: attributes + datapoints, unique by name within
/// its searchdomain.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: i64,
    pub name: String,
    /// How this entity's per-datapoint scores reduce to one scalar.
    pub probmethod: String,
    pub searchdomain_id: i64,
    pub attributes: Vec<Attribute>,
    pub datapoints: Vec<Datapoint>,
}

impl Entity {
    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Input shape for a datapoint to be inserted: the text is embedded once
/// per listed model at insert time.
#[derive(Debug, Clone)]
pub struct DatapointSpec {
    pub name: String,
    pub text: String,
    pub probmethod_embedding: String,
    pub models: Vec<String>,
}
