//! Wire-shaped payloads: the bulk-indexing input produced by ingestion
//! scripts and the result envelopes consumed by clients. Field names
//! are PascalCase on the wire.

use serde::{Deserialize, Serialize};

use embsearch_core::codec;
use embsearch_core::errors::{EmbsearchError, EmbsearchResult};
use embsearch_core::models::{DatapointSpec, Entity, ScoredEntity};

use crate::Embsearch;

fn default_similarity_method() -> String {
    "Cosine".to_string()
}

/// One datapoint of a bulk-indexing payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexDatapoint {
    pub name: String,
    pub text: String,
    #[serde(rename = "Probmethod_embedding")]
    pub probmethod_embedding: String,
    #[serde(default = "default_similarity_method")]
    pub similarity_method: String,
    #[serde(rename = "Model")]
    pub models: Vec<String>,
}

/// One entity of a bulk-indexing payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexEntity {
    pub name: String,
    pub probmethod: String,
    pub searchdomain: String,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub datapoints: Vec<IndexDatapoint>,
}

/// Ranked query results envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityQueryResults {
    pub results: Vec<EntityQueryResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityQueryResult {
    pub name: String,
    pub score: f64,
}

impl From<Vec<ScoredEntity>> for EntityQueryResults {
    fn from(ranked: Vec<ScoredEntity>) -> Self {
        Self {
            results: ranked
                .into_iter()
                .map(|scored| EntityQueryResult {
                    name: scored.name,
                    score: scored.score,
                })
                .collect(),
        }
    }
}

/// Searchdomain listing envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchdomainListResults {
    pub searchdomains: Vec<String>,
}

/// Entity listing: one element per entity, embeddings included on request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityListResult {
    pub name: String,
    pub attributes: Vec<AttributeResult>,
    pub datapoints: Vec<DatapointResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeResult {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatapointResult {
    pub name: String,
    #[serde(rename = "ProbMethod")]
    pub probmethod: String,
    pub embeddings: Option<Vec<EmbeddingResult>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmbeddingResult {
    pub model: String,
    pub embeddings: Vec<f32>,
}

impl EntityListResult {
    /// Project a hydrated entity into its wire shape. With
    /// `return_embeddings`, stored vectors are unpacked into floats.
    pub fn from_entity(entity: &Entity, return_embeddings: bool) -> EmbsearchResult<Self> {
        let mut datapoints = Vec::with_capacity(entity.datapoints.len());
        for datapoint in &entity.datapoints {
            let embeddings = if return_embeddings {
                let mut unpacked = Vec::with_capacity(datapoint.embeddings.len());
                for stored in &datapoint.embeddings {
                    unpacked.push(EmbeddingResult {
                        model: stored.model.clone(),
                        embeddings: codec::unpack(&stored.bytes)?,
                    });
                }
                Some(unpacked)
            } else {
                None
            };
            datapoints.push(DatapointResult {
                name: datapoint.name.clone(),
                probmethod: datapoint.probmethod_embedding.clone(),
                embeddings,
            });
        }
        Ok(Self {
            name: entity.name.clone(),
            attributes: entity
                .attributes
                .iter()
                .map(|attribute| AttributeResult {
                    name: attribute.name.clone(),
                    value: attribute.value.clone(),
                })
                .collect(),
            datapoints,
        })
    }
}

impl Embsearch {
    /// Upsert every entity of a bulk-indexing payload (a JSON array of
    /// entities, each naming its searchdomain). Missing searchdomains
    /// are created with default settings. Returns how many entities were
    /// indexed.
    pub fn entity_index(&self, payload_json: &str) -> EmbsearchResult<usize> {
        let entities: Vec<IndexEntity> = serde_json::from_str(payload_json)?;
        let mut indexed = 0;
        for entry in &entities {
            if entry
                .datapoints
                .iter()
                .any(|datapoint| datapoint.similarity_method != "Cosine")
            {
                return Err(EmbsearchError::BadSettings {
                    reason: format!(
                        "entity '{}': only the Cosine similarity method is supported",
                        entry.name
                    ),
                });
            }
            self.searchdomain_get(&entry.searchdomain, true)?;

            let attributes: Vec<(String, String)> = entry
                .attributes
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (key.clone(), value)
                })
                .collect();
            let datapoints: Vec<DatapointSpec> = entry
                .datapoints
                .iter()
                .map(|datapoint| DatapointSpec {
                    name: datapoint.name.clone(),
                    text: datapoint.text.clone(),
                    probmethod_embedding: datapoint.probmethod_embedding.clone(),
                    models: datapoint.models.clone(),
                })
                .collect();

            self.entity_insert(
                &entry.searchdomain,
                &entry.name,
                &entry.probmethod,
                &attributes,
                &datapoints,
            )?;
            indexed += 1;
        }
        Ok(indexed)
    }

    /// Entity listing in wire shape, embeddings included on request.
    pub fn entity_list_results(
        &self,
        searchdomain: &str,
        return_embeddings: bool,
    ) -> EmbsearchResult<Vec<EntityListResult>> {
        self.entity_list(searchdomain)?
            .iter()
            .map(|entity| EntityListResult::from_entity(entity, return_embeddings))
            .collect()
    }

    /// Ranked query in wire shape.
    pub fn entity_query_results(
        &self,
        searchdomain: &str,
        text: &str,
        limit_results: Option<usize>,
    ) -> EmbsearchResult<EntityQueryResults> {
        Ok(self
            .entity_query(searchdomain, text, limit_results)?
            .into())
    }

    /// Searchdomain listing in wire shape.
    pub fn searchdomain_list_results(&self) -> EmbsearchResult<SearchdomainListResults> {
        Ok(SearchdomainListResults {
            searchdomains: self.searchdomain_list()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_field_names_are_wire_shaped() {
        let payload = r#"[{
            "Name": "/a.txt",
            "Probmethod": "HVEWAvg",
            "Searchdomain": "docs",
            "Attributes": {"path": "/a.txt", "lastmodified": 1700000000.5},
            "Datapoints": [{
                "Name": "title",
                "Text": "Hello",
                "Probmethod_embedding": "wavg",
                "SimilarityMethod": "Cosine",
                "Model": ["ollama:bge-m3"]
            }]
        }]"#;
        let entities: Vec<IndexEntity> = serde_json::from_str(payload).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].name, "/a.txt");
        assert_eq!(entities[0].datapoints[0].models, ["ollama:bge-m3"]);
    }

    #[test]
    fn similarity_method_defaults_to_cosine() {
        let payload = r#"{
            "Name": "title", "Text": "Hello", "Probmethod_embedding": "wavg",
            "Model": ["m1"]
        }"#;
        let datapoint: IndexDatapoint = serde_json::from_str(payload).unwrap();
        assert_eq!(datapoint.similarity_method, "Cosine");
    }

    #[test]
    fn query_results_serialize_with_score_field() {
        let results: EntityQueryResults = vec![ScoredEntity {
            entity_id: 1,
            name: "E1".to_string(),
            score: 0.75,
        }]
        .into();
        let json = serde_json::to_string(&results).unwrap();
        assert!(json.contains("\"Results\""));
        assert!(json.contains("\"Name\":\"E1\""));
        assert!(json.contains("\"Score\":0.75"));
    }
}
