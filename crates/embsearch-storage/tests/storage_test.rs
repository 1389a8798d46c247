//! Integration tests against a file-backed engine so the read pool sees
//! the writer's changes.

use embsearch_core::models::{DatapointSpec, SearchdomainSettings};
use embsearch_embeddings::HashedProvider;
use embsearch_storage::StorageEngine;
use tempfile::TempDir;

fn open_engine(dir: &TempDir) -> StorageEngine {
    StorageEngine::open(&dir.path().join("test.db"), 2).unwrap()
}

fn spec(name: &str, text: &str, models: &[&str]) -> DatapointSpec {
    DatapointSpec {
        name: name.to_string(),
        text: text.to_string(),
        probmethod_embedding: "wavg".to_string(),
        models: models.iter().map(|m| m.to_string()).collect(),
    }
}

#[test]
fn searchdomain_roundtrip() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);

    let mut settings = SearchdomainSettings::default();
    settings.cache_maxentries = 99;
    let created = engine.searchdomain_create("docs", &settings).unwrap();
    assert!(created.id > 0);

    let got = engine.searchdomain_get("docs").unwrap().unwrap();
    assert_eq!(got.id, created.id);
    assert_eq!(got.settings.cache_maxentries, 99);

    assert!(engine.searchdomain_get("missing").unwrap().is_none());

    let all = engine.searchdomain_get_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "docs");
}

#[test]
fn searchdomain_create_twice_is_a_conflict() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let settings = SearchdomainSettings::default();

    engine.searchdomain_create("docs", &settings).unwrap();
    let err = engine.searchdomain_create("docs", &settings).unwrap_err();
    assert!(matches!(
        err,
        embsearch_core::EmbsearchError::Conflict { .. }
    ));
}

#[test]
fn searchdomain_rename_and_delete() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let domain = engine
        .searchdomain_create("old", &SearchdomainSettings::default())
        .unwrap();

    assert!(engine.searchdomain_update_name(domain.id, "new").unwrap());
    assert!(engine.searchdomain_get("old").unwrap().is_none());
    assert!(engine.searchdomain_get("new").unwrap().is_some());

    assert!(engine.searchdomain_delete(domain.id).unwrap());
    assert!(!engine.searchdomain_delete(domain.id).unwrap());
    assert!(engine.searchdomain_get("new").unwrap().is_none());
}

#[test]
fn entity_insert_hydrates_exactly_what_was_stored() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let provider = HashedProvider::new(16);
    let domain = engine
        .searchdomain_create("docs", &SearchdomainSettings::default())
        .unwrap();

    let attributes = vec![
        ("path".to_string(), "/a.txt".to_string()),
        ("lastmodified".to_string(), "1700000000".to_string()),
    ];
    let datapoints = vec![
        spec("title", "hello world", &["m1", "m2"]),
        spec("text", "a longer body of text", &["m1"]),
    ];
    engine
        .entity_insert(domain.id, "/a.txt", "wavg", &attributes, &datapoints, &provider)
        .unwrap();

    let entities = engine.entity_get_all(domain.id).unwrap();
    assert_eq!(entities.len(), 1);
    let entity = &entities[0];
    assert_eq!(entity.name, "/a.txt");
    assert_eq!(entity.probmethod, "wavg");
    assert_eq!(entity.attributes.len(), 2);
    assert_eq!(entity.attribute("path").unwrap().value, "/a.txt");
    assert_eq!(entity.datapoints.len(), 2);

    let title = entity.datapoints.iter().find(|d| d.name == "title").unwrap();
    let mut models: Vec<&str> = title.embeddings.iter().map(|e| e.model.as_str()).collect();
    models.sort_unstable();
    assert_eq!(models, ["m1", "m2"]);
    // 16 dims × 4 bytes, no header.
    assert!(title.embeddings.iter().all(|e| e.bytes.len() == 64));

    let text = entity.datapoints.iter().find(|d| d.name == "text").unwrap();
    assert_eq!(text.embeddings.len(), 1);

    // By-name hydration returns the same graph.
    let by_name = engine.entity_get_by_name(domain.id, "/a.txt").unwrap().unwrap();
    assert_eq!(&by_name, entity);
    assert!(engine.entity_get_by_name(domain.id, "/b.txt").unwrap().is_none());
}

#[test]
fn entity_insert_under_same_name_replaces() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let provider = HashedProvider::new(8);
    let domain = engine
        .searchdomain_create("docs", &SearchdomainSettings::default())
        .unwrap();

    engine
        .entity_insert(
            domain.id,
            "A",
            "wavg",
            &[],
            &[spec("first", "one", &["m1"])],
            &provider,
        )
        .unwrap();
    engine
        .entity_insert(
            domain.id,
            "A",
            "wavg",
            &[],
            &[spec("second", "two", &["m1"])],
            &provider,
        )
        .unwrap();

    let entities = engine.entity_get_all(domain.id).unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].datapoints.len(), 1);
    assert_eq!(entities[0].datapoints[0].name, "second");
}

#[test]
fn entity_delete_cascades() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let provider = HashedProvider::new(8);
    let domain = engine
        .searchdomain_create("docs", &SearchdomainSettings::default())
        .unwrap();

    engine
        .entity_insert(
            domain.id,
            "A",
            "wavg",
            &[("k".to_string(), "v".to_string())],
            &[spec("d", "text", &["m1", "m2"])],
            &provider,
        )
        .unwrap();

    assert!(engine.entity_delete(domain.id, "A").unwrap());
    assert!(!engine.entity_delete(domain.id, "A").unwrap());
    assert!(engine.entity_get_all(domain.id).unwrap().is_empty());
}

#[test]
fn datapoint_lifecycle() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let provider = HashedProvider::new(8);
    let domain = engine
        .searchdomain_create("docs", &SearchdomainSettings::default())
        .unwrap();
    let entity = engine
        .entity_insert(domain.id, "A", "wavg", &[], &[], &provider)
        .unwrap();

    let datapoint = engine
        .entity_insert_datapoint(entity.id, &spec("body", "text", &["m1"]), &provider)
        .unwrap();
    assert_eq!(datapoint.embeddings.len(), 1);

    assert!(engine
        .entity_update_datapoint_name(datapoint.id, "content")
        .unwrap());
    assert!(engine
        .entity_update_datapoint_probmethod(datapoint.id, "HVEWAvg")
        .unwrap());

    let hydrated = engine.entity_get_by_name(domain.id, "A").unwrap().unwrap();
    assert_eq!(hydrated.datapoints[0].name, "content");
    assert_eq!(hydrated.datapoints[0].probmethod_embedding, "HVEWAvg");

    assert!(engine.entity_delete_datapoint(datapoint.id).unwrap());
    let hydrated = engine.entity_get_by_name(domain.id, "A").unwrap().unwrap();
    assert!(hydrated.datapoints.is_empty());
}

#[test]
fn update_embeddings_with_clear_replaces_model_set() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let provider = HashedProvider::new(8);
    let domain = engine
        .searchdomain_create("docs", &SearchdomainSettings::default())
        .unwrap();
    let entity = engine
        .entity_insert(
            domain.id,
            "A",
            "wavg",
            &[],
            &[spec("d", "old text", &["m1", "m2"])],
            &provider,
        )
        .unwrap();
    let datapoint_id = entity.datapoints[0].id;

    engine
        .datapoint_update_embeddings(
            datapoint_id,
            "new text",
            &["m3".to_string()],
            true,
            &provider,
        )
        .unwrap();

    let hydrated = engine.entity_get_by_name(domain.id, "A").unwrap().unwrap();
    let models: Vec<&str> = hydrated.datapoints[0]
        .embeddings
        .iter()
        .map(|e| e.model.as_str())
        .collect();
    assert_eq!(models, ["m3"]);

    // Without clear, same-model rows are updated in place, never duplicated.
    engine
        .datapoint_update_embeddings(
            datapoint_id,
            "newer text",
            &["m3".to_string()],
            false,
            &provider,
        )
        .unwrap();
    let hydrated = engine.entity_get_by_name(domain.id, "A").unwrap().unwrap();
    assert_eq!(hydrated.datapoints[0].embeddings.len(), 1);
}

#[test]
fn attribute_update_and_delete() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let provider = HashedProvider::new(8);
    let domain = engine
        .searchdomain_create("docs", &SearchdomainSettings::default())
        .unwrap();
    let entity = engine
        .entity_insert(domain.id, "A", "wavg", &[], &[], &provider)
        .unwrap();

    // Absent + create_if_missing=false → untouched.
    assert!(!engine
        .entity_update_attribute(entity.id, "k", "v1", false)
        .unwrap());
    // Absent + create_if_missing=true → inserted.
    assert!(engine
        .entity_update_attribute(entity.id, "k", "v1", true)
        .unwrap());
    // Present → updated.
    assert!(engine
        .entity_update_attribute(entity.id, "k", "v2", false)
        .unwrap());

    let hydrated = engine.entity_get_by_name(domain.id, "A").unwrap().unwrap();
    assert_eq!(hydrated.attribute("k").unwrap().value, "v2");

    assert!(engine.entity_delete_attribute(entity.id, "k").unwrap());
    assert!(!engine.entity_delete_attribute(entity.id, "k").unwrap());
}

#[test]
fn settings_update_persists() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir);
    let domain = engine
        .searchdomain_create("docs", &SearchdomainSettings::default())
        .unwrap();

    let mut settings = domain.settings.clone();
    settings.cache_maxentries = 2;
    settings.cache_revalidation_entity_add = false;
    assert!(engine
        .searchdomain_update_settings(domain.id, &settings)
        .unwrap());

    let got = engine.searchdomain_get("docs").unwrap().unwrap();
    assert_eq!(got.settings.cache_maxentries, 2);
    assert!(!got.settings.cache_revalidation_entity_add);
}
