//! End-to-end engine tests over file-backed storage and the
//! deterministic hashed provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use embsearch_core::errors::{EmbeddingError, EmbsearchError, EmbsearchResult, SearchError};
use embsearch_core::models::{DatapointSpec, SearchdomainSettings};
use embsearch_core::probmethods::Probmethods;
use embsearch_core::traits::IEmbeddingProvider;
use embsearch_embeddings::HashedProvider;
use embsearch_search::{CancelFlag, QueryOptions, SearchEngine, Searchdomain};
use embsearch_storage::StorageEngine;
use tempfile::TempDir;

const DIMS: usize = 32;

struct Fixture {
    _dir: TempDir,
    storage: StorageEngine,
    domain: Searchdomain,
    provider: Arc<HashedProvider>,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let storage = StorageEngine::open(&dir.path().join("test.db"), 2).unwrap();
    let record = storage
        .searchdomain_create("docs", &SearchdomainSettings::default())
        .unwrap();
    Fixture {
        _dir: dir,
        storage,
        domain: Searchdomain::new(record),
        provider: Arc::new(HashedProvider::new(DIMS)),
    }
}

fn engine_with(provider: Arc<dyn IEmbeddingProvider>) -> SearchEngine {
    SearchEngine::new(provider, Arc::new(Probmethods::with_builtins()), 128)
}

fn spec(name: &str, text: &str, models: &[&str]) -> DatapointSpec {
    DatapointSpec {
        name: name.to_string(),
        text: text.to_string(),
        probmethod_embedding: "wavg".to_string(),
        models: models.iter().map(|m| m.to_string()).collect(),
    }
}

fn insert(fixture: &Fixture, name: &str, text: &str) {
    fixture
        .storage
        .entity_insert(
            fixture.domain.id(),
            name,
            "wavg",
            &[],
            &[spec("text", text, &["m1"])],
            &*fixture.provider,
        )
        .unwrap();
}

fn sequential() -> QueryOptions {
    QueryOptions {
        parallel: false,
        ..Default::default()
    }
}

#[test]
fn exact_text_scores_near_one() {
    let fixture = fixture();
    insert(&fixture, "E1", "hello");
    let engine = engine_with(fixture.provider.clone());

    let results = engine
        .query(&fixture.storage, &fixture.domain, "hello", &sequential())
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "E1");
    assert!((results[0].score - 1.0).abs() < 1e-6, "got {}", results[0].score);
}

#[test]
fn identical_texts_tie_break_by_insertion_order() {
    let fixture = fixture();
    insert(&fixture, "E1", "same text");
    insert(&fixture, "E2", "same text");
    let engine = engine_with(fixture.provider.clone());

    let results = engine
        .query(&fixture.storage, &fixture.domain, "same text", &sequential())
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].score, results[1].score);
    assert_eq!(results[0].name, "E1");
    assert_eq!(results[1].name, "E2");
}

#[test]
fn parallel_and_sequential_produce_identical_rankings() {
    let fixture = fixture();
    for (i, text) in [
        "rust ownership and borrowing",
        "sqlite write ahead log",
        "cosine similarity of vectors",
        "entity cache invalidation",
        "hello world",
        "parallel scan of entities",
        "weighted averages of scores",
    ]
    .iter()
    .enumerate()
    {
        insert(&fixture, &format!("E{i}"), text);
    }
    let engine = engine_with(fixture.provider.clone());

    let sequential_results = engine
        .query(
            &fixture.storage,
            &fixture.domain,
            "vectors of entities",
            &sequential(),
        )
        .unwrap();
    // Clear the cache so the parallel run actually recomputes.
    fixture.domain.search_cache.clear().unwrap();
    let parallel_results = engine
        .query(
            &fixture.storage,
            &fixture.domain,
            "vectors of entities",
            &QueryOptions::default(),
        )
        .unwrap();

    assert_eq!(sequential_results, parallel_results);
}

#[test]
fn results_are_sorted_and_limit_truncates() {
    let fixture = fixture();
    for i in 0..5 {
        insert(&fixture, &format!("E{i}"), &format!("document number {i}"));
    }
    let engine = engine_with(fixture.provider.clone());

    let results = engine
        .query(
            &fixture.storage,
            &fixture.domain,
            "document number 3",
            &sequential(),
        )
        .unwrap();
    assert_eq!(results.len(), 5);
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    let limited = engine
        .query(
            &fixture.storage,
            &fixture.domain,
            "document number 3",
            &QueryOptions {
                limit_results: Some(2),
                parallel: false,
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited, results[..2].to_vec());
}

/// Counts embed calls so cache behavior is observable.
struct CountingProvider {
    inner: HashedProvider,
    calls: AtomicUsize,
}

impl IEmbeddingProvider for CountingProvider {
    fn embed(&self, model: &str, text: &str) -> EmbsearchResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(model, text)
    }

    fn name(&self) -> &str {
        "counting"
    }
}

#[test]
fn repeated_query_is_served_from_the_search_cache() {
    let fixture = fixture();
    insert(&fixture, "E1", "hello");
    let counting = Arc::new(CountingProvider {
        inner: HashedProvider::new(DIMS),
        calls: AtomicUsize::new(0),
    });
    let engine = engine_with(counting.clone());

    let first = engine
        .query(&fixture.storage, &fixture.domain, "hello", &sequential())
        .unwrap();
    let calls_after_first = counting.calls.load(Ordering::SeqCst);
    assert!(calls_after_first > 0);

    let second = engine
        .query(&fixture.storage, &fixture.domain, "hello", &sequential())
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(counting.calls.load(Ordering::SeqCst), calls_after_first);
    assert_eq!(fixture.domain.search_cache.len(), 1);
}

/// Always reports a response with no embedding field.
struct BrokenProvider;

impl IEmbeddingProvider for BrokenProvider {
    fn embed(&self, model: &str, _text: &str) -> EmbsearchResult<Vec<f32>> {
        Err(EmbeddingError::MissingEmbedding {
            model: model.to_string(),
        }
        .into())
    }

    fn name(&self) -> &str {
        "broken"
    }
}

#[test]
fn embedding_failure_fails_the_query_without_caching() {
    let fixture = fixture();
    insert(&fixture, "E1", "hello");
    let engine = engine_with(Arc::new(BrokenProvider));

    let err = engine
        .query(&fixture.storage, &fixture.domain, "hello", &sequential())
        .unwrap_err();
    assert!(matches!(
        err,
        EmbsearchError::EmbeddingError(EmbeddingError::MissingEmbedding { .. })
    ));
    assert!(fixture.domain.search_cache.is_empty());
}

#[test]
fn cancelled_query_fails_without_caching() {
    let fixture = fixture();
    insert(&fixture, "E1", "hello");
    let engine = engine_with(fixture.provider.clone());

    let cancel = CancelFlag::new();
    cancel.cancel();
    let err = engine
        .query(
            &fixture.storage,
            &fixture.domain,
            "hello",
            &QueryOptions {
                cancel,
                parallel: false,
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        EmbsearchError::SearchError(SearchError::Cancelled)
    ));
    assert!(fixture.domain.search_cache.is_empty());
}

#[test]
fn unknown_probmethod_fails_the_query() {
    let fixture = fixture();
    fixture
        .storage
        .entity_insert(
            fixture.domain.id(),
            "E1",
            "no_such_method",
            &[],
            &[spec("text", "hello", &["m1"])],
            &*fixture.provider,
        )
        .unwrap();
    let engine = engine_with(fixture.provider.clone());

    let err = engine
        .query(&fixture.storage, &fixture.domain, "hello", &sequential())
        .unwrap_err();
    assert!(matches!(
        err,
        EmbsearchError::SearchError(SearchError::UnknownProbmethod { .. })
    ));
}

#[test]
fn multi_model_datapoints_reduce_over_model_names() {
    let fixture = fixture();
    fixture
        .storage
        .entity_insert(
            fixture.domain.id(),
            "E1",
            "wavg",
            &[],
            &[DatapointSpec {
                name: "text".to_string(),
                text: "hello".to_string(),
                // Weight m1 heavily; both models see the same text so the
                // result still lands near 1 for the exact query.
                probmethod_embedding: "DictionaryWeightedAverage:{\"m1\": 3}".to_string(),
                models: vec!["m1".to_string(), "m2".to_string()],
            }],
            &*fixture.provider,
        )
        .unwrap();
    let engine = engine_with(fixture.provider.clone());

    let results = engine
        .query(&fixture.storage, &fixture.domain, "hello", &sequential())
        .unwrap();
    assert_eq!(results.len(), 1);
    assert!((results[0].score - 1.0).abs() < 1e-6);
}
