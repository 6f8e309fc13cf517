// SPDX-License-Identifier: MIT OR Apache-2.0

mod common;

use std::sync::Arc;
use tempfile::TempDir;

use common::{annotator_records, embedder, CountingProvider, VocabProvider, VOCAB_DIMS};
use semdex::embedding::EmbeddingProvider;
use semdex::indexer::IndexManager;
use semdex::records::RawRecord;
use semdex::search::SearchEngine;
use semdex::store::{SqliteStore, VectorStore};

fn pipeline(
    store: Arc<SqliteStore>,
) -> (
    IndexManager<SqliteStore>,
    SearchEngine<SqliteStore>,
    Arc<CountingProvider>,
) {
    let provider = Arc::new(CountingProvider::new(Arc::new(VocabProvider::default())));
    let shared: Arc<dyn EmbeddingProvider> = provider.clone();
    let manager = IndexManager::new(store.clone(), embedder(shared.clone()), VOCAB_DIMS);
    let engine = SearchEngine::new(store, embedder(shared));
    (manager, engine, provider)
}

fn in_memory() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open_in_memory().unwrap())
}

#[test]
fn text_matcher_ranks_first_for_matching_query() {
    let (manager, engine, _) = pipeline(in_memory());
    let report = manager.bulk_load("sample", &annotator_records()).unwrap();
    assert_eq!(report.indexed, 4);

    let results = engine.search("How can I match texts?", "sample", 3).unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].title, "TextMatcher");
    assert!(results[0].score > 0.5 && results[0].score <= 1.0);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(
        results[0].link,
        "https://nlp.example.com/docs/annotators#textmatcher"
    );
}

#[test]
fn scores_are_bounded_and_sorted() {
    let (manager, engine, _) = pipeline(in_memory());
    manager.bulk_load("sample", &annotator_records()).unwrap();

    for query in ["chunk", "document annotations", "token embeddings", "nothing shared"] {
        let results = engine.search(query, "sample", 10).unwrap();
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.score)));
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }
}

#[test]
fn load_if_absent_twice_embeds_once() {
    let (manager, _, provider) = pipeline(in_memory());
    let records = annotator_records();

    manager.load_if_absent("sample", &records).unwrap();
    assert_eq!(provider.calls(), records.len());

    let second = manager.load_if_absent("sample", &records).unwrap();
    assert_eq!(second.skipped, records.len());
    assert_eq!(provider.calls(), records.len());
}

#[test]
fn empty_index_returns_no_results() {
    let (manager, engine, _) = pipeline(in_memory());
    assert!(manager.ensure_index("sample").unwrap());
    assert!(engine.search("match", "sample", 3).unwrap().is_empty());
}

#[test]
fn reload_replaces_document_at_same_position() {
    let (manager, engine, _) = pipeline(in_memory());
    manager.bulk_load("sample", &annotator_records()).unwrap();

    let replacement = vec![RawRecord::new(
        "RegexMatcher",
        "Uses rules to match regular expressions.",
        "https://nlp.example.com/docs/annotators#regexmatcher",
    )];
    manager.bulk_load("sample", &replacement).unwrap();

    let store = manager.store();
    assert_eq!(store.count("sample").unwrap(), 4);
    let doc = store.get_document("sample", "0").unwrap().unwrap();
    assert_eq!(doc.title, "RegexMatcher");

    let titles: Vec<_> = engine
        .search("match", "sample", 4)
        .unwrap()
        .into_iter()
        .map(|r| r.title)
        .collect();
    assert!(!titles.contains(&"Chunk2Doc".to_string()));
}

#[test]
fn index_survives_reopening_the_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.sqlite");

    {
        let (manager, _, _) = pipeline(Arc::new(SqliteStore::open(&path).unwrap()));
        manager.bulk_load("sample", &annotator_records()).unwrap();
    }

    let (manager, engine, provider) = pipeline(Arc::new(SqliteStore::open(&path).unwrap()));
    let report = manager.load_if_absent("sample", &annotator_records()).unwrap();
    assert_eq!(report.skipped, 4);
    assert_eq!(provider.calls(), 0);

    let results = engine.search("match texts", "sample", 2).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(manager.store().count("sample").unwrap(), 4);
}
