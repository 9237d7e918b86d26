//! Indexing E2E tests for tenant-search.
//!
//! Drives the engine against the in-memory backend: memory-bounded bulk
//! writes of document types, partial updates applied through generated
//! scripts, and tenant isolation of every query-shaped operation.

use pretty_assertions::assert_eq;
use serde_json::json;

use e2e_tests::{file, message, File, Message, TestHarness};
use search_backend::{BackendCall, BackendOp};
use search_engine::{EngineConfig, Selector};
use search_types::{FieldValue, SortOrder, UpdateAction, UpdateDescriptor};

fn bulk_groups(calls: &[BackendCall]) -> Vec<Vec<String>> {
    calls
        .iter()
        .filter_map(|call| match call {
            BackendCall::BulkIndex { ids, .. } => Some(ids.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_document_batches_stay_under_budget() {
    let harness = TestHarness::new();
    let cache = harness.cache();
    let engine = harness.engine::<File>(&cache, EngineConfig::default().with_memory_limit(1_000));

    let mut files = vec![
        file(1, 1, "plan", 400),
        file(2, 1, "budget", 400),
        file(3, 1, "minutes", 300),
        file(4, 1, "video", 5_000),
        file(5, 1, "notes", 0),
        file(6, 1, "slides", 999),
    ];

    let summary = engine.index_many(&mut files, false).await.unwrap();

    assert_eq!(summary.submitted, 6);
    assert_eq!(summary.indexed, 6);
    assert_eq!(summary.oversized, 1);
    assert_eq!(
        bulk_groups(&harness.backend.calls()),
        vec![
            vec!["1".to_string(), "2".to_string()],
            vec!["3".to_string()],
            vec!["5".to_string(), "6".to_string()],
        ]
    );
    assert!(files.iter().all(|f| f.document.is_released()));
    assert_eq!(harness.backend.document_count("files"), 6);
}

#[tokio::test]
async fn test_rejected_items_do_not_abort_batch() {
    let harness = TestHarness::new();
    let cache = harness.cache();
    let engine = harness.engine::<File>(&cache, EngineConfig::default());
    harness.backend.reject_id("2");

    let mut files: Vec<File> = (1..=4).map(|i| file(i, 1, "report", 10)).collect();
    let summary = engine.index_many(&mut files, true).await.unwrap();

    assert_eq!(summary.indexed, 3);
    assert_eq!(summary.failed, 1);
    assert!(harness.backend.document("files", "2").is_none());
    assert!(harness.backend.document("files", "4").is_some());
}

#[tokio::test]
async fn test_oversized_failure_is_logged_and_skipped() {
    let harness = TestHarness::new();
    let cache = harness.cache();
    let engine = harness.engine::<File>(&cache, EngineConfig::default().with_memory_limit(100));
    harness.backend.fail_on(BackendOp::IndexDocument);

    let mut files = vec![file(1, 1, "small", 10), file(2, 1, "huge", 500), file(3, 1, "tiny", 1)];
    let summary = engine.index_many(&mut files, false).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.indexed, 2);
    assert!(files[1].document.is_released());
}

#[tokio::test]
async fn test_tenant_isolation_across_operations() {
    let harness = TestHarness::new();
    let cache = harness.cache();
    let engine = harness.engine::<Message>(&cache, EngineConfig::default());

    let mut messages = vec![
        message(1, 10, "Quarterly report"),
        message(2, 20, "Quarterly report"),
        message(3, 10, "Lunch"),
        message(4, 20, "Lunch"),
    ];
    engine.index_many(&mut messages, true).await.unwrap();

    let selector = Selector::new().matches("Subject", "quarterly");
    let (ids, total) = engine.search_ids_with_total(10, &selector).await.unwrap();
    assert_eq!((ids, total), (vec!["1".to_string()], 1));

    let updated = engine
        .update_by_query(
            20,
            &Selector::new().matches("Subject", "lunch"),
            &[UpdateDescriptor::set("Subject", "Team lunch")],
            true,
        )
        .await
        .unwrap();
    assert_eq!(updated, 1);
    assert_eq!(harness.backend.document("mail", "3").unwrap()["subject"], "Lunch");
    assert_eq!(
        harness.backend.document("mail", "4").unwrap()["subject"],
        "Team lunch"
    );

    let deleted = engine.delete_by_query(10, &Selector::new(), true).await.unwrap();
    assert_eq!(deleted, 2);
    let remaining = engine
        .search(20, &Selector::new().sort("Id", SortOrder::Ascending))
        .await
        .unwrap();
    assert_eq!(
        remaining.iter().map(|m| m.id).collect::<Vec<_>>(),
        vec![2, 4]
    );
    assert!(engine.search(10, &Selector::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_partial_updates_round_trip() {
    let harness = TestHarness::new();
    let cache = harness.cache();
    let engine = harness.engine::<File>(&cache, EngineConfig::default());

    let mut doc = file(7, 1, "Draft", 32);
    doc.tags = vec!["q3".to_string()];
    engine.index(&mut doc, true).await.unwrap();
    assert!(doc.document.is_released());

    for _ in 0..2 {
        engine
            .update_list(&doc, UpdateAction::Add, "Tags", vec![json!("finance")], true)
            .await
            .unwrap();
    }
    engine
        .update_fields(
            &doc,
            &[
                UpdateDescriptor::set("Title", "Final"),
                UpdateDescriptor::field("FolderId", FieldValue::or_remove_default(doc.folder_id)),
                UpdateDescriptor::field("Tags", FieldValue::Keep),
            ],
            true,
        )
        .await
        .unwrap();

    let stored = harness.backend.document("files", "7").unwrap();
    assert_eq!(stored["title"], "Final");
    assert_eq!(stored["tags"], json!(["q3", "finance"]));
    assert_eq!(stored["folderId"], 1);
}

#[tokio::test]
async fn test_list_remove_by_identity_scoped_to_tenant() {
    let harness = TestHarness::new();
    let cache = harness.cache();
    let engine = harness.engine::<Message>(&cache, EngineConfig::default());

    let labels = vec![json!({"id": 1, "name": "inbox"}), json!({"id": 2, "name": "spam"})];
    let mut messages = vec![message(1, 10, "a"), message(2, 20, "b")];
    for m in messages.iter_mut() {
        m.labels = labels.clone();
    }
    engine.index_many(&mut messages, true).await.unwrap();

    let updated = engine
        .update_list_by_query(
            10,
            &Selector::new(),
            UpdateAction::Remove,
            "Labels",
            vec![json!({"id": 2, "name": "renamed"})],
            true,
        )
        .await
        .unwrap();
    assert_eq!(updated, 1);

    assert_eq!(
        harness.backend.document("mail", "1").unwrap()["labels"],
        json!([{"id": 1, "name": "inbox"}])
    );
    assert_eq!(
        harness.backend.document("mail", "2").unwrap()["labels"],
        json!(labels)
    );
}

#[tokio::test]
async fn test_full_update_upserts_missing_document() {
    let harness = TestHarness::new();
    let cache = harness.cache();
    let engine = harness.engine::<Message>(&cache, EngineConfig::default());

    engine.update(&message(9, 1, "created by update"), true).await.unwrap();
    let found = engine.search(1, &Selector::new()).await.unwrap();
    assert_eq!(found, vec![message(9, 1, "created by update")]);
}

#[tokio::test]
async fn test_add_and_remove_on_one_list_in_one_update() {
    let harness = TestHarness::new();
    let cache = harness.cache();
    let engine = harness.engine::<Message>(&cache, EngineConfig::default());

    let mut m = message(1, 10, "triage");
    m.labels = vec![json!({"id": 1, "name": "inbox"})];
    engine.index(&mut m, true).await.unwrap();

    engine
        .update_fields(
            &m,
            &[
                UpdateDescriptor::list("Labels", UpdateAction::Add, [json!({"id": 2, "name": "done"})]),
                UpdateDescriptor::list("Labels", UpdateAction::Remove, [json!({"id": 1})]),
            ],
            true,
        )
        .await
        .unwrap();

    assert_eq!(
        harness.backend.document("mail", "1").unwrap()["labels"],
        json!([{"id": 2, "name": "done"}])
    );
}
