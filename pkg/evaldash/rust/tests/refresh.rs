// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fs;
use std::path::{Path, PathBuf};

use evaldash::snapshot::load_and_aggregate;
use evaldash::{EngineConfig, GroupKeyBuilder, SnapshotStore};
use proptest::prelude::*;

fn write_store(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut contents = lines.join("\n");
    contents.push('\n');
    fs::write(&path, contents).unwrap();
    path
}

fn refresh(stores: Vec<PathBuf>) -> std::sync::Arc<evaldash::Snapshot> {
    SnapshotStore::new(stores, GroupKeyBuilder::default()).refresh()
}

// ===========================================================================
// Aggregation scenarios
// ===========================================================================

#[test]
fn test_repeated_observations_collapse_into_one_group() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_store(
        dir.path(),
        "evals.jsonl",
        &[
            r#"{"ts":"t1","model":"m","scores":{"combined":0.8}}"#,
            r#"{"ts":"t2","model":"m","scores":{"combined":0.6}}"#,
        ],
    );

    let snapshot = refresh(vec![path]);
    let result = &snapshot.result;
    assert_eq!(result.group_keys, vec!["m"]);

    let group = result.group("m").unwrap();
    assert_eq!(group.count, 2);
    assert!((group.avg_score - 0.7).abs() < 1e-9);
    assert_eq!(group.min_score, 0.6);
    assert_eq!(group.max_score, 0.8);
}

#[test]
fn test_extra_attribute_creates_distinct_group() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_store(
        dir.path(),
        "evals.jsonl",
        &[
            r#"{"ts":"t1","model":"m","scores":{"combined":0.8}}"#,
            r#"{"ts":"t2","model":"m","scores":{"combined":0.6},"temp":0.5}"#,
        ],
    );

    let snapshot = refresh(vec![path]);
    let result = &snapshot.result;
    assert_eq!(result.group_keys, vec!["m", "m|temp=0.5"]);
    assert_eq!(result.group("m").unwrap().count, 1);
    assert_eq!(result.group("m|temp=0.5").unwrap().count, 1);
}

#[test]
fn test_malformed_line_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_store(
        dir.path(),
        "evals.jsonl",
        &[
            r#"{"ts":"t1","model":"m","scores":{"combined":0.8}}"#,
            r#"{"ts":"t2","model":"m","scores":{"combi"#,
            r#"{"ts":"t3","model":"m","scores":{"combined":0.6}}"#,
        ],
    );

    let snapshot = refresh(vec![path]);
    assert_eq!(snapshot.ingest.lines, 3);
    assert_eq!(snapshot.ingest.skipped, 1);
    assert_eq!(snapshot.result.total_records, 2);
    assert_eq!(snapshot.result.group("m").unwrap().count, 2);
}

#[test]
fn test_empty_store_yields_empty_result() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("evals.jsonl");
    fs::write(&path, "").unwrap();

    let snapshot = refresh(vec![path]);
    assert_eq!(snapshot.result.total_records, 0);
    assert!(snapshot.result.group_keys.is_empty());
    assert_eq!(snapshot.result.avg_score, 0.0);
}

#[test]
fn test_records_since_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_store(
        dir.path(),
        "evals.jsonl",
        &[
            r#"{"timestamp":"2025-12-14T10:00:00Z","model":"a","scores":{"combined":0.5}}"#,
            r#"{"timestamp":"2025-12-14T10:05:00Z","model":"b","scores":{"combined":0.5}}"#,
            r#"{"timestamp":"2025-12-14T10:05:00Z","model":"c","scores":{"combined":0.5}}"#,
            r#"{"timestamp":"2025-12-14T10:10:00Z","model":"d","scores":{"combined":0.5}}"#,
        ],
    );

    let snapshot = refresh(vec![path]);
    let mut models: Vec<_> = snapshot
        .result
        .records_since("2025-12-14T10:05:00Z")
        .into_iter()
        .map(|r| r.model.as_str())
        .collect();
    models.sort();
    assert_eq!(models, vec!["d"]);

    let after_first = snapshot.result.records_since("2025-12-14T10:00:00Z");
    assert_eq!(after_first.len(), 3);
}

// ===========================================================================
// Multiple stores
// ===========================================================================

#[test]
fn test_stores_are_concatenated_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let second = write_store(
        dir.path(),
        "run2.jsonl",
        &[r#"{"ts":"t2","model":"m","test_id":"second","scores":{"combined":0.2}}"#],
    );
    let first = write_store(
        dir.path(),
        "run1.jsonl",
        &[r#"{"ts":"t1","model":"m","test_id":"first","scores":{"combined":0.4}}"#],
    );

    let snapshot = refresh(vec![second, first]);
    let ids: Vec<_> = snapshot
        .result
        .records
        .iter()
        .map(|r| r.test_id.as_deref().unwrap())
        .collect();
    assert_eq!(ids, vec!["second", "first"]);
    assert_eq!(snapshot.result.group("m").unwrap().count, 2);
}

#[test]
fn test_same_store_twice_is_not_deduplicated() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_store(
        dir.path(),
        "evals.jsonl",
        &[r#"{"ts":"t1","model":"m","scores":{"combined":0.8}}"#],
    );

    let snapshot = refresh(vec![path.clone(), path]);
    assert_eq!(snapshot.ingest.stores, 2);
    assert_eq!(snapshot.result.total_records, 2);
}

#[test]
fn test_directory_input_picks_up_new_files() {
    let dir = tempfile::tempdir().unwrap();
    write_store(
        dir.path(),
        "a.jsonl",
        &[r#"{"ts":"t1","model":"m","scores":{"combined":0.8}}"#],
    );

    let store = SnapshotStore::new(vec![dir.path().to_path_buf()], GroupKeyBuilder::default());
    assert_eq!(store.refresh().result.total_records, 1);

    write_store(
        dir.path(),
        "b.jsonl",
        &[r#"{"ts":"t2","model":"n","scores":{"combined":0.4}}"#],
    );
    let snapshot = store.refresh();
    assert_eq!(snapshot.ingest.stores, 2);
    assert_eq!(snapshot.result.group_keys, vec!["m", "n"]);
}

#[test]
fn test_malformed_pattern_does_not_hide_directory_records() {
    let dir = tempfile::tempdir().unwrap();
    write_store(
        dir.path(),
        "a.jsonl",
        &[r#"{"ts":"t1","model":"m","scores":{"combined":0.8}}"#],
    );

    let snapshot = refresh(vec![
        dir.path().to_path_buf(),
        PathBuf::from("/nonexistent/run[.jsonl"),
    ]);
    assert_eq!(snapshot.ingest.stores, 2);
    assert_eq!(snapshot.ingest.stores_failed, 1);
    assert_eq!(snapshot.result.total_records, 1);
    assert_eq!(snapshot.result.group_keys, vec!["m"]);
}

#[test]
fn test_config_exclusions_drive_grouping() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_store(
        dir.path(),
        "evals.jsonl",
        &[
            r#"{"ts":"t1","model":"m","scores":{"combined":0.8},"seed":1,"question_id":"q1"}"#,
            r#"{"ts":"t2","model":"m","scores":{"combined":0.6},"seed":2,"question_id":"q2"}"#,
        ],
    );
    let config = EngineConfig::from_yaml(&format!(
        "stores: ['{}']\ngroup_key_exclusions: [seed, question_id]\n",
        path.display()
    ))
    .unwrap();

    let snapshot = SnapshotStore::from_config(&config).refresh();
    assert_eq!(snapshot.result.group_keys, vec!["m"]);
    assert_eq!(snapshot.result.attribute_names, vec!["question_id", "seed"]);
}

#[test]
fn test_full_original_record_shape() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_store(
        dir.path(),
        "evals.jsonl",
        &[
            r#"{"timestamp":"2025-12-14T10:00:00Z","model":"gemma2:2b","test_id":"eval_001","question":"What is the capital of France?","response":"The capital of France is Paris.","expected":"Paris","response_time_ms":850,"scores":{"combined":0.95,"accuracy":1.0,"fluency":0.95,"completeness":0.90},"embedding_model":"nomic-embed-text","chunk_size":500,"chunk_overlap":50,"top_k":5,"retrieval_method":"similarity","temperature":0.7}"#,
        ],
    );

    let snapshot = refresh(vec![path]);
    let result = &snapshot.result;
    assert_eq!(
        result.group_keys,
        vec![
            "gemma2:2b|chunk_overlap=50|chunk_size=500|embedding_model=nomic-embed-text|retrieval_method=similarity|temperature=0.7|top_k=5"
        ]
    );
    assert_eq!(result.metric_names, vec!["accuracy", "completeness", "fluency"]);
    assert_eq!(result.attribute_names.len(), 6);
    assert_eq!(
        result.attribute_types["retrieval_method"],
        evaldash::FieldType::String
    );
    assert_eq!(result.attribute_types["top_k"], evaldash::FieldType::Number);
}

// ===========================================================================
// Properties
// ===========================================================================

fn line_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        // valid
        (0u8..3, 0u32..100, prop::option::of(0u8..3)).prop_map(|(model, score, temp)| {
            let mut line = format!(
                r#"{{"ts":"t{score}","model":"m{model}","scores":{{"combined":{}}}"#,
                score as f64 / 100.0
            );
            if let Some(t) = temp {
                line.push_str(&format!(r#","temp":{t}"#));
            }
            line.push('}');
            line
        }),
        // semantically invalid
        Just(r#"{"ts":"t","model":"m0","scores":{"accuracy":1}}"#.to_string()),
        Just(r#"{"ts":"t","scores":{"combined":0.5}}"#.to_string()),
        // structurally invalid
        Just("{not json".to_string()),
        Just("[]".to_string()),
        Just(String::new()),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_line_accounting_holds(
        first in prop::collection::vec(line_strategy(), 0..30),
        second in prop::collection::vec(line_strategy(), 0..30),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let mut stores = Vec::new();
        for (name, lines) in [("a.jsonl", &first), ("b.jsonl", &second)] {
            let path = dir.path().join(name);
            let mut contents = lines.join("\n");
            if !lines.is_empty() {
                contents.push('\n');
            }
            fs::write(&path, contents).unwrap();
            stores.push(path);
        }

        let (ingest, result) = load_and_aggregate(&stores, &GroupKeyBuilder::default());
        prop_assert_eq!(ingest.lines, first.len() + second.len());
        prop_assert_eq!(ingest.lines, ingest.skipped + ingest.invalid + ingest.decoded);
        prop_assert_eq!(ingest.decoded, result.total_records);
        let counted: usize = result.groups.values().map(|g| g.count).sum();
        prop_assert_eq!(counted, result.total_records);

        let (_, again) = load_and_aggregate(&stores, &GroupKeyBuilder::default());
        prop_assert_eq!(
            serde_json::to_string(&result).unwrap(),
            serde_json::to_string(&again).unwrap()
        );
    }
}
