// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Refresh cycles and the published snapshot.
//!
//! A refresh re-reads every configured store from scratch, aggregates, and
//! swaps the new [`Snapshot`] in wholesale. Readers only ever clone the
//! current `Arc`, so they see either the previous snapshot or the new one and
//! keep whatever they hold for as long as they need it.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::{AggregationResult, Aggregator};
use crate::classify::classify;
use crate::config::EngineConfig;
use crate::decode::{DecodedLine, expand_stores, read_store};
use crate::group_key::GroupKeyBuilder;

/// Line and store accounting for one refresh.
///
/// `lines == skipped + invalid + decoded` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Stores attempted.
    pub stores: usize,
    /// Stores that could not be opened or read to the end.
    pub stores_failed: usize,
    /// Lines read from readable stores.
    pub lines: usize,
    /// Lines that failed structural decoding.
    pub skipped: usize,
    /// Decoded lines missing the subject or primary metric.
    pub invalid: usize,
    /// Records aggregated.
    pub decoded: usize,
}

/// One published refresh result.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// 0 for the initial empty snapshot, then +1 per publish.
    pub generation: u64,
    pub refreshed_at: DateTime<Utc>,
    pub ingest: IngestStats,
    pub result: AggregationResult,
}

impl Snapshot {
    fn initial() -> Self {
        Self {
            generation: 0,
            refreshed_at: Utc::now(),
            ingest: IngestStats::default(),
            result: AggregationResult::default(),
        }
    }
}

/// Read, classify and aggregate `stores` in order.
///
/// Unreadable stores, undecodable lines and invalid records are logged and
/// counted, never returned as errors. A store that fails mid-read contributes
/// nothing.
pub fn load_and_aggregate(
    stores: &[PathBuf],
    keys: &GroupKeyBuilder,
) -> (IngestStats, AggregationResult) {
    let mut stats = IngestStats {
        stores: stores.len(),
        ..IngestStats::default()
    };
    let mut aggregator = Aggregator::new(keys.clone());

    for path in stores {
        let read = match read_store(path) {
            Ok(read) => read,
            Err(e) => {
                stats.stores_failed += 1;
                warn!(store = %path.display(), error = %e, "Skipping unreadable record store");
                continue;
            }
        };
        stats.lines += read.lines;
        stats.skipped += read.skipped;

        let before = aggregator.len();
        for DecodedLine { line, fields } in read.decoded {
            match classify(fields) {
                Ok(record) => aggregator.push(record),
                Err(e) => {
                    stats.invalid += 1;
                    debug!(store = %path.display(), line, error = %e, "Dropping invalid record");
                }
            }
        }
        debug!(
            store = %path.display(),
            lines = read.lines,
            records = aggregator.len() - before,
            "Read record store"
        );
    }

    stats.decoded = aggregator.len();
    (stats, aggregator.finish())
}

/// Holds the current snapshot and runs refresh cycles against a fixed set of
/// inputs.
pub struct SnapshotStore {
    inputs: Vec<PathBuf>,
    keys: GroupKeyBuilder,
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    /// Create a store publishing an empty snapshot until the first refresh.
    pub fn new(inputs: Vec<PathBuf>, keys: GroupKeyBuilder) -> Self {
        Self {
            inputs,
            keys,
            current: RwLock::new(Arc::new(Snapshot::initial())),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.stores.clone(), config.key_builder())
    }

    /// The most recently published snapshot.
    pub fn current(&self) -> Arc<Snapshot> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*current)
    }

    /// Run one full read-aggregate-publish cycle and return what was published.
    ///
    /// Inputs are re-expanded every cycle so new files under a directory are
    /// picked up. When nothing aggregates, an empty snapshot replaces the
    /// previous one.
    pub fn refresh(&self) -> Arc<Snapshot> {
        let start = Instant::now();

        let stores = expand_stores(&self.inputs);

        let (ingest, result) = load_and_aggregate(&stores, &self.keys);
        let snapshot = self.publish(ingest, result);

        if snapshot.result.is_empty() {
            warn!(
                stores = ingest.stores,
                stores_failed = ingest.stores_failed,
                generation = snapshot.generation,
                "No records yet, publishing empty snapshot"
            );
        } else {
            info!(
                generation = snapshot.generation,
                records = ingest.decoded,
                groups = snapshot.result.group_keys.len(),
                skipped = ingest.skipped,
                invalid = ingest.invalid,
                stores_failed = ingest.stores_failed,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Refreshed evaluation snapshot"
            );
        }

        snapshot
    }

    fn publish(&self, ingest: IngestStats, result: AggregationResult) -> Arc<Snapshot> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let snapshot = Arc::new(Snapshot {
            generation: current.generation + 1,
            refreshed_at: Utc::now(),
            ingest,
            result,
        });
        *current = Arc::clone(&snapshot);
        snapshot
    }
}
