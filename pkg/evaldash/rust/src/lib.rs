// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Ingestion and aggregation engine for LLM evaluation logs.
//!
//! Evaluation runs append one JSON object per line to one or more record
//! stores. Beyond a model name and a `scores.combined` value there is no fixed
//! schema: any extra score becomes a secondary metric and any extra top-level
//! field becomes a configuration attribute that splits results into groups.
//!
//! ## Architecture
//!
//! Data flows one way, leaves first:
//!
//! 1. **Decoding** (`decode` module) - Reads stores line by line into generic
//!    JSON maps, skipping lines that do not parse.
//!
//! 2. **Classification** (`classify` module) - Projects the fixed fields,
//!    separates secondary metrics from attributes, and infers attribute types.
//!
//! 3. **Group keys** (`group_key` module) - Derives `model|name=value|...`
//!    keys from the attributes, minus a deny-list of per-observation fields.
//!
//! 4. **Aggregation** (`aggregate` module) - Folds records into per-group
//!    count/mean/min/max and per-metric means.
//!
//! 5. **Snapshots** (`snapshot` module) - Re-reads everything on refresh and
//!    publishes an immutable [`Snapshot`] behind an `Arc` swap.
//!
//! ## Usage
//!
//! ```bash
//! evaldash evals.jsonl
//! evaldash run1.jsonl run2.jsonl --json
//! evaldash results/ --watch 10
//! ```

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod decode;
pub mod error;
pub mod group_key;
pub mod snapshot;

pub use aggregate::{AggregationResult, Aggregator, GroupStats, aggregate};
pub use classify::{FieldType, Record, Scores, classify, encode_record};
pub use config::EngineConfig;
pub use decode::{decode_line, read_store};
pub use error::{DecodeError, RecordError, StoreError};
pub use group_key::GroupKeyBuilder;
pub use snapshot::{IngestStats, Snapshot, SnapshotStore};
