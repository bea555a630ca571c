// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Per-group statistics over classified records.
//!
//! One pass folds every record into a running accumulator for its group;
//! [`Aggregator::finish`] turns the accumulators into means. All collections
//! are ordered maps or sorted lists, so the output depends only on the input
//! sequence and never on the order in which groups were discovered.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};

use crate::classify::{FieldType, Record, encode_record};
use crate::group_key::{GroupKeyBuilder, format_value};

/// Finalized statistics for one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    /// Full group key (model plus configuration attributes).
    pub key: String,
    /// Model name alone, for display.
    pub model: String,
    pub count: usize,
    pub avg_score: f64,
    pub min_score: f64,
    pub max_score: f64,
    /// Mean of each secondary metric over the records that reported it.
    pub metric_means: BTreeMap<String, f64>,
    pub avg_time_ms: f64,
    /// First value seen for each attribute in this group, formatted.
    pub fields: BTreeMap<String, String>,
}

/// Output of one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregationResult {
    pub total_records: usize,
    /// Unweighted mean of the primary metric over all records.
    pub avg_score: f64,
    /// Sorted group keys.
    pub group_keys: Vec<String>,
    pub groups: BTreeMap<String, GroupStats>,
    /// Sorted union of secondary metric names.
    pub metric_names: Vec<String>,
    /// Sorted union of attribute names.
    pub attribute_names: Vec<String>,
    /// Type of each attribute at its first sighting.
    pub attribute_types: BTreeMap<String, FieldType>,
    /// Every aggregated record, in input order.
    #[serde(serialize_with = "serialize_records")]
    pub records: Vec<Record>,
}

impl AggregationResult {
    pub fn is_empty(&self) -> bool {
        self.total_records == 0
    }

    pub fn group(&self, key: &str) -> Option<&GroupStats> {
        self.groups.get(key)
    }

    /// Records whose timestamp sorts strictly after `since`.
    pub fn records_since<'a>(&'a self, since: &str) -> Vec<&'a Record> {
        self.records
            .iter()
            .filter(|r| r.timestamp.as_str() > since)
            .collect()
    }

    /// Records for one model, across all of its groups.
    pub fn records_for_model<'a>(&'a self, model: &str) -> Vec<&'a Record> {
        self.records.iter().filter(|r| r.model == model).collect()
    }
}

fn serialize_records<S: Serializer>(records: &[Record], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(records.iter().map(encode_record))
}

#[derive(Debug, Default)]
struct MetricSum {
    sum: f64,
    count: usize,
}

#[derive(Debug)]
struct GroupAccumulator {
    model: String,
    count: usize,
    score_sum: f64,
    min_score: f64,
    max_score: f64,
    metrics: BTreeMap<String, MetricSum>,
    time_sum: f64,
    fields: BTreeMap<String, String>,
}

impl GroupAccumulator {
    fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            count: 0,
            score_sum: 0.0,
            min_score: f64::INFINITY,
            max_score: f64::NEG_INFINITY,
            metrics: BTreeMap::new(),
            time_sum: 0.0,
            fields: BTreeMap::new(),
        }
    }

    fn add(&mut self, record: &Record) {
        let score = record.scores.combined;
        self.count += 1;
        self.score_sum += score;
        self.min_score = self.min_score.min(score);
        self.max_score = self.max_score.max(score);
        self.time_sum += record.response_time_ms as f64;

        for (name, value) in &record.scores.secondary {
            let metric = self.metrics.entry(name.clone()).or_default();
            metric.sum += value;
            metric.count += 1;
        }

        for (name, value) in &record.attributes {
            if !self.fields.contains_key(name) {
                self.fields.insert(name.clone(), format_value(value));
            }
        }
    }

    fn finish(self, key: String) -> GroupStats {
        // count >= 1: accumulators are only created for a record.
        let n = self.count as f64;
        GroupStats {
            key,
            model: self.model,
            count: self.count,
            avg_score: self.score_sum / n,
            min_score: self.min_score,
            max_score: self.max_score,
            // Each MetricSum is created together with its first count.
            metric_means: self
                .metrics
                .into_iter()
                .map(|(name, m)| (name, m.sum / m.count as f64))
                .collect(),
            avg_time_ms: self.time_sum / n,
            fields: self.fields,
        }
    }
}

/// Single-pass accumulator for [`AggregationResult`].
#[derive(Debug)]
pub struct Aggregator {
    keys: GroupKeyBuilder,
    groups: BTreeMap<String, GroupAccumulator>,
    score_sum: f64,
    metric_names: BTreeSet<String>,
    attribute_types: BTreeMap<String, FieldType>,
    records: Vec<Record>,
}

impl Aggregator {
    pub fn new(keys: GroupKeyBuilder) -> Self {
        Self {
            keys,
            groups: BTreeMap::new(),
            score_sum: 0.0,
            metric_names: BTreeSet::new(),
            attribute_types: BTreeMap::new(),
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: Record) {
        let key = self.keys.build(&record);
        self.groups
            .entry(key)
            .or_insert_with(|| GroupAccumulator::new(&record.model))
            .add(&record);

        self.score_sum += record.scores.combined;
        for name in record.scores.secondary.keys() {
            if !self.metric_names.contains(name) {
                self.metric_names.insert(name.clone());
            }
        }
        // First sighting fixes the type for the rest of the pass.
        for (name, field_type) in record.attribute_types() {
            if !self.attribute_types.contains_key(name) {
                self.attribute_types.insert(name.to_string(), field_type);
            }
        }

        self.records.push(record);
    }

    pub fn finish(self) -> AggregationResult {
        let total_records = self.records.len();
        let avg_score = if total_records > 0 {
            self.score_sum / total_records as f64
        } else {
            0.0
        };

        let groups: BTreeMap<String, GroupStats> = self
            .groups
            .into_iter()
            .map(|(key, acc)| (key.clone(), acc.finish(key)))
            .collect();

        AggregationResult {
            total_records,
            avg_score,
            group_keys: groups.keys().cloned().collect(),
            groups,
            metric_names: self.metric_names.into_iter().collect(),
            attribute_names: self.attribute_types.keys().cloned().collect(),
            attribute_types: self.attribute_types,
            records: self.records,
        }
    }
}

/// Aggregate a full record sequence in one call.
pub fn aggregate<I>(records: I, keys: &GroupKeyBuilder) -> AggregationResult
where
    I: IntoIterator<Item = Record>,
{
    let mut aggregator = Aggregator::new(keys.clone());
    for record in records {
        aggregator.push(record);
    }
    aggregator.finish()
}
