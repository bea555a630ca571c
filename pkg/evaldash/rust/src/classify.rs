// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Field classification.
//!
//! Splits a decoded field map into the fixed schema, the metrics found under
//! `scores`, and the open-ended attribute fields. [`encode_record`] is the
//! inverse and is what output layers serialize.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::decode::kind_name;
use crate::error::RecordError;

pub const TIMESTAMP_FIELD: &str = "timestamp";
/// Short spelling of [`TIMESTAMP_FIELD`]. `timestamp` wins when both are set.
pub const TIMESTAMP_ALIAS: &str = "ts";
pub const SUBJECT_FIELD: &str = "model";
pub const TEST_ID_FIELD: &str = "test_id";
pub const QUESTION_FIELD: &str = "question";
pub const RESPONSE_FIELD: &str = "response";
pub const EXPECTED_FIELD: &str = "expected";
pub const SCORES_FIELD: &str = "scores";
pub const DURATION_FIELD: &str = "response_time_ms";
pub const METADATA_FIELD: &str = "metadata";
pub const JUDGE_MODEL_FIELD: &str = "judge_model";
pub const JUDGE_FACTUAL_FIELD: &str = "judge_factual_reasoning";
pub const JUDGE_FAITHFUL_FIELD: &str = "judge_faithful_reasoning";
pub const JUDGE_CONTEXT_FIELD: &str = "judge_context_reasoning";

/// Primary metric name inside [`SCORES_FIELD`].
pub const PRIMARY_METRIC: &str = "combined";

/// Top-level names that map onto [`Record`] fields. Everything else is an
/// attribute.
pub const FIXED_FIELDS: &[&str] = &[
    TIMESTAMP_FIELD,
    TIMESTAMP_ALIAS,
    SUBJECT_FIELD,
    TEST_ID_FIELD,
    QUESTION_FIELD,
    RESPONSE_FIELD,
    EXPECTED_FIELD,
    SCORES_FIELD,
    DURATION_FIELD,
    METADATA_FIELD,
    JUDGE_MODEL_FIELD,
    JUDGE_FACTUAL_FIELD,
    JUDGE_FAITHFUL_FIELD,
    JUDGE_CONTEXT_FIELD,
];

pub fn is_fixed_field(name: &str) -> bool {
    FIXED_FIELDS.contains(&name)
}

/// Inferred type of an attribute field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    Bool,
    String,
}

impl FieldType {
    /// Numbers and booleans keep their type; every other value is textual.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Number(_) => FieldType::Number,
            Value::Bool(_) => FieldType::Bool,
            _ => FieldType::String,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Number => "number",
            FieldType::Bool => "bool",
            FieldType::String => "string",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Primary metric plus every numeric secondary metric.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scores {
    pub combined: f64,
    pub secondary: BTreeMap<String, f64>,
}

/// LLM-as-judge annotations attached to a record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JudgeNotes {
    pub model: Option<String>,
    pub factual_reasoning: Option<String>,
    pub faithful_reasoning: Option<String>,
    pub context_reasoning: Option<String>,
}

/// One classified evaluation record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Ordering timestamp, compared lexically. Empty when the record has none.
    pub timestamp: String,
    /// Subject under evaluation.
    pub model: String,
    pub test_id: Option<String>,
    pub question: Option<String>,
    pub response: Option<String>,
    pub expected: Option<String>,
    pub scores: Scores,
    pub response_time_ms: i64,
    pub metadata: Option<Map<String, Value>>,
    pub judge: JudgeNotes,
    /// Every top-level field outside [`FIXED_FIELDS`], value untouched.
    pub attributes: BTreeMap<String, Value>,
}

impl Record {
    /// Type of each attribute as seen on this record.
    pub fn attribute_types(&self) -> impl Iterator<Item = (&str, FieldType)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), FieldType::of(value)))
    }
}

/// Project a decoded field map onto a [`Record`].
///
/// Fails only when the subject or the primary metric is missing or ill-typed.
/// Optional fixed fields of the wrong type are dropped, and non-numeric
/// entries under `scores` are discarded.
pub fn classify(mut fields: Map<String, Value>) -> Result<Record, RecordError> {
    let model = take_string(&mut fields, SUBJECT_FIELD)
        .filter(|m| !m.is_empty())
        .ok_or(RecordError::MissingSubject {
            field: SUBJECT_FIELD,
        })?;

    let mut raw_scores = match fields.remove(SCORES_FIELD) {
        Some(Value::Object(scores)) => scores,
        _ => {
            return Err(RecordError::MissingScores {
                field: SCORES_FIELD,
            });
        }
    };
    let combined = raw_scores
        .remove(PRIMARY_METRIC)
        .and_then(|v| v.as_f64())
        .ok_or(RecordError::MissingPrimary {
            field: PRIMARY_METRIC,
        })?;
    let secondary = raw_scores
        .into_iter()
        .filter_map(|(name, value)| value.as_f64().map(|v| (name, v)))
        .collect();

    let alias = take_string(&mut fields, TIMESTAMP_ALIAS);
    let timestamp = take_string(&mut fields, TIMESTAMP_FIELD)
        .or(alias)
        .unwrap_or_default();

    let metadata = match fields.remove(METADATA_FIELD) {
        Some(Value::Object(m)) => Some(m),
        None | Some(Value::Null) => None,
        Some(other) => {
            debug!(field = METADATA_FIELD, found = kind_name(&other), "Ignoring ill-typed field");
            None
        }
    };

    Ok(Record {
        timestamp,
        model,
        test_id: take_string(&mut fields, TEST_ID_FIELD),
        question: take_string(&mut fields, QUESTION_FIELD),
        response: take_string(&mut fields, RESPONSE_FIELD),
        expected: take_string(&mut fields, EXPECTED_FIELD),
        scores: Scores {
            combined,
            secondary,
        },
        response_time_ms: take_duration(&mut fields),
        metadata,
        judge: JudgeNotes {
            model: take_string(&mut fields, JUDGE_MODEL_FIELD),
            factual_reasoning: take_string(&mut fields, JUDGE_FACTUAL_FIELD),
            faithful_reasoning: take_string(&mut fields, JUDGE_FAITHFUL_FIELD),
            context_reasoning: take_string(&mut fields, JUDGE_CONTEXT_FIELD),
        },
        // All fixed fields have been removed above.
        attributes: fields.into_iter().collect(),
    })
}

/// Wire representation of a record: fixed fields, `scores` with the primary
/// and secondary metrics, and attributes merged back at the top level.
pub fn encode_record(record: &Record) -> Map<String, Value> {
    let mut out: Map<String, Value> = record
        .attributes
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    out.insert(TIMESTAMP_FIELD.into(), Value::from(record.timestamp.as_str()));
    out.insert(SUBJECT_FIELD.into(), Value::from(record.model.as_str()));

    let optional_text = [
        (TEST_ID_FIELD, &record.test_id),
        (QUESTION_FIELD, &record.question),
        (RESPONSE_FIELD, &record.response),
        (EXPECTED_FIELD, &record.expected),
        (JUDGE_MODEL_FIELD, &record.judge.model),
        (JUDGE_FACTUAL_FIELD, &record.judge.factual_reasoning),
        (JUDGE_FAITHFUL_FIELD, &record.judge.faithful_reasoning),
        (JUDGE_CONTEXT_FIELD, &record.judge.context_reasoning),
    ];
    for (name, value) in optional_text {
        if let Some(text) = value {
            out.insert(name.into(), Value::from(text.as_str()));
        }
    }

    let mut scores = Map::new();
    scores.insert(PRIMARY_METRIC.into(), Value::from(record.scores.combined));
    for (name, value) in &record.scores.secondary {
        scores.insert(name.clone(), Value::from(*value));
    }
    out.insert(SCORES_FIELD.into(), Value::Object(scores));
    out.insert(DURATION_FIELD.into(), Value::from(record.response_time_ms));

    if let Some(metadata) = &record.metadata {
        out.insert(METADATA_FIELD.into(), Value::Object(metadata.clone()));
    }

    out
}

fn take_string(fields: &mut Map<String, Value>, name: &'static str) -> Option<String> {
    match fields.remove(name)? {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => {
            debug!(field = name, found = kind_name(&other), "Ignoring ill-typed field");
            None
        }
    }
}

fn take_duration(fields: &mut Map<String, Value>) -> i64 {
    match fields.remove(DURATION_FIELD) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_default(),
        None | Some(Value::Null) => 0,
        Some(other) => {
            debug!(field = DURATION_FIELD, found = kind_name(&other), "Ignoring ill-typed field");
            0
        }
    }
}
