// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Group keys: `model|name=value|...` over a record's attribute fields.
//!
//! Attributes are taken in lexical name order, so two records with the same
//! subject and the same attribute contents always share a key. Fields that
//! vary per observation rather than per configuration are excluded.

use std::collections::BTreeSet;

use serde_json::{Number, Value};

use crate::classify::Record;

/// Attributes left out of the key unless configured otherwise.
pub const DEFAULT_GROUP_KEY_EXCLUSIONS: &[&str] = &["question_id", "test_run_date"];

pub const KEY_SEPARATOR: char = '|';

/// Render an attribute value for keys and display.
///
/// Formatting depends only on content, never on the inferred field type:
/// `5`, `5.0` and `"5"` all render as `5`.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => format_number(n),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        // f64 Display drops a zero fraction and never uses an exponent.
        n.as_f64().unwrap_or_default().to_string()
    }
}

/// Subject part of a group key.
pub fn subject_of(key: &str) -> &str {
    key.split_once(KEY_SEPARATOR).map_or(key, |(subject, _)| subject)
}

/// Builds group keys with a fixed set of excluded attribute names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupKeyBuilder {
    exclusions: BTreeSet<String>,
}

impl GroupKeyBuilder {
    pub fn new<I, S>(exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exclusions: exclusions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclusions.contains(name)
    }

    pub fn exclusions(&self) -> impl Iterator<Item = &str> {
        self.exclusions.iter().map(String::as_str)
    }

    pub fn build(&self, record: &Record) -> String {
        let mut key = record.model.clone();
        // BTreeMap iteration is already sorted by name.
        for (name, value) in &record.attributes {
            if self.is_excluded(name) {
                continue;
            }
            key.push(KEY_SEPARATOR);
            key.push_str(name);
            key.push('=');
            key.push_str(&format_value(value));
        }
        key
    }
}

impl Default for GroupKeyBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_GROUP_KEY_EXCLUSIONS.iter().copied())
    }
}
