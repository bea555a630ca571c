// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::PathBuf;

use thiserror::Error;

/// A record store could not be opened or read to the end.
///
/// Reported per store; other stores in the same refresh are unaffected.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read failed in {path} after line {line}: {source}")]
    Read {
        path: PathBuf,
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

/// One line failed structural decoding.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("empty line")]
    Empty,

    #[error("line is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },
}

/// A structurally valid record is missing a required field.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RecordError {
    #[error("missing or non-string field: {field}")]
    MissingSubject { field: &'static str },

    #[error("missing metric container: {field}")]
    MissingScores { field: &'static str },

    #[error("missing or non-numeric primary metric: {field}")]
    MissingPrimary { field: &'static str },
}
