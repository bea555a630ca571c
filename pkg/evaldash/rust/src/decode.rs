// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Record decoding: JSON Lines stores into generic field maps.
//!
//! Decoding is purely structural. A line either parses into a JSON object or
//! it is skipped with a warning; what the fields mean is decided later by
//! [`crate::classify`].

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use glob::{Pattern, PatternError, glob};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{DecodeError, StoreError};

/// File extension picked up when a directory is given as a store.
pub const STORE_EXTENSION: &str = "jsonl";

/// One structurally valid line.
#[derive(Debug, Clone)]
pub struct DecodedLine {
    /// 1-based line number within its store.
    pub line: usize,
    pub fields: Map<String, Value>,
}

/// Everything read from one store during a refresh.
#[derive(Debug, Clone)]
pub struct StoreRead {
    pub path: PathBuf,
    /// Lines seen, including blank and malformed ones.
    pub lines: usize,
    /// Lines that failed structural decoding.
    pub skipped: usize,
    pub decoded: Vec<DecodedLine>,
}

/// Decode one line of text into a field map.
///
/// Surrounding whitespace (including a trailing `\r`) is ignored. Blank lines
/// and JSON values that are not objects are rejected.
pub fn decode_line(line: &str) -> Result<Map<String, Value>, DecodeError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }

    match serde_json::from_str::<Value>(trimmed)? {
        Value::Object(fields) => Ok(fields),
        other => Err(DecodeError::NotAnObject {
            found: kind_name(&other),
        }),
    }
}

fn decode_bytes(bytes: &[u8]) -> Result<Map<String, Value>, DecodeError> {
    decode_line(std::str::from_utf8(bytes)?)
}

/// Read one store from disk, skipping lines that do not decode.
pub fn read_store(path: &Path) -> Result<StoreRead, StoreError> {
    let file = File::open(path).map_err(|source| StoreError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_lines(path, BufReader::new(file))
}

/// Read a store from any buffered reader. `path` is only used for diagnostics.
///
/// Lines are split on raw bytes so that a line with invalid UTF-8 is skipped
/// on its own instead of failing the whole store.
pub fn read_lines<R: BufRead>(path: &Path, mut reader: R) -> Result<StoreRead, StoreError> {
    let mut read = StoreRead {
        path: path.to_path_buf(),
        lines: 0,
        skipped: 0,
        decoded: Vec::new(),
    };
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|source| StoreError::Read {
                path: path.to_path_buf(),
                line: read.lines,
                source,
            })?;
        if n == 0 {
            break;
        }
        read.lines += 1;

        match decode_bytes(&buf) {
            Ok(fields) => read.decoded.push(DecodedLine {
                line: read.lines,
                fields,
            }),
            Err(e) => {
                read.skipped += 1;
                warn!(
                    store = %path.display(),
                    line = read.lines,
                    error = %e,
                    "Skipping undecodable line"
                );
            }
        }
    }

    Ok(read)
}

/// Expand configured inputs into concrete store paths, preserving input order.
///
/// - A directory expands to every `*.jsonl` file beneath it, sorted by path.
/// - An existing file is kept as is.
/// - Anything else is tried as a glob pattern. A plain path that matches
///   nothing is still kept, so a store that does not exist yet is retried
///   (and reported as unreadable) on every refresh.
/// - A malformed pattern is kept literally and fails on read, without
///   affecting the other inputs.
pub fn expand_stores(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut stores = Vec::new();
    for input in inputs {
        stores.extend(expand_input(input));
    }
    stores
}

fn expand_input(input: &Path) -> Vec<PathBuf> {
    if input.is_dir() {
        let root = Pattern::escape(&input.to_string_lossy());
        let pattern = format!("{root}/**/*.{STORE_EXTENSION}");
        return match glob_paths(&pattern) {
            Ok(mut found) => {
                found.sort();
                if found.is_empty() {
                    warn!(dir = %input.display(), "No record stores found in directory");
                }
                found
            }
            Err(e) => {
                warn!(dir = %input.display(), error = %e, "Cannot search directory for record stores");
                Vec::new()
            }
        };
    }
    if input.exists() {
        return vec![input.to_path_buf()];
    }

    let pattern = input.to_string_lossy();
    match glob_paths(&pattern) {
        Ok(mut found) if !found.is_empty() => {
            found.sort();
            found
        }
        Ok(_) if is_glob_pattern(&pattern) => {
            warn!(pattern = %pattern, "No record stores match pattern");
            Vec::new()
        }
        Ok(_) => vec![input.to_path_buf()],
        Err(e) => {
            warn!(pattern = %pattern, error = %e, "Invalid store pattern, reading it literally");
            vec![input.to_path_buf()]
        }
    }
}

fn glob_paths(pattern: &str) -> Result<Vec<PathBuf>, PatternError> {
    let mut paths = Vec::new();
    for entry in glob(pattern)? {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "glob error"),
        }
    }
    Ok(paths)
}

fn is_glob_pattern(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Short JSON type name for diagnostics.
pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
