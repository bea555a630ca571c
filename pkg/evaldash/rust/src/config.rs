// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::group_key::{DEFAULT_GROUP_KEY_EXCLUSIONS, GroupKeyBuilder};

/// Environment variable naming an optional YAML config file.
pub const CONFIG_ENV: &str = "EVALDASH_CONFIG";

fn default_exclusions() -> Vec<String> {
    DEFAULT_GROUP_KEY_EXCLUSIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Files, directories or glob patterns, read in this order.
    #[serde(default)]
    pub stores: Vec<PathBuf>,
    /// Attribute names left out of group keys.
    #[serde(default = "default_exclusions")]
    pub group_key_exclusions: Vec<String>,
    /// Seconds between refreshes; 0 refreshes once.
    #[serde(default)]
    pub refresh_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stores: Vec::new(),
            group_key_exclusions: default_exclusions(),
            refresh_interval_secs: 0,
        }
    }
}

impl EngineConfig {
    /// Parse a YAML config file. An empty file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn key_builder(&self) -> GroupKeyBuilder {
        GroupKeyBuilder::new(self.group_key_exclusions.iter().cloned())
    }
}
