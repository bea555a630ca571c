// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! CLI driver for the evaluation aggregation engine.
//!
//! # Usage
//!
//! ```bash
//! evaldash evals.jsonl
//! evaldash run1.jsonl run2.jsonl --json
//! evaldash results/ --since 2025-12-14T10:00:00Z
//! evaldash --config evaldash.yaml --watch 10
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::Value;
use tracing::info;

use evaldash::config::CONFIG_ENV;
use evaldash::group_key::subject_of;
use evaldash::{EngineConfig, Record, Snapshot, SnapshotStore, encode_record};

#[derive(Parser, Debug)]
#[command(name = "evaldash")]
#[command(about = "Aggregate LLM evaluation results from JSON Lines files")]
#[command(version)]
struct Args {
    /// Record stores: files, directories (searched for **/*.jsonl) or glob patterns
    input: Vec<PathBuf>,

    /// YAML config file; positional inputs are appended to its stores
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Attribute to leave out of group keys (repeatable, replaces the defaults)
    #[arg(long = "exclude", value_name = "FIELD")]
    exclude: Vec<String>,

    /// Refresh every N seconds until interrupted
    #[arg(short, long, value_name = "SECS")]
    watch: Option<u64>,

    /// Only print records whose timestamp sorts after this value
    #[arg(long, value_name = "TIMESTAMP")]
    since: Option<String>,

    /// Only print records for this model
    #[arg(long)]
    model: Option<String>,

    /// Print JSON instead of a text summary
    #[arg(long)]
    json: bool,
}

fn resolve_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    config.stores.extend(args.input.iter().cloned());
    if !args.exclude.is_empty() {
        config.group_key_exclusions = args.exclude.clone();
    }
    if let Some(secs) = args.watch {
        config.refresh_interval_secs = secs;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing - RUST_LOG takes precedence, fallback to info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = resolve_config(&args)?;
    if config.stores.is_empty() {
        bail!("no record stores given; pass files or set `stores` in {CONFIG_ENV}");
    }

    info!(
        stores = config.stores.len(),
        exclusions = ?config.group_key_exclusions,
        refresh_interval_secs = config.refresh_interval_secs,
        "Starting evaldash"
    );

    let store = Arc::new(SnapshotStore::from_config(&config));
    print_snapshot(&store.refresh(), &args)?;

    if config.refresh_interval_secs == 0 {
        return Ok(());
    }

    let mut interval = tokio::time::interval(Duration::from_secs(config.refresh_interval_secs));
    interval.tick().await; // Skip immediate first tick
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let refresh_store = Arc::clone(&store);
                let snapshot = tokio::task::spawn_blocking(move || refresh_store.refresh())
                    .await
                    .context("refresh task failed")?;
                print_snapshot(&snapshot, &args)?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            }
        }
    }

    Ok(())
}

fn selected_records<'a>(snapshot: &'a Snapshot, args: &Args) -> Vec<&'a Record> {
    let result = &snapshot.result;
    match (&args.since, &args.model) {
        (Some(since), Some(model)) => result
            .records_since(since)
            .into_iter()
            .filter(|r| &r.model == model)
            .collect(),
        (Some(since), None) => result.records_since(since),
        (None, Some(model)) => result.records_for_model(model),
        (None, None) => result.records.iter().collect(),
    }
}

fn print_snapshot(snapshot: &Snapshot, args: &Args) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if args.json {
        // A bare --json dumps the whole snapshot; record filters emit just the records.
        if args.since.is_none() && args.model.is_none() {
            serde_json::to_writer_pretty(&mut out, snapshot)?;
        } else {
            let records: Vec<Value> = selected_records(snapshot, args)
                .into_iter()
                .map(|r| Value::Object(encode_record(r)))
                .collect();
            serde_json::to_writer_pretty(&mut out, &records)?;
        }
        writeln!(out)?;
        return Ok(());
    }

    write_summary(&mut out, snapshot)?;
    if args.since.is_some() || args.model.is_some() {
        writeln!(out)?;
        for record in selected_records(snapshot, args) {
            writeln!(
                out,
                "{:<25} {:<24} {:<16} {:>6.3} {:>8}ms",
                record.timestamp,
                record.model,
                record.test_id.as_deref().unwrap_or("-"),
                record.scores.combined,
                record.response_time_ms,
            )?;
        }
    }
    Ok(())
}

fn write_summary(out: &mut impl Write, snapshot: &Snapshot) -> Result<()> {
    let result = &snapshot.result;
    let ingest = &snapshot.ingest;

    writeln!(
        out,
        "evaluations: {}  groups: {}  avg score: {:.3}  (generation {}, {} skipped, {} invalid, {}/{} stores failed)",
        result.total_records,
        result.group_keys.len(),
        result.avg_score,
        snapshot.generation,
        ingest.skipped,
        ingest.invalid,
        ingest.stores_failed,
        ingest.stores,
    )?;
    if result.is_empty() {
        writeln!(out, "no results yet")?;
        return Ok(());
    }

    write!(
        out,
        "{:<24} {:>6} {:>7} {:>7} {:>7} {:>9}",
        "MODEL", "COUNT", "AVG", "MIN", "MAX", "AVG_MS"
    )?;
    for name in &result.metric_names {
        write!(out, " {:>10}", name)?;
    }
    writeln!(out, "  CONFIG")?;

    for key in &result.group_keys {
        let Some(group) = result.group(key) else {
            continue;
        };
        write!(
            out,
            "{:<24} {:>6} {:>7.3} {:>7.3} {:>7.3} {:>9.1}",
            subject_of(key),
            group.count,
            group.avg_score,
            group.min_score,
            group.max_score,
            group.avg_time_ms,
        )?;
        for name in &result.metric_names {
            match group.metric_means.get(name) {
                Some(mean) => write!(out, " {:>10.3}", mean)?,
                None => write!(out, " {:>10}", "-")?,
            }
        }
        let config = key.get(subject_of(key).len() + 1..).unwrap_or("");
        writeln!(out, "  {}", config)?;
    }
    Ok(())
}
