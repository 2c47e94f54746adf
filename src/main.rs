// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use topology_etl::config::load_instances;
use topology_etl::etl::DataSourceClasses;
use topology_etl::sync::run_sync;

/// Log to stderr so stdout carries only the snapshot JSON.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <instances.yaml>", args[0]);
        eprintln!("Example: {} configs/instances.yaml", args[0]);
        std::process::exit(1);
    }

    init_tracing();

    let config = load_instances(&args[1])
        .with_context(|| format!("failed to load instance configuration '{}'", args[1]))?;
    let classes = DataSourceClasses::with_builtins();

    let mut snapshots = Map::new();
    for instance in &config.instances {
        let factory = run_sync(instance, &classes)
            .with_context(|| format!("synchronization of instance '{}' failed", instance.display_name()))?;
        let snapshot = serde_json::to_value(factory.snapshot())
            .context("failed to serialize topology snapshot")?;
        snapshots.insert(instance.display_name().to_string(), snapshot);
    }

    println!("{}", serde_json::to_string_pretty(&Value::Object(snapshots))?);
    Ok(())
}
