//! History command - inspect the durable run-state

use anyhow::{Context, Result};
use keyword_relay_adapters::FileHistoryStore;
use keyword_relay_domain::HistoryStore;
use serde::Serialize;
use std::path::PathBuf;

use crate::args::HistoryArgs;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct HistorySummary {
    last_update: String,
    since_id: String,
    remembered: usize,
}

pub async fn execute(args: HistoryArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let store = FileHistoryStore::new(&config.general.history_path);

    let record = store.load().await.with_context(|| {
        format!(
            "Failed to read history from {}",
            config.general.history_path.display()
        )
    })?;

    if args.json {
        let summary = HistorySummary {
            last_update: record.last_update.clone(),
            since_id: record.since_id.clone(),
            remembered: record.len(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if record.last_update.is_empty() {
        println!("Last update: Never.");
    } else {
        println!("Last update: {}", record.last_update);
    }
    println!("since_id: {}", record.since_id);
    println!("Items in memory: {}", record.len());

    Ok(())
}
