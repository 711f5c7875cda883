//! Beacon replay — drives a scripted page session through the configured
//! trackers and prints the resulting data layer.
//!
//! A script is a JSON array of steps:
//!
//! ```json
//! [
//!   {"push": {"event": "gtm.load"}},
//!   {"hit": {"hitType": "initData", "login_session_id": "s-1", "person_id": 7}},
//!   {"dimensions": {"dimension2": 101}},
//!   {"wait_ms": 500},
//!   {"hit": {"hitType": "event", "category": "nav", "action": "go", "label": "home"}}
//! ]
//! ```

use anyhow::Context;
use beacon_core::{BeaconConfig, DataLayer, Hit, Record};
use beacon_web_sdk::constants::{GTM_TRACKER, SDK_TRACKER};
use beacon_web_sdk::{AnalyticsDispatcher, CaptureTransport, MemoryStorage, SdkTracker, TagManagerTracker};
use clap::Parser;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "beacon-replay")]
#[command(about = "Replay a scripted page session through the analytics trackers")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(long, env = "BEACON_CONFIG")]
    config: Option<PathBuf>,

    /// Session script (JSON array of steps)
    #[arg(long)]
    script: PathBuf,

    /// Pretty-print the resulting data layer
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
enum Step {
    /// Host page appends a record to the data layer.
    Push(Value),
    /// Page sends a hit through the dispatcher.
    Hit(Value),
    /// Page reports custom dimensions.
    Dimensions(Record),
    WaitMs(u64),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beacon_replay=info,beacon_web_sdk=info,beacon_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let config = BeaconConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        BeaconConfig::default()
    });
    info!(
        trackers = ?config.trackers.keys().collect::<Vec<_>>(),
        max_retries = config.polling.max_retries,
        interval_ms = config.polling.interval_ms,
        "Configuration loaded"
    );

    let raw = std::fs::read_to_string(&cli.script)
        .with_context(|| format!("reading script {}", cli.script.display()))?;
    let steps: Vec<Step> = serde_json::from_str(&raw).context("parsing script")?;

    let data_layer = DataLayer::new();
    let gtm = Arc::new(TagManagerTracker::from_config(
        data_layer.clone(),
        Arc::new(MemoryStorage::new()),
        &config,
    ));
    let capture = Arc::new(CaptureTransport::new());
    let dispatcher = AnalyticsDispatcher::new()
        .with_tracker(GTM_TRACKER, gtm.clone())
        .with_tracker(SDK_TRACKER, Arc::new(SdkTracker::new(capture.clone())));

    if let Err(e) = dispatcher.init(&config.trackers) {
        error!(error = %e, "Tracker initialization failed, continuing with the rest");
    }

    for (index, step) in steps.into_iter().enumerate() {
        match step {
            Step::Push(record) => {
                data_layer
                    .push_value(record)
                    .with_context(|| format!("step {index}"))?;
            }
            Step::Hit(value) => {
                let hit = Hit::from_value(&value).with_context(|| format!("step {index}"))?;
                dispatcher
                    .send(&hit, None)
                    .with_context(|| format!("step {index}"))?;
            }
            Step::Dimensions(dimensions) => {
                dispatcher
                    .set_dimensions(&dimensions, None)
                    .with_context(|| format!("step {index}"))?;
            }
            Step::WaitMs(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
        }
    }

    gtm.settle().await;
    info!(
        entries = data_layer.len(),
        sdk_hits = capture.count(),
        "Replay finished"
    );

    let output = json!({
        "data_layer": data_layer.snapshot(),
        "sdk_hits": capture.count(),
    });
    if cli.pretty {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{output}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_steps_parse() {
        let steps: Vec<Step> = serde_json::from_str(
            r#"[
                {"push": {"event": "gtm.load"}},
                {"hit": {"hitType": "pageview"}},
                {"dimensions": {"dimension2": 101}},
                {"wait_ms": 250}
            ]"#,
        )
        .unwrap();

        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0], Step::Push(json!({"event": "gtm.load"})));
        assert!(matches!(steps[1], Step::Hit(_)));
        assert!(matches!(&steps[2], Step::Dimensions(d) if d["dimension2"] == 101));
        assert_eq!(steps[3], Step::WaitMs(250));
    }
}
