//! Run command - one relay pass, or the watch loop

use anyhow::{Context, Result, bail};
use keyword_relay_adapters::{FileHistoryStore, HttpPostSearch, HttpRelayPublisher};
use keyword_relay_domain::policy::DelayPolicy;
use keyword_relay_domain::usecases::{RelayRun, RelayRunConfig};
use keyword_relay_domain::{RunReport, SystemClock, TokioSleeper};
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use crate::args::RunArgs;
use crate::config::AppConfig;

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    config.validate()?;

    let dry_run = args.dry_run || config.general.dry_run;

    tracing::info!(
        dry_run = dry_run,
        watch = args.watch,
        keywords = ?config.track.keywords,
        history = %config.general.history_path.display(),
        "Starting keyword-relay run"
    );

    let token = load_api_token(&config.api.token_env)?;

    let search = Arc::new(HttpPostSearch::with_base_url(
        token.clone(),
        config.api.search_base_url.clone(),
    ));
    let publisher = Arc::new(HttpRelayPublisher::with_base_url(
        token,
        config.api.publish_base_url.clone(),
    ));
    let history_store = Arc::new(FileHistoryStore::new(&config.general.history_path));

    let run_config = RelayRunConfig {
        keywords: config.track.keywords.clone(),
        bot_user_id: config.bot.user_id.clone(),
        page_size: config.relay.page_size,
        relay_budget: config.relay.max_chars,
        dry_run,
        delay: DelayPolicy::new(
            Duration::from_secs(config.relay.delay_base_secs),
            config.relay.delay_jitter,
        ),
    };

    let relay_run = RelayRun::new(
        search,
        publisher,
        history_store,
        Arc::new(SystemClock),
        Arc::new(TokioSleeper),
        run_config,
    );

    if args.watch {
        watch(&relay_run, Duration::from_secs(config.relay.poll_interval_secs)).await;
    } else {
        let report = relay_run.run_once().await?;
        log_report(&report);
    }

    tracing::info!("keyword-relay run completed");
    Ok(())
}

async fn watch<S, P, H, C, Sl>(relay_run: &RelayRun<S, P, H, C, Sl>, poll_interval: Duration)
where
    S: keyword_relay_domain::PostSearch + ?Sized,
    P: keyword_relay_domain::RelayPublisher + ?Sized,
    H: keyword_relay_domain::HistoryStore + ?Sized,
    C: keyword_relay_domain::Clock + ?Sized,
    Sl: keyword_relay_domain::Sleeper + ?Sized,
{
    let mut ticker = interval(poll_interval);

    // Set up graceful shutdown
    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        tracing::info!("Shutdown signal received");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match relay_run.run_once().await {
                    Ok(report) => log_report(&report),
                    Err(e) => {
                        tracing::error!(error = %e, "Relay pass failed");
                    }
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutting down gracefully");
                break;
            }
        }
    }
}

fn log_report(report: &RunReport) {
    tracing::info!(
        fetched = report.fetched,
        fresh = report.fresh,
        self_authored = report.self_authored,
        duplicates = report.duplicates,
        failed_keywords = report.failed_keywords,
        relayed = report.relayed,
        skipped = report.skipped,
        "Relay pass complete"
    );
}

fn load_api_token(env_var: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No API token env var configured");
    }

    let token = std::env::var(env_var)
        .with_context(|| format!("Missing API token env var {}", env_var))?;

    if token.trim().is_empty() {
        bail!("API token env var {} is empty", env_var);
    }

    Ok(SecretString::new(token.into()))
}
