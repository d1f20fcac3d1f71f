//! Doctor command - validate configuration and show status

use anyhow::Result;
use keyword_relay_adapters::FileHistoryStore;
use keyword_relay_domain::HistoryStore;
use serde::Serialize;
use std::path::PathBuf;

use crate::args::DoctorArgs;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    keywords: CheckResult,
    bot: CheckResult,
    credentials: CheckResult,
    history: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        keywords: CheckResult::error("Not checked"),
        bot: CheckResult::error("Not checked"),
        credentials: CheckResult::error("Not checked"),
        history: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.keywords = check_keywords(config);
        report.bot = check_bot(config);
        report.credentials = check_credentials(config);
        report.history = check_history(config).await;
    }

    let checks = [
        &report.config,
        &report.keywords,
        &report.bot,
        &report.credentials,
        &report.history,
    ];
    let has_error = checks.iter().any(|c| c.is_error());
    report.overall = if has_error { "error" } else { "ok" }.to_string();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if has_error {
        anyhow::bail!("Doctor found problems");
    }

    Ok(())
}

fn check_keywords(config: &AppConfig) -> CheckResult {
    if config.track.keywords.is_empty() {
        CheckResult::error("No keywords configured")
    } else {
        CheckResult::ok(format!("{} keyword(s) tracked", config.track.keywords.len()))
    }
}

fn check_bot(config: &AppConfig) -> CheckResult {
    if config.bot.user_id.trim().is_empty() {
        CheckResult::error("No bot user id configured")
    } else {
        CheckResult::ok(format!("Bot user id: {}", config.bot.user_id))
    }
}

fn check_credentials(config: &AppConfig) -> CheckResult {
    let env_var = config.api.token_env.trim();
    if env_var.is_empty() {
        return CheckResult::error("No API token env var configured");
    }

    match std::env::var(env_var) {
        Ok(token) if !token.trim().is_empty() => {
            CheckResult::ok(format!("API token present in {}", env_var))
        }
        _ => CheckResult::error(format!("API token env var {} is not set", env_var)),
    }
}

async fn check_history(config: &AppConfig) -> CheckResult {
    let store = FileHistoryStore::new(&config.general.history_path);

    match store.load().await {
        Ok(record) if record.is_empty() => CheckResult::ok("History is empty (first run)"),
        Ok(record) => CheckResult::ok(format!(
            "{} item(s) remembered, since_id {}",
            record.len(),
            record.since_id
        )),
        // A run falls back to an empty record in this case
        Err(e) => CheckResult::warn(format!("History unreadable: {}", e)),
    }
}

fn print_report(report: &DoctorReport) {
    let rows = [
        ("config", &report.config),
        ("keywords", &report.keywords),
        ("bot", &report.bot),
        ("credentials", &report.credentials),
        ("history", &report.history),
    ];

    for (name, check) in rows {
        println!("{:12} [{}] {}", name, check.status, check.message);
    }
    println!();
    println!("overall: {}", report.overall);
}
