//! Terminal output for the CLI.
//!
//! Human-readable lines use colored symbols; `--json` switches every helper
//! to one JSON object per line so the stream can be piped into other tools.

use std::fmt::Display;
use std::sync::{OnceLock, RwLock};

use owo_colors::OwoColorize;
use serde_json::json;

use crate::domain::InboundUpdate;

/// Runtime output configuration shared by CLI handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Emit machine-readable JSON output instead of human-readable text.
    pub json: bool,
    /// Suppress non-essential output.
    pub quiet: bool,
}

impl OutputConfig {
    #[must_use]
    pub const fn new(json: bool, quiet: bool) -> Self {
        Self { json, quiet }
    }
}

static OUTPUT_CONFIG: OnceLock<RwLock<OutputConfig>> = OnceLock::new();

fn config_cell() -> &'static RwLock<OutputConfig> {
    OUTPUT_CONFIG.get_or_init(|| RwLock::new(OutputConfig::default()))
}

fn read_config() -> OutputConfig {
    match config_cell().read() {
        Ok(config) => *config,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

fn suppressed(config: OutputConfig) -> bool {
    !config.json && config.quiet
}

fn emit_json_line(kind: &str, payload: serde_json::Value) {
    println!("{}", json!({ "type": kind, "payload": payload }));
}

/// Apply output settings from global CLI flags.
pub fn configure(config: OutputConfig) {
    match config_cell().write() {
        Ok(mut current) => *current = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

/// Print a section header.
pub fn section(title: &str) {
    let config = read_config();
    if config.json {
        emit_json_line("section", json!({ "title": title }));
        return;
    }
    if suppressed(config) {
        return;
    }

    println!();
    println!("{}", title.bold());
}

/// Print a labeled value.
pub fn field(label: &str, value: impl Display) {
    let config = read_config();
    let value = value.to_string();

    if config.json {
        emit_json_line("field", json!({ "label": label, "value": value }));
        return;
    }
    if suppressed(config) {
        return;
    }

    println!("  {:<12} {}", label.dimmed(), value);
}

pub fn success(message: &str) {
    let config = read_config();
    if config.json {
        emit_json_line("success", json!({ "message": message }));
        return;
    }
    if suppressed(config) {
        return;
    }

    println!("  {} {}", "✓".green(), message);
}

pub fn warning(message: &str) {
    if read_config().json {
        emit_json_line("warning", json!({ "message": message }));
        return;
    }

    println!("  {} {}", "⚠".yellow(), message);
}

/// Print an error line to stderr.
pub fn error(message: &str) {
    if read_config().json {
        eprintln!(
            "{}",
            json!({ "type": "error", "payload": { "message": message } })
        );
        return;
    }

    eprintln!("  {} {}", "×".red(), message);
}

/// Print a lifecycle line (connected, reconnecting, confirmed...).
pub fn status(timestamp: &str, label: &str, message: &str) {
    let config = read_config();
    if config.json {
        emit_json_line(
            "status",
            json!({ "timestamp": timestamp, "label": label, "message": message }),
        );
        return;
    }
    if suppressed(config) {
        return;
    }

    println!("  {} {} {}", timestamp.dimmed(), label.cyan(), message);
}

/// Print one metrics update. Never suppressed by `--quiet`.
pub fn update(update: &InboundUpdate) {
    if read_config().json {
        emit_json_line(
            "update",
            json!({
                "received_at": update.received_at,
                "timestamp": update.producer_timestamp,
                "user_id": update.owner_id,
                "campaign_ids": update.target_ids,
                "metrics": update.values,
            }),
        );
        return;
    }

    let values = update
        .values
        .iter()
        .map(|(name, value)| format!("{}={}", name.bold(), value))
        .collect::<Vec<_>>()
        .join(" ");
    let latency_ms = update.latency().num_milliseconds();
    println!(
        "  {} {} {} {}",
        update.received_at.format("%H:%M:%S").dimmed(),
        "update".green(),
        values,
        format!("({latency_ms}ms)").dimmed()
    );
}

pub fn note(message: &str) {
    let config = read_config();
    if config.json {
        emit_json_line("note", json!({ "message": message }));
        return;
    }
    if suppressed(config) {
        return;
    }

    println!("  {}", message.dimmed());
}
