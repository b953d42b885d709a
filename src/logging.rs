//! Logger installation for the server binary.
//!
//! The library only emits through the `log` facade; this module wires
//! `env_logger` up the way the service runs:
//!
//! | Environment | Level | Format |
//! |-------------|-------|--------|
//! | development | `debug` | human-readable, millisecond timestamps |
//! | production / test | `info` | one JSON object per line |
//!
//! `RUST_LOG` overrides the level in every environment.

use std::io::Write;

use log::LevelFilter;

use crate::config::Environment;

/// Value of the `service` field in JSON log lines.
pub const SERVICE_NAME: &str = "pdf-service";

/// Install the global logger. Safe to call more than once; later calls are
/// ignored.
pub fn init(environment: Environment) {
    let mut builder = env_logger::Builder::new();

    if environment.is_development() {
        builder
            .filter_level(LevelFilter::Debug)
            .format_timestamp_millis();
    } else {
        builder.filter_level(LevelFilter::Info).format(|buf, record| {
            let line = json_line(
                &chrono::Utc::now().to_rfc3339(),
                record.level(),
                record.target(),
                &record.args().to_string(),
            );
            writeln!(buf, "{}", line)
        });
    }

    // DevTools traffic is far too chatty at debug.
    builder
        .filter_module("headless_chrome", LevelFilter::Warn)
        .filter_module("tungstenite", LevelFilter::Warn)
        .parse_env(env_logger::Env::default());

    if builder.try_init().is_err() {
        log::debug!("Logger already installed");
    }
}

fn json_line(timestamp: &str, level: log::Level, target: &str, message: &str) -> serde_json::Value {
    serde_json::json!({
        "timestamp": timestamp,
        "level": level.as_str().to_ascii_lowercase(),
        "target": target,
        "message": message,
        "service": SERVICE_NAME,
    })
}
