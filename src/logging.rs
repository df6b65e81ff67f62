use std::borrow::Cow;

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use log::{Level, LevelFilter};
use parking_lot::RwLock;
use regex::Regex;

use crate::util::redacted::REDACTED;

pub const LOG_FILE: &str = "vrcaa-cache.log";

lazy_static! {
    pub static ref LOG_LEVEL: RwLock<Level> = RwLock::new(Level::Info);
    static ref TOKEN_REGEX: Regex = Regex::new(r#"authcookie_[0-9A-Za-z-]+|authToken=[^&\s"]+"#).unwrap();
}

/// Strips auth cookies and pipeline tokens out of a log line.
pub fn redact(message: &str) -> Cow<'_, str> {
    TOKEN_REGEX.replace_all(message, REDACTED)
}

pub fn setup() -> Result<()> {
    fern::Dispatch::new()
        .filter(|metadata| {
            match metadata.target() {
                "vrcaa_cache" | "reqwest" | "tokio_tungstenite" => true,
                x if x.starts_with("vrcaa_cache::") => true,
                x if x.starts_with("reqwest::") => true,
                _ => false,
            }
        })
        .format(|out, message, record| {
            let message = format!("{}", message);
            let message = redact(&message);

            out.finish(format_args!(
                "[{}][{}][{}:{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S %Z"),
                record.level(),
                record.file().unwrap_or("?"),
                record.line().unwrap_or(0),
                message,
            ))
        })
        .chain(fern::Dispatch::new()
            .filter(|meta| {
                meta.level() <= *LOG_LEVEL.read()
            })
            .chain(std::io::stdout())
        )
        .chain(fern::Dispatch::new()
            .level(LevelFilter::Trace)
            .chain(fern::log_file(LOG_FILE)?)
        )
        .apply()
        .context("could not set up logging facility")
}
