// ABOUTME: Tracing subscriber setup, driven by CLI verbosity and an optional config `logging` section
// ABOUTME: Grounded on the FmtSubscriber::builder() wiring from the long-running client example

use serde::Deserialize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Optional `logging:` section of a gateway config file.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: Option<String>,
    /// Colorize output. Defaults to the terminal-detection `tracing-subscriber` uses.
    #[serde(default)]
    pub ansi: Option<bool>,
    /// Include the event's module path in each line.
    #[serde(default)]
    pub target: Option<bool>,
}

fn level_from_str(s: &str) -> Level {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global tracing subscriber. `debugging` (the CLI `-d`
/// equivalent, if one is added) wins over the config file's `logging.level`,
/// which wins over plain `INFO`. `ansi`/`target` are applied straight from
/// the config section when present, otherwise `tracing-subscriber`'s
/// defaults stand.
pub fn init(logging: Option<&LoggingConfig>, debugging: bool) {
    let level = if debugging {
        Level::DEBUG
    } else if let Some(level) = logging.and_then(|l| l.level.as_deref()) {
        level_from_str(level)
    } else {
        Level::INFO
    };

    let builder = FmtSubscriber::builder().with_max_level(level);
    let builder = match logging.and_then(|l| l.ansi) {
        Some(ansi) => builder.with_ansi(ansi),
        None => builder,
    };
    let builder = match logging.and_then(|l| l.target) {
        Some(target) => builder.with_target(target),
        None => builder,
    };
    let subscriber = builder.finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("tracing subscriber already set");
    }
}
