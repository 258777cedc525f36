use chrono::Local;
use fern::Dispatch;
use log::LevelFilter;
use std::fs;
use std::path::Path;
use time::macros::format_description;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;

use crate::domain::utils::statistics::ANALYTICS_TARGET;

// Define where to store logs
const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "system.log";

/// Initializes the global logger.
///
/// This function should be called once at the very beginning of the
/// application's `main` function.
///
/// Log level is controlled by the `RUST_LOG` environment variable.
/// Example: `RUST_LOG=debug netrap_dismi`
///
/// If `RUST_LOG` is not set, it defaults to `info`.
/// Logs will be written to `logs/system.log` and the console.
pub fn init() {
    if let Err(e) = fs::create_dir_all(LOG_DIR) {
        eprintln!("Failed to create log directory at '{}': {}", LOG_DIR, e);
    }

    let log_file_path = format!("{}/{}", LOG_DIR, LOG_FILE);

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let log_level_filter = log_level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info);

    // Analytics records are routed through tracing, keep them out of the console.
    let base_config = Dispatch::new()
        .level(log_level_filter)
        .level_for("serde", LevelFilter::Warn)
        .level_for(ANALYTICS_TARGET, LevelFilter::Off);

    let console_config = Dispatch::new()
        .format(|out, message, record| {
            let colors = fern::colors::ColoredLevelConfig::new()
                .error(fern::colors::Color::Red)
                .warn(fern::colors::Color::Yellow)
                .info(fern::colors::Color::Green)
                .debug(fern::colors::Color::Blue)
                .trace(fern::colors::Color::BrightBlack);

            out.finish(format_args!(
                "[{} {} {}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr());

    let file_config = Dispatch::new().format(|out, message, record| {
        out.finish(format_args!("[{} {} {}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), record.level(), record.target(), message))
    });

    let file_config = match fern::log_file(&log_file_path) {
        Ok(file) => file_config.chain(file),
        Err(e) => {
            eprintln!("Failed to open log file '{}': {}", log_file_path, e);
            file_config.chain(std::io::stderr())
        }
    };

    base_config.chain(console_config).chain(file_config).apply().unwrap_or_else(|e| {
        eprintln!("Failed to apply logger configuration: {}", e);
    });

    log::info!("Logger initialized. Logging to console and '{}'.", log_file_path);
}

/// Installs the analytics subscriber.
///
/// Only events emitted with `target: ANALYTICS_TARGET` are recorded; they are
/// written line by line to `file_name` inside `dir` through a non-blocking
/// appender. The returned guard has to be kept alive for as long as events
/// should be flushed.
///
/// # Returns
/// Returns `None` if a global tracing subscriber was already installed.
pub fn init_analytics(dir: impl AsRef<Path>, file_name: &str) -> Option<WorkerGuard> {
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let timer = LocalTime::new(format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"));

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_timer(timer)
        .with_filter(Targets::new().with_target(ANALYTICS_TARGET, tracing::Level::TRACE));

    let subscriber = tracing_subscriber::registry().with(layer);

    match tracing::subscriber::set_global_default(subscriber) {
        Ok(()) => Some(guard),
        Err(e) => {
            log::warn!("Analytics subscriber not installed: {}", e);
            None
        }
    }
}
