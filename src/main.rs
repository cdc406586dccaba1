//! # Feeder Link
//!
//! Read telemetry from a feeder's NFC tag and ask it for float history.
//!
//! The tag is reached through a tag image file, so the same binary can stand
//! in for the device side (`emulate`) while testing.
//!
//! # Examples
//!
//! ```bash
//! feeder-link emulate status.json
//! feeder-link scan
//! feeder-link request Temperature --range -3h
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use feeder_link::config::{Config, LoggingConfig};
use feeder_link::exchange::controller::{SessionOutcome, TagExchange};
use feeder_link::exchange::observer::{ScanObserver, TerminalBell};
use feeder_link::exchange::request::RangeToken;
use feeder_link::exchange::transport::{FileTagTransport, TagTransport};
use feeder_link::ndef::encoder::encode_text_message;
use feeder_link::telemetry::payload::{parse_json, TagPayload};
use feeder_link::telemetry::reshape::GroupedSnapshot;
use feeder_link::telemetry::series::{ChartPoint, FloatSampleSeries};

/// Name prefix of daily log files
const LOG_FILE_PREFIX: &str = "feeder-link.log";

#[derive(Debug, Parser)]
#[command(name = "feeder-link", version, about = "Exchange telemetry with a feeder over NFC")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, env = "FEEDER_LINK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read whatever payload the tag carries
    Scan,
    /// Read live telemetry
    Live,
    /// Read a float series
    Float,
    /// Ask the feeder for the history of one float field
    Request {
        /// Field name, with or without the root prefix
        field: String,
        /// Start of the window, e.g. -30m, -3h, -12h
        #[arg(short, long, allow_hyphen_values = true)]
        range: Option<String>,
    },
    /// Write a JSON file to the tag image as the feeder would
    Emulate {
        json_file: PathBuf,
    },
}

/// Observer printing display models as pretty JSON on stdout
#[derive(Debug, Default)]
struct ConsoleObserver {
    graph_title: Option<String>,
}

impl ConsoleObserver {
    fn print<T: Serialize>(&self, value: &T) {
        match render_json(value) {
            Ok(text) => println!("{}", text),
            Err(e) => warn!("Failed to render scan result: {}", e),
        }
    }
}

impl ScanObserver for ConsoleObserver {
    fn on_live_scan(&mut self, snapshot: &GroupedSnapshot) {
        self.print(snapshot);
    }

    fn on_float_scan(&mut self, series: &FloatSampleSeries) {
        if let Some(title) = &self.graph_title {
            println!("{}", title);
        }
        self.print(series);
    }

    fn on_chart_data(&mut self, points: &[ChartPoint]) {
        info!("{} chart points ready", points.len());
    }

    fn set_prompt_visible(&mut self, visible: bool) {
        if visible {
            eprintln!("Hold your device near the feeder tag...");
        }
    }

    fn set_graph_title(&mut self, title: &str) {
        self.graph_title = Some(title.to_string());
    }

    fn alert(&mut self, title: &str, message: &str) {
        eprintln!("{}: {}", title, message);
    }
}

fn render_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

/// Set up console logging plus an optional daily log file
///
/// The returned guard must live until exit so buffered file lines are flushed.
fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level: tracing::Level = logging
        .level
        .parse()
        .with_context(|| format!("invalid log level '{}'", logging.level))?;
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    let console = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match &logging.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer);
            tracing_subscriber::registry().with(filter).with(console).with(file).init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry().with(filter).with(console).init();
            Ok(None)
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Encode a JSON file as a tag image, as the feeder side would
async fn emulate(config: &Config, json_file: &PathBuf) -> Result<()> {
    let text = tokio::fs::read_to_string(json_file)
        .await
        .with_context(|| format!("failed to read {}", json_file.display()))?;
    let text = text.trim();

    let payload = TagPayload::classify(parse_json(text)?)?;
    info!("Emulating {} payload", payload.variant_name());

    let image = encode_text_message(text, &config.tag.language);
    tokio::fs::write(&config.tag.image_path, &image)
        .await
        .with_context(|| format!("failed to write tag image {}", config.tag.image_path))?;
    info!("Wrote {} bytes to {}", image.len(), config.tag.image_path);
    Ok(())
}

async fn run_session<T: TagTransport>(
    exchange: &mut TagExchange<T>,
    command: &Command,
    config: &Config,
) -> Result<SessionOutcome> {
    let outcome = match command {
        Command::Scan => exchange.scan().await,
        Command::Live => exchange.read_live().await,
        Command::Float => exchange.read_float_series().await,
        Command::Request { field, range } => {
            let range = match range {
                Some(token) => token.parse::<RangeToken>()?,
                None => config.default_range()?,
            };
            exchange.request_float_range(field, &range).await
        }
        Command::Emulate { .. } => bail!("emulate does not open a tag session"),
    };
    Ok(outcome)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    let _guard = init_logging(&config.logging)?;

    info!("Feeder Link v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Command::Emulate { json_file } = &cli.command {
        return emulate(&config, json_file).await;
    }

    let transport = FileTagTransport::new(&config.tag.image_path, config.poll_interval());
    let mut exchange = TagExchange::new(
        transport,
        Box::new(ConsoleObserver::default()),
        Box::new(TerminalBell),
        config.exchange_settings(),
    );
    info!(
        "Using tag image at {} (field root '{}', language '{}')",
        exchange.transport().path().display(),
        exchange.settings().field_root,
        exchange.settings().language
    );

    let result = tokio::select! {
        result = run_session(&mut exchange, &cli.command, &config) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    let outcome = match result {
        Some(result) => result?,
        None => {
            info!("Received Ctrl+C, cancelling session...");
            exchange.cancel().await;
            return Ok(());
        }
    };

    let stats = exchange.stats();
    info!(
        "Session done: {} acquired, {} released, {} failures",
        stats.acquired, stats.released, stats.failures
    );

    match outcome {
        SessionOutcome::Completed => Ok(()),
        SessionOutcome::NoMessage => {
            warn!("Tag carries no message");
            Ok(())
        }
        SessionOutcome::Failed(kind) => bail!("NFC session failed: {}", kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_request_command() {
        let cli = Cli::try_parse_from([
            "feeder-link",
            "request",
            "Temperature",
            "--range",
            "-3h",
            "--config",
            "feeder.toml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("feeder.toml")));
        match cli.command {
            Command::Request { field, range } => {
                assert_eq!(field, "Temperature");
                assert_eq!(range.as_deref(), Some("-3h"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_requires_subcommand() {
        assert!(Cli::try_parse_from(["feeder-link"]).is_err());
        assert!(Cli::try_parse_from(["feeder-link", "emulate"]).is_err());
    }

    #[test]
    fn test_load_default_config_without_path() {
        assert_eq!(load_config(None).unwrap(), Config::default());
    }

    #[test]
    fn test_render_json_is_pretty() {
        let text = render_json(&serde_json::json!({"a": 1})).unwrap();
        assert_eq!(text, "{\n  \"a\": 1\n}");
    }

    #[tokio::test]
    async fn test_emulate_then_scan() {
        use feeder_link::exchange::observer::SilentCue;
        use tempfile::tempdir;

        let dir = tempdir().unwrap();
        let json_file = dir.path().join("status.json");
        std::fs::write(&json_file, r#"{"float_averages": {"Temp.Inside": 21.5}}"#).unwrap();

        let mut config = Config::default();
        config.tag.image_path = dir.path().join("tag.ndef").to_string_lossy().into_owned();
        emulate(&config, &json_file).await.unwrap();

        let transport = FileTagTransport::new(&config.tag.image_path, config.poll_interval());
        let mut exchange = TagExchange::new(
            transport,
            Box::new(ConsoleObserver::default()),
            Box::new(SilentCue),
            config.exchange_settings(),
        );
        let outcome = run_session(&mut exchange, &Command::Scan, &config).await.unwrap();
        assert_eq!(outcome, SessionOutcome::Completed);
        assert!(exchange.last_snapshot().is_some());
        assert!(!exchange.transport().is_engaged());
        assert_eq!(exchange.settings().language, "en");
    }

    #[tokio::test]
    async fn test_emulate_rejects_invalid_json() {
        use tempfile::tempdir;

        let dir = tempdir().unwrap();
        let json_file = dir.path().join("broken.json");
        std::fs::write(&json_file, "{\"float_averages\":").unwrap();

        let mut config = Config::default();
        config.tag.image_path = dir.path().join("tag.ndef").to_string_lossy().into_owned();
        assert!(emulate(&config, &json_file).await.is_err());
        assert!(!dir.path().join("tag.ndef").exists());
    }
}
