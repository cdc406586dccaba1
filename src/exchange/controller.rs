//! # Tag Exchange Controller
//!
//! Runs single-shot NFC sessions: engage the tag technology, read or write
//! one NDEF message, release the technology, and hand decoded results to the
//! [`ScanObserver`].
//!
//! ## Session Discipline
//!
//! - At most one session holds the technology. Operations take `&mut self`,
//!   and a session whose future was dropped mid-flight is force-released
//!   before the next one acquires.
//! - Every `request_technology` call is paired with exactly one
//!   `release_technology` call. Release errors are swallowed.
//! - The confirmation cue plays once per successful read, never on failure.
//! - Only `CorruptPayload` reaches the user, as an alert asking to rescan.
//!   Other failures are logged.
//!
//! ## Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use feeder_link::exchange::controller::{ExchangeSettings, TagExchange};
//! use feeder_link::exchange::observer::{ScanObserver, TerminalBell};
//! use feeder_link::exchange::transport::FileTagTransport;
//! # fn observer() -> Box<dyn ScanObserver> { unimplemented!() }
//!
//! # async fn run() {
//! let transport = FileTagTransport::new("tag.ndef", Duration::from_millis(250));
//! let mut exchange = TagExchange::new(transport, observer(), Box::new(TerminalBell), ExchangeSettings::default());
//! let outcome = exchange.read_live().await;
//! println!("{:?}", outcome);
//! # }
//! ```

use std::io;

use tracing::{debug, error, info, warn};

use super::observer::{ConfirmationCue, ScanObserver};
use super::request::{FloatRangeRequest, RangeToken, DEFAULT_FIELD_ROOT};
use super::session::{SessionEvent, SessionState};
use super::transport::{classify_io_error, TagTransport};
use crate::error::{ErrorKind, FeederLinkError, Result};
use crate::ndef::decoder::decode_first_text;
use crate::ndef::encoder::encode_text_message;
use crate::telemetry::payload::{parse_json, TagPayload};
use crate::telemetry::reshape::{reshape_snapshot, GroupedSnapshot};
use crate::telemetry::series::{expand, CompactFloatSeries, FloatSampleSeries};
use crate::telemetry::snapshot::TelemetrySnapshot;

/// Alert title for undecodable tag data
pub const DATA_ERROR_TITLE: &str = "Data Error";

/// Alert message for undecodable tag data
pub const DATA_ERROR_MESSAGE: &str = "Received incomplete or corrupted data. Rescan HTTP data.";

/// Default language code of written text records
pub const DEFAULT_LANGUAGE: &str = "en";

/// Knobs of the exchange controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeSettings {
    /// Namespace prefix added to requested field names
    pub field_root: String,
    /// Language code of written text records
    pub language: String,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            field_root: DEFAULT_FIELD_ROOT.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Read decoded and delivered, or write committed
    Completed,
    /// Tag present but carried no NDEF message
    NoMessage,
    /// Session failed; already reported per policy
    Failed(ErrorKind),
}

/// Session counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExchangeStats {
    /// `request_technology` calls
    pub acquired: u64,
    /// `release_technology` calls
    pub released: u64,
    /// Successful reads
    pub reads: u64,
    /// Committed writes
    pub writes: u64,
    /// Failed sessions, cancellations included
    pub failures: u64,
}

/// Expected shape of a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadKind {
    /// Live telemetry sections
    Live,
    /// Compact float series
    FloatSeries,
    /// Whatever the payload turns out to be
    Auto,
}

/// Decoded result of a read
#[derive(Debug, Clone, PartialEq)]
pub enum Scan {
    Live(GroupedSnapshot),
    FloatSeries(FloatSampleSeries),
}

/// Decode raw tag bytes into a display-ready scan
///
/// # Errors
///
/// - `Ndef` / `CorruptPayload` if the message, its text or its JSON is malformed
/// - `InvalidFormat` if the JSON does not have the shape `kind` expects
pub fn decode_scan(message: &[u8], kind: ReadKind) -> Result<Scan> {
    let text = decode_first_text(message)?;
    debug!("Tag text ({} bytes): {}", text.len(), text);

    match kind {
        ReadKind::Live => {
            let value = parse_json(&text)?;
            let object = value.as_object().ok_or_else(|| {
                FeederLinkError::InvalidFormat("live telemetry must be a JSON object".to_string())
            })?;
            Ok(Scan::Live(reshape_snapshot(&TelemetrySnapshot::from_object(object))))
        }
        ReadKind::FloatSeries => {
            let compact = CompactFloatSeries::from_value(&parse_json(&text)?)?;
            Ok(Scan::FloatSeries(expand(&compact)?))
        }
        ReadKind::Auto => match TagPayload::parse(&text)? {
            TagPayload::Telemetry(snapshot) => Ok(Scan::Live(reshape_snapshot(&snapshot))),
            TagPayload::FloatSeries(compact) => Ok(Scan::FloatSeries(expand(&compact)?)),
            TagPayload::Unrecognized(_) => Err(FeederLinkError::InvalidFormat(
                "payload is neither telemetry nor a float series".to_string(),
            )),
        },
    }
}

/// NFC exchange controller owning all session state
pub struct TagExchange<T: TagTransport> {
    transport: T,
    observer: Box<dyn ScanObserver>,
    cue: Box<dyn ConfirmationCue>,
    settings: ExchangeSettings,
    state: SessionState,
    /// Technology requested and not yet released
    handle_open: bool,
    last_snapshot: Option<GroupedSnapshot>,
    last_series: Option<FloatSampleSeries>,
    stats: ExchangeStats,
}

impl<T: TagTransport> TagExchange<T> {
    pub fn new(
        transport: T,
        observer: Box<dyn ScanObserver>,
        cue: Box<dyn ConfirmationCue>,
        settings: ExchangeSettings,
    ) -> Self {
        Self {
            transport,
            observer,
            cue,
            settings,
            state: SessionState::Idle,
            handle_open: false,
            last_snapshot: None,
            last_series: None,
            stats: ExchangeStats::default(),
        }
    }

    /// Read live telemetry and deliver it through `on_live_scan`
    ///
    /// A JSON object without any known section is accepted; its sections
    /// are simply absent.
    pub async fn read_live(&mut self) -> SessionOutcome {
        self.read(ReadKind::Live).await
    }

    /// Read a compact float series and deliver it through `on_float_scan`
    pub async fn read_float_series(&mut self) -> SessionOutcome {
        self.read(ReadKind::FloatSeries).await
    }

    /// Read any known payload and deliver it through the matching callback
    pub async fn scan(&mut self) -> SessionOutcome {
        self.read(ReadKind::Auto).await
    }

    /// Write a float range request for `field` to the tag
    ///
    /// The graph title is set to the normalized field name before the
    /// session starts, whatever its outcome.
    pub async fn request_float_range(&mut self, field: &str, range: &RangeToken) -> SessionOutcome {
        let request = FloatRangeRequest::new(field, range, &self.settings.field_root);
        self.observer.set_graph_title(&request.field);
        info!("Requesting {} from {} to {}", request.field, request.start, request.stop);

        self.preempt_stale().await;
        self.observer.set_prompt_visible(true);
        self.transition(SessionEvent::WriteRequested);

        let outcome = match self.write_request(&request).await {
            Ok(()) => {
                info!("NFC write successful");
                self.stats.writes += 1;
                SessionOutcome::Completed
            }
            Err(e) => self.report_failure(e),
        };

        self.finish().await;
        outcome
    }

    /// Abandon a session left open by a dropped operation
    ///
    /// Does nothing when no session is open.
    pub async fn cancel(&mut self) {
        self.preempt_stale().await;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Display model of the last successful live scan
    pub fn last_snapshot(&self) -> Option<&GroupedSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Samples of the last successful float scan
    pub fn last_series(&self) -> Option<&FloatSampleSeries> {
        self.last_series.as_ref()
    }

    pub fn stats(&self) -> ExchangeStats {
        self.stats
    }

    pub fn settings(&self) -> &ExchangeSettings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn read(&mut self, kind: ReadKind) -> SessionOutcome {
        self.preempt_stale().await;
        self.observer.set_prompt_visible(true);
        self.transition(SessionEvent::ReadRequested);

        let outcome = match self.read_scan(kind).await {
            Ok(Some(scan)) => {
                self.cue.play();
                self.stats.reads += 1;
                self.deliver(scan);
                SessionOutcome::Completed
            }
            Ok(None) => SessionOutcome::NoMessage,
            Err(e) => self.report_failure(e),
        };

        self.finish().await;
        outcome
    }

    async fn read_scan(&mut self, read_kind: ReadKind) -> Result<Option<Scan>> {
        self.acquire().await?;

        let message = match self.transport.read_message().await {
            Ok(Some(message)) => message,
            Ok(None) => {
                info!("Tag carries no NDEF message");
                self.transition(SessionEvent::NoMessage);
                return Ok(None);
            }
            Err(e) => {
                let kind = classify_io_error(&e);
                self.transition(SessionEvent::PayloadRejected(kind));
                return Err(io_failure(kind, &e));
            }
        };
        debug!("Read {} byte NDEF message", message.len());

        match decode_scan(&message, read_kind) {
            Ok(scan) => {
                self.transition(SessionEvent::PayloadAccepted);
                Ok(Some(scan))
            }
            Err(e) => {
                let kind = e.kind().unwrap_or(ErrorKind::InvalidFormat);
                self.transition(SessionEvent::PayloadRejected(kind));
                Err(e)
            }
        }
    }

    async fn write_request(&mut self, request: &FloatRangeRequest) -> Result<()> {
        self.acquire().await?;

        let committed = match request.to_json() {
            Ok(json) => {
                debug!("Writing NFC payload: {}", json);
                let message = encode_text_message(&json, &self.settings.language);
                self.transport
                    .write_message(&message)
                    .await
                    .map_err(|e| e.to_string())
            }
            Err(e) => Err(e.to_string()),
        };

        match committed {
            Ok(()) => {
                self.transition(SessionEvent::WriteCommitted);
                Ok(())
            }
            Err(reason) => {
                self.transition(SessionEvent::WriteFailed);
                Err(FeederLinkError::WriteFailure(reason))
            }
        }
    }

    async fn acquire(&mut self) -> Result<()> {
        self.handle_open = true;
        self.stats.acquired += 1;

        match self.transport.request_technology().await {
            Ok(()) => {
                self.transition(SessionEvent::TagAcquired);
                Ok(())
            }
            Err(e) => {
                let kind = classify_io_error(&e);
                self.transition(SessionEvent::AcquireFailed(kind));
                Err(io_failure(kind, &e))
            }
        }
    }

    fn deliver(&mut self, scan: Scan) {
        match scan {
            Scan::Live(snapshot) => {
                if snapshot.dropped_keys > 0 {
                    warn!("Live scan dropped {} malformed key(s)", snapshot.dropped_keys);
                }
                self.observer.on_live_scan(&snapshot);
                self.last_snapshot = Some(snapshot);
            }
            Scan::FloatSeries(series) => {
                info!("Expanded {} float sample(s)", series.len());
                self.observer.on_float_scan(&series);
                self.observer.on_chart_data(&series.chart_points());
                self.last_series = Some(series);
            }
        }
    }

    fn report_failure(&mut self, error: FeederLinkError) -> SessionOutcome {
        let kind = error.kind().unwrap_or(ErrorKind::HardwareFailure);
        self.stats.failures += 1;

        match kind {
            ErrorKind::Cancelled => info!("NFC action cancelled by user"),
            ErrorKind::CorruptPayload => {
                error!("Failed to decode tag payload: {}", error);
                self.observer.alert(DATA_ERROR_TITLE, DATA_ERROR_MESSAGE);
            }
            ErrorKind::HardwareFailure | ErrorKind::InvalidFormat | ErrorKind::WriteFailure => {
                warn!("NFC session failed: {}", error)
            }
        }

        SessionOutcome::Failed(kind)
    }

    /// Hide the prompt and release the technology on every exit path
    async fn finish(&mut self) {
        self.observer.set_prompt_visible(false);
        if matches!(self.state, SessionState::Error(_)) {
            self.transition(SessionEvent::ReleaseStarted);
        }
        self.release().await;
        self.transition(SessionEvent::Released);
    }

    async fn preempt_stale(&mut self) {
        if !self.state.is_active() && !self.handle_open {
            return;
        }

        info!("Releasing stale NFC session in state {}", self.state);
        self.observer.set_prompt_visible(false);
        if self.state.is_active() {
            self.transition(SessionEvent::Preempted);
            self.transition(SessionEvent::ReleaseStarted);
        }
        self.release().await;
        if self.state == SessionState::Releasing {
            self.transition(SessionEvent::Released);
        }
    }

    /// Best-effort release; the handle counts as closed before the await
    /// so a session dropped mid-release is never released twice
    async fn release(&mut self) {
        if !self.handle_open {
            return;
        }
        self.handle_open = false;
        self.stats.released += 1;
        if let Err(e) = self.transport.release_technology().await {
            debug!("Ignoring release error: {}", e);
        }
    }

    fn transition(&mut self, event: SessionEvent) {
        match self.state.apply(event) {
            Ok(next) => {
                debug!("Session {} -> {} on {:?}", self.state, next, event);
                self.state = next;
            }
            Err(e) => error!("{}", e),
        }
    }
}

fn io_failure(kind: ErrorKind, error: &io::Error) -> FeederLinkError {
    match kind {
        ErrorKind::Cancelled => FeederLinkError::Cancelled,
        _ => FeederLinkError::HardwareFailure(error.to_string()),
    }
}
