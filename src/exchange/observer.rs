//! # Presentation Callbacks
//!
//! The narrow interface through which the exchange controller talks to
//! whatever renders its results.

use std::io::Write;

use tracing::warn;

use crate::telemetry::reshape::GroupedSnapshot;
use crate::telemetry::series::{ChartPoint, FloatSampleSeries};

/// Receives decoded scan results and session UI cues
pub trait ScanObserver: Send {
    /// A live telemetry scan completed
    fn on_live_scan(&mut self, snapshot: &GroupedSnapshot);

    /// A float series scan completed
    fn on_float_scan(&mut self, series: &FloatSampleSeries);

    /// Chart-ready projection of the last float series
    fn on_chart_data(&mut self, _points: &[ChartPoint]) {}

    /// Show or hide the "hold phone near tag" prompt
    fn set_prompt_visible(&mut self, visible: bool);

    /// Title of the graph a range request was made for
    fn set_graph_title(&mut self, title: &str);

    /// Modal alert shown to the user
    fn alert(&mut self, title: &str, message: &str);
}

/// Audible confirmation of a successful scan
pub trait ConfirmationCue: Send {
    fn play(&mut self);
}

/// Cue that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentCue;

impl ConfirmationCue for SilentCue {
    fn play(&mut self) {}
}

/// Cue that rings the terminal bell
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl ConfirmationCue for TerminalBell {
    fn play(&mut self) {
        let mut stdout = std::io::stdout();
        if let Err(e) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
            warn!("Confirmation cue failed: {}", e);
        }
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Everything an observer was told, in order
    #[derive(Debug, Clone, PartialEq)]
    pub enum ObserverCall {
        LiveScan(serde_json::Value),
        FloatScan(usize),
        ChartData(usize),
        PromptVisible(bool),
        GraphTitle(String),
        Alert(String, String),
    }

    /// Recording observer for testing
    #[derive(Clone, Default)]
    pub struct RecordingObserver {
        pub calls: Arc<Mutex<Vec<ObserverCall>>>,
        pub live: Arc<Mutex<Vec<GroupedSnapshot>>>,
        pub series: Arc<Mutex<Vec<FloatSampleSeries>>>,
    }

    impl RecordingObserver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<ObserverCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn live_scans(&self) -> Vec<GroupedSnapshot> {
            self.live.lock().unwrap().clone()
        }

        pub fn float_scans(&self) -> Vec<FloatSampleSeries> {
            self.series.lock().unwrap().clone()
        }

        pub fn alerts(&self) -> Vec<(String, String)> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    ObserverCall::Alert(title, message) => Some((title, message)),
                    _ => None,
                })
                .collect()
        }

        fn record(&self, call: ObserverCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl ScanObserver for RecordingObserver {
        fn on_live_scan(&mut self, snapshot: &GroupedSnapshot) {
            self.record(ObserverCall::LiveScan(serde_json::to_value(snapshot).unwrap()));
            self.live.lock().unwrap().push(snapshot.clone());
        }

        fn on_float_scan(&mut self, series: &FloatSampleSeries) {
            self.record(ObserverCall::FloatScan(series.len()));
            self.series.lock().unwrap().push(series.clone());
        }

        fn on_chart_data(&mut self, points: &[ChartPoint]) {
            self.record(ObserverCall::ChartData(points.len()));
        }

        fn set_prompt_visible(&mut self, visible: bool) {
            self.record(ObserverCall::PromptVisible(visible));
        }

        fn set_graph_title(&mut self, title: &str) {
            self.record(ObserverCall::GraphTitle(title.to_string()));
        }

        fn alert(&mut self, title: &str, message: &str) {
            self.record(ObserverCall::Alert(title.to_string(), message.to_string()));
        }
    }

    /// Cue that counts how often it played
    #[derive(Clone, Default)]
    pub struct CountingCue {
        pub plays: Arc<Mutex<usize>>,
    }

    impl CountingCue {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn plays(&self) -> usize {
            *self.plays.lock().unwrap()
        }
    }

    impl ConfirmationCue for CountingCue {
        fn play(&mut self) {
            *self.plays.lock().unwrap() += 1;
        }
    }
}
