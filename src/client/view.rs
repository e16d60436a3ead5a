//! Client view state.
//!
//! Holds the latest received telemetry and the display rules: the map
//! centers exactly once on the first valid fix, later fixes move the
//! marker in place so user pan/zoom survives, and absent values render a
//! placeholder rather than a fake zero.

use crate::nmea::FixQuality;
use crate::streaming::messages::{GnssReport, ImuReport, OutboundMessage};

/// What the map should do with a received fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkerAction {
    /// Nothing to draw (invalid fix or no position)
    None,
    /// First valid fix: place the marker and center the view
    Center { lat: f64, lon: f64 },
    /// Move the marker without recentering
    Move { lat: f64, lon: f64 },
}

/// Placeholder for absent values.
const PLACEHOLDER: &str = "--";

/// Latest telemetry plus display state for one viewer.
#[derive(Debug, Default)]
pub struct ViewState {
    gnss: Option<GnssReport>,
    imu: Option<ImuReport>,
    stale: bool,
    centered_on_fix: bool,
    messages: u64,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one inbound message and decide the marker action.
    pub fn update(&mut self, msg: &OutboundMessage) -> MarkerAction {
        self.messages += 1;
        match msg {
            OutboundMessage::Imu(report) => {
                self.imu = Some(report.clone());
                MarkerAction::None
            }
            OutboundMessage::Gnss(report) => {
                let action = self.marker_action(report);
                self.gnss = Some(report.clone());
                action
            }
        }
    }

    /// An invalid or positionless fix never updates the marker, and only
    /// the first valid fix centers the view.
    fn marker_action(&mut self, report: &GnssReport) -> MarkerAction {
        let quality = FixQuality::from(report.fix_quality);
        let (Some(lat), Some(lon)) = (report.lat, report.lon) else {
            return MarkerAction::None;
        };
        if !quality.is_fix() {
            return MarkerAction::None;
        }

        if self.centered_on_fix {
            MarkerAction::Move { lat, lon }
        } else {
            self.centered_on_fix = true;
            MarkerAction::Center { lat, lon }
        }
    }

    pub fn set_stale(&mut self, stale: bool) {
        self.stale = stale;
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn messages_received(&self) -> u64 {
        self.messages
    }

    pub fn latest_gnss(&self) -> Option<&GnssReport> {
        self.gnss.as_ref()
    }

    pub fn latest_imu(&self) -> Option<&ImuReport> {
        self.imu.as_ref()
    }

    /// Fix quality as "<code> - <label>", e.g. "4 - RTK Fixed".
    pub fn fix_quality_label(&self) -> String {
        match &self.gnss {
            Some(r) => {
                let quality = FixQuality::from(r.fix_quality);
                format!("{} - {}", r.fix_quality, quality.label())
            }
            None => PLACEHOLDER.to_string(),
        }
    }

    /// One-line status rendering for the terminal monitor.
    pub fn status_line(&self) -> String {
        let mut line = format!(
            "fix: {} | lat: {} | lon: {} | alt: {} | sats: {} | hdop: {}",
            self.fix_quality_label(),
            fmt_opt(self.gnss.as_ref().and_then(|g| g.lat), 6),
            fmt_opt(self.gnss.as_ref().and_then(|g| g.lon), 6),
            fmt_opt(self.gnss.as_ref().and_then(|g| g.alt), 1),
            self.gnss
                .as_ref()
                .and_then(|g| g.num_satellites)
                .map_or(PLACEHOLDER.to_string(), |n| n.to_string()),
            fmt_opt(self.gnss.as_ref().and_then(|g| g.hdop), 1),
        );

        // Velocity is hidden entirely without a valid VTG; rendering a
        // zero would claim a measurement that was never made
        if let Some(g) = &self.gnss {
            if g.vtg_valid {
                line.push_str(&format!(
                    " | speed: {} m/s | track: {}",
                    fmt_opt(g.speed_ms, 2),
                    fmt_opt(g.track_degrees, 1)
                ));
            }
        }

        if self.stale {
            line.push_str(" [STALE]");
        }
        line
    }
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => PLACEHOLDER.to_string(),
    }
}
