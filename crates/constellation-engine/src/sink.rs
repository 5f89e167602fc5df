//! Output boundary toward the presentation layer.

use tracing::{debug, error, info, warn};

use crate::alerts::{AlertLevel, AlertRecord};
use crate::publisher::StatusSnapshot;

/// Receives alerts as they are emitted and snapshots as they are published.
///
/// Called synchronously from the drivers; implementations must not block.
pub trait TelemetrySink {
    fn on_alert(&mut self, alert: &AlertRecord);

    fn on_status(&mut self, snapshot: &StatusSnapshot);
}

impl<S: TelemetrySink + ?Sized> TelemetrySink for &mut S {
    fn on_alert(&mut self, alert: &AlertRecord) {
        (**self).on_alert(alert)
    }

    fn on_status(&mut self, snapshot: &StatusSnapshot) {
        (**self).on_status(snapshot)
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn on_alert(&mut self, _alert: &AlertRecord) {}

    fn on_status(&mut self, _snapshot: &StatusSnapshot) {}
}

/// Keeps everything in memory, in emission order
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    pub alerts: Vec<AlertRecord>,
    pub snapshots: Vec<StatusSnapshot>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts_at(&self, level: AlertLevel) -> impl Iterator<Item = &AlertRecord> {
        self.alerts.iter().filter(move |a| a.level == level)
    }

    pub fn latest_snapshot(&self) -> Option<&StatusSnapshot> {
        self.snapshots.last()
    }

    pub fn clear(&mut self) {
        self.alerts.clear();
        self.snapshots.clear();
    }
}

impl TelemetrySink for CollectingSink {
    fn on_alert(&mut self, alert: &AlertRecord) {
        self.alerts.push(alert.clone());
    }

    fn on_status(&mut self, snapshot: &StatusSnapshot) {
        self.snapshots.push(snapshot.clone());
    }
}

/// Logs alerts at a matching tracing level and snapshots at debug
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn on_alert(&mut self, alert: &AlertRecord) {
        match alert.level {
            AlertLevel::Status => debug!(target: "orbit_latch::alerts", "{}", alert),
            AlertLevel::Info => info!(target: "orbit_latch::alerts", "{}", alert),
            AlertLevel::Warning => warn!(target: "orbit_latch::alerts", "{}", alert),
            AlertLevel::Critical | AlertLevel::Danger => {
                error!(target: "orbit_latch::alerts", "{}", alert)
            }
        }
    }

    fn on_status(&mut self, snapshot: &StatusSnapshot) {
        debug!(
            target: "orbit_latch::status",
            t = snapshot.sim_time,
            telemetry = ?snapshot.telemetry_id,
            visual = ?snapshot.visual_id,
            rssi = snapshot.signal_quality,
            weather = ?snapshot.weather,
            active = snapshot.active_count,
            "status"
        );
    }
}
