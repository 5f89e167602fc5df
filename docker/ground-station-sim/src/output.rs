// Runner outputs
// Fans every alert and snapshot out to tracing, stdout JSON lines, the alert
// log file and the NATS publisher task.

use chrono::{DateTime, Utc};
use constellation_engine::{AlertRecord, StatusSnapshot, TelemetrySink, TracingSink};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::Path;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;
use uuid::Uuid;

/// Message handed to the NATS publisher task
#[derive(Debug, Clone)]
pub struct Outbound {
    pub subject: String,
    pub payload: Vec<u8>,
}

/// Wire envelope (JSON lines and NATS payloads)
#[derive(Debug, Serialize)]
struct Envelope<'a, T: Serialize> {
    run_id: Uuid,
    site: &'a str,
    kind: &'static str,
    emitted_at: DateTime<Utc>,
    payload: &'a T,
}

pub struct RunnerSink {
    site: String,
    run_id: Uuid,
    json: bool,
    alert_log: Option<LineWriter<File>>,
    nats: Option<UnboundedSender<Outbound>>,
    tracing: TracingSink,
}

impl RunnerSink {
    pub fn new(site: impl Into<String>, run_id: Uuid, json: bool) -> Self {
        Self {
            site: site.into(),
            run_id,
            json,
            alert_log: None,
            nats: None,
            tracing: TracingSink,
        }
    }

    /// Append alerts to `path` as `[0012s] INFO       message` lines.
    pub fn with_alert_log(mut self, path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        self.alert_log = Some(LineWriter::new(file));
        Ok(self)
    }

    pub fn with_nats(mut self, tx: UnboundedSender<Outbound>) -> Self {
        self.nats = Some(tx);
        self
    }

    pub fn alerts_subject(&self) -> String {
        format!("orbit_latch.{}.alerts", self.site)
    }

    pub fn status_subject(&self) -> String {
        format!("orbit_latch.{}.status", self.site)
    }

    fn encode<T: Serialize>(&self, kind: &'static str, payload: &T) -> Option<Vec<u8>> {
        let envelope = Envelope {
            run_id: self.run_id,
            site: &self.site,
            kind,
            emitted_at: Utc::now(),
            payload,
        };
        match serde_json::to_vec(&envelope) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Failed to encode {}: {}", kind, e);
                None
            }
        }
    }

    fn forward(&mut self, subject: String, bytes: Vec<u8>) {
        if self.json {
            let mut stdout = std::io::stdout().lock();
            if stdout
                .write_all(&bytes)
                .and_then(|_| stdout.write_all(b"\n"))
                .is_err()
            {
                warn!("stdout closed, disabling JSON output");
                self.json = false;
            }
        }

        if let Some(tx) = &self.nats {
            if tx.send(Outbound { subject, payload: bytes }).is_err() {
                warn!("NATS publisher stopped, disabling publishing");
                self.nats = None;
            }
        }
    }
}

impl TelemetrySink for RunnerSink {
    fn on_alert(&mut self, alert: &AlertRecord) {
        self.tracing.on_alert(alert);

        if let Some(log) = self.alert_log.as_mut() {
            if let Err(e) = writeln!(log, "{}", alert) {
                warn!("Failed to write alert log: {}", e);
                self.alert_log = None;
            }
        }

        if !self.json && self.nats.is_none() {
            return;
        }
        if let Some(bytes) = self.encode("alert", alert) {
            let subject = self.alerts_subject();
            self.forward(subject, bytes);
        }
    }

    fn on_status(&mut self, snapshot: &StatusSnapshot) {
        self.tracing.on_status(snapshot);

        if !self.json && self.nats.is_none() {
            return;
        }
        if let Some(bytes) = self.encode("status", snapshot) {
            let subject = self.status_subject();
            self.forward(subject, bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use constellation_engine::AlertLevel;
    use tokio::sync::mpsc;

    #[test]
    fn test_subjects_use_site() {
        let sink = RunnerSink::new("GS-019", Uuid::new_v4(), false);
        assert_eq!(sink.alerts_subject(), "orbit_latch.GS-019.alerts");
        assert_eq!(sink.status_subject(), "orbit_latch.GS-019.status");
    }

    #[test]
    fn test_alerts_forwarded_as_envelopes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let run_id = Uuid::new_v4();
        let mut sink = RunnerSink::new("GS-000", run_id, false).with_nats(tx);

        sink.on_alert(&AlertRecord::new(AlertLevel::Critical, "Thermal overload detected (SAT-104)", 12.3));

        let out = rx.try_recv().unwrap();
        assert_eq!(out.subject, "orbit_latch.GS-000.alerts");

        let json: serde_json::Value = serde_json::from_slice(&out.payload).unwrap();
        assert_eq!(json["kind"], "alert");
        assert_eq!(json["run_id"], run_id.to_string());
        assert_eq!(json["payload"]["level"], "CRITICAL");
        assert_eq!(json["payload"]["message"], "Thermal overload detected (SAT-104)");
    }

    #[test]
    fn test_closed_channel_disables_nats() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut sink = RunnerSink::new("GS-000", Uuid::new_v4(), false).with_nats(tx);

        sink.on_alert(&AlertRecord::new(AlertLevel::Info, "x", 0.0));
        assert!(sink.nats.is_none());
    }

    #[test]
    fn test_alert_log_lines() {
        let path = std::env::temp_dir().join(format!("orbit-latch-alerts-{}.log", Uuid::new_v4()));
        let mut sink = RunnerSink::new("GS-000", Uuid::new_v4(), false)
            .with_alert_log(&path)
            .unwrap();

        sink.on_alert(&AlertRecord::new(AlertLevel::Warning, "No satellite available (lost SAT-101)", 7.9));
        drop(sink);

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(text, "[0007s] WARNING    No satellite available (lost SAT-101)\n");
    }
}
