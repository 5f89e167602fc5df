//! Status Publisher
//!
//! Aggregates link identities, weather and the frame's telemetry table into a
//! [`StatusSnapshot`], at most once per publish interval of simulation time.

use serde::{Deserialize, Serialize};

use crate::evaluator::{FrameEvaluation, TelemetryRecord};
use crate::handover::LinkState;
use crate::registry::SatelliteRegistry;
use crate::space_weather::SpaceWeather;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeatherState {
    Clear,
    Storm,
}

/// Headline metrics of the telemetry link
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TargetMetrics {
    pub altitude_km: f64,
    pub velocity_km_s: f64,
    pub latency_ms: f64,
    pub distance_km: f64,
}

impl From<&TelemetryRecord> for TargetMetrics {
    fn from(record: &TelemetryRecord) -> Self {
        Self {
            altitude_km: record.altitude_km,
            velocity_km_s: record.velocity_km_s,
            latency_ms: record.latency_ms,
            distance_km: record.distance_km,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusSnapshot {
    pub sim_time: f64,
    pub telemetry_id: Option<String>,
    pub visual_id: Option<String>,
    /// Best candidate this frame
    pub next_id: Option<String>,
    /// RSSI of the telemetry link, zero when unlinked
    pub signal_quality: f64,
    pub weather: WeatherState,
    pub weather_intensity: f64,
    pub satellite_count: usize,
    pub active_count: usize,
    pub target: Option<TargetMetrics>,
    pub telemetry: Vec<TelemetryRecord>,
}

impl StatusSnapshot {
    pub fn build(
        frame: &FrameEvaluation,
        link: &LinkState,
        weather: &SpaceWeather,
        registry: &SatelliteRegistry,
    ) -> Self {
        let target_record = link.telemetry_id.as_deref().and_then(|id| frame.record(id));
        let intensity = weather.intensity(frame.time);

        Self {
            sim_time: frame.time,
            telemetry_id: link.telemetry_id.clone(),
            visual_id: link.visual_id.clone(),
            next_id: frame.best.as_ref().map(|c| c.id.clone()),
            signal_quality: target_record.map(|r| r.rssi).unwrap_or(0.0),
            weather: if weather.is_active(frame.time) {
                WeatherState::Storm
            } else {
                WeatherState::Clear
            },
            weather_intensity: intensity,
            satellite_count: registry.len(),
            active_count: registry.active_count(),
            target: target_record.map(TargetMetrics::from),
            telemetry: frame.records.clone(),
        }
    }
}

/// Rate limiter on the simulation clock
#[derive(Debug, Clone)]
pub struct StatusPublisher {
    interval: f64,
    last_publish: Option<f64>,
}

impl StatusPublisher {
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            last_publish: None,
        }
    }

    /// Claims a publish slot at `now`; the first call always succeeds.
    pub fn try_claim(&mut self, now: f64) -> bool {
        let due = self
            .last_publish
            .map_or(true, |last| now - last > self.interval);
        if due {
            self.last_publish = Some(now);
        }
        due
    }

    pub fn last_publish(&self) -> Option<f64> {
        self.last_publish
    }
}
