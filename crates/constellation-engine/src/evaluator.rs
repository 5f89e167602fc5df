//! Visibility & Link Evaluator
//!
//! Runs once per frame. Propagates every satellite, tests it against the
//! receiver's local horizon, scores the link and picks the best candidate.

use nalgebra::Vector3;
use orbital_mechanics::{link, propagation, transforms, CentralBody, SignalQuality};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::registry::{Satellite, SatelliteRegistry};
use crate::{EngineConfig, Result};

/// Speed of light in km/s
const LIGHT_SPEED_KM_S: f64 = 299_792.458;

/// Simulation units to km
const KM_PER_UNIT: f64 = 1000.0;

/// Receivers closer than this to the body center are treated as unplaced
const MIN_RECEIVER_NORM_SQUARED: f64 = 1.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SatelliteState {
    Failed,
    /// Carries the telemetry link
    Connected,
    /// Visible and healthy
    Available,
    /// Below the horizon
    Standby,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryRecord {
    pub id: String,
    pub state: SatelliteState,
    pub visible: bool,
    pub rssi: f64,
    pub snr: f64,
    pub distance_km: f64,
    pub altitude_km: f64,
    pub velocity_km_s: f64,
    pub latency_ms: f64,
    pub load_pct: u8,
    pub temperature: f64,
    pub reliability: f64,
    pub uptime_s: u64,
    pub failures: u32,
    pub score: f64,
}

/// Best link of the frame
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub rssi: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameEvaluation {
    pub time: f64,
    /// One record per satellite, registration order
    pub records: Vec<TelemetryRecord>,
    pub best: Option<Candidate>,
}

impl FrameEvaluation {
    pub fn record(&self, id: &str) -> Option<&TelemetryRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// RSSI of `id` this frame; zero when unknown
    pub fn rssi_of(&self, id: &str) -> f64 {
        self.record(id).map(|r| r.rssi).unwrap_or(0.0)
    }

    /// Re-classify healthy records after the telemetry link changed.
    pub fn mark_connected(&mut self, telemetry_id: Option<&str>) {
        for record in self.records.iter_mut() {
            record.state = classify(
                record.state == SatelliteState::Failed,
                telemetry_id == Some(record.id.as_str()),
                record.visible,
            );
        }
    }
}

fn classify(failed: bool, connected: bool, visible: bool) -> SatelliteState {
    if failed {
        SatelliteState::Failed
    } else if connected {
        SatelliteState::Connected
    } else if visible {
        SatelliteState::Available
    } else {
        SatelliteState::Standby
    }
}

/// True when the receiver position can be evaluated against.
pub fn receiver_is_valid(receiver: &Vector3<f64>) -> bool {
    receiver.iter().all(|c| c.is_finite()) && receiver.norm_squared() >= MIN_RECEIVER_NORM_SQUARED
}

#[derive(Debug, Clone)]
pub struct LinkEvaluator {
    body: CentralBody,
    visibility_threshold: f64,
}

impl LinkEvaluator {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self {
            body: config.body()?,
            visibility_threshold: config.visibility_threshold,
        })
    }

    /// Satellite is above the receiver's horizon (with margin).
    pub fn is_visible(&self, satellite: &Vector3<f64>, receiver: &Vector3<f64>) -> bool {
        transforms::direction_cosine(satellite, receiver)
            .map(|cos| cos > self.visibility_threshold)
            .unwrap_or(false)
    }

    /// Evaluate every satellite at `now`.
    ///
    /// Failed satellites report zero signal. The best candidate is the
    /// highest-RSSI visible healthy satellite; on equal RSSI the one registered
    /// first wins.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        registry: &SatelliteRegistry,
        telemetry_id: Option<&str>,
        receiver: &Vector3<f64>,
        now: f64,
        intensity: f64,
        rng: &mut R,
    ) -> FrameEvaluation {
        let mut records = Vec::with_capacity(registry.len());
        let mut best: Option<Candidate> = None;

        for sat in registry.iter() {
            let position = propagation::propagate(&sat.elements, now);
            let distance = (position - receiver).norm();
            let visible = self.is_visible(&position, receiver);

            let quality = if sat.is_failed() {
                SignalQuality::NONE
            } else {
                link::signal_quality(distance, intensity, rng)
            };

            let state = classify(sat.is_failed(), telemetry_id == Some(sat.id.as_str()), visible);

            if visible && !sat.is_failed() && best.as_ref().map_or(true, |b| quality.rssi > b.rssi) {
                best = Some(Candidate {
                    id: sat.id.clone(),
                    rssi: quality.rssi,
                });
            }

            records.push(self.record(sat, state, visible, distance, quality, now, rng));
        }

        FrameEvaluation {
            time: now,
            records,
            best,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn record<R: Rng + ?Sized>(
        &self,
        sat: &Satellite,
        state: SatelliteState,
        visible: bool,
        distance: f64,
        quality: SignalQuality,
        now: f64,
        rng: &mut R,
    ) -> TelemetryRecord {
        let failed = sat.is_failed();
        let distance_km = distance * KM_PER_UNIT;

        TelemetryRecord {
            id: sat.id.clone(),
            state,
            visible,
            rssi: quality.rssi,
            snr: quality.snr,
            distance_km,
            altitude_km: sat.elements.altitude * KM_PER_UNIT + rng.gen_range(0.0..2.0),
            velocity_km_s: propagation::orbital_velocity_km_s(&self.body, sat.elements.altitude),
            latency_ms: distance_km / LIGHT_SPEED_KM_S * 1000.0,
            load_pct: if failed { 0 } else { rng.gen_range(0..80) },
            temperature: sat.temperature,
            reliability: if failed { 0.0 } else { 0.8 + rng.gen_range(0.0..0.19) },
            uptime_s: now.max(0.0).floor() as u64,
            failures: u32::from(failed),
            score: quality.score(),
        }
    }
}
