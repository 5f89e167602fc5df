//! Satellite Registry
//!
//! Fixed set of satellites with thermal and random-failure health modeling.
//! Failure is terminal: a failed satellite is never reactivated.

use orbital_mechanics::{CentralBody, OrbitalElements};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::f64::consts::PI;
use tracing::warn;

use crate::alerts::AlertLevel;
use crate::{EngineConfig, EngineError, Result};

/// First generated id is `SAT-101`
const FIRST_SATELLITE_NUMBER: usize = 101;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Active,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Satellite {
    pub id: String,
    pub elements: OrbitalElements,
    pub temperature: f64,
    pub status: HealthStatus,
}

impl Satellite {
    pub fn new(id: impl Into<String>, elements: OrbitalElements, temperature: f64) -> Self {
        Self {
            id: id.into(),
            elements,
            temperature,
            status: HealthStatus::Active,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == HealthStatus::Failure
    }
}

/// Health transition raised during a tick
#[derive(Debug, Clone, PartialEq)]
pub struct HealthEvent {
    pub satellite_id: String,
    pub level: AlertLevel,
    pub message: String,
}

/// Health parameters pulled from [`EngineConfig`]
#[derive(Debug, Clone, Copy)]
pub struct ThermalModel {
    pub heating_rate: f64,
    pub cooling_rate: f64,
    pub floor_temperature: f64,
    pub failure_temperature: f64,
    pub failure_probability: f64,
}

impl From<&EngineConfig> for ThermalModel {
    fn from(config: &EngineConfig) -> Self {
        Self {
            heating_rate: config.heating_rate,
            cooling_rate: config.cooling_rate,
            floor_temperature: config.floor_temperature,
            failure_temperature: config.failure_temperature,
            failure_probability: config.failure_probability,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SatelliteRegistry {
    satellites: Vec<Satellite>,
}

impl SatelliteRegistry {
    /// Registry over an explicit satellite list; registration order is kept.
    pub fn new(satellites: Vec<Satellite>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(satellites.len());
        for sat in &satellites {
            if !seen.insert(sat.id.as_str()) {
                return Err(EngineError::DuplicateSatellite(sat.id.clone()));
            }
        }
        Ok(Self { satellites })
    }

    /// Random constellation drawn from the configured altitude range.
    pub fn generate<R: Rng + ?Sized>(config: &EngineConfig, rng: &mut R) -> Result<Self> {
        let body = config.body()?;
        let satellites = (0..config.constellation_size)
            .map(|i| {
                let elements = random_elements(&body, config, rng)?;
                Ok(Satellite::new(
                    format!("SAT-{}", i + FIRST_SATELLITE_NUMBER),
                    elements,
                    config.initial_temperature,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(satellites)
    }

    pub fn get(&self, id: &str) -> Option<&Satellite> {
        self.satellites.iter().find(|s| s.id == id)
    }

    /// All satellites in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Satellite> {
        self.satellites.iter()
    }

    pub fn operational(&self) -> impl Iterator<Item = &Satellite> {
        self.satellites.iter().filter(|s| !s.is_failed())
    }

    pub fn len(&self) -> usize {
        self.satellites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.satellites.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.operational().count()
    }

    /// Advance health by one tick.
    ///
    /// The visual-lock satellite heats, everything else cools to the floor.
    /// Crossing the failure temperature or losing the per-tick failure roll
    /// moves a satellite to [`HealthStatus::Failure`]. The next satellite list
    /// is built in full and then committed.
    pub fn tick_health<R: Rng + ?Sized>(
        &mut self,
        visual_id: Option<&str>,
        model: &ThermalModel,
        rng: &mut R,
    ) -> Vec<HealthEvent> {
        let mut events = Vec::new();

        let next: Vec<Satellite> = self
            .satellites
            .iter()
            .map(|sat| {
                let mut next = sat.clone();
                next.temperature = if visual_id == Some(sat.id.as_str()) {
                    sat.temperature + model.heating_rate
                } else {
                    (sat.temperature - model.cooling_rate).max(model.floor_temperature)
                };

                if sat.is_failed() {
                    return next;
                }

                if next.temperature > model.failure_temperature {
                    next.status = HealthStatus::Failure;
                    warn!(satellite = %sat.id, temperature = next.temperature, "thermal overload");
                    events.push(HealthEvent {
                        satellite_id: sat.id.clone(),
                        level: AlertLevel::Critical,
                        message: format!("Thermal overload detected ({})", sat.id),
                    });
                } else if rng.gen_bool(model.failure_probability) {
                    next.status = HealthStatus::Failure;
                    warn!(satellite = %sat.id, "random hardware failure");
                    events.push(HealthEvent {
                        satellite_id: sat.id.clone(),
                        level: AlertLevel::Critical,
                        message: format!("Satellite failure occurred ({})", sat.id),
                    });
                }

                next
            })
            .collect();

        self.satellites = next;
        events
    }
}

fn random_elements<R: Rng + ?Sized>(
    body: &CentralBody,
    config: &EngineConfig,
    rng: &mut R,
) -> Result<OrbitalElements> {
    let altitude = rng.gen_range(config.min_altitude..config.max_altitude);
    let inclination = rng.gen_range(-90.0f64..90.0).to_radians();
    let raan = rng.gen_range(0.0..2.0 * PI);
    let phase = rng.gen_range(0.0..2.0 * PI);

    Ok(OrbitalElements::new(body, altitude, inclination, raan, phase)?)
}
