//! Engine configuration
//!
//! Fixed at construction. Defaults reproduce the reference constellation:
//! 20 LEO satellites, 15-point handover margin with a 5 time-unit hold-down,
//! thermal failure above 80 and a 50-entry alert log.

use orbital_mechanics::{CentralBody, EARTH_GM, EARTH_RADIUS};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of satellites generated at startup
    pub constellation_size: usize,
    pub body_radius: f64,
    pub gravitational_parameter: f64,
    /// Altitude range for generated satellites (simulation units)
    pub min_altitude: f64,
    pub max_altitude: f64,

    /// Minimum direction cosine between satellite and receiver
    pub visibility_threshold: f64,

    /// RSSI improvement required to migrate the telemetry link
    pub handover_margin: f64,
    /// Minimum simulation time between telemetry handovers
    pub hold_down: f64,

    pub initial_temperature: f64,
    /// Cooling never goes below this
    pub floor_temperature: f64,
    pub failure_temperature: f64,
    /// Per tick, applied to the visual-lock satellite
    pub heating_rate: f64,
    /// Per tick, applied to every other satellite
    pub cooling_rate: f64,
    /// Per-tick random failure probability of a healthy satellite
    pub failure_probability: f64,

    /// Per-tick storm probability while the sky is clear
    pub weather_probability: f64,
    pub weather_max_intensity: f64,
    /// Storm lifetime on the simulation clock
    pub weather_duration: f64,

    pub alert_capacity: usize,
    /// Minimum simulation time between status snapshots
    pub publish_interval: f64,

    /// RNG seed; `None` draws from OS entropy
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            constellation_size: 20,
            body_radius: EARTH_RADIUS,
            gravitational_parameter: EARTH_GM,
            min_altitude: 0.4,
            max_altitude: 2.0,
            visibility_threshold: 0.05,
            handover_margin: 15.0,
            hold_down: 5.0,
            initial_temperature: 50.0,
            floor_temperature: 25.0,
            failure_temperature: 80.0,
            heating_rate: 0.8,
            cooling_rate: 0.2,
            failure_probability: 0.005,
            weather_probability: 0.03,
            weather_max_intensity: 5.0,
            weather_duration: 8.0,
            alert_capacity: 50,
            publish_interval: 0.4,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn body(&self) -> Result<CentralBody> {
        Ok(CentralBody::new(self.body_radius, self.gravitational_parameter)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.body()?;

        if self.constellation_size == 0 {
            return invalid("constellation_size must be at least 1");
        }
        for (name, value) in [
            ("min_altitude", self.min_altitude),
            ("max_altitude", self.max_altitude),
            ("initial_temperature", self.initial_temperature),
            ("floor_temperature", self.floor_temperature),
            ("failure_temperature", self.failure_temperature),
        ] {
            if !value.is_finite() {
                return invalid(format!("{name} must be finite, got {value}"));
            }
        }
        if !(self.min_altitude >= 0.0 && self.min_altitude < self.max_altitude) {
            return invalid(format!(
                "altitude range [{}, {}) is empty or negative",
                self.min_altitude, self.max_altitude
            ));
        }
        if !(-1.0..1.0).contains(&self.visibility_threshold) {
            return invalid(format!("visibility_threshold {}", self.visibility_threshold));
        }
        for (name, value) in [
            ("handover_margin", self.handover_margin),
            ("hold_down", self.hold_down),
            ("heating_rate", self.heating_rate),
            ("cooling_rate", self.cooling_rate),
            ("weather_max_intensity", self.weather_max_intensity),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return invalid(format!("{name} must be a non-negative number, got {value}"));
            }
        }
        for (name, value) in [
            ("weather_duration", self.weather_duration),
            ("publish_interval", self.publish_interval),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return invalid(format!("{name} must be positive, got {value}"));
            }
        }
        for (name, p) in [
            ("failure_probability", self.failure_probability),
            ("weather_probability", self.weather_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return invalid(format!("{name} must be within [0, 1], got {p}"));
            }
        }
        if self.floor_temperature > self.initial_temperature
            || self.initial_temperature >= self.failure_temperature
        {
            return invalid(format!(
                "temperatures must satisfy floor <= initial < failure ({} / {} / {})",
                self.floor_temperature, self.initial_temperature, self.failure_temperature
            ));
        }
        if self.alert_capacity == 0 {
            return invalid("alert_capacity must be at least 1");
        }

        Ok(())
    }
}

fn invalid<T>(msg: impl Into<String>) -> Result<T> {
    Err(EngineError::InvalidConfig(msg.into()))
}
