//! Space Weather Generator
//!
//! At most one storm is live at a time. A storm starts with a small per-tick
//! probability and expires a fixed duration later on the simulation clock.
//! The frame driver and the tick driver read the same clock, so expiry is
//! deterministic for a given sequence of clock values.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::EngineConfig;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SpaceWeatherEvent {
    pub intensity: f64,
    pub started_at: f64,
    pub expires_at: f64,
}

impl SpaceWeatherEvent {
    pub fn is_live(&self, now: f64) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct SpaceWeather {
    event: Option<SpaceWeatherEvent>,
    probability: f64,
    max_intensity: f64,
    duration: f64,
}

impl SpaceWeather {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            event: None,
            probability: config.weather_probability,
            max_intensity: config.weather_max_intensity,
            duration: config.weather_duration,
        }
    }

    /// Live event at `now`, if any
    pub fn current(&self, now: f64) -> Option<&SpaceWeatherEvent> {
        self.event.as_ref().filter(|e| e.is_live(now))
    }

    pub fn is_active(&self, now: f64) -> bool {
        self.current(now).is_some()
    }

    /// Disturbance fed into every link; zero under a clear sky
    pub fn intensity(&self, now: f64) -> f64 {
        self.current(now).map(|e| e.intensity).unwrap_or(0.0)
    }

    /// Tick-driver step: retire an expired storm, then roll for a new one.
    ///
    /// Returns the new event when one starts.
    pub fn tick<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) -> Option<SpaceWeatherEvent> {
        self.expire(now);

        if self.event.is_some() || !rng.gen_bool(self.probability) {
            return None;
        }

        let intensity = if self.max_intensity > 0.0 {
            rng.gen_range(0.0..self.max_intensity)
        } else {
            0.0
        };
        self.start(now, intensity)
    }

    /// Start a storm with a given intensity unless one is already live.
    ///
    /// Non-finite intensities are refused.
    pub fn start(&mut self, now: f64, intensity: f64) -> Option<SpaceWeatherEvent> {
        self.expire(now);
        if self.event.is_some() {
            return None;
        }
        if !intensity.is_finite() {
            warn!(intensity, "refusing non-finite storm intensity");
            return None;
        }

        let event = SpaceWeatherEvent {
            intensity: intensity.max(0.0),
            started_at: now,
            expires_at: now + self.duration,
        };
        info!(intensity = event.intensity, until = event.expires_at, "solar storm started");
        self.event = Some(event);
        Some(event)
    }

    fn expire(&mut self, now: f64) {
        if let Some(event) = self.event.filter(|e| !e.is_live(now)) {
            info!(started_at = event.started_at, "solar storm subsided");
            self.event = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn certain_storms() -> SpaceWeather {
        SpaceWeather::new(&EngineConfig {
            weather_probability: 1.0,
            ..Default::default()
        })
    }

    #[test]
    fn test_clear_sky_by_default() {
        let weather = SpaceWeather::new(&EngineConfig::default());
        assert!(!weather.is_active(0.0));
        assert_eq!(weather.intensity(0.0), 0.0);
    }

    #[test]
    fn test_storm_intensity_in_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut weather = certain_storms();

        let event = weather.tick(1.0, &mut rng).expect("storm");
        assert!((0.0..5.0).contains(&event.intensity));
        assert_eq!(weather.intensity(1.5), event.intensity);
    }

    #[test]
    fn test_only_one_storm_at_a_time() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut weather = certain_storms();

        let first = weather.tick(0.0, &mut rng).unwrap();
        for t in 1..8 {
            assert!(weather.tick(t as f64, &mut rng).is_none());
        }
        assert_eq!(weather.current(7.0), Some(&first));
        assert!(weather.start(7.5, 4.0).is_none());
    }

    #[test]
    fn test_expiry_follows_simulation_clock() {
        let mut weather = SpaceWeather::new(&EngineConfig::default());
        weather.start(10.0, 2.0).unwrap();

        // Frames read it live right up to the deadline, regardless of ticks
        assert!(weather.is_active(17.999));
        assert_eq!(weather.intensity(17.999), 2.0);
        assert!(!weather.is_active(18.0));
        assert_eq!(weather.intensity(18.0), 0.0);
    }

    #[test]
    fn test_non_finite_intensity_refused() {
        let mut weather = SpaceWeather::new(&EngineConfig::default());
        assert!(weather.start(1.0, f64::INFINITY).is_none());
        assert!(weather.start(1.0, f64::NAN).is_none());
        assert!(!weather.is_active(1.0));
        assert!(weather.start(1.0, 4.0).is_some());
    }

    #[test]
    fn test_new_storm_after_expiry() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut weather = certain_storms();

        weather.tick(0.0, &mut rng).unwrap();
        let second = weather.tick(8.0, &mut rng).expect("second storm once the first expired");
        assert_eq!(second.started_at, 8.0);
    }
}
