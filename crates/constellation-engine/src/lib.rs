//! Constellation Link-Handover Engine
//!
//! Simulates one ground receiver watching a LEO constellation:
//! - Satellite registry with thermal and random failures
//! - Space-weather storms that degrade every link
//! - Per-frame visibility and link-quality evaluation
//! - Visual lock (instantaneous) vs. telemetry link (hysteresis-gated)
//! - Bounded alert log and rate-limited status snapshots
//!
//! Two drivers share one [`Simulation`]: the frame driver
//! ([`Simulation::on_frame`]) runs on a continuous clock, the tick driver
//! ([`Simulation::on_tick`]) on a fixed period. Both take `&mut self`, so every
//! update is a read-compute-commit on state with a single owner.

use thiserror::Error;

pub mod alerts;
pub mod config;
pub mod evaluator;
pub mod handover;
pub mod publisher;
pub mod registry;
pub mod simulation;
pub mod sink;
pub mod space_weather;

// Re-exports
pub use alerts::{AlertLevel, AlertLog, AlertRecord};
pub use config::EngineConfig;
pub use evaluator::{Candidate, FrameEvaluation, LinkEvaluator, SatelliteState, TelemetryRecord};
pub use handover::{HandoverDecision, HandoverPolicy, LinkState};
pub use publisher::{StatusPublisher, StatusSnapshot, TargetMetrics, WeatherState};
pub use registry::{HealthStatus, Satellite, SatelliteRegistry};
pub use simulation::Simulation;
pub use sink::{CollectingSink, NullSink, TelemetrySink, TracingSink};
pub use space_weather::{SpaceWeather, SpaceWeatherEvent};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Duplicate satellite id: {0}")]
    DuplicateSatellite(String),
    #[error(transparent)]
    Orbital(#[from] orbital_mechanics::OrbitalError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
