//! Simulation coordinator
//!
//! Owns every piece of mutable simulation state. The frame driver and the
//! tick driver borrow it exclusively in turn, so there is never more than one
//! writer and each step reads, computes, then commits.

use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::alerts::{AlertLevel, AlertLog, AlertRecord};
use crate::evaluator::{receiver_is_valid, FrameEvaluation, LinkEvaluator};
use crate::handover::{HandoverDecision, HandoverPolicy, LinkState};
use crate::publisher::{StatusPublisher, StatusSnapshot};
use crate::registry::{Satellite, SatelliteRegistry, ThermalModel};
use crate::sink::TelemetrySink;
use crate::space_weather::SpaceWeather;
use crate::{EngineConfig, Result};

pub struct Simulation {
    config: EngineConfig,
    registry: SatelliteRegistry,
    weather: SpaceWeather,
    link: LinkState,
    policy: HandoverPolicy,
    thermal: ThermalModel,
    evaluator: LinkEvaluator,
    alerts: AlertLog,
    publisher: StatusPublisher,
    last_frame: Option<FrameEvaluation>,
    ticks: u64,
    rng: StdRng,
}

impl Simulation {
    /// Random constellation of `config.constellation_size` satellites.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = seeded_rng(config.seed);
        let registry = SatelliteRegistry::generate(&config, &mut rng)?;
        Self::assemble(config, registry, rng)
    }

    /// Explicit constellation; `config.constellation_size` is ignored.
    pub fn with_satellites(config: EngineConfig, satellites: Vec<Satellite>) -> Result<Self> {
        let config = EngineConfig {
            constellation_size: satellites.len().max(1),
            ..config
        };
        config.validate()?;
        let rng = seeded_rng(config.seed);
        let registry = SatelliteRegistry::new(satellites)?;
        Self::assemble(config, registry, rng)
    }

    fn assemble(config: EngineConfig, registry: SatelliteRegistry, rng: StdRng) -> Result<Self> {
        info!(
            satellites = registry.len(),
            seed = ?config.seed,
            "constellation initialized"
        );

        Ok(Self {
            weather: SpaceWeather::new(&config),
            policy: HandoverPolicy::from(&config),
            thermal: ThermalModel::from(&config),
            evaluator: LinkEvaluator::new(&config)?,
            alerts: AlertLog::new(config.alert_capacity),
            publisher: StatusPublisher::new(config.publish_interval),
            link: LinkState::default(),
            last_frame: None,
            ticks: 0,
            registry,
            config,
            rng,
        })
    }

    /// Frame driver: evaluate links, run the handover state machine and
    /// publish a snapshot when the rate limit allows.
    ///
    /// Returns `None` when the receiver position is unusable; nothing is
    /// changed in that case.
    pub fn on_frame<S: TelemetrySink + ?Sized>(
        &mut self,
        now: f64,
        receiver: &Vector3<f64>,
        sink: &mut S,
    ) -> Option<HandoverDecision> {
        if !receiver_is_valid(receiver) {
            debug!(t = now, "receiver position not usable, skipping frame");
            return None;
        }

        let intensity = self.weather.intensity(now);
        let mut frame = self.evaluator.evaluate(
            &self.registry,
            self.link.telemetry_id.as_deref(),
            receiver,
            now,
            intensity,
            &mut self.rng,
        );

        let current_quality = self
            .link
            .telemetry_id
            .as_deref()
            .map(|id| frame.rssi_of(id))
            .unwrap_or(0.0);

        let (next, decision) =
            self.link
                .advance(now, frame.best.as_ref(), current_quality, &self.policy);

        if next.visual_id != self.link.visual_id {
            debug!(t = now, from = ?self.link.visual_id, to = ?next.visual_id, "visual lock moved");
        }
        match &decision {
            HandoverDecision::Connected { to } => info!(t = now, satellite = %to, "telemetry link up"),
            HandoverDecision::Handover { from, to } => info!(
                t = now,
                from = %from,
                to = %to,
                previous_rssi = current_quality,
                "telemetry handover"
            ),
            HandoverDecision::Lost { from } => warn!(t = now, satellite = %from, "telemetry link lost"),
            HandoverDecision::Idle | HandoverDecision::Hold { .. } => {}
        }

        self.link = next;
        if decision.changed_link() {
            frame.mark_connected(self.link.telemetry_id.as_deref());
        }

        if let Some((level, message)) = decision.alert() {
            self.emit(level, message, now, sink);
        }

        if self.publisher.try_claim(now) {
            let snapshot = StatusSnapshot::build(&frame, &self.link, &self.weather, &self.registry);
            sink.on_status(&snapshot);
        }

        self.last_frame = Some(frame);
        Some(decision)
    }

    /// Tick driver: space weather, satellite health, heartbeat.
    pub fn on_tick<S: TelemetrySink + ?Sized>(&mut self, now: f64, sink: &mut S) {
        self.ticks += 1;

        if let Some(event) = self.weather.tick(now, &mut self.rng) {
            self.emit(
                AlertLevel::Danger,
                format!(
                    "Solar storm detected - SNR degrading (intensity {:.2})",
                    event.intensity
                ),
                now,
                sink,
            );
        }

        let events = self.registry.tick_health(
            self.link.visual_id.as_deref(),
            &self.thermal,
            &mut self.rng,
        );
        for event in events {
            self.emit(event.level, event.message, now, sink);
        }

        let heartbeat = match self.link.telemetry_id.as_deref() {
            Some(id) => format!("Heartbeat: LINK_ACTIVE ({id})"),
            None => "Heartbeat: LINK_OFFLINE".to_string(),
        };
        self.emit(AlertLevel::Status, heartbeat, now, sink);
    }

    /// Operator-triggered storm. Returns `false` if one is already live or
    /// the intensity is not finite.
    pub fn inject_space_weather<S: TelemetrySink + ?Sized>(
        &mut self,
        now: f64,
        intensity: f64,
        sink: &mut S,
    ) -> bool {
        match self.weather.start(now, intensity) {
            Some(event) => {
                self.emit(
                    AlertLevel::Danger,
                    format!(
                        "Solar storm injected - SNR degrading (intensity {:.2})",
                        event.intensity
                    ),
                    now,
                    sink,
                );
                true
            }
            None => false,
        }
    }

    /// Unthrottled snapshot of the last evaluated frame
    pub fn snapshot(&self) -> Option<StatusSnapshot> {
        self.last_frame
            .as_ref()
            .map(|frame| StatusSnapshot::build(frame, &self.link, &self.weather, &self.registry))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &SatelliteRegistry {
        &self.registry
    }

    pub fn link(&self) -> &LinkState {
        &self.link
    }

    pub fn weather(&self) -> &SpaceWeather {
        &self.weather
    }

    pub fn alerts(&self) -> &AlertLog {
        &self.alerts
    }

    pub fn last_frame(&self) -> Option<&FrameEvaluation> {
        self.last_frame.as_ref()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    fn emit<S: TelemetrySink + ?Sized>(
        &mut self,
        level: AlertLevel,
        message: impl Into<String>,
        now: f64,
        sink: &mut S,
    ) {
        let record = AlertRecord::new(level, message, now);
        sink.on_alert(&record);
        self.alerts.push(record);
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{CollectingSink, NullSink};

    fn quiet_config() -> EngineConfig {
        EngineConfig {
            failure_probability: 0.0,
            weather_probability: 0.0,
            seed: Some(42),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_simulation_builds() {
        let sim = Simulation::new(EngineConfig {
            seed: Some(1),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(sim.registry().len(), 20);
        assert!(!sim.link().is_linked());
        assert!(sim.alerts().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Simulation::new(EngineConfig {
            alert_capacity: 0,
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_unbounded_altitude_is_an_error() {
        let result = Simulation::new(EngineConfig {
            max_altitude: f64::INFINITY,
            ..quiet_config()
        });
        assert!(matches!(result, Err(crate::EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_degenerate_receiver_skips_frame() {
        let mut sim = Simulation::new(quiet_config()).unwrap();
        let mut sink = CollectingSink::new();

        assert!(sim.on_frame(1.0, &Vector3::zeros(), &mut sink).is_none());
        assert!(sim
            .on_frame(1.0, &Vector3::new(f64::NAN, 0.0, 0.0), &mut sink)
            .is_none());

        assert!(sim.last_frame().is_none());
        assert!(sink.alerts.is_empty());
        assert!(sink.snapshots.is_empty());
    }

    #[test]
    fn test_heartbeat_every_tick() {
        let mut sim = Simulation::new(quiet_config()).unwrap();
        let mut sink = CollectingSink::new();

        for t in 1..=3 {
            sim.on_tick(t as f64, &mut sink);
        }

        let beats: Vec<_> = sink.alerts_at(AlertLevel::Status).collect();
        assert_eq!(beats.len(), 3);
        assert_eq!(beats[0].message, "Heartbeat: LINK_OFFLINE");
        assert_eq!(sim.ticks(), 3);
    }

    #[test]
    fn test_injected_storm_is_exclusive() {
        let mut sim = Simulation::new(quiet_config()).unwrap();
        let mut sink = CollectingSink::new();

        assert!(sim.inject_space_weather(2.0, 3.0, &mut sink));
        assert!(!sim.inject_space_weather(3.0, 1.0, &mut sink));
        assert_eq!(sink.alerts_at(AlertLevel::Danger).count(), 1);
        assert_eq!(sim.weather().intensity(9.9), 3.0);
        assert_eq!(sim.weather().intensity(10.0), 0.0);
    }

    #[test]
    fn test_injected_infinite_storm_refused() {
        let mut sim = Simulation::new(quiet_config()).unwrap();
        let mut sink = CollectingSink::new();

        assert!(!sim.inject_space_weather(0.0, f64::INFINITY, &mut sink));
        assert!(!sim.weather().is_active(0.0));
        assert!(sink.alerts.is_empty());
    }

    #[test]
    fn test_alert_log_mirrors_sink() {
        let mut sim = Simulation::new(quiet_config()).unwrap();
        let mut sink = CollectingSink::new();

        for t in 0..80 {
            sim.on_tick(t as f64, &mut sink);
        }

        assert_eq!(sink.alerts.len(), 80);
        assert_eq!(sim.alerts().len(), 50);
        assert_eq!(sim.alerts().latest(), sink.alerts.last());
    }

    #[test]
    fn test_long_run_never_halts() {
        let mut sim = Simulation::new(EngineConfig {
            failure_probability: 0.05,
            weather_probability: 0.2,
            seed: Some(7),
            ..Default::default()
        })
        .unwrap();
        let mut sink = NullSink;
        let receiver = orbital_mechanics::transforms::site_position(
            19.0,
            165.0,
            orbital_mechanics::EARTH_RADIUS * 1.01,
            0.0,
        )
        .unwrap();

        for frame in 0..6000 {
            let t = frame as f64 / 60.0;
            if frame % 60 == 0 {
                sim.on_tick(t, &mut sink);
            }
            sim.on_frame(t, &receiver, &mut sink);
            if let Some(id) = sim.link().telemetry_id.as_deref() {
                assert!(sim.registry().get(id).is_some());
            }
        }

        assert!(sim.alerts().len() <= 50);
        assert!(sim.snapshot().is_some());
    }
}
