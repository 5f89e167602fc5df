// Ground Station Simulation
// Runs the constellation link-handover engine for one receiver site

mod output;

use anyhow::{Context, Result};
use clap::Parser;
use constellation_engine::{EngineConfig, Simulation};
use orbital_mechanics::transforms::site_position;
use output::{Outbound, RunnerSink};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Body rotation, radians per simulation second
const SPIN_RATE: f64 = 0.05;

/// Receiver sits slightly above the surface
const SITE_RADIUS_FACTOR: f64 = 1.01;

/// Geographic longitude zero sits this far east of the body-frame +X axis
const LONGITUDE_OFFSET_DEG: f64 = 90.0;

/// Ground station runner
#[derive(Parser, Debug)]
#[command(name = "ground-station-sim")]
#[command(about = "Simulate a LEO constellation and link handover for one receiver site")]
struct Args {
    /// Site identifier used in NATS subjects
    #[arg(long, env = "GS_ID", default_value = "GS-000")]
    site: String,

    /// Site latitude in degrees
    #[arg(long, env = "GS_LAT", default_value_t = 19.0, allow_hyphen_values = true)]
    lat: f64,

    /// Site longitude in degrees
    #[arg(long, env = "GS_LON", default_value_t = 165.0, allow_hyphen_values = true)]
    lon: f64,

    /// Engine configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// RNG seed, overrides the config file
    #[arg(long)]
    seed: Option<u64>,

    /// Frame period in milliseconds
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// Health/weather tick period in milliseconds
    #[arg(long, default_value_t = 1000)]
    tick_ms: u64,

    /// Emit alerts and snapshots as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Append alerts to this file
    #[arg(long)]
    alert_log: Option<PathBuf>,

    /// Stop after this many seconds
    #[arg(long)]
    duration_secs: Option<f64>,

    /// Publish to NATS at this URL
    #[arg(long, env = "NATS_URL")]
    nats_url: Option<String>,

    /// Inject a solar storm at this simulation time
    #[arg(long)]
    storm_at: Option<f64>,

    /// Intensity of the injected storm
    #[arg(long, default_value_t = 3.0)]
    storm_intensity: f64,
}

/// Body-frame longitude for a geographic one, wrapped to [-180, 180).
fn body_longitude(longitude_deg: f64) -> f64 {
    (longitude_deg + LONGITUDE_OFFSET_DEG + 180.0).rem_euclid(360.0) - 180.0
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays clean for JSON lines
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("ground_station_sim=info,constellation_engine=info")
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(args))
}

fn load_config(path: Option<&Path>, seed: Option<u64>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str::<EngineConfig>(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    if seed.is_some() {
        config.seed = seed;
    }
    config.validate()?;
    Ok(config)
}

/// Connect and spawn the publisher task; `None` if NATS is unreachable.
async fn start_nats(url: &str) -> Option<mpsc::UnboundedSender<Outbound>> {
    let client = match async_nats::connect(url).await {
        Ok(client) => client,
        Err(e) => {
            warn!("NATS unavailable at {} ({}), continuing without it", url, e);
            return None;
        }
    };
    info!("Connected to NATS at {}", url);

    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = client.publish(msg.subject, msg.payload.into()).await {
                warn!("Failed to publish: {}", e);
            }
        }
    });
    Some(tx)
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(args.config.as_deref(), args.seed)?;
    let site_radius = config.body_radius * SITE_RADIUS_FACTOR;
    // Reject bad inputs before the loop starts
    site_position(args.lat, args.lon, site_radius, 0.0)?;
    anyhow::ensure!(
        args.storm_intensity.is_finite() && args.storm_intensity >= 0.0,
        "--storm-intensity must be a non-negative number, got {}",
        args.storm_intensity
    );
    let site_lon = body_longitude(args.lon);

    let run_id = Uuid::new_v4();
    info!(
        "Ground Station {} starting at {:.4}°, {:.4}° (run {})",
        args.site, args.lat, args.lon, run_id
    );

    let mut sink = RunnerSink::new(args.site.clone(), run_id, args.json);
    if let Some(path) = &args.alert_log {
        sink = sink
            .with_alert_log(path)
            .with_context(|| format!("opening {}", path.display()))?;
    }
    if let Some(url) = &args.nats_url {
        if let Some(tx) = start_nats(url).await {
            sink = sink.with_nats(tx);
        }
    }

    let deadline = args
        .duration_secs
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("invalid --duration-secs")?;
    let site = Site {
        lat: args.lat,
        lon: site_lon,
        radius: site_radius,
    };

    let mut sim = Simulation::new(config)?;
    drive(&mut sim, &mut sink, &args, &site, deadline, tokio::signal::ctrl_c()).await;

    info!(
        "Stopped after {} ticks, {} satellites active, {} alerts retained",
        sim.ticks(),
        sim.registry().active_count(),
        sim.alerts().len()
    );
    Ok(())
}

/// Receiver placement in the body frame
struct Site {
    lat: f64,
    lon: f64,
    radius: f64,
}

/// Frame and tick drivers until `deadline` passes or `shutdown` resolves.
async fn drive<F: Future>(
    sim: &mut Simulation,
    sink: &mut RunnerSink,
    args: &Args,
    site: &Site,
    deadline: Option<Duration>,
    shutdown: F,
) {
    let mut storm_pending = args.storm_at;

    let mut frames = time::interval(Duration::from_millis(args.frame_ms.max(1)));
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticks = time::interval(Duration::from_millis(args.tick_ms.max(1)));
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick fires immediately; the first health step is one period in
    ticks.tick().await;

    let started = Instant::now();
    tokio::pin!(shutdown);

    loop {
        if deadline.is_some_and(|d| started.elapsed() >= d) {
            info!("Run duration reached");
            break;
        }

        tokio::select! {
            _ = frames.tick() => {
                let now = started.elapsed().as_secs_f64();
                if let Some(at) = storm_pending {
                    if now >= at {
                        if !sim.inject_space_weather(now, args.storm_intensity, sink) {
                            info!("Storm already active, injection skipped");
                        }
                        storm_pending = None;
                    }
                }

                match site_position(site.lat, site.lon, site.radius, SPIN_RATE * now) {
                    Ok(receiver) => {
                        sim.on_frame(now, &receiver, sink);
                    }
                    Err(e) => debug!("Receiver placement failed: {}", e),
                }
            }
            _ = ticks.tick() => {
                let now = started.elapsed().as_secs_f64();
                sim.on_tick(now, sink);
                if sim.ticks() % 60 == 0 {
                    info!(
                        "{} t={:.0}s active {}/{} link {}",
                        args.site,
                        now,
                        sim.registry().active_count(),
                        sim.registry().len(),
                        sim.link().telemetry_id.as_deref().unwrap_or("none"),
                    );
                }
            }
            _ = &mut shutdown => {
                info!("Interrupted");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_args(extra: &[&str]) -> Args {
        let mut argv = vec!["ground-station-sim", "--frame-ms", "5", "--tick-ms", "20", "--seed", "3"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    fn default_site() -> Site {
        Site {
            lat: 19.0,
            lon: body_longitude(165.0),
            radius: 6.371 * SITE_RADIUS_FACTOR,
        }
    }

    #[tokio::test]
    async fn test_drive_stops_on_shutdown_signal() {
        let args = quick_args(&[]);
        let config = load_config(None, args.seed).unwrap();
        let mut sim = Simulation::new(config).unwrap();
        let mut sink = RunnerSink::new("GS-T", Uuid::new_v4(), false);

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        tx.send(()).unwrap();

        let finished = time::timeout(
            Duration::from_secs(5),
            drive(&mut sim, &mut sink, &args, &default_site(), None, rx),
        )
        .await;
        assert!(finished.is_ok());
    }

    #[tokio::test]
    async fn test_drive_runs_frames_until_deadline() {
        let args = quick_args(&["--storm-at", "0", "--storm-intensity", "2.5"]);
        let config = load_config(None, args.seed).unwrap();
        let mut sim = Simulation::new(config).unwrap();
        let mut sink = RunnerSink::new("GS-T", Uuid::new_v4(), false);

        let finished = time::timeout(
            Duration::from_secs(5),
            drive(
                &mut sim,
                &mut sink,
                &args,
                &default_site(),
                Some(Duration::from_millis(120)),
                std::future::pending::<()>(),
            ),
        )
        .await;

        assert!(finished.is_ok());
        assert!(sim.last_frame().is_some());
        assert!(sim.ticks() >= 1);
        assert!(sim.alerts().iter().any(|a| a.message.starts_with("Solar storm injected")));
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["ground-station-sim"]).unwrap();
        assert_eq!(args.frame_ms, 16);
        assert_eq!(args.tick_ms, 1000);
        assert!(!args.json);
        assert!(args.duration_secs.is_none());
    }

    #[test]
    fn test_args_negative_coordinates() {
        let args = Args::try_parse_from([
            "ground-station-sim",
            "--lat",
            "-33.9",
            "--lon",
            "-70.6",
            "--seed",
            "9",
        ])
        .unwrap();
        assert_eq!(args.lat, -33.9);
        assert_eq!(args.lon, -70.6);
        assert_eq!(args.seed, Some(9));
    }

    #[test]
    fn test_load_config_from_toml() {
        let path = std::env::temp_dir().join(format!("orbit-latch-{}.toml", Uuid::new_v4()));
        std::fs::write(&path, "constellation_size = 8\nhold_down = 3.0\nseed = 5\n").unwrap();

        let config = load_config(Some(path.as_path()), None).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.constellation_size, 8);
        assert_eq!(config.hold_down, 3.0);
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.handover_margin, 15.0);
    }

    #[test]
    fn test_seed_flag_overrides_file() {
        let config = load_config(None, Some(77)).unwrap();
        assert_eq!(config.seed, Some(77));
    }

    #[test]
    fn test_body_longitude_applies_offset() {
        assert_eq!(body_longitude(0.0), 90.0);
        assert_eq!(body_longitude(165.0), -105.0);
        assert_eq!(body_longitude(-180.0), -90.0);
        assert_eq!(body_longitude(90.0), -180.0);
    }

    #[test]
    fn test_default_site_matches_offset_placement() {
        // Unwrapped 165 + 90 through the raw spherical mapping
        let theta = 255.0f64.to_radians();
        let phi = 71.0f64.to_radians();
        let r = 6.371 * SITE_RADIUS_FACTOR;

        let site = site_position(19.0, body_longitude(165.0), r, 0.0).unwrap();
        assert!((site.x - (-r * phi.sin() * theta.cos())).abs() < 1e-9);
        assert!((site.y - r * phi.cos()).abs() < 1e-9);
        assert!((site.z - r * phi.sin() * theta.sin()).abs() < 1e-9);
    }

    #[test]
    fn test_site_radius_clears_surface() {
        let receiver = site_position(19.0, 165.0, 6.371 * SITE_RADIUS_FACTOR, 0.0).unwrap();
        assert!(receiver.norm() > 6.371);
    }
}
