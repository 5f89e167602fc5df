//! Orbital Mechanics Library
//!
//! Simplified circular-orbit propagation, receiver-site placement and a
//! synthetic link-quality model for the Orbit Latch LEO constellation.
//!
//! Distances are in simulation units (1 unit = 1000 km). Angles are radians
//! unless a name says otherwise.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod link;

pub use link::{SignalQuality, CUTOFF_DISTANCE};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrbitalError {
    #[error("Invalid orbital elements: {0}")]
    InvalidElements(String),
    #[error("Invalid central body: {0}")]
    InvalidBody(String),
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
}

pub type Result<T> = std::result::Result<T, OrbitalError>;

/// Earth radius in simulation units
pub const EARTH_RADIUS: f64 = 6.371;

/// Gravitational parameter in simulation units (398600 km³/s² scaled to 1000 km)
pub const EARTH_GM: f64 = 398.6;

/// Keeps angular rates in a range a viewer can follow
pub const SPEED_SCALE: f64 = 0.05;

/// Body the constellation orbits
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CentralBody {
    pub radius: f64,
    pub gravitational_parameter: f64,
}

impl CentralBody {
    pub const EARTH: CentralBody = CentralBody {
        radius: EARTH_RADIUS,
        gravitational_parameter: EARTH_GM,
    };

    pub fn new(radius: f64, gravitational_parameter: f64) -> Result<Self> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(OrbitalError::InvalidBody(format!("radius {radius}")));
        }
        if !(gravitational_parameter.is_finite() && gravitational_parameter > 0.0) {
            return Err(OrbitalError::InvalidBody(format!(
                "gravitational parameter {gravitational_parameter}"
            )));
        }
        Ok(Self {
            radius,
            gravitational_parameter,
        })
    }
}

impl Default for CentralBody {
    fn default() -> Self {
        Self::EARTH
    }
}

/// Static orbital parameters of one satellite
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OrbitalElements {
    /// Height above the body surface
    pub altitude: f64,
    pub inclination: f64,
    /// Right ascension of the ascending node
    pub raan: f64,
    /// Orbital angle at t = 0
    pub phase: f64,
    /// Angular rate (rad per time unit), derived from altitude
    pub speed: f64,
    /// Distance from the body center
    pub orbit_radius: f64,
}

impl OrbitalElements {
    pub fn new(
        body: &CentralBody,
        altitude: f64,
        inclination: f64,
        raan: f64,
        phase: f64,
    ) -> Result<Self> {
        if !altitude.is_finite() || altitude < 0.0 {
            return Err(OrbitalError::InvalidElements(format!("altitude {altitude}")));
        }
        for (name, value) in [("inclination", inclination), ("raan", raan), ("phase", phase)] {
            if !value.is_finite() {
                return Err(OrbitalError::InvalidElements(format!("{name} {value}")));
            }
        }

        Ok(Self {
            altitude,
            inclination,
            raan,
            phase,
            speed: propagation::orbital_speed(body, altitude),
            orbit_radius: body.radius + altitude,
        })
    }

    pub fn position(&self, time: f64) -> Vector3<f64> {
        propagation::propagate(self, time)
    }
}

pub mod propagation {
    use super::*;
    use nalgebra::Rotation3;

    /// Position at simulation time `time`.
    ///
    /// The satellite sits at angle `phase + speed * time` on a circle in the
    /// XZ plane, which is then tilted by the inclination about X and turned by
    /// the RAAN about Y.
    pub fn propagate(elements: &OrbitalElements, time: f64) -> Vector3<f64> {
        let r = elements.orbit_radius;
        let theta = elements.phase + elements.speed * time;
        let in_plane = Vector3::new(r * theta.cos(), 0.0, r * theta.sin());

        let tilt = Rotation3::from_axis_angle(&Vector3::x_axis(), elements.inclination);
        let node = Rotation3::from_axis_angle(&Vector3::y_axis(), elements.raan);

        node * (tilt * in_plane)
    }

    /// Angular rate for a circular orbit at `altitude`.
    ///
    /// `sqrt(GM / r)` scaled by [`SPEED_SCALE`]; strictly decreasing in altitude.
    pub fn orbital_speed(body: &CentralBody, altitude: f64) -> f64 {
        orbital_velocity_km_s(body, altitude) * SPEED_SCALE
    }

    /// Linear orbital velocity in km/s.
    ///
    /// With GM expressed per 1000 km the unit conversion cancels, so
    /// `sqrt(GM / r)` is already km/s (about 7.6 at 550 km).
    pub fn orbital_velocity_km_s(body: &CentralBody, altitude: f64) -> f64 {
        (body.gravitational_parameter / (body.radius + altitude)).sqrt()
    }
}

pub mod transforms {
    use super::*;
    use nalgebra::Rotation3;

    /// Receiver placement on the body surface.
    ///
    /// Latitude/longitude are mapped onto the body-fixed sphere
    /// (`+Y` is the spin axis), scaled to `radius`, then turned about `+Y` by
    /// the body's current spin angle.
    pub fn site_position(
        latitude_deg: f64,
        longitude_deg: f64,
        radius: f64,
        spin_angle: f64,
    ) -> Result<Vector3<f64>> {
        if !(-90.0..=90.0).contains(&latitude_deg) {
            return Err(OrbitalError::InvalidCoordinates(format!(
                "latitude {latitude_deg}"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude_deg) {
            return Err(OrbitalError::InvalidCoordinates(format!(
                "longitude {longitude_deg}"
            )));
        }

        let polar = (90.0 - latitude_deg).to_radians();
        let azimuth = longitude_deg.to_radians();

        let body_fixed = Vector3::new(
            -radius * polar.sin() * azimuth.cos(),
            radius * polar.cos(),
            radius * polar.sin() * azimuth.sin(),
        );

        Ok(Rotation3::from_axis_angle(&Vector3::y_axis(), spin_angle) * body_fixed)
    }

    /// Cosine of the angle between two directions seen from the body center.
    ///
    /// Returns `None` when either vector has no direction.
    pub fn direction_cosine(a: &Vector3<f64>, b: &Vector3<f64>) -> Option<f64> {
        let a = a.try_normalize(f64::EPSILON)?;
        let b = b.try_normalize(f64::EPSILON)?;
        Some(a.dot(&b))
    }
}
