//! Synthetic Link Quality
//!
//! Maps slant distance and space-weather disturbance to a 0-100 RSSI score
//! and an SNR score bounded above by the RSSI.

use nalgebra::Vector3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Beyond this distance the receiver hears nothing
pub const CUTOFF_DISTANCE: f64 = 4.0;

/// RSSI lost per unit of distance
const DISTANCE_LOSS: f64 = 20.0;

/// RSSI lost per unit of disturbance intensity
const DISTURBANCE_LOSS: f64 = 10.0;

/// Upper bound (exclusive) of the noise subtracted from RSSI to get SNR
pub const NOISE_AMPLITUDE: f64 = 20.0;

const MAX_RSSI: f64 = 100.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct SignalQuality {
    pub rssi: f64,
    pub snr: f64,
}

impl SignalQuality {
    pub const NONE: SignalQuality = SignalQuality { rssi: 0.0, snr: 0.0 };

    /// Composite ranking score
    pub fn score(&self) -> f64 {
        self.rssi * 0.8 + self.snr * 0.2
    }
}

/// Deterministic core of the model.
///
/// `noise` is clamped to `[0, NOISE_AMPLITUDE]` so the SNR can never exceed
/// the RSSI.
pub fn signal_quality_with_noise(distance: f64, intensity: f64, noise: f64) -> SignalQuality {
    if !distance.is_finite() || distance >= CUTOFF_DISTANCE {
        return SignalQuality::NONE;
    }

    let distance = distance.max(0.0);
    // +inf saturates the loss, NaN carries no disturbance
    let intensity = if intensity.is_nan() { 0.0 } else { intensity.max(0.0) };

    let rssi = (MAX_RSSI - DISTANCE_LOSS * distance - DISTURBANCE_LOSS * intensity).max(0.0);
    let snr = (rssi - noise.clamp(0.0, NOISE_AMPLITUDE)).max(0.0);

    SignalQuality { rssi, snr }
}

/// Link quality at `distance` under disturbance `intensity`.
pub fn signal_quality<R: Rng + ?Sized>(distance: f64, intensity: f64, rng: &mut R) -> SignalQuality {
    let noise = rng.gen_range(0.0..NOISE_AMPLITUDE);
    signal_quality_with_noise(distance, intensity, noise)
}

/// Link quality between two positions.
pub fn signal_quality_between<R: Rng + ?Sized>(
    from: &Vector3<f64>,
    to: &Vector3<f64>,
    intensity: f64,
    rng: &mut R,
) -> SignalQuality {
    signal_quality((from - to).norm(), intensity, rng)
}
