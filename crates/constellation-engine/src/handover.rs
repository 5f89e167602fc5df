//! Handover State Machine
//!
//! Two link identities are tracked per receiver:
//! - visual lock: follows the frame's best candidate with no hysteresis
//! - telemetry link: migrates only on a sustained, significant improvement
//!   (margin + hold-down) or when the current link is dead
//!
//! Transitions are pure: [`LinkState::advance`] returns the next state and
//! the decision taken, and the caller commits both.

use serde::{Deserialize, Serialize};

use crate::alerts::AlertLevel;
use crate::evaluator::Candidate;
use crate::EngineConfig;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HandoverPolicy {
    /// Candidate must beat the current link by more than this
    pub margin: f64,
    /// Minimum time between telemetry link changes
    pub hold_down: f64,
}

impl From<&EngineConfig> for HandoverPolicy {
    fn from(config: &EngineConfig) -> Self {
        Self {
            margin: config.handover_margin,
            hold_down: config.hold_down,
        }
    }
}

impl Default for HandoverPolicy {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LinkState {
    pub visual_id: Option<String>,
    pub telemetry_id: Option<String>,
    /// Simulation time of the last telemetry link change
    pub last_switch_time: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HandoverDecision {
    /// No link and nothing to link to
    Idle,
    /// Current link retained
    Hold { current: String },
    /// First link after having none
    Connected { to: String },
    Handover { from: String, to: String },
    /// Link dropped, no candidate left
    Lost { from: String },
}

impl HandoverDecision {
    pub fn changed_link(&self) -> bool {
        matches!(
            self,
            HandoverDecision::Connected { .. }
                | HandoverDecision::Handover { .. }
                | HandoverDecision::Lost { .. }
        )
    }

    /// Alert to raise for this decision, if any
    pub fn alert(&self) -> Option<(AlertLevel, String)> {
        match self {
            HandoverDecision::Idle | HandoverDecision::Hold { .. } => None,
            HandoverDecision::Connected { to } => Some((
                AlertLevel::Info,
                format!("User connected to satellite ({to})"),
            )),
            HandoverDecision::Handover { from, to } => Some((
                AlertLevel::Info,
                format!("Predictive handover triggered ({from} -> {to})"),
            )),
            HandoverDecision::Lost { from } => Some((
                AlertLevel::Warning,
                format!("No satellite available (lost {from})"),
            )),
        }
    }
}

impl LinkState {
    pub fn is_linked(&self) -> bool {
        self.telemetry_id.is_some()
    }

    /// Next link state for one frame.
    ///
    /// `current_quality` is the telemetry satellite's RSSI this frame (zero
    /// when unlinked, failed or out of range). A dead link (quality ≤ 0) is
    /// replaced immediately; otherwise the candidate must exceed it by more
    /// than the margin after the hold-down has elapsed.
    pub fn advance(
        &self,
        now: f64,
        best: Option<&Candidate>,
        current_quality: f64,
        policy: &HandoverPolicy,
    ) -> (LinkState, HandoverDecision) {
        let mut next = LinkState {
            visual_id: best.map(|c| c.id.clone()),
            ..self.clone()
        };

        let decision = match (best, self.telemetry_id.as_deref()) {
            (Some(candidate), Some(current)) if candidate.id == current => HandoverDecision::Hold {
                current: current.to_string(),
            },
            (Some(candidate), None) => {
                next.telemetry_id = Some(candidate.id.clone());
                next.last_switch_time = now;
                HandoverDecision::Connected {
                    to: candidate.id.clone(),
                }
            }
            (Some(candidate), Some(current)) => {
                let hold_down_elapsed = now - self.last_switch_time > policy.hold_down;
                let link_dead = current_quality <= 0.0;
                let significant = candidate.rssi > current_quality + policy.margin;

                if link_dead || (hold_down_elapsed && significant) {
                    next.telemetry_id = Some(candidate.id.clone());
                    next.last_switch_time = now;
                    HandoverDecision::Handover {
                        from: current.to_string(),
                        to: candidate.id.clone(),
                    }
                } else {
                    HandoverDecision::Hold {
                        current: current.to_string(),
                    }
                }
            }
            (None, Some(current)) => {
                next.telemetry_id = None;
                HandoverDecision::Lost {
                    from: current.to_string(),
                }
            }
            (None, None) => HandoverDecision::Idle,
        };

        (next, decision)
    }
}
