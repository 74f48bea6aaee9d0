//! The Link Evaluator - line-of-sight and link quality between bodies.
//!
//! For every ordered pair of distinct connectable bodies `(s, r)`:
//! 1. Any third body (connectable or not) whose disc comes closer to the
//!    segment `s–r` than its physical radius blocks the link.
//! 2. An unblocked link gets distance, propagation delay `d / c` and an
//!    error rate equal to the free-space path loss ratio `(λ / 4πd)²`.
//!
//! Each unordered pair is evaluated once and mirrored, so both directions
//! of a link are bit-identical. Cost is O(n³) per instant: O(n²) pairs,
//! each scanning O(n) potential occluders.

use crate::orbit::{Position, PositionMap};
use crate::registry::BodyRegistry;
use crate::BodyId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// Speed of light in vacuum (m/s).
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Reference carrier frequency (Hz): 30 GHz, Ka band.
pub const DEFAULT_CARRIER_FREQUENCY_HZ: f64 = 30.0e9;

/// Radio model used to turn a distance into link quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkModel {
    /// Carrier frequency in Hz
    pub carrier_frequency_hz: f64,
}

impl Default for LinkModel {
    fn default() -> Self {
        Self {
            carrier_frequency_hz: DEFAULT_CARRIER_FREQUENCY_HZ,
        }
    }
}

impl LinkModel {
    /// Creates a model for the given carrier frequency.
    pub fn new(carrier_frequency_hz: f64) -> Self {
        Self { carrier_frequency_hz }
    }

    /// Carrier wavelength in meters.
    pub fn wavelength(&self) -> f64 {
        SPEED_OF_LIGHT / self.carrier_frequency_hz
    }

    /// One-way propagation delay in seconds.
    pub fn propagation_delay(&self, distance: f64) -> f64 {
        distance / SPEED_OF_LIGHT
    }

    /// Free-space path loss as a power ratio, `(λ / 4πd)²`, clamped to [0, 1].
    ///
    /// Used directly as the link's error-rate proxy.
    pub fn free_space_loss_ratio(&self, distance: f64) -> f64 {
        if distance <= 0.0 {
            return 1.0;
        }
        let ratio = (self.wavelength() / (4.0 * PI * distance)).powi(2);
        ratio.min(1.0)
    }

    /// Free-space path loss in dB, `20·log10(4πd / λ)`.
    pub fn path_loss_db(&self, distance: f64) -> f64 {
        if distance <= 0.0 {
            return 0.0;
        }
        20.0 * (4.0 * PI * distance / self.wavelength()).log10()
    }

    /// Quality of an unobstructed link of the given length.
    pub fn quality(&self, distance: f64) -> LinkQuality {
        LinkQuality {
            distance,
            propagation_delay: self.propagation_delay(distance),
            error_rate: self.free_space_loss_ratio(distance),
        }
    }
}

/// Attributes of a connected link; all derive solely from distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkQuality {
    /// Euclidean distance in meters
    pub distance: f64,

    /// One-way delay in seconds
    pub propagation_delay: f64,

    /// Bit-error probability proxy in [0, 1]
    pub error_rate: f64,
}

/// Whether a pair has line of sight at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LinkState {
    Connected(LinkQuality),
    /// Occluded; `by` is the lowest-id body intersecting the segment
    Blocked { by: BodyId },
}

/// A directed potential link between two connectable bodies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub sender: BodyId,
    pub receiver: BodyId,
    #[serde(flatten)]
    pub state: LinkState,
}

impl Link {
    /// True if the pair has line of sight.
    pub fn connected(&self) -> bool {
        matches!(self.state, LinkState::Connected(_))
    }

    /// Link quality, present iff connected.
    pub fn quality(&self) -> Option<&LinkQuality> {
        match &self.state {
            LinkState::Connected(quality) => Some(quality),
            LinkState::Blocked { .. } => None,
        }
    }

    /// Distance in meters, present iff connected.
    pub fn distance(&self) -> Option<f64> {
        self.quality().map(|q| q.distance)
    }

    /// Propagation delay in seconds, present iff connected.
    pub fn propagation_delay(&self) -> Option<f64> {
        self.quality().map(|q| q.propagation_delay)
    }

    /// Error rate, present iff connected.
    pub fn error_rate(&self) -> Option<f64> {
        self.quality().map(|q| q.error_rate)
    }

    /// The body occluding this link, if any.
    pub fn blocked_by(&self) -> Option<BodyId> {
        match self.state {
            LinkState::Blocked { by } => Some(by),
            LinkState::Connected(_) => None,
        }
    }

    /// The same link seen from the receiver's side.
    pub fn reversed(&self) -> Self {
        Self {
            sender: self.receiver,
            receiver: self.sender,
            state: self.state,
        }
    }
}

/// Links of one instant keyed by `(sender, receiver)`.
pub type LinkMap = BTreeMap<(BodyId, BodyId), Link>;

/// Minimum distance from `point` to the segment `a–b`.
///
/// Projects the point onto the segment's line and clamps the projection
/// parameter to [0, 1]. A degenerate segment (`a == b`) measures to `a`.
pub fn point_segment_distance(point: &Position, a: &Position, b: &Position) -> f64 {
    let ab = b - a;
    let length_sq = ab.norm_squared();
    if length_sq == 0.0 {
        return (point - a).norm();
    }
    let t = ((point - a).dot(&ab) / length_sq).clamp(0.0, 1.0);
    let closest = a + ab * t;
    (point - closest).norm()
}

/// Cheap reject: can a disc at `center` with `radius` reach the segment's
/// bounding box at all?
fn disc_near_segment_bounds(center: &Position, radius: f64, a: &Position, b: &Position) -> bool {
    center.x + radius >= a.x.min(b.x)
        && center.x - radius <= a.x.max(b.x)
        && center.y + radius >= a.y.min(b.y)
        && center.y - radius <= a.y.max(b.y)
}

/// Finds the lowest-id body other than `sender` and `receiver` occluding
/// the segment between them.
pub fn find_blocker(
    registry: &BodyRegistry,
    positions: &PositionMap,
    sender: BodyId,
    receiver: BodyId,
) -> Option<BodyId> {
    let a = &positions[&sender];
    let b = &positions[&receiver];

    registry
        .bodies()
        .iter()
        .filter(|body| body.id != sender && body.id != receiver)
        .find(|body| {
            let center = &positions[&body.id];
            disc_near_segment_bounds(center, body.radius, a, b) && point_segment_distance(center, a, b) < body.radius
        })
        .map(|body| body.id)
}

/// Evaluates a single pair at the given positions.
///
/// Coincident endpoints are treated as unblocked with distance 0.
pub fn evaluate_pair(
    registry: &BodyRegistry,
    positions: &PositionMap,
    model: &LinkModel,
    sender: BodyId,
    receiver: BodyId,
) -> Link {
    let a = positions[&sender];
    let b = positions[&receiver];

    let state = if a == b {
        LinkState::Connected(model.quality(0.0))
    } else {
        match find_blocker(registry, positions, sender, receiver) {
            Some(by) => LinkState::Blocked { by },
            None => LinkState::Connected(model.quality((b - a).norm())),
        }
    };

    Link { sender, receiver, state }
}

/// Evaluates every ordered pair of distinct connectable bodies.
///
/// `positions` must contain every body of `registry`.
pub fn evaluate_links(registry: &BodyRegistry, positions: &PositionMap, model: &LinkModel) -> LinkMap {
    let endpoints: Vec<BodyId> = registry.connectable().map(|b| b.id).collect();
    let mut links = LinkMap::new();

    for (i, &sender) in endpoints.iter().enumerate() {
        for &receiver in &endpoints[i + 1..] {
            let link = evaluate_pair(registry, positions, model, sender, receiver);
            links.insert((receiver, sender), link.reversed());
            links.insert((sender, receiver), link);
        }
    }

    links
}
