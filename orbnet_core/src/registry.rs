//! The Body Registry - static description of every orbiting body.
//!
//! Bodies form a tree of circular orbits rooted at the single body with no
//! parent. The registry is validated once at load and never mutated
//! afterwards; every malformed configuration is rejected here, before any
//! tick can run.

use crate::BodyId;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use thiserror::Error;

/// Configuration-invariant violations detected at load time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("Duplicate body id: {0}")]
    DuplicateId(BodyId),

    #[error("Registry has no root body (a body without parent)")]
    NoRoot,

    #[error("Registry has more than one root body: {0} and {1}")]
    MultipleRoots(BodyId, BodyId),

    #[error("Body {body} references missing parent {parent}")]
    DanglingParent { body: BodyId, parent: BodyId },

    #[error("Body {0} is part of a cycle in the parent relation")]
    Cycle(BodyId),

    #[error("Body {0} orbits a parent but has a zero orbital period")]
    ZeroPeriod(BodyId),

    #[error("Body {0} orbits a parent but has a zero orbital radius")]
    ZeroOrbitalRadius(BodyId),

    #[error("Body {body} has invalid {field}: {value}")]
    InvalidValue {
        body: BodyId,
        field: &'static str,
        value: f64,
    },

    #[error("Unknown body: {0}")]
    UnknownBody(BodyId),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Sense of rotation of a circular orbit.
///
/// Serialized as `1` (prograde, counter-clockwise) or `-1` (retrograde).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum OrbitDirection {
    #[default]
    Prograde,
    Retrograde,
}

impl OrbitDirection {
    /// Returns +1.0 or -1.0.
    pub fn sign(&self) -> f64 {
        match self {
            OrbitDirection::Prograde => 1.0,
            OrbitDirection::Retrograde => -1.0,
        }
    }
}

impl TryFrom<i8> for OrbitDirection {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(OrbitDirection::Prograde),
            -1 => Ok(OrbitDirection::Retrograde),
            other => Err(format!("orbit direction must be 1 or -1, got {}", other)),
        }
    }
}

impl From<OrbitDirection> for i8 {
    fn from(direction: OrbitDirection) -> Self {
        match direction {
            OrbitDirection::Prograde => 1,
            OrbitDirection::Retrograde => -1,
        }
    }
}

/// A simulated celestial or artificial object on a circular orbit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Unique, stable identifier (also the network node id)
    pub id: BodyId,

    /// Human-readable name
    pub name: String,

    /// Body this one orbits; `None` for the root
    #[serde(default)]
    pub parent: Option<BodyId>,

    /// Distance from the parent's center in meters (0 for the root)
    #[serde(default)]
    pub orbital_radius: f64,

    /// Time for one full revolution in seconds (ignored for the root)
    #[serde(default)]
    pub orbital_period: f64,

    /// Sense of rotation
    #[serde(default)]
    pub direction: OrbitDirection,

    /// Physical radius in meters; the disc that occludes links
    pub radius: f64,

    /// Whether the body can host network equipment
    pub connectable: bool,

    /// Orbital angle at t = 0, in degrees
    #[serde(default)]
    pub phase_deg: f64,
}

impl Body {
    /// Creates the root body, fixed at the origin.
    pub fn root(id: u32, name: &str, radius: f64) -> Self {
        Self {
            id: BodyId(id),
            name: name.to_string(),
            parent: None,
            orbital_radius: 0.0,
            orbital_period: 0.0,
            direction: OrbitDirection::Prograde,
            radius,
            connectable: false,
            phase_deg: 0.0,
        }
    }

    /// Creates a prograde, non-connectable body orbiting `parent`.
    pub fn orbiting(id: u32, name: &str, parent: u32, orbital_radius: f64, orbital_period: f64, radius: f64) -> Self {
        Self {
            id: BodyId(id),
            name: name.to_string(),
            parent: Some(BodyId(parent)),
            orbital_radius,
            orbital_period,
            direction: OrbitDirection::Prograde,
            radius,
            connectable: false,
            phase_deg: 0.0,
        }
    }

    /// Sets whether the body can host network equipment.
    pub fn with_connectable(mut self, connectable: bool) -> Self {
        self.connectable = connectable;
        self
    }

    /// Sets the sense of rotation.
    pub fn with_direction(mut self, direction: OrbitDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the orbital angle at t = 0 (degrees).
    pub fn with_phase(mut self, phase_deg: f64) -> Self {
        self.phase_deg = phase_deg;
        self
    }

    /// True for the body with no parent.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    fn validate_values(&self) -> Result<(), RegistryError> {
        let invalid = |field: &'static str, value: f64| RegistryError::InvalidValue {
            body: self.id,
            field,
            value,
        };

        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(invalid("radius", self.radius));
        }
        if !self.phase_deg.is_finite() {
            return Err(invalid("phase_deg", self.phase_deg));
        }
        if self.is_root() {
            return Ok(());
        }

        if self.orbital_period == 0.0 {
            return Err(RegistryError::ZeroPeriod(self.id));
        }
        if !self.orbital_period.is_finite() || self.orbital_period < 0.0 {
            return Err(invalid("orbital_period", self.orbital_period));
        }
        if self.orbital_radius == 0.0 {
            return Err(RegistryError::ZeroOrbitalRadius(self.id));
        }
        if !self.orbital_radius.is_finite() || self.orbital_radius < 0.0 {
            return Err(invalid("orbital_radius", self.orbital_radius));
        }
        Ok(())
    }
}

/// Well-known ids of the reference solar system.
pub mod solar {
    use crate::BodyId;

    pub const SUN: BodyId = BodyId(0);
    pub const EARTH: BodyId = BodyId(1);
    pub const MARS: BodyId = BodyId(2);
    pub const MOON: BodyId = BodyId(3);
    pub const ISS: BodyId = BodyId(4);
    pub const MARS_ORBITER: BodyId = BodyId(5);
}

/// On-disk layout of a registry file.
#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    bodies: Vec<Body>,
}

/// Accepted inputs: `{"bodies": [...]}` or a bare array of bodies.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RegistryDocument {
    File(RegistryFile),
    List(Vec<Body>),
}

/// Validated, immutable set of bodies.
///
/// Bodies are stored sorted by id. The breadth-first evaluation order
/// (parent before child) is computed once here so that resolving a whole
/// snapshot touches each body exactly once.
#[derive(Debug, Clone)]
pub struct BodyRegistry {
    /// Bodies sorted by id
    bodies: Vec<Body>,

    /// Id -> position in `bodies`
    index: HashMap<BodyId, usize>,

    /// Indices into `bodies`, parents before children
    evaluation_order: Vec<usize>,

    /// Index of the root body
    root: usize,
}

impl BodyRegistry {
    /// Validates `bodies` and builds a registry.
    ///
    /// # Errors
    /// Any [`RegistryError`] describing the first invariant violation found:
    /// duplicate ids, zero or several roots, dangling parents, invalid orbital
    /// values, or a cycle in the parent relation.
    pub fn new(mut bodies: Vec<Body>) -> Result<Self, RegistryError> {
        bodies.sort_by_key(|b| b.id);

        let mut index = HashMap::with_capacity(bodies.len());
        for (i, body) in bodies.iter().enumerate() {
            if index.insert(body.id, i).is_some() {
                return Err(RegistryError::DuplicateId(body.id));
            }
        }

        let mut root = None;
        for (i, body) in bodies.iter().enumerate() {
            if body.is_root() {
                if let Some(existing) = root {
                    let existing: &Body = &bodies[existing];
                    return Err(RegistryError::MultipleRoots(existing.id, body.id));
                }
                root = Some(i);
            }
        }
        let root = root.ok_or(RegistryError::NoRoot)?;

        for body in &bodies {
            if let Some(parent) = body.parent {
                if !index.contains_key(&parent) {
                    return Err(RegistryError::DanglingParent { body: body.id, parent });
                }
            }
            body.validate_values()?;
        }

        let evaluation_order = breadth_first_order(&bodies, &index, root)?;

        Ok(Self {
            bodies,
            index,
            evaluation_order,
            root,
        })
    }

    /// Parses a registry from JSON, either `{"bodies": [...]}` or a bare array.
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let document: RegistryDocument =
            serde_json::from_str(json).map_err(|e| RegistryError::Parse(e.to_string()))?;
        match document {
            RegistryDocument::File(file) => Self::new(file.bodies),
            RegistryDocument::List(bodies) => Self::new(bodies),
        }
    }

    /// Loads a registry from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| RegistryError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Serializes the registry back to its JSON file layout.
    pub fn to_json_string(&self) -> Result<String, RegistryError> {
        let file = RegistryFile {
            bodies: self.bodies.clone(),
        };
        serde_json::to_string_pretty(&file).map_err(|e| RegistryError::Parse(e.to_string()))
    }

    /// The reference Sun / Earth / Mars / Moon / ISS / Mars-orbiter system.
    pub fn solar_system() -> Self {
        let bodies = vec![
            Body::root(0, "Sun", 695_508_000.0),
            Body::orbiting(1, "Earth", 0, 149_600_000_000.0, 31_558_149.0, 6_371_000.0).with_connectable(true),
            Body::orbiting(2, "Mars", 0, 228_000_000_000.0, 59_355_072.0, 3_389_500.0).with_connectable(true),
            Body::orbiting(3, "Moon", 1, 385_000_000.0, 2_361_592.0, 1_737_400.0),
            // Earth radius + 400 km
            Body::orbiting(4, "ISS", 1, 6_771_000.0, 5_580.0, 10.0).with_connectable(true),
            // Mars radius + 400 km
            Body::orbiting(5, "Mars Orbiter", 2, 3_789_500.0, 7_200.0, 10.0).with_connectable(true),
        ];
        match Self::new(bodies) {
            Ok(registry) => registry,
            Err(e) => unreachable!("reference registry is valid: {}", e),
        }
    }

    /// Returns a copy whose orbiting bodies start at seeded random phases.
    ///
    /// The same seed always yields the same phases.
    pub fn with_random_phases(&self, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut registry = self.clone();
        for body in registry.bodies.iter_mut().filter(|b| !b.is_root()) {
            body.phase_deg = rng.gen_range(0.0..360.0);
        }
        registry
    }

    /// All bodies, sorted by id.
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Number of bodies.
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Always false for a validated registry (it has a root).
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Looks up a body by id.
    pub fn get(&self, id: BodyId) -> Option<&Body> {
        self.index.get(&id).map(|&i| &self.bodies[i])
    }

    /// Looks up a body by id, failing for unknown ids.
    pub fn body(&self, id: BodyId) -> Result<&Body, RegistryError> {
        self.get(id).ok_or(RegistryError::UnknownBody(id))
    }

    /// Looks up a body by case-insensitive name.
    pub fn find_by_name(&self, name: &str) -> Option<&Body> {
        self.bodies.iter().find(|b| b.name.eq_ignore_ascii_case(name))
    }

    /// The root body.
    pub fn root(&self) -> &Body {
        &self.bodies[self.root]
    }

    /// Bodies in breadth-first order, every parent before its children.
    pub fn evaluation_order(&self) -> impl Iterator<Item = &Body> + '_ {
        self.evaluation_order.iter().map(move |&i| &self.bodies[i])
    }

    /// Connectable bodies, sorted by id.
    pub fn connectable(&self) -> impl Iterator<Item = &Body> + '_ {
        self.bodies.iter().filter(|b| b.connectable)
    }

    /// Ids of all bodies, sorted.
    pub fn ids(&self) -> Vec<BodyId> {
        self.bodies.iter().map(|b| b.id).collect()
    }

    /// Chain from the root down to `id` (both inclusive).
    pub fn lineage(&self, id: BodyId) -> Result<Vec<&Body>, RegistryError> {
        let mut chain = vec![self.body(id)?];
        while let Some(parent) = chain[chain.len() - 1].parent {
            chain.push(self.body(parent)?);
        }
        chain.reverse();
        Ok(chain)
    }
}

/// Breadth-first walk from the root; any body not reached sits on a cycle.
fn breadth_first_order(bodies: &[Body], index: &HashMap<BodyId, usize>, root: usize) -> Result<Vec<usize>, RegistryError> {
    let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, body) in bodies.iter().enumerate() {
        if let Some(parent) = body.parent {
            children.entry(index[&parent]).or_default().push(i);
        }
    }

    let mut order = Vec::with_capacity(bodies.len());
    let mut visited = HashSet::with_capacity(bodies.len());
    let mut queue = VecDeque::from([root]);
    visited.insert(root);

    while let Some(current) = queue.pop_front() {
        order.push(current);
        if let Some(kids) = children.get(&current) {
            for &child in kids {
                if visited.insert(child) {
                    queue.push_back(child);
                }
            }
        }
    }

    if let Some(stranded) = (0..bodies.len()).find(|i| !visited.contains(i)) {
        return Err(RegistryError::Cycle(bodies[stranded].id));
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sun() -> Body {
        Body::root(0, "Sun", 695_508_000.0)
    }

    #[test]
    fn test_solar_system_is_valid() {
        let registry = BodyRegistry::solar_system();
        assert_eq!(registry.len(), 6);
        assert_eq!(registry.root().id, solar::SUN);
        assert_eq!(registry.connectable().count(), 4);
        assert!(!registry.get(solar::MOON).unwrap().connectable);
    }

    #[test]
    fn test_evaluation_order_parents_first() {
        let registry = BodyRegistry::solar_system();
        let order: Vec<BodyId> = registry.evaluation_order().map(|b| b.id).collect();
        assert_eq!(order.len(), registry.len());

        for body in registry.bodies() {
            if let Some(parent) = body.parent {
                let parent_pos = order.iter().position(|id| *id == parent).unwrap();
                let child_pos = order.iter().position(|id| *id == body.id).unwrap();
                assert!(parent_pos < child_pos, "{} must precede {}", parent, body.id);
            }
        }
    }

    #[test]
    fn test_rejects_dangling_parent() {
        let bodies = vec![sun(), Body::orbiting(1, "Lost", 9, 1.0e9, 100.0, 1.0)];
        assert_eq!(
            BodyRegistry::new(bodies).unwrap_err(),
            RegistryError::DanglingParent {
                body: BodyId(1),
                parent: BodyId(9)
            }
        );
    }

    #[test]
    fn test_rejects_cycle() {
        let bodies = vec![
            sun(),
            Body::orbiting(1, "A", 2, 1.0e9, 100.0, 1.0),
            Body::orbiting(2, "B", 1, 1.0e9, 100.0, 1.0),
        ];
        assert!(matches!(BodyRegistry::new(bodies), Err(RegistryError::Cycle(_))));

        let self_loop = vec![sun(), Body::orbiting(1, "Ouroboros", 1, 1.0e9, 100.0, 1.0)];
        assert_eq!(BodyRegistry::new(self_loop).unwrap_err(), RegistryError::Cycle(BodyId(1)));
    }

    #[test]
    fn test_rejects_zero_period_and_radius() {
        let bodies = vec![sun(), Body::orbiting(1, "Still", 0, 1.0e9, 0.0, 1.0)];
        assert_eq!(BodyRegistry::new(bodies).unwrap_err(), RegistryError::ZeroPeriod(BodyId(1)));

        let bodies = vec![sun(), Body::orbiting(1, "Inside", 0, 0.0, 100.0, 1.0)];
        assert_eq!(BodyRegistry::new(bodies).unwrap_err(), RegistryError::ZeroOrbitalRadius(BodyId(1)));
    }

    #[test]
    fn test_rejects_root_problems() {
        assert_eq!(BodyRegistry::new(vec![]).unwrap_err(), RegistryError::NoRoot);

        let two_roots = vec![sun(), Body::root(1, "Other Sun", 1.0)];
        assert_eq!(
            BodyRegistry::new(two_roots).unwrap_err(),
            RegistryError::MultipleRoots(BodyId(0), BodyId(1))
        );

        let duplicate = vec![sun(), Body::root(0, "Sun Again", 1.0)];
        assert_eq!(BodyRegistry::new(duplicate).unwrap_err(), RegistryError::DuplicateId(BodyId(0)));
    }

    #[test]
    fn test_rejects_non_finite_values() {
        let bodies = vec![sun(), Body::orbiting(1, "Nan", 0, 1.0e9, f64::NAN, 1.0)];
        assert!(matches!(
            BodyRegistry::new(bodies),
            Err(RegistryError::InvalidValue {
                field: "orbital_period",
                ..
            })
        ));

        let bodies = vec![sun(), Body::orbiting(1, "Negative", 0, 1.0e9, 100.0, -5.0)];
        assert!(matches!(
            BodyRegistry::new(bodies),
            Err(RegistryError::InvalidValue { field: "radius", .. })
        ));
    }

    #[test]
    fn test_json_roundtrip_preserves_direction() {
        let json = r#"{
            "bodies": [
                { "id": 0, "name": "Star", "radius": 1000.0, "connectable": false },
                { "id": 1, "name": "Relay", "parent": 0, "orbital_radius": 5.0e6,
                  "orbital_period": 600.0, "direction": -1, "radius": 2.0, "connectable": true }
            ]
        }"#;
        let registry = BodyRegistry::from_json_str(json).unwrap();
        let relay = registry.get(BodyId(1)).unwrap();
        assert_eq!(relay.direction, OrbitDirection::Retrograde);
        assert!(relay.connectable);

        let again = BodyRegistry::from_json_str(&registry.to_json_string().unwrap()).unwrap();
        assert_eq!(again.bodies(), registry.bodies());
    }

    #[test]
    fn test_json_accepts_bare_array() {
        let json = r#"[
            { "id": 0, "name": "Star", "radius": 1000.0, "connectable": false },
            { "id": 1, "name": "Relay", "parent": 0, "orbital_radius": 5.0e6,
              "orbital_period": 600.0, "radius": 2.0, "connectable": true }
        ]"#;
        let registry = BodyRegistry::from_json_str(json).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(BodyId(1)).unwrap().direction, OrbitDirection::Prograde);
    }

    #[test]
    fn test_json_rejects_bad_direction() {
        let json = r#"{ "bodies": [
            { "id": 0, "name": "Star", "radius": 1.0, "connectable": false },
            { "id": 1, "name": "Odd", "parent": 0, "orbital_radius": 1.0, "orbital_period": 1.0,
              "direction": 2, "radius": 1.0, "connectable": true }
        ] }"#;
        assert!(matches!(BodyRegistry::from_json_str(json), Err(RegistryError::Parse(_))));
    }

    #[test]
    fn test_random_phases_deterministic() {
        let base = BodyRegistry::solar_system();
        let a = base.with_random_phases(7);
        let b = base.with_random_phases(7);
        let c = base.with_random_phases(8);

        assert_eq!(a.bodies(), b.bodies());
        assert_ne!(a.bodies(), c.bodies());
        assert_eq!(a.root().phase_deg, 0.0);
        assert!(a.bodies().iter().all(|body| (0.0..360.0).contains(&body.phase_deg)));
    }

    #[test]
    fn test_lineage() {
        let registry = BodyRegistry::solar_system();
        let chain: Vec<&str> = registry
            .lineage(solar::ISS)
            .unwrap()
            .iter()
            .map(|b| b.name.as_str())
            .collect();
        assert_eq!(chain, vec!["Sun", "Earth", "ISS"]);
        assert_eq!(registry.find_by_name("mars orbiter").unwrap().id, solar::MARS_ORBITER);
    }
}
