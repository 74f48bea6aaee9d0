//! Reference scenarios.

use orbnet_core::registry::Body;
use orbnet_core::{BodyRegistry, RegistryError};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Sun, Earth, Mars, Moon, ISS and a Mars orbiter
    SolarSystem,

    /// Two relays held on opposite sides of a central body
    Occultation,

    /// Earth with the Moon and two relays, one of them in lunar orbit
    EarthMoonRelay,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::SolarSystem,
            ScenarioId::Occultation,
            ScenarioId::EarthMoonRelay,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::SolarSystem => "solar_system",
            ScenarioId::Occultation => "occultation",
            ScenarioId::EarthMoonRelay => "earth_moon_relay",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::SolarSystem => "Six-body reference system; Sun and Moon occlude, four bodies relay",
            ScenarioId::Occultation => "A and C locked in opposition across B; A-C always blocked, D sees both",
            ScenarioId::EarthMoonRelay => "Earth, Moon, a GEO relay and a lunar orbiter that passes behind the Moon",
        }
    }

    /// Builds the scenario's registry.
    pub fn registry(&self) -> BodyRegistry {
        let built = match self {
            ScenarioId::SolarSystem => Ok(BodyRegistry::solar_system()),
            ScenarioId::Occultation => occultation(),
            ScenarioId::EarthMoonRelay => earth_moon_relay(),
        };
        match built {
            Ok(registry) => registry,
            Err(e) => unreachable!("built-in scenario registry is invalid: {}", e),
        }
    }
}

/// Orbit radius of the occultation relays (meters).
pub const OCCULTATION_ORBIT: f64 = 1.0e8;

/// Physical radius of the occulting body (meters).
pub const OCCULTER_RADIUS: f64 = 1.0e7;

fn occultation() -> Result<BodyRegistry, RegistryError> {
    let period = 86_400.0;
    BodyRegistry::new(vec![
        Body::root(0, "B", OCCULTER_RADIUS).with_connectable(true),
        Body::orbiting(1, "A", 0, OCCULTATION_ORBIT, period, 10.0)
            .with_connectable(true)
            .with_phase(180.0),
        Body::orbiting(2, "C", 0, OCCULTATION_ORBIT, period, 10.0).with_connectable(true),
        Body::orbiting(3, "D", 0, OCCULTATION_ORBIT, period, 10.0)
            .with_connectable(true)
            .with_phase(90.0),
    ])
}

fn earth_moon_relay() -> Result<BodyRegistry, RegistryError> {
    BodyRegistry::new(vec![
        Body::root(0, "Earth", 6_371_000.0).with_connectable(true),
        Body::orbiting(1, "Moon", 0, 384_400_000.0, 2_360_592.0, 1_737_400.0),
        Body::orbiting(2, "GEO Relay", 0, 42_164_000.0, 86_164.0, 10.0).with_connectable(true),
        Body::orbiting(3, "Lunar Orbiter", 1, 3_737_400.0, 7_080.0, 10.0).with_connectable(true),
    ])
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "solar_system" | "solarsystem" | "solar" => Ok(ScenarioId::SolarSystem),
            "occultation" | "blocking" => Ok(ScenarioId::Occultation),
            "earth_moon_relay" | "earthmoonrelay" | "earth_moon" => Ok(ScenarioId::EarthMoonRelay),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
