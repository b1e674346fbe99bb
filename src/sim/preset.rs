//! Named body/craft presets consumed by world initialization.

use crate::sim::integrator::G;
use crate::util::Vec2D;
use serde::{Deserialize, Serialize};

/// Initial configuration of one body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyDef {
    pub name: String,
    pub pos: Vec2D<f64>,
    pub vel: Vec2D<f64>,
    pub mass: f64,
    pub radius: f64,
}

/// Initial configuration of one craft, parked in orbit around a named body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CraftDef {
    pub name: String,
    /// Name of the parent body; resolved to a dense id at world construction.
    pub parent: String,
    pub altitude: f64,
    pub angle: f64,
}

/// A complete initial world configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub bodies: Vec<BodyDef>,
    pub crafts: Vec<CraftDef>,
}

/// Speed of a circular orbit of radius `r` around a mass `m`.
fn circular_speed(mass: f64, radius: f64) -> f64 {
    (G * mass / radius).sqrt()
}

impl Preset {
    /// Looks up a built-in preset by name.
    pub fn named(name: &str) -> Option<Preset> {
        match name {
            "sol-terra" => Some(Self::sol_terra()),
            "inner-system" => Some(Self::inner_system()),
            _ => None,
        }
    }

    /// A star with a single planet on a circular orbit. No craft.
    pub fn sol_terra() -> Preset {
        Preset {
            name: "sol-terra".to_string(),
            bodies: vec![
                BodyDef {
                    name: "Sol".to_string(),
                    pos: Vec2D::new(0.0, 0.0),
                    vel: Vec2D::zero(),
                    mass: 1000.0,
                    radius: 80.0,
                },
                BodyDef {
                    name: "Terra".to_string(),
                    pos: Vec2D::new(600.0, 0.0),
                    vel: Vec2D::new(0.0, circular_speed(1000.0, 600.0)),
                    mass: 50.0,
                    radius: 25.0,
                },
            ],
            crafts: Vec::new(),
        }
    }

    /// A star with an inner and an outer planet, and a craft parked around
    /// the inner one.
    pub fn inner_system() -> Preset {
        Preset {
            name: "inner-system".to_string(),
            bodies: vec![
                BodyDef {
                    name: "Sol".to_string(),
                    pos: Vec2D::new(0.0, 0.0),
                    vel: Vec2D::zero(),
                    mass: 1000.0,
                    radius: 80.0,
                },
                BodyDef {
                    name: "Ember".to_string(),
                    pos: Vec2D::new(300.0, 0.0),
                    vel: Vec2D::new(0.0, circular_speed(1000.0, 300.0)),
                    mass: 10.0,
                    radius: 15.0,
                },
                BodyDef {
                    name: "Terra".to_string(),
                    pos: Vec2D::new(600.0, 0.0),
                    vel: Vec2D::new(0.0, circular_speed(1000.0, 600.0)),
                    mass: 50.0,
                    radius: 25.0,
                },
            ],
            crafts: vec![CraftDef {
                name: "Pathfinder".to_string(),
                parent: "Ember".to_string(),
                altitude: 5.0,
                angle: 0.0,
            }],
        }
    }
}
