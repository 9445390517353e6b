//! Swarm Engine
//!
//! Robots that follow light, boxes they push, and the light-field controller that
//! herds them. Leaf-first: `light_field` and `goals`, then `layout` and `controller`,
//! then `world` and `simulation` which drive the tick loop.

pub mod agents;
pub mod controller;
pub mod goals;
pub mod layout;
pub mod light_field;
pub mod physics;
pub mod simulation;
pub mod world;

pub use agents::{ChargeModel, PushBox, Robot};
pub use controller::{ContainmentBounds, ContractionController, Phase};
pub use goals::{Goal, GoalBuckets};
pub use layout::{pack_goals, GoalLayout, HexCell};
pub use light_field::{Light, LightField};
pub use physics::{KinematicPhysics, Physics, Transform};
pub use simulation::Simulation;
pub use world::World;
