//! Physics seam
//!
//! Rigid-body dynamics belong to an external engine. The core only needs to create
//! bodies, move them, read their poses and velocities, and step time. `KinematicPhysics`
//! is the headless backend used for replays and tests: it integrates velocities with
//! damping and keeps bodies inside the arena walls, without resolving contacts.

use crate::geometry::Shape;

pub const VELOCITY_ITERATIONS: u32 = 6;
pub const POSITION_ITERATIONS: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub usize);

/// Position and heading in world coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
}

impl Transform {
    pub fn new(x: f64, y: f64, angle: f64) -> Self {
        Transform { x, y, angle }
    }

    /// Body-local point to world coordinates
    pub fn world_point(&self, lx: f64, ly: f64) -> (f64, f64) {
        let (s, c) = self.angle.sin_cos();
        (self.x + c * lx - s * ly, self.y + s * lx + c * ly)
    }

    /// Body-local direction to world coordinates
    pub fn world_vector(&self, lx: f64, ly: f64) -> (f64, f64) {
        let (s, c) = self.angle.sin_cos();
        (c * lx - s * ly, s * lx + c * ly)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyDef {
    pub shape: Shape,
    pub size: f64,
    pub linear_damping: f64,
    pub angular_damping: f64,
}

impl BodyDef {
    pub fn robot(shape: Shape, size: f64) -> Self {
        BodyDef {
            shape,
            size,
            linear_damping: 0.0,
            angular_damping: 0.0,
        }
    }

    /// Boxes are heavily damped so they only move while pushed.
    pub fn pushable(shape: Shape, size: f64) -> Self {
        BodyDef {
            shape,
            size,
            linear_damping: 10.0,
            angular_damping: 10.0,
        }
    }
}

/// What the control core consumes from a physics engine.
pub trait Physics {
    fn create_body(&mut self, def: BodyDef, transform: Transform) -> BodyHandle;
    fn transform(&self, body: BodyHandle) -> Transform;
    fn set_transform(&mut self, body: BodyHandle, transform: Transform);
    fn linear_velocity(&self, body: BodyHandle) -> (f64, f64);
    fn angular_velocity(&self, body: BodyHandle) -> f64;
    fn set_velocity(&mut self, body: BodyHandle, linear: (f64, f64), angular: f64);
    fn step(&mut self, timestep: f64, velocity_iterations: u32, position_iterations: u32);
}

#[derive(Clone, Debug)]
struct KinematicBody {
    def: BodyDef,
    transform: Transform,
    linear: (f64, f64),
    angular: f64,
}

/// Velocity integration inside a walled `width x height` arena
#[derive(Clone, Debug)]
pub struct KinematicPhysics {
    bodies: Vec<KinematicBody>,
    width: f64,
    height: f64,
}

impl KinematicPhysics {
    pub fn new(width: f64, height: f64) -> Self {
        KinematicPhysics {
            bodies: Vec::new(),
            width,
            height,
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

impl Physics for KinematicPhysics {
    fn create_body(&mut self, def: BodyDef, transform: Transform) -> BodyHandle {
        self.bodies.push(KinematicBody {
            def,
            transform,
            linear: (0.0, 0.0),
            angular: 0.0,
        });
        BodyHandle(self.bodies.len() - 1)
    }

    fn transform(&self, body: BodyHandle) -> Transform {
        self.bodies[body.0].transform
    }

    fn set_transform(&mut self, body: BodyHandle, transform: Transform) {
        self.bodies[body.0].transform = transform;
    }

    fn linear_velocity(&self, body: BodyHandle) -> (f64, f64) {
        self.bodies[body.0].linear
    }

    fn angular_velocity(&self, body: BodyHandle) -> f64 {
        self.bodies[body.0].angular
    }

    fn set_velocity(&mut self, body: BodyHandle, linear: (f64, f64), angular: f64) {
        let b = &mut self.bodies[body.0];
        b.linear = linear;
        b.angular = angular;
    }

    fn step(&mut self, timestep: f64, _velocity_iterations: u32, _position_iterations: u32) {
        let (w, h) = (self.width, self.height);
        for b in &mut self.bodies {
            // Box2D-style damping: v *= 1 / (1 + dt * c)
            let lin = 1.0 / (1.0 + timestep * b.def.linear_damping);
            let ang = 1.0 / (1.0 + timestep * b.def.angular_damping);
            b.linear = (b.linear.0 * lin, b.linear.1 * lin);
            b.angular *= ang;

            let r = b.def.size / 2.0;
            let t = &mut b.transform;
            t.x = (t.x + b.linear.0 * timestep).clamp(r, (w - r).max(r));
            t.y = (t.y + b.linear.1 * timestep).clamp(r, (h - r).max(r));
            t.angle += b.angular * timestep;
        }
    }
}
