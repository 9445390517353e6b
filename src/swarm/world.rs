use super::agents::{PushBox, Robot, SENSE_PERIOD};
use super::goals::GoalBuckets;
use super::light_field::LightField;
use super::physics::{BodyDef, Physics, Transform, POSITION_ITERATIONS, VELOCITY_ITERATIONS};
use crate::core::config::PopulationConfig;
use crate::geometry::Shape;
use rand::Rng;
use rayon::prelude::*;
use std::f64::consts::PI;
use tracing::info;

/// Everything that exists in the arena: bodies, lights and goal slots.
///
/// The world runs the first two phases of a tick (sensing, then physics). Control,
/// recording and evaluation are driven from `Simulation`.
pub struct World<P: Physics> {
    pub physics: P,
    pub field: LightField,
    pub robots: Vec<Robot>,
    pub boxes: Vec<PushBox>,
    pub goals: GoalBuckets,
    pub width: f64,
    pub height: f64,
    pub timestep: f64,
    steps: u64,
}

impl<P: Physics> World<P> {
    pub fn new(physics: P, field: LightField, width: f64, height: f64, timestep: f64) -> Self {
        World {
            physics,
            field,
            robots: Vec::new(),
            boxes: Vec::new(),
            goals: GoalBuckets::default(),
            width,
            height,
            timestep,
            steps: 0,
        }
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn add_robot(&mut self, shape: Shape, size: f64, pose: Transform, phase: u64) -> usize {
        let body = self.physics.create_body(BodyDef::robot(shape, size), pose);
        self.robots.push(Robot::new(body, size, shape, phase));
        self.robots.len() - 1
    }

    pub fn add_box(&mut self, shape: Shape, size: f64, pose: Transform) -> usize {
        let body = self.physics.create_body(BodyDef::pushable(shape, size), pose);
        self.boxes.push(PushBox::new(body, size, shape));
        self.boxes.len() - 1
    }

    /// Scatter `box_count` boxes over the central half of the arena and the robots
    /// outside the central 20%-80% square.
    pub fn populate<R: Rng + ?Sized>(
        &mut self,
        population: &PopulationConfig,
        box_count: usize,
        rng: &mut R,
    ) {
        let (w, h) = (self.width, self.height);

        for _ in 0..box_count {
            let pose = Transform::new(
                w / 4.0 + rng.gen::<f64>() * w * 0.5,
                h / 4.0 + rng.gen::<f64>() * h * 0.5,
                rng.gen::<f64>() * PI,
            );
            self.add_box(population.box_shape, population.box_size, pose);
        }

        for _ in 0..population.robots {
            let (mut x, mut y) = (w / 2.0, h / 2.0);
            while x > w * 0.2 && x < w * 0.8 && y > h * 0.2 && y < h * 0.8 {
                x = rng.gen::<f64>() * w;
                y = rng.gen::<f64>() * h;
            }
            let pose = Transform::new(x, y, rng.gen::<f64>() * PI);
            let phase = rng.gen_range(0..SENSE_PERIOD);
            self.add_robot(population.robot_shape, population.robot_size, pose, phase);
        }

        info!(
            "🌐 [World] Populated {} robots and {} boxes in a {}x{} arena",
            self.robots.len(),
            self.boxes.len(),
            w,
            h
        );
    }

    pub fn robot_pose(&self, i: usize) -> Transform {
        self.physics.transform(self.robots[i].body)
    }

    pub fn box_pose(&self, i: usize) -> Transform {
        self.physics.transform(self.boxes[i].body)
    }

    /// Sensing phase. Every robot reads the light field as written by earlier control
    /// updates; reads run in parallel and all writes are applied afterwards.
    pub fn sense_and_drive(&mut self) {
        let step = self.steps;
        let poses: Vec<Transform> = self
            .robots
            .iter()
            .map(|r| self.physics.transform(r.body))
            .collect();

        let field = &self.field;
        let readings: Vec<_> = self
            .robots
            .par_iter()
            .zip(poses.par_iter())
            .map(|(robot, pose)| (robot.sense(step, pose, field), field.intensity_at(pose.x, pose.y)))
            .collect();

        for ((robot, pose), (command, brightness)) in
            self.robots.iter_mut().zip(&poses).zip(readings)
        {
            if let Some(cmd) = command {
                let linear = pose.world_vector(cmd.forward, 0.0);
                self.physics.set_velocity(robot.body, linear, cmd.turn);
            }

            let (vx, vy) = self.physics.linear_velocity(robot.body);
            let w = self.physics.angular_velocity(robot.body);
            if !robot.update_charge(brightness, vx.hypot(vy), w) {
                self.physics.set_velocity(robot.body, (0.0, 0.0), 0.0);
            }
        }
    }

    /// Physics phase
    pub fn step_physics(&mut self) {
        self.physics
            .step(self.timestep, VELOCITY_ITERATIONS, POSITION_ITERATIONS);
        self.steps += 1;
    }

    /// Replays advance the clock without touching bodies.
    pub fn skip_step(&mut self) {
        self.steps += 1;
    }
}
