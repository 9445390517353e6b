//! Robots and boxes
//!
//! A robot is a light-powered pusher: every `SENSE_PERIOD` ticks, at its own phase, it
//! compares brightness at four body-local sensors and drives toward the light. It
//! pays for being alive and for moving, and stops when its charge runs out.
//! Boxes are passive; the core only reads their pose and writes the inside flag.

use super::light_field::LightField;
use super::physics::{BodyHandle, Transform};
use crate::geometry::Shape;

/// Ticks between two re-plans of one robot
pub const SENSE_PERIOD: u64 = 50;
/// Body-local sensor offset along both axes
pub const SENSOR_OFFSET: f64 = 0.1;

/// Energy bookkeeping, all in joules per tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChargeModel {
    pub charge_max: f64,
    /// Scales harvested light
    pub input_efficiency: f64,
    /// Cost of being alive
    pub output_metabolic: f64,
    /// Cost per unit of speed
    pub output_efficiency: f64,
}

impl Default for ChargeModel {
    fn default() -> Self {
        ChargeModel {
            charge_max: 20.0,
            input_efficiency: 0.4,
            output_metabolic: 0.01,
            output_efficiency: 0.1,
        }
    }
}

/// Body-frame velocity request
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DriveCommand {
    pub forward: f64,
    pub turn: f64,
}

#[derive(Clone, Debug)]
pub struct Robot {
    pub body: BodyHandle,
    pub size: f64,
    pub shape: Shape,
    pub charge: f64,
    pub model: ChargeModel,
    pub drive_gain: f64,
    pub turn_gain: f64,
    /// Sensing happens on ticks where `step % SENSE_PERIOD == phase`
    pub phase: u64,
}

impl Robot {
    pub fn new(body: BodyHandle, size: f64, shape: Shape, phase: u64) -> Self {
        Robot {
            body,
            size,
            shape,
            charge: 0.0,
            model: ChargeModel::default(),
            drive_gain: 5.0,
            turn_gain: 20.0,
            phase: phase % SENSE_PERIOD,
        }
    }

    /// Read the four sensors and plan a drive command, on this robot's phase only.
    pub fn sense(&self, step: u64, pose: &Transform, field: &LightField) -> Option<DriveCommand> {
        if step % SENSE_PERIOD != self.phase {
            return None;
        }
        let read = |lx: f64, ly: f64| {
            let (x, y) = pose.world_point(lx, ly);
            field.intensity_at(x, y)
        };

        let front_left = read(SENSOR_OFFSET, -SENSOR_OFFSET);
        let front_right = read(SENSOR_OFFSET, SENSOR_OFFSET);
        let back_left = read(-SENSOR_OFFSET, -SENSOR_OFFSET);
        let back_right = read(-SENSOR_OFFSET, SENSOR_OFFSET);

        Some(DriveCommand {
            forward: self.drive_gain * ((front_right + front_left) - (back_right + back_left)),
            turn: self.turn_gain * (front_right - front_left),
        })
    }

    /// Apply one tick of energy flow. Returns `false` when the robot ran dry and must stop.
    pub fn update_charge(&mut self, brightness: f64, linear_speed: f64, angular_speed: f64) -> bool {
        let m = &self.model;
        let delta = m.input_efficiency * brightness
            - m.output_metabolic
            - m.output_efficiency * angular_speed.abs()
            - m.output_efficiency * linear_speed.abs();

        self.charge += delta;
        if self.charge <= 0.0 {
            self.charge = 0.0;
            return false;
        }
        self.charge = self.charge.min(m.charge_max);
        true
    }
}

#[derive(Clone, Debug)]
pub struct PushBox {
    pub body: BodyHandle,
    pub size: f64,
    pub shape: Shape,
    /// Written by success evaluation
    pub inside: bool,
}

impl PushBox {
    pub fn new(body: BodyHandle, size: f64, shape: Shape) -> Self {
        PushBox {
            body,
            size,
            shape,
            inside: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn senses_only_on_its_phase() {
        let field = LightField::new(32.0, 32.0, 1024, 2.0).unwrap();
        let robot = Robot::new(BodyHandle(0), 0.35, Shape::Circle, 7);
        let pose = Transform::new(16.0, 16.0, 0.0);
        assert!(robot.sense(8, &pose, &field).is_none());
        assert_eq!(
            robot.sense(57, &pose, &field),
            Some(DriveCommand { forward: 0.0, turn: 0.0 })
        );
    }

    #[test]
    fn steers_toward_light_ahead_and_right() {
        let mut field = LightField::new(32.0, 32.0, 1024, 2.0).unwrap();
        // light at (17.5, 17.5): ahead of and to the +y side of a robot facing +x
        field.set_intensity(17 + 17 * 32, 1.0);
        let robot = Robot::new(BodyHandle(0), 0.35, Shape::Circle, 0);
        let cmd = robot.sense(0, &Transform::new(16.0, 16.0, 0.0), &field).unwrap();
        assert!(cmd.forward > 0.0);
        assert!(cmd.turn > 0.0);
    }

    #[test]
    fn charge_clamps_at_both_ends() {
        let mut robot = Robot::new(BodyHandle(0), 0.35, Shape::Circle, 0);
        assert!(!robot.update_charge(0.0, 0.0, 0.0));
        assert_eq!(robot.charge, 0.0);

        assert!(robot.update_charge(1000.0, 0.0, 0.0));
        assert_eq!(robot.charge, robot.model.charge_max);

        let before = robot.charge;
        assert!(robot.update_charge(0.0, 1.0, -1.0));
        assert!((before - robot.charge - 0.21).abs() < 1e-12);
    }
}
