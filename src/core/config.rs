use crate::core::error::{PushError, Result};
use crate::geometry::Shape;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Arena and light grid dimensions
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArenaConfig {
    pub width: f64,
    pub height: f64,
    pub num_lights: usize,
    /// Height of every light above the arena plane
    pub light_height: f64,
    pub timestep: f64,
}

/// Robots and pushable boxes
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PopulationConfig {
    pub robots: usize,
    pub boxes: usize,
    pub robot_size: f64,
    pub box_size: f64,
    pub robot_shape: Shape,
    pub box_shape: Shape,
}

/// Contraction controller tuning
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Ticks between two control updates
    pub interval: u64,
    /// Control updates spent holding at the minimum before dilation resumes
    pub hold_ticks: u32,
    /// Pattern band width, in robot sizes
    pub band_factor: f64,
    /// Additive radius step (circle mode)
    pub radius_step: f64,
    /// Multiplicative erosion step (polygon mode), below 1
    pub scale_step: f64,
    pub probability_on: f64,
    /// Corner flare factor, 0 disables corner priming
    pub flare: f64,
    /// Fraction of near-corner cells forced off, 0 disables dragging
    pub drag: f64,
    pub switch_to_circle: bool,
}

/// Recording, replay and run budget
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Ticks between snapshots (and between replay loads)
    pub draw_interval: u64,
    /// Ticks between success evaluations
    pub evaluation_interval: u64,
    pub max_steps: u64,
    pub output: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub polygon: Option<PathBuf>,
}

/// Full run configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimConfig {
    pub arena: ArenaConfig,
    pub population: PopulationConfig,
    pub control: ControlConfig,
    pub recording: RecordingConfig,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            arena: ArenaConfig {
                width: 32.0,
                height: 32.0,
                num_lights: 32 * 32,
                light_height: 2.0,
                timestep: 1.0 / 30.0,
            },
            population: PopulationConfig {
                robots: 128,
                boxes: 512,
                robot_size: 0.35,
                box_size: 0.25,
                robot_shape: Shape::Circle,
                box_shape: Shape::Hex,
            },
            control: ControlConfig {
                interval: 100,
                hold_ticks: 10,
                band_factor: 10.0,
                radius_step: 0.4,
                scale_step: 0.99,
                probability_on: 1.0,
                flare: 0.0,
                drag: 0.0,
                switch_to_circle: false,
            },
            recording: RecordingConfig {
                draw_interval: 1,
                evaluation_interval: 1000,
                max_steps: 100_000,
                output: None,
                input: None,
                polygon: None,
            },
            seed: 0,
        }
    }
}

impl SimConfig {
    pub fn band_width(&self) -> f64 {
        self.population.robot_size * self.control.band_factor
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.arena.width) || !positive(self.arena.height) {
            return Err(PushError::InvalidConfig("arena must have positive size"));
        }
        if !positive(self.population.robot_size) || !positive(self.population.box_size) {
            return Err(PushError::InvalidConfig("robot and box sizes must be positive"));
        }
        if !positive(self.arena.light_height) || !positive(self.arena.timestep) {
            return Err(PushError::InvalidConfig("light height and timestep must be positive"));
        }
        if self.arena.num_lights == 0 {
            return Err(PushError::InvalidConfig("light grid needs at least one light"));
        }
        if !(0.0..=1.0).contains(&self.control.probability_on) {
            return Err(PushError::InvalidConfig("probability_on must lie in [0, 1]"));
        }
        if !(0.0..1.0).contains(&self.control.drag) {
            return Err(PushError::InvalidConfig("drag must lie in [0, 1)"));
        }
        if self.control.scale_step <= 0.0 || self.control.scale_step >= 1.0 {
            return Err(PushError::InvalidConfig("scale_step must lie in (0, 1)"));
        }
        if self.control.interval == 0 || self.recording.draw_interval == 0 {
            return Err(PushError::InvalidConfig("intervals must be non-zero"));
        }
        Ok(())
    }

    /// Header flag line written at the top of every snapshot file.
    pub fn header_flags(&self) -> String {
        let a = &self.arena;
        let p = &self.population;
        let mut line = format!(
            "-w {} -h {} -r {} -b {} -z {} -s {} -t {} -y {}",
            a.width,
            a.height,
            p.robots,
            p.boxes,
            p.robot_size,
            p.box_size,
            p.robot_shape.as_char(),
            p.box_shape.as_char()
        );
        if self.control.flare > 0.0 {
            line.push_str(&format!(" -f {}", self.control.flare));
        }
        if self.control.drag > 0.0 {
            line.push_str(&format!(" -d {}", self.control.drag));
        }
        if self.control.switch_to_circle {
            line.push_str(" -c 1");
        }
        line.push_str(&format!(" -g {}", self.recording.draw_interval));
        line
    }

    /// Apply `-x value` tokens from a snapshot header line.
    /// A leading `HEADER:` marker is accepted and skipped.
    pub fn apply_header_flags(&mut self, line: &str) -> Result<()> {
        let mut tokens = line.split_whitespace().peekable();
        if tokens.peek() == Some(&"HEADER:") {
            tokens.next();
        }

        while let Some(flag) = tokens.next() {
            let value = tokens
                .next()
                .ok_or_else(|| PushError::InvalidHeader(format!("flag {} has no value", flag)))?;
            match flag {
                "-w" => self.arena.width = parse_value(flag, value)?,
                "-h" => self.arena.height = parse_value(flag, value)?,
                "-r" => self.population.robots = parse_value(flag, value)?,
                "-b" => self.population.boxes = parse_value(flag, value)?,
                "-z" => self.population.robot_size = parse_value(flag, value)?,
                "-s" => self.population.box_size = parse_value(flag, value)?,
                "-t" => self.population.robot_shape = parse_shape(flag, value)?,
                "-y" => self.population.box_shape = parse_shape(flag, value)?,
                "-f" => self.control.flare = parse_value(flag, value)?,
                "-d" => self.control.drag = parse_value(flag, value)?,
                "-c" => self.control.switch_to_circle = parse_value::<u8>(flag, value)? != 0,
                "-g" => self.recording.draw_interval = parse_value(flag, value)?,
                other => {
                    return Err(PushError::InvalidHeader(format!("unknown flag {}", other)));
                }
            }
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| PushError::InvalidHeader(format!("bad value {:?} for {}", value, flag)))
}

fn parse_shape(flag: &str, value: &str) -> Result<Shape> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Shape::from_char(c)
            .ok_or_else(|| PushError::InvalidHeader(format!("unknown shape {:?} for {}", value, flag))),
        _ => Err(PushError::InvalidHeader(format!("bad shape {:?} for {}", value, flag))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_flags_round_trip() {
        let mut cfg = SimConfig::default();
        cfg.arena.width = 40.0;
        cfg.population.robots = 7;
        cfg.population.box_shape = Shape::Rect;
        cfg.control.flare = 1.5;
        cfg.control.switch_to_circle = true;
        cfg.recording.draw_interval = 25;

        let mut parsed = SimConfig::default();
        parsed
            .apply_header_flags(&format!("HEADER: {}", cfg.header_flags()))
            .unwrap();

        assert_eq!(parsed.arena.width, 40.0);
        assert_eq!(parsed.population.robots, 7);
        assert_eq!(parsed.population.box_shape, Shape::Rect);
        assert_eq!(parsed.control.flare, 1.5);
        assert!(parsed.control.switch_to_circle);
        assert_eq!(parsed.recording.draw_interval, 25);
    }

    #[test]
    fn unknown_header_flag_is_rejected() {
        let mut cfg = SimConfig::default();
        assert!(matches!(
            cfg.apply_header_flags("-q 3"),
            Err(PushError::InvalidHeader(_))
        ));
        assert!(cfg.apply_header_flags("-w").is_err());
        assert!(cfg.apply_header_flags("-t XY").is_err());
    }

    #[test]
    fn non_positive_sizes_are_rejected() {
        for bad in [0.0, -0.25, f64::NAN, f64::INFINITY] {
            let mut cfg = SimConfig::default();
            cfg.population.box_size = bad;
            assert!(matches!(cfg.validate(), Err(PushError::InvalidConfig(_))), "box {}", bad);

            let mut cfg = SimConfig::default();
            cfg.population.robot_size = bad;
            assert!(cfg.validate().is_err(), "robot {}", bad);

            let mut cfg = SimConfig::default();
            cfg.arena.height = bad;
            assert!(cfg.validate().is_err(), "height {}", bad);
        }
    }

    #[test]
    fn defaults_validate() {
        let cfg = SimConfig::default();
        assert!(cfg.validate().is_ok());
        assert!((cfg.band_width() - 3.5).abs() < 1e-12);
    }
}
