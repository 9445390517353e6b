//! LightSwarm CLI.
//!
//! Runs a live experiment (optionally recording it with `-o`) or replays a recording
//! given with `-i`. Flags mirror the snapshot header, so `-h` is the arena height and
//! help is only available as `--help`.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::info;

use lightswarm_core::geometry::{Polygon, Shape};
use lightswarm_core::storage::{FileRecorder, RunSummary, SnapshotReader};
use lightswarm_core::swarm::{KinematicPhysics, Simulation};
use lightswarm_core::{setup_logging, SimConfig};

fn parse_shape(value: &str) -> std::result::Result<Shape, String> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Shape::from_char(c).ok_or_else(|| format!("unknown shape '{}', use R, H or C", c)),
        _ => Err(format!("shape must be one character, got '{}'", value)),
    }
}

#[derive(Parser)]
#[command(name = "lightswarm")]
#[command(version)]
#[command(about = "Virtual light-field swarm testbed")]
#[command(disable_help_flag = true)]
struct Cli {
    /// Arena width
    #[arg(short = 'w')]
    width: Option<f64>,

    /// Arena height
    #[arg(short = 'h')]
    height: Option<f64>,

    /// Number of robots
    #[arg(short = 'r')]
    robots: Option<usize>,

    /// Number of boxes
    #[arg(short = 'b')]
    boxes: Option<usize>,

    /// Robot size
    #[arg(short = 'z')]
    robot_size: Option<f64>,

    /// Box size
    #[arg(short = 's')]
    box_size: Option<f64>,

    /// Robot shape (R, H or C)
    #[arg(short = 't', value_parser = parse_shape)]
    robot_shape: Option<Shape>,

    /// Box shape (R, H or C)
    #[arg(short = 'y', value_parser = parse_shape)]
    box_shape: Option<Shape>,

    /// Ticks between snapshots
    #[arg(short = 'g')]
    draw_interval: Option<u64>,

    /// Record the run to this file
    #[arg(short = 'o')]
    output: Option<PathBuf>,

    /// Replay this recording
    #[arg(short = 'i')]
    input: Option<PathBuf>,

    /// Target polygon definition (one "x y" vertex per line)
    #[arg(short = 'p')]
    polygon: Option<PathBuf>,

    /// Corner flare factor
    #[arg(short = 'f')]
    flare: Option<f64>,

    /// Fraction of near-corner lights switched off
    #[arg(short = 'd')]
    drag: Option<f64>,

    /// Switch to circle guidance late in dilation (1 = on)
    #[arg(short = 'c')]
    switch_to_circle: Option<u8>,

    /// Probability that an in-band light is switched on
    #[arg(long)]
    probability: Option<f64>,

    /// Ticks between success evaluations
    #[arg(long)]
    evaluate_every: Option<u64>,

    /// Step budget
    #[arg(long)]
    steps: Option<u64>,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl Cli {
    fn apply(&self, config: &mut SimConfig) {
        let arena = &mut config.arena;
        if let Some(v) = self.width {
            arena.width = v;
        }
        if let Some(v) = self.height {
            arena.height = v;
        }

        let population = &mut config.population;
        if let Some(v) = self.robots {
            population.robots = v;
        }
        if let Some(v) = self.boxes {
            population.boxes = v;
        }
        if let Some(v) = self.robot_size {
            population.robot_size = v;
        }
        if let Some(v) = self.box_size {
            population.box_size = v;
        }
        if let Some(v) = self.robot_shape {
            population.robot_shape = v;
        }
        if let Some(v) = self.box_shape {
            population.box_shape = v;
        }

        let control = &mut config.control;
        if let Some(v) = self.flare {
            control.flare = v;
        }
        if let Some(v) = self.drag {
            control.drag = v;
        }
        if let Some(v) = self.switch_to_circle {
            control.switch_to_circle = v != 0;
        }
        if let Some(v) = self.probability {
            control.probability_on = v;
        }

        let recording = &mut config.recording;
        if let Some(v) = self.draw_interval {
            recording.draw_interval = v;
        }
        if let Some(v) = self.evaluate_every {
            recording.evaluation_interval = v;
        }
        if let Some(v) = self.steps {
            recording.max_steps = v;
        }
        recording.output = self.output.clone();
        recording.input = self.input.clone();
        recording.polygon = self.polygon.clone();

        if let Some(v) = self.seed {
            config.seed = v;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(Some(if cli.verbose { "debug" } else { "info" }.to_string()));

    let mut config = SimConfig::default();
    let recording = match &cli.input {
        Some(path) => {
            let recording = SnapshotReader::open(path)
                .with_context(|| format!("failed to read recording {}", path.display()))?;
            config = recording.config().context("recording header is invalid")?;
            Some(recording)
        }
        None => None,
    };
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let polygon = match &config.recording.polygon {
        Some(path) => Some(
            Polygon::load(path)
                .with_context(|| format!("failed to load polygon {}", path.display()))?,
        ),
        None => None,
    };

    let physics = KinematicPhysics::new(config.arena.width, config.arena.height);
    let mut sim = Simulation::new(config.clone(), physics, polygon)?;

    if let Some(recording) = recording {
        sim.replay_from(recording.snapshots);
    } else if let Some(path) = &config.recording.output {
        let recorder = FileRecorder::create(path, &config)
            .with_context(|| format!("failed to create {}", path.display()))?;
        sim.record_to(recorder);
    }

    let shutdown = AtomicBool::new(false);
    let summary = sim.run(config.recording.max_steps, &shutdown)?;

    if let Some(path) = &config.recording.output {
        let summary_path = RunSummary::path_for(path);
        summary.write(&summary_path)?;
    }

    if let Some(report) = &summary.final_report {
        info!(
            "✅ {} steps, {}/{} boxes inside ({:.1}%)",
            summary.steps,
            report.inside,
            report.inside + report.outside,
            report.ratio * 100.0
        );
    }
    Ok(())
}
