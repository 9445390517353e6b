use super::controller::{ContainmentBounds, ContractionController};
use super::goals::GoalBuckets;
use super::layout::{pack_goals, HexCell};
use super::light_field::LightField;
use super::physics::Physics;
use super::world::World;
use crate::core::config::SimConfig;
use crate::core::error::Result;
use crate::geometry::{Polygon, Region};
use crate::storage::results::{evaluate, EvaluationReport, RunSummary};
use crate::storage::snapshot::{FileRecorder, Snapshot};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

struct Replay {
    snapshots: Vec<Snapshot>,
    cursor: usize,
}

/// A complete run: world, controller, recorder and evaluation schedule.
///
/// One `advance()` is one tick: sensing, physics, control, snapshot, evaluation, in
/// that order. Replays swap the first three phases for snapshot loading at the
/// recorder's cadence.
pub struct Simulation<P: Physics> {
    config: SimConfig,
    world: World<P>,
    controller: ContractionController,
    /// Region boxes must end up in
    target: Region,
    layout_attempts: u32,
    rng: StdRng,
    recorder: Option<FileRecorder>,
    replay: Option<Replay>,
    finished: bool,
    checkpoints: Vec<EvaluationReport>,
    started_at: DateTime<Utc>,
}

/// Move `polygon` so its centroid sits on `center`, and pivot it there.
fn place_polygon(mut polygon: Polygon, center: (f64, f64)) -> Result<Polygon> {
    let c = polygon.centroid()?;
    polygon.translate(center.0 - c.x, center.1 - c.y, false);
    polygon.set_origin(center.0, center.1);
    Ok(polygon)
}

impl<P: Physics> Simulation<P> {
    /// Build lights, lay out goals, place bodies and arm the controller.
    ///
    /// With a polygon the run steers toward that shape, otherwise toward a circle
    /// around the light grid's center.
    pub fn new(config: SimConfig, physics: P, polygon: Option<Polygon>) -> Result<Self> {
        config.validate()?;
        let arena = &config.arena;
        let population = &config.population;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let field = LightField::new(arena.width, arena.height, arena.num_lights, arena.light_height)?;
        let center = field.true_center();
        let band_width = config.band_width();
        let cell = HexCell::for_object(population.box_size);
        let packed_area = population.boxes as f64 * cell.area;

        let (arena_region, goal_region) = match polygon {
            Some(polygon) => {
                let arena_polygon = place_polygon(polygon, center)?;
                let mut goal_polygon = arena_polygon.clone();
                if packed_area > 0.0 {
                    goal_polygon.scale((packed_area / goal_polygon.area()).sqrt());
                }
                (Region::Polygon(arena_polygon), Region::Polygon(goal_polygon))
            }
            None => (
                Region::circle(center.0, center.1, 0.0),
                Region::circle(center.0, center.1, (packed_area / PI).sqrt()),
            ),
        };

        let layout = pack_goals(
            &goal_region,
            population.boxes,
            cell,
            population.box_size,
            population.box_shape,
            center,
            &mut rng,
        );
        let box_count = layout.goals.len().min(population.boxes);
        if box_count < population.boxes {
            warn!(
                "[World] only {} goals fit, trimming boxes from {} to {}",
                box_count, population.boxes, box_count
            );
        }

        let mut world = World::new(physics, field, arena.width, arena.height, arena.timestep);
        world.goals = GoalBuckets::new(layout.goals);
        world.populate(population, box_count, &mut rng);

        let bounds =
            ContainmentBounds::compute(population, box_count, arena.width, arena.height, band_width);
        let controller =
            ContractionController::new(arena_region, bounds, &config.control, band_width, arena.width)?;

        let target = match layout.region {
            Region::Polygon(goal_polygon) => Region::Polygon(goal_polygon),
            Region::Circle { .. } => Region::circle(
                center.0,
                center.1,
                (world.goals.len() as f64 * cell.area / PI).sqrt(),
            ),
        };

        info!(
            "🚀 [World] Simulation ready: {} robots, {} boxes, {} goals, seed {}",
            world.robots.len(),
            world.boxes.len(),
            world.goals.len(),
            config.seed
        );

        Ok(Simulation {
            config,
            world,
            controller,
            target,
            layout_attempts: layout.attempts,
            rng,
            recorder: None,
            replay: None,
            finished: false,
            checkpoints: Vec::new(),
            started_at: Utc::now(),
        })
    }

    pub fn record_to(&mut self, recorder: FileRecorder) {
        self.recorder = Some(recorder);
    }

    /// Switch to replay: bodies and lights come from `snapshots`, one every
    /// `draw_interval` ticks, and the run finishes when they run out.
    pub fn replay_from(&mut self, snapshots: Vec<Snapshot>) {
        info!("⏪ [World] Replaying {} snapshots", snapshots.len());
        self.replay = Some(Replay {
            snapshots,
            cursor: 0,
        });
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn world(&self) -> &World<P> {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World<P> {
        &mut self.world
    }

    pub fn controller(&self) -> &ContractionController {
        &self.controller
    }

    pub fn target(&self) -> &Region {
        &self.target
    }

    pub fn layout_attempts(&self) -> u32 {
        self.layout_attempts
    }

    pub fn checkpoints(&self) -> &[EvaluationReport] {
        &self.checkpoints
    }

    pub fn steps(&self) -> u64 {
        self.world.steps()
    }

    pub fn is_replay(&self) -> bool {
        self.replay.is_some()
    }

    /// Replays finish when their snapshots are exhausted. Live runs never do.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advance one tick.
    pub fn advance(&mut self) -> Result<()> {
        let draw_interval = self.config.recording.draw_interval;

        match &mut self.replay {
            Some(replay) => {
                self.world.skip_step();
                if self.world.steps() % draw_interval == 0 {
                    match replay.snapshots.get(replay.cursor) {
                        Some(snapshot) => {
                            snapshot.apply_to(&mut self.world)?;
                            replay.cursor += 1;
                        }
                        None => {
                            self.finished = true;
                            return Ok(());
                        }
                    }
                }
            }
            None => {
                self.world.sense_and_drive();
                self.world.step_physics();
                let step = self.world.steps();
                self.controller.tick(step, &mut self.world.field, &mut self.rng);

                if let Some(recorder) = &mut self.recorder {
                    if step % draw_interval == 0 {
                        let first = recorder.written() == 0;
                        recorder.append(&Snapshot::capture(&self.world, first))?;
                    }
                }
            }
        }

        if self.world.steps() % self.config.recording.evaluation_interval.max(1) == 0 {
            let report = evaluate(&mut self.world, &self.target);
            self.checkpoints.push(report);
        }
        Ok(())
    }

    /// Advance until the step budget is spent, the replay runs out, or `shutdown` is
    /// raised (polled once per tick). Returns the run summary.
    pub fn run(&mut self, max_steps: u64, shutdown: &AtomicBool) -> Result<RunSummary> {
        while self.world.steps() < max_steps && !self.finished {
            if shutdown.load(Ordering::Relaxed) {
                info!("🛑 [World] Shutdown requested at step {}", self.world.steps());
                break;
            }
            self.advance()?;
        }
        self.finish()
    }

    /// Flush the recorder and take a final evaluation.
    pub fn finish(&mut self) -> Result<RunSummary> {
        if let Some(recorder) = &mut self.recorder {
            recorder.flush()?;
        }
        let final_report = evaluate(&mut self.world, &self.target);
        info!(
            "🏁 [World] Run ended after {} steps, success ratio {:.3}",
            self.world.steps(),
            final_report.ratio
        );

        Ok(RunSummary {
            started_at: self.started_at,
            finished_at: Utc::now(),
            replay: self.is_replay(),
            steps: self.world.steps(),
            goals: self.world.goals.len(),
            config: self.config.clone(),
            checkpoints: self.checkpoints.clone(),
            final_report: Some(final_report),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swarm::controller::Phase;
    use crate::swarm::layout::MAX_LAYOUT_RETRIES;
    use crate::swarm::physics::KinematicPhysics;

    fn small_config() -> SimConfig {
        let mut cfg = SimConfig::default();
        cfg.population.robots = 8;
        cfg.population.boxes = 40;
        cfg.recording.evaluation_interval = 50;
        cfg.seed = 11;
        cfg
    }

    fn sim(cfg: SimConfig, polygon: Option<Polygon>) -> Simulation<KinematicPhysics> {
        let physics = KinematicPhysics::new(cfg.arena.width, cfg.arena.height);
        Simulation::new(cfg, physics, polygon).unwrap()
    }

    #[test]
    fn one_goal_per_box() {
        let s = sim(small_config(), None);
        assert_eq!(s.world().goals.len(), s.world().boxes.len());
        assert!(s.world().boxes.len() <= 40);
        assert_eq!(s.world().robots.len(), 8);
        assert!(!s.controller().using_polygon());
    }

    #[test]
    fn control_runs_after_sensing_on_the_interval() {
        let mut s = sim(small_config(), None);
        for _ in 0..99 {
            s.advance().unwrap();
        }
        assert_eq!(s.controller().updates(), 0);
        assert!(s.world().field.active().is_empty());

        s.advance().unwrap();
        assert_eq!(s.steps(), 100);
        assert_eq!(s.controller().updates(), 1);
        assert_eq!(s.controller().phase(), Phase::Contracting);
        assert!(!s.world().field.active().is_empty());
        assert_eq!(s.checkpoints().len(), 2);
    }

    #[test]
    fn shutdown_flag_stops_the_loop() {
        let mut s = sim(small_config(), None);
        let stop = AtomicBool::new(true);
        let summary = s.run(1000, &stop).unwrap();
        assert_eq!(summary.steps, 0);
        assert!(summary.final_report.is_some());

        let go = AtomicBool::new(false);
        let summary = s.run(120, &go).unwrap();
        assert_eq!(summary.steps, 120);
        assert_eq!(summary.checkpoints.len(), 2);
    }

    #[test]
    fn polygon_run_is_centered_on_the_light_grid() {
        let square =
            Polygon::from_points(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]).unwrap();
        let s = sim(small_config(), Some(square));
        assert!(s.controller().using_polygon());
        assert!(s.target().is_polygon());

        let (cx, cy) = s.world().field.true_center();
        let goals = s.world().goals.bounds().unwrap().center();
        assert!((goals.0 - cx).abs() < 1e-9 && (goals.1 - cy).abs() < 1e-9);
        let (ox, oy) = s.controller().region().as_polygon().unwrap().origin();
        assert!((ox - cx).abs() < 1e-9 && (oy - cy).abs() < 1e-9);
    }

    #[test]
    fn boxes_are_trimmed_to_the_goals_that_fit() {
        // a unit square on a long strip far thinner than a hex cell: no amount of
        // growth lets the strip hold a slot, so packing stays short
        let flag = Polygon::from_points(&[
            (0.0, 0.0),
            (10_000.0, 0.0),
            (10_000.0, 0.01),
            (1.0, 0.01),
            (1.0, 1.0),
            (0.0, 1.0),
        ])
        .unwrap();
        let mut cfg = small_config();
        cfg.population.boxes = 50;
        let s = sim(cfg, Some(flag));

        assert!(s.world().goals.len() < 50);
        assert_eq!(s.world().boxes.len(), s.world().goals.len());
        assert_eq!(s.layout_attempts(), MAX_LAYOUT_RETRIES);
    }

    #[test]
    fn non_positive_box_size_fails_fast() {
        let mut cfg = small_config();
        cfg.population.box_size = -0.25;
        let physics = KinematicPhysics::new(cfg.arena.width, cfg.arena.height);
        assert!(matches!(
            Simulation::new(cfg, physics, None),
            Err(crate::core::error::PushError::InvalidConfig(_))
        ));
    }
}
