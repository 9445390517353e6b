//! Success evaluation and run summaries.

use crate::core::config::SimConfig;
use crate::core::error::Result;
use crate::geometry::Region;
use crate::swarm::physics::Physics;
use crate::swarm::world::World;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Containment tally at one checkpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub step: u64,
    pub inside: usize,
    pub outside: usize,
    /// `inside / (inside + outside)`, 0 with no boxes
    pub ratio: f64,
    /// Mean distance of the outside boxes to the target boundary
    pub mean_outside_distance: Option<f64>,
    pub fulfilled_goals: usize,
}

/// Test every box against `target`, write its inside flag, and let each box claim the
/// first free goal within one box radius.
pub fn evaluate<P: Physics>(world: &mut World<P>, target: &Region) -> EvaluationReport {
    world.goals.reset_fulfilled();

    let mut inside = 0;
    let mut outside_distance = 0.0;
    for pushed in world.boxes.iter_mut() {
        let t = world.physics.transform(pushed.body);
        pushed.inside = target.contains(t.x, t.y);
        if pushed.inside {
            inside += 1;
        } else {
            outside_distance += target.boundary_distance(t.x, t.y);
        }
        world.goals.claim_near(t.x, t.y, pushed.size / 2.0);
    }

    let outside = world.boxes.len() - inside;
    let report = EvaluationReport {
        step: world.steps(),
        inside,
        outside,
        ratio: if world.boxes.is_empty() {
            0.0
        } else {
            inside as f64 / world.boxes.len() as f64
        },
        mean_outside_distance: (outside > 0).then(|| outside_distance / outside as f64),
        fulfilled_goals: world.goals.fulfilled_count(),
    };

    info!(
        "📊 [World] step {}: {}/{} boxes inside ({:.1}%), {} goals fulfilled",
        report.step,
        report.inside,
        world.boxes.len(),
        report.ratio * 100.0,
        report.fulfilled_goals
    );
    report
}

/// JSON record written when a run ends
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub replay: bool,
    pub steps: u64,
    pub goals: usize,
    pub config: SimConfig,
    pub checkpoints: Vec<EvaluationReport>,
    pub final_report: Option<EvaluationReport>,
}

impl RunSummary {
    /// `<output>.summary.json`, next to the snapshot file
    pub fn path_for(output: &Path) -> PathBuf {
        let mut name = output.as_os_str().to_owned();
        name.push(".summary.json");
        PathBuf::from(name)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("💾 [Snapshot] Run summary written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Shape;
    use crate::swarm::goals::{Goal, GoalBuckets};
    use crate::swarm::light_field::LightField;
    use crate::swarm::physics::{KinematicPhysics, Transform};

    fn world() -> World<KinematicPhysics> {
        let field = LightField::new(32.0, 32.0, 1024, 2.0).unwrap();
        let mut w = World::new(KinematicPhysics::new(32.0, 32.0), field, 32.0, 32.0, 1.0 / 30.0);
        w.add_box(Shape::Hex, 0.25, Transform::new(16.0, 16.0, 0.0));
        w.add_box(Shape::Hex, 0.25, Transform::new(16.5, 16.0, 0.0));
        w.add_box(Shape::Hex, 0.25, Transform::new(25.0, 16.0, 0.0));
        w.goals = GoalBuckets::new(vec![
            Goal::new(16.0, 16.1, 0.25, Shape::Hex),
            Goal::new(30.0, 30.0, 0.25, Shape::Hex),
        ]);
        w
    }

    #[test]
    fn tallies_inside_and_outside() {
        let mut w = world();
        let report = evaluate(&mut w, &Region::circle(16.0, 16.0, 4.0));
        assert_eq!(report.inside, 2);
        assert_eq!(report.outside, 1);
        assert!((report.ratio - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(report.mean_outside_distance, Some(5.0));
        assert_eq!(report.fulfilled_goals, 1);
        assert!(w.boxes[0].inside && !w.boxes[2].inside);

        // evaluating again starts from fresh goals
        let again = evaluate(&mut w, &Region::circle(16.0, 16.0, 4.0));
        assert_eq!(again, report);
    }

    #[test]
    fn summary_serializes() {
        let now = Utc::now();
        let summary = RunSummary {
            started_at: now,
            finished_at: now,
            replay: false,
            steps: 10,
            goals: 2,
            config: SimConfig::default(),
            checkpoints: vec![],
            final_report: None,
        };
        let json = serde_json::to_string(&summary).unwrap();
        let back: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.steps, 10);
        assert_eq!(back.config.population.boxes, 512);
        assert_eq!(
            RunSummary::path_for(Path::new("runs/a.txt")),
            PathBuf::from("runs/a.txt.summary.json")
        );
    }
}
