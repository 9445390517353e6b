//! Goal slots
//!
//! One goal per pushable box. Goals are bucketed by `(floor(x), floor(y))` so the
//! evaluator can find the slots around a box without scanning the whole set.

use crate::geometry::{Bounds, Shape};
use std::collections::HashMap;

/// A destination slot for exactly one box
#[derive(Clone, Debug, PartialEq)]
pub struct Goal {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub shape: Shape,
    pub fulfilled: bool,
}

impl Goal {
    pub fn new(x: f64, y: f64, size: f64, shape: Shape) -> Self {
        Goal {
            x,
            y,
            size,
            shape,
            fulfilled: false,
        }
    }
}

/// Goals plus a unit-cell bucket index over their positions
#[derive(Clone, Debug, Default)]
pub struct GoalBuckets {
    goals: Vec<Goal>,
    buckets: HashMap<(i64, i64), Vec<usize>>,
}

fn cell_of(x: f64, y: f64) -> (i64, i64) {
    (x.floor() as i64, y.floor() as i64)
}

impl GoalBuckets {
    pub fn new(goals: Vec<Goal>) -> Self {
        let mut buckets: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (i, g) in goals.iter().enumerate() {
            buckets.entry(cell_of(g.x, g.y)).or_default().push(i);
        }
        GoalBuckets { goals, buckets }
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::of_points(self.goals.iter().map(|g| (g.x, g.y)))
    }

    pub fn fulfilled_count(&self) -> usize {
        self.goals.iter().filter(|g| g.fulfilled).count()
    }

    pub fn reset_fulfilled(&mut self) {
        self.goals.iter_mut().for_each(|g| g.fulfilled = false);
    }

    /// Indices of goals in the bucket `(cx, cy)`. Unknown cells are empty.
    pub fn bucket(&self, cx: i64, cy: i64) -> &[usize] {
        self.buckets.get(&(cx, cy)).map_or(&[], |v| v.as_slice())
    }

    /// Claim the first unfulfilled goal within `radius` of `(x, y)`.
    /// Searches the 3x3 bucket neighbourhood, so `radius` should not exceed one cell.
    pub fn claim_near(&mut self, x: f64, y: f64, radius: f64) -> Option<usize> {
        let (cx, cy) = cell_of(x, y);
        let r2 = radius * radius;
        let found = (cy - 1..=cy + 1)
            .flat_map(|by| (cx - 1..=cx + 1).map(move |bx| (bx, by)))
            .flat_map(|(bx, by)| self.bucket(bx, by).iter().copied())
            .find(|&i| {
                let g = &self.goals[i];
                let dx = g.x - x;
                let dy = g.y - y;
                !g.fulfilled && dx * dx + dy * dy <= r2
            });

        if let Some(i) = found {
            self.goals[i].fulfilled = true;
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_by_floor() {
        let goals = GoalBuckets::new(vec![
            Goal::new(1.2, 3.9, 0.25, Shape::Hex),
            Goal::new(1.8, 3.1, 0.25, Shape::Hex),
            Goal::new(-0.5, 0.5, 0.25, Shape::Hex),
        ]);
        assert_eq!(goals.bucket(1, 3), &[0, 1]);
        assert_eq!(goals.bucket(-1, 0), &[2]);
        assert!(goals.bucket(50, 50).is_empty());
    }

    #[test]
    fn each_goal_is_claimed_once() {
        let mut goals = GoalBuckets::new(vec![
            Goal::new(5.0, 5.0, 0.25, Shape::Hex),
            Goal::new(5.1, 5.0, 0.25, Shape::Hex),
        ]);
        assert_eq!(goals.claim_near(5.05, 5.0, 0.125), Some(0));
        assert_eq!(goals.claim_near(5.05, 5.0, 0.125), Some(1));
        assert_eq!(goals.claim_near(5.05, 5.0, 0.125), None);
        assert_eq!(goals.fulfilled_count(), 2);

        goals.reset_fulfilled();
        assert_eq!(goals.fulfilled_count(), 0);
        // neighbouring bucket across the cell edge
        assert_eq!(goals.claim_near(4.95, 5.0, 0.1), Some(0));
    }
}
