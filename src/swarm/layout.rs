//! Goal Layout Engine
//!
//! Hexagonal packing of goal slots into the goal region (circle or polygon).
//! Packing is retried with a shrunk region when it came out too loose, and with a
//! grown one when it could not place every slot, up to `MAX_LAYOUT_RETRIES` attempts.
//! A shrink that loses slots falls back to the last attempt that placed all of them.
//! Each attempt works on a scaled copy of the previous candidate region, so scale
//! factors compose multiplicatively and the caller's region is never touched.

use super::goals::Goal;
use crate::geometry::{Region, Shape};
use rand::Rng;
use tracing::{debug, info, warn};

pub const MAX_LAYOUT_RETRIES: u32 = 20;
/// Applied when a packing leaves more than one spare cell of area
pub const SHRINK_FACTOR: f64 = 0.99;
/// Growth factors are drawn from this range when a packing comes up short
pub const GROW_RANGE: std::ops::Range<f64> = 1.0..1.1;

/// Pointy-top hexagonal cell footprint
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HexCell {
    pub circumradius: f64,
    pub apothem: f64,
    pub area: f64,
}

impl HexCell {
    /// Cell that holds one object of the given size (diameter of its circumcircle).
    pub fn for_object(size: f64) -> Self {
        Self::from_circumradius(size / 2.0)
    }

    pub fn from_area(area: f64) -> Self {
        Self::from_circumradius((area / (1.5 * 3f64.sqrt())).sqrt())
    }

    fn from_circumradius(r: f64) -> Self {
        HexCell {
            circumradius: r,
            apothem: r * 3f64.sqrt() / 2.0,
            area: 1.5 * 3f64.sqrt() * r * r,
        }
    }

    pub fn column_spacing(&self) -> f64 {
        2.0 * self.apothem
    }

    pub fn row_spacing(&self) -> f64 {
        1.5 * self.circumradius
    }
}

/// Outcome of a packing run
#[derive(Clone, Debug)]
pub struct GoalLayout {
    pub goals: Vec<Goal>,
    /// Region the final goals were packed into, after recentering
    pub region: Region,
    /// Retries used, at most `MAX_LAYOUT_RETRIES`
    pub attempts: u32,
    pub cell: HexCell,
}

/// Hex-grid centers inside `region`, row by row over its bounding box, stopping at `limit`.
pub fn tile(region: &Region, cell: &HexCell, limit: usize) -> Vec<(f64, f64)> {
    let bounds = region.bounds();
    let dx = cell.column_spacing();
    let dy = cell.row_spacing();
    if !dx.is_finite() || !dy.is_finite() || dx <= 0.0 || dy <= 0.0 {
        return Vec::new();
    }
    let mut centers = Vec::with_capacity(limit);

    let mut row = 0usize;
    let mut y = bounds.min_y + cell.apothem;
    while y <= bounds.max_y && centers.len() < limit {
        let shift = if row % 2 == 1 { cell.apothem } else { 0.0 };
        let mut x = bounds.min_x + cell.apothem + shift;
        while x <= bounds.max_x {
            if region.contains(x, y) {
                centers.push((x, y));
                if centers.len() == limit {
                    break;
                }
            }
            x += dx;
        }
        y += dy;
        row += 1;
    }
    centers
}

fn scaled(region: &Region, factor: f64) -> Region {
    let mut next = region.clone();
    next.scale(factor);
    next
}

/// Pack `needed` goals into `region`, then move the packing so its bounding box is
/// centered on `target_center` (the light grid's true center).
///
/// Fewer than `needed` goals come back only when the retry cap was hit before any
/// attempt placed them all; callers trim
/// their object set to `goals.len()`.
pub fn pack_goals<R: Rng + ?Sized>(
    region: &Region,
    needed: usize,
    cell: HexCell,
    goal_size: f64,
    shape: Shape,
    target_center: (f64, f64),
    rng: &mut R,
) -> GoalLayout {
    let mut candidate = region.clone();
    let mut attempts = 0u32;
    // last attempt that placed every slot, with the region it was tiled in
    let mut full_fit: Option<(Vec<(f64, f64)>, Region)> = None;

    let centers = loop {
        let centers = tile(&candidate, &cell, needed);
        let spare_area = candidate.area() - centers.len() as f64 * cell.area;
        let can_retry = needed > 0 && attempts < MAX_LAYOUT_RETRIES;

        if centers.len() >= needed {
            if spare_area > cell.area && can_retry {
                debug!(
                    "[Layout] attempt {}: {} slots leave {:.3} spare area, shrinking",
                    attempts, needed, spare_area
                );
                full_fit = Some((centers, candidate.clone()));
                candidate = scaled(&candidate, SHRINK_FACTOR);
                attempts += 1;
                continue;
            }
            break centers;
        }

        if let Some((fit, fit_region)) = full_fit.take() {
            debug!(
                "[Layout] attempt {}: shrink left {}/{} slots, keeping the previous fit",
                attempts,
                centers.len(),
                needed
            );
            candidate = fit_region;
            break fit;
        }

        if can_retry {
            let grow = rng.gen_range(GROW_RANGE);
            debug!(
                "[Layout] attempt {}: only {}/{} slots, growing by {:.4}",
                attempts,
                centers.len(),
                needed,
                grow
            );
            candidate = scaled(&candidate, grow);
            attempts += 1;
            continue;
        }
        break centers;
    };

    if centers.len() < needed {
        warn!(
            "[Layout] retry cap reached with {}/{} slots, object set will be trimmed",
            centers.len(),
            needed
        );
    }

    let mut goals: Vec<Goal> = centers
        .into_iter()
        .map(|(x, y)| Goal::new(x, y, goal_size, shape))
        .collect();

    if let Some(b) = crate::geometry::Bounds::of_points(goals.iter().map(|g| (g.x, g.y))) {
        let (bx, by) = b.center();
        let (dx, dy) = (target_center.0 - bx, target_center.1 - by);
        for g in &mut goals {
            g.x += dx;
            g.y += dy;
        }
        candidate.translate(dx, dy);
    }

    info!(
        "[Layout] packed {} goals after {} retries (region area {:.2})",
        goals.len(),
        attempts,
        candidate.area()
    );

    GoalLayout {
        goals,
        region: candidate,
        attempts,
        cell,
    }
}
