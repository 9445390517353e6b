//! Containment region: either a circle around a center or a full polygon.
//!
//! The controller, the light pattern and the evaluator all dispatch through this
//! one type instead of branching on "do we have a polygon" everywhere.

use super::{Bounds, Polygon};
use crate::core::error::Result;
use std::f64::consts::PI;

#[derive(Clone, Debug, PartialEq)]
pub enum Region {
    Circle { cx: f64, cy: f64, radius: f64 },
    Polygon(Polygon),
}

impl Region {
    pub fn circle(cx: f64, cy: f64, radius: f64) -> Self {
        Region::Circle { cx, cy, radius }
    }

    pub fn is_polygon(&self) -> bool {
        matches!(self, Region::Polygon(_))
    }

    pub fn as_polygon(&self) -> Option<&Polygon> {
        match self {
            Region::Polygon(p) => Some(p),
            Region::Circle { .. } => None,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        match self {
            Region::Circle { cx, cy, radius } => (x - cx).hypot(y - cy) <= *radius,
            Region::Polygon(p) => p.contains(x, y),
        }
    }

    /// Unsigned distance from the point to the region boundary.
    pub fn boundary_distance(&self, x: f64, y: f64) -> f64 {
        match self {
            Region::Circle { cx, cy, radius } => ((x - cx).hypot(y - cy) - radius).abs(),
            Region::Polygon(p) => p.distance_to_boundary(x, y),
        }
    }

    pub fn area(&self) -> f64 {
        match self {
            Region::Circle { radius, .. } => PI * radius * radius,
            Region::Polygon(p) => p.area(),
        }
    }

    /// Radius for circles, equal-area radius for polygons.
    pub fn effective_radius(&self) -> f64 {
        match self {
            Region::Circle { radius, .. } => *radius,
            Region::Polygon(p) => p.effective_radius(),
        }
    }

    /// Circle center, or the polygon centroid.
    pub fn center(&self) -> Result<(f64, f64)> {
        match self {
            Region::Circle { cx, cy, .. } => Ok((*cx, *cy)),
            Region::Polygon(p) => {
                let c = p.centroid()?;
                Ok((c.x, c.y))
            }
        }
    }

    /// Grow (> 1) or shrink (< 1). Circles scale their radius, polygons scale about
    /// their origin.
    pub fn scale(&mut self, factor: f64) {
        match self {
            Region::Circle { radius, .. } => *radius *= factor,
            Region::Polygon(p) => p.scale(factor),
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            Region::Circle { cx, cy, .. } => {
                *cx += dx;
                *cy += dy;
            }
            Region::Polygon(p) => p.translate(dx, dy, true),
        }
    }

    pub fn bounds(&self) -> Bounds {
        match self {
            Region::Circle { cx, cy, radius } => Bounds {
                min_x: cx - radius,
                min_y: cy - radius,
                max_x: cx + radius,
                max_y: cy + radius,
            },
            Region::Polygon(p) => p.bounds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_and_polygon_dispatch_agree_on_square_inscribed_point() {
        let circle = Region::circle(5.0, 5.0, 5.0);
        let square = Region::Polygon(
            Polygon::from_points(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]).unwrap(),
        );
        for region in [&circle, &square] {
            assert!(region.contains(5.0, 6.0));
            assert!(!region.contains(-1.0, 5.0));
            assert!((region.boundary_distance(5.0, 1.0) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn scaling_circle_changes_radius_only() {
        let mut r = Region::circle(1.0, 2.0, 4.0);
        r.scale(0.5);
        assert_eq!(r, Region::circle(1.0, 2.0, 2.0));
        assert!((r.area() - PI * 4.0).abs() < 1e-12);
        r.translate(1.0, 1.0);
        assert_eq!(r.center().unwrap(), (2.0, 3.0));
    }
}
