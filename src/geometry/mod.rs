//! Geometry Kernel
//!
//! Polygon and vertex primitives used by the light field, the goal layout and the
//! contraction controller. Everything here is plain `f64` math with no simulation state.

pub mod polygon;
pub mod region;

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub use polygon::Polygon;
pub use region::Region;

/// A polygon point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    /// Given by the experimenter, as opposed to synthesized by corner subdivision
    pub user_supplied: bool,
    /// Computed by `Polygon::mark_concave_points`
    pub concave: bool,
}

impl Vertex {
    pub fn new(x: f64, y: f64) -> Self {
        Vertex {
            x,
            y,
            user_supplied: true,
            concave: false,
        }
    }

    pub fn synthesized(x: f64, y: f64) -> Self {
        Vertex {
            x,
            y,
            user_supplied: false,
            concave: false,
        }
    }

    pub fn distance_squared(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        dx * dx + dy * dy
    }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Bounds of a point set, `None` when empty.
    pub fn of_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = points.into_iter();
        let (x0, y0) = iter.next()?;
        let mut b = Bounds {
            min_x: x0,
            min_y: y0,
            max_x: x0,
            max_y: y0,
        };
        for (x, y) in iter {
            b.min_x = b.min_x.min(x);
            b.min_y = b.min_y.min(y);
            b.max_x = b.max_x.max(x);
            b.max_y = b.max_y.max(y);
        }
        Some(b)
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Footprint shape shared by robots, boxes and goals.
/// The discriminant is the shape number used in snapshot GOALS sections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    Rect = 0,
    Hex = 1,
    Circle = 2,
}

impl Shape {
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'R' => Some(Shape::Rect),
            'H' => Some(Shape::Hex),
            'C' => Some(Shape::Circle),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Shape::Rect => 'R',
            Shape::Hex => 'H',
            Shape::Circle => 'C',
        }
    }

    pub fn from_index(i: u32) -> Option<Self> {
        match i {
            0 => Some(Shape::Rect),
            1 => Some(Shape::Hex),
            2 => Some(Shape::Circle),
            _ => None,
        }
    }

    pub fn index(self) -> u32 {
        self as u32
    }

    /// Footprint area of a body of this shape with the given size (side / diameter).
    pub fn area(self, size: f64) -> f64 {
        let r = size / 2.0;
        match self {
            Shape::Rect => size * size,
            Shape::Hex => 1.5 * 3f64.sqrt() * r * r,
            Shape::Circle => PI * r * r,
        }
    }
}

/// Point-segment distance with the projection parameter clamped to [0, 1].
pub fn distance_to_segment(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let ex = bx - ax;
    let ey = by - ay;
    let len2 = ex * ex + ey * ey;
    let t = if len2 > 0.0 {
        (((px - ax) * ex + (py - ay) * ey) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let cx = ax + t * ex;
    let cy = ay + t * ey;
    (px - cx).hypot(py - cy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        assert!((distance_to_segment(0.5, 1.0, 0.0, 0.0, 1.0, 0.0) - 1.0).abs() < 1e-12);
        assert!((distance_to_segment(3.0, 4.0, 0.0, 0.0, 0.0, 0.0) - 5.0).abs() < 1e-12);
        assert!((distance_to_segment(-3.0, 4.0, 0.0, 0.0, 1.0, 0.0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn shape_codes() {
        for shape in [Shape::Rect, Shape::Hex, Shape::Circle] {
            assert_eq!(Shape::from_char(shape.as_char()), Some(shape));
            assert_eq!(Shape::from_index(shape.index()), Some(shape));
        }
        assert_eq!(Shape::from_char('x'), None);
        assert!((Shape::Rect.area(2.0) - 4.0).abs() < 1e-12);
    }
}
