//! Target polygons.
//!
//! Two instances live through a run: the arena polygon (what the experimenter asked
//! for) and the goal polygon, a working copy that the packer scales until the packed
//! slots fill it. Both are built through `Polygon::new`, which rejects fewer than three
//! vertices, so every query below may assume a closed shape.

use super::{distance_to_segment, Bounds, Vertex};
use crate::core::error::{PushError, Result};
use std::f64::consts::PI;
use std::path::Path;

#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    /// Boundary order, wrapping last -> first
    vertices: Vec<Vertex>,
    /// Default pivot for `scale`. Independent from the centroid.
    pub origin_x: f64,
    pub origin_y: f64,
}

impl Polygon {
    pub fn new(vertices: Vec<Vertex>) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(PushError::DegeneratePolygon {
                vertices: vertices.len(),
            });
        }
        Ok(Polygon {
            vertices,
            origin_x: 0.0,
            origin_y: 0.0,
        })
    }

    pub fn from_points(points: &[(f64, f64)]) -> Result<Self> {
        Self::new(points.iter().map(|&(x, y)| Vertex::new(x, y)).collect())
    }

    /// Parse a polygon definition: one `x y` (or `x,y`) vertex per line.
    /// Blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut vertices = Vec::new();
        for (i, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let cleaned = line.replace(',', " ");
            let fields: Vec<&str> = cleaned.split_whitespace().collect();
            if fields.len() != 2 {
                return Err(PushError::MalformedPolygon {
                    line: i + 1,
                    reason: format!("expected 2 coordinates, found {}", fields.len()),
                });
            }
            let mut coords = [0.0; 2];
            for (slot, field) in coords.iter_mut().zip(&fields) {
                *slot = field.parse().map_err(|_| PushError::MalformedPolygon {
                    line: i + 1,
                    reason: format!("{:?} is not a number", field),
                })?;
            }
            vertices.push(Vertex::new(coords[0], coords[1]));
        }
        Self::new(vertices)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn origin(&self) -> (f64, f64) {
        (self.origin_x, self.origin_y)
    }

    pub fn set_origin(&mut self, x: f64, y: f64) {
        self.origin_x = x;
        self.origin_y = y;
    }

    pub fn user_vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter().filter(|v| v.user_supplied)
    }

    /// Consecutive vertex pairs, including the closing edge.
    fn edges(&self) -> impl Iterator<Item = (&Vertex, &Vertex)> {
        let n = self.vertices.len();
        (0..n).map(move |i| (&self.vertices[i], &self.vertices[(i + 1) % n]))
    }

    /// Shoelace sum. Positive for counter-clockwise winding.
    pub fn signed_area(&self) -> f64 {
        self.edges().map(|(a, b)| a.x * b.y - b.x * a.y).sum::<f64>() / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Radius of the circle with the same area.
    pub fn effective_radius(&self) -> f64 {
        (self.area() / PI).sqrt()
    }

    pub fn centroid(&self) -> Result<Vertex> {
        let a = self.signed_area();
        if a == 0.0 {
            return Err(PushError::DegenerateArea);
        }
        let (mut cx, mut cy) = (0.0, 0.0);
        for (p, q) in self.edges() {
            let cross = p.x * q.y - q.x * p.y;
            cx += (p.x + q.x) * cross;
            cy += (p.y + q.y) * cross;
        }
        Ok(Vertex::synthesized(cx / (6.0 * a), cy / (6.0 * a)))
    }

    /// Shift every vertex. With `recenter_origin` the pivot moves along,
    /// otherwise it stays where it was.
    pub fn translate(&mut self, dx: f64, dy: f64, recenter_origin: bool) {
        for v in &mut self.vertices {
            v.x += dx;
            v.y += dy;
        }
        if recenter_origin {
            self.origin_x += dx;
            self.origin_y += dy;
        }
    }

    /// Scale about the polygon origin.
    pub fn scale(&mut self, factor: f64) {
        let (px, py) = self.origin();
        self.scale_about(factor, px, py);
    }

    pub fn scale_about(&mut self, factor: f64, px: f64, py: f64) {
        for v in &mut self.vertices {
            v.x = (v.x - px) * factor + px;
            v.y = (v.y - py) * factor + py;
        }
    }

    pub fn distance_to_boundary(&self, x: f64, y: f64) -> f64 {
        self.edges()
            .map(|(a, b)| distance_to_segment(x, y, a.x, a.y, b.x, b.y))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn average_distance_to_vertices(&self, x: f64, y: f64) -> f64 {
        let total: f64 = self.vertices.iter().map(|v| (v.x - x).hypot(v.y - y)).sum();
        total / self.vertices.len() as f64
    }

    /// Even-odd ray casting. Self-intersecting input gives unspecified answers.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > y) != (b.y > y) && x < (b.x - a.x) * (y - a.y) / (b.y - a.y) + a.x {
                inside = !inside;
            }
        }
        inside
    }

    pub fn bounds(&self) -> Bounds {
        let b = Bounds::of_points(self.vertices.iter().map(|v| (v.x, v.y)));
        // new() guarantees at least three vertices
        b.unwrap_or(Bounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 0.0,
            max_y: 0.0,
        })
    }

    /// Subdivide every edge and flare its midpoint away from the origin.
    ///
    /// The midpoint after vertex `i` is pushed out by `max(1, 90 * flare / angle_i)`,
    /// where `angle_i` is the corner angle at `i` in degrees. Right-angle corners with
    /// `flare = 1` stay put; sharper corners move out; shallow ones are clamped to 1.
    /// Original vertices keep their identity and order, interleaved with the new ones.
    pub fn prime_corners(&mut self, flare: f64) {
        let n = self.vertices.len();
        let (ox, oy) = self.origin();
        let mut primed = Vec::with_capacity(2 * n);

        for i in 0..n {
            let prev = self.vertices[(i + n - 1) % n];
            let cur = self.vertices[i];
            let next = self.vertices[(i + 1) % n];

            let angle = corner_angle_degrees(&prev, &cur, &next);
            let push = if angle > f64::EPSILON && flare > 0.0 {
                (90.0 * flare / angle).max(1.0)
            } else {
                1.0
            };

            let mx = (cur.x + next.x) / 2.0;
            let my = (cur.y + next.y) / 2.0;
            primed.push(cur);
            primed.push(Vertex::synthesized((mx - ox) * push + ox, (my - oy) * push + oy));
        }

        self.vertices = primed;
    }

    /// Flag vertices whose signed turn, normalised to the polygon winding, is not positive.
    pub fn mark_concave_points(&mut self) {
        let n = self.vertices.len();
        let winding = self.signed_area().signum();
        let turns: Vec<f64> = (0..n)
            .map(|i| {
                let prev = &self.vertices[(i + n - 1) % n];
                let cur = &self.vertices[i];
                let next = &self.vertices[(i + 1) % n];
                let (ax, ay) = (cur.x - prev.x, cur.y - prev.y);
                let (bx, by) = (next.x - cur.x, next.y - cur.y);
                (ax * by - ay * bx) * winding
            })
            .collect();
        for (v, turn) in self.vertices.iter_mut().zip(turns) {
            v.concave = turn <= 0.0;
        }
    }
}

/// Angle between the two edges meeting at `cur`, in [0, 180].
fn corner_angle_degrees(prev: &Vertex, cur: &Vertex, next: &Vertex) -> f64 {
    let (ax, ay) = (prev.x - cur.x, prev.y - cur.y);
    let (bx, by) = (next.x - cur.x, next.y - cur.y);
    let cross = ax * by - ay * bx;
    let dot = ax * bx + ay * by;
    cross.atan2(dot).abs().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(side: f64) -> Polygon {
        Polygon::from_points(&[(0.0, 0.0), (side, 0.0), (side, side), (0.0, side)]).unwrap()
    }

    #[test]
    fn rejects_degenerate_input() {
        assert!(matches!(
            Polygon::from_points(&[(0.0, 0.0), (1.0, 1.0)]),
            Err(PushError::DegeneratePolygon { vertices: 2 })
        ));
        assert!(Polygon::parse("1 2\n3 4\n").is_err());
    }

    #[test]
    fn parses_definition_file() {
        let poly = Polygon::parse("# L shape\n0 0\n4,0\n\n4 1 # foot\n1 1\n1 4\n0 4\n").unwrap();
        assert_eq!(poly.len(), 6);
        assert!((poly.area() - 7.0).abs() < 1e-12);

        let err = Polygon::parse("0 0\n1 x\n").unwrap_err();
        assert!(matches!(err, PushError::MalformedPolygon { line: 2, .. }));
    }

    #[test]
    fn area_and_centroid() {
        let poly = square(10.0);
        assert!((poly.area() - 100.0).abs() < 1e-12);
        assert!(poly.signed_area() > 0.0);
        let c = poly.centroid().unwrap();
        assert!((c.x - 5.0).abs() < 1e-12 && (c.y - 5.0).abs() < 1e-12);

        let flat = Polygon::from_points(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]).unwrap();
        assert!(matches!(flat.centroid(), Err(PushError::DegenerateArea)));
    }

    #[test]
    fn scaled_area_is_quadratic() {
        let base = Polygon::from_points(&[(1.0, 1.0), (7.0, 2.0), (5.0, 6.0), (2.0, 5.0)]).unwrap();
        for k in [0.1, 0.5, 0.99, 1.0, 1.07, 3.0] {
            let mut poly = base.clone();
            poly.set_origin(3.0, -2.0);
            poly.scale(k);
            let expected = base.area() * k * k;
            assert!((poly.area() - expected).abs() < 1e-9 * expected.max(1.0), "k = {}", k);
        }
    }

    #[test]
    fn translate_round_trip_restores_origin() {
        let mut poly = square(4.0);
        poly.set_origin(2.0, 2.0);
        let before = poly.clone();
        poly.translate(3.5, -1.25, true);
        assert_eq!(poly.origin(), (5.5, 0.75));
        poly.translate(-3.5, 1.25, true);
        assert_eq!(poly, before);

        poly.translate(1.0, 1.0, false);
        assert_eq!(poly.origin(), (2.0, 2.0));
    }

    #[test]
    fn containment_and_boundary_distance() {
        let poly = square(10.0);
        assert!(poly.contains(5.0, 5.0));
        assert!(!poly.contains(11.0, 5.0));
        assert!(!poly.contains(-0.5, 5.0));
        assert!((poly.distance_to_boundary(5.0, 2.0) - 2.0).abs() < 1e-12);
        assert!((poly.distance_to_boundary(13.0, 14.0) - 5.0).abs() < 1e-12);

        // shrinking about a far pivot eventually excludes the point
        let mut shrinking = poly.clone();
        let mut excluded = false;
        for _ in 0..200 {
            shrinking.scale_about(0.9, 100.0, 100.0);
            if !shrinking.contains(5.0, 5.0) {
                excluded = true;
                break;
            }
            assert!(shrinking.distance_to_boundary(5.0, 5.0) >= 0.0);
        }
        assert!(excluded);
    }

    #[test]
    fn concave_notch_contains() {
        let poly = Polygon::from_points(&[
            (0.0, 0.0),
            (4.0, 0.0),
            (4.0, 4.0),
            (2.0, 1.0),
            (0.0, 4.0),
        ])
        .unwrap();
        assert!(poly.contains(1.0, 1.0));
        assert!(!poly.contains(2.0, 3.0));
    }

    #[test]
    fn average_vertex_distance() {
        let poly = square(2.0);
        let expected = 2f64.sqrt();
        assert!((poly.average_distance_to_vertices(1.0, 1.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn priming_square_keeps_midpoints() {
        let mut poly = square(10.0);
        poly.set_origin(5.0, 5.0);
        let original = poly.clone();
        poly.prime_corners(1.0);

        assert_eq!(poly.len(), 8);
        for (i, v) in poly.vertices().iter().enumerate() {
            if i % 2 == 0 {
                assert_eq!(*v, original.vertices()[i / 2]);
            } else {
                let a = original.vertices()[i / 2];
                let b = original.vertices()[(i / 2 + 1) % 4];
                assert!(!v.user_supplied);
                assert!((v.x - (a.x + b.x) / 2.0).abs() < 1e-12);
                assert!((v.y - (a.y + b.y) / 2.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn priming_flares_sharp_corners_only() {
        // 45 degree corner at the origin, shallow corner at (10, 0)
        let mut poly =
            Polygon::from_points(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.2), (10.0, 10.0)]).unwrap();
        poly.set_origin(0.0, 0.0);
        poly.prime_corners(1.0);

        // midpoint after the 45 degree corner is pushed out twice as far
        let m0 = poly.vertices()[1];
        assert!((m0.x - 10.0).abs() < 1e-9 && m0.y.abs() < 1e-9);

        // near-180 corner clamps to 1
        let m1 = poly.vertices()[3];
        assert!((m1.x - 15.0).abs() < 1e-9 && (m1.y - 0.1).abs() < 1e-9);
    }

    #[test]
    fn marks_concave_vertices_for_either_winding() {
        let notch = [(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (2.0, 1.0), (0.0, 4.0)];
        let mut ccw = Polygon::from_points(&notch).unwrap();
        ccw.mark_concave_points();
        let flags: Vec<bool> = ccw.vertices().iter().map(|v| v.concave).collect();
        assert_eq!(flags, vec![false, false, false, true, false]);

        let reversed: Vec<(f64, f64)> = notch.iter().rev().copied().collect();
        let mut cw = Polygon::from_points(&reversed).unwrap();
        cw.mark_concave_points();
        let flags: Vec<bool> = cw.vertices().iter().map(|v| v.concave).collect();
        assert_eq!(flags, vec![false, true, false, false, false]);
    }
}
