use crate::core::error::{PushError, Result};
use crate::geometry::{Polygon, Region};
use rand::Rng;

/// One controllable point light hanging above the arena.
#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    pub x: f64,
    pub y: f64,
    pub height: f64,
    /// In [0, 1]. The only field that changes during a run.
    pub intensity: f64,
    /// `column + row * side`
    pub index: usize,
}

/// Virtual light field.
/// A fixed square grid of lights: the robots' only sensor input and the experimenter's
/// only actuator. Row-major, `side * side` lights, each at its cell center.
pub struct LightField {
    lights: Vec<Light>,
    side: usize,
    width: f64,
    height: f64,
}

impl LightField {
    /// Build a `floor(sqrt(num_lights))`-wide grid with every light off.
    pub fn new(width: f64, height: f64, num_lights: usize, light_height: f64) -> Result<Self> {
        let side = (num_lights as f64).sqrt().floor() as usize;
        if side == 0 {
            return Err(PushError::InvalidConfig("light grid needs at least one light"));
        }
        let dx = width / side as f64;
        let dy = height / side as f64;

        let mut lights = Vec::with_capacity(side * side);
        for row in 0..side {
            for col in 0..side {
                lights.push(Light {
                    x: col as f64 * dx + dx / 2.0,
                    y: row as f64 * dy + dy / 2.0,
                    height: light_height,
                    intensity: 0.0,
                    index: col + row * side,
                });
            }
        }

        Ok(Self {
            lights,
            side,
            width,
            height,
        })
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Spacing between neighbouring lights along x and y
    pub fn cell_size(&self) -> (f64, f64) {
        (self.width / self.side as f64, self.height / self.side as f64)
    }

    /// Midpoint of the outermost light positions.
    /// This is where packed goals are centered, so they line up with the actuation grid.
    pub fn true_center(&self) -> (f64, f64) {
        let first = &self.lights[0];
        let last = &self.lights[self.lights.len() - 1];
        ((first.x + last.x) / 2.0, (first.y + last.y) / 2.0)
    }

    /// Out-of-range indices are ignored: grid math near the walls may step one cell out.
    pub fn set_intensity(&mut self, index: usize, value: f64) {
        if let Some(light) = self.lights.get_mut(index) {
            light.intensity = value;
        }
    }

    pub fn intensity(&self, index: usize) -> f64 {
        self.lights.get(index).map_or(0.0, |l| l.intensity)
    }

    pub fn clear(&mut self) {
        self.lights.iter_mut().for_each(|l| l.intensity = 0.0);
    }

    /// Non-zero lights as `(index, intensity)`, ascending by index.
    pub fn active(&self) -> Vec<(usize, f64)> {
        self.lights
            .iter()
            .filter(|l| l.intensity != 0.0)
            .map(|l| (l.index, l.intensity))
            .collect()
    }

    /// Zero the whole grid, then apply a sparse list. Absent indices stay dark.
    pub fn load_sparse(&mut self, entries: &[(usize, f64)]) {
        self.clear();
        for &(index, value) in entries {
            self.set_intensity(index, value);
        }
    }

    /// Instantaneous brightness at a world point.
    ///
    /// Only lights inside a `width / 5` window contribute. Each lit light adds
    /// `intensity / d²` weighted by the sine of its elevation angle, `d` being the
    /// 3-D distance to the light.
    pub fn intensity_at(&self, x: f64, y: f64) -> f64 {
        let max_dist = self.width / 5.0;
        let scale_x = self.side as f64 / self.width;
        let scale_y = self.side as f64 / self.height;

        let lx = (x * scale_x).floor() as i64;
        let ly = (y * scale_y).floor() as i64;
        let half_x = (max_dist * scale_x) as i64;
        let half_y = (max_dist * scale_y) as i64;
        let last = self.side as i64 - 1;

        let mut total = 0.0;
        for row in (ly - half_y).max(0)..=(ly + half_y).min(last) {
            for col in (lx - half_x).max(0)..=(lx + half_x).min(last) {
                let light = &self.lights[(col + row * self.side as i64) as usize];
                if light.intensity == 0.0 {
                    continue;
                }

                let dx = x - light.x;
                let dy = y - light.y;
                if dx.abs() > max_dist || dy.abs() > max_dist {
                    continue;
                }

                let dz = light.height;
                let dist_squared = dx * dx + dy * dy + dz * dz;
                let elevation = dz.atan2(dx.hypot(dy));
                total += light.intensity / dist_squared * elevation.sin();
            }
        }
        total
    }

    /// Light every cell whose center lies within the band around the region boundary,
    /// thinned by an independent Bernoulli draw against `probability_on`.
    ///
    /// The band half-width is `max(max(cell_dx, cell_dy) / 2, band_width)`. In polygon
    /// mode with `drag_fraction > 0` a share of the lit cells closest to the
    /// user-supplied corners is switched back off. Returns the number of lit cells.
    pub fn update_pattern<R: Rng + ?Sized>(
        &mut self,
        region: &Region,
        probability_on: f64,
        band_width: f64,
        drag_fraction: f64,
        rng: &mut R,
    ) -> usize {
        let (dx, dy) = self.cell_size();
        let tolerance = (dx.max(dy) / 2.0).max(band_width);
        let p = probability_on.clamp(0.0, 1.0);

        let mut lit = Vec::new();
        for light in &mut self.lights {
            let in_band = region.boundary_distance(light.x, light.y) < tolerance;
            let on = in_band && rng.gen_bool(p);
            light.intensity = if on { 1.0 } else { 0.0 };
            if on {
                lit.push(light.index);
            }
        }

        if drag_fraction > 0.0 {
            if let Region::Polygon(polygon) = region {
                let dragged = self.drag_from_corners(polygon, &lit, drag_fraction, tolerance);
                return lit.len() - dragged;
            }
        }
        lit.len()
    }

    /// Switch off the lit cells nearest to user corners. Cells near concave corners go
    /// first, then by squared distance. Never darkens the whole pattern.
    fn drag_from_corners(
        &mut self,
        polygon: &Polygon,
        lit: &[usize],
        fraction: f64,
        tolerance: f64,
    ) -> usize {
        let corner_radius_sq = (2.0 * tolerance) * (2.0 * tolerance);

        let mut near: Vec<(bool, f64, usize)> = lit
            .iter()
            .filter_map(|&index| {
                let light = &self.lights[index];
                polygon
                    .user_vertices()
                    .map(|v| (v.distance_squared(light.x, light.y), v.concave))
                    .min_by(|a, b| a.0.total_cmp(&b.0))
                    .filter(|(d2, _)| *d2 <= corner_radius_sq)
                    .map(|(d2, concave)| (!concave, d2, index))
            })
            .collect();

        if near.is_empty() || lit.len() < 2 {
            return 0;
        }
        near.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));

        let count = ((near.len() as f64 * fraction).round() as usize).min(lit.len() - 1);
        for &(_, _, index) in near.iter().take(count) {
            self.lights[index].intensity = 0.0;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn field() -> LightField {
        LightField::new(32.0, 32.0, 32 * 32, 2.0).unwrap()
    }

    #[test]
    fn grid_layout_is_row_major_at_cell_centers() {
        let f = field();
        assert_eq!(f.side(), 32);
        assert_eq!(f.len(), 1024);
        let l = &f.lights()[3 + 2 * 32];
        assert_eq!(l.index, 3 + 2 * 32);
        assert_eq!((l.x, l.y), (3.5, 2.5));
        assert_eq!(f.true_center(), (16.0, 16.0));
    }

    #[test]
    fn out_of_range_write_is_ignored() {
        let mut f = field();
        f.set_intensity(5000, 1.0);
        assert!(f.active().is_empty());
        assert_eq!(f.intensity(5000), 0.0);
    }

    #[test]
    fn brightness_directly_below_a_light() {
        let mut f = field();
        f.set_intensity(0, 1.0);
        // 1 / h² with a vertical elevation
        assert!((f.intensity_at(0.5, 0.5) - 0.25).abs() < 1e-12);
        assert!(f.intensity_at(3.0, 0.5) < 0.25);
        // beyond width / 5 the light is cut off
        assert_eq!(f.intensity_at(10.0, 0.5), 0.0);
    }

    #[test]
    fn dark_field_reads_zero() {
        let f = field();
        assert_eq!(f.intensity_at(16.0, 16.0), 0.0);
    }

    #[test]
    fn sparse_round_trip() {
        let mut f = field();
        f.set_intensity(7, 1.0);
        f.set_intensity(512, 0.25);
        f.set_intensity(1023, 0.5);
        let sparse = f.active();

        let mut other = field();
        other.set_intensity(3, 1.0);
        other.load_sparse(&sparse);
        assert_eq!(other.active(), sparse);
        assert_eq!(other.intensity(3), 0.0);
    }

    #[test]
    fn probability_bounds_pattern() {
        let mut f = field();
        let mut rng = StdRng::seed_from_u64(1);
        let ring = Region::circle(16.0, 16.0, 10.0);

        let all = f.update_pattern(&ring, 1.0, 1.0, 0.0, &mut rng);
        let qualifying = f
            .lights()
            .iter()
            .filter(|l| ring.boundary_distance(l.x, l.y) < 1.0)
            .count();
        assert_eq!(all, qualifying);
        assert!(all > 0);

        assert_eq!(f.update_pattern(&ring, 0.0, 1.0, 0.0, &mut rng), 0);
        assert!(f.active().is_empty());

        let thinned = f.update_pattern(&ring, 0.5, 1.0, 0.0, &mut rng);
        assert!(thinned > 0 && thinned < all);
    }

    #[test]
    fn drag_darkens_cells_near_corners() {
        let mut f = field();
        let mut rng = StdRng::seed_from_u64(2);
        let square = Region::Polygon(
            Polygon::from_points(&[(6.0, 6.0), (26.0, 6.0), (26.0, 26.0), (6.0, 26.0)]).unwrap(),
        );

        let full = f.update_pattern(&square, 1.0, 1.0, 0.0, &mut rng);
        let dragged = f.update_pattern(&square, 1.0, 1.0, 0.5, &mut rng);
        assert!(dragged < full);
        assert_eq!(dragged, f.active().len());

        // the exact corner cell goes dark, a mid-edge cell stays lit
        let corner = 5 + 5 * 32;
        let mid_edge = 16 + 5 * 32;
        assert_eq!(f.intensity(corner), 0.0);
        assert_eq!(f.intensity(mid_edge), 1.0);
    }
}
