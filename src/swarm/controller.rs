//! Contraction Controller
//!
//! Every `interval` ticks the controller moves the containment boundary one step and
//! pushes a fresh light pattern. The boundary contracts until it falls below RADMIN,
//! dwells there for `hold_ticks` control updates, then dilates until it passes RADMAX
//! and starts contracting again.
//!
//! With `switch_to_circle` a polygon run hands over to plain radial guidance once the
//! dilating polygon is wider than `width / 8`, and goes back to the polygon when the
//! next contraction begins.

use super::light_field::LightField;
use crate::core::config::{ControlConfig, PopulationConfig};
use crate::core::error::Result;
use crate::geometry::{Polygon, Region};
use rand::Rng;
use std::f64::consts::PI;
use tracing::{debug, info};

/// Effective-radius limits the controller never crosses for long.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContainmentBounds {
    pub rad_min: f64,
    pub rad_max: f64,
}

impl ContainmentBounds {
    /// RADMIN is the radius of a disc holding every box and robot footprint.
    /// RADMAX sits one unit inside the arena, and never below `RADMIN + band_width`.
    pub fn compute(
        population: &PopulationConfig,
        box_count: usize,
        width: f64,
        height: f64,
        band_width: f64,
    ) -> Self {
        let occupied = box_count as f64 * population.box_shape.area(population.box_size)
            + population.robots as f64 * population.robot_shape.area(population.robot_size);
        let rad_min = (occupied / PI).sqrt();
        let rad_max = (width.min(height) / 2.0 - 1.0).max(rad_min + band_width);
        ContainmentBounds { rad_min, rad_max }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Contracting,
    /// Dwelling below RADMIN, counting control updates down
    Holding { remaining: u32 },
    Expanding,
}

pub struct ContractionController {
    region: Region,
    /// Polygon parked while circle guidance is in charge
    parked: Option<Polygon>,
    phase: Phase,
    bounds: ContainmentBounds,
    /// Additive radius step, negative while contracting
    delta: f64,
    /// Multiplicative polygon step, below 1 while contracting
    scale_delta: f64,
    interval: u64,
    hold_ticks: u32,
    probability_on: f64,
    band_width: f64,
    drag: f64,
    switch_radius: Option<f64>,
    updates: u64,
}

impl ContractionController {
    /// Prepare the starting boundary at RADMAX.
    ///
    /// Polygons are pivoted on their centroid, primed with the flare factor and
    /// classified for dragging. A zero-area polygon is refused.
    pub fn new(
        region: Region,
        bounds: ContainmentBounds,
        control: &ControlConfig,
        band_width: f64,
        arena_width: f64,
    ) -> Result<Self> {
        let region = match region {
            Region::Circle { cx, cy, .. } => Region::circle(cx, cy, bounds.rad_max),
            Region::Polygon(mut polygon) => {
                let c = polygon.centroid()?;
                polygon.set_origin(c.x, c.y);
                if control.flare > 0.0 {
                    polygon.prime_corners(control.flare);
                }
                polygon.mark_concave_points();
                let r = polygon.effective_radius();
                if r > 0.0 {
                    polygon.scale(bounds.rad_max / r);
                }
                Region::Polygon(polygon)
            }
        };

        info!(
            "🎛️ [Controller] {} guidance, RADMIN {:.3}, RADMAX {:.3}, every {} ticks",
            if region.is_polygon() { "polygon" } else { "circle" },
            bounds.rad_min,
            bounds.rad_max,
            control.interval
        );

        Ok(ContractionController {
            region,
            parked: None,
            phase: Phase::Contracting,
            bounds,
            delta: -control.radius_step,
            scale_delta: control.scale_step,
            interval: control.interval.max(1),
            hold_ticks: control.hold_ticks,
            probability_on: control.probability_on,
            band_width,
            drag: control.drag,
            switch_radius: control.switch_to_circle.then_some(arena_width / 8.0),
            updates: 0,
        })
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn bounds(&self) -> ContainmentBounds {
        self.bounds
    }

    pub fn scale_delta(&self) -> f64 {
        self.scale_delta
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn using_polygon(&self) -> bool {
        self.region.is_polygon()
    }

    /// Current effective radius of the boundary
    pub fn radius(&self) -> f64 {
        self.region.effective_radius()
    }

    /// Run a control update if `step` falls on the control interval.
    pub fn tick<R: Rng + ?Sized>(&mut self, step: u64, field: &mut LightField, rng: &mut R) -> bool {
        if step % self.interval != 0 {
            return false;
        }
        self.update(field, rng);
        true
    }

    /// One control update: move the boundary, switch phase or mode if a limit was
    /// crossed, then rewrite the light pattern. Returns the number of lit cells.
    pub fn update<R: Rng + ?Sized>(&mut self, field: &mut LightField, rng: &mut R) -> usize {
        self.updates += 1;
        match self.phase {
            Phase::Holding { remaining } => {
                self.phase = if remaining <= 1 {
                    info!("[Controller] hold over, dilating from {:.3}", self.radius());
                    Phase::Expanding
                } else {
                    Phase::Holding {
                        remaining: remaining - 1,
                    }
                };
            }
            Phase::Contracting | Phase::Expanding => {
                self.step_boundary();
                self.check_limits();
            }
        }

        let lit = field.update_pattern(
            &self.region,
            self.probability_on,
            self.band_width,
            self.drag,
            rng,
        );
        debug!(
            "[Controller] update {}: {:?}, radius {:.3}, {} lights on",
            self.updates,
            self.phase,
            self.radius(),
            lit
        );
        lit
    }

    fn step_boundary(&mut self) {
        match &mut self.region {
            Region::Circle { radius, .. } => *radius = (*radius + self.delta).max(0.0),
            Region::Polygon(polygon) => polygon.scale(self.scale_delta),
        }
    }

    fn flip_direction(&mut self) {
        self.delta = -self.delta;
        self.scale_delta = 2.0 - self.scale_delta;
    }

    fn check_limits(&mut self) {
        let r = self.radius();
        match self.phase {
            Phase::Contracting if r < self.bounds.rad_min => {
                self.flip_direction();
                self.phase = if self.hold_ticks > 0 {
                    Phase::Holding {
                        remaining: self.hold_ticks,
                    }
                } else {
                    Phase::Expanding
                };
                info!(
                    "[Controller] radius {:.3} below RADMIN {:.3}, {:?}",
                    r, self.bounds.rad_min, self.phase
                );
            }
            Phase::Expanding if r > self.bounds.rad_max => {
                self.flip_direction();
                self.phase = Phase::Contracting;
                self.restore_polygon();
                info!(
                    "[Controller] radius {:.3} above RADMAX {:.3}, contracting",
                    r, self.bounds.rad_max
                );
            }
            Phase::Expanding => self.maybe_switch_to_circle(r),
            _ => {}
        }
    }

    fn maybe_switch_to_circle(&mut self, r: f64) {
        let Some(threshold) = self.switch_radius else {
            return;
        };
        if r <= threshold {
            return;
        }
        if let Region::Polygon(polygon) = &self.region {
            let (cx, cy) = polygon.origin();
            let parked = polygon.clone();
            self.region = Region::circle(cx, cy, r);
            self.parked = Some(parked);
            info!("[Controller] switching to circle guidance at radius {:.3}", r);
        }
    }

    /// Bring a parked polygon back, scaled to the circle it handed over to.
    fn restore_polygon(&mut self) {
        if let Some(mut polygon) = self.parked.take() {
            let target = self.radius();
            let r = polygon.effective_radius();
            if r > 0.0 {
                polygon.scale(target / r);
            }
            self.region = Region::Polygon(polygon);
            info!("[Controller] back to polygon guidance at radius {:.3}", target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimConfig;
    use crate::core::error::PushError;
    use crate::geometry::Shape;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn field() -> LightField {
        LightField::new(32.0, 32.0, 1024, 2.0).unwrap()
    }

    fn control(hold_ticks: u32) -> ControlConfig {
        let mut c = SimConfig::default().control;
        c.hold_ticks = hold_ticks;
        c
    }

    const BOUNDS: ContainmentBounds = ContainmentBounds {
        rad_min: 5.0,
        rad_max: 16.0,
    };

    #[test]
    fn default_bounds() {
        let cfg = SimConfig::default();
        let b = ContainmentBounds::compute(&cfg.population, 512, 32.0, 32.0, cfg.band_width());
        let occupied = 512.0 * Shape::Hex.area(0.25) + 128.0 * Shape::Circle.area(0.35);
        assert!((b.rad_min - (occupied / PI).sqrt()).abs() < 1e-12);
        assert_eq!(b.rad_max, 15.0);

        // a tiny arena cannot host RADMAX below RADMIN
        let tight = ContainmentBounds::compute(&cfg.population, 512, 4.0, 4.0, 1.0);
        assert!((tight.rad_max - (tight.rad_min + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn circle_cycle_contract_hold_expand() {
        let mut f = field();
        let mut rng = StdRng::seed_from_u64(5);
        let mut ctl =
            ContractionController::new(Region::circle(16.0, 16.0, 1.0), BOUNDS, &control(2), 3.5, 32.0)
                .unwrap();
        assert_eq!(ctl.radius(), 16.0);

        let mut contracting_updates = 0;
        while ctl.phase() == Phase::Contracting {
            ctl.update(&mut f, &mut rng);
            contracting_updates += 1;
        }
        assert_eq!(contracting_updates, 28);
        assert!(ctl.radius() < 5.0);
        assert_eq!(ctl.phase(), Phase::Holding { remaining: 2 });

        let held = ctl.radius();
        ctl.update(&mut f, &mut rng);
        assert_eq!(ctl.phase(), Phase::Holding { remaining: 1 });
        ctl.update(&mut f, &mut rng);
        assert_eq!(ctl.phase(), Phase::Expanding);
        assert_eq!(ctl.radius(), held);

        while ctl.phase() == Phase::Expanding {
            ctl.update(&mut f, &mut rng);
        }
        assert!(ctl.radius() > 16.0);
        assert_eq!(ctl.phase(), Phase::Contracting);
        assert!((ctl.scale_delta() - 0.99).abs() < 1e-12);
    }

    #[test]
    fn ticks_only_on_interval() {
        let mut f = field();
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctl =
            ContractionController::new(Region::circle(16.0, 16.0, 1.0), BOUNDS, &control(10), 3.5, 32.0)
                .unwrap();
        assert!(!ctl.tick(50, &mut f, &mut rng));
        assert_eq!(ctl.updates(), 0);
        assert!(ctl.tick(100, &mut f, &mut rng));
        assert_eq!(ctl.updates(), 1);
        assert!(!f.active().is_empty());
    }

    fn square() -> Region {
        Region::Polygon(
            Polygon::from_points(&[(12.0, 12.0), (20.0, 12.0), (20.0, 20.0), (12.0, 20.0)]).unwrap(),
        )
    }

    #[test]
    fn polygon_starts_at_rad_max_around_its_centroid() {
        let bounds = ContainmentBounds {
            rad_min: 3.0,
            rad_max: 10.0,
        };
        let ctl = ContractionController::new(square(), bounds, &control(1), 1.0, 32.0).unwrap();
        assert!((ctl.radius() - 10.0).abs() < 1e-9);
        let p = ctl.region().as_polygon().unwrap();
        let (ox, oy) = p.origin();
        assert!((ox - 16.0).abs() < 1e-9 && (oy - 16.0).abs() < 1e-9);
        let c = p.centroid().unwrap();
        assert!((c.x - 16.0).abs() < 1e-9 && (c.y - 16.0).abs() < 1e-9);
    }

    #[test]
    fn polygon_hands_over_to_circle_and_back() {
        let mut f = field();
        let mut rng = StdRng::seed_from_u64(8);
        let mut c = control(0);
        c.switch_to_circle = true;
        let bounds = ContainmentBounds {
            rad_min: 5.0,
            rad_max: 12.0,
        };
        let mut ctl = ContractionController::new(square(), bounds, &c, 1.0, 32.0).unwrap();

        while ctl.using_polygon() {
            ctl.update(&mut f, &mut rng);
        }
        // width / 8 = 4 < RADMIN, so the handover happens on the first dilating update
        assert_eq!(ctl.phase(), Phase::Expanding);
        let (cx, cy) = ctl.region().center().unwrap();
        assert!((cx - 16.0).abs() < 1e-9 && (cy - 16.0).abs() < 1e-9);

        while !ctl.using_polygon() {
            ctl.update(&mut f, &mut rng);
        }
        assert_eq!(ctl.phase(), Phase::Contracting);
        assert!(ctl.radius() > 12.0);
        assert!(ctl.radius() < 12.0 + 0.4 + 1e-9);
    }

    #[test]
    fn zero_area_polygon_is_refused() {
        let flat = Polygon::from_points(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]).unwrap();
        let err = ContractionController::new(Region::Polygon(flat), BOUNDS, &control(1), 1.0, 32.0);
        assert!(matches!(err, Err(PushError::DegenerateArea)));
    }
}
