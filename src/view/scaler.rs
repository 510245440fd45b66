//! World to unit-cube mapping.
//!
//! The largest axis of the limits box spans [-1, 1]. Output is y-up: world
//! elevation becomes view y and world north becomes view -z.

use crate::core::{Extent3D, NULL_VALUE, SENTINEL};
use glam::DVec3;

/// Smallest vertical exaggeration accepted.
pub const MIN_EXAGGERATION: f64 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scaler {
    center: DVec3,
    scale: f64,
    exaggeration: DVec3,
}

impl Default for Scaler {
    fn default() -> Self {
        Self {
            center: DVec3::ZERO,
            scale: 1.0,
            exaggeration: DVec3::ONE,
        }
    }
}

impl Scaler {
    pub fn new(limits: &Extent3D, vertical_exaggeration: f64) -> Self {
        let mut scaler = Self::default();
        scaler.set_limits(limits, vertical_exaggeration);
        scaler
    }

    /// Recompute the transform. A box with no extent on any axis, or one
    /// spanning null values, leaves it untouched.
    pub fn set_limits(&mut self, limits: &Extent3D, vertical_exaggeration: f64) {
        let raw = vertical_exaggeration.max(MIN_EXAGGERATION);

        let span = limits.max() - limits.min();
        // Zero-width (or unset) axes cannot drive the scale.
        let largest = [span.x, span.y, span.z]
            .into_iter()
            .filter(|s| s.is_finite() && *s > 0.0)
            .fold(0.0_f64, f64::max);
        if largest <= 0.0 {
            return;
        }

        // Null-valued boxes are not real extents.
        let scale = largest / 2.0;
        if scale > NULL_VALUE {
            return;
        }

        self.scale = scale;
        self.center = (limits.min() + limits.max()) * 0.5;
        self.exaggeration = DVec3::new(1.0, 1.0, raw);

        // Keep the exaggerated up axis inside the cube by shrinking all three.
        let up = (limits.zmax - self.center.z) / self.scale * raw;
        if up > 1.0 {
            self.exaggeration /= up;
        }

        if raw < 1.0 {
            self.scale *= raw;
            self.scale *= 1.1;
        }
    }

    #[inline]
    pub fn center(&self) -> DVec3 {
        self.center
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn exaggeration(&self) -> DVec3 {
        self.exaggeration
    }

    /// World point to view space. A null elevation maps far above the cube.
    pub fn scale_point(&self, p: DVec3) -> DVec3 {
        let t = (p - self.center) / self.scale * self.exaggeration;
        let up = if p.z.abs() > NULL_VALUE { SENTINEL } else { t.z };
        DVec3::new(t.x, up, -t.y)
    }

    pub fn unscale_point(&self, v: DVec3) -> DVec3 {
        let t = DVec3::new(v.x, -v.z, v.y);
        t / self.exaggeration * self.scale + self.center
    }
}
