//! Pretty axis limits: extents rounded outward to a human friendly tick interval.

use crate::core::{Axis, Extent3D, SENTINEL};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// World units per display unit, for the horizontal axes and for elevation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayUnits {
    pub xy: f64,
    pub z: f64,
}

impl Default for DisplayUnits {
    fn default() -> Self {
        Self { xy: 1.0, z: 1.0 }
    }
}

impl DisplayUnits {
    #[inline]
    pub fn for_axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X | Axis::Y => self.xy,
            Axis::Z => self.z,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisLimits {
    pub min: f64,
    pub max: f64,
    pub tick: f64,
}

impl AxisLimits {
    pub const UNSET: Self = Self {
        min: SENTINEL,
        max: -SENTINEL,
        tick: SENTINEL,
    };

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.max > self.min && self.tick > 0.0 && self.tick < SENTINEL
    }

    /// Number of tick intervals between min and max.
    pub fn tick_count(&self) -> usize {
        if !self.is_valid() {
            return 0;
        }
        ((self.max - self.min) / self.tick).round() as usize
    }

    /// Interior tick positions. The end points carry no number.
    pub fn interior_ticks(&self) -> impl Iterator<Item = f64> + '_ {
        let valid = self.is_valid();
        let stop = self.max - self.tick / 2.0;
        (1..)
            .map(move |i| self.min + i as f64 * self.tick)
            .take_while(move |&t| valid && t < stop)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrettyLimits {
    pub x: AxisLimits,
    pub y: AxisLimits,
    pub z: AxisLimits,
}

impl Default for PrettyLimits {
    fn default() -> Self {
        Self {
            x: AxisLimits::UNSET,
            y: AxisLimits::UNSET,
            z: AxisLimits::UNSET,
        }
    }
}

impl PrettyLimits {
    pub fn axis(&self, axis: Axis) -> &AxisLimits {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }

    /// Horizontal axes are required; a missing elevation axis only disables its labels.
    pub fn is_drawable(&self) -> bool {
        self.x.is_valid() && self.y.is_valid()
    }

    /// The box the cube is drawn on. A missing elevation axis collapses to zero height.
    pub fn extent(&self) -> Extent3D {
        let (zmin, zmax) = if self.z.is_valid() {
            (self.z.min, self.z.max)
        } else {
            (0.0, 0.0)
        };
        Extent3D::new([self.x.min, self.y.min, zmin], [self.x.max, self.y.max, zmax])
    }
}

/// Round one axis outward. `unit` is world units per display unit.
pub fn pretty_axis(min: f64, max: f64, unit: f64) -> AxisLimits {
    if !(min.is_finite() && max.is_finite() && unit.is_finite()) || unit <= 0.0 {
        return AxisLimits::UNSET;
    }
    let (lo, hi) = (min / unit, max / unit);
    let range = hi - lo;
    if range <= 0.0 {
        return AxisLimits::UNSET;
    }

    let order = range.log10().floor();
    let mut base = 10f64.powi(order as i32);
    let n = (range / base).floor() as i64;
    base = match n {
        n if n < 2 => base / 5.0,
        n if n < 3 => base / 4.0,
        n if n < 4 => base / 2.5,
        n if n < 6 => base / 2.0,
        n if n > 50 => base * 10.0,
        n if n > 25 => base * 5.0,
        n if n > 20 => base * 4.0,
        n if n > 15 => base * 2.5,
        n if n > 11 => base * 2.0,
        _ => base,
    };

    let mut pmin = (lo / base).floor() * base;
    while pmin > lo {
        pmin -= base;
    }
    let mut pmax = (hi / base).ceil() * base;
    while pmax < hi {
        pmax += base;
    }

    AxisLimits {
        min: pmin * unit,
        max: pmax * unit,
        tick: base * unit,
    }
}

/// Caches the last computation so unchanged extents cost nothing per frame.
#[derive(Clone, Debug, Default)]
pub struct PrettyLimitsCalculator {
    units: DisplayUnits,
    last: Option<(Extent3D, PrettyLimits)>,
}

impl PrettyLimitsCalculator {
    pub fn new(units: DisplayUnits) -> Self {
        Self { units, last: None }
    }

    pub fn units(&self) -> DisplayUnits {
        self.units
    }

    pub fn set_units(&mut self, units: DisplayUnits) {
        if units != self.units {
            self.units = units;
            self.last = None;
        }
    }

    pub fn compute(&self, extent: &Extent3D) -> PrettyLimits {
        let axis = |a: Axis| {
            if !extent.is_axis_set(a) {
                return AxisLimits::UNSET;
            }
            let (lo, hi) = extent.range(a);
            pretty_axis(lo, hi, self.units.for_axis(a))
        };
        PrettyLimits {
            x: axis(Axis::X),
            y: axis(Axis::Y),
            z: axis(Axis::Z),
        }
    }

    /// Returns the limits and whether they differ from the previous call.
    pub fn update(&mut self, extent: &Extent3D) -> (PrettyLimits, bool) {
        match self.last {
            Some((raw, limits)) if raw == *extent => return (limits, false),
            _ => {}
        }
        let limits = self.compute(extent);
        debug!(?extent, ?limits, "recomputed pretty limits");
        let changed = self.last.map(|(_, old)| old != limits).unwrap_or(true);
        self.last = Some((*extent, limits));
        (limits, changed)
    }

    pub fn invalidate(&mut self) {
        self.last = None;
    }
}

/// Decimal places for numbers on an axis spanning `display_range` display units.
pub fn decimals_for_range(display_range: f64) -> usize {
    match display_range {
        r if r < 0.4 => 3,
        r if r < 4.0 => 2,
        r if r < 40.0 => 1,
        _ => 0,
    }
}

/// Format a tick value with a fixed number of decimals. Never prints "-0".
pub fn format_tick(value: f64, decimals: usize) -> String {
    let text = format!("{value:.decimals$}");
    if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
        text[1..].to_string()
    } else {
        text
    }
}
