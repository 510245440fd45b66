//! Scene data model: the domain entities the viewer reads, plus world extents.

use crate::view::labels::Anchor;
use crate::{Result, StrataError};
use error_stack::{ResultExt, report};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Coordinates at or beyond this magnitude are "null" (missing elevation, unset limits).
pub const NULL_VALUE: f64 = 1.0e20;

/// Magic value used for unset extents and missed hits.
pub const SENTINEL: f64 = 1.0e30;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }
    pub const fn with_a(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Black on light backgrounds, white on dark ones.
    pub fn contrast(self) -> Self {
        let luma = 0.299 * self.r + 0.587 * self.g + 0.114 * self.b;
        if luma > 0.5 { Self::BLACK } else { Self::WHITE }
    }

    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const GRAY: Self = Self::rgb(0.5, 0.5, 0.5);
    pub const RED: Self = Self::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Self = Self::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Self = Self::rgb(0.0, 0.0, 1.0);
    pub const CYAN: Self = Self::rgb(0.0, 1.0, 1.0);
    pub const YELLOW: Self = Self::rgb(1.0, 1.0, 0.0);
}

impl Default for Color {
    fn default() -> Self {
        Self::GRAY
    }
}

impl From<Color> for bevy::prelude::Color {
    #[inline]
    fn from(c: Color) -> Self {
        bevy::prelude::Color::linear_rgba(c.r, c.g, c.b, c.a)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// World-space bounds. An axis whose min exceeds its max is unset.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extent3D {
    pub xmin: f64,
    pub ymin: f64,
    pub zmin: f64,
    pub xmax: f64,
    pub ymax: f64,
    pub zmax: f64,
}

impl Default for Extent3D {
    fn default() -> Self {
        Self::UNSET
    }
}

impl Extent3D {
    pub const UNSET: Self = Self {
        xmin: SENTINEL,
        ymin: SENTINEL,
        zmin: SENTINEL,
        xmax: -SENTINEL,
        ymax: -SENTINEL,
        zmax: -SENTINEL,
    };

    pub const fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self {
            xmin: min[0],
            ymin: min[1],
            zmin: min[2],
            xmax: max[0],
            ymax: max[1],
            zmax: max[2],
        }
    }

    #[inline]
    pub fn min(&self) -> DVec3 {
        DVec3::new(self.xmin, self.ymin, self.zmin)
    }

    #[inline]
    pub fn max(&self) -> DVec3 {
        DVec3::new(self.xmax, self.ymax, self.zmax)
    }

    pub fn range(&self, axis: Axis) -> (f64, f64) {
        match axis {
            Axis::X => (self.xmin, self.xmax),
            Axis::Y => (self.ymin, self.ymax),
            Axis::Z => (self.zmin, self.zmax),
        }
    }

    pub fn set_range(&mut self, axis: Axis, min: f64, max: f64) {
        match axis {
            Axis::X => (self.xmin, self.xmax) = (min, max),
            Axis::Y => (self.ymin, self.ymax) = (min, max),
            Axis::Z => (self.zmin, self.zmax) = (min, max),
        }
    }

    /// True when the axis has been set, even if it is zero width.
    pub fn is_axis_set(&self, axis: Axis) -> bool {
        let (lo, hi) = self.range(axis);
        lo <= hi && lo.abs() < NULL_VALUE && hi.abs() < NULL_VALUE
    }

    pub fn is_valid(&self) -> bool {
        Axis::ALL.iter().all(|&a| self.is_axis_set(a))
    }

    /// Grow to cover `p`. Null elevations only contribute x and y.
    pub fn include(&mut self, p: DVec3) {
        if !p.x.is_finite() || !p.y.is_finite() || p.x.abs() >= NULL_VALUE || p.y.abs() >= NULL_VALUE {
            return;
        }
        self.xmin = self.xmin.min(p.x);
        self.xmax = self.xmax.max(p.x);
        self.ymin = self.ymin.min(p.y);
        self.ymax = self.ymax.max(p.y);
        if p.z.is_finite() && p.z.abs() < NULL_VALUE {
            self.zmin = self.zmin.min(p.z);
            self.zmax = self.zmax.max(p.z);
        }
    }

    pub fn from_points<I: IntoIterator<Item = DVec3>>(points: I) -> Self {
        let mut extent = Self::UNSET;
        for p in points {
            extent.include(p);
        }
        extent
    }

    /// The 8 box corners, x varying fastest.
    pub fn corners(&self) -> [DVec3; 8] {
        let (lo, hi) = (self.min(), self.max());
        std::array::from_fn(|i| {
            DVec3::new(
                if i & 1 == 0 { lo.x } else { hi.x },
                if i & 2 == 0 { lo.y } else { hi.y },
                if i & 4 == 0 { lo.z } else { hi.z },
            )
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SurfaceKind {
    Horizon,
    Fault,
    External,
}

/// Triangulated surface: a horizon, a fault, or an externally supplied mesh.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriSurface {
    #[serde(default)]
    pub name: String,
    pub kind: SurfaceKind,
    pub nodes: Vec<[f64; 3]>,
    pub triangles: Vec<[u32; 3]>,
    #[serde(default)]
    pub color: Color,
    #[serde(default = "visible")]
    pub visible: bool,
    #[serde(default)]
    pub selected: bool,
}

impl TriSurface {
    pub fn node(&self, i: u32) -> Option<DVec3> {
        self.nodes.get(i as usize).map(|&n| DVec3::from_array(n))
    }

    /// Corner positions of one triangle, or `None` when any index is out of range.
    pub fn triangle(&self, index: usize) -> Option<[DVec3; 3]> {
        let [a, b, c] = *self.triangles.get(index)?;
        Some([self.node(a)?, self.node(b)?, self.node(c)?])
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Polyline3D {
    #[serde(default)]
    pub name: String,
    pub points: Vec<[f64; 3]>,
    #[serde(default)]
    pub color: Color,
    #[serde(default = "line_width")]
    pub width: f32,
    #[serde(default = "visible")]
    pub visible: bool,
    #[serde(default)]
    pub selected: bool,
}

impl Polyline3D {
    pub fn vertices(&self) -> Vec<DVec3> {
        self.points.iter().map(|&p| DVec3::from_array(p)).collect()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenePoint {
    pub position: [f64; 3],
    #[serde(default)]
    pub color: Color,
    #[serde(default = "visible")]
    pub visible: bool,
    #[serde(default)]
    pub selected: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TextAnnotation {
    pub position: [f64; 3],
    pub text: String,
    #[serde(default = "text_size")]
    pub size: f32,
    #[serde(default = "default_anchor")]
    pub anchor: Anchor,
    #[serde(default)]
    pub color: Color,
    #[serde(default = "visible")]
    pub visible: bool,
}

/// Horizontal click-target plane. Picks on it resolve to a 3D position at its elevation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrapPlane {
    pub elevation: f64,
    #[serde(default)]
    pub color: Color,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub surfaces: Vec<TriSurface>,
    pub lines: Vec<Polyline3D>,
    pub points: Vec<ScenePoint>,
    pub texts: Vec<TextAnnotation>,
    pub trap: Option<TrapPlane>,
    pub background: Color,
}

impl Scene {
    pub fn from_json(json: &str) -> Result<Self> {
        let scene: Scene = serde_json::from_str(json)
            .change_context(StrataError::InvalidScene)
            .attach("scene json did not parse")?;
        scene.validate()?;
        Ok(scene)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .change_context(StrataError::Io)
            .attach(format!("reading {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Rejects triangles that reference missing nodes.
    pub fn validate(&self) -> Result<()> {
        for (i, s) in self.surfaces.iter().enumerate() {
            let n = s.nodes.len() as u32;
            if let Some(t) = s.triangles.iter().position(|t| t.iter().any(|&k| k >= n)) {
                return Err(report!(StrataError::InvalidScene)
                    .attach(format!("surface {i} triangle {t} references a missing node")));
            }
        }
        Ok(())
    }

    /// Extent of everything visible. Text positions count, the trap plane does not.
    pub fn extent(&self) -> Extent3D {
        let surfaces = self
            .surfaces
            .iter()
            .filter(|s| s.visible)
            .flat_map(|s| s.nodes.iter());
        let lines = self
            .lines
            .iter()
            .filter(|l| l.visible)
            .flat_map(|l| l.points.iter());
        let points = self
            .points
            .iter()
            .filter(|p| p.visible)
            .map(|p| &p.position);
        let texts = self
            .texts
            .iter()
            .filter(|t| t.visible)
            .map(|t| &t.position);

        Extent3D::from_points(
            surfaces
                .chain(lines)
                .chain(points)
                .chain(texts)
                .map(|&p| DVec3::from_array(p)),
        )
    }
}

fn visible() -> bool {
    true
}

fn line_width() -> f32 {
    2.0
}

fn text_size() -> f32 {
    14.0
}

fn default_anchor() -> Anchor {
    Anchor::BottomLeft
}
