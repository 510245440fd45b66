//! Exact 3D hit locations for a pick ray.
//!
//! Closest approach of two lines follows Goldman, "Intersection of Two Lines
//! in Three-Space" (Graphics Gems I). Ray/plane follows Bourke.

use crate::core::{Extent3D, SENTINEL};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Direction vectors longer than this are treated as garbage.
const MAX_LENGTH: f64 = 1.0e15;

const MIN_DENOMINATOR: f64 = 1.0e-20;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub near: DVec3,
    pub far: DVec3,
}

impl Ray {
    pub fn map(self, f: impl Fn(DVec3) -> DVec3) -> Self {
        Self {
            near: f(self.near),
            far: f(self.far),
        }
    }
}

/// Closest points between two lines: `on_first` lies on the first line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClosestApproach {
    pub on_first: DVec3,
    pub on_second: DVec3,
}

impl ClosestApproach {
    pub fn distance(&self) -> f64 {
        self.on_first.distance(self.on_second)
    }
}

/// Closest approach of line p1-p2 and line p3-p4. `None` for parallel or degenerate input.
pub fn intersect_lines(p1: DVec3, p2: DVec3, p3: DVec3, p4: DVec3) -> Option<ClosestApproach> {
    let unit = |v: DVec3| {
        let len = v.length();
        (len > 0.0 && len <= MAX_LENGTH).then(|| v / len)
    };
    let v1 = unit(p2 - p1)?;
    let v2 = unit(p4 - p3)?;

    let cp = v1.cross(v2);
    let cpsq = cp.length_squared();
    if cpsq <= 0.0 || cpsq > MAX_LENGTH {
        return None;
    }

    let d = p3 - p1;
    let t = d.dot(v2.cross(cp)) / cpsq;
    let s = d.dot(v1.cross(cp)) / cpsq;

    Some(ClosestApproach {
        on_first: p1 + v1 * t,
        on_second: p3 + v2 * s,
    })
}

/// Like [`intersect_lines`], also counting how many closest points fall inside their segment.
pub fn intersect_segments(
    p1: DVec3,
    p2: DVec3,
    p3: DVec3,
    p4: DVec3,
) -> Option<(ClosestApproach, u8)> {
    let ca = intersect_lines(p1, p2, p3, p4)?;
    let inside = |c: DVec3, a: DVec3, b: DVec3| ((c - a) * (b - c)).cmpge(DVec3::ZERO).all();
    let count = inside(ca.on_first, p1, p2) as u8 + inside(ca.on_second, p3, p4) as u8;
    Some((ca, count))
}

/// Where the ray crosses the plane through `point` with normal `normal`.
pub fn intersect_plane_and_line(point: DVec3, normal: DVec3, near: DVec3, far: DVec3) -> Option<DVec3> {
    let len = normal.length();
    if len < MIN_DENOMINATOR {
        return None;
    }
    let n = normal / len;
    let denom = n.dot(far - near);
    if denom.abs() < MIN_DENOMINATOR {
        return None;
    }
    let u = n.dot(point - near) / denom;
    Some(near + (far - near) * u)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RayHitStatus {
    Hit,
    /// Geometry was fine, nothing within tolerance.
    Miss,
    /// Missing geometry or an out of range element index.
    Invalid,
}

impl RayHitStatus {
    pub fn code(self) -> i32 {
        match self {
            Self::Hit => 1,
            Self::Miss => 0,
            Self::Invalid => -1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RayHit {
    pub point: DVec3,
    pub status: RayHitStatus,
    /// 1-based segment of a polyline hit.
    pub segment: Option<usize>,
}

impl RayHit {
    pub const NO_POINT: DVec3 = DVec3::splat(SENTINEL);

    fn failed(status: RayHitStatus) -> Self {
        Self {
            point: Self::NO_POINT,
            status,
            segment: None,
        }
    }

    pub fn miss() -> Self {
        Self::failed(RayHitStatus::Miss)
    }

    pub fn invalid() -> Self {
        Self::failed(RayHitStatus::Invalid)
    }

    pub fn is_hit(&self) -> bool {
        self.status == RayHitStatus::Hit
    }
}

/// Closest polyline point to the ray, accepted when no farther than `tolerance`.
pub fn calc_line_hit(points: &[DVec3], ray: &Ray, tolerance: f64) -> RayHit {
    if points.len() < 2 {
        return RayHit::invalid();
    }

    let best = points
        .windows(2)
        .enumerate()
        .filter_map(|(i, w)| {
            let (ca, count) = intersect_segments(w[0], w[1], ray.near, ray.far)?;
            (count > 0).then(|| (i, ca.on_first, ca.distance()))
        })
        .fold(None::<(usize, DVec3, f64)>, |best, cand| match best {
            Some(b) if b.2 <= cand.2 => Some(b),
            _ => Some(cand),
        });

    match best {
        Some((i, point, dist)) if dist <= tolerance => RayHit {
            point,
            status: RayHitStatus::Hit,
            segment: Some(i + 1),
        },
        _ => RayHit::miss(),
    }
}

/// 1-based index of the polyline segment nearest the ray, within tolerance.
pub fn find_line_segment(points: &[DVec3], ray: &Ray, tolerance: f64) -> Option<usize> {
    calc_line_hit(points, ray, tolerance).segment
}

/// Intersect the ray with the plane of one triangle. Containment is not checked;
/// the caller already knows from the pick which triangle was under the cursor.
pub fn calc_triangle_hit(triangle: Option<[DVec3; 3]>, ray: &Ray) -> RayHit {
    let Some([a, b, c]) = triangle else {
        return RayHit::invalid();
    };
    let normal = (b - a).cross(c - a);
    match intersect_plane_and_line(a, normal, ray.near, ray.far) {
        Some(point) => RayHit {
            point,
            status: RayHitStatus::Hit,
            segment: None,
        },
        None => RayHit::miss(),
    }
}

/// Pick distance thresholds scale with the visible area.
pub trait ToleranceProvider {
    fn tolerance(&self, factor: f64) -> f64;
}

impl ToleranceProvider for Extent3D {
    fn tolerance(&self, factor: f64) -> f64 {
        if self.xmin >= self.xmax || factor <= 0.0 {
            return 0.0;
        }
        (self.xmax - self.xmin + self.ymax - self.ymin) / 150.0 * factor
    }
}
