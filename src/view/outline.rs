//! Screen-space outline of the limits cube, used to keep labels off the box.

use crate::view::device::{Projector, ScreenRect};
use crate::view::scaler::Scaler;
use glam::{DVec2, DVec3};

/// Points within this many pixels of an outline edge count as on it.
pub const GRAZE_PIXELS: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolygonSide {
    Inside,
    Edge,
    Outside,
}

/// Answers whether a text rectangle would collide with something on screen.
pub trait TextPositionFilter {
    /// True when the rectangle overlaps and the text must move.
    fn check_text_position(&self, rect: &ScreenRect) -> bool;
}

/// Convex hull of the projected cube corners, counter-clockwise.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProjectedOutline {
    points: Vec<DVec2>,
}

impl ProjectedOutline {
    pub fn from_points(points: impl IntoIterator<Item = DVec2>) -> Self {
        Self {
            points: convex_hull(points.into_iter().collect()),
        }
    }

    /// Project the 8 world-space corners. Corners the projector rejects are left out.
    pub fn build(corners: &[DVec3; 8], scaler: &Scaler, projector: &dyn Projector) -> Self {
        Self::from_points(
            corners
                .iter()
                .filter_map(|&c| projector.project(scaler.scale_point(c)))
                .map(|p| p.truncate()),
        )
    }

    pub fn is_valid(&self) -> bool {
        self.points.len() >= 3
    }

    pub fn points(&self) -> &[DVec2] {
        &self.points
    }

    pub fn classify(&self, p: DVec2, graze: f64) -> PolygonSide {
        let n = self.points.len();
        if n < 3 {
            return PolygonSide::Outside;
        }
        let mut on_edge = false;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            let edge = b - a;
            // Signed distance, positive on the interior side.
            let d = edge.perp_dot(p - a) / edge.length();
            if d < -graze {
                return PolygonSide::Outside;
            }
            if d <= graze {
                on_edge = true;
            }
        }
        if on_edge { PolygonSide::Edge } else { PolygonSide::Inside }
    }
}

impl TextPositionFilter for ProjectedOutline {
    /// Without a usable outline nothing is considered overlapping.
    fn check_text_position(&self, rect: &ScreenRect) -> bool {
        if !self.is_valid() {
            return false;
        }
        rect.corners()
            .iter()
            .any(|&c| self.classify(c, GRAZE_PIXELS) != PolygonSide::Outside)
    }
}

/// Andrew's monotone chain. Collinear and duplicate points are dropped.
pub fn convex_hull(mut points: Vec<DVec2>) -> Vec<DVec2> {
    points.retain(|p| p.is_finite());
    points.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    points.dedup();
    if points.len() < 3 {
        return points;
    }

    let cross = |o: DVec2, a: DVec2, b: DVec2| (a - o).perp_dot(b - o);
    let reversed: Vec<DVec2> = points.iter().rev().copied().collect();
    let mut hull: Vec<DVec2> = Vec::with_capacity(points.len() * 2);
    for pass in [&points[..], &reversed[..]] {
        let start = hull.len();
        for &p in pass {
            while hull.len() >= start + 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
                hull.pop();
            }
            hull.push(p);
        }
        hull.pop();
    }
    hull
}
