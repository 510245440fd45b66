//! Projection and the per-frame render-command builder.
//!
//! Drawing code never talks to a graphics API. It emits primitives into a
//! [`FrameBuilder`], which either records [`DrawCommand`]s for a backend to
//! replay or, during a selection pass, turns every tagged primitive that
//! touches the pick window into a [`HitRecord`].

use crate::core::Color;
use crate::view::labels::PlacedText;
use crate::view::picking::{HitRecord, NameStack, PickPass};
use crate::{Result, StrataError};
use error_stack::report;
use glam::{DMat4, DVec2, DVec3};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Maps view-space points to the raster and back.
///
/// Raster coordinates are pixels with the origin at the bottom-left corner.
/// Depth is normalized to [0, 1], 0 at the near plane.
pub trait Projector {
    /// `None` when the point falls outside the view volume.
    fn project(&self, p: DVec3) -> Option<DVec3>;
    fn unproject(&self, x: f64, y: f64, depth: f64) -> Option<DVec3>;
    fn viewport(&self) -> DVec2;

    /// Like [`Projector::project`], but raster positions may lie off screen.
    /// Only points at or behind the eye are rejected.
    fn project_unclipped(&self, p: DVec3) -> Option<DVec3> {
        self.project(p)
    }

    /// Signed clip-space distance to the near plane, positive in front of it.
    fn near_distance(&self, _p: DVec3) -> f64 {
        1.0
    }
}

/// Clip-space depth convention of the projection matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepthRange {
    /// OpenGL style, -1 at the near plane.
    #[default]
    NegOneToOne,
    /// Reversed z, 1 at the near plane (Bevy).
    ReversedZeroToOne,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewProjection {
    clip_from_scene: DMat4,
    scene_from_clip: DMat4,
    size: DVec2,
    depth: DepthRange,
}

impl ViewProjection {
    pub fn new(
        view_from_scene: DMat4,
        clip_from_view: DMat4,
        size: DVec2,
        depth: DepthRange,
    ) -> Result<Self> {
        let clip_from_scene = clip_from_view * view_from_scene;
        let det = clip_from_scene.determinant();
        if !det.is_finite() || det == 0.0 {
            return Err(report!(StrataError::Projection).attach(format!("determinant {det}")));
        }
        if !(size.x > 0.0 && size.y > 0.0) {
            return Err(report!(StrataError::Projection).attach(format!("viewport {size}")));
        }
        Ok(Self {
            clip_from_scene,
            scene_from_clip: clip_from_scene.inverse(),
            size,
            depth,
        })
    }

    /// Perspective camera at `eye` looking at `target`.
    pub fn look_at(eye: DVec3, target: DVec3, up: DVec3, fov_y: f64, size: DVec2) -> Result<Self> {
        let view = DMat4::look_at_rh(eye, target, up);
        let proj = DMat4::perspective_rh_gl(fov_y, size.x / size.y, 0.05, 100.0);
        Self::new(view, proj, size, DepthRange::NegOneToOne)
    }

    /// Orbit around the cube center. Yaw turns about the up axis, positive pitch looks down.
    pub fn orbit(yaw: f64, pitch: f64, radius: f64, fov_y: f64, size: DVec2) -> Result<Self> {
        let eye = DVec3::new(
            radius * pitch.cos() * yaw.sin(),
            radius * pitch.sin(),
            radius * pitch.cos() * yaw.cos(),
        );
        Self::look_at(eye, DVec3::ZERO, DVec3::Y, fov_y, size)
    }
}

impl ViewProjection {
    /// Raster x/y and normalized depth, plus whether the point is inside the view volume.
    fn to_raster(&self, p: DVec3) -> Option<(DVec3, bool)> {
        let clip = self.clip_from_scene * p.extend(1.0);
        if !(clip.w > 0.0) {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let depth = match self.depth {
            DepthRange::NegOneToOne => ndc.z * 0.5 + 0.5,
            DepthRange::ReversedZeroToOne => 1.0 - ndc.z,
        };
        let inside = ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0 && (0.0..=1.0).contains(&depth);
        let raster = DVec3::new(
            (ndc.x + 1.0) * 0.5 * self.size.x,
            (ndc.y + 1.0) * 0.5 * self.size.y,
            depth,
        );
        raster.is_finite().then_some((raster, inside))
    }
}

impl Projector for ViewProjection {
    fn project(&self, p: DVec3) -> Option<DVec3> {
        self.to_raster(p).and_then(|(r, inside)| inside.then_some(r))
    }

    fn project_unclipped(&self, p: DVec3) -> Option<DVec3> {
        self.to_raster(p).map(|(r, _)| r)
    }

    fn near_distance(&self, p: DVec3) -> f64 {
        let clip = self.clip_from_scene * p.extend(1.0);
        match self.depth {
            DepthRange::NegOneToOne => clip.z + clip.w,
            DepthRange::ReversedZeroToOne => clip.w - clip.z,
        }
    }

    fn unproject(&self, x: f64, y: f64, depth: f64) -> Option<DVec3> {
        let z = match self.depth {
            DepthRange::NegOneToOne => depth * 2.0 - 1.0,
            DepthRange::ReversedZeroToOne => 1.0 - depth,
        };
        let ndc = DVec3::new(x / self.size.x * 2.0 - 1.0, y / self.size.y * 2.0 - 1.0, z);
        let p = self.scene_from_clip * ndc.extend(1.0);
        if p.w.abs() < f64::MIN_POSITIVE {
            return None;
        }
        let p = p.truncate() / p.w;
        p.is_finite().then_some(p)
    }

    fn viewport(&self) -> DVec2 {
        self.size
    }
}

/// Axis-aligned raster rectangle, y up.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl ScreenRect {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Square of side `size` centered on `center`.
    pub fn around(center: DVec2, size: f64) -> Self {
        let h = size / 2.0;
        Self::new(center.x - h, center.y - h, center.x + h, center.y + h)
    }

    pub fn corners(&self) -> [DVec2; 4] {
        [
            DVec2::new(self.x1, self.y1),
            DVec2::new(self.x2, self.y1),
            DVec2::new(self.x2, self.y2),
            DVec2::new(self.x1, self.y2),
        ]
    }

    #[inline]
    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= self.x1 && p.x <= self.x2 && p.y >= self.y1 && p.y <= self.y2
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Liang-Barsky test: does the segment a-b cross the rectangle?
    pub fn touches_segment(&self, a: DVec2, b: DVec2) -> bool {
        let d = b - a;
        let mut t0 = 0.0_f64;
        let mut t1 = 1.0_f64;
        let edges = [
            (-d.x, a.x - self.x1),
            (d.x, self.x2 - a.x),
            (-d.y, a.y - self.y1),
            (d.y, self.y2 - a.y),
        ];
        for (p, q) in edges {
            if p == 0.0 {
                if q < 0.0 {
                    return false;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
            if t0 > t1 {
                return false;
            }
        }
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Primitive {
    Points,
    Lines,
    LineStrip,
    Triangles,
    Quads,
}

/// The "current GL state", made explicit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawState {
    pub color: Color,
    pub line_width: f32,
    pub depth_test: bool,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            line_width: 1.0,
            depth_test: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Primitive {
        primitive: Primitive,
        state: DrawState,
        /// Name path active when the primitive was emitted.
        tag: Vec<u32>,
        vertices: Vec<DVec3>,
    },
    Text(PlacedText),
}

/// Pick window and collected hits for one selection pass.
#[derive(Clone, Debug)]
pub struct SelectionPass {
    pub center: DVec2,
    pub window: f64,
    pub pass: PickPass,
    hits: Vec<HitRecord>,
}

impl SelectionPass {
    pub fn new(center: DVec2, window: f64, pass: PickPass) -> Self {
        Self {
            center,
            window,
            pass,
            hits: Vec::new(),
        }
    }

    pub fn rect(&self) -> ScreenRect {
        ScreenRect::around(self.center, self.window)
    }

    fn record(&mut self, names: &[u32], depth: f64) {
        let depth = (depth.clamp(0.0, 1.0) * u32::MAX as f64).round() as u32;
        match self.hits.last_mut() {
            Some(last) if last.names == names => {
                last.depth = last.depth.min(depth);
                last.max_depth = last.max_depth.max(depth);
            }
            _ => self.hits.push(HitRecord::new(names.to_vec(), depth)),
        }
    }

    /// Vertices are in view space. Geometry off screen is kept; only the part
    /// behind the near plane is clipped away before testing the window.
    fn test(&mut self, primitive: Primitive, vertices: &[DVec3], projector: &dyn Projector, names: &[u32]) {
        let rect = self.rect();
        let center = self.center;
        let segment = |a: DVec3, b: DVec3| -> Option<f64> {
            let [a, b] = clip_segment(projector, a, b)?;
            segment_depth(projector.project_unclipped(a)?, projector.project_unclipped(b)?, &rect, center)
        };
        let polygon = |corners: &[DVec3]| -> Option<f64> {
            let clipped = clip_polygon(projector, corners);
            let projected = clipped
                .iter()
                .map(|&p| projector.project_unclipped(p))
                .collect::<Option<Vec<_>>>()?;
            (1..projected.len().saturating_sub(1))
                .filter_map(|i| triangle_depth([projected[0], projected[i], projected[i + 1]], &rect, center))
                .min_by(f64::total_cmp)
        };
        let depths: Vec<f64> = match primitive {
            Primitive::Points => vertices
                .iter()
                .filter(|&&p| projector.near_distance(p) >= 0.0)
                .filter_map(|&p| projector.project_unclipped(p))
                .filter(|p| rect.contains(p.truncate()))
                .map(|p| p.z)
                .collect(),
            Primitive::Lines => vertices.chunks_exact(2).filter_map(|s| segment(s[0], s[1])).collect(),
            Primitive::LineStrip => vertices.windows(2).filter_map(|w| segment(w[0], w[1])).collect(),
            Primitive::Triangles => vertices.chunks_exact(3).filter_map(polygon).collect(),
            Primitive::Quads => vertices.chunks_exact(4).filter_map(polygon).collect(),
        };
        if let Some(depth) = depths.into_iter().min_by(f64::total_cmp) {
            self.record(names, depth);
        }
    }
}

/// Part of segment a-b in front of the near plane.
fn clip_segment(projector: &dyn Projector, a: DVec3, b: DVec3) -> Option<[DVec3; 2]> {
    let (da, db) = (projector.near_distance(a), projector.near_distance(b));
    match (da >= 0.0, db >= 0.0) {
        (true, true) => Some([a, b]),
        (false, false) => None,
        (true, false) => Some([a, a + (b - a) * (da / (da - db))]),
        (false, true) => Some([a + (b - a) * (da / (da - db)), b]),
    }
}

/// Sutherland-Hodgman against the near plane alone.
fn clip_polygon(projector: &dyn Projector, corners: &[DVec3]) -> Vec<DVec3> {
    let d: Vec<f64> = corners.iter().map(|&p| projector.near_distance(p)).collect();
    if d.iter().all(|&x| x >= 0.0) {
        return corners.to_vec();
    }
    let mut out = Vec::with_capacity(corners.len() + 1);
    for i in 0..corners.len() {
        let j = (i + 1) % corners.len();
        let (a, b) = (corners[i], corners[j]);
        if d[i] >= 0.0 {
            out.push(a);
        }
        if (d[i] >= 0.0) != (d[j] >= 0.0) {
            out.push(a + (b - a) * (d[i] / (d[i] - d[j])));
        }
    }
    out
}

/// Depth where a projected segment passes closest to the window center.
fn segment_depth(a: DVec3, b: DVec3, rect: &ScreenRect, center: DVec2) -> Option<f64> {
    let (a2, b2) = (a.truncate(), b.truncate());
    if !rect.touches_segment(a2, b2) {
        return None;
    }
    let d = b2 - a2;
    let len2 = d.length_squared();
    let t = if len2 > 0.0 {
        ((center - a2).dot(d) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    Some(a.z + (b.z - a.z) * t)
}

/// Depth of a projected triangle under the window center, or along its nearest crossing edge.
fn triangle_depth(t: [DVec3; 3], rect: &ScreenRect, center: DVec2) -> Option<f64> {
    let [a, b, c] = t.map(|p| p.truncate());
    let area = (b - a).perp_dot(c - a);
    if area != 0.0 {
        let w0 = (c - b).perp_dot(center - b) / area;
        let w1 = (a - c).perp_dot(center - c) / area;
        let w2 = 1.0 - w0 - w1;
        if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
            return Some(w0 * t[0].z + w1 * t[1].z + w2 * t[2].z);
        }
    }
    [(0, 1), (1, 2), (2, 0)]
        .into_iter()
        .filter_map(|(i, j)| segment_depth(t[i], t[j], rect, center))
        .min_by(f64::total_cmp)
}

/// Collects one frame of drawing, or one selection pass.
pub struct FrameBuilder<'a> {
    projector: &'a dyn Projector,
    state: DrawState,
    names: NameStack,
    open: Option<(Primitive, Vec<DVec3>)>,
    commands: Vec<DrawCommand>,
    selection: Option<SelectionPass>,
}

impl<'a> FrameBuilder<'a> {
    pub fn new(projector: &'a dyn Projector) -> Self {
        Self {
            projector,
            state: DrawState::default(),
            names: NameStack::default(),
            open: None,
            commands: Vec::new(),
            selection: None,
        }
    }

    pub fn selection(projector: &'a dyn Projector, pass: SelectionPass) -> Self {
        Self {
            selection: Some(pass),
            ..Self::new(projector)
        }
    }

    pub fn projector(&self) -> &'a dyn Projector {
        self.projector
    }

    #[inline]
    pub fn is_selecting(&self) -> bool {
        self.selection.is_some()
    }

    pub fn pick_pass(&self) -> Option<PickPass> {
        self.selection.as_ref().map(|s| s.pass)
    }

    pub fn state(&self) -> &DrawState {
        &self.state
    }

    pub fn set_color(&mut self, color: Color) {
        self.state.color = color;
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.state.line_width = width;
    }

    pub fn set_depth_test(&mut self, on: bool) {
        self.state.depth_test = on;
    }

    pub fn names(&self) -> &NameStack {
        &self.names
    }

    pub fn init_names(&mut self) {
        self.names.clear();
    }

    pub fn push_name(&mut self, name: u32) {
        self.names.push(name);
    }

    pub fn pop_name(&mut self) {
        self.names.pop();
    }

    pub fn load_name(&mut self, name: u32) {
        self.names.load(name);
    }

    /// Run `draw` with `path` pushed on the name stack, then pop it again.
    pub fn named(&mut self, path: &[u32], draw: impl FnOnce(&mut Self)) {
        for &name in path {
            self.names.push(name);
        }
        draw(self);
        for _ in path {
            self.names.pop();
        }
    }

    pub fn begin(&mut self, primitive: Primitive) {
        if self.open.is_some() {
            warn!(?primitive, "begin called inside an open primitive");
            self.end();
        }
        self.open = Some((primitive, Vec::new()));
    }

    pub fn vertex(&mut self, p: DVec3) {
        match &mut self.open {
            Some((_, vertices)) => vertices.push(p),
            None => warn!("vertex emitted outside begin/end"),
        }
    }

    pub fn end(&mut self) {
        let Some((primitive, vertices)) = self.open.take() else {
            return;
        };
        if vertices.is_empty() {
            return;
        }
        match &mut self.selection {
            Some(pass) => pass.test(primitive, &vertices, self.projector, self.names.as_slice()),
            None => self.commands.push(DrawCommand::Primitive {
                primitive,
                state: self.state,
                tag: self.names.as_slice().to_vec(),
                vertices,
            }),
        }
    }

    /// Whole primitive in one call.
    pub fn emit(&mut self, primitive: Primitive, vertices: impl IntoIterator<Item = DVec3>) {
        self.begin(primitive);
        for v in vertices {
            self.vertex(v);
        }
        self.end();
    }

    /// Text is never part of a selection pass.
    pub fn text(&mut self, text: PlacedText) {
        if !self.is_selecting() {
            self.commands.push(DrawCommand::Text(text));
        }
    }

    pub fn finish(mut self) -> Vec<DrawCommand> {
        self.end();
        self.commands
    }

    pub fn into_hits(mut self) -> Vec<HitRecord> {
        self.end();
        self.selection.map(|s| s.hits).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Raster equals view x/y, depth equals view z.
    struct Flat;

    impl Projector for Flat {
        fn project(&self, p: DVec3) -> Option<DVec3> {
            Some(p)
        }
        fn unproject(&self, x: f64, y: f64, depth: f64) -> Option<DVec3> {
            Some(DVec3::new(x, y, depth))
        }
        fn viewport(&self) -> DVec2 {
            DVec2::new(100.0, 100.0)
        }
    }

    fn pass_at(x: f64, y: f64) -> SelectionPass {
        SelectionPass::new(DVec2::new(x, y), 4.0, PickPass::All)
    }

    #[test]
    fn render_mode_records_tagged_commands() {
        let mut frame = FrameBuilder::new(&Flat);
        frame.push_name(30);
        frame.push_name(2);
        frame.set_color(Color::RED);
        frame.emit(Primitive::Lines, [DVec3::ZERO, DVec3::X]);
        let commands = frame.finish();
        assert_eq!(commands.len(), 1);
        let DrawCommand::Primitive { tag, state, .. } = &commands[0] else {
            panic!("expected a primitive");
        };
        assert_eq!(tag, &vec![30, 2]);
        assert_eq!(state.color, Color::RED);
    }

    #[test]
    fn selection_records_line_crossing_window() {
        let mut frame = FrameBuilder::selection(&Flat, pass_at(50.0, 50.0));
        frame.push_name(7);
        frame.emit(
            Primitive::Lines,
            [DVec3::new(0.0, 50.0, 0.2), DVec3::new(100.0, 50.0, 0.6)],
        );
        frame.load_name(8);
        frame.emit(
            Primitive::Lines,
            [DVec3::new(0.0, 90.0, 0.1), DVec3::new(100.0, 90.0, 0.1)],
        );
        let hits = frame.into_hits();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].names, vec![7]);
        let expected = (0.4 * u32::MAX as f64).round() as u32;
        assert_eq!(hits[0].depth, expected);
    }

    #[test]
    fn selection_interpolates_triangle_depth() {
        let mut frame = FrameBuilder::selection(&Flat, pass_at(25.0, 25.0));
        frame.push_name(1);
        frame.emit(
            Primitive::Triangles,
            [
                DVec3::new(0.0, 0.0, 0.5),
                DVec3::new(100.0, 0.0, 0.5),
                DVec3::new(0.0, 100.0, 0.5),
            ],
        );
        let hits = frame.into_hits();
        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0].depth_fraction(), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn consecutive_hits_with_same_names_merge() {
        let mut frame = FrameBuilder::selection(&Flat, pass_at(10.0, 10.0));
        frame.push_name(40);
        frame.emit(Primitive::Points, [DVec3::new(10.0, 10.0, 0.3)]);
        frame.emit(Primitive::Points, [DVec3::new(11.0, 10.0, 0.2)]);
        let hits = frame.into_hits();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].depth < hits[0].max_depth);
    }

    #[test]
    fn text_is_skipped_while_selecting() {
        let frame = FrameBuilder::selection(&Flat, pass_at(0.0, 0.0));
        assert!(frame.is_selecting());
        assert!(frame.finish().is_empty());
    }

    #[test]
    fn segment_clip_test() {
        let r = ScreenRect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.touches_segment(DVec2::new(-5.0, 5.0), DVec2::new(15.0, 5.0)));
        assert!(!r.touches_segment(DVec2::new(-5.0, 15.0), DVec2::new(15.0, 15.0)));
        assert!(r.touches_segment(DVec2::new(5.0, 5.0), DVec2::new(5.0, 5.0)));
    }

    #[test]
    fn look_at_round_trips_through_unproject() {
        let vp = ViewProjection::look_at(
            DVec3::new(0.0, 0.0, 5.0),
            DVec3::ZERO,
            DVec3::Y,
            45f64.to_radians(),
            DVec2::new(800.0, 600.0),
        )
        .unwrap();
        let p = DVec3::new(0.3, -0.2, 0.4);
        let r = vp.project(p).unwrap();
        let back = vp.unproject(r.x, r.y, r.z).unwrap();
        assert_relative_eq!(back.x, p.x, epsilon = 1e-9);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-9);
        assert_relative_eq!(back.z, p.z, epsilon = 1e-9);
        let center = vp.project(DVec3::ZERO).unwrap();
        assert_relative_eq!(center.x, 400.0, epsilon = 1e-9);
        assert_relative_eq!(center.y, 300.0, epsilon = 1e-9);
    }

    fn camera() -> ViewProjection {
        ViewProjection::look_at(
            DVec3::new(0.0, 0.0, 5.0),
            DVec3::ZERO,
            DVec3::Y,
            45f64.to_radians(),
            DVec2::new(800.0, 600.0),
        )
        .unwrap()
    }

    #[test]
    fn off_screen_vertices_still_hit() {
        let vp = camera();
        let tri = [
            DVec3::new(-100.0, -100.0, 0.0),
            DVec3::new(100.0, -100.0, 0.0),
            DVec3::new(0.0, 100.0, 0.0),
        ];
        assert!(tri.iter().all(|&p| vp.project(p).is_none()));

        let mut frame = FrameBuilder::selection(&vp, pass_at(400.0, 300.0));
        frame.push_name(11);
        frame.emit(Primitive::Triangles, tri);
        frame.load_name(30);
        frame.emit(Primitive::LineStrip, [DVec3::new(-50.0, 0.0, 0.0), DVec3::new(50.0, 0.0, 0.0)]);
        let hits = frame.into_hits();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].names, vec![11]);
        assert_eq!(hits[1].names, vec![30]);
    }

    #[test]
    fn geometry_behind_the_eye_is_clipped_not_dropped() {
        let vp = camera();
        let behind = DVec3::new(0.0, 1.0, 8.0);
        assert!(vp.near_distance(behind) < 0.0);
        assert!(vp.near_distance(DVec3::ZERO) > 0.0);

        let mut frame = FrameBuilder::selection(&vp, pass_at(400.0, 300.0));
        frame.push_name(12);
        frame.emit(
            Primitive::Triangles,
            [DVec3::new(-1.0, -1.0, 0.0), DVec3::new(1.0, -1.0, 0.0), behind],
        );
        let hits = frame.into_hits();
        assert_eq!(hits.len(), 1);
        // The ray through the center crosses the triangle at (0, 0, 4), one unit from the eye.
        let expected = vp.project(DVec3::new(0.0, 0.0, 4.0)).unwrap().z;
        assert_relative_eq!(hits[0].depth_fraction(), expected, epsilon = 1e-6);
    }

    #[test]
    fn segment_entirely_behind_the_eye_is_ignored() {
        let vp = camera();
        let mut frame = FrameBuilder::selection(&vp, pass_at(400.0, 300.0));
        frame.push_name(30);
        frame.emit(Primitive::Lines, [DVec3::new(-1.0, 0.0, 6.0), DVec3::new(1.0, 0.0, 6.0)]);
        assert!(frame.into_hits().is_empty());
    }

    #[test]
    fn singular_matrices_are_rejected() {
        let err = ViewProjection::new(
            DMat4::ZERO,
            DMat4::IDENTITY,
            DVec2::new(10.0, 10.0),
            DepthRange::NegOneToOne,
        )
        .unwrap_err();
        assert_eq!(*err.current_context(), StrataError::Projection);
    }
}
