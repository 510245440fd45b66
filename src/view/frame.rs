//! One view of a scene: limits, scaling, picking and labels driven frame by frame.

use crate::core::{Axis, Color, NULL_VALUE, Scene, SurfaceKind};
use crate::view::ViewConfig;
use crate::view::device::{DrawCommand, FrameBuilder, Primitive, Projector};
use crate::view::interaction::{InteractionMode, ObjectKey, PickEvent, PickTarget, Selection};
use crate::view::labels::{LabelContext, LabelPlacer, LabelStyle, PlacedText};
use crate::view::limits::{DisplayUnits, PrettyLimits, PrettyLimitsCalculator};
use crate::view::outline::ProjectedOutline;
use crate::view::picking::{PickButton, PickOutcome, PickPass, Pickable, PickingEngine, names};
use crate::view::ray::{
    Ray, RayHit, RayHitStatus, ToleranceProvider, calc_line_hit, calc_triangle_hit, intersect_plane_and_line,
};
use crate::view::scaler::Scaler;
use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

const SELECTED_COLOR: Color = Color::YELLOW;
const POINT_SIZE: f32 = 6.0;

/// Output of one frame.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    pub commands: Vec<DrawCommand>,
    pub outline: ProjectedOutline,
    /// Pick resolved at the start of this frame.
    pub pick: Option<PickEvent>,
    pub limits_changed: bool,
}

impl Frame {
    pub fn texts(&self) -> impl Iterator<Item = &PlacedText> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text(t) => Some(t),
            _ => None,
        })
    }
}

/// What the last successful pick hit, for the UI to read back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PickRecord {
    pub target: PickTarget,
    pub names: Vec<u32>,
    pub button: PickButton,
    /// World position under the cursor, when it could be computed.
    pub point: Option<DVec3>,
    /// 1-based polyline segment under the cursor, for line picks.
    pub segment: Option<usize>,
    pub status: RayHitStatus,
    pub attempts: u32,
}

pub struct View3D {
    config: ViewConfig,
    calculator: PrettyLimitsCalculator,
    limits: PrettyLimits,
    scaler: Scaler,
    labels: LabelPlacer,
    picking: PickingEngine,
    mode: InteractionMode,
    selection: Selection,
    last_pick: Option<PickRecord>,
    limits_dirty: bool,
}

impl Default for View3D {
    fn default() -> Self {
        Self::new(ViewConfig::default())
    }
}

impl View3D {
    pub fn new(config: ViewConfig) -> Self {
        Self::with_labels(config, LabelPlacer::default())
    }

    pub fn with_labels(config: ViewConfig, mut labels: LabelPlacer) -> Self {
        labels.set_position_lock(config.text_position_lock);
        Self {
            calculator: PrettyLimitsCalculator::new(config.units),
            limits: PrettyLimits::default(),
            scaler: Scaler::default(),
            labels,
            picking: PickingEngine::new(config.pick),
            mode: InteractionMode::default(),
            selection: Selection::default(),
            last_pick: None,
            limits_dirty: true,
            config,
        }
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ViewConfig) {
        self.calculator.set_units(config.units);
        self.labels.set_position_lock(config.text_position_lock);
        self.picking.set_config(config.pick);
        self.config = config;
        self.limits_dirty = true;
    }

    pub fn set_vertical_exaggeration(&mut self, exaggeration: f64) {
        self.config.vertical_exaggeration = exaggeration;
        self.limits_dirty = true;
    }

    pub fn set_units(&mut self, units: DisplayUnits) {
        self.config.units = units;
        self.calculator.set_units(units);
        self.limits_dirty = true;
    }

    pub fn limits(&self) -> &PrettyLimits {
        &self.limits
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    pub fn set_mode(&mut self, mode: InteractionMode) {
        debug!(from = self.mode.name(), to = mode.name(), "interaction mode changed");
        self.mode = mode;
    }

    pub fn picking(&self) -> &PickingEngine {
        &self.picking
    }

    pub fn last_pick(&self) -> Option<&PickRecord> {
        self.last_pick.as_ref()
    }

    /// Call whenever scene geometry or visibility changes.
    pub fn mark_limits_dirty(&mut self) {
        self.limits_dirty = true;
    }

    /// Window coordinates, y down. Resolved during the next [`View3D::render_frame`].
    pub fn request_pick(&mut self, x: f64, y: f64, button: PickButton) {
        self.picking.request_pick(x, y, button);
    }

    /// World distance within which a polyline counts as hit.
    pub fn tolerance(&self) -> f64 {
        self.limits.extent().tolerance(self.config.tolerance_factor)
    }

    /// Recompute pretty limits and the scaler if marked dirty. Returns whether either changed.
    pub fn update_limits(&mut self, scene: &Scene) -> bool {
        if !self.limits_dirty {
            return false;
        }
        self.limits_dirty = false;
        let (limits, changed) = self.calculator.update(&scene.extent());
        self.limits = limits;
        let before = self.scaler;
        if limits.is_drawable() {
            self.scaler
                .set_limits(&limits.extent(), self.config.vertical_exaggeration);
        }
        changed || self.scaler != before
    }

    pub fn render_frame(&mut self, scene: &Scene, projector: &dyn Projector) -> Frame {
        let limits_changed = self.update_limits(scene);

        let outcome = {
            let drawer = SceneDrawer {
                scene,
                scaler: &self.scaler,
                limits: &self.limits,
                selection: &self.selection,
            };
            self.picking.on_render(projector, &drawer)
        };
        let pick = outcome.and_then(|o| self.dispatch_pick(scene, o));

        let mut frame = FrameBuilder::new(projector);
        SceneDrawer {
            scene,
            scaler: &self.scaler,
            limits: &self.limits,
            selection: &self.selection,
        }
        .draw(&mut frame);

        let drawable = self.limits.is_drawable();
        if drawable && self.config.draw_box {
            draw_box(&mut frame, &self.limits, &self.scaler, &self.config.axis_colors);
        }

        let outline = if drawable {
            ProjectedOutline::build(&self.limits.extent().corners(), &self.scaler, projector)
        } else {
            ProjectedOutline::default()
        };

        if drawable {
            let ctx = LabelContext {
                limits: &self.limits,
                units: self.config.units,
                scaler: &self.scaler,
                projector,
                outline: &outline,
            };
            let text_color = scene.background.contrast();
            let name_style = LabelStyle {
                size: self.config.name_size,
                color: text_color,
            };
            let number_style = LabelStyle {
                size: self.config.number_size,
                color: text_color,
            };
            for label in self.labels.place_axis_names(&ctx, &self.config.axis_names, &name_style) {
                frame.text(label);
            }
            for axis in Axis::ALL {
                for label in self.labels.place_axis_numbers(&ctx, axis, &number_style) {
                    frame.text(label);
                }
            }
        }

        for t in scene.texts.iter().filter(|t| t.visible) {
            let world = DVec3::from_array(t.position);
            let Some(raster) = projector.project(self.scaler.scale_point(world)) else {
                continue;
            };
            let style = LabelStyle {
                size: t.size,
                color: t.color,
            };
            frame.text(self.labels.place_annotation(raster.truncate(), &t.text, t.anchor, &style));
        }

        Frame {
            commands: frame.finish(),
            outline,
            pick,
            limits_changed,
        }
    }

    fn dispatch_pick(&mut self, scene: &Scene, outcome: PickOutcome) -> Option<PickEvent> {
        let Some(target) = PickTarget::decode(&outcome.hit.names) else {
            debug!(names = ?outcome.hit.names, "pick winner has an unknown name path");
            return None;
        };
        let ray = outcome.ray.map(|p| self.scaler.unscale_point(p));
        let hit = self.ray_hit(scene, target, &ray);
        let point = hit.is_hit().then_some(hit.point);

        self.last_pick = Some(PickRecord {
            target,
            names: outcome.hit.names,
            button: outcome.request.button,
            point,
            segment: hit.segment,
            status: hit.status,
            attempts: outcome.attempts,
        });

        let event = self
            .mode
            .handle(target, point, outcome.request.button, &mut self.selection);
        debug!(?target, ?event, "pick dispatched");
        Some(event)
    }

    /// Exact world position of a pick on `target`. `ray` is in world space.
    pub fn ray_hit(&self, scene: &Scene, target: PickTarget, ray: &Ray) -> RayHit {
        let at = |p: [f64; 3]| RayHit {
            point: DVec3::from_array(p),
            status: RayHitStatus::Hit,
            segment: None,
        };
        match target {
            PickTarget::Surface { index, triangle, .. } => match scene.surfaces.get(index) {
                Some(s) => calc_triangle_hit(s.triangle(triangle), ray),
                None => RayHit::invalid(),
            },
            PickTarget::Line { index, .. } => match scene.lines.get(index) {
                Some(l) => calc_line_hit(&l.vertices(), ray, self.tolerance()),
                None => RayHit::invalid(),
            },
            PickTarget::Point { index } => scene.points.get(index).map_or(RayHit::invalid(), |p| at(p.position)),
            PickTarget::Text { index } => scene.texts.get(index).map_or(RayHit::invalid(), |t| at(t.position)),
            PickTarget::Trap => {
                let Some(trap) = scene.trap else {
                    return RayHit::invalid();
                };
                let plane = DVec3::new(0.0, 0.0, trap.elevation);
                match intersect_plane_and_line(plane, DVec3::Z, ray.near, ray.far) {
                    Some(point) => RayHit {
                        point,
                        status: RayHitStatus::Hit,
                        segment: None,
                    },
                    None => RayHit::miss(),
                }
            }
        }
    }
}

/// Draws a scene, for display or into a selection pass.
struct SceneDrawer<'a> {
    scene: &'a Scene,
    scaler: &'a Scaler,
    limits: &'a PrettyLimits,
    selection: &'a Selection,
}

impl SceneDrawer<'_> {
    fn draw(&self, frame: &mut FrameBuilder<'_>) {
        let pass = frame.pick_pass();
        frame.init_names();
        if pass != Some(PickPass::TrapOnly) {
            if pass.is_none_or(PickPass::includes_fills) {
                self.draw_surfaces(frame);
            }
            self.draw_lines(frame);
            self.draw_points(frame);
            if frame.is_selecting() {
                self.draw_text_anchors(frame);
            }
        }
        self.draw_trap(frame);
    }

    fn color(&self, base: Color, flagged: bool, key: ObjectKey) -> Color {
        if flagged || self.selection.contains(key) {
            SELECTED_COLOR
        } else {
            base
        }
    }

    fn draw_surfaces(&self, frame: &mut FrameBuilder<'_>) {
        for (i, s) in self.scene.surfaces.iter().enumerate().filter(|(_, s)| s.visible) {
            let category = match s.kind {
                SurfaceKind::Horizon => names::HORIZON,
                SurfaceKind::Fault => names::FAULT,
                SurfaceKind::External => names::EXTERNAL_SURFACE,
            };
            frame.set_color(self.color(s.color, s.selected, ObjectKey::Surface(i)));

            let scaled = |t: usize| s.triangle(t).map(|tri| tri.map(|p| self.scaler.scale_point(p)));
            frame.named(&[category, i as u32, names::TRIANGLES], |frame| {
                if frame.is_selecting() {
                    // The element slot is reloaded with each triangle index.
                    frame.named(&[0], |frame| {
                        for t in 0..s.triangles.len() {
                            let Some(tri) = scaled(t) else { continue };
                            frame.load_name(t as u32);
                            frame.named(&[names::FILL_KIND], |frame| frame.emit(Primitive::Triangles, tri));
                        }
                    });
                } else {
                    let vertices: Vec<DVec3> = (0..s.triangles.len())
                        .filter_map(|t| s.triangle(t))
                        .filter(|tri| tri.iter().all(|p| p.z.abs() <= NULL_VALUE))
                        .flat_map(|tri| tri.map(|p| self.scaler.scale_point(p)))
                        .collect();
                    frame.emit(Primitive::Triangles, vertices);
                }
            });
        }
    }

    fn draw_lines(&self, frame: &mut FrameBuilder<'_>) {
        for (i, l) in self.scene.lines.iter().enumerate().filter(|(_, l)| l.visible) {
            let vertices: Vec<DVec3> = l.vertices().into_iter().map(|p| self.scaler.scale_point(p)).collect();
            frame.set_color(self.color(l.color, l.selected, ObjectKey::Line(i)));
            frame.set_line_width(l.width);
            frame.named(&[names::LINE, i as u32, 0, 0, names::LINE_KIND], |frame| {
                if frame.is_selecting() {
                    for (seg, w) in vertices.windows(2).enumerate() {
                        frame.named(&[seg as u32], |frame| frame.emit(Primitive::Lines, [w[0], w[1]]));
                    }
                } else {
                    frame.emit(Primitive::LineStrip, vertices);
                }
            });
        }
    }

    fn draw_points(&self, frame: &mut FrameBuilder<'_>) {
        frame.set_line_width(POINT_SIZE);
        for (i, p) in self.scene.points.iter().enumerate().filter(|(_, p)| p.visible) {
            frame.set_color(self.color(p.color, p.selected, ObjectKey::Point(i)));
            let at = self.scaler.scale_point(DVec3::from_array(p.position));
            frame.named(&[names::POINT, i as u32, 0, 0, names::LINE_KIND], |frame| {
                frame.emit(Primitive::Points, [at])
            });
        }
    }

    /// Text is not drawn while selecting, so its anchor point stands in for it.
    fn draw_text_anchors(&self, frame: &mut FrameBuilder<'_>) {
        for (i, t) in self.scene.texts.iter().enumerate().filter(|(_, t)| t.visible) {
            let at = self.scaler.scale_point(DVec3::from_array(t.position));
            frame.named(&[names::TEXT, i as u32, 0, 0, names::LINE_KIND], |frame| {
                frame.emit(Primitive::Points, [at])
            });
        }
    }

    fn draw_trap(&self, frame: &mut FrameBuilder<'_>) {
        let Some(trap) = self.scene.trap else {
            return;
        };
        if !self.limits.is_drawable() {
            return;
        }
        let (x, y, z) = (self.limits.x, self.limits.y, trap.elevation);
        let quad = [
            DVec3::new(x.min, y.min, z),
            DVec3::new(x.max, y.min, z),
            DVec3::new(x.max, y.max, z),
            DVec3::new(x.min, y.max, z),
        ]
        .map(|p| self.scaler.scale_point(p));
        frame.set_color(trap.color);
        frame.named(&[names::TRAP, 0, 0, 0, names::FILL_KIND], |frame| {
            frame.emit(Primitive::Quads, quad)
        });
    }
}

impl Pickable for SceneDrawer<'_> {
    fn draw_pickable(&self, frame: &mut FrameBuilder<'_>) {
        self.draw(frame);
    }
}

/// The 12 edges of the limits cube, colored by the axis each runs along.
fn draw_box(frame: &mut FrameBuilder<'_>, limits: &PrettyLimits, scaler: &Scaler, colors: &[Color; 3]) {
    let corners = limits.extent().corners().map(|c| scaler.scale_point(c));
    frame.set_line_width(1.0);
    frame.named(&[names::AXIS], |frame| {
        for axis in Axis::ALL {
            // Corner index bit 0 is x, bit 1 is y, bit 2 is z.
            let bit = 1usize << axis.index();
            let vertices: Vec<DVec3> = (0..8)
                .filter(|i| i & bit == 0)
                .flat_map(|i| [corners[i], corners[i | bit]])
                .collect();
            frame.set_color(colors[axis.index()]);
            frame.emit(Primitive::Lines, vertices);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Polyline3D, ScenePoint, TextAnnotation, TrapPlane, TriSurface};
    use crate::view::labels::Anchor;
    use crate::view::device::{SelectionPass, ViewProjection};
    use crate::view::picking::{HitKind, filter_selection};
    use approx::assert_relative_eq;
    use glam::DVec2;

    fn scene() -> Scene {
        Scene {
            surfaces: vec![TriSurface {
                name: "top".into(),
                kind: SurfaceKind::Horizon,
                nodes: vec![[0.0, 0.0, 0.0], [100.0, 0.0, 0.0], [100.0, 100.0, 0.0], [0.0, 100.0, 0.0]],
                triangles: vec![[0, 1, 2], [0, 2, 3]],
                color: Color::GRAY,
                visible: true,
                selected: false,
            }],
            lines: vec![Polyline3D {
                name: "section".into(),
                points: vec![[0.0, 50.0, 10.0], [100.0, 50.0, 10.0]],
                color: Color::WHITE,
                width: 2.0,
                visible: true,
                selected: false,
            }],
            ..Default::default()
        }
    }

    /// Straight down onto the map, north up the screen.
    fn top_down() -> ViewProjection {
        ViewProjection::look_at(
            DVec3::new(0.0, 5.0, 0.0),
            DVec3::ZERO,
            DVec3::new(0.0, 0.0, -1.0),
            45f64.to_radians(),
            DVec2::new(800.0, 600.0),
        )
        .unwrap()
    }

    #[test]
    fn limits_and_scaler_follow_the_scene() {
        let mut view = View3D::default();
        let s = scene();
        assert!(view.update_limits(&s));
        assert_eq!(view.limits().x.tick, 20.0);
        assert_eq!(view.limits().z.tick, 2.0);
        assert_eq!(view.scaler().scale(), 50.0);
        assert!(!view.update_limits(&s));
    }

    #[test]
    fn render_emits_box_and_tagged_geometry() {
        let mut view = View3D::default();
        let frame = view.render_frame(&scene(), &top_down());
        let tags: Vec<&Vec<u32>> = frame
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Primitive { tag, .. } => Some(tag),
                _ => None,
            })
            .collect();
        assert!(tags.contains(&&vec![names::HORIZON, 0, names::TRIANGLES]));
        assert!(tags.contains(&&vec![names::LINE, 0, 0, 0, names::LINE_KIND]));
        assert_eq!(tags.iter().filter(|t| ***t == [names::AXIS]).count(), 3);
        assert!(frame.outline.is_valid());
        assert!(frame.texts().any(|t| t.text == "East"));
    }

    #[test]
    fn click_on_line_selects_it() {
        let mut view = View3D::default();
        let s = scene();
        view.request_pick(400.0, 300.0, PickButton::Left);
        let frame = view.render_frame(&s, &top_down());
        let Some(PickEvent::Selected { target, point }) = frame.pick.clone() else {
            panic!("expected a selection, got {:?}", frame.pick);
        };
        assert_eq!(target, PickTarget::Line {
            index: 0,
            segment: Some(0)
        });
        let p = point.unwrap();
        assert_relative_eq!(p.x, 50.0, epsilon = 1e-6);
        assert_relative_eq!(p.z, 10.0, epsilon = 1e-6);
        assert!(view.selection().contains(ObjectKey::Line(0)));
        assert!(!view.picking().is_pending());
    }

    #[test]
    fn click_off_line_hits_the_triangle_below() {
        let mut view = View3D::default();
        view.request_pick(400.0, 400.0, PickButton::Left);
        view.render_frame(&scene(), &top_down());
        let record = view.last_pick().unwrap();
        assert_eq!(record.target, PickTarget::Surface {
            kind: SurfaceKind::Horizon,
            index: 0,
            triangle: 0
        });
        let p = record.point.unwrap();
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 50.0 - 50.0 * 5.1 * 22.5f64.to_radians().tan() / 3.0, epsilon = 1e-6);
    }

    fn crowded_scene() -> Scene {
        let mut s = scene();
        s.lines[0].points.insert(1, [30.0, 50.0, 10.0]);
        s.points.push(ScenePoint {
            position: [70.0, 30.0, 10.0],
            color: Color::RED,
            visible: true,
            selected: false,
        });
        s.texts.push(TextAnnotation {
            position: [20.0, 20.0, 5.0],
            text: "well A".into(),
            size: 12.0,
            anchor: Anchor::BottomLeft,
            color: Color::WHITE,
            visible: true,
        });
        s.trap = Some(TrapPlane {
            elevation: 5.0,
            color: Color::GRAY,
        });
        s
    }

    #[test]
    fn selection_paths_are_balanced_and_resolvable() {
        let s = crowded_scene();
        let mut view = View3D::default();
        view.update_limits(&s);
        let drawer = SceneDrawer {
            scene: &s,
            scaler: &view.scaler,
            limits: &view.limits,
            selection: &view.selection,
        };
        let projection = top_down();
        let pass = SelectionPass::new(DVec2::new(400.0, 300.0), 2000.0, PickPass::All);
        let mut frame = FrameBuilder::selection(&projection, pass);

        drawer.draw_surfaces(&mut frame);
        assert!(frame.names().is_empty(), "surfaces left {:?}", frame.names());
        drawer.draw_lines(&mut frame);
        assert!(frame.names().is_empty(), "lines left {:?}", frame.names());
        drawer.draw_points(&mut frame);
        assert!(frame.names().is_empty(), "points left {:?}", frame.names());
        drawer.draw_text_anchors(&mut frame);
        assert!(frame.names().is_empty(), "text left {:?}", frame.names());
        drawer.draw_trap(&mut frame);
        assert!(frame.names().is_empty(), "trap left {:?}", frame.names());

        let paths: Vec<Vec<u32>> = frame.into_hits().into_iter().map(|h| h.names).collect();
        for path in &paths {
            assert!(
                filter_selection(path, HitKind::Line) || filter_selection(path, HitKind::Fill),
                "{path:?} is filtered out"
            );
            assert!(PickTarget::decode(path).is_some(), "{path:?} does not decode");
        }
        for expected in [
            vec![names::HORIZON, 0, names::TRIANGLES, 0, names::FILL_KIND],
            vec![names::HORIZON, 0, names::TRIANGLES, 1, names::FILL_KIND],
            vec![names::LINE, 0, 0, 0, names::LINE_KIND, 0],
            vec![names::LINE, 0, 0, 0, names::LINE_KIND, 1],
            vec![names::POINT, 0, 0, 0, names::LINE_KIND],
            vec![names::TEXT, 0, 0, 0, names::LINE_KIND],
            vec![names::TRAP, 0, 0, 0, names::FILL_KIND],
        ] {
            assert!(paths.contains(&expected), "missing {expected:?} in {paths:?}");
        }
    }

    #[test]
    fn display_frame_leaves_no_names_behind() {
        let s = crowded_scene();
        let mut view = View3D::default();
        view.update_limits(&s);
        let projection = top_down();
        let mut frame = FrameBuilder::new(&projection);
        SceneDrawer {
            scene: &s,
            scaler: &view.scaler,
            limits: &view.limits,
            selection: &view.selection,
        }
        .draw(&mut frame);
        assert!(frame.names().is_empty());
        draw_box(&mut frame, &view.limits, &view.scaler, &[Color::RED, Color::GRAY, Color::WHITE]);
        assert!(frame.names().is_empty());
    }

    #[test]
    fn no_pick_without_request() {
        let mut view = View3D::default();
        assert_eq!(view.render_frame(&scene(), &top_down()).pick, None);
        assert_eq!(view.last_pick(), None);
    }
}
