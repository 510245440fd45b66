use approx::assert_relative_eq;
use glam::{DVec2, DVec3};
use std::cell::RefCell;
use strata_view::core::{Color, Polyline3D, Scene, ScenePoint, SurfaceKind, TrapPlane, TriSurface};
use strata_view::view::device::{FrameBuilder, Primitive, Projector, ViewProjection};
use strata_view::view::picking::{
    HitKind, HitRecord, PickButton, PickConfig, PickPass, Pickable, PickingEngine, names, process_hits,
};
use strata_view::view::{InteractionMode, ObjectKey, PickEvent, PickTarget, View3D, ViewConfig};

fn horizon() -> TriSurface {
    TriSurface {
        name: "top reservoir".into(),
        kind: SurfaceKind::Horizon,
        nodes: vec![[0.0, 0.0, 0.0], [100.0, 0.0, 0.0], [100.0, 100.0, 0.0], [0.0, 100.0, 0.0]],
        triangles: vec![[0, 1, 2], [0, 2, 3]],
        color: Color::GRAY,
        visible: true,
        selected: false,
    }
}

fn section_line() -> Polyline3D {
    Polyline3D {
        name: "section".into(),
        points: vec![[0.0, 50.0, 10.0], [100.0, 50.0, 10.0]],
        color: Color::WHITE,
        width: 2.0,
        visible: true,
        selected: false,
    }
}

fn scene() -> Scene {
    Scene {
        surfaces: vec![horizon()],
        lines: vec![section_line()],
        ..Default::default()
    }
}

/// Looking straight down, north up the screen, 800x600.
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

fn pick(view: &mut View3D, scene: &Scene, x: f64, y: f64, button: PickButton) -> Option<PickEvent> {
    view.request_pick(x, y, button);
    view.render_frame(scene, &top_down()).pick
}

#[test]
fn line_beats_the_surface_under_it() {
    let s = scene();
    let mut view = View3D::default();
    let event = pick(&mut view, &s, 400.0, 300.0, PickButton::Left);
    assert!(matches!(
        event,
        Some(PickEvent::Selected {
            target: PickTarget::Line { index: 0, .. },
            ..
        })
    ));
    let record = view.last_pick().unwrap();
    assert_eq!(record.names, vec![names::LINE, 0, 0, 0, names::LINE_KIND, 0]);
    let p = record.point.unwrap();
    assert_relative_eq!(p.x, 50.0, epsilon = 1e-6);
    assert_relative_eq!(p.y, 50.0, epsilon = 1e-6);
    assert_relative_eq!(p.z, 10.0, epsilon = 1e-6);
}

#[test]
fn surface_click_reports_triangle_and_plane_point() {
    let s = scene();
    let mut view = View3D::default();
    pick(&mut view, &s, 400.0, 400.0, PickButton::Left).unwrap();
    let record = view.last_pick().unwrap();
    assert_eq!(
        record.target,
        PickTarget::Surface {
            kind: SurfaceKind::Horizon,
            index: 0,
            triangle: 0
        }
    );
    let p = record.point.unwrap();
    let expected_y = 50.0 - 50.0 * 5.1 * 22.5f64.to_radians().tan() / 3.0;
    assert_relative_eq!(p.x, 50.0, epsilon = 1e-6);
    assert_relative_eq!(p.y, expected_y, epsilon = 1e-6);
    assert_relative_eq!(p.z, 0.0, epsilon = 1e-9);
    assert!(view.selection().contains(ObjectKey::Surface(0)));
}

#[test]
fn trap_catches_clicks_away_from_lines() {
    let mut s = scene();
    s.trap = Some(TrapPlane {
        elevation: 5.0,
        color: Color::CYAN.with_a(0.3),
    });
    let mut view = View3D::default();

    // The line is nearer than the trap, so it still wins.
    pick(&mut view, &s, 400.0, 300.0, PickButton::Left);
    assert!(matches!(view.last_pick().unwrap().target, PickTarget::Line { .. }));

    pick(&mut view, &s, 400.0, 400.0, PickButton::Left);
    let record = view.last_pick().unwrap();
    assert_eq!(record.target, PickTarget::Trap);
    assert_relative_eq!(record.point.unwrap().z, 5.0, epsilon = 1e-9);
}

/// Half a scene unit above the map, so every vertex of the scene is off screen.
fn zoomed_in() -> ViewProjection {
    ViewProjection::look_at(
        DVec3::new(0.0, 0.5, 0.0),
        DVec3::ZERO,
        DVec3::new(0.0, 0.0, -1.0),
        45f64.to_radians(),
        DVec2::new(800.0, 600.0),
    )
    .unwrap()
}

#[test]
fn zoomed_in_picks_geometry_with_off_screen_vertices() {
    let s = scene();
    let mut view = View3D::default();

    view.request_pick(400.0, 300.0, PickButton::Left);
    view.render_frame(&s, &zoomed_in());
    let record = view.last_pick().expect("line under the cursor");
    assert!(matches!(record.target, PickTarget::Line { index: 0, .. }));
    let p = record.point.unwrap();
    assert_relative_eq!(p.x, 50.0, epsilon = 1e-6);
    assert_relative_eq!(p.y, 50.0, epsilon = 1e-6);

    // The horizon sits 0.6 below the eye; 100 px up the screen is north.
    view.request_pick(400.0, 200.0, PickButton::Left);
    view.render_frame(&s, &zoomed_in());
    let record = view.last_pick().expect("surface under the cursor");
    assert_eq!(
        record.target,
        PickTarget::Surface {
            kind: SurfaceKind::Horizon,
            index: 0,
            triangle: 1
        }
    );
    let p = record.point.unwrap();
    assert_relative_eq!(p.x, 50.0, epsilon = 1e-6);
    assert_relative_eq!(p.y, 50.0 + 50.0 * 0.6 * 22.5f64.to_radians().tan() / 3.0, epsilon = 1e-6);
}

#[test]
fn line_segment_and_point_picked_in_one_scene() {
    let mut s = scene();
    s.lines[0].points.insert(1, [30.0, 50.0, 10.0]);
    s.points.push(ScenePoint {
        position: [50.0, 80.0, 10.0],
        color: Color::RED,
        visible: true,
        selected: false,
    });
    let mut view = View3D::default();

    pick(&mut view, &s, 400.0, 300.0, PickButton::Left);
    let record = view.last_pick().unwrap();
    assert_eq!(record.target, PickTarget::Line {
        index: 0,
        segment: Some(1)
    });
    assert_eq!(record.segment, Some(2));
    assert_eq!(record.names, vec![names::LINE, 0, 0, 0, names::LINE_KIND, 1]);

    let at = view.scaler().scale_point(DVec3::new(50.0, 80.0, 10.0));
    let raster = top_down().project(at).unwrap();
    pick(&mut view, &s, raster.x, 600.0 - raster.y, PickButton::Left);
    let record = view.last_pick().unwrap();
    assert_eq!(record.target, PickTarget::Point { index: 0 });
    assert_eq!(record.names, vec![names::POINT, 0, 0, 0, names::LINE_KIND]);
    assert_eq!(record.segment, None);
    assert_relative_eq!(record.point.unwrap().y, 80.0, epsilon = 1e-9);
}

#[test]
fn nothing_under_the_cursor() {
    let s = scene();
    let mut view = View3D::default();
    assert_eq!(pick(&mut view, &s, 5.0, 5.0, PickButton::Left), None);
    assert!(view.last_pick().is_none());
    assert!(!view.picking().is_pending());
}

#[test]
fn right_click_toggles_and_middle_recenters() {
    let s = scene();
    let mut view = View3D::default();
    let toggled = pick(&mut view, &s, 400.0, 300.0, PickButton::Right);
    assert!(matches!(toggled, Some(PickEvent::Toggled { selected: true, .. })));
    let toggled = pick(&mut view, &s, 400.0, 300.0, PickButton::Right);
    assert!(matches!(toggled, Some(PickEvent::Toggled { selected: false, .. })));
    assert!(view.selection().is_empty());

    let Some(PickEvent::Recenter { point }) = pick(&mut view, &s, 400.0, 400.0, PickButton::Middle) else {
        panic!("middle click on a surface should recenter");
    };
    assert_relative_eq!(point.z, 0.0, epsilon = 1e-9);
}

#[test]
fn line_edit_digitizes_on_the_surface() {
    let s = Scene {
        surfaces: vec![horizon()],
        ..Default::default()
    };
    let mut view = View3D::default();
    view.set_mode(InteractionMode::LineEdit { points: Vec::new() });
    pick(&mut view, &s, 400.0, 400.0, PickButton::Left);
    pick(&mut view, &s, 450.0, 400.0, PickButton::Left);
    let Some(PickEvent::EditLineFinished { points }) = pick(&mut view, &s, 400.0, 300.0, PickButton::Right)
    else {
        panic!("right click should finish the line");
    };
    assert_eq!(points.len(), 2);
    assert!(points[1].x > points[0].x);
    assert!(points.iter().all(|p| p.z.abs() < 1e-9));
}

#[test]
fn points_are_pickable_and_grabbable() {
    let mut s = scene();
    s.points.push(ScenePoint {
        position: [50.0, 50.0, 10.0],
        color: Color::RED,
        visible: true,
        selected: false,
    });
    s.lines.clear();
    let mut view = View3D::default();
    view.set_mode(InteractionMode::PointEdit { grabbed: None });
    assert_eq!(
        pick(&mut view, &s, 400.0, 300.0, PickButton::Left),
        Some(PickEvent::PointGrabbed { index: 0 })
    );
    let Some(PickEvent::PointMoved { index: 0, to }) = pick(&mut view, &s, 400.0, 400.0, PickButton::Left) else {
        panic!("second click should drop the point");
    };
    assert_relative_eq!(to.z, 0.0, epsilon = 1e-9);
}

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

/// One point, 8 px right of the window center. Records the passes it is drawn in.
#[derive(Default)]
struct OffsetPoint {
    passes: RefCell<Vec<PickPass>>,
}

impl Pickable for OffsetPoint {
    fn draw_pickable(&self, frame: &mut FrameBuilder<'_>) {
        let pass = frame.pick_pass().unwrap();
        self.passes.borrow_mut().push(pass);
        frame.init_names();
        for name in [names::POINT, 0, 0, 0, names::LINE_KIND] {
            frame.push_name(name);
        }
        frame.emit(Primitive::Points, [DVec3::new(58.0, 50.0, 0.5)]);
    }
}

#[test]
fn pick_window_doubles_until_something_is_found() {
    let mut engine = PickingEngine::new(PickConfig::default());
    let target = OffsetPoint::default();
    engine.request_pick(50.0, 50.0, PickButton::Left);
    let outcome = engine.on_render(&Flat, &target).unwrap();
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.window, 20.0);
    assert_eq!(outcome.hit.kind, HitKind::Line);
    let passes = target.passes.borrow().clone();
    assert_eq!(passes, vec![PickPass::LinesOnly, PickPass::All, PickPass::LinesOnly]);
}

#[test]
fn gives_up_after_the_configured_attempts() {
    let config = PickConfig {
        window: 2.0,
        attempts: 2,
        target_zoom: false,
    };
    let mut engine = PickingEngine::new(config);
    let target = OffsetPoint::default();
    engine.request_pick(50.0, 50.0, PickButton::Left);
    assert!(engine.on_render(&Flat, &target).is_none());
    assert_eq!(target.passes.borrow().len(), 4);
    assert!(engine.on_render(&Flat, &target).is_none());
    assert_eq!(target.passes.borrow().len(), 4, "no request, no passes");
}

#[test]
fn target_zoom_falls_back_to_the_trap_pass() {
    let config = PickConfig {
        window: 2.0,
        attempts: 3,
        target_zoom: true,
    };
    let mut engine = PickingEngine::new(config);
    let target = OffsetPoint::default();
    engine.request_pick(50.0, 50.0, PickButton::Left);
    assert!(engine.on_render(&Flat, &target).is_none());
    let passes = target.passes.borrow().clone();
    assert_eq!(passes, vec![PickPass::LinesOnly, PickPass::All, PickPass::TrapOnly]);
}

#[test]
fn trap_wins_over_farther_line_but_not_nearer_one() {
    let trap = |d| HitRecord::new(vec![names::TRAP, 0, 0, 0, names::FILL_KIND], d);
    let line = |d| HitRecord::new(vec![names::LINE, 2, 0, 0, names::LINE_KIND, 1], d);

    // zdelta = (300 - 100) / 10 = 20; trap adjusted to 80, line at 300 is farther.
    let won = process_hits(&[trap(100), line(300)]).unwrap();
    assert_eq!(won.kind, HitKind::Trap);
    assert_eq!(won.names[0], names::TRAP);

    // Line at 50 beats trap adjusted to 100 - 5 = 95.
    let won = process_hits(&[trap(100), line(50)]).unwrap();
    assert_eq!(won.kind, HitKind::Line);
    assert_eq!(won.names, vec![names::LINE, 2, 0, 0, names::LINE_KIND, 1]);
}

#[test]
fn config_reaches_the_engine() {
    let config = ViewConfig {
        pick: PickConfig {
            window: 9.0,
            attempts: 1,
            target_zoom: true,
        },
        ..Default::default()
    };
    let view = View3D::new(config);
    assert_eq!(view.picking().config().window, 9.0);
    assert!(view.picking().config().target_zoom);
}

#[test]
fn documented_resolution_cases() {
    let trap = |d| HitRecord::new(vec![names::TRAP, 0, 0, 0, names::FILL_KIND], d);
    let line = |d| HitRecord::new(vec![names::LINE, 0, 0, 0, names::LINE_KIND], d);
    let fill = |d| HitRecord::new(vec![names::HORIZON, 0, names::TRIANGLES, 0, names::FILL_KIND], d);

    // A line hit is preferred over a slightly nearer fill.
    assert_eq!(process_hits(&[line(50), fill(48)]).unwrap().kind, HitKind::Line);
    // zdelta 10: trap adjusted to 190, the line at 100 is nearer.
    assert_eq!(process_hits(&[trap(200), line(100)]).unwrap().kind, HitKind::Line);
    // zdelta 1: trap adjusted to 89 beats the line at 100.
    assert_eq!(process_hits(&[trap(90), line(100)]).unwrap().kind, HitKind::Trap);
}
