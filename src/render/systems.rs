use super::components::*;
use super::mesh::surface_mesh;
use super::resources::*;
use crate::core::Polyline3D;
use crate::view::{
    DepthRange, DrawCommand, InteractionMode, ObjectKey, PickButton, PickEvent, Primitive, ViewProjection,
};
use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;
use bevy_camera::Camera;
use bevy_math::Isometry3d;
use glam::DVec3;

/// Radians per pixel of drag.
const ORBIT_SPEED: f32 = 0.008;
/// A left press that travels further than this is a drag, not a click.
const CLICK_SLOP: f32 = 4.0;
/// View-space coordinates beyond this are sentinels, not geometry.
const DRAWABLE_LIMIT: f32 = 1.0e6;

pub fn setup_view(mut commands: Commands) {
    commands.insert_resource(AmbientLight {
        brightness: 300.0,
        ..default()
    });

    let orbit = OrbitCamera::default();
    commands.spawn((Camera3d::default(), orbit.transform(), orbit));
    commands.spawn((
        DirectionalLight {
            illuminance: 8_000.0,
            ..default()
        },
        Transform::from_xyz(2.0, 4.0, 3.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

pub fn orbit_camera(
    mouse: Res<ButtonInput<MouseButton>>,
    mut wheel: MessageReader<MouseWheel>,
    mut motion: MessageReader<MouseMotion>,
    mut drag: ResMut<DragState>,
    mut cameras: Query<(&mut OrbitCamera, &mut Transform)>,
) {
    let zoom: f32 = wheel.read().map(|e| e.y).sum();
    let delta: Vec2 = motion.read().map(|e| e.delta).sum();

    let Ok((mut orbit, mut transform)) = cameras.single_mut() else {
        return;
    };

    if mouse.just_pressed(MouseButton::Left) {
        drag.travel = 0.0;
    } else if mouse.pressed(MouseButton::Left) && delta != Vec2::ZERO {
        drag.travel += delta.length();
        orbit.rotate(delta * ORBIT_SPEED);
    }
    if zoom != 0.0 {
        orbit.zoom(zoom);
    }
    if orbit.is_changed() {
        *transform = orbit.transform();
    }
}

/// Clicks become pick requests, resolved when the next frame is built.
pub fn queue_picks(
    mouse: Res<ButtonInput<MouseButton>>,
    keys: Res<ButtonInput<KeyCode>>,
    drag: Res<DragState>,
    windows: Query<&Window>,
    mut view: ResMut<ViewRes>,
) {
    if keys.just_pressed(KeyCode::KeyS) {
        view.0.set_mode(InteractionMode::Selection);
    } else if keys.just_pressed(KeyCode::KeyL) {
        view.0.set_mode(InteractionMode::LineEdit { points: Vec::new() });
    } else if keys.just_pressed(KeyCode::KeyP) {
        view.0.set_mode(InteractionMode::PointEdit { grabbed: None });
    } else if keys.just_pressed(KeyCode::Escape) {
        view.0.clear_selection();
    }

    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    let buttons = [
        (MouseButton::Left, PickButton::Left),
        (MouseButton::Middle, PickButton::Middle),
        (MouseButton::Right, PickButton::Right),
    ];
    for (button, pick) in buttons {
        if !mouse.just_released(button) {
            continue;
        }
        if button == MouseButton::Left && drag.travel > CLICK_SLOP {
            continue;
        }
        view.0.request_pick(cursor.x as f64, cursor.y as f64, pick);
    }
}

fn camera_projection(camera: &Camera, global: &GlobalTransform, size: Vec2) -> crate::Result<ViewProjection> {
    let view_from_world = Mat4::from(global.affine()).inverse();
    ViewProjection::new(
        view_from_world.as_dmat4(),
        camera.clip_from_view().as_dmat4(),
        size.as_dvec2(),
        DepthRange::ReversedZeroToOne,
    )
}

pub fn render_view(
    scene: Res<SceneRes>,
    mut view: ResMut<ViewRes>,
    mut output: ResMut<FrameOutput>,
    mut last_pick: ResMut<LastPick>,
    cameras: Query<(&Camera, &GlobalTransform), With<OrbitCamera>>,
) {
    let Ok((camera, global)) = cameras.single() else {
        return;
    };
    let Some(size) = camera.logical_viewport_size() else {
        return;
    };
    if scene.is_changed() {
        view.0.mark_limits_dirty();
    }
    let projection = match camera_projection(camera, global, size) {
        Ok(p) => p,
        Err(report) => {
            warn!("skipping frame: {report:?}");
            return;
        }
    };

    let frame = view.0.render_frame(&scene.0, &projection);
    if let Some(event) = &frame.pick {
        info!(?event, "pick");
        last_pick.0 = Some(event.clone());
    }
    output.frame = frame;
    output.viewport = size;
}

/// Scene-side effects of a pick: recentering and edits.
pub fn apply_pick_events(
    output: Res<FrameOutput>,
    view: Res<ViewRes>,
    mut scene: ResMut<SceneRes>,
    mut cameras: Query<&mut OrbitCamera>,
) {
    let Some(event) = &output.frame.pick else {
        return;
    };
    match event {
        PickEvent::Recenter { point } => {
            if let Ok(mut orbit) = cameras.single_mut() {
                orbit.target = view.0.scaler().scale_point(*point).as_vec3();
            }
        }
        PickEvent::EditLineFinished { points } => {
            let index = scene.0.lines.len();
            scene.0.lines.push(Polyline3D {
                name: format!("digitized {index}"),
                points: points.iter().map(|p| p.to_array()).collect(),
                color: crate::core::Color::CYAN,
                width: 2.0,
                visible: true,
                selected: false,
            });
        }
        PickEvent::PointMoved { index, to } => {
            if let Some(p) = scene.0.points.get_mut(*index) {
                p.position = to.to_array();
            }
        }
        _ => {}
    }
}

/// Rebuild surface meshes when geometry, scaling or selection changed.
pub fn sync_surface_meshes(
    mut commands: Commands,
    scene: Res<SceneRes>,
    view: Res<ViewRes>,
    output: Res<FrameOutput>,
    existing: Query<Entity, With<SurfaceMesh>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let frame = &output.frame;
    if !(scene.is_changed() || frame.limits_changed || frame.pick.is_some()) {
        return;
    }
    for entity in &existing {
        commands.entity(entity).despawn();
    }

    let scaler = view.0.scaler();
    for (index, surface) in scene.0.surfaces.iter().enumerate().filter(|(_, s)| s.visible) {
        let Some(mesh) = surface_mesh(surface, scaler) else {
            continue;
        };
        let color = if surface.selected || view.0.selection().contains(ObjectKey::Surface(index)) {
            crate::core::Color::YELLOW
        } else {
            surface.color
        };
        let material = materials.add(StandardMaterial {
            base_color: color.into(),
            perceptual_roughness: 0.6,
            cull_mode: None,
            double_sided: true,
            ..default()
        });
        commands.spawn((
            Mesh3d(meshes.add(mesh)),
            MeshMaterial3d(material),
            Transform::IDENTITY,
            SurfaceMesh { index },
        ));
    }
}

/// Line-type draw commands go out as gizmos. Triangles are drawn by the surface meshes.
pub fn draw_frame(output: Res<FrameOutput>, mut gizmos: Gizmos) {
    for command in &output.frame.commands {
        let DrawCommand::Primitive {
            primitive,
            state,
            vertices,
            ..
        } = command
        else {
            continue;
        };
        let color: Color = state.color.into();
        let v: Vec<Vec3> = vertices
            .iter()
            .map(|p: &DVec3| p.as_vec3())
            .filter(|p| p.abs().max_element() < DRAWABLE_LIMIT)
            .collect();
        match primitive {
            Primitive::Lines => {
                for pair in v.chunks_exact(2) {
                    gizmos.line(pair[0], pair[1], color);
                }
            }
            Primitive::LineStrip => gizmos.linestrip(v, color),
            Primitive::Points => {
                for p in v {
                    gizmos.sphere(Isometry3d::from_translation(p), 0.003 * state.line_width, color);
                }
            }
            Primitive::Quads => {
                for q in v.chunks_exact(4) {
                    gizmos.linestrip([q[0], q[1], q[2], q[3], q[0]], color);
                }
            }
            Primitive::Triangles => {}
        }
    }
}

/// Labels are absolutely positioned UI text, respawned every frame.
pub fn sync_labels(mut commands: Commands, output: Res<FrameOutput>, existing: Query<Entity, With<LabelNode>>) {
    for entity in &existing {
        commands.entity(entity).despawn();
    }
    let height = output.viewport.y;
    for label in output.frame.texts() {
        commands.spawn((
            Text::new(label.text.clone()),
            TextFont {
                font_size: label.size,
                ..default()
            },
            TextColor(label.color.into()),
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(label.rect.x1 as f32),
                top: Val::Px(height - label.rect.y2 as f32),
                ..default()
            },
            LabelNode,
        ));
    }
}
