//! Bevy front end: camera, input, and replay of the frames built by [`crate::view::View3D`].

pub mod components;
pub mod mesh;
pub mod resources;
pub mod systems;

pub use components::*;
pub use resources::*;
use systems::*;

use bevy::prelude::*;

#[derive(Default)]
pub struct StrataViewPlugin;

impl Plugin for StrataViewPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SceneRes>()
            .init_resource::<ViewRes>()
            .init_resource::<FrameOutput>()
            .init_resource::<LastPick>()
            .init_resource::<DragState>()
            .add_systems(Startup, setup_view)
            .add_systems(
                Update,
                (
                    orbit_camera,
                    queue_picks,
                    render_view,
                    apply_pick_events,
                    sync_surface_meshes,
                    draw_frame,
                    sync_labels,
                )
                    .chain(),
            );
    }
}
