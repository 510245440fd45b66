use bevy::prelude::*;

use crate::core::Scene;
use crate::render::{SceneRes, StrataViewPlugin, ViewRes};
use crate::view::ViewConfig;

/// Open a window on `scene` and run until it is closed.
pub fn run_viewer(scene: Scene, config: ViewConfig) {
    let bg = scene.background;
    App::new()
        .insert_resource(ClearColor(Color::srgb(bg.r, bg.g, bg.b)))
        .insert_resource(SceneRes::new(scene))
        .insert_resource(ViewRes::new(config))
        .add_plugins((
            DefaultPlugins.set(WindowPlugin {
                primary_window: Some(Window {
                    title: "strata-view".into(),
                    ..default()
                }),
                ..default()
            }),
            StrataViewPlugin,
        ))
        .run();
}
