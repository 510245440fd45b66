use crate::core::Scene;
use crate::view::{Frame, PickEvent, View3D, ViewConfig};
use bevy::prelude::*;

#[derive(Resource, Clone, Default)]
pub struct SceneRes(pub Scene);

impl SceneRes {
    pub fn new(scene: Scene) -> Self {
        Self(scene)
    }
}

#[derive(Resource, Default)]
pub struct ViewRes(pub View3D);

impl ViewRes {
    pub fn new(config: ViewConfig) -> Self {
        Self(View3D::new(config))
    }
}

/// Last frame produced by the view, replayed by the drawing systems.
#[derive(Resource, Default)]
pub struct FrameOutput {
    pub frame: Frame,
    /// Logical viewport size the frame was built for.
    pub viewport: Vec2,
}

#[derive(Resource, Default)]
pub struct LastPick(pub Option<PickEvent>);

/// Cursor travel since the left button went down. Long drags orbit instead of picking.
#[derive(Resource, Default)]
pub struct DragState {
    pub travel: f32,
}
