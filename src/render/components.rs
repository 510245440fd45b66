use bevy::prelude::*;

/// Orbit camera around the unit cube the scene is scaled into.
#[derive(Component, Clone, Copy, Debug)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub radius: f32,
    pub yaw: f32,
    /// Positive looks down on the map.
    pub pitch: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            radius: 4.0,
            yaw: 0.6,
            pitch: 0.5,
        }
    }
}

impl OrbitCamera {
    pub const MIN_RADIUS: f32 = 0.5;
    pub const MAX_RADIUS: f32 = 40.0;
    pub const MAX_PITCH: f32 = 1.55;

    pub fn eye(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        self.target + self.radius * Vec3::new(cp * sy, sp, cp * cy)
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.eye()).looking_at(self.target, Vec3::Y)
    }

    pub fn rotate(&mut self, delta: Vec2) {
        self.yaw -= delta.x;
        self.pitch = (self.pitch + delta.y).clamp(-Self::MAX_PITCH, Self::MAX_PITCH);
    }

    pub fn zoom(&mut self, steps: f32) {
        self.radius = (self.radius * (1.0 - steps * 0.1)).clamp(Self::MIN_RADIUS, Self::MAX_RADIUS);
    }
}

/// Mesh spawned for one scene surface.
#[derive(Component)]
pub struct SurfaceMesh {
    pub index: usize,
}

/// UI text node holding one placed label. Rebuilt every frame.
#[derive(Component)]
pub struct LabelNode;
