//! Engine-independent interactive core of the 3D view.
//!
//! Nothing in here touches a window or a GPU. A backend supplies a
//! [`device::Projector`] each frame and replays the [`device::DrawCommand`]s
//! that [`frame::View3D::render_frame`] returns.

pub mod device;
pub mod frame;
pub mod interaction;
pub mod labels;
pub mod limits;
pub mod outline;
pub mod picking;
pub mod ray;
pub mod scaler;

pub use device::{DepthRange, DrawCommand, DrawState, FrameBuilder, Primitive, Projector, ScreenRect, ViewProjection};
pub use frame::{Frame, PickRecord, View3D};
pub use interaction::{InteractionMode, ObjectKey, PickEvent, PickTarget, Selection};
pub use labels::{Anchor, LabelPlacer, PlacedText};
pub use limits::{AxisLimits, DisplayUnits, PrettyLimits, PrettyLimitsCalculator};
pub use outline::ProjectedOutline;
pub use picking::{PickButton, PickConfig, PickingEngine};
pub use ray::{Ray, RayHit, RayHitStatus};
pub use scaler::Scaler;

use crate::core::Color;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub vertical_exaggeration: f64,
    pub units: DisplayUnits,
    /// Names for x, y and z. An empty name is not drawn.
    pub axis_names: [String; 3],
    pub name_size: f32,
    pub number_size: f32,
    pub draw_box: bool,
    /// Box edge colors, per axis the edge runs along.
    pub axis_colors: [Color; 3],
    pub text_position_lock: Option<Anchor>,
    pub pick: PickConfig,
    /// Multiplier on the line pick distance.
    pub tolerance_factor: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            vertical_exaggeration: 1.0,
            units: DisplayUnits::default(),
            axis_names: ["East".into(), "North".into(), "Elev".into()],
            name_size: 16.0,
            number_size: 12.0,
            draw_box: true,
            axis_colors: [Color::RED, Color::GREEN, Color::BLUE],
            text_position_lock: None,
            pick: PickConfig::default(),
            tolerance_factor: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_fills_missing_fields() {
        let cfg: ViewConfig =
            serde_json::from_str(r#"{"vertical_exaggeration": 5.0, "pick": {"attempts": 1}}"#).unwrap();
        assert_eq!(cfg.vertical_exaggeration, 5.0);
        assert_eq!(cfg.pick.attempts, 1);
        assert_eq!(cfg.pick.window, 5.0);
        assert_eq!(cfg.axis_names[2], "Elev");
    }
}
