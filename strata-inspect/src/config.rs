//! Command line configuration

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use strata_view::view::PickButton;

use crate::error::{InspectError, Result};

/// Headless inspector for strata-view scenes
#[derive(Parser, Clone, Debug)]
#[command(name = "strata-inspect")]
#[command(about = "Build one frame of a scene, resolve picks and print the result as JSON")]
pub struct Config {
    /// Scene description (JSON)
    #[arg(long)]
    pub scene: PathBuf,

    /// View configuration (JSON); defaults apply to missing fields
    #[arg(long)]
    pub view_config: Option<PathBuf>,

    /// Viewport width in pixels
    #[arg(long, default_value = "800")]
    pub width: f64,

    /// Viewport height in pixels
    #[arg(long, default_value = "600")]
    pub height: f64,

    /// Camera yaw in degrees
    #[arg(long, default_value = "35")]
    pub yaw: f64,

    /// Camera pitch in degrees, positive looks down
    #[arg(long, default_value = "30")]
    pub pitch: f64,

    /// Camera distance from the cube center, in cube half-widths
    #[arg(long, default_value = "4")]
    pub radius: f64,

    /// Vertical field of view in degrees
    #[arg(long, default_value = "45")]
    pub fov: f64,

    /// Vertical exaggeration, overrides the view configuration
    #[arg(long)]
    pub exaggeration: Option<f64>,

    /// Window position to pick, "X,Y" with y down; may be repeated
    #[arg(long = "pick", value_parser = parse_pick)]
    pub picks: Vec<(f64, f64)>,

    /// Mouse button used for every pick
    #[arg(long, value_enum, default_value = "left")]
    pub button: Button,

    /// Open the interactive viewer instead of printing a report
    #[arg(long)]
    pub viewer: bool,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, default_value = "strata_view=info,strata_inspect=info")]
    pub log: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
    Left,
    Middle,
    Right,
}

impl From<Button> for PickButton {
    fn from(b: Button) -> Self {
        match b {
            Button::Left => PickButton::Left,
            Button::Middle => PickButton::Middle,
            Button::Right => PickButton::Right,
        }
    }
}

fn parse_pick(s: &str) -> std::result::Result<(f64, f64), String> {
    parse_position(s).map_err(|e| e.to_string())
}

pub fn parse_position(s: &str) -> Result<(f64, f64)> {
    let bad = || InspectError::BadPick(s.to_owned());
    let (x, y) = s.split_once(',').ok_or_else(bad)?;
    let x: f64 = x.trim().parse().map_err(|_| bad())?;
    let y: f64 = y.trim().parse().map_err(|_| bad())?;
    if !(x.is_finite() && y.is_finite()) {
        return Err(bad());
    }
    Ok((x, y))
}
