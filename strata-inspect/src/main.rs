//! strata-inspect
//!
//! Loads a scene, builds one frame headlessly with an orbit camera and reports
//! limits, label placement and pick results as JSON.

mod config;
mod error;

use std::io::Write;

use clap::Parser;
use glam::{DVec2, DVec3};
use serde::Serialize;
use strata_view::core::Scene;
use strata_view::view::frame::PickRecord;
use strata_view::view::{PickEvent, PlacedText, PrettyLimits, View3D, ViewConfig, ViewProjection};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::error::Result;

#[derive(Serialize)]
struct PickReport {
    x: f64,
    y: f64,
    event: Option<PickEvent>,
    hit: Option<PickRecord>,
}

#[derive(Serialize)]
struct Report<'a> {
    limits: &'a PrettyLimits,
    scale: f64,
    center: DVec3,
    outline: &'a [DVec2],
    labels: Vec<&'a PlacedText>,
    picks: Vec<PickReport>,
}

fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log.as_str().into()),
        )
        .init();

    let scene = Scene::load(&config.scene).map_err(error::InspectError::from)?;
    let view_config = load_view_config(&config)?;
    info!(
        surfaces = scene.surfaces.len(),
        lines = scene.lines.len(),
        points = scene.points.len(),
        "scene loaded from {}",
        config.scene.display()
    );

    if config.viewer {
        strata_view::runtime::run_viewer(scene, view_config);
        return Ok(());
    }

    inspect(&config, &scene, view_config)?;
    Ok(())
}

fn load_view_config(config: &Config) -> Result<ViewConfig> {
    let mut view_config = match &config.view_config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => ViewConfig::default(),
    };
    if let Some(e) = config.exaggeration {
        view_config.vertical_exaggeration = e;
    }
    Ok(view_config)
}

fn inspect(config: &Config, scene: &Scene, view_config: ViewConfig) -> Result<()> {
    let projection = ViewProjection::orbit(
        config.yaw.to_radians(),
        config.pitch.to_radians(),
        config.radius,
        config.fov.to_radians(),
        DVec2::new(config.width, config.height),
    )?;

    let mut view = View3D::new(view_config);
    let frame = view.render_frame(scene, &projection);
    debug!(commands = frame.commands.len(), "frame built");

    let mut picks = Vec::with_capacity(config.picks.len());
    for &(x, y) in &config.picks {
        view.request_pick(x, y, config.button.into());
        let event = view.render_frame(scene, &projection).pick;
        let hit = event.as_ref().and(view.last_pick().cloned());
        info!(x, y, ?event, "pick");
        picks.push(PickReport { x, y, event, hit });
    }

    let report = Report {
        limits: view.limits(),
        scale: view.scaler().scale(),
        center: view.scaler().center(),
        outline: frame.outline.points(),
        labels: frame.texts().collect(),
        picks,
    };
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &report)?;
    writeln!(out)?;
    Ok(())
}
