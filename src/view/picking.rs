//! Name-tagged picking: hit collection, hit resolution and the pick request lifecycle.
//!
//! Every pickable primitive is emitted under a name path
//! `[category, object, sub-object, element, line/fill flag, segment?]`.
//! A selection pass records which paths touched the pick window and at what
//! depth; [`process_hits`] then picks one winner. Lines beat fills at
//! comparable depth, and a trap beats both unless a line is genuinely nearer.

use crate::view::device::{FrameBuilder, Projector, SelectionPass};
use crate::view::ray::Ray;
use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub mod names {
    pub const SURFACE: u32 = 10;
    pub const HORIZON: u32 = 11;
    pub const FAULT: u32 = 12;
    pub const EXTERNAL_SURFACE: u32 = 13;
    pub const WELL: u32 = 20;
    pub const LINE: u32 = 30;
    pub const POINT: u32 = 40;
    pub const TRAP: u32 = 60;
    pub const AXIS: u32 = 80;
    pub const TEXT: u32 = 120;

    pub const EDGES: u32 = 1000;
    pub const TRIANGLES: u32 = 2000;
    pub const NODES: u32 = 3000;

    /// Position of the line/fill flag in a name path.
    pub const KIND_SLOT: usize = 4;
    pub const LINE_KIND: u32 = 0;
    pub const FILL_KIND: u32 = 1;
}

pub const MAX_NAME_DEPTH: usize = 10;

/// Largest depth value a hit can carry.
pub const MAX_HIT_DEPTH: u32 = u32::MAX;

/// LIFO path of small integers naming the primitive being drawn.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameStack {
    names: Vec<u32>,
}

impl NameStack {
    pub fn push(&mut self, name: u32) {
        if self.names.len() >= MAX_NAME_DEPTH {
            warn!(name, "name stack overflow, push ignored");
            return;
        }
        self.names.push(name);
    }

    /// Underflow clamps at an empty stack.
    pub fn pop(&mut self) {
        if self.names.pop().is_none() {
            warn!("name stack underflow");
        }
    }

    /// Replace the top entry.
    pub fn load(&mut self, name: u32) {
        match self.names.last_mut() {
            Some(top) => *top = name,
            None => {
                warn!(name, "load on empty name stack");
                self.names.push(name);
            }
        }
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.names
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitRecord {
    pub names: Vec<u32>,
    pub depth: u32,
    pub max_depth: u32,
}

impl HitRecord {
    pub fn new(names: Vec<u32>, depth: u32) -> Self {
        Self {
            names,
            depth,
            max_depth: depth,
        }
    }

    pub fn is_trap(&self) -> bool {
        self.names.first() == Some(&names::TRAP)
    }

    pub fn depth_fraction(&self) -> f64 {
        depth_fraction(self.depth)
    }
}

fn depth_fraction(depth: u32) -> f64 {
    (depth as f64 / MAX_HIT_DEPTH as f64).clamp(0.0, 1.0)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitKind {
    Line,
    Fill,
    Trap,
}

/// Does a name path take part in a resolution pass for `kind`?
pub fn filter_selection(path: &[u32], kind: HitKind) -> bool {
    if !(5..=7).contains(&path.len()) {
        return false;
    }
    if path[0] == names::TRAP {
        return true;
    }
    match kind {
        HitKind::Line => path[names::KIND_SLOT] == names::LINE_KIND,
        HitKind::Fill => path[names::KIND_SLOT] == names::FILL_KIND,
        HitKind::Trap => false,
    }
}

/// Trap depth bias: a tenth of the depth spread of all hits, at least 1.
///
/// Empirically tuned and kept as is.
pub fn depth_delta(hits: &[HitRecord]) -> u64 {
    let (d1, d2) = hits.iter().fold((u64::MAX, 0u64), |(lo, hi), h| {
        let z = h.depth as u64;
        (lo.min(z), hi.max(z))
    });
    if d2 > d1 { ((d2 - d1) / 10).max(1) } else { 0 }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedHit {
    pub names: Vec<u32>,
    pub depth: u32,
    pub kind: HitKind,
}

impl ResolvedHit {
    pub fn depth_fraction(&self) -> f64 {
        depth_fraction(self.depth)
    }
}

/// Choose the winning hit, or `None` when nothing pickable was touched.
pub fn process_hits(hits: &[HitRecord]) -> Option<ResolvedHit> {
    let zdelta = depth_delta(hits);

    let mut trap: Option<(u64, &HitRecord)> = None;
    let mut line: Option<&HitRecord> = None;
    for hit in hits.iter().filter(|h| filter_selection(&h.names, HitKind::Line)) {
        let z = hit.depth as u64;
        if hit.is_trap() {
            let adjusted = z.saturating_sub(zdelta);
            if trap.is_none_or(|(best, _)| adjusted < best) {
                trap = Some((adjusted, hit));
            }
            continue;
        }
        if z > 0 && line.is_none_or(|best| hit.depth < best.depth) {
            line = Some(hit);
        }
    }

    let trap_dist = trap.map_or(u64::MAX, |(d, _)| d);
    if let Some(hit) = line.filter(|h| (h.depth as u64) < trap_dist) {
        return Some(resolved(hit, HitKind::Line));
    }

    let fill = hits
        .iter()
        .filter(|h| !h.is_trap() && h.depth > 0 && filter_selection(&h.names, HitKind::Fill))
        .fold(None::<&HitRecord>, |best, h| match best {
            Some(b) if b.depth <= h.depth => Some(b),
            _ => Some(h),
        });

    if let Some((adjusted, hit)) = trap {
        let fill_dist = fill.map_or(u64::MAX, |h| h.depth as u64);
        if adjusted <= fill_dist {
            return Some(resolved(hit, HitKind::Trap));
        }
    }

    fill.map(|h| resolved(h, HitKind::Fill))
}

fn resolved(hit: &HitRecord, kind: HitKind) -> ResolvedHit {
    ResolvedHit {
        names: hit.names.clone(),
        depth: hit.depth,
        kind,
    }
}

/// What a selection pass draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickPass {
    /// Line-type primitives and traps.
    LinesOnly,
    All,
    /// Only the trap plane.
    TrapOnly,
}

impl PickPass {
    pub fn includes_fills(self) -> bool {
        self == PickPass::All
    }
}

/// Anything that can redraw itself into a selection pass.
pub trait Pickable {
    fn draw_pickable(&self, frame: &mut FrameBuilder<'_>);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickButton {
    Left,
    Middle,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PickRequest {
    /// Window coordinates, y down, as reported by the cursor.
    pub x: f64,
    pub y: f64,
    pub button: PickButton,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickConfig {
    /// Initial pick window, pixels.
    pub window: f64,
    pub attempts: u32,
    /// Fall back to a trap-only pass after the first miss.
    pub target_zoom: bool,
}

impl Default for PickConfig {
    fn default() -> Self {
        Self {
            window: 5.0,
            attempts: 3,
            target_zoom: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PickState {
    Idle,
    SelectionPassScheduled(PickRequest),
    Resolving(PickRequest),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PickOutcome {
    pub request: PickRequest,
    pub hit: ResolvedHit,
    /// Near and far points under the cursor, view space.
    pub ray: Ray,
    /// Window size of the pass that produced the hit.
    pub window: f64,
    pub attempts: u32,
}

/// Owns the pick lifecycle. Requests are only resolved from inside a frame.
#[derive(Clone, Debug)]
pub struct PickingEngine {
    config: PickConfig,
    state: PickState,
}

impl Default for PickingEngine {
    fn default() -> Self {
        Self::new(PickConfig::default())
    }
}

impl PickingEngine {
    pub fn new(config: PickConfig) -> Self {
        Self {
            config,
            state: PickState::Idle,
        }
    }

    pub fn config(&self) -> &PickConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PickConfig) {
        self.config = config;
    }

    pub fn state(&self) -> PickState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, PickState::SelectionPassScheduled(_))
    }

    /// Schedule a pick for the next frame, replacing any request still waiting.
    pub fn request_pick(&mut self, x: f64, y: f64, button: PickButton) {
        if let PickState::SelectionPassScheduled(old) = self.state {
            debug!(?old, "pending pick replaced");
        }
        self.state = PickState::SelectionPassScheduled(PickRequest { x, y, button });
    }

    /// Run a scheduled pick, if any. Call once per frame before drawing.
    pub fn on_render(&mut self, projector: &dyn Projector, scene: &dyn Pickable) -> Option<PickOutcome> {
        let PickState::SelectionPassScheduled(request) = self.state else {
            return None;
        };
        self.state = PickState::Resolving(request);
        let outcome = self.resolve(projector, scene, request);
        self.state = PickState::Idle;
        outcome
    }

    fn resolve(
        &self,
        projector: &dyn Projector,
        scene: &dyn Pickable,
        request: PickRequest,
    ) -> Option<PickOutcome> {
        let height = projector.viewport().y;
        let center = DVec2::new(request.x, height - request.y);
        let mut size = self.config.window;

        for attempt in 1..=self.config.attempts.max(1) {
            let passes = [(PickPass::LinesOnly, size * 2.0), (PickPass::All, size)];
            for (pass, window) in passes {
                if let Some(outcome) = self.run_pass(projector, scene, request, center, window, pass, attempt) {
                    return Some(outcome);
                }
            }
            if self.config.target_zoom {
                return self.run_pass(projector, scene, request, center, size, PickPass::TrapOnly, attempt);
            }
            size *= 2.0;
        }
        debug!(?request, "pick found nothing");
        None
    }

    #[allow(clippy::too_many_arguments)]
    fn run_pass(
        &self,
        projector: &dyn Projector,
        scene: &dyn Pickable,
        request: PickRequest,
        center: DVec2,
        window: f64,
        pass: PickPass,
        attempt: u32,
    ) -> Option<PickOutcome> {
        let mut frame = FrameBuilder::selection(projector, SelectionPass::new(center, window, pass));
        scene.draw_pickable(&mut frame);
        let hits = frame.into_hits();
        let hit = process_hits(&hits)?;
        let ray = hit_ray(projector, center)?;
        debug!(?pass, window, attempt, names = ?hit.names, "pick resolved");
        Some(PickOutcome {
            request,
            hit,
            ray,
            window,
            attempts: attempt,
        })
    }
}

/// Unproject a raster point to a near/far pair just inside the clip planes.
pub fn hit_ray(projector: &dyn Projector, raster: DVec2) -> Option<Ray> {
    let near: DVec3 = projector.unproject(raster.x, raster.y, 0.001)?;
    let far: DVec3 = projector.unproject(raster.x, raster.y, 0.999)?;
    Some(Ray { near, far })
}
