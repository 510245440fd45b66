//! Axis names and tick numbers placed around the limits cube.
//!
//! Each label is tried at a fixed sequence of anchor/offset candidates and
//! takes the first whose screen rectangle stays clear of the projected cube
//! outline. When nothing fits it is drawn at the fallback anchor anyway.

use crate::core::{Axis, Color, Extent3D};
use crate::view::device::{Projector, ScreenRect};
use crate::view::limits::{DisplayUnits, PrettyLimits, decimals_for_range, format_tick};
use crate::view::outline::{GRAZE_PIXELS, PolygonSide, ProjectedOutline, TextPositionFilter};
use crate::view::scaler::Scaler;
use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which point of the text box sits on the label's raster position.
///
/// Numbered 1-9 on a 3x3 grid: 1-3 bottom row, 4-6 middle row, 7-9 top row,
/// left to right within a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Anchor {
    BottomLeft = 1,
    BottomCenter = 2,
    BottomRight = 3,
    CenterLeft = 4,
    Center = 5,
    CenterRight = 6,
    TopLeft = 7,
    TopCenter = 8,
    TopRight = 9,
}

impl Anchor {
    const GRID: [Anchor; 9] = [
        Anchor::BottomLeft,
        Anchor::BottomCenter,
        Anchor::BottomRight,
        Anchor::CenterLeft,
        Anchor::Center,
        Anchor::CenterRight,
        Anchor::TopLeft,
        Anchor::TopCenter,
        Anchor::TopRight,
    ];

    pub const fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: u8) -> Option<Self> {
        Self::GRID.get((n as usize).checked_sub(1)?).copied()
    }

    /// Horizontal and vertical fraction of the text box that lies left of / below the point.
    const fn fractions(self) -> (f64, f64) {
        let n = self as u8 - 1;
        ((n % 3) as f64 * 0.5, (n / 3) as f64 * 0.5)
    }

    pub const fn is_left_column(self) -> bool {
        matches!(self, Anchor::BottomLeft | Anchor::CenterLeft | Anchor::TopLeft)
    }
}

/// One placement attempt: an anchor plus a pixel offset, y up.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub anchor: Anchor,
    pub dx: f64,
    pub dy: f64,
}

const fn c(anchor: Anchor, dx: f64, dy: f64) -> Candidate {
    Candidate { anchor, dx, dy }
}

use Anchor::*;

pub const AXIS_NAME_ORDER: [Candidate; 8] = [
    c(BottomCenter, 0.0, 15.0),
    c(CenterLeft, 15.0, 0.0),
    c(CenterRight, -15.0, 0.0),
    c(TopCenter, 0.0, -15.0),
    c(BottomLeft, 15.0, 15.0),
    c(BottomRight, -15.0, 15.0),
    c(TopLeft, 15.0, -15.0),
    c(TopRight, -15.0, -15.0),
];

/// Names hanging below the cube try downward anchors first.
pub const BOTTOM_AXIS_NAME_ORDER: [Candidate; 8] = [
    c(TopCenter, 0.0, -15.0),
    c(CenterLeft, 15.0, 0.0),
    c(CenterRight, -15.0, 0.0),
    c(BottomCenter, 0.0, 15.0),
    c(TopLeft, 15.0, -15.0),
    c(TopRight, -15.0, -15.0),
    c(BottomLeft, 15.0, 15.0),
    c(BottomRight, -15.0, 15.0),
];

/// Tried ahead of [`AXIS_NUMBER_ORDER`] on edges that run across the screen.
pub const HORIZONTAL_EDGE_PREPASS: [Candidate; 2] = [c(BottomCenter, 0.0, 5.0), c(TopCenter, 0.0, -5.0)];

pub const AXIS_NUMBER_ORDER: [Candidate; 6] = [
    c(CenterLeft, 5.0, 0.0),
    c(CenterRight, -5.0, 0.0),
    c(BottomLeft, 3.0, 3.0),
    c(TopLeft, 3.0, -3.0),
    c(BottomRight, -3.0, 3.0),
    c(TopRight, -3.0, -3.0),
];

pub const FALLBACK: Candidate = c(BottomLeft, 0.0, 0.0);

/// Slope below which a projected edge counts as horizontal or vertical.
pub const SLOPE_CUTOFF: f64 = 0.2;

/// A cube edge whose projected midpoint lies inside the outline, past the
/// graze band, runs behind the cube and gets no numbers.
pub fn edge_hidden(outline: &ProjectedOutline, midpoint: DVec2) -> bool {
    outline.is_valid() && outline.classify(midpoint, GRAZE_PIXELS) == PolygonSide::Inside
}

/// Screen rectangle of text of `size` placed at `raster` with `anchor` and `offset`.
///
/// Left-anchored text narrower than twice its height is widened to that,
/// so short numbers still keep their distance from the box.
pub fn anchor_rect(raster: DVec2, anchor: Anchor, offset: DVec2, size: DVec2) -> ScreenRect {
    let (fx, fy) = anchor.fractions();
    let x1 = raster.x + offset.x - fx * size.x;
    let y1 = raster.y + offset.y - fy * size.y;
    let width = if anchor.is_left_column() && size.x < 2.0 * size.y {
        2.0 * size.y
    } else {
        size.x
    };
    ScreenRect::new(x1, y1, x1 + width, y1 + size.y)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeOrientation {
    Horizontal,
    Vertical,
    Oblique,
}

pub fn classify_edge(a: DVec2, b: DVec2) -> EdgeOrientation {
    let dx = (b.x - a.x).abs();
    let dy = (b.y - a.y).abs();
    if dx > dy && dy / dx < SLOPE_CUTOFF {
        EdgeOrientation::Horizontal
    } else if dx < dy * SLOPE_CUTOFF {
        EdgeOrientation::Vertical
    } else {
        EdgeOrientation::Oblique
    }
}

/// 1-bit text raster. Rows are `stride` bytes, most significant bit leftmost.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphBitmap {
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub bits: Vec<u8>,
}

impl GlyphBitmap {
    pub fn blank(width: u32, height: u32) -> Self {
        let stride = (width / 32 + 1) * 4;
        Self {
            width,
            height,
            stride,
            bits: vec![0; (stride * height) as usize],
        }
    }

    fn index(&self, x: u32, y: u32) -> Option<(usize, u8)> {
        (x < self.width && y < self.height)
            .then(|| ((y * self.stride + x / 8) as usize, 0x80 >> (x % 8)))
    }

    pub fn set(&mut self, x: u32, y: u32) {
        if let Some((i, mask)) = self.index(x, y) {
            self.bits[i] |= mask;
        }
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.index(x, y).is_some_and(|(i, mask)| self.bits[i] & mask != 0)
    }

    pub fn size(&self) -> DVec2 {
        DVec2::new(self.width as f64, self.height as f64)
    }
}

/// Font collaborator: turns a string into a bitmap whose size drives placement.
pub trait GlyphSource {
    fn rasterize(&self, text: &str, size: f32) -> GlyphBitmap;
}

/// Fixed-pitch stand-in font: every visible character is a hollow cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockGlyphs {
    /// Character advance as a fraction of the font size.
    pub advance: f32,
    /// Line height as a fraction of the font size.
    pub line_height: f32,
}

impl Default for BlockGlyphs {
    fn default() -> Self {
        Self {
            advance: 0.6,
            line_height: 1.0,
        }
    }
}

impl GlyphSource for BlockGlyphs {
    fn rasterize(&self, text: &str, size: f32) -> GlyphBitmap {
        let cell = (size * self.advance).round().max(1.0) as u32;
        let height = (size * self.line_height).round().max(1.0) as u32;
        let count = text.chars().count() as u32;
        let mut bitmap = GlyphBitmap::blank(cell * count, height);
        for (i, ch) in text.chars().enumerate() {
            if ch.is_whitespace() {
                continue;
            }
            let x0 = i as u32 * cell;
            for x in x0 + 1..x0 + cell.saturating_sub(1) {
                bitmap.set(x, 1);
                bitmap.set(x, height.saturating_sub(2));
            }
            for y in 1..height.saturating_sub(1) {
                bitmap.set(x0 + 1, y);
                bitmap.set(x0 + cell.saturating_sub(2), y);
            }
        }
        bitmap
    }
}

/// Rasterized text remembered for one label slot.
#[derive(Clone, Debug, PartialEq)]
pub struct LastTextData {
    pub bitmap: GlyphBitmap,
    pub text: String,
    pub size: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextSlot {
    /// Tick number by draw order within its axis.
    Number { axis: Axis, index: usize },
    Name(Axis),
}

#[derive(Clone, Debug, Default)]
pub struct GlyphCache {
    numbers: [Vec<Option<LastTextData>>; 3],
    names: [Option<LastTextData>; 3],
    rasterized: usize,
}

impl GlyphCache {
    /// Bitmap for `text` in `slot`, rasterizing only when text or size changed.
    pub fn glyph(&mut self, slot: TextSlot, text: &str, size: f32, source: &dyn GlyphSource) -> &GlyphBitmap {
        let entry = match slot {
            TextSlot::Number { axis, index } => {
                let list = &mut self.numbers[axis.index()];
                if list.len() <= index {
                    list.resize(index + 1, None);
                }
                &mut list[index]
            }
            TextSlot::Name(axis) => &mut self.names[axis.index()],
        };
        if entry.as_ref().is_some_and(|d| d.text != text || d.size != size) {
            *entry = None;
        }
        let mut fresh = false;
        let data = entry.get_or_insert_with(|| {
            fresh = true;
            LastTextData {
                bitmap: source.rasterize(text, size),
                text: text.to_owned(),
                size,
            }
        });
        if fresh {
            self.rasterized += 1;
        }
        &data.bitmap
    }

    pub fn get(&self, slot: TextSlot) -> Option<&LastTextData> {
        match slot {
            TextSlot::Number { axis, index } => self.numbers[axis.index()].get(index)?.as_ref(),
            TextSlot::Name(axis) => self.names[axis.index()].as_ref(),
        }
    }

    /// How many times anything was rasterized.
    pub fn rasterized(&self) -> usize {
        self.rasterized
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub anchor: Anchor,
    pub rect: ScreenRect,
    pub fallback: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedText {
    pub text: String,
    /// Raster position of the labelled point.
    pub raster: DVec2,
    pub rect: ScreenRect,
    pub anchor: Anchor,
    pub size: f32,
    pub color: Color,
    pub fallback: bool,
}

/// Everything label placement reads for one frame.
pub struct LabelContext<'a> {
    pub limits: &'a PrettyLimits,
    pub units: DisplayUnits,
    pub scaler: &'a Scaler,
    pub projector: &'a dyn Projector,
    pub outline: &'a ProjectedOutline,
}

impl LabelContext<'_> {
    fn raster(&self, world: DVec3) -> Option<DVec2> {
        self.projector
            .project(self.scaler.scale_point(world))
            .map(|p| p.truncate())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LabelStyle {
    pub size: f32,
    pub color: Color,
}

pub struct LabelPlacer {
    glyphs: Box<dyn GlyphSource + Send + Sync>,
    cache: GlyphCache,
    lock: Option<Anchor>,
}

impl Default for LabelPlacer {
    fn default() -> Self {
        Self::new(Box::new(BlockGlyphs::default()))
    }
}

impl LabelPlacer {
    pub fn new(glyphs: Box<dyn GlyphSource + Send + Sync>) -> Self {
        Self {
            glyphs,
            cache: GlyphCache::default(),
            lock: None,
        }
    }

    pub fn cache(&self) -> &GlyphCache {
        &self.cache
    }

    /// Restrict every label to a single anchor.
    pub fn set_position_lock(&mut self, lock: Option<Anchor>) {
        self.lock = lock;
    }

    pub fn position_lock(&self) -> Option<Anchor> {
        self.lock
    }

    /// First candidate whose rectangle the filter accepts, else the fallback.
    pub fn place_label(
        &self,
        raster: DVec2,
        size: DVec2,
        candidates: &[Candidate],
        filter: &dyn TextPositionFilter,
    ) -> Placement {
        let accepted = candidates
            .iter()
            .filter(|c| self.lock.is_none_or(|lock| lock == c.anchor))
            .map(|c| (c.anchor, anchor_rect(raster, c.anchor, DVec2::new(c.dx, c.dy), size)))
            .find(|(_, rect)| !filter.check_text_position(rect));

        match accepted {
            Some((anchor, rect)) => Placement {
                anchor,
                rect,
                fallback: false,
            },
            None => {
                let anchor = self.lock.unwrap_or(FALLBACK.anchor);
                let offset = DVec2::new(FALLBACK.dx, FALLBACK.dy);
                Placement {
                    anchor,
                    rect: anchor_rect(raster, anchor, offset, size),
                    fallback: true,
                }
            }
        }
    }

    fn placed(&self, text: String, raster: DVec2, placement: Placement, style: &LabelStyle) -> PlacedText {
        PlacedText {
            text,
            raster,
            rect: placement.rect,
            anchor: placement.anchor,
            size: style.size,
            color: style.color,
            fallback: placement.fallback,
        }
    }

    /// "East", "North" and "Elev" style names at fixed cube corners.
    pub fn place_axis_names(
        &mut self,
        ctx: &LabelContext<'_>,
        names: &[String; 3],
        style: &LabelStyle,
    ) -> Vec<PlacedText> {
        let ext = ctx.limits.extent();
        let spots = [
            (Axis::X, DVec3::new(ext.xmax, ext.ymin, ext.zmax), &AXIS_NAME_ORDER),
            (Axis::Y, DVec3::new(ext.xmin, ext.ymax, ext.zmax), &AXIS_NAME_ORDER),
            (Axis::Z, DVec3::new(ext.xmin, ext.ymin, ext.zmin), &BOTTOM_AXIS_NAME_ORDER),
        ];

        let mut out = Vec::new();
        for (axis, at, order) in spots {
            let name = &names[axis.index()];
            if name.is_empty() || !ctx.limits.axis(axis).is_valid() {
                continue;
            }
            let Some(raster) = ctx.raster(at) else {
                continue;
            };
            let size = self
                .cache
                .glyph(TextSlot::Name(axis), name, style.size, &*self.glyphs)
                .size();
            let placement = self.place_label(raster, size, order, ctx.outline);
            out.push(self.placed(name.clone(), raster, placement, style));
        }
        out
    }

    /// Tick numbers along the four cube edges parallel to `axis`.
    pub fn place_axis_numbers(
        &mut self,
        ctx: &LabelContext<'_>,
        axis: Axis,
        style: &LabelStyle,
    ) -> Vec<PlacedText> {
        // Numbers hang off the cube edges, which need all three ranges.
        if !Axis::ALL.iter().all(|&a| ctx.limits.axis(a).is_valid()) {
            return Vec::new();
        }
        let limits = ctx.limits.axis(axis);
        let unit = ctx.units.for_axis(axis);
        let decimals = decimals_for_range((limits.max - limits.min) / unit);
        let ext = ctx.limits.extent();

        let mut out = Vec::new();
        let mut slot = 0;
        for (u, v) in edge_offsets(axis, &ext) {
            let start = point_on_edge(axis, limits.min, u, v);
            let end = point_on_edge(axis, limits.max, u, v);
            let (Some(a), Some(b)) = (ctx.raster(start), ctx.raster(end)) else {
                continue;
            };
            if ctx.raster((start + end) * 0.5).is_some_and(|m| edge_hidden(ctx.outline, m)) {
                continue;
            }

            let orientation = classify_edge(a, b);
            let candidates: Vec<Candidate> = match orientation {
                EdgeOrientation::Horizontal => HORIZONTAL_EDGE_PREPASS
                    .iter()
                    .chain(AXIS_NUMBER_ORDER.iter())
                    .copied()
                    .collect(),
                _ => AXIS_NUMBER_ORDER.to_vec(),
            };

            for t in limits.interior_ticks() {
                let Some(raster) = ctx.raster(point_on_edge(axis, t, u, v)) else {
                    continue;
                };
                let text = format_tick(t / unit, decimals);
                let size = self
                    .cache
                    .glyph(TextSlot::Number { axis, index: slot }, &text, style.size, &*self.glyphs)
                    .size();
                slot += 1;
                let placement = self.place_label(raster, size, &candidates, ctx.outline);
                if placement.fallback {
                    debug!(?axis, %text, "tick number fell back to default anchor");
                }
                out.push(self.placed(text, raster, placement, style));
            }
        }
        out
    }

    /// Free text at its own anchor. Not checked against the outline.
    pub fn place_annotation(&self, raster: DVec2, text: &str, anchor: Anchor, style: &LabelStyle) -> PlacedText {
        let size = self.glyphs.rasterize(text, style.size).size();
        let placement = Placement {
            anchor,
            rect: anchor_rect(raster, anchor, DVec2::ZERO, size),
            fallback: false,
        };
        self.placed(text.to_owned(), raster, placement, style)
    }
}

/// The fixed coordinates of the four cube edges parallel to `axis`.
fn edge_offsets(axis: Axis, ext: &Extent3D) -> [(f64, f64); 4] {
    let (u, v) = match axis {
        Axis::X => ((ext.ymin, ext.ymax), (ext.zmin, ext.zmax)),
        Axis::Y => ((ext.xmin, ext.xmax), (ext.zmin, ext.zmax)),
        Axis::Z => ((ext.xmin, ext.xmax), (ext.ymin, ext.ymax)),
    };
    match axis {
        Axis::Z => [(u.0, v.0), (u.1, v.0), (u.0, v.1), (u.1, v.1)],
        _ => [(u.0, v.0), (u.0, v.1), (u.1, v.0), (u.1, v.1)],
    }
}

fn point_on_edge(axis: Axis, t: f64, u: f64, v: f64) -> DVec3 {
    match axis {
        Axis::X => DVec3::new(t, u, v),
        Axis::Y => DVec3::new(u, t, v),
        Axis::Z => DVec3::new(u, v, t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Never;
    impl TextPositionFilter for Never {
        fn check_text_position(&self, _: &ScreenRect) -> bool {
            false
        }
    }

    struct Always;
    impl TextPositionFilter for Always {
        fn check_text_position(&self, _: &ScreenRect) -> bool {
            true
        }
    }

    #[test]
    fn anchor_numbers_round_trip() {
        for n in 1..=9 {
            assert_eq!(Anchor::from_number(n).map(Anchor::number), Some(n));
        }
        assert_eq!(Anchor::from_number(0), None);
        assert_eq!(Anchor::from_number(10), None);
    }

    #[test]
    fn anchor_rect_geometry() {
        let p = DVec2::new(100.0, 100.0);
        let size = DVec2::new(40.0, 10.0);
        let r = anchor_rect(p, BottomCenter, DVec2::new(0.0, 15.0), size);
        assert_eq!(r, ScreenRect::new(80.0, 115.0, 120.0, 125.0));
        let r = anchor_rect(p, TopRight, DVec2::ZERO, size);
        assert_eq!(r, ScreenRect::new(60.0, 90.0, 100.0, 100.0));
        let r = anchor_rect(p, Center, DVec2::ZERO, size);
        assert_eq!(r, ScreenRect::new(80.0, 95.0, 120.0, 105.0));
    }

    #[test]
    fn narrow_left_anchored_text_is_widened() {
        let r = anchor_rect(DVec2::ZERO, CenterLeft, DVec2::new(5.0, 0.0), DVec2::new(8.0, 10.0));
        assert_eq!(r.width(), 20.0);
        let r = anchor_rect(DVec2::ZERO, CenterRight, DVec2::ZERO, DVec2::new(8.0, 10.0));
        assert_eq!(r.width(), 8.0);
    }

    #[test]
    fn edge_classification_uses_slope_cutoff() {
        let o = DVec2::ZERO;
        assert_eq!(classify_edge(o, DVec2::new(100.0, 19.0)), EdgeOrientation::Horizontal);
        assert_eq!(classify_edge(o, DVec2::new(100.0, 21.0)), EdgeOrientation::Oblique);
        assert_eq!(classify_edge(o, DVec2::new(19.0, 100.0)), EdgeOrientation::Vertical);
        assert_eq!(classify_edge(o, DVec2::new(50.0, 50.0)), EdgeOrientation::Oblique);
    }

    #[test]
    fn edges_grazing_the_outline_stay_visible() {
        let outline = ProjectedOutline::from_points([
            DVec2::new(100.0, 100.0),
            DVec2::new(200.0, 100.0),
            DVec2::new(200.0, 200.0),
            DVec2::new(100.0, 200.0),
        ]);
        assert!(edge_hidden(&outline, DVec2::new(150.0, 150.0)));
        assert!(edge_hidden(&outline, DVec2::new(197.5, 150.0)));
        // 1.5 px inside still grazes the silhouette.
        assert!(!edge_hidden(&outline, DVec2::new(198.5, 150.0)));
        assert!(!edge_hidden(&outline, DVec2::new(201.0, 150.0)));
        assert!(!edge_hidden(&ProjectedOutline::default(), DVec2::new(150.0, 150.0)));
    }

    #[test]
    fn first_clear_candidate_wins() {
        let placer = LabelPlacer::default();
        let p = placer.place_label(DVec2::ZERO, DVec2::new(10.0, 5.0), &AXIS_NAME_ORDER, &Never);
        assert_eq!(p.anchor, BottomCenter);
        assert!(!p.fallback);
    }

    #[test]
    fn exhausted_candidates_fall_back() {
        let placer = LabelPlacer::default();
        let p = placer.place_label(DVec2::new(5.0, 5.0), DVec2::new(10.0, 5.0), &AXIS_NUMBER_ORDER, &Always);
        assert!(p.fallback);
        assert_eq!(p.anchor, BottomLeft);
        assert_eq!((p.rect.x1, p.rect.y1), (5.0, 5.0));
    }

    #[test]
    fn position_lock_restricts_anchors() {
        let mut placer = LabelPlacer::default();
        placer.set_position_lock(Some(TopCenter));
        let p = placer.place_label(DVec2::ZERO, DVec2::new(10.0, 5.0), &AXIS_NAME_ORDER, &Never);
        assert_eq!(p.anchor, TopCenter);
        let p = placer.place_label(DVec2::ZERO, DVec2::new(10.0, 5.0), &AXIS_NAME_ORDER, &Always);
        assert_eq!(p.anchor, TopCenter);
        assert!(p.fallback);
    }

    #[test]
    fn glyph_cache_reuses_unchanged_slots() {
        let mut cache = GlyphCache::default();
        let glyphs = BlockGlyphs::default();
        let slot = TextSlot::Number {
            axis: Axis::Y,
            index: 3,
        };
        cache.glyph(slot, "120", 12.0, &glyphs);
        cache.glyph(slot, "120", 12.0, &glyphs);
        assert_eq!(cache.rasterized(), 1);
        cache.glyph(slot, "140", 12.0, &glyphs);
        cache.glyph(slot, "140", 14.0, &glyphs);
        assert_eq!(cache.rasterized(), 3);
        assert_eq!(cache.get(slot).map(|d| d.text.as_str()), Some("140"));
        assert!(cache.get(TextSlot::Name(Axis::Y)).is_none());
    }

    #[test]
    fn bitmap_rows_are_word_padded() {
        let b = BlockGlyphs::default().rasterize("42", 10.0);
        assert_eq!((b.width, b.height), (12, 10));
        assert_eq!(b.stride, 4);
        assert_eq!(b.bits.len(), 40);
        assert!(b.get(1, 1));
        assert!(!b.get(0, 0));
        assert_eq!(b.bits[4], 0x79);
    }
}
