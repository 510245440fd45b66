//! What a resolved pick means, depending on the current interaction mode.

use crate::core::SurfaceKind;
use crate::view::picking::{PickButton, names};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Decoded name path of a pick winner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickTarget {
    Surface {
        kind: SurfaceKind,
        index: usize,
        triangle: usize,
    },
    Line {
        index: usize,
        /// 0-based segment, when the path carries one.
        segment: Option<usize>,
    },
    Point {
        index: usize,
    },
    Text {
        index: usize,
    },
    Trap,
}

impl PickTarget {
    pub fn decode(path: &[u32]) -> Option<Self> {
        let at = |i: usize| path.get(i).map(|&n| n as usize);
        let target = match *path.first()? {
            names::HORIZON | names::FAULT | names::EXTERNAL_SURFACE => {
                if path.get(2) != Some(&names::TRIANGLES) {
                    return None;
                }
                let kind = match path[0] {
                    names::HORIZON => SurfaceKind::Horizon,
                    names::FAULT => SurfaceKind::Fault,
                    _ => SurfaceKind::External,
                };
                PickTarget::Surface {
                    kind,
                    index: at(1)?,
                    triangle: at(3)?,
                }
            }
            names::LINE => PickTarget::Line {
                index: at(1)?,
                segment: at(5),
            },
            names::POINT => PickTarget::Point { index: at(1)? },
            names::TEXT => PickTarget::Text { index: at(1)? },
            names::TRAP => PickTarget::Trap,
            _ => return None,
        };
        Some(target)
    }

    pub fn object(&self) -> Option<ObjectKey> {
        match *self {
            PickTarget::Surface { index, .. } => Some(ObjectKey::Surface(index)),
            PickTarget::Line { index, .. } => Some(ObjectKey::Line(index)),
            PickTarget::Point { index } => Some(ObjectKey::Point(index)),
            PickTarget::Text { index } => Some(ObjectKey::Text(index)),
            PickTarget::Trap => None,
        }
    }

    /// Surfaces and the trap plane can receive new positions.
    fn is_placement_target(&self) -> bool {
        matches!(self, PickTarget::Surface { .. } | PickTarget::Trap)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ObjectKey {
    Surface(usize),
    Line(usize),
    Point(usize),
    Text(usize),
}

/// Objects selected through picking. Domain entities are never mutated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    keys: BTreeSet<ObjectKey>,
}

impl Selection {
    pub fn contains(&self, key: ObjectKey) -> bool {
        self.keys.contains(&key)
    }

    pub fn select_only(&mut self, key: ObjectKey) {
        self.keys.clear();
        self.keys.insert(key);
    }

    /// Returns whether the object is selected afterwards.
    pub fn toggle(&mut self, key: ObjectKey) -> bool {
        if self.keys.remove(&key) {
            false
        } else {
            self.keys.insert(key);
            true
        }
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ObjectKey> + '_ {
        self.keys.iter().copied()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum InteractionMode {
    #[default]
    Selection,
    /// Digitizing a line by clicking on surfaces.
    LineEdit { points: Vec<DVec3> },
    /// Dragging scene points onto surfaces: first click grabs, second drops.
    PointEdit { grabbed: Option<usize> },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PickEvent {
    Selected { target: PickTarget, point: Option<DVec3> },
    Toggled { target: PickTarget, selected: bool },
    /// The view should center on this world position.
    Recenter { point: DVec3 },
    EditPointAdded { point: DVec3, count: usize },
    EditLineFinished { points: Vec<DVec3> },
    PointGrabbed { index: usize },
    PointMoved { index: usize, to: DVec3 },
    PointReleased { index: usize },
    Ignored { target: PickTarget },
}

impl InteractionMode {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionMode::Selection => "selection",
            InteractionMode::LineEdit { .. } => "line edit",
            InteractionMode::PointEdit { .. } => "point edit",
        }
    }

    pub fn handle(
        &mut self,
        target: PickTarget,
        point: Option<DVec3>,
        button: PickButton,
        selection: &mut Selection,
    ) -> PickEvent {
        let ignored = PickEvent::Ignored { target };
        if button == PickButton::Middle {
            return point.map_or(ignored, |point| PickEvent::Recenter { point });
        }

        match self {
            InteractionMode::Selection => match (button, target.object()) {
                (PickButton::Left, Some(key)) => {
                    selection.select_only(key);
                    PickEvent::Selected { target, point }
                }
                (_, Some(key)) => PickEvent::Toggled {
                    target,
                    selected: selection.toggle(key),
                },
                (_, None) => ignored,
            },
            InteractionMode::LineEdit { points } => match (button, point) {
                (PickButton::Left, Some(p)) if target.is_placement_target() => {
                    points.push(p);
                    PickEvent::EditPointAdded {
                        point: p,
                        count: points.len(),
                    }
                }
                (PickButton::Right, _) if points.len() >= 2 => PickEvent::EditLineFinished {
                    points: std::mem::take(points),
                },
                _ => ignored,
            },
            InteractionMode::PointEdit { grabbed } => match (button, *grabbed, target, point) {
                (PickButton::Left, None, PickTarget::Point { index }, _) => {
                    *grabbed = Some(index);
                    PickEvent::PointGrabbed { index }
                }
                (PickButton::Left, Some(index), t, Some(to)) if t.is_placement_target() => {
                    *grabbed = None;
                    PickEvent::PointMoved { index, to }
                }
                (PickButton::Right, Some(index), _, _) => {
                    *grabbed = None;
                    PickEvent::PointReleased { index }
                }
                _ => ignored,
            },
        }
    }
}
