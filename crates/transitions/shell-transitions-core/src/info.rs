//! Transition batches as delivered by the authority when a transition is ready.
//!
//! A TransitionInfo serializes to JSON as:
//!   { "kind": "open", "root": 100, "root_offset": { "x": 0, "y": 0 },
//!     "changes": [ { "surface": 1, "mode": "open", "start_bounds": { ... } } ] }
//!
//! `changes` are in compositing order: index 0 is the bottom-most participant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

use surface_api::{Point, Rect, SurfaceId};

/// Classification of a whole transition batch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionType {
    None,
    Open,
    Close,
    ToFront,
    ToBack,
    Change,
    KeyguardGoingAway,
}

impl TransitionType {
    /// True if the transition was triggered by opening something rather than closing something.
    #[inline]
    pub fn is_opening(&self) -> bool {
        matches!(self, Self::Open | Self::ToFront | Self::KeyguardGoingAway)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Open => "open",
            Self::Close => "close",
            Self::ToFront => "to_front",
            Self::ToBack => "to_back",
            Self::Change => "change",
            Self::KeyguardGoingAway => "keyguard_going_away",
        }
    }
}

impl fmt::Display for TransitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What happens to one participant.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionMode {
    Open,
    Close,
    ToFront,
    ToBack,
    /// Resize/reparent only; visibility does not change.
    Change,
}

impl TransitionMode {
    /// Open or to-front: the participant becomes visible.
    #[inline]
    pub fn is_showing(&self) -> bool {
        matches!(self, Self::Open | Self::ToFront)
    }

    /// Close or to-back: the participant goes away.
    #[inline]
    pub fn is_hiding(&self) -> bool {
        matches!(self, Self::Close | Self::ToBack)
    }
}

/// Per-change flag bits.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeFlags(pub u32);

impl ChangeFlags {
    pub const NONE: ChangeFlags = ChangeFlags(0);
    /// The participant received a starting window transferred from another one, so it
    /// already has visible content.
    pub const STARTING_WINDOW_TRANSFER_RECIPIENT: ChangeFlags = ChangeFlags(1 << 0);

    #[inline]
    pub fn contains(&self, other: ChangeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: ChangeFlags) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ChangeFlags {
    type Output = ChangeFlags;

    fn bitor(self, rhs: ChangeFlags) -> ChangeFlags {
        ChangeFlags(self.0 | rhs.0)
    }
}

/// One participant of a transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub surface: SurfaceId,
    pub mode: TransitionMode,
    /// Set when another participant animates this one; it is then left in place.
    #[serde(default)]
    pub parent: Option<SurfaceId>,
    #[serde(default)]
    pub start_bounds: Rect,
    #[serde(default)]
    pub end_bounds: Rect,
    #[serde(default)]
    pub start_rel_offset: Point,
    #[serde(default)]
    pub end_rel_offset: Point,
    #[serde(default)]
    pub flags: ChangeFlags,
}

impl Change {
    pub fn new(surface: SurfaceId, mode: TransitionMode) -> Self {
        Self {
            surface,
            mode,
            parent: None,
            start_bounds: Rect::default(),
            end_bounds: Rect::default(),
            start_rel_offset: Point::ORIGIN,
            end_rel_offset: Point::ORIGIN,
            flags: ChangeFlags::NONE,
        }
    }

    pub fn with_parent(mut self, parent: SurfaceId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_bounds(mut self, start: Rect, end: Rect) -> Self {
        self.start_bounds = start;
        self.end_bounds = end;
        self
    }

    pub fn with_offsets(mut self, start: Point, end: Point) -> Self {
        self.start_rel_offset = start;
        self.end_rel_offset = end;
        self
    }

    pub fn with_flags(mut self, flags: ChangeFlags) -> Self {
        self.flags = flags;
        self
    }

    #[inline]
    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }

    #[inline]
    pub fn received_starting_window(&self) -> bool {
        self.flags
            .contains(ChangeFlags::STARTING_WINDOW_TRANSFER_RECIPIENT)
    }
}

/// The full batch for one transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionInfo {
    pub kind: TransitionType,
    /// Shared parent for all top-level participants. `None` means the transition
    /// has nothing to animate.
    #[serde(default)]
    pub root: Option<SurfaceId>,
    #[serde(default)]
    pub root_offset: Point,
    /// Bottom-to-top compositing order.
    #[serde(default)]
    pub changes: Vec<Change>,
}

impl TransitionInfo {
    pub fn new(kind: TransitionType, root: Option<SurfaceId>) -> Self {
        Self {
            kind,
            root,
            root_offset: Point::ORIGIN,
            changes: Vec::new(),
        }
    }

    pub fn with_root_offset(mut self, offset: Point) -> Self {
        self.root_offset = offset;
        self
    }

    /// Append a change on top of the existing ones.
    pub fn with_change(mut self, change: Change) -> Self {
        self.changes.push(change);
        self
    }

    #[inline]
    pub fn has_valid_root(&self) -> bool {
        self.root.is_some()
    }
}

impl fmt::Display for TransitionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{kind={} root=", self.kind)?;
        match self.root {
            Some(root) => write!(f, "{root}")?,
            None => write!(f, "invalid")?,
        }
        write!(f, " changes=[")?;
        for (i, c) in self.changes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{:?}", c.surface, c.mode)?;
        }
        write!(f, "]}}")
    }
}

/// The task whose action triggered a transition request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerTask {
    pub task_id: u32,
    #[serde(default)]
    pub display_id: u32,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub top_activity: Option<String>,
}

impl TriggerTask {
    pub fn new(task_id: u32) -> Self {
        Self {
            task_id,
            display_id: 0,
            visible: false,
            top_activity: None,
        }
    }
}
