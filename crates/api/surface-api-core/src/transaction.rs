//! Surface transactions: ordered surface operations applied atomically by the compositor.
//!
//! A Transaction serializes to JSON as an array of tagged ops:
//!   [ { "op": "show", "surface": 3 }, { "op": "set_alpha", "surface": 3, "alpha": 0.0 } ]
//!
//! Ops are kept in submission order; later ops on the same surface win when applied,
//! and the `*_of` queries below follow the same last-writer-wins rule.

use crate::geometry::{Matrix2, Point, SurfaceId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SurfaceOp {
    Show {
        surface: SurfaceId,
    },
    Hide {
        surface: SurfaceId,
    },
    /// Move `surface` under `parent`; `None` detaches it.
    Reparent {
        surface: SurfaceId,
        parent: Option<SurfaceId>,
    },
    SetPosition {
        surface: SurfaceId,
        position: Point,
    },
    /// Relative z within the parent; higher draws on top. May be negative.
    SetLayer {
        surface: SurfaceId,
        layer: i32,
    },
    SetAlpha {
        surface: SurfaceId,
        alpha: f32,
    },
    SetMatrix {
        surface: SurfaceId,
        matrix: Matrix2,
    },
}

impl SurfaceOp {
    pub fn surface(&self) -> SurfaceId {
        match self {
            SurfaceOp::Show { surface }
            | SurfaceOp::Hide { surface }
            | SurfaceOp::Reparent { surface, .. }
            | SurfaceOp::SetPosition { surface, .. }
            | SurfaceOp::SetLayer { surface, .. }
            | SurfaceOp::SetAlpha { surface, .. }
            | SurfaceOp::SetMatrix { surface, .. } => *surface,
        }
    }
}

impl fmt::Display for SurfaceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceOp::Show { surface } => write!(f, "show {surface}"),
            SurfaceOp::Hide { surface } => write!(f, "hide {surface}"),
            SurfaceOp::Reparent {
                surface,
                parent: Some(p),
            } => write!(f, "reparent {surface} -> {p}"),
            SurfaceOp::Reparent {
                surface,
                parent: None,
            } => write!(f, "detach {surface}"),
            SurfaceOp::SetPosition { surface, position } => {
                write!(f, "position {surface} ({}, {})", position.x, position.y)
            }
            SurfaceOp::SetLayer { surface, layer } => write!(f, "layer {surface} {layer}"),
            SurfaceOp::SetAlpha { surface, alpha } => write!(f, "alpha {surface} {alpha}"),
            SurfaceOp::SetMatrix { surface, matrix } => {
                write!(f, "matrix {surface} {:?}", matrix.0)
            }
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TransactionError {
    #[error("transaction json parse error: {0}")]
    Parse(String),
    #[error("alpha {alpha} for {surface} is outside [0, 1]")]
    InvalidAlpha { surface: SurfaceId, alpha: f32 },
}

/// A batch of surface operations. Applied as a unit by a compositor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transaction(pub Vec<SurfaceOp>);

impl Transaction {
    pub fn new() -> Self {
        Transaction(Vec::new())
    }

    /// Parse and validate a JSON op array.
    pub fn from_json(text: &str) -> Result<Self, TransactionError> {
        let t: Transaction =
            serde_json::from_str(text).map_err(|e| TransactionError::Parse(e.to_string()))?;
        t.validate()?;
        Ok(t)
    }

    pub fn validate(&self) -> Result<(), TransactionError> {
        for op in &self.0 {
            if let SurfaceOp::SetAlpha { surface, alpha } = op {
                if !(0.0..=1.0).contains(alpha) {
                    return Err(TransactionError::InvalidAlpha {
                        surface: *surface,
                        alpha: *alpha,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn push(&mut self, op: SurfaceOp) -> &mut Self {
        self.0.push(op);
        self
    }

    pub fn show(&mut self, surface: SurfaceId) -> &mut Self {
        self.push(SurfaceOp::Show { surface })
    }

    pub fn hide(&mut self, surface: SurfaceId) -> &mut Self {
        self.push(SurfaceOp::Hide { surface })
    }

    pub fn reparent(&mut self, surface: SurfaceId, parent: Option<SurfaceId>) -> &mut Self {
        self.push(SurfaceOp::Reparent { surface, parent })
    }

    pub fn set_position(&mut self, surface: SurfaceId, position: Point) -> &mut Self {
        self.push(SurfaceOp::SetPosition { surface, position })
    }

    pub fn set_layer(&mut self, surface: SurfaceId, layer: i32) -> &mut Self {
        self.push(SurfaceOp::SetLayer { surface, layer })
    }

    pub fn set_alpha(&mut self, surface: SurfaceId, alpha: f32) -> &mut Self {
        self.push(SurfaceOp::SetAlpha { surface, alpha })
    }

    pub fn set_matrix(&mut self, surface: SurfaceId, matrix: Matrix2) -> &mut Self {
        self.push(SurfaceOp::SetMatrix { surface, matrix })
    }

    /// Merge another transaction in-place (append).
    pub fn merge(&mut self, mut other: Transaction) -> &mut Self {
        self.0.append(&mut other.0);
        self
    }

    /// Move all ops out, leaving this transaction empty.
    pub fn take(&mut self) -> Transaction {
        std::mem::take(self)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SurfaceOp> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<SurfaceOp> {
        self.0
    }

    /// All ops touching `surface`, in submission order.
    pub fn ops_for(&self, surface: SurfaceId) -> impl Iterator<Item = &SurfaceOp> {
        self.0.iter().filter(move |op| op.surface() == surface)
    }

    pub fn alpha_of(&self, surface: SurfaceId) -> Option<f32> {
        self.ops_for(surface).fold(None, |acc, op| match op {
            SurfaceOp::SetAlpha { alpha, .. } => Some(*alpha),
            _ => acc,
        })
    }

    pub fn layer_of(&self, surface: SurfaceId) -> Option<i32> {
        self.ops_for(surface).fold(None, |acc, op| match op {
            SurfaceOp::SetLayer { layer, .. } => Some(*layer),
            _ => acc,
        })
    }

    pub fn position_of(&self, surface: SurfaceId) -> Option<Point> {
        self.ops_for(surface).fold(None, |acc, op| match op {
            SurfaceOp::SetPosition { position, .. } => Some(*position),
            _ => acc,
        })
    }

    pub fn matrix_of(&self, surface: SurfaceId) -> Option<Matrix2> {
        self.ops_for(surface).fold(None, |acc, op| match op {
            SurfaceOp::SetMatrix { matrix, .. } => Some(*matrix),
            _ => acc,
        })
    }

    /// `Some(Some(parent))` after a reparent, `Some(None)` after a detach.
    pub fn parent_of(&self, surface: SurfaceId) -> Option<Option<SurfaceId>> {
        self.ops_for(surface).fold(None, |acc, op| match op {
            SurfaceOp::Reparent { parent, .. } => Some(*parent),
            _ => acc,
        })
    }

    /// Visibility after the last show/hide, `None` when untouched.
    pub fn visibility_of(&self, surface: SurfaceId) -> Option<bool> {
        self.ops_for(surface).fold(None, |acc, op| match op {
            SurfaceOp::Show { .. } => Some(true),
            SurfaceOp::Hide { .. } => Some(false),
            _ => acc,
        })
    }
}

impl FromIterator<SurfaceOp> for Transaction {
    fn from_iter<I: IntoIterator<Item = SurfaceOp>>(iter: I) -> Self {
        Transaction(iter.into_iter().collect())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, op) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{op}")?;
        }
        write!(f, "]")
    }
}
