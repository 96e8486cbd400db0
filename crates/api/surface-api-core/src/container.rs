//! Window-container transactions: hierarchy changes proposed alongside a transition start.

use crate::geometry::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque id of a window container (task, display area, ...).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(pub u32);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container:{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ContainerOp {
    Reorder { container: ContainerId, on_top: bool },
    SetBounds { container: ContainerId, bounds: Rect },
    SetHidden { container: ContainerId, hidden: bool },
}

/// Hierarchy changes the authority applies together with starting a transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerTransaction(pub Vec<ContainerOp>);

impl ContainerTransaction {
    pub fn new() -> Self {
        ContainerTransaction(Vec::new())
    }

    pub fn reorder(mut self, container: ContainerId, on_top: bool) -> Self {
        self.0.push(ContainerOp::Reorder { container, on_top });
        self
    }

    pub fn set_bounds(mut self, container: ContainerId, bounds: Rect) -> Self {
        self.0.push(ContainerOp::SetBounds { container, bounds });
        self
    }

    pub fn set_hidden(mut self, container: ContainerId, hidden: bool) -> Self {
        self.0.push(ContainerOp::SetHidden { container, hidden });
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContainerOp> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
