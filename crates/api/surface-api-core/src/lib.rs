//! surface-api-core: surface handles, geometry and transactions (compositor-agnostic)
//!
//! The transition core never talks to a compositor directly. It describes what it
//! wants in a [`Transaction`] and hands that to whoever owns the surfaces. Handlers
//! that need the window hierarchy changed up front propose a [`ContainerTransaction`].

pub mod container;
pub mod geometry;
pub mod transaction;

pub use container::{ContainerId, ContainerOp, ContainerTransaction};
pub use geometry::{Matrix2, Point, Rect, SurfaceId};
pub use transaction::{SurfaceOp, Transaction, TransactionError};
