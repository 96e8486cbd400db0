//! Starting visual state for a transition batch.
//!
//! Runs once per transition, before any handler sees it. All top-level participants
//! are reparented into the batch root and layered by the batch direction, their own
//! mode and their destination z-order:
//!
//! | mode           | opening batch                         | closing batch        |
//! |----------------|---------------------------------------|----------------------|
//! | open/to-front  | top, alpha 0 (1 with starting window) | bottom, alpha 1      |
//! | close/to-back  | bottom, visibility untouched          | top, untouched       |
//! | change         | top                                   | top                  |
//!
//! "Top" keeps the destination order among the raised participants (`len - index`),
//! "bottom" does the same below zero (`-index`). Batches that are not opening use the
//! closing column.

use surface_api::{Matrix2, Point, SurfaceId, Transaction};

use crate::info::{Change, TransitionInfo, TransitionMode};

/// Append the starting state of `info` to `t`.
pub fn setup_start_state(info: &TransitionInfo, t: &mut Transaction) {
    let is_opening = info.kind.is_opening();
    if let Some(root) = info.root {
        t.show(root);
    }

    let count = info.changes.len();
    // top-to-bottom in z
    for (index, change) in info.changes.iter().enumerate().rev() {
        let surface = change.surface;

        // Don't move anything with an animating parent
        if !change.is_top_level() {
            if change.mode.is_showing() || change.mode == TransitionMode::Change {
                t.show(surface)
                    .set_matrix(surface, Matrix2::IDENTITY)
                    .set_alpha(surface, 1.0)
                    .set_position(surface, change.end_rel_offset);
            }
            continue;
        }

        t.reparent(surface, info.root);
        t.set_position(surface, position_in_root(change, info.root_offset));

        let top = top_layer(count, index);
        let bottom = bottom_layer(index);
        match change.mode {
            TransitionMode::Open | TransitionMode::ToFront => {
                t.show(surface).set_matrix(surface, Matrix2::IDENTITY);
                if is_opening {
                    let alpha = if change.received_starting_window() {
                        1.0
                    } else {
                        0.0
                    };
                    t.set_layer(surface, top).set_alpha(surface, alpha);
                } else {
                    t.set_layer(surface, bottom).set_alpha(surface, 1.0);
                }
            }
            TransitionMode::Close | TransitionMode::ToBack => {
                let layer = if is_opening { bottom } else { top };
                t.set_layer(surface, layer);
            }
            TransitionMode::Change => {
                t.set_layer(surface, top);
            }
        }
    }
}

/// Convenience wrapper returning a fresh transaction.
pub fn start_state(info: &TransitionInfo) -> Transaction {
    let mut t = Transaction::new();
    setup_start_state(info, &mut t);
    t
}

/// Surfaces the default animation fades, top-to-bottom, paired with whether each fades in.
///
/// Only top-level participants whose mode matches the batch direction are animated;
/// a participant that already received a starting window is left as is.
pub fn default_fade_targets(info: &TransitionInfo) -> Vec<(SurfaceId, bool)> {
    let is_opening = info.kind.is_opening();
    info.changes
        .iter()
        .rev()
        .filter(|c| c.is_top_level())
        .filter_map(|c| {
            if is_opening && c.mode.is_showing() {
                (!c.received_starting_window()).then_some((c.surface, true))
            } else if !is_opening && c.mode.is_hiding() {
                Some((c.surface, false))
            } else {
                None
            }
        })
        .collect()
}

#[inline]
fn position_in_root(change: &Change, root_offset: Point) -> Point {
    Point::new(
        change.start_bounds.left - root_offset.x,
        change.start_bounds.top - root_offset.y,
    )
}

#[inline]
fn top_layer(count: usize, index: usize) -> i32 {
    (count - index) as i32
}

#[inline]
fn bottom_layer(index: usize) -> i32 {
    -(index as i32)
}
