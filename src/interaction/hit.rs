use crate::canvas::geometry::{Anchor, Point};
use crate::model::SlotKind;

/// Connection ends snap to anchors strictly closer than this.
pub const SNAP_RADIUS: f64 = 20.0;

/// Nearest anchor of `kind` to `cursor` within [`SNAP_RADIUS`].
///
/// The radius shrinks to the best distance seen so far and only strictly
/// closer anchors replace the best one, so the first anchor wins exact ties.
pub fn nearest_anchor<'a>(anchors: &'a [Anchor], kind: SlotKind, cursor: Point) -> Option<&'a Anchor> {
    let mut radius = SNAP_RADIUS;
    let mut best = None;
    for anchor in anchors.iter().filter(|a| a.kind == kind) {
        let distance = anchor.pos.distance(cursor);
        if distance < radius {
            radius = distance;
            best = Some(anchor);
        }
    }
    best
}
