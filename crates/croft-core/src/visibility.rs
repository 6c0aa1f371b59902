//! Line-of-sight tests against axis-aligned rectangular obstacles.

use crate::fixed::Fixed64;
use crate::geom::{Point, Rect};

/// Where the carrier line through the segment meets the boundary line
/// `base + num/den * mul`. Saturates instead of overflowing when the
/// segment runs nearly parallel to the boundary; the ordinate is only ever
/// compared against the rectangle, so a saturated value classifies the same
/// as the true, far-away one.
fn intercept(base: Fixed64, num: Fixed64, mul: Fixed64, den: Fixed64) -> Fixed64 {
    base.saturating_add(num.saturating_mul(mul).saturating_div(den))
}

/// True when the segment `p`-`q` passes through the interior of `rect`.
///
/// Contact with the boundary alone does not block: a segment running along
/// an edge or grazing past a corner stays clear, so obstacle corners remain
/// usable as waypoints. The test classifies the segment against the two
/// corner rays it could miss through; everything else crosses the interior.
pub fn segment_blocked(p: Point, q: Point, rect: &Rect) -> bool {
    // Canonical endpoint order keeps the answer symmetric under swapping
    // p and q despite fixed-point rounding in the intercepts.
    let (p0, p1) = if (p.x, p.y) <= (q.x, q.y) {
        (p, q)
    } else {
        (q, p)
    };
    let (x0, y0) = (p0.x, p0.y);
    let (x1, y1) = (p1.x, p1.y);

    // Entirely on one side of a boundary line: no interior contact.
    if x0 <= rect.l && x1 <= rect.l {
        return false;
    }
    if x0 >= rect.r && x1 >= rect.r {
        return false;
    }
    if y0 <= rect.b && y1 <= rect.b {
        return false;
    }
    if y0 >= rect.t && y1 >= rect.t {
        return false;
    }

    let dx = x1 - x0;
    let dy = y1 - y0;

    // Axis-aligned segments that survived the half-plane tests overlap the
    // open span of the rectangle on both axes.
    if dx == Fixed64::ZERO || dy == Fixed64::ZERO {
        return true;
    }

    // Ordinates where the carrier line meets each extended boundary line.
    let bx = intercept(x0, rect.b - y0, dx, dy);
    let tx = intercept(x0, rect.t - y0, dx, dy);
    let ly = intercept(y0, rect.l - x0, dy, dx);
    let ry = intercept(y0, rect.r - x0, dy, dx);

    if (dx > Fixed64::ZERO) == (dy > Fixed64::ZERO) {
        // Rising line: the only ways past are above the top-left corner or
        // below the bottom-right one.
        !((ly >= rect.t && tx <= rect.l) || (ry <= rect.b && bx >= rect.r))
    } else {
        // Falling line: past the top-right corner or the bottom-left one.
        !((ry >= rect.t && tx >= rect.r) || (ly <= rect.b && bx <= rect.l))
    }
}

/// True when any rectangle in the slice obstructs the segment.
pub fn blocked_by_any(p: Point, q: Point, obstacles: &[Rect]) -> bool {
    obstacles.iter().any(|rect| segment_blocked(p, q, rect))
}
