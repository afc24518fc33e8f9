//! Stateless intersection tests against axis-aligned rectangles

use serde::Serialize;

/// Below this determinant two segments are treated as parallel
const PARALLEL_EPSILON: f32 = 1e-4;

/// Axis-aligned rectangle anchored at its top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Bounds are inclusive
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }
}

/// True when the circle overlaps the rectangle. Touching is not an overlap.
pub fn circle_intersects_rect(cx: f32, cy: f32, radius: f32, rect: &Rect) -> bool {
    let closest_x = cx.clamp(rect.x, rect.right());
    let closest_y = cy.clamp(rect.y, rect.bottom());
    let dx = cx - closest_x;
    let dy = cy - closest_y;
    dx * dx + dy * dy < radius * radius
}

/// True when the segment starts or ends inside the rectangle, or crosses any edge
pub fn segment_intersects_rect(x1: f32, y1: f32, x2: f32, y2: f32, rect: &Rect) -> bool {
    if rect.contains(x1, y1) || rect.contains(x2, y2) {
        return true;
    }

    let (left, top, right, bottom) = (rect.x, rect.y, rect.right(), rect.bottom());
    segments_intersect(x1, y1, x2, y2, left, top, right, top)
        || segments_intersect(x1, y1, x2, y2, left, bottom, right, bottom)
        || segments_intersect(x1, y1, x2, y2, left, top, left, bottom)
        || segments_intersect(x1, y1, x2, y2, right, top, right, bottom)
}

/// Parametric segment-segment test; both interpolation parameters must lie in [0, 1]
#[allow(clippy::too_many_arguments)]
pub fn segments_intersect(
    x1: f32, y1: f32, x2: f32, y2: f32,
    x3: f32, y3: f32, x4: f32, y4: f32,
) -> bool {
    let denom = (y4 - y3) * (x2 - x1) - (x4 - x3) * (y2 - y1);
    if denom.abs() < PARALLEL_EPSILON {
        return false;
    }
    let ua = ((x4 - x3) * (y1 - y3) - (y4 - y3) * (x1 - x3)) / denom;
    let ub = ((x2 - x1) * (y1 - y3) - (y2 - y1) * (x1 - x3)) / denom;
    (0.0..=1.0).contains(&ua) && (0.0..=1.0).contains(&ub)
}

/// Euclidean distance between two points
pub fn distance(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    (dx * dx + dy * dy).sqrt()
}
