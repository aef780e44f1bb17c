use smithay::utils::{Logical, Point, Rectangle, Size};

pub mod id;

/// Center of a rectangle.
pub fn center(rect: Rectangle<f64, Logical>) -> Point<f64, Logical> {
    Point::from((rect.loc.x + rect.size.w / 2., rect.loc.y + rect.size.h / 2.))
}

/// Whether a rectangle covers no area.
pub fn is_empty(rect: Rectangle<f64, Logical>) -> bool {
    rect.size.w <= 0. || rect.size.h <= 0.
}

/// Point inside `rect` closest to `point`.
///
/// Returns `point` itself if it's already inside. An empty rectangle yields its origin.
pub fn closest_point(rect: Rectangle<f64, Logical>, point: Point<f64, Logical>) -> Point<f64, Logical> {
    if is_empty(rect) {
        return rect.loc;
    }

    let x = point.x.clamp(rect.loc.x, rect.loc.x + rect.size.w);
    let y = point.y.clamp(rect.loc.y, rect.loc.y + rect.size.h);
    Point::from((x, y))
}

/// Whether `point` lies inside `rect`, the right and bottom edges excluded.
pub fn contains_point(rect: Rectangle<f64, Logical>, point: Point<f64, Logical>) -> bool {
    !is_empty(rect)
        && point.x >= rect.loc.x
        && point.x < rect.loc.x + rect.size.w
        && point.y >= rect.loc.y
        && point.y < rect.loc.y + rect.size.h
}

pub fn distance_sq(a: Point<f64, Logical>, b: Point<f64, Logical>) -> f64 {
    let (dx, dy) = (a.x - b.x, a.y - b.y);
    dx * dx + dy * dy
}

/// Shrinks a rectangle by the given amounts, never going below zero size.
pub fn inset(
    rect: Rectangle<f64, Logical>,
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
) -> Rectangle<f64, Logical> {
    let w = (rect.size.w - left - right).max(0.);
    let h = (rect.size.h - top - bottom).max(0.);
    Rectangle::new(
        Point::from((rect.loc.x + left, rect.loc.y + top)),
        Size::from((w, h)),
    )
}

/// Bounding box of all non-empty rectangles, or a zero rectangle if there are none.
pub fn bounding_box(
    rects: impl IntoIterator<Item = Rectangle<f64, Logical>>,
) -> Rectangle<f64, Logical> {
    let mut rv: Option<(Point<f64, Logical>, Point<f64, Logical>)> = None;
    for rect in rects.into_iter().filter(|r| !is_empty(*r)) {
        let lo = rect.loc;
        let hi = Point::from((rect.loc.x + rect.size.w, rect.loc.y + rect.size.h));
        rv = Some(match rv {
            None => (lo, hi),
            Some((a, b)) => (
                Point::from((a.x.min(lo.x), a.y.min(lo.y))),
                Point::from((b.x.max(hi.x), b.y.max(hi.y))),
            ),
        });
    }

    match rv {
        Some((lo, hi)) => Rectangle::new(lo, Size::from((hi.x - lo.x, hi.y - lo.y))),
        None => Rectangle::default(),
    }
}

/// Index of the rectangle that contains `point`, or else the one closest to it.
pub fn closest_rect(
    rects: impl IntoIterator<Item = Rectangle<f64, Logical>>,
    point: Point<f64, Logical>,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, rect) in rects.into_iter().enumerate() {
        if contains_point(rect, point) {
            return Some(idx);
        }

        let dist = distance_sq(closest_point(rect, point), point);
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((idx, dist));
        }
    }
    best.map(|(idx, _)| idx)
}

pub fn to_ipc_rect(rect: Rectangle<f64, Logical>) -> trellis_ipc::Rect {
    trellis_ipc::Rect {
        x: rect.loc.x,
        y: rect.loc.y,
        width: rect.size.w,
        height: rect.size.h,
    }
}
