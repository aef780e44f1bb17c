//! Tiling layout algorithms.
//!
//! Each [`LayoutMode`] maps the area of a container (or workspace) onto boxes for its children.
//! These are pure functions; [`super::arrange`] feeds them the tree and writes the results back.

use smithay::utils::{Logical, Point, Rectangle, Size};
use trellis_ipc::LayoutMode;

/// Where one child goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChildBox {
    pub geometry: Rectangle<f64, Logical>,
    /// Title bar strip reserved for the child by a stacked parent.
    pub title_bar: Option<Rectangle<f64, Logical>>,
}

impl ChildBox {
    fn plain(geometry: Rectangle<f64, Logical>) -> Self {
        Self {
            geometry,
            title_bar: None,
        }
    }
}

/// Parameters shared by all layouts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilingParams {
    /// Gap between adjacent children.
    pub gap: f64,
    /// Height of one title bar strip in stacked layouts.
    pub titlebar_height: f64,
    /// Whether a lone stacked child goes without a title bar strip.
    pub collapse_single: bool,
}

fn rect(x: f64, y: f64, w: f64, h: f64) -> Rectangle<f64, Logical> {
    Rectangle::new(Point::from((x, y)), Size::from((w.max(0.), h.max(0.))))
}

/// Normalizes child shares, falling back to equal ones if they are unusable.
fn shares(percents: &[f64], count: usize) -> Vec<f64> {
    let total: f64 = percents.iter().take(count).copied().sum();
    if percents.len() >= count && total > f64::EPSILON {
        percents.iter().take(count).map(|p| p / total).collect()
    } else {
        vec![1. / count as f64; count]
    }
}

/// Splits `length` into `count` parts separated by `gap`. The last part takes the remainder.
fn split(start: f64, length: f64, shares: &[f64], gap: f64) -> Vec<(f64, f64)> {
    let count = shares.len();
    let total_gap = gap * count.saturating_sub(1) as f64;
    let available = (length - total_gap).max(0.);

    let mut rv = Vec::with_capacity(count);
    let mut cursor = start;
    let mut used = 0.;
    for (idx, share) in shares.iter().enumerate() {
        let size = if idx + 1 == count {
            (available - used).max(0.)
        } else {
            (available * share).max(0.)
        };
        rv.push((cursor, size));
        used += size;
        cursor += size + gap;
    }
    rv
}

/// Computes the boxes of `count` children laid out in `area`.
///
/// `percents` are the width shares of [`LayoutMode::Horizontal`] children; other layouts
/// ignore them.
pub fn layout_children(
    layout: LayoutMode,
    area: Rectangle<f64, Logical>,
    percents: &[f64],
    count: usize,
    params: TilingParams,
) -> Vec<ChildBox> {
    if count == 0 {
        return Vec::new();
    }

    let _span = tracy_client::span!("tiling::layout_children");

    let (loc, size) = (area.loc, area.size);
    let gap = params.gap;

    match layout {
        LayoutMode::None => {
            let bar_height = if count == 1 && params.collapse_single {
                0.
            } else {
                params.titlebar_height
            };
            let bars_height = (bar_height * count as f64).min(size.h).max(0.);
            let content = rect(loc.x, loc.y + bars_height, size.w, size.h - bars_height);

            (0..count)
                .map(|idx| {
                    let title_bar = (bar_height > 0.)
                        .then(|| rect(loc.x, loc.y + bar_height * idx as f64, size.w, bar_height));
                    ChildBox {
                        geometry: content,
                        title_bar,
                    }
                })
                .collect()
        }
        LayoutMode::Horizontal => split(loc.x, size.w, &shares(percents, count), gap)
            .into_iter()
            .map(|(x, w)| ChildBox::plain(rect(x, loc.y, w, size.h)))
            .collect(),
        LayoutMode::OneTwo | LayoutMode::TwoOne => {
            if count == 1 {
                return vec![ChildBox::plain(area)];
            }

            let ratio = if layout == LayoutMode::OneTwo {
                1. / 3.
            } else {
                2. / 3.
            };
            let master_w = ((size.w - gap) * ratio).max(0.);
            let stack_x = loc.x + master_w + gap;
            let stack_w = size.w - master_w - gap;

            let mut rv = vec![ChildBox::plain(rect(loc.x, loc.y, master_w, size.h))];
            let stack = vec![1. / (count - 1) as f64; count - 1];
            rv.extend(
                split(loc.y, size.h, &stack, gap)
                    .into_iter()
                    .map(|(y, h)| ChildBox::plain(rect(stack_x, y, stack_w, h))),
            );
            rv
        }
        LayoutMode::Grid => {
            let cols = (count as f64).sqrt().ceil().max(1.) as usize;
            let rows = count.div_ceil(cols);

            let columns = split(loc.x, size.w, &vec![1. / cols as f64; cols], gap);
            let rows = split(loc.y, size.h, &vec![1. / rows as f64; rows], gap);

            (0..count)
                .map(|idx| {
                    let (x, w) = columns[idx % cols];
                    let (y, h) = rows[idx / cols];
                    ChildBox::plain(rect(x, y, w, h))
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: TilingParams = TilingParams {
        gap: 10.,
        titlebar_height: 20.,
        collapse_single: false,
    };

    fn area() -> Rectangle<f64, Logical> {
        rect(0., 0., 1000., 600.)
    }

    fn boxes(layout: LayoutMode, percents: &[f64], count: usize) -> Vec<Rectangle<f64, Logical>> {
        layout_children(layout, area(), percents, count, PARAMS)
            .into_iter()
            .map(|b| b.geometry)
            .collect()
    }

    #[test]
    fn horizontal_follows_shares() {
        assert_eq!(
            boxes(LayoutMode::Horizontal, &[0.25, 0.75], 2),
            [rect(0., 0., 247.5, 600.), rect(257.5, 0., 742.5, 600.)]
        );
    }

    #[test]
    fn horizontal_ignores_broken_shares() {
        assert_eq!(
            boxes(LayoutMode::Horizontal, &[], 2),
            [rect(0., 0., 495., 600.), rect(505., 0., 495., 600.)]
        );
    }

    #[test]
    fn master_stack() {
        assert_eq!(
            boxes(LayoutMode::OneTwo, &[], 3),
            [
                rect(0., 0., 330., 600.),
                rect(340., 0., 660., 295.),
                rect(340., 305., 660., 295.),
            ]
        );
        assert_eq!(
            boxes(LayoutMode::TwoOne, &[], 2),
            [rect(0., 0., 660., 600.), rect(670., 0., 330., 600.)]
        );
        assert_eq!(boxes(LayoutMode::OneTwo, &[], 1), [area()]);
    }

    #[test]
    fn grid_fills_rows_first() {
        let grid = boxes(LayoutMode::Grid, &[], 3);
        assert_eq!(
            grid,
            [
                rect(0., 0., 495., 295.),
                rect(505., 0., 495., 295.),
                rect(0., 305., 495., 295.),
            ]
        );
    }

    #[test]
    fn stacked_reserves_a_strip_per_child() {
        let stacked = layout_children(LayoutMode::None, area(), &[], 3, PARAMS);
        for (idx, child) in stacked.iter().enumerate() {
            assert_eq!(child.geometry, rect(0., 60., 1000., 540.));
            assert_eq!(child.title_bar, Some(rect(0., 20. * idx as f64, 1000., 20.)));
        }
    }

    #[test]
    fn stacked_single_child_can_collapse() {
        let params = TilingParams {
            collapse_single: true,
            ..PARAMS
        };
        let stacked = layout_children(LayoutMode::None, area(), &[], 1, params);
        assert_eq!(stacked, [ChildBox::plain(area())]);
    }

    #[test]
    fn tiny_area_never_goes_negative() {
        let tiny = rect(0., 0., 5., 5.);
        for layout in [
            LayoutMode::None,
            LayoutMode::Horizontal,
            LayoutMode::OneTwo,
            LayoutMode::TwoOne,
            LayoutMode::Grid,
        ] {
            for child in layout_children(layout, tiny, &[], 4, PARAMS) {
                assert!(child.geometry.size.w >= 0. && child.geometry.size.h >= 0.);
            }
        }
    }
}
