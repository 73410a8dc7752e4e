//! Interchangeable viewport policies.
//!
//! A [`Scroller`] decides how the viewport follows a column that should be
//! visible; a [`Clamper`] bounds the scroll position. Both are chosen from
//! [`LayoutConfig`] when a desktop is created or reconfigured.

use std::fmt;
use std::sync::Arc;

use crate::config::{ClampPolicy, LayoutConfig, ScrollPolicy};
use crate::desktop::Desktop;
use crate::ColumnId;

pub trait Scroller: fmt::Debug + Send + Sync {
    fn scroll_to_column(&self, desktop: &mut Desktop, column: ColumnId);

    /// Whether columns far outside the viewport may be skipped when arranging.
    fn culls_offscreen(&self) -> bool {
        false
    }
}

pub trait Clamper: fmt::Debug + Send + Sync {
    fn clamp_scroll_x(&self, desktop: &Desktop, x: i32) -> i32;
}

/// Scrolls just far enough to show the column.
#[derive(Debug, Default)]
pub struct LazyScroller;

impl Scroller for LazyScroller {
    fn scroll_to_column(&self, desktop: &mut Desktop, column: ColumnId) {
        if let Some(range) = desktop.grid().column_range(column) {
            desktop.scroll_into_view(&range);
        }
    }

    fn culls_offscreen(&self) -> bool {
        true
    }
}

/// Keeps the column centered.
#[derive(Debug, Default)]
pub struct CenteredScroller;

impl Scroller for CenteredScroller {
    fn scroll_to_column(&self, desktop: &mut Desktop, column: ColumnId) {
        if let Some(range) = desktop.grid().column_range(column) {
            desktop.scroll_center_range(&range);
        }
    }
}

/// Centers the column together with as many neighbors as fit.
#[derive(Debug, Default)]
pub struct GroupedScroller;

impl Scroller for GroupedScroller {
    fn scroll_to_column(&self, desktop: &mut Desktop, column: ColumnId) {
        desktop.scroll_center_visible(column);
    }
}

/// Keeps the viewport inside the strip. A strip narrower than the viewport is
/// centered in it.
#[derive(Debug, Default)]
pub struct EdgeClamper;

impl Clamper for EdgeClamper {
    fn clamp_scroll_x(&self, desktop: &Desktop, x: i32) -> i32 {
        let max_scroll = desktop.grid().width() - desktop.tiling_area().width;
        if max_scroll < 0 {
            return round_half_up(f64::from(max_scroll) / 2.);
        }
        x.clamp(0, max_scroll)
    }
}

/// Lets the outermost columns reach the center of the viewport.
#[derive(Debug, Default)]
pub struct CenterClamper;

impl Clamper for CenterClamper {
    fn clamp_scroll_x(&self, desktop: &Desktop, x: i32) -> i32 {
        let grid = desktop.grid();
        let (Some(first), Some(last)) = (
            grid.first_column().and_then(|id| grid.column(id)),
            grid.last_column().and_then(|id| grid.column(id)),
        ) else {
            return 0;
        };

        let area_width = f64::from(desktop.tiling_area().width);
        let min_scroll = round_half_up((f64::from(first.width()) - area_width) / 2.);
        let max_scroll =
            round_half_up(f64::from(grid.width()) - (area_width + f64::from(last.width())) / 2.);

        x.max(min_scroll).min(max_scroll)
    }
}

fn round_half_up(x: f64) -> i32 {
    (x + 0.5).floor() as i32
}

pub fn scroller_for(policy: ScrollPolicy) -> Arc<dyn Scroller> {
    match policy {
        ScrollPolicy::Lazy => Arc::new(LazyScroller),
        ScrollPolicy::Centered => Arc::new(CenteredScroller),
        ScrollPolicy::Grouped => Arc::new(GroupedScroller),
    }
}

pub fn clamper_for(policy: ClampPolicy) -> Arc<dyn Clamper> {
    match policy {
        ClampPolicy::Edge => Arc::new(EdgeClamper),
        ClampPolicy::Center => Arc::new(CenterClamper),
    }
}

/// Scroller and clamper matching `config`.
pub fn policies_for(config: &LayoutConfig) -> (Arc<dyn Scroller>, Arc<dyn Clamper>) {
    (
        scroller_for(config.scroll_policy),
        clamper_for(config.effective_clamp_policy()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(-100.5), -100);
        assert_eq!(round_half_up(100.5), 101);
        assert_eq!(round_half_up(-0.4), 0);
        assert_eq!(round_half_up(2.0), 2);
    }

    #[test]
    fn test_only_lazy_culls() {
        assert!(scroller_for(ScrollPolicy::Lazy).culls_offscreen());
        assert!(!scroller_for(ScrollPolicy::Centered).culls_offscreen());
        assert!(!scroller_for(ScrollPolicy::Grouped).culls_offscreen());
    }
}
