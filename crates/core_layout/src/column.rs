//! A vertical stack of windows sharing one width.
//!
//! Column methods only touch the column itself. Anything with effects beyond
//! it (repositioning later columns, scrolling, focus hand-off) is driven by
//! [`Desktop`](crate::Desktop), which calls in here and then reacts to what
//! changed.

use std::collections::HashMap;

use crate::config::LayoutConfig;
use crate::distribute::{fill_space, SizeBounds};
use crate::host::Host;
use crate::ordered::OrderedContainer;
use crate::range::{Range, Span};
use crate::window::Window;
use crate::{ColumnId, DesktopId, Rect, WindowId};

/// Narrowest a column may get regardless of its windows.
pub const MIN_COLUMN_WIDTH: i32 = 40;

#[derive(Debug, Clone)]
pub struct Column {
    id: ColumnId,
    pub(crate) desktop: DesktopId,
    order: OrderedContainer<WindowId>,
    windows: HashMap<WindowId, Window>,
    pub(crate) width: i32,
    /// Left edge on the strip.
    pub(crate) grid_x: i32,
    pub(crate) stacked: bool,
    /// Last focused window. Not cleared on removal; see [`Column::focus_taker`].
    focus_taker: Option<WindowId>,
}

impl Column {
    pub(crate) fn new(desktop: DesktopId, stacked: bool) -> Self {
        Self {
            id: ColumnId::next(),
            desktop,
            order: OrderedContainer::new(),
            windows: HashMap::new(),
            width: 0,
            grid_x: 0,
            stacked,
            focus_taker: None,
        }
    }

    pub fn id(&self) -> ColumnId {
        self.id
    }

    pub fn desktop(&self) -> DesktopId {
        self.desktop
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn is_stacked(&self) -> bool {
        self.stacked
    }

    pub fn window_count(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, window: WindowId) -> bool {
        self.windows.contains_key(&window)
    }

    pub fn window(&self, window: WindowId) -> Option<&Window> {
        self.windows.get(&window)
    }

    pub(crate) fn window_mut(&mut self, window: WindowId) -> Option<&mut Window> {
        self.windows.get_mut(&window)
    }

    /// Window ids from top to bottom.
    pub fn window_ids(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.order.iter()
    }

    /// Windows from top to bottom.
    pub fn windows(&self) -> impl Iterator<Item = &Window> + '_ {
        self.order.iter().filter_map(|id| self.windows.get(&id))
    }

    pub fn first_window(&self) -> Option<WindowId> {
        self.order.first()
    }

    pub fn last_window(&self) -> Option<WindowId> {
        self.order.last()
    }

    pub fn window_above(&self, window: WindowId) -> Option<WindowId> {
        self.order.prev(&window).ok().flatten()
    }

    pub fn window_below(&self, window: WindowId) -> Option<WindowId> {
        self.order.next(&window).ok().flatten()
    }

    pub fn is_to_the_left_of(&self, other: &Column) -> bool {
        self.grid_x < other.grid_x
    }

    pub fn is_to_the_right_of(&self, other: &Column) -> bool {
        self.grid_x > other.grid_x
    }

    /// Largest of the fixed floor and every window's own minimum width.
    pub fn min_width(&self) -> i32 {
        self.windows
            .values()
            .map(|w| w.min_size.width)
            .fold(MIN_COLUMN_WIDTH, i32::max)
    }

    /// The focus taker if it still belongs to this column.
    pub fn focus_taker(&self) -> Option<WindowId> {
        self.focus_taker.filter(|id| self.contains(*id))
    }

    /// The window that should get focus when the column does.
    pub fn window_to_focus(&self) -> Option<WindowId> {
        self.focus_taker().or_else(|| self.first_window())
    }

    pub(crate) fn set_focus_taker(&mut self, window: WindowId) {
        debug_assert!(self.contains(window));
        self.focus_taker = Some(window);
    }

    /// Whether the host has this column's focus taker focused.
    pub fn is_focused(&self, host: &dyn Host) -> bool {
        self.focus_taker().is_some_and(|id| host.is_focused(id))
    }

    /// Clamps and stores a new width. Returns whether the width changed.
    pub(crate) fn set_width(&mut self, width: i32, max_width: i32, persist_as_preferred: bool) -> bool {
        let min_width = self.min_width();
        // A viewport narrower than the windows' minimums still has to fit them.
        let clamped = width.clamp(min_width, max_width.max(min_width));
        if clamped == self.width {
            return false;
        }

        self.width = clamped;
        if persist_as_preferred {
            for window in self.windows.values_mut() {
                window.preferred_width = clamped;
            }
        }
        true
    }

    /// The preferred width among the column's windows closest to the current
    /// width.
    pub(crate) fn closest_preferred_width(&self) -> i32 {
        self.windows()
            .map(|w| w.preferred_width)
            .min_by_key(|preferred| (preferred - self.width).abs())
            .unwrap_or(self.width)
    }

    /// Redistributes the available height between the windows.
    pub(crate) fn resize_windows(&mut self, area_height: i32, config: &LayoutConfig) {
        let count = self.window_count() as i32;
        if count == 0 {
            return;
        }
        if count == 1 {
            self.stacked = config.stack_columns_by_default;
        }

        let available = area_height - (count - 1) * config.gap_vertical;
        let bounds: Vec<SizeBounds> = self
            .windows()
            .map(|w| SizeBounds::new(w.min_height(), available.max(w.min_height())))
            .collect();
        let heights = fill_space(available, &bounds);

        let ids: Vec<WindowId> = self.order.iter().collect();
        for (id, height) in ids.into_iter().zip(heights) {
            if let Some(window) = self.windows.get_mut(&id) {
                window.height = height;
            }
        }
    }

    /// Moves height between `window` and its neighbor above (`top`) or below.
    /// Returns whether anything changed.
    pub(crate) fn adjust_window_height(&mut self, window: WindowId, delta: i32, top: bool) -> bool {
        let other = if top {
            self.window_above(window)
        } else {
            self.window_below(window)
        };
        let Some(other) = other else {
            return false;
        };

        if let Some(w) = self.windows.get_mut(&window) {
            w.height += delta;
        }
        if let Some(o) = self.windows.get_mut(&other) {
            o.height -= delta;
        }
        true
    }

    /// Admits `window`, fixing its back-reference.
    pub(crate) fn insert_window(&mut self, mut window: Window, at_bottom: bool) {
        let id = window.id();
        let inserted = if at_bottom {
            self.order.insert_end(id)
        } else {
            self.order.insert_start(id)
        };
        debug_assert!(inserted.is_ok(), "window {id} admitted twice");

        window.column = Some(self.id);
        self.windows.insert(id, window);
    }

    /// Takes `window` out, returning it with the neighbor that should inherit
    /// focus (the one above, else the one below).
    pub(crate) fn take_window(&mut self, window: WindowId) -> Option<(Window, Option<WindowId>)> {
        let replacement = self.window_above(window).or_else(|| self.window_below(window));
        self.order.remove(&window).ok()?;
        let mut removed = self.windows.remove(&window)?;
        removed.column = None;

        if self.focus_taker == Some(window) {
            self.focus_taker = replacement;
        }

        Some((removed, replacement))
    }

    /// Flips stacked mode. Returns `false` with fewer than two windows.
    pub(crate) fn toggle_stacked(&mut self) -> bool {
        if self.window_count() < 2 {
            return false;
        }
        self.stacked = !self.stacked;
        true
    }

    pub(crate) fn move_window_up(&mut self, window: WindowId) -> bool {
        self.order.move_back(window).is_ok()
    }

    pub(crate) fn move_window_down(&mut self, window: WindowId) -> bool {
        self.order.move_forward(window).is_ok()
    }

    /// Commits geometry for every window at horizontal screen position `x`.
    pub(crate) fn arrange(
        &self,
        host: &mut dyn Host,
        x: i32,
        area: Rect,
        visible: Range,
        config: &LayoutConfig,
        force_opaque: bool,
    ) {
        if config.off_screen_opacity < 1.0 && !force_opaque {
            let opacity = if visible.contains(self) {
                1.0
            } else {
                config.off_screen_opacity
            };
            for id in self.order.iter() {
                host.set_opacity(id, opacity);
            }
        }

        if self.stacked && self.window_count() >= 2 {
            self.arrange_stacked(host, x, area, config);
            return;
        }

        let mut y = area.y;
        for window in self.windows() {
            window.arrange(host, Rect::new(x, y, self.width, window.height), config.re_maximize);
            y += window.height + config.gap_vertical;
        }
    }

    fn arrange_stacked(&self, host: &mut dyn Host, x: i32, area: Rect, config: &LayoutConfig) {
        let cascade = self.window_count() as i32 - 1;
        let width = self.width - cascade * config.stack_offset_x;
        let height = area.height - cascade * config.stack_offset_y;

        let (mut window_x, mut window_y) = (x, area.y);
        for window in self.windows() {
            window.arrange(host, Rect::new(window_x, window_y, width, height), config.re_maximize);
            window_x += config.stack_offset_x;
            window_y += config.stack_offset_y;
        }
    }
}

impl Span for Column {
    fn left(&self) -> i32 {
        self.grid_x
    }

    fn width(&self) -> i32 {
        self.width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::RecordingHost;
    use crate::Size;

    fn config() -> LayoutConfig {
        LayoutConfig {
            gap_vertical: 10,
            stack_offset_x: 20,
            stack_offset_y: 30,
            ..Default::default()
        }
    }

    fn column_with(ids: &[WindowId]) -> Column {
        let mut column = Column::new(1, false);
        for &id in ids {
            column.insert_window(Window::new(id, Size::new(500, 300)), true);
        }
        column
    }

    #[test]
    fn test_insert_sets_back_reference() {
        let column = column_with(&[1, 2]);
        assert_eq!(column.window(1).and_then(|w| w.column()), Some(column.id()));
        assert_eq!(column.window_ids().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_insert_at_top() {
        let mut column = column_with(&[1]);
        column.insert_window(Window::new(2, Size::new(500, 300)), false);
        assert_eq!(column.first_window(), Some(2));
    }

    #[test]
    fn test_min_width() {
        let mut column = column_with(&[1]);
        assert_eq!(column.min_width(), MIN_COLUMN_WIDTH);

        column.insert_window(Window::new(2, Size::new(500, 300)).with_min_size(Size::new(300, 0)), true);
        assert_eq!(column.min_width(), 300);
    }

    #[test]
    fn test_set_width_clamps_and_persists() {
        let mut column = column_with(&[1, 2]);
        assert!(column.set_width(5000, 1000, true));
        assert_eq!(column.width(), 1000);
        assert!(column.windows().all(|w| w.preferred_width() == 1000));

        assert!(!column.set_width(1000, 1000, false));

        assert!(column.set_width(1, 1000, false));
        assert_eq!(column.width(), MIN_COLUMN_WIDTH);
        assert!(column.windows().all(|w| w.preferred_width() == 1000));
    }

    #[test]
    fn test_resize_windows_splits_height() {
        let mut column = column_with(&[1, 2]);
        column.resize_windows(1010, &config());
        let heights: Vec<i32> = column.windows().map(|w| w.height()).collect();
        assert_eq!(heights, vec![500, 500]);
    }

    #[test]
    fn test_resize_windows_respects_min_height() {
        let mut column = column_with(&[1]);
        column.insert_window(Window::new(2, Size::new(500, 300)).with_min_size(Size::new(0, 700)), true);
        column.resize_windows(1010, &config());
        let heights: Vec<i32> = column.windows().map(|w| w.height()).collect();
        assert_eq!(heights, vec![300, 700]);
    }

    #[test]
    fn test_single_window_resets_stacked() {
        let mut column = column_with(&[1, 2]);
        assert!(column.toggle_stacked());
        column.take_window(2);
        column.resize_windows(800, &config());
        assert!(!column.is_stacked());
    }

    #[test]
    fn test_toggle_stacked_needs_two_windows() {
        let mut column = column_with(&[1]);
        assert!(!column.toggle_stacked());
        assert!(!column.is_stacked());
    }

    #[test]
    fn test_take_window_picks_replacement() {
        let mut column = column_with(&[1, 2, 3]);
        column.set_focus_taker(2);

        let (window, replacement) = column.take_window(2).unwrap();
        assert_eq!(window.id(), 2);
        assert_eq!(window.column(), None);
        assert_eq!(replacement, Some(1));
        assert_eq!(column.focus_taker(), Some(1));

        let (_, replacement) = column.take_window(1).unwrap();
        assert_eq!(replacement, Some(3));
        assert!(column.take_window(42).is_none());
    }

    #[test]
    fn test_focus_taker_is_revalidated() {
        let mut column = column_with(&[1, 2]);
        column.set_focus_taker(1);
        column.focus_taker = Some(9);
        assert_eq!(column.focus_taker(), None);
        assert_eq!(column.window_to_focus(), Some(1));
    }

    #[test]
    fn test_adjust_window_height() {
        let mut column = column_with(&[1, 2]);
        column.resize_windows(1010, &config());

        assert!(column.adjust_window_height(2, 100, true));
        assert_eq!(column.window(1).map(|w| w.height()), Some(400));
        assert_eq!(column.window(2).map(|w| w.height()), Some(600));

        assert!(!column.adjust_window_height(2, 100, false));
    }

    #[test]
    fn test_closest_preferred_width() {
        let mut column = Column::new(1, false);
        column.insert_window(Window::new(1, Size::new(300, 100)), true);
        column.insert_window(Window::new(2, Size::new(900, 100)), true);
        column.width = 800;
        assert_eq!(column.closest_preferred_width(), 900);
    }

    #[test]
    fn test_arrange_unstacked() {
        let mut host = RecordingHost::new(1000, 1010);
        let mut column = column_with(&[1, 2]);
        column.width = 400;
        column.resize_windows(1010, &config());

        let area = Rect::new(0, 5, 1000, 1010);
        column.arrange(&mut host, 30, area, Range::new(0, 1000), &config(), false);

        assert_eq!(host.placements[&1], Rect::new(30, 5, 400, 500));
        assert_eq!(host.placements[&2], Rect::new(30, 515, 400, 500));
        assert!(host.opacities.is_empty());
    }

    #[test]
    fn test_arrange_stacked_cascades() {
        let mut host = RecordingHost::new(1000, 1000);
        let mut column = column_with(&[1, 2, 3]);
        column.width = 400;
        column.toggle_stacked();

        let area = Rect::new(0, 0, 1000, 1000);
        column.arrange(&mut host, 100, area, Range::new(0, 1000), &config(), false);

        assert_eq!(host.placements[&1], Rect::new(100, 0, 360, 940));
        assert_eq!(host.placements[&2], Rect::new(120, 30, 360, 940));
        assert_eq!(host.placements[&3], Rect::new(140, 60, 360, 940));
    }

    #[test]
    fn test_arrange_off_screen_opacity() {
        let mut host = RecordingHost::new(1000, 1000);
        let mut column = column_with(&[1]);
        column.width = 400;
        column.grid_x = 800;
        let config = LayoutConfig {
            off_screen_opacity: 0.5,
            ..config()
        };
        let area = Rect::new(0, 0, 1000, 1000);

        column.arrange(&mut host, 800, area, Range::new(0, 1000), &config, false);
        assert_eq!(host.opacities[&1], 0.5);

        column.arrange(&mut host, 800, area, Range::new(500, 1000), &config, false);
        assert_eq!(host.opacities[&1], 1.0);

        host.opacities.clear();
        column.arrange(&mut host, 800, area, Range::new(0, 1000), &config, true);
        assert!(host.opacities.is_empty());
    }
}
