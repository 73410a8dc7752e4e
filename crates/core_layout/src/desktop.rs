//! The viewport: one grid plus a scroll position.
//!
//! Every mutation funnels through here so the desktop can mark itself dirty
//! and keep the focused column in view. Geometry only reaches the host in
//! [`Desktop::arrange`], once per logical event.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::column::Column;
use crate::config::{LayoutConfig, Margins};
use crate::focus_passing::{FocusPasser, FocusPassing};
use crate::grid::{ColumnRange, Grid};
use crate::host::Host;
use crate::range::{center_delta, Range, Span};
use crate::scroll::{policies_for, Clamper, Scroller};
use crate::window::{FrameMode, Window};
use crate::{ColumnId, DesktopId, Rect, Size, WindowId};

/// Horizontal direction on the strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
}

/// Which neighbor column gives up width while the user drags a column edge.
pub type ResizeNeighbor = Direction;

#[derive(Debug, Clone, Copy)]
struct UserResize {
    window: WindowId,
    column: ColumnId,
    start_width: i32,
    neighbor: Option<(ColumnId, i32)>,
}

#[derive(Debug)]
pub struct Desktop {
    id: DesktopId,
    grid: Grid,
    scroll_x: i32,
    gesture_start: Option<i32>,

    dirty: bool,
    dirty_scroll: bool,
    dirty_pins: bool,

    client_area: Rect,
    tiling_area: Rect,

    config: Arc<LayoutConfig>,
    scroller: Arc<dyn Scroller>,
    clamper: Arc<dyn Clamper>,
    resize: Option<UserResize>,
}

impl Desktop {
    pub fn new(id: DesktopId, config: Arc<LayoutConfig>, host: &dyn Host) -> Self {
        let (scroller, clamper) = policies_for(&config);
        let client_area = host.client_area(id);
        let tiling_area = tiling_area(host.available_area(id, client_area), &config.margins);

        Self {
            id,
            grid: Grid::new(id, Arc::clone(&config)),
            scroll_x: 0,
            gesture_start: None,
            dirty: true,
            dirty_scroll: true,
            dirty_pins: true,
            client_area,
            tiling_area,
            config,
            scroller,
            clamper,
            resize: None,
        }
    }

    /// Swaps in new settings; areas and policies are recomputed on the next
    /// arrange.
    pub fn set_config(&mut self, config: Arc<LayoutConfig>) {
        let (scroller, clamper) = policies_for(&config);
        self.scroller = scroller;
        self.clamper = clamper;
        self.grid.set_config(Arc::clone(&config));
        self.config = config;
        self.on_pins_changed();
    }

    pub fn id(&self) -> DesktopId {
        self.id
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn scroll_x(&self) -> i32 {
        self.scroll_x
    }

    pub fn client_area(&self) -> Rect {
        self.client_area
    }

    /// The client area minus pinned windows and margins.
    pub fn tiling_area(&self) -> Rect {
        self.tiling_area
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn visible_range(&self) -> Range {
        Range::new(self.scroll_x, self.tiling_area.width)
    }

    // Dirty tracking and arrangement

    pub fn on_layout_changed(&mut self) {
        self.dirty = true;
        self.dirty_scroll = true;
    }

    /// Pinned windows or docks changed the space left for tiling.
    pub fn on_pins_changed(&mut self) {
        self.dirty = true;
        self.dirty_scroll = true;
        self.dirty_pins = true;
    }

    pub fn force_arrange(&mut self) {
        self.dirty = true;
    }

    /// Picks up a changed client area or pin layout.
    pub fn update_area(&mut self, host: &dyn Host) {
        let client_area = host.client_area(self.id);
        if client_area == self.client_area && !self.dirty_pins {
            return;
        }

        self.client_area = client_area;
        self.tiling_area = tiling_area(host.available_area(self.id, client_area), &self.config.margins);
        debug!("desktop {} tiling area now {:?}", self.id, self.tiling_area);

        self.dirty = true;
        self.dirty_scroll = true;
        self.dirty_pins = false;

        self.on_screen_size_changed();
        self.auto_adjust_scroll();
    }

    fn on_screen_size_changed(&mut self) {
        let columns: Vec<ColumnId> = self.grid.column_ids().collect();
        for column in columns {
            if let Some(width) = self.grid.column(column).map(|c| c.closest_preferred_width()) {
                self.set_column_width(column, width, false);
            }
            self.resize_column_windows(column);
        }
    }

    /// Commits geometry if anything changed since the last pass.
    pub fn arrange(&mut self, host: &mut dyn Host) {
        self.update_area(host);

        if !self.dirty {
            return;
        }

        let x = self.tiling_area.x - self.scroll_x;
        trace!("arranging desktop {} at scroll {}", self.id, self.scroll_x);
        self.grid.arrange(
            host,
            x,
            self.tiling_area,
            self.visible_range(),
            self.scroller.culls_offscreen(),
        );
        self.dirty = false;
    }

    // Scrolling

    pub fn scroll_into_view(&mut self, range: &impl Span) {
        let visible = self.visible_range();
        let target = if range.left() < visible.left() {
            range.left()
        } else if range.right() > visible.right() {
            range.right() - self.tiling_area.width
        } else {
            visible.left()
        };
        self.set_scroll(target, false);
    }

    pub fn scroll_center_range(&mut self, range: &impl Span) {
        let delta = center_delta(range, &self.visible_range());
        self.adjust_scroll(delta, true);
    }

    /// Centers `column` together with the neighbors that fit next to it.
    pub fn scroll_center_visible(&mut self, column: ColumnId) {
        let Some(mut range) = ColumnRange::new(&self.grid, column) else {
            return;
        };
        range.add_neighbors(&self.grid, self.visible_range(), self.config.gap_horizontal);
        self.scroll_center_range(&range);
    }

    /// Brings the last focused column back into view per the scroll policy.
    pub fn auto_adjust_scroll(&mut self) {
        if let Some(column) = self.grid.last_focused_column() {
            self.scroll_to_column(column, false);
        }
    }

    pub fn scroll_to_column(&mut self, column: ColumnId, force: bool) {
        let Some(range) = self.grid.column_range(column) else {
            return;
        };
        if force || self.dirty_scroll || !self.visible_range().contains(&range) {
            let scroller = Arc::clone(&self.scroller);
            scroller.scroll_to_column(self, column);
        }
    }

    /// Centers `column` exactly, or re-applies the policy if it already is.
    pub fn center_column(&mut self, column: ColumnId) {
        let Some(range) = self.grid.column_range(column) else {
            return;
        };
        let delta = center_delta(&range, &self.visible_range());
        if delta != 0 {
            self.adjust_scroll(delta, true);
        } else {
            self.scroll_to_column(column, true);
        }
    }

    pub fn clamp_scroll_x(&self, x: i32) -> i32 {
        self.clamper.clamp_scroll_x(self, x)
    }

    /// Sets the scroll position, clamped unless `force`.
    pub fn set_scroll(&mut self, x: i32, force: bool) {
        let old = self.scroll_x;
        self.scroll_x = if force { x } else { self.clamp_scroll_x(x) };
        if self.scroll_x != old {
            self.on_layout_changed();
        }
        self.dirty_scroll = false;
    }

    pub fn adjust_scroll(&mut self, dx: i32, force: bool) {
        self.set_scroll(self.scroll_x + dx, force);
    }

    /// Scrolls relative to where the current gesture started. `amount` is the
    /// accumulated, normalized gesture delta.
    pub fn gesture_scroll(&mut self, amount: f64) {
        if !self.config.gesture_scroll {
            return;
        }

        let start = *self.gesture_start.get_or_insert(self.scroll_x);
        let amount = if self.config.gesture_scroll_invert {
            -amount
        } else {
            amount
        };
        let target = f64::from(start) + self.config.gesture_scroll_step * amount;
        self.set_scroll(target.round() as i32, false);
    }

    pub fn gesture_scroll_finish(&mut self) {
        self.gesture_start = None;
    }

    // Columns

    /// Adds an empty column after `after`, or at the start.
    pub(crate) fn create_column(&mut self, after: Option<ColumnId>) -> ColumnId {
        let column = Column::new(self.id, self.config.stack_columns_by_default);
        self.insert_column(column, after)
    }

    /// Takes ownership of a column coming from another desktop.
    pub(crate) fn insert_column(&mut self, column: Column, after: Option<ColumnId>) -> ColumnId {
        let id = self.grid.insert_column(column, after);
        self.on_layout_changed();
        self.auto_adjust_scroll();
        id
    }

    /// Takes a column out, handing focus to its left (else right) neighbor
    /// and scrolling there.
    pub(crate) fn remove_column(
        &mut self,
        host: &mut dyn Host,
        passer: &mut FocusPasser,
        column: ColumnId,
        mode: FocusPassing,
    ) -> Option<Column> {
        let (removed, focus_target) = self.grid.remove_column(column)?;
        self.on_layout_changed();

        match focus_target {
            Some(target) => {
                if let Some(window) = self.grid.column(target).and_then(|c| c.window_to_focus()) {
                    passer.pass(host, mode, window);
                }
                self.scroll_to_column(target, true);
            }
            None => self.auto_adjust_scroll(),
        }

        Some(removed)
    }

    pub fn move_column(&mut self, column: ColumnId, after: Option<ColumnId>) -> bool {
        let moved = self.grid.move_column(column, after);
        self.after_column_move(moved)
    }

    pub fn move_column_left(&mut self, column: ColumnId) -> bool {
        let moved = self.grid.move_column_left(column);
        self.after_column_move(moved)
    }

    pub fn move_column_right(&mut self, column: ColumnId) -> bool {
        let moved = self.grid.move_column_right(column);
        self.after_column_move(moved)
    }

    fn after_column_move(&mut self, moved: bool) -> bool {
        if moved {
            self.on_layout_changed();
            self.auto_adjust_scroll();
        }
        moved
    }

    /// Resizes a column to `width`, clamped to its bounds.
    pub fn set_column_width(&mut self, column: ColumnId, width: i32, persist_as_preferred: bool) -> bool {
        let max_width = self.tiling_area.width;
        if !self.grid.set_column_width(column, width, max_width, persist_as_preferred) {
            return false;
        }

        self.on_layout_changed();
        if !self.grid.user_resize {
            self.auto_adjust_scroll();
        }
        true
    }

    pub fn adjust_column_width(&mut self, column: ColumnId, delta: i32, persist_as_preferred: bool) -> bool {
        let Some(width) = self.grid.column(column).map(|c| c.width()) else {
            return false;
        };
        self.set_column_width(column, width + delta, persist_as_preferred)
    }

    fn resize_column_windows(&mut self, column: ColumnId) {
        let height = self.tiling_area.height;
        if let Some(col) = self.grid.column_mut(column) {
            col.resize_windows(height, &self.config);
            self.on_layout_changed();
        }
    }

    pub fn toggle_stacked(&mut self, column: ColumnId) -> bool {
        let toggled = self.grid.column_mut(column).is_some_and(|c| c.toggle_stacked());
        if toggled {
            self.on_layout_changed();
        }
        toggled
    }

    /// Whether the grid's focus taker lives in `column` and the host has it
    /// focused.
    pub fn is_column_focused(&self, host: &dyn Host, column: ColumnId) -> bool {
        self.grid.last_focused_window().is_some_and(|window| {
            self.grid.column_of_window(window) == Some(column) && host.is_focused(window)
        })
    }

    /// Shrinks the fully visible columns so the next column in `direction`
    /// fits on screen too. Gives up on far columns first and never drops
    /// `focused`.
    pub fn squeeze_columns(&mut self, focused: ColumnId, direction: Direction) -> bool {
        let visible = self.visible_range();
        if !self.grid.column_range(focused).is_some_and(|r| visible.contains(&r)) {
            return false;
        }

        let mut wanted = self.grid.visible_columns(visible);
        match direction {
            Direction::Left => {
                let Some(target) = wanted.first().and_then(|&c| self.grid.left_column(c)) else {
                    return false;
                };
                wanted.insert(0, target);
            }
            Direction::Right => {
                let Some(target) = wanted.last().and_then(|&c| self.grid.right_column(c)) else {
                    return false;
                };
                wanted.push(target);
            }
        }

        while !wanted.is_empty() {
            if self.squeeze(&wanted) {
                return true;
            }

            let removed = match direction {
                Direction::Left => wanted.pop(),
                Direction::Right => Some(wanted.remove(0)),
            };
            if removed == Some(focused) {
                break;
            }
        }

        debug!("nothing to squeeze towards {direction:?}");
        false
    }

    fn squeeze(&mut self, columns: &[ColumnId]) -> bool {
        let Some(widths) = self.grid.squeeze_widths(columns, self.tiling_area.width) else {
            return false;
        };
        self.apply_widths_and_center(columns, &widths);
        true
    }

    /// Gives every fully visible column an equal share of the viewport.
    pub fn equalize_widths(&mut self) -> bool {
        let columns = self.grid.visible_columns(self.visible_range());
        if columns.is_empty() {
            return false;
        }

        let widths = self.grid.equal_widths(&columns, self.tiling_area.width);
        self.apply_widths_and_center(&columns, &widths);
        true
    }

    fn apply_widths_and_center(&mut self, columns: &[ColumnId], widths: &[i32]) {
        for (&column, &width) in columns.iter().zip(widths) {
            self.set_column_width(column, width, true);
        }

        let first = columns.first().and_then(|&c| self.grid.column_range(c));
        let last = columns.last().and_then(|&c| self.grid.column_range(c));
        if let (Some(first), Some(last)) = (first, last) {
            self.scroll_center_range(&Range::from_union(&first, &last));
        }
    }

    // Windows

    /// Tiles a window in a new column after the last focused (or last) column.
    pub fn add_window(&mut self, host: &mut dyn Host, window: Window) -> ColumnId {
        if let Some(existing) = self.grid.column_of_window(window.id()) {
            warn!("window {} is already tiled on desktop {}", window.id(), self.id);
            return existing;
        }

        let after = self.grid.last_focused_column().or_else(|| self.grid.last_column());
        let column = self.create_column(after);
        self.add_window_to_column(host, window, column, true);
        column
    }

    /// Admits `window` into an existing column.
    pub fn add_window_to_column(
        &mut self,
        host: &mut dyn Host,
        window: Window,
        column: ColumnId,
        at_bottom: bool,
    ) -> bool {
        let id = window.id();
        let preferred_width = window.preferred_width();

        if self.grid.insert_window(column, window, at_bottom).is_err() {
            warn!("dropping window {id}: column {column:?} is gone");
            return false;
        }
        let needs_width = self.grid.column(column).is_some_and(|c| c.width() == 0);

        if needs_width {
            self.set_column_width(column, preferred_width, false);
        }
        self.resize_column_windows(column);

        if host.is_focused(id) {
            self.on_window_focused(host, id);
        }
        self.on_layout_changed();
        true
    }

    /// Takes a window out of the layout. Its column goes with it if it was the
    /// last window there; focus moves to the replacement as `mode` says.
    pub fn remove_window(
        &mut self,
        host: &mut dyn Host,
        passer: &mut FocusPasser,
        window: WindowId,
        mode: FocusPassing,
    ) -> Option<Window> {
        let Some((column, removed, replacement)) = self.grid.take_window(window) else {
            debug!("window {window} is not tiled on desktop {}", self.id);
            return None;
        };
        let now_empty = self.grid.column(column).is_some_and(|c| c.is_empty());

        if now_empty {
            self.remove_column(host, passer, column, mode);
        } else {
            self.resize_column_windows(column);
            if let Some(replacement) = replacement {
                passer.pass(host, mode, replacement);
            }
        }

        self.on_layout_changed();
        Some(removed)
    }

    /// Moves a window into another column of this desktop.
    pub fn move_window_to_column(
        &mut self,
        host: &mut dyn Host,
        passer: &mut FocusPasser,
        window: WindowId,
        target: ColumnId,
        at_bottom: bool,
    ) -> bool {
        let Some(source) = self.grid.column_of_window(window) else {
            return false;
        };
        if source == target || !self.grid.contains(target) {
            return false;
        }

        match self.remove_window(host, passer, window, FocusPassing::None) {
            Some(removed) => self.add_window_to_column(host, removed, target, at_bottom),
            None => false,
        }
    }

    /// Moves a window into a fresh column placed after `after` (or at the
    /// start).
    pub fn move_window_to_new_column(
        &mut self,
        host: &mut dyn Host,
        passer: &mut FocusPasser,
        window: WindowId,
        after: Option<ColumnId>,
    ) -> Option<ColumnId> {
        if !self.grid.contains_window(window) {
            return None;
        }

        let column = self.create_column(after);
        if self.move_window_to_column(host, passer, window, column, true) {
            Some(column)
        } else {
            self.grid.remove_column(column);
            None
        }
    }

    pub fn move_window_up(&mut self, window: WindowId) -> bool {
        self.reorder_window(window, Column::move_window_up)
    }

    pub fn move_window_down(&mut self, window: WindowId) -> bool {
        self.reorder_window(window, Column::move_window_down)
    }

    fn reorder_window(&mut self, window: WindowId, reorder: fn(&mut Column, WindowId) -> bool) -> bool {
        let moved = self
            .grid
            .column_of_window(window)
            .and_then(|id| self.grid.column_mut(id))
            .is_some_and(|c| reorder(c, window));
        if moved {
            self.on_layout_changed();
        }
        moved
    }

    /// The host focused `window`.
    pub fn on_window_focused(&mut self, host: &mut dyn Host, window: WindowId) {
        let Some(column) = self.grid.column_of_window(window) else {
            return;
        };

        if let Some(previous) = self.grid.last_focused_window() {
            if previous != window && !host.is_focused(previous) {
                host.restore_tiled(previous);
            }
        }

        self.grid.set_last_focused(column);
        self.scroll_to_column(column, false);

        let re_maximize = self.config.re_maximize
            && self
                .grid
                .column(column)
                .and_then(|c| c.window(window))
                .is_some_and(Window::wants_re_maximize);
        if re_maximize {
            self.force_arrange();
        }

        if let Some(col) = self.grid.column_mut(column) {
            col.set_focus_taker(window);
        }
    }

    /// The host took over (or gave back) a window's geometry. Changes made
    /// while the window has focus are remembered for re-maximizing.
    pub fn set_window_mode(&mut self, host: &dyn Host, window: WindowId, mode: FrameMode) -> bool {
        let focused = host.is_focused(window);
        let Some(w) = self.window_mut(window) else {
            return false;
        };
        w.mode = mode;
        if focused {
            w.focused_mode = mode;
        }
        self.on_layout_changed();
        true
    }

    /// Something other than the engine resized a window's frame.
    pub fn on_window_frame_resized(&mut self, window: WindowId, width: i32) -> bool {
        if self.grid.user_resize {
            return false;
        }
        let Some(column) = self.grid.column_of_window(window) else {
            return false;
        };
        self.set_column_width(column, width, true);
        self.on_layout_changed();
        true
    }

    /// The host reported a new minimum size for a window.
    pub fn set_window_min_size(&mut self, window: WindowId, min_size: Size) -> bool {
        let Some(column) = self.grid.column_of_window(window) else {
            return false;
        };
        if let Some(w) = self.window_mut(window) {
            w.min_size = min_size;
        }

        if let Some(width) = self.grid.column(column).map(|c| c.width()) {
            self.set_column_width(column, width, false);
        }
        self.resize_column_windows(column);
        true
    }

    fn window_mut(&mut self, window: WindowId) -> Option<&mut Window> {
        let column = self.grid.column_of_window(window)?;
        self.grid.column_mut(column)?.window_mut(window)
    }

    // Interactive resizing

    /// The user grabbed an edge of `window`.
    pub fn user_resize_started(&mut self, window: WindowId, neighbor: Option<ResizeNeighbor>) {
        let Some(column) = self.grid.column_of_window(window) else {
            return;
        };
        let Some(start_width) = self.grid.column(column).map(|c| c.width()) else {
            return;
        };

        let neighbor = neighbor
            .and_then(|side| match side {
                Direction::Left => self.grid.left_column(column),
                Direction::Right => self.grid.right_column(column),
            })
            .and_then(|id| self.grid.column(id).map(|c| (id, c.width())));

        self.resize = Some(UserResize {
            window,
            column,
            start_width,
            neighbor,
        });
        self.grid.user_resize = true;
    }

    /// The dragged window's frame is now `width` wide. `left_edge_moved` says
    /// the user drags the left edge, which keeps the right edge in place.
    pub fn user_resize_width(&mut self, width: i32, left_edge_moved: bool) {
        let Some(resize) = self.resize else {
            return;
        };
        let Some(old_width) = self.grid.column(resize.column).map(|c| c.width()) else {
            return;
        };

        self.set_column_width(resize.column, width, true);
        let new_width = self.grid.column(resize.column).map_or(old_width, |c| c.width());
        let actual_delta = new_width - resize.start_width;

        let mut left_edge_step = if left_edge_moved { old_width - new_width } else { 0 };

        if let Some((neighbor, neighbor_start)) = resize.neighbor {
            if let Some(old_neighbor) = self.grid.column(neighbor).map(|c| c.width()) {
                self.set_column_width(neighbor, neighbor_start - actual_delta, true);
                if left_edge_moved {
                    let new_neighbor = self.grid.column(neighbor).map_or(old_neighbor, |c| c.width());
                    left_edge_step -= new_neighbor - old_neighbor;
                }
            }
        }

        self.adjust_scroll(-left_edge_step, true);
    }

    /// Trades height between the dragged window and its neighbor above
    /// (`top`) or below.
    pub fn user_resize_height(&mut self, delta: i32, top: bool) {
        let Some(resize) = self.resize else {
            return;
        };
        let adjusted = self
            .grid
            .column_mut(resize.column)
            .is_some_and(|c| c.adjust_window_height(resize.window, delta, top));
        if adjusted {
            self.on_layout_changed();
        }
    }

    /// Returns whether a resize was in progress. The caller settles the
    /// layout with [`Desktop::user_resize_settled`] once the host has calmed
    /// down.
    pub fn user_resize_finished(&mut self) -> bool {
        self.grid.user_resize = false;
        self.resize.take().is_some()
    }

    pub fn user_resize_settled(&mut self) {
        self.on_layout_changed();
        self.auto_adjust_scroll();
    }
}

fn tiling_area(available: Rect, margins: &Margins) -> Rect {
    let left = available.x + margins.left;
    let top = available.y + margins.top;
    let right = available.right() - margins.right;
    let bottom = available.bottom() - margins.bottom;
    Rect::new(left, top, right - left, bottom - top)
}
