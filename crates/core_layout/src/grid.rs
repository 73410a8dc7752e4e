//! The infinite horizontal strip of columns.
//!
//! The grid owns its columns and keeps their horizontal positions consistent:
//! each column starts one gap after the previous column's right edge. It does
//! not scroll; the owning [`Desktop`](crate::Desktop) reacts to every change the
//! grid reports.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::column::Column;
use crate::config::LayoutConfig;
use crate::distribute::{fill_space, is_feasible, SizeBounds};
use crate::host::Host;
use crate::ordered::OrderedContainer;
use crate::range::{Range, Span};
use crate::window::Window;
use crate::{ColumnId, DesktopId, Rect, WindowId};

/// Extra distance beyond each edge of the viewport in which columns are still
/// arranged when off-screen columns are culled.
pub const RENDER_BUFFER: i32 = 500;

#[derive(Debug)]
pub struct Grid {
    desktop: DesktopId,
    config: Arc<LayoutConfig>,
    order: OrderedContainer<ColumnId>,
    columns: HashMap<ColumnId, Column>,
    window_columns: HashMap<WindowId, ColumnId>,
    last_focused: Option<ColumnId>,
    pub(crate) user_resize: bool,
}

impl Grid {
    pub(crate) fn new(desktop: DesktopId, config: Arc<LayoutConfig>) -> Self {
        Self {
            desktop,
            config,
            order: OrderedContainer::new(),
            columns: HashMap::new(),
            window_columns: HashMap::new(),
            last_focused: None,
            user_resize: false,
        }
    }

    pub(crate) fn set_config(&mut self, config: Arc<LayoutConfig>) {
        self.config = config;
    }

    pub fn desktop(&self) -> DesktopId {
        self.desktop
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, column: ColumnId) -> bool {
        self.columns.contains_key(&column)
    }

    pub fn column(&self, column: ColumnId) -> Option<&Column> {
        self.columns.get(&column)
    }

    pub(crate) fn column_mut(&mut self, column: ColumnId) -> Option<&mut Column> {
        self.columns.get_mut(&column)
    }

    /// Column ids from left to right.
    pub fn column_ids(&self) -> impl Iterator<Item = ColumnId> + '_ {
        self.order.iter()
    }

    /// Columns from left to right.
    pub fn columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.order.iter().filter_map(|id| self.columns.get(&id))
    }

    pub fn first_column(&self) -> Option<ColumnId> {
        self.order.first()
    }

    pub fn last_column(&self) -> Option<ColumnId> {
        self.order.last()
    }

    pub fn left_column(&self, column: ColumnId) -> Option<ColumnId> {
        self.order.prev(&column).ok().flatten()
    }

    pub fn right_column(&self, column: ColumnId) -> Option<ColumnId> {
        self.order.next(&column).ok().flatten()
    }

    /// The `index`-th column from the left.
    pub fn column_at_index(&self, index: usize) -> Option<ColumnId> {
        self.order.item_at_index(index)
    }

    /// Right edge of the rightmost column.
    pub fn width(&self) -> i32 {
        self.last_column()
            .and_then(|id| self.columns.get(&id))
            .map_or(0, |c| c.right())
    }

    pub fn is_user_resizing(&self) -> bool {
        self.user_resize
    }

    /// Horizontal extent of a column on the strip.
    pub fn column_range(&self, column: ColumnId) -> Option<Range> {
        self.columns
            .get(&column)
            .map(|c| Range::new(c.left(), c.width()))
    }

    /// The column holding `window`.
    pub fn column_of_window(&self, window: WindowId) -> Option<ColumnId> {
        self.window_columns.get(&window).copied()
    }

    pub fn contains_window(&self, window: WindowId) -> bool {
        self.window_columns.contains_key(&window)
    }

    /// Puts `window` into `column`. Returns the window back if the column is
    /// not part of this grid.
    pub(crate) fn insert_window(
        &mut self,
        column: ColumnId,
        window: Window,
        at_bottom: bool,
    ) -> Result<(), Window> {
        let Some(col) = self.columns.get_mut(&column) else {
            return Err(window);
        };
        self.window_columns.insert(window.id(), column);
        col.insert_window(window, at_bottom);
        Ok(())
    }

    /// Takes `window` out of its column, returning the column, the window and
    /// the window that should take focus in its place.
    pub(crate) fn take_window(&mut self, window: WindowId) -> Option<(ColumnId, Window, Option<WindowId>)> {
        let column = self.column_of_window(window)?;
        let (removed, replacement) = self.columns.get_mut(&column)?.take_window(window)?;
        self.window_columns.remove(&window);
        Some((column, removed, replacement))
    }

    /// The most recently focused column, if still part of this grid.
    pub fn last_focused_column(&self) -> Option<ColumnId> {
        self.last_focused.filter(|id| self.contains(*id))
    }

    pub fn last_focused_window(&self) -> Option<WindowId> {
        self.last_focused_column()
            .and_then(|id| self.columns.get(&id))
            .and_then(|c| c.focus_taker())
    }

    pub(crate) fn set_last_focused(&mut self, column: ColumnId) {
        self.last_focused = Some(column);
    }

    /// Columns lying entirely inside `visible`, left to right.
    pub fn visible_columns(&self, visible: Range) -> Vec<ColumnId> {
        self.columns()
            .filter(|c| visible.contains(*c))
            .map(|c| c.id())
            .collect()
    }

    pub fn leftmost_visible_column(&self, visible: Range) -> Option<ColumnId> {
        self.columns().find(|c| visible.contains(*c)).map(|c| c.id())
    }

    pub fn rightmost_visible_column(&self, visible: Range) -> Option<ColumnId> {
        let mut last_visible = None;
        for column in self.columns() {
            if visible.contains(column) {
                last_visible = Some(column.id());
            } else if last_visible.is_some() {
                break;
            }
        }
        last_visible
    }

    /// Adds a column after `after`, or at the start.
    pub(crate) fn insert_column(&mut self, mut column: Column, after: Option<ColumnId>) -> ColumnId {
        let id = column.id();
        let inserted = match after {
            Some(prev) if self.contains(prev) => self.order.insert_after(id, prev),
            _ => self.order.insert_start(id),
        };
        debug_assert!(inserted.is_ok(), "column {id:?} inserted twice");

        column.desktop = self.desktop;
        for window in column.window_ids() {
            self.window_columns.insert(window, id);
        }
        self.columns.insert(id, column);
        self.columns_set_x(Some(id));
        id
    }

    /// Takes a column out of the grid, returning it with the column that
    /// should receive focus in its place.
    pub(crate) fn remove_column(&mut self, column: ColumnId) -> Option<(Column, Option<ColumnId>)> {
        if !self.contains(column) {
            return None;
        }

        let is_last_column = self.len() == 1;
        let right = self.right_column(column);
        let focus_target = if is_last_column {
            None
        } else {
            self.left_column(column).or(right)
        };

        if self.last_focused == Some(column) {
            self.last_focused = focus_target;
        }

        self.order.remove(&column).ok()?;
        let removed = self.columns.remove(&column)?;
        for window in removed.window_ids() {
            self.window_columns.remove(&window);
        }
        self.columns_set_x(right);

        debug!("removed column {column:?}, focus target {focus_target:?}");
        Some((removed, focus_target))
    }

    /// Moves `column` right after `after` (or to the start). Returns whether
    /// anything moved.
    pub(crate) fn move_column(&mut self, column: ColumnId, after: Option<ColumnId>) -> bool {
        if after == Some(column) || !self.contains(column) {
            return false;
        }

        let moving_left = match after.and_then(|id| self.columns.get(&id)) {
            None => true,
            Some(after) => self.columns.get(&column).is_some_and(|c| c.is_to_the_right_of(after)),
        };
        let first_affected = if moving_left {
            Some(column)
        } else {
            self.right_column(column)
        };

        if self.order.move_to_position(column, after).is_err() {
            return false;
        }
        self.columns_set_x(first_affected);
        true
    }

    pub(crate) fn move_column_left(&mut self, column: ColumnId) -> bool {
        if self.left_column(column).is_none() {
            return false;
        }
        if self.order.move_back(column).is_err() {
            return false;
        }
        self.columns_set_x(Some(column));
        true
    }

    pub(crate) fn move_column_right(&mut self, column: ColumnId) -> bool {
        match self.right_column(column) {
            Some(right) => self.move_column_left(right),
            None => false,
        }
    }

    /// Sets a column's width and repositions everything right of it.
    /// Returns whether the width changed.
    pub(crate) fn set_column_width(
        &mut self,
        column: ColumnId,
        width: i32,
        max_width: i32,
        persist_as_preferred: bool,
    ) -> bool {
        let Some(col) = self.columns.get_mut(&column) else {
            return false;
        };
        if !col.set_width(width, max_width, persist_as_preferred) {
            return false;
        }

        let right = self.right_column(column);
        self.columns_set_x(right);
        true
    }

    /// Recomputes positions from `start` to the end of the strip. `None`
    /// means nothing after the last column needs moving.
    pub(crate) fn columns_set_x(&mut self, start: Option<ColumnId>) {
        let gap = self.config.gap_horizontal;
        let prev = match start {
            Some(start) => self.left_column(start),
            None => self.last_column(),
        };

        let mut x = prev
            .and_then(|id| self.columns.get(&id))
            .map_or(0, |c| c.right() + gap);

        if let Some(start) = start {
            for id in self.order.iter_from(start) {
                if let Some(column) = self.columns.get_mut(&id) {
                    column.grid_x = x;
                    x += column.width + gap;
                }
            }
        }
    }

    /// Widths that fit `columns` side by side into `available`, shrinking but
    /// never growing them. `None` when even their minimums don't fit.
    pub(crate) fn squeeze_widths(&self, columns: &[ColumnId], available: i32) -> Option<Vec<i32>> {
        let bounds: Vec<SizeBounds> = columns
            .iter()
            .filter_map(|id| self.columns.get(id))
            .map(|c| SizeBounds::new(c.min_width(), c.width().max(c.min_width())))
            .collect();
        let available = available - self.gaps_between(bounds.len());

        if bounds.is_empty() || !is_feasible(available, &bounds) {
            return None;
        }
        Some(fill_space(available, &bounds))
    }

    /// Widths sharing `available` between `columns` as evenly as their
    /// constraints allow.
    pub(crate) fn equal_widths(&self, columns: &[ColumnId], available: i32) -> Vec<i32> {
        let bounds: Vec<SizeBounds> = columns
            .iter()
            .filter_map(|id| self.columns.get(id))
            .map(|c| SizeBounds::new(c.min_width(), available.max(c.min_width())))
            .collect();
        fill_space(available - self.gaps_between(bounds.len()), &bounds)
    }

    fn gaps_between(&self, count: usize) -> i32 {
        (count as i32 - 1).max(0) * self.config.gap_horizontal
    }

    /// Commits geometry for every column, starting at screen position `x`.
    pub(crate) fn arrange(&self, host: &mut dyn Host, x: i32, area: Rect, visible: Range, cull: bool) {
        let view = visible.expanded(RENDER_BUFFER);
        let gap = self.config.gap_horizontal;

        let mut x = x;
        for column in self.columns() {
            if !cull || view.overlaps(column) {
                column.arrange(host, x, area, visible, &self.config, self.user_resize);
            }
            x += column.width() + gap;
        }
    }
}

/// A run of adjacent columns, grown outward from one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRange {
    pub left: ColumnId,
    pub right: ColumnId,
    x: i32,
    width: i32,
}

impl ColumnRange {
    pub fn new(grid: &Grid, column: ColumnId) -> Option<Self> {
        let range = grid.column_range(column)?;
        Some(Self {
            left: column,
            right: column,
            x: range.x,
            width: range.width,
        })
    }

    /// Greedily adds neighbors that still fit into `visible`, preferring the
    /// side whose outer edge is closer to the center of `visible`.
    pub fn add_neighbors(&mut self, grid: &Grid, visible: Range, gap: i32) {
        let fits = |width: i32, column: Option<ColumnId>| {
            column
                .and_then(|id| grid.column(id))
                .filter(|c| width + gap + c.width() <= visible.width)
                .map(|c| c.id())
        };

        let center = f64::from(visible.x) + f64::from(visible.width) / 2.;
        let mut left = fits(self.width, grid.left_column(self.left));
        let mut right = fits(self.width, grid.right_column(self.right));

        loop {
            let left_distance = left
                .and_then(|id| grid.column(id))
                .map(|c| (f64::from(c.left()) - center).abs());
            let right_distance = right
                .and_then(|id| grid.column(id))
                .map(|c| (f64::from(c.right()) - center).abs());

            let take_left = match (left_distance, right_distance) {
                (None, None) => break,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (Some(l), Some(r)) => l < r,
            };

            if take_left {
                if let Some(column) = left.and_then(|id| grid.column(id)) {
                    self.left = column.id();
                    self.x = column.left();
                    self.width += column.width() + gap;
                }
                left = grid.left_column(self.left);
            } else {
                if let Some(column) = right.and_then(|id| grid.column(id)) {
                    self.right = column.id();
                    self.width += column.width() + gap;
                }
                right = grid.right_column(self.right);
            }

            left = fits(self.width, left);
            right = fits(self.width, right);
        }
    }
}

impl Span for ColumnRange {
    fn left(&self) -> i32 {
        self.x
    }

    fn width(&self) -> i32 {
        self.width
    }
}
