//! User commands: focus, window and column moves, widths, and scrolling.

use stripwm_core_layout::{Column, ColumnId, Desktop, Direction, Host, WindowId};
use stripwm_ipc::Command;
use tracing::{debug, info};

use crate::client_state::Timer;
use crate::presets::{ColumnResizer, PresetWidths};
use crate::state::{AppState, Focused};

impl AppState {
    /// Runs a command against the focused window or the current desktop.
    /// Commands that need a focused tiled window do nothing without one.
    pub(crate) fn run_command(&mut self, command: Command, timers: &mut Vec<Timer>) {
        debug!("command: {:?}", command);
        match command {
            // Focus
            Command::FocusLeft => self.with_focused(|state, f| {
                let target = state.neighbor_column(f, Direction::Left);
                state.focus_column(f.desktop, target);
            }),
            Command::FocusRight => self.with_focused(|state, f| {
                let target = state.neighbor_column(f, Direction::Right);
                state.focus_column(f.desktop, target);
            }),
            Command::FocusUp => self.with_focused(|state, f| {
                let above = state.column(f).and_then(|c| c.window_above(f.window));
                state.focus(above);
            }),
            Command::FocusDown => self.with_focused(|state, f| {
                let below = state.column(f).and_then(|c| c.window_below(f.window));
                state.focus(below);
            }),
            Command::FocusNext => self.with_focused(|state, f| {
                let target = state.column(f).and_then(|c| c.window_below(f.window)).or_else(|| {
                    let right = state.neighbor_column(f, Direction::Right)?;
                    state.grid(f.desktop)?.column(right)?.first_window()
                });
                state.focus(target);
            }),
            Command::FocusPrevious => self.with_focused(|state, f| {
                let target = state.column(f).and_then(|c| c.window_above(f.window)).or_else(|| {
                    let left = state.neighbor_column(f, Direction::Left)?;
                    state.grid(f.desktop)?.column(left)?.last_window()
                });
                state.focus(target);
            }),
            Command::FocusStart => {
                let desktop = self.host.current_desktop();
                let first = self.grid(desktop).and_then(|g| g.first_column());
                self.focus_column(desktop, first);
            }
            Command::FocusEnd => {
                let desktop = self.host.current_desktop();
                let last = self.grid(desktop).and_then(|g| g.last_column());
                self.focus_column(desktop, last);
            }
            Command::FocusColumn { index } => {
                let desktop = self.host.current_desktop();
                let column = self.grid(desktop).and_then(|g| g.column_at_index(index));
                self.focus_column(desktop, column);
            }
            Command::FocusWindow { window } => {
                if self.layout.find_window(window).is_some() {
                    self.focus(Some(window));
                } else {
                    debug!("focus_window: {} is not tiled", window);
                }
            }

            // Window moves
            Command::WindowMoveLeft => self.with_focused(|state, f| state.window_move_left(f)),
            Command::WindowMoveRight => self.with_focused(|state, f| state.window_move_right(f, true)),
            Command::WindowMoveUp => self.with_focused(|state, f| {
                if let Some(desktop) = state.layout.desktop_mut(f.desktop) {
                    desktop.move_window_up(f.window);
                }
            }),
            Command::WindowMoveDown => self.with_focused(|state, f| {
                if let Some(desktop) = state.layout.desktop_mut(f.desktop) {
                    desktop.move_window_down(f.window);
                }
            }),
            Command::WindowMoveNext => self.with_focused(|state, f| {
                let is_last = state.column(f).and_then(|c| c.last_window()) == Some(f.window);
                if is_last {
                    state.window_move_right(f, false);
                } else if let Some(desktop) = state.layout.desktop_mut(f.desktop) {
                    desktop.move_window_down(f.window);
                }
            }),
            Command::WindowMovePrevious => self.with_focused(|state, f| {
                let is_first = state.column(f).and_then(|c| c.first_window()) == Some(f.window);
                if is_first {
                    state.window_move_left(f);
                } else if let Some(desktop) = state.layout.desktop_mut(f.desktop) {
                    desktop.move_window_up(f.window);
                }
            }),
            Command::WindowMoveStart => self.with_focused(|state, f| state.window_to_new_column(f, None)),
            Command::WindowMoveEnd => self.with_focused(|state, f| {
                let last = state.grid(f.desktop).and_then(|g| g.last_column());
                state.window_to_new_column(f, last);
            }),
            Command::WindowMoveToColumn { index } => self.with_focused(|state, f| {
                let Some(target) = state.grid(f.desktop).and_then(|g| g.column_at_index(index)) else {
                    return;
                };
                state.window_to_column(f, target, true);
            }),
            Command::WindowToggleFloating => {
                if let Some(window) = self.host.focused_window() {
                    self.toggle_floating(window, timers);
                    info!("Toggled floating for window {}", window);
                }
            }

            // Column moves
            Command::ColumnMoveLeft => self.with_focused(|state, f| {
                if let Some(desktop) = state.layout.desktop_mut(f.desktop) {
                    desktop.move_column_left(f.column);
                }
            }),
            Command::ColumnMoveRight => self.with_focused(|state, f| {
                if let Some(desktop) = state.layout.desktop_mut(f.desktop) {
                    desktop.move_column_right(f.column);
                }
            }),
            Command::ColumnMoveStart => self.with_focused(|state, f| state.move_column(f, None)),
            Command::ColumnMoveEnd => self.with_focused(|state, f| {
                let last = state.grid(f.desktop).and_then(|g| g.last_column());
                state.move_column(f, last);
            }),
            Command::ColumnMoveToColumn { index } => self.with_focused(|state, f| {
                let Some(grid) = state.grid(f.desktop) else {
                    return;
                };
                let Some(target) = grid.column_at_index(index).filter(|&c| c != f.column) else {
                    return;
                };
                let target_is_right = match (grid.column(target), grid.column(f.column)) {
                    (Some(target), Some(column)) => target.is_to_the_right_of(column),
                    _ => return,
                };
                let after = if target_is_right {
                    Some(target)
                } else {
                    grid.left_column(target)
                };
                state.move_column(f, after);
            }),
            Command::ColumnToggleStacked => self.with_focused(|state, f| {
                if let Some(desktop) = state.layout.desktop_mut(f.desktop) {
                    desktop.toggle_stacked(f.column);
                }
            }),
            Command::ColumnMoveToDesktop { desktop } => self.with_focused(|state, f| {
                if state.layout.move_column_to_desktop(&mut state.host, f.column, desktop) {
                    info!("Moved column to desktop {}", desktop);
                }
            }),
            Command::TailMoveToDesktop { desktop } => self.with_focused(|state, f| {
                let moved = state.layout.evacuate_tail(&mut state.host, f.column, desktop);
                info!("Moved {} column(s) to desktop {}", moved, desktop);
            }),

            // Widths
            Command::ColumnWidthIncrease => self.with_focused(|state, f| {
                state.resize_column(f, ColumnResizer::increase);
            }),
            Command::ColumnWidthDecrease => self.with_focused(|state, f| {
                state.resize_column(f, ColumnResizer::decrease);
            }),
            Command::CyclePresetWidths => self.with_focused(|state, f| {
                state.set_preset_width(f, |presets, width, min, max| presets.next(width, min, max));
            }),
            Command::CyclePresetWidthsReverse => self.with_focused(|state, f| {
                state.set_preset_width(f, |presets, width, min, max| presets.prev(width, min, max));
            }),
            Command::ColumnsWidthEqualize => {
                self.current_desktop_mut().equalize_widths();
            }
            Command::ColumnsSqueezeLeft => self.with_focused(|state, f| {
                if let Some(desktop) = state.layout.desktop_mut(f.desktop) {
                    desktop.squeeze_columns(f.column, Direction::Left);
                }
            }),
            Command::ColumnsSqueezeRight => self.with_focused(|state, f| {
                if let Some(desktop) = state.layout.desktop_mut(f.desktop) {
                    desktop.squeeze_columns(f.column, Direction::Right);
                }
            }),

            // Scrolling
            Command::GridScrollLeft => {
                let step = self.config.scrolling.manual_scroll_step;
                self.current_desktop_mut().adjust_scroll(-step, false);
            }
            Command::GridScrollRight => {
                let step = self.config.scrolling.manual_scroll_step;
                self.current_desktop_mut().adjust_scroll(step, false);
            }
            Command::ScrollBy { delta } => {
                self.current_desktop_mut().adjust_scroll(delta, false);
            }
            Command::GridScrollStart => {
                let desktop = self.current_desktop_mut();
                if let Some(first) = desktop.grid().first_column() {
                    desktop.scroll_to_column(first, false);
                }
            }
            Command::GridScrollEnd => {
                let desktop = self.current_desktop_mut();
                if let Some(last) = desktop.grid().last_column() {
                    desktop.scroll_to_column(last, false);
                }
            }
            Command::GridScrollFocused => self.with_focused(|state, f| {
                if let Some(desktop) = state.layout.desktop_mut(f.desktop) {
                    desktop.center_column(f.column);
                }
            }),
            Command::GridScrollLeftColumn => {
                let desktop = self.current_desktop_mut();
                let visible = desktop.visible_range();
                let target = desktop
                    .grid()
                    .leftmost_visible_column(visible)
                    .and_then(|c| desktop.grid().left_column(c));
                if let Some(target) = target {
                    desktop.scroll_to_column(target, false);
                }
            }
            Command::GridScrollRightColumn => {
                let desktop = self.current_desktop_mut();
                let visible = desktop.visible_range();
                let target = desktop
                    .grid()
                    .rightmost_visible_column(visible)
                    .and_then(|c| desktop.grid().right_column(c));
                if let Some(target) = target {
                    desktop.scroll_to_column(target, false);
                }
            }

            // Handled before dispatch.
            Command::QueryLayout | Command::Reload | Command::Stop => {}
        }
    }

    fn with_focused(&mut self, action: impl FnOnce(&mut Self, Focused)) {
        match self.focused_tile() {
            Some(focused) => action(self, focused),
            None => debug!("no focused tiled window"),
        }
    }

    fn column(&self, f: Focused) -> Option<&Column> {
        self.grid(f.desktop)?.column(f.column)
    }

    fn neighbor_column(&self, f: Focused, direction: Direction) -> Option<ColumnId> {
        let grid = self.grid(f.desktop)?;
        match direction {
            Direction::Left => grid.left_column(f.column),
            Direction::Right => grid.right_column(f.column),
        }
    }

    fn focus(&mut self, window: Option<WindowId>) {
        if let Some(window) = window {
            self.layout.focus_window(&mut self.host, window);
        }
    }

    fn focus_column(&mut self, desktop: u64, column: Option<ColumnId>) {
        let target = column
            .and_then(|c| self.grid(desktop)?.column(c))
            .and_then(|c| c.window_to_focus());
        self.focus(target);
    }

    /// A lone window joins the left column; otherwise it gets a new column
    /// left of its current one.
    fn window_move_left(&mut self, f: Focused) {
        let alone = self.column(f).is_some_and(|c| c.window_count() == 1);
        let left = self.neighbor_column(f, Direction::Left);
        if alone {
            if let Some(left) = left {
                self.window_to_column(f, left, true);
            }
        } else {
            self.window_to_new_column(f, left);
        }
    }

    fn window_move_right(&mut self, f: Focused, at_bottom: bool) {
        let alone = self.column(f).is_some_and(|c| c.window_count() == 1);
        if alone {
            if let Some(right) = self.neighbor_column(f, Direction::Right) {
                self.window_to_column(f, right, at_bottom);
            }
        } else {
            self.window_to_new_column(f, Some(f.column));
        }
    }

    fn window_to_column(&mut self, f: Focused, target: ColumnId, at_bottom: bool) {
        if let Some((desktop, passer)) = self.layout.desktop_and_passer(f.desktop) {
            if desktop.move_window_to_column(&mut self.host, passer, f.window, target, at_bottom) {
                desktop.auto_adjust_scroll();
            }
        }
    }

    fn window_to_new_column(&mut self, f: Focused, after: Option<ColumnId>) {
        if let Some((desktop, passer)) = self.layout.desktop_and_passer(f.desktop) {
            desktop.move_window_to_new_column(&mut self.host, passer, f.window, after);
        }
    }

    fn move_column(&mut self, f: Focused, after: Option<ColumnId>) {
        if let Some(desktop) = self.layout.desktop_mut(f.desktop) {
            desktop.move_column(f.column, after);
        }
    }

    /// Steps the focused column's width with the resizer the scroll policy
    /// calls for.
    fn resize_column(
        &mut self,
        f: Focused,
        pick: fn(ColumnResizer, &PresetWidths, &Desktop, ColumnId) -> Option<i32>,
    ) {
        let resizer = ColumnResizer::for_policy(self.config.scrolling.policy);
        let Some(desktop) = self.layout.desktop_mut(f.desktop) else {
            return;
        };
        let Some(width) = pick(resizer, &self.presets, desktop, f.column) else {
            return;
        };
        desktop.set_column_width(f.column, width, true);
        if resizer.recenters() {
            desktop.scroll_center_visible(f.column);
        }
    }

    /// Applies the preset width `pick` chooses for the focused column.
    fn set_preset_width(
        &mut self,
        f: Focused,
        pick: impl FnOnce(&PresetWidths, i32, i32, i32) -> Option<i32>,
    ) {
        let Some(desktop) = self.layout.desktop_mut(f.desktop) else {
            return;
        };
        let Some(column) = desktop.grid().column(f.column) else {
            return;
        };
        let max_width = desktop.tiling_area().width;
        let Some(width) = pick(&self.presets, column.width(), column.min_width(), max_width) else {
            return;
        };
        desktop.set_column_width(f.column, width, true);
    }
}
