//! Every desktop plus the state they share.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::LayoutConfig;
use crate::desktop::Desktop;
use crate::focus_passing::{FocusPasser, FocusPassing};
use crate::host::Host;
use crate::window::Window;
use crate::{ColumnId, DesktopId, WindowId};

/// The set of desktops, keyed by host-chosen id, with one shared focus passer.
#[derive(Debug)]
pub struct Layout {
    config: Arc<LayoutConfig>,
    desktops: BTreeMap<DesktopId, Desktop>,
    passer: FocusPasser,
}

impl Layout {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config: Arc::new(config),
            desktops: BTreeMap::new(),
            passer: FocusPasser::new(),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Applies new settings to every desktop.
    pub fn set_config(&mut self, config: LayoutConfig) {
        self.config = Arc::new(config);
        for desktop in self.desktops.values_mut() {
            desktop.set_config(Arc::clone(&self.config));
        }
        info!("layout configuration updated for {} desktops", self.desktops.len());
    }

    pub fn passer(&self) -> &FocusPasser {
        &self.passer
    }

    pub fn desktop(&self, id: DesktopId) -> Option<&Desktop> {
        self.desktops.get(&id)
    }

    pub fn desktop_mut(&mut self, id: DesktopId) -> Option<&mut Desktop> {
        self.desktops.get_mut(&id)
    }

    /// A desktop together with the focus passer, for operations that may hand
    /// off focus.
    pub fn desktop_and_passer(&mut self, id: DesktopId) -> Option<(&mut Desktop, &mut FocusPasser)> {
        let desktop = self.desktops.get_mut(&id)?;
        Some((desktop, &mut self.passer))
    }

    pub fn ensure_desktop(&mut self, host: &dyn Host, id: DesktopId) -> &mut Desktop {
        let config = &self.config;
        self.desktops.entry(id).or_insert_with(|| {
            debug!("creating desktop {id}");
            Desktop::new(id, Arc::clone(config), host)
        })
    }

    /// Drops a desktop and everything tiled on it.
    pub fn remove_desktop(&mut self, id: DesktopId) -> Option<Desktop> {
        self.desktops.remove(&id)
    }

    pub fn desktops(&self) -> impl Iterator<Item = &Desktop> + '_ {
        self.desktops.values()
    }

    pub fn desktop_ids(&self) -> impl Iterator<Item = DesktopId> + '_ {
        self.desktops.keys().copied()
    }

    /// Where `window` is tiled.
    pub fn find_window(&self, window: WindowId) -> Option<(DesktopId, ColumnId)> {
        self.desktops.values().find_map(|desktop| {
            desktop
                .grid()
                .column_of_window(window)
                .map(|column| (desktop.id(), column))
        })
    }

    pub fn find_column(&self, column: ColumnId) -> Option<DesktopId> {
        self.desktops
            .values()
            .find(|desktop| desktop.grid().contains(column))
            .map(|desktop| desktop.id())
    }

    /// Tiles `window` on `desktop`, creating the desktop if needed.
    pub fn add_window(&mut self, host: &mut dyn Host, desktop: DesktopId, window: Window) -> ColumnId {
        self.ensure_desktop(host, desktop).add_window(host, window)
    }

    pub fn remove_window(&mut self, host: &mut dyn Host, window: WindowId, mode: FocusPassing) -> Option<Window> {
        let (desktop, _) = self.find_window(window)?;
        let desktop = self.desktops.get_mut(&desktop)?;
        desktop.remove_window(host, &mut self.passer, window, mode)
    }

    /// Moves a column to the end of another desktop's strip. Focus follows
    /// the neighbor on the old desktop if the column had it.
    pub fn move_column_to_desktop(&mut self, host: &mut dyn Host, column: ColumnId, target: DesktopId) -> bool {
        let Some(source) = self.find_column(column) else {
            return false;
        };
        if source == target {
            return false;
        }
        self.ensure_desktop(host, target);

        let Some(source_desktop) = self.desktops.get_mut(&source) else {
            return false;
        };
        let mode = if source_desktop.is_column_focused(host, column) {
            FocusPassing::Immediate
        } else {
            FocusPassing::None
        };
        let Some(moved) = source_desktop.remove_column(host, &mut self.passer, column, mode) else {
            return false;
        };

        let windows: Vec<WindowId> = moved.window_ids().collect();
        let Some(target_desktop) = self.desktops.get_mut(&target) else {
            return false;
        };
        let after = target_desktop.grid().last_column();
        target_desktop.insert_column(moved, after);

        for window in windows {
            host.move_to_desktop(window, target);
        }
        debug!("moved column {column:?} from desktop {source} to {target}");
        true
    }

    /// Moves `start` and every column right of it to the end of `target`.
    pub fn evacuate_tail(&mut self, host: &mut dyn Host, start: ColumnId, target: DesktopId) -> usize {
        let Some(source) = self.find_column(start) else {
            return 0;
        };
        let columns: Vec<ColumnId> = match self.desktops.get(&source) {
            Some(desktop) => desktop
                .grid()
                .column_ids()
                .skip_while(|&column| column != start)
                .collect(),
            None => return 0,
        };
        self.move_columns(host, columns, target)
    }

    /// Moves every column of `source` to the end of `target`.
    pub fn evacuate(&mut self, host: &mut dyn Host, source: DesktopId, target: DesktopId) -> usize {
        let columns: Vec<ColumnId> = match self.desktops.get(&source) {
            Some(desktop) => desktop.grid().column_ids().collect(),
            None => return 0,
        };
        self.move_columns(host, columns, target)
    }

    fn move_columns(&mut self, host: &mut dyn Host, columns: Vec<ColumnId>, target: DesktopId) -> usize {
        columns
            .into_iter()
            .filter(|&column| self.move_column_to_desktop(host, column, target))
            .count()
    }

    /// Re-tiles a window on another desktop in a new column after that
    /// desktop's focused (or last) column.
    pub fn move_window_to_desktop(&mut self, host: &mut dyn Host, window: WindowId, target: DesktopId) -> bool {
        let Some((source, _)) = self.find_window(window) else {
            return false;
        };
        if source == target {
            return false;
        }

        let mode = if host.is_focused(window) {
            FocusPassing::OnUnfocus
        } else {
            FocusPassing::None
        };
        let Some(removed) = self.remove_window(host, window, mode) else {
            return false;
        };

        host.move_to_desktop(window, target);
        self.add_window(host, target, removed);
        true
    }

    /// Asks the host to focus `window`, keeping a deferred request if it
    /// doesn't comply right away.
    pub fn focus_window(&mut self, host: &mut dyn Host, window: WindowId) {
        self.passer.focus(host, window);
    }

    /// The host's focus changed to `focused` (`None`: nothing is focused).
    pub fn on_focus_changed(&mut self, host: &mut dyn Host, focused: Option<WindowId>) {
        let Some(window) = focused else {
            self.passer.activate(host);
            return;
        };

        self.passer.clear_if_different(window);
        if let Some((desktop, _)) = self.find_window(window) {
            if let Some(desktop) = self.desktops.get_mut(&desktop) {
                desktop.on_window_focused(host, window);
            }
        }
    }

    /// Screen geometry changed; every desktop recomputes its area.
    pub fn on_screen_resized(&mut self) {
        for desktop in self.desktops.values_mut() {
            desktop.on_pins_changed();
        }
    }

    pub fn arrange(&mut self, host: &mut dyn Host, desktop: DesktopId) {
        if let Some(desktop) = self.desktops.get_mut(&desktop) {
            desktop.arrange(host);
        }
    }

    pub fn arrange_all(&mut self, host: &mut dyn Host) {
        for desktop in self.desktops.values_mut() {
            desktop.arrange(host);
        }
    }
}
