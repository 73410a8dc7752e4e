//! In-memory window host.
//!
//! Stands in for a real compositor: it remembers every frame the layout
//! commits, tracks focus, and derives each desktop's client and available
//! areas from the screen, docks, and pinned windows. Floating dialogs move
//! along with their parent, and mode changes the driver asks for are queued
//! back to it the way a compositor would report them.

use std::collections::{BTreeMap, BTreeSet};

use stripwm_core_layout::{DesktopId, FrameMode, Host, Rect, WindowId};
use stripwm_ipc::WindowDecorations;
use tracing::{debug, trace};

/// What the host knows about one window.
#[derive(Debug, Clone, PartialEq)]
pub struct SimWindow {
    pub rect: Rect,
    pub opacity: f64,
    pub desktop: DesktopId,
    pub minimized: bool,
    pub mode: FrameMode,
    pub decorations: WindowDecorations,
    /// The window this one is a dialog of.
    pub parent: Option<WindowId>,
    /// Whether the window moves along with its parent.
    pub follows_parent: bool,
}

/// An edge-snapped window keeping part of a desktop free.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Pin {
    desktop: DesktopId,
    rect: Rect,
    minimized: bool,
}

/// Tracks pinned windows and carves the tiling area around them.
#[derive(Debug, Default)]
pub struct PinManager {
    pins: BTreeMap<WindowId, Pin>,
}

/// Leftover pieces narrower or shorter than this are not worth tiling in.
const MIN_LOT_WIDTH: i32 = 200;
const MIN_LOT_HEIGHT: i32 = 200;

impl PinManager {
    pub fn add(&mut self, window: WindowId, desktop: DesktopId, rect: Rect) {
        self.pins.insert(
            window,
            Pin {
                desktop,
                rect,
                minimized: false,
            },
        );
    }

    /// Returns the desktop the pin was on.
    pub fn remove(&mut self, window: WindowId) -> Option<DesktopId> {
        self.pins.remove(&window).map(|pin| pin.desktop)
    }

    pub fn contains(&self, window: WindowId) -> bool {
        self.pins.contains_key(&window)
    }

    pub fn desktop_of(&self, window: WindowId) -> Option<DesktopId> {
        self.pins.get(&window).map(|pin| pin.desktop)
    }

    /// Returns the pin's desktop if `window` is pinned.
    pub fn set_minimized(&mut self, window: WindowId, minimized: bool) -> Option<DesktopId> {
        let pin = self.pins.get_mut(&window)?;
        pin.minimized = minimized;
        Some(pin.desktop)
    }

    /// The largest rectangle of `area` not covered by a visible pin on
    /// `desktop`.
    pub fn available_area(&self, desktop: DesktopId, area: Rect) -> Rect {
        let mut lots = vec![area];

        for pin in self.pins.values() {
            if pin.desktop != desktop || pin.minimized {
                continue;
            }
            lots = lots
                .into_iter()
                .flat_map(|lot| split_lot(lot, pin.rect))
                .collect();
        }

        lots.into_iter()
            .filter(|lot| lot.area() > 0)
            .max_by_key(|lot| lot.area())
            .unwrap_or(area)
    }
}

/// The pieces of `lot` above, below, left and right of `obstacle`.
fn split_lot(lot: Rect, obstacle: Rect) -> Vec<Rect> {
    if !lot.intersects(&obstacle) {
        return vec![lot];
    }

    let mut pieces = Vec::with_capacity(4);
    if obstacle.y - lot.y >= MIN_LOT_HEIGHT {
        pieces.push(Rect::new(lot.x, lot.y, lot.width, obstacle.y - lot.y));
    }
    if lot.bottom() - obstacle.bottom() >= MIN_LOT_HEIGHT {
        pieces.push(Rect::new(lot.x, obstacle.bottom(), lot.width, lot.bottom() - obstacle.bottom()));
    }
    if obstacle.x - lot.x >= MIN_LOT_WIDTH {
        pieces.push(Rect::new(lot.x, lot.y, obstacle.x - lot.x, lot.height));
    }
    if lot.right() - obstacle.right() >= MIN_LOT_WIDTH {
        pieces.push(Rect::new(obstacle.right(), lot.y, lot.right() - obstacle.right(), lot.height));
    }
    pieces
}

/// The simulated compositor.
#[derive(Debug)]
pub struct SimHost {
    screen: Rect,
    current_desktop: DesktopId,
    windows: BTreeMap<WindowId, SimWindow>,
    focused: Option<WindowId>,
    docks: BTreeMap<WindowId, Rect>,
    pub pins: PinManager,
    /// Mode changes made on request, not yet seen by the driver.
    mode_changes: Vec<(WindowId, FrameMode)>,
}

impl SimHost {
    pub fn new(screen: Rect, current_desktop: DesktopId) -> Self {
        Self {
            screen,
            current_desktop,
            windows: BTreeMap::new(),
            focused: None,
            docks: BTreeMap::new(),
            pins: PinManager::default(),
            mode_changes: Vec::new(),
        }
    }

    pub fn screen(&self) -> Rect {
        self.screen
    }

    pub fn set_screen(&mut self, screen: Rect) {
        debug!("screen resized to {:?}", screen);
        self.screen = screen;
    }

    pub fn current_desktop(&self) -> DesktopId {
        self.current_desktop
    }

    pub fn switch_desktop(&mut self, desktop: DesktopId) {
        self.current_desktop = desktop;
        if self
            .focused
            .and_then(|w| self.windows.get(&w))
            .is_some_and(|w| w.desktop != desktop)
        {
            self.focused = None;
        }
    }

    pub fn window(&self, window: WindowId) -> Option<&SimWindow> {
        self.windows.get(&window)
    }

    pub fn windows(&self) -> impl Iterator<Item = (WindowId, &SimWindow)> + '_ {
        self.windows.iter().map(|(&id, w)| (id, w))
    }

    pub fn open_window(&mut self, window: WindowId, desktop: DesktopId, rect: Rect) {
        self.windows.insert(
            window,
            SimWindow {
                rect,
                opacity: 1.0,
                desktop,
                minimized: false,
                mode: FrameMode::NORMAL,
                decorations: WindowDecorations::default(),
                parent: None,
                follows_parent: false,
            },
        );
    }

    pub fn set_parent(&mut self, window: WindowId, parent: Option<WindowId>) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.parent = parent;
        }
    }

    pub fn set_follows_parent(&mut self, window: WindowId, follows: bool) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.follows_parent = follows;
        }
    }

    /// Records a mode the host itself reported.
    pub fn set_mode(&mut self, window: WindowId, mode: FrameMode) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.mode = mode;
        }
    }

    /// Mode changes made since the last call, oldest first.
    pub fn take_mode_changes(&mut self) -> Vec<(WindowId, FrameMode)> {
        std::mem::take(&mut self.mode_changes)
    }

    /// Shifts the dialogs of `parent` (and theirs) that follow their parent
    /// and share its desktop.
    pub fn move_transients(&mut self, parent: WindowId, dx: i32, dy: i32) {
        let Some(desktop) = self.windows.get(&parent).map(|w| w.desktop) else {
            return;
        };

        let mut seen = BTreeSet::from([parent]);
        let mut pending = self.transients_of(parent);
        while let Some(child) = pending.pop() {
            if !seen.insert(child) {
                continue;
            }
            let Some(w) = self.windows.get_mut(&child) else {
                continue;
            };
            if !w.follows_parent {
                continue;
            }
            if w.desktop == desktop {
                w.rect.x += dx;
                w.rect.y += dy;
                trace!("transient {} follows {} by ({}, {})", child, parent, dx, dy);
            }
            pending.extend(self.transients_of(child));
        }
    }

    fn transients_of(&self, parent: WindowId) -> Vec<WindowId> {
        self.windows
            .iter()
            .filter(|(_, w)| w.parent == Some(parent))
            .map(|(&id, _)| id)
            .collect()
    }

    fn queue_mode(&mut self, window: WindowId, mode: FrameMode) {
        let desktop = match self.windows.get_mut(&window) {
            Some(w) if w.mode != mode => {
                w.mode = mode;
                w.desktop
            }
            _ => return,
        };

        let frame = if mode.fullscreen {
            Some(self.screen)
        } else if mode.maximized {
            Some(self.client_area(desktop))
        } else {
            None
        };
        if let (Some(frame), Some(w)) = (frame, self.windows.get_mut(&window)) {
            w.rect = frame;
        }
        self.mode_changes.push((window, mode));
    }

    /// Forgets a window. Focus drops to nothing if it had it.
    pub fn close_window(&mut self, window: WindowId) -> Option<SimWindow> {
        if self.focused == Some(window) {
            self.focused = None;
        }
        self.docks.remove(&window);
        self.pins.remove(window);
        self.windows.remove(&window)
    }

    /// The window's frame changed on the host side.
    pub fn set_frame(&mut self, window: WindowId, rect: Rect) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.rect = rect;
        }
    }

    pub fn set_minimized(&mut self, window: WindowId, minimized: bool) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.minimized = minimized;
        }
        if minimized && self.focused == Some(window) {
            self.focused = None;
        }
    }

    /// Focus moved by the user rather than the layout. Unknown windows drop
    /// focus.
    pub fn user_focus(&mut self, window: Option<WindowId>) {
        self.focused = window.filter(|w| self.windows.contains_key(w));
        if let Some(desktop) = self.focused.and_then(|w| self.windows.get(&w)).map(|w| w.desktop) {
            self.current_desktop = desktop;
        }
    }

    pub fn add_dock(&mut self, window: WindowId, rect: Rect) {
        self.docks.insert(window, rect);
    }

    pub fn remove_dock(&mut self, window: WindowId) -> bool {
        self.docks.remove(&window).is_some()
    }
}

impl Host for SimHost {
    fn place(&mut self, window: WindowId, rect: Rect) {
        let Some(w) = self.windows.get_mut(&window) else {
            return;
        };
        trace!("place {} at {:?}", window, rect);
        let old = std::mem::replace(&mut w.rect, rect);
        let (dx, dy) = center_shift(old, rect);
        if dx != 0 || dy != 0 {
            self.move_transients(window, dx, dy);
        }
    }

    fn set_opacity(&mut self, window: WindowId, opacity: f64) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.opacity = opacity;
        }
    }

    fn focused_window(&self) -> Option<WindowId> {
        self.focused
    }

    /// Silently refuses windows it does not know or that are minimized.
    fn set_focused(&mut self, window: WindowId) {
        match self.windows.get(&window) {
            Some(w) if !w.minimized => {
                self.focused = Some(window);
                self.current_desktop = w.desktop;
            }
            _ => debug!("refusing focus for window {}", window),
        }
    }

    /// The screen minus the edges docks reserve.
    fn client_area(&self, _desktop: DesktopId) -> Rect {
        let screen = self.screen;
        let (mut top, mut bottom) = (screen.y, screen.bottom());
        let (mut left, mut right) = (screen.x, screen.right());

        for dock in self.docks.values().filter(|d| d.intersects(&screen)) {
            if dock.width >= dock.height {
                if dock.y + dock.height / 2 < screen.y + screen.height / 2 {
                    top = top.max(dock.bottom());
                } else {
                    bottom = bottom.min(dock.y);
                }
            } else if dock.x + dock.width / 2 < screen.x + screen.width / 2 {
                left = left.max(dock.right());
            } else {
                right = right.min(dock.x);
            }
        }

        Rect::new(left, top, (right - left).max(0), (bottom - top).max(0))
    }

    fn available_area(&self, desktop: DesktopId, client_area: Rect) -> Rect {
        self.pins.available_area(desktop, client_area)
    }

    fn move_to_desktop(&mut self, window: WindowId, desktop: DesktopId) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.desktop = desktop;
        }
    }

    fn restore_tiled(&mut self, window: WindowId) {
        self.queue_mode(window, FrameMode::NORMAL);
    }

    fn set_frame_mode(&mut self, window: WindowId, mode: FrameMode) {
        debug!("window {} back to {:?}", window, mode);
        self.queue_mode(window, mode);
    }

    fn set_keep_above(&mut self, window: WindowId, keep: bool) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.decorations.keep_above = keep;
        }
    }

    fn set_keep_below(&mut self, window: WindowId, keep: bool) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.decorations.keep_below = keep;
        }
    }

    fn set_skip_switcher(&mut self, window: WindowId, skip: bool) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.decorations.skip_switcher = skip;
        }
    }
}

/// How far the center of a frame moved, rounded half up.
pub fn center_shift(old: Rect, new: Rect) -> (i32, i32) {
    let center = |start: i32, len: i32| f64::from(start) + f64::from(len) / 2.;
    let dx = center(new.x, new.width) - center(old.x, old.width);
    let dy = center(new.y, new.height) - center(old.y, old.height);
    ((dx + 0.5).floor() as i32, (dy + 0.5).floor() as i32)
}
