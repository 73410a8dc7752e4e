//! Lifecycle states of managed windows.
//!
//! Every managed window is in exactly one state. Changing state always tears
//! the old one down first, so a window never sits in the grid and in the pin
//! set at the same time.

use std::time::{Duration, Instant};

use stripwm_core_layout::{FocusPassing, FrameMode, Layout, Size, WindowId};
use stripwm_ipc::{WindowKind, WindowState};
use tracing::debug;

use crate::sim_host::SimHost;

/// Debounced follow-up work a state change or event asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    /// The user let go of a resize handle on this desktop.
    UserResizeSettled { desktop: u64 },
    /// Screen geometry (size, docks) changed.
    ScreenSettled,
}

impl Timer {
    pub fn delay_ms(self) -> u64 {
        match self {
            Timer::UserResizeSettled { .. } => 50,
            Timer::ScreenSettled => 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// In a column of its desktop's grid.
    Tiled,
    /// Tiled before it was minimized; re-tiles when restored.
    TiledMinimized,
    /// Outside the grid.
    Floating,
    /// Snapped to a screen edge; the grid avoids it.
    Pinned,
    /// A panel shrinking the client area.
    Docked,
}

impl ClientState {
    /// Undoes everything entering this state did.
    pub fn destroy(
        self,
        window: WindowId,
        layout: &mut Layout,
        host: &mut SimHost,
        mode: FocusPassing,
    ) -> Option<Timer> {
        debug!("leaving {:?} for window {} ({:?})", self, window, mode);
        match self {
            ClientState::Tiled => {
                layout.remove_window(host, window, mode);
                None
            }
            ClientState::TiledMinimized | ClientState::Floating => None,
            ClientState::Pinned => {
                if let Some(desktop) = host.pins.remove(window) {
                    if let Some(desktop) = layout.desktop_mut(desktop) {
                        desktop.on_pins_changed();
                    }
                }
                None
            }
            ClientState::Docked => {
                host.remove_dock(window);
                Some(Timer::ScreenSettled)
            }
        }
    }

    pub fn is_tiled(self) -> bool {
        self == ClientState::Tiled
    }
}

impl From<ClientState> for WindowState {
    fn from(state: ClientState) -> Self {
        match state {
            ClientState::Tiled => WindowState::Tiled,
            ClientState::TiledMinimized => WindowState::TiledMinimized,
            ClientState::Floating => WindowState::Floating,
            ClientState::Pinned => WindowState::Pinned,
            ClientState::Docked => WindowState::Docked,
        }
    }
}

/// A managed window and what the driver remembers about it.
#[derive(Debug, Clone)]
pub struct Client {
    pub state: ClientState,
    pub kind: WindowKind,
    pub class: String,
    pub title: String,
    pub executable: String,
    /// Width of the frame when the window was first seen or last resized
    /// by the application.
    pub preferred_width: i32,
    pub min_size: Size,
    pub fullscreen: bool,
    pub maximized: bool,
    /// The host's switcher setting before tiling overrode it.
    pub skip_switcher_before: bool,
    /// Frame changes the application made while tiled.
    pub frame_changes: RateLimiter,
}

impl Client {
    pub fn mode(&self) -> FrameMode {
        FrameMode {
            fullscreen: self.fullscreen,
            maximized: self.maximized,
        }
    }
}

/// How many frame changes a tiled application may make per interval before
/// the rest are ignored.
pub const MAX_EXTERNAL_FRAME_CHANGES: u32 = 4;
pub const EXTERNAL_FRAME_CHANGE_INTERVAL: Duration = Duration::from_millis(1000);

/// Fixed-window counter: at most `max` acquisitions per `interval`.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max: u32,
    interval: Duration,
    count: u32,
    start: Option<Instant>,
}

impl RateLimiter {
    pub fn new(max: u32, interval: Duration) -> Self {
        Self {
            max,
            interval,
            count: 0,
            start: None,
        }
    }

    pub fn frame_changes() -> Self {
        Self::new(MAX_EXTERNAL_FRAME_CHANGES, EXTERNAL_FRAME_CHANGE_INTERVAL)
    }

    /// Takes one slot at `now`. Returns `false` once the current interval
    /// is used up.
    pub fn acquire(&mut self, now: Instant) -> bool {
        let expired = self
            .start
            .map_or(true, |start| now.saturating_duration_since(start) >= self.interval);
        if expired {
            self.count = 0;
            self.start = Some(now);
        }

        if self.count < self.max {
            self.count += 1;
            true
        } else {
            false
        }
    }
}
