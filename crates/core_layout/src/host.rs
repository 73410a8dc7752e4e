//! Contract between the engine and whatever actually owns the windows.

use crate::window::FrameMode;
use crate::{DesktopId, Rect, WindowId};

/// Services the engine needs from its host.
///
/// Every call is fire-and-forget from the engine's point of view. `place` and
/// `set_opacity` are issued on every arrange pass and must tolerate unchanged
/// values.
pub trait Host {
    /// Commits a window's frame geometry.
    fn place(&mut self, window: WindowId, rect: Rect);

    /// Sets a window's opacity in `0.0..=1.0`.
    fn set_opacity(&mut self, window: WindowId, opacity: f64);

    /// Whether the host currently has `window` focused.
    fn is_focused(&self, window: WindowId) -> bool {
        self.focused_window() == Some(window)
    }

    /// The currently focused window, if any.
    fn focused_window(&self) -> Option<WindowId>;

    /// Asks the host to focus `window`. The host may refuse or defer.
    fn set_focused(&mut self, window: WindowId);

    /// The area the desktop may use before pinned windows and margins.
    fn client_area(&self, desktop: DesktopId) -> Rect;

    /// The part of `client_area` left over by pinned windows.
    fn available_area(&self, _desktop: DesktopId, client_area: Rect) -> Rect {
        client_area
    }

    /// Undoes maximize/fullscreen on a window that lost its focused role.
    fn restore_tiled(&mut self, _window: WindowId) {}

    /// Tells the host a window now lives on another desktop.
    fn move_to_desktop(&mut self, _window: WindowId, _desktop: DesktopId) {}

    /// Puts a window back into a maximized or fullscreen mode it had while
    /// focused.
    fn set_frame_mode(&mut self, _window: WindowId, _mode: FrameMode) {}

    /// Stacking hints. Tiled windows may sit below everything else, floating
    /// and maximized ones above.
    fn set_keep_above(&mut self, _window: WindowId, _keep: bool) {}

    fn set_keep_below(&mut self, _window: WindowId, _keep: bool) {}

    /// Hides a window from (or shows it in) the host's window switcher.
    fn set_skip_switcher(&mut self, _window: WindowId, _skip: bool) {}
}
