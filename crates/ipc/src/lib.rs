//! stripwm IPC protocol
//!
//! Shared types for the newline-delimited JSON stream between a window host
//! and the stripwm driver. The host writes one [`HostEvent`] per line and
//! reads back one [`Response`] per line.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest line the driver accepts, in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// A rectangle in screen coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl IpcRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }
}

/// What kind of window the host opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    /// A regular application window.
    #[default]
    Normal,
    /// A dialog or other window belonging to another one.
    Transient,
    /// A panel reserving screen space.
    Dock,
}

/// Things that happened on the host side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// The screen (and every desktop's client area) changed size.
    ScreenResized { area: IpcRect },

    /// The user switched to another desktop.
    DesktopSwitched { desktop: u64 },

    /// A new window appeared.
    WindowOpened {
        window: u64,
        desktop: u64,
        rect: IpcRect,
        #[serde(default)]
        min_width: i32,
        #[serde(default)]
        min_height: i32,
        #[serde(default)]
        class: String,
        #[serde(default)]
        title: String,
        #[serde(default)]
        executable: String,
        #[serde(default)]
        kind: WindowKind,
        #[serde(default)]
        fullscreen: bool,
        #[serde(default)]
        maximized: bool,
        /// The window this one is a dialog of. Floating transients follow
        /// their parent around.
        #[serde(default)]
        transient_for: Option<u64>,
    },

    /// A window went away.
    WindowClosed { window: u64 },

    /// Host focus moved to `window`, or to nothing.
    WindowFocused { window: Option<u64> },

    WindowMinimized { window: u64 },

    WindowUnminimized { window: u64 },

    /// The application (not the layout) changed a window's frame.
    WindowFrameChanged { window: u64, rect: IpcRect },

    WindowMinSizeChanged {
        window: u64,
        min_width: i32,
        min_height: i32,
    },

    WindowFullscreenChanged { window: u64, fullscreen: bool },

    WindowMaximizedChanged { window: u64, maximized: bool },

    WindowTitleChanged { window: u64, title: String },

    /// The user snapped a window to a screen edge; it keeps `rect` free.
    WindowPinned { window: u64, rect: IpcRect },

    /// A pinned window was dragged off its edge.
    WindowUnpinned { window: u64 },

    /// The window was sent to another desktop by the host.
    WindowDesktopChanged { window: u64, desktop: u64 },

    /// The user grabbed a window edge. `cursor_x` decides which neighbor
    /// column gives way.
    ResizeStarted { window: u64, cursor_x: i32 },

    /// The frame of the window being resized is now `rect`.
    ResizeUpdated { window: u64, rect: IpcRect },

    ResizeFinished { window: u64 },

    /// Accumulated, normalized horizontal gesture delta since the gesture
    /// started.
    GestureScroll { amount: f64 },

    GestureFinished,

    /// A user command (keybinding, script).
    Command { command: Command },
}

/// User commands, usually bound to keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    FocusLeft,
    FocusRight,
    FocusUp,
    FocusDown,
    /// Next window down the column, else first window of the next column.
    FocusNext,
    FocusPrevious,
    FocusStart,
    FocusEnd,
    /// Focus the column at `index` (0-based) on the current desktop.
    FocusColumn { index: usize },
    /// Focus a window by id.
    FocusWindow { window: u64 },

    WindowMoveLeft,
    WindowMoveRight,
    WindowMoveUp,
    WindowMoveDown,
    WindowMoveNext,
    WindowMovePrevious,
    WindowMoveStart,
    WindowMoveEnd,
    WindowMoveToColumn { index: usize },
    WindowToggleFloating,

    ColumnMoveLeft,
    ColumnMoveRight,
    ColumnMoveStart,
    ColumnMoveEnd,
    ColumnMoveToColumn { index: usize },
    ColumnToggleStacked,
    ColumnMoveToDesktop { desktop: u64 },
    /// Move the focused column and everything right of it.
    TailMoveToDesktop { desktop: u64 },

    /// Grow the focused column to the next preset width.
    ColumnWidthIncrease,
    ColumnWidthDecrease,
    CyclePresetWidths,
    CyclePresetWidthsReverse,
    ColumnsWidthEqualize,
    ColumnsSqueezeLeft,
    ColumnsSqueezeRight,

    GridScrollLeft,
    GridScrollRight,
    GridScrollStart,
    GridScrollEnd,
    GridScrollFocused,
    GridScrollLeftColumn,
    GridScrollRightColumn,
    /// Scroll the current desktop by `delta` pixels.
    ScrollBy { delta: i32 },

    /// Report the full layout.
    QueryLayout,
    /// Reload configuration from file.
    Reload,
    /// Stop the driver.
    Stop,
}

/// Lifecycle state of a managed window, as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowState {
    Tiled,
    TiledMinimized,
    Floating,
    Pinned,
    Docked,
}

/// Stacking and switcher hints the driver set on a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDecorations {
    pub keep_above: bool,
    pub keep_below: bool,
    pub skip_switcher: bool,
}

/// Where a window currently is and how it looks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowPlacement {
    pub window: u64,
    pub desktop: u64,
    pub rect: IpcRect,
    pub opacity: f64,
    pub state: WindowState,
    #[serde(default)]
    pub fullscreen: bool,
    #[serde(default)]
    pub maximized: bool,
    #[serde(default)]
    pub decorations: WindowDecorations,
}

/// One column of a desktop, left to right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub width: i32,
    pub stacked: bool,
    /// Window ids, top to bottom.
    pub windows: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesktopInfo {
    pub desktop: u64,
    pub scroll_x: i32,
    pub tiling_area: IpcRect,
    pub columns: Vec<ColumnInfo>,
}

/// Responses from the driver, one per input line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    /// Event or command handled.
    Ok,
    /// The input could not be handled.
    Error {
        /// Error message describing what went wrong.
        message: String,
    },
    /// Layout query response.
    Layout {
        current_desktop: u64,
        focused: Option<u64>,
        desktops: Vec<DesktopInfo>,
        windows: Vec<WindowPlacement>,
    },
}

impl Response {
    /// Create an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Why an input line was rejected.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("message of {0} bytes exceeds the size limit")]
    TooLong(usize),
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Parse one input line.
pub fn decode_event(line: &str) -> Result<HostEvent, ProtocolError> {
    if line.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::TooLong(line.len()));
    }
    Ok(serde_json::from_str(line.trim())?)
}

/// Serialize a response as one output line, newline included.
pub fn encode_response(response: &Response) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(response)?;
    line.push('\n');
    Ok(line)
}
