//! Tiled window leaf.

use serde::{Deserialize, Serialize};

use crate::host::Host;
use crate::{ColumnId, Rect, Size, WindowId};

/// Geometry modes in which the host, not the layout, owns a window's frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMode {
    pub fullscreen: bool,
    pub maximized: bool,
}

impl FrameMode {
    pub const NORMAL: FrameMode = FrameMode {
        fullscreen: false,
        maximized: false,
    };

    pub fn is_host_owned(self) -> bool {
        self.fullscreen || self.maximized
    }
}

/// A window as seen by the layout.
///
/// `column` is a non-owning back-reference; whoever moves the window between
/// columns updates it in the same step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    id: WindowId,
    pub(crate) column: Option<ColumnId>,
    /// Height assigned by the column's vertical distribution.
    pub(crate) height: i32,
    /// Minimum size last reported by the host.
    pub(crate) min_size: Size,
    /// Width the window gets when it starts a fresh column.
    pub(crate) preferred_width: i32,
    /// Current host-owned mode; the layout leaves the frame alone while set.
    pub(crate) mode: FrameMode,
    /// Mode as of the last change seen while the window had focus.
    pub(crate) focused_mode: FrameMode,
}

impl Window {
    /// A window not yet admitted to any column.
    pub fn new(id: WindowId, size: Size) -> Self {
        Self {
            id,
            column: None,
            height: size.height,
            min_size: Size::default(),
            preferred_width: size.width,
            mode: FrameMode::NORMAL,
            focused_mode: FrameMode::NORMAL,
        }
    }

    pub fn with_min_size(mut self, min_size: Size) -> Self {
        self.min_size = min_size;
        self
    }

    /// A window that starts out in `mode`, e.g. opened fullscreen.
    pub fn with_mode(mut self, mode: FrameMode) -> Self {
        self.mode = mode;
        self.focused_mode = mode;
        self
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn column(&self) -> Option<ColumnId> {
        self.column
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn min_size(&self) -> Size {
        self.min_size
    }

    pub fn preferred_width(&self) -> i32 {
        self.preferred_width
    }

    pub fn mode(&self) -> FrameMode {
        self.mode
    }

    pub fn focused_mode(&self) -> FrameMode {
        self.focused_mode
    }

    pub fn skip_arrange(&self) -> bool {
        self.mode.is_host_owned()
    }

    /// Whether focusing the window should hand its old mode back to the host.
    pub(crate) fn wants_re_maximize(&self) -> bool {
        !self.skip_arrange() && self.focused_mode.is_host_owned()
    }

    /// Minimum height used for vertical distribution; hosts reporting no
    /// minimum get one pixel.
    pub(crate) fn min_height(&self) -> i32 {
        if self.min_size.height > 0 {
            self.min_size.height
        } else {
            1
        }
    }

    /// Commits geometry unless the host currently owns it. With
    /// `re_maximize`, a focused window that was maximized or fullscreen gets
    /// that mode back instead.
    pub(crate) fn arrange(&self, host: &mut dyn Host, rect: Rect, re_maximize: bool) {
        if self.skip_arrange() {
            return;
        }
        if re_maximize && self.wants_re_maximize() && host.is_focused(self.id) {
            host.set_frame_mode(self.id, self.focused_mode);
            return;
        }
        host.place(self.id, rect);
    }
}
