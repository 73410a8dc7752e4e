//! stripwm core layout engine
//!
//! Platform-agnostic scrollable tiling layout engine.
//!
//! Windows are stacked vertically in columns; columns sit side by side on an
//! infinite horizontal strip; each desktop is a viewport scrolling over its
//! own strip. Hosts feed events in through [`Layout`] and [`Desktop`] and get
//! geometry back through the [`Host`] trait on every [`Desktop::arrange`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

pub mod column;
pub mod config;
pub mod desktop;
pub mod distribute;
pub mod focus_passing;
pub mod grid;
pub mod host;
pub mod layout;
pub mod ordered;
pub mod range;
pub mod scroll;
pub mod window;

pub use column::{Column, MIN_COLUMN_WIDTH};
pub use config::{ClampPolicy, LayoutConfig, Margins, ScrollPolicy};
pub use desktop::{Desktop, Direction, ResizeNeighbor};
pub use distribute::{fill_space, is_feasible, SizeBounds};
pub use focus_passing::{FocusPasser, FocusPassing};
pub use grid::{ColumnRange, Grid};
pub use host::Host;
pub use layout::Layout;
pub use ordered::{ContainerError, OrderedContainer};
pub use range::{Range, Span};
pub use window::{FrameMode, Window};

/// Unique identifier for a window, chosen by the host.
pub type WindowId = u64;

/// Identifier of a desktop (virtual desktop, workspace), chosen by the host.
pub type DesktopId = u64;

static NEXT_COLUMN_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique column identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(pub(crate) u64);

impl ColumnId {
    pub(crate) fn next() -> Self {
        Self(NEXT_COLUMN_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "column#{}", self.0)
    }
}

/// A rectangle in screen coordinates (pixels).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Create a new rectangle.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Check if this rectangle intersects with another.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }

    /// Get the right edge x-coordinate.
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Get the bottom edge y-coordinate.
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        i64::from(self.width) * i64::from(self.height)
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}
