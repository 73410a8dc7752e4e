//! Layout-relevant settings.
//!
//! The boundary parses and validates these; by the time they reach the engine
//! they are assumed sane.

use serde::{Deserialize, Serialize};

/// How the viewport follows the focused column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollPolicy {
    /// Scroll just enough to bring the column into view.
    #[default]
    Lazy,
    /// Center the focused column.
    Centered,
    /// Center the focused column together with neighbors that fit.
    Grouped,
}

/// Bounds applied to the scroll position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampPolicy {
    /// Keep the viewport within the strip's edges.
    Edge,
    /// Allow scrolling until the outer columns' centers reach the viewport edge.
    Center,
}

/// Outer margins around the tiling area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: i32,
    pub bottom: i32,
    pub left: i32,
    pub right: i32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: default_gap(),
            bottom: default_gap(),
            left: default_gap(),
            right: default_gap(),
        }
    }
}

/// Everything the engine reads from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Margins between the client area and the tiling area.
    pub margins: Margins,

    /// Gap between columns in pixels.
    #[serde(default = "default_gap")]
    pub gap_horizontal: i32,

    /// Gap between windows of a column in pixels.
    #[serde(default = "default_gap")]
    pub gap_vertical: i32,

    /// Cascade offset of stacked windows.
    #[serde(default = "default_stack_offset")]
    pub stack_offset_x: i32,
    #[serde(default = "default_stack_offset")]
    pub stack_offset_y: i32,

    /// Whether new columns start stacked.
    pub stack_columns_by_default: bool,

    /// Opacity of windows in columns outside the viewport. `1.0` disables it.
    #[serde(default = "default_off_screen_opacity")]
    pub off_screen_opacity: f64,

    pub scroll_policy: ScrollPolicy,

    /// Explicit clamp policy; derived from the scroll policy when unset.
    pub clamp_policy: Option<ClampPolicy>,

    pub gesture_scroll: bool,
    pub gesture_scroll_invert: bool,

    /// Pixels scrolled per unit of normalized gesture delta.
    #[serde(default = "default_gesture_scroll_step")]
    pub gesture_scroll_step: f64,

    /// Give a window back the maximized or fullscreen mode it had while
    /// focused when it regains focus.
    pub re_maximize: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margins: Margins::default(),
            gap_horizontal: default_gap(),
            gap_vertical: default_gap(),
            stack_offset_x: default_stack_offset(),
            stack_offset_y: default_stack_offset(),
            stack_columns_by_default: false,
            off_screen_opacity: default_off_screen_opacity(),
            scroll_policy: ScrollPolicy::default(),
            clamp_policy: None,
            gesture_scroll: true,
            gesture_scroll_invert: false,
            gesture_scroll_step: default_gesture_scroll_step(),
            re_maximize: false,
        }
    }
}

impl LayoutConfig {
    /// Lazy scrolling pairs with edge clamping, the centering policies with
    /// center clamping.
    pub fn effective_clamp_policy(&self) -> ClampPolicy {
        self.clamp_policy.unwrap_or(match self.scroll_policy {
            ScrollPolicy::Lazy => ClampPolicy::Edge,
            ScrollPolicy::Centered | ScrollPolicy::Grouped => ClampPolicy::Center,
        })
    }
}

fn default_gap() -> i32 {
    8
}

fn default_stack_offset() -> i32 {
    32
}

fn default_off_screen_opacity() -> f64 {
    1.0
}

fn default_gesture_scroll_step() -> f64 {
    1920.0
}
