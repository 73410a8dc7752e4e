//! Configuration management for the stripwm driver.
//!
//! Configuration is loaded from TOML files in the following locations (in order):
//! 1. the platform config directory (`$XDG_CONFIG_HOME/stripwm/config.toml` on Linux)
//! 2. `~/.config/stripwm/config.toml`
//! 3. `./config.toml` (current directory, for development)

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use stripwm_core_layout::{ClampPolicy, LayoutConfig as EngineConfig, Margins, ScrollPolicy};

use crate::presets::PresetWidths;

/// Main configuration structure for stripwm.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gaps, margins and column appearance.
    pub layout: LayoutConfig,
    /// How the viewport moves.
    pub scrolling: ScrollingConfig,
    /// Behavior configuration.
    pub behavior: BehaviorConfig,
    /// Window rules for per-window behavior.
    #[serde(default)]
    pub window_rules: Vec<WindowRule>,
}

/// Layout-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Gap between columns in pixels.
    #[serde(default = "default_gap")]
    pub gap_horizontal: i32,

    /// Gap between windows of a column in pixels.
    #[serde(default = "default_gap")]
    pub gap_vertical: i32,

    #[serde(default = "default_gap")]
    pub outer_gap_top: i32,
    #[serde(default = "default_gap")]
    pub outer_gap_bottom: i32,
    #[serde(default = "default_gap")]
    pub outer_gap_left: i32,
    #[serde(default = "default_gap")]
    pub outer_gap_right: i32,

    /// Cascade offset of windows in stacked columns.
    #[serde(default = "default_stack_offset")]
    pub stack_offset_x: i32,
    #[serde(default = "default_stack_offset")]
    pub stack_offset_y: i32,

    /// Whether new columns start stacked.
    #[serde(default = "default_false")]
    pub stack_columns_by_default: bool,

    /// Opacity of windows scrolled out of view, 0.0 to 1.0.
    #[serde(default = "default_off_screen_opacity")]
    pub off_screen_opacity: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            gap_horizontal: default_gap(),
            gap_vertical: default_gap(),
            outer_gap_top: default_gap(),
            outer_gap_bottom: default_gap(),
            outer_gap_left: default_gap(),
            outer_gap_right: default_gap(),
            stack_offset_x: default_stack_offset(),
            stack_offset_y: default_stack_offset(),
            stack_columns_by_default: false,
            off_screen_opacity: default_off_screen_opacity(),
        }
    }
}

/// Scrolling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollingConfig {
    /// How the viewport follows focus.
    #[serde(default)]
    pub policy: ScrollPolicy,

    /// Bounds of the scroll position; derived from `policy` when unset.
    #[serde(default)]
    pub clamp: Option<ClampPolicy>,

    /// Pixels scrolled by `grid_scroll_left`/`grid_scroll_right`.
    #[serde(default = "default_manual_scroll_step")]
    pub manual_scroll_step: i32,

    /// Whether touchpad gestures scroll the viewport.
    #[serde(default = "default_true")]
    pub gesture_scroll: bool,

    #[serde(default = "default_false")]
    pub gesture_scroll_invert: bool,

    /// Pixels per unit of normalized gesture delta.
    #[serde(default = "default_gesture_scroll_step")]
    pub gesture_scroll_step: f64,
}

impl Default for ScrollingConfig {
    fn default() -> Self {
        Self {
            policy: ScrollPolicy::default(),
            clamp: None,
            manual_scroll_step: default_manual_scroll_step(),
            gesture_scroll: true,
            gesture_scroll_invert: false,
            gesture_scroll_step: default_gesture_scroll_step(),
        }
    }
}

/// Behavior-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Comma-separated preset widths, e.g. `"50%, 1200px, 0.75"`.
    #[serde(default = "default_preset_widths")]
    pub preset_widths: String,

    /// Whether resizing a column gives or takes width from the neighbor
    /// on the dragged side.
    #[serde(default = "default_true")]
    pub resize_neighbor_column: bool,

    /// Whether windows floated by a rule or toggle are capped at half the
    /// screen height.
    #[serde(default = "default_true")]
    pub floating_limit_height: bool,

    /// Whether a tiled window that was maximized or fullscreen while it had
    /// focus gets that mode back when it is focused again.
    #[serde(default = "default_false")]
    pub re_maximize: bool,

    /// Keep tiled windows below other windows.
    #[serde(default = "default_false")]
    pub tiled_keep_below: bool,

    /// Keep floating, pinned, and fullscreen tiled windows above other
    /// windows.
    #[serde(default = "default_false")]
    pub floating_keep_above: bool,

    /// Hide tiled windows from the window switcher.
    #[serde(default = "default_false")]
    pub skip_switcher: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            preset_widths: default_preset_widths(),
            resize_neighbor_column: true,
            floating_limit_height: true,
            re_maximize: false,
            tiled_keep_below: false,
            floating_keep_above: false,
            skip_switcher: false,
        }
    }
}

// Default value functions for serde
fn default_gap() -> i32 {
    8
}

fn default_stack_offset() -> i32 {
    32
}

fn default_off_screen_opacity() -> f64 {
    1.0
}

fn default_manual_scroll_step() -> i32 {
    200
}

fn default_gesture_scroll_step() -> f64 {
    1920.0
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_preset_widths() -> String {
    "50%, 100%".to_string()
}

// ============================================================================
// Window Rules
// ============================================================================

/// A rule for per-window behavior.
///
/// Window rules are evaluated in order; the first matching rule wins.
///
/// # Example Config
///
/// ```toml
/// [[window_rules]]
/// match_class = "firefox"
/// match_title = ".*Picture-in-Picture.*"
/// action = "float"
///
/// [[window_rules]]
/// match_executable = "pavucontrol"
/// action = "float"
///
/// [[window_rules]]
/// match_class = "xwaylandvideobridge"
/// action = "ignore"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowRule {
    /// Regex pattern to match the window class.
    #[serde(default)]
    pub match_class: Option<String>,

    /// Regex pattern to match the window title.
    #[serde(default)]
    pub match_title: Option<String>,

    /// Executable name to match (case-insensitive).
    #[serde(default)]
    pub match_executable: Option<String>,

    /// Action to take when the rule matches.
    #[serde(default)]
    pub action: WindowAction,
}

/// Action to take for a matching window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAction {
    /// Tile the window normally (default behavior).
    #[default]
    Tile,
    /// Float the window outside the tiling layout.
    Float,
    /// Ignore the window (don't manage it at all).
    Ignore,
}

/// A config value that was out of range and got corrected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
}

impl ConfigWarning {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl Config {
    /// Load configuration from standard locations.
    ///
    /// Returns default config if no file is found.
    pub fn load() -> Result<Self> {
        let paths = config_paths();

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Clamp out-of-range values in place, reporting each correction.
    pub fn validate(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let layout = &mut self.layout;
        for (field, value) in [
            ("layout.gap_horizontal", &mut layout.gap_horizontal),
            ("layout.gap_vertical", &mut layout.gap_vertical),
            ("layout.outer_gap_top", &mut layout.outer_gap_top),
            ("layout.outer_gap_bottom", &mut layout.outer_gap_bottom),
            ("layout.outer_gap_left", &mut layout.outer_gap_left),
            ("layout.outer_gap_right", &mut layout.outer_gap_right),
            ("layout.stack_offset_x", &mut layout.stack_offset_x),
            ("layout.stack_offset_y", &mut layout.stack_offset_y),
        ] {
            if *value < 0 {
                warnings.push(ConfigWarning::new(field, format!("{} is negative, using 0", value)));
                *value = 0;
            }
        }

        let opacity = layout.off_screen_opacity;
        if !(0.0..=1.0).contains(&opacity) {
            let fixed = if opacity.is_nan() { 1.0 } else { opacity.clamp(0.0, 1.0) };
            warnings.push(ConfigWarning::new(
                "layout.off_screen_opacity",
                format!("{} is outside 0.0..=1.0, using {}", opacity, fixed),
            ));
            layout.off_screen_opacity = fixed;
        }

        if self.scrolling.manual_scroll_step <= 0 {
            warnings.push(ConfigWarning::new(
                "scrolling.manual_scroll_step",
                format!("{} is not positive, using {}", self.scrolling.manual_scroll_step, default_manual_scroll_step()),
            ));
            self.scrolling.manual_scroll_step = default_manual_scroll_step();
        }

        let step = self.scrolling.gesture_scroll_step;
        if !step.is_finite() || step <= 0.0 {
            warnings.push(ConfigWarning::new(
                "scrolling.gesture_scroll_step",
                format!("{} is not positive, using {}", step, default_gesture_scroll_step()),
            ));
            self.scrolling.gesture_scroll_step = default_gesture_scroll_step();
        }

        if !matches!(
            self.behavior.log_level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            warnings.push(ConfigWarning::new(
                "behavior.log_level",
                format!("unknown level {:?}, using info", self.behavior.log_level),
            ));
            self.behavior.log_level = default_log_level();
        }

        if let Err(e) = PresetWidths::parse(&self.behavior.preset_widths, self.layout.gap_horizontal) {
            warnings.push(ConfigWarning::new(
                "behavior.preset_widths",
                format!("{}; preset widths disabled", e),
            ));
        }

        for (index, rule) in self.window_rules.iter().enumerate() {
            for (name, pattern) in [("match_class", &rule.match_class), ("match_title", &rule.match_title)] {
                if let Some(pattern) = pattern {
                    if let Err(e) = regex::Regex::new(pattern) {
                        warnings.push(ConfigWarning::new(
                            &format!("window_rules[{}].{}", index, name),
                            format!("invalid regex, rule skipped: {}", e),
                        ));
                    }
                }
            }
        }

        warnings
    }

    /// The subset of settings the layout engine reads.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            margins: Margins {
                top: self.layout.outer_gap_top,
                bottom: self.layout.outer_gap_bottom,
                left: self.layout.outer_gap_left,
                right: self.layout.outer_gap_right,
            },
            gap_horizontal: self.layout.gap_horizontal,
            gap_vertical: self.layout.gap_vertical,
            stack_offset_x: self.layout.stack_offset_x,
            stack_offset_y: self.layout.stack_offset_y,
            stack_columns_by_default: self.layout.stack_columns_by_default,
            off_screen_opacity: self.layout.off_screen_opacity,
            scroll_policy: self.scrolling.policy,
            clamp_policy: self.scrolling.clamp,
            gesture_scroll: self.scrolling.gesture_scroll,
            gesture_scroll_invert: self.scrolling.gesture_scroll_invert,
            gesture_scroll_step: self.scrolling.gesture_scroll_step,
            re_maximize: self.behavior.re_maximize,
        }
    }

    pub fn preset_widths(&self) -> PresetWidths {
        PresetWidths::parse_or_empty(&self.behavior.preset_widths, self.layout.gap_horizontal)
    }
}

/// Get all possible config file paths in priority order.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(proj_dirs) = ProjectDirs::from("com", "stripwm", "stripwm") {
        paths.push(proj_dirs.config_dir().join("config.toml"));
    }

    if let Some(home) = dirs_home() {
        paths.push(home.join(".config").join("stripwm").join("config.toml"));
    }

    paths.push(PathBuf::from("config.toml"));

    paths
}

/// Get the user's home directory.
fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}
