//! Preset column widths.
//!
//! Presets come from a comma-separated list such as `"50%, 1200px, 0.75"`.
//! A `px` entry is an absolute width. A `%` entry or a bare number is a share
//! of the usable width, where sharing accounts for the gap between columns:
//! two `50%` columns plus one gap fill the screen exactly.

use stripwm_core_layout::{ColumnId, Desktop, ScrollPolicy, Span};
use thiserror::Error;
use tracing::{debug, warn};

/// A preset list entry that did not parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresetWidthError {
    #[error("invalid preset width {0:?}: expected a positive number")]
    InvalidNumber(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Preset {
    Pixels(i32),
    Ratio(f64),
}

impl Preset {
    fn width(self, max_width: i32, spacing: i32) -> i32 {
        match self {
            Preset::Pixels(width) => width,
            Preset::Ratio(ratio) => {
                (f64::from(max_width + spacing) * ratio - f64::from(spacing)).floor() as i32
            }
        }
    }
}

/// Parsed presets plus the gap they were parsed for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetWidths {
    presets: Vec<Preset>,
    spacing: i32,
}

impl PresetWidths {
    pub fn parse(list: &str, spacing: i32) -> Result<Self, PresetWidthError> {
        let presets = list
            .split(',')
            .map(|entry| parse_preset(entry.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { presets, spacing })
    }

    /// Parses `list`, logging and falling back to no presets when it is
    /// invalid.
    pub fn parse_or_empty(list: &str, spacing: i32) -> Self {
        Self::parse(list, spacing).unwrap_or_else(|e| {
            warn!("Ignoring preset widths {:?}: {}", list, e);
            Self {
                presets: Vec::new(),
                spacing,
            }
        })
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Distinct preset widths for a column bounded by `min_width` and
    /// `max_width`, ascending.
    pub fn widths(&self, min_width: i32, max_width: i32) -> Vec<i32> {
        let mut widths: Vec<i32> = self
            .presets
            .iter()
            .map(|preset| clamp(preset.width(max_width, self.spacing), min_width, max_width))
            .collect();
        widths.sort_unstable();
        widths.dedup();
        widths
    }

    /// The smallest preset wider than `current`, wrapping to the narrowest.
    pub fn next(&self, current: i32, min_width: i32, max_width: i32) -> Option<i32> {
        let widths = self.widths(min_width, max_width);
        widths
            .iter()
            .copied()
            .find(|&width| width > current)
            .or_else(|| widths.first().copied())
    }

    /// The largest preset narrower than `current`, wrapping to the widest.
    pub fn prev(&self, current: i32, min_width: i32, max_width: i32) -> Option<i32> {
        let widths = self.widths(min_width, max_width);
        widths
            .iter()
            .rev()
            .copied()
            .find(|&width| width < current)
            .or_else(|| widths.last().copied())
    }
}

/// How `column_width_increase`/`column_width_decrease` pick the next width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnResizer {
    /// Steps through the presets only.
    Raw,
    /// Also offers the widths that fill the space left by the visible
    /// columns, then recenters the visible group.
    Contextual,
}

impl ColumnResizer {
    /// Centered scrolling keeps the focused column in the middle, so there is
    /// no visible group to fit. Every other policy resizes contextually.
    pub fn for_policy(policy: ScrollPolicy) -> Self {
        match policy {
            ScrollPolicy::Centered => ColumnResizer::Raw,
            ScrollPolicy::Lazy | ScrollPolicy::Grouped => ColumnResizer::Contextual,
        }
    }

    pub fn recenters(self) -> bool {
        self == ColumnResizer::Contextual
    }

    /// The closest candidate width above the column's current width.
    pub fn increase(self, presets: &PresetWidths, desktop: &Desktop, column: ColumnId) -> Option<i32> {
        let col = desktop.grid().column(column)?;
        let width = col.width();
        let min_width = col.min_width();
        let max_width = desktop.tiling_area().width;
        let mut candidates = presets.widths(min_width, max_width);

        if self == ColumnResizer::Contextual {
            let visible = desktop.visible_range();
            if !visible.contains(col) || width >= max_width {
                return None;
            }
            let grid = desktop.grid();
            let (Some(left), Some(right)) = (
                grid.leftmost_visible_column(visible).and_then(|id| grid.column(id)),
                grid.rightmost_visible_column(visible).and_then(|id| grid.column(id)),
            ) else {
                debug!("column {:?} is visible but no visible columns were found", column);
                return None;
            };

            let gap = desktop.config().gap_horizontal;
            let free = (left.left() - visible.left()) + (visible.right() - right.right());
            candidates.extend([
                width + free,
                width + free + left.width() + gap,
                width + free + right.width() + gap,
            ]);
        }

        min_positive(&candidates, |candidate| candidate - width)
    }

    /// The closest candidate width below the column's current width.
    pub fn decrease(self, presets: &PresetWidths, desktop: &Desktop, column: ColumnId) -> Option<i32> {
        let col = desktop.grid().column(column)?;
        let width = col.width();
        let min_width = col.min_width();
        let max_width = desktop.tiling_area().width;
        let mut candidates = presets.widths(min_width, max_width);

        if self == ColumnResizer::Contextual {
            let visible = desktop.visible_range();
            if !visible.contains(col) || width <= min_width {
                return None;
            }
            let grid = desktop.grid();
            let (Some(left), Some(right)) = (
                grid.leftmost_visible_column(visible).and_then(|id| grid.column(id)),
                grid.rightmost_visible_column(visible).and_then(|id| grid.column(id)),
            ) else {
                debug!("column {:?} is visible but no visible columns were found", column);
                return None;
            };

            let gap = desktop.config().gap_horizontal;
            let unused = visible.width - (right.right() - left.left());
            // Shrinking by this much pulls the off-screen neighbor fully in.
            let reveal = |neighbor: Option<ColumnId>| {
                neighbor
                    .filter(|&id| id != column)
                    .and_then(|id| grid.column(id))
                    .map_or(0, |c| c.width() + gap - unused)
            };
            candidates.extend([
                width - reveal(grid.left_column(left.id())),
                width - reveal(grid.right_column(right.id())),
            ]);
        }

        min_positive(&candidates, |candidate| width - candidate)
    }
}

/// The candidate with the smallest positive score.
fn min_positive(candidates: &[i32], score: impl Fn(i32) -> i32) -> Option<i32> {
    candidates
        .iter()
        .copied()
        .filter(|&candidate| score(candidate) > 0)
        .min_by_key(|&candidate| score(candidate))
}

fn parse_preset(entry: &str) -> Result<Preset, PresetWidthError> {
    if let Some(number) = entry.strip_suffix("px") {
        return parse_positive(number.trim()).map(|px| Preset::Pixels(px.round() as i32));
    }
    if let Some(number) = entry.strip_suffix('%') {
        return parse_positive(number.trim()).map(|pct| Preset::Ratio(pct / 100.0));
    }
    parse_positive(entry).map(Preset::Ratio)
}

fn parse_positive(number: &str) -> Result<f64, PresetWidthError> {
    match number.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(PresetWidthError::InvalidNumber(number.to_string())),
    }
}

/// Lower bound wins when the bounds cross.
fn clamp(value: i32, min: i32, max: i32) -> i32 {
    value.min(max).max(min)
}
