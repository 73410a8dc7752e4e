//! Window rule matching.

use regex::Regex;
use tracing::warn;

use crate::config::{WindowAction, WindowRule};

/// What a rule looks at when a window opens or retitles.
#[derive(Debug, Clone, Copy)]
pub struct WindowProperties<'a> {
    pub class: &'a str,
    pub title: &'a str,
    pub executable: &'a str,
}

/// A window rule with its patterns compiled once.
#[derive(Debug, Clone)]
pub struct CompiledWindowRule {
    class: Option<Regex>,
    title: Option<Regex>,
    executable: Option<String>,
    pub action: WindowAction,
}

impl CompiledWindowRule {
    /// Compiles `rule`, or returns `None` (with a warning) if a pattern is
    /// invalid.
    pub fn compile(rule: &WindowRule) -> Option<Self> {
        Some(Self {
            class: compile_pattern(rule.match_class.as_deref(), "match_class")?,
            title: compile_pattern(rule.match_title.as_deref(), "match_title")?,
            executable: rule.match_executable.clone(),
            action: rule.action,
        })
    }

    /// All specified criteria must match. A rule without criteria matches
    /// nothing.
    pub fn matches(&self, window: &WindowProperties<'_>) -> bool {
        if self.class.is_none() && self.title.is_none() && self.executable.is_none() {
            return false;
        }

        self.class.as_ref().map_or(true, |re| re.is_match(window.class))
            && self.title.as_ref().map_or(true, |re| re.is_match(window.title))
            && self
                .executable
                .as_ref()
                .map_or(true, |exe| window.executable.eq_ignore_ascii_case(exe))
    }

    /// Whether the outcome of this rule can change with the window title.
    pub fn follows_title(&self) -> bool {
        self.title.is_some()
    }
}

/// Patterns are anchored so `"firefox"` does not match `"firefox-dev"`.
fn compile_pattern(pattern: Option<&str>, field: &str) -> Option<Option<Regex>> {
    let Some(pattern) = pattern else {
        return Some(None);
    };
    match Regex::new(&format!("^(?:{})$", pattern)) {
        Ok(re) => Some(Some(re)),
        Err(e) => {
            warn!("Invalid regex in window rule {}: {} ({})", field, pattern, e);
            None
        }
    }
}

pub fn compile_rules(rules: &[WindowRule]) -> Vec<CompiledWindowRule> {
    rules.iter().filter_map(CompiledWindowRule::compile).collect()
}

/// The action of the first matching rule.
pub fn match_action(rules: &[CompiledWindowRule], window: &WindowProperties<'_>) -> Option<WindowAction> {
    rules.iter().find(|rule| rule.matches(window)).map(|rule| rule.action)
}

/// Whether any rule could flip its decision when the title changes.
pub fn title_sensitive(rules: &[CompiledWindowRule], window: &WindowProperties<'_>) -> bool {
    rules.iter().any(|rule| {
        rule.follows_title()
            && rule.class.as_ref().map_or(true, |re| re.is_match(window.class))
    })
}
