//! Integration tests for the stripwm driver.
//!
//! These run JSON-lines events through `AppState` against the simulated
//! host, the same way the `stripwm` binary does, and check the layout the
//! host ends up with.

use serde_json::{json, Value};
use stripwm_core_layout::{Rect, ScrollPolicy};
use stripwm_daemon::config::{WindowAction, WindowRule};
use stripwm_daemon::{AppState, ClientState, Config, Outcome, Timer};
use stripwm_ipc::{decode_event, encode_response, Command, DesktopInfo, HostEvent, Response, WindowPlacement};

// ============================================================================
// Helpers
// ============================================================================

fn state() -> AppState {
    state_with(Config::default())
}

fn state_with(config: Config) -> AppState {
    AppState::new(config, Rect::new(0, 0, 1920, 1080))
}

fn send(state: &mut AppState, event: Value) -> Outcome {
    state.handle_line(&event.to_string())
}

fn open(state: &mut AppState, window: u64, class: &str) {
    let outcome = send(
        state,
        json!({
            "type": "window_opened",
            "window": window,
            "desktop": 1,
            "rect": {"x": 100, "y": 100, "width": 800, "height": 600},
            "class": class,
        }),
    );
    assert_eq!(outcome.response, Response::Ok);
}

fn focus(state: &mut AppState, window: u64) {
    send(state, json!({"type": "window_focused", "window": window}));
}

fn command(state: &mut AppState, command: Value) -> Outcome {
    send(state, json!({"type": "command", "command": command}))
}

struct Snapshot {
    current_desktop: u64,
    focused: Option<u64>,
    desktops: Vec<DesktopInfo>,
    windows: Vec<WindowPlacement>,
}

fn query(state: &mut AppState) -> Snapshot {
    match command(state, json!({"type": "query_layout"})).response {
        Response::Layout {
            current_desktop,
            focused,
            desktops,
            windows,
        } => Snapshot {
            current_desktop,
            focused,
            desktops,
            windows,
        },
        other => panic!("expected a layout, got {:?}", other),
    }
}

impl Snapshot {
    fn desktop(&self, id: u64) -> &DesktopInfo {
        self.desktops.iter().find(|d| d.desktop == id).expect("desktop")
    }

    /// Window ids per column, left to right.
    fn columns(&self, desktop: u64) -> Vec<Vec<u64>> {
        self.desktop(desktop).columns.iter().map(|c| c.windows.clone()).collect()
    }

    fn window(&self, id: u64) -> &WindowPlacement {
        self.windows.iter().find(|w| w.window == id).expect("window")
    }
}

// ============================================================================
// Protocol Tests
// ============================================================================

#[test]
fn test_decode_window_opened_defaults() {
    let event = decode_event(
        r#"{"type":"window_opened","window":7,"desktop":1,"rect":{"x":0,"y":0,"width":640,"height":480}}"#,
    )
    .expect("decode");
    match event {
        HostEvent::WindowOpened {
            window,
            min_width,
            class,
            fullscreen,
            ..
        } => {
            assert_eq!(window, 7);
            assert_eq!(min_width, 0);
            assert!(class.is_empty());
            assert!(!fullscreen);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_decode_indexed_command() {
    let event = decode_event(r#"{"type":"command","command":{"type":"focus_column","index":2}}"#).expect("decode");
    assert_eq!(
        event,
        HostEvent::Command {
            command: Command::FocusColumn { index: 2 }
        }
    );
}

#[test]
fn test_encode_response_is_one_line() {
    let line = encode_response(&Response::error("boom")).expect("encode");
    assert!(line.ends_with('\n'));
    assert_eq!(line.matches('\n').count(), 1);
    let value: Value = serde_json::from_str(&line).expect("json");
    assert_eq!(value["status"], "error");
    assert_eq!(value["message"], "boom");
}

#[test]
fn test_malformed_line_is_an_error_response() {
    let mut state = state();
    let outcome = state.handle_line("{not json");
    assert!(matches!(outcome.response, Response::Error { .. }));
    assert!(!outcome.stop);
}

// ============================================================================
// Window Lifecycle
// ============================================================================

#[test]
fn test_new_windows_get_their_own_columns() {
    let mut state = state();
    open(&mut state, 1, "term");
    open(&mut state, 2, "term");
    open(&mut state, 3, "term");

    let snapshot = query(&mut state);
    assert_eq!(snapshot.columns(1), vec![vec![1], vec![2], vec![3]]);
    assert!(snapshot.desktop(1).columns.iter().all(|c| c.width == 800));
    assert_eq!(state.client_state(2), Some(ClientState::Tiled));
}

#[test]
fn test_single_window_fills_column_height() {
    let mut state = state();
    open(&mut state, 1, "term");

    let snapshot = query(&mut state);
    let rect = snapshot.window(1).rect;
    assert_eq!(rect.width, 800);
    assert_eq!(rect.y, 8);
    assert_eq!(rect.height, 1064);
    assert_eq!(snapshot.desktop(1).tiling_area, stripwm_ipc::IpcRect::new(8, 8, 1904, 1064));
}

#[test]
fn test_duplicate_window_is_rejected() {
    let mut state = state();
    open(&mut state, 1, "term");
    let outcome = send(
        &mut state,
        json!({"type": "window_opened", "window": 1, "desktop": 1,
               "rect": {"x": 0, "y": 0, "width": 400, "height": 400}}),
    );
    assert!(matches!(outcome.response, Response::Error { .. }));
}

#[test]
fn test_closing_unknown_window_is_an_error() {
    let mut state = state();
    let outcome = send(&mut state, json!({"type": "window_closed", "window": 42}));
    assert!(matches!(outcome.response, Response::Error { .. }));
}

#[test]
fn test_closing_focused_window_passes_focus() {
    let mut state = state();
    open(&mut state, 1, "term");
    open(&mut state, 2, "term");
    open(&mut state, 3, "term");
    focus(&mut state, 2);

    send(&mut state, json!({"type": "window_closed", "window": 2}));

    let snapshot = query(&mut state);
    assert_eq!(snapshot.columns(1), vec![vec![1], vec![3]]);
    let focused = snapshot.focused.expect("focus passed on");
    assert!(focused == 1 || focused == 3);
}

#[test]
fn test_closing_unfocused_window_keeps_focus() {
    let mut state = state();
    open(&mut state, 1, "term");
    open(&mut state, 2, "term");
    focus(&mut state, 1);

    send(&mut state, json!({"type": "window_closed", "window": 2}));

    let snapshot = query(&mut state);
    assert_eq!(snapshot.focused, Some(1));
    assert_eq!(snapshot.columns(1), vec![vec![1]]);
}

#[test]
fn test_minimize_and_restore() {
    let mut state = state();
    open(&mut state, 1, "term");
    open(&mut state, 2, "term");

    send(&mut state, json!({"type": "window_minimized", "window": 2}));
    assert_eq!(state.client_state(2), Some(ClientState::TiledMinimized));
    assert_eq!(query(&mut state).columns(1), vec![vec![1]]);

    send(&mut state, json!({"type": "window_unminimized", "window": 2}));
    assert_eq!(state.client_state(2), Some(ClientState::Tiled));
    assert_eq!(query(&mut state).columns(1).len(), 2);
}

#[test]
fn test_fullscreen_sized_window_floats() {
    let mut state = state();
    send(
        &mut state,
        json!({"type": "window_opened", "window": 9, "desktop": 1,
               "rect": {"x": 0, "y": 0, "width": 1920, "height": 1080}}),
    );
    assert_eq!(state.client_state(9), Some(ClientState::Floating));
    assert!(query(&mut state).desktop(1).columns.is_empty());
}

#[test]
fn test_transient_window_floats() {
    let mut state = state();
    send(
        &mut state,
        json!({"type": "window_opened", "window": 4, "desktop": 1, "kind": "transient",
               "rect": {"x": 0, "y": 0, "width": 300, "height": 200}}),
    );
    assert_eq!(state.client_state(4), Some(ClientState::Floating));
}

// ============================================================================
// Window Rules
// ============================================================================

fn rule(class: Option<&str>, title: Option<&str>, action: WindowAction) -> WindowRule {
    WindowRule {
        match_class: class.map(String::from),
        match_title: title.map(String::from),
        match_executable: None,
        action,
    }
}

#[test]
fn test_float_and_ignore_rules() {
    let mut config = Config::default();
    config.window_rules = vec![
        rule(Some("pip"), None, WindowAction::Float),
        rule(Some("splash"), None, WindowAction::Ignore),
    ];
    let mut state = state_with(config);
    open(&mut state, 1, "pip");
    open(&mut state, 2, "splash");
    open(&mut state, 3, "term");

    assert_eq!(state.client_state(1), Some(ClientState::Floating));
    assert_eq!(state.client_state(2), None);

    let snapshot = query(&mut state);
    assert_eq!(snapshot.columns(1), vec![vec![3]]);
    assert!(snapshot.windows.iter().all(|w| w.window != 2));
}

#[test]
fn test_title_change_reapplies_rules() {
    let mut config = Config::default();
    config.window_rules = vec![rule(None, Some(".*Picture-in-Picture.*"), WindowAction::Float)];
    let mut state = state_with(config);
    open(&mut state, 1, "firefox");
    assert_eq!(state.client_state(1), Some(ClientState::Tiled));

    send(
        &mut state,
        json!({"type": "window_title_changed", "window": 1, "title": "Picture-in-Picture"}),
    );
    assert_eq!(state.client_state(1), Some(ClientState::Floating));
    assert!(query(&mut state).desktop(1).columns.is_empty());

    send(&mut state, json!({"type": "window_title_changed", "window": 1, "title": "Inbox"}));
    assert_eq!(state.client_state(1), Some(ClientState::Tiled));
}

// ============================================================================
// Docks and Pins
// ============================================================================

#[test]
fn test_dock_shrinks_tiling_area() {
    let mut state = state();
    let outcome = send(
        &mut state,
        json!({"type": "window_opened", "window": 50, "desktop": 1, "kind": "dock",
               "rect": {"x": 0, "y": 0, "width": 1920, "height": 40}}),
    );
    assert_eq!(outcome.timers, vec![Timer::ScreenSettled]);
    assert_eq!(state.client_state(50), Some(ClientState::Docked));

    state.fire(Timer::ScreenSettled);
    let area = query(&mut state).desktop(1).tiling_area;
    assert_eq!(area.y, 48);
    assert_eq!(area.height, 1024);

    let outcome = send(&mut state, json!({"type": "window_closed", "window": 50}));
    assert_eq!(outcome.timers, vec![Timer::ScreenSettled]);
    state.fire(Timer::ScreenSettled);
    assert_eq!(query(&mut state).desktop(1).tiling_area.y, 8);
}

#[test]
fn test_pinned_window_leaves_the_grid() {
    let mut state = state();
    open(&mut state, 1, "term");
    open(&mut state, 2, "term");

    send(
        &mut state,
        json!({"type": "window_pinned", "window": 2,
               "rect": {"x": 0, "y": 0, "width": 600, "height": 1080}}),
    );
    assert_eq!(state.client_state(2), Some(ClientState::Pinned));

    let snapshot = query(&mut state);
    assert_eq!(snapshot.columns(1), vec![vec![1]]);
    assert_eq!(snapshot.desktop(1).tiling_area.x, 608);
    assert_eq!(snapshot.window(2).rect, stripwm_ipc::IpcRect::new(0, 0, 600, 1080));

    send(&mut state, json!({"type": "window_unpinned", "window": 2}));
    assert_eq!(state.client_state(2), Some(ClientState::Floating));
    assert_eq!(query(&mut state).desktop(1).tiling_area.x, 8);
}

// ============================================================================
// Commands
// ============================================================================

#[test]
fn test_focus_commands_move_host_focus() {
    let mut state = state();
    open(&mut state, 1, "term");
    open(&mut state, 2, "term");
    open(&mut state, 3, "term");
    focus(&mut state, 2);

    command(&mut state, json!({"type": "focus_right"}));
    assert_eq!(query(&mut state).focused, Some(3));

    command(&mut state, json!({"type": "focus_start"}));
    assert_eq!(query(&mut state).focused, Some(1));

    command(&mut state, json!({"type": "focus_column", "index": 1}));
    assert_eq!(query(&mut state).focused, Some(2));

    command(&mut state, json!({"type": "focus_left"}));
    assert_eq!(query(&mut state).focused, Some(1));

    // Nothing left of the first column.
    command(&mut state, json!({"type": "focus_left"}));
    assert_eq!(query(&mut state).focused, Some(1));
}

#[test]
fn test_commands_without_focus_are_noops() {
    let mut state = state();
    open(&mut state, 1, "term");
    let outcome = command(&mut state, json!({"type": "column_move_left"}));
    assert_eq!(outcome.response, Response::Ok);
    assert_eq!(query(&mut state).columns(1), vec![vec![1]]);
}

#[test]
fn test_column_moves() {
    let mut state = state();
    open(&mut state, 1, "term");
    open(&mut state, 2, "term");
    open(&mut state, 3, "term");
    focus(&mut state, 3);

    command(&mut state, json!({"type": "column_move_left"}));
    assert_eq!(query(&mut state).columns(1), vec![vec![1], vec![3], vec![2]]);

    command(&mut state, json!({"type": "column_move_start"}));
    assert_eq!(query(&mut state).columns(1), vec![vec![3], vec![1], vec![2]]);

    command(&mut state, json!({"type": "column_move_to_column", "index": 2}));
    assert_eq!(query(&mut state).columns(1), vec![vec![1], vec![2], vec![3]]);

    command(&mut state, json!({"type": "column_move_to_column", "index": 0}));
    assert_eq!(query(&mut state).columns(1), vec![vec![3], vec![1], vec![2]]);
}

#[test]
fn test_window_moves_between_columns() {
    let mut state = state();
    open(&mut state, 1, "term");
    open(&mut state, 2, "term");
    focus(&mut state, 2);

    // A lone window joins the column on its left.
    command(&mut state, json!({"type": "window_move_left"}));
    assert_eq!(query(&mut state).columns(1), vec![vec![1, 2]]);

    // Out again into a fresh column on the right.
    command(&mut state, json!({"type": "window_move_right"}));
    assert_eq!(query(&mut state).columns(1), vec![vec![1], vec![2]]);

    command(&mut state, json!({"type": "window_move_start"}));
    assert_eq!(query(&mut state).columns(1), vec![vec![2], vec![1]]);
}

#[test]
fn test_window_move_up_within_column() {
    let mut state = state();
    open(&mut state, 1, "term");
    open(&mut state, 2, "term");
    focus(&mut state, 2);
    command(&mut state, json!({"type": "window_move_left"}));
    assert_eq!(query(&mut state).columns(1), vec![vec![1, 2]]);

    command(&mut state, json!({"type": "window_move_up"}));
    assert_eq!(query(&mut state).columns(1), vec![vec![2, 1]]);

    command(&mut state, json!({"type": "focus_down"}));
    assert_eq!(query(&mut state).focused, Some(1));
}

#[test]
fn test_toggle_floating() {
    let mut state = state();
    open(&mut state, 1, "term");
    open(&mut state, 2, "term");
    focus(&mut state, 1);

    command(&mut state, json!({"type": "window_toggle_floating"}));
    assert_eq!(state.client_state(1), Some(ClientState::Floating));
    assert_eq!(query(&mut state).columns(1), vec![vec![2]]);

    command(&mut state, json!({"type": "window_toggle_floating"}));
    assert_eq!(state.client_state(1), Some(ClientState::Tiled));
    assert_eq!(query(&mut state).columns(1).len(), 2);
}

#[test]
fn test_cycle_preset_widths() {
    let mut state = state();
    open(&mut state, 1, "term");
    focus(&mut state, 1);

    // "50%, 100%" of a 1904px tiling area with 8px gaps.
    command(&mut state, json!({"type": "cycle_preset_widths"}));
    assert_eq!(query(&mut state).desktop(1).columns[0].width, 948);

    command(&mut state, json!({"type": "cycle_preset_widths"}));
    assert_eq!(query(&mut state).desktop(1).columns[0].width, 1904);

    command(&mut state, json!({"type": "cycle_preset_widths"}));
    assert_eq!(query(&mut state).desktop(1).columns[0].width, 948);
}

#[test]
fn test_width_increase_does_not_wrap() {
    let mut state = state();
    open(&mut state, 1, "term");
    focus(&mut state, 1);

    command(&mut state, json!({"type": "column_width_increase"}));
    command(&mut state, json!({"type": "column_width_increase"}));
    command(&mut state, json!({"type": "column_width_increase"}));
    assert_eq!(query(&mut state).desktop(1).columns[0].width, 1904);

    command(&mut state, json!({"type": "column_width_decrease"}));
    assert_eq!(query(&mut state).desktop(1).columns[0].width, 948);
}

#[test]
fn test_width_increase_fills_space_next_to_visible_neighbor() {
    let mut state = state();
    open(&mut state, 1, "term");
    open(&mut state, 2, "term");
    focus(&mut state, 1);

    // Both 800px columns are visible, leaving 1904 - 1608 = 296px unused.
    command(&mut state, json!({"type": "column_width_increase"}));

    let snapshot = query(&mut state);
    assert_eq!(snapshot.desktop(1).columns[0].width, 1096);
    let left = snapshot.window(1).rect;
    let right = snapshot.window(2).rect;
    assert_eq!(left.x, 8);
    assert_eq!(right.x, 1112);
    assert_eq!(right.x + right.width, 8 + 1904);
}

#[test]
fn test_width_decrease_reveals_offscreen_neighbor() {
    let mut state = state();
    open(&mut state, 1, "term");
    open(&mut state, 2, "term");
    open(&mut state, 3, "term");
    focus(&mut state, 3);
    focus(&mut state, 2);

    // Columns 2 and 3 fill the viewport; column 1 needs 808 - 296 = 512px.
    command(&mut state, json!({"type": "column_width_decrease"}));

    let snapshot = query(&mut state);
    assert_eq!(snapshot.desktop(1).columns[1].width, 288);
    assert_eq!(snapshot.desktop(1).scroll_x, 0);
    assert_eq!(snapshot.window(1).rect.x, 8);
    assert_eq!(snapshot.window(2).rect.x, 816);
    assert_eq!(snapshot.window(3).rect.x, 1112);
}

#[test]
fn test_centered_scrolling_resizes_through_presets_only() {
    let mut config = Config::default();
    config.scrolling.policy = ScrollPolicy::Centered;
    let mut state = state_with(config);
    open(&mut state, 1, "term");
    open(&mut state, 2, "term");
    focus(&mut state, 1);

    command(&mut state, json!({"type": "column_width_increase"}));
    assert_eq!(query(&mut state).desktop(1).columns[0].width, 948);
}

#[test]
fn test_floating_dialog_follows_tiled_parent() {
    let mut state = state();
    open(&mut state, 1, "editor");
    focus(&mut state, 1);
    let outcome = send(
        &mut state,
        json!({
            "type": "window_opened",
            "window": 2,
            "desktop": 1,
            "rect": {"x": 500, "y": 400, "width": 300, "height": 200},
            "class": "editor",
            "transient_for": 1,
        }),
    );
    assert_eq!(outcome.response, Response::Ok);
    assert_eq!(state.client_state(2), Some(ClientState::Floating));
    let before = query(&mut state).window(1).rect;

    open(&mut state, 3, "term");

    let snapshot = query(&mut state);
    let after = snapshot.window(1).rect;
    let dx = after.x - before.x;
    assert_ne!(dx, 0);
    assert_eq!(after.width, before.width);
    assert_eq!(snapshot.window(2).rect.x, 500 + dx);
    assert_eq!(snapshot.window(2).rect.y, 400);
}

#[test]
fn test_snapshot_reports_window_options() {
    let mut config = Config::default();
    config.behavior.tiled_keep_below = true;
    config.behavior.skip_switcher = true;
    let mut state = state_with(config);
    open(&mut state, 1, "term");
    focus(&mut state, 1);
    send(&mut state, json!({"type": "window_maximized_changed", "window": 1, "maximized": true}));

    let snapshot = query(&mut state);
    let window = snapshot.window(1);
    assert!(window.maximized);
    assert!(!window.fullscreen);
    assert!(window.decorations.skip_switcher);
    assert!(!window.decorations.keep_below);
    assert_eq!(window.rect.height, 1080);
}

#[test]
fn test_toggle_stacked() {
    let mut state = state();
    open(&mut state, 1, "term");
    open(&mut state, 2, "term");
    focus(&mut state, 2);
    command(&mut state, json!({"type": "window_move_left"}));

    command(&mut state, json!({"type": "column_toggle_stacked"}));
    let snapshot = query(&mut state);
    assert!(snapshot.desktop(1).columns[0].stacked);
    // Stacked windows cascade by the stack offset.
    let first = snapshot.window(1).rect;
    let second = snapshot.window(2).rect;
    assert_eq!(second.x - first.x, 32);
    assert_eq!(second.y - first.y, 32);
}

#[test]
fn test_column_move_to_desktop() {
    let mut state = state();
    open(&mut state, 1, "term");
    open(&mut state, 2, "term");
    focus(&mut state, 2);

    command(&mut state, json!({"type": "column_move_to_desktop", "desktop": 2}));

    let snapshot = query(&mut state);
    assert_eq!(snapshot.columns(1), vec![vec![1]]);
    assert_eq!(snapshot.columns(2), vec![vec![2]]);
    assert_eq!(snapshot.window(2).desktop, 2);
}

#[test]
fn test_tail_move_to_desktop() {
    let mut state = state();
    open(&mut state, 1, "term");
    open(&mut state, 2, "term");
    open(&mut state, 3, "term");
    focus(&mut state, 2);

    command(&mut state, json!({"type": "tail_move_to_desktop", "desktop": 3}));

    let snapshot = query(&mut state);
    assert_eq!(snapshot.columns(1), vec![vec![1]]);
    assert_eq!(snapshot.columns(3), vec![vec![2], vec![3]]);
}

#[test]
fn test_desktop_switch_changes_current_desktop() {
    let mut state = state();
    send(&mut state, json!({"type": "desktop_switched", "desktop": 4}));
    let snapshot = query(&mut state);
    assert_eq!(snapshot.current_desktop, 4);
    assert!(snapshot.desktops.iter().any(|d| d.desktop == 4));
}

// ============================================================================
// Interactive Resize
// ============================================================================

#[test]
fn test_user_resize_sets_column_width() {
    let mut state = state();
    open(&mut state, 1, "term");
    open(&mut state, 2, "term");
    focus(&mut state, 1);

    let x = query(&mut state).window(1).rect.x;
    send(&mut state, json!({"type": "resize_started", "window": 1, "cursor_x": x + 400}));
    send(
        &mut state,
        json!({"type": "resize_updated", "window": 1,
               "rect": {"x": x, "y": 8, "width": 900, "height": 1064}}),
    );
    let outcome = send(&mut state, json!({"type": "resize_finished", "window": 1}));
    assert_eq!(outcome.timers, vec![Timer::UserResizeSettled { desktop: 1 }]);

    state.fire(Timer::UserResizeSettled { desktop: 1 });
    let snapshot = query(&mut state);
    assert_eq!(snapshot.desktop(1).columns[0].width, 900);
    assert_eq!(snapshot.window(1).rect.width, 900);
}

#[test]
fn test_resize_finished_without_start_schedules_nothing() {
    let mut state = state();
    open(&mut state, 1, "term");
    let outcome = send(&mut state, json!({"type": "resize_finished", "window": 1}));
    assert!(outcome.timers.is_empty());
}

// ============================================================================
// Control
// ============================================================================

#[test]
fn test_stop_command() {
    let mut state = state();
    let outcome = command(&mut state, json!({"type": "stop"}));
    assert!(outcome.stop);
    assert_eq!(outcome.response, Response::Ok);
}

#[test]
fn test_reload_from_missing_file_fails() {
    let mut state = state().with_config_path(Some("/nonexistent/stripwm/config.toml".into()));
    let outcome = command(&mut state, json!({"type": "reload"}));
    assert!(matches!(outcome.response, Response::Error { .. }));
}
