//! Driver state: the layout, the simulated host, and the managed clients.
//!
//! Every host event goes through [`AppState::handle_event`], which applies
//! it, lets the layout observe any focus change, and arranges the current
//! desktop. Debounced follow-ups come back as [`Timer`]s for the event loop
//! to schedule and later hand to [`AppState::fire`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use stripwm_core_layout::{
    ColumnId, Desktop, DesktopId, Direction, FocusPassing, FrameMode, Grid, Host, Layout, Rect, Size, Window,
    WindowId,
};
use stripwm_ipc::{
    decode_event, ColumnInfo, Command, DesktopInfo, HostEvent, IpcRect, Response, WindowKind,
    WindowPlacement,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client_state::{Client, ClientState, RateLimiter, Timer};
use crate::config::{Config, WindowAction};
use crate::presets::PresetWidths;
use crate::rules::{compile_rules, match_action, title_sensitive, CompiledWindowRule, WindowProperties};
use crate::sim_host::{center_shift, SimHost};

/// Desktop the driver starts on.
pub const INITIAL_DESKTOP: DesktopId = 1;

/// How many focus hand-offs one event may trigger before the driver stops
/// following them.
const MAX_FOCUS_ROUNDS: usize = 4;

/// How many rounds of host mode changes one event may trigger.
const MAX_MODE_ROUNDS: usize = 4;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("unknown window {0}")]
    UnknownWindow(WindowId),
    #[error("window {0} already exists")]
    DuplicateWindow(WindowId),
    #[error("config reload failed: {0}")]
    Config(String),
}

/// Result of handling one event.
#[derive(Debug)]
pub struct Outcome {
    pub response: Response,
    /// Debounced work to (re)schedule.
    pub timers: Vec<Timer>,
    /// The host asked the driver to stop.
    pub stop: bool,
}

/// The window that commands act on: the focused one, if it is tiled.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Focused {
    pub window: WindowId,
    pub desktop: DesktopId,
    pub column: ColumnId,
}

pub struct AppState {
    pub(crate) layout: Layout,
    pub(crate) host: SimHost,
    pub(crate) config: Config,
    config_path: Option<PathBuf>,
    rules: Vec<CompiledWindowRule>,
    pub(crate) presets: PresetWidths,
    clients: BTreeMap<WindowId, Client>,
    /// Last window the host reported focused; closing it hands focus on.
    last_focused: Option<WindowId>,
    /// Focus as of the last time the layout was told about it.
    observed_focus: Option<WindowId>,
}

impl AppState {
    /// Create new state with config and a screen.
    pub fn new(config: Config, screen: Rect) -> Self {
        let mut layout = Layout::new(config.engine_config());
        let host = SimHost::new(screen, INITIAL_DESKTOP);
        layout.ensure_desktop(&host, INITIAL_DESKTOP);

        Self {
            layout,
            host,
            rules: compile_rules(&config.window_rules),
            presets: config.preset_widths(),
            config,
            config_path: None,
            clients: BTreeMap::new(),
            last_focused: None,
            observed_focus: None,
        }
    }

    /// Where `reload` reads from; standard locations when unset.
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn host(&self) -> &SimHost {
        &self.host
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client_state(&self, window: WindowId) -> Option<ClientState> {
        self.clients.get(&window).map(|c| c.state)
    }

    /// Parse and handle one input line.
    pub fn handle_line(&mut self, line: &str) -> Outcome {
        match decode_event(line) {
            Ok(event) => self.handle_event(event),
            Err(e) => {
                warn!("Rejected input: {}", e);
                Outcome {
                    response: Response::error(e.to_string()),
                    timers: Vec::new(),
                    stop: false,
                }
            }
        }
    }

    pub fn handle_event(&mut self, event: HostEvent) -> Outcome {
        let mut timers = Vec::new();
        let mut stop = false;
        let mut query = false;

        let result = match event {
            HostEvent::ScreenResized { area } => {
                self.host.set_screen(rect_from_ipc(area));
                timers.push(Timer::ScreenSettled);
                Ok(())
            }
            HostEvent::DesktopSwitched { desktop } => {
                self.host.switch_desktop(desktop);
                Ok(())
            }
            HostEvent::WindowOpened {
                window,
                desktop,
                rect,
                min_width,
                min_height,
                class,
                title,
                executable,
                kind,
                fullscreen,
                maximized,
                transient_for,
            } => {
                let client = Client {
                    state: ClientState::Floating,
                    kind,
                    class,
                    title,
                    executable,
                    preferred_width: rect.width,
                    min_size: Size::new(min_width, min_height),
                    fullscreen,
                    maximized,
                    skip_switcher_before: false,
                    frame_changes: RateLimiter::frame_changes(),
                };
                let rect = rect_from_ipc(rect);
                self.window_opened(window, desktop, rect, transient_for, client, &mut timers)
            }
            HostEvent::WindowClosed { window } => self.window_closed(window, &mut timers),
            HostEvent::WindowFocused { window } => {
                self.host.user_focus(window);
                Ok(())
            }
            HostEvent::WindowMinimized { window } => self.window_minimized(window, &mut timers),
            HostEvent::WindowUnminimized { window } => self.window_unminimized(window, &mut timers),
            HostEvent::WindowFrameChanged { window, rect } => {
                self.window_frame_changed(window, rect_from_ipc(rect), &mut timers)
            }
            HostEvent::WindowMinSizeChanged {
                window,
                min_width,
                min_height,
            } => self.window_min_size_changed(window, Size::new(min_width, min_height)),
            HostEvent::WindowFullscreenChanged { window, fullscreen } => self
                .client_mode(window)
                .and_then(|mode| self.window_mode_changed(window, FrameMode { fullscreen, ..mode })),
            HostEvent::WindowMaximizedChanged { window, maximized } => self
                .client_mode(window)
                .and_then(|mode| self.window_mode_changed(window, FrameMode { maximized, ..mode })),
            HostEvent::WindowTitleChanged { window, title } => {
                self.window_title_changed(window, title, &mut timers)
            }
            HostEvent::WindowPinned { window, rect } => {
                self.window_pinned(window, rect_from_ipc(rect), &mut timers)
            }
            HostEvent::WindowUnpinned { window } => self.window_unpinned(window, &mut timers),
            HostEvent::WindowDesktopChanged { window, desktop } => {
                self.window_desktop_changed(window, desktop)
            }
            HostEvent::ResizeStarted { window, cursor_x } => self.resize_started(window, cursor_x),
            HostEvent::ResizeUpdated { window, rect } => self.resize_updated(window, rect_from_ipc(rect)),
            HostEvent::ResizeFinished { window } => self.resize_finished(window, &mut timers),
            HostEvent::GestureScroll { amount } => {
                self.current_desktop_mut().gesture_scroll(amount);
                Ok(())
            }
            HostEvent::GestureFinished => {
                self.current_desktop_mut().gesture_scroll_finish();
                Ok(())
            }
            HostEvent::Command { command } => match command {
                Command::QueryLayout => {
                    query = true;
                    Ok(())
                }
                Command::Stop => {
                    info!("Stop requested");
                    stop = true;
                    Ok(())
                }
                Command::Reload => self.reload(),
                other => {
                    self.run_command(other, &mut timers);
                    Ok(())
                }
            },
        };

        self.settle();

        let response = match result {
            Ok(()) if query => self.snapshot(),
            Ok(()) => Response::Ok,
            Err(e) => {
                warn!("{}", e);
                Response::error(e.to_string())
            }
        };

        Outcome {
            response,
            timers,
            stop,
        }
    }

    /// Runs a debounced follow-up once its delay expired.
    pub fn fire(&mut self, timer: Timer) {
        debug!("timer fired: {:?}", timer);
        match timer {
            Timer::UserResizeSettled { desktop } => {
                if let Some(d) = self.layout.desktop_mut(desktop) {
                    d.user_resize_settled();
                }
                self.layout.arrange(&mut self.host, desktop);
            }
            Timer::ScreenSettled => self.layout.on_screen_resized(),
        }
        self.settle();
    }

    /// Every desktop, column, and managed window as the host sees them now.
    pub fn snapshot(&self) -> Response {
        let desktops = self
            .layout
            .desktops()
            .map(|desktop| DesktopInfo {
                desktop: desktop.id(),
                scroll_x: desktop.scroll_x(),
                tiling_area: rect_to_ipc(desktop.tiling_area()),
                columns: desktop
                    .grid()
                    .columns()
                    .map(|column| ColumnInfo {
                        width: column.width(),
                        stacked: column.is_stacked(),
                        windows: column.window_ids().collect(),
                    })
                    .collect(),
            })
            .collect();

        let windows = self
            .clients
            .iter()
            .filter_map(|(&id, client)| {
                self.host.window(id).map(|w| WindowPlacement {
                    window: id,
                    desktop: w.desktop,
                    rect: rect_to_ipc(w.rect),
                    opacity: w.opacity,
                    state: client.state.into(),
                    fullscreen: w.mode.fullscreen,
                    maximized: w.mode.maximized,
                    decorations: w.decorations,
                })
            })
            .collect();

        Response::Layout {
            current_desktop: self.host.current_desktop(),
            focused: self.host.focused_window(),
            desktops,
            windows,
        }
    }

    // Window lifecycle

    fn window_opened(
        &mut self,
        window: WindowId,
        desktop: DesktopId,
        rect: Rect,
        parent: Option<WindowId>,
        client: Client,
        timers: &mut Vec<Timer>,
    ) -> Result<(), DriverError> {
        if self.host.window(window).is_some() {
            return Err(DriverError::DuplicateWindow(window));
        }
        self.host.open_window(window, desktop, rect);
        self.host.set_mode(window, client.mode());
        self.host.set_parent(window, parent);
        self.layout.ensure_desktop(&self.host, desktop);

        if client.kind == WindowKind::Dock {
            self.clients.insert(window, client);
            self.enter_state(window, ClientState::Docked, false, timers);
            return Ok(());
        }

        let action = match_action(&self.rules, &properties(&client));
        if action == Some(WindowAction::Ignore) {
            info!("Ignoring window {} ({}) per window rule", window, client.class);
            return Ok(());
        }

        let state = if self.should_tile(window, &client, action) {
            ClientState::Tiled
        } else {
            ClientState::Floating
        };
        debug!("managing window {} as {:?}", window, state);
        self.clients.insert(window, client);
        self.enter_state(window, state, false, timers);
        Ok(())
    }

    fn window_closed(&mut self, window: WindowId, timers: &mut Vec<Timer>) -> Result<(), DriverError> {
        if self.host.window(window).is_none() {
            return Err(DriverError::UnknownWindow(window));
        }

        if let Some(client) = self.clients.remove(&window) {
            let mode = if self.last_focused == Some(window) {
                FocusPassing::Immediate
            } else {
                FocusPassing::None
            };
            timers.extend(client.state.destroy(window, &mut self.layout, &mut self.host, mode));
        }

        if self.last_focused == Some(window) {
            self.last_focused = None;
        }
        self.host.close_window(window);
        Ok(())
    }

    fn window_minimized(&mut self, window: WindowId, timers: &mut Vec<Timer>) -> Result<(), DriverError> {
        let state = self.managed_state(window)?;
        self.host.set_minimized(window, true);

        match state {
            ClientState::Tiled => {
                let mode = if self.last_focused == Some(window) {
                    FocusPassing::Immediate
                } else {
                    FocusPassing::None
                };
                self.set_state(window, ClientState::TiledMinimized, mode, false, timers);
            }
            ClientState::Pinned => self.pin_minimized(window, true),
            _ => {}
        }
        Ok(())
    }

    fn window_unminimized(&mut self, window: WindowId, timers: &mut Vec<Timer>) -> Result<(), DriverError> {
        let state = self.managed_state(window)?;
        self.host.set_minimized(window, false);

        match state {
            ClientState::TiledMinimized => {
                self.set_state(window, ClientState::Tiled, FocusPassing::None, false, timers);
            }
            ClientState::Pinned => self.pin_minimized(window, false),
            _ => {}
        }
        Ok(())
    }

    fn pin_minimized(&mut self, window: WindowId, minimized: bool) {
        if let Some(desktop) = self.host.pins.set_minimized(window, minimized) {
            self.notify_pins_changed(desktop);
        }
    }

    fn window_frame_changed(
        &mut self,
        window: WindowId,
        rect: Rect,
        timers: &mut Vec<Timer>,
    ) -> Result<(), DriverError> {
        let state = self.managed_state(window)?;
        if state.is_tiled() {
            self.set_tiled_frame(window, rect);
        } else {
            self.host.set_frame(window, rect);
        }

        match state {
            ClientState::Tiled => {
                let fullscreen_geometry = self.has_fullscreen_geometry(window);
                let Some(client) = self.clients.get_mut(&window) else {
                    return Ok(());
                };
                if client.mode().is_host_owned() || fullscreen_geometry {
                    return Ok(());
                }
                if !client.frame_changes.acquire(Instant::now()) {
                    debug!("window {} changes its frame too often, ignoring", window);
                    return Ok(());
                }
                if let Some(desktop) = self.desktop_of_tiled_mut(window) {
                    desktop.on_window_frame_resized(window, rect.width);
                }
            }
            ClientState::Floating => {
                if let Some(client) = self.clients.get_mut(&window) {
                    client.preferred_width = rect.width;
                }
            }
            ClientState::Pinned => {
                if let Some(desktop) = self.host.pins.desktop_of(window) {
                    self.host.pins.add(window, desktop, rect);
                    self.notify_pins_changed(desktop);
                }
            }
            ClientState::Docked => {
                self.host.add_dock(window, rect);
                timers.push(Timer::ScreenSettled);
            }
            ClientState::TiledMinimized => {}
        }
        Ok(())
    }

    fn window_min_size_changed(&mut self, window: WindowId, min_size: Size) -> Result<(), DriverError> {
        let client = self
            .clients
            .get_mut(&window)
            .ok_or(DriverError::UnknownWindow(window))?;
        client.min_size = min_size;

        if client.state.is_tiled() {
            if let Some(desktop) = self.desktop_of_tiled_mut(window) {
                desktop.set_window_min_size(window, min_size);
            }
        }
        Ok(())
    }

    fn client_mode(&self, window: WindowId) -> Result<FrameMode, DriverError> {
        self.clients
            .get(&window)
            .map(Client::mode)
            .ok_or(DriverError::UnknownWindow(window))
    }

    /// The host maximized, fullscreened, or restored a window. Tiled windows
    /// in a host-owned mode keep the frame the host gave them.
    fn window_mode_changed(&mut self, window: WindowId, mode: FrameMode) -> Result<(), DriverError> {
        let client = self
            .clients
            .get_mut(&window)
            .ok_or(DriverError::UnknownWindow(window))?;
        client.fullscreen = mode.fullscreen;
        client.maximized = mode.maximized;
        let tiled = client.state.is_tiled();
        self.host.set_mode(window, mode);
        if !tiled {
            return Ok(());
        }

        let Some((desktop, _)) = self.layout.find_window(window) else {
            return Ok(());
        };
        if mode.fullscreen {
            let screen = self.host.screen();
            self.host.set_frame(window, screen);
        } else if mode.maximized {
            let area = self.host.client_area(desktop);
            self.host.set_frame(window, area);
        }
        if let Some(d) = self.layout.desktop_mut(desktop) {
            d.set_window_mode(&self.host, window, mode);
        }

        let behavior = &self.config.behavior;
        if behavior.tiled_keep_below {
            self.host.set_keep_below(window, !mode.is_host_owned());
        }
        if behavior.floating_keep_above {
            self.host.set_keep_above(window, mode.is_host_owned());
        }
        Ok(())
    }

    /// Rules matching on titles are re-checked whenever the title changes.
    fn window_title_changed(
        &mut self,
        window: WindowId,
        title: String,
        timers: &mut Vec<Timer>,
    ) -> Result<(), DriverError> {
        let client = self
            .clients
            .get_mut(&window)
            .ok_or(DriverError::UnknownWindow(window))?;
        client.title = title;

        let client = client.clone();
        if !title_sensitive(&self.rules, &properties(&client)) {
            return Ok(());
        }

        let action = match_action(&self.rules, &properties(&client));
        let tile = self.should_tile(window, &client, action);
        match client.state {
            ClientState::Floating if tile => {
                self.set_state(window, ClientState::Tiled, FocusPassing::None, false, timers);
            }
            ClientState::Tiled if !tile => {
                self.set_state(window, ClientState::Floating, FocusPassing::None, true, timers);
            }
            _ => {}
        }
        Ok(())
    }

    fn window_pinned(&mut self, window: WindowId, rect: Rect, timers: &mut Vec<Timer>) -> Result<(), DriverError> {
        let state = self.managed_state(window)?;
        self.host.set_frame(window, rect);

        match state {
            ClientState::Docked => {}
            ClientState::Pinned => {
                if let Some(desktop) = self.host.pins.desktop_of(window) {
                    self.host.pins.add(window, desktop, rect);
                    self.notify_pins_changed(desktop);
                }
            }
            _ => self.set_state(window, ClientState::Pinned, FocusPassing::None, false, timers),
        }
        Ok(())
    }

    fn window_unpinned(&mut self, window: WindowId, timers: &mut Vec<Timer>) -> Result<(), DriverError> {
        if self.managed_state(window)? == ClientState::Pinned {
            self.set_state(window, ClientState::Floating, FocusPassing::None, false, timers);
        }
        Ok(())
    }

    fn window_desktop_changed(&mut self, window: WindowId, desktop: DesktopId) -> Result<(), DriverError> {
        if self.host.window(window).is_none() {
            return Err(DriverError::UnknownWindow(window));
        }
        self.layout.ensure_desktop(&self.host, desktop);

        match self.client_state(window) {
            Some(ClientState::Tiled) => {
                self.layout.move_window_to_desktop(&mut self.host, window, desktop);
            }
            Some(ClientState::Pinned) => {
                let old = self.host.pins.desktop_of(window);
                self.host.move_to_desktop(window, desktop);
                if let Some(rect) = self.host.window(window).map(|w| w.rect) {
                    self.host.pins.add(window, desktop, rect);
                }
                if let Some(old) = old {
                    self.notify_pins_changed(old);
                }
                self.notify_pins_changed(desktop);
            }
            _ => self.host.move_to_desktop(window, desktop),
        }
        Ok(())
    }

    // Interactive resize

    fn resize_started(&mut self, window: WindowId, cursor_x: i32) -> Result<(), DriverError> {
        if !self.managed_state(window)?.is_tiled() {
            return Ok(());
        }

        let frame = self.host.window(window).map(|w| w.rect).unwrap_or_default();
        let neighbor = if !self.config.behavior.resize_neighbor_column {
            None
        } else if cursor_x > frame.right() {
            Some(Direction::Right)
        } else if cursor_x < frame.x {
            Some(Direction::Left)
        } else {
            None
        };

        if let Some(desktop) = self.desktop_of_tiled_mut(window) {
            desktop.user_resize_started(window, neighbor);
        }
        Ok(())
    }

    fn resize_updated(&mut self, window: WindowId, rect: Rect) -> Result<(), DriverError> {
        let state = self.managed_state(window)?;
        let old = self.host.window(window).map(|w| w.rect).unwrap_or_default();
        if !state.is_tiled() {
            self.host.set_frame(window, rect);
            return Ok(());
        }
        self.set_tiled_frame(window, rect);

        if let Some(desktop) = self.desktop_of_tiled_mut(window) {
            if rect.width != old.width {
                desktop.user_resize_width(rect.width, rect.x != old.x);
            }
            if rect.height != old.height {
                desktop.user_resize_height(rect.height - old.height, rect.y != old.y);
            }
        }
        Ok(())
    }

    fn resize_finished(&mut self, window: WindowId, timers: &mut Vec<Timer>) -> Result<(), DriverError> {
        self.managed_state(window)?;
        if let Some((desktop, _)) = self.layout.find_window(window) {
            let resized = self
                .layout
                .desktop_mut(desktop)
                .is_some_and(|d| d.user_resize_finished());
            if resized {
                timers.push(Timer::UserResizeSettled { desktop });
            }
        }
        Ok(())
    }

    // State transitions

    /// Tears down the current state and enters `state`.
    pub(crate) fn set_state(
        &mut self,
        window: WindowId,
        state: ClientState,
        mode: FocusPassing,
        limit_height: bool,
        timers: &mut Vec<Timer>,
    ) {
        let Some(old) = self.client_state(window) else {
            return;
        };
        timers.extend(old.destroy(window, &mut self.layout, &mut self.host, mode));
        if old.is_tiled() {
            self.restore_after_tiling(window);
        }
        self.enter_state(window, state, limit_height, timers);
    }

    /// Hands back the switcher and stacking settings tiling took over.
    fn restore_after_tiling(&mut self, window: WindowId) {
        let behavior = &self.config.behavior;
        if behavior.skip_switcher {
            let before = self.clients.get(&window).is_some_and(|c| c.skip_switcher_before);
            self.host.set_skip_switcher(window, before);
        }
        if behavior.tiled_keep_below {
            self.host.set_keep_below(window, false);
        }
    }

    fn prepare_for_tiling(&mut self, window: WindowId) {
        let behavior = self.config.behavior.clone();
        let skip_switcher = self.host.window(window).is_some_and(|w| w.decorations.skip_switcher);
        let Some(client) = self.clients.get_mut(&window) else {
            return;
        };
        client.frame_changes = RateLimiter::frame_changes();

        if behavior.skip_switcher {
            client.skip_switcher_before = skip_switcher;
            self.host.set_skip_switcher(window, true);
        }

        if client.fullscreen {
            if behavior.floating_keep_above {
                self.host.set_keep_above(window, true);
            }
        } else {
            if behavior.tiled_keep_below {
                self.host.set_keep_below(window, true);
            }
            self.host.set_keep_above(window, false);
        }

        if client.maximized {
            client.maximized = false;
            let mode = client.mode();
            self.host.set_mode(window, mode);
        }
    }

    fn enter_state(&mut self, window: WindowId, state: ClientState, limit_height: bool, timers: &mut Vec<Timer>) {
        let Some(client) = self.clients.get_mut(&window) else {
            return;
        };
        client.state = state;
        let client = client.clone();
        let Some(frame) = self.host.window(window).map(|w| (w.rect, w.desktop)) else {
            return;
        };
        let (rect, desktop) = frame;
        self.host.set_follows_parent(window, state == ClientState::Floating);
        if matches!(state, ClientState::Floating | ClientState::Pinned) && self.config.behavior.floating_keep_above {
            self.host.set_keep_above(window, true);
        }

        match state {
            ClientState::Tiled => {
                self.prepare_for_tiling(window);
                let mode = FrameMode {
                    fullscreen: client.fullscreen,
                    maximized: false,
                };
                let tiled = Window::new(window, Size::new(client.preferred_width, rect.height))
                    .with_min_size(client.min_size)
                    .with_mode(mode);
                self.layout.add_window(&mut self.host, desktop, tiled);
            }
            ClientState::Floating => {
                if limit_height && self.config.behavior.floating_limit_height {
                    let area = self.host.client_area(desktop);
                    let height = rect.height.min((area.height + 1) / 2);
                    self.host
                        .place(window, Rect::new(rect.x, rect.y, client.preferred_width, height));
                }
            }
            ClientState::Pinned => {
                self.host.pins.add(window, desktop, rect);
                self.notify_pins_changed(desktop);
            }
            ClientState::Docked => {
                self.host.add_dock(window, rect);
                timers.push(Timer::ScreenSettled);
            }
            ClientState::TiledMinimized => {}
        }
    }

    /// Floating and pinned windows tile again; tiled windows float.
    pub(crate) fn toggle_floating(&mut self, window: WindowId, timers: &mut Vec<Timer>) {
        match self.client_state(window) {
            Some(ClientState::Floating | ClientState::Pinned) => {
                self.set_state(window, ClientState::Tiled, FocusPassing::None, false, timers);
            }
            Some(ClientState::Tiled) => {
                self.set_state(window, ClientState::Floating, FocusPassing::None, true, timers);
            }
            _ => {}
        }
    }

    fn should_tile(&self, window: WindowId, client: &Client, action: Option<WindowAction>) -> bool {
        match action {
            Some(WindowAction::Tile) => true,
            Some(_) => false,
            None => {
                let transient = self.host.window(window).is_some_and(|w| w.parent.is_some());
                client.kind == WindowKind::Normal
                    && !transient
                    && !client.fullscreen
                    && !self.has_fullscreen_geometry(window)
            }
        }
    }

    fn has_fullscreen_geometry(&self, window: WindowId) -> bool {
        let screen = self.host.screen();
        self.host
            .window(window)
            .is_some_and(|w| w.rect.width >= screen.width && w.rect.height >= screen.height)
    }

    // Helpers

    fn managed_state(&self, window: WindowId) -> Result<ClientState, DriverError> {
        self.client_state(window).ok_or(DriverError::UnknownWindow(window))
    }

    fn desktop_of_tiled_mut(&mut self, window: WindowId) -> Option<&mut Desktop> {
        let (desktop, _) = self.layout.find_window(window)?;
        self.layout.desktop_mut(desktop)
    }

    /// Records a host-side frame change of a tiled window; its floating
    /// dialogs move along.
    fn set_tiled_frame(&mut self, window: WindowId, rect: Rect) {
        let old = self.host.window(window).map(|w| w.rect);
        self.host.set_frame(window, rect);
        if let Some(old) = old {
            let (dx, dy) = center_shift(old, rect);
            if dx != 0 || dy != 0 {
                self.host.move_transients(window, dx, dy);
            }
        }
    }

    fn notify_pins_changed(&mut self, desktop: DesktopId) {
        if let Some(desktop) = self.layout.desktop_mut(desktop) {
            desktop.on_pins_changed();
        }
    }

    pub(crate) fn current_desktop_mut(&mut self) -> &mut Desktop {
        let current = self.host.current_desktop();
        self.layout.ensure_desktop(&self.host, current)
    }

    pub(crate) fn grid(&self, desktop: DesktopId) -> Option<&Grid> {
        self.layout.desktop(desktop).map(Desktop::grid)
    }

    /// The focused window, if the layout tiles it.
    pub(crate) fn focused_tile(&self) -> Option<Focused> {
        let window = self.host.focused_window()?;
        let (desktop, column) = self.layout.find_window(window)?;
        Some(Focused {
            window,
            desktop,
            column,
        })
    }

    /// Tells the layout about focus changes until the host settles.
    fn sync_focus(&mut self) {
        for _ in 0..MAX_FOCUS_ROUNDS {
            let focused = self.host.focused_window();
            if focused == self.observed_focus {
                return;
            }
            self.observed_focus = focused;
            if focused.is_some() {
                self.last_focused = focused;
            }
            self.layout.on_focus_changed(&mut self.host, focused);
        }
        debug!("focus still moving after {} rounds", MAX_FOCUS_ROUNDS);
    }

    /// Follows focus, arranges, then applies mode changes the arrange pass
    /// asked the host for.
    fn settle(&mut self) {
        self.sync_focus();
        self.arrange_current();

        for _ in 0..MAX_MODE_ROUNDS {
            let changes = self.host.take_mode_changes();
            if changes.is_empty() {
                return;
            }
            for (window, mode) in changes {
                if let Err(e) = self.window_mode_changed(window, mode) {
                    debug!("dropping mode change: {}", e);
                }
            }
            self.arrange_current();
        }
        debug!("window modes still changing after {} rounds", MAX_MODE_ROUNDS);
    }

    fn arrange_current(&mut self) {
        let current = self.host.current_desktop();
        self.layout.ensure_desktop(&self.host, current);
        self.layout.arrange(&mut self.host, current);
    }

    fn reload(&mut self) -> Result<(), DriverError> {
        let loaded = match &self.config_path {
            Some(path) => Config::load_from_path(path),
            None => Config::load(),
        };
        let mut config = loaded.map_err(|e| DriverError::Config(format!("{:#}", e)))?;

        for w in config.validate() {
            warn!("Config: {} - {}", w.field, w.message);
        }
        self.apply_config(config);
        info!("Configuration reloaded");
        Ok(())
    }

    pub fn apply_config(&mut self, config: Config) {
        self.layout.set_config(config.engine_config());
        self.rules = compile_rules(&config.window_rules);
        self.presets = config.preset_widths();
        self.config = config;
    }
}

fn properties(client: &Client) -> WindowProperties<'_> {
    WindowProperties {
        class: &client.class,
        title: &client.title,
        executable: &client.executable,
    }
}

pub(crate) fn rect_from_ipc(rect: IpcRect) -> Rect {
    Rect::new(rect.x, rect.y, rect.width, rect.height)
}

pub(crate) fn rect_to_ipc(rect: Rect) -> IpcRect {
    IpcRect::new(rect.x, rect.y, rect.width, rect.height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState::new(Config::default(), Rect::new(0, 0, 1920, 1080))
    }

    fn open(state: &mut AppState, window: WindowId) {
        let outcome = state.handle_event(HostEvent::WindowOpened {
            window,
            desktop: 1,
            rect: IpcRect::new(100, 100, 800, 600),
            min_width: 0,
            min_height: 0,
            class: "term".to_string(),
            title: String::new(),
            executable: String::new(),
            kind: WindowKind::Normal,
            fullscreen: false,
            maximized: false,
            transient_for: None,
        });
        assert_eq!(outcome.response, Response::Ok);
    }

    fn state_with(behavior: impl FnOnce(&mut crate::config::BehaviorConfig)) -> AppState {
        let mut config = Config::default();
        behavior(&mut config.behavior);
        AppState::new(config, Rect::new(0, 0, 1920, 1080))
    }

    fn focus(state: &mut AppState, window: WindowId) {
        state.handle_event(HostEvent::WindowFocused { window: Some(window) });
    }

    fn fullscreen(state: &mut AppState, window: WindowId, fullscreen: bool) {
        let outcome = state.handle_event(HostEvent::WindowFullscreenChanged { window, fullscreen });
        assert_eq!(outcome.response, Response::Ok);
    }

    #[test]
    fn test_refocus_restores_fullscreen_when_enabled() {
        let mut state = state_with(|b| b.re_maximize = true);
        open(&mut state, 1);
        open(&mut state, 2);
        focus(&mut state, 1);
        fullscreen(&mut state, 1, true);

        focus(&mut state, 2);
        let w1 = state.host().window(1).unwrap();
        assert!(!w1.mode.fullscreen);
        assert_eq!(w1.rect.height, 1064);

        focus(&mut state, 1);
        let w1 = state.host().window(1).unwrap();
        assert!(w1.mode.fullscreen);
        assert_eq!(w1.rect, Rect::new(0, 0, 1920, 1080));
    }

    #[test]
    fn test_refocus_stays_tiled_by_default() {
        let mut state = state();
        open(&mut state, 1);
        open(&mut state, 2);
        focus(&mut state, 1);
        fullscreen(&mut state, 1, true);
        focus(&mut state, 2);
        focus(&mut state, 1);

        let w1 = state.host().window(1).unwrap();
        assert!(!w1.mode.fullscreen);
        assert_eq!(w1.rect.height, 1064);
    }

    #[test]
    fn test_maximized_tiled_window_keeps_client_area() {
        let mut state = state();
        open(&mut state, 1);
        focus(&mut state, 1);
        state.handle_event(HostEvent::WindowMaximizedChanged {
            window: 1,
            maximized: true,
        });
        assert_eq!(state.host().window(1).map(|w| w.rect), Some(Rect::new(0, 0, 1920, 1080)));

        state.handle_event(HostEvent::WindowMaximizedChanged {
            window: 1,
            maximized: false,
        });
        let rect = state.host().window(1).map(|w| w.rect).unwrap();
        assert_eq!((rect.width, rect.height), (800, 1064));
    }

    #[test]
    fn test_tiled_windows_sit_below_and_skip_switcher() {
        let mut state = state_with(|b| {
            b.tiled_keep_below = true;
            b.skip_switcher = true;
        });
        open(&mut state, 1);
        let decorations = state.host().window(1).unwrap().decorations;
        assert!(decorations.keep_below);
        assert!(decorations.skip_switcher);
        assert!(!decorations.keep_above);

        focus(&mut state, 1);
        state.handle_event(HostEvent::Command {
            command: Command::WindowToggleFloating,
        });
        let decorations = state.host().window(1).unwrap().decorations;
        assert!(!decorations.keep_below);
        assert!(!decorations.skip_switcher);
    }

    #[test]
    fn test_floating_windows_keep_above() {
        let mut state = state_with(|b| b.floating_keep_above = true);
        open(&mut state, 1);
        assert!(!state.host().window(1).unwrap().decorations.keep_above);

        focus(&mut state, 1);
        state.handle_event(HostEvent::Command {
            command: Command::WindowToggleFloating,
        });
        assert!(state.host().window(1).unwrap().decorations.keep_above);

        state.handle_event(HostEvent::Command {
            command: Command::WindowToggleFloating,
        });
        assert!(!state.host().window(1).unwrap().decorations.keep_above);
    }

    #[test]
    fn test_fullscreen_tiled_window_rises_above() {
        let mut state = state_with(|b| {
            b.floating_keep_above = true;
            b.tiled_keep_below = true;
        });
        open(&mut state, 1);
        focus(&mut state, 1);
        fullscreen(&mut state, 1, true);
        let decorations = state.host().window(1).unwrap().decorations;
        assert!(decorations.keep_above);
        assert!(!decorations.keep_below);

        fullscreen(&mut state, 1, false);
        let decorations = state.host().window(1).unwrap().decorations;
        assert!(!decorations.keep_above);
        assert!(decorations.keep_below);
    }

    #[test]
    fn test_decorations_untouched_by_default() {
        let mut state = state();
        open(&mut state, 1);
        assert_eq!(state.host().window(1).unwrap().decorations, Default::default());
    }

    #[test]
    fn test_external_frame_changes_are_rate_limited() {
        let mut state = state();
        open(&mut state, 1);
        for width in [700, 710, 720, 730, 740] {
            state.handle_event(HostEvent::WindowFrameChanged {
                window: 1,
                rect: IpcRect::new(8, 8, width, 1064),
            });
        }
        let column = state.grid(1).unwrap().columns().next().unwrap().width();
        assert_eq!(column, 730);
    }

    #[test]
    fn test_toggle_floating_limits_height() {
        let mut state = state();
        open(&mut state, 1);
        state.handle_event(HostEvent::WindowFocused { window: Some(1) });
        assert_eq!(state.host().window(1).map(|w| w.rect.height), Some(1064));

        state.handle_event(HostEvent::Command {
            command: Command::WindowToggleFloating,
        });
        assert_eq!(state.client_state(1), Some(ClientState::Floating));
        assert_eq!(state.host().window(1).map(|w| w.rect.height), Some(540));
    }

    #[test]
    fn test_fullscreen_window_is_left_alone() {
        let mut state = state();
        open(&mut state, 1);
        state.handle_event(HostEvent::WindowFullscreenChanged {
            window: 1,
            fullscreen: true,
        });
        assert_eq!(state.host().window(1).map(|w| w.rect), Some(Rect::new(0, 0, 1920, 1080)));
        assert!(state.layout().find_window(1).is_some());
    }

    #[test]
    fn test_desktop_change_retiles_on_target() {
        let mut state = state();
        open(&mut state, 1);
        state.handle_event(HostEvent::WindowDesktopChanged { window: 1, desktop: 2 });
        assert_eq!(state.layout().find_window(1).map(|(d, _)| d), Some(2));
        assert_eq!(state.host().window(1).map(|w| w.desktop), Some(2));
    }

    #[test]
    fn test_focus_sync_remembers_last_focused() {
        let mut state = state();
        open(&mut state, 1);
        open(&mut state, 2);
        state.handle_event(HostEvent::WindowFocused { window: Some(2) });
        state.handle_event(HostEvent::WindowFocused { window: None });
        assert_eq!(state.last_focused, Some(2));
        assert_eq!(state.layout().desktop(1).and_then(|d| d.grid().last_focused_window()), Some(2));
    }

    #[test]
    fn test_unknown_window_errors() {
        let mut state = state();
        let outcome = state.handle_event(HostEvent::WindowMinimized { window: 9 });
        assert_eq!(outcome.response, Response::error("unknown window 9"));
    }
}
