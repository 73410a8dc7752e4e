//! Deferred focus hand-off.
//!
//! Removing a window often needs to give focus to a replacement while the host
//! is still in the middle of the event that triggered the removal. Focusing
//! right away would race with the host's own focus change, so the intent is
//! filed here and honored once the host reports that nothing is focused.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::host::Host;
use crate::WindowId;

/// How a removal hands focus to the replacement window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusPassing {
    /// Leave focus alone.
    #[default]
    None,
    /// Focus the replacement synchronously.
    Immediate,
    /// Focus the replacement when the host next reports an empty focus.
    OnUnfocus,
}

/// How long a request stays valid.
pub const REQUEST_VALIDITY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Request {
    target: WindowId,
    time: Instant,
}

impl Request {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.time) > REQUEST_VALIDITY
    }
}

/// Holds at most one pending focus request.
#[derive(Debug, Default)]
pub struct FocusPasser {
    current: Option<Request>,
}

impl FocusPasser {
    pub fn new() -> Self {
        Self::default()
    }

    /// The window waiting to be focused, if any.
    pub fn pending(&self) -> Option<WindowId> {
        self.current.map(|r| r.target)
    }

    pub fn request(&mut self, target: WindowId) {
        self.request_at(target, Instant::now());
    }

    /// Files a request, replacing any earlier one.
    pub fn request_at(&mut self, target: WindowId, now: Instant) {
        trace!("focus request for window {target}");
        self.current = Some(Request { target, time: now });
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Drops the request once something other than its target got focus.
    pub fn clear_if_different(&mut self, observed: WindowId) {
        if self.current.is_some_and(|r| r.target != observed) {
            self.clear();
        }
    }

    /// Asks the host to focus `target` now and keeps a request around in case
    /// it didn't take.
    pub fn focus(&mut self, host: &mut dyn Host, target: WindowId) {
        host.set_focused(target);
        if !host.is_focused(target) {
            self.request(target);
        }
    }

    /// Hands focus to `target` the way `mode` says.
    pub fn pass(&mut self, host: &mut dyn Host, mode: FocusPassing, target: WindowId) {
        match mode {
            FocusPassing::None => {}
            FocusPassing::Immediate => self.focus(host, target),
            FocusPassing::OnUnfocus => self.request(target),
        }
    }

    pub fn activate(&mut self, host: &mut dyn Host) {
        self.activate_at(host, Instant::now());
    }

    /// Called when the host reports that nothing is focused.
    pub fn activate_at(&mut self, host: &mut dyn Host, now: Instant) {
        let Some(request) = self.current.take() else {
            return;
        };

        if request.is_expired(now) {
            trace!("focus request for window {} expired", request.target);
            return;
        }

        if host.focused_window().is_some_and(|focused| focused != request.target) {
            return;
        }

        host.set_focused(request.target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::RecordingHost;

    #[test]
    fn test_activate_focuses_pending_target() {
        let mut host = RecordingHost::new(1000, 800);
        let mut passer = FocusPasser::new();
        let now = Instant::now();

        passer.request_at(7, now);
        passer.activate_at(&mut host, now + Duration::from_millis(50));

        assert_eq!(host.focused, Some(7));
        assert_eq!(passer.pending(), None);
    }

    #[test]
    fn test_expired_request_is_not_honored() {
        let mut host = RecordingHost::new(1000, 800);
        let mut passer = FocusPasser::new();
        let now = Instant::now();

        passer.request_at(7, now);
        passer.activate_at(&mut host, now + Duration::from_millis(201));

        assert_eq!(host.focused, None);
        assert_eq!(passer.pending(), None);
    }

    #[test]
    fn test_other_focused_window_cancels() {
        let mut host = RecordingHost::new(1000, 800);
        host.focused = Some(3);
        let mut passer = FocusPasser::new();
        let now = Instant::now();

        passer.request_at(7, now);
        passer.activate_at(&mut host, now);

        assert_eq!(host.focused, Some(3));
        assert_eq!(passer.pending(), None);
    }

    #[test]
    fn test_clear_if_different() {
        let mut passer = FocusPasser::new();
        passer.request(7);

        passer.clear_if_different(7);
        assert_eq!(passer.pending(), Some(7));

        passer.clear_if_different(8);
        assert_eq!(passer.pending(), None);
    }

    #[test]
    fn test_refused_focus_files_request() {
        let mut host = RecordingHost::new(1000, 800);
        host.unfocusable.push(7);
        let mut passer = FocusPasser::new();

        passer.focus(&mut host, 5);
        assert_eq!(host.focused, Some(5));
        assert_eq!(passer.pending(), None);

        passer.focus(&mut host, 7);
        assert_eq!(host.focused, Some(5));
        assert_eq!(passer.pending(), Some(7));
    }

    #[test]
    fn test_pass_modes() {
        let mut host = RecordingHost::new(1000, 800);
        let mut passer = FocusPasser::new();

        passer.pass(&mut host, FocusPassing::None, 1);
        assert_eq!((host.focused, passer.pending()), (None, None));

        passer.pass(&mut host, FocusPassing::OnUnfocus, 1);
        assert_eq!((host.focused, passer.pending()), (None, Some(1)));

        passer.pass(&mut host, FocusPassing::Immediate, 2);
        assert_eq!(host.focused, Some(2));
    }

    #[test]
    fn test_request_overwrites() {
        let mut passer = FocusPasser::new();
        passer.request(1);
        passer.request(2);
        assert_eq!(passer.pending(), Some(2));
    }
}
