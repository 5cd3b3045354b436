#![forbid(unsafe_code)]

//! Focus containment for the front-most trapping overlay.
//!
//! While at least one overlay holds a focus-trap claim, the host forwards
//! every focus-in to the context, and the context hands it to the front-most
//! overlay if that overlay is trapping. Focus that lands outside the
//! overlay's content is pulled back to the content's first focusable
//! descendant.
//!
//! Each trapping overlay also remembers which element had focus when it
//! claimed the trap and hands focus back through [`restore_focus`] when it
//! closes or is destroyed.

use tracing::debug;
use vstack_core::event::ElementId;
use vstack_core::host::Host;

/// Page-wide listener state.
#[derive(Debug, Default)]
pub struct FocusTrap {
    listening: bool,
}

impl FocusTrap {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn engage(&mut self, host: &dyn Host) {
        if self.listening || !host.has_document() {
            return;
        }
        host.set_focus_interception(true);
        self.listening = true;
        debug!("focus trap listening");
    }

    pub fn release(&mut self, host: &dyn Host) {
        if !self.listening {
            return;
        }
        host.set_focus_interception(false);
        self.listening = false;
        debug!("focus trap stopped");
    }
}

/// Pull focus back inside `content` if `target` escaped it.
///
/// Returns the element that received focus, if focus was moved.
pub fn contain_focus(host: &dyn Host, content: ElementId, target: ElementId) -> Option<ElementId> {
    if host.contains(content, target) {
        return None;
    }
    let first = host.first_focusable(content)?;
    match host.focus(first) {
        Ok(()) => Some(first),
        Err(err) => {
            debug!(%err, "focus trap could not refocus content");
            None
        }
    }
}

/// Give focus back to the element that had it before the trap engaged.
pub fn restore_focus(host: &dyn Host, previous: Option<ElementId>) {
    let Some(previous) = previous else {
        return;
    };
    if let Err(err) = host.focus(previous) {
        debug!(%err, "focus restore skipped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vstack_core::geometry::{Rect, Size};
    use vstack_core::testing::MemoryHost;

    fn host_with_content() -> (MemoryHost, ElementId, ElementId, ElementId) {
        let host = MemoryHost::new(Size::new(800.0, 600.0));
        let outside = host.add_element(host.body(), Rect::new(0.0, 0.0, 10.0, 10.0));
        host.set_focusable(outside, true);
        let content = host.add_element(host.body(), Rect::new(100.0, 100.0, 200.0, 100.0));
        let button = host.add_element(content, Rect::new(110.0, 110.0, 40.0, 20.0));
        host.set_focusable(button, true);
        (host, outside, content, button)
    }

    #[test]
    fn focus_outside_moves_to_first_focusable() {
        let (host, outside, content, button) = host_with_content();
        assert_eq!(contain_focus(&host, content, outside), Some(button));
        assert_eq!(host.focused(), Some(button));
    }

    #[test]
    fn focus_inside_is_left_alone() {
        let (host, _, content, button) = host_with_content();
        assert_eq!(contain_focus(&host, content, button), None);
        assert_eq!(contain_focus(&host, content, content), None);
    }

    #[test]
    fn content_without_focusables_does_nothing() {
        let (host, outside, _, _) = host_with_content();
        let empty = host.add_element(host.body(), Rect::new(0.0, 0.0, 5.0, 5.0));
        assert_eq!(contain_focus(&host, empty, outside), None);
    }

    #[test]
    fn restore_skips_detached_element() {
        let (host, outside, _, button) = host_with_content();
        host.focus(button).unwrap();
        host.detach(outside);
        restore_focus(&host, Some(outside));
        assert_eq!(host.focused(), Some(button));
    }

    #[test]
    fn engage_toggles_interception_once() {
        let (host, ..) = host_with_content();
        let mut trap = FocusTrap::new();
        trap.engage(&host);
        trap.engage(&host);
        assert!(host.focus_intercepted());
        trap.release(&host);
        assert!(!host.focus_intercepted());
        assert!(!trap.is_listening());
    }
}
