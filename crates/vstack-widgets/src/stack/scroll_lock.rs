#![forbid(unsafe_code)]

//! Document scroll lock.
//!
//! Applied when the registry's scroll-lock claim set becomes non-empty and
//! undone when it empties again. While engaged the document roots carry
//! `overflow: hidden`, the scroll offset is pinned to where it was at engage
//! time, and navigation keys outside text inputs are reported for prevention.
//!
//! # Invariants
//!
//! - Release restores exactly the inline styles saved at engage time.
//! - Engage and release are idempotent.
//! - Without a document nothing is touched and the lock never engages.

use tracing::debug;
use vstack_core::event::KeyInput;
use vstack_core::geometry::Point;
use vstack_core::host::{DocumentRoot, Host};

#[derive(Debug, Default)]
pub struct ScrollLock {
    saved: Option<SavedStyles>,
}

#[derive(Debug)]
struct SavedStyles {
    html: String,
    body: String,
    position: Point,
}

impl ScrollLock {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_engaged(&self) -> bool {
        self.saved.is_some()
    }

    /// Offset the viewport is pinned to while engaged.
    pub fn position(&self) -> Option<Point> {
        self.saved.as_ref().map(|s| s.position)
    }

    pub fn engage(&mut self, host: &dyn Host) {
        if self.saved.is_some() || !host.has_document() {
            return;
        }
        let saved = SavedStyles {
            html: host.overflow(DocumentRoot::Html),
            body: host.overflow(DocumentRoot::Body),
            position: host.scroll_offset(),
        };
        for root in DocumentRoot::ALL {
            host.set_overflow(root, "hidden");
        }
        host.set_scroll_interception(true);
        debug!(x = saved.position.x, y = saved.position.y, "scroll lock engaged");
        self.saved = Some(saved);
    }

    pub fn release(&mut self, host: &dyn Host) {
        let Some(saved) = self.saved.take() else {
            return;
        };
        host.set_overflow(DocumentRoot::Html, &saved.html);
        host.set_overflow(DocumentRoot::Body, &saved.body);
        host.set_scroll_interception(false);
        debug!("scroll lock released");
    }

    /// Scroll back to the pinned offset. Returns whether anything moved.
    pub fn pin(&self, host: &dyn Host) -> bool {
        let Some(saved) = &self.saved else {
            return false;
        };
        if host.scroll_offset() == saved.position {
            return false;
        }
        host.scroll_to(saved.position);
        true
    }

    /// Whether a key press should have its default action prevented.
    pub fn should_prevent(&self, key: &KeyInput) -> bool {
        self.is_engaged()
            && !key.default_prevented
            && key.key.is_scroll_key()
            && !key.target_kind.is_text_entry()
    }
}
