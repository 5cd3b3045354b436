#![forbid(unsafe_code)]

//! The document boundary.
//!
//! [`Host`] is the only way the engine reads or mutates the page. Every
//! method takes `&self`: hosts wrap an interior-mutable document (a browser
//! binding, or [`MemoryHost`](crate::testing::MemoryHost) in tests) and the
//! engine never holds a borrow across a call.
//!
//! # Invariants
//!
//! - When [`Host::has_document`] is `false`, the engine calls no other
//!   mutating method. Queries may still be made and must return empty
//!   answers.
//! - Rect queries are viewport-relative, like `getBoundingClientRect`.
//!
//! # Failure Modes
//!
//! - Queries on detached elements return `None` / `false`.
//! - Mutations on detached elements return [`HostError::ElementDetached`];
//!   the engine logs and ignores these during cleanup.

use crate::error::HostError;
use crate::event::ElementId;
use crate::geometry::{Point, Rect, Size};

/// The two document roots whose overflow style the scroll lock manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentRoot {
    /// `document.documentElement`
    Html,
    /// `document.body`
    Body,
}

impl DocumentRoot {
    pub const ALL: [Self; 2] = [Self::Html, Self::Body];
}

/// Document queries and mutations needed by the overlay engine.
pub trait Host {
    /// Whether a document exists at all (false during server rendering).
    fn has_document(&self) -> bool;

    // --- Viewport ---

    /// Inner size of the window.
    fn viewport(&self) -> Size;

    /// Current scroll offset of the scrolling element.
    fn scroll_offset(&self) -> Point;

    /// Scroll the document to `offset`.
    fn scroll_to(&self, offset: Point);

    // --- Geometry ---

    /// Viewport-relative bounding box of an element.
    fn bounding_rect(&self, el: ElementId) -> Option<Rect>;

    /// Size of an element with its explicit width/height/max constraints
    /// temporarily removed.
    fn natural_size(&self, el: ElementId) -> Option<Size>;

    /// Whether `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: ElementId, node: ElementId) -> bool;

    // --- Styles ---

    /// Inline `overflow` style of a document root (empty when unset).
    fn overflow(&self, root: DocumentRoot) -> String;

    /// Overwrite the inline `overflow` style of a document root.
    fn set_overflow(&self, root: DocumentRoot, value: &str);

    // --- Tree ---

    /// The element marked as overlay container, if the page has one.
    fn overlay_container(&self) -> Option<ElementId>;

    /// Re-parent `el` as the first child of `container`.
    fn move_to_container(&self, el: ElementId, container: ElementId) -> Result<(), HostError>;

    /// Detach `el` from its parent.
    fn remove(&self, el: ElementId) -> Result<(), HostError>;

    // --- Focus ---

    /// Focus an element.
    fn focus(&self, el: ElementId) -> Result<(), HostError>;

    /// The currently focused element.
    fn active_element(&self) -> Option<ElementId>;

    /// First focusable descendant of `within` in tree order.
    fn first_focusable(&self, within: ElementId) -> Option<ElementId>;

    /// First descendant of `within` carrying an `autofocus` attribute.
    fn autofocus_target(&self, within: ElementId) -> Option<ElementId>;

    // --- Interception ---

    /// Install or remove the document-level scroll and key listeners that
    /// forward to `StackContext::handle_scroll` / `handle_key`.
    fn set_scroll_interception(&self, enabled: bool);

    /// Install or remove the capturing focus listener that forwards to
    /// `StackContext::handle_focus_in`.
    fn set_focus_interception(&self, enabled: bool);
}

/// A host without a document, for server-side rendering.
///
/// Every query is empty and every mutation is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessHost;

impl Host for HeadlessHost {
    fn has_document(&self) -> bool {
        false
    }

    fn viewport(&self) -> Size {
        Size::ZERO
    }

    fn scroll_offset(&self) -> Point {
        Point::ZERO
    }

    fn scroll_to(&self, _offset: Point) {}

    fn bounding_rect(&self, _el: ElementId) -> Option<Rect> {
        None
    }

    fn natural_size(&self, _el: ElementId) -> Option<Size> {
        None
    }

    fn contains(&self, _ancestor: ElementId, _node: ElementId) -> bool {
        false
    }

    fn overflow(&self, _root: DocumentRoot) -> String {
        String::new()
    }

    fn set_overflow(&self, _root: DocumentRoot, _value: &str) {}

    fn overlay_container(&self) -> Option<ElementId> {
        None
    }

    fn move_to_container(&self, el: ElementId, _container: ElementId) -> Result<(), HostError> {
        Err(HostError::ElementDetached(el))
    }

    fn remove(&self, el: ElementId) -> Result<(), HostError> {
        Err(HostError::ElementDetached(el))
    }

    fn focus(&self, el: ElementId) -> Result<(), HostError> {
        Err(HostError::ElementDetached(el))
    }

    fn active_element(&self) -> Option<ElementId> {
        None
    }

    fn first_focusable(&self, _within: ElementId) -> Option<ElementId> {
        None
    }

    fn autofocus_target(&self, _within: ElementId) -> Option<ElementId> {
        None
    }

    fn set_scroll_interception(&self, _enabled: bool) {}

    fn set_focus_interception(&self, _enabled: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_host_is_inert() {
        let host = HeadlessHost;
        let el = ElementId(1);
        assert!(!host.has_document());
        assert_eq!(host.viewport(), Size::ZERO);
        assert_eq!(host.bounding_rect(el), None);
        assert!(!host.contains(el, el));
        assert_eq!(host.overflow(DocumentRoot::Body), "");
        assert_eq!(host.remove(el), Err(HostError::ElementDetached(el)));
    }
}
