#![forbid(unsafe_code)]

//! In-memory document for tests.
//!
//! [`MemoryHost`] keeps a small element tree with explicit rectangles, so
//! tests can place anchors, detach nodes mid-transition, and inspect the
//! side effects (overflow styles, interception flags, focus) the engine
//! leaves behind.
//!
//! ```ignore
//! let host = Rc::new(MemoryHost::new(Size::new(800.0, 600.0)));
//! let container = host.add_container();
//! let anchor = host.add_element(host.body(), Rect::new(100.0, 50.0, 80.0, 20.0));
//! ```

use std::cell::RefCell;

use ahash::AHashMap;

use crate::error::HostError;
use crate::event::ElementId;
use crate::geometry::{Point, Rect, Size};
use crate::host::{DocumentRoot, Host};

#[derive(Debug, Default)]
struct Node {
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    rect: Rect,
    natural: Option<Size>,
    focusable: bool,
    autofocus: bool,
}

#[derive(Debug)]
struct Document {
    present: bool,
    next_id: u64,
    root: ElementId,
    nodes: AHashMap<ElementId, Node>,
    container: Option<ElementId>,
    viewport: Size,
    scroll: Point,
    scroll_calls: usize,
    html_overflow: String,
    body_overflow: String,
    focused: Option<ElementId>,
    scroll_intercepted: bool,
    focus_intercepted: bool,
}

impl Document {
    fn is_attached(&self, el: ElementId) -> bool {
        let mut cursor = Some(el);
        while let Some(id) = cursor {
            if id == self.root {
                return true;
            }
            cursor = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    fn unlink(&mut self, el: ElementId) {
        let parent = self.nodes.get_mut(&el).and_then(|n| n.parent.take());
        if let Some(parent) = parent
            && let Some(p) = self.nodes.get_mut(&parent)
        {
            p.children.retain(|c| *c != el);
        }
    }

    fn descendants(&self, within: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = self
            .nodes
            .get(&within)
            .map(|n| n.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }
}

/// An in-memory [`Host`].
#[derive(Debug)]
pub struct MemoryHost {
    doc: RefCell<Document>,
}

impl MemoryHost {
    /// A document with an empty body and the given viewport.
    pub fn new(viewport: Size) -> Self {
        let root = ElementId(1);
        let mut nodes = AHashMap::new();
        nodes.insert(
            root,
            Node {
                rect: Rect::from_origin_size(Point::ZERO, viewport),
                ..Node::default()
            },
        );
        Self {
            doc: RefCell::new(Document {
                present: true,
                next_id: 2,
                root,
                nodes,
                container: None,
                viewport,
                scroll: Point::ZERO,
                scroll_calls: 0,
                html_overflow: String::new(),
                body_overflow: String::new(),
                focused: None,
                scroll_intercepted: false,
                focus_intercepted: false,
            }),
        }
    }

    /// A host whose `has_document()` is false.
    pub fn without_document() -> Self {
        let host = Self::new(Size::ZERO);
        host.doc.borrow_mut().present = false;
        host
    }

    /// The body element.
    pub fn body(&self) -> ElementId {
        self.doc.borrow().root
    }

    /// Append a new element under `parent`.
    pub fn add_element(&self, parent: ElementId, rect: Rect) -> ElementId {
        let mut doc = self.doc.borrow_mut();
        let id = ElementId(doc.next_id);
        doc.next_id += 1;
        doc.nodes.insert(
            id,
            Node {
                parent: Some(parent),
                rect,
                ..Node::default()
            },
        );
        if let Some(p) = doc.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        id
    }

    /// Create a node that is not attached to the document.
    pub fn create_detached(&self, rect: Rect) -> ElementId {
        let mut doc = self.doc.borrow_mut();
        let id = ElementId(doc.next_id);
        doc.next_id += 1;
        doc.nodes.insert(
            id,
            Node {
                rect,
                ..Node::default()
            },
        );
        id
    }

    /// Add and mark the overlay container element under the body.
    pub fn add_container(&self) -> ElementId {
        let body = self.body();
        let id = self.add_element(body, Rect::default());
        self.doc.borrow_mut().container = Some(id);
        id
    }

    /// Remove `el` (and its subtree) from the document.
    pub fn detach(&self, el: ElementId) {
        self.doc.borrow_mut().unlink(el);
    }

    pub fn set_rect(&self, el: ElementId, rect: Rect) {
        if let Some(node) = self.doc.borrow_mut().nodes.get_mut(&el) {
            node.rect = rect;
        }
    }

    /// Override the size reported by [`Host::natural_size`].
    pub fn set_natural_size(&self, el: ElementId, size: Size) {
        if let Some(node) = self.doc.borrow_mut().nodes.get_mut(&el) {
            node.natural = Some(size);
        }
    }

    pub fn set_focusable(&self, el: ElementId, focusable: bool) {
        if let Some(node) = self.doc.borrow_mut().nodes.get_mut(&el) {
            node.focusable = focusable;
        }
    }

    /// Mark an element with the `autofocus` attribute (implies focusable).
    pub fn set_autofocus(&self, el: ElementId) {
        if let Some(node) = self.doc.borrow_mut().nodes.get_mut(&el) {
            node.autofocus = true;
            node.focusable = true;
        }
    }

    pub fn set_viewport(&self, viewport: Size) {
        self.doc.borrow_mut().viewport = viewport;
    }

    /// Move the scroll position as a user would, without counting as an
    /// engine `scroll_to` call.
    pub fn set_scroll(&self, offset: Point) {
        self.doc.borrow_mut().scroll = offset;
    }

    // --- Inspection ---

    pub fn parent(&self, el: ElementId) -> Option<ElementId> {
        self.doc.borrow().nodes.get(&el).and_then(|n| n.parent)
    }

    pub fn is_attached(&self, el: ElementId) -> bool {
        self.doc.borrow().is_attached(el)
    }

    pub fn children(&self, el: ElementId) -> Vec<ElementId> {
        self.doc
            .borrow()
            .nodes
            .get(&el)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn focused(&self) -> Option<ElementId> {
        self.doc.borrow().focused
    }

    pub fn scroll_intercepted(&self) -> bool {
        self.doc.borrow().scroll_intercepted
    }

    pub fn focus_intercepted(&self) -> bool {
        self.doc.borrow().focus_intercepted
    }

    /// Number of `scroll_to` calls made through the [`Host`] interface.
    pub fn scroll_calls(&self) -> usize {
        self.doc.borrow().scroll_calls
    }
}

impl Host for MemoryHost {
    fn has_document(&self) -> bool {
        self.doc.borrow().present
    }

    fn viewport(&self) -> Size {
        self.doc.borrow().viewport
    }

    fn scroll_offset(&self) -> Point {
        self.doc.borrow().scroll
    }

    fn scroll_to(&self, offset: Point) {
        let mut doc = self.doc.borrow_mut();
        doc.scroll = offset;
        doc.scroll_calls += 1;
    }

    fn bounding_rect(&self, el: ElementId) -> Option<Rect> {
        let doc = self.doc.borrow();
        if !doc.is_attached(el) {
            return None;
        }
        doc.nodes.get(&el).map(|n| n.rect)
    }

    fn natural_size(&self, el: ElementId) -> Option<Size> {
        let doc = self.doc.borrow();
        if !doc.is_attached(el) {
            return None;
        }
        doc.nodes
            .get(&el)
            .map(|n| n.natural.unwrap_or_else(|| n.rect.size()))
    }

    fn contains(&self, ancestor: ElementId, node: ElementId) -> bool {
        let doc = self.doc.borrow();
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = doc.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    fn overflow(&self, root: DocumentRoot) -> String {
        let doc = self.doc.borrow();
        match root {
            DocumentRoot::Html => doc.html_overflow.clone(),
            DocumentRoot::Body => doc.body_overflow.clone(),
        }
    }

    fn set_overflow(&self, root: DocumentRoot, value: &str) {
        let mut doc = self.doc.borrow_mut();
        let slot = match root {
            DocumentRoot::Html => &mut doc.html_overflow,
            DocumentRoot::Body => &mut doc.body_overflow,
        };
        value.clone_into(slot);
    }

    fn overlay_container(&self) -> Option<ElementId> {
        let doc = self.doc.borrow();
        doc.container.filter(|c| doc.is_attached(*c))
    }

    fn move_to_container(&self, el: ElementId, container: ElementId) -> Result<(), HostError> {
        let mut doc = self.doc.borrow_mut();
        if !doc.nodes.contains_key(&el) {
            return Err(HostError::ElementDetached(el));
        }
        if !doc.is_attached(container) {
            return Err(HostError::ElementDetached(container));
        }
        doc.unlink(el);
        if let Some(node) = doc.nodes.get_mut(&el) {
            node.parent = Some(container);
        }
        if let Some(c) = doc.nodes.get_mut(&container) {
            c.children.insert(0, el);
        }
        Ok(())
    }

    fn remove(&self, el: ElementId) -> Result<(), HostError> {
        let mut doc = self.doc.borrow_mut();
        let has_parent = doc.nodes.get(&el).is_some_and(|n| n.parent.is_some());
        if !has_parent {
            return Err(HostError::ElementDetached(el));
        }
        doc.unlink(el);
        if doc.focused.is_some_and(|f| !doc.is_attached(f)) {
            doc.focused = None;
        }
        Ok(())
    }

    fn focus(&self, el: ElementId) -> Result<(), HostError> {
        let mut doc = self.doc.borrow_mut();
        if !doc.is_attached(el) {
            return Err(HostError::ElementDetached(el));
        }
        doc.focused = Some(el);
        Ok(())
    }

    fn active_element(&self) -> Option<ElementId> {
        self.doc.borrow().focused
    }

    fn first_focusable(&self, within: ElementId) -> Option<ElementId> {
        let doc = self.doc.borrow();
        doc.descendants(within)
            .into_iter()
            .find(|id| doc.nodes.get(id).is_some_and(|n| n.focusable))
    }

    fn autofocus_target(&self, within: ElementId) -> Option<ElementId> {
        let doc = self.doc.borrow();
        doc.descendants(within)
            .into_iter()
            .find(|id| doc.nodes.get(id).is_some_and(|n| n.autofocus))
    }

    fn set_scroll_interception(&self, enabled: bool) {
        self.doc.borrow_mut().scroll_intercepted = enabled;
    }

    fn set_focus_interception(&self, enabled: bool) {
        self.doc.borrow_mut().focus_intercepted = enabled;
    }
}
