#![forbid(unsafe_code)]

//! Element handles and the input events consumed by the engine.
//!
//! The engine never owns document nodes. It refers to them through opaque
//! [`ElementId`] handles handed out by the [`Host`](crate::Host), and holds
//! them weakly: a handle may point at a node that has since been removed, in
//! which case host queries return `None` / `false`.

/// Opaque handle to a document element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

impl ElementId {
    /// Get the raw handle value.
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Keys the engine reacts to.
///
/// Only Escape (dismissal) and the page-scrolling keys (scroll lock) matter;
/// everything else collapses into [`Key::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Escape,
    Space,
    PageUp,
    PageDown,
    End,
    Home,
    ArrowLeft,
    ArrowUp,
    ArrowRight,
    ArrowDown,
    Tab,
    Enter,
    Char(char),
    Other,
}

impl Key {
    /// Whether the key scrolls the page by default.
    ///
    /// These are suppressed while the document scroll lock is engaged.
    pub const fn is_scroll_key(self) -> bool {
        matches!(
            self,
            Self::Space
                | Self::PageUp
                | Self::PageDown
                | Self::End
                | Self::Home
                | Self::ArrowLeft
                | Self::ArrowUp
                | Self::ArrowRight
                | Self::ArrowDown
        )
    }
}

/// What kind of element an event was dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetKind {
    /// A single-line text input.
    Input,
    /// A multi-line text area.
    TextArea,
    #[default]
    Other,
}

impl TargetKind {
    /// Whether the target consumes navigation keys itself.
    #[inline]
    pub const fn is_text_entry(self) -> bool {
        matches!(self, Self::Input | Self::TextArea)
    }
}

/// A keydown event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub target: Option<ElementId>,
    pub target_kind: TargetKind,
    /// Set when another handler already called `preventDefault`.
    pub default_prevented: bool,
}

impl KeyInput {
    /// A key event with no target.
    pub const fn new(key: Key) -> Self {
        Self {
            key,
            target: None,
            target_kind: TargetKind::Other,
            default_prevented: false,
        }
    }

    /// Set the event target.
    #[must_use]
    pub const fn target(mut self, target: ElementId, kind: TargetKind) -> Self {
        self.target = Some(target);
        self.target_kind = kind;
        self
    }

    /// Mark the event as already handled.
    #[must_use]
    pub const fn prevented(mut self) -> Self {
        self.default_prevented = true;
        self
    }
}

/// A pointer (mouse/touch) event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerInput {
    /// The element the pointer event was dispatched to.
    pub target: Option<ElementId>,
    /// For enter/leave: the element the pointer came from / moved to.
    pub related_target: Option<ElementId>,
    pub default_prevented: bool,
}

impl PointerInput {
    /// A pointer event dispatched to `target`.
    pub const fn on(target: ElementId) -> Self {
        Self {
            target: Some(target),
            related_target: None,
            default_prevented: false,
        }
    }

    /// A pointer event with no target (e.g. synthesized).
    pub const fn detached() -> Self {
        Self {
            target: None,
            related_target: None,
            default_prevented: false,
        }
    }

    /// Set the related target (where the pointer moved to on leave).
    #[must_use]
    pub const fn related(mut self, related: ElementId) -> Self {
        self.related_target = Some(related);
        self
    }
}

/// What triggered an overlay to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivateSource {
    /// An element, typically the activator button.
    Element(ElementId),
    /// A pointer event; its target is taken as the activator.
    Pointer(PointerInput),
}

impl ActivateSource {
    /// Resolve the source to the element it designates, if any.
    pub fn element(self) -> Option<ElementId> {
        match self {
            Self::Element(el) => Some(el),
            Self::Pointer(ev) => ev.target,
        }
    }
}

impl From<ElementId> for ActivateSource {
    fn from(el: ElementId) -> Self {
        Self::Element(el)
    }
}

impl From<PointerInput> for ActivateSource {
    fn from(ev: PointerInput) -> Self {
        Self::Pointer(ev)
    }
}
