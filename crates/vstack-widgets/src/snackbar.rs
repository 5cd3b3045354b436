#![forbid(unsafe_code)]

//! Snackbars: short notices pinned to a viewport edge.
//!
//! A snackbar ignores outside clicks and navigation, dismisses itself after
//! the configured timeout (6 s by default, `0` disables it) and optionally
//! renders a close button labelled from the settings strings.
//!
//! # Invariants
//!
//! - The position always has exactly one vertical edge. Setting neither or
//!   both of top/bottom means bottom.
//! - Left and right together mean right.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use tracing::debug;
use vstack_layout::Placement;

use crate::capability::{Activatable, ColorContextual};
use crate::stack::context::StackContext;
use crate::stack::overlay::{CloseOptions, Overlay, OverlayConfig};
use crate::stack::registry::StackId;

pub const SNACKBAR_TRANSITION: &str = "v-stack-snackbar";

/// Everything needed to build a [`Snackbar`]. Unset options fall back to
/// the snackbar settings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SnackbarDescriptor {
    pub content: String,
    pub placement: Placement,
    pub close_button: Option<bool>,
    /// `Some(Duration::ZERO)` disables auto-dismiss.
    pub timeout: Option<Duration>,
    pub color: Option<String>,
    pub close_on_esc: Option<bool>,
}

impl SnackbarDescriptor {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    #[must_use]
    pub fn close_button(mut self, show: bool) -> Self {
        self.close_button = Some(show);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    #[must_use]
    pub fn close_on_esc(mut self, close: bool) -> Self {
        self.close_on_esc = Some(close);
        self
    }
}

impl From<&str> for SnackbarDescriptor {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

impl From<String> for SnackbarDescriptor {
    fn from(content: String) -> Self {
        Self::new(content)
    }
}

/// Resolve the requested edges to one vertical edge and at most one
/// horizontal edge.
pub fn normalize_position(requested: Placement) -> Placement {
    let mut position = requested;
    if position.contains(Placement::TOP) == position.contains(Placement::BOTTOM) {
        position.remove(Placement::TOP);
        position.insert(Placement::BOTTOM);
    }
    if position.contains(Placement::LEFT | Placement::RIGHT) {
        position.remove(Placement::LEFT);
    }
    position
}

#[derive(Debug)]
struct SnackbarParts {
    content: String,
    position: Placement,
    close_label: Option<String>,
    color: String,
}

/// A snackbar overlay.
pub struct Snackbar<V> {
    overlay: Overlay<V>,
    parts: Rc<SnackbarParts>,
}

impl<V> Clone for Snackbar<V> {
    fn clone(&self) -> Self {
        Self {
            overlay: self.overlay.clone(),
            parts: Rc::clone(&self.parts),
        }
    }
}

impl<V> fmt::Debug for Snackbar<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snackbar")
            .field("overlay", &self.overlay)
            .field("position", &self.parts.position)
            .finish()
    }
}

impl<V: Clone + PartialEq + 'static> Snackbar<V> {
    pub fn new(ctx: &StackContext, descriptor: SnackbarDescriptor, value: V) -> Self {
        Self::build(ctx, descriptor, value, |_| {})
    }

    pub(crate) fn build(
        ctx: &StackContext,
        descriptor: SnackbarDescriptor,
        value: V,
        adjust: impl FnOnce(&mut OverlayConfig),
    ) -> Self {
        let settings = ctx.settings();
        let mut config = OverlayConfig::new()
            .close_on_click(false)
            .close_on_esc(descriptor.close_on_esc.unwrap_or(false))
            .close_on_navigation(false)
            .transition(SNACKBAR_TRANSITION);
        if let Some(timeout) = descriptor.timeout.or_else(|| settings.snackbar.timeout()) {
            config = config.timeout(timeout);
        }
        adjust(&mut config);

        let close_label = descriptor
            .close_button
            .unwrap_or(settings.snackbar.close_button)
            .then(|| settings.strings.close.clone());
        let parts = SnackbarParts {
            content: descriptor.content,
            position: normalize_position(descriptor.placement),
            close_label,
            color: descriptor
                .color
                .unwrap_or_else(|| settings.snackbar.color.clone()),
        };
        let overlay = Overlay::new(ctx, config, value);
        debug!(id = overlay.id().id(), position = ?parts.position, "snackbar created");
        Self {
            overlay,
            parts: Rc::new(parts),
        }
    }

    /// The close button was pressed.
    pub fn close_button_click(&self) {
        self.overlay.close(CloseOptions::new());
    }
}

impl<V> Snackbar<V> {
    pub fn overlay(&self) -> &Overlay<V> {
        &self.overlay
    }

    pub fn content(&self) -> &str {
        &self.parts.content
    }

    /// Normalized edges.
    pub fn position(&self) -> Placement {
        self.parts.position
    }

    /// Whether the snackbar sits at a horizontal edge instead of centred.
    pub fn has_horizontal(&self) -> bool {
        self.parts
            .position
            .intersects(Placement::LEFT | Placement::RIGHT)
    }

    /// Label of the close button, `None` when it is hidden.
    pub fn close_label(&self) -> Option<&str> {
        self.parts.close_label.as_deref()
    }
}

impl<V: Clone + PartialEq + 'static> Activatable for Snackbar<V> {
    fn overlay_id(&self) -> StackId {
        self.overlay.id()
    }

    fn activate(&self) {
        self.overlay.show();
    }

    fn deactivate(&self, opts: CloseOptions) {
        self.overlay.close(opts);
    }

    fn active(&self) -> bool {
        self.overlay.is_active()
    }
}

impl<V> ColorContextual for Snackbar<V> {
    fn color(&self) -> Option<String> {
        Some(self.parts.color.clone())
    }
}
