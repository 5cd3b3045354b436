#![forbid(unsafe_code)]

//! Panels: full-surface overlays such as drawers and sheets.
//!
//! A panel traps focus and locks document scrolling by default. The mounted
//! overlay content is the whole panel surface; clicks on it close the panel
//! (subject to the usual outside-click rules) unless they land in the inner
//! body or in the optional controls strip.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;
use vstack_core::event::{ElementId, PointerInput};
use vstack_core::settings::ThemeName;

use crate::capability::{Activatable, Themed};
use crate::stack::context::StackContext;
use crate::stack::overlay::{CloseOptions, Overlay, OverlayConfig};
use crate::stack::registry::StackId;

/// A panel overlay.
pub struct Panel<V> {
    overlay: Overlay<V>,
    parts: Rc<PanelParts>,
}

#[derive(Debug, Default)]
struct PanelParts {
    body: Cell<Option<ElementId>>,
    controls: Cell<Option<ElementId>>,
}

impl<V> Clone for Panel<V> {
    fn clone(&self) -> Self {
        Self {
            overlay: self.overlay.clone(),
            parts: Rc::clone(&self.parts),
        }
    }
}

impl<V> fmt::Debug for Panel<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Panel")
            .field("overlay", &self.overlay)
            .field("parts", &self.parts)
            .finish()
    }
}

impl<V: Clone + PartialEq + 'static> Panel<V> {
    /// A panel with focus trap and scroll lock on.
    pub fn new(ctx: &StackContext, value: V) -> Self {
        Self::with_overlay(ctx, Self::default_config(), value)
    }

    pub fn with_overlay(ctx: &StackContext, config: OverlayConfig, value: V) -> Self {
        Self {
            overlay: Overlay::new(ctx, config, value),
            parts: Rc::new(PanelParts::default()),
        }
    }

    /// The configuration [`Panel::new`] uses.
    pub fn default_config() -> OverlayConfig {
        OverlayConfig::new()
            .focus_trap(true)
            .stop_document_scroll(true)
    }

    /// A click on the panel surface. Returns whether it closed the panel.
    pub fn handle_click(&self, ev: PointerInput) -> bool {
        if let Some(target) = ev.target
            && self.is_inside(target)
        {
            trace!(id = self.overlay.id().id(), "panel click inside body");
            return false;
        }
        if !self.overlay.config().close_on_click || !self.overlay.close_conditional(&ev) {
            return false;
        }
        self.overlay.close(CloseOptions::new());
        true
    }

    fn is_inside(&self, target: ElementId) -> bool {
        let host = self.overlay.context().host();
        [self.parts.body.get(), self.parts.controls.get()]
            .into_iter()
            .flatten()
            .any(|el| host.contains(el, target))
    }
}

impl<V> Panel<V> {
    pub fn overlay(&self) -> &Overlay<V> {
        &self.overlay
    }

    /// Inner body element; clicks inside it never close the panel.
    pub fn body(&self) -> Option<ElementId> {
        self.parts.body.get()
    }

    pub fn set_body(&self, body: Option<ElementId>) {
        self.parts.body.set(body);
    }

    /// Element holding the panel controls, if rendered.
    pub fn controls(&self) -> Option<ElementId> {
        self.parts.controls.get()
    }

    pub fn set_controls(&self, controls: Option<ElementId>) {
        self.parts.controls.set(controls);
    }
}

impl<V: Clone + PartialEq + 'static> Activatable for Panel<V> {
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

impl<V: Clone + PartialEq + 'static> Themed for Panel<V> {
    fn own_theme(&self) -> Option<ThemeName> {
        self.overlay.own_theme()
    }

    fn context_theme(&self) -> ThemeName {
        self.overlay.context_theme()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::overlay::{ContentRefs, TransitionSignal};
    use vstack_core::geometry::{Rect, Size};
    use vstack_core::host::Host;
    use vstack_core::testing::MemoryHost;

    struct Fixture {
        host: Rc<MemoryHost>,
        ctx: StackContext,
        surface: ElementId,
        body: ElementId,
        controls: ElementId,
    }

    fn fixture() -> Fixture {
        let host = Rc::new(MemoryHost::new(Size::new(800.0, 600.0)));
        host.add_container();
        let ctx = StackContext::builder(host.clone()).build().expect("context");
        let surface = host.create_detached(Rect::new(0.0, 0.0, 800.0, 600.0));
        let body = host.add_element(surface, Rect::new(100.0, 100.0, 600.0, 400.0));
        let controls = host.add_element(surface, Rect::new(0.0, 0.0, 800.0, 40.0));
        Fixture {
            host,
            ctx,
            surface,
            body,
            controls,
        }
    }

    fn open(f: &Fixture, panel: &Panel<()>) {
        panel.set_body(Some(f.body));
        panel.overlay().show();
        f.ctx.scheduler().run_due();
        panel.overlay().mount(ContentRefs::new(f.surface));
        panel.overlay().transition(TransitionSignal::AfterEnter);
    }

    #[test]
    fn defaults_trap_focus_and_lock_scroll() {
        let f = fixture();
        let panel = Panel::new(&f.ctx, ());
        open(&f, &panel);
        assert!(f.ctx.is_scroll_locked());
        assert!(f.host.focus_intercepted());
    }

    #[test]
    fn clicks_inside_body_or_controls_are_ignored() {
        let f = fixture();
        let panel = Panel::new(&f.ctx, ());
        panel.set_controls(Some(f.controls));
        open(&f, &panel);
        assert!(!panel.handle_click(PointerInput::on(f.body)));
        assert!(!panel.handle_click(PointerInput::on(f.controls)));
        assert!(panel.active());
    }

    #[test]
    fn surface_click_closes() {
        let f = fixture();
        let panel = Panel::new(&f.ctx, ());
        open(&f, &panel);
        assert!(f.host.contains(f.surface, f.body));
        assert!(panel.handle_click(PointerInput::on(f.surface)));
        assert!(!panel.active());
    }

    #[test]
    fn close_on_click_off_keeps_panel() {
        let f = fixture();
        let panel = Panel::with_overlay(
            &f.ctx,
            Panel::<()>::default_config().close_on_click(false),
            (),
        );
        open(&f, &panel);
        assert!(!panel.handle_click(PointerInput::on(f.surface)));
        assert!(panel.active());
    }
}
