#![forbid(unsafe_code)]

//! The stack context: one per page.
//!
//! A [`StackContext`] owns the registry, the scheduler, the host handle and
//! the settings, and it is where page-wide input enters the engine: key
//! presses, scrolls, focus changes, resizes and navigation. It is a cheap
//! clonable handle; every overlay keeps one.
//!
//! # Invariants
//!
//! - Escape goes to the front-most overlay only.
//! - Scroll-lock and focus-trap side effects follow the registry's claim
//!   edges; nothing else engages or releases them.
//! - No registry or state borrow is held while an overlay callback runs.
//!
//! # Failure Modes
//!
//! - `build()` fails with [`StackError::InvalidSetting`] for bad settings and
//!   [`StackError::MissingContainer`] when a document exists but has no
//!   overlay container.
//! - `push()` and the dialog helpers fail with
//!   [`StackError::MissingDynamicContainer`] until a
//!   [`DynamicContainer`](super::DynamicContainer) is attached.
//!
//! # Example
//!
//! ```ignore
//! let ctx = StackContext::builder(host)
//!     .settings(StackSettings::new().z_index(1000))
//!     .build()?;
//! let _container = DynamicContainer::attach(&ctx)?;
//! let answer = ctx.confirm("Discard changes?")?;
//! ```

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};
use vstack_core::error::{Result, StackError};
use vstack_core::event::{ElementId, Key, KeyInput};
use vstack_core::geometry::Size;
use vstack_core::host::Host;
use vstack_core::settings::{StackSettings, ThemeName};
use vstack_runtime::{Emitter, Scheduler, Subscription};

use super::dynamic::{
    DynamicInner, OverlayDescriptor, PromptOutcome, PushFuture, PushValue,
};
use super::focus_trap::FocusTrap;
use super::registry::{ClaimEdge, StackId, StackMember, StackRegistry};
use super::scroll_lock::ScrollLock;
use crate::dialog::DialogDescriptor;
use crate::snackbar::SnackbarDescriptor;

/// What the host should do with a key press after the engine saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyOutcome {
    /// An overlay consumed the key.
    pub handled: bool,
    /// The default action must be suppressed (scroll lock).
    pub prevent_default: bool,
}

pub(crate) struct ContextInner {
    registry: RefCell<StackRegistry>,
    scheduler: Scheduler,
    host: Rc<dyn Host>,
    settings: StackSettings,
    scroll_lock: RefCell<ScrollLock>,
    focus_trap: RefCell<FocusTrap>,
    theme: Cell<ThemeName>,
    viewport: Cell<Size>,
    resized: Emitter<Size>,
    dynamic: RefCell<Weak<DynamicInner>>,
}

/// Handle to the page-wide overlay state.
#[derive(Clone)]
pub struct StackContext {
    inner: Rc<ContextInner>,
}

impl fmt::Debug for StackContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackContext")
            .field("registry", &*self.inner.registry.borrow())
            .field("theme", &self.inner.theme.get())
            .field("viewport", &self.inner.viewport.get())
            .finish_non_exhaustive()
    }
}

/// Builder for [`StackContext`].
pub struct StackContextBuilder {
    host: Rc<dyn Host>,
    scheduler: Option<Scheduler>,
    settings: StackSettings,
}

impl StackContextBuilder {
    /// Share an existing scheduler instead of creating one.
    #[must_use]
    pub fn scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: StackSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Result<StackContext> {
        self.settings.validate()?;
        if self.host.has_document() && self.host.overlay_container().is_none() {
            return Err(StackError::MissingContainer);
        }
        let viewport = self.host.viewport();
        let theme = self.settings.default_theme;
        debug!(z_index = self.settings.z_index, "stack context created");
        Ok(StackContext {
            inner: Rc::new(ContextInner {
                registry: RefCell::new(StackRegistry::new()),
                scheduler: self.scheduler.unwrap_or_default(),
                host: self.host,
                settings: self.settings,
                scroll_lock: RefCell::new(ScrollLock::new()),
                focus_trap: RefCell::new(FocusTrap::new()),
                theme: Cell::new(theme),
                viewport: Cell::new(viewport),
                resized: Emitter::new(),
                dynamic: RefCell::new(Weak::new()),
            }),
        })
    }
}

impl StackContext {
    pub fn builder(host: Rc<dyn Host>) -> StackContextBuilder {
        StackContextBuilder {
            host,
            scheduler: None,
            settings: StackSettings::default(),
        }
    }

    // --- Accessors ---

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    pub fn host(&self) -> &dyn Host {
        &*self.inner.host
    }

    pub fn settings(&self) -> &StackSettings {
        &self.inner.settings
    }

    pub fn theme(&self) -> ThemeName {
        self.inner.theme.get()
    }

    pub fn set_theme(&self, theme: ThemeName) {
        if self.inner.theme.replace(theme) != theme {
            debug!(?theme, "context theme changed");
        }
    }

    /// Viewport size as of the last [`handle_resize`](Self::handle_resize).
    pub fn viewport(&self) -> Size {
        self.inner.viewport.get()
    }

    /// Whether both handles refer to the same context.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Read-only view of the registry.
    pub fn with_registry<R>(&self, read: impl FnOnce(&StackRegistry) -> R) -> R {
        read(&self.inner.registry.borrow())
    }

    pub fn front_most(&self) -> Option<StackId> {
        self.registry().front_most()
    }

    pub fn depth(&self) -> usize {
        self.registry().depth()
    }

    pub fn any_transitioning(&self) -> bool {
        self.registry().any_transitioning()
    }

    pub fn is_scroll_locked(&self) -> bool {
        self.inner.scroll_lock.borrow().is_engaged()
    }

    pub fn is_focus_trapped(&self) -> bool {
        self.inner.focus_trap.borrow().is_listening()
    }

    // --- Page Input ---

    /// Route a document key press.
    pub fn handle_key(&self, key: &KeyInput) -> KeyOutcome {
        let mut outcome = KeyOutcome {
            prevent_default: self.inner.scroll_lock.borrow().should_prevent(key),
            ..KeyOutcome::default()
        };
        if key.key == Key::Escape && !key.default_prevented {
            let front = self.registry().front_member();
            if let Some(front) = front {
                trace!("escape routed to front-most overlay");
                front.on_escape();
                outcome.handled = true;
            }
        }
        outcome
    }

    /// A document scroll happened. Returns whether the viewport was pinned
    /// back.
    pub fn handle_scroll(&self) -> bool {
        self.inner.scroll_lock.borrow().pin(self.host())
    }

    /// Focus entered `target`. The front-most overlay pulls it back inside if
    /// it traps focus.
    pub fn handle_focus_in(&self, target: ElementId) {
        let front = {
            let registry = self.registry();
            registry
                .front_most()
                .filter(|id| registry.traps_focus(*id))
                .and_then(|id| registry.member(id))
        };
        if let Some(front) = front {
            front.trap_focus(target);
        }
    }

    /// The window was resized: refresh the cached viewport and notify
    /// listeners such as menus.
    pub fn handle_resize(&self) {
        let viewport = self.host().viewport();
        self.inner.viewport.set(viewport);
        trace!(width = viewport.width, height = viewport.height, "viewport resized");
        self.inner.resized.emit(&viewport);
    }

    /// Listen for [`handle_resize`](Self::handle_resize).
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn on_resize(&self, listener: impl Fn(&Size) + 'static) -> Subscription {
        self.inner.resized.subscribe(listener)
    }

    /// Whether an active guarded overlay vetoes navigation.
    pub fn blocks_navigation(&self) -> bool {
        let members = self.registry().active_members();
        members.iter().any(|m| m.blocks_navigation())
    }

    /// Attempt a navigation. Returns `false` when vetoed; otherwise closes
    /// overlays that close on navigation and returns `true`.
    pub fn navigate(&self) -> bool {
        if self.blocks_navigation() {
            debug!("navigation blocked by guarded overlay");
            return false;
        }
        let members = self.registry().active_members();
        for member in members {
            member.on_navigation();
        }
        true
    }

    // --- Dynamic Overlays ---

    /// Push a transient overlay through the attached dynamic container.
    pub fn push(&self, descriptor: OverlayDescriptor) -> Result<PushFuture> {
        let dynamic = self
            .inner
            .dynamic
            .borrow()
            .upgrade()
            .ok_or(StackError::MissingDynamicContainer)?;
        Ok(dynamic.push(descriptor))
    }

    /// Push a dialog.
    pub fn dialog(&self, descriptor: DialogDescriptor) -> Result<PushFuture> {
        self.push(OverlayDescriptor::Dialog(descriptor))
    }

    /// Show a message with a single OK action. Settles once dismissed.
    pub fn alert(&self, descriptor: impl Into<DialogDescriptor>) -> Result<PushFuture<()>> {
        let descriptor = descriptor.into().with_alert_actions(&self.settings().strings);
        Ok(self.dialog(descriptor)?.map(|_| ()))
    }

    /// Ask a yes/no question. Settles `true` only on the OK action.
    pub fn confirm(&self, descriptor: impl Into<DialogDescriptor>) -> Result<PushFuture<bool>> {
        let descriptor = descriptor
            .into()
            .with_confirm_actions(&self.settings().strings);
        Ok(self
            .dialog(descriptor)?
            .map(|payload| matches!(payload, Some(PushValue::Bool(true)))))
    }

    /// Ask for a line of text.
    pub fn prompt(
        &self,
        descriptor: impl Into<DialogDescriptor>,
    ) -> Result<PushFuture<PromptOutcome>> {
        let descriptor = descriptor
            .into()
            .with_prompt_actions(&self.settings().strings);
        Ok(self.dialog(descriptor)?.map(PromptOutcome::from_payload))
    }

    /// Show a transient notice.
    pub fn snackbar(&self, descriptor: impl Into<SnackbarDescriptor>) -> Result<PushFuture> {
        self.push(OverlayDescriptor::Snackbar(descriptor.into()))
    }

    // --- Crate Internals ---

    pub(crate) fn registry(&self) -> Ref<'_, StackRegistry> {
        self.inner.registry.borrow()
    }

    pub(crate) fn registry_mut(&self) -> RefMut<'_, StackRegistry> {
        self.inner.registry.borrow_mut()
    }

    pub(crate) fn register(&self, member: Weak<dyn StackMember>) -> StackId {
        self.registry_mut().register(member)
    }

    pub(crate) fn unregister(&self, id: StackId) {
        let (_, scroll, focus) = self.registry_mut().unregister(id);
        self.apply_scroll_edge(scroll);
        self.apply_focus_edge(focus);
    }

    pub(crate) fn claim_scroll_lock(&self, id: StackId) {
        if !self.settings().use_scroll_stop {
            return;
        }
        let edge = self.registry_mut().claim_scroll_lock(id);
        self.apply_scroll_edge(edge);
    }

    pub(crate) fn release_scroll_lock(&self, id: StackId) {
        let edge = self.registry_mut().release_scroll_lock(id);
        self.apply_scroll_edge(edge);
    }

    pub(crate) fn claim_focus_trap(&self, id: StackId) {
        let edge = self.registry_mut().claim_focus_trap(id);
        self.apply_focus_edge(edge);
    }

    pub(crate) fn release_focus_trap(&self, id: StackId) {
        let edge = self.registry_mut().release_focus_trap(id);
        self.apply_focus_edge(edge);
    }

    fn apply_scroll_edge(&self, edge: ClaimEdge) {
        let mut lock = self.inner.scroll_lock.borrow_mut();
        match edge {
            ClaimEdge::Engaged => lock.engage(self.host()),
            ClaimEdge::Released => lock.release(self.host()),
            ClaimEdge::Unchanged => {}
        }
    }

    fn apply_focus_edge(&self, edge: ClaimEdge) {
        let mut trap = self.inner.focus_trap.borrow_mut();
        match edge {
            ClaimEdge::Engaged => trap.engage(self.host()),
            ClaimEdge::Released => trap.release(self.host()),
            ClaimEdge::Unchanged => {}
        }
    }

    /// Install the dynamic container. Fails if a live one is attached.
    pub(crate) fn attach_dynamic(&self, dynamic: &Rc<DynamicInner>) -> Result<()> {
        let mut slot = self.inner.dynamic.borrow_mut();
        if slot.strong_count() > 0 {
            return Err(StackError::DuplicateContainer);
        }
        *slot = Rc::downgrade(dynamic);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::overlay::{CloseOptions, Overlay, OverlayConfig, TransitionSignal};
    use vstack_core::event::TargetKind;
    use vstack_core::geometry::{Point, Rect};
    use vstack_core::host::{DocumentRoot, HeadlessHost};
    use vstack_core::testing::MemoryHost;

    fn setup() -> (Rc<MemoryHost>, StackContext) {
        let host = Rc::new(MemoryHost::new(Size::new(800.0, 600.0)));
        host.add_container();
        let ctx = StackContext::builder(host.clone()).build().expect("context");
        (host, ctx)
    }

    fn open(ctx: &StackContext, overlay: &Overlay<()>) {
        overlay.show();
        ctx.scheduler().run_due();
        overlay.transition(TransitionSignal::AfterEnter);
    }

    #[test]
    fn build_requires_container_when_document_exists() {
        let host = Rc::new(MemoryHost::new(Size::new(800.0, 600.0)));
        let err = StackContext::builder(host).build().unwrap_err();
        assert_eq!(err, StackError::MissingContainer);
    }

    #[test]
    fn build_without_document_needs_no_container() {
        let ctx = StackContext::builder(Rc::new(HeadlessHost)).build();
        assert!(ctx.is_ok());
    }

    #[test]
    fn build_rejects_invalid_settings() {
        let (host, _) = setup();
        let err = StackContext::builder(host)
            .settings(StackSettings::new().z_index(0))
            .build()
            .unwrap_err();
        assert!(matches!(err, StackError::InvalidSetting { field: "z_index", .. }));
    }

    #[test]
    fn escape_goes_to_front_most_only() {
        let (_host, ctx) = setup();
        let back = Overlay::new(&ctx, OverlayConfig::new(), ());
        let front = Overlay::new(&ctx, OverlayConfig::new(), ());
        open(&ctx, &back);
        open(&ctx, &front);

        let outcome = ctx.handle_key(&KeyInput::new(Key::Escape));
        assert!(outcome.handled);
        assert!(!front.is_active());
        assert!(front.is_cancelled());
        assert!(back.is_active());
    }

    #[test]
    fn prevented_escape_is_ignored() {
        let (_host, ctx) = setup();
        let overlay = Overlay::new(&ctx, OverlayConfig::new(), ());
        open(&ctx, &overlay);
        let outcome = ctx.handle_key(&KeyInput::new(Key::Escape).prevented());
        assert!(!outcome.handled);
        assert!(overlay.is_active());
    }

    #[test]
    fn escape_respects_close_on_esc() {
        let (_host, ctx) = setup();
        let overlay = Overlay::new(&ctx, OverlayConfig::new().close_on_esc(false), ());
        open(&ctx, &overlay);
        ctx.handle_key(&KeyInput::new(Key::Escape));
        assert!(overlay.is_active());
    }

    #[test]
    fn scroll_lock_follows_claims() {
        let (host, ctx) = setup();
        host.set_scroll(Point::new(0.0, 50.0));
        let a = Overlay::new(&ctx, OverlayConfig::new().stop_document_scroll(true), ());
        let b = Overlay::new(&ctx, OverlayConfig::new().stop_document_scroll(true), ());
        open(&ctx, &a);
        open(&ctx, &b);
        assert!(ctx.is_scroll_locked());
        assert_eq!(host.overflow(DocumentRoot::Body), "hidden");

        let space = KeyInput::new(Key::Space);
        assert!(ctx.handle_key(&space).prevent_default);
        let typing = KeyInput::new(Key::Space).target(ElementId(99), TargetKind::Input);
        assert!(!ctx.handle_key(&typing).prevent_default);

        host.set_scroll(Point::new(0.0, 400.0));
        assert!(ctx.handle_scroll());
        assert_eq!(host.scroll_offset(), Point::new(0.0, 50.0));

        a.close(CloseOptions::new());
        assert!(ctx.is_scroll_locked());
        b.close(CloseOptions::new());
        assert!(!ctx.is_scroll_locked());
        assert_eq!(host.overflow(DocumentRoot::Body), "");
        assert!(!ctx.handle_key(&space).prevent_default);
    }

    #[test]
    fn scroll_stop_can_be_disabled() {
        let host = Rc::new(MemoryHost::new(Size::new(800.0, 600.0)));
        host.add_container();
        let ctx = StackContext::builder(host)
            .settings(StackSettings::new().use_scroll_stop(false))
            .build()
            .expect("context");
        let overlay = Overlay::new(&ctx, OverlayConfig::new().stop_document_scroll(true), ());
        open(&ctx, &overlay);
        assert!(!ctx.is_scroll_locked());
    }

    #[test]
    fn navigation_guard_vetoes() {
        let (_host, ctx) = setup();
        let guarded = Overlay::new(&ctx, OverlayConfig::new().navigation_guard(true), ());
        let plain = Overlay::new(&ctx, OverlayConfig::new(), ());
        open(&ctx, &plain);
        assert!(!ctx.blocks_navigation());
        open(&ctx, &guarded);
        assert!(ctx.blocks_navigation());
        assert!(!ctx.navigate());
        assert!(plain.is_active());

        guarded.cancel(true);
        assert!(ctx.navigate());
        assert!(!plain.is_active());
    }

    #[test]
    fn navigation_keeps_overlays_that_opt_out() {
        let (_host, ctx) = setup();
        let sticky = Overlay::new(&ctx, OverlayConfig::new().close_on_navigation(false), ());
        open(&ctx, &sticky);
        assert!(ctx.navigate());
        assert!(sticky.is_active());
    }

    #[test]
    fn focus_trap_pulls_focus_back_to_front_most() {
        let (host, ctx) = setup();
        let outside = host.add_element(host.body(), Rect::new(0.0, 0.0, 10.0, 10.0));
        host.set_focusable(outside, true);
        host.focus(outside).expect("focus");
        let content = host.create_detached(Rect::new(100.0, 100.0, 200.0, 200.0));
        let button = host.add_element(content, Rect::new(110.0, 110.0, 40.0, 20.0));
        host.set_focusable(button, true);

        let overlay = Overlay::new(&ctx, OverlayConfig::new().focus_trap(true), ());
        overlay.mount(crate::stack::overlay::ContentRefs::new(content));
        open(&ctx, &overlay);
        assert!(host.focus_intercepted());

        ctx.handle_focus_in(outside);
        assert_eq!(host.focused(), Some(button));

        overlay.close(CloseOptions::new());
        assert!(!host.focus_intercepted());
        assert_eq!(host.focused(), Some(outside));
    }

    #[test]
    fn focus_trap_ignores_non_trapping_front() {
        let (host, ctx) = setup();
        let outside = host.add_element(host.body(), Rect::new(0.0, 0.0, 10.0, 10.0));
        let content = host.create_detached(Rect::new(100.0, 100.0, 200.0, 200.0));
        let button = host.add_element(content, Rect::new(110.0, 110.0, 40.0, 20.0));
        host.set_focusable(button, true);

        let trapping = Overlay::new(&ctx, OverlayConfig::new().focus_trap(true), ());
        trapping.mount(crate::stack::overlay::ContentRefs::new(content));
        open(&ctx, &trapping);
        let menu = Overlay::new(&ctx, OverlayConfig::new(), ());
        open(&ctx, &menu);

        host.focus(outside).expect("focus");
        ctx.handle_focus_in(outside);
        assert_eq!(host.focused(), Some(outside));
    }

    #[test]
    fn resize_updates_viewport_and_notifies() {
        let (host, ctx) = setup();
        let seen = Rc::new(Cell::new(Size::ZERO));
        let sink = Rc::clone(&seen);
        let _sub = ctx.on_resize(move |size| sink.set(*size));
        host.set_viewport(Size::new(1024.0, 768.0));
        assert_eq!(ctx.viewport(), Size::new(800.0, 600.0));
        ctx.handle_resize();
        assert_eq!(ctx.viewport(), Size::new(1024.0, 768.0));
        assert_eq!(seen.get(), Size::new(1024.0, 768.0));
    }

    #[test]
    fn push_without_container_fails() {
        let (_host, ctx) = setup();
        let err = ctx.alert("hello").unwrap_err();
        assert_eq!(err, StackError::MissingDynamicContainer);
    }

    #[test]
    fn theme_defaults_to_settings() {
        let host = Rc::new(HeadlessHost);
        let ctx = StackContext::builder(host)
            .settings(StackSettings::new().default_theme(ThemeName::Dark))
            .build()
            .expect("context");
        assert_eq!(ctx.theme(), ThemeName::Dark);
        ctx.set_theme(ThemeName::Light);
        assert_eq!(ctx.theme(), ThemeName::Light);
    }
}
