#![forbid(unsafe_code)]

//! The overlay instance: one stackable modal, dialog, menu, tooltip,
//! snackbar or panel.
//!
//! An [`Overlay<V>`] is a cheap, clonable handle. It registers with the
//! context's registry on creation and unregisters when destroyed, either
//! explicitly through [`Overlay::destroy`] or when the last handle drops.
//!
//! # Lifecycle
//!
//! ```text
//!   Closed --show()--> (next turn) Opening --AfterEnter--> Open
//!     ^                                                     |
//!     +--AfterLeave-- Closing <--close()/resolve()/cancel()--+
//! ```
//!
//! `active` flips at the arrows leaving `Closed` and `Open`; the phase only
//! settles when the host reports the matching transition signal.
//!
//! # Invariants
//!
//! - `close_state` is reset when the overlay opens and written exactly once
//!   by the close that ends the cycle.
//! - `close()` on an inactive overlay is a no-op; `resolve()` likewise.
//! - While active the overlay has a non-zero activate order. After the
//!   leave transition completes the order is 0.
//! - Notifications are emitted with no internal borrow held, so listeners
//!   may call back into the overlay.
//! - Superseded timers are cancelled, never left to fire late.
//!
//! # Failure Modes
//!
//! - Moving content into the overlay container or removing it at destroy
//!   time can fail on a detached node; the error is logged at `debug` and
//!   swallowed.
//! - Without a document, mounting records the refs but never moves nodes,
//!   so the content-ready notification never fires.
//!
//! # Example
//!
//! ```ignore
//! let overlay = Overlay::new(&ctx, OverlayConfig::new().persistent(true), ());
//! overlay.show_from(button);
//! ctx.scheduler().run_due();
//! assert!(overlay.is_active());
//! overlay.close(CloseOptions::new());   // ignored: persistent
//! overlay.cancel(true);                 // forced
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::{debug, trace, warn};
use vstack_core::event::{ActivateSource, ElementId, PointerInput};
use vstack_core::settings::ThemeName;
use vstack_runtime::{Emitter, Subscription, TimerId};

use super::context::StackContext;
use super::focus_trap::{contain_focus, restore_focus};
use super::registry::{StackId, StackMember};

/// Default hover-close delay.
pub const DEFAULT_CLOSE_DELAY: Duration = Duration::from_millis(200);

/// How long a persistent overlay stays in the `shaking` state.
pub const SHAKE_DURATION: Duration = Duration::from_millis(150);

/// Content-ready checks before giving up (one now, the rest on frames).
pub const CONTENT_READY_ATTEMPTS: u32 = 3;

pub const DEFAULT_TRANSITION: &str = "v-stack-fade";

// --- Configuration ---

/// Behaviour switches for an overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    /// Ignore non-forced closes.
    pub persistent: bool,
    /// Keep the content rendered while closed.
    pub always_render: bool,
    pub backdrop: bool,
    pub open_on_hover: bool,
    /// The activator opens on a context-menu press instead of a click.
    pub open_on_contextmenu: bool,
    pub open_delay: Duration,
    pub close_delay: Duration,
    pub close_on_click: bool,
    pub close_on_esc: bool,
    pub close_on_navigation: bool,
    /// Veto navigation while active.
    pub navigation_guard: bool,
    /// Auto-dismiss after the enter transition.
    pub timeout: Option<Duration>,
    /// Skip the shake on backdrop clicks of persistent overlays.
    pub no_click_animation: bool,
    /// Fixed z-index instead of `base + activate_order`.
    pub z_index: Option<u32>,
    pub stop_document_scroll: bool,
    pub focus_trap: bool,
    pub transition: String,
    /// Start open. No `Change` notification is emitted for this activation.
    pub active: bool,
    pub theme: Option<ThemeName>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            persistent: false,
            always_render: false,
            backdrop: false,
            open_on_hover: false,
            open_on_contextmenu: false,
            open_delay: Duration::ZERO,
            close_delay: DEFAULT_CLOSE_DELAY,
            close_on_click: true,
            close_on_esc: true,
            close_on_navigation: true,
            navigation_guard: false,
            timeout: None,
            no_click_animation: false,
            z_index: None,
            stop_document_scroll: false,
            focus_trap: false,
            transition: DEFAULT_TRANSITION.to_owned(),
            active: false,
            theme: None,
        }
    }
}

impl OverlayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    #[must_use]
    pub fn always_render(mut self, always: bool) -> Self {
        self.always_render = always;
        self
    }

    #[must_use]
    pub fn backdrop(mut self, backdrop: bool) -> Self {
        self.backdrop = backdrop;
        self
    }

    #[must_use]
    pub fn open_on_hover(mut self, hover: bool) -> Self {
        self.open_on_hover = hover;
        self
    }

    #[must_use]
    pub fn open_on_contextmenu(mut self, contextmenu: bool) -> Self {
        self.open_on_contextmenu = contextmenu;
        self
    }

    #[must_use]
    pub fn open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    #[must_use]
    pub fn close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }

    #[must_use]
    pub fn close_on_click(mut self, close: bool) -> Self {
        self.close_on_click = close;
        self
    }

    #[must_use]
    pub fn close_on_esc(mut self, close: bool) -> Self {
        self.close_on_esc = close;
        self
    }

    #[must_use]
    pub fn close_on_navigation(mut self, close: bool) -> Self {
        self.close_on_navigation = close;
        self
    }

    #[must_use]
    pub fn navigation_guard(mut self, guard: bool) -> Self {
        self.navigation_guard = guard;
        self
    }

    /// Auto-dismiss delay; zero disables it.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    #[must_use]
    pub fn no_click_animation(mut self, skip: bool) -> Self {
        self.no_click_animation = skip;
        self
    }

    #[must_use]
    pub fn z_index(mut self, z_index: u32) -> Self {
        self.z_index = Some(z_index);
        self
    }

    #[must_use]
    pub fn stop_document_scroll(mut self, stop: bool) -> Self {
        self.stop_document_scroll = stop;
        self
    }

    #[must_use]
    pub fn focus_trap(mut self, trap: bool) -> Self {
        self.focus_trap = trap;
        self
    }

    #[must_use]
    pub fn transition(mut self, name: impl Into<String>) -> Self {
        self.transition = name.into();
        self
    }

    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    #[must_use]
    pub fn theme(mut self, theme: ThemeName) -> Self {
        self.theme = Some(theme);
        self
    }
}

// --- State & Notifications ---

/// Where the overlay is in its show/close cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayPhase {
    #[default]
    Closed,
    Opening,
    Open,
    Closing,
}

impl OverlayPhase {
    #[inline]
    pub const fn is_transitioning(self) -> bool {
        matches!(self, Self::Opening | Self::Closing)
    }
}

/// How the last show/close cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloseState {
    #[default]
    Indeterminate,
    Resolved,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CloseOptions {
    /// Close even when persistent.
    pub force: bool,
    pub state: CloseState,
}

impl CloseOptions {
    pub const fn new() -> Self {
        Self {
            force: false,
            state: CloseState::Indeterminate,
        }
    }

    #[must_use]
    pub const fn force(mut self) -> Self {
        self.force = true;
        self
    }

    #[must_use]
    pub const fn state(mut self, state: CloseState) -> Self {
        self.state = state;
        self
    }
}

/// Transition progress reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionSignal {
    BeforeEnter,
    AfterEnter,
    EnterCancelled,
    BeforeLeave,
    AfterLeave,
    LeaveCancelled,
}

/// Notifications emitted by an overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEvent<V> {
    /// `active` changed through a user-facing operation.
    Change(bool),
    Show,
    Close,
    Payload(V),
    BeforeEnter,
    AfterEnter,
    BeforeLeave,
    AfterLeave,
    /// Content is in the overlay container and autofocus has run.
    ContentReady,
}

/// Rendered nodes handed to [`Overlay::mount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRefs {
    pub content: ElementId,
    pub backdrop: Option<ElementId>,
}

impl ContentRefs {
    pub const fn new(content: ElementId) -> Self {
        Self {
            content,
            backdrop: None,
        }
    }

    #[must_use]
    pub const fn backdrop(mut self, backdrop: ElementId) -> Self {
        self.backdrop = Some(backdrop);
        self
    }
}

#[derive(Debug, Default)]
struct Timers {
    show: Option<TimerId>,
    /// Hover open/close delay; one slot shared by both directions.
    delay: Option<TimerId>,
    dismiss: Option<TimerId>,
    shake: Option<TimerId>,
    ready: Option<TimerId>,
}

impl Timers {
    fn drain(&mut self) -> Vec<TimerId> {
        [
            self.show.take(),
            self.delay.take(),
            self.dismiss.take(),
            self.shake.take(),
            self.ready.take(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

struct State<V> {
    config: OverlayConfig,
    phase: OverlayPhase,
    close_state: CloseState,
    value: V,
    initial: V,
    activator: Option<ElementId>,
    content: Option<ElementId>,
    backdrop: Option<ElementId>,
    /// Content was handed over to the overlay container.
    detached: bool,
    booted: bool,
    need_render: bool,
    shaking: bool,
    destroyed: bool,
    /// Focus owner at the time the focus trap was claimed.
    restore_focus: Option<ElementId>,
    timers: Timers,
}

struct OverlayInner<V> {
    id: StackId,
    ctx: StackContext,
    this: Weak<OverlayInner<V>>,
    state: RefCell<State<V>>,
    events: Emitter<OverlayEvent<V>>,
}

// --- Handle ---

/// A registered overlay instance. Clones share the same instance.
pub struct Overlay<V> {
    inner: Rc<OverlayInner<V>>,
}

impl<V> Clone for Overlay<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for Overlay<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.inner.state.borrow();
        f.debug_struct("Overlay")
            .field("id", &self.inner.id)
            .field("phase", &st.phase)
            .field("close_state", &st.close_state)
            .field("destroyed", &st.destroyed)
            .finish_non_exhaustive()
    }
}

/// A handle that does not keep the overlay alive.
pub struct WeakOverlay<V> {
    inner: Weak<OverlayInner<V>>,
}

impl<V> Clone for WeakOverlay<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<V> WeakOverlay<V> {
    pub fn upgrade(&self) -> Option<Overlay<V>> {
        self.inner.upgrade().map(|inner| Overlay { inner })
    }
}

impl<V: Clone + PartialEq + 'static> Overlay<V> {
    /// Create and register an overlay. `value` is both the initial and the
    /// current payload.
    pub fn new(ctx: &StackContext, config: OverlayConfig, value: V) -> Self {
        let open = config.active;
        let always = config.always_render;
        let inner = Rc::new_cyclic(|this: &Weak<OverlayInner<V>>| {
            let member: Weak<dyn StackMember> = this.clone();
            let id = ctx.register(member);
            OverlayInner {
                id,
                ctx: ctx.clone(),
                this: this.clone(),
                state: RefCell::new(State {
                    config,
                    phase: OverlayPhase::Closed,
                    close_state: CloseState::Indeterminate,
                    initial: value.clone(),
                    value,
                    activator: None,
                    content: None,
                    backdrop: None,
                    detached: false,
                    booted: always,
                    need_render: always,
                    shaking: false,
                    destroyed: false,
                    restore_focus: None,
                    timers: Timers::default(),
                }),
                events: Emitter::new(),
            }
        });
        if open {
            inner.set_active(true, false);
        }
        Self { inner }
    }

    pub fn downgrade(&self) -> WeakOverlay<V> {
        WeakOverlay {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether two handles refer to the same instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Listen to this overlay's notifications.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe(&self, listener: impl Fn(&OverlayEvent<V>) + 'static) -> Subscription {
        self.inner.events.subscribe(listener)
    }

    // --- Queries ---

    #[inline]
    pub fn id(&self) -> StackId {
        self.inner.id
    }

    pub fn context(&self) -> &StackContext {
        &self.inner.ctx
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    pub fn phase(&self) -> OverlayPhase {
        self.inner.state.borrow().phase
    }

    pub fn is_transitioning(&self) -> bool {
        self.phase().is_transitioning()
    }

    pub fn close_state(&self) -> CloseState {
        self.inner.state.borrow().close_state
    }

    pub fn is_resolved(&self) -> bool {
        self.close_state() == CloseState::Resolved
    }

    pub fn is_cancelled(&self) -> bool {
        self.close_state() == CloseState::Cancelled
    }

    /// The value, but only once the overlay was resolved.
    pub fn payload(&self) -> Option<V> {
        let st = self.inner.state.borrow();
        (st.close_state == CloseState::Resolved).then(|| st.value.clone())
    }

    /// The current value regardless of how the overlay closed.
    pub fn value(&self) -> V {
        self.inner.state.borrow().value.clone()
    }

    pub fn activator(&self) -> Option<ElementId> {
        self.inner.state.borrow().activator
    }

    /// Set the element the overlay is anchored to without opening it.
    pub fn set_activator(&self, activator: Option<ElementId>) {
        self.inner.state.borrow_mut().activator = activator;
    }

    pub fn content(&self) -> Option<ElementId> {
        self.inner.state.borrow().content
    }

    pub fn backdrop(&self) -> Option<ElementId> {
        self.inner.state.borrow().backdrop
    }

    pub fn activate_order(&self) -> u64 {
        self.inner.ctx.registry().activate_order(self.inner.id)
    }

    pub fn is_front_most(&self) -> bool {
        self.inner.ctx.registry().is_front_most(self.inner.id)
    }

    pub fn z_index(&self) -> u32 {
        self.inner.z_index()
    }

    /// Raise this overlay above every other active one. No-op while inactive.
    pub fn bring_to_front(&self) {
        self.inner.bring_to_front();
    }

    pub fn is_shaking(&self) -> bool {
        self.inner.state.borrow().shaking
    }

    /// Whether the renderer should keep the content in the tree.
    pub fn needs_render(&self) -> bool {
        self.inner.state.borrow().need_render
    }

    /// Whether the overlay was ever opened (or is always rendered).
    pub fn is_booted(&self) -> bool {
        self.inner.state.borrow().booted
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.state.borrow().destroyed
    }

    pub fn config(&self) -> OverlayConfig {
        self.inner.state.borrow().config.clone()
    }

    /// Adjust configuration in place.
    pub fn update_config(&self, update: impl FnOnce(&mut OverlayConfig)) {
        let mut st = self.inner.state.borrow_mut();
        update(&mut st.config);
        if st.config.always_render {
            st.booted = true;
            st.need_render = true;
        }
    }

    // --- Activation ---

    /// Open on the next scheduler turn, keeping the current activator.
    pub fn show(&self) {
        self.inner.request_show(None);
    }

    /// Open on the next scheduler turn, anchored to `source`.
    pub fn show_from(&self, source: impl Into<ActivateSource>) {
        self.inner.request_show(source.into().element());
    }

    pub fn close(&self, opts: CloseOptions) {
        self.inner.close(opts);
    }

    /// Close as resolved with the current value.
    pub fn resolve(&self) {
        self.inner.resolve(None);
    }

    /// Close as resolved with `value`.
    pub fn resolve_with(&self, value: V) {
        self.inner.resolve(Some(value));
    }

    pub fn cancel(&self, force: bool) {
        self.inner.close(CloseOptions {
            force,
            state: CloseState::Cancelled,
        });
    }

    pub fn toggle(&self) {
        if self.is_active() {
            self.close(CloseOptions::new());
        } else {
            self.show();
        }
    }

    pub fn toggle_from(&self, source: impl Into<ActivateSource>) {
        if self.is_active() {
            self.close(CloseOptions::new());
        } else {
            self.show_from(source);
        }
    }

    pub fn set_value(&self, value: V) {
        self.inner.set_value(value);
    }

    /// Restore the value the overlay was created with.
    pub fn reset_value(&self) {
        let initial = self.inner.state.borrow().initial.clone();
        self.inner.set_value(initial);
    }

    // --- Input ---

    /// Primary press on the activator.
    pub fn activator_click(&self, ev: PointerInput) {
        if ev.default_prevented || self.inner.state.borrow().config.open_on_contextmenu {
            return;
        }
        self.toggle_from(ev);
    }

    /// Context-menu press on the activator. Returns whether the native menu
    /// should be suppressed.
    pub fn activator_context_menu(&self, ev: PointerInput) -> bool {
        if ev.default_prevented || !self.inner.state.borrow().config.open_on_contextmenu {
            return false;
        }
        self.toggle_from(ev);
        true
    }

    /// Pointer entered the activator or the content.
    pub fn pointer_enter(&self, ev: PointerInput) {
        self.inner.pointer_enter(ev);
    }

    /// Pointer left the activator or the content.
    pub fn pointer_leave(&self, ev: PointerInput) {
        self.inner.pointer_leave(ev);
    }

    /// Whether a click outside the content may close the overlay.
    ///
    /// Persistent overlays whose backdrop was clicked start shaking.
    pub fn close_conditional(&self, ev: &PointerInput) -> bool {
        self.inner.close_conditional(ev)
    }

    /// Route a document click. Returns whether it closed the overlay.
    pub fn handle_outside_click(&self, ev: PointerInput) -> bool {
        self.inner.handle_outside_click(ev)
    }

    // --- Rendering ---

    /// Report a transition milestone.
    pub fn transition(&self, signal: TransitionSignal) {
        self.inner.transition(signal);
    }

    /// Hand the rendered content (and backdrop) to the engine.
    pub fn mount(&self, refs: ContentRefs) {
        self.inner.mount(refs);
    }

    /// Unregister and release everything. Idempotent.
    pub fn destroy(&self) {
        self.inner.teardown();
    }
}

// --- Behaviour ---

impl<V: Clone + PartialEq + 'static> OverlayInner<V> {
    fn is_active(&self) -> bool {
        self.ctx.registry().is_active(self.id)
    }

    fn emit_all(&self, events: &[OverlayEvent<V>]) {
        for event in events {
            self.events.emit(event);
        }
    }

    fn z_index(&self) -> u32 {
        if let Some(z) = self.state.borrow().config.z_index {
            return z;
        }
        let base = self.ctx.settings().z_index;
        self.ctx.registry().z_index(self.id, base).unwrap_or(base)
    }

    fn bring_to_front(&self) {
        if self.state.borrow().destroyed || !self.is_active() {
            return;
        }
        let order = self.ctx.registry_mut().bring_to_front(self.id);
        debug!(id = self.id.id(), order, "brought to front");
    }

    fn request_show(&self, activator: Option<ElementId>) {
        if self.state.borrow().destroyed || self.is_active() {
            return;
        }
        let this = self.this.clone();
        let timer = self.ctx.scheduler().defer(move || {
            if let Some(inner) = this.upgrade() {
                inner.state.borrow_mut().timers.show = None;
                inner.set_active(true, true);
            }
        });
        let mut st = self.state.borrow_mut();
        if activator.is_some() {
            st.activator = activator;
        }
        if let Some(prev) = st.timers.show.replace(timer) {
            self.ctx.scheduler().clear(prev);
        }
    }

    fn set_active(&self, active: bool, with_emit: bool) {
        let mut events = Vec::with_capacity(2);
        let (stop_scroll, trap_focus) = {
            let mut st = self.state.borrow_mut();
            if st.destroyed {
                return;
            }
            if active {
                st.booted = true;
            }
            if self.is_active() == active {
                return;
            }
            if let Some(timer) = st.timers.dismiss.take() {
                self.ctx.scheduler().clear(timer);
            }
            {
                let mut registry = self.ctx.registry_mut();
                registry.set_active(self.id, active);
                registry.mark_transitioning(self.id);
                if active {
                    registry.bring_to_front(self.id);
                }
            }
            if with_emit {
                events.push(OverlayEvent::Change(active));
            }
            if active {
                st.phase = OverlayPhase::Opening;
                st.close_state = CloseState::Indeterminate;
                st.need_render = true;
                events.push(OverlayEvent::Show);
            } else {
                st.phase = OverlayPhase::Closing;
                events.push(OverlayEvent::Close);
            }
            (st.config.stop_document_scroll, st.config.focus_trap)
        };

        if active {
            debug!(id = self.id.id(), "overlay shown");
            if stop_scroll {
                self.ctx.claim_scroll_lock(self.id);
            }
            if trap_focus {
                let previous = self.ctx.host().active_element();
                self.state.borrow_mut().restore_focus = previous;
                self.ctx.claim_focus_trap(self.id);
            }
        } else {
            debug!(id = self.id.id(), state = ?self.state.borrow().close_state, "overlay closed");
            self.ctx.release_scroll_lock(self.id);
            self.release_focus_trap();
        }

        self.emit_all(&events);
        if active {
            self.content_ready_tick(0);
        }
    }

    fn release_focus_trap(&self) {
        if !self.ctx.registry().traps_focus(self.id) {
            return;
        }
        self.ctx.release_focus_trap(self.id);
        let previous = self.state.borrow_mut().restore_focus.take();
        restore_focus(self.ctx.host(), previous);
    }

    fn close(&self, opts: CloseOptions) {
        {
            let mut st = self.state.borrow_mut();
            if st.destroyed || (st.config.persistent && !opts.force) {
                return;
            }
            if let Some(timer) = st.timers.show.take() {
                self.ctx.scheduler().clear(timer);
            }
            if !self.is_active() {
                return;
            }
            st.close_state = opts.state;
        }
        self.set_active(false, true);
    }

    fn resolve(&self, value: Option<V>) {
        if !self.is_active() {
            return;
        }
        if let Some(value) = value {
            self.set_value(value);
        }
        self.close(CloseOptions::new().force().state(CloseState::Resolved));
    }

    fn set_value(&self, value: V) {
        {
            let mut st = self.state.borrow_mut();
            if st.value == value {
                return;
            }
            st.value = value.clone();
        }
        self.events.emit(&OverlayEvent::Payload(value));
    }

    // --- Hover intent ---

    fn clear_delay(&self) {
        if let Some(timer) = self.state.borrow_mut().timers.delay.take() {
            self.ctx.scheduler().clear(timer);
        }
    }

    fn run_delay(&self, delay: Duration, task: impl FnOnce(&Self) + 'static) {
        self.clear_delay();
        if delay.is_zero() {
            task(self);
            return;
        }
        let this = self.this.clone();
        let timer = self.ctx.scheduler().set_timeout(delay, move || {
            if let Some(inner) = this.upgrade() {
                inner.state.borrow_mut().timers.delay = None;
                task(&inner);
            }
        });
        self.state.borrow_mut().timers.delay = Some(timer);
    }

    fn pointer_enter(&self, ev: PointerInput) {
        {
            let st = self.state.borrow();
            if !st.config.open_on_hover || st.phase.is_transitioning() {
                return;
            }
        }
        self.clear_delay();
        if self.is_active() {
            return;
        }
        let delay = self.state.borrow().config.open_delay;
        self.run_delay(delay, move |inner| {
            if !inner.is_active() {
                inner.request_show(ev.target);
            }
        });
    }

    fn pointer_leave(&self, ev: PointerInput) {
        if !self.state.borrow().config.open_on_hover {
            return;
        }
        self.clear_delay();
        if !self.is_active() {
            return;
        }
        let delay = self.state.borrow().config.close_delay;
        self.run_delay(delay, move |inner| {
            if let Some(related) = ev.related_target
                && inner.owns(related)
            {
                return;
            }
            if inner.is_active() {
                inner.close(CloseOptions::new());
            }
        });
    }

    /// Whether `node` is inside the content or the activator.
    fn owns(&self, node: ElementId) -> bool {
        let (content, activator) = {
            let st = self.state.borrow();
            (st.content, st.activator)
        };
        let host = self.ctx.host();
        content.is_some_and(|c| host.contains(c, node))
            || activator.is_some_and(|a| host.contains(a, node))
    }

    // --- Outside clicks ---

    fn close_conditional(&self, ev: &PointerInput) -> bool {
        let (phase, persistent, animate, backdrop) = {
            let st = self.state.borrow();
            (
                st.phase,
                st.config.persistent,
                !st.config.no_click_animation,
                st.backdrop,
            )
        };
        if phase == OverlayPhase::Opening {
            return false;
        }
        {
            let registry = self.ctx.registry();
            if !registry.is_front_most(self.id) || registry.any_transitioning() {
                return false;
            }
        }
        if persistent {
            if animate && backdrop.is_some() && ev.target == backdrop {
                self.shake();
            }
            return false;
        }
        self.is_active()
    }

    fn handle_outside_click(&self, ev: PointerInput) -> bool {
        if !self.state.borrow().config.close_on_click {
            return false;
        }
        // Clicks on nodes that are already gone are ignored.
        let Some(target) = ev.target else {
            return false;
        };
        if self.owns(target) || !self.close_conditional(&ev) {
            return false;
        }
        self.close(CloseOptions::new());
        true
    }

    fn shake(&self) {
        let this = self.this.clone();
        let timer = self.ctx.scheduler().set_timeout(SHAKE_DURATION, move || {
            if let Some(inner) = this.upgrade() {
                let mut st = inner.state.borrow_mut();
                st.shaking = false;
                st.timers.shake = None;
            }
        });
        let mut st = self.state.borrow_mut();
        st.shaking = true;
        if let Some(prev) = st.timers.shake.replace(timer) {
            self.ctx.scheduler().clear(prev);
        }
    }

    // --- Transitions ---

    fn transition(&self, signal: TransitionSignal) {
        if self.state.borrow().destroyed {
            return;
        }
        trace!(id = self.id.id(), ?signal, "transition");
        let active = self.is_active();
        let event = match signal {
            TransitionSignal::BeforeEnter => {
                self.ctx.registry_mut().mark_transitioning(self.id);
                Some(OverlayEvent::BeforeEnter)
            }
            TransitionSignal::AfterEnter => {
                self.ctx.registry_mut().clear_transitioning(self.id);
                let timeout = {
                    let mut st = self.state.borrow_mut();
                    if active && st.phase == OverlayPhase::Opening {
                        st.phase = OverlayPhase::Open;
                    }
                    if let Some(timer) = st.timers.dismiss.take() {
                        self.ctx.scheduler().clear(timer);
                    }
                    st.config.timeout
                };
                if active && let Some(timeout) = timeout {
                    self.schedule_dismiss(timeout);
                }
                Some(OverlayEvent::AfterEnter)
            }
            TransitionSignal::EnterCancelled => {
                self.ctx.registry_mut().clear_transitioning(self.id);
                let mut st = self.state.borrow_mut();
                if st.phase == OverlayPhase::Opening {
                    st.phase = OverlayPhase::Open;
                }
                None
            }
            TransitionSignal::BeforeLeave => {
                self.ctx.registry_mut().mark_transitioning(self.id);
                Some(OverlayEvent::BeforeLeave)
            }
            TransitionSignal::AfterLeave => {
                self.ctx.registry_mut().clear_transitioning(self.id);
                if !active {
                    let mut st = self.state.borrow_mut();
                    if st.phase == OverlayPhase::Closing {
                        st.phase = OverlayPhase::Closed;
                    }
                    st.need_render = st.config.always_render;
                    self.ctx.registry_mut().reset_order(self.id);
                }
                Some(OverlayEvent::AfterLeave)
            }
            TransitionSignal::LeaveCancelled => {
                self.ctx.registry_mut().clear_transitioning(self.id);
                let mut st = self.state.borrow_mut();
                if st.phase == OverlayPhase::Closing {
                    st.phase = OverlayPhase::Closed;
                }
                None
            }
        };
        if let Some(event) = event {
            self.events.emit(&event);
        }
    }

    fn schedule_dismiss(&self, timeout: Duration) {
        let this = self.this.clone();
        let timer = self.ctx.scheduler().set_timeout(timeout, move || {
            if let Some(inner) = this.upgrade() {
                inner.state.borrow_mut().timers.dismiss = None;
                trace!(id = inner.id.id(), "auto-dismiss");
                inner.close(CloseOptions::new().force());
            }
        });
        self.state.borrow_mut().timers.dismiss = Some(timer);
    }

    // --- Content ---

    fn mount(&self, refs: ContentRefs) {
        {
            let mut st = self.state.borrow_mut();
            if st.destroyed {
                return;
            }
            st.content = Some(refs.content);
            st.backdrop = refs.backdrop;
        }
        let host = self.ctx.host();
        if !host.has_document() {
            return;
        }
        match host.overlay_container() {
            Some(container) => {
                for el in [refs.backdrop, Some(refs.content)].into_iter().flatten() {
                    if let Err(err) = host.move_to_container(el, container) {
                        debug!(id = self.id.id(), %err, "could not move overlay node");
                    }
                }
            }
            None => warn!(
                id = self.id.id(),
                "overlay container missing; rendering content in place"
            ),
        }
        self.state.borrow_mut().detached = true;
        if self.is_active() {
            self.content_ready_tick(0);
        }
    }

    fn content_ready_tick(&self, attempt: u32) {
        let ready = {
            let mut st = self.state.borrow_mut();
            if let Some(timer) = st.timers.ready.take() {
                self.ctx.scheduler().clear(timer);
            }
            if st.destroyed {
                return;
            }
            st.content.is_some() && st.detached
        };
        if ready {
            self.autofocus();
            self.events.emit(&OverlayEvent::ContentReady);
            return;
        }
        let next = attempt + 1;
        if next < CONTENT_READY_ATTEMPTS {
            let this = self.this.clone();
            let timer = self.ctx.scheduler().request_frame(move || {
                if let Some(inner) = this.upgrade() {
                    inner.content_ready_tick(next);
                }
            });
            self.state.borrow_mut().timers.ready = Some(timer);
        }
    }

    fn autofocus(&self) {
        let Some(content) = self.state.borrow().content else {
            return;
        };
        let host = self.ctx.host();
        if let Some(target) = host.autofocus_target(content)
            && let Err(err) = host.focus(target)
        {
            debug!(id = self.id.id(), %err, "autofocus failed");
        }
    }
}

impl<V> OverlayInner<V> {
    fn teardown(&self) {
        let (timers, nodes, restore) = {
            let mut st = self.state.borrow_mut();
            if st.destroyed {
                return;
            }
            st.destroyed = true;
            st.phase = OverlayPhase::Closed;
            (
                st.timers.drain(),
                [st.backdrop.take(), st.content.take()],
                st.restore_focus.take(),
            )
        };
        for timer in timers {
            self.ctx.scheduler().clear(timer);
        }
        let trapped = self.ctx.registry().traps_focus(self.id);
        self.ctx.unregister(self.id);
        let host = self.ctx.host();
        if trapped {
            restore_focus(host, restore);
        }
        if host.has_document() {
            for el in nodes.into_iter().flatten() {
                if let Err(err) = host.remove(el) {
                    debug!(id = self.id.id(), %err, "overlay node already gone");
                }
            }
        }
        debug!(id = self.id.id(), "overlay destroyed");
    }
}

impl<V> Drop for OverlayInner<V> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<V: Clone + PartialEq + 'static> StackMember for OverlayInner<V> {
    fn on_escape(&self) {
        if self.state.borrow().config.close_on_esc {
            self.close(CloseOptions::new().state(CloseState::Cancelled));
        }
    }

    fn on_navigation(&self) {
        if self.state.borrow().config.close_on_navigation && self.is_active() {
            self.close(CloseOptions::new());
        }
    }

    fn blocks_navigation(&self) -> bool {
        self.state.borrow().config.navigation_guard && self.is_active()
    }

    fn trap_focus(&self, target: ElementId) {
        let Some(content) = self.state.borrow().content else {
            return;
        };
        contain_focus(self.ctx.host(), content, target);
    }
}
