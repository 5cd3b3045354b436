#![forbid(unsafe_code)]

//! Menus: overlays positioned next to their activator.
//!
//! A [`Menu`] measures its activator and content through the host, feeds the
//! numbers to [`compute_menu_rect`], and exposes the result as a
//! [`MenuStyle`] for the renderer. Recomputation happens only on explicit
//! triggers:
//!
//! - the overlay's `ContentReady` notification,
//! - [`Menu::invalidate`],
//! - [`StackContext::handle_resize`], debounced by
//!   [`MenuConfig::resize_debounce`] and only while the menu is open.
//!
//! # Failure Modes
//!
//! A detached activator, unmounted content or content with zero size make
//! the menu [`MenuStyle::Hidden`]. While open it retries on the next
//! animation frames, up to [`MEASURE_ATTEMPTS`] measurements in total.
//!
//! # Example
//!
//! ```ignore
//! let menu = Menu::new(&ctx, MenuConfig::new().placement(Placement::RIGHT), ());
//! menu.overlay().show_from(button);
//! ctx.scheduler().run_due();
//! menu.overlay().mount(ContentRefs::new(list));
//! if let MenuStyle::Positioned(rect) = menu.style() { /* place it */ }
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::trace;
use vstack_core::settings::ThemeName;
use vstack_layout::{
    DEFAULT_DISTANCE, DEFAULT_EDGE_MARGIN, DEFAULT_RESIZE_DEBOUNCE, MenuGeometry, MenuRect,
    MenuSize, Placement, auto_transition, compute_menu_rect,
};
use vstack_runtime::{Subscription, TimerId};

use crate::capability::{Activatable, Themed};
use crate::stack::context::StackContext;
use crate::stack::overlay::{
    CONTENT_READY_ATTEMPTS, CloseOptions, Overlay, OverlayConfig, OverlayEvent, WeakOverlay,
};
use crate::stack::registry::StackId;

/// Measurements attempted before a hidden menu stops retrying.
pub const MEASURE_ATTEMPTS: u32 = CONTENT_READY_ATTEMPTS;

/// Geometry options for a menu.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuConfig {
    pub placement: Placement,
    pub distance: f64,
    pub edge_margin: f64,
    pub width: MenuSize,
    pub height: MenuSize,
    pub max_width: MenuSize,
    pub max_height: MenuSize,
    pub allow_overflow: bool,
    pub resize_debounce: Duration,
    /// `None` picks the transition from the placement.
    pub transition: Option<String>,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            placement: Placement::empty(),
            distance: DEFAULT_DISTANCE,
            edge_margin: DEFAULT_EDGE_MARGIN,
            width: MenuSize::Auto,
            height: MenuSize::Auto,
            max_width: MenuSize::Auto,
            max_height: MenuSize::Auto,
            allow_overflow: false,
            resize_debounce: DEFAULT_RESIZE_DEBOUNCE,
            transition: None,
        }
    }
}

impl MenuConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    #[must_use]
    pub fn distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }

    #[must_use]
    pub fn edge_margin(mut self, margin: f64) -> Self {
        self.edge_margin = margin;
        self
    }

    #[must_use]
    pub fn width(mut self, width: MenuSize) -> Self {
        self.width = width;
        self
    }

    #[must_use]
    pub fn height(mut self, height: MenuSize) -> Self {
        self.height = height;
        self
    }

    #[must_use]
    pub fn max_width(mut self, max: MenuSize) -> Self {
        self.max_width = max;
        self
    }

    #[must_use]
    pub fn max_height(mut self, max: MenuSize) -> Self {
        self.max_height = max;
        self
    }

    #[must_use]
    pub fn allow_overflow(mut self, allow: bool) -> Self {
        self.allow_overflow = allow;
        self
    }

    #[must_use]
    pub fn resize_debounce(mut self, debounce: Duration) -> Self {
        self.resize_debounce = debounce;
        self
    }

    #[must_use]
    pub fn transition(mut self, name: impl Into<String>) -> Self {
        self.transition = Some(name.into());
        self
    }

    /// The explicit transition, or the one matching the placement.
    pub fn computed_transition(&self) -> String {
        self.transition
            .clone()
            .unwrap_or_else(|| auto_transition(self.placement).to_owned())
    }
}

/// Where the renderer should put the menu.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MenuStyle {
    /// Not measurable yet: render with `visibility: hidden`.
    #[default]
    Hidden,
    /// Absolute position in page coordinates.
    Positioned(MenuRect),
}

impl MenuStyle {
    pub fn is_hidden(&self) -> bool {
        matches!(self, Self::Hidden)
    }

    pub fn rect(&self) -> Option<MenuRect> {
        match self {
            Self::Positioned(rect) => Some(*rect),
            Self::Hidden => None,
        }
    }

    /// Inline style declarations.
    pub fn declarations(&self) -> Vec<(&'static str, String)> {
        let mut out = vec![("position", "absolute".to_owned())];
        match self {
            Self::Positioned(rect) => {
                out.push(("left", format!("{}px", rect.x)));
                out.push(("top", format!("{}px", rect.y)));
                out.push(("width", format!("{}px", rect.width)));
                out.push(("height", format!("{}px", rect.height)));
            }
            Self::Hidden => out.push(("visibility", "hidden".to_owned())),
        }
        out
    }
}

// --- Shared state ---

struct MenuShared {
    ctx: StackContext,
    config: RefCell<MenuConfig>,
    style: Cell<MenuStyle>,
    attempts: Cell<u32>,
    resize_timer: Cell<Option<TimerId>>,
    retry_timer: Cell<Option<TimerId>>,
}

impl MenuShared {
    fn cancel_timers(&self) {
        for slot in [&self.resize_timer, &self.retry_timer] {
            if let Some(timer) = slot.take() {
                self.ctx.scheduler().clear(timer);
            }
        }
    }
}

impl Drop for MenuShared {
    fn drop(&mut self) {
        self.cancel_timers();
    }
}

fn measure<V: Clone + PartialEq + 'static>(
    overlay: &Overlay<V>,
    config: &MenuConfig,
) -> Option<MenuGeometry> {
    let ctx = overlay.context();
    let host = ctx.host();
    if !host.has_document() {
        return None;
    }
    let anchor = host.bounding_rect(overlay.activator()?)?;
    let content = host.natural_size(overlay.content()?)?;
    if content.is_empty() {
        return None;
    }
    Some(
        MenuGeometry::new(anchor, content, ctx.viewport())
            .scroll(host.scroll_offset())
            .placement(config.placement)
            .distance(config.distance)
            .edge_margin(config.edge_margin)
            .width(config.width)
            .height(config.height)
            .max_width(config.max_width)
            .max_height(config.max_height)
            .allow_overflow(config.allow_overflow),
    )
}

fn update<V: Clone + PartialEq + 'static>(shared: &Rc<MenuShared>, overlay: &Overlay<V>) -> MenuStyle {
    let geometry = measure(overlay, &shared.config.borrow());
    let style = match geometry {
        Some(geometry) => {
            shared.attempts.set(0);
            MenuStyle::Positioned(compute_menu_rect(&geometry))
        }
        None => {
            schedule_retry(shared, overlay);
            MenuStyle::Hidden
        }
    };
    shared.style.set(style);
    trace!(id = overlay.id().id(), ?style, "menu geometry updated");
    style
}

fn schedule_retry<V: Clone + PartialEq + 'static>(shared: &Rc<MenuShared>, overlay: &Overlay<V>) {
    let attempt = shared.attempts.get() + 1;
    if !overlay.is_active() || attempt >= MEASURE_ATTEMPTS {
        return;
    }
    shared.attempts.set(attempt);
    if let Some(timer) = shared.retry_timer.take() {
        shared.ctx.scheduler().clear(timer);
    }
    let weak_shared = Rc::downgrade(shared);
    let weak_overlay = overlay.downgrade();
    let timer = shared.ctx.scheduler().request_frame(move || {
        if let Some(shared) = weak_shared.upgrade()
            && let Some(overlay) = weak_overlay.upgrade()
        {
            shared.retry_timer.set(None);
            update(&shared, &overlay);
        }
    });
    shared.retry_timer.set(Some(timer));
}

fn on_resize<V: Clone + PartialEq + 'static>(shared: &Weak<MenuShared>, overlay: &WeakOverlay<V>) {
    let (Some(shared), Some(menu)) = (shared.upgrade(), overlay.upgrade()) else {
        return;
    };
    if !menu.is_active() {
        return;
    }
    if let Some(timer) = shared.resize_timer.take() {
        shared.ctx.scheduler().clear(timer);
    }
    let debounce = shared.config.borrow().resize_debounce;
    let weak_shared = Rc::downgrade(&shared);
    let weak_overlay = menu.downgrade();
    let timer = shared.ctx.scheduler().set_timeout(debounce, move || {
        if let Some(shared) = weak_shared.upgrade()
            && let Some(overlay) = weak_overlay.upgrade()
        {
            shared.resize_timer.set(None);
            shared.attempts.set(0);
            update(&shared, &overlay);
        }
    });
    shared.resize_timer.set(Some(timer));
}

// --- Menu ---

/// An overlay anchored to its activator.
pub struct Menu<V> {
    overlay: Overlay<V>,
    shared: Rc<MenuShared>,
    _subscriptions: Rc<[Subscription; 2]>,
}

impl<V> Clone for Menu<V> {
    fn clone(&self) -> Self {
        Self {
            overlay: self.overlay.clone(),
            shared: Rc::clone(&self.shared),
            _subscriptions: Rc::clone(&self._subscriptions),
        }
    }
}

impl<V> fmt::Debug for Menu<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Menu")
            .field("overlay", &self.overlay)
            .field("style", &self.shared.style.get())
            .finish()
    }
}

impl<V: Clone + PartialEq + 'static> Menu<V> {
    /// A menu that locks document scrolling while open.
    pub fn new(ctx: &StackContext, menu: MenuConfig, value: V) -> Self {
        Self::with_overlay(ctx, OverlayConfig::new().stop_document_scroll(true), menu, value)
    }

    /// A menu over a caller-supplied overlay configuration. The overlay's
    /// transition is replaced by [`MenuConfig::computed_transition`].
    pub fn with_overlay(
        ctx: &StackContext,
        overlay: OverlayConfig,
        menu: MenuConfig,
        value: V,
    ) -> Self {
        let overlay = Overlay::new(
            ctx,
            overlay.transition(menu.computed_transition()),
            value,
        );
        let shared = Rc::new(MenuShared {
            ctx: ctx.clone(),
            config: RefCell::new(menu),
            style: Cell::new(MenuStyle::Hidden),
            attempts: Cell::new(0),
            resize_timer: Cell::new(None),
            retry_timer: Cell::new(None),
        });

        let weak_shared = Rc::downgrade(&shared);
        let weak_overlay = overlay.downgrade();
        let events = overlay.subscribe(move |event| {
            let Some(shared) = weak_shared.upgrade() else {
                return;
            };
            match event {
                OverlayEvent::ContentReady => {
                    if let Some(overlay) = weak_overlay.upgrade() {
                        shared.attempts.set(0);
                        update(&shared, &overlay);
                    }
                }
                OverlayEvent::Close => shared.cancel_timers(),
                _ => {}
            }
        });

        let weak_shared = Rc::downgrade(&shared);
        let weak_overlay = overlay.downgrade();
        let resized = ctx.on_resize(move |_| on_resize(&weak_shared, &weak_overlay));

        Self {
            overlay,
            shared,
            _subscriptions: Rc::new([events, resized]),
        }
    }

    /// Measure again now. Resets the retry budget.
    pub fn invalidate(&self) -> MenuStyle {
        self.shared.attempts.set(0);
        update(&self.shared, &self.overlay)
    }

    /// Replace the geometry options and recompute.
    pub fn set_config(&self, menu: MenuConfig) -> MenuStyle {
        let transition = menu.computed_transition();
        self.overlay.update_config(|config| config.transition = transition);
        self.shared.config.replace(menu);
        self.invalidate()
    }

    /// Current measurement inputs, if the menu is measurable.
    pub fn geometry(&self) -> Option<MenuGeometry> {
        measure(&self.overlay, &self.shared.config.borrow())
    }
}

impl<V> Menu<V> {
    pub fn overlay(&self) -> &Overlay<V> {
        &self.overlay
    }

    pub fn config(&self) -> MenuConfig {
        self.shared.config.borrow().clone()
    }

    /// Result of the last recomputation.
    pub fn style(&self) -> MenuStyle {
        self.shared.style.get()
    }
}

impl<V: Clone + PartialEq + 'static> Activatable for Menu<V> {
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

impl<V: Clone + PartialEq + 'static> Themed for Menu<V> {
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
    use crate::stack::overlay::ContentRefs;
    use vstack_core::event::ElementId;
    use vstack_core::geometry::{Point, Rect, Size};
    use vstack_core::testing::MemoryHost;

    struct Fixture {
        host: Rc<MemoryHost>,
        ctx: StackContext,
        anchor: ElementId,
        content: ElementId,
    }

    fn fixture() -> Fixture {
        let host = Rc::new(MemoryHost::new(Size::new(800.0, 600.0)));
        host.add_container();
        let ctx = StackContext::builder(host.clone()).build().expect("context");
        let anchor = host.add_element(host.body(), Rect::new(100.0, 100.0, 80.0, 20.0));
        let content = host.create_detached(Rect::new(0.0, 0.0, 0.0, 0.0));
        host.set_natural_size(content, Size::new(150.0, 200.0));
        Fixture {
            host,
            ctx,
            anchor,
            content,
        }
    }

    fn open(f: &Fixture, menu: &Menu<()>) {
        menu.overlay().show_from(f.anchor);
        f.ctx.scheduler().run_due();
        menu.overlay().mount(ContentRefs::new(f.content));
    }

    #[test]
    fn content_ready_positions_below_anchor() {
        let f = fixture();
        let menu = Menu::new(&f.ctx, MenuConfig::new(), ());
        assert!(menu.style().is_hidden());
        open(&f, &menu);
        assert_eq!(
            menu.style(),
            MenuStyle::Positioned(Rect::new(65.0, 130.0, 150.0, 200.0))
        );
    }

    #[test]
    fn transition_follows_placement() {
        let f = fixture();
        let menu = Menu::new(&f.ctx, MenuConfig::new().placement(Placement::TOP), ());
        assert_eq!(menu.overlay().config().transition, "v-stack-slide-y-reverse");
        menu.set_config(MenuConfig::new().transition("fade"));
        assert_eq!(menu.overlay().config().transition, "fade");
    }

    #[test]
    fn menus_lock_scroll_by_default() {
        let f = fixture();
        let menu = Menu::new(&f.ctx, MenuConfig::new(), ());
        assert!(menu.overlay().config().stop_document_scroll);
        open(&f, &menu);
        assert!(f.ctx.is_scroll_locked());
    }

    #[test]
    fn invalidate_picks_up_scroll() {
        let f = fixture();
        let menu = Menu::new(&f.ctx, MenuConfig::new(), ());
        open(&f, &menu);
        f.host.set_scroll(Point::new(0.0, 50.0));
        let rect = menu.invalidate().rect().expect("positioned");
        assert_eq!(rect.y, 180.0);
    }

    #[test]
    fn detached_anchor_hides_with_bounded_retries() {
        let f = fixture();
        let menu = Menu::new(&f.ctx, MenuConfig::new(), ());
        open(&f, &menu);
        f.host.detach(f.anchor);
        assert!(menu.invalidate().is_hidden());

        let mut frames = 0;
        while f.ctx.scheduler().run_frame() > 0 {
            frames += 1;
        }
        assert_eq!(frames, MEASURE_ATTEMPTS - 1);
        assert!(menu.style().is_hidden());
    }

    #[test]
    fn retry_recovers_once_measurable() {
        let f = fixture();
        let menu = Menu::new(&f.ctx, MenuConfig::new(), ());
        open(&f, &menu);
        f.host.set_natural_size(f.content, Size::ZERO);
        assert!(menu.invalidate().is_hidden());
        f.host.set_natural_size(f.content, Size::new(150.0, 200.0));
        f.ctx.scheduler().run_frame();
        assert!(!menu.style().is_hidden());
    }

    #[test]
    fn resize_is_debounced_while_open() {
        let f = fixture();
        let menu = Menu::new(&f.ctx, MenuConfig::new(), ());
        open(&f, &menu);
        let before = menu.style();

        f.host.set_viewport(Size::new(200.0, 600.0));
        f.ctx.handle_resize();
        f.ctx.scheduler().advance(Duration::from_millis(100));
        f.ctx.handle_resize();
        f.ctx.scheduler().advance(Duration::from_millis(200));
        assert_eq!(menu.style(), before);
        f.ctx.scheduler().advance(Duration::from_millis(50));
        let rect = menu.style().rect().expect("positioned");
        assert!(rect.right() <= 180.0);
    }

    #[test]
    fn resize_ignored_while_closed() {
        let f = fixture();
        let menu = Menu::new(&f.ctx, MenuConfig::new(), ());
        f.ctx.handle_resize();
        assert_eq!(f.ctx.scheduler().pending(), 0);
        assert!(menu.style().is_hidden());
    }

    #[test]
    fn declarations_reflect_style() {
        let hidden = MenuStyle::Hidden.declarations();
        assert!(hidden.contains(&("visibility", "hidden".to_owned())));
        let placed = MenuStyle::Positioned(Rect::new(1.0, 2.0, 3.0, 4.0)).declarations();
        assert!(placed.contains(&("left", "1px".to_owned())));
        assert!(placed.contains(&("height", "4px".to_owned())));
    }
}
