#![forbid(unsafe_code)]

//! Tooltips: hover-activated menus.
//!
//! A tooltip is a [`Menu`] that opens on pointer hover after a 200 ms delay,
//! leaves document scrolling alone and is painted in a contextual colour
//! (grey unless told otherwise) at 90% opacity.

use std::rc::Rc;
use std::time::Duration;

use vstack_core::settings::ThemeName;

use crate::capability::{Activatable, ColorContextual, Themed};
use crate::menu::{Menu, MenuConfig, MenuStyle};
use crate::stack::context::StackContext;
use crate::stack::overlay::{CloseOptions, Overlay, OverlayConfig};
use crate::stack::registry::StackId;

pub const TOOLTIP_OPEN_DELAY: Duration = Duration::from_millis(200);
pub const TOOLTIP_OPACITY: f64 = 0.9;

/// Paint options for a tooltip body.
#[derive(Debug, Clone, PartialEq)]
pub struct TooltipStyle {
    pub color: Option<String>,
    pub outline: bool,
    pub flat: bool,
    pub opacity: f64,
}

impl Default for TooltipStyle {
    fn default() -> Self {
        Self {
            color: None,
            outline: false,
            flat: false,
            opacity: TOOLTIP_OPACITY,
        }
    }
}

impl TooltipStyle {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    #[must_use]
    pub fn outline(mut self, outline: bool) -> Self {
        self.outline = outline;
        self
    }

    #[must_use]
    pub fn flat(mut self, flat: bool) -> Self {
        self.flat = flat;
        self
    }

    #[must_use]
    pub fn opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }
}

/// A hover tooltip.
#[derive(Debug)]
pub struct Tooltip<V> {
    menu: Menu<V>,
    style: Rc<TooltipStyle>,
}

impl<V> Clone for Tooltip<V> {
    fn clone(&self) -> Self {
        Self {
            menu: self.menu.clone(),
            style: Rc::clone(&self.style),
        }
    }
}

impl<V: Clone + PartialEq + 'static> Tooltip<V> {
    pub fn new(ctx: &StackContext, menu: MenuConfig, value: V) -> Self {
        Self::styled(ctx, menu, TooltipStyle::default(), value)
    }

    pub fn styled(ctx: &StackContext, menu: MenuConfig, style: TooltipStyle, value: V) -> Self {
        let overlay = OverlayConfig::new()
            .open_on_hover(true)
            .open_delay(TOOLTIP_OPEN_DELAY);
        Self {
            menu: Menu::with_overlay(ctx, overlay, menu, value),
            style: Rc::new(style),
        }
    }

    /// Measure again now.
    pub fn invalidate(&self) -> MenuStyle {
        self.menu.invalidate()
    }
}

impl<V> Tooltip<V> {
    pub fn menu(&self) -> &Menu<V> {
        &self.menu
    }

    pub fn overlay(&self) -> &Overlay<V> {
        self.menu.overlay()
    }

    pub fn opacity(&self) -> f64 {
        self.style.opacity
    }

    pub fn menu_style(&self) -> MenuStyle {
        self.menu.style()
    }
}

impl<V: Clone + PartialEq + 'static> Activatable for Tooltip<V> {
    fn overlay_id(&self) -> StackId {
        self.menu.overlay_id()
    }

    fn activate(&self) {
        self.menu.activate();
    }

    fn deactivate(&self, opts: CloseOptions) {
        self.menu.deactivate(opts);
    }

    fn active(&self) -> bool {
        self.menu.active()
    }
}

impl<V: Clone + PartialEq + 'static> Themed for Tooltip<V> {
    fn own_theme(&self) -> Option<ThemeName> {
        self.menu.own_theme()
    }

    fn context_theme(&self) -> ThemeName {
        self.menu.context_theme()
    }
}

impl<V> ColorContextual for Tooltip<V> {
    fn color(&self) -> Option<String> {
        self.style.color.clone()
    }

    fn default_color(&self) -> &'static str {
        "gray"
    }

    fn outline(&self) -> bool {
        self.style.outline
    }

    fn flat(&self) -> bool {
        self.style.flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ColorVariant;
    use vstack_core::event::PointerInput;
    use vstack_core::geometry::{Rect, Size};
    use vstack_core::testing::MemoryHost;

    fn ctx() -> (Rc<MemoryHost>, StackContext) {
        let host = Rc::new(MemoryHost::new(Size::new(800.0, 600.0)));
        host.add_container();
        let ctx = StackContext::builder(host.clone()).build().expect("context");
        (host, ctx)
    }

    #[test]
    fn hover_opens_after_delay() {
        let (host, ctx) = ctx();
        let anchor = host.add_element(host.body(), Rect::new(10.0, 10.0, 40.0, 20.0));
        let tip = Tooltip::new(&ctx, MenuConfig::new(), ());
        tip.overlay().pointer_enter(PointerInput::on(anchor));
        ctx.scheduler().advance(Duration::from_millis(199));
        assert!(!tip.active());
        ctx.scheduler().advance(Duration::from_millis(1));
        ctx.scheduler().run_due();
        assert!(tip.active());
        assert_eq!(tip.overlay().activator(), Some(anchor));
        assert!(!ctx.is_scroll_locked());
    }

    #[test]
    fn leave_closes_after_close_delay() {
        let (host, ctx) = ctx();
        let anchor = host.add_element(host.body(), Rect::new(10.0, 10.0, 40.0, 20.0));
        let tip = Tooltip::new(&ctx, MenuConfig::new(), ());
        tip.overlay().pointer_enter(PointerInput::on(anchor));
        ctx.scheduler().run_until_idle();
        assert!(tip.active());
        tip.overlay().pointer_leave(PointerInput::on(anchor));
        ctx.scheduler().run_until_idle();
        assert!(!tip.active());
    }

    #[test]
    fn paint_defaults() {
        let (_host, ctx) = ctx();
        let tip = Tooltip::new(&ctx, MenuConfig::new(), ());
        assert_eq!(tip.computed_color(), "gray");
        assert_eq!(tip.variant(), ColorVariant::Fill);
        assert_eq!(tip.opacity(), 0.9);

        let styled = Tooltip::styled(
            &ctx,
            MenuConfig::new(),
            TooltipStyle::new().color("error").outline(true).opacity(3.0),
            (),
        );
        assert_eq!(styled.computed_color(), "error");
        assert_eq!(styled.variant(), ColorVariant::Outline);
        assert_eq!(styled.opacity(), 1.0);
    }
}
