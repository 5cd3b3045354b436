#![forbid(unsafe_code)]

//! Menus and tooltips driven through activator input, mounted content and
//! viewport changes.

use std::rc::Rc;
use std::time::Duration;

use vstack_core::event::{ElementId, PointerInput};
use vstack_core::geometry::{Rect, Size};
use vstack_core::testing::MemoryHost;
use vstack_layout::Placement;
use vstack_widgets::{
    Activatable, ContentRefs, Menu, MenuConfig, MenuStyle, StackContext, Tooltip,
    TransitionSignal,
};

struct Page {
    host: Rc<MemoryHost>,
    ctx: StackContext,
}

impl Page {
    fn new() -> Self {
        let host = Rc::new(MemoryHost::new(Size::new(800.0, 600.0)));
        host.add_container();
        let ctx = StackContext::builder(host.clone()).build().expect("context");
        Self { host, ctx }
    }

    fn anchor(&self, rect: Rect) -> ElementId {
        self.host.add_element(self.host.body(), rect)
    }

    fn content(&self, width: f64, height: f64) -> ElementId {
        let content = self.host.create_detached(Rect::new(0.0, 0.0, 0.0, 0.0));
        self.host.set_natural_size(content, Size::new(width, height));
        content
    }
}

#[test]
fn click_opens_positions_and_toggles() {
    let page = Page::new();
    let anchor = page.anchor(Rect::new(100.0, 100.0, 80.0, 20.0));
    let content = page.content(150.0, 200.0);
    let menu = Menu::new(&page.ctx, MenuConfig::new(), ());

    menu.overlay().activator_click(PointerInput::on(anchor));
    page.ctx.scheduler().run_due();
    assert!(menu.active());
    assert_eq!(menu.overlay().activator(), Some(anchor));
    assert!(menu.style().is_hidden());

    menu.overlay().mount(ContentRefs::new(content));
    assert_eq!(
        menu.style(),
        MenuStyle::Positioned(Rect::new(65.0, 130.0, 150.0, 200.0))
    );

    menu.overlay().activator_click(PointerInput::on(anchor));
    assert!(!menu.active());
}

#[test]
fn trailing_edge_is_pulled_inside_the_margin() {
    let page = Page::new();
    let anchor = page.anchor(Rect::new(700.0, 100.0, 80.0, 20.0));
    let content = page.content(150.0, 200.0);
    let menu = Menu::new(
        &page.ctx,
        MenuConfig::new().placement(Placement::BOTTOM | Placement::RIGHT),
        (),
    );
    menu.overlay().show_from(anchor);
    page.ctx.scheduler().run_due();
    menu.overlay().mount(ContentRefs::new(content));
    assert_eq!(
        menu.style().rect(),
        Some(Rect::new(630.0, 130.0, 150.0, 200.0))
    );
}

#[test]
fn top_placement_opens_upwards() {
    let page = Page::new();
    let anchor = page.anchor(Rect::new(100.0, 300.0, 80.0, 20.0));
    let content = page.content(150.0, 200.0);
    let menu = Menu::new(&page.ctx, MenuConfig::new().placement(Placement::TOP), ());
    menu.overlay().show_from(anchor);
    page.ctx.scheduler().run_due();
    menu.overlay().mount(ContentRefs::new(content));
    assert_eq!(menu.style().rect(), Some(Rect::new(65.0, 90.0, 150.0, 200.0)));
}

#[test]
fn outside_click_closes_inside_click_does_not() {
    let page = Page::new();
    let anchor = page.anchor(Rect::new(100.0, 100.0, 80.0, 20.0));
    let elsewhere = page.anchor(Rect::new(400.0, 400.0, 10.0, 10.0));
    let content = page.content(150.0, 200.0);
    let item = page
        .host
        .add_element(content, Rect::new(0.0, 0.0, 150.0, 30.0));
    let menu = Menu::new(&page.ctx, MenuConfig::new(), ());
    menu.overlay().show_from(anchor);
    page.ctx.scheduler().run_due();
    menu.overlay().mount(ContentRefs::new(content));
    menu.overlay().transition(TransitionSignal::AfterEnter);

    assert!(!menu.overlay().handle_outside_click(PointerInput::on(item)));
    assert!(!menu.overlay().handle_outside_click(PointerInput::on(anchor)));
    assert!(menu.overlay().handle_outside_click(PointerInput::on(elsewhere)));
    assert!(!menu.active());
    assert!(!page.ctx.is_scroll_locked());
}

#[test]
fn window_resize_repositions_after_debounce() {
    let page = Page::new();
    let anchor = page.anchor(Rect::new(100.0, 100.0, 80.0, 20.0));
    let content = page.content(150.0, 200.0);
    let menu = Menu::new(&page.ctx, MenuConfig::new(), ());
    menu.overlay().show_from(anchor);
    page.ctx.scheduler().run_due();
    menu.overlay().mount(ContentRefs::new(content));

    page.host.set_viewport(Size::new(800.0, 250.0));
    page.ctx.handle_resize();
    let before = menu.style().rect().expect("positioned");
    assert_eq!(before.height, 200.0);

    page.ctx.scheduler().advance(Duration::from_millis(250));
    let after = menu.style().rect().expect("positioned");
    assert_eq!(after.bottom(), 230.0);
}

#[test]
fn tooltip_stays_open_while_pointer_moves_into_it() {
    let page = Page::new();
    let anchor = page.anchor(Rect::new(100.0, 100.0, 80.0, 20.0));
    let content = page.content(120.0, 30.0);
    let tip = Tooltip::new(&page.ctx, MenuConfig::new(), ());

    tip.overlay().pointer_enter(PointerInput::on(anchor));
    page.ctx.scheduler().run_until_idle();
    assert!(tip.active());
    tip.overlay().mount(ContentRefs::new(content));
    assert!(tip.menu_style().rect().is_some());

    tip.overlay()
        .pointer_leave(PointerInput::on(anchor).related(content));
    page.ctx.scheduler().run_until_idle();
    assert!(tip.active());

    tip.overlay().pointer_leave(PointerInput::on(content));
    page.ctx.scheduler().run_until_idle();
    assert!(!tip.active());
}
