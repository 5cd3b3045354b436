#![forbid(unsafe_code)]

//! Anchor-relative menu rectangle.
//!
//! # Algorithm
//!
//! 1. Size: explicit width/height, or `Fit` = `max(content, anchor)`, then
//!    clamped to the maximums (`Fit` as a maximum means the anchor size).
//! 2. Placement: `BOTTOM` puts the panel's top at the anchor's bottom, `TOP`
//!    puts its bottom at the anchor's top, and likewise `LEFT` / `RIGHT` on the
//!    horizontal axis. An axis with no flag is centred on the anchor.
//! 3. Offset by the page scroll, then push outward by `distance` on every
//!    axis that has a placement flag.
//! 4. Shift inside `[edge_margin, viewport - edge_margin]`: trailing edges
//!    (right, bottom) first, then leading edges (left, top).
//! 5. Unless `allow_overflow`, shrink whatever still sticks out past the
//!    trailing edges.
//!
//! # Invariants
//!
//! - Without `allow_overflow`, and with a viewport wider and taller than two
//!   margins, the result lies inside the margin box.
//! - Width and height are never negative.
//! - A panel that already fits is moved, never resized.
//!
//! # Failure Modes
//!
//! - Conflicting flags (`TOP | BOTTOM`, `LEFT | RIGHT`) log a warning and
//!   resolve to below / horizontally centred.

use std::time::Duration;

use bitflags::bitflags;
use tracing::warn;
use vstack_core::geometry::{Point, Rect, Size};

/// Gap between anchor and panel.
pub const DEFAULT_DISTANCE: f64 = 10.0;

/// Minimum distance kept from each viewport edge.
pub const DEFAULT_EDGE_MARGIN: f64 = 20.0;

/// How long a menu waits after the last resize before recomputing.
pub const DEFAULT_RESIZE_DEBOUNCE: Duration = Duration::from_millis(250);

/// The computed panel rectangle, in page coordinates.
pub type MenuRect = Rect;

bitflags! {
    /// Which side(s) of the anchor the panel opens on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Placement: u8 {
        const TOP    = 0b0001;
        const BOTTOM = 0b0010;
        const LEFT   = 0b0100;
        const RIGHT  = 0b1000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    /// Above / left of the anchor.
    Before,
    /// Below / right of the anchor.
    After,
    Center,
}

impl Placement {
    /// Resolve to one side per axis.
    fn sides(self) -> (Side, Side) {
        let flags = if self.is_empty() { Self::BOTTOM } else { self };

        let vertical = match (flags.contains(Self::TOP), flags.contains(Self::BOTTOM)) {
            (true, true) => {
                warn!(?flags, "top and bottom cannot both be set; using bottom");
                Side::After
            }
            (true, false) => Side::Before,
            (false, true) => Side::After,
            (false, false) => Side::Center,
        };

        let horizontal = match (flags.contains(Self::LEFT), flags.contains(Self::RIGHT)) {
            (true, true) => {
                warn!(?flags, "left and right cannot both be set; centring");
                Side::Center
            }
            (true, false) => Side::Before,
            (false, true) => Side::After,
            (false, false) => Side::Center,
        };

        (vertical, horizontal)
    }
}

/// Panel sizing along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MenuSize {
    /// Use the content's natural size (as a maximum: unbounded).
    #[default]
    Auto,
    Fixed(f64),
    /// As a size: the larger of content and anchor. As a maximum: the anchor.
    Fit,
}

/// Everything [`compute_menu_rect`] needs.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuGeometry {
    /// Viewport-relative anchor rectangle.
    pub anchor: Rect,
    /// Natural size of the panel content.
    pub content: Size,
    pub viewport: Size,
    /// Page scroll offset at measurement time.
    pub scroll: Point,
    pub placement: Placement,
    pub distance: f64,
    pub edge_margin: f64,
    pub width: MenuSize,
    pub height: MenuSize,
    pub max_width: MenuSize,
    pub max_height: MenuSize,
    pub allow_overflow: bool,
}

impl MenuGeometry {
    /// Geometry with default placement (bottom), distance and margin.
    pub fn new(anchor: Rect, content: Size, viewport: Size) -> Self {
        Self {
            anchor,
            content,
            viewport,
            scroll: Point::ZERO,
            placement: Placement::BOTTOM,
            distance: DEFAULT_DISTANCE,
            edge_margin: DEFAULT_EDGE_MARGIN,
            width: MenuSize::Auto,
            height: MenuSize::Auto,
            max_width: MenuSize::Auto,
            max_height: MenuSize::Auto,
            allow_overflow: false,
        }
    }

    #[must_use]
    pub fn scroll(mut self, scroll: Point) -> Self {
        self.scroll = scroll;
        self
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
}

fn resolve_size(size: MenuSize, natural: f64, anchor: f64) -> f64 {
    match size {
        MenuSize::Auto => natural,
        MenuSize::Fixed(v) => v,
        MenuSize::Fit => natural.max(anchor),
    }
}

fn resolve_max(max: MenuSize, anchor: f64) -> Option<f64> {
    match max {
        MenuSize::Auto => None,
        MenuSize::Fixed(v) => Some(v),
        MenuSize::Fit => Some(anchor),
    }
}

/// Position one axis: leading coordinate before scroll and distance.
fn place(side: Side, anchor_start: f64, anchor_len: f64, len: f64) -> f64 {
    match side {
        Side::Before => anchor_start - len,
        Side::After => anchor_start + anchor_len,
        Side::Center => anchor_start - (len - anchor_len) / 2.0,
    }
}

fn outward(side: Side, distance: f64) -> f64 {
    match side {
        Side::Before => -distance,
        Side::After => distance,
        Side::Center => 0.0,
    }
}

/// Fit one axis into `[min, max]`: shift trailing, shift leading, then
/// optionally shrink. Returns `(start, len)`.
fn clamp_axis(mut start: f64, mut len: f64, min: f64, max: f64, shrink: bool) -> (f64, f64) {
    let trailing = start + len - max;
    if trailing > 0.0 {
        start -= trailing;
    }
    let leading = min - start;
    if leading > 0.0 {
        start += leading;
    }
    if shrink {
        let overflow = start + len - max;
        if overflow > 0.0 {
            len -= overflow;
        }
    }
    (start, len.max(0.0))
}

/// Compute the panel rectangle in page coordinates.
pub fn compute_menu_rect(geom: &MenuGeometry) -> MenuRect {
    let (vertical, horizontal) = geom.placement.sides();
    let anchor = geom.anchor;

    let mut width = resolve_size(geom.width, geom.content.width, anchor.width);
    let mut height = resolve_size(geom.height, geom.content.height, anchor.height);
    if let Some(max) = resolve_max(geom.max_width, anchor.width)
        && width > max
    {
        width = max;
    }
    if let Some(max) = resolve_max(geom.max_height, anchor.height)
        && height > max
    {
        height = max;
    }

    let top = place(vertical, anchor.top(), anchor.height, height)
        + geom.scroll.y
        + outward(vertical, geom.distance);
    let left = place(horizontal, anchor.left(), anchor.width, width)
        + geom.scroll.x
        + outward(horizontal, geom.distance);

    let margin = geom.edge_margin;
    let shrink = !geom.allow_overflow;
    let (left, width) = clamp_axis(
        left,
        width,
        margin + geom.scroll.x,
        geom.viewport.width - margin + geom.scroll.x,
        shrink,
    );
    let (top, height) = clamp_axis(
        top,
        height,
        margin + geom.scroll.y,
        geom.viewport.height - margin + geom.scroll.y,
        shrink,
    );

    Rect::new(left, top, width, height)
}

/// Transition name matching the side the panel opens on.
///
/// A vertical edge wins over a horizontal one, and a right edge wins over a
/// left one even when both are set.
pub fn auto_transition(placement: Placement) -> &'static str {
    match placement.sides() {
        (Side::After, _) => "v-stack-slide-y",
        (Side::Before, _) => "v-stack-slide-y-reverse",
        (Side::Center, _) if placement.contains(Placement::RIGHT) => "v-stack-slide-x",
        (Side::Center, _) => "v-stack-slide-x-reverse",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const VIEWPORT: Size = Size::new(800.0, 600.0);

    fn anchor(left: f64) -> Rect {
        Rect::new(left, 50.0, 80.0, 20.0)
    }

    #[test]
    fn bottom_placement_centres_and_offsets() {
        let geom = MenuGeometry::new(anchor(100.0), Size::new(150.0, 40.0), VIEWPORT);
        let r = compute_menu_rect(&geom);
        assert_eq!(r.top(), 80.0);
        assert_eq!(r.left(), 65.0);
        assert_eq!(r.size(), Size::new(150.0, 40.0));
    }

    #[test]
    fn right_edge_shifts_by_exact_overflow() {
        let geom = MenuGeometry::new(anchor(780.0), Size::new(150.0, 40.0), VIEWPORT);
        let r = compute_menu_rect(&geom);
        assert_eq!(r.right(), 780.0);
        assert_eq!(r.left(), 630.0);
        assert_eq!(r.width, 150.0);
    }

    #[test]
    fn empty_flags_default_to_bottom() {
        let a = MenuGeometry::new(anchor(100.0), Size::new(150.0, 40.0), VIEWPORT)
            .placement(Placement::empty());
        let b = a.clone().placement(Placement::BOTTOM);
        assert_eq!(compute_menu_rect(&a), compute_menu_rect(&b));
    }

    #[test]
    fn conflicting_vertical_flags_prefer_bottom() {
        let geom = MenuGeometry::new(anchor(100.0), Size::new(150.0, 40.0), VIEWPORT)
            .placement(Placement::TOP | Placement::BOTTOM);
        assert_eq!(compute_menu_rect(&geom).top(), 80.0);
    }

    #[test]
    fn conflicting_horizontal_flags_centre() {
        let geom = MenuGeometry::new(anchor(300.0), Size::new(100.0, 40.0), VIEWPORT)
            .placement(Placement::BOTTOM | Placement::LEFT | Placement::RIGHT);
        assert_eq!(compute_menu_rect(&geom).left(), 290.0);
    }

    #[test]
    fn top_placement_goes_above() {
        let a = Rect::new(300.0, 300.0, 80.0, 20.0);
        let geom = MenuGeometry::new(a, Size::new(100.0, 40.0), VIEWPORT).placement(Placement::TOP);
        let r = compute_menu_rect(&geom);
        assert_eq!(r.bottom(), 290.0);
    }

    #[test]
    fn right_only_centres_vertically() {
        let a = Rect::new(300.0, 300.0, 80.0, 20.0);
        let geom =
            MenuGeometry::new(a, Size::new(100.0, 40.0), VIEWPORT).placement(Placement::RIGHT);
        let r = compute_menu_rect(&geom);
        assert_eq!(r.left(), 390.0);
        assert_eq!(r.top(), 290.0);
    }

    #[test]
    fn left_and_bottom_combine() {
        let a = Rect::new(300.0, 300.0, 80.0, 20.0);
        let geom = MenuGeometry::new(a, Size::new(100.0, 40.0), VIEWPORT)
            .placement(Placement::LEFT | Placement::BOTTOM);
        let r = compute_menu_rect(&geom);
        assert_eq!(r.right(), 290.0);
        assert_eq!(r.top(), 330.0);
    }

    #[test]
    fn scroll_offset_moves_into_page_space() {
        let geom = MenuGeometry::new(anchor(100.0), Size::new(150.0, 40.0), VIEWPORT)
            .scroll(Point::new(0.0, 1000.0));
        let r = compute_menu_rect(&geom);
        assert_eq!(r.top(), 1080.0);
    }

    #[test]
    fn fit_uses_larger_of_content_and_anchor() {
        let geom = MenuGeometry::new(anchor(100.0), Size::new(50.0, 40.0), VIEWPORT)
            .width(MenuSize::Fit);
        assert_eq!(compute_menu_rect(&geom).width, 80.0);

        let geom = MenuGeometry::new(anchor(100.0), Size::new(120.0, 40.0), VIEWPORT)
            .width(MenuSize::Fit);
        assert_eq!(compute_menu_rect(&geom).width, 120.0);
    }

    #[test]
    fn fit_as_maximum_caps_at_anchor() {
        let geom = MenuGeometry::new(anchor(100.0), Size::new(150.0, 40.0), VIEWPORT)
            .max_width(MenuSize::Fit);
        assert_eq!(compute_menu_rect(&geom).width, 80.0);
    }

    #[test]
    fn explicit_size_is_clamped_by_max() {
        let geom = MenuGeometry::new(anchor(100.0), Size::new(150.0, 40.0), VIEWPORT)
            .width(MenuSize::Fixed(300.0))
            .max_width(MenuSize::Fixed(200.0))
            .height(MenuSize::Fixed(90.0));
        let r = compute_menu_rect(&geom);
        assert_eq!(r.width, 200.0);
        assert_eq!(r.height, 90.0);
    }

    #[test]
    fn oversized_panel_shrinks_unless_overflow_allowed() {
        let content = Size::new(1000.0, 40.0);
        let geom = MenuGeometry::new(anchor(100.0), content, VIEWPORT);
        let r = compute_menu_rect(&geom);
        assert_eq!(r.left(), 20.0);
        assert_eq!(r.right(), 780.0);

        let r = compute_menu_rect(&geom.allow_overflow(true));
        assert_eq!(r.left(), 20.0);
        assert_eq!(r.width, 1000.0);
    }

    #[test]
    fn auto_transition_follows_placement() {
        assert_eq!(auto_transition(Placement::BOTTOM), "v-stack-slide-y");
        assert_eq!(auto_transition(Placement::empty()), "v-stack-slide-y");
        assert_eq!(auto_transition(Placement::TOP), "v-stack-slide-y-reverse");
        assert_eq!(auto_transition(Placement::RIGHT), "v-stack-slide-x");
        assert_eq!(auto_transition(Placement::LEFT), "v-stack-slide-x-reverse");
    }

    #[test]
    fn auto_transition_prefers_right_when_both_horizontal_edges_set() {
        assert_eq!(
            auto_transition(Placement::LEFT | Placement::RIGHT),
            "v-stack-slide-x"
        );
        assert_eq!(
            auto_transition(Placement::TOP | Placement::LEFT | Placement::RIGHT),
            "v-stack-slide-y-reverse"
        );
    }

    fn placement_strategy() -> impl Strategy<Value = Placement> {
        (0u8..16).prop_map(Placement::from_bits_truncate)
    }

    proptest! {
        #[test]
        fn clamped_rect_stays_inside_margins(
            ax in -200.0f64..1000.0,
            ay in -200.0f64..800.0,
            aw in 0.0f64..300.0,
            ah in 0.0f64..100.0,
            cw in 0.0f64..1200.0,
            ch in 0.0f64..900.0,
            sx in 0.0f64..500.0,
            sy in 0.0f64..500.0,
            placement in placement_strategy(),
        ) {
            let geom = MenuGeometry::new(Rect::new(ax, ay, aw, ah), Size::new(cw, ch), VIEWPORT)
                .scroll(Point::new(sx, sy))
                .placement(placement);
            let r = compute_menu_rect(&geom);
            let eps = 1e-9;
            prop_assert!(r.width >= 0.0 && r.height >= 0.0);
            prop_assert!(r.left() >= 20.0 + sx - eps);
            prop_assert!(r.top() >= 20.0 + sy - eps);
            prop_assert!(r.right() <= 780.0 + sx + eps);
            prop_assert!(r.bottom() <= 580.0 + sy + eps);
        }

        #[test]
        fn fitting_panel_keeps_its_size(
            ax in 0.0f64..800.0,
            ay in 0.0f64..600.0,
            cw in 0.0f64..760.0,
            ch in 0.0f64..560.0,
            placement in placement_strategy(),
        ) {
            let geom = MenuGeometry::new(Rect::new(ax, ay, 10.0, 10.0), Size::new(cw, ch), VIEWPORT)
                .placement(placement);
            let r = compute_menu_rect(&geom);
            prop_assert!((r.width - cw).abs() < 1e-9);
            prop_assert!((r.height - ch).abs() < 1e-9);
        }
    }
}
