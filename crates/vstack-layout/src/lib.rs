#![forbid(unsafe_code)]

//! Menu positioning for the vstack overlay engine.
//!
//! [`compute_menu_rect`] places a floating panel next to an anchor element
//! and keeps it inside the viewport. It is a pure function of
//! [`MenuGeometry`]; the widget layer decides when to call it again.

pub mod menu;

pub use menu::{
    DEFAULT_DISTANCE, DEFAULT_EDGE_MARGIN, DEFAULT_RESIZE_DEBOUNCE, MenuGeometry, MenuRect,
    MenuSize, Placement, auto_transition, compute_menu_rect,
};
