#![forbid(unsafe_code)]

//! Headless overlay stacking for dialogs, menus, tooltips, snackbars and
//! panels.
//!
//! This crate re-exports the workspace:
//!
//! - [`core`]: geometry, input events, the [`Host`](core::Host) contract
//!   and settings.
//! - [`layout`]: anchor-relative menu positioning.
//! - [`runtime`]: the scheduler, emitter and promises.
//! - [`widgets`]: the stack context, overlay instances and the widgets
//!   built on them.
//!
//! Most applications only need the [`prelude`].
//!
//! # Example
//!
//! ```ignore
//! use vstack::prelude::*;
//!
//! let ctx = StackContext::builder(host).build()?;
//! let mut answer = ctx.confirm("Discard changes?")?;
//! // ... drive ctx.scheduler() and feed input until the dialog settles
//! ```

pub use vstack_core as core;
pub use vstack_layout as layout;
pub use vstack_runtime as runtime;
pub use vstack_widgets as widgets;

pub use vstack_core::{HostError, StackError};

/// The types most applications reach for.
pub mod prelude {
    pub use vstack_core::{
        ActivateSource, ElementId, Host, Key, KeyInput, PointerInput, Rect, Size, StackSettings,
        ThemeName,
    };
    pub use vstack_layout::Placement;
    pub use vstack_runtime::{Promise, Scheduler};
    pub use vstack_widgets::{
        Activatable, CloseOptions, ColorContextual, ContentRefs, Dialog, DialogDescriptor,
        DynamicContainer, KeyOutcome, Menu, MenuConfig, Overlay, OverlayConfig, OverlayEvent,
        Panel, PromptOutcome, PushValue, Snackbar, SnackbarDescriptor, StackContext, Themed,
        Tooltip, TransitionSignal,
    };
}
