#![forbid(unsafe_code)]

//! Stackable overlays for the vstack engine.
//!
//! - [`stack`]: the registry, the [`Overlay`] state machine, the
//!   [`StackContext`] that routes page input, and the dynamic container for
//!   pushed dialogs and snackbars.
//! - [`dialog`], [`menu`], [`tooltip`], [`snackbar`], [`panel`]: the overlay
//!   variants, each an [`Overlay`] plus what its renderer needs.
//! - [`capability`]: traits shared across variants.
//!
//! Nothing here renders. A host drives the engine through
//! [`vstack_core::Host`], feeds input into the context, and reports
//! transition milestones back to each overlay.

pub mod capability;
pub mod dialog;
pub mod menu;
pub mod panel;
pub mod snackbar;
pub mod stack;
pub mod tooltip;

pub use capability::{Activatable, ColorContextual, ColorVariant, Themed};
pub use dialog::{ActionEffect, Dialog, DialogAction, DialogDescriptor, DialogKind, DialogSize};
pub use menu::{MEASURE_ATTEMPTS, Menu, MenuConfig, MenuStyle};
pub use panel::Panel;
pub use snackbar::{Snackbar, SnackbarDescriptor, normalize_position};
pub use stack::{
    CloseOptions, CloseState, ContentRefs, DynamicContainer, DynamicOverlay, KeyOutcome,
    OverlayConfig, OverlayDescriptor, OverlayEvent, OverlayPhase, Overlay, PromptOutcome,
    PushFuture, PushId, PushValue, StackContext, StackId, TransitionSignal,
};
pub use tooltip::{Tooltip, TooltipStyle};
