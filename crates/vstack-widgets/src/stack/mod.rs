#![forbid(unsafe_code)]

//! The overlay stack: registry, instances, context and page side effects.
//!
//! # Architecture
//!
//! ```text
//!   host input ──> StackContext ──> StackRegistry (order, claims)
//!                      │                  ▲
//!                      ▼                  │
//!                  Overlay<V> ────────────┘
//!                      │
//!                      ├─> ScrollLock / FocusTrap (on claim edges)
//!                      └─> DynamicContainer (pushed dialogs, snackbars)
//! ```
//!
//! Everything is single-threaded. The registry only holds weak references
//! to members, so dropping the last handle of an overlay unregisters it.

pub mod context;
pub mod dynamic;
pub mod focus_trap;
pub mod overlay;
pub mod registry;
pub mod scroll_lock;

pub use context::{KeyOutcome, StackContext, StackContextBuilder};
pub use dynamic::{
    DynamicContainer, DynamicOverlay, OverlayDescriptor, PromptOutcome, PushFuture, PushId,
    PushValue,
};
pub use focus_trap::FocusTrap;
pub use overlay::{
    CONTENT_READY_ATTEMPTS, CloseOptions, CloseState, ContentRefs, DEFAULT_CLOSE_DELAY,
    DEFAULT_TRANSITION, Overlay, OverlayConfig, OverlayEvent, OverlayPhase, SHAKE_DURATION,
    TransitionSignal, WeakOverlay,
};
pub use registry::{ClaimEdge, ClaimSet, StackId, StackMember, StackRegistry};
pub use scroll_lock::ScrollLock;
