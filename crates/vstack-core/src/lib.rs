#![forbid(unsafe_code)]

//! Core types for the vstack overlay engine.
//!
//! This crate holds everything the engine needs to talk about the page
//! without touching it directly:
//!
//! - [`geometry`]: `f64` rectangles, points and sizes in CSS pixels.
//! - [`event`]: element handles and the input events the engine consumes.
//! - [`host`]: the [`Host`] trait, the engine's only path to the document.
//! - [`error`]: the configuration / host error taxonomy.
//! - [`settings`]: process-wide defaults (z-index base, strings, dialog and
//!   snackbar defaults).
//!
//! With the `test-helpers` feature, [`testing::MemoryHost`] provides an
//! in-memory document for tests.

pub mod error;
pub mod event;
pub mod geometry;
pub mod host;
pub mod settings;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use error::{HostError, StackError};
pub use event::{ActivateSource, ElementId, Key, KeyInput, PointerInput, TargetKind};
pub use geometry::{Point, Rect, Size};
pub use host::{DocumentRoot, HeadlessHost, Host};
pub use settings::{DialogDefaults, SnackbarDefaults, StackSettings, Strings, ThemeName};
