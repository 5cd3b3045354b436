#![forbid(unsafe_code)]

//! Cooperative runtime primitives for the vstack overlay engine.
//!
//! - [`Scheduler`]: a virtual-clock event loop with next-turn tasks,
//!   timeouts and animation frames. The host drives it.
//! - [`Emitter`] / [`Subscription`]: synchronous notifications with RAII
//!   unsubscription.
//! - [`promise`]: a one-shot [`Promise`] settled through a [`Resolver`].
//!
//! # Architecture
//!
//! Everything is single-threaded (`Rc<RefCell<..>>`) and nothing here is
//! `Send`. Callbacks always run with no internal borrow held, so a callback
//! may schedule, clear or emit re-entrantly.

pub mod emitter;
pub mod promise;
pub mod scheduler;

pub use emitter::{Emitter, Subscription};
pub use promise::{Promise, Resolver};
pub use scheduler::{Scheduler, TimerId};
