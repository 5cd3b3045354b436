#![forbid(unsafe_code)]

//! One-shot promise.
//!
//! [`pair`] returns a [`Resolver`] and its [`Promise`]. The promise is a
//! plain [`Future`] and can also be polled synchronously with
//! [`Promise::try_take`], which is how the engine's own tests read results
//! without an executor.
//!
//! # Failure Modes
//!
//! - Dropping the [`Resolver`] without resolving settles the promise with
//!   `None` (abandoned) instead of leaving it pending forever.
//! - Resolving after the [`Promise`] was dropped is a silent no-op.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

enum State<T> {
    Pending,
    Ready(Option<T>),
    Taken,
}

struct Slot<T> {
    state: State<T>,
    waker: Option<Waker>,
    promise_alive: bool,
}

/// Create a connected resolver / promise pair.
pub fn pair<T>() -> (Resolver<T>, Promise<T>) {
    let slot = Rc::new(RefCell::new(Slot {
        state: State::Pending,
        waker: None,
        promise_alive: true,
    }));
    (
        Resolver {
            slot: Some(Rc::clone(&slot)),
        },
        Promise { slot },
    )
}

/// Settles a [`Promise`] exactly once.
pub struct Resolver<T> {
    slot: Option<Rc<RefCell<Slot<T>>>>,
}

impl<T> Resolver<T> {
    /// Settle the promise with `value`.
    pub fn resolve(mut self, value: T) {
        self.settle(Some(value));
    }

    /// Whether the promise side has been dropped.
    pub fn is_abandoned(&self) -> bool {
        self.slot
            .as_ref()
            .is_none_or(|slot| !slot.borrow().promise_alive)
    }

    fn settle(&mut self, value: Option<T>) {
        let Some(slot) = self.slot.take() else {
            return;
        };
        let waker = {
            let mut slot = slot.borrow_mut();
            if matches!(slot.state, State::Pending) {
                slot.state = State::Ready(value);
            }
            slot.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl<T> Drop for Resolver<T> {
    fn drop(&mut self) {
        self.settle(None);
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("settled", &self.slot.is_none())
            .finish()
    }
}

/// The receiving half of [`pair`].
///
/// Resolves to `Some(value)`, or `None` if the resolver was dropped first.
pub struct Promise<T> {
    slot: Rc<RefCell<Slot<T>>>,
}

impl<T> Promise<T> {
    /// Whether a value (or abandonment) is waiting to be taken.
    pub fn is_settled(&self) -> bool {
        matches!(self.slot.borrow().state, State::Ready(_))
    }

    /// Take the outcome if the promise has settled.
    ///
    /// Returns `None` while pending and after the outcome was taken.
    pub fn try_take(&mut self) -> Option<Option<T>> {
        let mut slot = self.slot.borrow_mut();
        match std::mem::replace(&mut slot.state, State::Taken) {
            State::Ready(value) => Some(value),
            other => {
                slot.state = other;
                None
            }
        }
    }
}

impl<T> Future for Promise<T> {
    type Output = Option<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.slot.borrow_mut();
        match std::mem::replace(&mut slot.state, State::Taken) {
            State::Ready(value) => Poll::Ready(value),
            State::Pending => {
                slot.state = State::Pending;
                slot.waker = Some(cx.waker().clone());
                Poll::Pending
            }
            State::Taken => Poll::Ready(None),
        }
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.slot.try_borrow_mut() {
            slot.promise_alive = false;
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("settled", &self.is_settled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_then_take() {
        let (tx, mut rx) = pair::<u32>();
        assert!(!rx.is_settled());
        assert_eq!(rx.try_take(), None);
        tx.resolve(5);
        assert!(rx.is_settled());
        assert_eq!(rx.try_take(), Some(Some(5)));
        assert_eq!(rx.try_take(), None);
    }

    #[test]
    fn dropped_resolver_abandons() {
        let (tx, rx) = pair::<u32>();
        drop(tx);
        assert_eq!(pollster::block_on(rx), None);
    }

    #[test]
    fn block_on_resolved() {
        let (tx, rx) = pair::<&'static str>();
        tx.resolve("ok");
        assert_eq!(pollster::block_on(rx), Some("ok"));
    }

    #[test]
    fn resolver_sees_dropped_promise() {
        let (tx, rx) = pair::<()>();
        assert!(!tx.is_abandoned());
        drop(rx);
        assert!(tx.is_abandoned());
        tx.resolve(());
    }
}
