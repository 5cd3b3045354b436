#![forbid(unsafe_code)]

//! Virtual-clock scheduler.
//!
//! The engine never sleeps or reads the wall clock. It hands work to a
//! [`Scheduler`] and the host moves time forward:
//!
//! - [`Scheduler::advance`] for tests and fixed-step hosts,
//! - [`Scheduler::sync_to`] to follow a real `web_time::Instant`,
//! - [`Scheduler::run_frame`] once per animation frame.
//!
//! # Invariants
//!
//! - Tasks with equal deadlines run in scheduling order.
//! - A cleared task never runs, and clearing is idempotent.
//! - Frame callbacks requested during [`Scheduler::run_frame`] wait for the
//!   next frame.
//! - No `RefCell` borrow is held while a task runs.
//!
//! # Example
//!
//! ```ignore
//! let sched = Scheduler::new();
//! let id = sched.set_timeout(Duration::from_millis(200), || close());
//! sched.advance(Duration::from_millis(100));
//! sched.clear(id); // `close` never runs
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use ahash::AHashMap;
use tracing::trace;
use web_time::Instant;

/// Upper bound on tasks executed by one driving call (`advance`,
/// `run_until_idle`).
pub const IDLE_STEP_LIMIT: usize = 10_000;

type Task = Box<dyn FnOnce()>;

/// Handle to a scheduled task, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Timer(Duration),
    Frame,
}

struct Inner {
    now: Duration,
    next_id: u64,
    origin: Option<Instant>,
    timers: BTreeMap<(Duration, u64), Task>,
    frames: Vec<(u64, Task)>,
    index: AHashMap<u64, Slot>,
}

/// Shared handle to a single-threaded task queue.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<RefCell<Inner>>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Scheduler")
            .field("now", &inner.now)
            .field("timers", &inner.timers.len())
            .field("frames", &inner.frames.len())
            .finish()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Create an empty scheduler at time zero.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                now: Duration::ZERO,
                next_id: 1,
                origin: None,
                timers: BTreeMap::new(),
                frames: Vec::new(),
                index: AHashMap::new(),
            })),
        }
    }

    // --- Scheduling ---

    /// Run `task` on the next turn (the next [`advance`](Self::advance) or
    /// [`run_due`](Self::run_due)).
    pub fn defer(&self, task: impl FnOnce() + 'static) -> TimerId {
        self.set_timeout(Duration::ZERO, task)
    }

    /// Run `task` once `delay` has elapsed.
    pub fn set_timeout(&self, delay: Duration, task: impl FnOnce() + 'static) -> TimerId {
        let mut inner = self.inner.borrow_mut();
        let seq = inner.next_id;
        inner.next_id += 1;
        let deadline = inner.now + delay;
        inner.timers.insert((deadline, seq), Box::new(task));
        inner.index.insert(seq, Slot::Timer(deadline));
        trace!(timer = seq, ?delay, "timer scheduled");
        TimerId(seq)
    }

    /// Run `task` on the next animation frame.
    pub fn request_frame(&self, task: impl FnOnce() + 'static) -> TimerId {
        let mut inner = self.inner.borrow_mut();
        let seq = inner.next_id;
        inner.next_id += 1;
        inner.frames.push((seq, Box::new(task)));
        inner.index.insert(seq, Slot::Frame);
        trace!(timer = seq, "frame requested");
        TimerId(seq)
    }

    /// Cancel a pending task. Returns whether it was still pending.
    pub fn clear(&self, id: TimerId) -> bool {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            match inner.index.remove(&id.0) {
                Some(Slot::Timer(deadline)) => inner.timers.remove(&(deadline, id.0)),
                Some(Slot::Frame) => inner
                    .frames
                    .iter()
                    .position(|(seq, _)| *seq == id.0)
                    .map(|pos| inner.frames.remove(pos).1),
                None => None,
            }
        };
        if removed.is_some() {
            trace!(timer = id.0, "timer cleared");
        }
        // `removed` (and anything the task captured) drops here, outside the borrow.
        removed.is_some()
    }

    /// Whether the task is still waiting to run.
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.inner.borrow().index.contains_key(&id.0)
    }

    // --- Driving ---

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    /// Number of pending timers and frame callbacks.
    pub fn pending(&self) -> usize {
        self.inner.borrow().index.len()
    }

    /// Whether nothing is scheduled.
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Run every timer whose deadline is not after the current time.
    pub fn run_due(&self) -> usize {
        self.advance(Duration::ZERO)
    }

    /// Move time forward by `by`, running due timers in deadline order.
    ///
    /// Timers scheduled by a running task run in the same call if their
    /// deadline still falls inside the window, up to [`IDLE_STEP_LIMIT`]
    /// tasks per call.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let mut ran = 0;
        while ran < IDLE_STEP_LIMIT
            && let Some(task) = self.pop_due(target)
        {
            task();
            ran += 1;
        }
        self.inner.borrow_mut().now = target;
        ran
    }

    /// Advance the clock to match a wall-clock instant.
    ///
    /// The first call pins the origin; later calls advance by the elapsed
    /// time. An instant earlier than the clock only runs due timers.
    pub fn sync_to(&self, instant: Instant) -> usize {
        let (origin, now) = {
            let mut inner = self.inner.borrow_mut();
            let origin = *inner.origin.get_or_insert(instant);
            (origin, inner.now)
        };
        let target = instant.saturating_duration_since(origin);
        self.advance(target.saturating_sub(now))
    }

    /// Run the callbacks requested before this call.
    ///
    /// A callback may clear another callback of the same batch; the cleared
    /// one is skipped.
    pub fn run_frame(&self) -> usize {
        let batch: Vec<u64> = self.inner.borrow().frames.iter().map(|(seq, _)| *seq).collect();
        let mut ran = 0;
        for seq in batch {
            let Some(task) = self.take_frame(seq) else {
                continue;
            };
            task();
            ran += 1;
        }
        ran
    }

    fn take_frame(&self, seq: u64) -> Option<Task> {
        let mut inner = self.inner.borrow_mut();
        inner.index.remove(&seq)?;
        let pos = inner.frames.iter().position(|(s, _)| *s == seq)?;
        trace!(timer = seq, "frame fired");
        Some(inner.frames.remove(pos).1)
    }

    /// Run everything, jumping the clock to each deadline, until no work is
    /// left or [`IDLE_STEP_LIMIT`] tasks have run.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while ran < IDLE_STEP_LIMIT {
            ran += self.run_due();
            let (has_frames, next_deadline) = {
                let inner = self.inner.borrow();
                (
                    !inner.frames.is_empty(),
                    inner.timers.keys().next().map(|(deadline, _)| *deadline),
                )
            };
            if has_frames {
                ran += self.run_frame();
            } else if let Some(deadline) = next_deadline {
                ran += self.advance(deadline.saturating_sub(self.now()));
            } else {
                break;
            }
        }
        ran
    }

    fn pop_due(&self, target: Duration) -> Option<Task> {
        let mut inner = self.inner.borrow_mut();
        let key = *inner.timers.keys().next()?;
        if key.0 > target {
            return None;
        }
        let task = inner.timers.remove(&key)?;
        inner.index.remove(&key.1);
        if key.0 > inner.now {
            inner.now = key.0;
        }
        trace!(timer = key.1, at = ?key.0, "timer fired");
        Some(task)
    }
}
