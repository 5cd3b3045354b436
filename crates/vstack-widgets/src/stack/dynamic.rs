#![forbid(unsafe_code)]

//! Transient overlays created on demand.
//!
//! A [`DynamicContainer`] owns the dialogs and snackbars pushed through
//! [`StackContext::push`] and its helpers. Each push creates an overlay that
//! is already open, correlates it with a [`PushId`], and hands back a
//! [`PushFuture`].
//!
//! # Settlement
//!
//! The payload is captured when the overlay closes: `Some(value)` if it was
//! resolved, `None` otherwise. The future settles with that capture only
//! after the overlay's leave transition finishes, at which point the entry is
//! removed and the overlay destroyed.
//!
//! # Failure Modes
//!
//! - Attaching a second live container to one context is
//!   [`StackError::DuplicateContainer`](vstack_core::error::StackError::DuplicateContainer).
//! - Dropping the container settles every outstanding future with `None`.
//!
//! # Example
//!
//! ```ignore
//! let container = DynamicContainer::attach(&ctx)?;
//! let mut ok = ctx.confirm("Delete the file?")?;
//! container.trigger(ok.id(), 1);
//! // ...host finishes the leave transition...
//! assert_eq!(ok.try_take(), Some(true));
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

use tracing::debug;
use vstack_core::error::Result;
use vstack_runtime::promise::{self, Promise, Resolver};
use vstack_runtime::Subscription;

use super::context::StackContext;
use super::overlay::{CloseOptions, CloseState, Overlay, OverlayConfig, OverlayEvent};
use super::registry::StackId;
use crate::capability::Activatable;
use crate::dialog::{Dialog, DialogDescriptor};
use crate::snackbar::{Snackbar, SnackbarDescriptor};

/// Correlates a push with its overlay and future.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PushId(u64);

impl PushId {
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// Payload carried by pushed overlays.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PushValue {
    #[default]
    Empty,
    Bool(bool),
    Text(String),
}

/// How a prompt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    /// OK with the entered text.
    Submitted(String),
    /// The cancel action.
    Cancelled,
    /// Escape, outside click, navigation or a dropped container.
    Dismissed,
}

impl PromptOutcome {
    pub fn from_payload(payload: Option<PushValue>) -> Self {
        match payload {
            Some(PushValue::Text(text)) => Self::Submitted(text),
            Some(PushValue::Bool(false)) => Self::Cancelled,
            _ => Self::Dismissed,
        }
    }
}

/// What to push.
#[derive(Debug, Clone)]
pub enum OverlayDescriptor {
    Dialog(DialogDescriptor),
    Snackbar(SnackbarDescriptor),
}

impl From<DialogDescriptor> for OverlayDescriptor {
    fn from(descriptor: DialogDescriptor) -> Self {
        Self::Dialog(descriptor)
    }
}

impl From<SnackbarDescriptor> for OverlayDescriptor {
    fn from(descriptor: SnackbarDescriptor) -> Self {
        Self::Snackbar(descriptor)
    }
}

/// A live pushed overlay.
#[derive(Debug, Clone)]
pub enum DynamicOverlay {
    Dialog(Dialog<PushValue>),
    Snackbar(Snackbar<PushValue>),
}

impl DynamicOverlay {
    pub fn overlay(&self) -> &Overlay<PushValue> {
        match self {
            Self::Dialog(dialog) => dialog.overlay(),
            Self::Snackbar(snackbar) => snackbar.overlay(),
        }
    }

    pub fn dialog(&self) -> Option<&Dialog<PushValue>> {
        match self {
            Self::Dialog(dialog) => Some(dialog),
            Self::Snackbar(_) => None,
        }
    }

    pub fn snackbar(&self) -> Option<&Snackbar<PushValue>> {
        match self {
            Self::Snackbar(snackbar) => Some(snackbar),
            Self::Dialog(_) => None,
        }
    }
}

impl Activatable for DynamicOverlay {
    fn overlay_id(&self) -> StackId {
        self.overlay().id()
    }

    fn activate(&self) {
        self.overlay().show();
    }

    fn deactivate(&self, opts: CloseOptions) {
        self.overlay().close(opts);
    }

    fn active(&self) -> bool {
        self.overlay().is_active()
    }
}

// --- Future ---

fn identity(payload: Option<PushValue>) -> Option<PushValue> {
    payload
}

/// Settles when a pushed overlay has finished leaving.
///
/// The raw output is the captured payload; the dialog helpers map it to
/// `()`, `bool` or [`PromptOutcome`].
pub struct PushFuture<T = Option<PushValue>> {
    id: PushId,
    promise: Promise<Option<PushValue>>,
    map: fn(Option<PushValue>) -> T,
}

impl PushFuture {
    fn new(id: PushId, promise: Promise<Option<PushValue>>) -> Self {
        Self {
            id,
            promise,
            map: identity,
        }
    }

    /// Convert the captured payload on settlement.
    pub fn map<U>(self, map: fn(Option<PushValue>) -> U) -> PushFuture<U> {
        PushFuture {
            id: self.id,
            promise: self.promise,
            map,
        }
    }
}

impl<T> PushFuture<T> {
    pub fn id(&self) -> PushId {
        self.id
    }

    pub fn is_settled(&self) -> bool {
        self.promise.is_settled()
    }

    /// Take the outcome without an executor, if settled.
    pub fn try_take(&mut self) -> Option<T> {
        self.promise
            .try_take()
            .map(|payload| (self.map)(payload.flatten()))
    }
}

impl<T> Future for PushFuture<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = &mut *self;
        match Pin::new(&mut this.promise).poll(cx) {
            Poll::Ready(payload) => Poll::Ready((this.map)(payload.flatten())),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> fmt::Debug for PushFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushFuture")
            .field("id", &self.id)
            .field("settled", &self.is_settled())
            .finish()
    }
}

// --- Container ---

struct Entry {
    id: PushId,
    overlay: DynamicOverlay,
    captured: Option<PushValue>,
    resolver: Option<Resolver<Option<PushValue>>>,
    _subscription: Subscription,
}

pub(crate) struct DynamicInner {
    ctx: StackContext,
    this: Weak<DynamicInner>,
    entries: RefCell<Vec<Entry>>,
    next_id: Cell<u64>,
}

impl DynamicInner {
    pub(crate) fn push(&self, descriptor: OverlayDescriptor) -> PushFuture {
        let id = PushId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let open = |config: &mut OverlayConfig| {
            config.active = true;
            config.always_render = true;
        };
        let overlay = match descriptor {
            OverlayDescriptor::Dialog(descriptor) => {
                DynamicOverlay::Dialog(Dialog::build(&self.ctx, descriptor, open))
            }
            OverlayDescriptor::Snackbar(mut descriptor) => {
                descriptor.close_on_esc.get_or_insert(true);
                DynamicOverlay::Snackbar(Snackbar::build(
                    &self.ctx,
                    descriptor,
                    PushValue::Empty,
                    open,
                ))
            }
        };

        let this = self.this.clone();
        let subscription = overlay.overlay().subscribe(move |event| {
            let Some(inner) = this.upgrade() else {
                return;
            };
            match event {
                OverlayEvent::Close => inner.capture(id),
                OverlayEvent::AfterLeave => inner.finish(id),
                _ => {}
            }
        });

        let (resolver, promise) = promise::pair();
        debug!(push = id.0, overlay = overlay.overlay().id().id(), "overlay pushed");
        self.entries.borrow_mut().push(Entry {
            id,
            overlay,
            captured: None,
            resolver: Some(resolver),
            _subscription: subscription,
        });
        PushFuture::new(id, promise)
    }

    fn capture(&self, id: PushId) {
        let mut entries = self.entries.borrow_mut();
        if let Some(entry) = entries.iter_mut().find(|e| e.id == id) {
            entry.captured = entry.overlay.overlay().payload();
        }
    }

    fn finish(&self, id: PushId) {
        let entry = {
            let mut entries = self.entries.borrow_mut();
            let Some(idx) = entries.iter().position(|e| e.id == id) else {
                return;
            };
            entries.remove(idx)
        };
        entry.overlay.overlay().destroy();
        if let Some(resolver) = entry.resolver {
            resolver.resolve(entry.captured);
        }
        debug!(push = id.0, "pushed overlay settled");
    }

    fn get(&self, id: PushId) -> Option<DynamicOverlay> {
        self.entries
            .borrow()
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.overlay.clone())
    }
}

/// Owner of pushed overlays. At most one per context.
pub struct DynamicContainer {
    inner: Rc<DynamicInner>,
}

impl fmt::Debug for DynamicContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicContainer")
            .field("ids", &self.ids())
            .finish()
    }
}

impl DynamicContainer {
    /// Create the container and register it with `ctx`.
    pub fn attach(ctx: &StackContext) -> Result<Self> {
        let inner = Rc::new_cyclic(|this| DynamicInner {
            ctx: ctx.clone(),
            this: this.clone(),
            entries: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        });
        ctx.attach_dynamic(&inner)?;
        debug!("dynamic container attached");
        Ok(Self { inner })
    }

    /// Push directly, without going through the context.
    pub fn push(&self, descriptor: impl Into<OverlayDescriptor>) -> PushFuture {
        self.inner.push(descriptor.into())
    }

    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }

    /// Outstanding pushes in push order.
    pub fn ids(&self) -> Vec<PushId> {
        self.inner.entries.borrow().iter().map(|e| e.id).collect()
    }

    pub fn get(&self, id: PushId) -> Option<DynamicOverlay> {
        self.inner.get(id)
    }

    /// Outstanding overlays in push order, for rendering.
    pub fn entries(&self) -> Vec<(PushId, DynamicOverlay)> {
        self.inner
            .entries
            .borrow()
            .iter()
            .map(|e| (e.id, e.overlay.clone()))
            .collect()
    }

    /// Press a pushed dialog's action. Returns whether an action ran.
    pub fn trigger(&self, id: PushId, action: usize) -> bool {
        match self.inner.get(id) {
            Some(DynamicOverlay::Dialog(dialog)) => dialog.trigger(action),
            _ => false,
        }
    }

    /// Update a pushed prompt's input. Returns whether the push was a dialog.
    pub fn set_input(&self, id: PushId, text: impl Into<String>) -> bool {
        match self.inner.get(id) {
            Some(DynamicOverlay::Dialog(dialog)) => {
                dialog.set_input(text);
                true
            }
            _ => false,
        }
    }

    /// Force-cancel one pushed overlay. Returns whether it was found.
    pub fn dismiss(&self, id: PushId) -> bool {
        let Some(overlay) = self.inner.get(id) else {
            return false;
        };
        overlay.deactivate(CloseOptions::new().force().state(CloseState::Cancelled));
        true
    }

    /// Force-cancel every pushed overlay.
    pub fn dismiss_all(&self) {
        let overlays: Vec<DynamicOverlay> = self
            .inner
            .entries
            .borrow()
            .iter()
            .map(|e| e.overlay.clone())
            .collect();
        for overlay in overlays {
            overlay.deactivate(CloseOptions::new().force().state(CloseState::Cancelled));
        }
    }
}

impl Drop for DynamicContainer {
    fn drop(&mut self) {
        let entries = std::mem::take(&mut *self.inner.entries.borrow_mut());
        if !entries.is_empty() {
            debug!(pending = entries.len(), "dynamic container dropped with pending pushes");
        }
        for entry in entries {
            entry.overlay.overlay().destroy();
        }
    }
}
