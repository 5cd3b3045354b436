#![forbid(unsafe_code)]

//! Dialog presets built on the overlay instance.
//!
//! A [`Dialog`] is an [`Overlay`] plus what a renderer needs to draw one: an
//! optional header, the content text, a row of [`DialogAction`]s and the
//! resolved width constraints. The presets follow the usual patterns:
//!
//! - Alert: message + OK, resolves `true`
//! - Confirm: message + Cancel/OK, resolves `false` / `true`
//! - Prompt: message + input + Cancel/OK, resolves the entered text
//! - Custom: caller-supplied actions
//!
//! Actions close with `force`, so a persistent dialog still closes when one
//! of its own buttons is pressed.
//!
//! # Example
//!
//! ```ignore
//! let desc = DialogDescriptor::new("Discard changes?")
//!     .header("Unsaved work")
//!     .with_confirm_actions(&ctx.settings().strings);
//! let dialog = Dialog::new(&ctx, desc);
//! dialog.overlay().show();
//! ```

use std::fmt;
use std::rc::Rc;

use tracing::debug;
use vstack_core::settings::{DialogDefaults, Strings, ThemeName};

use crate::capability::{Activatable, ColorContextual, Themed};
use crate::stack::context::StackContext;
use crate::stack::dynamic::PushValue;
use crate::stack::overlay::{CloseOptions, Overlay, OverlayConfig};
use crate::stack::registry::StackId;

/// Dialog type variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogKind {
    Alert,
    Confirm,
    Prompt,
    #[default]
    Custom,
}

/// What pressing an action does.
pub enum ActionEffect<V> {
    /// Forced close, close state left indeterminate.
    Close,
    /// Forced cancel.
    Cancel,
    /// Resolve with this value.
    Resolve(V),
    /// Resolve with whatever the dialog holds (the prompt input).
    ResolveCurrent,
    Custom(Rc<dyn Fn(&Overlay<V>)>),
}

impl<V: Clone> Clone for ActionEffect<V> {
    fn clone(&self) -> Self {
        match self {
            Self::Close => Self::Close,
            Self::Cancel => Self::Cancel,
            Self::Resolve(v) => Self::Resolve(v.clone()),
            Self::ResolveCurrent => Self::ResolveCurrent,
            Self::Custom(f) => Self::Custom(Rc::clone(f)),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for ActionEffect<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Close => f.write_str("Close"),
            Self::Cancel => f.write_str("Cancel"),
            Self::Resolve(v) => f.debug_tuple("Resolve").field(v).finish(),
            Self::ResolveCurrent => f.write_str("ResolveCurrent"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A button in the dialog's action row.
#[derive(Debug, Clone)]
pub struct DialogAction<V> {
    /// Stable identifier such as `"ok"` or `"cancel"`.
    pub kind: String,
    pub text: String,
    pub autofocus: bool,
    /// Push this and the following actions to the trailing edge.
    pub spacer: bool,
    pub color: Option<String>,
    pub outline: bool,
    pub flat: bool,
    pub effect: ActionEffect<V>,
}

impl<V> DialogAction<V> {
    pub fn new(kind: impl Into<String>, text: impl Into<String>, effect: ActionEffect<V>) -> Self {
        Self {
            kind: kind.into(),
            text: text.into(),
            autofocus: false,
            spacer: false,
            color: None,
            outline: false,
            flat: false,
            effect,
        }
    }

    #[must_use]
    pub fn autofocus(mut self, autofocus: bool) -> Self {
        self.autofocus = autofocus;
        self
    }

    #[must_use]
    pub fn spacer(mut self, spacer: bool) -> Self {
        self.spacer = spacer;
        self
    }

    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    #[must_use]
    pub fn outline(mut self, outline: bool) -> Self {
        self.outline = outline;
        self
    }

    #[must_use]
    pub fn flat(mut self, flat: bool) -> Self {
        self.flat = flat;
        self
    }
}

impl<V> ColorContextual for DialogAction<V> {
    fn color(&self) -> Option<String> {
        self.color.clone()
    }

    fn outline(&self) -> bool {
        self.outline
    }

    fn flat(&self) -> bool {
        self.flat
    }
}

// --- Size ---

/// Width constraints for the dialog content, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DialogSize {
    pub width: Option<f64>,
    pub min_width: Option<f64>,
    pub max_width: Option<f64>,
}

impl DialogSize {
    pub const fn new() -> Self {
        Self {
            width: None,
            min_width: None,
            max_width: None,
        }
    }

    /// Fill unset constraints from the settings.
    #[must_use]
    pub fn or_defaults(self, defaults: &DialogDefaults) -> Self {
        Self {
            width: self.width.or(defaults.width),
            min_width: self.min_width.or(defaults.min_width),
            max_width: self.max_width.or(defaults.max_width),
        }
    }

    /// Clamp to these constraints, never exceeding `available`.
    pub fn clamp(self, available: f64) -> f64 {
        let mut width = self.width.unwrap_or(available);
        if let Some(max) = self.max_width {
            width = width.min(max);
        }
        if let Some(min) = self.min_width {
            width = width.max(min);
        }
        width.min(available).max(0.0)
    }

    /// Inline style declarations for the set constraints.
    pub fn style(&self) -> Vec<(&'static str, String)> {
        [
            ("width", self.width),
            ("min-width", self.min_width),
            ("max-width", self.max_width),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, format!("{v}px"))))
        .collect()
    }
}

// --- Descriptor ---

/// Everything needed to build a [`Dialog`]. Unset options fall back to
/// [`DialogDefaults`].
#[derive(Debug, Clone)]
pub struct DialogDescriptor<V = PushValue> {
    pub kind: DialogKind,
    pub header: Option<String>,
    pub content: String,
    pub actions: Vec<DialogAction<V>>,
    pub value: V,
    pub transition: Option<String>,
    pub backdrop: Option<bool>,
    pub close_on_esc: Option<bool>,
    pub persistent: Option<bool>,
    pub navigation_guard: Option<bool>,
    pub size: DialogSize,
    pub theme: Option<ThemeName>,
}

impl<V: Default> DialogDescriptor<V> {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            kind: DialogKind::Custom,
            header: None,
            content: content.into(),
            actions: Vec::new(),
            value: V::default(),
            transition: None,
            backdrop: None,
            close_on_esc: None,
            persistent: None,
            navigation_guard: None,
            size: DialogSize::new(),
            theme: None,
        }
    }
}

impl<V> DialogDescriptor<V> {
    #[must_use]
    pub fn kind(mut self, kind: DialogKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    #[must_use]
    pub fn action(mut self, action: DialogAction<V>) -> Self {
        self.actions.push(action);
        self
    }

    #[must_use]
    pub fn value(mut self, value: V) -> Self {
        self.value = value;
        self
    }

    #[must_use]
    pub fn transition(mut self, name: impl Into<String>) -> Self {
        self.transition = Some(name.into());
        self
    }

    #[must_use]
    pub fn backdrop(mut self, backdrop: bool) -> Self {
        self.backdrop = Some(backdrop);
        self
    }

    #[must_use]
    pub fn close_on_esc(mut self, close: bool) -> Self {
        self.close_on_esc = Some(close);
        self
    }

    #[must_use]
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = Some(persistent);
        self
    }

    #[must_use]
    pub fn navigation_guard(mut self, guard: bool) -> Self {
        self.navigation_guard = Some(guard);
        self
    }

    #[must_use]
    pub fn width(mut self, width: f64) -> Self {
        self.size.width = Some(width);
        self
    }

    #[must_use]
    pub fn min_width(mut self, width: f64) -> Self {
        self.size.min_width = Some(width);
        self
    }

    #[must_use]
    pub fn max_width(mut self, width: f64) -> Self {
        self.size.max_width = Some(width);
        self
    }

    #[must_use]
    pub fn theme(mut self, theme: ThemeName) -> Self {
        self.theme = Some(theme);
        self
    }

    /// Content split into display lines. Multi-line content is trimmed
    /// first so leading and trailing blank lines disappear.
    pub fn content_lines(&self) -> Vec<&str> {
        if self.content.contains('\n') {
            self.content.trim().split('\n').collect()
        } else {
            vec![self.content.as_str()]
        }
    }
}

impl DialogDescriptor<PushValue> {
    /// OK only. Leaves caller-supplied actions alone.
    #[must_use]
    pub fn with_alert_actions(mut self, strings: &Strings) -> Self {
        self.kind = DialogKind::Alert;
        if self.actions.is_empty() {
            self.actions = vec![ok_action(strings).autofocus(true).spacer(true)];
        }
        self
    }

    /// Cancel + OK. Leaves caller-supplied actions alone.
    #[must_use]
    pub fn with_confirm_actions(mut self, strings: &Strings) -> Self {
        self.kind = DialogKind::Confirm;
        if self.actions.is_empty() {
            self.actions = vec![
                cancel_action(strings),
                ok_action(strings),
            ];
        }
        self
    }

    /// Cancel + OK where OK resolves the input text.
    #[must_use]
    pub fn with_prompt_actions(mut self, strings: &Strings) -> Self {
        self.kind = DialogKind::Prompt;
        if self.actions.is_empty() {
            self.actions = vec![
                cancel_action(strings),
                DialogAction::new("ok", strings.ok.clone(), ActionEffect::ResolveCurrent),
            ];
        }
        if !matches!(self.value, PushValue::Text(_)) {
            self.value = PushValue::Text(String::new());
        }
        self
    }
}

fn ok_action(strings: &Strings) -> DialogAction<PushValue> {
    DialogAction::new(
        "ok",
        strings.ok.clone(),
        ActionEffect::Resolve(PushValue::Bool(true)),
    )
}

fn cancel_action(strings: &Strings) -> DialogAction<PushValue> {
    DialogAction::new(
        "cancel",
        strings.cancel.clone(),
        ActionEffect::Resolve(PushValue::Bool(false)),
    )
    .autofocus(true)
    .spacer(true)
    .outline(true)
    .color("primary")
}

impl From<&str> for DialogDescriptor {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

impl From<String> for DialogDescriptor {
    fn from(content: String) -> Self {
        Self::new(content)
    }
}

// --- Dialog ---

#[derive(Debug)]
struct DialogParts<V> {
    kind: DialogKind,
    header: Option<String>,
    content: String,
    actions: Vec<DialogAction<V>>,
    size: DialogSize,
}

/// A dialog: an overlay with header, content and actions.
pub struct Dialog<V> {
    overlay: Overlay<V>,
    parts: Rc<DialogParts<V>>,
}

impl<V> Clone for Dialog<V> {
    fn clone(&self) -> Self {
        Self {
            overlay: self.overlay.clone(),
            parts: Rc::clone(&self.parts),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Dialog<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dialog")
            .field("overlay", &self.overlay)
            .field("kind", &self.parts.kind)
            .field("actions", &self.parts.actions.len())
            .finish()
    }
}

impl<V: Clone + PartialEq + 'static> Dialog<V> {
    pub fn new(ctx: &StackContext, descriptor: DialogDescriptor<V>) -> Self {
        Self::build(ctx, descriptor, |_| {})
    }

    /// Build with a last chance to adjust the overlay configuration.
    pub(crate) fn build(
        ctx: &StackContext,
        descriptor: DialogDescriptor<V>,
        adjust: impl FnOnce(&mut OverlayConfig),
    ) -> Self {
        let defaults = &ctx.settings().dialog;
        let mut config = OverlayConfig::new()
            .transition(
                descriptor
                    .transition
                    .unwrap_or_else(|| defaults.transition.clone()),
            )
            .backdrop(descriptor.backdrop.unwrap_or(defaults.backdrop))
            .close_on_esc(descriptor.close_on_esc.unwrap_or(defaults.close_on_esc))
            .persistent(descriptor.persistent.unwrap_or(defaults.persistent))
            .navigation_guard(
                descriptor
                    .navigation_guard
                    .unwrap_or(defaults.navigation_guard),
            );
        config.theme = descriptor.theme.or(defaults.theme);
        adjust(&mut config);

        let parts = DialogParts {
            kind: descriptor.kind,
            header: descriptor.header,
            content: descriptor.content,
            actions: descriptor.actions,
            size: descriptor.size.or_defaults(defaults),
        };
        let overlay = Overlay::new(ctx, config, descriptor.value);
        debug!(id = overlay.id().id(), kind = ?parts.kind, "dialog created");
        Self {
            overlay,
            parts: Rc::new(parts),
        }
    }

    /// Press the action at `index`. Returns `false` when there is no such
    /// action or the dialog is closed.
    pub fn trigger(&self, index: usize) -> bool {
        let Some(action) = self.parts.actions.get(index) else {
            return false;
        };
        if !self.overlay.is_active() {
            return false;
        }
        debug!(id = self.overlay.id().id(), action = %action.kind, "dialog action");
        match &action.effect {
            ActionEffect::Close => self.overlay.close(CloseOptions::new().force()),
            ActionEffect::Cancel => self.overlay.cancel(true),
            ActionEffect::Resolve(value) => self.overlay.resolve_with(value.clone()),
            ActionEffect::ResolveCurrent => self.overlay.resolve(),
            ActionEffect::Custom(effect) => effect(&self.overlay),
        }
        true
    }
}

impl<V> Dialog<V> {
    pub fn overlay(&self) -> &Overlay<V> {
        &self.overlay
    }

    pub fn kind(&self) -> DialogKind {
        self.parts.kind
    }

    pub fn header(&self) -> Option<&str> {
        self.parts.header.as_deref()
    }

    pub fn content(&self) -> &str {
        &self.parts.content
    }

    pub fn actions(&self) -> &[DialogAction<V>] {
        &self.parts.actions
    }

    /// Index of the first action marked `autofocus`.
    pub fn autofocus_action(&self) -> Option<usize> {
        self.parts.actions.iter().position(|a| a.autofocus)
    }

    /// Width constraints after settings defaults were applied.
    pub fn size(&self) -> DialogSize {
        self.parts.size
    }
}

impl Dialog<PushValue> {
    /// Current prompt input, if this dialog holds text.
    pub fn input(&self) -> Option<String> {
        match self.overlay.value() {
            PushValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.overlay.set_value(PushValue::Text(text.into()));
    }
}

impl<V: Clone + PartialEq + 'static> Activatable for Dialog<V> {
    fn overlay_id(&self) -> StackId {
        self.overlay.id()
    }

    fn activate(&self) {
        self.overlay.show();
    }

    fn deactivate(&self, opts: CloseOptions) {
        self.overlay.close(opts);
    }

    fn active(&self) -> bool {
        self.overlay.is_active()
    }
}

impl<V: Clone + PartialEq + 'static> Themed for Dialog<V> {
    fn own_theme(&self) -> Option<ThemeName> {
        self.overlay.own_theme()
    }

    fn context_theme(&self) -> ThemeName {
        self.overlay.context_theme()
    }
}
