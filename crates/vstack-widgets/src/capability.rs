#![forbid(unsafe_code)]

//! Capability traits shared by the overlay variants.
//!
//! Each variant composes an [`Overlay`] and opts into the capabilities it
//! needs: [`Activatable`] for anything that opens and closes, [`Themed`] for
//! surfaces that follow the light/dark theme, and [`ColorContextual`] for
//! items painted with a contextual colour (tooltips, snackbars, dialog
//! actions).

use vstack_core::settings::ThemeName;

use crate::stack::overlay::{CloseOptions, Overlay};
use crate::stack::registry::StackId;

/// Something that can be opened and closed through the stack.
pub trait Activatable {
    fn overlay_id(&self) -> StackId;

    /// Open on the next scheduler turn.
    fn activate(&self);

    fn deactivate(&self, opts: CloseOptions);

    fn active(&self) -> bool;

    fn toggle_active(&self) {
        if self.active() {
            self.deactivate(CloseOptions::new());
        } else {
            self.activate();
        }
    }
}

impl<V: Clone + PartialEq + 'static> Activatable for Overlay<V> {
    fn overlay_id(&self) -> StackId {
        self.id()
    }

    fn activate(&self) {
        self.show();
    }

    fn deactivate(&self, opts: CloseOptions) {
        self.close(opts);
    }

    fn active(&self) -> bool {
        self.is_active()
    }
}

/// A surface that resolves its theme against the context.
pub trait Themed {
    /// Theme set on this surface, if any.
    fn own_theme(&self) -> Option<ThemeName>;

    /// Theme inherited from the stack context.
    fn context_theme(&self) -> ThemeName;

    fn computed_theme(&self) -> ThemeName {
        self.own_theme().unwrap_or_else(|| self.context_theme())
    }
}

impl<V: Clone + PartialEq + 'static> Themed for Overlay<V> {
    fn own_theme(&self) -> Option<ThemeName> {
        self.config().theme
    }

    fn context_theme(&self) -> ThemeName {
        self.context().theme()
    }
}

/// How a contextual colour is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorVariant {
    /// Background in the colour, text in its contrast colour.
    Fill,
    /// Text only.
    Flat,
    /// Text and border.
    Outline,
}

/// An item painted with a named contextual colour.
pub trait ColorContextual {
    fn color(&self) -> Option<String>;

    fn default_color(&self) -> &'static str {
        "primary"
    }

    fn outline(&self) -> bool {
        false
    }

    fn flat(&self) -> bool {
        false
    }

    fn computed_color(&self) -> String {
        self.color()
            .unwrap_or_else(|| self.default_color().to_owned())
    }

    /// Flat wins over outline; neither means fill.
    fn variant(&self) -> ColorVariant {
        if self.flat() {
            ColorVariant::Flat
        } else if self.outline() {
            ColorVariant::Outline
        } else {
            ColorVariant::Fill
        }
    }
}
