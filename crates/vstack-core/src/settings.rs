#![forbid(unsafe_code)]

//! Process-wide defaults for the overlay engine.
//!
//! A [`StackSettings`] value is handed to the stack context once at
//! construction. Every field has a default, and with the `serde` feature a
//! partial document deserializes over those defaults:
//!
//! ```ignore
//! let settings: StackSettings = serde_json::from_str(r#"{"z_index": 2000}"#)?;
//! assert_eq!(settings.dialog.min_width, Some(280.0));
//! settings.validate()?;
//! ```

use std::time::Duration;

use crate::error::StackError;

/// Default base z-index for overlays.
pub const DEFAULT_Z_INDEX: u32 = 32767;

/// Colour scheme names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum ThemeName {
    #[default]
    Light,
    Dark,
}

/// Labels used by the built-in dialog and snackbar actions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Strings {
    pub ok: String,
    pub cancel: String,
    pub close: String,
}

impl Default for Strings {
    fn default() -> Self {
        Self {
            ok: "OK".to_owned(),
            cancel: "CANCEL".to_owned(),
            close: "CLOSE".to_owned(),
        }
    }
}

/// Defaults applied to every dialog pushed through the dynamic container.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct DialogDefaults {
    pub transition: String,
    pub backdrop: bool,
    pub close_on_esc: bool,
    pub persistent: bool,
    pub navigation_guard: bool,
    pub width: Option<f64>,
    pub min_width: Option<f64>,
    pub max_width: Option<f64>,
    pub theme: Option<ThemeName>,
}

impl Default for DialogDefaults {
    fn default() -> Self {
        Self {
            transition: "v-stack-slide-y".to_owned(),
            backdrop: true,
            close_on_esc: true,
            persistent: false,
            navigation_guard: true,
            width: None,
            min_width: Some(280.0),
            max_width: Some(540.0),
            theme: None,
        }
    }
}

/// Defaults applied to every snackbar pushed through the dynamic container.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct SnackbarDefaults {
    /// Auto-dismiss delay in milliseconds; 0 disables it.
    pub timeout_ms: u64,
    pub color: String,
    /// Whether to render a close button labelled with [`Strings::close`].
    pub close_button: bool,
}

impl SnackbarDefaults {
    /// The auto-dismiss delay, if enabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

impl Default for SnackbarDefaults {
    fn default() -> Self {
        Self {
            timeout_ms: 6000,
            color: "dark".to_owned(),
            close_button: true,
        }
    }
}

/// Engine-wide configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct StackSettings {
    /// Theme used until an overlay or the context overrides it.
    pub default_theme: ThemeName,
    /// Whether overlays that ask for it may lock document scrolling.
    pub use_scroll_stop: bool,
    /// Base z-index; overlays paint at `z_index + activate_order`.
    pub z_index: u32,
    pub strings: Strings,
    pub dialog: DialogDefaults,
    pub snackbar: SnackbarDefaults,
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            default_theme: ThemeName::Light,
            use_scroll_stop: true,
            z_index: DEFAULT_Z_INDEX,
            strings: Strings::default(),
            dialog: DialogDefaults::default(),
            snackbar: SnackbarDefaults::default(),
        }
    }
}

impl StackSettings {
    /// Create the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn z_index(mut self, z_index: u32) -> Self {
        self.z_index = z_index;
        self
    }

    #[must_use]
    pub fn default_theme(mut self, theme: ThemeName) -> Self {
        self.default_theme = theme;
        self
    }

    #[must_use]
    pub fn use_scroll_stop(mut self, enabled: bool) -> Self {
        self.use_scroll_stop = enabled;
        self
    }

    #[must_use]
    pub fn strings(mut self, strings: Strings) -> Self {
        self.strings = strings;
        self
    }

    #[must_use]
    pub fn dialog(mut self, dialog: DialogDefaults) -> Self {
        self.dialog = dialog;
        self
    }

    #[must_use]
    pub fn snackbar(mut self, snackbar: SnackbarDefaults) -> Self {
        self.snackbar = snackbar;
        self
    }

    /// Check the settings for values the engine cannot honour.
    pub fn validate(&self) -> Result<(), StackError> {
        if self.z_index == 0 || self.z_index > i32::MAX as u32 {
            return Err(StackError::invalid(
                "z_index",
                format!("{} is outside 1..={}", self.z_index, i32::MAX),
            ));
        }

        let widths = [
            ("dialog.width", self.dialog.width),
            ("dialog.min_width", self.dialog.min_width),
            ("dialog.max_width", self.dialog.max_width),
        ];
        for (field, value) in widths {
            if let Some(v) = value
                && !(v.is_finite() && v >= 0.0)
            {
                return Err(StackError::invalid(
                    field,
                    format!("{v} is not a non-negative length"),
                ));
            }
        }

        if let (Some(min), Some(max)) = (self.dialog.min_width, self.dialog.max_width)
            && min > max
        {
            return Err(StackError::invalid(
                "dialog.min_width",
                format!("{min} exceeds max_width {max}"),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = StackSettings::default();
        assert_eq!(s.z_index, 32767);
        assert!(s.use_scroll_stop);
        assert_eq!(s.strings.ok, "OK");
        assert_eq!(s.strings.cancel, "CANCEL");
        assert_eq!(s.strings.close, "CLOSE");
        assert_eq!(s.dialog.min_width, Some(280.0));
        assert_eq!(s.dialog.max_width, Some(540.0));
        assert!(s.dialog.backdrop);
        assert!(!s.dialog.persistent);
        assert!(s.dialog.navigation_guard);
        assert_eq!(s.snackbar.timeout(), Some(Duration::from_millis(6000)));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn zero_timeout_disables_auto_dismiss() {
        let snack = SnackbarDefaults {
            timeout_ms: 0,
            ..SnackbarDefaults::default()
        };
        assert_eq!(snack.timeout(), None);
    }

    #[test]
    fn validate_rejects_zero_z_index() {
        let err = StackSettings::new().z_index(0).validate().unwrap_err();
        assert!(matches!(
            err,
            StackError::InvalidSetting {
                field: "z_index",
                ..
            }
        ));
    }

    #[test]
    fn validate_rejects_inverted_widths() {
        let dialog = DialogDefaults {
            min_width: Some(600.0),
            ..DialogDefaults::default()
        };
        let err = StackSettings::new().dialog(dialog).validate().unwrap_err();
        assert!(matches!(
            err,
            StackError::InvalidSetting {
                field: "dialog.min_width",
                ..
            }
        ));
    }

    #[test]
    fn validate_rejects_nan_width() {
        let dialog = DialogDefaults {
            width: Some(f64::NAN),
            ..DialogDefaults::default()
        };
        assert!(StackSettings::new().dialog(dialog).validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_document_merges_over_defaults() {
        let s: StackSettings = serde_json::from_str(
            r#"{"z_index": 2000, "dialog": {"persistent": true}, "default_theme": "dark"}"#,
        )
        .unwrap();
        assert_eq!(s.z_index, 2000);
        assert!(s.dialog.persistent);
        assert_eq!(s.dialog.min_width, Some(280.0));
        assert_eq!(s.default_theme, ThemeName::Dark);
        assert_eq!(s.strings, Strings::default());
    }
}
