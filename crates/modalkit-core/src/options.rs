#![forbid(unsafe_code)]

//! Modal configuration.
//!
//! [`ModalOptions`] carries everything except the trigger element and the
//! hooks, which are host-typed and attached on the [`crate::Modal`] itself.
//! Defaults match the stylesheet conventions the widget ships with.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::source::{ContentSource, ModalKind};

/// Identifier assigned to the wrapper element.
pub const DEFAULT_WRAPPER_ID: &str = "modal";
/// Accessible label of the close button.
pub const DEFAULT_CLOSE_BUTTON_LABEL: &str = "Close modal";

/// CSS class names applied by the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClassNames {
    pub is_closed: String,
    pub is_closing: String,
    pub is_loaded: String,
    /// Applied to `<body>` while a modal is open.
    pub is_modal_opened: String,
    pub is_opened: String,
    pub is_opening: String,
    pub modal: String,
    pub modal_backdrop: String,
    pub modal_close: String,
    pub modal_item: String,
    pub modal_item_ajax: String,
    pub modal_item_dialog: String,
    pub modal_item_image: String,
    pub modal_item_video: String,
    pub modal_item_vimeo: String,
    pub modal_item_youtube: String,
    pub modal_spinner: String,
}

impl Default for ClassNames {
    fn default() -> Self {
        Self {
            is_closed: "is-closed".to_owned(),
            is_closing: "is-closing".to_owned(),
            is_loaded: "is-loaded".to_owned(),
            is_modal_opened: "is-modal-opened".to_owned(),
            is_opened: "is-opened".to_owned(),
            is_opening: "is-opening".to_owned(),
            modal: "modal".to_owned(),
            modal_backdrop: "modal-backdrop".to_owned(),
            modal_close: "modal-close".to_owned(),
            modal_item: "modal-item".to_owned(),
            modal_item_ajax: "modal-item--ajax".to_owned(),
            modal_item_dialog: "modal-item--dialog".to_owned(),
            modal_item_image: "modal-item--image".to_owned(),
            modal_item_video: "modal-item--video".to_owned(),
            modal_item_vimeo: "modal-item--vimeo".to_owned(),
            modal_item_youtube: "modal-item--youtube".to_owned(),
            modal_spinner: "modal-spinner".to_owned(),
        }
    }
}

impl ClassNames {
    /// Kind-specific classes added to the content item, after `modal_item`.
    #[must_use]
    pub fn item_classes(&self, kind: ModalKind) -> Vec<&str> {
        match kind {
            ModalKind::Image => vec![&self.modal_item_image],
            ModalKind::Video => vec![&self.modal_item_video],
            ModalKind::YouTube => vec![&self.modal_item_youtube],
            ModalKind::Vimeo => vec![&self.modal_item_vimeo],
            ModalKind::Dialog => vec![&self.modal_item_dialog],
            ModalKind::Ajax => vec![&self.modal_item_dialog, &self.modal_item_ajax],
        }
    }
}

/// CSS animation names that drive the animated lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationNames {
    pub open: String,
    pub close: String,
}

/// Validated modal configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalOptions {
    pub source: ContentSource,
    pub close_on_backdrop_click: bool,
    pub close_on_esc: bool,
    pub close_button: bool,
    pub close_button_label: Option<String>,
    pub item_label: Option<String>,
    pub custom_classes: Vec<String>,
    pub custom_item_classes: Vec<String>,
    pub custom_close_trigger_selector: Option<String>,
    pub custom_accept_trigger_selector: Option<String>,
    /// Animated lifecycle only runs when both names are configured.
    pub animation: Option<AnimationNames>,
    pub wrapper_id: String,
    pub classes: ClassNames,
}

impl ModalOptions {
    /// Options for `kind` and `source` with every other field defaulted.
    ///
    /// # Errors
    ///
    /// See [`ContentSource::parse`].
    pub fn new(kind: ModalKind, source: &str) -> Result<Self> {
        Ok(Self::from_source(ContentSource::parse(kind, source)?))
    }

    /// Parse the kind by its configuration name.
    ///
    /// # Errors
    ///
    /// [`crate::ModalError::UnsupportedKind`] for an unknown name, plus the
    /// errors of [`ContentSource::parse`].
    pub fn parse(kind: &str, source: &str) -> Result<Self> {
        Self::new(kind.parse()?, source)
    }

    #[must_use]
    pub fn from_source(source: ContentSource) -> Self {
        Self {
            source,
            close_on_backdrop_click: true,
            close_on_esc: true,
            close_button: true,
            close_button_label: Some(DEFAULT_CLOSE_BUTTON_LABEL.to_owned()),
            item_label: None,
            custom_classes: Vec::new(),
            custom_item_classes: Vec::new(),
            custom_close_trigger_selector: None,
            custom_accept_trigger_selector: None,
            animation: None,
            wrapper_id: DEFAULT_WRAPPER_ID.to_owned(),
            classes: ClassNames::default(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ModalKind {
        self.source.kind()
    }

    #[must_use]
    pub fn has_animation(&self) -> bool {
        self.animation.is_some()
    }

    pub fn close_on_backdrop_click(mut self, close: bool) -> Self {
        self.close_on_backdrop_click = close;
        self
    }

    pub fn close_on_esc(mut self, close: bool) -> Self {
        self.close_on_esc = close;
        self
    }

    pub fn close_button(mut self, enabled: bool) -> Self {
        self.close_button = enabled;
        self
    }

    pub fn close_button_label(mut self, label: Option<String>) -> Self {
        self.close_button_label = label;
        self
    }

    pub fn item_label(mut self, label: impl Into<String>) -> Self {
        self.item_label = Some(label.into());
        self
    }

    pub fn custom_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_classes = classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn custom_item_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_item_classes = classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn custom_close_trigger(mut self, selector: impl Into<String>) -> Self {
        self.custom_close_trigger_selector = Some(selector.into());
        self
    }

    pub fn custom_accept_trigger(mut self, selector: impl Into<String>) -> Self {
        self.custom_accept_trigger_selector = Some(selector.into());
        self
    }

    /// Enable the animated lifecycle.
    pub fn animation(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.animation = Some(AnimationNames {
            open: open.into(),
            close: close.into(),
        });
        self
    }

    /// Set animation names from two independently optional values.
    ///
    /// Animation stays disabled unless both are present.
    pub fn animation_names(mut self, open: Option<String>, close: Option<String>) -> Self {
        self.animation = match (open, close) {
            (Some(open), Some(close)) => Some(AnimationNames { open, close }),
            _ => None,
        };
        self
    }

    pub fn wrapper_id(mut self, id: impl Into<String>) -> Self {
        self.wrapper_id = id.into();
        self
    }

    pub fn classes(mut self, classes: ClassNames) -> Self {
        self.classes = classes;
        self
    }
}
