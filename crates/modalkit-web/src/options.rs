#![forbid(unsafe_code)]

//! Decoding of the JS options object.
//!
//! Pages configure a modal with a plain object using the widget's
//! historical camelCase keys (`closeOnEsc`, `modalItemYouTubeClass`, ...).
//! The binding serializes that object with `JSON.stringify`, which drops
//! functions and DOM nodes, and decodes the rest here. Callbacks and the
//! trigger element are read separately by the wasm module.

use modalkit_core::{ClassNames, ModalError, ModalKind, ModalOptions, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Callback keys read from the options object, in hook order.
pub const CALLBACK_KEYS: [&str; 8] = [
    "initTriggerCallback",
    "removeTriggerCallback",
    "beforeOpenCallback",
    "openCallback",
    "closeCallback",
    "acceptCallback",
    "removeCallback",
    "loadCallback",
];

/// Raw options as they arrive from the page.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JsModalOptions {
    #[serde(rename = "type")]
    pub kind: Option<Value>,
    pub source: Option<Value>,
    pub close_on_backdrop_click: Option<bool>,
    pub close_on_esc: Option<bool>,
    pub close_button: Option<bool>,
    /// Missing keeps the default label; `null` drops the attribute.
    #[serde(deserialize_with = "nullable")]
    pub close_button_label: Option<Option<String>>,
    pub item_label: Option<String>,
    pub custom_classes: Vec<String>,
    pub custom_item_classes: Vec<String>,
    pub custom_close_trigger_selector: Option<String>,
    pub custom_accept_trigger_selector: Option<String>,
    pub open_animation_name: Option<String>,
    pub close_animation_name: Option<String>,
    pub wrapper_id: Option<String>,
    #[serde(flatten)]
    pub classes: ClassOverrides,
}

/// Per-class overrides, one key per class name.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClassOverrides {
    #[serde(rename = "isClosedClass")]
    pub is_closed: Option<String>,
    #[serde(rename = "isClosingClass")]
    pub is_closing: Option<String>,
    #[serde(rename = "isLoadedClass")]
    pub is_loaded: Option<String>,
    #[serde(rename = "isModalOpenedClass")]
    pub is_modal_opened: Option<String>,
    #[serde(rename = "isOpenedClass")]
    pub is_opened: Option<String>,
    #[serde(rename = "isOpeningClass")]
    pub is_opening: Option<String>,
    #[serde(rename = "modalClass")]
    pub modal: Option<String>,
    #[serde(rename = "modalBackdropClass")]
    pub modal_backdrop: Option<String>,
    #[serde(rename = "modalCloseClass")]
    pub modal_close: Option<String>,
    #[serde(rename = "modalItemClass")]
    pub modal_item: Option<String>,
    #[serde(rename = "modalItemAjaxClass")]
    pub modal_item_ajax: Option<String>,
    #[serde(rename = "modalItemDialogClass")]
    pub modal_item_dialog: Option<String>,
    #[serde(rename = "modalItemImageClass")]
    pub modal_item_image: Option<String>,
    #[serde(rename = "modalItemVideoClass")]
    pub modal_item_video: Option<String>,
    #[serde(rename = "modalItemVimeoClass")]
    pub modal_item_vimeo: Option<String>,
    #[serde(rename = "modalItemYouTubeClass")]
    pub modal_item_youtube: Option<String>,
    #[serde(rename = "modalSpinnerClass")]
    pub modal_spinner: Option<String>,
}

fn nullable<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl ClassOverrides {
    fn apply(self, mut classes: ClassNames) -> ClassNames {
        let slots = [
            (self.is_closed, &mut classes.is_closed),
            (self.is_closing, &mut classes.is_closing),
            (self.is_loaded, &mut classes.is_loaded),
            (self.is_modal_opened, &mut classes.is_modal_opened),
            (self.is_opened, &mut classes.is_opened),
            (self.is_opening, &mut classes.is_opening),
            (self.modal, &mut classes.modal),
            (self.modal_backdrop, &mut classes.modal_backdrop),
            (self.modal_close, &mut classes.modal_close),
            (self.modal_item, &mut classes.modal_item),
            (self.modal_item_ajax, &mut classes.modal_item_ajax),
            (self.modal_item_dialog, &mut classes.modal_item_dialog),
            (self.modal_item_image, &mut classes.modal_item_image),
            (self.modal_item_video, &mut classes.modal_item_video),
            (self.modal_item_vimeo, &mut classes.modal_item_vimeo),
            (self.modal_item_youtube, &mut classes.modal_item_youtube),
            (self.modal_spinner, &mut classes.modal_spinner),
        ];
        for (value, slot) in slots {
            if let Some(value) = value {
                *slot = value;
            }
        }
        classes
    }
}

impl JsModalOptions {
    /// Decode a JSON document.
    ///
    /// # Errors
    ///
    /// [`ModalError::InvalidOptions`] when the document is not an object or
    /// a known key has the wrong type.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| ModalError::invalid(err.to_string()))
    }

    /// Validate and convert into [`ModalOptions`].
    ///
    /// # Errors
    ///
    /// [`ModalError::MissingKind`] / [`ModalError::MissingSource`] when
    /// `type` or `source` is absent or not a string, then everything
    /// [`ModalOptions::new`] rejects.
    pub fn into_options(self) -> Result<ModalOptions> {
        let Some(Value::String(kind)) = self.kind else {
            return Err(ModalError::MissingKind);
        };
        let Some(Value::String(source)) = self.source else {
            return Err(ModalError::MissingSource);
        };
        let kind: ModalKind = kind.parse()?;

        let mut options = ModalOptions::new(kind, &source)?
            .custom_classes(self.custom_classes)
            .custom_item_classes(self.custom_item_classes)
            .animation_names(self.open_animation_name, self.close_animation_name);
        if let Some(close) = self.close_on_backdrop_click {
            options = options.close_on_backdrop_click(close);
        }
        if let Some(close) = self.close_on_esc {
            options = options.close_on_esc(close);
        }
        if let Some(enabled) = self.close_button {
            options = options.close_button(enabled);
        }
        if let Some(label) = self.close_button_label {
            options = options.close_button_label(label);
        }
        if let Some(label) = self.item_label {
            options = options.item_label(label);
        }
        if let Some(selector) = self.custom_close_trigger_selector {
            options = options.custom_close_trigger(selector);
        }
        if let Some(selector) = self.custom_accept_trigger_selector {
            options = options.custom_accept_trigger(selector);
        }
        if let Some(id) = self.wrapper_id {
            options = options.wrapper_id(id);
        }
        let classes = self.classes.apply(ClassNames::default());
        Ok(options.classes(classes))
    }
}

/// Decode and validate in one step.
///
/// # Errors
///
/// See [`JsModalOptions::from_json`] and [`JsModalOptions::into_options`].
pub fn options_from_json(json: &str) -> Result<ModalOptions> {
    JsModalOptions::from_json(json)?.into_options()
}
