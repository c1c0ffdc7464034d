#![forbid(unsafe_code)]

//! Construction-time errors.
//!
//! Only malformed configuration is an error. Runtime load failures (broken
//! media, a dialog selector that matches nothing, a non-200 fragment
//! response) never surface here: the lifecycle falls back to an empty,
//! focus-only modal and logs the failure.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModalError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModalError {
    #[error("modal \"type\" option must be a string")]
    MissingKind,

    #[error("modal \"source\" option must be a string")]
    MissingSource,

    #[error("given modal type is not supported: {kind}")]
    UnsupportedKind { kind: String },

    #[error("no YouTube video id found in {source_url}")]
    InvalidYouTubeSource { source_url: String },

    #[error("no Vimeo video id found in {source_url}")]
    InvalidVimeoSource { source_url: String },

    #[error("invalid modal options: {message}")]
    InvalidOptions { message: String },
}

impl ModalError {
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unsupported(kind: impl Into<String>) -> Self {
        Self::UnsupportedKind { kind: kind.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::ModalError;

    #[test]
    fn messages_name_the_offending_option() {
        assert_eq!(
            ModalError::MissingKind.to_string(),
            "modal \"type\" option must be a string"
        );
        assert_eq!(
            ModalError::unsupported("carousel").to_string(),
            "given modal type is not supported: carousel"
        );
    }

    #[test]
    fn invalid_constructor_preserves_message() {
        let error = ModalError::invalid("closeOnEsc: expected a boolean");
        assert_eq!(
            error,
            ModalError::InvalidOptions {
                message: "closeOnEsc: expected a boolean".to_owned()
            }
        );
    }
}
