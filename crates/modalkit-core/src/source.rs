#![forbid(unsafe_code)]

//! Content kinds and their validated sources.
//!
//! The kind is chosen once at construction. Embed identifiers for YouTube
//! and Vimeo are extracted up front so a malformed URL fails construction
//! rather than the first `open()`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ModalError, Result};

static YOUTUBE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(youtube|youtu)\.(com|be)/(watch\?v=([\w-]+)|([\w-]+))")
        .expect("youtube pattern is valid")
});

static VIMEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"vimeo\.com/([\w-]+)").expect("vimeo pattern is valid"));

/// YouTube iframe dimensions (`width`, `height` attribute values).
pub const YOUTUBE_FRAME_SIZE: (&str, &str) = ("560px", "315px");
/// Vimeo iframe dimensions (`width`, `height` attribute values).
pub const VIMEO_FRAME_SIZE: (&str, &str) = ("640px", "272px");

/// The six supported modal kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModalKind {
    Image,
    Video,
    #[serde(rename = "youtube")]
    YouTube,
    Vimeo,
    Dialog,
    Ajax,
}

impl ModalKind {
    pub const ALL: [Self; 6] = [
        Self::Image,
        Self::Video,
        Self::YouTube,
        Self::Vimeo,
        Self::Dialog,
        Self::Ajax,
    ];

    /// Name used in configuration (`type` option).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::YouTube => "youtube",
            Self::Vimeo => "vimeo",
            Self::Dialog => "dialog",
            Self::Ajax => "ajax",
        }
    }

    /// Whether the content item arrives through an asynchronous completion.
    #[must_use]
    pub const fn is_async(self) -> bool {
        matches!(self, Self::Image | Self::Video | Self::Ajax)
    }
}

impl fmt::Display for ModalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModalKind {
    type Err = ModalError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ModalError::unsupported(s))
    }
}

/// A validated content source, one variant per loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Image { url: String },
    Video { url: String },
    YouTube { video_id: String },
    Vimeo { video_id: String },
    Dialog { selector: String },
    Ajax { url: String },
}

impl ContentSource {
    /// Validate `source` for `kind`.
    ///
    /// # Errors
    ///
    /// [`ModalError::MissingSource`] for an empty source, and
    /// [`ModalError::InvalidYouTubeSource`] / [`ModalError::InvalidVimeoSource`]
    /// when no video id can be found.
    pub fn parse(kind: ModalKind, source: &str) -> Result<Self> {
        if source.is_empty() {
            return Err(ModalError::MissingSource);
        }
        let owned = source.to_owned();
        Ok(match kind {
            ModalKind::Image => Self::Image { url: owned },
            ModalKind::Video => Self::Video { url: owned },
            ModalKind::YouTube => Self::YouTube {
                video_id: youtube_video_id(source).ok_or(ModalError::InvalidYouTubeSource {
                    source_url: owned,
                })?,
            },
            ModalKind::Vimeo => Self::Vimeo {
                video_id: vimeo_video_id(source).ok_or(ModalError::InvalidVimeoSource {
                    source_url: owned,
                })?,
            },
            ModalKind::Dialog => Self::Dialog { selector: owned },
            ModalKind::Ajax => Self::Ajax { url: owned },
        })
    }

    #[must_use]
    pub const fn kind(&self) -> ModalKind {
        match self {
            Self::Image { .. } => ModalKind::Image,
            Self::Video { .. } => ModalKind::Video,
            Self::YouTube { .. } => ModalKind::YouTube,
            Self::Vimeo { .. } => ModalKind::Vimeo,
            Self::Dialog { .. } => ModalKind::Dialog,
            Self::Ajax { .. } => ModalKind::Ajax,
        }
    }

    /// Iframe `src` for embed kinds, `None` otherwise.
    #[must_use]
    pub fn embed_url(&self) -> Option<String> {
        match self {
            Self::YouTube { video_id } => Some(youtube_embed_url(video_id)),
            Self::Vimeo { video_id } => Some(vimeo_embed_url(video_id)),
            _ => None,
        }
    }
}

/// Extract a YouTube video id from `youtube.com/watch?v=ID` or `youtu.be/ID`.
#[must_use]
pub fn youtube_video_id(source: &str) -> Option<String> {
    let caps = YOUTUBE_ID.captures(source)?;
    let id = if &caps[1] == "youtube" {
        caps.get(4)
    } else {
        caps.get(5)
    };
    id.map(|m| m.as_str().to_owned())
}

/// Extract a Vimeo video id from `vimeo.com/ID`.
#[must_use]
pub fn vimeo_video_id(source: &str) -> Option<String> {
    VIMEO_ID
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
}

#[must_use]
pub fn youtube_embed_url(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{video_id}?rel=0&autoplay=1&showinfo=0")
}

#[must_use]
pub fn vimeo_embed_url(video_id: &str) -> String {
    format!("https://player.vimeo.com/video/{video_id}?autoplay=1&title=0&byline=0&portrait=0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_config_name() {
        for kind in ModalKind::ALL {
            assert_eq!(kind.as_str().parse::<ModalKind>(), Ok(kind));
        }
        assert_eq!(
            "gallery".parse::<ModalKind>(),
            Err(ModalError::unsupported("gallery"))
        );
    }

    #[test]
    fn youtube_short_url() {
        let source = ContentSource::parse(ModalKind::YouTube, "https://youtu.be/abc123").unwrap();
        assert_eq!(
            source,
            ContentSource::YouTube {
                video_id: "abc123".to_owned()
            }
        );
        let url = source.embed_url().unwrap();
        assert!(url.contains("abc123"));
        assert_eq!(
            url,
            "https://www.youtube.com/embed/abc123?rel=0&autoplay=1&showinfo=0"
        );
    }

    #[test]
    fn youtube_watch_url() {
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42").as_deref(),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn youtube_rejects_unrelated_url() {
        assert_eq!(
            ContentSource::parse(ModalKind::YouTube, "https://example.com/video"),
            Err(ModalError::InvalidYouTubeSource {
                source_url: "https://example.com/video".to_owned()
            })
        );
    }

    #[test]
    fn vimeo_numeric_id() {
        let source = ContentSource::parse(ModalKind::Vimeo, "https://vimeo.com/76979871").unwrap();
        assert_eq!(
            source.embed_url().as_deref(),
            Some("https://player.vimeo.com/video/76979871?autoplay=1&title=0&byline=0&portrait=0")
        );
    }

    #[test]
    fn empty_source_is_missing() {
        for kind in ModalKind::ALL {
            assert_eq!(ContentSource::parse(kind, ""), Err(ModalError::MissingSource));
        }
    }

    #[test]
    fn passthrough_kinds_keep_source_verbatim() {
        assert_eq!(
            ContentSource::parse(ModalKind::Dialog, "#terms").unwrap(),
            ContentSource::Dialog {
                selector: "#terms".to_owned()
            }
        );
        assert_eq!(
            ContentSource::parse(ModalKind::Ajax, "/frag").unwrap().kind(),
            ModalKind::Ajax
        );
        assert!(ContentSource::parse(ModalKind::Image, "/a.png")
            .unwrap()
            .embed_url()
            .is_none());
    }

    #[test]
    fn async_kinds() {
        let asynchronous: Vec<_> = ModalKind::ALL.into_iter().filter(|k| k.is_async()).collect();
        assert_eq!(
            asynchronous,
            vec![ModalKind::Image, ModalKind::Video, ModalKind::Ajax]
        );
    }
}
