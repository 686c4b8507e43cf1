//! YouTube video identity parsing.

use crate::error::{Result, TubeqaError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use url::Url;

/// Canonical YouTube video identifier (always 11 characters).
///
/// The identifier doubles as the on-disk key for a video's index artifact, so only
/// the YouTube ID alphabet is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoId(String);

fn id_regex() -> &'static Regex {
    static ID_REGEX: OnceLock<Regex> = OnceLock::new();
    ID_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("Invalid regex"))
}

impl VideoId {
    /// Length of every YouTube video identifier.
    pub const LEN: usize = 11;

    /// Resolve a bare ID, a `youtube.com/watch?v=` URL or a `youtu.be/` URL.
    ///
    /// Every other shape fails with [`TubeqaError::InvalidReference`]; nothing is guessed.
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        let invalid = || TubeqaError::InvalidReference(reference.to_string());

        if reference.chars().count() == Self::LEN && !reference.contains('/') {
            return Self::from_bare(reference).ok_or_else(invalid);
        }

        let url = match Url::parse(reference) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse(&format!("https://{reference}")).map_err(|_| invalid())?
            }
            Err(_) => return Err(invalid()),
        };

        let candidate = match url.host_str() {
            Some("youtube.com") | Some("www.youtube.com") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some("youtu.be") => Some(url.path().trim_matches('/').to_string()),
            _ => None,
        };

        candidate
            .as_deref()
            .and_then(Self::from_bare)
            .ok_or_else(invalid)
    }

    fn from_bare(candidate: &str) -> Option<Self> {
        id_regex()
            .is_match(candidate)
            .then(|| Self(candidate.to_string()))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL for this video.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for VideoId {
    type Err = TubeqaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VideoId {
    type Error = TubeqaError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_bare(&value).ok_or(TubeqaError::InvalidReference(value))
    }
}

impl From<VideoId> for String {
    fn from(id: VideoId) -> Self {
        id.0
    }
}

/// Fallback display title used whenever the real title cannot be fetched.
pub fn fallback_title(reference: &str) -> String {
    match VideoId::parse(reference) {
        Ok(id) => format!("Video {}", id),
        Err(_) => {
            let truncated: String = reference.trim().chars().take(VideoId::LEN).collect();
            format!("Video {}", truncated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_shapes_resolve_to_same_id() {
        let shapes = [
            "dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
            "http://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?si=tracking",
            "youtu.be/dQw4w9WgXcQ",
            "  dQw4w9WgXcQ  ",
        ];

        for shape in shapes {
            assert_eq!(
                VideoId::parse(shape).unwrap().as_str(),
                "dQw4w9WgXcQ",
                "shape {shape} resolved differently"
            );
        }
    }

    #[test]
    fn test_short_and_watch_urls_agree() {
        let short = VideoId::parse("https://youtu.be/abc12345678").unwrap();
        let watch = VideoId::parse("https://www.youtube.com/watch?v=abc12345678").unwrap();
        assert_eq!(short, watch);
        assert_eq!(short.as_str(), "abc12345678");
    }

    #[test]
    fn test_malformed_references_are_rejected() {
        let malformed = [
            "",
            "short",
            "dQw4w9WgXcQx",
            "dQw4w9WgXc!",
            "https://vimeo.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?list=PL123",
            "https://www.youtube.com/watch?v=tooshort",
            "https://youtu.be/",
            "https://youtu.be/dQw4w9WgXcQ/extra",
            "https://notyoutube.com/watch?v=dQw4w9WgXcQ",
            "../../etc/pw",
        ];

        for reference in malformed {
            match VideoId::parse(reference) {
                Err(TubeqaError::InvalidReference(_)) => {}
                other => panic!("{reference:?} should be invalid, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_fallback_title() {
        assert_eq!(
            fallback_title("https://youtu.be/abc12345678"),
            "Video abc12345678"
        );
        assert_eq!(fallback_title("not a video at all"), "Video not a video");
        assert_eq!(fallback_title("short"), "Video short");
    }

    #[test]
    fn test_serde_round_trip_rejects_bad_ids() {
        let id: VideoId = serde_json::from_str("\"abc12345678\"").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc12345678\"");
        assert!(serde_json::from_str::<VideoId>("\"../evil\"").is_err());
    }
}
