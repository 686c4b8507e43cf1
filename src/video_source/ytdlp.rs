//! yt-dlp backed transcript provider.
//!
//! Metadata and the caption track listing come from `yt-dlp --dump-json`; the chosen
//! track is downloaded in YouTube's `json3` caption format.

use super::{TranscriptProvider, VideoId, VideoMetadata};
use crate::config::YoutubeSettings;
use crate::error::{Result, TubeqaError};
use crate::transcript::{Transcript, TranscriptSegment};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

/// Caption format requested from YouTube.
const TRACK_FORMAT: &str = "json3";

/// Transcript provider that shells out to yt-dlp.
pub struct YtDlpProvider {
    binary: String,
    http: reqwest::Client,
}

/// A caption track chosen from the yt-dlp listing.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TrackRef {
    pub language: String,
    pub is_generated: bool,
    pub url: String,
}

impl YtDlpProvider {
    /// Create a provider using the given yt-dlp binary.
    pub fn new(binary: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            binary: binary.to_string(),
            http,
        })
    }

    /// Create a provider from settings.
    pub fn from_settings(settings: &YoutubeSettings) -> Result<Self> {
        Self::new(
            &settings.ytdlp_binary,
            Duration::from_secs(settings.request_timeout_seconds),
        )
    }

    /// Run `yt-dlp --dump-json` for a video.
    async fn dump_json(&self, id: &VideoId) -> Result<Value> {
        let output = tokio::process::Command::new(&self.binary)
            .args([
                "--dump-json",
                "--skip-download",
                "--no-warnings",
                "--no-playlist",
                &id.watch_url(),
            ])
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TubeqaError::ToolNotFound(self.binary.clone())
                } else {
                    TubeqaError::TranscriptUnavailable(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TubeqaError::TranscriptUnavailable(format!(
                "Video {} not found or unavailable: {}",
                id,
                stderr.trim()
            )));
        }

        let json_str = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(&json_str).map_err(|e| {
            TubeqaError::TranscriptUnavailable(format!("Failed to parse yt-dlp output: {}", e))
        })
    }

    /// Download and parse a caption track.
    async fn download_track(&self, id: &VideoId, track: &TrackRef) -> Result<Transcript> {
        let unavailable =
            |e: reqwest::Error| TubeqaError::TranscriptUnavailable(format!("Track download failed: {}", e));

        let body = self
            .http
            .get(&track.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(unavailable)?
            .text()
            .await
            .map_err(unavailable)?;

        let segments = parse_json3(&body)?;
        Ok(Transcript::new(
            id.as_str(),
            track.language.clone(),
            track.is_generated,
            segments,
        ))
    }
}

#[async_trait]
impl TranscriptProvider for YtDlpProvider {
    #[instrument(skip(self), fields(video_id = %id))]
    async fn fetch_metadata(&self, id: &VideoId) -> Result<VideoMetadata> {
        let json = self.dump_json(id).await?;
        Ok(metadata_from_json(id, &json))
    }

    #[instrument(skip(self), fields(video_id = %id))]
    async fn fetch_transcript(&self, id: &VideoId, languages: &[String]) -> Result<Transcript> {
        let json = self.dump_json(id).await?;
        let track = select_track(id, &json, languages)?;
        debug!(
            "Selected {} track (generated: {})",
            track.language, track.is_generated
        );
        self.download_track(id, &track).await
    }
}

fn metadata_from_json(id: &VideoId, json: &Value) -> VideoMetadata {
    VideoMetadata {
        id: id.clone(),
        title: json["title"].as_str().unwrap_or_default().to_string(),
        channel: json["channel"]
            .as_str()
            .or_else(|| json["uploader"].as_str())
            .map(|s| s.to_string()),
        duration_seconds: json["duration"].as_f64().map(|d| d as u32),
    }
}

/// Language-keyed track listings, skipping yt-dlp's pseudo-track for live chat.
fn tracks(json: &Value, key: &str) -> Vec<(String, Value)> {
    json[key]
        .as_object()
        .map(|map| {
            map.iter()
                .filter(|(lang, _)| lang.as_str() != "live_chat")
                .map(|(lang, formats)| (lang.clone(), formats.clone()))
                .collect()
        })
        .unwrap_or_default()
}

fn json3_url(formats: &Value) -> Option<String> {
    formats.as_array()?.iter().find_map(|f| {
        (f["ext"].as_str() == Some(TRACK_FORMAT))
            .then(|| f["url"].as_str().map(|s| s.to_string()))
            .flatten()
    })
}

fn find_language(tracks: &[(String, Value)], language: &str) -> Option<(String, String)> {
    let regional = format!("{}-", language);
    let exact = tracks.iter().find(|(lang, _)| lang == language);
    let prefixed = || tracks.iter().find(|(lang, _)| lang.starts_with(&regional));

    exact
        .or_else(prefixed)
        .and_then(|(lang, formats)| json3_url(formats).map(|url| (lang.clone(), url)))
}

/// Pick the first track matching the language preference, manual before generated.
pub(crate) fn select_track(id: &VideoId, json: &Value, languages: &[String]) -> Result<TrackRef> {
    let manual = tracks(json, "subtitles");
    let generated = tracks(json, "automatic_captions");

    if manual.is_empty() && generated.is_empty() {
        return Err(TubeqaError::TranscriptsDisabled(id.to_string()));
    }

    for language in languages {
        if let Some((lang, url)) = find_language(&manual, language) {
            return Ok(TrackRef {
                language: lang,
                is_generated: false,
                url,
            });
        }
        if let Some((lang, url)) = find_language(&generated, language) {
            return Ok(TrackRef {
                language: lang,
                is_generated: true,
                url,
            });
        }
    }

    Err(TubeqaError::TranscriptUnavailable(format!(
        "No transcript for video {} in languages [{}]",
        id,
        languages.join(", ")
    )))
}

#[derive(Debug, Deserialize)]
struct Json3Track {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs", default)]
    start_ms: f64,
    #[serde(rename = "dDurationMs", default)]
    duration_ms: f64,
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Parse a `json3` caption track into normalized segments.
pub(crate) fn parse_json3(body: &str) -> Result<Vec<TranscriptSegment>> {
    let track: Json3Track = serde_json::from_str(body).map_err(|e| {
        TubeqaError::TranscriptUnavailable(format!("Malformed caption track: {}", e))
    })?;

    Ok(track
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
            let text = text.replace('\n', " ");
            let text = text.trim();
            (!text.is_empty()).then(|| {
                TranscriptSegment::new(text, event.start_ms / 1000.0, event.duration_ms / 1000.0)
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id() -> VideoId {
        VideoId::parse("abc12345678").unwrap()
    }

    fn langs() -> Vec<String> {
        vec!["en".to_string(), "hi".to_string()]
    }

    fn formats(url: &str) -> Value {
        json!([
            {"ext": "vtt", "url": format!("{url}&fmt=vtt")},
            {"ext": "json3", "url": format!("{url}&fmt=json3")}
        ])
    }

    #[test]
    fn test_no_tracks_means_disabled() {
        let listing = json!({"title": "t", "subtitles": {}, "automatic_captions": {}});
        assert!(matches!(
            select_track(&id(), &listing, &langs()),
            Err(TubeqaError::TranscriptsDisabled(_))
        ));

        let only_chat = json!({"subtitles": {"live_chat": formats("chat")}});
        assert!(matches!(
            select_track(&id(), &only_chat, &langs()),
            Err(TubeqaError::TranscriptsDisabled(_))
        ));
    }

    #[test]
    fn test_missing_language_is_unavailable() {
        let listing = json!({"subtitles": {"fr": formats("fr")}, "automatic_captions": {}});
        assert!(matches!(
            select_track(&id(), &listing, &langs()),
            Err(TubeqaError::TranscriptUnavailable(_))
        ));
    }

    #[test]
    fn test_prefers_manual_then_language_order() {
        let listing = json!({
            "subtitles": {"hi": formats("manual-hi")},
            "automatic_captions": {"en": formats("auto-en"), "hi": formats("auto-hi")}
        });

        let track = select_track(&id(), &listing, &langs()).unwrap();
        assert_eq!(track.language, "en");
        assert!(track.is_generated);
        assert_eq!(track.url, "auto-en&fmt=json3");

        let listing = json!({
            "subtitles": {"en-US": formats("manual-en")},
            "automatic_captions": {"en": formats("auto-en")}
        });
        let track = select_track(&id(), &listing, &langs()).unwrap();
        assert_eq!(track.language, "en-US");
        assert!(!track.is_generated);
    }

    #[test]
    fn test_parse_json3() {
        let body = r#"{
            "events": [
                {"tStartMs": 0, "dDurationMs": 1500, "segs": [{"utf8": "hello"}, {"utf8": " world"}]},
                {"tStartMs": 1500, "dDurationMs": 10, "aAppend": 1, "segs": [{"utf8": "\n"}]},
                {"tStartMs": 1600, "dDurationMs": 2000},
                {"tStartMs": 2000, "dDurationMs": 2500, "segs": [{"utf8": "about\ncats"}]}
            ]
        }"#;

        let segments = parse_json3(body).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "hello world");
        assert!((segments[0].duration_seconds - 1.5).abs() < 1e-9);
        assert_eq!(segments[1].text, "about cats");
        assert!((segments[1].start_seconds - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_json3_rejects_garbage() {
        assert!(matches!(
            parse_json3("<html>"),
            Err(TubeqaError::TranscriptUnavailable(_))
        ));
    }

    #[test]
    fn test_metadata_from_json() {
        let json = json!({"title": "Cats", "uploader": "Someone", "duration": 61.7});
        let metadata = metadata_from_json(&id(), &json);
        assert_eq!(metadata.title, "Cats");
        assert_eq!(metadata.channel.as_deref(), Some("Someone"));
        assert_eq!(metadata.duration_seconds, Some(61));
    }
}
