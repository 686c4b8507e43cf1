//! Video source abstraction for tubeqa.
//!
//! Resolves user-supplied references into canonical video identities and fetches
//! transcripts and metadata through a pluggable [`TranscriptProvider`].

mod youtube;
mod ytdlp;

pub use youtube::{fallback_title, VideoId};
pub use ytdlp::YtDlpProvider;

use crate::config::YoutubeSettings;
use crate::error::{Result, TubeqaError};
use crate::transcript::Transcript;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Metadata about a YouTube video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Video identity.
    pub id: VideoId,
    /// Title.
    pub title: String,
    /// Channel or uploader name (if available).
    pub channel: Option<String>,
    /// Duration in seconds (if known).
    pub duration_seconds: Option<u32>,
}

/// Trait for transcript and metadata providers.
///
/// Implementations must report disabled transcripts as
/// [`TubeqaError::TranscriptsDisabled`] and every other failure to produce a track as
/// [`TubeqaError::TranscriptUnavailable`].
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// Fetch metadata for a video.
    async fn fetch_metadata(&self, id: &VideoId) -> Result<VideoMetadata>;

    /// Fetch the first available transcript track, trying `languages` in order.
    async fn fetch_transcript(&self, id: &VideoId, languages: &[String]) -> Result<Transcript>;
}

/// Resolves references and fetches transcripts with language fallback.
pub struct TranscriptResolver {
    provider: Arc<dyn TranscriptProvider>,
    languages: Vec<String>,
}

impl TranscriptResolver {
    /// Create a resolver over a provider with a language preference list.
    pub fn new(provider: Arc<dyn TranscriptProvider>, languages: Vec<String>) -> Self {
        Self {
            provider,
            languages,
        }
    }

    /// Create a yt-dlp backed resolver from settings.
    pub fn from_settings(settings: &YoutubeSettings) -> Result<Self> {
        let provider = YtDlpProvider::from_settings(settings)?;
        Ok(Self::new(Arc::new(provider), settings.languages.clone()))
    }

    /// Language preference order.
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Resolve a bare ID or URL into a canonical video identity.
    pub fn resolve_identity(&self, reference: &str) -> Result<VideoId> {
        VideoId::parse(reference)
    }

    /// Fetch the transcript for a video, trying each preferred language in turn.
    #[instrument(skip(self), fields(video_id = %id))]
    pub async fn fetch_transcript(&self, id: &VideoId) -> Result<Transcript> {
        let transcript = self.provider.fetch_transcript(id, &self.languages).await?;
        info!(
            "Fetched {} transcript ({} segments, generated: {})",
            transcript.language,
            transcript.segments.len(),
            transcript.is_generated
        );
        Ok(transcript)
    }

    /// Best-effort title lookup.
    ///
    /// Never fails: any error yields the deterministic `"Video <id>"` fallback.
    pub async fn fetch_title(&self, reference: &str) -> String {
        let id = match self.resolve_identity(reference) {
            Ok(id) => id,
            Err(_) => return fallback_title(reference),
        };

        match self.provider.fetch_metadata(&id).await {
            Ok(metadata) if !metadata.title.trim().is_empty() => {
                debug!("Resolved title for {}: {}", id, metadata.title);
                metadata.title
            }
            Ok(_) => fallback_title(reference),
            Err(e) => {
                warn!("Title lookup for {} failed, using fallback: {}", id, e);
                fallback_title(reference)
            }
        }
    }
}

/// Validate that a transcript has spoken text before it is chunked.
pub fn ensure_not_empty(transcript: &Transcript) -> Result<()> {
    if transcript.is_empty() {
        return Err(TubeqaError::EmptyTranscript(transcript.video_id.clone()));
    }
    Ok(())
}
