//! Normalized transcript types.
//!
//! Every transcript provider produces these shapes, whatever its own track format is.

use serde::{Deserialize, Serialize};

/// A single timed caption line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptSegment {
    /// Caption text.
    pub text: String,
    /// Start time in seconds.
    pub start_seconds: f64,
    /// Duration in seconds.
    pub duration_seconds: f64,
}

impl TranscriptSegment {
    /// Create a new transcript segment.
    pub fn new(text: impl Into<String>, start_seconds: f64, duration_seconds: f64) -> Self {
        Self {
            text: text.into(),
            start_seconds,
            duration_seconds,
        }
    }

    /// End time of this segment in seconds.
    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.duration_seconds
    }
}

/// A complete transcript track for one video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Video ID this transcript belongs to.
    pub video_id: String,
    /// Language code of the track (e.g. "en").
    pub language: String,
    /// Whether the track was generated by automatic speech recognition.
    pub is_generated: bool,
    /// Ordered caption segments.
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    /// Create a new transcript from segments.
    pub fn new(
        video_id: impl Into<String>,
        language: impl Into<String>,
        is_generated: bool,
        segments: Vec<TranscriptSegment>,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            language: language.into(),
            is_generated,
            segments,
        }
    }

    /// Flatten the segments into a single text blob, space separated.
    pub fn full_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether the transcript carries no spoken text at all.
    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.text.trim().is_empty())
    }

    /// Total duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.segments
            .iter()
            .map(TranscriptSegment::end_seconds)
            .fold(0.0, f64::max)
    }
}
