//! Stub collaborators for unit tests.

use crate::embedding::Embedder;
use crate::error::{Result, TubeqaError};
use crate::rag::{Generator, Prompt};
use crate::transcript::{Transcript, TranscriptSegment};
use crate::video_source::{TranscriptProvider, VideoId, VideoMetadata};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Transcript provider serving canned tracks.
#[derive(Default)]
pub struct StubTranscriptProvider {
    titles: HashMap<String, String>,
    disabled: HashSet<String>,
    tracks: HashMap<String, Vec<(String, Vec<TranscriptSegment>)>>,
    transcript_requests: AtomicUsize,
}

impl StubTranscriptProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, id: &str, title: &str) -> Self {
        self.titles.insert(id.to_string(), title.to_string());
        self
    }

    pub fn with_disabled(mut self, id: &str) -> Self {
        self.disabled.insert(id.to_string());
        self
    }

    pub fn with_track(mut self, id: &str, language: &str, segments: Vec<TranscriptSegment>) -> Self {
        self.tracks
            .entry(id.to_string())
            .or_default()
            .push((language.to_string(), segments));
        self
    }

    /// Number of `fetch_transcript` calls so far.
    pub fn transcript_requests(&self) -> usize {
        self.transcript_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptProvider for StubTranscriptProvider {
    async fn fetch_metadata(&self, id: &VideoId) -> Result<VideoMetadata> {
        let title = self
            .titles
            .get(id.as_str())
            .ok_or_else(|| TubeqaError::TranscriptUnavailable(format!("no metadata for {}", id)))?;
        Ok(VideoMetadata {
            id: id.clone(),
            title: title.clone(),
            channel: None,
            duration_seconds: None,
        })
    }

    async fn fetch_transcript(&self, id: &VideoId, languages: &[String]) -> Result<Transcript> {
        self.transcript_requests.fetch_add(1, Ordering::SeqCst);

        if self.disabled.contains(id.as_str()) {
            return Err(TubeqaError::TranscriptsDisabled(id.to_string()));
        }

        let tracks = self.tracks.get(id.as_str()).map(Vec::as_slice).unwrap_or_default();
        for language in languages {
            if let Some((lang, segments)) = tracks.iter().find(|(lang, _)| lang == language) {
                return Ok(Transcript::new(id.as_str(), lang.as_str(), false, segments.clone()));
            }
        }

        Err(TubeqaError::TranscriptUnavailable(format!(
            "no transcript for {} in {:?}",
            id, languages
        )))
    }
}

/// Deterministic bag-of-words embedder that counts its calls.
///
/// Texts sharing words get similar vectors, which is enough for retrieval tests.
pub struct SpyEmbedder {
    model: String,
    dimensions: usize,
    embed_calls: AtomicUsize,
    batch_calls: AtomicUsize,
}

impl SpyEmbedder {
    pub const MODEL: &'static str = "spy-embedding";

    pub fn new() -> Self {
        Self::with_dimensions(256)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            model: Self::MODEL.to_string(),
            dimensions,
            embed_calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Number of single-text `embed` calls.
    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    /// Number of `embed_batch` calls.
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[fnv1a(&word.to_lowercase()) as usize % self.dimensions] += 1.0;
        }
        vector
    }
}

impl Default for SpyEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(0xcbf29ce484222325, |hash, b| {
        (hash ^ b as u64).wrapping_mul(0x100000001b3)
    })
}

#[async_trait]
impl Embedder for SpyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }
}

enum Reply {
    Fixed(String),
    /// Return the context block of the prompt.
    Echo,
}

/// Generator that records every prompt it receives.
pub struct StubGenerator {
    reply: Reply,
    failures: AtomicUsize,
    retryable: bool,
    prompts: Mutex<Vec<Prompt>>,
}

impl StubGenerator {
    /// Reply returned once scripted failures are exhausted.
    pub const RECOVERED: &'static str = "recovered answer";

    fn build(reply: Reply, failures: usize, retryable: bool) -> Self {
        Self {
            reply,
            failures: AtomicUsize::new(failures),
            retryable,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(answer: &str) -> Self {
        Self::build(Reply::Fixed(answer.to_string()), 0, false)
    }

    pub fn echo() -> Self {
        Self::build(Reply::Echo, 0, false)
    }

    /// Fail the first `failures` calls, then reply with [`Self::RECOVERED`].
    pub fn failing_times(failures: usize, retryable: bool) -> Self {
        Self::build(Reply::Fixed(Self::RECOVERED.to_string()), failures, retryable)
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.clone());

        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(TubeqaError::Generation {
                message: "scripted failure".to_string(),
                retryable: self.retryable,
            });
        }

        Ok(match &self.reply {
            Reply::Fixed(answer) => answer.clone(),
            Reply::Echo => {
                let user = prompt.user.as_str();
                let context = user
                    .split_once("Context:\n")
                    .map(|(_, rest)| rest)
                    .and_then(|rest| rest.split_once("\n\nQuestion:"))
                    .map(|(context, _)| context)
                    .unwrap_or(user);
                context.to_string()
            }
        })
    }

    fn model(&self) -> &str {
        "stub-generator"
    }
}
