//! Question-answering session over one video at a time.
//!
//! A session starts empty. Preparing a video (by reference, by title, or by
//! auto-loading the most recent one) attaches a retriever and makes it ready;
//! questions are then answered against that video until another is prepared.

use crate::chunking::{Chunker, ChunkingConfig};
use crate::config::{Prompts, RagSettings, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result, TubeqaError};
use crate::rag::{AnswerEngine, OpenAIGenerator};
use crate::vector_store::{RetrievalResult, Retriever, VectorIndex, VectorIndexStore};
use crate::video_source::{ensure_not_empty, TranscriptResolver, VideoId};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// How the active index came to be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrigin {
    /// Built from a freshly fetched transcript.
    Created,
    /// An index for the requested video already existed.
    Existing,
    /// No video was named; the most recently indexed one was loaded.
    AutoLoaded,
    /// A saved video was picked by title or ID.
    Selected,
}

impl fmt::Display for IndexOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexOrigin::Created => write!(f, "freshly indexed"),
            IndexOrigin::Existing => write!(f, "loaded existing index"),
            IndexOrigin::AutoLoaded => write!(f, "auto-loaded most recent video"),
            IndexOrigin::Selected => write!(f, "loaded saved video"),
        }
    }
}

/// The video a session is ready to answer questions about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedVideo {
    pub video_id: VideoId,
    pub title: String,
    pub origin: IndexOrigin,
    /// Number of indexed chunks.
    pub chunk_count: usize,
}

impl PreparedVideo {
    pub fn was_created(&self) -> bool {
        self.origin == IndexOrigin::Created
    }

    pub fn was_auto_loaded(&self) -> bool {
        self.origin == IndexOrigin::AutoLoaded
    }
}

enum State {
    Empty,
    Ready {
        video: PreparedVideo,
        retriever: Retriever,
    },
}

/// Ties transcript resolution, chunking, indexing, retrieval and answering together.
pub struct RagSession {
    resolver: TranscriptResolver,
    chunker: Chunker,
    store: Arc<VectorIndexStore>,
    engine: AnswerEngine,
    top_k: usize,
    max_retries: u32,
    retry_delay: Duration,
    state: State,
}

impl RagSession {
    /// Build a session with the yt-dlp and OpenAI backends described by `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let resolver = TranscriptResolver::from_settings(&settings.youtube)?;
        let chunker = Chunker::new(ChunkingConfig::from_settings(&settings.chunking)?);

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding)?);
        let store = Arc::new(VectorIndexStore::from_settings(settings, embedder)?);

        let generator = Arc::new(OpenAIGenerator::from_settings(&settings.rag)?);
        let engine = AnswerEngine::from_settings(generator, &settings.rag, prompts);

        Ok(Self::with_components(resolver, chunker, store, engine, &settings.rag))
    }

    /// Create a session with custom components.
    pub fn with_components(
        resolver: TranscriptResolver,
        chunker: Chunker,
        store: Arc<VectorIndexStore>,
        engine: AnswerEngine,
        rag: &RagSettings,
    ) -> Self {
        Self {
            resolver,
            chunker,
            store,
            engine,
            top_k: rag.top_k,
            max_retries: rag.max_retries,
            retry_delay: Duration::from_millis(500),
            state: State::Empty,
        }
    }

    /// Set the initial backoff delay for [`RagSession::answer_with_retry`].
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set how many chunks are retrieved per question.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn store(&self) -> &Arc<VectorIndexStore> {
        &self.store
    }

    pub fn resolver(&self) -> &TranscriptResolver {
        &self.resolver
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready { .. })
    }

    /// The active video, if any.
    pub fn current(&self) -> Option<&PreparedVideo> {
        match &self.state {
            State::Ready { video, .. } => Some(video),
            State::Empty => None,
        }
    }

    /// Drop the active video and return to the empty state.
    pub fn reset(&mut self) {
        self.state = State::Empty;
    }

    /// Prepare a video for questions.
    ///
    /// With a reference: resolve it, then reuse its index or fetch, chunk and index
    /// the transcript. Without one: load the most recently indexed video.
    #[instrument(skip(self))]
    pub async fn prepare_video(&mut self, reference: Option<&str>) -> Result<PreparedVideo> {
        match reference {
            Some(reference) => self.prepare_reference(reference, false).await,
            None => self.prepare_most_recent(),
        }
    }

    /// Discard any existing index for `reference` and build it again.
    #[instrument(skip(self))]
    pub async fn rebuild_video(&mut self, reference: &str) -> Result<PreparedVideo> {
        self.prepare_reference(reference, true).await
    }

    async fn prepare_reference(&mut self, reference: &str, force: bool) -> Result<PreparedVideo> {
        let id = self.resolver.resolve_identity(reference)?;

        if !force {
            if let Some(index) = self.store.load(&id)? {
                info!("Video {} is already indexed", id);
                return Ok(self.attach(index, IndexOrigin::Existing));
            }
        }

        let transcript = self.resolver.fetch_transcript(&id).await?;
        ensure_not_empty(&transcript)?;

        let chunks = self.chunker.split(&transcript.full_text());
        if chunks.is_empty() {
            return Err(TubeqaError::EmptyTranscript(id.to_string()));
        }
        info!("Split transcript into {} chunks", chunks.len());

        let title = self.resolver.fetch_title(id.as_str()).await;

        if force && self.store.delete(&id).await? {
            info!("Discarded previous index for {}", id);
        }

        let (index, created) = self.store.get_or_build(&id, &chunks, Some(&title)).await?;
        let origin = if created {
            IndexOrigin::Created
        } else {
            IndexOrigin::Existing
        };
        Ok(self.attach(index, origin))
    }

    fn prepare_most_recent(&mut self) -> Result<PreparedVideo> {
        let id = self.store.most_recent()?.ok_or(TubeqaError::NoPriorVideo)?;
        info!("Auto-loading most recent video {}", id);
        let index = self.store.require(&id)?;
        Ok(self.attach(index, IndexOrigin::AutoLoaded))
    }

    /// Load a saved video by ID without fetching or chunking anything.
    #[instrument(skip(self), fields(video_id = %id))]
    pub fn load_saved(&mut self, id: &VideoId) -> Result<PreparedVideo> {
        let index = self.store.require(id)?;
        Ok(self.attach(index, IndexOrigin::Selected))
    }

    /// Load a saved video by its catalog title.
    #[instrument(skip(self))]
    pub fn select(&mut self, title: &str) -> Result<PreparedVideo> {
        let id = self
            .store
            .find_by_title(title)?
            .ok_or_else(|| TubeqaError::IndexNotFound(title.to_string()))?;
        self.load_saved(&id)
    }

    /// Saved videos as `(title, id)` pairs, sorted by title.
    pub fn list_videos(&self) -> Result<Vec<(String, VideoId)>> {
        let mut videos = self.store.list_all()?;
        videos.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()));
        Ok(videos)
    }

    fn attach(&mut self, index: Arc<VectorIndex>, origin: IndexOrigin) -> PreparedVideo {
        let title = match self.store.title(index.video_id()) {
            Ok(Some(title)) => title,
            Ok(None) => index.title().to_string(),
            Err(e) => {
                warn!("Catalog lookup failed, using stored title: {}", e);
                index.title().to_string()
            }
        };

        let video = PreparedVideo {
            video_id: index.video_id().clone(),
            title,
            origin,
            chunk_count: index.len(),
        };
        info!("Ready: \"{}\" ({}, {})", video.title, video.video_id, origin);

        self.state = State::Ready {
            video: video.clone(),
            retriever: Retriever::new(index),
        };
        video
    }

    fn retriever(&self) -> Result<&Retriever> {
        match &self.state {
            State::Ready { retriever, .. } => Ok(retriever),
            State::Empty => Err(TubeqaError::NotReady),
        }
    }

    /// Retrieve the chunks most relevant to `query` without generating an answer.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        self.retriever()?.retrieve(query, k).await
    }

    /// Answer a question about the active video. Calls the model once.
    #[instrument(skip(self))]
    pub async fn answer(&self, question: &str) -> Result<String> {
        let retriever = self.retriever()?;
        let question = question.trim();
        if question.is_empty() {
            return Err(TubeqaError::InvalidInput("question is empty".to_string()));
        }

        let context = retriever.retrieve(question, self.top_k).await?;
        self.engine.answer(question, &context).await
    }

    /// Like [`RagSession::answer`], retrying transient failures with exponential backoff.
    pub async fn answer_with_retry(&self, question: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.answer(question).await {
                Ok(answer) => return Ok(answer),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.retry_delay * 2u32.pow(attempt);
                    attempt += 1;
                    warn!(
                        "Attempt {} failed ({}), retrying in {:?}",
                        attempt, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
