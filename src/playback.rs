use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::audio::{split_into_chunks, AudioChunk, DecodedAudio, SpectrumAnalyzer};
use crate::error::SpecError;
use crate::frames::FrameStore;

/// Cooperative cancellation token handed to a frame producer. A tick that
/// observes the cancelled flag must be a no-op; there is no preemption.
#[derive(Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// The in-flight frame production for one playback pass: a cancellation
/// token and the playhead position within the current chunk.
struct FrameProducer {
    token: CancelToken,
    playhead_ms: f64,
}

impl FrameProducer {
    fn new() -> Self {
        Self {
            token: CancelToken::new(),
            playhead_ms: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Fetching,
    Decoding,
    Playing,
    Paused,
    Finished,
}

/// What happened when newly decoded audio was enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    /// True when an in-flight producer had to be cancelled first. At most
    /// one producer is ever active, so this is at most one cancellation.
    pub cancelled_active_producer: bool,
    pub chunks_added: usize,
}

/// Sequences fetch -> decode -> chunked playback -> advance, with pause,
/// resume and stop. Drives at most one frame producer at a time; enqueueing
/// new audio cancels the active producer before any new chunk is queued.
pub struct PlaybackController {
    state: PlaybackState,
    chunks: Vec<AudioChunk>,
    current_chunk: usize,
    producer: Option<FrameProducer>,
    chunk_ms: f64,
}

impl PlaybackController {
    pub fn new(chunk_ms: f64) -> Self {
        Self {
            state: PlaybackState::Idle,
            chunks: Vec::new(),
            current_chunk: 0,
            producer: None,
            chunk_ms,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn current_chunk(&self) -> usize {
        self.current_chunk
    }

    /// `Idle -> Fetching`. The owner performs the actual network fetch and
    /// reports back through `mark_decoding`/`enqueue_audio`.
    pub fn begin(&mut self) {
        if self.state == PlaybackState::Idle {
            info!("playback starting, entering fetch cycle");
            self.state = PlaybackState::Fetching;
        }
    }

    /// Recording bytes arrived; platform decode is underway.
    pub fn mark_decoding(&mut self) {
        if matches!(self.state, PlaybackState::Idle | PlaybackState::Fetching) {
            self.state = PlaybackState::Decoding;
        }
    }

    /// Chunk freshly decoded audio and append it to the queue, cancelling any
    /// in-flight producer first so frame production never overlaps. Playback
    /// continues at the first unplayed chunk; a finished session resumes at
    /// the first newly added chunk.
    pub fn enqueue_audio(&mut self, audio: &DecodedAudio) -> Result<IngestReport, SpecError> {
        let new_chunks = split_into_chunks(audio, self.chunk_ms)?;

        let cancelled = match self.producer.take() {
            Some(producer) => {
                producer.token.cancel();
                debug!("cancelled in-flight frame producer before enqueue");
                true
            }
            None => false,
        };

        let first_new = self.chunks.len();
        let chunks_added = new_chunks.len();
        self.chunks.extend(new_chunks);

        if self.state == PlaybackState::Finished {
            self.current_chunk = first_new;
        }
        self.state = PlaybackState::Playing;
        self.producer = Some(FrameProducer::new());

        debug!(
            chunks_added,
            total = self.chunks.len(),
            "enqueued decoded audio"
        );
        Ok(IngestReport {
            cancelled_active_producer: cancelled,
            chunks_added,
        })
    }

    /// Produce one frame for the current chunk and append it to the store.
    /// Returns true when a frame was appended. A no-op unless `Playing`, or
    /// when the producer observed its cancellation.
    pub fn tick(
        &mut self,
        dt_ms: f64,
        analyzer: &mut SpectrumAnalyzer,
        store: &mut FrameStore,
    ) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        let Some(producer) = self.producer.as_mut() else {
            return false;
        };
        if producer.token.is_cancelled() {
            self.producer = None;
            return false;
        }
        let Some(chunk) = self.chunks.get(self.current_chunk) else {
            self.state = PlaybackState::Finished;
            self.producer = None;
            return false;
        };

        let start_sample =
            (producer.playhead_ms / 1000.0 * chunk.sample_rate as f64) as usize;
        let window = chunk.mono_window(start_sample, analyzer.fft_size());
        store.append(analyzer.analyze(&window));

        producer.playhead_ms += dt_ms;
        if producer.playhead_ms >= chunk.duration_ms {
            self.advance();
        }
        true
    }

    /// The current chunk reached its natural end: move to the next unplayed
    /// chunk, or finish while keeping the frame store intact for scrubbing.
    fn advance(&mut self) {
        if self.current_chunk + 1 < self.chunks.len() {
            self.current_chunk += 1;
            if let Some(producer) = self.producer.as_mut() {
                producer.playhead_ms = 0.0;
            }
        } else {
            info!("playback finished for all chunks");
            self.state = PlaybackState::Finished;
            self.producer = None;
        }
    }

    /// `Playing -> Paused`: the tick loop freezes, the playhead is kept.
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            debug!(chunk = self.current_chunk, "playback paused");
            self.state = PlaybackState::Paused;
        }
    }

    /// `Paused -> Playing`. The current chunk replays from its first sample;
    /// the play primitive has no resume offset, so this approximation is
    /// intended behavior.
    pub fn resume(&mut self) {
        if self.state == PlaybackState::Paused {
            if let Some(producer) = self.producer.as_mut() {
                producer.playhead_ms = 0.0;
            }
            debug!(chunk = self.current_chunk, "playback resumed");
            self.state = PlaybackState::Playing;
        }
    }

    /// Any state -> `Idle`: cancel production and drop the chunk queue.
    pub fn stop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.token.cancel();
        }
        self.chunks.clear();
        self.current_chunk = 0;
        info!("playback stopped");
        self.state = PlaybackState::Idle;
    }

    /// Elapsed playback time, derived from the chunk grid.
    pub fn current_time_ms(&self) -> f64 {
        self.current_chunk as f64 * self.chunk_ms
    }

    /// Total buffered duration across all queued chunks.
    pub fn buffered_ms(&self) -> f64 {
        self.chunks.iter().map(|c| c.duration_ms).sum()
    }
}
