use tracing::{debug, warn};

use crate::audio::SpectrumAnalyzer;
use crate::config::{AnalysisConfig, Config};
use crate::error::SpecError;
use crate::frames::FrameStore;
use crate::playback::{PlaybackController, PlaybackState};
use crate::render::{Canvas, Viewport, ViewportGeometry};
use crate::scrub::ScrubController;
use crate::source::{decode_wav, RecordingSource};

/// One monitoring session: owns the frame store, the playback state machine,
/// the analyser and the canvas, and wires fetch polling, per-tick frame
/// production and scrub navigation together. Collaborators receive it by
/// reference; there is no ambient global state.
pub struct Session<S: RecordingSource> {
    config: Config,
    source: S,
    controller: PlaybackController,
    analyzer: SpectrumAnalyzer,
    store: FrameStore,
    canvas: Canvas,
    viewport: Viewport,
    scrub: ScrubController,
    /// Right edge of the viewport while scrubbed back; None = live tail.
    scrub_cursor: Option<usize>,
}

impl<S: RecordingSource> Session<S> {
    pub fn new(config: Config, source: S, viewport_width: usize) -> Result<Self, SpecError> {
        config.validate()?;
        let analysis = &config.analysis;
        let analyzer = SpectrumAnalyzer::new(analysis.fft_size, analysis.smoothing)?;
        let geometry = ViewportGeometry::new(
            viewport_width,
            analysis.fft_size,
            analysis.sample_rate,
            analysis.min_frequency,
            analysis.max_frequency,
        );
        let canvas = Canvas::new(viewport_width, geometry.height());
        let viewport = Viewport::new(geometry, config.viewport.ramp);

        Ok(Self {
            controller: PlaybackController::new(analysis.chunk_ms),
            store: FrameStore::with_capacity_bound(config.viewport.frame_capacity),
            scrub: ScrubController::new(config.viewport.scrub_step_px),
            scrub_cursor: None,
            analyzer,
            canvas,
            viewport,
            source,
            config,
        })
    }

    pub fn state(&self) -> PlaybackState {
        self.controller.state()
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn store_len(&self) -> usize {
        self.store.len()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Begin the session: enter the fetch cycle and run it once immediately.
    /// Subsequent cycles are driven by `poll` on the owner's interval.
    pub async fn start(&mut self) {
        self.controller.begin();
        self.poll().await;
    }

    /// One fetch cycle: discover and download the newest recording, decode
    /// it, enqueue its chunks. Skipped while paused or before `start`. Any
    /// failure is logged and the playback state is left untouched; the next
    /// scheduled poll is the retry.
    pub async fn poll(&mut self) {
        match self.controller.state() {
            PlaybackState::Idle | PlaybackState::Paused => return,
            _ => {}
        }

        let bytes = match self.source.newest_recording().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("fetch cycle failed: {e}");
                return;
            }
        };

        self.controller.mark_decoding();
        let audio = match decode_wav(&bytes) {
            Ok(audio) => audio,
            Err(e) => {
                warn!("discarding undecodable recording: {e}");
                return;
            }
        };

        match self.controller.enqueue_audio(&audio) {
            Ok(report) => {
                debug!(
                    chunks = report.chunks_added,
                    cancelled = report.cancelled_active_producer,
                    "recording enqueued"
                );
                // playback is live again; leave any scrub position behind
                if self.scrub_cursor.take().is_some() {
                    self.render_tail();
                }
            }
            Err(e) => warn!("rejected decoded recording: {e}"),
        }
    }

    /// One render tick: produce at most one frame and paint it as the newest
    /// column. No-op while paused, finished, scrubbed back, or idle.
    pub fn tick(&mut self, dt_ms: f64) {
        let produced = self
            .controller
            .tick(dt_ms, &mut self.analyzer, &mut self.store);
        if produced && self.scrub_cursor.is_none() {
            if let Ok(frame) = self.store.get(self.store.len() - 1) {
                self.viewport.render_live(&mut self.canvas, frame);
            }
        }
    }

    pub fn pause(&mut self) {
        self.controller.pause();
    }

    /// Resume live playback: drop any scrub position, repaint the live tail
    /// and continue producing frames.
    pub fn resume(&mut self) {
        if self.scrub_cursor.take().is_some() {
            self.render_tail();
        }
        self.controller.resume();
    }

    pub fn stop(&mut self) {
        self.controller.stop();
        self.store.clear();
        self.scrub_cursor = None;
        self.canvas.clear();
    }

    /// Drag-to-scrub. Active while paused or after playback finished; the
    /// frame history stays intact either way.
    pub fn scrub(&mut self, delta_px: i32) {
        if !matches!(
            self.controller.state(),
            PlaybackState::Paused | PlaybackState::Finished
        ) {
            return;
        }

        let right_edge = self.scrub_cursor.unwrap_or(self.store.len());
        let width = self.viewport.geometry.width;
        if let Some(edge) =
            self.scrub
                .target_right_edge(delta_px, right_edge, width, self.store.len())
        {
            self.scrub_cursor = Some(edge);
            self.viewport.render_range(
                &mut self.canvas,
                &self.store,
                edge.saturating_sub(width),
                edge,
            );
        }
    }

    /// Right edge of what is currently on screen, in frame indices.
    pub fn right_edge(&self) -> usize {
        self.scrub_cursor.unwrap_or(self.store.len())
    }

    /// Playback position through buffered history, 0..=1. Full while the
    /// history still fits the viewport.
    pub fn progress(&self) -> f64 {
        let len = self.store.len();
        let width = self.viewport.geometry.width;
        if len <= width {
            return 1.0;
        }
        let edge = self.right_edge();
        ((edge.saturating_sub(width)) as f64 / (len - width) as f64).clamp(0.0, 1.0)
    }

    pub fn buffered_ms(&self) -> f64 {
        self.controller.buffered_ms()
    }

    pub fn current_time_ms(&self) -> f64 {
        self.controller.current_time_ms()
    }

    /// Change the analysis geometry (fft size, frequency bounds, assumed
    /// sample rate). Validates, rebuilds the analyser and canvas, and
    /// repaints the visible range.
    pub fn apply_analysis_change(&mut self, analysis: AnalysisConfig) -> Result<(), SpecError> {
        let mut candidate = self.config.clone();
        candidate.analysis = analysis;
        candidate.validate()?;

        self.analyzer = SpectrumAnalyzer::new(
            candidate.analysis.fft_size,
            candidate.analysis.smoothing,
        )?;
        self.config = candidate;
        self.rebuild_geometry(self.viewport.geometry.width);
        Ok(())
    }

    /// The terminal was resized: recompute the viewport width and repaint.
    pub fn resize_viewport(&mut self, width: usize) {
        self.rebuild_geometry(width);
    }

    pub fn cycle_ramp(&mut self) {
        self.viewport.ramp = self.viewport.ramp.next();
        self.render_visible();
    }

    fn rebuild_geometry(&mut self, width: usize) {
        let analysis = &self.config.analysis;
        let geometry = ViewportGeometry::new(
            width,
            analysis.fft_size,
            analysis.sample_rate,
            analysis.min_frequency,
            analysis.max_frequency,
        );
        self.viewport.set_geometry(geometry);
        self.canvas.resize(width, geometry.height());
        self.render_visible();
    }

    fn render_visible(&mut self) {
        match self.scrub_cursor {
            Some(edge) => {
                let width = self.viewport.geometry.width;
                self.viewport.render_range(
                    &mut self.canvas,
                    &self.store,
                    edge.saturating_sub(width),
                    edge,
                );
            }
            None => self.render_tail(),
        }
    }

    fn render_tail(&mut self) {
        let width = self.viewport.geometry.width;
        let end = self.store.len();
        self.viewport
            .render_range(&mut self.canvas, &self.store, end.saturating_sub(width), end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Canned recording source: pops one prepared response per poll.
    struct StubSource {
        responses: Mutex<VecDeque<Result<Vec<u8>, SpecError>>>,
        calls: Mutex<usize>,
    }

    impl StubSource {
        fn new(responses: Vec<Result<Vec<u8>, SpecError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl RecordingSource for StubSource {
        async fn newest_recording(&self) -> Result<Vec<u8>, SpecError> {
            *self.calls.lock().unwrap() += 1;
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(SpecError::NetworkFailure("no canned response".into())))
        }
    }

    fn short_wav(ms: usize) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 1_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut bytes = Vec::new();
        let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
        for i in 0..ms {
            writer.write_sample(((i % 100) as i16) * 100).unwrap();
        }
        writer.finalize().unwrap();
        bytes
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.analysis.fft_size = 64;
        config.analysis.sample_rate = 1_000;
        config.analysis.min_frequency = 10.0;
        config.analysis.max_frequency = 400.0;
        config.analysis.chunk_ms = 40.0;
        config
    }

    #[tokio::test]
    async fn failed_fetch_leaves_state_unchanged_and_produces_nothing() {
        let source = StubSource::new(vec![Err(SpecError::NetworkFailure(
            "GET /newest-wav returned 500".into(),
        ))]);
        let mut session = Session::new(test_config(), source, 16).unwrap();

        session.start().await;
        assert_eq!(session.state(), PlaybackState::Fetching);

        session.tick(16.0);
        assert_eq!(session.store_len(), 0);
    }

    #[tokio::test]
    async fn undecodable_recording_is_discarded() {
        let source = StubSource::new(vec![Ok(b"not a wav at all".to_vec())]);
        let mut session = Session::new(test_config(), source, 16).unwrap();

        session.start().await;
        assert_ne!(session.state(), PlaybackState::Playing);
        session.tick(16.0);
        assert_eq!(session.store_len(), 0);
    }

    #[tokio::test]
    async fn successful_fetch_plays_and_paints_frames() {
        let source = StubSource::new(vec![Ok(short_wav(120))]);
        let mut session = Session::new(test_config(), source, 16).unwrap();

        session.start().await;
        assert_eq!(session.state(), PlaybackState::Playing);

        session.tick(20.0);
        assert_eq!(session.store_len(), 1);

        // the newest column is the canvas right edge
        let canvas = session.canvas();
        let x = canvas.width - 1;
        let mut painted = false;
        for y in 0..canvas.height {
            if canvas.get_pixel(x, y) != (0, 0, 0) {
                painted = true;
                break;
            }
        }
        assert!(painted);
    }

    #[tokio::test]
    async fn poll_is_skipped_while_paused() {
        let source = StubSource::new(vec![Ok(short_wav(120)), Ok(short_wav(120))]);
        let mut session = Session::new(test_config(), source, 16).unwrap();

        session.start().await;
        assert_eq!(session.source.calls(), 1);

        session.pause();
        session.poll().await;
        assert_eq!(session.source.calls(), 1);

        session.resume();
        session.poll().await;
        assert_eq!(session.source.calls(), 2);
    }

    #[tokio::test]
    async fn scrub_moves_the_right_edge_and_resume_returns_to_live() {
        let source = StubSource::new(vec![Ok(short_wav(4_000))]);
        let mut session = Session::new(test_config(), source, 8).unwrap();

        session.start().await;
        // produce enough frames to scroll well past the viewport
        for _ in 0..40 {
            session.tick(20.0);
        }
        let len = session.store_len();
        assert!(len > 8);
        assert_eq!(session.right_edge(), len);

        session.pause();
        session.scrub(8); // two 4px steps back into history
        assert_eq!(session.right_edge(), len - 8);
        session.scrub(-8);
        assert_eq!(session.right_edge(), len);

        session.scrub(10_000); // clamps at the oldest full viewport
        assert_eq!(session.right_edge(), 8);

        session.resume();
        assert_eq!(session.right_edge(), session.store_len());
        assert_eq!(session.state(), PlaybackState::Playing);
    }

    #[tokio::test]
    async fn scrub_is_ignored_while_playing() {
        let source = StubSource::new(vec![Ok(short_wav(4_000))]);
        let mut session = Session::new(test_config(), source, 8).unwrap();
        session.start().await;
        for _ in 0..40 {
            session.tick(20.0);
        }

        session.scrub(100);
        assert_eq!(session.right_edge(), session.store_len());
    }

    #[tokio::test]
    async fn progress_is_full_until_history_exceeds_the_viewport() {
        let source = StubSource::new(vec![Ok(short_wav(4_000))]);
        let mut session = Session::new(test_config(), source, 8).unwrap();
        session.start().await;

        session.tick(20.0);
        assert_eq!(session.progress(), 1.0);

        for _ in 0..39 {
            session.tick(20.0);
        }
        assert_eq!(session.progress(), 1.0); // live tail is the newest window

        session.pause();
        session.scrub(10_000);
        assert_eq!(session.progress(), 0.0); // pinned at the oldest window
    }

    #[tokio::test]
    async fn analysis_change_rebuilds_geometry_and_validates() {
        let source = StubSource::new(vec![Ok(short_wav(500))]);
        let mut session = Session::new(test_config(), source, 16).unwrap();
        session.start().await;
        for _ in 0..5 {
            session.tick(20.0);
        }

        let mut analysis = session.config().analysis.clone();
        analysis.fft_size = 128;
        session.apply_analysis_change(analysis).unwrap();
        assert_eq!(session.config().analysis.fft_size, 128);
        assert_eq!(session.canvas().height, {
            // bin width 1000/128 Hz; bins floor(10/7.8125)=1 .. floor(400/7.8125)=51
            50
        });

        let mut bad = session.config().analysis.clone();
        bad.fft_size = 100;
        assert!(session.apply_analysis_change(bad).is_err());
        assert_eq!(session.config().analysis.fft_size, 128);
    }

    #[tokio::test]
    async fn stop_clears_history_and_canvas() {
        let source = StubSource::new(vec![Ok(short_wav(500))]);
        let mut session = Session::new(test_config(), source, 16).unwrap();
        session.start().await;
        for _ in 0..5 {
            session.tick(20.0);
        }
        assert!(session.store_len() > 0);

        session.stop();
        assert_eq!(session.state(), PlaybackState::Idle);
        assert_eq!(session.store_len(), 0);
        assert_eq!(session.canvas().get_pixel(15, 0), (0, 0, 0));
    }
}
