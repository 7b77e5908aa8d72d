mod analyzer;

pub use analyzer::SpectrumAnalyzer;

use crate::error::SpecError;

/// A fully decoded recording: per-channel f32 samples at a single rate.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    /// One sample vector per channel; all channels have equal length.
    pub channels: Vec<Vec<f32>>,
}

impl DecodedAudio {
    pub fn sample_count(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn duration_ms(&self) -> f64 {
        self.sample_count() as f64 * 1000.0 / self.sample_rate as f64
    }
}

/// A fixed-duration slice of a decoded recording.
///
/// Chunks own independent copies of their sample ranges, so the source
/// `DecodedAudio` can be dropped after chunking. Immutable once created.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
    pub duration_ms: f64,
}

impl AudioChunk {
    pub fn sample_count(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Mono mixdown of one sample range, used as FFT input.
    pub fn mono_window(&self, start: usize, len: usize) -> Vec<f32> {
        let total = self.sample_count();
        let start = start.min(total);
        let end = (start + len).min(total);
        let n_channels = self.channels.len().max(1) as f32;
        (start..end)
            .map(|i| self.channels.iter().map(|c| c[i]).sum::<f32>() / n_channels)
            .collect()
    }
}

/// Split a decoded recording into equal-duration chunks.
///
/// Chunk count is `ceil(duration / target_chunk_ms)` and every chunk except
/// possibly the last holds `ceil(total_samples / chunk_count)` samples, so
/// concatenating the chunks reproduces the source sample sequence exactly.
pub fn split_into_chunks(
    audio: &DecodedAudio,
    target_chunk_ms: f64,
) -> Result<Vec<AudioChunk>, SpecError> {
    let total_samples = audio.sample_count();
    if total_samples == 0 {
        return Err(SpecError::InvalidInput(
            "cannot chunk an empty audio buffer".into(),
        ));
    }
    if target_chunk_ms <= 0.0 {
        return Err(SpecError::InvalidInput(format!(
            "chunk duration must be positive, got {target_chunk_ms}ms"
        )));
    }

    let num_chunks = (audio.duration_ms() / target_chunk_ms).ceil().max(1.0) as usize;
    let chunk_size = total_samples.div_ceil(num_chunks);

    let mut chunks = Vec::with_capacity(num_chunks);
    for i in 0..num_chunks {
        let start = i * chunk_size;
        let end = (start + chunk_size).min(total_samples);
        if start >= end {
            break;
        }

        let channels: Vec<Vec<f32>> = audio
            .channels
            .iter()
            .map(|samples| samples[start..end].to_vec())
            .collect();

        chunks.push(AudioChunk {
            sample_rate: audio.sample_rate,
            duration_ms: (end - start) as f64 * 1000.0 / audio.sample_rate as f64,
            channels,
        });
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono(sample_rate: u32, samples: Vec<f32>) -> DecodedAudio {
        DecodedAudio {
            sample_rate,
            channels: vec![samples],
        }
    }

    #[test]
    fn chunk_count_matches_ceil_of_duration_ratio() {
        // 10 seconds at 48kHz, 40ms chunks -> exactly 250 chunks
        let audio = mono(48_000, vec![0.0; 480_000]);
        let chunks = split_into_chunks(&audio, 40.0).unwrap();
        assert_eq!(chunks.len(), 250);
        assert_eq!(chunks.iter().map(|c| c.sample_count()).sum::<usize>(), 480_000);
    }

    #[test]
    fn uneven_duration_puts_remainder_in_last_chunk() {
        // 100 samples at 1kHz = 100ms; 30ms chunks -> ceil(100/30) = 4 chunks
        let audio = mono(1_000, (0..100).map(|i| i as f32).collect());
        let chunks = split_into_chunks(&audio, 30.0).unwrap();
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].sample_count(), 25);
        assert_eq!(chunks[3].sample_count(), 25);
    }

    #[test]
    fn concatenated_chunks_reproduce_the_source() {
        let samples: Vec<f32> = (0..1_000).map(|i| (i as f32).sin()).collect();
        let audio = mono(8_000, samples.clone());
        let chunks = split_into_chunks(&audio, 17.0).unwrap();

        let rejoined: Vec<f32> = chunks
            .iter()
            .flat_map(|c| c.channels[0].iter().copied())
            .collect();
        assert_eq!(rejoined, samples);
    }

    #[test]
    fn stereo_channels_are_copied_independently() {
        let audio = DecodedAudio {
            sample_rate: 1_000,
            channels: vec![vec![1.0; 50], vec![-1.0; 50]],
        };
        let chunks = split_into_chunks(&audio, 10.0).unwrap();
        assert_eq!(chunks.len(), 5);
        for chunk in &chunks {
            assert_eq!(chunk.channels.len(), 2);
            assert!(chunk.channels[0].iter().all(|&s| s == 1.0));
            assert!(chunk.channels[1].iter().all(|&s| s == -1.0));
        }
    }

    #[test]
    fn empty_buffer_is_rejected() {
        let audio = mono(48_000, vec![]);
        assert!(matches!(
            split_into_chunks(&audio, 40.0),
            Err(SpecError::InvalidInput(_))
        ));
    }

    #[test]
    fn non_positive_duration_is_rejected() {
        let audio = mono(48_000, vec![0.0; 100]);
        assert!(matches!(
            split_into_chunks(&audio, 0.0),
            Err(SpecError::InvalidInput(_))
        ));
        assert!(matches!(
            split_into_chunks(&audio, -5.0),
            Err(SpecError::InvalidInput(_))
        ));
    }

    #[test]
    fn mono_window_mixes_channels_and_clamps() {
        let chunk = AudioChunk {
            sample_rate: 1_000,
            duration_ms: 4.0,
            channels: vec![vec![1.0, 1.0, 1.0, 1.0], vec![0.0, 0.0, 0.0, 0.0]],
        };
        let window = chunk.mono_window(2, 10);
        assert_eq!(window, vec![0.5, 0.5]);
    }
}
