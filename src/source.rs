use std::io::Cursor;

use serde::Deserialize;
use tracing::debug;

use crate::audio::DecodedAudio;
use crate::error::SpecError;

/// Where recordings come from. The live implementation talks to the
/// discovery service over HTTP; tests substitute canned bytes or failures.
pub trait RecordingSource {
    /// Fetch the bytes of the newest available recording.
    fn newest_recording(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, SpecError>> + Send;
}

#[derive(Debug, Deserialize)]
struct NewestWav {
    newest_file: String,
}

/// Two-request discovery protocol: `GET /newest-wav` names the newest file,
/// `GET /path/<file>` serves its bytes.
pub struct HttpRecordingSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRecordingSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl RecordingSource for HttpRecordingSource {
    async fn newest_recording(&self) -> Result<Vec<u8>, SpecError> {
        let meta_url = format!("{}/newest-wav", self.base_url);
        let response = self.client.get(&meta_url).send().await?;
        if !response.status().is_success() {
            return Err(SpecError::NetworkFailure(format!(
                "{meta_url} returned {}",
                response.status()
            )));
        }
        let body = response.bytes().await?;
        let meta: NewestWav = serde_json::from_slice(&body)
            .map_err(|e| SpecError::NetworkFailure(format!("bad discovery response: {e}")))?;
        debug!(file = %meta.newest_file, "newest recording discovered");

        let file_url = format!("{}/path/{}", self.base_url, meta.newest_file);
        let response = self.client.get(&file_url).send().await?;
        if !response.status().is_success() {
            return Err(SpecError::NetworkFailure(format!(
                "{file_url} returned {}",
                response.status()
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Decode a WAV byte buffer into per-channel f32 samples. Integer sample
/// formats are normalized into `[-1, 1]`.
pub fn decode_wav(bytes: &[u8]) -> Result<DecodedAudio, SpecError> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    let channel_count = spec.channels as usize;
    if channel_count == 0 {
        return Err(SpecError::DecodeFailure("wav has zero channels".into()));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    let frames = interleaved.len() / channel_count;
    let mut channels = vec![Vec::with_capacity(frames); channel_count];
    for (i, sample) in interleaved.into_iter().enumerate() {
        channels[i % channel_count].push(sample);
    }

    Ok(DecodedAudio {
        sample_rate: spec.sample_rate,
        channels,
    })
}
