use std::path::Path;

use crate::AssetError;

/// Decoded audio data: interleaved f32 PCM plus the format needed to play it.
#[derive(Debug, Clone)]
pub struct ClipAsset {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: u64,
}

impl ClipAsset {
    /// Wrap already-decoded interleaved samples.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let frames = if channels == 0 {
            0
        } else {
            samples.len() as u64 / channels as u64
        };
        Self {
            samples,
            sample_rate,
            channels,
            frames,
        }
    }

    /// Decode a WAV file into interleaved f32 samples.
    pub fn from_wav_path(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let reader = hound::WavReader::open(path.as_ref())
            .map_err(|e| AssetError::Decode(format!("wav open: {e}")))?;
        let spec = reader.spec();
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| AssetError::Decode(format!("wav read: {e}")))?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()
                    .map_err(|e| AssetError::Decode(format!("wav read: {e}")))?
            }
        };
        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(AssetError::Decode("wav has empty format".into()));
        }
        Ok(Self::from_samples(samples, spec.sample_rate, spec.channels))
    }

    /// Playable length in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f32 / self.sample_rate as f32
    }
}
