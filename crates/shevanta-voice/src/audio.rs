//! WAV helpers: header writing for synthesized/placeholder clips and a small
//! RIFF reader used to reject uploads and backend output that are not WAV.

use crate::error::{VoiceError, VoiceResult};
use std::time::Duration;

/// Size of the canonical RIFF/WAVE header written by this module.
pub const WAV_HEADER_LEN: usize = 44;

/// Sample rate of the placeholder clip.
pub const PLACEHOLDER_SAMPLE_RATE: u32 = 44_100;

/// Samples in the placeholder clip (2048 data bytes at 16-bit).
pub const PLACEHOLDER_SAMPLES: usize = 1024;

fn push_header(buf: &mut Vec<u8>, sample_rate: u32, data_len: u32) {
    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&data_len.saturating_add(36).to_le_bytes());
    buf.extend_from_slice(b"WAVE");
    // fmt subchunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // subchunk1 size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&1u16.to_le_bytes()); // mono
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&sample_rate.saturating_mul(2).to_le_bytes()); // byte rate
    buf.extend_from_slice(&2u16.to_le_bytes()); // block align
    buf.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    // data subchunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_len.to_le_bytes());
}

/// Encode 16-bit PCM (mono) as WAV bytes.
pub fn pcm_i16_to_wav(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    let data_len = samples.len() * 2;
    let mut buf = Vec::with_capacity(WAV_HEADER_LEN + data_len);
    push_header(&mut buf, sample_rate, data_len as u32);
    for s in samples {
        buf.extend_from_slice(&s.to_le_bytes());
    }
    buf
}

/// Encode f32 PCM (mono, -1.0..=1.0) to 16-bit WAV bytes.
pub fn pcm_f32_to_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let pcm: Vec<i16> = samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0).round() as i16)
        .collect();
    pcm_i16_to_wav(&pcm, sample_rate)
}

/// A silent mono clip. Used as the last resort of the synthesis chain so callers
/// always receive something playable.
pub fn silent_wav(sample_rate: u32, samples: usize) -> Vec<u8> {
    pcm_i16_to_wav(&vec![0i16; samples], sample_rate)
}

/// Format facts read from a RIFF/WAVE container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavInfo {
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    /// Bytes of sample data actually present.
    pub data_len: usize,
}

impl WavInfo {
    /// Walk the RIFF chunks of `bytes`; requires a `fmt ` and a `data` chunk.
    pub fn parse(bytes: &[u8]) -> VoiceResult<Self> {
        if bytes.len() < 12 {
            return Err(VoiceError::InvalidAudio(format!(
                "{} bytes is too short for a WAV header",
                bytes.len()
            )));
        }
        if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err(VoiceError::InvalidAudio("missing RIFF/WAVE signature".to_string()));
        }

        let mut fmt: Option<(u16, u16, u32, u16)> = None;
        let mut data_len: Option<usize> = None;
        let mut pos = 12usize;

        while pos + 8 <= bytes.len() {
            let id = &bytes[pos..pos + 4];
            let size = u32::from_le_bytes([bytes[pos + 4], bytes[pos + 5], bytes[pos + 6], bytes[pos + 7]])
                as usize;
            let body_start = pos + 8;
            let remaining = bytes.len() - body_start;

            match id {
                b"fmt " => {
                    if size < 16 || remaining < 16 {
                        return Err(VoiceError::InvalidAudio("truncated fmt chunk".to_string()));
                    }
                    let b = &bytes[body_start..body_start + 16];
                    fmt = Some((
                        u16::from_le_bytes([b[0], b[1]]),
                        u16::from_le_bytes([b[2], b[3]]),
                        u32::from_le_bytes([b[4], b[5], b[6], b[7]]),
                        u16::from_le_bytes([b[14], b[15]]),
                    ));
                }
                b"data" => {
                    // Streamed WAVs may declare a placeholder size (0 / u32::MAX).
                    data_len = Some(size.min(remaining));
                    break;
                }
                _ => {}
            }

            // Chunks are word aligned.
            let advance = size.saturating_add(size & 1);
            pos = match body_start.checked_add(advance) {
                Some(next) => next,
                None => break,
            };
        }

        let (audio_format, channels, sample_rate, bits_per_sample) =
            fmt.ok_or_else(|| VoiceError::InvalidAudio("missing fmt chunk".to_string()))?;
        let data_len = data_len.ok_or_else(|| VoiceError::InvalidAudio("missing data chunk".to_string()))?;
        if channels == 0 || sample_rate == 0 {
            return Err(VoiceError::InvalidAudio(format!(
                "unsupported format: {} channel(s) at {} Hz",
                channels, sample_rate
            )));
        }

        Ok(Self {
            audio_format,
            channels,
            sample_rate,
            bits_per_sample,
            data_len,
        })
    }

    /// Playback length implied by the data chunk.
    pub fn duration(&self) -> Duration {
        let frame = self.channels as u64 * (self.bits_per_sample as u64 / 8).max(1);
        let frames = self.data_len as u64 / frame;
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }
}
