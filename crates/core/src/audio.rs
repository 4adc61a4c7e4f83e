//! PCM frame constants and energy helpers.
//!
//! The wire format is fixed by the protocol: signed 16-bit little-endian
//! mono PCM at 16 kHz, delivered as 20 ms frames.

/// Samples per second.
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// Frame duration.
pub const FRAME_MS: u32 = 20;

/// Samples per frame: 16000 * 0.020 = 320.
pub const FRAME_SAMPLES: usize = (SAMPLE_RATE_HZ as usize * FRAME_MS as usize) / 1000;

/// Bytes per frame: 320 samples * 2 bytes (i16) = 640.
pub const FRAME_BYTES: usize = FRAME_SAMPLES * 2;

/// Cap on the per-turn voiced audio buffer: ~10 seconds of 16 kHz mono PCM.
pub const MAX_VOICED_BUFFER_BYTES: usize = SAMPLE_RATE_HZ as usize * 2 * 10;

/// Root-mean-square energy of a little-endian i16 PCM frame.
///
/// Returns 0.0 for an empty or odd-length (malformed) slice rather than
/// panicking; callers treat that as silence.
pub fn rms(frame: &[u8]) -> f64 {
    if frame.len() < 2 {
        return 0.0;
    }
    let samples = frame.chunks_exact(2);
    let n = samples.len();
    if n == 0 {
        return 0.0;
    }
    let sum_sq: f64 = samples
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f64)
        .map(|s| s * s)
        .sum();
    (sum_sq / n as f64).sqrt()
}
