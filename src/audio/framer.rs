//! Frame assembly and PCM16 quantization.
//!
//! Resampled samples accumulate in a hold buffer until a full frame of 240
//! samples (10 ms at 24 kHz) is available, then each frame is quantized to
//! signed 16-bit little-endian PCM and emitted as one 480-byte binary
//! payload. Frames are emitted strictly in generation order and never
//! partially: whatever is left after flushing stays in the hold buffer for
//! the next call.

use bytes::Bytes;

/// Samples per outbound frame (10 ms at 24 kHz).
pub const FRAME_SAMPLES: usize = 240;

/// Bytes per outbound frame (i16 per sample, little-endian).
pub const FRAME_BYTES: usize = FRAME_SAMPLES * 2;

/// Accumulates float samples and emits fixed-size PCM16-LE frames.
#[derive(Debug, Default)]
pub struct PcmFramer {
    hold: Vec<f32>,
}

impl PcmFramer {
    /// Create an empty framer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of samples currently held back, always `< FRAME_SAMPLES`
    /// after [`accept`](Self::accept) returns.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.hold.len()
    }

    /// Append samples and flush every complete frame they enable.
    pub fn accept(&mut self, samples: &[f32]) -> Vec<Bytes> {
        self.hold.extend_from_slice(samples);

        let mut frames = Vec::new();
        while self.hold.len() >= FRAME_SAMPLES {
            let rest = self.hold.split_off(FRAME_SAMPLES);
            let frame = std::mem::replace(&mut self.hold, rest);
            frames.push(quantize(&frame));
        }
        frames
    }
}

/// Quantize one frame of floats to i16 little-endian bytes.
///
/// Samples are clipped to `[-1, 1]` first. Full scale maps asymmetrically:
/// negative values scale by 32768, non-negative by 32767, so both -1.0 and
/// 1.0 land exactly on the i16 limits.
fn quantize(frame: &[f32]) -> Bytes {
    let mut buf = Vec::with_capacity(frame.len() * 2);
    for &sample in frame {
        let s = sample.clamp(-1.0, 1.0);
        let v = if s < 0.0 {
            (s * 32768.0) as i16
        } else {
            (s * 32767.0) as i16
        };
        buf.extend_from_slice(&v.to_le_bytes());
    }
    Bytes::from(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_at(frame: &Bytes, index: usize) -> i16 {
        i16::from_le_bytes([frame[index * 2], frame[index * 2 + 1]])
    }

    #[test]
    fn test_no_frame_until_full() {
        let mut framer = PcmFramer::new();
        let frames = framer.accept(&vec![0.0; FRAME_SAMPLES - 1]);
        assert!(frames.is_empty());
        assert_eq!(framer.pending(), FRAME_SAMPLES - 1);
    }

    #[test]
    fn test_hold_keeps_remainder() {
        let mut framer = PcmFramer::new();
        let frames = framer.accept(&vec![0.0; 1000]);
        assert_eq!(frames.len(), 1000 / FRAME_SAMPLES);
        assert_eq!(framer.pending(), 1000 % FRAME_SAMPLES);
        for frame in &frames {
            assert_eq!(frame.len(), FRAME_BYTES);
        }
    }

    #[test]
    fn test_frames_accumulate_across_calls() {
        let mut framer = PcmFramer::new();
        assert!(framer.accept(&vec![0.0; 200]).is_empty());
        let frames = framer.accept(&vec![0.0; 100]);
        assert_eq!(frames.len(), 1);
        assert_eq!(framer.pending(), 60);
    }

    #[test]
    fn test_full_scale_quantization() {
        let mut framer = PcmFramer::new();
        let mut samples = vec![0.0f32; FRAME_SAMPLES];
        samples[0] = 1.0;
        samples[1] = -1.0;
        samples[2] = 0.5;
        samples[3] = -0.5;

        let frames = framer.accept(&samples);
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(sample_at(frame, 0), 32767);
        assert_eq!(sample_at(frame, 1), -32768);
        assert_eq!(sample_at(frame, 2), 16383);
        assert_eq!(sample_at(frame, 3), -16384);
        assert_eq!(sample_at(frame, 4), 0);
    }

    #[test]
    fn test_out_of_range_samples_clipped() {
        let mut framer = PcmFramer::new();
        let mut samples = vec![0.0f32; FRAME_SAMPLES];
        samples[0] = 2.5;
        samples[1] = -3.0;

        let frame = &framer.accept(&samples)[0];
        assert_eq!(sample_at(frame, 0), 32767);
        assert_eq!(sample_at(frame, 1), -32768);
    }

    #[test]
    fn test_little_endian_layout() {
        let mut framer = PcmFramer::new();
        let mut samples = vec![0.0f32; FRAME_SAMPLES];
        samples[0] = 1.0; // 0x7FFF

        let frame = &framer.accept(&samples)[0];
        assert_eq!(frame[0], 0xFF);
        assert_eq!(frame[1], 0x7F);
    }

    #[test]
    fn test_order_preserved() {
        let mut framer = PcmFramer::new();
        // Two frames whose first samples differ
        let mut samples = vec![0.0f32; FRAME_SAMPLES * 2];
        samples[0] = 0.25;
        samples[FRAME_SAMPLES] = -0.25;

        let frames = framer.accept(&samples);
        assert_eq!(frames.len(), 2);
        assert!(sample_at(&frames[0], 0) > 0);
        assert!(sample_at(&frames[1], 0) < 0);
    }
}
