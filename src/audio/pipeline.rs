//! Capture-side processing pipeline.
//!
//! Composes [`LinearResampler`] and [`PcmFramer`] and forwards every
//! completed frame into an unbounded channel toward the session's send
//! path. The pipeline is deliberately device-free: the capture callback
//! owns one instance exclusively and pushes raw blocks into it, which
//! keeps all resampler/hold-buffer state off the shared path and makes
//! the full capture->frame path testable without hardware.

use bytes::Bytes;
use tokio::sync::mpsc;

use super::framer::PcmFramer;
use super::resampler::LinearResampler;

/// Resampler + framer feeding completed frames into a channel.
#[derive(Debug)]
pub struct CapturePipeline {
    resampler: LinearResampler,
    framer: PcmFramer,
    frame_tx: mpsc::UnboundedSender<Bytes>,
}

impl CapturePipeline {
    /// Create a pipeline for a capture stream running at `input_rate`.
    #[must_use]
    pub fn new(input_rate: u32, frame_tx: mpsc::UnboundedSender<Bytes>) -> Self {
        Self {
            resampler: LinearResampler::new(input_rate),
            framer: PcmFramer::new(),
            frame_tx,
        }
    }

    /// Process one capture block, sending every frame it completes.
    ///
    /// Sending is non-blocking; if the receiving side is gone the frames
    /// are dropped silently, since that only happens during teardown.
    pub fn push_block(&mut self, block: &[f32]) {
        let resampled = self.resampler.push(block);
        if resampled.is_empty() {
            return;
        }
        for frame in self.framer.accept(&resampled) {
            let _ = self.frame_tx.send(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::framer::FRAME_BYTES;

    #[test]
    fn test_single_48k_block_yields_one_frame() {
        // One 480-sample block at 48 kHz resamples to exactly 240 samples,
        // which is exactly one frame on the wire.
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut pipeline = CapturePipeline::new(48_000, tx);

        let block: Vec<f32> = (0..480).map(|i| ((i % 7) as f32 - 3.0) / 8.0).collect();
        pipeline.push_block(&block);

        let frame = rx.try_recv().expect("one frame");
        assert_eq!(frame.len(), FRAME_BYTES);
        assert!(rx.try_recv().is_err(), "exactly one frame");
    }

    #[test]
    fn test_short_blocks_accumulate() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut pipeline = CapturePipeline::new(48_000, tx);

        // 128-sample blocks at 2:1 yield ~64 output samples each; the
        // fourth block completes the first 240-sample frame.
        let block = vec![0.1f32; 128];
        for _ in 0..3 {
            pipeline.push_block(&block);
            assert!(rx.try_recv().is_err());
        }
        pipeline.push_block(&block);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_closed_channel_does_not_panic() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut pipeline = CapturePipeline::new(48_000, tx);
        pipeline.push_block(&vec![0.0f32; 4800]);
    }
}
