//! Linear-interpolation sample-rate conversion.
//!
//! Capture devices deliver audio at whatever rate the hardware runs
//! (typically 44.1 or 48 kHz); the service consumes mono PCM at a fixed
//! 24 kHz. [`LinearResampler`] converts between the two one capture block
//! at a time, carrying its fractional read position across blocks so the
//! interpolation timeline is continuous over the whole stream.
//!
//! Each block is also centered around zero before resampling to strip the
//! DC offset some capture hardware introduces.

/// Fixed output rate of the resampler (Hz).
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// Stateful single-channel resampler: arbitrary input rate to 24 kHz.
///
/// State persists for the lifetime of a capture stream; it is never reset
/// between blocks, only discarded when the stream itself restarts.
#[derive(Debug)]
pub struct LinearResampler {
    /// Input rate / output rate; the read-position step per output sample.
    ratio: f64,
    /// Fractional read offset into the next input block.
    /// Invariant: `0 <= phase < ratio`.
    phase: f64,
}

impl LinearResampler {
    /// Create a resampler for the given input rate.
    #[must_use]
    pub fn new(input_rate: u32) -> Self {
        Self {
            ratio: f64::from(input_rate) / f64::from(OUTPUT_SAMPLE_RATE),
            phase: 0.0,
        }
    }

    /// Conversion ratio (input rate / 24000).
    #[must_use]
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Current fractional read offset.
    #[must_use]
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Resample one capture block.
    ///
    /// Returns the output samples this block yields; an empty or too-short
    /// block yields an empty vec. Interpolation stops as soon as the
    /// lookahead sample would fall past the end of the block, so no sample
    /// is ever synthesized from data that has not arrived yet.
    pub fn push(&mut self, input: &[f32]) -> Vec<f32> {
        if input.is_empty() {
            return Vec::new();
        }

        // Remove per-block DC bias
        let mean = input.iter().sum::<f32>() / input.len() as f32;

        let mut out = Vec::with_capacity((input.len() as f64 / self.ratio) as usize + 1);
        let mut i = 0u64;
        loop {
            let t = self.phase + i as f64 * self.ratio;
            let idx = t.floor() as usize;
            if idx + 1 >= input.len() {
                break;
            }
            let frac = (t - t.floor()) as f32;
            let a = input[idx] - mean;
            let b = input[idx + 1] - mean;
            out.push(a * (1.0 - frac) + b * frac);
            i += 1;
        }

        // Carry the fractional alignment into the next block
        self.phase = (self.phase + input.len() as f64) % self.ratio;

        out
    }
}
