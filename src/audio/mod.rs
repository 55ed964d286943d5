//! Outbound audio signal path: capture, resample, frame.
//!
//! Raw device blocks flow through [`LinearResampler`] into [`PcmFramer`],
//! which emits fixed 480-byte PCM16-LE frames for the transport.

pub mod capture;
pub mod framer;
pub mod pipeline;
pub mod resampler;

pub use capture::MicCapture;
pub use framer::{FRAME_BYTES, FRAME_SAMPLES, PcmFramer};
pub use pipeline::CapturePipeline;
pub use resampler::{LinearResampler, OUTPUT_SAMPLE_RATE};
