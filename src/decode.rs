//! Adaptive-threshold bit decoding.
//!
//! A `1` bit has a high phase of ~70us, a `0` bit one of ~26us, and every
//! low phase lasts ~50us. The mean low phase of a byte therefore separates
//! the two high-phase lengths for that particular sensor, whatever its clock
//! drift.

use crate::capture::{BYTES_PER_FRAME, Capture, TimingSample};
use crate::frame::RawFrame;

/// Decision threshold for one byte: the mean of its low phases, leaving out
/// the first one since it may include the gap between bytes.
pub fn threshold(sample: &TimingSample) -> u8 {
    let sum: u16 = sample[2..].iter().step_by(2).map(|&d| u16::from(d)).sum();
    // Mean of seven u8 values always fits a u8.
    (sum / 7) as u8
}

/// Decodes one byte, MSB first. A high phase equal to the threshold is a `0`.
pub fn decode_byte(sample: &TimingSample) -> u8 {
    let threshold = threshold(sample);

    (0..8).fold(0, |byte, bit| {
        if sample[2 * bit + 1] > threshold {
            byte | 1 << (7 - bit)
        } else {
            byte
        }
    })
}

/// Decodes every byte of a capture, aborted or not.
pub fn decode_frame(capture: &Capture) -> RawFrame {
    let mut bytes = [0; BYTES_PER_FRAME];
    for (byte, sample) in bytes.iter_mut().zip(capture.timings.iter()) {
        *byte = decode_byte(sample);
    }
    RawFrame(bytes)
}

/// Mean threshold over all bytes of a capture, for diagnostics.
pub fn average_threshold(capture: &Capture) -> f32 {
    let total: u16 = capture.timings.iter().map(|s| u16::from(threshold(s))).sum();
    f32::from(total) / BYTES_PER_FRAME as f32
}
