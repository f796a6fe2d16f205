//! Edge timing capture.
//!
//! The sensor encodes every bit as a low phase followed by a high phase whose
//! length carries the value. Rather than sampling the line at a fixed offset,
//! the capture records how long each phase lasted so that the decoder can
//! pick its own threshold afterwards.

use embedded_hal::digital::InputPin;

/// Bytes sent by the sensor per frame (4 payload bytes + checksum).
pub const BYTES_PER_FRAME: usize = 5;

/// Low/high phases per byte: 8 bits, two phases each.
pub const PHASES_PER_BYTE: usize = 16;

/// Longest time (in microseconds) to wait for the next edge.
pub const EDGE_TIMEOUT_US: u64 = 100;

/// Duration recorded for a phase that never ended, and for every phase after it.
pub const TIMED_OUT: u8 = 255;

/// Phase durations for one byte, in microseconds.
///
/// Even indices hold low phases, odd indices hold high phases.
pub type TimingSample = [u8; PHASES_PER_BYTE];

/// Monotonic microsecond clock.
///
/// The counter may wrap; only differences between two readings are used.
pub trait Clock {
    /// Returns the current time in microseconds since an arbitrary fixed point.
    fn now_us(&self) -> u64;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

/// Phase durations of a complete frame.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capture {
    /// One timing sample per byte.
    pub timings: [TimingSample; BYTES_PER_FRAME],
    /// Set when some phase timed out. The remaining phases hold [`TIMED_OUT`].
    pub aborted: bool,
}

/// Busy-waits on a pin and times its edges.
pub struct EdgeTimer<'a, PIN, CLOCK> {
    pin: &'a mut PIN,
    clock: &'a CLOCK,
}

impl<'a, PIN, CLOCK> EdgeTimer<'a, PIN, CLOCK>
where
    PIN: InputPin,
    CLOCK: Clock,
{
    /// Creates a timer over an already released data line.
    pub fn new(pin: &'a mut PIN, clock: &'a CLOCK) -> Self {
        EdgeTimer { pin, clock }
    }

    /// Polls the line until it reads `high`, or until `timeout_us` has passed.
    ///
    /// Returns `Ok(false)` on timeout.
    pub fn wait_for_level(&mut self, high: bool, timeout_us: u64) -> Result<bool, PIN::Error> {
        let start = self.clock.now_us();
        loop {
            if self.pin.is_high()? == high {
                return Ok(true);
            }
            if self.clock.now_us().wrapping_sub(start) > timeout_us {
                return Ok(false);
            }
        }
    }

    /// Waits for the sensor response: low, high, then low again at the start
    /// of the first data bit. Each edge must arrive within [`EDGE_TIMEOUT_US`].
    pub fn handshake(&mut self) -> Result<bool, PIN::Error> {
        Ok(self.wait_for_level(false, EDGE_TIMEOUT_US)?
            && self.wait_for_level(true, EDGE_TIMEOUT_US)?
            && self.wait_for_level(false, EDGE_TIMEOUT_US)?)
    }

    /// Records the duration of all 5 x 16 phases of a frame.
    ///
    /// Must be called right after a successful [`handshake`](Self::handshake),
    /// with the line low. A phase lasting longer than [`EDGE_TIMEOUT_US`]
    /// aborts the capture, but the returned [`Capture`] is always complete.
    pub fn capture_frame(&mut self) -> Result<Capture, PIN::Error> {
        let mut capture = Capture {
            timings: [[TIMED_OUT; PHASES_PER_BYTE]; BYTES_PER_FRAME],
            aborted: false,
        };

        // Last moment the line was seen unchanged. Measuring from it instead of
        // from the moment the loop noticed the edge keeps polling jitter out of
        // the next duration.
        let mut last_seen = self.clock.now_us();
        let mut prev_edge = last_seen;

        for sample in capture.timings.iter_mut() {
            for (phase, duration) in sample.iter_mut().enumerate() {
                if capture.aborted {
                    continue;
                }

                let high = phase % 2 == 1;
                while self.pin.is_high()? == high {
                    last_seen = self.clock.now_us();
                    if last_seen.wrapping_sub(prev_edge) > EDGE_TIMEOUT_US {
                        capture.aborted = true;
                        break;
                    }
                }

                if !capture.aborted {
                    let elapsed = self.clock.now_us().wrapping_sub(prev_edge);
                    *duration = u8::try_from(elapsed).unwrap_or(TIMED_OUT);
                    prev_edge = last_seen;
                }
            }
        }

        Ok(capture)
    }
}
