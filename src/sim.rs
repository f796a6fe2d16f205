//! Simulated data line for unit tests.
//!
//! A [`SimLine`] replays a sensor waveform against a virtual microsecond
//! clock. Every clock reading advances time by 1us, delays advance it by their
//! length, and pin reads are free. Clones share the same line and clock, so a
//! single simulation can serve as pin, delay provider and clock at once.

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use crate::capture::Clock;

/// A stretch of the waveform: line level and its length in microseconds.
pub type Segment = (bool, u64);

struct State {
    now: u64,
    driven_low: bool,
    released_at: Option<u64>,
    segments: Vec<Segment>,
    idle_high: bool,
}

impl State {
    fn level(&self) -> bool {
        if self.driven_low {
            return false;
        }
        let Some(released_at) = self.released_at else {
            return true;
        };

        let mut offset = self.now - released_at;
        for &(high, length) in &self.segments {
            if offset < length {
                return high;
            }
            offset -= length;
        }
        self.idle_high
    }
}

#[derive(Clone)]
pub struct SimLine(Rc<RefCell<State>>);

impl SimLine {
    /// The waveform starts playing when the host releases the line after
    /// driving it low, and is followed by `idle_high` forever.
    pub fn new(segments: Vec<Segment>, idle_high: bool) -> Self {
        SimLine(Rc::new(RefCell::new(State {
            now: 0,
            driven_low: false,
            released_at: None,
            segments,
            idle_high,
        })))
    }
}

/// Waveform of a well-behaved sensor sending `bytes`: pull-up delay,
/// 80us low / 80us high response, then 50us low + 26us (0) or 70us (1) high
/// per bit, closed by a final 50us low.
pub fn frame_waveform(bytes: &[u8]) -> Vec<Segment> {
    let mut segments = vec![(true, 30), (false, 80), (true, 80)];
    for byte in bytes {
        for i in 0..8 {
            let one = (byte >> (7 - i)) & 1 == 1;
            segments.push((false, 50));
            segments.push((true, if one { 70 } else { 26 }));
        }
    }
    segments.push((false, 50));
    segments
}

impl ErrorType for SimLine {
    type Error = Infallible;
}

impl InputPin for SimLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.borrow().level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.borrow().level())
    }
}

impl OutputPin for SimLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        state.driven_low = true;
        state.released_at = None;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        if state.driven_low {
            state.driven_low = false;
            state.released_at = Some(state.now);
        }
        Ok(())
    }
}

impl DelayNs for SimLine {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().now += u64::from(ns).div_ceil(1000);
    }
}

impl Clock for SimLine {
    fn now_us(&self) -> u64 {
        let mut state = self.0.borrow_mut();
        state.now += 1;
        state.now
    }
}
