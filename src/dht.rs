use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};

use crate::capture::{Capture, Clock, EdgeTimer};
use crate::decode::{average_threshold, decode_frame};
use crate::error::DhtError;
use crate::model::SensorModel;

/// Driver for a sensor of the DHT family.
pub struct Dht<PIN, D, C> {
    pin: PIN,
    delay: D,
    clock: C,
    model: SensorModel,
}

/// Reading returned by the sensor.
///
/// For [`SensorModel::Ms01`] the humidity field holds soil moisture in
/// percent and the temperature field holds the raw probe voltage.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub relative_humidity: f32,
}

impl Reading {
    /// Placeholder published when a read fails.
    pub const NAN: Reading = Reading {
        temperature: f32::NAN,
        relative_humidity: f32::NAN,
    };

    /// Whether both values are numbers.
    pub fn is_valid(&self) -> bool {
        !self.temperature.is_nan() && !self.relative_humidity.is_nan()
    }
}

impl<PIN, DELAY, CLOCK, E> Dht<PIN, DELAY, CLOCK>
where
    PIN: InputPin<Error = E> + OutputPin<Error = E>,
    DELAY: DelayNs,
    CLOCK: Clock,
{
    /// Creates a new instance of the driver.
    ///
    /// # Arguments
    ///
    /// * `pin` - The GPIO pin connected to the data line, in open-drain mode
    ///   with a pull-up. `set_high` must release the line.
    /// * `delay` - A delay provider implementing the `DelayNs` trait.
    /// * `clock` - A monotonic microsecond clock.
    /// * `model` - The sensor model on the line.
    pub fn new(pin: PIN, delay: DELAY, clock: CLOCK, model: SensorModel) -> Self {
        Dht {
            pin,
            delay,
            clock,
            model,
        }
    }

    /// The configured sensor model.
    pub fn model(&self) -> SensorModel {
        self.model
    }

    /// Releases the pin, delay provider and clock.
    pub fn release(self) -> (PIN, DELAY, CLOCK) {
        (self.pin, self.delay, self.clock)
    }

    /// Reads a measurement from the sensor.
    ///
    /// This method performs the complete communication sequence: sending the
    /// start signal, timing the handshake and all 40 data bits with
    /// interrupts disabled, decoding the bits, validating the checksum and
    /// converting the payload for the configured model.
    ///
    /// Interrupts stay disabled for a few milliseconds. The sensor needs a
    /// pause between reads (about 2 s for a DHT22); failed reads are not
    /// retried.
    ///
    /// # Returns
    ///
    /// * `Ok(Reading)` if the read is successful and the checksum is valid.
    /// * `Err(DhtError)` describing why the read was rejected.
    pub fn read(&mut self) -> Result<Reading, DhtError<E>> {
        let result = self.measure();

        match &result {
            Ok(reading) => {
                info!("Temperature: {}", reading.temperature);
                info!("Humidity: {}", reading.relative_humidity);
            }
            Err(err) => error!("{}", err.message()),
        }

        result
    }

    /// Reads a measurement into `values`.
    ///
    /// On failure both values are set to NaN and `false` is returned.
    pub fn read_into(&mut self, values: &mut Reading) -> bool {
        match self.read() {
            Ok(reading) => {
                *values = reading;
                true
            }
            Err(_) => {
                *values = Reading::NAN;
                false
            }
        }
    }

    fn measure(&mut self) -> Result<Reading, DhtError<E>> {
        self.send_start_signal()?;

        let capture = self.receive()?;
        let frame = decode_frame(&capture);

        debug!(
            "Avg Low: {} usec bytes: {:?} timings: {:?}",
            average_threshold(&capture),
            frame.0,
            capture.timings
        );

        if capture.aborted {
            return Err(DhtError::ProtocolTimeout);
        }

        if !frame.is_valid() {
            return Err(DhtError::ChecksumMismatch);
        }

        let reading = self.model.convert(frame.payload());
        if !reading.is_valid() {
            return Err(DhtError::InvalidReading);
        }

        Ok(reading)
    }

    /// Pulls the line low for the model's start pulse.
    ///
    /// The line is released first so it starts from a defined idle level.
    fn send_start_signal(&mut self) -> Result<(), DhtError<E>> {
        self.pin.set_high()?;
        self.pin.set_low()?;
        self.delay.delay_us(self.model.profile().start_pulse_us);
        Ok(())
    }

    /// Releases the line and times the sensor's answer inside a critical
    /// section, so that no interrupt stretches a measured phase.
    fn receive(&mut self) -> Result<Capture, DhtError<E>> {
        let pin = &mut self.pin;
        let clock = &self.clock;

        critical_section::with(|_cs| -> Result<Capture, DhtError<E>> {
            pin.set_high()?;

            let mut timer = EdgeTimer::new(pin, clock);
            if !timer.handshake()? {
                return Err(DhtError::NoResponse);
            }
            Ok(timer.capture_frame()?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimLine, frame_waveform};
    use embedded_hal_mock::eh1::delay::CheckedDelay;
    use embedded_hal_mock::eh1::delay::Transaction as DelayTx;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTx,
    };

    fn sensor(segments: Vec<(bool, u64)>, model: SensorModel) -> Dht<SimLine, SimLine, SimLine> {
        let line = SimLine::new(segments, true);
        Dht::new(line.clone(), line.clone(), line, model)
    }

    fn frame(bytes: [u8; 5], model: SensorModel) -> Dht<SimLine, SimLine, SimLine> {
        sensor(frame_waveform(&bytes), model)
    }

    #[test]
    fn test_start_signal() {
        let expect = [PinTx::set(PinState::High), PinTx::set(PinState::Low)];
        let mut pin = PinMock::new(&expect);

        let delay_transactions = vec![DelayTx::delay_us(2_000)];
        let mut delay = CheckedDelay::new(&delay_transactions);

        let mut dht = Dht::new(pin.clone(), &mut delay, SimLine::new(vec![], true), SensorModel::Dht22);
        dht.send_start_signal().unwrap();

        pin.done();
        delay.done();
    }

    #[test]
    fn test_start_signal_per_model() {
        for model in SensorModel::ALL {
            let expect = [PinTx::set(PinState::High), PinTx::set(PinState::Low)];
            let mut pin = PinMock::new(&expect);

            let delay_transactions = vec![DelayTx::delay_us(model.profile().start_pulse_us)];
            let mut delay = CheckedDelay::new(&delay_transactions);

            let mut dht = Dht::new(pin.clone(), &mut delay, SimLine::new(vec![], true), model);
            dht.send_start_signal().unwrap();

            pin.done();
            delay.done();
        }
    }

    #[test]
    fn test_read_valid() {
        // Humidity 0x025B = 60.3%, temperature 0x0114 = 27.6C, checksum 0x72
        let mut dht = frame([0x02, 0x5B, 0x01, 0x14, 0x72], SensorModel::Dht22);

        assert_eq!(
            dht.read().unwrap(),
            Reading {
                relative_humidity: 60.3,
                temperature: 27.6,
            }
        );
    }

    #[test]
    fn test_read_negative_temp() {
        // Humidity 40.0%, temperature 0x80F6 = -24.6C, checksum 0x07
        let mut dht = frame([0x01, 0x90, 0x80, 0xF6, 0x07], SensorModel::Si7021);

        assert_eq!(
            dht.read().unwrap(),
            Reading {
                relative_humidity: 40.0,
                temperature: -24.6,
            }
        );
    }

    #[test]
    fn test_read_dht11() {
        let mut dht = frame([45, 0, 23, 4, 72], SensorModel::Dht11);

        assert_eq!(
            dht.read().unwrap(),
            Reading {
                relative_humidity: 45.0,
                temperature: 23.4,
            }
        );
    }

    #[test]
    fn test_read_soil_moisture() {
        // Probe voltage 0x4E20 = 20000
        let mut dht = frame([0x4E, 0x20, 0x00, 0x00, 0x6E], SensorModel::Ms01);

        let reading = dht.read().unwrap();
        assert_eq!(reading.temperature, 20000.0);
        assert!((reading.relative_humidity - 16.8).abs() < 1e-3);
    }

    #[test]
    fn test_read_invalid_checksum() {
        let mut dht = frame([0x01, 0x90, 0x00, 0xF6, 0x81], SensorModel::Dht22);
        assert_eq!(dht.read().unwrap_err(), DhtError::ChecksumMismatch);
    }

    #[test]
    fn test_read_no_response() {
        let mut dht = sensor(vec![], SensorModel::Dht22);
        assert_eq!(dht.read().unwrap_err(), DhtError::NoResponse);
    }

    #[test]
    fn test_read_truncated_frame() {
        // The sensor stops after two bytes: a timeout, not a checksum error.
        let mut dht = sensor(frame_waveform(&[0x01, 0x90]), SensorModel::Dht22);
        assert_eq!(dht.read().unwrap_err(), DhtError::ProtocolTimeout);
    }

    #[test]
    fn test_read_stretched_high_phase() {
        // One high phase lasts 150us in the middle of the frame.
        let mut segments = frame_waveform(&[0x01, 0x90, 0x00, 0xF6, 0x87]);
        segments[3 + 2 * 20 + 1] = (true, 150);
        let mut dht = sensor(segments, SensorModel::Dht22);

        assert_eq!(dht.read().unwrap_err(), DhtError::ProtocolTimeout);
    }

    #[test]
    fn test_read_into() {
        let mut values = Reading {
            temperature: 0.0,
            relative_humidity: 0.0,
        };

        let mut dht = frame([0x01, 0x90, 0x00, 0xF6, 0x87], SensorModel::Dht22);
        assert!(dht.read_into(&mut values));
        assert_eq!(
            values,
            Reading {
                relative_humidity: 40.0,
                temperature: 24.6,
            }
        );
    }

    #[test]
    fn test_read_into_failure_sets_nan() {
        let mut values = Reading {
            temperature: 21.0,
            relative_humidity: 50.0,
        };

        let mut dht = frame([0x01, 0x90, 0x00, 0xF6, 0x00], SensorModel::Dht22);
        assert!(!dht.read_into(&mut values));
        assert!(values.temperature.is_nan());
        assert!(values.relative_humidity.is_nan());

        let mut values = Reading {
            temperature: 21.0,
            relative_humidity: 50.0,
        };
        let mut dht = sensor(vec![], SensorModel::Dht22);
        assert!(!dht.read_into(&mut values));
        assert!(!values.is_valid());
    }

    #[test]
    fn test_read_again_after_failure() {
        // The critical section is left on the early NoResponse path too.
        let mut dht = sensor(vec![], SensorModel::Dht22);
        assert_eq!(dht.read().unwrap_err(), DhtError::NoResponse);
        assert_eq!(dht.read().unwrap_err(), DhtError::NoResponse);
        critical_section::with(|_cs| ());
    }

    #[test]
    fn test_reading_validity() {
        assert!(!Reading::NAN.is_valid());
        assert!(
            !Reading {
                temperature: 20.0,
                relative_humidity: f32::NAN,
            }
            .is_valid()
        );
        assert!(
            Reading {
                temperature: 20.0,
                relative_humidity: 50.0,
            }
            .is_valid()
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(DhtError::<()>::NoResponse.message(), "No Reading");
        assert_eq!(DhtError::<()>::ProtocolTimeout.message(), "Protocol Timeout");
        assert_eq!(DhtError::<()>::ChecksumMismatch.message(), "Checksum Error");
        assert_eq!(DhtError::<()>::InvalidReading.message(), "Invalid NAN reading");
    }
}
