//! ITG3205 three-axis gyroscope.
//!
//! [`Itg3205`] talks to the chip over I²C. [`AveragingGyro`] owns the bus,
//! sets the chip up on first use and keeps the last `N` samples for
//! averaging.

use embedded_hal::{delay::DelayNs, i2c::I2c};

/// I²C address with AD0 tied low.
pub const DEFAULT_ADDRESS: u8 = 0x68;

// Register map.
const WHO_AM_I: u8 = 0x00;
const SMPLRT_DIV: u8 = 0x15;
const DLPF_FS: u8 = 0x16;
const INT_CFG: u8 = 0x17;
const GYRO_XOUT_H: u8 = 0x1D;
const PWR_MGM: u8 = 0x3E;

// Clock from the X gyro PLL.
const PWR_MGM_CLK_SEL_X: u8 = 0x01;
// 8 kHz internal rate / (7 + 1) = 1 kHz.
const SAMPLE_RATE_DIVIDER: u8 = 0x07;
// FS_SEL = 3 (+/-2000 deg/s) is the only valid range; 42 Hz low-pass.
const DLPF_FS_SEL: u8 = 0x18;
const DLPF_CFG_42HZ: u8 = 0x03;

const LSB_PER_DEG_PER_S: f32 = 14.375;
const CALIBRATION_INTERVAL_MS: u32 = 2;

/// Angular rate on three axes.
///
/// Raw register counts or degrees per second, depending on how it was read.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Axes {
    /// Rotation around X.
    pub x: i32,
    /// Rotation around Y.
    pub y: i32,
    /// Rotation around Z.
    pub z: i32,
}

/// A configured and calibrated ITG3205.
#[derive(Debug)]
pub struct Itg3205 {
    address: u8,
    offset: Axes,
}

impl Itg3205 {
    /// Configures the chip at `address` and measures its zero-rate offset
    /// from `calibration_samples` readings. The device must be at rest.
    pub fn init<I2C, D>(
        i2c: &mut I2C,
        delay: &mut D,
        address: u8,
        calibration_samples: u8,
    ) -> Result<Self, I2C::Error>
    where
        I2C: I2c,
        D: DelayNs,
    {
        info!("ITG3205: Initializing Gyro...");
        i2c.write(address, &[PWR_MGM, PWR_MGM_CLK_SEL_X])?;
        i2c.write(address, &[SMPLRT_DIV, SAMPLE_RATE_DIVIDER])?;
        i2c.write(address, &[DLPF_FS, DLPF_FS_SEL | DLPF_CFG_42HZ])?;
        i2c.write(address, &[INT_CFG, 0x00])?;

        info!("ITG3205: Calibrating Gyro...");
        let mut gyro = Itg3205 {
            address,
            offset: Axes::default(),
        };
        gyro.offset = gyro.calibrate(i2c, delay, calibration_samples)?;
        info!("ITG3205: Calibration done.");

        Ok(gyro)
    }

    fn calibrate<I2C, D>(&self, i2c: &mut I2C, delay: &mut D, samples: u8) -> Result<Axes, I2C::Error>
    where
        I2C: I2c,
        D: DelayNs,
    {
        let samples = samples.max(1);
        let (mut x, mut y, mut z) = (0, 0, 0);

        for i in 0..samples {
            if i > 0 {
                delay.delay_ms(CALIBRATION_INTERVAL_MS);
            }
            let raw = self.read_raw(i2c)?;
            x += raw.x;
            y += raw.y;
            z += raw.z;
        }

        let n = i32::from(samples);
        Ok(Axes {
            x: x / n,
            y: y / n,
            z: z / n,
        })
    }

    /// I²C address of the chip.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Zero-rate offset found during calibration, in raw counts.
    pub fn offset(&self) -> Axes {
        self.offset
    }

    /// Reads the identity register.
    pub fn who_am_i<I2C: I2c>(&self, i2c: &mut I2C) -> Result<u8, I2C::Error> {
        let mut buf = [0];
        i2c.write_read(self.address, &[WHO_AM_I], &mut buf)?;
        Ok(buf[0])
    }

    /// Reads the raw rate registers.
    pub fn read_raw<I2C: I2c>(&self, i2c: &mut I2C) -> Result<Axes, I2C::Error> {
        let mut buf = [0; 6];
        i2c.write_read(self.address, &[GYRO_XOUT_H], &mut buf)?;

        Ok(Axes {
            x: i32::from(i16::from_be_bytes([buf[0], buf[1]])),
            y: i32::from(i16::from_be_bytes([buf[2], buf[3]])),
            z: i32::from(i16::from_be_bytes([buf[4], buf[5]])),
        })
    }

    /// Reads the offset-corrected rate in whole degrees per second.
    pub fn read<I2C: I2c>(&self, i2c: &mut I2C) -> Result<Axes, I2C::Error> {
        let raw = self.read_raw(i2c)?;
        let scale = |value: i32, offset: i32| ((value - offset) as f32 / LSB_PER_DEG_PER_S) as i32;

        Ok(Axes {
            x: scale(raw.x, self.offset.x),
            y: scale(raw.y, self.offset.y),
            z: scale(raw.z, self.offset.z),
        })
    }
}

/// Settings for [`AveragingGyro`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GyroConfig {
    /// I²C address of the chip.
    pub address: u8,
    /// Store raw counts instead of degrees per second.
    pub raw: bool,
    /// Readings averaged into the zero-rate offset at start-up.
    pub calibration_samples: u8,
}

impl Default for GyroConfig {
    fn default() -> Self {
        GyroConfig {
            address: DEFAULT_ADDRESS,
            raw: false,
            calibration_samples: 32,
        }
    }
}

/// Gyroscope that keeps its last `N` samples.
///
/// The chip is configured on the first call to [`sample`](Self::sample)
/// and again on later calls for as long as that fails.
pub struct AveragingGyro<I2C, D, const N: usize> {
    i2c: I2C,
    delay: D,
    config: GyroConfig,
    device: Option<Itg3205>,
    samples: [Axes; N],
    next: usize,
    filled: usize,
}

impl<I2C, D, const N: usize> AveragingGyro<I2C, D, N>
where
    I2C: I2c,
    D: DelayNs,
{
    const NON_EMPTY: () = assert!(N > 0, "the sample buffer needs at least one slot");

    /// Creates the wrapper. Nothing is sent on the bus yet.
    pub fn new(i2c: I2C, delay: D, config: GyroConfig) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_EMPTY;

        AveragingGyro {
            i2c,
            delay,
            config,
            device: None,
            samples: [Axes::default(); N],
            next: 0,
            filled: 0,
        }
    }

    /// Whether the chip has been configured.
    pub fn is_initialized(&self) -> bool {
        self.device.is_some()
    }

    /// Takes one reading and stores it in the buffer, overwriting the oldest.
    pub fn sample(&mut self) -> Result<Axes, I2C::Error> {
        let device = match self.device.take() {
            Some(device) => device,
            None => self.init_device()?,
        };
        let device = self.device.insert(device);

        let axes = if self.config.raw {
            device.read_raw(&mut self.i2c)?
        } else {
            device.read(&mut self.i2c)?
        };

        self.samples[self.next] = axes;
        self.next = (self.next + 1) % N;
        self.filled = (self.filled + 1).min(N);

        debug!("ITG3205: X: {}, Y: {}, Z: {}", axes.x, axes.y, axes.z);
        Ok(axes)
    }

    fn init_device(&mut self) -> Result<Itg3205, I2C::Error> {
        match Itg3205::init(
            &mut self.i2c,
            &mut self.delay,
            self.config.address,
            self.config.calibration_samples,
        ) {
            Ok(device) => {
                if let Ok(id) = device.who_am_i(&mut self.i2c) {
                    debug!("ITG3205: address: {}, ID: {}", device.address(), id);
                }
                Ok(device)
            }
            Err(err) => {
                error!("ITG3205: Initialization of Gyro failed.");
                Err(err)
            }
        }
    }

    /// Mean of the stored samples, or `None` before the first sample.
    pub fn average(&self) -> Option<Axes> {
        if self.filled == 0 {
            return None;
        }

        let stored = &self.samples[..self.filled];
        let n = stored.len() as i64;
        let mean = |axis: fn(&Axes) -> i32| {
            let sum: i64 = stored.iter().map(|a| i64::from(axis(a))).sum();
            (sum / n) as i32
        };

        let average = Axes {
            x: mean(|a| a.x),
            y: mean(|a| a.y),
            z: mean(|a| a.z),
        };
        debug!("ITG3205: averages, X: {}, Y: {}, Z: {}", average.x, average.y, average.z);
        Some(average)
    }

    /// Number of samples currently stored.
    pub fn len(&self) -> usize {
        self.filled
    }

    /// Whether no sample has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Releases the bus and delay provider. The chip configuration is dropped.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}
