//! Supported sensor models and their payload conversions.

use crate::dht::Reading;
use crate::error::UnknownModel;

/// Sensor models speaking the single-wire protocol.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorModel {
    /// DHT11.
    Dht11,
    /// DHT12.
    Dht12,
    /// DHT22 / AM2302.
    Dht22,
    /// AM2301.
    Am2301,
    /// SI7021 behind a single-wire adapter.
    Si7021,
    /// MS01 soil moisture probe.
    Ms01,
}

/// How the four payload bytes turn into a [`Reading`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Formula {
    /// Integral and decimal parts in separate bytes, sign in bit 7 of the
    /// temperature decimal byte.
    Decimal,
    /// Big-endian tenths, sign in bit 15 of the temperature word.
    Tenths,
    /// Probe voltage in the humidity word, mapped to moisture %.
    SoilMoisture,
}

/// Per-model protocol parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelProfile {
    /// How long the host holds the line low to request a frame.
    pub start_pulse_us: u32,
    /// Payload conversion.
    pub formula: Formula,
}

impl SensorModel {
    /// Every supported model.
    pub const ALL: [SensorModel; 6] = [
        Self::Dht11,
        Self::Dht12,
        Self::Dht22,
        Self::Am2301,
        Self::Si7021,
        Self::Ms01,
    ];

    /// Protocol parameters of this model.
    pub const fn profile(self) -> ModelProfile {
        let (start_pulse_us, formula) = match self {
            Self::Dht11 => (19_000, Formula::Decimal),
            Self::Dht12 => (200_000, Formula::Decimal),
            Self::Dht22 => (2_000, Formula::Tenths),
            Self::Am2301 => (900, Formula::Tenths),
            Self::Si7021 => (500, Formula::Tenths),
            Self::Ms01 => (450, Formula::SoilMoisture),
        };
        ModelProfile {
            start_pulse_us,
            formula,
        }
    }

    /// Numeric code used to store the model in plugin settings.
    pub const fn code(self) -> u8 {
        match self {
            Self::Dht11 => 11,
            Self::Dht12 => 12,
            Self::Dht22 => 22,
            Self::Am2301 => 23,
            Self::Si7021 => 70,
            Self::Ms01 => 95,
        }
    }

    /// Converts a checksum-verified payload into a reading.
    pub fn convert(self, payload: [u8; 4]) -> Reading {
        self.profile().formula.apply(payload)
    }
}

impl TryFrom<u8> for SensorModel {
    type Error = UnknownModel;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|model| model.code() == code)
            .ok_or(UnknownModel(code))
    }
}

impl Formula {
    /// Applies the formula to `[humidity_hi, humidity_lo, temp_hi, temp_lo]`.
    pub fn apply(self, payload: [u8; 4]) -> Reading {
        match self {
            Self::Decimal => decimal(payload),
            Self::Tenths => tenths(payload),
            Self::SoilMoisture => soil_moisture(payload),
        }
    }
}

fn decimal(payload: [u8; 4]) -> Reading {
    let [hum_int, hum_dec, temp_int, temp_dec] = payload;

    let relative_humidity = f32::from(u16::from(hum_int) * 10 + u16::from(hum_dec)) / 10.0;

    let mut temperature =
        f32::from(u16::from(temp_int) * 10 + u16::from(temp_dec & 0x7F)) / 10.0;
    if temp_dec & 0x80 != 0 {
        temperature = -temperature;
    }

    Reading {
        temperature,
        relative_humidity,
    }
}

fn tenths(payload: [u8; 4]) -> Reading {
    let [hum_hi, hum_lo, temp_hi, temp_lo] = payload;

    let relative_humidity = f32::from(u16::from_be_bytes([hum_hi, hum_lo])) / 10.0;

    let is_temp_negative = (temp_hi >> 7) != 0;
    let joined_temp = u16::from_be_bytes([temp_hi & 0b0111_1111, temp_lo]);
    let mut temperature = f32::from(joined_temp) / 10.0;
    if is_temp_negative {
        temperature = -temperature;
    }

    Reading {
        temperature,
        relative_humidity,
    }
}

// Empirical fit of probe voltage to moisture, see
// https://gist.github.com/minovap/654cdcd8bc37bb0d2ff338f8d144a509
fn soil_moisture(payload: [u8; 4]) -> Reading {
    let [hi, lo, _, _] = payload;
    let voltage = f32::from(u16::from_be_bytes([hi, lo]));

    let cube = |v: f32| v * v * v;
    let moisture = if voltage < 15037.0 {
        let x = voltage - 15200.0;
        -cube(0.0024 * x) - 0.0004 * x + 20.1
    } else if voltage < 22300.0 {
        -0.00069 * voltage + 30.6
    } else {
        let x = voltage - 22800.0;
        -cube(0.00046 * x) - 0.0004 * x + 15.0
    };

    // The temperature slot carries the raw probe voltage.
    Reading {
        temperature: voltage,
        relative_humidity: if moisture < 0.0 { 0.0 } else { moisture },
    }
}
