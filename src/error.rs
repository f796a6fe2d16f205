use core::fmt;

/// Possible errors from the DHT driver.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Eq)]
pub enum DhtError<E> {
    /// The sensor did not answer the start signal with its low/high/low handshake.
    NoResponse,
    /// An edge took longer than 100us to arrive while reading the data bits.
    ProtocolTimeout,
    /// Checksum did not match the received data.
    ChecksumMismatch,
    /// The converted reading is not a number.
    InvalidReading,
    /// Error from the GPIO pin (input/output).
    PinError(E),
}

impl<E> DhtError<E> {
    /// Fixed text used when the failure is logged.
    pub const fn message(&self) -> &'static str {
        match self {
            Self::NoResponse => "No Reading",
            Self::ProtocolTimeout => "Protocol Timeout",
            Self::ChecksumMismatch => "Checksum Error",
            Self::InvalidReading => "Invalid NAN reading",
            Self::PinError(_) => "Pin Error",
        }
    }
}

impl<E> From<E> for DhtError<E> {
    fn from(value: E) -> Self {
        Self::PinError(value)
    }
}

impl<E> fmt::Display for DhtError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A numeric model code that does not name a supported sensor.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnknownModel(pub u8);

impl fmt::Display for UnknownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown sensor model code {}", self.0)
    }
}
