use crate::capture::BYTES_PER_FRAME;

/// The 5 bytes of a frame: humidity high/low, temperature high/low, checksum.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawFrame(pub [u8; BYTES_PER_FRAME]);

impl RawFrame {
    /// The four data bytes.
    pub fn payload(&self) -> [u8; 4] {
        let [b0, b1, b2, b3, _] = self.0;
        [b0, b1, b2, b3]
    }

    /// The checksum byte as transmitted.
    pub fn checksum(&self) -> u8 {
        self.0[4]
    }

    /// Whether the transmitted checksum matches the payload.
    pub fn is_valid(&self) -> bool {
        checksum(&self.payload()) == self.checksum()
    }
}

/// Rollover checksum: the payload bytes summed modulo 256.
pub fn checksum(payload: &[u8; 4]) -> u8 {
    payload.iter().fold(0u8, |sum, v| sum.wrapping_add(*v))
}
