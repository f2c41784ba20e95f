use crate::position::{cell_index, SECTION_CELLS};
use elytra_common::{ElytraError, Result};

/// Bytes in a 4-bit-per-cell layer covering one section.
pub const NIBBLE_BYTES: usize = SECTION_CELLS / 2;

/// Read-only 4-bit layer over a 16x16x16 section (the legacy `Data` and `Add` arrays).
///
/// Cell `i` lives in byte `i / 2`; even cells use the low nibble, odd cells the high one.
/// An absent layer reads as zero everywhere.
#[derive(Debug, Clone, Default)]
pub struct NibbleLayer {
    data: Option<Vec<u8>>,
}

impl NibbleLayer {
    pub fn empty() -> Self {
        NibbleLayer { data: None }
    }

    /// Wraps a raw NBT byte array. Anything other than exactly 2048 bytes is rejected.
    pub fn from_bytes(name: &str, bytes: Option<&[i8]>) -> Result<Self> {
        match bytes {
            None => Ok(NibbleLayer::empty()),
            Some(bytes) if bytes.len() == NIBBLE_BYTES => Ok(NibbleLayer {
                data: Some(bytes.iter().map(|&b| b as u8).collect()),
            }),
            Some(bytes) => Err(ElytraError::malformed(format!(
                "{} must be {} bytes, got {}",
                name,
                NIBBLE_BYTES,
                bytes.len()
            ))),
        }
    }

    pub fn is_present(&self) -> bool {
        self.data.is_some()
    }

    pub fn get(&self, x: u8, y: u8, z: u8) -> u8 {
        self.get_index(cell_index(x, y, z))
    }

    pub fn get_index(&self, index: u16) -> u8 {
        let Some(data) = &self.data else {
            return 0;
        };
        let byte = data[index as usize >> 1];
        if index & 1 == 0 {
            byte & 0x0F
        } else {
            byte >> 4
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_low_nibble_first() {
        let mut bytes = vec![0i8; NIBBLE_BYTES];
        bytes[0] = 0x3A; // cell 0 = 0xA, cell 1 = 0x3
        bytes[NIBBLE_BYTES - 1] = 0xF0u8 as i8; // cell 4095 = 0xF
        let layer = NibbleLayer::from_bytes("Data", Some(&bytes)).unwrap();

        assert_eq!(layer.get(0, 0, 0), 0xA);
        assert_eq!(layer.get(1, 0, 0), 0x3);
        assert_eq!(layer.get(15, 15, 15), 0xF);
        assert_eq!(layer.get(14, 15, 15), 0x0);
    }

    #[test]
    fn test_addressing_is_y_z_x() {
        let mut bytes = vec![0i8; NIBBLE_BYTES];
        // x=4, y=2, z=3 -> index 2*256 + 3*16 + 4 = 564, even -> low nibble of byte 282
        bytes[282] = 0x07;
        let layer = NibbleLayer::from_bytes("Add", Some(&bytes)).unwrap();
        assert_eq!(layer.get(4, 2, 3), 7);
        assert_eq!(layer.get_index(564), 7);
        assert_eq!(layer.get(3, 2, 4), 0);
    }

    #[test]
    fn test_absent_layer_reads_zero() {
        let layer = NibbleLayer::from_bytes("Add", None).unwrap();
        assert!(!layer.is_present());
        assert_eq!(layer.get(15, 15, 15), 0);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let result = NibbleLayer::from_bytes("Data", Some(&[0i8; 2047]));
        assert_matches!(result, Err(ElytraError::MalformedChunk(msg)) if msg.contains("2047"));
    }
}
