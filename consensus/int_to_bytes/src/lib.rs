//! Provides a little-endian serialization for integers, matching the SSZ and
//! `compute_shuffled_index` requirements of the consensus specification.
//!
//! The `int_to_bytesN` functions always return `N` bytes, zero-padding the integer as required.

/// Returns `int` as little-endian bytes with a length of 4.
pub fn int_to_bytes4(int: u32) -> [u8; 4] {
    int.to_le_bytes()
}

/// Returns `int` as little-endian bytes with a length of 8.
pub fn int_to_bytes8(int: u64) -> Vec<u8> {
    int.to_le_bytes().to_vec()
}

/// Returns `int` as little-endian bytes with a length of 32.
pub fn int_to_bytes32(int: u64) -> Vec<u8> {
    let mut bytes = int.to_le_bytes().to_vec();
    bytes.resize(32, 0);
    bytes
}

/// Returns `int` as a little-endian 32-byte array.
pub fn int_to_fixed_bytes32(int: u64) -> [u8; 32] {
    let mut bytes = [0; 32];
    bytes[0..8].copy_from_slice(&int.to_le_bytes());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_to_bytes4_zero_padded() {
        assert_eq!(&int_to_bytes4(1)[..], &hex::decode("01000000").unwrap()[..]);
        assert_eq!(
            &int_to_bytes4(u32::max_value())[..],
            &hex::decode("ffffffff").unwrap()[..]
        );
    }

    #[test]
    fn int_to_bytes8_known_values() {
        assert_eq!(
            int_to_bytes8(257),
            hex::decode("0101000000000000").unwrap()
        );
    }

    #[test]
    fn int_to_bytes32_upper_bytes_zeroed() {
        let bytes = int_to_bytes32(u64::max_value());
        assert_eq!(&bytes[0..8], &[0xff; 8]);
        assert_eq!(&bytes[8..32], &[0x00; 24]);
        assert_eq!(bytes, int_to_fixed_bytes32(u64::max_value()).to_vec());
    }
}
