use alloy_primitives::FixedBytes;

pub use alloy_primitives::{Address, B256, Bytes, U256};

pub type Hash256 = B256;

/// Extends `alloy_primitives::FixedBytes` with the constructors the consensus
/// code relies on.
pub trait FixedBytesExtended {
    fn from_low_u64_be(value: u64) -> Self;
    fn from_low_u64_le(value: u64) -> Self;
    fn zero() -> Self;
}

impl<const N: usize> FixedBytesExtended for FixedBytes<N> {
    fn from_low_u64_be(value: u64) -> Self {
        let value_bytes = value.to_be_bytes();
        let mut buffer = [0x0; N];
        let bytes_to_copy = value_bytes.len().min(buffer.len());
        // Panic-free because bytes_to_copy <= buffer.len()
        let start_index = buffer.len().saturating_sub(bytes_to_copy);
        // Panic-free because start_index <= buffer.len()
        // and bytes_to_copy <= value_bytes.len()
        buffer
            .get_mut(start_index..)
            .expect("start_index <= buffer.len()")
            .copy_from_slice(
                value_bytes
                    .get(value_bytes.len().saturating_sub(bytes_to_copy)..)
                    .expect("bytes_to_copy <= value_byte.len()"),
            );
        Self::from(buffer)
    }

    fn from_low_u64_le(value: u64) -> Self {
        let value_bytes = value.to_le_bytes();
        let mut buffer = [0x0; N];
        let bytes_to_copy = value_bytes.len().min(buffer.len());
        buffer
            .get_mut(..bytes_to_copy)
            .expect("bytes_to_copy <= buffer.len()")
            .copy_from_slice(
                value_bytes
                    .get(..bytes_to_copy)
                    .expect("bytes_to_copy <= value_byte.len()"),
            );
        Self::from(buffer)
    }

    fn zero() -> Self {
        Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_low_u64_be_positions_bytes_at_the_end() {
        let hash = Hash256::from_low_u64_be(0x0102_0304_0506_0708);
        assert_eq!(&hash.as_slice()[..24], &[0_u8; 24]);
        assert_eq!(&hash.as_slice()[24..], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn from_low_u64_le_positions_bytes_at_the_start() {
        let hash = Hash256::from_low_u64_le(0x0102_0304_0506_0708);
        assert_eq!(&hash.as_slice()[..8], &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(&hash.as_slice()[8..], &[0_u8; 24]);
    }

    #[test]
    fn zero_is_all_zeroes() {
        assert_eq!(Hash256::zero(), Hash256::ZERO);
    }
}
