//! Little-endian integer serialization, as used for seed and randomness
//! domain separation.

use smallvec::SmallVec;

/// Returns `int` as little-endian bytes with a length of 1.
pub fn int_to_bytes1(int: u8) -> Vec<u8> {
    vec![int]
}

/// Returns `int` as little-endian bytes with a length of 4.
pub fn int_to_bytes4(int: u32) -> SmallVec<[u8; 4]> {
    SmallVec::from_buf(int.to_le_bytes())
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

/// Returns the first 8 bytes of `bytes` interpreted as a little-endian `u64`.
///
/// Returns `None` if `bytes.len() < 8`.
pub fn bytes8_to_int(bytes: &[u8]) -> Option<u64> {
    let arr: [u8; 8] = bytes.get(0..8)?.try_into().ok()?;
    Some(u64::from_le_bytes(arr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_to_bytes4_le() {
        assert_eq!(int_to_bytes4(0x01020304).as_slice(), &[4, 3, 2, 1]);
    }

    #[test]
    fn int_to_bytes8_le() {
        assert_eq!(
            int_to_bytes8(0x0102030405060708),
            vec![8, 7, 6, 5, 4, 3, 2, 1]
        );
    }

    #[test]
    fn int_to_bytes32_pads_with_zeroes() {
        let bytes = int_to_bytes32(u64::MAX);
        assert_eq!(&bytes[0..8], &[0xff; 8]);
        assert_eq!(&bytes[8..], &[0; 24]);
        assert_eq!(bytes.len(), 32);
    }

    #[test]
    fn bytes8_round_trip() {
        for int in [0, 1, 256, u64::MAX] {
            assert_eq!(bytes8_to_int(&int_to_bytes8(int)), Some(int));
        }
        assert_eq!(bytes8_to_int(&[0; 7]), None);
    }

    #[test]
    fn known_vectors() {
        // Cross-checked against the python reference `int.to_bytes`.
        let vectors: Vec<(u64, &str)> = vec![
            (0, "0000000000000000"),
            (1, "0100000000000000"),
            (1_000_000, "40420f0000000000"),
        ];
        for (int, hex_str) in vectors {
            assert_eq!(int_to_bytes8(int), hex::decode(hex_str).unwrap());
        }
    }
}
