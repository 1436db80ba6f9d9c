//! Checksum and integer helpers shared by the chunk codec

use byteorder::{BigEndian, ByteOrder};
use crc32fast::Hasher;

/// PNG file signature
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Calculate CRC-32 over `data`, continuing from a running value.
///
/// A seed of 0 starts a fresh checksum. Feeding the result of one call as the
/// seed of the next gives the same value as checksumming the concatenation.
pub fn crc32(seed: u32, data: &[u8]) -> u32 {
    let mut hasher = Hasher::new_with_initial(seed);
    hasher.update(data);
    hasher.finalize()
}

/// CRC of a chunk: covers the type tag followed by the payload
pub fn chunk_crc(chunk_type: &[u8; 4], payload: &[u8]) -> u32 {
    crc32(crc32(0, chunk_type), payload)
}

/// Encode a u32 as 4 big-endian bytes
pub fn encode_u32_be(value: u32) -> [u8; 4] {
    let mut buf = [0u8; 4];
    BigEndian::write_u32(&mut buf, value);
    buf
}

/// Decode 4 big-endian bytes into a u32
pub fn decode_u32_be(bytes: [u8; 4]) -> u32 {
    BigEndian::read_u32(&bytes)
}

/// Validate PNG signature
pub fn is_png_signature(data: &[u8]) -> bool {
    data.len() >= 8 && data[0..8] == PNG_SIGNATURE
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_crc32_check_vector() {
        assert_eq!(crc32(0, b"123456789"), 0xCBF43926);
        assert_eq!(crc32(0, b"Hello, World!"), 0xEC4AC3D0);
        assert_eq!(crc32(0, b""), 0);
    }

    #[test]
    fn test_iend_crc() {
        assert_eq!(chunk_crc(b"IEND", &[]), 0xAE426082);
    }

    #[test]
    fn test_u32_be_layout() {
        assert_eq!(encode_u32_be(0xDEADBEEF), [0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(encode_u32_be(11), [0, 0, 0, 11]);
        // Most significant byte must not be truncated for large lengths
        assert_eq!(encode_u32_be(0x0100_0000), [1, 0, 0, 0]);
        assert_eq!(decode_u32_be([0xFF, 0xFF, 0xFF, 0xFF]), u32::MAX);
    }

    #[test]
    fn test_png_signature_validation() {
        assert!(is_png_signature(&PNG_SIGNATURE));

        let invalid_sig = [0x00, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert!(!is_png_signature(&invalid_sig));
        assert!(!is_png_signature(&PNG_SIGNATURE[..7]));
    }

    proptest! {
        #[test]
        fn crc32_chains_like_concatenation(a in proptest::collection::vec(any::<u8>(), 0..256),
                                           b in proptest::collection::vec(any::<u8>(), 0..256)) {
            let whole = [a.as_slice(), b.as_slice()].concat();
            prop_assert_eq!(crc32(crc32(0, &a), &b), crc32(0, &whole));
            prop_assert_eq!(crc32(0, &whole), crc32fast::hash(&whole));
        }

        #[test]
        fn u32_be_codec_covers_full_range(value in any::<u32>()) {
            prop_assert_eq!(decode_u32_be(encode_u32_be(value)), value);
            prop_assert_eq!(encode_u32_be(value), value.to_be_bytes());
        }
    }
}
