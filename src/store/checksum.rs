//! CRC32 checksums for collection snapshots
//!
//! A snapshot whose checksum does not match is refused at load time.

use crc32fast::Hasher;

/// Computes a CRC32 checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Checks `data` against the checksum recorded for it.
///
/// On mismatch returns the checksum `data` actually has.
pub fn verify_checksum(data: &[u8], expected: u32) -> Result<(), u32> {
    match compute_checksum(data) {
        actual if actual == expected => Ok(()),
        actual => Err(actual),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_detects_corruption() {
        let mut data = br#"[{"name":"The Sea Explorer"}]"#.to_vec();
        let original = compute_checksum(&data);
        data[4] ^= 0x01;
        assert_ne!(original, compute_checksum(&data));
    }

    #[test]
    fn test_verify_checksum() {
        let data = b"tours";
        let checksum = compute_checksum(data);
        assert_eq!(verify_checksum(data, checksum), Ok(()));
        assert_eq!(verify_checksum(data, checksum ^ 1), Err(checksum));
    }
}
