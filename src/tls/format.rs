//! Hex rendering for serial numbers and fingerprints.

use ring::digest;

/// Render a big-endian serial number as colon-separated hex pairs.
///
/// Leading zero digits are dropped and an odd digit count is left-padded
/// with a single zero, so `0xABCD` renders as `AB:CD` and `0xA` as `0A`.
pub fn format_serial(serial: &[u8]) -> String {
    let hex: String = serial.iter().map(|b| format!("{:02X}", b)).collect();
    let trimmed = hex.trim_start_matches('0');
    let mut digits = if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    };
    if digits.len() % 2 != 0 {
        digits.insert(0, '0');
    }
    group_pairs(&digits)
}

/// Render raw digest bytes as colon-separated uppercase hex pairs.
pub fn join_hash(hash: &[u8]) -> String {
    hash.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// SHA-1 fingerprint of a DER encoded certificate.
pub fn sha1_fingerprint(der: &[u8]) -> String {
    join_hash(digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, der).as_ref())
}

/// SHA-256 fingerprint of a DER encoded certificate.
pub fn sha256_fingerprint(der: &[u8]) -> String {
    join_hash(digest::digest(&digest::SHA256, der).as_ref())
}

fn group_pairs(digits: &str) -> String {
    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect::<Vec<_>>()
        .join(":")
}
