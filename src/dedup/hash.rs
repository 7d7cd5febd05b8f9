// src/dedup/hash.rs

/// 32-bit rolling content hash used to fingerprint package output lines.
///
/// `h = h * 31 + unit` over UTF-16 code units with wrapping `i32`
/// arithmetic; the result is reported as its absolute value (widened so
/// `i32::MIN` stays representable). The empty string hashes to 0.
pub fn rolling_hash(text: &str) -> u32 {
    let mut hash: i32 = 0;
    for unit in text.encode_utf16() {
        hash = (hash << 5).wrapping_sub(hash).wrapping_add(i32::from(unit));
    }
    hash.unsigned_abs()
}
