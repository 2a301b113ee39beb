//! Structural validation of gateway access tokens.
//!
//! The token service expects a 36-character formatted identifier: hyphens at
//! fixed positions, hexadecimal digits everywhere else, case-insensitive.
//! Example: `3bcce3fb-1849-4e13-bb4a-8922ffc46034`.

/// Expected access-token length in bytes.
pub const ACCESS_TOKEN_LEN: usize = 36;

/// Byte offsets that must hold a `-`.
const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];

/// Whether `s` has the shape of a gateway access token.
///
/// Total over every input, including the empty string. Accepts upper- and
/// lowercase hex digits; rejects any deviation in length, hyphen placement,
/// or character set.
pub fn is_valid_access_token(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != ACCESS_TOKEN_LEN {
        return false;
    }
    bytes.iter().enumerate().all(|(i, &b)| {
        if HYPHEN_POSITIONS.contains(&i) {
            b == b'-'
        } else {
            b.is_ascii_hexdigit()
        }
    })
}
