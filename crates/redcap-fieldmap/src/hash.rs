#![deny(unsafe_code)]

use sha2::Digest;

/// Hex SHA-256 of a loaded table, logged so a run can be tied to the exact
/// policy file it used.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    hex::encode(digest)
}
