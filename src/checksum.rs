use sha2::{Digest, Sha512};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("checksum mismatch: expected {expected}, got {actual}")]
pub struct ChecksumError {
    pub expected: String,
    pub actual:   String,
}

/// Lowercase hex SHA-512 of `data`, as stored in `core:sha512`.
pub fn sha512_hex(data: &[u8]) -> String {
    hex::encode(Sha512::digest(data))
}

/// Compare `data` against a hex digest.  Case-insensitive.
pub fn verify(data: &[u8], expected: &str) -> Result<(), ChecksumError> {
    let actual = sha512_hex(data);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(ChecksumError { expected: expected.to_owned(), actual })
    }
}
