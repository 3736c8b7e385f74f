use std::fmt;
use std::str::FromStr;

use crate::error::SyncError;

/// A 160-bit SHA-1 digest, the canonical identity of a blob.
///
/// Wire and index representations are lowercase hex (40 characters);
/// in memory it is kept as raw bytes so comparisons are cheap.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Checksum([u8; 20]);

impl Checksum {
    pub const LEN: usize = 20;

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// The two-character bucket and 38-character remainder used by the blob store.
    #[must_use]
    pub fn bucket(&self) -> (String, String) {
        let hex = self.to_string();
        (hex[..2].to_string(), hex[2..].to_string())
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({self})")
    }
}

impl FromStr for Checksum {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 40 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(SyncError::InvariantViolation(format!(
                "malformed checksum: {s:?}"
            )));
        }
        let mut out = [0u8; 20];
        for (i, chunk) in out.iter_mut().enumerate() {
            *chunk = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| SyncError::InvariantViolation(format!("malformed checksum: {s:?}")))?;
        }
        Ok(Self(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_hex() {
        let ck: Checksum = "baf34551fecb48acc3da868eb85e1b6dac9de356".parse().unwrap();
        assert_eq!(ck.to_string(), "baf34551fecb48acc3da868eb85e1b6dac9de356");
        let (bucket, rest) = ck.bucket();
        assert_eq!(bucket, "ba");
        assert_eq!(rest, "f34551fecb48acc3da868eb85e1b6dac9de356");
    }

    #[test]
    fn rejects_wrong_length() {
        assert!("deadbeef".parse::<Checksum>().is_err());
    }

    #[test]
    fn rejects_non_hex() {
        let bad = "g".repeat(40);
        assert!(bad.parse::<Checksum>().is_err());
    }
}
