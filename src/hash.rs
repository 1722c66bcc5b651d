//! Fingerprints and extendable-output hashing.

use std::fmt::{self, Debug, Display, Formatter};
use std::str::{self, FromStr};

use ck_meow::Meow;

use crate::error::{Error, Result};

const FINGERPRINT_LEN: usize = 20;

/// A 20-byte domain-separated digest.
///
/// Fingerprints identify parties (the hash of a public key), stacks and
/// blocks (the hash of their canonical encoding). Two parties hashing the
/// same bytes under the same domain always agree on the fingerprint.
#[derive(Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

/// A content-address for stacks and blocks.
pub type Id = Fingerprint;

impl Fingerprint {
    /// Hashes the given bytes under a domain label.
    pub fn of_bytes(domain: &'static [u8], input: &[u8]) -> Self {
        let mut meow = Meow::new(domain);
        meow.ad(input, false);
        let mut out = [0u8; FINGERPRINT_LEN];
        meow.prf(&mut out, false);
        Self(out)
    }
}

impl AsRef<[u8]> for Fingerprint {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Fingerprint {
    type Error = Error;

    fn try_from(input: &[u8]) -> Result<Self> {
        let bytes = input.try_into().map_err(|_| Error::Decoding)?;
        Ok(Self(bytes))
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl Debug for Fingerprint {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl FromStr for Fingerprint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != 2 * FINGERPRINT_LEN {
            return Err(Error::Decoding);
        }
        let mut out = [0u8; FINGERPRINT_LEN];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let chunk = str::from_utf8(chunk).map_err(|_| Error::Decoding)?;
            out[i] = u8::from_str_radix(chunk, 16).map_err(|_| Error::Decoding)?;
        }
        Ok(Self(out))
    }
}

/// An extendable-output reader seeded from some input bytes.
///
/// Every party reading the same seed under the same domain reads the same
/// byte stream, which is what makes shared randomness deterministic.
pub struct Xof {
    meow: Meow,
    started: bool,
}

impl Xof {
    /// Seeds a new reader.
    pub fn new(domain: &'static [u8], seed: &[u8]) -> Self {
        let mut meow = Meow::new(domain);
        meow.ad(seed, false);
        Self {
            meow,
            started: false,
        }
    }

    /// Fills the buffer with the next output bytes.
    pub fn read(&mut self, buf: &mut [u8]) {
        self.meow.prf(buf, self.started);
        self.started = true;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable() {
        let a = Fingerprint::of_bytes(b"test domain", b"hello");
        let b = Fingerprint::of_bytes(b"test domain", b"hello");
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_separates_domains() {
        let a = Fingerprint::of_bytes(b"domain one", b"hello");
        let b = Fingerprint::of_bytes(b"domain two", b"hello");
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_roundtrips_via_string() {
        let original = Fingerprint::of_bytes(b"test domain", b"hello");
        let recovered = Fingerprint::from_str(&original.to_string()).unwrap();
        assert_eq!(original, recovered);
    }

    #[test]
    fn test_xof_streams_agree() {
        let mut a = Xof::new(b"test xof", b"seed");
        let mut b = Xof::new(b"test xof", b"seed");
        let mut buf_a = [0u8; 64];
        let mut buf_b = [0u8; 64];
        for _ in 0..16 {
            a.read(&mut buf_a);
            b.read(&mut buf_b);
            assert_eq!(buf_a, buf_b);
        }
    }

    #[test]
    fn test_xof_seeds_differ() {
        let mut a = Xof::new(b"test xof", b"seed one");
        let mut b = Xof::new(b"test xof", b"seed two");
        let mut buf_a = [0u8; 64];
        let mut buf_b = [0u8; 64];
        a.read(&mut buf_a);
        b.read(&mut buf_b);
        assert_ne!(buf_a, buf_b);
    }
}
