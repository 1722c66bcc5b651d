//! Party keys and block signatures.

use ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::{ProjectivePoint, Scalar};
use rand_core::CryptoRngCore;
use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::hash::Fingerprint;
use crate::proto;
use crate::serde::{point_from_bytes, point_to_bytes, scalar_from_bytes, scalar_to_bytes, Proto};

const KEY_FINGERPRINT_DOMAIN: &[u8] = b"pbmx key fingerprint v1";

/// A party's private key.
///
/// Never leaves the host; its scalar is wiped on drop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrivateKey {
    x: Scalar,
}

/// A party's public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    point: ProjectivePoint,
}

impl PrivateKey {
    /// Generates a fresh key.
    pub fn random(rng: &mut impl CryptoRngCore) -> Self {
        loop {
            let x = Scalar::generate_biased(&mut *rng);
            // zero can neither decrypt nor sign
            if x != Scalar::ZERO {
                return Self { x };
            }
        }
    }

    /// The secret exponent.
    pub fn exponent(&self) -> &Scalar {
        &self.x
    }

    /// The corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            point: ProjectivePoint::GENERATOR * self.x,
        }
    }

    /// The fingerprint of the corresponding public key.
    pub fn fingerprint(&self) -> Fingerprint {
        self.public_key().fingerprint()
    }

    /// Signs a message, usually a block id.
    pub fn sign(&self, msg: &[u8]) -> Signature {
        let key = SigningKey::from_bytes(&self.x.to_bytes())
            .expect("a private key never holds a zero scalar");
        key.sign(msg)
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.x.zeroize();
    }
}

impl PublicKey {
    /// The public point.
    pub fn point(&self) -> ProjectivePoint {
        self.point
    }

    /// The fingerprint of this key's canonical encoding, used as the
    /// owning party's identity.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of_bytes(KEY_FINGERPRINT_DOMAIN, &self.to_bytes())
    }

    /// Folds another party's key into this one, extending the shared key.
    pub fn combine(&mut self, other: &PublicKey) {
        self.point += other.point;
    }

    /// Verifies a signature made by the holder of the private key.
    pub fn verify(&self, msg: &[u8], sig: &Signature) -> Result<()> {
        let key =
            VerifyingKey::from_affine(self.point.to_affine()).map_err(|_| Error::Decoding)?;
        key.verify(msg, sig)
            .map_err(|_| Error::ChainIntegrity("bad signature"))
    }
}

impl From<ProjectivePoint> for PublicKey {
    fn from(point: ProjectivePoint) -> Self {
        Self { point }
    }
}

impl Proto for PrivateKey {
    type Message = proto::PrivateKey;

    fn to_proto(&self) -> proto::PrivateKey {
        proto::PrivateKey {
            exponent: scalar_to_bytes(&self.x),
        }
    }

    fn from_proto(m: &proto::PrivateKey) -> Result<Self> {
        let x = scalar_from_bytes(&m.exponent)?;
        if x == Scalar::ZERO {
            return Err(Error::Decoding);
        }
        Ok(Self { x })
    }
}

impl Proto for PublicKey {
    type Message = proto::PublicKey;

    fn to_proto(&self) -> proto::PublicKey {
        proto::PublicKey {
            point: point_to_bytes(&self.point),
        }
    }

    fn from_proto(m: &proto::PublicKey) -> Result<Self> {
        Ok(Self {
            point: point_from_bytes(&m.point)?,
        })
    }
}
