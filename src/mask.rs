//! Masked values.

use std::hash::{Hash, Hasher};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use elliptic_curve::group::GroupEncoding;
use k256::{ProjectivePoint, Scalar};

use crate::error::Result;
use crate::proto;
use crate::serde::{point_from_bytes, point_to_bytes, Proto};

/// An ElGamal ciphertext under the shared key, hiding one token.
///
/// Masks are plain values: copying one copies the ciphertext, and the
/// componentwise group operations below make the encryption homomorphic,
/// so `decrypt(a + b) = decrypt(a) + decrypt(b)` on the group.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Mask(pub ProjectivePoint, pub ProjectivePoint);

impl Mask {
    /// A mask of a known point: no randomness, nothing hidden.
    pub fn open(p: ProjectivePoint) -> Self {
        Self(ProjectivePoint::IDENTITY, p)
    }

    /// Whether this mask is open.
    pub fn is_open(&self) -> bool {
        self.0 == ProjectivePoint::IDENTITY
    }

    /// The additive identity.
    pub fn identity() -> Self {
        Self(ProjectivePoint::IDENTITY, ProjectivePoint::IDENTITY)
    }
}

#[allow(clippy::derived_hash_with_manual_eq)]
impl Hash for Mask {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bytes().hash(state);
        self.1.to_bytes().hash(state);
    }
}

impl Add for Mask {
    type Output = Mask;

    fn add(self, rhs: Mask) -> Mask {
        Mask(self.0 + rhs.0, self.1 + rhs.1)
    }
}

impl AddAssign for Mask {
    fn add_assign(&mut self, rhs: Mask) {
        self.0 += rhs.0;
        self.1 += rhs.1;
    }
}

impl Sub for Mask {
    type Output = Mask;

    fn sub(self, rhs: Mask) -> Mask {
        Mask(self.0 - rhs.0, self.1 - rhs.1)
    }
}

impl SubAssign for Mask {
    fn sub_assign(&mut self, rhs: Mask) {
        self.0 -= rhs.0;
        self.1 -= rhs.1;
    }
}

impl Neg for Mask {
    type Output = Mask;

    fn neg(self) -> Mask {
        Mask(-self.0, -self.1)
    }
}

impl Mul<Scalar> for Mask {
    type Output = Mask;

    fn mul(self, rhs: Scalar) -> Mask {
        Mask(self.0 * rhs, self.1 * rhs)
    }
}

impl Sum for Mask {
    fn sum<I: Iterator<Item = Mask>>(iter: I) -> Mask {
        iter.fold(Mask::identity(), Add::add)
    }
}

impl Proto for Mask {
    type Message = proto::Mask;

    fn to_proto(&self) -> proto::Mask {
        proto::Mask {
            c1: point_to_bytes(&self.0),
            c2: point_to_bytes(&self.1),
        }
    }

    fn from_proto(m: &proto::Mask) -> Result<Self> {
        Ok(Self(point_from_bytes(&m.c1)?, point_from_bytes(&m.c2)?))
    }
}
