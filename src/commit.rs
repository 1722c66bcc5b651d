//! Pedersen vector commitments.

use elliptic_curve::{Field, Group};
use k256::{ProjectivePoint, Scalar};
use rand_core::CryptoRngCore;

use crate::error::{Error, Result};

/// A Pedersen commitment key: a blinding generator and one message
/// generator per committed scalar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pedersen {
    h: ProjectivePoint,
    g: Vec<ProjectivePoint>,
}

impl Pedersen {
    /// Creates a commitment key from explicit generators.
    ///
    /// Returns `None` when any two generators coincide.
    pub fn new(h: ProjectivePoint, g: Vec<ProjectivePoint>) -> Option<Self> {
        for i in 0..g.len() {
            for j in 0..i {
                if g[i] == g[j] {
                    return None;
                }
            }
        }
        Some(Self { h, g })
    }

    /// Creates a commitment key with generators drawn from an rng.
    pub fn random(n: usize, rng: &mut impl CryptoRngCore) -> Self {
        loop {
            let h = ProjectivePoint::random(&mut *rng);
            let g = (0..n).map(|_| ProjectivePoint::random(&mut *rng)).collect();
            if let Some(key) = Self::new(h, g) {
                return key;
            }
        }
    }

    /// The blinding generator.
    pub fn shared_point(&self) -> &ProjectivePoint {
        &self.h
    }

    /// The message generators.
    pub fn points(&self) -> &[ProjectivePoint] {
        &self.g
    }

    /// Commits to a sequence of scalars with a fresh blinding factor.
    pub fn commit_to(
        &self,
        m: &[Scalar],
        rng: &mut impl CryptoRngCore,
    ) -> (ProjectivePoint, Scalar) {
        let r = Scalar::random(&mut *rng);
        (self.commit_by(m, &r), r)
    }

    /// Commits to a sequence of scalars with a given blinding factor.
    pub fn commit_by(&self, m: &[Scalar], r: &Scalar) -> ProjectivePoint {
        assert_eq!(m.len(), self.g.len());

        m.iter()
            .zip(self.g.iter())
            .map(|(m, g)| g * m)
            .sum::<ProjectivePoint>()
            + self.h * r
    }

    /// Checks an opening of a commitment.
    pub fn open(&self, c: &ProjectivePoint, m: &[Scalar], r: &Scalar) -> Result<()> {
        if m.len() != self.g.len() {
            return Err(Error::ShapeMismatch);
        }
        if *c == self.commit_by(m, r) {
            Ok(())
        } else {
            Err(Error::BadProof)
        }
    }
}

#[cfg(test)]
mod test {
    use rand_core::OsRng;

    use super::*;

    #[test]
    fn test_commitments_open() {
        let com = Pedersen::random(3, &mut OsRng);
        let m = [
            Scalar::random(&mut OsRng),
            Scalar::random(&mut OsRng),
            Scalar::random(&mut OsRng),
        ];
        let (c, r) = com.commit_to(&m, &mut OsRng);
        assert_eq!(com.open(&c, &m, &r), Ok(()));

        let other = [m[1], m[2], Scalar::random(&mut OsRng)];
        assert_eq!(com.open(&c, &other, &r), Err(Error::BadProof));
    }

    #[test]
    fn test_duplicate_generators_are_rejected() {
        let p = ProjectivePoint::random(&mut OsRng);
        let q = ProjectivePoint::random(&mut OsRng);
        assert!(Pedersen::new(q, vec![p, p]).is_none());
    }
}
