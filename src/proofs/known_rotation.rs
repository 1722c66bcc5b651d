//! Rotation-of-known-content argument.
//!
//! de Hoogh, Schoenmakers, Skoric, Villegas, 'Verifiable Rotation of
//! Homomorphic Encryptions', PKC 2009, LNCS 5443.
//!
//! Proves that a sequence of commitments opens to a cyclic rotation of a
//! known scalar domain, without revealing the offset.

use k256::{ProjectivePoint, Scalar};
use magikitten::Transcript;
use rand_core::CryptoRngCore;
use subtle::{ConditionallySelectable, ConstantTimeEq};

use super::{random_scalars, TranscriptExt};
use crate::commit::Pedersen;
use crate::error::Result;
use crate::proto;
use crate::serde::{
    points_from_bytes, points_to_bytes, scalars_from_bytes, scalars_to_bytes, Proto,
};

/// The public statement for this proof.
#[derive(Clone, Copy)]
pub struct Statement<'a> {
    /// The commitment key, sized for a single scalar.
    pub com: &'a Pedersen,
    /// The known domain.
    pub m: &'a [Scalar],
    /// Per-position commitments to the rotated domain.
    pub c: &'a [ProjectivePoint],
}

impl<'a> Statement<'a> {
    fn commit(&self, transcript: &mut Transcript) {
        transcript.commit_pedersen(b"com", self.com);
        transcript.commit_scalars(b"m", self.m);
        transcript.commit_points(b"c", self.c);
    }
}

/// The private witness: the offset and the commitments' blindings.
#[derive(Clone, Copy)]
pub struct Witness<'a> {
    pub k: usize,
    pub r: &'a [Scalar],
}

/// A proof of the statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    f: Vec<ProjectivePoint>,
    l: Vec<Scalar>,
    t: Vec<Scalar>,
}

/// Prove that a witness satisfies a given statement.
pub fn prove(
    rng: &mut impl CryptoRngCore,
    transcript: &mut Transcript,
    statement: Statement<'_>,
    witness: Witness<'_>,
) -> Proof {
    let n = statement.m.len();
    assert!(n >= 1);
    assert!(witness.k < n);

    transcript.message(b"$domain", b"known-rotation");
    statement.commit(transcript);

    let u = Scalar::generate_biased(&mut *rng);
    let mut l = random_scalars(n, rng);
    l[witness.k] = Scalar::ZERO;
    let mut t = random_scalars(n, rng);
    t[witness.k] = Scalar::ZERO;

    let b = transcript.challenge_scalars(b"b", n);
    let y: Vec<_> = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| statement.m[(n + j - i) % n] * b[j])
                .sum::<Scalar>()
        })
        .collect();
    let g = statement
        .c
        .iter()
        .zip(b.iter())
        .map(|(c, b)| c * b)
        .sum::<ProjectivePoint>();

    let com_u = statement.com.commit_by(&[Scalar::ZERO], &u);
    let f: Vec<_> = l
        .iter()
        .zip(t.iter())
        .zip(y.iter())
        .enumerate()
        .map(|(i, ((l, t), y))| {
            let com_i = statement.com.commit_by(&[*l * *y], t) + g * -*l;
            ProjectivePoint::conditional_select(
                &com_i,
                &com_u,
                (i as u64).ct_eq(&(witness.k as u64)),
            )
        })
        .collect();
    transcript.commit_points(b"f", &f);

    let lambda = transcript.challenge_scalar(b"lambda");
    l[witness.k] = lambda - l.iter().sum::<Scalar>();
    let br = b
        .iter()
        .zip(witness.r.iter())
        .map(|(b, r)| *b * *r)
        .sum::<Scalar>();
    t[witness.k] = u + l[witness.k] * br;

    Proof { f, l, t }
}

/// Verify a proof against a statement.
#[must_use]
pub fn verify(transcript: &mut Transcript, statement: Statement<'_>, proof: &Proof) -> bool {
    let n = statement.m.len();
    if n == 0
        || statement.c.len() != n
        || proof.f.len() != n
        || proof.l.len() != n
        || proof.t.len() != n
    {
        return false;
    }

    transcript.message(b"$domain", b"known-rotation");
    statement.commit(transcript);

    let b = transcript.challenge_scalars(b"b", n);
    let y: Vec<_> = (0..n)
        .map(|k| {
            (0..n)
                .map(|j| statement.m[(n + j - k) % n] * b[j])
                .sum::<Scalar>()
        })
        .collect();
    let g = statement
        .c
        .iter()
        .zip(b.iter())
        .map(|(c, b)| c * b)
        .sum::<ProjectivePoint>();

    transcript.commit_points(b"f", &proof.f);

    let lambda = transcript.challenge_scalar(b"lambda");
    let fgl: Vec<_> = proof
        .l
        .iter()
        .zip(proof.f.iter())
        .zip(y.iter())
        .map(|((l, f), y)| {
            let gy = statement.com.commit_by(&[*y], &Scalar::ZERO);
            *f + (g - gy) * l
        })
        .collect();

    let ht: Vec<_> = proof
        .t
        .iter()
        .map(|t| statement.com.commit_by(&[Scalar::ZERO], t))
        .collect();

    let l_sum = proof.l.iter().sum::<Scalar>();

    lambda == l_sum && ht == fgl
}

impl Proto for Proof {
    type Message = proto::KnownRotationProof;

    fn to_proto(&self) -> proto::KnownRotationProof {
        proto::KnownRotationProof {
            f: points_to_bytes(&self.f),
            l: scalars_to_bytes(&self.l),
            t: scalars_to_bytes(&self.t),
        }
    }

    fn from_proto(m: &proto::KnownRotationProof) -> Result<Self> {
        Ok(Self {
            f: points_from_bytes(&m.f)?,
            l: scalars_from_bytes(&m.l)?,
            t: scalars_from_bytes(&m.t)?,
        })
    }
}

#[cfg(test)]
mod test {
    use rand::Rng;
    use rand_core::OsRng;

    use super::*;
    use crate::perm::Permutation;

    #[test]
    fn test_valid_proof_verifies() {
        let m = random_scalars(8, &mut OsRng);
        let mut mp = m.clone();
        let k = OsRng.gen_range(0..8);
        Permutation::shift(8, k).apply_to(&mut mp);

        let com = Pedersen::random(1, &mut OsRng);
        let (c, r): (Vec<_>, Vec<_>) = mp
            .iter()
            .map(|m| com.commit_to(&[*m], &mut OsRng))
            .unzip();
        let statement = Statement {
            com: &com,
            m: &m,
            c: &c,
        };
        let witness = Witness { k, r: &r };

        let mut proof = prove(&mut OsRng, &mut Transcript::new(b"test"), statement, witness);
        assert!(verify(&mut Transcript::new(b"test"), statement, &proof));

        proof.t[0] += Scalar::ONE;
        assert!(!verify(&mut Transcript::new(b"test"), statement, &proof));
    }

    #[test]
    fn test_non_rotation_fails() {
        let m = random_scalars(6, &mut OsRng);
        let mut mp = m.clone();
        mp.swap(0, 1);

        let com = Pedersen::random(1, &mut OsRng);
        let (c, r): (Vec<_>, Vec<_>) = mp
            .iter()
            .map(|m| com.commit_to(&[*m], &mut OsRng))
            .unzip();
        let statement = Statement {
            com: &com,
            m: &m,
            c: &c,
        };
        let witness = Witness { k: 0, r: &r };

        let proof = prove(&mut OsRng, &mut Transcript::new(b"test"), statement, witness);
        assert!(!verify(&mut Transcript::new(b"test"), statement, &proof));
    }
}
