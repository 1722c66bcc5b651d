//! Proof that parallel shuffles used the same permutation.
//!
//! Consecutive pairs of stacks are folded into one stack by a 2^64-weighted
//! linear combination; a secret-shuffle argument over each folded pair can
//! only verify if the underlying shuffles permuted both members alike.

use k256::{ProjectivePoint, Scalar};
use magikitten::Transcript;
use rand_core::CryptoRngCore;

use super::secret_shuffle;
use crate::error::Result;
use crate::mask::Mask;
use crate::perm::Permutation;
use crate::proto;
use crate::serde::Proto;

/// The public statement for this proof.
#[derive(Clone, Copy)]
pub struct Statement<'a> {
    /// The shared key.
    pub h: &'a ProjectivePoint,
    /// The original stacks.
    pub e0: &'a [&'a [Mask]],
    /// The shuffled stacks.
    pub e1: &'a [&'a [Mask]],
}

/// The private witness: the shared permutation and each shuffle's
/// re-randomization factors.
#[derive(Clone, Copy)]
pub struct Witness<'a> {
    pub pi: &'a Permutation,
    pub r: &'a [&'a [Scalar]],
}

/// A proof of the statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    tangles: Vec<secret_shuffle::Proof>,
}

fn fold_weight() -> Scalar {
    Scalar::from(u64::MAX) + Scalar::ONE
}

fn fold<T>(a: &[T], b: &[T]) -> Vec<T>
where
    T: Copy + std::ops::Mul<Scalar, Output = T> + std::ops::Add<T, Output = T>,
{
    let w = fold_weight();
    a.iter().zip(b.iter()).map(|(a, b)| *a * w + *b).collect()
}

/// Prove that a witness satisfies a given statement.
pub fn prove(
    rng: &mut impl CryptoRngCore,
    transcript: &mut Transcript,
    statement: Statement<'_>,
    witness: Witness<'_>,
) -> Proof {
    assert_eq!(statement.e0.len(), statement.e1.len());
    assert_eq!(statement.e0.len(), witness.r.len());

    transcript.message(b"$domain", b"entanglement");

    let tangles = statement
        .e0
        .windows(2)
        .zip(statement.e1.windows(2))
        .zip(witness.r.windows(2))
        .map(|((w0, w1), wr)| {
            let e0 = fold(w0[0], w0[1]);
            let e1 = fold(w1[0], w1[1]);
            let r = fold(wr[0], wr[1]);
            secret_shuffle::prove(
                rng,
                transcript,
                secret_shuffle::Statement {
                    h: statement.h,
                    e0: &e0,
                    e1: &e1,
                },
                secret_shuffle::Witness {
                    pi: witness.pi,
                    r: &r,
                },
            )
        })
        .collect();

    Proof { tangles }
}

/// Verify a proof against a statement.
#[must_use]
pub fn verify(transcript: &mut Transcript, statement: Statement<'_>, proof: &Proof) -> bool {
    let count = statement.e0.len();
    if count < 2
        || statement.e1.len() != count
        || proof.tangles.len() != count - 1
        || statement
            .e0
            .iter()
            .zip(statement.e1.iter())
            .any(|(a, b)| a.len() != b.len() || a.len() != statement.e0[0].len())
    {
        return false;
    }

    transcript.message(b"$domain", b"entanglement");

    statement
        .e0
        .windows(2)
        .zip(statement.e1.windows(2))
        .zip(proof.tangles.iter())
        .all(|((w0, w1), tangle)| {
            let e0 = fold(w0[0], w0[1]);
            let e1 = fold(w1[0], w1[1]);
            secret_shuffle::verify(
                transcript,
                secret_shuffle::Statement {
                    h: statement.h,
                    e0: &e0,
                    e1: &e1,
                },
                tangle,
            )
        })
}

impl Proto for Proof {
    type Message = proto::EntanglementProof;

    fn to_proto(&self) -> proto::EntanglementProof {
        proto::EntanglementProof {
            tangles: self.tangles.iter().map(|t| t.to_proto()).collect(),
        }
    }

    fn from_proto(m: &proto::EntanglementProof) -> Result<Self> {
        Ok(Self {
            tangles: m
                .tangles
                .iter()
                .map(secret_shuffle::Proof::from_proto)
                .collect::<Result<_>>()?,
        })
    }
}
