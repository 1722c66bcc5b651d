//! Verifiable secret insertion of homomorphic encryptions.
//!
//! Inserting a needle into a stack at a hidden position is expressed as a
//! rotation of the target, an append, and a counter-rotation. The two
//! rotation arguments prove the structure; a 1-of-2 discrete-log equality
//! on the stack boundaries binds the rotations as inverses without
//! revealing which boundary survived.

use k256::{ProjectivePoint, Scalar};
use magikitten::Transcript;
use rand_core::CryptoRngCore;
use subtle::{ConditionallySelectable, ConstantTimeEq};

use super::{dlog_eq_1of2, secret_rotation, TranscriptExt};
use crate::error::{Error, Result};
use crate::mask::Mask;
use crate::perm::Permutation;
use crate::proto;
use crate::serde::Proto;

/// The public statement for this proof.
#[derive(Clone, Copy)]
pub struct Statement<'a> {
    /// The shared key.
    pub h: &'a ProjectivePoint,
    /// The needle being inserted.
    pub needle: &'a [Mask],
    /// The stack inserted into.
    pub s0: &'a [Mask],
    /// The combined result.
    pub s2: &'a [Mask],
}

impl<'a> Statement<'a> {
    fn commit(&self, transcript: &mut Transcript) {
        transcript.commit_masks(b"needle", self.needle);
        transcript.commit_masks(b"s0", self.s0);
        transcript.commit_masks(b"s2", self.s2);
    }
}

/// The private witness: the rotation offset and the blinding factors of
/// both rotations.
#[derive(Clone, Copy)]
pub struct Witness<'a> {
    pub k: usize,
    pub r1: &'a [Scalar],
    pub r2: &'a [Scalar],
}

/// A proof of the statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    rot1: secret_rotation::Proof,
    s1: Vec<Mask>,
    rot2: secret_rotation::Proof,
    boundary: dlog_eq_1of2::Proof,
}

/// Prove that a witness satisfies a given statement.
pub fn prove(
    rng: &mut impl CryptoRngCore,
    transcript: &mut Transcript,
    statement: Statement<'_>,
    witness: Witness<'_>,
) -> Proof {
    let n = statement.s0.len();
    let n2 = statement.s2.len();
    assert!(n >= 1 && !statement.needle.is_empty());
    assert_eq!(n2, n + statement.needle.len());

    transcript.message(b"$domain", b"secret-insertion");
    statement.commit(transcript);

    let gh = Mask(ProjectivePoint::GENERATOR, *statement.h);

    let k = witness.k % n;
    let mut s1 = statement.s0.to_vec();
    let p = Permutation::shift(n, k);
    p.apply_to(&mut s1);
    for (s, r) in s1.iter_mut().zip(witness.r1.iter()) {
        *s += gh * *r;
    }
    transcript.commit_masks(b"s1", &s1);

    let rot1 = secret_rotation::prove(
        rng,
        transcript,
        secret_rotation::Statement {
            h: statement.h,
            e0: statement.s0,
            e1: &s1,
        },
        secret_rotation::Witness { k, r: witness.r1 },
    );

    let mut s1c = s1.clone();
    s1c.extend_from_slice(statement.needle);
    transcript.commit_masks(b"s1c", &s1c);

    let rot2 = secret_rotation::prove(
        rng,
        transcript,
        secret_rotation::Statement {
            h: statement.h,
            e0: &s1c,
            e1: statement.s2,
        },
        secret_rotation::Witness {
            k: (n2 - witness.k) % n2,
            r: witness.r2,
        },
    );

    let mut ir1 = witness.r1.to_vec();
    p.inverse().apply_to(&mut ir1);

    let coin = (rng.next_u32() & 1) as u8;
    let on_top = u8::from(witness.k != n);
    let in_middle = u8::from(witness.k != n && witness.k != 0);
    let is_first = u8::conditional_select(&on_top, &coin, in_middle.ct_eq(&1));

    let top_x = ir1[0] + witness.r2[0];
    let bottom_x = ir1[n - 1] + witness.r2[n2 - 1];
    let x = Scalar::conditional_select(&bottom_x, &top_x, is_first.ct_eq(&1));

    let boundary = dlog_eq_1of2::prove(
        rng,
        transcript,
        dlog_eq_1of2::Statement {
            a1: &(statement.s2[0].0 - statement.s0[0].0),
            b1: &(statement.s2[0].1 - statement.s0[0].1),
            a2: &(statement.s2[n2 - 1].0 - statement.s0[n - 1].0),
            b2: &(statement.s2[n2 - 1].1 - statement.s0[n - 1].1),
            g: &ProjectivePoint::GENERATOR,
            h: statement.h,
        },
        dlog_eq_1of2::Witness {
            is_first: is_first == 1,
            x: &x,
        },
    );

    Proof {
        rot1,
        s1,
        rot2,
        boundary,
    }
}

/// Verify a proof against a statement.
#[must_use]
pub fn verify(transcript: &mut Transcript, statement: Statement<'_>, proof: &Proof) -> bool {
    let n = statement.s0.len();
    let n2 = statement.s2.len();
    if n == 0
        || statement.needle.is_empty()
        || n2 != n + statement.needle.len()
        || proof.s1.len() != n
    {
        return false;
    }

    transcript.message(b"$domain", b"secret-insertion");
    statement.commit(transcript);

    transcript.commit_masks(b"s1", &proof.s1);

    if !secret_rotation::verify(
        transcript,
        secret_rotation::Statement {
            h: statement.h,
            e0: statement.s0,
            e1: &proof.s1,
        },
        &proof.rot1,
    ) {
        return false;
    }

    let mut s1c = proof.s1.clone();
    s1c.extend_from_slice(statement.needle);
    transcript.commit_masks(b"s1c", &s1c);

    if !secret_rotation::verify(
        transcript,
        secret_rotation::Statement {
            h: statement.h,
            e0: &s1c,
            e1: statement.s2,
        },
        &proof.rot2,
    ) {
        return false;
    }

    dlog_eq_1of2::verify(
        transcript,
        dlog_eq_1of2::Statement {
            a1: &(statement.s2[0].0 - statement.s0[0].0),
            b1: &(statement.s2[0].1 - statement.s0[0].1),
            a2: &(statement.s2[n2 - 1].0 - statement.s0[n - 1].0),
            b2: &(statement.s2[n2 - 1].1 - statement.s0[n - 1].1),
            g: &ProjectivePoint::GENERATOR,
            h: statement.h,
        },
        &proof.boundary,
    )
}

impl Proto for Proof {
    type Message = proto::InsertProof;

    fn to_proto(&self) -> proto::InsertProof {
        proto::InsertProof {
            rot1: Some(self.rot1.to_proto()),
            s1: self.s1.iter().map(|m| m.to_proto()).collect(),
            rot2: Some(self.rot2.to_proto()),
            boundary: Some(self.boundary.to_proto()),
        }
    }

    fn from_proto(m: &proto::InsertProof) -> Result<Self> {
        Ok(Self {
            rot1: secret_rotation::Proof::from_proto(m.rot1.as_ref().ok_or(Error::Decoding)?)?,
            s1: m.s1.iter().map(Mask::from_proto).collect::<Result<_>>()?,
            rot2: secret_rotation::Proof::from_proto(m.rot2.as_ref().ok_or(Error::Decoding)?)?,
            boundary: dlog_eq_1of2::Proof::from_proto(
                m.boundary.as_ref().ok_or(Error::Decoding)?,
            )?,
        })
    }
}

#[cfg(test)]
mod test {
    use elliptic_curve::Group;
    use rand::Rng;
    use rand_core::OsRng;

    use super::super::random_scalars;
    use super::*;

    #[test]
    fn test_valid_proof_verifies() {
        let h = ProjectivePoint::random(&mut OsRng);
        let gh = Mask(ProjectivePoint::GENERATOR, h);

        let needle: Vec<_> = (0..3)
            .map(|_| Mask::open(ProjectivePoint::random(&mut OsRng)))
            .collect();
        let s0: Vec<_> = random_scalars(8, &mut OsRng)
            .into_iter()
            .map(|m| {
                let r = Scalar::generate_biased(&mut OsRng);
                gh * r + Mask::open(ProjectivePoint::GENERATOR * m)
            })
            .collect();

        let (mut s1, mut r1): (Vec<_>, Vec<_>) = s0
            .iter()
            .map(|s| {
                let r = Scalar::generate_biased(&mut OsRng);
                (gh * r + *s, r)
            })
            .unzip();
        let k = OsRng.gen_range(0..9);
        let p1 = Permutation::shift(8, k % 8);
        p1.apply_to(&mut s1);
        p1.apply_to(&mut r1);

        let mut s1c = s1.clone();
        s1c.extend_from_slice(&needle);
        let (mut s2, mut r2): (Vec<_>, Vec<_>) = s1c
            .iter()
            .map(|s| {
                let r = Scalar::generate_biased(&mut OsRng);
                (gh * r + *s, r)
            })
            .unzip();
        let p2 = Permutation::shift(11, (11 - k) % 11);
        p2.apply_to(&mut s2);
        p2.apply_to(&mut r2);

        let statement = Statement {
            h: &h,
            needle: &needle,
            s0: &s0,
            s2: &s2,
        };
        let witness = Witness {
            k,
            r1: &r1,
            r2: &r2,
        };

        let proof = prove(&mut OsRng, &mut Transcript::new(b"test"), statement, witness);
        assert!(verify(&mut Transcript::new(b"test"), statement, &proof));

        let mut broken = proof.clone();
        broken.s1.swap(0, 1);
        assert!(!verify(&mut Transcript::new(b"test"), statement, &broken));
    }
}
