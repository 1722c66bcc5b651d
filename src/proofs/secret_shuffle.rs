//! Verifiable secret shuffle of homomorphic encryptions.
//!
//! Jens Groth, 'A Verifiable Secret Shuffle of Homomorphic Encryptions',
//! Cryptology ePrint Archive, Report 2005/246.
//!
//! Proves that `e1` re-randomizes and permutes `e0` under the shared key,
//! leaking neither the permutation nor the re-randomization factors. The
//! permutation commitment is delegated to the known-shuffle argument.

use k256::{ProjectivePoint, Scalar};
use magikitten::Transcript;
use rand_core::CryptoRngCore;

use super::{known_shuffle, TranscriptExt};
use crate::commit::Pedersen;
use crate::error::{Error, Result};
use crate::mask::Mask;
use crate::perm::Permutation;
use crate::proto;
use crate::serde::{
    point_from_bytes, point_to_bytes, scalar_from_bytes, scalar_to_bytes, scalars_from_bytes,
    scalars_to_bytes, Proto,
};

/// The public statement for this proof.
#[derive(Clone, Copy)]
pub struct Statement<'a> {
    /// The shared key.
    pub h: &'a ProjectivePoint,
    /// The original stack.
    pub e0: &'a [Mask],
    /// The shuffled stack.
    pub e1: &'a [Mask],
}

impl<'a> Statement<'a> {
    fn commit(&self, transcript: &mut Transcript) {
        transcript.commit_point(b"h", self.h);
        transcript.commit_masks(b"e0", self.e0);
        transcript.commit_masks(b"e1", self.e1);
    }
}

/// The private witness: the permutation and re-randomization factors.
#[derive(Clone, Copy)]
pub struct Witness<'a> {
    pub pi: &'a Permutation,
    pub r: &'a [Scalar],
}

/// A proof of the statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    skc: known_shuffle::Proof,
    c: ProjectivePoint,
    cd: ProjectivePoint,
    ed: Mask,
    f: Vec<Scalar>,
    z: Scalar,
}

/// Prove that a witness satisfies a given statement.
///
/// The stacks must hold at least two masks each.
pub fn prove(
    rng: &mut impl CryptoRngCore,
    transcript: &mut Transcript,
    statement: Statement<'_>,
    witness: Witness<'_>,
) -> Proof {
    let n = statement.e0.len();
    assert!(n >= 2);
    assert_eq!(witness.r.len(), n);

    transcript.message(b"$domain", b"secret-shuffle");
    statement.commit(transcript);

    let com = transcript.challenge_pedersen(b"com", n);

    let gh = Mask(ProjectivePoint::GENERATOR, *statement.h);

    let p2: Vec<_> = witness
        .pi
        .iter()
        .map(|p| Scalar::from((p + 1) as u64))
        .collect();
    let (c, r) = com.commit_to(&p2, rng);
    transcript.commit_point(b"c", &c);

    let d: Vec<_> = (0..n)
        .map(|_| -Scalar::generate_biased(&mut *rng))
        .collect();
    let (cd, rd) = com.commit_to(&d, rng);
    transcript.commit_point(b"cd", &cd);

    let ed = gh * rd
        + d.iter()
            .zip(statement.e1.iter())
            .map(|(d, e)| *e * *d)
            .sum::<Mask>();
    transcript.commit_mask(b"ed", &ed);

    let t = transcript.challenge_scalars(b"t", n);

    let f: Vec<_> = witness
        .pi
        .iter()
        .zip(d.iter())
        .map(|(p, d)| t[*p] - d)
        .collect();
    transcript.commit_scalars(b"f", &f);

    let z = witness
        .pi
        .iter()
        .zip(witness.r.iter())
        .map(|(p, r)| t[*p] * r)
        .sum::<Scalar>()
        + rd;
    transcript.commit_scalar(b"z", &z);

    let l = transcript.challenge_scalar(b"l");

    let m: Vec<_> = (0..n)
        .map(|i| l * Scalar::from((i + 1) as u64) + t[i])
        .collect();
    let commit = c * l + cd + com.commit_by(&f, &Scalar::ZERO);
    let rho = l * r + rd;

    let skc = known_shuffle::prove(
        rng,
        transcript,
        known_shuffle::Statement {
            com: &com,
            c: &commit,
            m: &m,
        },
        known_shuffle::Witness {
            pi: witness.pi,
            r: &rho,
        },
    );

    Proof {
        skc,
        c,
        cd,
        ed,
        f,
        z,
    }
}

/// Verify a proof against a statement.
#[must_use]
pub fn verify(transcript: &mut Transcript, statement: Statement<'_>, proof: &Proof) -> bool {
    let n = statement.e0.len();
    if n < 2 || statement.e1.len() != n || proof.f.len() != n {
        return false;
    }

    transcript.message(b"$domain", b"secret-shuffle");
    statement.commit(transcript);

    let com = transcript.challenge_pedersen(b"com", n);

    let gh = Mask(ProjectivePoint::GENERATOR, *statement.h);

    transcript.commit_point(b"c", &proof.c);
    transcript.commit_point(b"cd", &proof.cd);
    transcript.commit_mask(b"ed", &proof.ed);

    let t = transcript.challenge_scalars(b"t", n);

    transcript.commit_scalars(b"f", &proof.f);
    transcript.commit_scalar(b"z", &proof.z);

    let l = transcript.challenge_scalar(b"l");

    let m: Vec<_> = (0..n)
        .map(|i| l * Scalar::from((i + 1) as u64) + t[i])
        .collect();
    let commit = proof.c * l + proof.cd + com.commit_by(&proof.f, &Scalar::ZERO);

    if !known_shuffle::verify(
        transcript,
        known_shuffle::Statement {
            com: &com,
            c: &commit,
            m: &m,
        },
        &proof.skc,
    ) {
        return false;
    }

    let efed = proof.ed
        + statement
            .e1
            .iter()
            .zip(proof.f.iter())
            .map(|(e, f)| *e * *f)
            .sum::<Mask>();
    let etfd = efed
        + statement
            .e0
            .iter()
            .zip(t.iter())
            .map(|(e, t)| *e * -*t)
            .sum::<Mask>();

    let ez = gh * proof.z;

    etfd == ez
}

impl Proto for Proof {
    type Message = proto::ShuffleProof;

    fn to_proto(&self) -> proto::ShuffleProof {
        proto::ShuffleProof {
            skc: Some(self.skc.to_proto()),
            c: point_to_bytes(&self.c),
            cd: point_to_bytes(&self.cd),
            ed: Some(self.ed.to_proto()),
            f: scalars_to_bytes(&self.f),
            z: scalar_to_bytes(&self.z),
        }
    }

    fn from_proto(m: &proto::ShuffleProof) -> Result<Self> {
        Ok(Self {
            skc: known_shuffle::Proof::from_proto(m.skc.as_ref().ok_or(Error::Decoding)?)?,
            c: point_from_bytes(&m.c)?,
            cd: point_from_bytes(&m.cd)?,
            ed: Mask::from_proto(m.ed.as_ref().ok_or(Error::Decoding)?)?,
            f: scalars_from_bytes(&m.f)?,
            z: scalar_from_bytes(&m.z)?,
        })
    }
}
