//! Verifiable secret rotation of homomorphic encryptions.
//!
//! de Hoogh, Schoenmakers, Skoric, Villegas, 'Verifiable Rotation of
//! Homomorphic Encryptions', PKC 2009, LNCS 5443.
//!
//! Proves that `e1` re-randomizes and cyclically rotates `e0` under the
//! shared key, hiding both the offset and the re-randomization factors.

use k256::{ProjectivePoint, Scalar};
use magikitten::Transcript;
use rand_core::CryptoRngCore;

use super::{known_rotation, random_scalars, TranscriptExt};
use crate::error::{Error, Result};
use crate::mask::Mask;
use crate::perm::Permutation;
use crate::proto;
use crate::serde::{
    point_from_bytes, point_to_bytes, points_from_bytes, points_to_bytes, scalar_from_bytes,
    scalar_to_bytes, scalars_from_bytes, scalars_to_bytes, Proto,
};

/// The public statement for this proof.
#[derive(Clone, Copy)]
pub struct Statement<'a> {
    /// The shared key.
    pub h: &'a ProjectivePoint,
    /// The original stack.
    pub e0: &'a [Mask],
    /// The rotated stack.
    pub e1: &'a [Mask],
}

impl<'a> Statement<'a> {
    fn commit(&self, transcript: &mut Transcript) {
        transcript.commit_point(b"h", self.h);
        transcript.commit_masks(b"e0", self.e0);
        transcript.commit_masks(b"e1", self.e1);
    }
}

/// The private witness: the offset and re-randomization factors.
#[derive(Clone, Copy)]
pub struct Witness<'a> {
    pub k: usize,
    pub r: &'a [Scalar],
}

/// A proof of the statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    rkc: known_rotation::Proof,
    h: Vec<ProjectivePoint>,
    z: Vec<Mask>,
    v: Scalar,
    f: Vec<ProjectivePoint>,
    ff: Vec<Mask>,
    tau: Vec<Scalar>,
    rho: Vec<Scalar>,
    mu: Vec<Scalar>,
}

/// Prove that a witness satisfies a given statement.
pub fn prove(
    rng: &mut impl CryptoRngCore,
    transcript: &mut Transcript,
    statement: Statement<'_>,
    witness: Witness<'_>,
) -> Proof {
    let n = statement.e0.len();
    assert!(n >= 1);
    assert!(witness.k < n);
    assert_eq!(witness.r.len(), n);

    transcript.message(b"$domain", b"secret-rotation");
    statement.commit(transcript);

    let com = transcript.challenge_pedersen(b"com", 1);

    let gh = Mask(ProjectivePoint::GENERATOR, *statement.h);

    let a = transcript.challenge_scalars(b"a", n);

    let u = random_scalars(n, rng);
    let t = random_scalars(n, rng);

    let mut sa = a.clone();
    Permutation::shift(n, witness.k).apply_to(&mut sa);

    let h: Vec<_> = sa
        .iter()
        .zip(u.iter())
        .map(|(a, u)| com.commit_by(&[*a], u))
        .collect();
    transcript.commit_points(b"hc", &h);
    let z: Vec<_> = statement
        .e1
        .iter()
        .zip(t.iter().zip(sa.iter()))
        .map(|(de, (t, a))| *de * *a + gh * *t)
        .collect();
    transcript.commit_masks(b"z", &z);
    let v = sa
        .iter()
        .zip(witness.r.iter())
        .zip(t.iter())
        .map(|((a, r), t)| *a * *r + *t)
        .sum::<Scalar>();
    transcript.commit_scalar(b"v", &v);

    let o = random_scalars(n, rng);
    let p = random_scalars(n, rng);
    let m = random_scalars(n, rng);

    let f: Vec<_> = o
        .iter()
        .zip(p.iter())
        .map(|(o, p)| com.commit_by(&[*o], p))
        .collect();
    transcript.commit_points(b"f", &f);
    let ff: Vec<_> = statement
        .e1
        .iter()
        .zip(o.iter().zip(m.iter()))
        .map(|(de, (o, m))| *de * *o + gh * *m)
        .collect();
    transcript.commit_masks(b"ff", &ff);

    let l = transcript.challenge_scalar(b"l");
    let tau: Vec<_> = o.iter().zip(sa.iter()).map(|(o, a)| *o + l * a).collect();
    transcript.commit_scalars(b"tau", &tau);
    let rho: Vec<_> = p.iter().zip(u.iter()).map(|(p, u)| *p + l * u).collect();
    transcript.commit_scalars(b"rho", &rho);
    let mu: Vec<_> = m.iter().zip(t.iter()).map(|(m, t)| *m + l * t).collect();
    transcript.commit_scalars(b"mu", &mu);

    let rkc = known_rotation::prove(
        rng,
        transcript,
        known_rotation::Statement {
            com: &com,
            m: &a,
            c: &h,
        },
        known_rotation::Witness {
            k: witness.k,
            r: &u,
        },
    );

    Proof {
        rkc,
        h,
        z,
        v,
        f,
        ff,
        tau,
        rho,
        mu,
    }
}

/// Verify a proof against a statement.
#[must_use]
pub fn verify(transcript: &mut Transcript, statement: Statement<'_>, proof: &Proof) -> bool {
    let n = statement.e0.len();
    if n == 0
        || statement.e1.len() != n
        || proof.h.len() != n
        || proof.z.len() != n
        || proof.f.len() != n
        || proof.ff.len() != n
        || proof.tau.len() != n
        || proof.rho.len() != n
        || proof.mu.len() != n
    {
        return false;
    }

    transcript.message(b"$domain", b"secret-rotation");
    statement.commit(transcript);

    let com = transcript.challenge_pedersen(b"com", 1);

    let gh = Mask(ProjectivePoint::GENERATOR, *statement.h);

    let a = transcript.challenge_scalars(b"a", n);

    transcript.commit_points(b"hc", &proof.h);
    transcript.commit_masks(b"z", &proof.z);
    transcript.commit_scalar(b"v", &proof.v);

    transcript.commit_points(b"f", &proof.f);
    transcript.commit_masks(b"ff", &proof.ff);

    let l = transcript.challenge_scalar(b"l");

    transcript.commit_scalars(b"tau", &proof.tau);
    transcript.commit_scalars(b"rho", &proof.rho);
    transcript.commit_scalars(b"mu", &proof.mu);

    if !known_rotation::verify(
        transcript,
        known_rotation::Statement {
            com: &com,
            m: &a,
            c: &proof.h,
        },
        &proof.rkc,
    ) {
        return false;
    }

    let tr: Vec<_> = proof
        .tau
        .iter()
        .zip(proof.rho.iter())
        .map(|(t, r)| com.commit_by(&[*t], r))
        .collect();
    let fhl: Vec<_> = proof
        .f
        .iter()
        .zip(proof.h.iter())
        .map(|(f, h)| *f + h * &l)
        .collect();

    let dtm: Vec<_> = statement
        .e1
        .iter()
        .zip(proof.tau.iter().zip(proof.mu.iter()))
        .map(|(de, (t, m))| *de * *t + gh * *m)
        .collect();
    let fzl: Vec<_> = proof
        .ff
        .iter()
        .zip(proof.z.iter())
        .map(|(f, z)| *f + *z * l)
        .collect();

    let pzea = proof
        .z
        .iter()
        .zip(statement.e0.iter())
        .zip(a.iter())
        .map(|((z, e), a)| *z + *e * -*a)
        .sum::<Mask>();
    let ghv = gh * proof.v;

    tr == fhl && dtm == fzl && pzea == ghv
}

impl Proto for Proof {
    type Message = proto::RotationProof;

    fn to_proto(&self) -> proto::RotationProof {
        proto::RotationProof {
            rkc: Some(self.rkc.to_proto()),
            h: points_to_bytes(&self.h),
            z: self.z.iter().map(|m| m.to_proto()).collect(),
            v: scalar_to_bytes(&self.v),
            f: points_to_bytes(&self.f),
            ff: self.ff.iter().map(|m| m.to_proto()).collect(),
            tau: scalars_to_bytes(&self.tau),
            rho: scalars_to_bytes(&self.rho),
            mu: scalars_to_bytes(&self.mu),
        }
    }

    fn from_proto(m: &proto::RotationProof) -> Result<Self> {
        Ok(Self {
            rkc: known_rotation::Proof::from_proto(m.rkc.as_ref().ok_or(Error::Decoding)?)?,
            h: points_from_bytes(&m.h)?,
            z: m.z.iter().map(Mask::from_proto).collect::<Result<_>>()?,
            v: scalar_from_bytes(&m.v)?,
            f: points_from_bytes(&m.f)?,
            ff: m.ff.iter().map(Mask::from_proto).collect::<Result<_>>()?,
            tau: scalars_from_bytes(&m.tau)?,
            rho: scalars_from_bytes(&m.rho)?,
            mu: scalars_from_bytes(&m.mu)?,
        })
    }
}

#[cfg(test)]
mod test {
    use elliptic_curve::Group;
    use rand::Rng;
    use rand_core::OsRng;

    use super::*;

    fn rotated_pair(
        h: &ProjectivePoint,
        n: usize,
        k: usize,
    ) -> (Vec<Mask>, Vec<Mask>, Vec<Scalar>) {
        let gh = Mask(ProjectivePoint::GENERATOR, *h);
        let e0: Vec<_> = random_scalars(n, &mut OsRng)
            .into_iter()
            .map(|m| {
                let r = Scalar::generate_biased(&mut OsRng);
                gh * r + Mask::open(ProjectivePoint::GENERATOR * m)
            })
            .collect();
        let (mut e1, mut r): (Vec<_>, Vec<_>) = e0
            .iter()
            .map(|e| {
                let r = Scalar::generate_biased(&mut OsRng);
                (gh * r + *e, r)
            })
            .unzip();
        let pi = Permutation::shift(n, k);
        pi.apply_to(&mut e1);
        pi.apply_to(&mut r);
        (e0, e1, r)
    }

    #[test]
    fn test_valid_proof_verifies() {
        let h = ProjectivePoint::random(&mut OsRng);
        let k = OsRng.gen_range(0..8);
        let (e0, e1, r) = rotated_pair(&h, 8, k);

        let statement = Statement {
            h: &h,
            e0: &e0,
            e1: &e1,
        };
        let witness = Witness { k, r: &r };

        let mut proof = prove(&mut OsRng, &mut Transcript::new(b"test"), statement, witness);
        assert!(verify(&mut Transcript::new(b"test"), statement, &proof));

        proof.v += Scalar::ONE;
        assert!(!verify(&mut Transcript::new(b"test"), statement, &proof));
    }

    #[test]
    fn test_zero_offset_verifies() {
        let h = ProjectivePoint::random(&mut OsRng);
        let (e0, e1, r) = rotated_pair(&h, 5, 0);

        let statement = Statement {
            h: &h,
            e0: &e0,
            e1: &e1,
        };
        let proof = prove(
            &mut OsRng,
            &mut Transcript::new(b"test"),
            statement,
            Witness { k: 0, r: &r },
        );
        assert!(verify(&mut Transcript::new(b"test"), statement, &proof));
    }

    #[test]
    fn test_tampered_stack_fails() {
        let h = ProjectivePoint::random(&mut OsRng);
        let (e0, e1, r) = rotated_pair(&h, 8, 3);

        let statement = Statement {
            h: &h,
            e0: &e0,
            e1: &e1,
        };
        let proof = prove(
            &mut OsRng,
            &mut Transcript::new(b"test"),
            statement,
            Witness { k: 3, r: &r },
        );

        let mut e0_bad = e0.clone();
        e0_bad.swap(0, 1);
        let bad = Statement {
            h: &h,
            e0: &e0_bad,
            e1: &e1,
        };
        assert!(!verify(&mut Transcript::new(b"test"), bad, &proof));
    }
}
