//! Chaum-Pedersen proof of equality of discrete logarithms.
//!
//! Proves knowledge of `x` with `public0 = x·G` and `public1 = x·generator1`
//! without revealing `x`. This one proof backs masking, re-masking, and
//! decryption shares: each is an instance with a different statement.

use k256::{ProjectivePoint, Scalar};
use magikitten::Transcript;
use rand_core::CryptoRngCore;

use super::TranscriptExt;
use crate::error::Result;
use crate::proto;
use crate::serde::{scalar_from_bytes, scalar_to_bytes, Proto};

const STATEMENT_LABEL: &[u8] = b"dlog-eq statement";
const COMMITMENT_LABEL: &[u8] = b"dlog-eq commitment";
const CHALLENGE_LABEL: &[u8] = b"dlog-eq challenge";

/// The public statement for this proof.
#[derive(Debug, Clone, Copy)]
pub struct Statement<'a> {
    pub public0: &'a ProjectivePoint,
    pub generator1: &'a ProjectivePoint,
    pub public1: &'a ProjectivePoint,
}

impl<'a> Statement<'a> {
    /// The homomorphism the proof is about.
    fn phi(&self, x: &Scalar) -> (ProjectivePoint, ProjectivePoint) {
        (ProjectivePoint::GENERATOR * x, *self.generator1 * x)
    }

    fn commit(&self, transcript: &mut Transcript) {
        transcript.commit_point(STATEMENT_LABEL, self.public0);
        transcript.commit_point(STATEMENT_LABEL, self.generator1);
        transcript.commit_point(STATEMENT_LABEL, self.public1);
    }
}

/// The private witness: the shared discrete logarithm.
#[derive(Clone, Copy)]
pub struct Witness<'a> {
    pub x: &'a Scalar,
}

/// A proof of the statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    e: Scalar,
    s: Scalar,
}

/// Prove that a witness satisfies a given statement.
pub fn prove(
    rng: &mut impl CryptoRngCore,
    transcript: &mut Transcript,
    statement: Statement<'_>,
    witness: Witness<'_>,
) -> Proof {
    statement.commit(transcript);

    let k = Scalar::generate_biased(rng);
    let (big_k0, big_k1) = statement.phi(&k);

    transcript.commit_point(COMMITMENT_LABEL, &big_k0);
    transcript.commit_point(COMMITMENT_LABEL, &big_k1);

    let e = transcript.challenge_scalar(CHALLENGE_LABEL);

    let s = k + e * witness.x;
    Proof { e, s }
}

/// Verify a proof against a statement.
#[must_use]
pub fn verify(transcript: &mut Transcript, statement: Statement<'_>, proof: &Proof) -> bool {
    statement.commit(transcript);

    let (phi0, phi1) = statement.phi(&proof.s);
    let big_k0 = phi0 - *statement.public0 * proof.e;
    let big_k1 = phi1 - *statement.public1 * proof.e;

    transcript.commit_point(COMMITMENT_LABEL, &big_k0);
    transcript.commit_point(COMMITMENT_LABEL, &big_k1);

    let e = transcript.challenge_scalar(CHALLENGE_LABEL);

    e == proof.e
}

impl Proto for Proof {
    type Message = proto::DlogEqProof;

    fn to_proto(&self) -> proto::DlogEqProof {
        proto::DlogEqProof {
            e: scalar_to_bytes(&self.e),
            s: scalar_to_bytes(&self.s),
        }
    }

    fn from_proto(m: &proto::DlogEqProof) -> Result<Self> {
        Ok(Self {
            e: scalar_from_bytes(&m.e)?,
            s: scalar_from_bytes(&m.s)?,
        })
    }
}

#[cfg(test)]
mod test {
    use elliptic_curve::Group;
    use rand_core::OsRng;

    use super::*;

    #[test]
    fn test_valid_proof_verifies() {
        let x = Scalar::generate_biased(&mut OsRng);
        let big_h = ProjectivePoint::random(&mut OsRng);

        let statement = Statement {
            public0: &(ProjectivePoint::GENERATOR * x),
            generator1: &big_h,
            public1: &(big_h * x),
        };
        let witness = Witness { x: &x };

        let transcript = Transcript::new(b"test");
        let proof = prove(&mut OsRng, &mut transcript.forked(b"party", &[1]), statement, witness);

        assert!(verify(&mut transcript.forked(b"party", &[1]), statement, &proof));
    }

    #[test]
    fn test_wrong_witness_fails() {
        let x = Scalar::generate_biased(&mut OsRng);
        let big_h = ProjectivePoint::random(&mut OsRng);

        let statement = Statement {
            public0: &(ProjectivePoint::GENERATOR * x),
            generator1: &big_h,
            public1: &(big_h * x),
        };
        let witness = Witness { x: &Scalar::ONE };

        let mut transcript = Transcript::new(b"test");
        let proof = prove(&mut OsRng, &mut transcript, statement, witness);

        assert!(!verify(&mut Transcript::new(b"test"), statement, &proof));
    }

    #[test]
    fn test_proof_roundtrips() {
        let x = Scalar::generate_biased(&mut OsRng);
        let big_h = ProjectivePoint::random(&mut OsRng);
        let statement = Statement {
            public0: &(ProjectivePoint::GENERATOR * x),
            generator1: &big_h,
            public1: &(big_h * x),
        };

        let mut transcript = Transcript::new(b"test");
        let proof = prove(&mut OsRng, &mut transcript, statement, Witness { x: &x });

        let recovered = Proof::from_bytes(&proof.to_bytes()).unwrap();
        assert_eq!(proof, recovered);
        assert!(verify(&mut Transcript::new(b"test"), statement, &recovered));
    }
}
