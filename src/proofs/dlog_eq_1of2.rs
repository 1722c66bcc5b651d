//! OR-composition of two discrete-log-equality statements.
//!
//! Proves that `(a1, b1)` or `(a2, b2)` share a discrete logarithm over
//! `(g, h)`, without revealing which. The insertion argument uses this to
//! show that one of the two stack boundaries survived a pair of shifts.

use k256::{ProjectivePoint, Scalar};
use magikitten::Transcript;
use rand_core::CryptoRngCore;
use subtle::ConditionallySelectable;

use super::TranscriptExt;
use crate::error::Result;
use crate::proto;
use crate::serde::{scalar_from_bytes, scalar_to_bytes, Proto};

const STATEMENT_LABEL: &[u8] = b"dlog-eq-1of2 statement";
const COMMITMENT_LABEL: &[u8] = b"dlog-eq-1of2 commitment";
const CHALLENGE_LABEL: &[u8] = b"dlog-eq-1of2 challenge";

/// The public statement for this proof.
#[derive(Debug, Clone, Copy)]
pub struct Statement<'a> {
    pub a1: &'a ProjectivePoint,
    pub b1: &'a ProjectivePoint,
    pub a2: &'a ProjectivePoint,
    pub b2: &'a ProjectivePoint,
    pub g: &'a ProjectivePoint,
    pub h: &'a ProjectivePoint,
}

impl<'a> Statement<'a> {
    fn commit(&self, transcript: &mut Transcript) {
        transcript.commit_point(STATEMENT_LABEL, self.a1);
        transcript.commit_point(STATEMENT_LABEL, self.b1);
        transcript.commit_point(STATEMENT_LABEL, self.a2);
        transcript.commit_point(STATEMENT_LABEL, self.b2);
        transcript.commit_point(STATEMENT_LABEL, self.g);
        transcript.commit_point(STATEMENT_LABEL, self.h);
    }
}

/// The private witness: which branch holds, and its discrete logarithm.
#[derive(Clone, Copy)]
pub struct Witness<'a> {
    pub is_first: bool,
    pub x: &'a Scalar,
}

/// A proof of the statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    c1: Scalar,
    r1: Scalar,
    c2: Scalar,
    r2: Scalar,
}

/// Prove that a witness satisfies one branch of the statement.
pub fn prove(
    rng: &mut impl CryptoRngCore,
    transcript: &mut Transcript,
    statement: Statement<'_>,
    witness: Witness<'_>,
) -> Proof {
    statement.commit(transcript);

    let choice = u8::from(witness.is_first).into();

    // the held branch gets a real commitment, the other a simulated one
    let v1 = Scalar::generate_biased(&mut *rng);
    let v2 = Scalar::generate_biased(&mut *rng);
    let w = Scalar::generate_biased(&mut *rng);
    let w1 = Scalar::conditional_select(&w, &Scalar::ZERO, choice);
    let w2 = Scalar::conditional_select(&Scalar::ZERO, &w, choice);

    let t1a = *statement.a1 * w1 + *statement.g * v1;
    let t1b = *statement.b1 * w1 + *statement.h * v1;
    let t2a = *statement.a2 * w2 + *statement.g * v2;
    let t2b = *statement.b2 * w2 + *statement.h * v2;

    transcript.commit_point(COMMITMENT_LABEL, &t1a);
    transcript.commit_point(COMMITMENT_LABEL, &t1b);
    transcript.commit_point(COMMITMENT_LABEL, &t2a);
    transcript.commit_point(COMMITMENT_LABEL, &t2b);

    let c = transcript.challenge_scalar(CHALLENGE_LABEL);
    let diff = c - w;
    let c1 = Scalar::conditional_select(&w, &diff, choice);
    let c2 = Scalar::conditional_select(&diff, &w, choice);

    let vcx1 = v1 - c1 * witness.x;
    let vcx2 = v2 - c2 * witness.x;
    let r1 = Scalar::conditional_select(&v1, &vcx1, choice);
    let r2 = Scalar::conditional_select(&vcx2, &v2, choice);

    Proof { c1, r1, c2, r2 }
}

/// Verify a proof against a statement.
#[must_use]
pub fn verify(transcript: &mut Transcript, statement: Statement<'_>, proof: &Proof) -> bool {
    statement.commit(transcript);

    let t1a = *statement.a1 * proof.c1 + *statement.g * proof.r1;
    let t1b = *statement.b1 * proof.c1 + *statement.h * proof.r1;
    let t2a = *statement.a2 * proof.c2 + *statement.g * proof.r2;
    let t2b = *statement.b2 * proof.c2 + *statement.h * proof.r2;

    transcript.commit_point(COMMITMENT_LABEL, &t1a);
    transcript.commit_point(COMMITMENT_LABEL, &t1b);
    transcript.commit_point(COMMITMENT_LABEL, &t2a);
    transcript.commit_point(COMMITMENT_LABEL, &t2b);

    let c = transcript.challenge_scalar(CHALLENGE_LABEL);

    c == proof.c1 + proof.c2
}

impl Proto for Proof {
    type Message = proto::DlogEq1of2Proof;

    fn to_proto(&self) -> proto::DlogEq1of2Proof {
        proto::DlogEq1of2Proof {
            c1: scalar_to_bytes(&self.c1),
            r1: scalar_to_bytes(&self.r1),
            c2: scalar_to_bytes(&self.c2),
            r2: scalar_to_bytes(&self.r2),
        }
    }

    fn from_proto(m: &proto::DlogEq1of2Proof) -> Result<Self> {
        Ok(Self {
            c1: scalar_from_bytes(&m.c1)?,
            r1: scalar_from_bytes(&m.r1)?,
            c2: scalar_from_bytes(&m.c2)?,
            r2: scalar_from_bytes(&m.r2)?,
        })
    }
}
