//! Shuffle-of-known-content argument.
//!
//! Jens Groth, 'A Verifiable Secret Shuffle of Homomorphic Encryptions',
//! Cryptology ePrint Archive, Report 2005/246.
//!
//! Proves that a commitment `c` opens to a permutation of a known scalar
//! domain `m`, without revealing the permutation.

use k256::{ProjectivePoint, Scalar};
use magikitten::Transcript;
use rand_core::CryptoRngCore;

use super::TranscriptExt;
use crate::commit::Pedersen;
use crate::error::Result;
use crate::perm::Permutation;
use crate::proto;
use crate::serde::{
    point_from_bytes, point_to_bytes, scalar_from_bytes, scalar_to_bytes, scalars_from_bytes,
    scalars_to_bytes, Proto,
};

/// The public statement for this proof.
#[derive(Clone, Copy)]
pub struct Statement<'a> {
    /// The commitment key.
    pub com: &'a Pedersen,
    /// A commitment to the permuted domain.
    pub c: &'a ProjectivePoint,
    /// The known domain.
    pub m: &'a [Scalar],
}

impl<'a> Statement<'a> {
    fn commit(&self, transcript: &mut Transcript) {
        transcript.commit_pedersen(b"com", self.com);
        transcript.commit_point(b"c", self.c);
        transcript.commit_scalars(b"m", self.m);
    }
}

/// The private witness: the permutation and the commitment's blinding.
#[derive(Clone, Copy)]
pub struct Witness<'a> {
    pub pi: &'a Permutation,
    pub r: &'a Scalar,
}

/// A proof of the statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    cd: ProjectivePoint,
    cdd: ProjectivePoint,
    cda: ProjectivePoint,
    f: Vec<Scalar>,
    z: Scalar,
    fd: Vec<Scalar>,
    zd: Scalar,
}

/// Prove that a witness satisfies a given statement.
///
/// The domain must have at least two entries.
pub fn prove(
    rng: &mut impl CryptoRngCore,
    transcript: &mut Transcript,
    statement: Statement<'_>,
    witness: Witness<'_>,
) -> Proof {
    let n = statement.m.len();
    assert!(n >= 2);

    transcript.message(b"$domain", b"known-shuffle");
    statement.commit(transcript);

    let d: Vec<_> = (0..n).map(|_| Scalar::generate_biased(&mut *rng)).collect();

    let mut delta = Vec::with_capacity(n);
    delta.push(d[0]);
    delta.extend((0..n - 2).map(|_| Scalar::generate_biased(&mut *rng)));
    delta.push(Scalar::ZERO);

    let x = transcript.challenge_scalar(b"x");
    let a: Vec<_> = (1..=n)
        .map(|i| {
            witness
                .pi
                .iter()
                .take(i)
                .map(|&p| statement.m[p] - x)
                .product::<Scalar>()
        })
        .collect();

    let (cd, rd) = statement.com.commit_to(&d, rng);
    transcript.commit_point(b"cd", &cd);

    let mut dd: Vec<_> = (1..n).map(|i| -delta[i - 1] * d[i]).collect();
    dd.push(Scalar::ZERO);
    let (cdd, rdd) = statement.com.commit_to(&dd, rng);
    transcript.commit_point(b"cdd", &cdd);

    let mut da: Vec<_> = (1..n)
        .map(|i| delta[i] - (statement.m[witness.pi[i]] - x) * delta[i - 1] - a[i - 1] * d[i])
        .collect();
    da.push(Scalar::ZERO);
    let (cda, rda) = statement.com.commit_to(&da, rng);
    transcript.commit_point(b"cda", &cda);

    let e = transcript.challenge_scalar(b"e");
    let f: Vec<_> = witness
        .pi
        .iter()
        .zip(d.iter())
        .map(|(&p, d)| e * statement.m[p] + d)
        .collect();
    let z = e * *witness.r + rd;

    let mut fd: Vec<_> = (1..n)
        .map(|i| {
            e * (delta[i] - (statement.m[witness.pi[i]] - x) * delta[i - 1] - a[i - 1] * d[i])
                - delta[i - 1] * d[i]
        })
        .collect();
    fd.push(Scalar::ZERO);
    let zd = e * rda + rdd;

    Proof {
        cd,
        cdd,
        cda,
        f,
        z,
        fd,
        zd,
    }
}

/// Verify a proof against a statement.
#[must_use]
pub fn verify(transcript: &mut Transcript, statement: Statement<'_>, proof: &Proof) -> bool {
    let n = statement.m.len();
    if n < 2 || proof.f.len() != n || proof.fd.len() != n {
        return false;
    }

    transcript.message(b"$domain", b"known-shuffle");
    statement.commit(transcript);

    let x = transcript.challenge_scalar(b"x");

    transcript.commit_point(b"cd", &proof.cd);
    transcript.commit_point(b"cdd", &proof.cdd);
    transcript.commit_point(b"cda", &proof.cda);

    let e = transcript.challenge_scalar(b"e");
    let e_inv: Scalar = match Option::from(e.invert()) {
        Some(inv) => inv,
        None => return false,
    };

    let cecd = *statement.c * e + proof.cd;
    if statement.com.open(&cecd, &proof.f, &proof.z).is_err() {
        return false;
    }
    let ceca = proof.cda * e + proof.cdd;
    if statement.com.open(&ceca, &proof.fd, &proof.zd).is_err() {
        return false;
    }

    let ex = e * x;
    let mut ff = proof.f[0] - ex;
    for i in 1..n {
        ff = (ff * (proof.f[i] - ex) + proof.fd[i - 1]) * e_inv;
    }
    let prod = statement.m.iter().map(|m| *m - x).product::<Scalar>();

    ff == e * prod
}

impl Proto for Proof {
    type Message = proto::KnownShuffleProof;

    fn to_proto(&self) -> proto::KnownShuffleProof {
        proto::KnownShuffleProof {
            cd: point_to_bytes(&self.cd),
            cdd: point_to_bytes(&self.cdd),
            cda: point_to_bytes(&self.cda),
            f: scalars_to_bytes(&self.f),
            z: scalar_to_bytes(&self.z),
            fd: scalars_to_bytes(&self.fd),
            zd: scalar_to_bytes(&self.zd),
        }
    }

    fn from_proto(m: &proto::KnownShuffleProof) -> Result<Self> {
        Ok(Self {
            cd: point_from_bytes(&m.cd)?,
            cdd: point_from_bytes(&m.cdd)?,
            cda: point_from_bytes(&m.cda)?,
            f: scalars_from_bytes(&m.f)?,
            z: scalar_from_bytes(&m.z)?,
            fd: scalars_from_bytes(&m.fd)?,
            zd: scalar_from_bytes(&m.zd)?,
        })
    }
}

#[cfg(test)]
mod test {
    use rand::Rng;
    use rand_core::OsRng;

    use super::super::random_scalars;
    use super::*;
    use crate::perm::Shuffles;

    #[test]
    fn test_valid_proof_verifies() {
        let m = random_scalars(8, &mut OsRng);
        let mut mp = m.clone();
        let pi = OsRng.sample(&Shuffles(8));
        pi.apply_to(&mut mp);

        let com = Pedersen::random(8, &mut OsRng);
        let (c, r) = com.commit_to(&mp, &mut OsRng);
        let statement = Statement {
            com: &com,
            c: &c,
            m: &m,
        };
        let witness = Witness { pi: &pi, r: &r };

        let mut proof = prove(&mut OsRng, &mut Transcript::new(b"test"), statement, witness);
        assert!(verify(&mut Transcript::new(b"test"), statement, &proof));

        proof.z += Scalar::ONE;
        assert!(!verify(&mut Transcript::new(b"test"), statement, &proof));
    }

    #[test]
    fn test_non_permutation_fails() {
        let m = random_scalars(4, &mut OsRng);
        // commit to the domain with one entry replaced
        let mut mp = m.clone();
        mp[2] = Scalar::generate_biased(&mut OsRng);

        let com = Pedersen::random(4, &mut OsRng);
        let (c, r) = com.commit_to(&mp, &mut OsRng);
        let statement = Statement {
            com: &com,
            c: &c,
            m: &m,
        };
        let pi = Permutation::identity(4);
        let witness = Witness { pi: &pi, r: &r };

        let proof = prove(&mut OsRng, &mut Transcript::new(b"test"), statement, witness);
        assert!(!verify(&mut Transcript::new(b"test"), statement, &proof));
    }
}
