//! The verifiable threshold masking function.
//!
//! Barnett and Smart's k-out-of-k threshold ElGamal over the shared key
//! `H = Σ xᵢ·G`: any party can mask a token, nobody can unmask one without
//! every party's share, and every operation ships a proof that it was
//! performed honestly.

use k256::{ProjectivePoint, Scalar};
use magikitten::Transcript;
use rand_core::CryptoRngCore;
use std::collections::BTreeMap;

use crate::curve;
use crate::error::{Error, Result};
use crate::hash::{Fingerprint, Xof};
use crate::keys::{PrivateKey, PublicKey};
use crate::mask::Mask;
use crate::perm::Permutation;
use crate::proofs::{
    dlog_eq, entanglement, secret_insertion, secret_rotation, secret_shuffle,
};
use crate::serde::point_to_bytes;
use crate::stack::Stack;

/// Proof that a mask or re-mask is well formed.
pub type MaskProof = dlog_eq::Proof;
/// One party's decryption contribution for a single mask.
pub type Share = ProjectivePoint;
/// Proof that a share is correct.
pub type ShareProof = dlog_eq::Proof;
/// Proof of a verifiable shuffle.
pub type ShuffleProof = secret_shuffle::Proof;
/// Proof of a verifiable shift.
pub type ShiftProof = secret_rotation::Proof;
/// Proof of a verifiable insertion.
pub type InsertProof = secret_insertion::Proof;
/// Proof that parallel shuffles share a permutation.
pub type EntanglementProof = entanglement::Proof;

const MASK_CONTEXT: &[u8] = b"pbmx mask";
const REMASK_CONTEXT: &[u8] = b"pbmx remask";
const SHARE_CONTEXT: &[u8] = b"pbmx share";
const SHUFFLE_CONTEXT: &[u8] = b"pbmx shuffle";
const SHIFT_CONTEXT: &[u8] = b"pbmx shift";
const INSERT_CONTEXT: &[u8] = b"pbmx insert";
const ENTANGLE_CONTEXT: &[u8] = b"pbmx entanglement";
const UNMASK_XOF_DOMAIN: &[u8] = b"pbmx unmask xof";

/// The threshold masking engine for one party.
///
/// Holds this party's private key and every published public key; the
/// shared key is their sum and grows monotonically as keys are added.
#[derive(Clone)]
pub struct Vtmf {
    sk: PrivateKey,
    pk: PublicKey,
    keys: BTreeMap<Fingerprint, PublicKey>,
}

impl Vtmf {
    /// Creates an engine knowing only its own key pair.
    pub fn new(sk: PrivateKey) -> Self {
        let pk = sk.public_key();
        let mut keys = BTreeMap::new();
        keys.insert(pk.fingerprint(), pk.clone());
        Self { sk, pk, keys }
    }

    /// Adds another party's public key, extending the shared key.
    pub fn add_key(&mut self, pk: PublicKey) {
        let fp = pk.fingerprint();
        if self.keys.contains_key(&fp) {
            return;
        }
        self.pk.combine(&pk);
        self.keys.insert(fp, pk);
    }

    /// This party's private key.
    pub fn private_key(&self) -> &PrivateKey {
        &self.sk
    }

    /// This party's public key.
    pub fn public_key(&self) -> PublicKey {
        self.sk.public_key()
    }

    /// The shared public key.
    pub fn shared_key(&self) -> PublicKey {
        self.pk.clone()
    }

    /// The number of parties whose keys are known.
    pub fn parties(&self) -> usize {
        self.keys.len()
    }

    /// The public key published by a given party, if known.
    pub fn key_of(&self, fp: &Fingerprint) -> Option<&PublicKey> {
        self.keys.get(fp)
    }

    fn h(&self) -> ProjectivePoint {
        self.pk.point()
    }
}

impl Vtmf {
    /// Masks a token.
    ///
    /// Returns the mask, the encryption factor (needed as a witness by
    /// later shuffle proofs), and a proof of correct masking.
    pub fn mask(&self, token: u64, rng: &mut impl CryptoRngCore) -> (Mask, Scalar, MaskProof) {
        self.mask_point(&curve::to_curve(token), rng)
    }

    /// Masks an arbitrary group element.
    pub fn mask_point(
        &self,
        p: &ProjectivePoint,
        rng: &mut impl CryptoRngCore,
    ) -> (Mask, Scalar, MaskProof) {
        let h = self.h();
        let r = Scalar::generate_biased(&mut *rng);
        let c1 = ProjectivePoint::GENERATOR * r;
        let hr = h * r;
        let proof = dlog_eq::prove(
            rng,
            &mut Transcript::new(MASK_CONTEXT),
            dlog_eq::Statement {
                public0: &c1,
                generator1: &h,
                public1: &hr,
            },
            dlog_eq::Witness { x: &r },
        );
        (Mask(c1, hr + p), r, proof)
    }

    /// Verifies that a mask hides the given token.
    pub fn verify_mask(&self, token: u64, mask: &Mask, proof: &MaskProof) -> Result<()> {
        self.verify_mask_point(&curve::to_curve(token), mask, proof)
    }

    /// Verifies that a mask hides the given group element.
    pub fn verify_mask_point(
        &self,
        p: &ProjectivePoint,
        mask: &Mask,
        proof: &MaskProof,
    ) -> Result<()> {
        let h = self.h();
        let ok = dlog_eq::verify(
            &mut Transcript::new(MASK_CONTEXT),
            dlog_eq::Statement {
                public0: &mask.0,
                generator1: &h,
                public1: &(mask.1 - p),
            },
            proof,
        );
        if ok {
            Ok(())
        } else {
            Err(Error::BadProof)
        }
    }

    /// Adds a fresh encryption layer of zero to a mask.
    pub fn remask(&self, mask: &Mask, rng: &mut impl CryptoRngCore) -> (Mask, Scalar, MaskProof) {
        let h = self.h();
        let r = Scalar::generate_biased(&mut *rng);
        let gr = ProjectivePoint::GENERATOR * r;
        let hr = h * r;
        let proof = dlog_eq::prove(
            rng,
            &mut Transcript::new(REMASK_CONTEXT),
            dlog_eq::Statement {
                public0: &gr,
                generator1: &h,
                public1: &hr,
            },
            dlog_eq::Witness { x: &r },
        );
        (Mask(gr + mask.0, hr + mask.1), r, proof)
    }

    /// Verifies that `remasked` is `mask` with one more layer of zero.
    pub fn verify_remask(&self, mask: &Mask, remasked: &Mask, proof: &MaskProof) -> Result<()> {
        let h = self.h();
        let ok = dlog_eq::verify(
            &mut Transcript::new(REMASK_CONTEXT),
            dlog_eq::Statement {
                public0: &(remasked.0 - mask.0),
                generator1: &h,
                public1: &(remasked.1 - mask.1),
            },
            proof,
        );
        if ok {
            Ok(())
        } else {
            Err(Error::BadProof)
        }
    }
}

impl Vtmf {
    /// Produces this party's decryption share for a mask.
    pub fn share(&self, mask: &Mask, rng: &mut impl CryptoRngCore) -> (Share, ShareProof) {
        let x = self.sk.exponent();
        let d = mask.0 * x;
        let proof = dlog_eq::prove(
            rng,
            &mut Transcript::new(SHARE_CONTEXT),
            dlog_eq::Statement {
                public0: &(ProjectivePoint::GENERATOR * x),
                generator1: &mask.0,
                public1: &d,
            },
            dlog_eq::Witness { x },
        );
        (d, proof)
    }

    /// Verifies another party's decryption share for a mask.
    pub fn verify_share(
        &self,
        mask: &Mask,
        party: &Fingerprint,
        share: &Share,
        proof: &ShareProof,
    ) -> Result<()> {
        let pk = self.keys.get(party).ok_or(Error::BadProof)?;
        let ok = dlog_eq::verify(
            &mut Transcript::new(SHARE_CONTEXT),
            dlog_eq::Statement {
                public0: &pk.point(),
                generator1: &mask.0,
                public1: share,
            },
            proof,
        );
        if ok {
            Ok(())
        } else {
            Err(Error::BadProof)
        }
    }

    /// Removes one decryption share from a mask.
    pub fn unmask_share(&self, mask: &Mask, share: &Share) -> Mask {
        Mask(mask.0, mask.1 - share)
    }

    /// Removes this party's own layer from a mask.
    pub fn unmask_private(&self, mask: &Mask) -> Mask {
        let d = mask.0 * self.sk.exponent();
        self.unmask_share(mask, &d)
    }

    /// Recovers the token from a fully unmasked mask.
    ///
    /// Fails with [`Error::ExhaustedRecovery`] when shares are still
    /// missing or the token exceeds the default recovery bound.
    pub fn unmask_open(&self, mask: &Mask) -> Result<u64> {
        curve::from_curve(&mask.1).ok_or(Error::ExhaustedRecovery)
    }

    /// Like [`Vtmf::unmask_open`], searching tokens up to `bound`.
    pub fn unmask_open_bounded(&self, mask: &Mask, bound: u64) -> Result<u64> {
        curve::from_curve_bounded(&mask.1, bound).ok_or(Error::ExhaustedRecovery)
    }
}

impl Vtmf {
    fn remask_stack(
        &self,
        stack: &Stack,
        rng: &mut impl CryptoRngCore,
    ) -> (Vec<Mask>, Vec<Scalar>) {
        let h = self.h();
        stack
            .iter()
            .map(|m| {
                let r = Scalar::generate_biased(&mut *rng);
                let c1 = ProjectivePoint::GENERATOR * r + m.0;
                let c2 = h * r + m.1;
                (Mask(c1, c2), r)
            })
            .unzip()
    }

    /// Shuffles and re-randomizes a stack under a given permutation.
    ///
    /// The stack needs at least two masks; the proof hides both the
    /// permutation and the re-randomization factors.
    pub fn mask_shuffle(
        &self,
        stack: &Stack,
        pi: &Permutation,
        rng: &mut impl CryptoRngCore,
    ) -> Result<(Stack, Vec<Scalar>, ShuffleProof)> {
        if stack.len() < 2 || pi.len() != stack.len() {
            return Err(Error::ShapeMismatch);
        }

        let (mut masks, mut r) = self.remask_stack(stack, rng);
        pi.apply_to(&mut masks);
        pi.apply_to(&mut r);
        let shuffled = Stack::from(masks);

        let proof = secret_shuffle::prove(
            rng,
            &mut Transcript::new(SHUFFLE_CONTEXT),
            secret_shuffle::Statement {
                h: &self.h(),
                e0: stack,
                e1: &shuffled,
            },
            secret_shuffle::Witness { pi, r: &r },
        );
        Ok((shuffled, r, proof))
    }

    /// Verifies a shuffle of `source` into `shuffled`.
    pub fn verify_mask_shuffle(
        &self,
        source: &Stack,
        shuffled: &Stack,
        proof: &ShuffleProof,
    ) -> Result<()> {
        let ok = secret_shuffle::verify(
            &mut Transcript::new(SHUFFLE_CONTEXT),
            secret_shuffle::Statement {
                h: &self.h(),
                e0: source,
                e1: shuffled,
            },
            proof,
        );
        if ok {
            Ok(())
        } else {
            Err(Error::BadProof)
        }
    }

    fn do_shift(
        &self,
        stack: &Stack,
        offset: usize,
        rng: &mut impl CryptoRngCore,
    ) -> (Vec<Mask>, Vec<Scalar>) {
        let (mut masks, mut r) = self.remask_stack(stack, rng);
        let pi = Permutation::shift(stack.len(), offset);
        pi.apply_to(&mut masks);
        pi.apply_to(&mut r);
        (masks, r)
    }

    /// Cuts a stack: the mask at position `k` becomes the top.
    ///
    /// `k = 0` is a valid cut and still produces a verifiable proof.
    pub fn mask_shift(
        &self,
        stack: &Stack,
        k: usize,
        rng: &mut impl CryptoRngCore,
    ) -> Result<(Stack, Vec<Scalar>, ShiftProof)> {
        let n = stack.len();
        if n == 0 {
            return Err(Error::ShapeMismatch);
        }

        let offset = (n - k % n) % n;
        let (masks, r) = self.do_shift(stack, offset, rng);
        let shifted = Stack::from(masks);

        let proof = secret_rotation::prove(
            rng,
            &mut Transcript::new(SHIFT_CONTEXT),
            secret_rotation::Statement {
                h: &self.h(),
                e0: stack,
                e1: &shifted,
            },
            secret_rotation::Witness { k: offset, r: &r },
        );
        Ok((shifted, r, proof))
    }

    /// Verifies a shift of `source` into `shifted`.
    pub fn verify_mask_shift(
        &self,
        source: &Stack,
        shifted: &Stack,
        proof: &ShiftProof,
    ) -> Result<()> {
        let ok = secret_rotation::verify(
            &mut Transcript::new(SHIFT_CONTEXT),
            secret_rotation::Statement {
                h: &self.h(),
                e0: source,
                e1: shifted,
            },
            proof,
        );
        if ok {
            Ok(())
        } else {
            Err(Error::BadProof)
        }
    }

    /// Inserts a needle into a stack at position `k`, hidden by the proof.
    pub fn mask_insert(
        &self,
        needle: &Stack,
        stack: &Stack,
        k: usize,
        rng: &mut impl CryptoRngCore,
    ) -> Result<(Stack, Vec<Scalar>, InsertProof)> {
        let n = stack.len();
        if n == 0 || needle.is_empty() || k > n {
            return Err(Error::ShapeMismatch);
        }

        let k = n - k;
        let (s1, r1) = self.do_shift(stack, k % n, rng);
        let mut s1c = s1.clone();
        s1c.extend_from_slice(needle);
        let n2 = s1c.len();
        let (s2, r2) = self.do_shift(&Stack::from(s1c), (n2 - k) % n2, rng);
        let inserted = Stack::from(s2);

        let proof = secret_insertion::prove(
            rng,
            &mut Transcript::new(INSERT_CONTEXT),
            secret_insertion::Statement {
                h: &self.h(),
                needle,
                s0: stack,
                s2: &inserted,
            },
            secret_insertion::Witness {
                k,
                r1: &r1,
                r2: &r2,
            },
        );

        // combine both layers of blindings into per-mask witnesses
        let mut rx = r1;
        rx.resize(r2.len(), Scalar::ZERO);
        Permutation::shift(rx.len(), (n2 - k) % n2).apply_to(&mut rx);
        for (rx, r2) in rx.iter_mut().zip(r2.iter()) {
            *rx += r2;
        }

        Ok((inserted, rx, proof))
    }

    /// Verifies an insertion of `needle` into `source` yielding `inserted`.
    pub fn verify_mask_insert(
        &self,
        needle: &Stack,
        source: &Stack,
        inserted: &Stack,
        proof: &InsertProof,
    ) -> Result<()> {
        let ok = secret_insertion::verify(
            &mut Transcript::new(INSERT_CONTEXT),
            secret_insertion::Statement {
                h: &self.h(),
                needle,
                s0: source,
                s2: inserted,
            },
            proof,
        );
        if ok {
            Ok(())
        } else {
            Err(Error::BadProof)
        }
    }
}

impl Vtmf {
    /// Masks a random group element; the result is this party's entropy
    /// contribution to shared randomness.
    pub fn mask_random(&self, rng: &mut impl CryptoRngCore) -> Mask {
        use elliptic_curve::Group;
        self.mask_point(&ProjectivePoint::random(&mut *rng), rng).0
    }

    /// Reads the random byte stream hidden in a fully unmasked random mask.
    pub fn unmask_random(&self, mask: &Mask) -> Xof {
        Xof::new(UNMASK_XOF_DOMAIN, &point_to_bytes(&mask.1))
    }
}

impl Vtmf {
    /// Proves that several stacks were shuffled by the same permutation.
    pub fn prove_entanglement<'a>(
        &self,
        sources: &[&'a Stack],
        shuffles: &[&'a Stack],
        pi: &Permutation,
        secrets: &[&'a [Scalar]],
        rng: &mut impl CryptoRngCore,
    ) -> Result<EntanglementProof> {
        if sources.len() != shuffles.len() || sources.len() != secrets.len() {
            return Err(Error::ShapeMismatch);
        }
        let e0: Vec<&[Mask]> = sources.iter().map(|s| &s[..]).collect();
        let e1: Vec<&[Mask]> = shuffles.iter().map(|s| &s[..]).collect();
        Ok(entanglement::prove(
            rng,
            &mut Transcript::new(ENTANGLE_CONTEXT),
            entanglement::Statement {
                h: &self.h(),
                e0: &e0,
                e1: &e1,
            },
            entanglement::Witness { pi, r: secrets },
        ))
    }

    /// Verifies an entanglement proof over the given stacks.
    pub fn verify_entanglement(
        &self,
        sources: &[&Stack],
        shuffles: &[&Stack],
        proof: &EntanglementProof,
    ) -> Result<()> {
        let e0: Vec<&[Mask]> = sources.iter().map(|s| &s[..]).collect();
        let e1: Vec<&[Mask]> = shuffles.iter().map(|s| &s[..]).collect();
        let ok = entanglement::verify(
            &mut Transcript::new(ENTANGLE_CONTEXT),
            entanglement::Statement {
                h: &self.h(),
                e0: &e0,
                e1: &e1,
            },
            proof,
        );
        if ok {
            Ok(())
        } else {
            Err(Error::BadProof)
        }
    }
}
