//! Zero-knowledge arguments for stack operations.
//!
//! Every proof is made non-interactive with a Fiat-Shamir transcript. The
//! helpers here fix, bit for bit, how public inputs enter the transcript:
//! each value goes in under a label, vectors are preceded by their length,
//! and challenges are drawn from the transcript's PRF. Prover and verifier
//! must feed the transcript identically or verification fails.

pub mod dlog_eq;
pub mod dlog_eq_1of2;
pub mod entanglement;
pub mod known_rotation;
pub mod known_shuffle;
pub mod secret_insertion;
pub mod secret_rotation;
pub mod secret_shuffle;

use elliptic_curve::group::GroupEncoding;
use elliptic_curve::Group;
use k256::{ProjectivePoint, Scalar};
use magikitten::Transcript;

use crate::commit::Pedersen;
use crate::mask::Mask;

pub(crate) trait TranscriptExt {
    fn commit_point(&mut self, label: &'static [u8], point: &ProjectivePoint);
    fn commit_points(&mut self, label: &'static [u8], points: &[ProjectivePoint]);
    fn commit_scalar(&mut self, label: &'static [u8], scalar: &Scalar);
    fn commit_scalars(&mut self, label: &'static [u8], scalars: &[Scalar]);
    fn commit_mask(&mut self, label: &'static [u8], mask: &Mask);
    fn commit_masks(&mut self, label: &'static [u8], masks: &[Mask]);
    fn commit_pedersen(&mut self, label: &'static [u8], com: &Pedersen);
    fn challenge_scalar(&mut self, label: &'static [u8]) -> Scalar;
    fn challenge_scalars(&mut self, label: &'static [u8], n: usize) -> Vec<Scalar>;
    fn challenge_pedersen(&mut self, label: &'static [u8], n: usize) -> Pedersen;
}

impl TranscriptExt for Transcript {
    fn commit_point(&mut self, label: &'static [u8], point: &ProjectivePoint) {
        self.message(label, &point.to_bytes());
    }

    fn commit_points(&mut self, label: &'static [u8], points: &[ProjectivePoint]) {
        self.message(b"$len", &(points.len() as u64).to_le_bytes());
        for p in points {
            self.commit_point(label, p);
        }
    }

    fn commit_scalar(&mut self, label: &'static [u8], scalar: &Scalar) {
        self.message(label, &scalar.to_bytes());
    }

    fn commit_scalars(&mut self, label: &'static [u8], scalars: &[Scalar]) {
        self.message(b"$len", &(scalars.len() as u64).to_le_bytes());
        for s in scalars {
            self.commit_scalar(label, s);
        }
    }

    fn commit_mask(&mut self, label: &'static [u8], mask: &Mask) {
        self.message(label, &mask.0.to_bytes());
        self.message(label, &mask.1.to_bytes());
    }

    fn commit_masks(&mut self, label: &'static [u8], masks: &[Mask]) {
        self.message(b"$len", &(masks.len() as u64).to_le_bytes());
        for m in masks {
            self.commit_mask(label, m);
        }
    }

    fn commit_pedersen(&mut self, label: &'static [u8], com: &Pedersen) {
        self.commit_point(label, com.shared_point());
        self.commit_points(label, com.points());
    }

    fn challenge_scalar(&mut self, label: &'static [u8]) -> Scalar {
        Scalar::generate_biased(&mut self.challenge(label))
    }

    fn challenge_scalars(&mut self, label: &'static [u8], n: usize) -> Vec<Scalar> {
        let mut rng = self.challenge(label);
        (0..n).map(|_| Scalar::generate_biased(&mut rng)).collect()
    }

    fn challenge_pedersen(&mut self, label: &'static [u8], n: usize) -> Pedersen {
        let mut rng = self.challenge(label);
        loop {
            let h = ProjectivePoint::random(&mut rng);
            let g = (0..n).map(|_| ProjectivePoint::random(&mut rng)).collect();
            if let Some(com) = Pedersen::new(h, g) {
                return com;
            }
        }
    }
}

pub(crate) fn random_scalars(n: usize, rng: &mut impl rand_core::CryptoRngCore) -> Vec<Scalar> {
    (0..n).map(|_| Scalar::generate_biased(&mut *rng)).collect()
}
