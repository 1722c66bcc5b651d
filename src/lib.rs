//! A cryptographic toolkit for verifiable play-by-mail games.
//!
//! Players broadcast signed blocks over any public channel; the toolkit
//! guarantees that every move was honest without a trusted third party.
//! Secrets stay secret: a shuffled deck's order, a hidden hand, a die roll
//! nobody has revealed yet.
//!
//! The pieces, bottom up:
//!
//! - a threshold ElGamal layer over secp256k1 ([`Vtmf`]): tokens are
//!   masked under the sum of every player's key, and unmasking takes a
//!   share from each of them;
//! - zero-knowledge arguments ([`proofs`]) that masking, shuffling,
//!   cutting and inserting were performed as claimed;
//! - an append-only DAG of signed blocks ([`chain`]) that records every
//!   transition;
//! - a [`Session`] that replays a chain into derived state — parties,
//!   stacks, shared randomness — identically for every player.

mod commit;
pub mod curve;
mod error;
mod hash;
mod keys;
mod mask;
mod perm;
pub mod proofs;
pub mod proto;
mod rng;
mod serde;
mod stack;
mod vtmf;

pub mod chain;
mod session;

pub use commit::Pedersen;
pub use error::{Error, Result};
pub use hash::{Fingerprint, Id, Xof};
pub use keys::{PrivateKey, PublicKey};
pub use mask::Mask;
pub use perm::{Permutation, Shifts, Shuffles};
pub use rng::Rng;
pub use serde::Proto;
pub use session::{Session, StackMap};
pub use stack::Stack;
pub use vtmf::{
    EntanglementProof, InsertProof, MaskProof, Share, ShareProof, ShiftProof, ShuffleProof, Vtmf,
};
