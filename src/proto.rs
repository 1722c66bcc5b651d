//! Wire messages.
//!
//! Every public datum has exactly one canonical encoding: the
//! length-delimited tagged form of the messages below. The same bytes are
//! used on the wire and as input to fingerprints and Fiat-Shamir
//! transcripts, so the field tags here are part of the protocol and must
//! never be renumbered.
//!
//! Points are 33-byte compressed SEC1 encodings; scalars are 32-byte
//! big-endian canonical reductions.

/// An ElGamal pair.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Mask {
    #[prost(bytes = "vec", tag = "1")]
    pub c1: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub c2: Vec<u8>,
}

/// An ordered sequence of masks.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Stack {
    #[prost(message, repeated, tag = "1")]
    pub masks: Vec<Mask>,
}

/// A published party key.
#[derive(Clone, PartialEq, prost::Message)]
pub struct PublicKey {
    #[prost(bytes = "vec", tag = "1")]
    pub point: Vec<u8>,
}

/// A locally persisted private key.
#[derive(Clone, PartialEq, prost::Message)]
pub struct PrivateKey {
    #[prost(bytes = "vec", tag = "1")]
    pub exponent: Vec<u8>,
}

/// Chaum-Pedersen discrete-log-equality proof.
#[derive(Clone, PartialEq, prost::Message)]
pub struct DlogEqProof {
    #[prost(bytes = "vec", tag = "1")]
    pub e: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub s: Vec<u8>,
}

/// 1-of-2 discrete-log-equality proof.
#[derive(Clone, PartialEq, prost::Message)]
pub struct DlogEq1of2Proof {
    #[prost(bytes = "vec", tag = "1")]
    pub c1: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub r1: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub c2: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub r2: Vec<u8>,
}

/// Shuffle-of-known-content argument.
#[derive(Clone, PartialEq, prost::Message)]
pub struct KnownShuffleProof {
    #[prost(bytes = "vec", tag = "1")]
    pub cd: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub cdd: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub cda: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "4")]
    pub f: Vec<Vec<u8>>,
    #[prost(bytes = "vec", tag = "5")]
    pub z: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "6")]
    pub fd: Vec<Vec<u8>>,
    #[prost(bytes = "vec", tag = "7")]
    pub zd: Vec<u8>,
}

/// Verifiable secret shuffle.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ShuffleProof {
    #[prost(message, optional, tag = "1")]
    pub skc: Option<KnownShuffleProof>,
    #[prost(bytes = "vec", tag = "2")]
    pub c: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub cd: Vec<u8>,
    #[prost(message, optional, tag = "4")]
    pub ed: Option<Mask>,
    #[prost(bytes = "vec", repeated, tag = "5")]
    pub f: Vec<Vec<u8>>,
    #[prost(bytes = "vec", tag = "6")]
    pub z: Vec<u8>,
}

/// Rotation-of-known-content argument.
#[derive(Clone, PartialEq, prost::Message)]
pub struct KnownRotationProof {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub f: Vec<Vec<u8>>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub l: Vec<Vec<u8>>,
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub t: Vec<Vec<u8>>,
}

/// Verifiable secret rotation.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RotationProof {
    #[prost(message, optional, tag = "1")]
    pub rkc: Option<KnownRotationProof>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub h: Vec<Vec<u8>>,
    #[prost(message, repeated, tag = "3")]
    pub z: Vec<Mask>,
    #[prost(bytes = "vec", tag = "4")]
    pub v: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "5")]
    pub f: Vec<Vec<u8>>,
    #[prost(message, repeated, tag = "6")]
    pub ff: Vec<Mask>,
    #[prost(bytes = "vec", repeated, tag = "7")]
    pub tau: Vec<Vec<u8>>,
    #[prost(bytes = "vec", repeated, tag = "8")]
    pub rho: Vec<Vec<u8>>,
    #[prost(bytes = "vec", repeated, tag = "9")]
    pub mu: Vec<Vec<u8>>,
}

/// Verifiable secret insertion.
#[derive(Clone, PartialEq, prost::Message)]
pub struct InsertProof {
    #[prost(message, optional, tag = "1")]
    pub rot1: Option<RotationProof>,
    #[prost(message, repeated, tag = "2")]
    pub s1: Vec<Mask>,
    #[prost(message, optional, tag = "3")]
    pub rot2: Option<RotationProof>,
    #[prost(message, optional, tag = "4")]
    pub boundary: Option<DlogEq1of2Proof>,
}

/// Shared-permutation attestation across parallel shuffles.
#[derive(Clone, PartialEq, prost::Message)]
pub struct EntanglementProof {
    #[prost(message, repeated, tag = "1")]
    pub tangles: Vec<ShuffleProof>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PublishKey {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    pub key: Option<PublicKey>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct MaskStack {
    #[prost(bytes = "vec", tag = "1")]
    pub source: Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub stack: Option<Stack>,
    #[prost(message, repeated, tag = "3")]
    pub proofs: Vec<DlogEqProof>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ShuffleStack {
    #[prost(bytes = "vec", tag = "1")]
    pub source: Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub stack: Option<Stack>,
    #[prost(message, optional, tag = "3")]
    pub proof: Option<ShuffleProof>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ShiftStack {
    #[prost(bytes = "vec", tag = "1")]
    pub source: Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub stack: Option<Stack>,
    #[prost(message, optional, tag = "3")]
    pub proof: Option<RotationProof>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct NameStack {
    #[prost(bytes = "vec", tag = "1")]
    pub id: Vec<u8>,
    #[prost(string, tag = "2")]
    pub name: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TakeStack {
    #[prost(bytes = "vec", tag = "1")]
    pub source: Vec<u8>,
    #[prost(uint64, repeated, tag = "2")]
    pub indices: Vec<u64>,
    #[prost(bytes = "vec", tag = "3")]
    pub result: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PileStacks {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub sources: Vec<Vec<u8>>,
    #[prost(bytes = "vec", tag = "2")]
    pub result: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PublishShares {
    #[prost(bytes = "vec", tag = "1")]
    pub target: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub shares: Vec<Vec<u8>>,
    #[prost(message, repeated, tag = "3")]
    pub proofs: Vec<DlogEqProof>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RandomSpec {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub spec: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RandomEntropy {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    pub entropy: Option<Mask>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RandomReveal {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(bytes = "vec", tag = "2")]
    pub share: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub proof: Option<DlogEqProof>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ProveEntanglement {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub sources: Vec<Vec<u8>>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub shuffles: Vec<Vec<u8>>,
    #[prost(message, optional, tag = "3")]
    pub proof: Option<EntanglementProof>,
}

/// A single move recorded in a block.
///
/// Tag 10 is reserved.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Payload {
    #[prost(
        oneof = "payload::Kind",
        tags = "1, 2, 3, 4, 5, 6, 7, 8, 9, 11, 12, 13, 14, 15, 16"
    )]
    pub kind: Option<payload::Kind>,
}

pub mod payload {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Kind {
        #[prost(bytes, tag = "1")]
        Bytes(Vec<u8>),
        #[prost(message, tag = "2")]
        PublishKey(super::PublishKey),
        #[prost(message, tag = "3")]
        OpenStack(super::Stack),
        #[prost(message, tag = "4")]
        MaskStack(super::MaskStack),
        #[prost(message, tag = "5")]
        ShuffleStack(super::ShuffleStack),
        #[prost(message, tag = "6")]
        ShiftStack(super::ShiftStack),
        #[prost(message, tag = "7")]
        NameStack(super::NameStack),
        #[prost(message, tag = "8")]
        TakeStack(super::TakeStack),
        #[prost(message, tag = "9")]
        PileStacks(super::PileStacks),
        #[prost(message, tag = "11")]
        PublishShares(super::PublishShares),
        #[prost(message, tag = "12")]
        RandomSpec(super::RandomSpec),
        #[prost(message, tag = "13")]
        RandomEntropy(super::RandomEntropy),
        #[prost(message, tag = "14")]
        RandomReveal(super::RandomReveal),
        #[prost(string, tag = "15")]
        Text(String),
        #[prost(message, tag = "16")]
        ProveEntanglement(super::ProveEntanglement),
    }
}

/// A signed, ack-linked record of payloads.
///
/// The block id is the fingerprint of this message encoded with an empty
/// `signature` field; the signature then signs that id.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Block {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub acks: Vec<Vec<u8>>,
    #[prost(message, repeated, tag = "2")]
    pub payloads: Vec<Payload>,
    #[prost(bytes = "vec", tag = "3")]
    pub signer: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub signature: Vec<u8>,
}
