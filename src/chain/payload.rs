//! Block payloads.

use std::fmt::{self, Display, Formatter};

use crate::error::{Error, Result};
use crate::hash::{Fingerprint, Id};
use crate::keys::PublicKey;
use crate::mask::Mask;
use crate::proto;
use crate::serde::{point_from_bytes, point_to_bytes, Proto};
use crate::stack::Stack;
use crate::vtmf::{EntanglementProof, MaskProof, Share, ShareProof, ShiftProof, ShuffleProof};

const PAYLOAD_ID_DOMAIN: &[u8] = b"pbmx payload id v1";

/// A single game-state transition.
///
/// The set is closed: the validator dispatches on it exhaustively, and the
/// wire tags of the corresponding messages are fixed forever.
#[allow(clippy::large_enum_variant)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// Opaque application bytes.
    Bytes(Vec<u8>),
    /// A party announcing its name and public key.
    PublishKey(String, PublicKey),
    /// A stack of open masks.
    OpenStack(Stack),
    /// A stack re-masked element by element, with per-mask proofs.
    MaskStack(Id, Stack, Vec<MaskProof>),
    /// A stack shuffled under a hidden permutation.
    ShuffleStack(Id, Stack, ShuffleProof),
    /// A stack cut at a hidden offset.
    ShiftStack(Id, Stack, ShiftProof),
    /// A (re)binding of a name to a stack.
    NameStack(Id, String),
    /// A selection of positions out of a stack.
    TakeStack(Id, Vec<usize>, Id),
    /// A concatenation of stacks.
    PileStacks(Vec<Id>, Id),
    /// Decryption shares for every mask of a stack.
    PublishShares(Id, Vec<Share>, Vec<ShareProof>),
    /// A new shared random number with its dice spec.
    RandomSpec(String, String),
    /// One party's entropy for a shared random number.
    RandomEntropy(String, Mask),
    /// One party's reveal share for a shared random number.
    RandomReveal(String, Share, ShareProof),
    /// Human-readable chat.
    Text(String),
    /// Attestation that parallel shuffles used one permutation.
    ProveEntanglement(Vec<Id>, Vec<Id>, EntanglementProof),
}

impl Payload {
    /// The fingerprint of this payload's canonical encoding.
    pub fn id(&self) -> Id {
        Fingerprint::of_bytes(PAYLOAD_ID_DOMAIN, &self.to_bytes())
    }

    /// A one-line rendering for logs.
    pub fn display_short(&self) -> impl Display + '_ {
        DisplayShort(self)
    }
}

struct DisplayShort<'a>(&'a Payload);

impl<'a> Display for DisplayShort<'a> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        use Payload::*;
        match self.0 {
            Bytes(bytes) => write!(f, "bytes ({})", bytes.len()),
            PublishKey(name, pk) => write!(f, "publish key {} {}", name, pk.fingerprint()),
            OpenStack(stack) => write!(f, "open stack {}", stack.id()),
            MaskStack(id, stack, _) => write!(f, "mask {} > {}", id, stack.id()),
            ShuffleStack(id, stack, _) => write!(f, "shuffle {} > {}", id, stack.id()),
            ShiftStack(id, stack, _) => write!(f, "cut {} > {}", id, stack.id()),
            NameStack(id, name) => write!(f, "name {} {}", id, name),
            TakeStack(id, indices, result) => {
                write!(f, "take {} {:?} > {}", id, indices, result)
            }
            PileStacks(ids, result) => write!(f, "pile {:?} > {}", ids, result),
            PublishShares(id, ..) => write!(f, "reveal {}", id),
            RandomSpec(name, spec) => write!(f, "new rng {} ({})", name, spec),
            RandomEntropy(name, _) => write!(f, "rng entropy {}", name),
            RandomReveal(name, ..) => write!(f, "rng reveal {}", name),
            Text(text) => write!(f, "text {}", text),
            ProveEntanglement(sources, ..) => write!(f, "entangle {:?}", sources),
        }
    }
}

fn id_to_bytes(id: &Id) -> Vec<u8> {
    id.as_ref().to_vec()
}

fn id_from_bytes(bytes: &[u8]) -> Result<Id> {
    Id::try_from(bytes)
}

fn ids_from_bytes(bytes: &[Vec<u8>]) -> Result<Vec<Id>> {
    bytes.iter().map(|b| id_from_bytes(b)).collect()
}

fn shares_to_bytes(shares: &[Share]) -> Vec<Vec<u8>> {
    shares.iter().map(point_to_bytes).collect()
}

fn shares_from_bytes(bytes: &[Vec<u8>]) -> Result<Vec<Share>> {
    bytes.iter().map(|b| point_from_bytes(b)).collect()
}

impl Proto for Payload {
    type Message = proto::Payload;

    fn to_proto(&self) -> proto::Payload {
        use proto::payload::Kind;
        let kind = match self {
            Payload::Bytes(bytes) => Kind::Bytes(bytes.clone()),
            Payload::PublishKey(name, key) => Kind::PublishKey(proto::PublishKey {
                name: name.clone(),
                key: Some(key.to_proto()),
            }),
            Payload::OpenStack(stack) => Kind::OpenStack(stack.to_proto()),
            Payload::MaskStack(source, stack, proofs) => Kind::MaskStack(proto::MaskStack {
                source: id_to_bytes(source),
                stack: Some(stack.to_proto()),
                proofs: proofs.iter().map(|p| p.to_proto()).collect(),
            }),
            Payload::ShuffleStack(source, stack, proof) => {
                Kind::ShuffleStack(proto::ShuffleStack {
                    source: id_to_bytes(source),
                    stack: Some(stack.to_proto()),
                    proof: Some(proof.to_proto()),
                })
            }
            Payload::ShiftStack(source, stack, proof) => Kind::ShiftStack(proto::ShiftStack {
                source: id_to_bytes(source),
                stack: Some(stack.to_proto()),
                proof: Some(proof.to_proto()),
            }),
            Payload::NameStack(id, name) => Kind::NameStack(proto::NameStack {
                id: id_to_bytes(id),
                name: name.clone(),
            }),
            Payload::TakeStack(source, indices, result) => Kind::TakeStack(proto::TakeStack {
                source: id_to_bytes(source),
                indices: indices.iter().map(|&i| i as u64).collect(),
                result: id_to_bytes(result),
            }),
            Payload::PileStacks(sources, result) => Kind::PileStacks(proto::PileStacks {
                sources: sources.iter().map(id_to_bytes).collect(),
                result: id_to_bytes(result),
            }),
            Payload::PublishShares(target, shares, proofs) => {
                Kind::PublishShares(proto::PublishShares {
                    target: id_to_bytes(target),
                    shares: shares_to_bytes(shares),
                    proofs: proofs.iter().map(|p| p.to_proto()).collect(),
                })
            }
            Payload::RandomSpec(name, spec) => Kind::RandomSpec(proto::RandomSpec {
                name: name.clone(),
                spec: spec.clone(),
            }),
            Payload::RandomEntropy(name, entropy) => Kind::RandomEntropy(proto::RandomEntropy {
                name: name.clone(),
                entropy: Some(entropy.to_proto()),
            }),
            Payload::RandomReveal(name, share, proof) => Kind::RandomReveal(proto::RandomReveal {
                name: name.clone(),
                share: point_to_bytes(share),
                proof: Some(proof.to_proto()),
            }),
            Payload::Text(text) => Kind::Text(text.clone()),
            Payload::ProveEntanglement(sources, shuffles, proof) => {
                Kind::ProveEntanglement(proto::ProveEntanglement {
                    sources: sources.iter().map(id_to_bytes).collect(),
                    shuffles: shuffles.iter().map(id_to_bytes).collect(),
                    proof: Some(proof.to_proto()),
                })
            }
        };
        proto::Payload { kind: Some(kind) }
    }

    fn from_proto(m: &proto::Payload) -> Result<Self> {
        use proto::payload::Kind;
        let kind = m.kind.as_ref().ok_or(Error::Decoding)?;
        Ok(match kind {
            Kind::Bytes(bytes) => Payload::Bytes(bytes.clone()),
            Kind::PublishKey(msg) => Payload::PublishKey(
                msg.name.clone(),
                PublicKey::from_proto(msg.key.as_ref().ok_or(Error::Decoding)?)?,
            ),
            Kind::OpenStack(msg) => Payload::OpenStack(Stack::from_proto(msg)?),
            Kind::MaskStack(msg) => Payload::MaskStack(
                id_from_bytes(&msg.source)?,
                Stack::from_proto(msg.stack.as_ref().ok_or(Error::Decoding)?)?,
                msg.proofs
                    .iter()
                    .map(MaskProof::from_proto)
                    .collect::<Result<_>>()?,
            ),
            Kind::ShuffleStack(msg) => Payload::ShuffleStack(
                id_from_bytes(&msg.source)?,
                Stack::from_proto(msg.stack.as_ref().ok_or(Error::Decoding)?)?,
                ShuffleProof::from_proto(msg.proof.as_ref().ok_or(Error::Decoding)?)?,
            ),
            Kind::ShiftStack(msg) => Payload::ShiftStack(
                id_from_bytes(&msg.source)?,
                Stack::from_proto(msg.stack.as_ref().ok_or(Error::Decoding)?)?,
                ShiftProof::from_proto(msg.proof.as_ref().ok_or(Error::Decoding)?)?,
            ),
            Kind::NameStack(msg) => {
                Payload::NameStack(id_from_bytes(&msg.id)?, msg.name.clone())
            }
            Kind::TakeStack(msg) => Payload::TakeStack(
                id_from_bytes(&msg.source)?,
                msg.indices.iter().map(|&i| i as usize).collect(),
                id_from_bytes(&msg.result)?,
            ),
            Kind::PileStacks(msg) => Payload::PileStacks(
                ids_from_bytes(&msg.sources)?,
                id_from_bytes(&msg.result)?,
            ),
            Kind::PublishShares(msg) => Payload::PublishShares(
                id_from_bytes(&msg.target)?,
                shares_from_bytes(&msg.shares)?,
                msg.proofs
                    .iter()
                    .map(ShareProof::from_proto)
                    .collect::<Result<_>>()?,
            ),
            Kind::RandomSpec(msg) => Payload::RandomSpec(msg.name.clone(), msg.spec.clone()),
            Kind::RandomEntropy(msg) => Payload::RandomEntropy(
                msg.name.clone(),
                Mask::from_proto(msg.entropy.as_ref().ok_or(Error::Decoding)?)?,
            ),
            Kind::RandomReveal(msg) => Payload::RandomReveal(
                msg.name.clone(),
                point_from_bytes(&msg.share)?,
                ShareProof::from_proto(msg.proof.as_ref().ok_or(Error::Decoding)?)?,
            ),
            Kind::Text(text) => Payload::Text(text.clone()),
            Kind::ProveEntanglement(msg) => Payload::ProveEntanglement(
                ids_from_bytes(&msg.sources)?,
                ids_from_bytes(&msg.shuffles)?,
                EntanglementProof::from_proto(msg.proof.as_ref().ok_or(Error::Decoding)?)?,
            ),
        })
    }
}
