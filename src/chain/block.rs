//! Blocks and the block builder.

use k256::ecdsa::Signature;

use crate::chain::Payload;
use crate::error::{Error, Result};
use crate::hash::{Fingerprint, Id};
use crate::keys::{PrivateKey, PublicKey};
use crate::proto;
use crate::serde::{encode, Proto};

const BLOCK_ID_DOMAIN: &[u8] = b"pbmx block id v1";

/// A signed, ack-linked record of payloads.
///
/// Immutable once built. The id is the fingerprint of the pre-signature
/// encoding of `(acks, payloads, signer)`; the signature signs the id with
/// the signer's private key. Acks are sorted and duplicate-free by
/// construction, so equal blocks encode equally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    acks: Vec<Id>,
    payloads: Vec<Payload>,
    signer: Fingerprint,
    sig: Signature,
}

impl Block {
    /// This block's id.
    pub fn id(&self) -> Id {
        Fingerprint::of_bytes(BLOCK_ID_DOMAIN, &self.presignature_bytes())
    }

    /// The fingerprint of the key that signed this block.
    pub fn signer(&self) -> Fingerprint {
        self.signer
    }

    /// The ids of the blocks this one acknowledges.
    pub fn parent_ids(&self) -> &[Id] {
        &self.acks
    }

    /// The payloads, in the order the signer listed them.
    pub fn payloads(&self) -> impl ExactSizeIterator<Item = &Payload> {
        self.payloads.iter()
    }

    /// Checks the signature against a candidate signer key.
    pub fn verify_signature(&self, pk: &PublicKey) -> Result<()> {
        if pk.fingerprint() != self.signer {
            return Err(Error::ChainIntegrity("signer fingerprint mismatch"));
        }
        pk.verify(self.id().as_ref(), &self.sig)
    }

    /// Structural checks that need no chain context: acks must be sorted
    /// and duplicate-free.
    pub fn well_formed(&self) -> Result<()> {
        if self.acks.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::ChainIntegrity("acks not sorted or not unique"));
        }
        Ok(())
    }

    fn presignature_bytes(&self) -> Vec<u8> {
        let mut msg = self.to_proto();
        msg.signature.clear();
        encode(&msg)
    }
}

/// Accumulates payloads and acks, then signs them into a block.
#[derive(Default)]
pub struct BlockBuilder {
    acks: Vec<Id>,
    payloads: Vec<Payload>,
}

impl BlockBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acknowledges a previous block.
    pub fn acknowledge(&mut self, id: Id) -> &mut Self {
        self.acks.push(id);
        self
    }

    /// Appends a payload.
    pub fn add_payload(&mut self, payload: Payload) -> &mut Self {
        self.payloads.push(payload);
        self
    }

    /// Signs the accumulated content, consuming the builder.
    pub fn build(mut self, sk: &PrivateKey) -> Block {
        self.acks.sort_unstable();
        self.acks.dedup();

        let mut block = Block {
            acks: self.acks,
            payloads: self.payloads,
            signer: sk.fingerprint(),
            // placeholder until the id is known
            sig: sk.sign(&[]),
        };
        block.sig = sk.sign(block.id().as_ref());
        block
    }
}

impl Proto for Block {
    type Message = proto::Block;

    fn to_proto(&self) -> proto::Block {
        proto::Block {
            acks: self.acks.iter().map(|id| id.as_ref().to_vec()).collect(),
            payloads: self.payloads.iter().map(|p| p.to_proto()).collect(),
            signer: self.signer.as_ref().to_vec(),
            signature: self.sig.to_bytes().to_vec(),
        }
    }

    fn from_proto(m: &proto::Block) -> Result<Self> {
        Ok(Self {
            acks: m
                .acks
                .iter()
                .map(|b| Id::try_from(b.as_slice()))
                .collect::<Result<_>>()?,
            payloads: m
                .payloads
                .iter()
                .map(Payload::from_proto)
                .collect::<Result<_>>()?,
            signer: Fingerprint::try_from(m.signer.as_slice())?,
            sig: Signature::from_slice(&m.signature).map_err(|_| Error::Decoding)?,
        })
    }
}

#[cfg(test)]
mod test {
    use rand_core::OsRng;

    use super::*;

    #[test]
    fn test_new_block_has_valid_signature() {
        let sk = PrivateKey::random(&mut OsRng);
        let block = BlockBuilder::new().build(&sk);
        assert_eq!(block.verify_signature(&sk.public_key()), Ok(()));

        let other = PrivateKey::random(&mut OsRng);
        assert!(block.verify_signature(&other.public_key()).is_err());
    }

    #[test]
    fn test_payload_order_is_preserved() {
        let sk = PrivateKey::random(&mut OsRng);
        let mut builder = BlockBuilder::new();
        for i in 0..4u8 {
            builder.add_payload(Payload::Bytes(vec![i]));
        }
        let block = builder.build(&sk);

        let payloads: Vec<_> = block.payloads().cloned().collect();
        let expected: Vec<_> = (0..4u8).map(|i| Payload::Bytes(vec![i])).collect();
        assert_eq!(payloads, expected);
    }

    #[test]
    fn test_acks_are_sorted_and_unique() {
        let sk = PrivateKey::random(&mut OsRng);
        let a = Fingerprint::of_bytes(b"test", b"a");
        let b = Fingerprint::of_bytes(b"test", b"b");
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };

        let mut builder = BlockBuilder::new();
        builder.acknowledge(hi).acknowledge(lo).acknowledge(hi);
        let block = builder.build(&sk);

        assert_eq!(block.parent_ids(), &[lo, hi]);
        assert_eq!(block.well_formed(), Ok(()));
    }

    #[test]
    fn test_block_roundtrips() {
        let sk = PrivateKey::random(&mut OsRng);
        let mut builder = BlockBuilder::new();
        builder.add_payload(Payload::Text("move".into()));
        builder.add_payload(Payload::Bytes(vec![1, 2, 3]));
        let original = builder.build(&sk);

        let recovered = Block::from_bytes(&original.to_bytes()).unwrap();
        assert_eq!(original, recovered);
        assert_eq!(original.id(), recovered.id());
        assert_eq!(recovered.verify_signature(&sk.public_key()), Ok(()));
    }

    #[test]
    fn test_id_ignores_signature() {
        // same content signed twice gives the same id even though ECDSA
        // nonces differ across keys
        let sk = PrivateKey::random(&mut OsRng);
        let mut b1 = BlockBuilder::new();
        b1.add_payload(Payload::Text("x".into()));
        let mut b2 = BlockBuilder::new();
        b2.add_payload(Payload::Text("x".into()));
        assert_eq!(b1.build(&sk).id(), b2.build(&sk).id());
    }
}
