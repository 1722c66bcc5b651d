//! Derived state and block ingestion.
//!
//! A session folds a chain into derived state: the party roster, the
//! shared key, the stack registry, and the shared random numbers. Blocks
//! may arrive in any order; each is validated against the state derived
//! from its full ancestry and applied atomically, so any two sessions fed
//! the same set of blocks end up identical.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, warn};

use crate::chain::{Block, BlockBuilder, Chain, Payload};
use crate::error::{Error, Result};
use crate::hash::{Fingerprint, Id};
use crate::keys::{PrivateKey, PublicKey};
use crate::mask::Mask;
use crate::rng::Rng;
use crate::stack::Stack;
use crate::vtmf::{Share, Vtmf};

/// The stack registry: stacks by id, plus a reassignable name overlay and
/// the decryption shares published so far.
#[derive(Clone, Default)]
pub struct StackMap {
    stacks: HashMap<Id, Stack>,
    names: HashMap<String, Id>,
    shares: HashMap<Mask, (Share, Vec<Fingerprint>)>,
}

impl StackMap {
    /// The number of distinct stacks.
    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    /// Whether no stack has been seen.
    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    /// Fetches a stack by id.
    pub fn get(&self, id: &Id) -> Option<&Stack> {
        self.stacks.get(id)
    }

    /// Fetches a stack by its current name.
    pub fn get_by_name(&self, name: &str) -> Option<&Stack> {
        self.get(self.names.get(name)?)
    }

    /// All ids in the registry.
    pub fn ids(&self) -> impl Iterator<Item = &Id> {
        self.stacks.keys()
    }

    /// All bound names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    /// The accumulated share and contributors for one mask.
    pub fn shares_for(&self, mask: &Mask) -> Option<&(Share, Vec<Fingerprint>)> {
        self.shares.get(mask)
    }

    fn insert(&mut self, stack: Stack) {
        self.stacks.entry(stack.id()).or_insert(stack);
    }

    fn set_name(&mut self, id: Id, name: String) {
        self.names.insert(name, id);
    }

    fn add_shares(&mut self, stack_id: &Id, owner: Fingerprint, shares: &[Share]) {
        let Some(stack) = self.stacks.get(stack_id) else {
            return;
        };
        for (mask, share) in stack.iter().zip(shares.iter()) {
            self.shares
                .entry(*mask)
                .and_modify(|(sum, parties)| {
                    if !parties.contains(&owner) {
                        *sum += share;
                        parties.push(owner);
                    }
                })
                .or_insert_with(|| (*share, vec![owner]));
        }
    }
}

/// Everything replay derives from the chain.
#[derive(Clone)]
struct Derived {
    vtmf: Vtmf,
    names: HashMap<Fingerprint, String>,
    stacks: StackMap,
    rngs: BTreeMap<String, Rng>,
}

/// One party's view of a game.
pub struct Session {
    state: Derived,
    chain: Chain,
    applied: HashSet<Id>,
}

impl Session {
    /// Creates a fresh session for the holder of a private key.
    pub fn new(sk: PrivateKey) -> Self {
        Self {
            state: Derived {
                vtmf: Vtmf::new(sk),
                names: HashMap::new(),
                stacks: StackMap::default(),
                rngs: BTreeMap::new(),
            },
            chain: Chain::new(),
            applied: HashSet::new(),
        }
    }

    /// The masking engine, for performing operations to commit later.
    pub fn vtmf(&self) -> &Vtmf {
        &self.state.vtmf
    }

    /// The underlying chain.
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// The shared public key.
    pub fn shared_key(&self) -> PublicKey {
        self.state.vtmf.shared_key()
    }

    /// Party fingerprints in first-publication order.
    ///
    /// The order is read off the chain's canonical replay order, not off
    /// delivery order, so every session reports the same roster.
    pub fn parties(&self) -> Vec<Fingerprint> {
        let mut roster = Vec::new();
        for block in self.chain.blocks() {
            if !self.applied.contains(&block.id()) {
                continue;
            }
            for payload in block.payloads() {
                if let Payload::PublishKey(_, pk) = payload {
                    let fp = pk.fingerprint();
                    if !roster.contains(&fp) {
                        roster.push(fp);
                    }
                }
            }
        }
        roster
    }

    /// The published name of a party.
    pub fn party_name(&self, fp: &Fingerprint) -> Option<&str> {
        self.state.names.get(fp).map(String::as_str)
    }

    /// The stack registry.
    pub fn stacks(&self) -> &StackMap {
        &self.state.stacks
    }

    /// A shared random number by name.
    pub fn rng(&self, name: &str) -> Option<&Rng> {
        self.state.rngs.get(name)
    }

    /// Names of all shared random numbers.
    pub fn rngs(&self) -> impl Iterator<Item = &str> {
        self.state.rngs.keys().map(String::as_str)
    }

    /// Starts a block acknowledging every current head.
    pub fn build_block(&self) -> BlockBuilder {
        self.chain.build_block()
    }

    /// Offers a block to the session.
    ///
    /// If the block's ancestry is already applied it is validated and
    /// applied now, atomically: on any failure the chain and derived state
    /// are unchanged and the error names the offending check. A block
    /// arriving before its parents is held (the chain reports itself
    /// incomplete) and validated the moment its ancestry completes; if it
    /// turns out invalid then, it is evicted and the error is returned
    /// from the call that completed the ancestry.
    pub fn add_block(&mut self, block: Block) -> Result<()> {
        let id = block.id();
        if self.chain.contains(&id) {
            return Ok(());
        }
        self.chain.add_block(block)?;
        self.apply_ready()
    }

    /// Whether any held block still waits for missing ancestry.
    pub fn is_incomplete(&self) -> bool {
        self.chain.is_incomplete() || self.applied.len() != self.chain.count()
    }

    fn apply_ready(&mut self) -> Result<()> {
        let mut result = Ok(());
        loop {
            let mut ready: Vec<Id> = self
                .chain
                .blocks()
                .map(Block::id)
                .filter(|id| !self.applied.contains(id))
                .collect();
            // chain iteration is already topological with id tie-break;
            // apply the first not-yet-applied block whose parents are done
            ready.retain(|id| {
                self.chain
                    .parents_of(id)
                    .map(|ps| ps.iter().all(|p| self.applied.contains(p)))
                    .unwrap_or(false)
            });
            let Some(&next) = ready.first() else {
                return result;
            };

            let block = self
                .chain
                .block(&next)
                .expect("ready blocks are in the chain")
                .clone();
            match self.validate_and_apply(&block) {
                Ok(()) => {
                    self.applied.insert(next);
                    debug!(block = %next, "block applied");
                }
                Err(e) => {
                    warn!(block = %next, error = %e, "block rejected");
                    self.chain.remove_block(&next);
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
        }
    }

    fn validate_and_apply(&mut self, block: &Block) -> Result<()> {
        self.verify_signer(block)?;

        // stage payload effects on a copy so rejection leaves no trace
        let mut staged = self.state.clone();
        for payload in block.payloads() {
            apply_payload(&mut staged, block, payload)?;
        }
        self.state = staged;
        Ok(())
    }

    fn verify_signer(&self, block: &Block) -> Result<()> {
        let signer = block.signer();
        if let Some(pk) = self.state.vtmf.key_of(&signer) {
            return block.verify_signature(pk);
        }
        // roots are self-bootstrapping: an unknown signer is fine if the
        // block itself publishes the matching key
        for payload in block.payloads() {
            if let Payload::PublishKey(_, pk) = payload {
                if pk.fingerprint() == signer {
                    return block.verify_signature(pk);
                }
            }
        }
        Err(Error::ChainIntegrity("unknown signer"))
    }
}

fn apply_payload(state: &mut Derived, block: &Block, payload: &Payload) -> Result<()> {
    debug!(payload = %payload.display_short(), "applying");
    match payload {
        Payload::Bytes(_) | Payload::Text(_) => Ok(()),

        Payload::PublishKey(name, pk) => {
            let fp = pk.fingerprint();
            if block.signer() != fp {
                return Err(Error::ChainIntegrity("key published by someone else"));
            }
            state.names.insert(fp, name.clone());
            state.vtmf.add_key(pk.clone());
            Ok(())
        }

        Payload::OpenStack(stack) => {
            if !stack.iter().all(Mask::is_open) {
                return Err(Error::BadProof);
            }
            state.stacks.insert(stack.clone());
            Ok(())
        }

        Payload::MaskStack(source, stack, proofs) => {
            let src = state.stacks.get(source).ok_or(Error::UnknownStack(*source))?;
            if src.len() != stack.len() || src.len() != proofs.len() {
                return Err(Error::ShapeMismatch);
            }
            for ((a, b), proof) in src.iter().zip(stack.iter()).zip(proofs.iter()) {
                state.vtmf.verify_remask(a, b, proof)?;
            }
            state.stacks.insert(stack.clone());
            Ok(())
        }

        Payload::ShuffleStack(source, stack, proof) => {
            let src = state.stacks.get(source).ok_or(Error::UnknownStack(*source))?;
            state.vtmf.verify_mask_shuffle(src, stack, proof)?;
            state.stacks.insert(stack.clone());
            Ok(())
        }

        Payload::ShiftStack(source, stack, proof) => {
            let src = state.stacks.get(source).ok_or(Error::UnknownStack(*source))?;
            state.vtmf.verify_mask_shift(src, stack, proof)?;
            state.stacks.insert(stack.clone());
            Ok(())
        }

        Payload::NameStack(id, name) => {
            if state.stacks.get(id).is_none() {
                return Err(Error::UnknownStack(*id));
            }
            state.stacks.set_name(*id, name.clone());
            Ok(())
        }

        Payload::TakeStack(source, indices, result) => {
            let src = state.stacks.get(source).ok_or(Error::UnknownStack(*source))?;
            if indices.iter().any(|&i| i >= src.len()) {
                return Err(Error::ShapeMismatch);
            }
            let stack: Stack = indices.iter().map(|&i| src[i]).collect();
            if stack.id() != *result {
                return Err(Error::ChainIntegrity("take result id mismatch"));
            }
            state.stacks.insert(stack);
            Ok(())
        }

        Payload::PileStacks(sources, result) => {
            let mut piled = Vec::new();
            for id in sources {
                let src = state.stacks.get(id).ok_or(Error::UnknownStack(*id))?;
                piled.extend_from_slice(src);
            }
            let stack = Stack::from(piled);
            if stack.id() != *result {
                return Err(Error::ChainIntegrity("pile result id mismatch"));
            }
            state.stacks.insert(stack);
            Ok(())
        }

        Payload::PublishShares(target, shares, proofs) => {
            let signer = block.signer();
            let stack = state.stacks.get(target).ok_or(Error::UnknownStack(*target))?;
            if stack.len() != shares.len() || stack.len() != proofs.len() {
                return Err(Error::ShapeMismatch);
            }
            for ((mask, share), proof) in stack.iter().zip(shares.iter()).zip(proofs.iter()) {
                state.vtmf.verify_share(mask, &signer, share, proof)?;
            }
            state.stacks.add_shares(target, signer, shares);
            Ok(())
        }

        Payload::RandomSpec(name, spec) => {
            if let Some(existing) = state.rngs.get(name) {
                if existing.spec() != *spec {
                    return Err(Error::BadSpec);
                }
                return Ok(());
            }
            let rng = Rng::new(state.vtmf.parties(), spec)?;
            state.rngs.insert(name.clone(), rng);
            Ok(())
        }

        Payload::RandomEntropy(name, entropy) => {
            let signer = block.signer();
            let rng = state
                .rngs
                .get_mut(name)
                .ok_or(Error::ChainIntegrity("unknown rng"))?;
            if rng.is_generated() || rng.entropy_parties().contains(&signer) {
                return Err(Error::ChainIntegrity("stale entropy contribution"));
            }
            rng.add_entropy(signer, entropy);
            Ok(())
        }

        Payload::RandomReveal(name, share, proof) => {
            let signer = block.signer();
            let rng = state
                .rngs
                .get(name)
                .ok_or(Error::ChainIntegrity("unknown rng"))?;
            if rng.is_revealed() || rng.secret_parties().contains(&signer) {
                return Err(Error::ChainIntegrity("stale reveal"));
            }
            state.vtmf.verify_share(rng.mask(), &signer, share, proof)?;
            let rng = state.rngs.get_mut(name).expect("checked above");
            rng.add_secret(signer, share);
            Ok(())
        }

        Payload::ProveEntanglement(source_ids, shuffle_ids, proof) => {
            let mut sources = Vec::with_capacity(source_ids.len());
            for id in source_ids {
                sources.push(state.stacks.get(id).ok_or(Error::UnknownStack(*id))?);
            }
            let mut shuffles = Vec::with_capacity(shuffle_ids.len());
            for id in shuffle_ids {
                shuffles.push(state.stacks.get(id).ok_or(Error::UnknownStack(*id))?);
            }
            state.vtmf.verify_entanglement(&sources, &shuffles, proof)
        }
    }
}

#[cfg(test)]
mod test {
    use rand_core::OsRng;

    use super::*;
    use crate::error::Error;

    use crate::chain::BlockBuilder;

    fn keyed_session(name: &str) -> (Session, PublicKey, Block) {
        let sk = PrivateKey::random(&mut OsRng);
        let pk = sk.public_key();
        let session = Session::new(sk);
        let mut builder = BlockBuilder::new();
        builder.add_payload(Payload::PublishKey(name.into(), pk.clone()));
        let block = builder.build(session.vtmf().private_key());
        (session, pk, block)
    }

    #[test]
    fn test_key_exchange_agrees() {
        let (mut alice, _, alice_block) = keyed_session("alice");
        let (mut bob, _, bob_block) = keyed_session("bob");

        alice.add_block(alice_block.clone()).unwrap();
        alice.add_block(bob_block.clone()).unwrap();
        bob.add_block(bob_block).unwrap();
        bob.add_block(alice_block).unwrap();

        assert_eq!(
            alice.shared_key().fingerprint(),
            bob.shared_key().fingerprint()
        );
        assert_eq!(alice.parties().len(), 2);
    }

    #[test]
    fn test_foreign_key_publication_is_rejected() {
        let (mut alice, _, _) = keyed_session("alice");
        let mallory = PrivateKey::random(&mut OsRng).public_key();

        let mut builder = BlockBuilder::new();
        builder.add_payload(Payload::PublishKey("mallory".into(), mallory));
        let block = builder.build(alice.vtmf().private_key());

        // alice signs, but the key is not hers
        let err = alice.add_block(block).unwrap_err();
        assert!(matches!(err, Error::ChainIntegrity(_)));
        assert!(alice.chain().is_empty());
    }

    #[test]
    fn test_unknown_signer_is_rejected() {
        let (mut alice, _, alice_block) = keyed_session("alice");
        alice.add_block(alice_block).unwrap();

        let stranger = PrivateKey::random(&mut OsRng);
        let mut builder = alice.build_block();
        builder.add_payload(Payload::Text("hello".into()));
        let block = builder.build(&stranger);

        assert_eq!(
            alice.add_block(block),
            Err(Error::ChainIntegrity("unknown signer"))
        );
    }

    #[test]
    fn test_open_stack_and_naming() {
        let (mut alice, _, alice_block) = keyed_session("alice");
        alice.add_block(alice_block).unwrap();

        let stack: Stack = (1u64..=4).map(crate::curve::to_curve).map(Mask::open).collect();
        let id = stack.id();

        let mut builder = alice.build_block();
        builder.add_payload(Payload::OpenStack(stack));
        builder.add_payload(Payload::NameStack(id, "deck".into()));
        let sk = alice.vtmf().private_key().clone();
        alice.add_block(builder.build(&sk)).unwrap();

        assert_eq!(alice.stacks().get_by_name("deck").unwrap().id(), id);

        // rebinding the name to another stack is allowed
        let other: Stack = (5u64..=8).map(crate::curve::to_curve).map(Mask::open).collect();
        let other_id = other.id();
        let mut builder = alice.build_block();
        builder.add_payload(Payload::OpenStack(other));
        builder.add_payload(Payload::NameStack(other_id, "deck".into()));
        alice.add_block(builder.build(&sk)).unwrap();
        assert_eq!(alice.stacks().get_by_name("deck").unwrap().id(), other_id);
    }

    #[test]
    fn test_take_and_pile_check_result_ids() {
        let (mut alice, _, alice_block) = keyed_session("alice");
        alice.add_block(alice_block).unwrap();
        let sk = alice.vtmf().private_key().clone();

        let stack: Stack = (1u64..=4).map(crate::curve::to_curve).map(Mask::open).collect();
        let id = stack.id();
        let taken: Stack = [stack[1], stack[3]].into_iter().collect();
        let piled: Stack = stack.iter().chain(taken.iter()).copied().collect();

        let mut builder = alice.build_block();
        builder.add_payload(Payload::OpenStack(stack.clone()));
        builder.add_payload(Payload::TakeStack(id, vec![1, 3], taken.id()));
        builder.add_payload(Payload::PileStacks(vec![id, taken.id()], piled.id()));
        alice.add_block(builder.build(&sk)).unwrap();
        assert!(alice.stacks().get(&piled.id()).is_some());

        // a wrong result id invalidates the whole block
        let mut builder = alice.build_block();
        builder.add_payload(Payload::TakeStack(id, vec![0], id));
        let before = alice.chain().count();
        assert!(alice.add_block(builder.build(&sk)).is_err());
        assert_eq!(alice.chain().count(), before);
    }

    #[test]
    fn test_out_of_order_delivery_converges() {
        let (mut alice, _, alice_block) = keyed_session("alice");
        alice.add_block(alice_block.clone()).unwrap();
        let sk = alice.vtmf().private_key().clone();

        let stack: Stack = (1u64..=4).map(crate::curve::to_curve).map(Mask::open).collect();
        let mut builder = alice.build_block();
        builder.add_payload(Payload::OpenStack(stack.clone()));
        let second = builder.build(&sk);
        alice.add_block(second.clone()).unwrap();

        // a second session receives the blocks in reverse
        let sk2 = PrivateKey::random(&mut OsRng);
        let mut late = Session::new(sk2);
        late.add_block(second).unwrap();
        assert!(late.is_incomplete());
        assert!(late.stacks().is_empty());

        late.add_block(alice_block).unwrap();
        assert!(!late.is_incomplete());
        assert_eq!(late.stacks().get(&stack.id()), Some(&stack));
    }
}
