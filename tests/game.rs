//! End-to-end games between two sessions exchanging blocks.

use rand::Rng as _;
use rand_core::OsRng;

use pbmx::chain::{Block, Payload};
use pbmx::curve;
use pbmx::{Mask, PrivateKey, Proto, Session, Shuffles, Stack};

/// Builds a block out of payloads, applies it locally, and returns it for
/// delivery to other sessions.
fn commit(session: &mut Session, payloads: Vec<Payload>) -> Block {
    let sk = session.vtmf().private_key().clone();
    let mut builder = session.build_block();
    for p in payloads {
        builder.add_payload(p);
    }
    let block = builder.build(&sk);
    session.add_block(block.clone()).expect("own block is valid");
    block
}

fn publish_key(session: &mut Session, name: &str) -> Block {
    let pk = session.vtmf().public_key();
    commit(session, vec![Payload::PublishKey(name.into(), pk)])
}

fn two_joined_sessions() -> (Session, Session) {
    let mut alice = Session::new(PrivateKey::random(&mut OsRng));
    let mut bob = Session::new(PrivateKey::random(&mut OsRng));

    let a = publish_key(&mut alice, "alice");
    let b = publish_key(&mut bob, "bob");
    alice.add_block(b).unwrap();
    bob.add_block(a).unwrap();
    (alice, bob)
}

/// Publishes shares for a stack from one session, delivering to the other.
fn publish_shares(from: &mut Session, to: &mut Session, stack_id: pbmx::Id) {
    let stack = from.stacks().get(&stack_id).unwrap().clone();
    let (shares, proofs): (Vec<_>, Vec<_>) = stack
        .iter()
        .map(|m| from.vtmf().share(m, &mut OsRng))
        .unzip();
    let block = commit(
        from,
        vec![Payload::PublishShares(stack_id, shares, proofs)],
    );
    to.add_block(block).unwrap();
}

/// Recovers every token of a stack once all shares are published.
fn open_stack(session: &Session, stack_id: pbmx::Id) -> Vec<u64> {
    let stack = session.stacks().get(&stack_id).unwrap();
    stack
        .iter()
        .map(|m| {
            let (sum, parties) = session.stacks().shares_for(m).unwrap();
            assert_eq!(parties.len(), session.parties().len());
            let unmasked = session.vtmf().unmask_share(m, sum);
            session.vtmf().unmask_open(&unmasked).unwrap()
        })
        .collect()
}

fn open_stack_of(tokens: impl Iterator<Item = u64>) -> Stack {
    tokens.map(curve::to_curve).map(Mask::open).collect()
}

#[test]
fn key_exchange_agrees_on_shared_key() {
    let (alice, bob) = two_joined_sessions();
    assert_eq!(
        alice.shared_key().fingerprint(),
        bob.shared_key().fingerprint()
    );
    assert_eq!(alice.parties(), bob.parties());
    assert_eq!(alice.party_name(&alice.parties()[0]), bob.party_name(&bob.parties()[0]));
}

#[test]
fn masked_token_reconstructs() {
    let (mut alice, mut bob) = two_joined_sessions();

    let open = open_stack_of([17].into_iter());
    let open_id = open.id();
    let (masks, proofs): (Vec<_>, Vec<_>) = open
        .iter()
        .map(|m| {
            let (mask, _, proof) = alice.vtmf().remask(m, &mut OsRng);
            (mask, proof)
        })
        .unzip();
    let masked = Stack::from(masks);
    let masked_id = masked.id();

    let block = commit(
        &mut alice,
        vec![
            Payload::OpenStack(open),
            Payload::MaskStack(open_id, masked, proofs),
        ],
    );
    bob.add_block(block).unwrap();

    publish_shares(&mut alice, &mut bob, masked_id);
    publish_shares(&mut bob, &mut alice, masked_id);

    assert_eq!(open_stack(&alice, masked_id), vec![17]);
    assert_eq!(open_stack(&bob, masked_id), vec![17]);
}

#[test]
fn shuffle_preserves_token_multiset() {
    let (mut alice, mut bob) = two_joined_sessions();

    let open = open_stack_of(1..=10);
    let open_id = open.id();
    let pi = OsRng.sample(&Shuffles(10));
    let (shuffled, _, proof) = alice.vtmf().mask_shuffle(&open, &pi, &mut OsRng).unwrap();
    let shuffled_id = shuffled.id();

    let block = commit(
        &mut alice,
        vec![
            Payload::OpenStack(open),
            Payload::ShuffleStack(open_id, shuffled, proof),
        ],
    );
    bob.add_block(block).unwrap();

    publish_shares(&mut alice, &mut bob, shuffled_id);
    publish_shares(&mut bob, &mut alice, shuffled_id);

    let mut tokens = open_stack(&bob, shuffled_id);
    tokens.sort_unstable();
    assert_eq!(tokens, (1..=10).collect::<Vec<_>>());
    assert_eq!(open_stack(&alice, shuffled_id), open_stack(&bob, shuffled_id));
}

#[test]
fn shift_rotates_tokens() {
    let (mut alice, mut bob) = two_joined_sessions();

    let open = open_stack_of(1..=10);
    let open_id = open.id();
    let (shifted, _, proof) = alice.vtmf().mask_shift(&open, 3, &mut OsRng).unwrap();
    let shifted_id = shifted.id();

    let block = commit(
        &mut alice,
        vec![
            Payload::OpenStack(open),
            Payload::ShiftStack(open_id, shifted, proof),
        ],
    );
    bob.add_block(block).unwrap();

    publish_shares(&mut alice, &mut bob, shifted_id);
    publish_shares(&mut bob, &mut alice, shifted_id);

    assert_eq!(
        open_stack(&bob, shifted_id),
        vec![4, 5, 6, 7, 8, 9, 10, 1, 2, 3]
    );
}

#[test]
fn shared_rng_agrees() {
    let (mut alice, mut bob) = two_joined_sessions();

    let block = commit(
        &mut alice,
        vec![Payload::RandomSpec("roll".into(), "1d6".into())],
    );
    bob.add_block(block).unwrap();

    // both parties contribute entropy
    let e_a = alice.vtmf().mask_random(&mut OsRng);
    let block = commit(&mut alice, vec![Payload::RandomEntropy("roll".into(), e_a)]);
    bob.add_block(block).unwrap();
    let e_b = bob.vtmf().mask_random(&mut OsRng);
    let block = commit(&mut bob, vec![Payload::RandomEntropy("roll".into(), e_b)]);
    alice.add_block(block).unwrap();

    assert!(alice.rng("roll").unwrap().is_generated());

    // both parties reveal their shares
    let mask = *alice.rng("roll").unwrap().mask();
    let (share, proof) = alice.vtmf().share(&mask, &mut OsRng);
    let block = commit(
        &mut alice,
        vec![Payload::RandomReveal("roll".into(), share, proof)],
    );
    bob.add_block(block).unwrap();

    let mask = *bob.rng("roll").unwrap().mask();
    let (share, proof) = bob.vtmf().share(&mask, &mut OsRng);
    let block = commit(
        &mut bob,
        vec![Payload::RandomReveal("roll".into(), share, proof)],
    );
    alice.add_block(block).unwrap();

    let a = alice.rng("roll").unwrap().value(alice.vtmf()).unwrap();
    let b = bob.rng("roll").unwrap().value(bob.vtmf()).unwrap();
    assert_eq!(a, b);
    assert!((1..=6).contains(&a));
}

#[test]
fn chain_topology_predicates_hold() {
    let mut alice = Session::new(PrivateKey::random(&mut OsRng));
    let mut bob = Session::new(PrivateKey::random(&mut OsRng));

    let b1 = publish_key(&mut alice, "alice");
    let b2 = publish_key(&mut bob, "bob");
    alice.add_block(b2.clone()).unwrap();
    bob.add_block(b1.clone()).unwrap();

    // b3 merges the two roots
    let b3 = commit(&mut alice, vec![Payload::Text("merge".into())]);
    assert_eq!(b3.parent_ids().len(), 2);
    bob.add_block(b3.clone()).unwrap();

    // two independent blocks acking b3
    let sk_a = alice.vtmf().private_key().clone();
    let mut fork = alice.build_block();
    fork.add_payload(Payload::Text("fork a".into()));
    let b4 = fork.build(&sk_a);
    let b5 = commit(&mut bob, vec![Payload::Text("fork b".into())]);
    alice.add_block(b4.clone()).unwrap();
    alice.add_block(b5.clone()).unwrap();
    assert!(!alice.chain().is_merged());

    // b6 merges the forks
    let b6 = commit(&mut alice, vec![Payload::Text("merge forks".into())]);
    assert_eq!(b6.parent_ids().len(), 2);

    let chain = alice.chain();
    let mut roots = chain.roots().to_vec();
    roots.sort_unstable();
    let mut expected = vec![b1.id(), b2.id()];
    expected.sort_unstable();
    assert_eq!(roots, expected);
    assert_eq!(chain.heads(), &[b6.id()]);
    assert!(chain.is_merged());
    assert!(!chain.is_incomplete());

    // a party that only received b5 sees an incomplete chain
    let mut late = Session::new(PrivateKey::random(&mut OsRng));
    late.add_block(b5).unwrap();
    assert!(late.chain().is_incomplete());
}

#[test]
fn replay_is_delivery_order_independent() {
    let (mut alice, mut bob) = two_joined_sessions();

    let open = open_stack_of(1..=5);
    let open_id = open.id();
    let pi = OsRng.sample(&Shuffles(5));
    let (shuffled, _, proof) = alice.vtmf().mask_shuffle(&open, &pi, &mut OsRng).unwrap();

    let b3 = commit(
        &mut alice,
        vec![
            Payload::OpenStack(open),
            Payload::ShuffleStack(open_id, shuffled, proof),
        ],
    );
    let b4 = commit(&mut alice, vec![Payload::Text("note".into())]);

    // bob receives the tail first
    bob.add_block(b4).unwrap();
    assert!(bob.is_incomplete());
    bob.add_block(b3).unwrap();
    assert!(!bob.is_incomplete());

    let mut alice_stacks: Vec<_> = alice.stacks().ids().copied().collect();
    let mut bob_stacks: Vec<_> = bob.stacks().ids().copied().collect();
    alice_stacks.sort_unstable();
    bob_stacks.sort_unstable();
    assert_eq!(alice_stacks, bob_stacks);
    assert_eq!(
        alice.shared_key().fingerprint(),
        bob.shared_key().fingerprint()
    );
}

#[test]
fn blocks_roundtrip_over_the_wire() {
    let (mut alice, mut bob) = two_joined_sessions();

    let open = open_stack_of(1..=3);
    let block = commit(&mut alice, vec![Payload::OpenStack(open.clone())]);

    // deliver as bytes, the way a transport would
    let bytes = block.to_bytes();
    let recovered = Block::from_bytes(&bytes).unwrap();
    assert_eq!(recovered, block);
    bob.add_block(recovered).unwrap();
    assert_eq!(bob.stacks().get(&open.id()), Some(&open));
}
