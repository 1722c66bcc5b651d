//! Stacks of masked values.

use std::iter::FromIterator;
use std::ops::{Deref, DerefMut};

use crate::error::Result;
use crate::hash::{Fingerprint, Id};
use crate::mask::Mask;
use crate::proto;
use crate::serde::Proto;

const STACK_ID_DOMAIN: &[u8] = b"pbmx stack id v1";

/// An ordered sequence of masks, identified by the fingerprint of its
/// canonical encoding.
///
/// Stacks are immutable values: every operation produces a new stack with
/// a new id, and any two parties holding the same masks compute the same
/// id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stack(pub(crate) Vec<Mask>);

impl Stack {
    /// The content-address of this stack.
    pub fn id(&self) -> Id {
        Fingerprint::of_bytes(STACK_ID_DOMAIN, &self.to_bytes())
    }
}

impl Proto for Stack {
    type Message = proto::Stack;

    fn to_proto(&self) -> proto::Stack {
        proto::Stack {
            masks: self.0.iter().map(|m| m.to_proto()).collect(),
        }
    }

    fn from_proto(m: &proto::Stack) -> Result<Self> {
        Ok(Self(
            m.masks
                .iter()
                .map(Mask::from_proto)
                .collect::<Result<_>>()?,
        ))
    }
}

impl Deref for Stack {
    type Target = [Mask];

    fn deref(&self) -> &[Mask] {
        &self.0
    }
}

impl DerefMut for Stack {
    fn deref_mut(&mut self) -> &mut [Mask] {
        &mut self.0
    }
}

impl From<Vec<Mask>> for Stack {
    fn from(v: Vec<Mask>) -> Self {
        Self(v)
    }
}

impl From<&[Mask]> for Stack {
    fn from(v: &[Mask]) -> Self {
        Self(v.to_vec())
    }
}

impl FromIterator<Mask> for Stack {
    fn from_iter<I: IntoIterator<Item = Mask>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Stack {
    type Item = Mask;
    type IntoIter = std::vec::IntoIter<Mask>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Extend<Mask> for Stack {
    fn extend<I: IntoIterator<Item = Mask>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

#[cfg(test)]
mod test {
    use elliptic_curve::Group;
    use k256::ProjectivePoint;
    use rand_core::OsRng;

    use super::*;

    fn random_stack(n: usize) -> Stack {
        (0..n)
            .map(|_| {
                Mask(
                    ProjectivePoint::random(&mut OsRng),
                    ProjectivePoint::random(&mut OsRng),
                )
            })
            .collect()
    }

    #[test]
    fn test_id_depends_only_on_content() {
        let stack = random_stack(4);
        let copy = Stack::from(&stack[..]);
        assert_eq!(stack.id(), copy.id());
        assert_ne!(stack.id(), random_stack(4).id());
    }

    #[test]
    fn test_id_depends_on_order() {
        let stack = random_stack(4);
        let mut swapped = stack.clone();
        swapped.swap(0, 1);
        assert_ne!(stack.id(), swapped.id());
    }

    #[test]
    fn test_stack_roundtrips() {
        let original = random_stack(5);
        let recovered = Stack::from_bytes(&original.to_bytes()).unwrap();
        assert_eq!(original, recovered);
        assert_eq!(original.id(), recovered.id());
    }
}
