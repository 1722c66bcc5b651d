//! Permutations of stack positions.

use std::ops::Deref;

use rand::distributions::Distribution;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{Error, Result};

/// A permutation of `0..n`.
///
/// Applying `p` to a slice `v` yields `w` with `w[i] = v[p[i]]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Permutation(Vec<usize>);

impl Permutation {
    /// The identity permutation on `n` elements.
    pub fn identity(n: usize) -> Self {
        Self((0..n).collect())
    }

    /// The cyclic shift by `k`: element `i` moves to position `(i + k) % n`.
    pub fn shift(n: usize, k: usize) -> Self {
        Self((0..n).map(|i| (i + n - k % n) % n).collect())
    }

    /// The permutation undoing this one.
    pub fn inverse(&self) -> Self {
        let mut v = vec![0; self.len()];
        for (i, &p) in self.0.iter().enumerate() {
            v[p] = i;
        }
        Self(v)
    }

    /// Permutes a slice in place.
    pub fn apply_to<T>(&self, slice: &mut [T]) {
        assert_eq!(slice.len(), self.len());

        let mut placed = vec![false; self.len()];
        while let Some(start) = placed.iter().position(|&done| !done) {
            let mut i = start;
            loop {
                let p = self.0[i];
                if p == start {
                    placed[i] = true;
                    break;
                }
                slice.swap(i, p);
                placed[i] = true;
                i = p;
            }
        }
    }
}

impl Deref for Permutation {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        &self.0
    }
}

impl TryFrom<Vec<usize>> for Permutation {
    type Error = Error;

    fn try_from(v: Vec<usize>) -> Result<Self> {
        let mut sorted = v.clone();
        sorted.sort_unstable();
        if sorted.into_iter().ne(0..v.len()) {
            return Err(Error::ShapeMismatch);
        }
        Ok(Self(v))
    }
}

/// Samples uniform shuffle permutations of a given size.
pub struct Shuffles(pub usize);

/// Samples uniform cyclic shifts of a given size.
pub struct Shifts(pub usize);

impl Distribution<Permutation> for Shuffles {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Permutation {
        let mut v: Vec<_> = (0..self.0).collect();
        v.shuffle(rng);
        Permutation(v)
    }
}

impl Distribution<Permutation> for Shifts {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Permutation {
        Permutation::shift(self.0, rng.gen_range(0..self.0))
    }
}
