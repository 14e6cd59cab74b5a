use std::fmt::Display;

use bitvec::vec::BitVec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod generators;
pub use generators::{IntPermutations, PriorityPermutations};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermutationError {
    #[error("{0:?} is not a permutation of 0..{1}")]
    NotAPermutation(Vec<usize>, usize),
    #[error("Cannot compose permutations of size {0} and {1}")]
    SizeMismatch(usize, usize),
}

/// A permutation of `0..n`, stored together with its inverse.
///
/// `map[i]` is the position of the input that lands on output position `i`: a slot
/// symmetry element sends the index in slot `map[i]` to slot `i`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permutation {
    map: Vec<usize>,
    inv: Vec<usize>,
}

impl PartialOrd for Permutation {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Permutation {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.map.cmp(&other.map)
    }
}

impl Permutation {
    pub fn inverse(&self) -> Self {
        Permutation {
            map: self.inv.clone(),
            inv: self.map.clone(),
        }
    }

    pub fn id(n: usize) -> Self {
        Permutation {
            map: (0..n).collect(),
            inv: (0..n).collect(),
        }
    }

    pub fn try_from_map(map: Vec<usize>) -> Result<Self, PermutationError> {
        let n = map.len();
        let mut seen: BitVec = BitVec::repeat(false, n);
        for &j in &map {
            if j >= n || seen[j] {
                return Err(PermutationError::NotAPermutation(map, n));
            }
            seen.set(j, true);
        }
        Ok(Self::from_map(map))
    }

    /// Builds the permutation without validation; `map` must be a permutation of `0..map.len()`.
    pub fn from_map(map: Vec<usize>) -> Self {
        let mut inv = vec![0; map.len()];
        for (i, &j) in map.iter().enumerate() {
            inv[j] = i;
        }
        Permutation { map, inv }
    }

    pub fn map(&self) -> &[usize] {
        &self.map
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn is_identity(&self) -> bool {
        self.map.iter().enumerate().all(|(i, &m)| i == m)
    }

    /// `self.compose(other)` first gathers with `self`, then with `other`, so the
    /// result maps `i` to `self.map()[other.map()[i]]`.
    pub fn compose(&self, other: &Self) -> Result<Self, PermutationError> {
        if self.len() != other.len() {
            return Err(PermutationError::SizeMismatch(self.len(), other.len()));
        }
        Ok(Self::from_map(
            other.map.iter().map(|&i| self.map[i]).collect(),
        ))
    }

    pub fn find_cycles(&self) -> Vec<Vec<usize>> {
        let mut visited: BitVec = BitVec::repeat(false, self.map.len());
        let mut cycles = Vec::new();
        for i in 0..self.map.len() {
            if visited[i] {
                continue;
            }
            let mut cycle = Vec::new();
            let mut j = i;
            while !visited[j] {
                visited.set(j, true);
                cycle.push(j);
                j = self.map[j];
            }
            cycles.push(cycle);
        }
        cycles
    }

    /// Parity of the permutation: `true` for odd.
    pub fn is_odd(&self) -> bool {
        self.find_cycles()
            .iter()
            .filter(|c| c.len() % 2 == 0)
            .count()
            % 2
            == 1
    }

    /// Whether `self` only moves positions inside the classes given by `classes[i]`.
    pub fn respects_classes<C: PartialEq>(&self, classes: &[C]) -> bool {
        self.map.len() == classes.len()
            && self
                .map
                .iter()
                .enumerate()
                .all(|(i, &j)| classes[i] == classes[j])
    }
}

impl Display for Permutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cycles: Vec<_> = self
            .find_cycles()
            .into_iter()
            .filter(|c| c.len() > 1)
            .collect();
        if cycles.is_empty() {
            return write!(f, "()");
        }
        for c in cycles {
            write!(f, "(")?;
            for (k, i) in c.iter().enumerate() {
                if k > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{i}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}
