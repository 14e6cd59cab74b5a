use std::fmt::Display;

use bitvec::vec::BitVec;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::permutation::{Permutation, PermutationError};

use super::index::IndexType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymmetryError {
    #[error("Symmetry acts on {0} slots, the tensor has {1}")]
    WrongDimension(usize, usize),
    #[error(transparent)]
    Permutation(#[from] PermutationError),
    #[error("Generators make {0} both symmetric and antisymmetric")]
    Inconsistent(Permutation),
    #[error("Symmetry {0} exchanges slots of type {1:?} and {2:?}")]
    MixedTypes(Permutation, IndexType, IndexType),
}

/// A permutation of slot positions, with the sign it carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symmetry {
    pub permutation: Permutation,
    pub antisymmetric: bool,
}

impl Symmetry {
    pub fn new(map: Vec<usize>, antisymmetric: bool) -> Result<Self, SymmetryError> {
        Ok(Symmetry {
            permutation: Permutation::try_from_map(map)?,
            antisymmetric,
        })
    }

    pub fn identity(dimension: usize) -> Self {
        Symmetry {
            permutation: Permutation::id(dimension),
            antisymmetric: false,
        }
    }

    pub fn compose(&self, other: &Symmetry) -> Result<Symmetry, SymmetryError> {
        Ok(Symmetry {
            permutation: self.permutation.compose(&other.permutation)?,
            antisymmetric: self.antisymmetric ^ other.antisymmetric,
        })
    }

    pub fn dimension(&self) -> usize {
        self.permutation.len()
    }
}

impl Display for Symmetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.antisymmetric {
            write!(f, "-")?;
        }
        write!(f, "{}", self.permutation)
    }
}

/// The symmetry group of a tensor's slots, kept both as its declared generators and
/// as the full list of group elements.
///
/// The element list starts with the identity; slots that some element exchanges share
/// a diff-id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symmetries {
    dimension: usize,
    generators: Vec<Symmetry>,
    elements: Vec<Symmetry>,
    diff_ids: Vec<u16>,
}

impl Symmetries {
    pub fn trivial(dimension: usize) -> Self {
        Symmetries {
            dimension,
            generators: Vec::new(),
            elements: vec![Symmetry::identity(dimension)],
            diff_ids: (0..dimension as u16).collect(),
        }
    }

    pub fn from_generators(
        dimension: usize,
        generators: impl IntoIterator<Item = Symmetry>,
    ) -> Result<Self, SymmetryError> {
        let mut symmetries = Symmetries::trivial(dimension);
        for g in generators {
            symmetries.add(g)?;
        }
        Ok(symmetries)
    }

    /// Adds a generator and recomputes the closure.
    ///
    /// Fails without modifying `self` if the generator has the wrong size or makes
    /// some element both symmetric and antisymmetric.
    pub fn add(&mut self, generator: Symmetry) -> Result<(), SymmetryError> {
        if generator.dimension() != self.dimension {
            return Err(SymmetryError::WrongDimension(
                generator.dimension(),
                self.dimension,
            ));
        }
        let mut generators = self.generators.clone();
        generators.push(generator);
        self.elements = Self::closure(self.dimension, &generators)?;
        self.diff_ids = Self::orbits(self.dimension, &generators);
        self.generators = generators;
        Ok(())
    }

    fn closure(dimension: usize, generators: &[Symmetry]) -> Result<Vec<Symmetry>, SymmetryError> {
        let mut seen: IndexMap<Permutation, bool> = IndexMap::new();
        seen.insert(Permutation::id(dimension), false);
        let mut frontier = 0;
        while let Some((permutation, &antisymmetric)) = seen.get_index(frontier) {
            let current = Symmetry {
                permutation: permutation.clone(),
                antisymmetric,
            };
            frontier += 1;
            for g in generators {
                let next = current.compose(g)?;
                match seen.get(&next.permutation) {
                    Some(&s) if s != next.antisymmetric => {
                        return Err(SymmetryError::Inconsistent(next.permutation));
                    }
                    Some(_) => {}
                    None => {
                        seen.insert(next.permutation, next.antisymmetric);
                    }
                }
            }
        }
        Ok(seen
            .into_iter()
            .map(|(permutation, antisymmetric)| Symmetry {
                permutation,
                antisymmetric,
            })
            .collect())
    }

    fn orbits(dimension: usize, generators: &[Symmetry]) -> Vec<u16> {
        let mut ids = vec![0u16; dimension];
        let mut visited: BitVec = BitVec::repeat(false, dimension);
        let mut next_id = 0u16;
        for start in 0..dimension {
            if visited[start] {
                continue;
            }
            let mut stack = vec![start];
            visited.set(start, true);
            while let Some(slot) = stack.pop() {
                ids[slot] = next_id;
                for g in generators {
                    let image = g.permutation.map()[slot];
                    let preimage = g.permutation.inverse().map()[slot];
                    for s in [image, preimage] {
                        if !visited[s] {
                            visited.set(s, true);
                            stack.push(s);
                        }
                    }
                }
            }
            next_id += 1;
        }
        ids
    }

    /// Checks that no element exchanges slots of different index types.
    pub fn check_types(&self, types: &[IndexType]) -> Result<(), SymmetryError> {
        if types.len() != self.dimension {
            return Err(SymmetryError::WrongDimension(self.dimension, types.len()));
        }
        for g in &self.generators {
            for (i, &j) in g.permutation.map().iter().enumerate() {
                if types[i] != types[j] {
                    return Err(SymmetryError::MixedTypes(
                        g.permutation.clone(),
                        types[i],
                        types[j],
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn generators(&self) -> &[Symmetry] {
        &self.generators
    }

    pub fn elements(&self) -> &[Symmetry] {
        &self.elements
    }

    pub fn diff_ids(&self) -> &[u16] {
        &self.diff_ids
    }

    pub fn respects_diff_ids(&self, permutation: &Permutation) -> bool {
        permutation.respects_classes(&self.diff_ids)
    }
}
