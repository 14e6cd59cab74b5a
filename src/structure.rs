//! Indices, their types and polarities, and slot symmetries.

pub mod index;
pub mod symmetry;

pub use index::{parse_indices, Index, IndexError, IndexId, IndexType, Polarity};
pub use symmetry::{Symmetries, Symmetry, SymmetryError};

/// Pairs of an index list that occur with both polarities, i.e. are contracted.
pub fn contracted_ids(indices: &[Index]) -> ahash::AHashSet<IndexId> {
    let mut seen: ahash::AHashMap<IndexId, u8> = ahash::AHashMap::new();
    for i in indices {
        *seen.entry(i.id).or_default() |= i.polarity.bit();
    }
    seen.into_iter()
        .filter(|(_, states)| *states == 0b11)
        .map(|(id, _)| id)
        .collect()
}

/// Indices that are not contracted inside the list, sorted.
pub fn free_of(indices: &[Index]) -> Vec<Index> {
    let contracted = contracted_ids(indices);
    let mut free: Vec<Index> = indices
        .iter()
        .filter(|i| !contracted.contains(&i.id))
        .copied()
        .collect();
    free.sort();
    free
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_and_contracted() {
        let indices = parse_indices("_mn^ma").unwrap();
        let contracted = contracted_ids(&indices);
        assert_eq!(contracted.len(), 1);
        assert!(contracted.contains(&indices[0].id));
        let free = free_of(&indices);
        assert_eq!(free.len(), 2);
        assert!(free.contains(&indices[1]));
        assert!(free.contains(&indices[3]));
    }
}
