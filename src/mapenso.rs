/*!

Index mapping for symbolic tensor expressions.

Given two expressions `from` and `to`, the [`mapping`] module finds every renaming of
the indices of `from` that turns it into `to`. Sums and products are matched up to the
order of their terms and factors, tensors up to their declared slot symmetries, and
every mapping records the sign picked up on the way (antisymmetric exchanges, `-1`
coefficients, odd functions).

Expressions are built with the small tree model in [`expression`]: tensors are created
from a [`expression::TensorHead`] and an index list such as `"_mn^a"`; products and sums
are brought into a canonical order on construction. Index types, polarities and
symmetry groups live in [`structure`].

Search options (whether metric indices may be raised or lowered by a mapping, which
index types are metric, whether tensor field arguments are compared) are collected in
[`settings::MappingSettings`].

*/

/// Index types, identifiers and slot symmetries
pub mod structure;

/// Permutations and their generators
pub mod permutation;

/// Expression trees
pub mod expression;

pub mod mapping;

pub mod settings;

pub mod utils;

#[cfg(test)]
mod tests;
