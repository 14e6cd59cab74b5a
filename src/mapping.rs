//! Search for index renamings between expressions.
//!
//! A mapping from `from` to `to` is a renaming of the free and dummy indices of
//! `from` (possibly raising or lowering indices of metric types) that makes it equal
//! to `to`, up to commutativity of sums and products and the slot symmetries of
//! tensors. Each mapping carries the sign picked up by antisymmetric exchanges and
//! odd functions. Searches are lazy: a [`MappingsPort`] produces one mapping at a
//! time.
//!
//! ```
//! use mapenso::{expression::TensorHead, mapping::all};
//!
//! let f = TensorHead::new("F", 2).with_symmetry(vec![1, 0], true).unwrap();
//! let from = f.tensor("_mn").unwrap();
//! let to = f.tensor("_ab").unwrap();
//! let signs: Vec<bool> = all(&from, &to).iter().map(|m| m.sign()).collect();
//! assert_eq!(signs, vec![false, true]);
//! ```

use indexmap::IndexSet;
use log::{debug, trace};
use num::One;

use crate::{
    expression::{Expr, Node, Number, Product},
    settings::MappingSettings,
};

mod apply;
pub mod buffer;
pub mod holder;
mod product;
pub mod provider;
mod scalar;
mod simple;
mod sum;

pub use buffer::IndexMappingBuffer;
pub use holder::{FromToHolder, MappingRecord};
pub use provider::{BoxedProvider, MappingProvider, MappingsPort};

use provider::{empty, singleton, Negating, RemovingContracted};

#[cfg(test)]
thread_local! {
    /// Dispatches that got past the hash comparison on this thread.
    pub(crate) static DISPATCHES: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

fn negated_factor(p: &Product) -> Option<&Expr> {
    (p.factors.len() == 1 && p.coefficient == -Number::one()).then(|| &p.factors[0])
}

/// Builds the provider extending every buffer of `upstream` by the mappings of
/// `from → to`.
pub(crate) fn create_provider<'a>(
    upstream: BoxedProvider<'a>,
    from: &'a Expr,
    to: &'a Expr,
    settings: MappingSettings,
) -> BoxedProvider<'a> {
    if from.structural_hash() != to.structural_hash() {
        return empty();
    }
    #[cfg(test)]
    DISPATCHES.with(|c| c.set(c.get() + 1));

    match (from.node(), to.node()) {
        (Node::Simple(f), Node::Simple(t)) => simple::simple_tensor(upstream, f, t),
        (Node::Field(f), Node::Field(t)) => simple::tensor_field(upstream, f, t, settings),
        (Node::Product(f), Node::Product(t)) => product::product(upstream, f, t, settings),
        (Node::Sum(f), Node::Sum(t)) => sum::sum(upstream, f, t, settings),
        (Node::Power(f), Node::Power(t)) => scalar::power(upstream, f, t, settings),
        (Node::Complex(f), Node::Complex(t)) => scalar::complex(upstream, f, t),
        (Node::Function(f), Node::Function(t)) => scalar::function(upstream, f, t, settings),
        (Node::Product(f), _) => match negated_factor(f) {
            Some(inner) => Negating::boxed(create_provider(upstream, inner, to, settings)),
            None => empty(),
        },
        (_, Node::Product(t)) => match negated_factor(t) {
            Some(inner) => Negating::boxed(create_provider(upstream, from, inner, settings)),
            None => empty(),
        },
        _ => {
            trace!("kinds {:?} and {:?} differ", from.kind(), to.kind());
            empty()
        }
    }
}

/// Entry points of the mapping search under fixed [`MappingSettings`].
///
/// The free functions of this module use the default settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexMappings {
    settings: MappingSettings,
}

impl IndexMappings {
    pub fn new(settings: MappingSettings) -> Self {
        IndexMappings { settings }
    }

    pub fn settings(&self) -> &MappingSettings {
        &self.settings
    }

    fn fresh(&self) -> IndexMappingBuffer {
        IndexMappingBuffer::new(self.settings)
    }

    /// All mappings `from → to`, with contracted records removed.
    pub fn port<'a>(&self, from: &'a Expr, to: &'a Expr) -> MappingsPort<'a> {
        self.port_with(self.fresh(), from, to)
    }

    /// All extensions of `seed` by mappings `from → to`.
    pub fn port_with<'a>(
        &self,
        seed: IndexMappingBuffer,
        from: &'a Expr,
        to: &'a Expr,
    ) -> MappingsPort<'a> {
        debug!("mapping {from} → {to}");
        MappingsPort::new(RemovingContracted::boxed(create_provider(
            singleton(seed),
            from,
            to,
            self.settings,
        )))
    }

    /// Slot mappings between two simple tensors or two tensor fields, ignoring field
    /// arguments.
    pub fn simple_tensors_port<'a>(&self, from: &'a Expr, to: &'a Expr) -> MappingsPort<'a> {
        let settings = MappingSettings {
            compare_field_arguments: false,
            ..self.settings
        };
        let seed = singleton(self.fresh());
        let provider = match (from.node(), to.node()) {
            (Node::Simple(f), Node::Simple(t)) => simple::simple_tensor(seed, f, t),
            (Node::Field(f), Node::Field(t)) => simple::tensor_field(seed, f, t, settings),
            _ => empty(),
        };
        MappingsPort::new(RemovingContracted::boxed(provider))
    }

    /// Mappings that send `from[k]` to `to[k]` for every position, without permuting
    /// factors. Sequences of different length have no mapping.
    pub fn bijective_product_port<'a>(&self, from: &'a [Expr], to: &'a [Expr]) -> MappingsPort<'a> {
        debug!("bijective mapping of {} factors onto {}", from.len(), to.len());
        MappingsPort::new(RemovingContracted::boxed(product::bijective(
            from,
            to,
            self.settings,
        )))
    }

    pub fn first(&self, from: &Expr, to: &Expr) -> Option<IndexMappingBuffer> {
        self.port(from, to).next()
    }

    pub fn exists(&self, from: &Expr, to: &Expr) -> bool {
        self.first(from, to).is_some()
    }

    /// Whether some mapping carries no sign.
    pub fn positive_exists(&self, from: &Expr, to: &Expr) -> bool {
        self.port(from, to).any(|m| !m.sign())
    }

    /// Whether `candidate`, sign included, extends to a mapping `from → to`.
    pub fn test_mapping(&self, from: &Expr, to: &Expr, candidate: &IndexMappingBuffer) -> bool {
        let seed = IndexMappingBuffer::tester(candidate.export().into(), self.settings);
        MappingsPort::new(create_provider(singleton(seed), from, to, self.settings))
            .any(|m| m.sign() == candidate.sign())
    }

    /// Every distinct mapping, in search order.
    pub fn all(&self, from: &Expr, to: &Expr) -> IndexSet<IndexMappingBuffer> {
        self.port(from, to).collect()
    }
}

pub fn port<'a>(from: &'a Expr, to: &'a Expr) -> MappingsPort<'a> {
    IndexMappings::default().port(from, to)
}

pub fn simple_tensors_port<'a>(from: &'a Expr, to: &'a Expr) -> MappingsPort<'a> {
    IndexMappings::default().simple_tensors_port(from, to)
}

pub fn bijective_product_port<'a>(from: &'a [Expr], to: &'a [Expr]) -> MappingsPort<'a> {
    IndexMappings::default().bijective_product_port(from, to)
}

pub fn first(from: &Expr, to: &Expr) -> Option<IndexMappingBuffer> {
    IndexMappings::default().first(from, to)
}

pub fn exists(from: &Expr, to: &Expr) -> bool {
    IndexMappings::default().exists(from, to)
}

pub fn positive_exists(from: &Expr, to: &Expr) -> bool {
    IndexMappings::default().positive_exists(from, to)
}

pub fn test_mapping(from: &Expr, to: &Expr, candidate: &IndexMappingBuffer) -> bool {
    IndexMappings::default().test_mapping(from, to, candidate)
}

pub fn all(from: &Expr, to: &Expr) -> IndexSet<IndexMappingBuffer> {
    IndexMappings::default().all(from, to)
}
