use log::trace;

use super::{
    buffer::IndexMappingBuffer,
    create_provider,
    provider::{
        empty, singleton, BoxedProvider, CachedHolders, HolderMerge, MappingProvider,
        MappingsPort, Negating, Register,
    },
};
use crate::{
    expression::{stretches, Expr, Product},
    permutation::IntPermutations,
    settings::MappingSettings,
};

/// Chains pairwise matchers over `from[k] → to[k]`.
fn pairwise<'a>(
    upstream: BoxedProvider<'a>,
    from: &'a [Expr],
    to: impl Iterator<Item = &'a Expr>,
    settings: MappingSettings,
) -> BoxedProvider<'a> {
    from.iter()
        .zip(to)
        .fold(upstream, |provider, (f, t)| create_provider(provider, f, t, settings))
}

/// Matches a stretch of factors with equal hashes under every permutation of the
/// target stretch.
pub(crate) struct PermutatorProvider<'a> {
    register: Register<'a>,
    from: &'a [Expr],
    to: &'a [Expr],
    permutations: IntPermutations,
    source: Option<MappingsPort<'a>>,
    settings: MappingSettings,
}

impl<'a> PermutatorProvider<'a> {
    pub(crate) fn boxed(
        upstream: BoxedProvider<'a>,
        from: &'a [Expr],
        to: &'a [Expr],
        settings: MappingSettings,
    ) -> BoxedProvider<'a> {
        Box::new(PermutatorProvider {
            register: Register::new(upstream),
            from,
            to,
            permutations: IntPermutations::new(from.len()),
            source: None,
            settings,
        })
    }
}

impl MappingProvider for PermutatorProvider<'_> {
    fn prepare(&mut self) -> bool {
        self.permutations.reset();
        self.source = None;
        self.register.pull()
    }

    fn take(&mut self) -> Option<IndexMappingBuffer> {
        loop {
            if let Some(buffer) = self.source.as_mut().and_then(MappingsPort::take) {
                return Some(buffer);
            }
            let current = self.register.current.as_ref()?;
            let Some(permutation) = self.permutations.next() else {
                self.source = None;
                return None;
            };
            let to = self.to;
            let permuted = permutation.map().iter().map(move |&j| &to[j]);
            self.source = Some(MappingsPort::new(pairwise(
                singleton(current.clone()),
                self.from,
                permuted,
                self.settings,
            )));
        }
    }
}

pub(crate) fn product<'a>(
    upstream: BoxedProvider<'a>,
    from: &'a Product,
    to: &'a Product,
    settings: MappingSettings,
) -> BoxedProvider<'a> {
    let negate = if from.coefficient == to.coefficient {
        false
    } else if from.coefficient == -to.coefficient.clone() {
        true
    } else {
        trace!("coefficients {} and {} differ", from.coefficient, to.coefficient);
        return empty();
    };
    if from.factors.len() != to.factors.len()
        || from
            .factors
            .iter()
            .zip(&to.factors)
            .any(|(f, t)| f.structural_hash() != t.structural_hash())
    {
        return empty();
    }

    let mut provider = upstream;
    for stretch in stretches(&from.factors) {
        let (f, t) = (&from.factors[stretch.clone()], &to.factors[stretch]);
        provider = if f.len() == 1 {
            create_provider(provider, &f[0], &t[0], settings)
        } else {
            PermutatorProvider::boxed(provider, f, t, settings)
        };
    }
    if negate {
        Negating::boxed(provider)
    } else {
        provider
    }
}

/// Matches `from[k] → to[k]` for every position independently and merges the
/// per-position results, so factors are not permuted. Each position is searched
/// lazily, once, and its results are replayed for every upstream buffer.
///
/// Sequences of different length produce nothing.
pub(crate) fn bijective<'a>(
    from: &'a [Expr],
    to: &'a [Expr],
    settings: MappingSettings,
) -> BoxedProvider<'a> {
    let fresh = || IndexMappingBuffer::new(settings);
    if from.len() != to.len() {
        trace!("bijection between {} and {} factors", from.len(), to.len());
        return empty();
    }
    match from.len() {
        0 => return singleton(fresh()),
        1 => return create_provider(singleton(fresh()), &from[0], &to[0], settings),
        _ => {}
    }

    from.iter()
        .zip(to)
        .fold(singleton(fresh()), |provider, (f, t)| {
            let port = MappingsPort::new(create_provider(singleton(fresh()), f, t, settings));
            HolderMerge::boxed(provider, CachedHolders::new(port), settings)
        })
}
