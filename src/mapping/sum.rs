use std::{ops::Range, sync::Arc};

use ahash::AHashSet;
use log::trace;

use super::{
    buffer::IndexMappingBuffer,
    create_provider,
    holder::FromToHolder,
    provider::{empty, singleton, BoxedProvider, MappingProvider, MappingsPort, Register},
};
use crate::{
    expression::{stretches, Expr, Sum},
    permutation::{IntPermutations, Permutation, PriorityPermutations},
    settings::MappingSettings,
    structure::IndexId,
};

/// Whether `from → to` admits a mapping consistent with `frozen` whose sign is `sign`.
fn admits(
    frozen: &Arc<FromToHolder>,
    from: &Expr,
    to: &Expr,
    sign: bool,
    settings: MappingSettings,
) -> bool {
    let seed = IndexMappingBuffer::tester(frozen.clone(), settings);
    MappingsPort::new(create_provider(singleton(seed), from, to, settings))
        .any(|b| b.sign() == sign)
}

/// Checks the terms outside the driving stretch against a candidate.
enum Tester<'a> {
    Single {
        from: &'a Expr,
        to: &'a Expr,
    },
    Stretch {
        from: &'a [Expr],
        to: &'a [Expr],
        permutations: PriorityPermutations,
    },
}

impl Tester<'_> {
    fn test(&mut self, frozen: &Arc<FromToHolder>, sign: bool, settings: MappingSettings) -> bool {
        match self {
            Tester::Single { from, to } => admits(frozen, *from, *to, sign, settings),
            Tester::Stretch {
                from,
                to,
                permutations,
            } => {
                permutations.reset();
                while let Some(p) = permutations.next() {
                    let map = p.map();
                    if (0..from.len()).all(|i| admits(frozen, &from[i], &to[map[i]], sign, settings)) {
                        permutations.prefer_last();
                        return true;
                    }
                }
                false
            }
        }
    }
}

/// Matches sums term by term.
///
/// The shortest stretch of equal-hash terms drives the search: its first term is
/// matched against every member of the target stretch, and each resulting candidate
/// is kept only if all other terms can be matched consistently with it and with the
/// same sign.
pub(crate) struct SumProvider<'a> {
    register: Register<'a>,
    from: &'a [Expr],
    to: &'a [Expr],
    driver: Range<usize>,
    lead_dummies: AHashSet<IndexId>,
    permutations: IntPermutations,
    permutation: Option<Permutation>,
    source: Option<MappingsPort<'a>>,
    testers: Vec<Tester<'a>>,
    settings: MappingSettings,
}

impl<'a> SumProvider<'a> {
    fn new(
        upstream: BoxedProvider<'a>,
        from: &'a [Expr],
        to: &'a [Expr],
        settings: MappingSettings,
    ) -> Self {
        let runs = stretches(from);
        // first of the shortest
        let driver = runs
            .iter()
            .min_by_key(|r| r.len())
            .cloned()
            .unwrap_or(0..0);
        let testers = runs
            .into_iter()
            .filter(|r| *r != driver)
            .map(|r| {
                if r.len() == 1 {
                    Tester::Single {
                        from: &from[r.start],
                        to: &to[r.start],
                    }
                } else {
                    Tester::Stretch {
                        permutations: PriorityPermutations::new(r.len()),
                        from: &from[r.clone()],
                        to: &to[r],
                    }
                }
            })
            .collect();
        SumProvider {
            register: Register::new(upstream),
            lead_dummies: from
                .get(driver.start)
                .map(Expr::dummy_ids)
                .unwrap_or_default(),
            permutations: IntPermutations::new(driver.len()),
            from,
            to,
            driver,
            permutation: None,
            source: None,
            testers,
            settings,
        }
    }

    fn next_candidate(&mut self) -> Option<IndexMappingBuffer> {
        loop {
            if let Some(buffer) = self.source.as_mut().and_then(MappingsPort::take) {
                return Some(buffer);
            }
            let current = self.register.current.as_ref()?;
            let permutation = self.permutations.next()?;
            let lead = &self.from[self.driver.start];
            let target = &self.to[self.driver.start + permutation.map()[0]];
            self.source = Some(MappingsPort::new(create_provider(
                singleton(current.clone()),
                lead,
                target,
                self.settings,
            )));
            self.permutation = Some(permutation);
        }
    }

    fn accepts(&mut self, candidate: &IndexMappingBuffer, sign: bool) -> bool {
        let frozen = Arc::new(candidate.export().without(&self.lead_dummies));
        let settings = self.settings;
        let rest_of_driver = self.permutation.as_ref().map_or(true, |p| {
            (1..self.driver.len()).all(|i| {
                admits(
                    &frozen,
                    &self.from[self.driver.start + i],
                    &self.to[self.driver.start + p.map()[i]],
                    sign,
                    settings,
                )
            })
        });
        rest_of_driver
            && self
                .testers
                .iter_mut()
                .all(|t| t.test(&frozen, sign, settings))
    }
}

impl MappingProvider for SumProvider<'_> {
    fn prepare(&mut self) -> bool {
        self.permutations.reset();
        self.permutation = None;
        self.source = None;
        self.register.pull()
    }

    fn take(&mut self) -> Option<IndexMappingBuffer> {
        let seed_sign = self.register.current.as_ref()?.sign();
        loop {
            let candidate = self.next_candidate()?;
            let term_sign = candidate.sign() ^ seed_sign;
            if self.accepts(&candidate, term_sign) {
                return Some(candidate);
            }
            trace!("sum candidate {candidate} rejected");
        }
    }
}

pub(crate) fn sum<'a>(
    upstream: BoxedProvider<'a>,
    from: &'a Sum,
    to: &'a Sum,
    settings: MappingSettings,
) -> BoxedProvider<'a> {
    if from.terms.len() != to.terms.len()
        || from
            .terms
            .iter()
            .zip(&to.terms)
            .any(|(f, t)| f.structural_hash() != t.structural_hash())
    {
        return empty();
    }
    Box::new(SumProvider::new(upstream, &from.terms, &to.terms, settings))
}

#[cfg(test)]
mod tests {
    use crate::{
        expression::{Expr, TensorHead},
        mapping::{all, first, positive_exists},
    };

    #[test]
    fn term_order_does_not_matter() {
        let a = TensorHead::new("A", 2);
        let b = TensorHead::new("B", 2);
        let from = Expr::sum([a.tensor("_mn").unwrap(), b.tensor("_mn").unwrap()]).unwrap();
        let to = Expr::sum([b.tensor("_ab").unwrap(), a.tensor("_ab").unwrap()]).unwrap();
        let found = all(&from, &to);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].to_string(), "{m→a, n→b}");
    }

    #[test]
    fn terms_must_agree_on_the_mapping() {
        let a = TensorHead::new("A", 2);
        let b = TensorHead::new("B", 2);
        let from = Expr::sum([a.tensor("_mn").unwrap(), b.tensor("_mn").unwrap()]).unwrap();
        let to = Expr::sum([a.tensor("_ab").unwrap(), b.tensor("_ba").unwrap()]).unwrap();
        assert!(first(&from, &to).is_none());
    }

    #[test]
    fn terms_must_agree_on_the_sign() {
        let f = TensorHead::new("F", 2).with_symmetry(vec![1, 0], true).unwrap();
        let g = TensorHead::new("G", 2).with_symmetry(vec![1, 0], true).unwrap();
        let from = Expr::sum([f.tensor("_mn").unwrap(), g.tensor("_mn").unwrap()]).unwrap();
        let to = Expr::sum([f.tensor("_ab").unwrap(), g.tensor("_ba").unwrap()]).unwrap();
        // F_ab + G_ba = F_ab - G_ab has no common sign
        assert!(first(&from, &to).is_none());

        let swapped =
            Expr::sum([f.tensor("_ba").unwrap(), g.tensor("_ba").unwrap()]).unwrap();
        let found = all(&from, &swapped);
        assert_eq!(found.len(), 2);
        assert!(found.iter().any(|b| b.sign()));
        assert!(positive_exists(&from, &swapped));
    }

    #[test]
    fn equal_terms_are_permuted() {
        let v = TensorHead::new("V", 2);
        let w = TensorHead::new("W", 1);
        let from = Expr::sum([
            v.tensor("_mn").unwrap(),
            v.tensor("_nm").unwrap(),
            Expr::product([w.tensor("_m").unwrap(), w.tensor("_n").unwrap()]).unwrap(),
        ])
        .unwrap();
        let to = Expr::sum([
            v.tensor("_ba").unwrap(),
            v.tensor("_ab").unwrap(),
            Expr::product([w.tensor("_a").unwrap(), w.tensor("_b").unwrap()]).unwrap(),
        ])
        .unwrap();
        let found = all(&from, &to);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|b| !b.sign()));
    }

    #[test]
    fn every_member_of_a_tester_stretch_is_checked() {
        let v = TensorHead::new("V", 2);
        let w = TensorHead::new("W", 2);
        let from = Expr::sum([
            w.tensor("_mn").unwrap(),
            v.tensor("_mn").unwrap(),
            v.tensor("_nm").unwrap(),
        ])
        .unwrap();
        let to = Expr::sum([
            w.tensor("_ab").unwrap(),
            v.tensor("_ab").unwrap(),
            v.tensor("_ab").unwrap().neg(),
        ])
        .unwrap();
        // V_mn matches V_ab, but V_nm cannot match -V_ab under the same mapping
        assert!(first(&from, &to).is_none());
    }
}
