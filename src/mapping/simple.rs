use log::trace;

use super::{
    buffer::IndexMappingBuffer,
    provider::{empty, BoxedProvider, MappingProvider, Register},
    IndexMappings,
};
use crate::{
    expression::{SimpleTensor, TensorField, TensorHead},
    settings::MappingSettings,
    structure::Index,
};

/// Tries every element of the slot symmetry group of `from`, identity first.
///
/// Element `s` maps `from[s(i)] → to[i]` and contributes its sign. A head without
/// indices or with a trivial group yields at most one buffer per upstream buffer.
pub(crate) struct SlotMatcher<'a> {
    register: Register<'a>,
    head: &'a TensorHead,
    from: &'a [Index],
    to: &'a [Index],
    cursor: usize,
}

impl<'a> SlotMatcher<'a> {
    fn boxed(
        upstream: BoxedProvider<'a>,
        head: &'a TensorHead,
        from: &'a [Index],
        to: &'a [Index],
    ) -> BoxedProvider<'a> {
        Box::new(SlotMatcher {
            register: Register::new(upstream),
            head,
            from,
            to,
            cursor: 0,
        })
    }
}

impl MappingProvider for SlotMatcher<'_> {
    fn prepare(&mut self) -> bool {
        self.cursor = 0;
        self.register.pull()
    }

    fn take(&mut self) -> Option<IndexMappingBuffer> {
        let current = self.register.current.as_ref()?;
        let symmetries = self.head.symmetries();
        while let Some(element) = symmetries.elements().get(self.cursor) {
            self.cursor += 1;
            debug_assert!(symmetries.respects_diff_ids(&element.permutation));
            let mut buffer = current.clone();
            let map = element.permutation.map();
            if (0..self.to.len()).all(|i| buffer.try_map(self.from[map[i]], self.to[i])) {
                buffer.add_sign(element.antisymmetric);
                return Some(buffer);
            }
        }
        None
    }
}

fn same_head(from: &TensorHead, to: &TensorHead, from_len: usize, to_len: usize) -> bool {
    from == to && from_len == to_len
}

pub(crate) fn simple_tensor<'a>(
    upstream: BoxedProvider<'a>,
    from: &'a SimpleTensor,
    to: &'a SimpleTensor,
) -> BoxedProvider<'a> {
    if !same_head(&from.head, &to.head, from.indices.len(), to.indices.len()) {
        trace!("heads of {} and {} differ", from.head.name(), to.head.name());
        return empty();
    }
    SlotMatcher::boxed(upstream, &from.head, &from.indices, &to.indices)
}

/// Like [`simple_tensor`], after checking that every argument pair admits a mapping
/// with positive sign on its own.
pub(crate) fn tensor_field<'a>(
    upstream: BoxedProvider<'a>,
    from: &'a TensorField,
    to: &'a TensorField,
    settings: MappingSettings,
) -> BoxedProvider<'a> {
    if !same_head(&from.head, &to.head, from.indices.len(), to.indices.len())
        || from.args.len() != to.args.len()
    {
        return empty();
    }
    if settings.compare_field_arguments {
        let mappings = IndexMappings::new(settings);
        for (f, t) in from.args.iter().zip(&to.args) {
            if !mappings.positive_exists(f, t) {
                trace!("field arguments {f} and {t} do not match");
                return empty();
            }
        }
    }
    SlotMatcher::boxed(upstream, &from.head, &from.indices, &to.indices)
}

#[cfg(test)]
mod tests {
    use crate::{
        expression::{Expr, TensorHead},
        mapping::{all, first, positive_exists, simple_tensors_port, IndexMappings},
        settings::MappingSettings,
    };

    #[test]
    fn plain_tensor_maps_slotwise() {
        let a = TensorHead::new("A", 2);
        let from = a.tensor("_mn").unwrap();
        let to = a.tensor("_nm").unwrap();
        let found = all(&from, &to);
        assert_eq!(found.len(), 1);
        let b = found.first().unwrap();
        assert_eq!(b.to_string(), "{m→n, n→m}");
        assert!(!b.sign());
    }

    #[test]
    fn antisymmetric_tensor_picks_up_sign() {
        let f = TensorHead::new("F", 2).with_symmetry(vec![1, 0], true).unwrap();
        let from = f.tensor("_mn").unwrap();
        let to = f.tensor("_ab").unwrap();
        let found = all(&from, &to);
        assert_eq!(found.len(), 2);
        let signs: Vec<_> = found.iter().map(|b| b.sign()).collect();
        assert_eq!(signs, vec![false, true]);
        assert!(positive_exists(&from, &to));
    }

    #[test]
    fn heads_must_agree() {
        let from = TensorHead::new("A", 1).tensor("_m").unwrap();
        let to = TensorHead::new("B", 1).tensor("_m").unwrap();
        assert!(first(&from, &to).is_none());
    }

    #[test]
    fn scalar_tensor_passes_through() {
        let x = TensorHead::new("x", 0).tensor("").unwrap();
        let found = all(&x, &x);
        assert_eq!(found.len(), 1);
        assert!(found[0].is_empty());
    }

    #[test]
    fn field_arguments_are_compared() {
        let f = TensorHead::new("F", 1);
        let v = TensorHead::new("V", 1);
        let w = TensorHead::new("W", 1);
        let vv = Expr::product([v.tensor("_c").unwrap(), v.tensor("^c").unwrap()]).unwrap();
        let ww = Expr::product([w.tensor("_c").unwrap(), w.tensor("^c").unwrap()]).unwrap();
        let from = f.field("_m", [vv.clone()]).unwrap();
        let same = f.field("_a", [vv]).unwrap();
        let other = f.field("_a", [ww]).unwrap();
        assert!(first(&from, &same).is_some());
        assert!(first(&from, &other).is_none());

        let lenient = IndexMappings::new(MappingSettings {
            compare_field_arguments: false,
            ..Default::default()
        });
        // argument hashes still differ
        assert!(lenient.first(&from, &other).is_none());
        assert_eq!(simple_tensors_port(&from, &other).count(), 1);
        assert_eq!(lenient.simple_tensors_port(&from, &same).count(), 1);
    }
}
