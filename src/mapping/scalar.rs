//! Matchers for scalar blocks: powers, numbers and scalar functions.
//!
//! Their indices are all contracted, so sub-searches start from a fresh buffer and
//! only decide whether the current buffer passes.

use log::trace;

use super::{
    provider::{empty, BoxedProvider, Negating, PassThrough, PlusMinus},
    IndexMappings,
};
use crate::{
    expression::{Number, Parity, Power, ScalarFunction},
    settings::MappingSettings,
};

pub(crate) fn power<'a>(
    upstream: BoxedProvider<'a>,
    from: &'a Power,
    to: &'a Power,
    settings: MappingSettings,
) -> BoxedProvider<'a> {
    let mappings = IndexMappings::new(settings);
    if mappings.positive_exists(&from.base, &to.base)
        && mappings.positive_exists(&from.exponent, &to.exponent)
    {
        PassThrough::boxed(upstream)
    } else {
        empty()
    }
}

pub(crate) fn complex<'a>(
    upstream: BoxedProvider<'a>,
    from: &'a Number,
    to: &'a Number,
) -> BoxedProvider<'a> {
    if from == to {
        PassThrough::boxed(upstream)
    } else {
        empty()
    }
}

/// Odd functions pass the current buffer with the signs their argument mappings
/// carry, even functions pass it once if any argument mapping exists.
pub(crate) fn function<'a>(
    upstream: BoxedProvider<'a>,
    from: &'a ScalarFunction,
    to: &'a ScalarFunction,
    settings: MappingSettings,
) -> BoxedProvider<'a> {
    if from.kind != to.kind {
        return empty();
    }
    let mut port = IndexMappings::new(settings).port(&from.argument, &to.argument);
    match from.kind.parity() {
        Parity::Even => {
            if port.next().is_some() {
                PassThrough::boxed(upstream)
            } else {
                empty()
            }
        }
        Parity::Odd => {
            let (mut plus, mut minus) = (false, false);
            for b in port {
                if b.sign() {
                    minus = true;
                } else {
                    plus = true;
                }
                if plus && minus {
                    break;
                }
            }
            trace!("{} argument signs: plus {plus}, minus {minus}", from.kind.name());
            match (plus, minus) {
                (true, false) => PassThrough::boxed(upstream),
                (false, true) => Negating::boxed(PassThrough::boxed(upstream)),
                (true, true) => PlusMinus::boxed(upstream),
                (false, false) => empty(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        expression::{Expr, FunctionKind, TensorHead},
        mapping::{all, first},
    };

    fn contraction(name: &str) -> (TensorHead, Expr, Expr) {
        let f = TensorHead::new(name, 2).with_symmetry(vec![1, 0], true).unwrap();
        let v = TensorHead::new("v", 1);
        // F_ab v^a v^b style scalars with swapped slots
        let straight = Expr::product([
            f.tensor("_ab").unwrap(),
            v.tensor("^a").unwrap(),
            TensorHead::new("w", 1).tensor("^b").unwrap(),
        ])
        .unwrap();
        let swapped = Expr::product([
            f.tensor("_ba").unwrap(),
            v.tensor("^a").unwrap(),
            TensorHead::new("w", 1).tensor("^b").unwrap(),
        ])
        .unwrap();
        (f, straight, swapped)
    }

    #[test]
    fn odd_functions_carry_the_argument_sign() {
        let (_, x, minus_x) = contraction("F");
        let sin = Expr::function(FunctionKind::Sin, x.clone()).unwrap();
        let sin_minus = Expr::function(FunctionKind::Sin, minus_x.clone()).unwrap();
        let found = all(&sin, &sin_minus);
        assert_eq!(found.len(), 1);
        assert!(found[0].sign());
        assert!(!first(&sin, &sin).unwrap().sign());
    }

    #[test]
    fn even_functions_ignore_the_sign() {
        let (_, x, minus_x) = contraction("F");
        let cos = Expr::function(FunctionKind::Cos, x).unwrap();
        let cos_minus = Expr::function(FunctionKind::Cos, minus_x).unwrap();
        let found = all(&cos, &cos_minus);
        assert_eq!(found.len(), 1);
        assert!(!found[0].sign());
    }

    #[test]
    fn odd_function_with_both_signs() {
        let f = TensorHead::new("F", 2).with_symmetry(vec![1, 0], true).unwrap();
        let v = TensorHead::new("v", 1);
        // F_ab v^a v^b is its own negative, so both signs map
        let x = Expr::product([
            f.tensor("_ab").unwrap(),
            v.tensor("^a").unwrap(),
            v.tensor("^b").unwrap(),
        ])
        .unwrap();
        let tan = Expr::function(FunctionKind::Tan, x).unwrap();
        let signs: Vec<_> = all(&tan, &tan).iter().map(|b| b.sign()).collect();
        assert_eq!(signs, vec![false, true]);
    }

    #[test]
    fn function_kinds_must_agree() {
        let (_, x, _) = contraction("F");
        let sin = Expr::function(FunctionKind::Sin, x.clone()).unwrap();
        let arcsin = Expr::function(FunctionKind::ArcSin, x).unwrap();
        assert!(first(&sin, &arcsin).is_none());
    }

    #[test]
    fn powers_and_numbers() {
        let (_, x, minus_x) = contraction("F");
        let p = Expr::pow(x.clone(), Expr::integer(2)).unwrap();
        assert!(first(&p, &p).is_some());
        let q = Expr::pow(minus_x, Expr::integer(2)).unwrap();
        assert!(first(&p, &q).is_none());
        let r = Expr::pow(x, Expr::integer(3)).unwrap();
        assert!(first(&p, &r).is_none());
        assert!(first(&Expr::rational(1, 2), &Expr::rational(1, 2)).is_some());
        assert!(first(&Expr::rational(1, 2), &Expr::rational(1, 3)).is_none());
    }
}
