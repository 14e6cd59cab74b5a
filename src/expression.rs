//! Immutable, structurally shared expression trees.
//!
//! This is the minimal tree model the mapping engine works on: constructors bring
//! products and sums into a canonical order (children sorted by structural hash) and
//! fold numeric factors, nothing more.

use std::{hash::Hash, ops::Range, sync::Arc};

use ahash::{AHashMap, AHashSet};
use num::{BigInt, BigRational, One, Zero};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::structure::{
    free_of, parse_indices, Index, IndexError, IndexId, Symmetries, Symmetry, SymmetryError,
};

mod display;

/// Exact complex rational numbers.
pub type Number = num::Complex<BigRational>;

static HASH_STATE: Lazy<ahash::RandomState> = Lazy::new(|| {
    ahash::RandomState::with_seeds(
        0x243f_6a88_85a3_08d3,
        0x1319_8a2e_0370_7344,
        0xa409_3822_299f_31d0,
        0x082e_fa98_ec4e_6c89,
    )
});

fn structural_hash<T: Hash>(value: T) -> u64 {
    HASH_STATE.hash_one(value)
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Symmetry(#[from] SymmetryError),
    #[error("Tensor {0} has rank {1}, got {2} indices")]
    WrongRank(String, usize, usize),
    #[error("Index {0} occurs inconsistently in {1}")]
    InconsistentIndices(IndexId, String),
    #[error("Sum terms {0} and {1} have different free indices")]
    InconsistentSum(String, String),
    #[error("{0} must be scalar")]
    NotScalar(String),
}

/// Name, rank and slot symmetries shared by all tensors of one kind.
///
/// Heads compare by name and rank only.
#[derive(Debug, Clone)]
pub struct TensorHead {
    name: Arc<str>,
    symmetries: Arc<Symmetries>,
}

impl PartialEq for TensorHead {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.rank() == other.rank()
    }
}

impl Eq for TensorHead {}

impl TensorHead {
    pub fn new(name: &str, rank: usize) -> Self {
        TensorHead {
            name: name.into(),
            symmetries: Arc::new(Symmetries::trivial(rank)),
        }
    }

    /// Declares a symmetry generator; tensors built afterwards carry the enlarged group.
    pub fn add_symmetry(
        &mut self,
        map: Vec<usize>,
        antisymmetric: bool,
    ) -> Result<(), SymmetryError> {
        let symmetry = Symmetry::new(map, antisymmetric)?;
        Arc::make_mut(&mut self.symmetries).add(symmetry)
    }

    pub fn with_symmetry(
        mut self,
        map: Vec<usize>,
        antisymmetric: bool,
    ) -> Result<Self, SymmetryError> {
        self.add_symmetry(map, antisymmetric)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rank(&self) -> usize {
        self.symmetries.dimension()
    }

    pub fn symmetries(&self) -> &Symmetries {
        &self.symmetries
    }

    fn check(&self, indices: &[Index]) -> Result<(), ExpressionError> {
        if indices.len() != self.rank() {
            return Err(ExpressionError::WrongRank(
                self.name.to_string(),
                self.rank(),
                indices.len(),
            ));
        }
        let types: Vec<_> = indices.iter().map(|i| i.index_type()).collect();
        self.symmetries.check_types(&types)?;
        check_indices(indices, &self.name)
    }

    /// A simple tensor with indices in notation, e.g. `head.tensor("_mn^a")`.
    pub fn tensor(&self, notation: &str) -> Result<Expr, ExpressionError> {
        self.tensor_from(parse_indices(notation)?)
    }

    pub fn tensor_from(&self, indices: Vec<Index>) -> Result<Expr, ExpressionError> {
        self.check(&indices)?;
        Ok(Expr::from_node(Node::Simple(SimpleTensor {
            head: self.clone(),
            indices,
        })))
    }

    pub fn field(
        &self,
        notation: &str,
        args: impl IntoIterator<Item = Expr>,
    ) -> Result<Expr, ExpressionError> {
        self.field_from(parse_indices(notation)?, args)
    }

    pub fn field_from(
        &self,
        indices: Vec<Index>,
        args: impl IntoIterator<Item = Expr>,
    ) -> Result<Expr, ExpressionError> {
        self.check(&indices)?;
        Ok(Expr::from_node(Node::Field(TensorField {
            head: self.clone(),
            indices,
            args: args.into_iter().collect(),
        })))
    }
}

fn check_indices(indices: &[Index], context: &str) -> Result<(), ExpressionError> {
    let mut seen: AHashMap<IndexId, u8> = AHashMap::new();
    for i in indices {
        let states = seen.entry(i.id).or_default();
        if *states & i.polarity.bit() != 0 {
            return Err(ExpressionError::InconsistentIndices(
                i.id,
                context.to_string(),
            ));
        }
        *states |= i.polarity.bit();
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleTensor {
    pub head: TensorHead,
    pub indices: Vec<Index>,
}

/// A tensor whose value depends on argument expressions, e.g. `F_m[x, A_a*B^a]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorField {
    pub head: TensorHead,
    pub indices: Vec<Index>,
    pub args: Vec<Expr>,
}

/// Product with its numeric coefficient split off; factors are sorted by hash.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub coefficient: Number,
    pub factors: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sum {
    pub terms: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Power {
    pub base: Expr,
    pub exponent: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionKind {
    Sin,
    Cos,
    Tan,
    Cot,
    ArcSin,
    ArcCos,
    ArcTan,
    ArcCot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    /// `f(-x) = -f(x)`
    Odd,
    /// `f(-x) = f(x)`
    Even,
}

impl FunctionKind {
    pub fn parity(self) -> Parity {
        match self {
            FunctionKind::Sin | FunctionKind::ArcSin | FunctionKind::Tan | FunctionKind::ArcTan => {
                Parity::Odd
            }
            FunctionKind::Cos
            | FunctionKind::ArcCos
            | FunctionKind::Cot
            | FunctionKind::ArcCot => Parity::Even,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FunctionKind::Sin => "Sin",
            FunctionKind::Cos => "Cos",
            FunctionKind::Tan => "Tan",
            FunctionKind::Cot => "Cot",
            FunctionKind::ArcSin => "ArcSin",
            FunctionKind::ArcCos => "ArcCos",
            FunctionKind::ArcTan => "ArcTan",
            FunctionKind::ArcCot => "ArcCot",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarFunction {
    pub kind: FunctionKind,
    pub argument: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Simple(SimpleTensor),
    Field(TensorField),
    Product(Product),
    Sum(Sum),
    Power(Power),
    Complex(Number),
    Function(ScalarFunction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    SimpleTensor,
    TensorField,
    Product,
    Sum,
    Power,
    Complex,
    Function,
}

struct ExprInner {
    hash: u64,
    node: Node,
}

/// A shared handle to an immutable expression node with its cached structural hash.
///
/// The hash ignores index names and polarities as well as product coefficients, so
/// trees that differ only by a renaming (or by a numeric factor) collide on purpose.
/// Equality is exact structural equality.
#[derive(Clone)]
pub struct Expr(Arc<ExprInner>);

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || (self.0.hash == other.0.hash && self.0.node == other.0.node)
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash.hash(state)
    }
}

impl Expr {
    fn from_node(node: Node) -> Expr {
        let types = |indices: &[Index]| indices.iter().map(|i| i.index_type()).collect::<Vec<_>>();
        let hash = match &node {
            Node::Simple(t) => structural_hash(("tensor", t.head.name(), types(&t.indices))),
            Node::Field(t) => structural_hash((
                "field",
                t.head.name(),
                types(&t.indices),
                t.args.iter().map(Expr::structural_hash).collect::<Vec<_>>(),
            )),
            Node::Product(p) if p.factors.len() == 1 => p.factors[0].structural_hash(),
            Node::Product(p) => structural_hash((
                "product",
                p.factors.iter().map(Expr::structural_hash).collect::<Vec<_>>(),
            )),
            Node::Sum(s) => structural_hash((
                "sum",
                s.terms.iter().map(Expr::structural_hash).collect::<Vec<_>>(),
            )),
            Node::Power(p) => structural_hash((
                "power",
                p.base.structural_hash(),
                p.exponent.structural_hash(),
            )),
            Node::Complex(n) => structural_hash(("number", n)),
            Node::Function(f) => structural_hash(("function", f.kind, f.argument.structural_hash())),
        };
        Expr(Arc::new(ExprInner { hash, node }))
    }

    pub fn node(&self) -> &Node {
        &self.0.node
    }

    pub fn structural_hash(&self) -> u64 {
        self.0.hash
    }

    pub fn kind(&self) -> NodeKind {
        match self.node() {
            Node::Simple(_) => NodeKind::SimpleTensor,
            Node::Field(_) => NodeKind::TensorField,
            Node::Product(_) => NodeKind::Product,
            Node::Sum(_) => NodeKind::Sum,
            Node::Power(_) => NodeKind::Power,
            Node::Complex(_) => NodeKind::Complex,
            Node::Function(_) => NodeKind::Function,
        }
    }

    pub fn number(value: Number) -> Expr {
        Expr::from_node(Node::Complex(value))
    }

    pub fn integer(value: i64) -> Expr {
        Expr::rational(value, 1)
    }

    /// `numerator / denominator`; panics on a zero denominator like [`BigRational::new`].
    pub fn rational(numerator: i64, denominator: i64) -> Expr {
        Expr::number(Number::new(
            BigRational::new(BigInt::from(numerator), BigInt::from(denominator)),
            BigRational::zero(),
        ))
    }

    pub fn zero() -> Expr {
        Expr::integer(0)
    }

    pub fn product(factors: impl IntoIterator<Item = Expr>) -> Result<Expr, ExpressionError> {
        let mut coefficient = Number::one();
        let mut flat = Vec::new();
        for f in factors {
            match f.node() {
                Node::Complex(n) => coefficient = coefficient * n.clone(),
                Node::Product(p) => {
                    coefficient = coefficient * p.coefficient.clone();
                    flat.extend(p.factors.iter().cloned());
                }
                _ => flat.push(f),
            }
        }
        if coefficient.is_zero() {
            return Ok(Expr::zero());
        }
        let mut occurring = Vec::new();
        flat.iter().for_each(|f| f.collect_occurrences(&mut occurring));
        check_indices(&occurring, "product")?;
        flat.sort_by_key(Expr::structural_hash);
        Ok(match flat.len() {
            0 => Expr::number(coefficient),
            1 if coefficient.is_one() => flat.remove(0),
            _ => Expr::from_node(Node::Product(Product {
                coefficient,
                factors: flat,
            })),
        })
    }

    pub fn sum(terms: impl IntoIterator<Item = Expr>) -> Result<Expr, ExpressionError> {
        let mut flat = Vec::new();
        for t in terms {
            match t.node() {
                Node::Sum(s) => flat.extend(s.terms.iter().cloned()),
                Node::Complex(n) if n.is_zero() => {}
                _ => flat.push(t),
            }
        }
        if let Some(first) = flat.first() {
            let free = first.free_indices();
            if let Some(other) = flat.iter().find(|t| t.free_indices() != free) {
                return Err(ExpressionError::InconsistentSum(
                    first.to_string(),
                    other.to_string(),
                ));
            }
        }
        flat.sort_by_key(Expr::structural_hash);
        Ok(match flat.len() {
            0 => Expr::zero(),
            1 => flat.remove(0),
            _ => Expr::from_node(Node::Sum(Sum { terms: flat })),
        })
    }

    pub fn pow(base: Expr, exponent: Expr) -> Result<Expr, ExpressionError> {
        for e in [&base, &exponent] {
            if !e.is_scalar() {
                return Err(ExpressionError::NotScalar(e.to_string()));
            }
        }
        Ok(Expr::from_node(Node::Power(Power { base, exponent })))
    }

    pub fn function(kind: FunctionKind, argument: Expr) -> Result<Expr, ExpressionError> {
        if !argument.is_scalar() {
            return Err(ExpressionError::NotScalar(argument.to_string()));
        }
        Ok(Expr::from_node(Node::Function(ScalarFunction { kind, argument })))
    }

    /// `-self`, folding the sign into a number or product coefficient.
    pub fn neg(&self) -> Expr {
        match self.node() {
            Node::Complex(n) => Expr::number(-n.clone()),
            Node::Product(p) if p.factors.len() == 1 && p.coefficient == -Number::one() => {
                p.factors[0].clone()
            }
            Node::Product(p) => Expr::from_node(Node::Product(Product {
                coefficient: -p.coefficient.clone(),
                factors: p.factors.clone(),
            })),
            _ => Expr::from_node(Node::Product(Product {
                coefficient: -Number::one(),
                factors: vec![self.clone()],
            })),
        }
    }

    /// Every index occurrence in tensors, products and sums; scalar blocks (powers,
    /// functions, field arguments) are opaque.
    pub fn indices(&self) -> Vec<Index> {
        let mut out = Vec::new();
        self.collect_indices(&mut out);
        out
    }

    fn collect_indices(&self, out: &mut Vec<Index>) {
        match self.node() {
            Node::Simple(t) => out.extend_from_slice(&t.indices),
            Node::Field(t) => out.extend_from_slice(&t.indices),
            Node::Product(p) => p.factors.iter().for_each(|f| f.collect_indices(out)),
            Node::Sum(s) => s.terms.iter().for_each(|t| t.collect_indices(out)),
            Node::Power(_) | Node::Complex(_) | Node::Function(_) => {}
        }
    }

    /// Index occurrences visible to an enclosing product: every index of tensors and
    /// nested products, and for a sum its free indices plus both polarities of each
    /// dummy of its terms.
    fn collect_occurrences(&self, out: &mut Vec<Index>) {
        match self.node() {
            Node::Product(p) => p.factors.iter().for_each(|f| f.collect_occurrences(out)),
            Node::Sum(s) => {
                out.extend(self.free_indices());
                let mut dummies: Vec<IndexId> =
                    s.terms.iter().flat_map(Expr::dummy_ids).collect();
                dummies.sort_unstable();
                dummies.dedup();
                out.extend(
                    dummies
                        .into_iter()
                        .flat_map(|id| [Index::lower(id), Index::upper(id)]),
                );
            }
            _ => self.collect_indices(out),
        }
    }

    /// Free indices, sorted.
    pub fn free_indices(&self) -> Vec<Index> {
        match self.node() {
            Node::Simple(t) => free_of(&t.indices),
            Node::Field(t) => free_of(&t.indices),
            Node::Product(p) => {
                let all: Vec<Index> = p.factors.iter().flat_map(Expr::free_indices).collect();
                free_of(&all)
            }
            Node::Sum(s) => s.terms.first().map(Expr::free_indices).unwrap_or_default(),
            Node::Power(_) | Node::Complex(_) | Node::Function(_) => Vec::new(),
        }
    }

    /// Ids that occur with both polarities somewhere in `self`.
    pub fn dummy_ids(&self) -> AHashSet<IndexId> {
        crate::structure::contracted_ids(&self.indices())
    }

    pub fn is_scalar(&self) -> bool {
        self.free_indices().is_empty()
    }

    /// Rebuilds `self` with every index passed through `f`, through the validating
    /// constructors.
    pub fn map_indices(&self, f: &impl Fn(Index) -> Index) -> Result<Expr, ExpressionError> {
        match self.node() {
            Node::Simple(t) => t.head.tensor_from(t.indices.iter().map(|&i| f(i)).collect()),
            Node::Field(t) => t
                .head
                .field_from(t.indices.iter().map(|&i| f(i)).collect(), t.args.clone()),
            Node::Product(p) => {
                let factors = p
                    .factors
                    .iter()
                    .map(|x| x.map_indices(f))
                    .collect::<Result<Vec<_>, _>>()?;
                Expr::product(std::iter::once(Expr::number(p.coefficient.clone())).chain(factors))
            }
            Node::Sum(s) => Expr::sum(
                s.terms
                    .iter()
                    .map(|x| x.map_indices(f))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Node::Power(_) | Node::Complex(_) | Node::Function(_) => Ok(self.clone()),
        }
    }
}

/// Maximal runs of equal structural hash in a hash-sorted child list.
pub fn stretches(children: &[Expr]) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut begin = 0;
    for i in 1..=children.len() {
        if i == children.len()
            || children[i].structural_hash() != children[i - 1].structural_hash()
        {
            out.push(begin..i);
            begin = i;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(name: &str, rank: usize) -> TensorHead {
        TensorHead::new(name, rank)
    }

    #[test]
    fn hash_ignores_index_names() {
        let a = head("A", 2);
        let amn = a.tensor("_mn").unwrap();
        let acd = a.tensor("^cd").unwrap();
        assert_eq!(amn.structural_hash(), acd.structural_hash());
        assert_ne!(amn, acd);
        assert_ne!(
            amn.structural_hash(),
            head("B", 2).tensor("_mn").unwrap().structural_hash()
        );
    }

    #[test]
    fn negation_keeps_hash() {
        let g = head("g", 2).tensor("_mn").unwrap();
        let minus = g.neg();
        assert_eq!(minus.kind(), NodeKind::Product);
        assert_eq!(minus.structural_hash(), g.structural_hash());
        assert_eq!(minus.neg(), g);
    }

    #[test]
    fn product_is_canonical() {
        let a = head("A", 1).tensor("_a").unwrap();
        let b = head("B", 1).tensor("_b").unwrap();
        let ab = Expr::product([a.clone(), b.clone()]).unwrap();
        let ba = Expr::product([b.clone(), Expr::integer(1), a.clone()]).unwrap();
        assert_eq!(ab, ba);
        let nested = Expr::product([Expr::integer(2), ab.clone()]).unwrap();
        let Node::Product(p) = nested.node() else {
            panic!("expected a product, got {nested}");
        };
        assert_eq!(p.factors.len(), 2);
        assert_eq!(p.coefficient, Number::new(BigRational::from_integer(2.into()), BigRational::zero()));
        assert_eq!(Expr::product([a.clone()]).unwrap(), a);
        assert_eq!(Expr::product([Expr::integer(0), a]).unwrap(), Expr::zero());
    }

    #[test]
    fn product_rejects_repeated_indices() {
        let a = head("A", 1).tensor("_a").unwrap();
        let b = head("B", 1).tensor("_a").unwrap();
        assert!(matches!(
            Expr::product([a.clone(), b]),
            Err(ExpressionError::InconsistentIndices(..))
        ));
        let c = head("C", 1).tensor("^a").unwrap();
        let ac = Expr::product([a, c]).unwrap();
        assert!(ac.is_scalar());
        assert_eq!(ac.dummy_ids().len(), 1);
    }

    #[test]
    fn product_rejects_reused_dummies() {
        let a = head("A", 2).tensor("_m^m").unwrap();
        let b = head("B", 2).tensor("_m^m").unwrap();
        assert!(matches!(
            Expr::product([a.clone(), b.clone()]),
            Err(ExpressionError::InconsistentIndices(..))
        ));
        let c = head("C", 1).tensor("_m").unwrap();
        assert!(Expr::product([a.clone(), c]).is_err());

        let bn = head("B", 2).tensor("_n^n").unwrap();
        let ab = Expr::product([a.clone(), bn]).unwrap();
        assert_eq!(ab.dummy_ids().len(), 2);
        // a dummy hidden inside a sum still clashes with an outer factor
        let inner = Expr::sum([b, head("D", 0).tensor("").unwrap()]).unwrap();
        assert!(Expr::product([a, inner]).is_err());
    }

    #[test]
    fn sum_checks_free_indices() {
        let c = head("C", 2).tensor("_mn").unwrap();
        let d = head("D", 2).tensor("_nm").unwrap();
        let s = Expr::sum([c.clone(), d]).unwrap();
        assert_eq!(s.kind(), NodeKind::Sum);
        assert_eq!(s.free_indices(), c.free_indices());
        let e = head("E", 2).tensor("_mk").unwrap();
        assert!(matches!(
            Expr::sum([c.clone(), e]),
            Err(ExpressionError::InconsistentSum(..))
        ));
        assert_eq!(Expr::sum([c.clone(), Expr::zero()]).unwrap(), c);
    }

    #[test]
    fn scalar_blocks() {
        let v = head("V", 1);
        let x = Expr::product([v.tensor("_a").unwrap(), v.tensor("^a").unwrap()]).unwrap();
        assert!(Expr::pow(x.clone(), Expr::integer(2)).is_ok());
        assert!(Expr::function(FunctionKind::Sin, x).is_ok());
        assert!(matches!(
            Expr::function(FunctionKind::Cos, v.tensor("_a").unwrap()),
            Err(ExpressionError::NotScalar(_))
        ));
    }

    #[test]
    fn rank_and_symmetry_validation() {
        let a = head("A", 2);
        assert!(matches!(
            a.tensor("_m"),
            Err(ExpressionError::WrongRank(_, 2, 1))
        ));
        let s = head("S", 2).with_symmetry(vec![1, 0], false).unwrap();
        assert!(matches!(
            s.tensor("_mA"),
            Err(ExpressionError::Symmetry(SymmetryError::MixedTypes(..)))
        ));
        assert!(a.tensor("_m^m").is_ok());
        assert!(a.tensor("_mm").is_err());
    }

    #[test]
    fn stretch_boundaries() {
        let a = head("A", 1);
        let b = head("B", 1);
        let factors = [
            a.tensor("_a").unwrap(),
            a.tensor("_b").unwrap(),
            b.tensor("_c").unwrap(),
        ];
        let product = Expr::product(factors).unwrap();
        let Node::Product(p) = product.node() else {
            panic!("expected a product");
        };
        let runs = stretches(&p.factors);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs.iter().map(|r| r.len()).sum::<usize>(), 3);
        assert!(stretches(&[]).is_empty());
    }

    #[test]
    fn renaming_rebuilds() {
        let a = head("A", 2).tensor("_m^n").unwrap();
        let target = parse_indices("_a").unwrap()[0].id;
        let renamed = a.map_indices(&|i| Index::new(target, i.polarity)).unwrap();
        assert_eq!(renamed, head("A", 2).tensor("_a^a").unwrap());
    }
}
