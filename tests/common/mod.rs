use mapenso::expression::{Expr, TensorHead};
use once_cell::sync::Lazy;

pub struct HeadLibrary {
    pub a: TensorHead,
    pub b: TensorHead,
    pub c: TensorHead,
    pub d: TensorHead,
    pub vector: TensorHead,
    /// Antisymmetric in its last two slots.
    pub g: TensorHead,
    pub metric: TensorHead,
}

pub static HEADS: Lazy<HeadLibrary> = Lazy::new(|| HeadLibrary {
    a: TensorHead::new("A", 2),
    b: TensorHead::new("B", 1),
    c: TensorHead::new("C", 2),
    d: TensorHead::new("D", 2),
    vector: TensorHead::new("A", 1),
    g: TensorHead::new("G", 3)
        .with_symmetry(vec![0, 2, 1], true)
        .unwrap(),
    metric: TensorHead::new("g", 2)
        .with_symmetry(vec![1, 0], false)
        .unwrap(),
});

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn t(head: &TensorHead, indices: &str) -> Expr {
    head.tensor(indices).unwrap()
}

pub fn product(factors: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::product(factors).unwrap()
}

pub fn sum(terms: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::sum(terms).unwrap()
}
