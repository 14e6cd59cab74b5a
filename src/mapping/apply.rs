use super::buffer::IndexMappingBuffer;
use crate::{
    expression::{Expr, ExpressionError},
    structure::Index,
};

impl IndexMappingBuffer {
    /// Image of a single index; unmapped indices are kept.
    pub fn rename(&self, index: Index) -> Index {
        match self.get(index.id) {
            Some(record) if record.diff_states() => Index::new(record.to(), index.polarity.dual()),
            Some(record) => Index::new(record.to(), index.polarity),
            None => index,
        }
    }

    /// Renames the indices of `expr` according to this mapping.
    ///
    /// Records that flip polarity flip the renamed index too. The buffer's sign is
    /// not applied.
    pub fn apply(&self, expr: &Expr) -> Result<Expr, ExpressionError> {
        expr.map_indices(&|i| self.rename(i))
    }

    /// Like [`IndexMappingBuffer::apply`], then negated if the mapping carries a sign.
    pub fn apply_signed(&self, expr: &Expr) -> Result<Expr, ExpressionError> {
        let renamed = self.apply(expr)?;
        Ok(if self.sign() { renamed.neg() } else { renamed })
    }
}
