use std::fmt::{Debug, Display, Formatter, Result};

use num::{One, Signed, Zero};

use super::{Expr, Node, Number};
use crate::structure::index::write_indices;

fn write_number(f: &mut Formatter<'_>, n: &Number) -> Result {
    if n.im.is_zero() {
        write!(f, "{}", n.re)
    } else if n.re.is_zero() {
        write!(f, "{}*I", n.im)
    } else if n.im.is_negative() {
        write!(f, "({}-{}*I)", n.re, -n.im.clone())
    } else {
        write!(f, "({}+{}*I)", n.re, n.im)
    }
}

fn write_args(f: &mut Formatter<'_>, args: &[Expr]) -> Result {
    write!(f, "[")?;
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{a}")?;
    }
    write!(f, "]")
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self.node() {
            Node::Simple(t) => {
                write!(f, "{}", t.head.name())?;
                write_indices(f, &t.indices)
            }
            Node::Field(t) => {
                write!(f, "{}", t.head.name())?;
                write_indices(f, &t.indices)?;
                write_args(f, &t.args)
            }
            Node::Product(p) => {
                write!(f, "(")?;
                if p.coefficient == -Number::one() {
                    write!(f, "-")?;
                } else if !p.coefficient.is_one() {
                    write_number(f, &p.coefficient)?;
                    write!(f, "*")?;
                }
                for (i, factor) in p.factors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "*")?;
                    }
                    write!(f, "{factor}")?;
                }
                write!(f, ")")
            }
            Node::Sum(s) => {
                write!(f, "(")?;
                for (i, term) in s.terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " + ")?;
                    }
                    write!(f, "{term}")?;
                }
                write!(f, ")")
            }
            Node::Power(p) => write!(f, "Power[{}, {}]", p.base, p.exponent),
            Node::Complex(n) => write_number(f, n),
            Node::Function(func) => write!(f, "{}[{}]", func.kind.name(), func.argument),
        }
    }
}

impl Debug for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use crate::expression::{Expr, FunctionKind, TensorHead};

    #[test]
    fn readable_output() {
        let a = TensorHead::new("A", 2).tensor("_m^n").unwrap();
        assert_eq!(a.to_string(), "A_m^n");
        assert_eq!(a.neg().to_string(), "(-A_m^n)");
        let x = TensorHead::new("x", 0).tensor("").unwrap();
        let half = Expr::product([Expr::rational(1, 2), x.clone()]).unwrap();
        assert_eq!(half.to_string(), "(1/2*x)");
        let sin = Expr::function(FunctionKind::Sin, x).unwrap();
        assert_eq!(sin.to_string(), "Sin[x]");
        let f = TensorHead::new("F", 1)
            .field("_a", [Expr::integer(3), sin])
            .unwrap();
        assert_eq!(f.to_string(), "F_a[3, Sin[x]]");
    }
}
