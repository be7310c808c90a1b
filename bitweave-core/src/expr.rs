//! Scalar expressions evaluated against a [`Resolver`].
//!
//! Expressions describe the parts of a schema that are only known at decode
//! time: field widths, list counts and selector conditions. An expression
//! without references is a constant and can be folded once, at schema build
//! time.

use std::fmt;

use crate::resolver::Resolver;
use crate::types::TypeTag;
use crate::value::Value;

/// Error type for expression evaluation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: TypeTag,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("arithmetic overflow")]
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// A scalar formula: integer arithmetic, comparisons and boolean logic over
/// constants and resolver references.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Bool(bool),
    /// Reference to a bound name; dots descend into record fields.
    Ref(String),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Not(Box<Expr>),
}

impl Expr {
    pub fn int(value: i64) -> Self {
        Expr::Int(value)
    }

    pub fn reference(path: impl Into<String>) -> Self {
        Expr::Ref(path.into())
    }

    /// Combines two operands, folding them right away when neither depends
    /// on the resolver.
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        let expr = Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        };
        if expr.is_parameterized() {
            return expr;
        }
        // Evaluation errors (division by zero, overflow) are kept in the tree
        // so they surface at evaluation time.
        match expr.eval(&Resolver::new()) {
            Ok(Value::Int(v)) => Expr::Int(v),
            Ok(Value::Bool(b)) => Expr::Bool(b),
            _ => expr,
        }
    }

    pub fn add(self, rhs: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::Add, self, rhs.into())
    }

    pub fn sub(self, rhs: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::Sub, self, rhs.into())
    }

    pub fn mul(self, rhs: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::Mul, self, rhs.into())
    }

    pub fn div(self, rhs: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::Div, self, rhs.into())
    }

    pub fn rem(self, rhs: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::Rem, self, rhs.into())
    }

    pub fn equals(self, rhs: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::Eq, self, rhs.into())
    }

    pub fn not_equals(self, rhs: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::Ne, self, rhs.into())
    }

    pub fn lt(self, rhs: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::Lt, self, rhs.into())
    }

    pub fn le(self, rhs: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::Le, self, rhs.into())
    }

    pub fn gt(self, rhs: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::Gt, self, rhs.into())
    }

    pub fn ge(self, rhs: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::Ge, self, rhs.into())
    }

    pub fn and(self, rhs: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::And, self, rhs.into())
    }

    pub fn or(self, rhs: impl Into<Expr>) -> Self {
        Expr::binary(BinaryOp::Or, self, rhs.into())
    }

    pub fn not(self) -> Self {
        match self {
            Expr::Bool(b) => Expr::Bool(!b),
            other => Expr::Not(Box::new(other)),
        }
    }

    /// True iff evaluation needs live resolver data.
    pub fn is_parameterized(&self) -> bool {
        match self {
            Expr::Int(_) | Expr::Bool(_) => false,
            Expr::Ref(_) => true,
            Expr::Binary { lhs, rhs, .. } => lhs.is_parameterized() || rhs.is_parameterized(),
            Expr::Not(inner) => inner.is_parameterized(),
        }
    }

    /// Folds a non-parameterized integer expression.
    pub fn constant(&self) -> Option<i64> {
        if self.is_parameterized() {
            return None;
        }
        self.eval_int(&Resolver::new()).ok()
    }

    /// Every reference path in the formula, in order of appearance.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Int(_) | Expr::Bool(_) => {}
            Expr::Ref(path) => out.push(path),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_references(out);
                rhs.collect_references(out);
            }
            Expr::Not(inner) => inner.collect_references(out),
        }
    }

    /// Evaluates to a scalar: always `Value::Int` or `Value::Bool`.
    pub fn eval(&self, resolver: &Resolver<'_>) -> Result<Value, ExprError> {
        match self {
            Expr::Int(v) => Ok(Value::Int(*v)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Ref(path) => {
                let value = resolver
                    .lookup(path)
                    .ok_or_else(|| ExprError::UnresolvedReference(path.clone()))?;
                match value {
                    Value::Bool(b) => Ok(Value::Bool(*b)),
                    Value::Int(v) => Ok(Value::Int(*v)),
                    Value::UInt(v) => i64::try_from(*v)
                        .map(Value::Int)
                        .map_err(|_| ExprError::Overflow),
                    other => Err(ExprError::TypeMismatch {
                        expected: "scalar",
                        found: other.type_tag(),
                    }),
                }
            }
            Expr::Not(inner) => Ok(Value::Bool(!inner.eval_bool(resolver)?)),
            Expr::Binary { op, lhs, rhs } => eval_binary(*op, lhs, rhs, resolver),
        }
    }

    pub fn eval_int(&self, resolver: &Resolver<'_>) -> Result<i64, ExprError> {
        match self.eval(resolver)? {
            Value::Int(v) => Ok(v),
            other => Err(ExprError::TypeMismatch {
                expected: "integer",
                found: other.type_tag(),
            }),
        }
    }

    pub fn eval_bool(&self, resolver: &Resolver<'_>) -> Result<bool, ExprError> {
        match self.eval(resolver)? {
            Value::Bool(b) => Ok(b),
            other => Err(ExprError::TypeMismatch {
                expected: "boolean",
                found: other.type_tag(),
            }),
        }
    }
}

fn eval_binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    resolver: &Resolver<'_>,
) -> Result<Value, ExprError> {
    match op {
        BinaryOp::And => {
            Ok(Value::Bool(lhs.eval_bool(resolver)? && rhs.eval_bool(resolver)?))
        }
        BinaryOp::Or => Ok(Value::Bool(lhs.eval_bool(resolver)? || rhs.eval_bool(resolver)?)),
        BinaryOp::Eq | BinaryOp::Ne => {
            let equal = match (lhs.eval(resolver)?, rhs.eval(resolver)?) {
                (Value::Int(a), Value::Int(b)) => a == b,
                (Value::Bool(a), Value::Bool(b)) => a == b,
                (a, _) => {
                    return Err(ExprError::TypeMismatch {
                        expected: "operands of the same type",
                        found: a.type_tag(),
                    });
                }
            };
            Ok(Value::Bool(if op == BinaryOp::Eq { equal } else { !equal }))
        }
        BinaryOp::Add => int_op(lhs, rhs, resolver, |a, b| checked(a.checked_add(b))),
        BinaryOp::Sub => int_op(lhs, rhs, resolver, |a, b| checked(a.checked_sub(b))),
        BinaryOp::Mul => int_op(lhs, rhs, resolver, |a, b| checked(a.checked_mul(b))),
        BinaryOp::Div => int_op(lhs, rhs, resolver, |a, b| match b {
            0 => Err(ExprError::DivisionByZero),
            _ => checked(a.checked_div(b)),
        }),
        BinaryOp::Rem => int_op(lhs, rhs, resolver, |a, b| match b {
            0 => Err(ExprError::DivisionByZero),
            _ => checked(a.checked_rem(b)),
        }),
        BinaryOp::Lt => int_op(lhs, rhs, resolver, |a, b| Ok(Value::Bool(a < b))),
        BinaryOp::Le => int_op(lhs, rhs, resolver, |a, b| Ok(Value::Bool(a <= b))),
        BinaryOp::Gt => int_op(lhs, rhs, resolver, |a, b| Ok(Value::Bool(a > b))),
        BinaryOp::Ge => int_op(lhs, rhs, resolver, |a, b| Ok(Value::Bool(a >= b))),
    }
}

fn int_op(
    lhs: &Expr,
    rhs: &Expr,
    resolver: &Resolver<'_>,
    op: impl FnOnce(i64, i64) -> Result<Value, ExprError>,
) -> Result<Value, ExprError> {
    op(lhs.eval_int(resolver)?, rhs.eval_int(resolver)?)
}

fn checked(result: Option<i64>) -> Result<Value, ExprError> {
    result.map(Value::Int).ok_or(ExprError::Overflow)
}

impl From<i64> for Expr {
    fn from(v: i64) -> Self {
        Expr::Int(v)
    }
}

impl From<i32> for Expr {
    fn from(v: i32) -> Self {
        Expr::Int(v as i64)
    }
}

impl From<bool> for Expr {
    fn from(v: bool) -> Self {
        Expr::Bool(v)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(v) => write!(f, "{}", v),
            Expr::Bool(b) => write!(f, "{}", b),
            Expr::Ref(path) => f.write_str(path),
            Expr::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Expr::Not(inner) => write!(f, "!{}", inner),
        }
    }
}
