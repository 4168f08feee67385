use core::cmp::Ordering;
use std::fmt::Display;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::fault::Fault;
use crate::val::{RefVal, Val};

pub(crate) fn err_op<T: Display, R>(l: &Val, op: T, r: &Val) -> Result<R> {
    Err(Fault::AnalyzerDefect(format!(
        "invalid operation: '{}' {op} '{}'",
        l.ty(),
        r.ty()
    ))
    .into())
}

fn null_operand<T: Display, R>(op: T) -> Result<R> {
    Err(Fault::AnalyzerDefect(format!("operator {op} applied to null")).into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    #[serde(rename = "!")]
    Not,
    #[serde(rename = "-")]
    Neg,
}

impl UnaryOp {
    pub(crate) fn eval_val(&self, val: &Val) -> Result<Val> {
        if val.is_null() {
            return null_operand(self);
        }
        match (self, val) {
            (UnaryOp::Not, Val::Bool(b)) => Ok(Val::Bool(!b)),
            (UnaryOp::Neg, Val::Int(i)) => i
                .checked_neg()
                .map(Val::Int)
                .ok_or_else(|| Fault::Arithmetic("integer overflow").into()),
            (UnaryOp::Neg, Val::Float(f)) => Ok(Val::Float(-f)),
            _ => Err(Fault::AnalyzerDefect(format!("invalid operand: {self}'{}'", val.ty())).into()),
        }
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Not => write!(f, "!"),
            UnaryOp::Neg => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum BinOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
}

impl BinOp {
    pub fn is_arith(&self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod)
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne)
    }

    pub fn is_ordering(&self) -> bool {
        matches!(self, BinOp::Gt | BinOp::Lt | BinOp::Ge | BinOp::Le)
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    fn arith(&self, l: &Val, r: &Val) -> Result<Val> {
        match (l, r) {
            (Val::Int(a), Val::Int(b)) => self.int_arith(*a, *b),
            (Val::Int(_) | Val::Float(_), Val::Int(_) | Val::Float(_)) => {
                // Both sides are numeric here
                let (a, b) = (l.as_float().unwrap_or_default(), r.as_float().unwrap_or_default());
                self.float_arith(a, b)
            }
            (Val::Str(_), _) | (_, Val::Str(_)) if *self == BinOp::Add => {
                let mut s = String::new();
                s.push_str(&l.to_string());
                s.push_str(&r.to_string());
                Ok(Val::Str(Arc::from(s)))
            }
            _ => err_op(l, self, r),
        }
    }

    fn int_arith(&self, a: i64, b: i64) -> Result<Val> {
        let res = match self {
            BinOp::Add => a.checked_add(b),
            BinOp::Sub => a.checked_sub(b),
            BinOp::Mul => a.checked_mul(b),
            BinOp::Div | BinOp::Mod if b == 0 => {
                return Err(Fault::Arithmetic("division by zero").into());
            }
            BinOp::Div => a.checked_div(b),
            BinOp::Mod => a.checked_rem(b),
            _ => return err_op(&Val::Int(a), self, &Val::Int(b)),
        };
        res.map(Val::Int)
            .ok_or_else(|| Fault::Arithmetic("integer overflow").into())
    }

    fn float_arith(&self, a: f64, b: f64) -> Result<Val> {
        let res = match self {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a / b,
            BinOp::Mod => a % b,
            _ => return err_op(&Val::Float(a), self, &Val::Float(b)),
        };
        Ok(Val::Float(res))
    }

    pub(crate) fn cmp(&self, l: &Val, r: &Val) -> Result<bool> {
        if self.is_equality() {
            if let (Val::Ref(RefVal::Null(a)), Val::Ref(RefVal::Null(b))) = (l, r)
                && !a.compatible_with(b)
            {
                return Err(Fault::AnalyzerDefect(format!(
                    "invalid operation: incompatible types '{a}' and '{b}'"
                ))
                .into());
            }
            let eq = l == r;
            return Ok(if *self == BinOp::Eq { eq } else { !eq });
        }

        if l.is_null() || r.is_null() {
            return null_operand(self);
        }

        let ord = match (l, r) {
            (Val::Str(a), Val::Str(b)) => a.cmp(b),
            (Val::Int(a), Val::Int(b)) => a.cmp(b),
            (Val::Int(_) | Val::Float(_), Val::Int(_) | Val::Float(_)) => {
                let (a, b) = (l.as_float().unwrap_or_default(), r.as_float().unwrap_or_default());
                match a.partial_cmp(&b) {
                    Some(ord) => ord,
                    // NaN orders against nothing
                    None => return Ok(false),
                }
            }
            _ => return err_op(l, self, r),
        };

        match self {
            BinOp::Gt => Ok(ord == Ordering::Greater),
            BinOp::Lt => Ok(ord == Ordering::Less),
            BinOp::Ge => Ok(ord != Ordering::Less),
            BinOp::Le => Ok(ord != Ordering::Greater),
            _ => err_op(l, self, r),
        }
    }

    /// Evaluates the operator on two already-computed operands. `&&` and `||`
    /// land here only when both sides were evaluated.
    pub(crate) fn eval_vals(&self, l: &Val, r: &Val) -> Result<Val> {
        if self.is_arith() {
            if l.is_null() || r.is_null() {
                return null_operand(self);
            }
            self.arith(l, r)
        } else if self.is_logical() {
            match (l, r) {
                (Val::Bool(a), Val::Bool(b)) => Ok(Val::Bool(if *self == BinOp::And { *a && *b } else { *a || *b })),
                _ if l.is_null() || r.is_null() => null_operand(self),
                _ => err_op(l, self, r),
            }
        } else {
            Ok(Val::Bool(self.cmp(l, r)?))
        }
    }
}

impl Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Div => write!(f, "/"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mod => write!(f, "%"),
            BinOp::Eq => write!(f, "=="),
            BinOp::Ne => write!(f, "!="),
            BinOp::Gt => write!(f, ">"),
            BinOp::Lt => write!(f, "<"),
            BinOp::Ge => write!(f, ">="),
            BinOp::Le => write!(f, "<="),
            BinOp::And => write!(f, "&&"),
            BinOp::Or => write!(f, "||"),
        }
    }
}
