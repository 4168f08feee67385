//! Statement and expression trees of interpreted callables.
//!
//! Trees arrive from the program producer with names only; the loader fills
//! in `slot` and `temp_base` before anything executes.

use serde::{Deserialize, Serialize};

use crate::op::{BinOp, UnaryOp};
use crate::val::Type;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    /// `T name = init;` Without `init` the slot keeps the type's default.
    Var {
        name: String,
        #[serde(rename = "type")]
        ty: Type,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        init: Option<Expr>,
        #[serde(skip)]
        slot: Option<usize>,
    },
    /// `a, b = f();` or `a = e;`
    Assign { targets: Vec<LValue>, value: Expr },
    If {
        cond: Expr,
        then: Vec<Stmt>,
        #[serde(default, rename = "else", skip_serializing_if = "Vec::is_empty")]
        otherwise: Vec<Stmt>,
    },
    While { cond: Expr, body: Vec<Stmt> },
    Break,
    Continue,
    Return(Vec<Expr>),
    Expr(Expr),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LValue {
    Var(VarRef),
    Index { base: Expr, index: Expr },
    Field { base: Expr, name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Null,
    Json(serde_json::Value),
    Xml(String),
    Var(VarRef),
    Array {
        elem: Type,
        #[serde(default)]
        items: Vec<Expr>,
    },
    Map(Vec<(String, Expr)>),
    Struct {
        name: String,
        #[serde(default)]
        fields: Vec<(String, Expr)>,
    },
    Connector {
        name: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    /// New message whose payload is the given string expression.
    Message(Box<Expr>),
    Index { base: Box<Expr>, index: Box<Expr> },
    Field { base: Box<Expr>, name: String },
    Unary { op: UnaryOp, expr: Box<Expr> },
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Cast { expr: Box<Expr>, to: Type },
    Call(Call),
    /// `connector.action(args)`; the connector is passed as argument 0.
    Action {
        connector: Box<Expr>,
        action: String,
        #[serde(default)]
        args: Vec<Expr>,
        #[serde(skip)]
        temp_base: usize,
    },
}

/// Variable reference; serialized as the bare name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct VarRef {
    pub name: String,
    pub slot: Option<usize>,
}

impl VarRef {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            slot: None,
        }
    }
}

impl From<String> for VarRef {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<VarRef> for String {
    fn from(v: VarRef) -> Self {
        v.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub callee: String,
    #[serde(default)]
    pub args: Vec<Expr>,
    /// First temp slot used to stage this call's arguments.
    #[serde(skip)]
    pub temp_base: usize,
}

impl Expr {
    pub fn var<S: Into<String>>(name: S) -> Expr {
        Expr::Var(VarRef::new(name))
    }

    pub fn call<S: Into<String>>(callee: S, args: Vec<Expr>) -> Expr {
        Expr::Call(Call {
            callee: callee.into(),
            args,
            temp_base: 0,
        })
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn index(base: Expr, index: Expr) -> Expr {
        Expr::Index {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    pub fn field<S: Into<String>>(base: Expr, name: S) -> Expr {
        Expr::Field {
            base: Box::new(base),
            name: name.into(),
        }
    }

    pub fn cast(expr: Expr, to: Type) -> Expr {
        Expr::Cast {
            expr: Box::new(expr),
            to,
        }
    }
}

impl Stmt {
    pub fn var<S: Into<String>>(name: S, ty: Type, init: Option<Expr>) -> Stmt {
        Stmt::Var {
            name: name.into(),
            ty,
            init,
            slot: None,
        }
    }

    pub fn assign<S: Into<String>>(name: S, value: Expr) -> Stmt {
        Stmt::Assign {
            targets: vec![LValue::Var(VarRef::new(name))],
            value,
        }
    }
}
