//! Runtime values.
//!
//! Value types (`int`, `float`, `boolean`, `string`) are plain variants and are
//! copied on assignment. Everything else lives under [`RefVal`], which is the
//! only place the null marker exists: a null always carries the reference type
//! it stands in for.

use std::fmt;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use serde::{Serialize, Serializer};

use crate::fault::Fault;
use crate::program::Param;

mod refs;
mod types;

pub use refs::{ArrayValue, ConnectorValue, MapValue, MessageValue, Shared, StructValue};
pub use types::{RefType, Type};


/// Nesting limit when rendering values; deeper containers print as `...`.
const RENDER_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub enum Val {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(Arc<str>),
    Ref(RefVal),
}

#[derive(Debug, Clone)]
pub enum RefVal {
    Null(RefType),
    Array(Shared<ArrayValue>),
    Map(Shared<MapValue>),
    Struct(Shared<StructValue>),
    Connector(Arc<ConnectorValue>),
    Message(Shared<MessageValue>),
    Xml(Arc<str>),
    Json(Arc<serde_json::Value>),
}

impl Val {
    /// The null marker standing in for a value of reference type `ty`.
    #[inline]
    pub fn null(ty: RefType) -> Val {
        Val::Ref(RefVal::Null(ty))
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Val::Ref(RefVal::Null(_)))
    }

    /// Retags a null with the reference type of the slot it is stored into.
    /// Non-null values are returned unchanged.
    pub fn declared_as(self, ty: &Type) -> Val {
        if let Type::Ref(rt) = ty
            && *rt != RefType::Null
            && self.is_null()
        {
            return Val::null(rt.clone());
        }
        self
    }

    /// [`Val::declared_as`] for a slot write. A null never lands in a
    /// value-typed slot; the checker rules that out, so reaching it here is
    /// an analyzer defect.
    pub fn bind(self, ty: &Type) -> Result<Val, Fault> {
        if ty.is_value_type() && self.is_null() {
            return Err(Fault::AnalyzerDefect(format!("null stored into a '{ty}' slot")));
        }
        Ok(self.declared_as(ty))
    }

    pub fn str<S: AsRef<str>>(s: S) -> Val {
        Val::Str(Arc::from(s.as_ref()))
    }

    pub fn array(elem: Type, items: Vec<Val>) -> Val {
        Val::Ref(RefVal::Array(Shared::new(ArrayValue::new(elem, items))))
    }

    pub fn map(map: MapValue) -> Val {
        Val::Ref(RefVal::Map(Shared::new(map)))
    }

    pub fn structure(value: StructValue) -> Val {
        Val::Ref(RefVal::Struct(Shared::new(value)))
    }

    pub fn connector<S: Into<Arc<str>>>(name: S, args: Vec<Val>) -> Val {
        Val::Ref(RefVal::Connector(Arc::new(ConnectorValue {
            name: name.into(),
            args,
        })))
    }

    pub fn message(value: MessageValue) -> Val {
        Val::Ref(RefVal::Message(Shared::new(value)))
    }

    pub fn xml<S: AsRef<str>>(s: S) -> Val {
        Val::Ref(RefVal::Xml(Arc::from(s.as_ref())))
    }

    pub fn json(value: serde_json::Value) -> Val {
        Val::Ref(RefVal::Json(Arc::new(value)))
    }

    /// Runtime type of this value. A null reports the type it was declared as.
    pub fn ty(&self) -> Type {
        match self {
            Val::Int(_) => Type::Int,
            Val::Float(_) => Type::Float,
            Val::Bool(_) => Type::Bool,
            Val::Str(_) => Type::String,
            Val::Ref(r) => match r {
                RefVal::Null(rt) => Type::Ref(rt.clone()),
                RefVal::Array(a) => Type::array_of(a.read().elem.clone()),
                RefVal::Map(_) => Type::map(),
                RefVal::Struct(s) => Type::structure(s.read().name.clone()),
                RefVal::Connector(c) => Type::connector(c.name.clone()),
                RefVal::Message(_) => Type::message(),
                RefVal::Xml(_) => Type::xml(),
                RefVal::Json(_) => Type::json(),
            },
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Val::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Val::Float(f) => Some(*f),
            Val::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Val::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Val::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Converts to `to` at runtime.
    ///
    /// A null becomes the null of the target reference type. Values whose
    /// runtime type the target accepts pass through unchanged, `int` and
    /// `float` convert into each other, and anything else faults.
    pub fn cast(&self, to: &Type) -> Result<Val, Fault> {
        let invalid = || Fault::InvalidCast {
            from: self.ty().to_string(),
            to: to.to_string(),
        };

        if let Val::Ref(RefVal::Null(_)) = self {
            return match to {
                Type::Any => Ok(self.clone()),
                Type::Ref(rt) => Ok(Val::null(rt.clone())),
                _ => Err(invalid()),
            };
        }

        match (self, to) {
            (Val::Int(i), Type::Float) => Ok(Val::Float(*i as f64)),
            (Val::Float(f), Type::Int) => {
                if f.is_finite() && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    Ok(Val::Int(f.trunc() as i64))
                } else {
                    Err(invalid())
                }
            }
            _ if to.accepts(&self.ty()) => Ok(self.clone()),
            _ => Err(invalid()),
        }
    }

    /// Builds a value of declared type `ty` from JSON input. Knows no struct
    /// declarations; see [`Program::value_from_json`](crate::Program::value_from_json).
    pub fn from_json(value: &serde_json::Value, ty: &Type) -> Result<Val> {
        Val::from_json_with(value, ty, &|_| None)
    }

    /// [`Val::from_json`] with `structs` resolving a struct name to its
    /// declared fields. Struct values get every declared field in declaration
    /// order; fields missing from the input take their type's default.
    pub fn from_json_with<'s>(
        value: &serde_json::Value,
        ty: &Type,
        structs: &dyn Fn(&str) -> Option<&'s [Param]>,
    ) -> Result<Val> {
        use serde_json::Value as J;

        let mismatch = || anyhow!("cannot convert {value} to '{ty}'");
        let val = match (ty, value) {
            (Type::Ref(rt), J::Null) => Val::null(rt.clone()),
            (Type::Any, J::Null) => Val::null(RefType::Null),
            (Type::Int, J::Number(n)) => Val::Int(n.as_i64().ok_or_else(mismatch)?),
            (Type::Float, J::Number(n)) => Val::Float(n.as_f64().ok_or_else(mismatch)?),
            (Type::Bool, J::Bool(b)) => Val::Bool(*b),
            (Type::String, J::String(s)) => Val::str(s),
            (Type::Ref(RefType::Json), v) => Val::json(v.clone()),
            (Type::Ref(RefType::Xml), J::String(s)) => Val::xml(s),
            (Type::Ref(RefType::Array(elem)), J::Array(items)) => {
                let items = items
                    .iter()
                    .map(|item| Val::from_json_with(item, elem, structs))
                    .collect::<Result<Vec<_>>>()?;
                Val::array((**elem).clone(), items)
            }
            (Type::Ref(RefType::Map), J::Object(obj)) => {
                let entries = obj
                    .iter()
                    .map(|(k, v)| Ok((Arc::from(k.as_str()), Val::from_json_with(v, &Type::Any, structs)?)))
                    .collect::<Result<Vec<_>>>()?;
                Val::map(MapValue::from_entries(entries))
            }
            (Type::Ref(RefType::Struct(name)), J::Object(obj)) => {
                let decl = structs(&**name).ok_or_else(|| anyhow!("unknown struct '{name}'"))?;
                if let Some(key) = obj.keys().find(|k| !decl.iter().any(|p| p.name == **k)) {
                    return Err(anyhow!("struct '{name}' has no field '{key}'"));
                }
                let fields = decl
                    .iter()
                    .map(|p| {
                        let v = match obj.get(&p.name) {
                            Some(v) => Val::from_json_with(v, &p.ty, structs)?,
                            None => p.ty.default_value(),
                        };
                        Ok((Arc::from(p.name.as_str()), v))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Val::structure(StructValue::new(name.clone(), fields))
            }
            (Type::Ref(RefType::Message), J::String(s)) => Val::message(MessageValue {
                payload: s.clone(),
                ..Default::default()
            }),
            (Type::Any, J::Bool(b)) => Val::Bool(*b),
            (Type::Any, J::Number(n)) => match n.as_i64() {
                Some(i) => Val::Int(i),
                None => Val::Float(n.as_f64().ok_or_else(mismatch)?),
            },
            (Type::Any, J::String(s)) => Val::str(s),
            (Type::Any, J::Array(_)) => Val::from_json_with(value, &Type::array_of(Type::Any), structs)?,
            (Type::Any, J::Object(_)) => Val::from_json_with(value, &Type::map(), structs)?,
            _ => return Err(mismatch()),
        };
        Ok(val)
    }

    /// Renders the value as JSON. Nulls become `null`, structs and maps
    /// become objects, xml and messages become strings.
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_depth(RENDER_DEPTH)
    }

    fn to_json_depth(&self, depth: usize) -> serde_json::Value {
        use serde_json::Value as J;

        if depth == 0 {
            return J::String("...".to_string());
        }
        match self {
            Val::Int(i) => J::from(*i),
            Val::Float(f) => serde_json::Number::from_f64(*f).map_or(J::Null, J::Number),
            Val::Bool(b) => J::Bool(*b),
            Val::Str(s) => J::String(s.to_string()),
            Val::Ref(r) => match r {
                RefVal::Null(_) => J::Null,
                RefVal::Array(a) => J::Array(a.read().items.iter().map(|v| v.to_json_depth(depth - 1)).collect()),
                RefVal::Map(m) => J::Object(
                    m.read()
                        .sorted_entries()
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v.to_json_depth(depth - 1)))
                        .collect(),
                ),
                RefVal::Struct(s) => J::Object(
                    s.read()
                        .fields
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_json_depth(depth - 1)))
                        .collect(),
                ),
                RefVal::Connector(c) => {
                    let mut obj = serde_json::Map::new();
                    obj.insert("connector".to_string(), J::String(c.name.to_string()));
                    J::Object(obj)
                }
                RefVal::Message(m) => J::String(m.read().payload.clone()),
                RefVal::Xml(x) => J::String(x.to_string()),
                RefVal::Json(j) => (**j).clone(),
            },
        }
    }
}

impl PartialEq for Val {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Val::Int(a), Val::Int(b)) => a == b,
            (Val::Float(a), Val::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Val::Int(a), Val::Float(b)) | (Val::Float(b), Val::Int(a)) => (*a as f64) == *b,
            (Val::Bool(a), Val::Bool(b)) => a == b,
            (Val::Str(a), Val::Str(b)) => a == b,
            (Val::Ref(a), Val::Ref(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for RefVal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RefVal::Null(a), RefVal::Null(b)) => a.compatible_with(b),
            (RefVal::Array(a), RefVal::Array(b)) => a.ptr_eq(b),
            (RefVal::Map(a), RefVal::Map(b)) => a.ptr_eq(b),
            (RefVal::Struct(a), RefVal::Struct(b)) => a.ptr_eq(b),
            (RefVal::Connector(a), RefVal::Connector(b)) => Arc::ptr_eq(a, b),
            (RefVal::Message(a), RefVal::Message(b)) => a.ptr_eq(b),
            (RefVal::Xml(a), RefVal::Xml(b)) => a == b,
            (RefVal::Json(a), RefVal::Json(b)) => a == b,
            _ => false,
        }
    }
}

impl Serialize for Val {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Val::Int(i) => serializer.serialize_i64(*i),
            Val::Float(f) => serializer.serialize_f64(*f),
            Val::Bool(b) => serializer.serialize_bool(*b),
            Val::Str(s) => serializer.serialize_str(s),
            Val::Ref(RefVal::Null(_)) => serializer.serialize_unit(),
            Val::Ref(_) => self.to_json().serialize(serializer),
        }
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Int(i) => f.write_str(itoa::Buffer::new().format(*i)),
            Val::Float(x) => fmt_float(*x, f),
            Val::Bool(b) => write!(f, "{b}"),
            Val::Str(s) => f.write_str(s),
            Val::Ref(RefVal::Null(_)) => f.write_str("null"),
            Val::Ref(RefVal::Xml(x)) => f.write_str(x),
            Val::Ref(RefVal::Message(m)) => f.write_str(&m.read().payload),
            Val::Ref(_) => write!(f, "{}", self.to_json()),
        }
    }
}

fn fmt_float(x: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if x.is_finite() {
        f.write_str(ryu::Buffer::new().format_finite(x))
    } else if x.is_nan() {
        f.write_str("NaN")
    } else if x > 0.0 {
        f.write_str("Infinity")
    } else {
        f.write_str("-Infinity")
    }
}

impl From<i64> for Val {
    fn from(i: i64) -> Self {
        Val::Int(i)
    }
}

impl From<i32> for Val {
    fn from(i: i32) -> Self {
        Val::Int(i as i64)
    }
}

impl From<f64> for Val {
    fn from(f: f64) -> Self {
        Val::Float(f)
    }
}

impl From<bool> for Val {
    fn from(b: bool) -> Self {
        Val::Bool(b)
    }
}

impl From<&str> for Val {
    fn from(s: &str) -> Self {
        Val::str(s)
    }
}

impl From<String> for Val {
    fn from(s: String) -> Self {
        Val::Str(Arc::from(s))
    }
}

impl From<serde_json::Value> for Val {
    fn from(value: serde_json::Value) -> Self {
        Val::json(value)
    }
}
