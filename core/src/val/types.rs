use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Val;

/// Declared type of a slot, parameter, return value or expression.
///
/// Serialized as its source spelling (`"int"`, `"json"`, `"Person[]"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Type {
    /// Value types
    Int,
    Float,
    Bool,
    String,

    /// Top type; slots of this type may hold anything, including null
    Any,

    /// Reference types
    Ref(RefType),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefType {
    Array(Box<Type>),
    /// Untyped string-keyed map
    Map,
    Struct(Arc<str>),
    Connector(Arc<str>),
    Message,
    Xml,
    Json,
    /// Type of the `null` literal itself
    Null,
}

impl Type {
    pub fn array_of(elem: Type) -> Type {
        Type::Ref(RefType::Array(Box::new(elem)))
    }

    pub fn structure<S: Into<Arc<str>>>(name: S) -> Type {
        Type::Ref(RefType::Struct(name.into()))
    }

    pub fn connector<S: Into<Arc<str>>>(name: S) -> Type {
        Type::Ref(RefType::Connector(name.into()))
    }

    pub const fn map() -> Type {
        Type::Ref(RefType::Map)
    }

    pub const fn json() -> Type {
        Type::Ref(RefType::Json)
    }

    pub const fn xml() -> Type {
        Type::Ref(RefType::Xml)
    }

    pub const fn message() -> Type {
        Type::Ref(RefType::Message)
    }

    pub const fn null() -> Type {
        Type::Ref(RefType::Null)
    }

    #[inline]
    pub fn is_value_type(&self) -> bool {
        matches!(self, Type::Int | Type::Float | Type::Bool | Type::String)
    }

    /// Whether a slot of this type may hold the null marker.
    #[inline]
    pub fn is_nullable(&self) -> bool {
        !self.is_value_type()
    }

    #[inline]
    pub fn is_null_literal(&self) -> bool {
        matches!(self, Type::Ref(RefType::Null))
    }

    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    /// Initial content of a freshly allocated slot of this type.
    pub fn default_value(&self) -> Val {
        match self {
            Type::Int => Val::Int(0),
            Type::Float => Val::Float(0.0),
            Type::Bool => Val::Bool(false),
            Type::String => Val::Str(Arc::from("")),
            Type::Any => Val::null(RefType::Null),
            Type::Ref(rt) => Val::null(rt.clone()),
        }
    }

    /// Assignment compatibility: can a value of static type `found` be stored
    /// into a slot of this type without a cast.
    pub fn accepts(&self, found: &Type) -> bool {
        if self == found || matches!(self, Type::Any) {
            return true;
        }
        match (self, found) {
            (Type::Ref(_), Type::Ref(RefType::Null)) => true,
            (Type::Ref(RefType::Array(expected)), Type::Ref(RefType::Array(actual))) => {
                matches!(**expected, Type::Any) || expected == actual
            }
            _ => false,
        }
    }

    /// Whether two expressions of these static types may be compared with
    /// `==`/`!=`.
    pub fn comparable_with(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Any, _) | (_, Type::Any) => true,
            (l, r) if l.is_numeric() && r.is_numeric() => true,
            (Type::Ref(l), Type::Ref(r)) => l.compatible_with(r),
            (l, r) => l == r,
        }
    }

    pub fn parse(s: &str) -> Option<Type> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        if let Some(elem) = s.strip_suffix("[]") {
            return Type::parse(elem).map(Type::array_of);
        }

        if let Some(name) = s.strip_prefix("connector ") {
            let name = name.trim();
            return is_identifier(name).then(|| Type::connector(name));
        }

        match s {
            "int" => Some(Type::Int),
            "float" => Some(Type::Float),
            "boolean" => Some(Type::Bool),
            "string" => Some(Type::String),
            "any" => Some(Type::Any),
            "map" => Some(Type::map()),
            "json" => Some(Type::json()),
            "xml" => Some(Type::xml()),
            "message" => Some(Type::message()),
            "null" => Some(Type::null()),
            // Anything else names a struct type
            _ if is_identifier(s) => Some(Type::structure(s)),
            _ => None,
        }
    }
}

impl RefType {
    /// Nulls of these two reference types can be compared.
    pub fn compatible_with(&self, other: &RefType) -> bool {
        self == other || matches!(self, RefType::Null) || matches!(other, RefType::Null)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Bool => write!(f, "boolean"),
            Type::String => write!(f, "string"),
            Type::Any => write!(f, "any"),
            Type::Ref(rt) => write!(f, "{rt}"),
        }
    }
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefType::Array(elem) => write!(f, "{elem}[]"),
            RefType::Map => write!(f, "map"),
            RefType::Struct(name) => write!(f, "{name}"),
            RefType::Connector(name) => write!(f, "connector {name}"),
            RefType::Message => write!(f, "message"),
            RefType::Xml => write!(f, "xml"),
            RefType::Json => write!(f, "json"),
            RefType::Null => write!(f, "null"),
        }
    }
}

impl TryFrom<String> for Type {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Type::parse(&value).ok_or_else(|| format!("unknown type '{value}'"))
    }
}

impl From<Type> for String {
    fn from(value: Type) -> Self {
        value.to_string()
    }
}
