use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::ast::Stmt;
use crate::fault::Fault;
use crate::val::{Type, Val};
use crate::vm::Context;

/// Native function entry point: reads arguments from the current frame and
/// returns up to the declared number of results.
pub type NativeFn = fn(&mut Context) -> anyhow::Result<Vec<Val>>;

/// Type mapper entry point: converts one value into exactly one result.
pub type TypeMapperFn = fn(&mut Context) -> anyhow::Result<Val>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
}

impl Param {
    pub fn new<S: Into<String>>(name: S, ty: Type) -> Self {
        Self { name: name.into(), ty }
    }
}

/// Identity shared by every callable unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub name: String,
    pub package: String,
    pub visibility: Visibility,
    pub params: Vec<Param>,
    pub returns: Vec<Type>,
}

impl Signature {
    pub fn qualified_name(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}:{}", self.package, self.name)
        }
    }

    pub fn param_types(&self) -> Vec<Type> {
        self.params.iter().map(|p| p.ty.clone()).collect()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.qualified_name())?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", p.ty, p.name)?;
        }
        write!(f, ")")?;
        match self.returns.as_slice() {
            [] => Ok(()),
            [one] => write!(f, " ({one})"),
            many => {
                write!(f, " (")?;
                for (i, t) in many.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Write-once frame size cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameSize {
    #[default]
    Unset,
    Set(usize),
}

impl FrameSize {
    pub fn get(&self) -> Option<usize> {
        match self {
            FrameSize::Unset => None,
            FrameSize::Set(n) => Some(*n),
        }
    }

    /// Records the stack frame size. Setting the same value again is a no-op;
    /// any other value is a wiring defect.
    pub fn set_once(&mut self, unit: &str, size: usize) -> Result<(), Fault> {
        match *self {
            FrameSize::Unset => {
                *self = FrameSize::Set(size);
                Ok(())
            }
            FrameSize::Set(current) if current == size => Ok(()),
            FrameSize::Set(current) => Err(Fault::Wiring(format!(
                "Attempt to overwrite stack frame size of '{unit}'. current: {current}, new: {size}"
            ))),
        }
    }

    /// Records the temp frame size. May be called repeatedly; a value
    /// different from an already recorded nonzero size is a wiring defect.
    pub fn set_temp(&mut self, unit: &str, size: usize) -> Result<(), Fault> {
        if let FrameSize::Set(current) = *self
            && current > 0
            && current != size
        {
            return Err(Fault::Wiring(format!(
                "Attempt to overwrite temp frame size of '{unit}'. current: {current}, new: {size}"
            )));
        }
        *self = FrameSize::Set(size);
        Ok(())
    }
}

/// Slot layout computed by the loader for one interpreted function.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    /// Declared type of every stack slot; parameters first.
    pub slots: Vec<Type>,
    pub temp_size: usize,
}

#[derive(Debug)]
pub struct InterpretedFunction {
    pub sig: Signature,
    pub body: Vec<Stmt>,
    pub layout: Layout,
    pub stack_frame_size: FrameSize,
    pub temp_frame_size: FrameSize,
}

impl InterpretedFunction {
    pub fn new(sig: Signature, body: Vec<Stmt>, layout: Layout) -> Self {
        Self {
            sig,
            body,
            layout,
            stack_frame_size: FrameSize::default(),
            temp_frame_size: FrameSize::default(),
        }
    }
}

/// Literal constant declared by a native unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstDef {
    pub name: String,
    pub value: Val,
}

#[derive(Clone, Copy)]
pub enum NativeHandler {
    Function(NativeFn),
    TypeMapper(TypeMapperFn),
}

impl fmt::Debug for NativeHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeHandler::Function(_) => write!(f, "Function(..)"),
            NativeHandler::TypeMapper(_) => write!(f, "TypeMapper(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NativeUnit {
    pub sig: Signature,
    pub constants: Vec<ConstDef>,
    pub handler: NativeHandler,
}

impl NativeUnit {
    pub fn function<P, N>(package: P, name: N, params: Vec<Param>, returns: Vec<Type>, f: NativeFn) -> Self
    where
        P: Into<String>,
        N: Into<String>,
    {
        Self::with_handler(package, name, params, returns, NativeHandler::Function(f))
    }

    pub fn type_mapper<P, N>(package: P, name: N, from: Type, to: Type, f: TypeMapperFn) -> Self
    where
        P: Into<String>,
        N: Into<String>,
    {
        Self::with_handler(
            package,
            name,
            vec![Param::new("value", from)],
            vec![to],
            NativeHandler::TypeMapper(f),
        )
    }

    fn with_handler<P, N>(package: P, name: N, params: Vec<Param>, returns: Vec<Type>, handler: NativeHandler) -> Self
    where
        P: Into<String>,
        N: Into<String>,
    {
        Self {
            sig: Signature {
                name: name.into(),
                package: package.into(),
                visibility: Visibility::Public,
                params,
                returns,
            },
            constants: Vec::new(),
            handler,
        }
    }

    pub fn with_constant<S: Into<String>>(mut self, name: S, value: Val) -> Self {
        self.constants.push(ConstDef {
            name: name.into(),
            value,
        });
        self
    }

    #[inline]
    pub fn is_type_mapper(&self) -> bool {
        matches!(self.handler, NativeHandler::TypeMapper(_))
    }
}

/// A resolved call target.
#[derive(Debug, Clone)]
pub enum CallableUnit {
    Function(Arc<InterpretedFunction>),
    Native(Arc<NativeUnit>),
}

impl CallableUnit {
    pub fn sig(&self) -> &Signature {
        match self {
            CallableUnit::Function(f) => &f.sig,
            CallableUnit::Native(n) => &n.sig,
        }
    }

    /// Declared slot types, temp frame size and return types of a fresh frame.
    pub fn frame_shape(&self) -> Result<(Vec<Type>, usize), Fault> {
        match self {
            CallableUnit::Function(f) => {
                let unit = f.sig.qualified_name();
                let stack = f
                    .stack_frame_size
                    .get()
                    .ok_or_else(|| Fault::Wiring(format!("stack frame size of '{unit}' was never set")))?;
                let temps = f.temp_frame_size.get().unwrap_or(0);
                let mut slots = f.layout.slots.clone();
                slots.resize(stack, Type::Any);
                Ok((slots, temps))
            }
            CallableUnit::Native(n) => Ok((n.sig.param_types(), 0)),
        }
    }
}
