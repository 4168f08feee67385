use std::sync::Arc;

use crate::fault::Fault;
use crate::val::{Type, Val};

/// Slot storage for one active call.
///
/// Argument and local slots share one indexed area whose length is the
/// callable's stack frame size; parameters occupy the first `arg_count`
/// slots. Temporaries used to stage call arguments live in a separate area
/// sized by the temp frame size. Return slots start at each return type's
/// default, so a callee that writes fewer results leaves the rest untouched.
#[derive(Debug, Clone)]
pub struct StackFrame {
    unit: Arc<str>,
    arg_count: usize,
    values: Vec<Val>,
    temps: Vec<Option<Val>>,
    returns: Vec<Val>,
}

impl StackFrame {
    /// Builds a frame for `unit`. `slots` gives the declared type of every
    /// stack slot and `args` fill the leading ones.
    pub fn new(
        unit: Arc<str>,
        slots: &[Type],
        args: Vec<Val>,
        temp_size: usize,
        return_types: &[Type],
    ) -> Result<Self, Fault> {
        if args.len() > slots.len() {
            return Err(Fault::Wiring(format!(
                "frame of '{unit}' holds {} slot(s), cannot take {} argument(s)",
                slots.len(),
                args.len()
            )));
        }
        let arg_count = args.len();
        let mut values = args;
        values.extend(slots[arg_count..].iter().map(Type::default_value));

        Ok(Self {
            unit,
            arg_count,
            values,
            temps: vec![None; temp_size],
            returns: return_types.iter().map(Type::default_value).collect(),
        })
    }

    #[inline]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    #[inline]
    pub fn arg_count(&self) -> usize {
        self.arg_count
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn temp_len(&self) -> usize {
        self.temps.len()
    }

    pub fn get(&self, index: usize) -> Result<&Val, Fault> {
        self.values.get(index).ok_or(Fault::SlotOutOfRange {
            area: "stack",
            index,
            len: self.values.len(),
        })
    }

    pub fn set(&mut self, index: usize, value: Val) -> Result<(), Fault> {
        let len = self.values.len();
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Fault::SlotOutOfRange {
                area: "stack",
                index,
                len,
            }),
        }
    }

    /// Argument `index`, which must be non-null.
    pub fn argument(&self, index: usize) -> Result<&Val, Fault> {
        let val = self.nullable_argument(index)?;
        if val.is_null() {
            return Err(Fault::NullArgument { index });
        }
        Ok(val)
    }

    /// Argument `index`, possibly the null marker.
    pub fn nullable_argument(&self, index: usize) -> Result<&Val, Fault> {
        if index >= self.arg_count {
            return Err(Fault::ArgumentOutOfRange {
                index,
                count: self.arg_count,
            });
        }
        self.get(index)
    }

    pub fn set_temp(&mut self, index: usize, value: Val) -> Result<(), Fault> {
        let len = self.temps.len();
        match self.temps.get_mut(index) {
            Some(slot) => {
                *slot = Some(value);
                Ok(())
            }
            None => Err(Fault::SlotOutOfRange {
                area: "temp",
                index,
                len,
            }),
        }
    }

    /// Moves the staged value out of temp slot `index`.
    pub fn take_temp(&mut self, index: usize) -> Result<Val, Fault> {
        let len = self.temps.len();
        match self.temps.get_mut(index) {
            Some(slot) => slot
                .take()
                .ok_or_else(|| Fault::Wiring(format!("temp slot {index} read before it was written"))),
            None => Err(Fault::SlotOutOfRange {
                area: "temp",
                index,
                len,
            }),
        }
    }

    #[inline]
    pub fn return_count(&self) -> usize {
        self.returns.len()
    }

    pub fn set_return(&mut self, index: usize, value: Val) -> Result<(), Fault> {
        let count = self.returns.len();
        match self.returns.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Fault::Wiring(format!(
                "'{}' declares {count} return value(s), cannot write return slot {index}",
                self.unit
            ))),
        }
    }

    #[inline]
    pub fn returns(&self) -> &[Val] {
        &self.returns
    }

    pub fn into_returns(self) -> Vec<Val> {
        self.returns
    }
}
