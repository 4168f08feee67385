use tracing::warn;

use super::{ControlStack, StackFrame};
use crate::fault::{Fault, fault_of};
use crate::util::fast_map::{FastHashMap, fast_hash_map_new};
use crate::val::Val;

/// 单次外部调用的运行期上下文。
///
/// - 独占一个 `ControlStack`；
/// - 保存第一个发生的 fault（之后的不覆盖）；
/// - 携带请求级属性，供 native 单元读取。
#[derive(Debug)]
pub struct Context {
    stack: ControlStack,
    fault: Option<FaultRecord>,
    properties: FastHashMap<String, String>,
}

/// Fault recorded while an invocation unwound.
#[derive(Debug, Clone)]
pub struct FaultRecord {
    pub message: String,
    /// Structured fault, when the engine raised it rather than a host unit.
    pub fault: Option<Fault>,
    /// Unit names on the control stack when the fault was recorded, innermost last.
    pub trace: Vec<String>,
}

impl Context {
    pub fn new(max_call_depth: usize) -> Self {
        Self {
            stack: ControlStack::new(max_call_depth),
            fault: None,
            properties: fast_hash_map_new(),
        }
    }

    #[inline]
    pub fn stack(&self) -> &ControlStack {
        &self.stack
    }

    #[inline]
    pub fn stack_mut(&mut self) -> &mut ControlStack {
        &mut self.stack
    }

    #[inline]
    pub fn frame(&self) -> Result<&StackFrame, Fault> {
        self.stack.current()
    }

    #[inline]
    pub fn frame_mut(&mut self) -> Result<&mut StackFrame, Fault> {
        self.stack.current_mut()
    }

    /// 当前帧的第 `index` 个参数，不允许为 null。
    pub fn argument(&self, index: usize) -> Result<&Val, Fault> {
        self.stack.current()?.argument(index)
    }

    pub fn nullable_argument(&self, index: usize) -> Result<&Val, Fault> {
        self.stack.current()?.nullable_argument(index)
    }

    /// Reads argument `index` as a string, faulting when it is null.
    pub fn string_argument(&self, index: usize) -> anyhow::Result<&str> {
        let val = self.argument(index)?;
        val.as_str()
            .ok_or_else(|| Fault::AnalyzerDefect(format!("argument {index} is '{}', expected 'string'", val.ty())).into())
    }

    pub fn int_argument(&self, index: usize) -> anyhow::Result<i64> {
        let val = self.argument(index)?;
        val.as_int()
            .ok_or_else(|| Fault::AnalyzerDefect(format!("argument {index} is '{}', expected 'int'", val.ty())).into())
    }

    pub fn float_argument(&self, index: usize) -> anyhow::Result<f64> {
        let val = self.argument(index)?;
        match val {
            Val::Float(x) => Ok(*x),
            _ => Err(Fault::AnalyzerDefect(format!("argument {index} is '{}', expected 'float'", val.ty())).into()),
        }
    }

    pub fn bool_argument(&self, index: usize) -> anyhow::Result<bool> {
        let val = self.argument(index)?;
        val.as_bool()
            .ok_or_else(|| Fault::AnalyzerDefect(format!("argument {index} is '{}', expected 'boolean'", val.ty())).into())
    }

    pub fn set_return(&mut self, index: usize, value: Val) -> Result<(), Fault> {
        self.stack.current_mut()?.set_return(index, value)
    }

    /// 记录 fault；只保留第一个。
    pub fn record_fault(&mut self, err: &anyhow::Error) {
        if self.fault.is_some() {
            return;
        }
        let trace = self.stack.trace();
        warn!(error = %err, trace = ?trace, "invocation faulted");
        self.fault = Some(FaultRecord {
            message: err.to_string(),
            fault: fault_of(err).cloned(),
            trace,
        });
    }

    #[inline]
    pub fn fault(&self) -> Option<&FaultRecord> {
        self.fault.as_ref()
    }

    pub fn take_fault(&mut self) -> Option<FaultRecord> {
        self.fault.take()
    }

    pub fn set_property<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> Option<String> {
        self.properties.insert(key.into(), value.into())
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}
