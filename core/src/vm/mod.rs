//! Execution engine
//!
//! Frames, the control stack, the per-invocation context, callable dispatch
//! and the tree-walking interpreter for interpreted function bodies.

mod context;
mod dispatch;
mod frame;
mod interp;
mod stack;

pub use context::{Context, FaultRecord};
pub use dispatch::Dispatcher;
pub use frame::StackFrame;
pub use interp::{ExecState, Interpreter};
pub use stack::ControlStack;

#[cfg(test)]
mod vm_test;
