pub mod fault;
pub mod op;
pub mod program;
pub mod rt;
pub mod typ;
pub mod util;
pub mod val;

// Frames, control stack, dispatch and the interpreter
pub mod vm;

pub use fault::{Fault, FaultKind, fault_of};
pub use program::{NativePackage, NativeRegistry, Program, ProgramSource};
pub use rt::{Runtime, RuntimeConfig, invoke};
pub use val::{RefType, Type, Val};
pub use vm::Context;
