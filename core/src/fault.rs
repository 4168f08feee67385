use std::fmt;

/// Classification of a [`Fault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Raised while a program runs; unwinds the control stack.
    Runtime,
    /// A callable name that does not resolve at call time.
    Lookup,
    /// Broken wiring between the program producer and the engine (frame sizes,
    /// registrations, analyzer guarantees). Never retried.
    Defect,
}

/// Error conditions raised by the engine itself.
///
/// Faults travel as `anyhow::Error` like every other error in the crate;
/// use [`fault_of`] to get the structured value back.
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    /// Member, element, field or action access on a null reference.
    NullReference(String),
    /// A native unit required a non-null argument.
    NullArgument { index: usize },
    /// Argument index outside `[0, param_count)`.
    ArgumentOutOfRange { index: usize, count: usize },
    /// Frame slot index outside the declared frame size.
    SlotOutOfRange {
        area: &'static str,
        index: usize,
        len: usize,
    },
    /// Array element index outside the array.
    IndexOutOfRange { index: i64, len: usize },
    /// Map lookup of a key that was never bound.
    KeyNotFound(String),
    EmptyStack,
    StackOverflow { depth: usize },
    Arithmetic(&'static str),
    InvalidCast { from: String, to: String },
    UndefinedCallable(String),
    ArityMismatch {
        callee: String,
        expected: usize,
        found: usize,
    },
    /// A caller handed an argument the parameter's declared type does not take.
    ArgumentType {
        callee: String,
        index: usize,
        expected: String,
        found: String,
    },
    /// Something the semantic analysis guarantees reached the interpreter anyway.
    AnalyzerDefect(String),
    Wiring(String),
}

impl Fault {
    pub fn kind(&self) -> FaultKind {
        match self {
            Fault::UndefinedCallable(_) => FaultKind::Lookup,
            Fault::AnalyzerDefect(_) | Fault::Wiring(_) | Fault::EmptyStack => FaultKind::Defect,
            _ => FaultKind::Runtime,
        }
    }

    pub fn null_variable(name: &str) -> Self {
        Fault::NullReference(format!("variable '{name}' is null"))
    }

    pub fn null_field(name: &str) -> Self {
        Fault::NullReference(format!("field '{name}' is null"))
    }

    pub fn null_connector() -> Self {
        Fault::NullReference("connector argument value is null".to_string())
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::NullReference(msg) => write!(f, "{msg}"),
            Fault::NullArgument { index } => write!(f, "argument {index} is null"),
            Fault::ArgumentOutOfRange { index, count } => {
                write!(f, "argument index {index} out of range (declared {count})")
            }
            Fault::SlotOutOfRange { area, index, len } => {
                write!(f, "{area} slot {index} out of range (frame size {len})")
            }
            Fault::IndexOutOfRange { index, len } => {
                write!(f, "array index out of range: index: {index}, size: {len}")
            }
            Fault::KeyNotFound(key) => write!(f, "key '{key}' not found"),
            Fault::EmptyStack => write!(f, "control stack is empty"),
            Fault::StackOverflow { depth } => write!(f, "call stack overflow (depth {depth})"),
            Fault::Arithmetic(msg) => write!(f, "{msg}"),
            Fault::InvalidCast { from, to } => write!(f, "cannot cast '{from}' to '{to}'"),
            Fault::UndefinedCallable(name) => write!(f, "undefined function '{name}'"),
            Fault::ArityMismatch {
                callee,
                expected,
                found,
            } => write!(f, "function '{callee}' expects {expected} argument(s), got {found}"),
            Fault::ArgumentType {
                callee,
                index,
                expected,
                found,
            } => write!(f, "function '{callee}' argument {index} expects '{expected}', got '{found}'"),
            Fault::AnalyzerDefect(msg) => write!(f, "analyzer defect: {msg}"),
            Fault::Wiring(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Fault {}

/// Structured fault carried by `err`, if the engine raised it.
pub fn fault_of(err: &anyhow::Error) -> Option<&Fault> {
    err.downcast_ref::<Fault>()
}
