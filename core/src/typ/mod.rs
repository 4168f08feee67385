mod checker;


pub use checker::{NullChecker, check_program};

/// Error found before execution, attributed to the function it occurs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticError {
    pub function: String,
    pub message: String,
}

impl SemanticError {
    pub fn new<F: Into<String>, M: Into<String>>(function: F, message: M) -> Self {
        Self {
            function: function.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SemanticError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "function '{}': {}", self.function, self.message)
    }
}

impl std::error::Error for SemanticError {}

/// Every error one analysis pass collected; never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticErrors(pub Vec<SemanticError>);

impl SemanticErrors {
    pub fn errors(&self) -> &[SemanticError] {
        &self.0
    }
}

impl std::fmt::Display for SemanticErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SemanticErrors {}
