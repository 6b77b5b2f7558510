//! Values reported by the debug service while a session runs and after it ends

use std::fmt;

use crate::debugger::kind::ParamMode;

/// A variable visible at the current execution position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextVariable {
    pub name: String,
    /// Frame the variable belongs to (0 is the innermost frame)
    pub frame_number: u32,
    pub value: Option<String>,
}

impl ContextVariable {
    pub fn new(name: impl Into<String>, frame_number: u32, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            frame_number,
            value,
        }
    }
}

impl fmt::Display for ContextVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} = {}",
            self.frame_number,
            self.name,
            self.value.as_deref().unwrap_or("NULL")
        )
    }
}

/// Return value of a debugged function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionResult {
    pub return_type: String,
    pub value: Option<String>,
}

/// Parameter value reported after a procedure exits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureParam {
    pub name: String,
    pub data_type: String,
    pub mode: ParamMode,
    pub value: Option<String>,
}

/// Runtime error raised inside the debugged program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionError {
    pub text: String,
    /// Line the error was raised at, when the server knows it
    pub line: Option<u32>,
}

impl ExecutionError {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            line: None,
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} (line {})", self.text, line),
            None => f.write_str(&self.text),
        }
    }
}

/// Final outcome of a debug session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DebugResult {
    /// Still running, stopped by the user, or nothing to report
    #[default]
    None,
    /// Function returned
    Function(FunctionResult),
    /// Procedure finished; holds its OUT and IN OUT parameters
    Procedure(Vec<ProcedureParam>),
    /// Execution failed
    Errors(Vec<ExecutionError>),
}

impl DebugResult {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn errors(&self) -> &[ExecutionError] {
        match self {
            Self::Errors(errors) => errors,
            _ => &[],
        }
    }
}
