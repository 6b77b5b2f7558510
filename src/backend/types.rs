use crate::config::ConnectionContext;
use crate::debugger::breakpoint::BreakpointPoint;
use crate::debugger::context::{ContextVariable, ExecutionError, FunctionResult, ProcedureParam};
use crate::debugger::kind::{DebugTarget, PlIdentity, PlKind};

/// Request to start a backend debug session
#[derive(Debug, Clone, PartialEq)]
pub struct CreateSessionRequest {
    /// Object to execute together with its schema
    pub target: DebugTarget,
    pub connection: ConnectionContext,
}

impl CreateSessionRequest {
    pub fn kind(&self) -> PlKind {
        self.target.kind()
    }

    pub fn package_name(&self) -> Option<&str> {
        self.target.package_name()
    }

    pub fn anonymous_block(&self) -> Option<&str> {
        self.target.inline_source()
    }
}

/// A breakpoint as sent to the debug service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointRequest {
    pub package_name: Option<String>,
    pub pl_name: String,
    pub kind: PlKind,
    pub line: u32,
    /// Server number, required for removal
    pub breakpoint_num: Option<u64>,
}

impl BreakpointRequest {
    pub fn from_point(point: &BreakpointPoint) -> Self {
        Self {
            package_name: point.identity.package_name.clone(),
            pl_name: point.identity.name.clone(),
            kind: point.identity.kind,
            line: point.line,
            breakpoint_num: None,
        }
    }

    pub fn with_breakpoint_num(mut self, num: u64) -> Self {
        self.breakpoint_num = Some(num);
        self
    }
}

/// A breakpoint the server accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointDescriptor {
    pub package_name: Option<String>,
    pub object_name: String,
    pub object_type: PlKind,
    pub line_num: u32,
    pub breakpoint_num: u64,
}

impl BreakpointDescriptor {
    /// Frame the breakpoint belongs to
    pub fn identity(&self) -> PlIdentity {
        PlIdentity::from_backtrace(self.object_type, &self.object_name, self.package_name.as_deref())
    }
}

/// Current execution position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backtrace {
    pub package_name: Option<String>,
    pub pl_name: String,
    pub kind: PlKind,
    pub line_num: u32,
}

impl Backtrace {
    pub fn identity(&self) -> PlIdentity {
        PlIdentity::from_backtrace(self.kind, &self.pl_name, self.package_name.as_deref())
    }
}

/// Output produced through DBMS_OUTPUT since the last poll
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbmsOutput {
    pub line: Option<String>,
}

/// Response of `get_debug_context`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugContext {
    pub terminated: bool,
    pub backtrace: Option<Backtrace>,
    pub variables: Vec<ContextVariable>,
    pub dbms_output: Option<DbmsOutput>,
    pub errors: Vec<ExecutionError>,
    pub function_result: Option<FunctionResult>,
    /// Every parameter of the procedure after it finished
    pub procedure_result: Vec<ProcedureParam>,
}

impl DebugContext {
    /// A paused position
    pub fn paused(backtrace: Backtrace) -> Self {
        Self {
            backtrace: Some(backtrace),
            ..Self::default()
        }
    }

    /// A finished program
    pub fn terminated() -> Self {
        Self {
            terminated: true,
            ..Self::default()
        }
    }

    /// Lines of DBMS output, split on newlines
    pub fn dbms_lines(&self) -> Vec<String> {
        self.dbms_output
            .as_ref()
            .and_then(|out| out.line.as_deref())
            .map(|text| text.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}
