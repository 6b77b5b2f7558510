//! Configuration passed when a debug session is created

use crate::debugger::kind::{DebugTarget, PlIdentity, PlParam};

/// Default cap on buffered DBMS output lines
pub const DEFAULT_MAX_DBMS_OUTPUT_LINES: usize = 1000;

/// Database connection the debug session runs on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionContext {
    /// Identifier of the connection/session held by the host application
    pub connection_id: String,
    /// Schema PL objects are resolved against
    pub schema: String,
}

impl ConnectionContext {
    pub fn new(connection_id: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            schema: schema.into(),
        }
    }
}

/// Tunables of a debug session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Oldest DBMS output lines are dropped beyond this count
    pub max_dbms_output_lines: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_dbms_output_lines: DEFAULT_MAX_DBMS_OUTPUT_LINES,
        }
    }
}

/// Everything needed to start a debug session
#[derive(Debug, Clone, PartialEq)]
pub struct DebugConfig {
    pub target: DebugTarget,
    pub connection: ConnectionContext,
    pub options: SessionOptions,
}

impl DebugConfig {
    pub fn new(target: DebugTarget, connection: ConnectionContext) -> Self {
        Self {
            target,
            connection,
            options: SessionOptions::default(),
        }
    }

    /// Debug a standalone procedure
    pub fn procedure(name: impl Into<String>, connection: ConnectionContext) -> Self {
        Self::new(
            DebugTarget::Procedure {
                name: name.into(),
                package_name: None,
                params: Vec::new(),
            },
            connection,
        )
    }

    /// Debug a standalone function
    pub fn function(
        name: impl Into<String>,
        return_type: impl Into<String>,
        connection: ConnectionContext,
    ) -> Self {
        Self::new(
            DebugTarget::Function {
                name: name.into(),
                package_name: None,
                params: Vec::new(),
                return_type: return_type.into(),
            },
            connection,
        )
    }

    /// Debug an anonymous block
    pub fn anonymous_block(text: impl Into<String>, connection: ConnectionContext) -> Self {
        Self::new(DebugTarget::AnonymousBlock { text: text.into() }, connection)
    }

    /// Place a function or procedure inside a package
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        match &mut self.target {
            DebugTarget::Function { package_name, .. } | DebugTarget::Procedure { package_name, .. } => {
                *package_name = Some(package.into());
            }
            _ => {}
        }
        self
    }

    /// Add a parameter to a function or procedure target
    pub fn with_param(mut self, param: PlParam) -> Self {
        match &mut self.target {
            DebugTarget::Function { params, .. } | DebugTarget::Procedure { params, .. } => {
                params.push(param);
            }
            _ => {}
        }
        self
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Identity of the main frame
    pub fn identity(&self) -> PlIdentity {
        self.target.identity()
    }
}
