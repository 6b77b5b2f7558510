//! PLDEBUG - client-side engine for interactive PL debugging
//!
//! Drives a remote stored procedure / function / anonymous block debugger
//! through a request/response protocol. The engine keeps the call-stack cache
//! with per-frame breakpoints, the session history and the final result; the
//! host application supplies the transport ([`backend::DebugBackend`]), the
//! PL source ([`backend::PlSourceProvider`]) and renders what it produces.

pub mod backend;
pub mod config;
pub mod debugger;

/// Re-export key types for easier access
pub use config::{ConnectionContext, DebugConfig, SessionOptions};
pub use debugger::breakpoint::{Breakpoint, BreakpointPoint, FrameBreakpoint};
pub use debugger::context::{ContextVariable, DebugResult, ExecutionError, FunctionResult, ProcedureParam};
pub use debugger::error::SessionError;
pub use debugger::history::{DebugHistory, DebugHistoryRecord, HistoryMeta, Severity};
pub use debugger::kind::{DebugTarget, ParamMode, PlIdentity, PlKind, PlParam};
pub use debugger::pool::DebugSessionPool;
pub use debugger::session::{DebugSession, ListenerId, StepAction};
pub use debugger::stack::{CallStack, StackFrame};
pub use debugger::status::DebugStatus;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize the logging system. Fails if a logger is already installed.
pub fn init_logging(level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .filter_module("pldebug", level)
        .format_timestamp_secs()
        .try_init()
}
