use thiserror::Error;

use crate::debugger::kind::PlIdentity;
use crate::debugger::status::DebugStatus;

/// Errors returned by debug session operations.
///
/// Backend refusals during stepping or breakpoint changes are not errors:
/// they are recorded in the session history and reported as `Ok(false)`.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No source could be resolved for the object to debug
    #[error("no PL source available for {0}")]
    SourceUnavailable(PlIdentity),

    /// The debug service failed to create or re-create the session
    #[error("debug service error: {0}")]
    Backend(#[from] anyhow::Error),

    /// Another command is still in flight
    #[error("debug session is busy ({0})")]
    Busy(DebugStatus),

    /// The session already ended
    #[error("debug session has ended ({0})")]
    Ended(DebugStatus),
}

pub type Result<T> = std::result::Result<T, SessionError>;
