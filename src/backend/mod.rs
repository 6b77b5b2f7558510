//! Contracts of the services a debug session talks to.
//!
//! The transport behind them is provided by the host application. Every call
//! is a plain request/response; an `Err` means the service did not answer.

mod types;

pub use types::*;

use anyhow::Result;
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::config::ConnectionContext;
use crate::debugger::kind::PlKind;

/// Remote PL debugger
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DebugBackend: Send + Sync {
    /// Start a backend debug session, returning its identifier
    async fn create_debug_session(&self, request: &CreateSessionRequest) -> Result<String>;

    /// Register breakpoints; the response describes those the server accepted
    async fn add_breakpoints(
        &self,
        session_id: &str,
        points: &[BreakpointRequest],
    ) -> Result<Vec<BreakpointDescriptor>>;

    /// Delete breakpoints by server number
    async fn remove_breakpoints(&self, session_id: &str, points: &[BreakpointRequest]) -> Result<bool>;

    async fn execute_resume(&self, session_id: &str) -> Result<bool>;

    async fn execute_step_in(&self, session_id: &str) -> Result<bool>;

    async fn execute_step_over(&self, session_id: &str) -> Result<bool>;

    async fn execute_step_out(&self, session_id: &str) -> Result<bool>;

    /// Poll the current execution position and values
    async fn get_debug_context(&self, session_id: &str) -> Result<DebugContext>;

    async fn dispose_debug_session(&self, session_id: &str) -> Result<bool>;
}

/// Resolves the source text of stored PL objects
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PlSourceProvider: Send + Sync {
    /// Fetch the DDL of an object; `Ok(None)` when it does not exist
    async fn get_content_from_pl(
        &self,
        kind: PlKind,
        name: &str,
        package_name: Option<String>,
        ctx: &ConnectionContext,
    ) -> Result<Option<String>>;
}
