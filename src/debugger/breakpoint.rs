#![allow(clippy::must_use_candidate)]

use std::fmt;

use crate::debugger::kind::{PlIdentity, PlKind};

/// A breakpoint acknowledged by the debug service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakpoint {
    /// Source line (1-based) inside the owning frame
    line: u32,
    /// Breakpoint number assigned by the server
    server_id: u64,
}

impl Breakpoint {
    /// Create a new breakpoint
    pub fn new(line: u32, server_id: u64) -> Self {
        Self { line, server_id }
    }

    /// Get the source line of the breakpoint
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Get the server-assigned breakpoint number
    pub fn server_id(&self) -> u64 {
        self.server_id
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Breakpoint #{} at line {}", self.server_id, self.line)
    }
}

/// A breakpoint location requested by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointPoint {
    /// Frame the breakpoint belongs to
    pub identity: PlIdentity,
    /// Source line
    pub line: u32,
}

impl BreakpointPoint {
    pub fn new(identity: PlIdentity, line: u32) -> Self {
        Self { identity, line }
    }

    /// Shorthand for a point in a standalone object
    pub fn at(kind: PlKind, name: impl Into<String>, line: u32) -> Self {
        Self::new(PlIdentity::new(kind, name, None), line)
    }

    /// Description used as the `pl_name` of history records
    pub fn pl_name(&self) -> String {
        self.identity.to_string()
    }
}

impl fmt::Display for BreakpointPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.identity, self.line)
    }
}

/// A breakpoint in a frame, flattened for display across the whole stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBreakpoint {
    pub identity: PlIdentity,
    pub breakpoint: Breakpoint,
}

/// Flatten the breakpoints of every frame and order them by server number.
///
/// Server numbers reflect assignment order; display numbering depends on it,
/// so the result must not be reordered by source line.
pub fn sort_by_server_id(mut breakpoints: Vec<FrameBreakpoint>) -> Vec<FrameBreakpoint> {
    breakpoints.sort_by_key(|bp| bp.breakpoint.server_id());
    breakpoints
}
