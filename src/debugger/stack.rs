use std::fmt;

use log::debug;

use crate::debugger::breakpoint::{sort_by_server_id, Breakpoint, FrameBreakpoint};
use crate::debugger::kind::{PlIdentity, PlKind};

/// Cached source and breakpoints for one PL object encountered while debugging
#[derive(Debug, Clone, PartialEq)]
pub struct StackFrame {
    /// Object identity (package, name, kind)
    identity: PlIdentity,
    /// PL source text
    source_text: String,
    /// Acknowledged breakpoints, unique by line
    breakpoints: Vec<Breakpoint>,
    /// Is execution currently paused in this frame?
    is_active: bool,
    /// Paused line, only meaningful while active
    active_line: Option<u32>,
}

impl StackFrame {
    /// Create a new inactive frame without breakpoints
    pub fn new(identity: PlIdentity, source_text: impl Into<String>) -> Self {
        Self {
            identity,
            source_text: source_text.into(),
            breakpoints: Vec::new(),
            is_active: false,
            active_line: None,
        }
    }

    pub fn identity(&self) -> &PlIdentity {
        &self.identity
    }

    pub fn object_name(&self) -> &str {
        &self.identity.name
    }

    pub fn package_name(&self) -> Option<&str> {
        self.identity.package_name.as_deref()
    }

    pub fn kind(&self) -> PlKind {
        self.identity.kind
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn active_line(&self) -> Option<u32> {
        self.active_line
    }

    /// Find a breakpoint by source line
    pub fn find_breakpoint(&self, line: u32) -> Option<&Breakpoint> {
        self.breakpoints.iter().find(|bp| bp.line() == line)
    }

    /// Check whether a breakpoint exists at a line
    pub fn has_breakpoint(&self, line: u32) -> bool {
        self.find_breakpoint(line).is_some()
    }

    /// Record an acknowledged breakpoint. A line that already has one takes
    /// the newer server number, keeping lines unique.
    pub(crate) fn insert_breakpoint(&mut self, breakpoint: Breakpoint) {
        match self.breakpoints.iter_mut().find(|bp| bp.line() == breakpoint.line()) {
            Some(existing) => *existing = breakpoint,
            None => self.breakpoints.push(breakpoint),
        }
    }

    /// Remove the breakpoint at a line, returning it
    pub(crate) fn remove_breakpoint(&mut self, line: u32) -> Option<Breakpoint> {
        let pos = self.breakpoints.iter().position(|bp| bp.line() == line)?;
        Some(self.breakpoints.remove(pos))
    }

    pub(crate) fn clear_breakpoints(&mut self) -> Vec<Breakpoint> {
        std::mem::take(&mut self.breakpoints)
    }

    fn set_active(&mut self, line: Option<u32>) {
        self.is_active = true;
        self.active_line = line;
    }

    fn set_inactive(&mut self) {
        self.is_active = false;
        self.active_line = None;
    }

    /// Get a descriptive string for the frame
    pub fn description(&self) -> String {
        match (self.is_active, self.active_line) {
            (true, Some(line)) => format!("{} {} (line {})", self.kind(), self.identity, line),
            (true, None) => format!("{} {} (active)", self.kind(), self.identity),
            _ => format!("{} {}", self.kind(), self.identity),
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// Ordered frame cache of a debug session. The first frame is the object the
/// session was created for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallStack {
    frames: Vec<StackFrame>,
}

impl CallStack {
    /// Create a stack holding only the main frame, active at no particular line
    pub fn with_main(mut main: StackFrame) -> Self {
        main.set_active(None);
        Self { frames: vec![main] }
    }

    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn main_frame(&self) -> Option<&StackFrame> {
        self.frames.first()
    }

    /// Get the frame execution is paused in
    pub fn active_frame(&self) -> Option<&StackFrame> {
        self.frames.iter().find(|frame| frame.is_active)
    }

    pub fn find(&self, identity: &PlIdentity) -> Option<&StackFrame> {
        self.frames.iter().find(|frame| &frame.identity == identity)
    }

    pub(crate) fn find_mut(&mut self, identity: &PlIdentity) -> Option<&mut StackFrame> {
        self.frames.iter_mut().find(|frame| &frame.identity == identity)
    }

    pub fn contains(&self, identity: &PlIdentity) -> bool {
        self.find(identity).is_some()
    }

    /// Append a newly discovered frame; it stays inactive until activated
    pub(crate) fn push(&mut self, frame: StackFrame) {
        debug!("Caching new frame {}", frame.identity);
        self.frames.push(frame);
    }

    /// Move the execution position.
    ///
    /// When the target is already the active frame only its line changes.
    /// Otherwise exactly the target becomes active and every other frame is
    /// cleared. Returns `false` if the target is not cached.
    pub(crate) fn activate(&mut self, identity: &PlIdentity, line: u32) -> bool {
        if let Some(active) = self.frames.iter_mut().find(|f| f.is_active && &f.identity == identity) {
            active.active_line = Some(line);
            return true;
        }
        if !self.contains(identity) {
            return false;
        }
        for frame in &mut self.frames {
            if &frame.identity == identity {
                frame.set_active(Some(line));
            } else {
                frame.set_inactive();
            }
        }
        true
    }

    /// Drop every frame but the main one and make it active again
    pub(crate) fn truncate_to_main(&mut self) {
        self.frames.truncate(1);
        if let Some(main) = self.frames.first_mut() {
            main.set_active(None);
        }
    }

    /// Flatten breakpoints of every frame, ordered by server number
    pub fn get_all_breakpoints(&self) -> Vec<FrameBreakpoint> {
        let all = self
            .frames
            .iter()
            .flat_map(|frame| {
                frame.breakpoints.iter().map(move |bp| FrameBreakpoint {
                    identity: frame.identity.clone(),
                    breakpoint: *bp,
                })
            })
            .collect();
        sort_by_server_id(all)
    }
}
