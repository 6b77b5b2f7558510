use std::fmt;

/// Debug session status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugStatus {
    /// Paused and ready for the next command
    Init,
    /// Continue requested
    Resume,
    /// Step over requested
    StepOver,
    /// Step into requested
    StepIn,
    /// Step out requested
    StepOut,
    /// Stop requested
    Exiting,
    /// Program finished normally
    Success,
    /// Program or session failed
    Fail,
    /// Stopped by the user
    Stop,
    /// Session is being re-created
    Recover,
}

impl DebugStatus {
    /// A command is in flight; no other command may be issued
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Resume | Self::StepOver | Self::StepIn | Self::StepOut | Self::Exiting | Self::Recover
        )
    }

    /// The session is over or being reset
    pub fn is_debug_end(&self) -> bool {
        matches!(self, Self::Stop | Self::Success | Self::Fail | Self::Recover)
    }

    /// The session is over for good; late responses must be dropped
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Stop | Self::Success | Self::Fail)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Resume => "resume",
            Self::StepOver => "step over",
            Self::StepIn => "step in",
            Self::StepOut => "step out",
            Self::Exiting => "exiting",
            Self::Success => "success",
            Self::Fail => "fail",
            Self::Stop => "stop",
            Self::Recover => "recover",
        }
    }
}

impl fmt::Display for DebugStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
