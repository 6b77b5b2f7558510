use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, warn};

use crate::backend::{BreakpointRequest, CreateSessionRequest, DebugBackend, DebugContext, PlSourceProvider};
use crate::config::DebugConfig;
use crate::debugger::breakpoint::{Breakpoint, BreakpointPoint, FrameBreakpoint};
use crate::debugger::context::{ContextVariable, DebugResult, FunctionResult};
use crate::debugger::error::{Result, SessionError};
use crate::debugger::history::{DebugHistory, HistoryMeta, Severity};
use crate::debugger::kind::{DebugTarget, PlIdentity, PlKind};
use crate::debugger::stack::{CallStack, StackFrame};
use crate::debugger::status::DebugStatus;

/// Callback fired after the stack changed, with the new and previous frames
pub type ContextListener = Arc<dyn Fn(&[StackFrame], &[StackFrame]) + Send + Sync>;

/// Handle returned by [`DebugSession::on_context_change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Execution commands accepted while paused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Resume,
    StepOver,
    StepIn,
    StepOut,
}

impl StepAction {
    /// Status held while the command is in flight
    pub fn status(&self) -> DebugStatus {
        match self {
            Self::Resume => DebugStatus::Resume,
            Self::StepOver => DebugStatus::StepOver,
            Self::StepIn => DebugStatus::StepIn,
            Self::StepOut => DebugStatus::StepOut,
        }
    }

    /// History message recorded when the service refuses the command
    pub fn message(&self) -> &'static str {
        match self {
            Self::Resume => "Continue execution",
            Self::StepOver => "Step over",
            Self::StepIn => "Step in",
            Self::StepOut => "Step out",
        }
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Mutable part of a session, guarded by one lock
struct SessionState {
    session_id: String,
    status: DebugStatus,
    stack: CallStack,
    context_variables: Vec<ContextVariable>,
    dbms_output: VecDeque<String>,
    result: DebugResult,
    history: DebugHistory,
    listeners: Vec<(ListenerId, ContextListener)>,
    next_listener_id: u64,
    /// Bumped by stop, recovery and disposal. A response is applied only if
    /// the epoch it was requested under is still current.
    epoch: u64,
    disposed: bool,
}

/// Stack change captured under the lock, delivered once it is released
#[must_use]
struct StackChange {
    listeners: Vec<ContextListener>,
    new: Vec<StackFrame>,
    old: Vec<StackFrame>,
}

impl StackChange {
    fn deliver(self) {
        for listener in &self.listeners {
            listener(&self.new, &self.old);
        }
    }
}

impl SessionState {
    fn stack_change(&self, old: &CallStack) -> StackChange {
        StackChange {
            listeners: self.listeners.iter().map(|(_, listener)| Arc::clone(listener)).collect(),
            new: self.stack.frames().to_vec(),
            old: old.frames().to_vec(),
        }
    }

    /// Meta describing the current execution position
    fn position_meta(&self) -> HistoryMeta {
        match self.stack.active_frame() {
            Some(frame) => {
                let meta = HistoryMeta::new().with_pl_name(frame.identity().to_string());
                match frame.active_line() {
                    Some(line) => meta.with_line(line),
                    None => meta,
                }
            }
            None => HistoryMeta::new(),
        }
    }

    fn push_dbms_output(&mut self, lines: Vec<String>, max_lines: usize) {
        for line in lines {
            self.history.add_history(
                HistoryMeta::new().with_extra("DBMS_OUTPUT"),
                line.clone(),
                Severity::Info,
            );
            self.dbms_output.push_back(line);
        }
        while self.dbms_output.len() > max_lines {
            self.dbms_output.pop_front();
        }
    }

    /// Move the execution position to `identity`, caching `fetched` first if
    /// the frame is new.
    fn update_pl_stack(&mut self, identity: &PlIdentity, line: u32, fetched: Option<StackFrame>) {
        if !self.stack.contains(identity) {
            let frame = fetched.unwrap_or_else(|| StackFrame::new(identity.clone(), String::new()));
            self.stack.push(frame);
        }
        self.stack.activate(identity, line);
    }
}

/// Interactive debug session of one PL object
pub struct DebugSession {
    config: DebugConfig,
    main_identity: PlIdentity,
    backend: Arc<dyn DebugBackend>,
    source: Arc<dyn PlSourceProvider>,
    state: Mutex<SessionState>,
}

impl DebugSession {
    /// Start a debug session.
    ///
    /// The source of the target must resolve (anonymous blocks carry their
    /// own); otherwise nothing is sent to the debug service.
    pub async fn create(
        config: DebugConfig,
        backend: Arc<dyn DebugBackend>,
        source: Arc<dyn PlSourceProvider>,
    ) -> Result<Self> {
        let identity = config.identity();
        let source_text = match config.target.inline_source() {
            Some(text) => text.to_string(),
            None => fetch_source(source.as_ref(), &identity, &config)
                .await
                .ok_or_else(|| SessionError::SourceUnavailable(identity.clone()))?,
        };

        let request = CreateSessionRequest {
            target: config.target.clone(),
            connection: config.connection.clone(),
        };
        let session_id = backend.create_debug_session(&request).await.map_err(|e| {
            error!("Failed to create debug session for {}: {}", identity, e);
            SessionError::Backend(e)
        })?;
        info!("Debug session {} created for {} {}", session_id, identity.kind, identity);

        let mut history = DebugHistory::new();
        history.add_history(
            HistoryMeta::new().with_pl_name(identity.to_string()),
            "Start debugging",
            Severity::Info,
        );

        let stack = CallStack::with_main(StackFrame::new(identity.clone(), source_text));
        Ok(Self {
            config,
            main_identity: identity,
            backend,
            source,
            state: Mutex::new(SessionState {
                session_id,
                status: DebugStatus::Init,
                stack,
                context_variables: Vec::new(),
                dbms_output: VecDeque::new(),
                result: DebugResult::None,
                history,
                listeners: Vec::new(),
                next_listener_id: 1,
                epoch: 0,
                disposed: false,
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Backend-assigned session identifier
    pub fn id(&self) -> String {
        self.state().session_id.clone()
    }

    pub fn config(&self) -> &DebugConfig {
        &self.config
    }

    pub fn kind(&self) -> PlKind {
        self.config.target.kind()
    }

    pub fn package_name(&self) -> Option<&str> {
        self.config.target.package_name()
    }

    pub fn status(&self) -> DebugStatus {
        self.state().status
    }

    pub fn is_debug_end(&self) -> bool {
        self.status().is_debug_end()
    }

    /// Snapshot of the cached frames
    pub fn stack(&self) -> Vec<StackFrame> {
        self.state().stack.frames().to_vec()
    }

    pub fn active_frame(&self) -> Option<StackFrame> {
        self.state().stack.active_frame().cloned()
    }

    pub fn frame(&self, identity: &PlIdentity) -> Option<StackFrame> {
        self.state().stack.find(identity).cloned()
    }

    pub fn context_variables(&self) -> Vec<ContextVariable> {
        self.state().context_variables.clone()
    }

    pub fn result(&self) -> DebugResult {
        self.state().result.clone()
    }

    pub fn history(&self) -> DebugHistory {
        self.state().history.clone()
    }

    pub fn dbms_output(&self) -> Vec<String> {
        self.state().dbms_output.iter().cloned().collect()
    }

    /// Breakpoints of every frame, ordered by server number
    pub fn get_all_breakpoints(&self) -> Vec<FrameBreakpoint> {
        self.state().stack.get_all_breakpoints()
    }

    /// Identity of the main object, or of the frame execution is paused in
    pub fn get_pl_name(&self, is_main: bool) -> PlIdentity {
        if is_main {
            return self.main_identity.clone();
        }
        self.state()
            .stack
            .active_frame()
            .map(|frame| frame.identity().clone())
            .unwrap_or_else(|| self.main_identity.clone())
    }

    /// Register a stack change listener. Listeners run synchronously, in
    /// registration order, after the session lock is released, so they may
    /// query the session.
    pub fn on_context_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&[StackFrame], &[StackFrame]) + Send + Sync + 'static,
    {
        let mut state = self.state();
        let id = ListenerId(state.next_listener_id);
        state.next_listener_id += 1;
        state.listeners.push((id, Arc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut state = self.state();
        let before = state.listeners.len();
        state.listeners.retain(|(listener_id, _)| *listener_id != id);
        state.listeners.len() != before
    }

    pub async fn execute_resume(&self) -> Result<bool> {
        self.execute(StepAction::Resume).await
    }

    pub async fn execute_step_over(&self) -> Result<bool> {
        self.execute(StepAction::StepOver).await
    }

    pub async fn execute_step_in(&self) -> Result<bool> {
        self.execute(StepAction::StepIn).await
    }

    pub async fn execute_step_out(&self) -> Result<bool> {
        self.execute(StepAction::StepOut).await
    }

    /// Run an execution command and, once acknowledged, poll the new context.
    ///
    /// Returns `Ok(false)` when the service refused the command; the status is
    /// back to [`DebugStatus::Init`] and the refusal is in the history.
    pub async fn execute(&self, action: StepAction) -> Result<bool> {
        let (session_id, epoch) = {
            let mut state = self.state();
            if state.status.is_transient() {
                return Err(SessionError::Busy(state.status));
            }
            if state.status.is_debug_end() {
                return Err(SessionError::Ended(state.status));
            }
            state.status = action.status();
            (state.session_id.clone(), state.epoch)
        };
        debug!("Session {}: {}", session_id, action);

        let acked = match action {
            StepAction::Resume => self.backend.execute_resume(&session_id).await,
            StepAction::StepOver => self.backend.execute_step_over(&session_id).await,
            StepAction::StepIn => self.backend.execute_step_in(&session_id).await,
            StepAction::StepOut => self.backend.execute_step_out(&session_id).await,
        };
        let acked = match acked {
            Ok(acked) => acked,
            Err(e) => {
                warn!("Session {}: {} failed: {}", session_id, action, e);
                false
            }
        };

        if !acked {
            let mut state = self.state();
            if state.epoch != epoch {
                debug!("Session {}: dropping stale {} response", session_id, action);
                return Ok(false);
            }
            let meta = state.position_meta();
            state.history.add_history(meta, action.message(), Severity::Error);
            state.status = DebugStatus::Init;
            return Ok(false);
        }

        self.sync_under(epoch).await;
        Ok(true)
    }

    /// Poll the debug service for the current position and values
    pub async fn sync_debug_context(&self) -> DebugStatus {
        let epoch = self.state().epoch;
        self.sync_under(epoch).await
    }

    async fn sync_under(&self, epoch: u64) -> DebugStatus {
        let session_id = {
            let state = self.state();
            if state.epoch != epoch || state.status.is_finished() {
                return state.status;
            }
            state.session_id.clone()
        };

        let context = match self.backend.get_debug_context(&session_id).await {
            Ok(context) => context,
            Err(e) => {
                error!("Session {}: sync context failed: {}", session_id, e);
                {
                    let mut state = self.state();
                    if state.epoch != epoch || state.status.is_finished() {
                        return state.status;
                    }
                    let meta = state.position_meta();
                    state.history.add_history(meta, "Sync context failed", Severity::Error);
                    state.status = DebugStatus::Fail;
                }
                self.dispose().await;
                return DebugStatus::Fail;
            }
        };

        if context.terminated {
            return self.finish(epoch, context).await;
        }

        let position = context.backtrace.as_ref().map(|bt| (bt.identity(), bt.line_num));
        let missing = match &position {
            Some((identity, _)) => !self.state().stack.contains(identity),
            None => false,
        };
        let fetched = match (&position, missing) {
            (Some((identity, _)), true) => Some(self.load_frame(identity).await),
            _ => None,
        };

        let change = {
            let mut state = self.state();
            if state.epoch != epoch || state.status.is_finished() {
                debug!("Session {}: dropping stale context", session_id);
                return state.status;
            }
            let old = state.stack.clone();
            match position {
                Some((identity, line)) => state.update_pl_stack(&identity, line, fetched),
                None => warn!("Session {}: context has no backtrace", session_id),
            }
            state.context_variables = context.variables.clone();
            state.push_dbms_output(context.dbms_lines(), self.config.options.max_dbms_output_lines);
            state.status = DebugStatus::Init;
            state.stack_change(&old)
        };
        change.deliver();
        DebugStatus::Init
    }

    /// Record the outcome of a terminated program and release the session
    async fn finish(&self, epoch: u64, context: DebugContext) -> DebugStatus {
        let status = {
            let mut state = self.state();
            if state.epoch != epoch || state.status.is_finished() {
                return state.status;
            }
            state.context_variables.clear();
            state.push_dbms_output(context.dbms_lines(), self.config.options.max_dbms_output_lines);

            if !context.errors.is_empty() {
                for err in &context.errors {
                    let mut meta = HistoryMeta::new();
                    if let Some(line) = err.line {
                        meta = meta.with_line(line);
                    }
                    state.history.add_history(meta, err.text.clone(), Severity::Error);
                }
                state.result = DebugResult::Errors(context.errors);
                state.status = DebugStatus::Fail;
            } else {
                state.result = self.compute_result(context);
                state
                    .history
                    .add_history(HistoryMeta::new(), "Process exit", Severity::Info);
                state.status = DebugStatus::Success;
            }
            state.status
        };
        info!("Debug session {} finished: {}", self.id(), status);
        self.dispose().await;
        status
    }

    fn compute_result(&self, context: DebugContext) -> DebugResult {
        match &self.config.target {
            DebugTarget::Function { return_type, .. } => {
                DebugResult::Function(context.function_result.unwrap_or_else(|| FunctionResult {
                    return_type: return_type.clone(),
                    value: None,
                }))
            }
            DebugTarget::Procedure { .. } => DebugResult::Procedure(
                context
                    .procedure_result
                    .into_iter()
                    .filter(|param| param.mode.is_output())
                    .collect(),
            ),
            DebugTarget::AnonymousBlock { .. }
            | DebugTarget::PackageHead { .. }
            | DebugTarget::PackageBody { .. } => DebugResult::None,
        }
    }

    /// Build a frame for an object execution just entered
    async fn load_frame(&self, identity: &PlIdentity) -> StackFrame {
        let text = fetch_source(self.source.as_ref(), identity, &self.config).await;
        if text.is_none() {
            warn!("No source for {}, caching an empty frame", identity);
        }
        StackFrame::new(identity.clone(), text.unwrap_or_default())
    }

    /// Stop debugging. Always ends in [`DebugStatus::Stop`]; the backend
    /// disposal outcome is ignored.
    pub async fn execute_exit(&self) {
        {
            let mut state = self.state();
            state.status = DebugStatus::Exiting;
            state.epoch += 1;
            let meta = state.position_meta();
            state.history.add_history(meta, "Stop debugging", Severity::Warn);
        }
        self.dispose().await;
        self.state().status = DebugStatus::Stop;
        info!("Debug session {} stopped", self.id());
    }

    /// Release the backend session. Returns whether the service acknowledged;
    /// repeated calls are no-ops.
    pub async fn dispose(&self) -> bool {
        let session_id = {
            let mut state = self.state();
            if state.disposed {
                return false;
            }
            state.disposed = true;
            state.epoch += 1;
            state.session_id.clone()
        };
        match self.backend.dispose_debug_session(&session_id).await {
            Ok(true) => {
                debug!("Debug session {} disposed", session_id);
                true
            }
            Ok(false) => {
                warn!("Debug service refused to dispose session {}", session_id);
                false
            }
            Err(e) => {
                warn!("Failed to dispose debug session {}: {}", session_id, e);
                false
            }
        }
    }

    /// Re-create the backend session after it was lost.
    ///
    /// Only the main frame survives; its breakpoints are registered again on
    /// the new session and the result of that registration is returned.
    /// History, result and context are reset. If the service cannot create a
    /// session nothing changes: the previous status and backend session stay.
    pub async fn recover_debug(&self) -> Result<bool> {
        let (previous, epoch) = {
            let mut state = self.state();
            if state.status.is_transient() {
                return Err(SessionError::Busy(state.status));
            }
            let previous = state.status;
            state.status = DebugStatus::Recover;
            (previous, state.epoch)
        };

        let request = CreateSessionRequest {
            target: self.config.target.clone(),
            connection: self.config.connection.clone(),
        };
        let new_id = match self.backend.create_debug_session(&request).await {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to recover debug session for {}: {}", self.main_identity, e);
                let mut state = self.state();
                if state.epoch == epoch {
                    state.status = previous;
                }
                return Err(SessionError::Backend(e));
            }
        };

        let committed = {
            let mut state = self.state();
            if state.epoch != epoch {
                if state.status == DebugStatus::Recover {
                    state.status = previous;
                }
                None
            } else {
                let stale_id = (!state.disposed).then(|| state.session_id.clone());
                state.session_id = new_id.clone();
                state.disposed = false;
                // Responses requested against the old session no longer apply
                state.epoch += 1;
                state.stack.truncate_to_main();
                let main_breakpoints: Vec<Breakpoint> = state
                    .stack
                    .find_mut(&self.main_identity)
                    .map(StackFrame::clear_breakpoints)
                    .unwrap_or_default();
                state.history = DebugHistory::new();
                state.history.add_history(
                    HistoryMeta::new().with_pl_name(self.main_identity.to_string()),
                    "Debug session recovered",
                    Severity::Info,
                );
                state.result = DebugResult::None;
                state.context_variables.clear();
                state.dbms_output.clear();
                state.status = DebugStatus::Init;
                info!("Debug session {} recovered", state.session_id);

                let main = self.get_pl_name(true);
                let points: Vec<BreakpointPoint> = main_breakpoints
                    .iter()
                    .map(|bp| BreakpointPoint::new(main.clone(), bp.line()))
                    .collect();
                Some((stale_id, points))
            }
        };

        let Some((stale_id, points)) = committed else {
            warn!("Session stopped during recovery, releasing {}", new_id);
            let _ = self.backend.dispose_debug_session(&new_id).await;
            return Ok(false);
        };
        if let Some(stale_id) = stale_id {
            if let Err(e) = self.backend.dispose_debug_session(&stale_id).await {
                debug!("Lost session {} could not be disposed: {}", stale_id, e);
            }
        }
        match self.add_breakpoints(points).await {
            Err(SessionError::Ended(status)) => {
                debug!("Session ended ({}) before breakpoints were restored", status);
                Ok(false)
            }
            restored => restored,
        }
    }

    /// Register breakpoints. The local cache changes only for breakpoints the
    /// service acknowledged.
    pub async fn add_breakpoints(&self, points: Vec<BreakpointPoint>) -> Result<bool> {
        if points.is_empty() {
            return Ok(true);
        }
        let (session_id, epoch) = {
            let state = self.state();
            if state.status.is_debug_end() {
                return Err(SessionError::Ended(state.status));
            }
            (state.session_id.clone(), state.epoch)
        };

        let requests: Vec<BreakpointRequest> = points.iter().map(BreakpointRequest::from_point).collect();
        let response = self.backend.add_breakpoints(&session_id, &requests).await;

        let (change, acked) = {
            let mut state = self.state();
            if state.epoch != epoch {
                debug!("Session {}: dropping stale breakpoint response", session_id);
                return Ok(false);
            }
            match response {
                Ok(descriptors) => {
                    let old = state.stack.clone();
                    for descriptor in descriptors {
                        let identity = descriptor.identity();
                        let line = descriptor.line_num;
                        let inserted = match state.stack.find_mut(&identity) {
                            Some(frame) => {
                                frame.insert_breakpoint(Breakpoint::new(line, descriptor.breakpoint_num));
                                true
                            }
                            None => false,
                        };
                        if inserted {
                            state.history.add_history(
                                HistoryMeta::new().with_pl_name(identity.to_string()).with_line(line),
                                "Add breakpoint",
                                Severity::Info,
                            );
                        } else {
                            warn!(
                                "Breakpoint {} acknowledged for unknown frame {}",
                                descriptor.breakpoint_num, identity
                            );
                        }
                    }
                    (state.stack_change(&old), true)
                }
                Err(e) => {
                    warn!("Session {}: add breakpoints failed: {}", session_id, e);
                    for point in &points {
                        state.history.add_history(
                            HistoryMeta::new().with_pl_name(point.pl_name()).with_line(point.line),
                            "Add breakpoint failed",
                            Severity::Error,
                        );
                    }
                    let unchanged = state.stack.clone();
                    (state.stack_change(&unchanged), false)
                }
            }
        };
        change.deliver();
        Ok(acked)
    }

    /// Remove breakpoints. Points without a local breakpoint are ignored; if
    /// none match, nothing is sent. Once the session ended only the local cache
    /// is updated. If the backend session was replaced by a recovery while the
    /// request was in flight, the cache is left alone and `Ok(false)` returned.
    pub async fn remove_breakpoints(&self, points: Vec<BreakpointPoint>) -> Result<bool> {
        let (resolved, ended, session_id) = {
            let state = self.state();
            let resolved: Vec<(BreakpointPoint, Breakpoint)> = points
                .into_iter()
                .filter_map(|point| {
                    let bp = *state.stack.find(&point.identity)?.find_breakpoint(point.line)?;
                    Some((point, bp))
                })
                .collect();
            if resolved.is_empty() {
                return Ok(true);
            }
            (resolved, state.status.is_debug_end(), state.session_id.clone())
        };

        let acked = if ended {
            true
        } else {
            let requests: Vec<BreakpointRequest> = resolved
                .iter()
                .map(|(point, bp)| BreakpointRequest::from_point(point).with_breakpoint_num(bp.server_id()))
                .collect();
            match self.backend.remove_breakpoints(&session_id, &requests).await {
                Ok(acked) => acked,
                Err(e) => {
                    warn!("Session {}: remove breakpoints failed: {}", session_id, e);
                    false
                }
            }
        };

        let (change, removed) = {
            let mut state = self.state();
            if state.session_id != session_id {
                // The new session registered its own copy of these breakpoints
                debug!("Session {} replaced by {}, keeping breakpoints", session_id, state.session_id);
                return Ok(false);
            }
            let old = state.stack.clone();
            // A session that ended meanwhile no longer holds the breakpoints
            if !acked && !state.status.is_finished() {
                for (point, _) in &resolved {
                    state.history.add_history(
                        HistoryMeta::new().with_pl_name(point.pl_name()).with_line(point.line),
                        "Remove breakpoint failed",
                        Severity::Error,
                    );
                }
                (state.stack_change(&old), false)
            } else {
                for (point, _) in &resolved {
                    let removed = state
                        .stack
                        .find_mut(&point.identity)
                        .and_then(|frame| frame.remove_breakpoint(point.line));
                    if removed.is_some() {
                        state.history.add_history(
                            HistoryMeta::new().with_pl_name(point.pl_name()).with_line(point.line),
                            "Remove breakpoint",
                            Severity::Info,
                        );
                    }
                }
                (state.stack_change(&old), true)
            }
        };
        change.deliver();
        Ok(removed)
    }
}

async fn fetch_source(
    source: &dyn PlSourceProvider,
    identity: &PlIdentity,
    config: &DebugConfig,
) -> Option<String> {
    match source
        .get_content_from_pl(identity.kind, &identity.name, identity.package_name.clone(), &config.connection)
        .await
    {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to load source of {}: {}", identity, e);
            None
        }
    }
}
