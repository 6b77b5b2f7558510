use std::sync::{Arc, Mutex};

use test_case::test_case;

use pldebug::backend::{DbmsOutput, DebugContext};
use pldebug::{
    BreakpointPoint, ContextVariable, DebugConfig, DebugResult, DebugSession, DebugStatus, FunctionResult,
    PlIdentity, PlKind, SessionError, Severity, StepAction,
};

use crate::support::{connection, paused, start_p1, MapSource, ScriptedBackend};

fn p1() -> PlIdentity {
    PlIdentity::new(PlKind::Procedure, "P1", None)
}

#[test_case(StepAction::Resume, "Continue execution" ; "resume")]
#[test_case(StepAction::StepOver, "Step over" ; "step over")]
#[test_case(StepAction::StepIn, "Step in" ; "step in")]
#[test_case(StepAction::StepOut, "Step out" ; "step out")]
#[tokio::test]
async fn test_refused_action_logs_one_error(action: StepAction, message: &str) {
    let (session, backend, _) = start_p1().await;
    backend.refuse_steps(true);

    assert!(!session.execute(action).await.unwrap());

    assert_eq!(session.status(), DebugStatus::Init);
    let history = session.history();
    let errors: Vec<_> = history.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, message);
    assert_eq!(backend.count("context"), 0);
}

#[tokio::test]
async fn test_step_in_and_out_then_finish() {
    let (session, backend, source) = start_p1().await;
    let transitions = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&transitions);
    session.on_context_change(move |new, old| {
        let active = |frames: &[pldebug::StackFrame]| {
            frames
                .iter()
                .find(|f| f.is_active())
                .map(|f| (f.object_name().to_string(), f.active_line()))
        };
        seen.lock().unwrap().push((active(old), active(new), new.len()));
    });

    let mut in_f1 = paused(PlKind::Function, "F1", None, 2);
    in_f1.variables = vec![ContextVariable::new("X", 0, Some("1".into()))];
    backend.push_context(paused(PlKind::Procedure, "P1", None, 1));
    backend.push_context(in_f1);
    backend.push_context(paused(PlKind::Procedure, "P1", None, 3));
    let mut done = DebugContext::terminated();
    done.dbms_output = Some(DbmsOutput { line: Some("done".into()) });
    done.variables = vec![ContextVariable::new("ignored", 0, None)];
    backend.push_context(done);

    assert!(session.execute_step_over().await.unwrap());
    assert!(session.execute_step_in().await.unwrap());
    assert_eq!(session.context_variables().len(), 1);
    assert_eq!(session.stack().len(), 2);
    assert!(session.execute_step_out().await.unwrap());
    assert_eq!(session.active_frame().unwrap().identity(), &p1());
    assert!(session.execute_resume().await.unwrap());

    assert_eq!(session.status(), DebugStatus::Success);
    assert_eq!(session.result(), DebugResult::Procedure(Vec::new()));
    assert!(session.context_variables().is_empty());
    assert_eq!(session.dbms_output(), vec!["done".to_string()]);
    assert_eq!(backend.count("dispose:s1"), 1);
    // P1 came from create, F1 from the step in
    assert_eq!(source.fetches(), 2);

    let transitions = transitions.lock().unwrap().clone();
    assert_eq!(
        transitions,
        vec![
            (Some(("P1".to_string(), None)), Some(("P1".to_string(), Some(1))), 1),
            (Some(("P1".to_string(), Some(1))), Some(("F1".to_string(), Some(2))), 2),
            (Some(("F1".to_string(), Some(2))), Some(("P1".to_string(), Some(3))), 2),
        ]
    );
}

#[tokio::test]
async fn test_function_result() {
    let backend = ScriptedBackend::new();
    let source = MapSource::new().with(PlKind::Function, "F1", "FUNCTION F1 RETURN NUMBER");
    let config = DebugConfig::function("F1", "NUMBER", connection());
    let session = DebugSession::create(config, backend.clone(), source).await.unwrap();

    let mut done = DebugContext::terminated();
    done.function_result = Some(FunctionResult {
        return_type: "NUMBER".into(),
        value: Some("42".into()),
    });
    backend.push_context(done);

    assert_eq!(session.sync_debug_context().await, DebugStatus::Success);
    match session.result() {
        DebugResult::Function(result) => assert_eq!(result.value.as_deref(), Some("42")),
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_anonymous_block_stays_in_one_frame() {
    let backend = ScriptedBackend::new();
    let source = MapSource::new();
    let config = DebugConfig::anonymous_block("DECLARE x NUMBER; BEGIN x := 1; END;", connection());
    let session = DebugSession::create(config, backend.clone(), source.clone()).await.unwrap();
    assert_eq!(source.fetches(), 0);

    backend.push_context(paused(PlKind::AnonymousBlock, "", None, 2));
    assert!(session.execute_step_over().await.unwrap());

    let stack = session.stack();
    assert_eq!(stack.len(), 1);
    assert_eq!(stack[0].active_line(), Some(2));
    assert_eq!(source.fetches(), 0);
    assert_eq!(session.result(), DebugResult::None);
}

#[tokio::test]
async fn test_recover_after_lost_session() {
    let (session, backend, _) = start_p1().await;
    session.add_breakpoints(vec![BreakpointPoint::new(p1(), 4)]).await.unwrap();
    backend.push_lost_context();

    assert!(session.execute_resume().await.unwrap());
    assert_eq!(session.status(), DebugStatus::Fail);
    assert_eq!(backend.count("dispose:s1"), 1);

    assert!(session.recover_debug().await.unwrap());
    assert_eq!(session.status(), DebugStatus::Init);
    assert_eq!(session.id(), "s2");
    // Disposed before, so recovery does not dispose again
    assert_eq!(backend.count("dispose"), 1);
    assert_eq!(backend.count("add:s2"), 1);

    let all = session.get_all_breakpoints();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].breakpoint.line(), 4);
    assert_eq!(all[0].breakpoint.server_id(), 2);

    let history = session.history();
    assert!(history.errors().next().is_none());
    assert!(history.records().iter().all(|r| r.severity == Severity::Info));
}

#[tokio::test]
async fn test_stop_is_final() {
    let (session, backend, _) = start_p1().await;

    session.execute_exit().await;
    session.execute_exit().await;

    assert_eq!(session.status(), DebugStatus::Stop);
    assert_eq!(backend.count("dispose"), 1);
    let warnings = session
        .history()
        .records()
        .iter()
        .filter(|r| r.severity == Severity::Warn)
        .count();
    assert_eq!(warnings, 2);
}

#[tokio::test]
async fn test_failed_recovery_keeps_live_session() {
    let (session, backend, _) = start_p1().await;
    backend.fail_create(true);
    backend.push_context(paused(PlKind::Procedure, "P1", None, 2));

    let recovered = session.recover_debug().await;
    assert!(matches!(recovered, Err(SessionError::Backend(_))));
    assert_eq!(session.status(), DebugStatus::Init);
    assert!(session.execute_step_over().await.unwrap());

    assert_eq!(
        backend.calls(),
        vec!["create:P1", "create:P1", "step_over:s1", "context:s1"]
    );
    session.execute_exit().await;
    assert_eq!(backend.count("dispose:s1"), 1);
}

#[tokio::test]
async fn test_recovery_reports_lost_breakpoints() {
    let (session, backend, _) = start_p1().await;
    session.add_breakpoints(vec![BreakpointPoint::new(p1(), 4)]).await.unwrap();
    backend.fail_add(true);

    assert!(!session.recover_debug().await.unwrap());

    assert_eq!(session.status(), DebugStatus::Init);
    assert_eq!(session.id(), "s2");
    assert!(session.get_all_breakpoints().is_empty());
    let history = session.history();
    let errors: Vec<_> = history.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Add breakpoint failed");
    assert_eq!(
        backend.calls(),
        vec!["create:P1", "add:s1", "create:P1", "dispose:s1", "add:s2"]
    );
}

#[tokio::test]
async fn test_listener_can_query_session() {
    let (session, backend, _) = start_p1().await;
    let session = Arc::new(session);
    let handle = Arc::downgrade(&session);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    session.on_context_change(move |new, _| {
        if let Some(session) = handle.upgrade() {
            let breakpoints = session.get_all_breakpoints().len();
            log.lock().unwrap().push((session.status(), breakpoints, new.len()));
        }
    });
    backend.push_context(paused(PlKind::Procedure, "P1", None, 2));

    assert!(session.execute_step_over().await.unwrap());
    assert!(session.add_breakpoints(vec![BreakpointPoint::new(p1(), 3)]).await.unwrap());

    assert_eq!(
        *seen.lock().unwrap(),
        vec![(DebugStatus::Init, 0, 1), (DebugStatus::Init, 1, 1)]
    );
}
