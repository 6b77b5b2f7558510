use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use test_case::test_case;

use pldebug::{BreakpointPoint, DebugStatus, PlIdentity, PlKind, SessionError};

use crate::support::{paused, start_p1};

#[tokio::test]
async fn test_exit_while_sync_pending_drops_late_context() {
    let (session, backend, _) = start_p1().await;
    let notified = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&notified);
    session.on_context_change(move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    backend.push_context(paused(PlKind::Function, "F1", None, 7));
    let release = backend.context_gate.arm();

    let step = session.execute_step_in();
    let stop = async {
        backend.context_gate.reached().await;
        session.execute_exit().await;
        release.send(()).unwrap();
    };
    let (stepped, ()) = tokio::join!(step, stop);

    assert!(stepped.unwrap());
    assert_eq!(session.status(), DebugStatus::Stop);
    assert_eq!(session.stack().len(), 1);
    assert_eq!(notified.load(Ordering::SeqCst), 0);
    assert_eq!(backend.count("dispose"), 1);
}

#[tokio::test]
async fn test_commands_rejected_while_in_flight() {
    let (session, backend, _) = start_p1().await;
    backend.push_context(paused(PlKind::Procedure, "P1", None, 2));
    let release = backend.context_gate.arm();

    let step = session.execute_step_over();
    let probe = async {
        backend.context_gate.reached().await;
        assert_eq!(session.status(), DebugStatus::StepOver);
        let resumed = session.execute_resume().await;
        assert!(matches!(resumed, Err(SessionError::Busy(DebugStatus::StepOver))));
        let recovered = session.recover_debug().await;
        assert!(matches!(recovered, Err(SessionError::Busy(DebugStatus::StepOver))));
        release.send(()).unwrap();
    };
    let (stepped, ()) = tokio::join!(step, probe);

    assert!(stepped.unwrap());
    assert_eq!(session.status(), DebugStatus::Init);
    assert_eq!(session.active_frame().unwrap().active_line(), Some(2));
    assert_eq!(backend.count("resume"), 0);
}

#[tokio::test]
async fn test_exit_during_recovery_releases_new_session() {
    let (session, backend, _) = start_p1().await;
    let release = backend.create_gate.arm();

    let recover = session.recover_debug();
    let stop = async {
        backend.create_gate.reached().await;
        session.execute_exit().await;
        release.send(()).unwrap();
    };
    let (recovered, ()) = tokio::join!(recover, stop);

    assert!(!recovered.unwrap());
    assert_eq!(session.status(), DebugStatus::Stop);
    // s1 by the stop, s2 once the recovery noticed it
    assert_eq!(
        backend.calls().iter().filter(|c| c.starts_with("dispose")).cloned().collect::<Vec<_>>(),
        vec!["dispose:s1".to_string(), "dispose:s2".to_string()]
    );
}

#[test_case(false ; "acknowledged")]
#[test_case(true ; "refused")]
#[tokio::test]
async fn test_remove_in_flight_across_recovery_keeps_breakpoint(refused: bool) {
    let (session, backend, _) = start_p1().await;
    let p1 = PlIdentity::new(PlKind::Procedure, "P1", None);
    session.add_breakpoints(vec![BreakpointPoint::new(p1.clone(), 4)]).await.unwrap();
    let release = backend.remove_gate.arm();

    let remove = session.remove_breakpoints(vec![BreakpointPoint::new(p1.clone(), 4)]);
    let recover = async {
        backend.remove_gate.reached().await;
        assert!(session.recover_debug().await.unwrap());
        backend.fail_remove(refused);
        release.send(()).unwrap();
    };
    let (removed, ()) = tokio::join!(remove, recover);

    // s2 re-registered the breakpoint, so the cache must still show it
    assert!(!removed.unwrap());
    let all = session.get_all_breakpoints();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].breakpoint.line(), 4);
    assert_eq!(all[0].breakpoint.server_id(), 2);

    backend.fail_remove(false);
    assert!(session.remove_breakpoints(vec![BreakpointPoint::new(p1, 4)]).await.unwrap());
    assert!(session.get_all_breakpoints().is_empty());
    assert_eq!(backend.count("remove:s2"), 1);
}
