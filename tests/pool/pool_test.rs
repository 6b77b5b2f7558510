use std::sync::Arc;

use pldebug::{DebugSessionPool, DebugStatus, PlKind};

use crate::support::{procedure_config, MapSource, ScriptedBackend};

fn pool() -> (DebugSessionPool, Arc<ScriptedBackend>) {
    let backend = ScriptedBackend::new();
    let source = MapSource::new()
        .with(PlKind::Procedure, "P1", "PROCEDURE P1 IS BEGIN NULL; END;")
        .with(PlKind::Procedure, "P2", "PROCEDURE P2 IS BEGIN NULL; END;");
    (DebugSessionPool::new(backend.clone(), source), backend)
}

#[tokio::test]
async fn test_new_debug_registers_session() {
    let (pool, _) = pool();

    let session = pool.new_debug(procedure_config("P1"), "tab-1").await.unwrap();

    let stored = pool.get_debug("tab-1").unwrap();
    assert!(Arc::ptr_eq(&session, &stored));
    assert!(pool.has_entry("tab-1"));
    assert!(!pool.is_creating("tab-1"));
    assert_eq!(stored.status(), DebugStatus::Init);
}

#[tokio::test]
async fn test_new_debug_without_source_yields_none() {
    let (pool, backend) = pool();

    assert!(pool.new_debug(procedure_config("MISSING"), "tab-1").await.is_none());

    assert!(!pool.is_creating("tab-1"));
    assert!(!pool.has_entry("tab-1"));
    assert!(pool.get_debug("tab-1").is_none());
    assert_eq!(backend.count("create"), 0);
}

#[tokio::test]
async fn test_new_debug_backend_failure_clears_creating() {
    let (pool, backend) = pool();
    backend.fail_create(true);

    assert!(pool.new_debug(procedure_config("P1"), "tab-1").await.is_none());

    assert!(!pool.is_creating("tab-1"));
    assert!(!pool.has_entry("tab-1"));
}

#[tokio::test]
async fn test_creating_flag_while_create_pending() {
    let (pool, backend) = pool();
    let release = backend.create_gate.arm();

    let create = pool.new_debug(procedure_config("P1"), "tab-1");
    let probe = async {
        backend.create_gate.reached().await;
        assert!(pool.is_creating("tab-1"));
        assert!(!pool.is_creating("tab-2"));
        assert!(pool.get_debug("tab-1").is_none());
        release.send(()).unwrap();
    };
    let (created, ()) = tokio::join!(create, probe);

    assert!(created.is_some());
    assert!(!pool.is_creating("tab-1"));
}

#[tokio::test]
async fn test_remove_debug_leaves_empty_slot() {
    let (pool, backend) = pool();
    pool.new_debug(procedure_config("P1"), "tab-1").await.unwrap();

    pool.remove_debug("tab-1").await;

    assert!(pool.has_entry("tab-1"));
    assert!(pool.get_debug("tab-1").is_none());
    assert_eq!(backend.count("dispose:s1"), 1);
    assert!(!pool.has_entry("tab-2"));
}

#[tokio::test]
async fn test_remove_debug_skips_ended_session() {
    let (pool, backend) = pool();
    let session = pool.new_debug(procedure_config("P1"), "tab-1").await.unwrap();
    session.execute_exit().await;
    assert_eq!(backend.count("dispose"), 1);

    pool.remove_debug("tab-1").await;

    assert_eq!(backend.count("dispose"), 1);
    assert!(pool.has_entry("tab-1"));
}

#[tokio::test]
async fn test_remove_unknown_tab() {
    let (pool, backend) = pool();

    pool.remove_debug("tab-9").await;

    assert!(pool.has_entry("tab-9"));
    assert!(pool.get_debug("tab-9").is_none());
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_new_debug_replaces_running_session() {
    let (pool, backend) = pool();
    let first = pool.new_debug(procedure_config("P1"), "tab-1").await.unwrap();

    let second = pool.new_debug(procedure_config("P2"), "tab-1").await.unwrap();

    assert_eq!(second.id(), "s2");
    assert_eq!(pool.get_debug("tab-1").unwrap().id(), "s2");
    assert_eq!(backend.count("dispose:s1"), 1);
    assert_eq!(first.status(), DebugStatus::Init);
}

#[tokio::test]
async fn test_open_tabs_and_shutdown() {
    let (pool, backend) = pool();
    pool.new_debug(procedure_config("P2"), "tab-b").await.unwrap();
    pool.new_debug(procedure_config("P1"), "tab-a").await.unwrap();
    pool.new_debug(procedure_config("P1"), "tab-c").await.unwrap();
    pool.remove_debug("tab-c").await;

    assert_eq!(pool.open_tabs(), vec!["tab-a".to_string(), "tab-b".to_string()]);

    pool.shutdown().await;

    assert!(pool.open_tabs().is_empty());
    assert!(pool.has_entry("tab-a"));
    assert_eq!(backend.count("dispose"), 3);
}
