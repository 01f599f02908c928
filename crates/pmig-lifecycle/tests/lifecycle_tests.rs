//! ---
//! pmig_section: "07-resilience-fault-tolerance"
//! pmig_subsection: "integration-tests"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Lifecycle state machine behaviour across hosts and threads."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
use std::sync::{Arc, Barrier};
use std::thread;

use pmig_lifecycle::{
    AckStatus, ErrorCode, LifecycleError, LifecycleManager, LifecycleState, HEALTHY,
};
use pmig_snapshot::{decode_state, encode_state, CapturedState};
use serde_json::json;

#[test]
fn never_started_process_is_not_found() {
    let manager = LifecycleManager::new("server-a");
    assert_eq!(
        manager.pause("ghost").unwrap_err(),
        LifecycleError::NotFound { id: "ghost".into() }
    );
    assert_eq!(
        manager.status("ghost").unwrap_err().code(),
        ErrorCode::NotFound
    );
}

#[test]
fn start_twice_keeps_first_record() {
    let manager = LifecycleManager::new("server-a");
    let ack = manager.start("task-1", "compute").unwrap();
    assert_eq!(ack.status, AckStatus::Started);
    assert_eq!(ack.message, "Process task-1 started successfully");

    let err = manager.start("task-1", "batch").unwrap_err();
    assert_eq!(err.code(), ErrorCode::AlreadyExists);
    assert_eq!(manager.status("task-1").unwrap().state, LifecycleState::Running);
    assert_eq!(manager.health().running_count, 1);
}

#[test]
fn resume_on_fresh_host_creates_running_record() {
    let bytes = encode_state(&CapturedState::new(
        "task-9",
        Some("session".into()),
        json!({"progress": 17}),
    ))
    .unwrap();

    let manager = LifecycleManager::new("server-b");
    let ack = manager.resume("task-9", &bytes).unwrap();
    assert_eq!(ack.status, AckStatus::Resumed);

    let status = manager.status("task-9").unwrap();
    assert_eq!(status.state, LifecycleState::Running);
    assert_eq!(status.host, "server-b");
    assert_eq!(status.port, None);
}

#[test]
fn pause_then_resume_elsewhere_carries_payload() {
    let source = LifecycleManager::new("server-a");
    let target = LifecycleManager::new("server-b");
    source.start("task-1", "compute").unwrap();

    let snapshot = source.pause("task-1").unwrap();
    assert_eq!(snapshot.state, LifecycleState::Paused);
    assert_eq!(source.status("task-1").unwrap().state, LifecycleState::Paused);
    assert_eq!(
        source.pause("task-1").unwrap_err().code(),
        ErrorCode::FailedPrecondition
    );

    target.resume("task-1", &snapshot.data).unwrap();
    assert_eq!(target.status("task-1").unwrap().state, LifecycleState::Running);

    let captured = decode_state(&snapshot.data).unwrap();
    assert_eq!(captured.payload["progress"], json!(0));
    assert_eq!(captured.payload["state"], json!("initialized"));
    assert!(captured.payload.get("paused_at").is_some());

    // Source stays Paused until something resumes it there.
    assert_eq!(source.health().running_count, 0);
    assert_eq!(target.health().running_count, 1);
}

#[test]
fn resume_rejects_corrupt_bytes() {
    let manager = LifecycleManager::new("server-a");
    for bytes in [&b""[..], &b"not a snapshot"[..]] {
        let err = manager.resume("task-1", bytes).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }
    assert_eq!(
        manager.status("task-1").unwrap_err().code(),
        ErrorCode::NotFound
    );
}

#[test]
fn concurrent_pauses_yield_a_single_snapshot() {
    const CALLERS: usize = 8;
    let manager = Arc::new(LifecycleManager::new("server-a"));
    manager.start("task-1", "compute").unwrap();
    let barrier = Arc::new(Barrier::new(CALLERS));

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                manager.pause("task-1")
            })
        })
        .collect();

    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    let successes = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(successes, 1);
    for outcome in outcomes.iter().filter_map(|outcome| outcome.as_ref().err()) {
        assert_eq!(outcome.code(), ErrorCode::FailedPrecondition);
    }
}

#[test]
fn health_counts_running_records_only() {
    let manager = LifecycleManager::new("server-c");
    let empty = manager.health();
    assert_eq!(empty.status, HEALTHY);
    assert_eq!(empty.host_name, "server-c");
    assert_eq!(empty.running_count, 0);

    for id in ["a", "b", "c"] {
        manager.start(id, "compute").unwrap();
    }
    manager.pause("b").unwrap();
    assert_eq!(manager.health().running_count, 2);

    let snapshot = manager.pause("c").unwrap();
    manager.resume("c", &snapshot.data).unwrap();
    assert_eq!(manager.health().running_count, 2);
}
