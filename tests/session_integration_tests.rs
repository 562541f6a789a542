//! Integration tests for ScanController and ScanSession
//!
//! These tests verify that the controller:
//! - Never lets a slow earlier scan overwrite a newer applied result
//! - Replaces any previous report when a scan fails
//! - Broadcasts session events in transition order
//! - Cancels in-flight scans without affecting later ones
//! - Rescans with the last directory and options

mod common;

use camino::{Utf8Path, Utf8PathBuf};
use common::{ScriptedEngine, empty_report, report_json};
use dedup_companion::{
    HashAlgorithm, Preferences, ScanController, ScanError, ScanOptions, ScanStatus, SessionEvent,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Duration, timeout};

type Controller = Arc<ScanController<ScriptedEngine>>;

async fn next_event(rx: &mut broadcast::Receiver<SessionEvent>) -> SessionEvent {
    timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed")
}

fn spawn_scan(
    controller: &Controller,
    directory: &'static str,
) -> JoinHandle<Result<Arc<dedup_companion::CliOutput>, ScanError>> {
    let controller = Arc::clone(controller);
    tokio::spawn(async move {
        controller
            .start(Utf8Path::new(directory), ScanOptions::default())
            .await
    })
}

#[tokio::test]
async fn test_slow_earlier_scan_cannot_overwrite_newer_result() {
    let engine = ScriptedEngine::new().reply(
        "/fast",
        Ok(report_json(&[("fast", 10, &["/fast/a", "/fast/b"])])),
    );
    let release_slow = engine.gate("/slow");
    let controller = Arc::new(ScanController::new(engine, Preferences::default()));
    let mut events = controller.session().subscribe();

    let slow = spawn_scan(&controller, "/slow");
    assert!(matches!(
        next_event(&mut events).await,
        SessionEvent::ScanStarted { seq: 1, .. }
    ));

    let fast = controller
        .start(Utf8Path::new("/fast"), ScanOptions::default())
        .await
        .unwrap();
    assert!(fast.find_group("fast").is_some());

    release_slow
        .send(Ok(report_json(&[(
            "slow",
            5,
            &["/slow/a", "/slow/b", "/slow/c"],
        )])))
        .unwrap();

    // The caller still gets its own result even though the session drops it.
    let slow = slow.await.unwrap().unwrap();
    assert!(slow.find_group("slow").is_some());

    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::ScanStarted {
            seq: 2,
            directory: Utf8PathBuf::from("/fast")
        }
    );
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::ScanCompleted {
            seq: 2,
            duplicate_count: 1,
            total_space: 10
        }
    );
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::CompletionDiscarded {
            seq: 1,
            applied_seq: 2
        }
    );

    let state = controller.session().snapshot();
    let shown = state.status.output().expect("session should be Ready");
    assert!(shown.find_group("fast").is_some());
    assert!(shown.find_group("slow").is_none());
    assert_eq!(state.last_directory, Some(Utf8PathBuf::from("/fast")));
    assert!(!state.has_outstanding());
    assert_eq!(
        controller.metrics().stale_completions.load(Ordering::Relaxed),
        1
    );
}

#[tokio::test]
async fn test_in_order_completions_are_both_applied() {
    let engine = ScriptedEngine::new();
    let release_a = engine.gate("/a");
    let release_b = engine.gate("/b");
    let controller = Arc::new(ScanController::new(engine, Preferences::default()));
    let mut events = controller.session().subscribe();

    let a = spawn_scan(&controller, "/a");
    next_event(&mut events).await;
    let b = spawn_scan(&controller, "/b");
    next_event(&mut events).await;

    release_a
        .send(Ok(report_json(&[("a", 1, &["/a/1", "/a/2"])])))
        .unwrap();
    a.await.unwrap().unwrap();

    let state = controller.session().snapshot();
    assert!(state.status.output().unwrap().find_group("a").is_some());
    assert!(state.has_outstanding());

    release_b
        .send(Ok(report_json(&[("b", 2, &["/b/1", "/b/2"])])))
        .unwrap();
    b.await.unwrap().unwrap();

    let state = controller.session().snapshot();
    assert!(state.status.output().unwrap().find_group("b").is_some());
    assert!(!state.has_outstanding());
    assert_eq!(
        controller.metrics().stale_completions.load(Ordering::Relaxed),
        0
    );
}

#[tokio::test]
async fn test_failed_scan_replaces_previous_report() {
    let engine = ScriptedEngine::new()
        .reply("/good", Ok(report_json(&[("h", 4, &["/good/x", "/good/y"])])))
        .reply("/bad", Ok("{not json".to_string()));
    let controller = ScanController::new(engine, Preferences::default());

    controller
        .start(Utf8Path::new("/good"), ScanOptions::default())
        .await
        .unwrap();
    assert!(controller.session().status().output().is_some());

    let err = controller
        .start(Utf8Path::new("/bad"), ScanOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::ParseError { .. }));

    let state = controller.session().snapshot();
    assert!(state.status.output().is_none());
    assert_eq!(state.status.error(), Some(&err));
    assert_eq!(state.last_directory, Some(Utf8PathBuf::from("/bad")));
}

#[tokio::test]
async fn test_inconsistent_report_fails_scan() {
    let report = report_json(&[("h", 4, &["/x", "/y"])]).replace("\"duplicate_count\":1", "\"duplicate_count\":5");
    let engine = ScriptedEngine::new().reply("/lying", Ok(report));
    let controller = ScanController::new(engine, Preferences::default());

    let err = controller
        .start(Utf8Path::new("/lying"), ScanOptions::default())
        .await
        .unwrap_err();

    match err {
        ScanError::ParseError { message } => assert!(message.contains("duplicate_count"), "{message}"),
        other => panic!("Expected ParseError, got: {:?}", other),
    }
    assert!(matches!(controller.session().status(), ScanStatus::Failed(_)));
}

#[tokio::test]
async fn test_engine_failure_is_broadcast() {
    let engine = ScriptedEngine::new().reply(
        "/data",
        Err(ScanError::ExecutableNotFound {
            path: "/opt/missing/file-deduplicator".to_string(),
        }),
    );
    let controller = ScanController::new(engine, Preferences::default());
    let mut rx1 = controller.session().subscribe();
    let mut rx2 = controller.session().subscribe();

    let _ = controller
        .start(Utf8Path::new("/data"), ScanOptions::default())
        .await;

    for rx in [&mut rx1, &mut rx2] {
        assert!(matches!(
            next_event(rx).await,
            SessionEvent::ScanStarted { seq: 1, .. }
        ));
        match next_event(rx).await {
            SessionEvent::ScanFailed { seq, kind, message } => {
                assert_eq!(seq, 1);
                assert_eq!(kind, "executable_not_found");
                assert!(message.contains("/opt/missing/file-deduplicator"));
            }
            other => panic!("Expected ScanFailed, got: {:?}", other),
        }
    }
    assert_eq!(controller.metrics().scans_failed.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_cancel_stops_in_flight_scan_only() {
    let engine = ScriptedEngine::new();
    let _never = engine.gate("/huge");
    let release_later = engine.gate("/later");
    let controller = Arc::new(ScanController::new(engine, Preferences::default()));
    let mut events = controller.session().subscribe();

    let huge = spawn_scan(&controller, "/huge");
    next_event(&mut events).await;

    controller.request_cancel();
    assert_eq!(huge.await.unwrap().unwrap_err(), ScanError::Cancelled);
    assert_eq!(
        controller.session().status(),
        ScanStatus::Failed(ScanError::Cancelled)
    );

    let later = spawn_scan(&controller, "/later");
    next_event(&mut events).await;
    next_event(&mut events).await;
    release_later.send(Ok(empty_report())).unwrap();

    let output = later.await.unwrap().unwrap();
    assert!(output.is_empty());
    assert!(matches!(controller.session().status(), ScanStatus::Ready(_)));
}

#[tokio::test]
async fn test_repeated_cancel_requests_reach_later_scans() {
    let engine = ScriptedEngine::new();
    let _first = engine.gate("/first");
    let _second = engine.gate("/second");
    let controller = Arc::new(ScanController::new(engine, Preferences::default()));
    let mut events = controller.session().subscribe();

    let first = spawn_scan(&controller, "/first");
    next_event(&mut events).await;
    controller.request_cancel();
    assert_eq!(first.await.unwrap().unwrap_err(), ScanError::Cancelled);

    // The cancel flag is already set; a second request must still land.
    let second = spawn_scan(&controller, "/second");
    next_event(&mut events).await;
    next_event(&mut events).await;
    controller.request_cancel();

    let result = timeout(Duration::from_secs(1), second)
        .await
        .expect("second scan ignored the cancel request");
    assert_eq!(result.unwrap().unwrap_err(), ScanError::Cancelled);
}

#[tokio::test]
async fn test_rescan_repeats_last_target() {
    let controller = ScanController::new(ScriptedEngine::new(), Preferences::default());
    let options = ScanOptions {
        recursive: false,
        algorithm: HashAlgorithm::Md5,
        min_size: Some(100),
    };

    controller
        .start(Utf8Path::new("/music"), options.clone())
        .await
        .unwrap();
    controller.rescan().await.unwrap().unwrap();

    let expected = (Utf8PathBuf::from("/music"), options);
    assert_eq!(controller.engine().calls(), vec![expected.clone(), expected]);
}

#[test]
fn test_rescan_before_first_scan_does_nothing() {
    let controller = ScanController::new(ScriptedEngine::new(), Preferences::default());

    assert!(tokio_test::block_on(controller.rescan()).is_none());
    assert!(controller.engine().calls().is_empty());
    assert_eq!(controller.session().status(), ScanStatus::Idle);
}
