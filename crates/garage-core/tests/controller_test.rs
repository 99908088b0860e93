#![allow(clippy::unwrap_used)]

// Integration tests for Controller, driven through MemoryRemote.

use std::time::Duration;

use garage_core::{
    ActionType, Controller, ControllerConfig, CoreError, Feed, GarageEvent, GarageStatus,
    MemoryRemote, Origin, Reversal, StaticToken,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tokio::time::timeout;
use url::Url;

const WAIT: Duration = Duration::from_secs(2);

const STATUS: &str = "garages/home_garage/status";
const ACTION: &str = "garages/home_garage/controller/action";
const OPTIONS: &str = "garages/home_garage/controller/auto_close_options";
const WARNING: &str = "garages/home_garage/notifications/auto_close_warning";

fn controller() -> Controller<MemoryRemote> {
    let url = Url::parse("https://garage.example.com").unwrap();
    Controller::new(ControllerConfig::new(url, "uid-1"), MemoryRemote::new())
}

async fn started() -> Controller<MemoryRemote> {
    let ctrl = controller();
    ctrl.start().await.unwrap();
    ctrl
}

async fn next_event(rx: &mut broadcast::Receiver<GarageEvent>) -> GarageEvent {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .unwrap()
}

async fn event_matching(
    rx: &mut broadcast::Receiver<GarageEvent>,
    pred: impl Fn(&GarageEvent) -> bool,
) -> GarageEvent {
    loop {
        let event = next_event(rx).await;
        if pred(&event) {
            return event;
        }
    }
}

async fn set_status(ctrl: &Controller<MemoryRemote>, status: &str) -> GarageStatus {
    let mut reports = ctrl.store().subscribe_status_reports();
    reports.borrow_and_update();
    ctrl.remote().set(STATUS, json!({ "type": status }));
    timeout(WAIT, reports.changed()).await.unwrap().unwrap();
    ctrl.status()
}

// ── Listener discipline ─────────────────────────────────────────────

#[tokio::test]
async fn start_registers_one_listener_per_feed() {
    let ctrl = started().await;
    ctrl.start().await.unwrap();

    assert!(!ctrl.subscribe_feed(Feed::Status).await.unwrap());
    for path in [STATUS, OPTIONS, WARNING] {
        assert_eq!(ctrl.remote().subscription_count(path), 1, "{path}");
    }
    ctrl.shutdown().await;
}

#[tokio::test]
async fn cancelled_listener_can_resubscribe() {
    let ctrl = started().await;
    let mut events = ctrl.events();

    ctrl.remote().cancel_listeners(STATUS, "Permission denied");
    let event = event_matching(&mut events, |e| matches!(e, GarageEvent::Diagnostic(_))).await;
    assert_eq!(
        event,
        GarageEvent::Diagnostic(CoreError::ListenerCancelled {
            feed: Feed::Status,
            reason: "Permission denied".into(),
        })
    );
    assert!(!ctrl.is_subscribed(Feed::Status));
    assert!(ctrl.is_subscribed(Feed::Options));

    assert!(ctrl.subscribe_feed(Feed::Status).await.unwrap());
    assert_eq!(ctrl.remote().subscription_count(STATUS), 2);

    // The cancellation also left a line in the remote debug log.
    ctrl.remote().wait_for_writes(1).await;
    let debug_line = ctrl
        .remote()
        .writes()
        .into_iter()
        .find(|w| w.path.starts_with("garages/home_garage/debug/uid-1/"))
        .map(|w| w.value);
    assert_eq!(
        debug_line,
        Some(json!({ "message": "status listener cancelled: Permission denied" }))
    );
    ctrl.shutdown().await;
}

#[tokio::test]
async fn unsubscribe_detaches_without_diagnostic() {
    let ctrl = started().await;
    let mut events = ctrl.events();

    assert!(ctrl.unsubscribe_feed(Feed::Options));
    assert!(!ctrl.unsubscribe_feed(Feed::Options));
    assert!(!ctrl.is_subscribed(Feed::Options));

    ctrl.remote().set(OPTIONS, json!({ "enabled": "garbage" }));
    tokio::task::yield_now().await;
    assert!(events.try_recv().is_err());
    ctrl.shutdown().await;
}

// ── Status reconciliation ───────────────────────────────────────────

#[tokio::test]
async fn wait_for_status_resolves_on_first_report() {
    let ctrl = controller();
    ctrl.remote().set(STATUS, json!({ "type": "OPEN" }));
    ctrl.start().await.unwrap();

    let status = timeout(WAIT, ctrl.wait_for_status()).await.unwrap();
    assert_eq!(status.unwrap(), GarageStatus::Open);
    assert!(ctrl.store().is_synced());
    ctrl.shutdown().await;
}

#[tokio::test]
async fn close_while_opening_pauses_and_sends_one_close() {
    let ctrl = started().await;
    assert_eq!(set_status(&ctrl, "OPENING").await, GarageStatus::Opening);

    ctrl.request_close().await.unwrap();
    let snap = ctrl.snapshot();
    assert_eq!(snap.status, GarageStatus::Paused);
    assert_eq!(snap.previous_status, GarageStatus::Opening);

    ctrl.remote().wait_for_writes(1).await;
    let actions = ctrl.remote().writes_to(ACTION);
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["type"], json!(ActionType::Close.as_ref()));
    assert_eq!(actions[0]["uid"], json!("uid-1"));
    assert!(actions[0]["a_timestamp"].is_string());
    ctrl.shutdown().await;
}

#[tokio::test]
async fn open_request_leaves_state_alone() {
    let ctrl = started().await;
    set_status(&ctrl, "CLOSED").await;
    let before = ctrl.snapshot();

    ctrl.request_open().await.unwrap();
    ctrl.remote().wait_for_writes(1).await;

    assert_eq!(ctrl.snapshot(), before);
    assert_eq!(ctrl.remote().value(ACTION)["type"], json!("OPEN"));
    ctrl.shutdown().await;
}

#[tokio::test]
async fn opening_then_closed_reports_reversal() {
    let ctrl = started().await;
    set_status(&ctrl, "OPENING").await;
    let mut events = ctrl.events();

    set_status(&ctrl, "CLOSED").await;
    assert_eq!(
        next_event(&mut events).await,
        GarageEvent::StatusChanged {
            previous: GarageStatus::Opening,
            status: GarageStatus::Closed,
            origin: Origin::Remote,
        }
    );
    assert_eq!(
        next_event(&mut events).await,
        GarageEvent::DoorReversed(Reversal::ClosedWhileOpening)
    );
    ctrl.shutdown().await;
}

#[tokio::test]
async fn unknown_status_degrades_to_closed() {
    let ctrl = started().await;
    set_status(&ctrl, "OPEN").await;
    let mut events = ctrl.events();

    ctrl.remote().set(STATUS, json!({ "type": "HALFWAY" }));
    let event = event_matching(&mut events, |e| matches!(e, GarageEvent::Diagnostic(_))).await;
    assert_eq!(
        event,
        GarageEvent::Diagnostic(CoreError::UnknownStatus {
            raw: "HALFWAY".into()
        })
    );
    let changed = next_event(&mut events).await;
    assert!(matches!(
        changed,
        GarageEvent::StatusChanged {
            status: GarageStatus::Closed,
            ..
        }
    ));
    ctrl.shutdown().await;
}

#[tokio::test]
async fn deleted_status_field_is_not_a_parse_failure() {
    let ctrl = started().await;
    set_status(&ctrl, "OPEN").await;
    let mut events = ctrl.events();

    ctrl.remote().set(&format!("{STATUS}/type"), Value::Null);
    assert_eq!(ctrl.remote().value(STATUS), Value::Null);

    // Feed snapshots are handled in order, so the next report follows the null one.
    set_status(&ctrl, "CLOSING").await;
    let mut seen = Vec::new();
    loop {
        let event = next_event(&mut events).await;
        let done = matches!(
            event,
            GarageEvent::StatusChanged {
                status: GarageStatus::Closing,
                ..
            }
        );
        seen.push(event);
        if done {
            break;
        }
    }
    assert!(
        !seen.iter().any(|e| matches!(e, GarageEvent::Diagnostic(_))),
        "{seen:?}"
    );
    assert_eq!(ctrl.status(), GarageStatus::Closing);
    ctrl.shutdown().await;
}

// ── Auto-close options ──────────────────────────────────────────────

#[tokio::test]
async fn repeated_toggle_writes_once() {
    let ctrl = started().await;

    assert!(ctrl.set_auto_close_enabled(true).await.unwrap());
    ctrl.remote().wait_for_writes(1).await;
    assert!(!ctrl.set_auto_close_enabled(true).await.unwrap());

    let writes = ctrl.remote().writes_to(OPTIONS);
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0]["enabled"], json!(true));
    assert_eq!(writes[0]["timeout"], json!(0));
    assert_eq!(writes[0]["uid"], json!("uid-1"));
    ctrl.shutdown().await;
}

#[tokio::test]
async fn remote_options_replace_local_copy() {
    let ctrl = started().await;
    let mut events = ctrl.events();

    ctrl.remote().set(
        OPTIONS,
        json!({
            "enabled": true,
            "timeout": 1_800_000,
            "warningTimeout": 900_000,
            "warningEnabled": true,
            "uid": "other-phone",
            "o_timestamp": "2019-07-04 18:05:09",
        }),
    );
    let event = event_matching(&mut events, |e| matches!(e, GarageEvent::OptionsChanged(_))).await;
    let GarageEvent::OptionsChanged(options) = event else {
        unreachable!()
    };
    assert_eq!(options.timeout, Duration::from_secs(30 * 60));
    assert_eq!(ctrl.snapshot().auto_close_options, options);

    // Slider at position 1 is 30 minutes: already there.
    assert!(!ctrl.set_timeout_progress(1).await.unwrap());
    assert!(ctrl.set_warning_timeout_progress(0).await.unwrap());
    assert_eq!(
        ctrl.snapshot().auto_close_options.warning_timeout,
        Duration::ZERO
    );
    ctrl.shutdown().await;
}

// ── Auto-close warning ──────────────────────────────────────────────

#[tokio::test]
async fn warning_is_taken_once() {
    let ctrl = started().await;
    let mut events = ctrl.events();

    ctrl.remote().set(WARNING, json!({ "timeout": 0, "timestamp": 1 }));
    ctrl.remote().set(WARNING, json!({ "timeout": 300_000, "timestamp": 2 }));

    let event = next_event(&mut events).await;
    assert_eq!(
        event,
        GarageEvent::AutoCloseWarningPending {
            timeout: Duration::from_secs(300)
        }
    );

    let warning = ctrl.take_auto_close_warning().await.unwrap();
    assert_eq!(warning.map(|w| w.timeout), Some(Duration::from_secs(300)));
    assert_eq!(ctrl.take_auto_close_warning().await.unwrap(), None);

    ctrl.cancel_auto_close().await.unwrap();
    ctrl.remote().wait_for_writes(1).await;
    assert_eq!(ctrl.remote().value(ACTION)["type"], json!("STOP_AUTO_CLOSE"));
    ctrl.shutdown().await;
}

// ── Failures and lifecycle ──────────────────────────────────────────

#[tokio::test]
async fn failed_write_surfaces_diagnostic() {
    let ctrl = started().await;
    ctrl.remote().deny_writes("garages/home_garage/controller");
    let mut events = ctrl.events();

    ctrl.request_open().await.unwrap();
    let event = event_matching(&mut events, |e| matches!(e, GarageEvent::Diagnostic(_))).await;
    assert!(matches!(
        event,
        GarageEvent::Diagnostic(CoreError::PermissionDenied { .. })
    ));
    ctrl.shutdown().await;
}

#[tokio::test]
async fn device_token_round_trip() {
    let ctrl = started().await;

    let token = ctrl
        .register_device_token(&StaticToken("tok-1".into()))
        .await
        .unwrap();
    assert_eq!(token, "tok-1");
    assert_eq!(
        ctrl.remote().value("garages/home_garage/device_tokens/all_tokens/tok-1"),
        json!("uid-1")
    );

    let updates = "garages/home_garage/device_tokens/status_update/tok-1";
    ctrl.subscribe_status_updates(&token).await.unwrap();
    assert_eq!(ctrl.remote().value(updates), json!("uid-1"));
    ctrl.unsubscribe_status_updates(&token).await.unwrap();
    assert_eq!(ctrl.remote().value(updates), Value::Null);

    let missing = ctrl
        .register_device_token(&StaticToken(String::new()))
        .await;
    assert!(matches!(missing, Err(CoreError::TokenUnavailable { .. })));
    ctrl.shutdown().await;
}

#[tokio::test]
async fn commands_fail_after_shutdown() {
    let ctrl = started().await;
    ctrl.shutdown().await;

    assert_eq!(
        ctrl.request_open().await,
        Err(CoreError::ControllerStopped)
    );
    assert_eq!(
        ctrl.subscribe_feed(Feed::Status).await,
        Err(CoreError::ControllerStopped)
    );
    assert_eq!(
        ctrl.wait_for_status().await,
        Err(CoreError::ControllerStopped)
    );
}

#[tokio::test]
async fn flush_waits_for_action_write() {
    let ctrl = started().await;
    set_status(&ctrl, "OPEN").await;

    ctrl.request_close().await.unwrap();
    ctrl.flush_writes().await;

    let actions = ctrl.remote().writes_to(ACTION);
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["type"], json!(ActionType::Close.as_ref()));
    assert_eq!(actions[0]["uid"], json!("uid-1"));

    ctrl.request_open().await.unwrap();
    ctrl.shutdown().await;
    assert_eq!(ctrl.remote().writes_to(ACTION).len(), 2);
}

#[tokio::test]
async fn absent_options_node_still_counts_as_reported() {
    let ctrl = started().await;

    timeout(WAIT, ctrl.wait_for_feed(Feed::Options))
        .await
        .unwrap()
        .unwrap();
    assert!(ctrl.store().has_reported(Feed::Options));
    assert!(!ctrl.store().is_synced());
    ctrl.shutdown().await;
}
