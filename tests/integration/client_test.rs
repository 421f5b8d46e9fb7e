// tests/integration/client_test.rs

//! End-to-end command lifecycles through the client facade.

use super::test_helpers::{MockServer, within};
use ippdme::core::protocol::error_codes;
use ippdme::core::transaction::{EventKind, ObserverMode, TransactionState};
use ippdme::core::{IppError, Queue};
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn test_get_dme_version_completes_with_data() {
    let mut server = MockServer::silent().await;
    let client = server.client().await;

    let txn = client.get_dme_version().await.unwrap();
    let (tag, command) = server.next_command().await;
    assert_eq!(tag, "00001");
    assert_eq!(command, "GetDMEVersion()");

    server.push("00001 #DME_VERSION(5.2)");
    server.push("00001 %");

    let done = within(txn.on_complete()).await.unwrap();
    assert_eq!(done.state(), TransactionState::Complete);
    assert_eq!(done.data_lines(), vec!["00001 #DME_VERSION(5.2)".to_string()]);
    assert_eq!(done.data_payloads(), vec!["DME_VERSION(5.2)".to_string()]);
    assert_eq!(done.outcome(), Some(Ok(())));
}

#[tokio::test]
async fn test_event_command_uses_event_pool() {
    let mut server = MockServer::standard().await;
    let client = server.client().await;

    let first = client.home().await.unwrap();
    let daemon = client
        .on_move_report_e("Time(0.5), X(), Y(), Z()")
        .await
        .unwrap();
    let second = client.is_homed().await.unwrap();

    assert_eq!(first.tag().to_string(), "00001");
    assert_eq!(daemon.tag().to_string(), "E0001");
    assert_eq!(daemon.tag().queue(), Queue::Fast);
    assert_eq!(second.tag().to_string(), "00002");

    assert_eq!(server.next_command().await.1, "Home()");
    assert_eq!(
        server.next_command().await,
        (
            "E0001".to_string(),
            "OnMoveReportE(Time(0.5), X(), Y(), Z())".to_string()
        )
    );
    assert_eq!(server.next_command().await.0, "00002");
}

#[tokio::test]
async fn test_concurrent_sends_get_distinct_tags() {
    let server = MockServer::standard().await;
    let client = Arc::new(server.client().await);

    let mut handles = Vec::new();
    for _ in 0..20 {
        let client = Arc::clone(&client);
        handles.push(tokio::spawn(async move {
            let txn = client.command("GetMachineClass()").await.unwrap();
            within(txn.on_complete()).await.unwrap().tag()
        }));
    }

    let mut tags = Vec::new();
    for handle in handles {
        tags.push(handle.await.unwrap());
    }
    tags.sort();
    tags.dedup();
    assert_eq!(tags.len(), 20);
}

#[tokio::test]
async fn test_lifecycle_events_fire_in_order() {
    let mut server = MockServer::silent().await;
    let client = server.client().await;
    let seen = Arc::new(Mutex::new(Vec::new()));

    let recorder = |kind: EventKind| {
        let seen = Arc::clone(&seen);
        move |_: &ippdme::core::Transaction| seen.lock().unwrap().push(kind)
    };
    let txn = client
        .command_with("Get(X(), Y(), Z())", Queue::Normal, |txn| {
            for kind in EventKind::ALL {
                txn.on(kind, ObserverMode::Persistent, recorder(kind));
            }
        })
        .await
        .unwrap();
    let (tag, _) = server.next_command().await;

    server.push(&format!("{tag} &"));
    server.push(&format!("{tag} # X(1), Y(2), Z(3)"));
    server.push(&format!("{tag} # X(4), Y(5), Z(6)"));
    server.push(&format!("{tag} %"));
    within(txn.on_complete()).await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            EventKind::Send,
            EventKind::Ack,
            EventKind::Data,
            EventKind::Data,
            EventKind::Complete
        ]
    );
    assert_eq!(txn.data_lines().len(), 2);
}

#[tokio::test]
async fn test_error_reply_fails_transaction_and_late_complete_is_ignored() {
    let mut server = MockServer::silent().await;
    let client = server.client().await;

    let txn = client.pt_meas("X(0), Y(0), Z(-50), IJK(0,0,1)").await.unwrap();
    let (tag, _) = server.next_command().await;
    let completed = txn.on_complete();

    server.push(&format!("{tag} &"));
    server.push(&format!(
        "{tag} !Error(3, 1006, \"PtMeas\", \"Surface not found\")"
    ));
    server.push(&format!("{tag} %"));

    let err = within(completed).await.unwrap_err();
    let command_error = err.command_error().expect("expected a command error");
    assert!(command_error.server.is_code(error_codes::SURFACE_NOT_FOUND));
    assert_eq!(command_error.server.text, "Surface not found");
    assert!(!err.is_connection_fatal());

    // A later command on the same connection still works, and the stray `%`
    // did not revive the failed one.
    let next = client.get_machine_class().await.unwrap();
    let (next_tag, _) = server.next_command().await;
    server.push(&format!("{next_tag} %"));
    within(next.on_complete()).await.unwrap();
    assert_eq!(txn.state(), TransactionState::Error);
    assert_eq!(txn.error_lines().len(), 1);
}

#[tokio::test]
async fn test_on_error_resolves_with_completed_without_error() {
    let mut server = MockServer::silent().await;
    let client = server.client().await;

    let txn = client.home().await.unwrap();
    let failed = txn.on_error();
    let (tag, _) = server.next_command().await;
    server.push(&format!("{tag} %"));

    assert!(matches!(
        within(failed).await,
        Err(IppError::CompletedWithoutError(t)) if t == txn.tag()
    ));
}

#[tokio::test]
async fn test_awaitable_after_event_resolves_immediately() {
    let server = MockServer::standard().await;
    let client = server.client().await;

    let txn = client.get_dme_version().await.unwrap();
    within(txn.on_complete()).await.unwrap();

    // Every event has passed by now.
    within(txn.on_send()).await.unwrap();
    within(txn.on_ack()).await.unwrap();
    within(txn.on_data()).await.unwrap();
    within(txn.on_complete()).await.unwrap();
}

#[tokio::test]
async fn test_run_sequence_stops_at_first_failure() {
    let mut server = MockServer::start(Arc::new(|tag: &str, command: &str| {
        if command == "Home()" {
            vec![format!("{tag} &"), format!("{tag} !1009: Air Pressure Out Of Range")]
        } else {
            vec![format!("{tag} &"), format!("{tag} %")]
        }
    }))
    .await;
    let client = server.client().await;

    let err = within(client.run_sequence(["ClearAllErrors()", "Home()", "IsHomed()"]))
        .await
        .unwrap_err();
    let command_error = err.command_error().unwrap();
    assert_eq!(command_error.command, "Home()");
    assert!(command_error.server.is_code(error_codes::AIR_PRESSURE_OUT_OF_RANGE));

    assert_eq!(server.next_command().await.1, "ClearAllErrors()");
    assert_eq!(server.next_command().await.1, "Home()");

    // IsHomed() was never sent: the next thing the server sees is ours.
    client.get_machine_class().await.unwrap();
    assert_eq!(server.next_command().await.1, "GetMachineClass()");
}

#[tokio::test]
async fn test_run_sequence_returns_every_transaction() {
    let server = MockServer::standard().await;
    let client = server.client().await;

    let done = within(client.run_sequence(vec![
        "GetDMEVersion()".to_string(),
        "IsHomed()".to_string(),
    ]))
    .await
    .unwrap();

    assert_eq!(done.len(), 2);
    assert_eq!(done[0].data_payloads(), vec!["DME_VERSION(5.2)".to_string()]);
    assert_eq!(done[1].data_payloads(), vec!["IsHomed(1)".to_string()]);
    assert!(done.iter().all(|t| t.state() == TransactionState::Complete));
}

#[tokio::test]
async fn test_catalogue_formats_commands() {
    let mut server = MockServer::standard().await;
    let client = server.client().await;

    client.get_prop(&["Tool.Name()", "Tool.GoToPar.Speed()"]).await.unwrap();
    client.change_tool("Probe2").await.unwrap();
    client.get_error_info(Some(1006)).await.unwrap();
    client.get_error_info(None).await.unwrap();
    client.use_smallest_angle_to_align_tool(true).await.unwrap();
    client.enum_all_tool_collections("Base").await.unwrap();
    client.pt_meas_self_center_locked("X(1)").await.unwrap();
    client.scan_on_circle_hint(0.1, 0.5).await.unwrap();
    client.get_err_status_e().await.unwrap();

    let expected = [
        ("00001", "GetProp(Tool.Name(), Tool.GoToPar.Speed())"),
        ("00002", "ChangeTool(\"Probe2\")"),
        ("00003", "GetErrorInfo(1006)"),
        ("00004", "GetErrorInfo()"),
        ("00005", "UseSmallestAngleToAlignTool(1)"),
        ("00006", "EnumAllToolCollections(Base)"),
        ("00007", "PtMeasSelfCenterLocked(X(1))"),
        ("00008", "ScanOnCircleHint(0.1, 0.5)"),
        ("E0001", "GetErrStatusE()"),
    ];
    for (tag, command) in expected {
        assert_eq!(
            server.next_command().await,
            (tag.to_string(), command.to_string())
        );
    }
}

#[tokio::test]
async fn test_invalid_command_text_is_rejected_without_consuming_a_tag() {
    let mut server = MockServer::standard().await;
    let client = server.client().await;

    let err = client.command("GoTo(X(1))\r\nHome()").await.unwrap_err();
    assert!(matches!(err, IppError::InvalidCommand(_)));
    assert!(client.is_connected());

    let txn = client.home().await.unwrap();
    assert_eq!(txn.tag().to_string(), "00001");
    assert_eq!(server.next_command().await.1, "Home()");
}
