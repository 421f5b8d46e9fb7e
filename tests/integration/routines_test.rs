// tests/integration/routines_test.rs

use super::test_helpers::{MockServer, standard_replies, within};
use ippdme::client::routines;
use ippdme::core::geometry::{Csy, Float3};
use ippdme::core::IppError;
use std::sync::Arc;

#[tokio::test]
async fn test_ensure_homed_skips_when_already_homed() {
    let mut server = MockServer::standard().await;
    let client = server.client().await;

    assert!(!within(routines::ensure_homed(&client)).await.unwrap());
    assert_eq!(server.next_command().await.1, "IsHomed()");

    // Nothing else was sent.
    client.get_machine_class().await.unwrap();
    assert_eq!(server.next_command().await.1, "GetMachineClass()");
}

#[tokio::test]
async fn test_ensure_homed_homes_an_unhomed_machine() {
    let mut server = MockServer::start(Arc::new(|tag: &str, command: &str| {
        if command == "IsHomed()" {
            vec![format!("{tag} &"), format!("{tag} # IsHomed(0)"), format!("{tag} %")]
        } else {
            standard_replies(tag, command)
        }
    }))
    .await;
    let client = server.client().await;

    assert!(within(routines::ensure_homed(&client)).await.unwrap());
    assert_eq!(server.next_command().await.1, "IsHomed()");
    assert_eq!(server.next_command().await.1, "Home()");
}

#[tokio::test]
async fn test_ensure_homed_rejects_unexpected_reply() {
    let server = MockServer::start(Arc::new(|tag: &str, _: &str| {
        vec![format!("{tag} # Something(else)"), format!("{tag} %")]
    }))
    .await;
    let client = server.client().await;

    assert!(matches!(
        within(routines::ensure_homed(&client)).await,
        Err(IppError::UnexpectedReply(_))
    ));
}

#[tokio::test]
async fn test_ensure_tool_loaded() {
    let mut server = MockServer::standard().await;
    let client = server.client().await;

    assert!(!within(routines::ensure_tool_loaded(&client, "Probe1")).await.unwrap());
    assert_eq!(server.next_command().await.1, "GetProp(Tool.Name())");

    assert!(within(routines::ensure_tool_loaded(&client, "Probe2")).await.unwrap());
    assert_eq!(server.next_command().await.1, "GetProp(Tool.Name())");
    assert_eq!(server.next_command().await.1, "ChangeTool(\"Probe2\")");
}

#[tokio::test]
async fn test_set_part_csy_sends_transformation_then_selects_it() {
    let mut server = MockServer::standard().await;
    let client = server.client().await;

    let csy = Csy::new(10.0, 20.0, 30.0, 90.0, 0.0, 45.0);
    within(routines::set_part_csy(&client, &csy)).await.unwrap();

    assert_eq!(
        server.next_command().await.1,
        "SetCsyTransformation(PartCsy, 10, 20, 30, 90, 0, 45)"
    );
    assert_eq!(server.next_command().await.1, "SetCoordSystem(PartCsy)");
}

#[tokio::test]
async fn test_current_position_parses_reply() {
    let server = MockServer::standard().await;
    let client = server.client().await;

    let position = within(routines::current_position(&client)).await.unwrap();
    assert_eq!(position, Float3::new(10.5, -2.0, 300.0));
}

#[tokio::test]
async fn test_measure_point_formats_target_and_parses_hit() {
    let mut server = MockServer::start(Arc::new(|tag: &str, command: &str| {
        if command.starts_with("PtMeas(") {
            vec![
                format!("{tag} &"),
                format!("{tag} # X(1.25), Y(2), Z(-0.004)"),
                format!("{tag} %"),
            ]
        } else {
            standard_replies(tag, command)
        }
    }))
    .await;
    let client = server.client().await;

    let hit = within(routines::measure_point(
        &client,
        Float3::new(1.0, 2.0, 0.0),
        Float3::new(0.0, 0.0, 1.0),
    ))
    .await
    .unwrap();

    assert_eq!(hit, Float3::new(1.25, 2.0, -0.004));
    assert_eq!(
        server.next_command().await.1,
        "PtMeas(X(1), Y(2), Z(0), IJK(0,0,1))"
    );
}

#[tokio::test]
async fn test_measure_point_surfaces_measurement_errors() {
    let server = MockServer::start(Arc::new(|tag: &str, _: &str| {
        vec![
            format!("{tag} &"),
            format!("{tag} !Error(3, 1006, \"PtMeas\", \"Surface not found\")"),
        ]
    }))
    .await;
    let client = server.client().await;

    let err = within(routines::measure_point(
        &client,
        Float3::ZERO,
        Float3::new(0.0, 0.0, 1.0),
    ))
    .await
    .unwrap_err();
    assert_eq!(err.command_error().unwrap().server.code, Some(1006));
}
