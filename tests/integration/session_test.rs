// tests/integration/session_test.rs

use super::test_helpers::{MockServer, within};
use ippdme::core::IppError;
use ippdme::core::tags::Tag;
use std::sync::Arc;

#[tokio::test]
async fn test_start_session_is_always_tag_one() {
    let mut server = MockServer::standard().await;
    let client = server.client().await;

    // Earlier holders of the reused tags must have finished first.
    for txn in [
        client.get_dme_version().await.unwrap(),
        client.abort_e().await.unwrap(),
        client.is_homed().await.unwrap(),
    ] {
        within(txn.on_complete()).await.unwrap();
    }

    let start = client.start_session().await.unwrap();
    assert_eq!(start.tag().to_string(), "00001");
    within(start.on_complete()).await.unwrap();

    let event = client.get_prop_e(&["Tool.Name()"]).await.unwrap();
    assert_eq!(event.tag().to_string(), "E0001");

    let mut seen = Vec::new();
    for _ in 0..5 {
        seen.push(server.next_command().await);
    }
    assert_eq!(seen[0].0, "00001");
    assert_eq!(seen[1].0, "E0001");
    assert_eq!(seen[2].0, "00002");
    assert_eq!(seen[3], ("00001".to_string(), "StartSession()".to_string()));
    assert_eq!(seen[4], ("E0001".to_string(), "GetPropE(Tool.Name())".to_string()));
}

#[tokio::test]
async fn test_end_session_resets_pools_after_sending() {
    let mut server = MockServer::standard().await;
    let client = server.client().await;

    within(client.start_session().await.unwrap().on_complete())
        .await
        .unwrap();
    client.home().await.unwrap();
    let end = client.end_session().await.unwrap();
    assert_eq!(end.tag().to_string(), "00003");
    within(end.on_complete()).await.unwrap();

    let after = client.get_dme_version().await.unwrap();
    assert_eq!(after.tag().to_string(), "00001");

    assert_eq!(server.next_command().await.1, "StartSession()");
    assert_eq!(server.next_command().await.1, "Home()");
    assert_eq!(
        server.next_command().await,
        ("00003".to_string(), "EndSession()".to_string())
    );
    assert_eq!(server.next_command().await.0, "00001");
}

#[tokio::test]
async fn test_start_session_keeps_tag_one_under_concurrent_sends() {
    let server = MockServer::standard().await;
    let client = Arc::new(server.client().await);

    for _ in 0..20 {
        let mut homes = Vec::new();
        for _ in 0..16 {
            let client = Arc::clone(&client);
            homes.push(tokio::spawn(async move { client.home().await }));
        }
        match client.start_session().await {
            Ok(start) => {
                assert_eq!(start.tag().to_string(), "00001");
                within(start.on_complete()).await.unwrap();
            }
            // A home still running on 00001 is the only allowed refusal.
            Err(e) => assert!(matches!(e, IppError::TagInUse(_)), "got {e:?}"),
        }
        for home in homes {
            if let Ok(txn) = home.await.unwrap() {
                within(txn.on_complete()).await.unwrap();
            }
        }
    }
    assert!(client.is_connected());
}

#[tokio::test]
async fn test_end_session_reset_is_not_split_by_other_senders() {
    let server = MockServer::standard().await;
    let client = Arc::new(server.client().await);

    let mut homes = Vec::new();
    for _ in 0..8 {
        let client = Arc::clone(&client);
        homes.push(tokio::spawn(async move { client.home().await }));
    }
    let end = client.end_session().await.unwrap();
    within(end.on_complete()).await.unwrap();
    for home in homes {
        if let Ok(txn) = home.await.unwrap() {
            within(txn.on_complete()).await.unwrap();
        }
    }

    // Nothing queued behind EndSession can take a tag from the old run.
    let next = client.home().await.unwrap();
    assert!(
        matches!(next.tag(), Tag::Normal(n) if n <= 9),
        "got {}",
        next.tag()
    );
}
