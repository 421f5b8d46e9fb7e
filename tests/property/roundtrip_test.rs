// tests/property/roundtrip_test.rs

//! Property-based tests for commands travelling over a real connection.
//! Whatever is sent must reach the server verbatim, in order, under
//! consecutive tags, and every reply must land on its own transaction.

use crate::test_helpers::{MockServer, within};
use ippdme::core::tags::Queue;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 20,
        max_shrink_iters: 100,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_commands_arrive_verbatim_and_in_order(
        commands in prop::collection::vec("[A-Za-z][ -~]{0,60}", 1..=25),
        fast in prop::collection::vec(prop::bool::ANY, 25)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let mut server = MockServer::start(std::sync::Arc::new(|tag: &str, command: &str| {
                vec![
                    format!("{tag} &"),
                    format!("{tag} # Echo({})", command.len()),
                    format!("{tag} %"),
                ]
            }))
            .await;
            let client = server.client().await;

            let mut sent = Vec::new();
            for (command, fast) in commands.iter().zip(&fast) {
                let queue = if *fast { Queue::Fast } else { Queue::Normal };
                sent.push(client.command_with(command, queue, |_| {}).await.unwrap());
            }

            let mut normal = 0u32;
            let mut event = 0u16;
            for (txn, command) in sent.iter().zip(&commands) {
                let (tag, received) = server.next_command().await;
                assert_eq!(&received, command);
                assert_eq!(tag, txn.tag().to_string());
                if txn.tag().is_event() {
                    event += 1;
                    assert_eq!(tag, format!("E{event:04}"));
                } else {
                    normal += 1;
                    assert_eq!(tag, format!("{normal:05}"));
                }

                within(txn.on_complete()).await.unwrap();
                assert_eq!(txn.data_payloads(), vec![format!("Echo({})", command.len())]);
            }

            client.disconnect().await;
        });
    }
}
