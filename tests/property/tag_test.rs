// tests/property/tag_test.rs

//! Property-based tests for tag allocation and tag text.

use ippdme::core::tags::{MAX_EVENT_TAG, MAX_NORMAL_TAG, Queue, Tag, TagAllocator};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_tag_text_round_trip(normal in 0..=MAX_NORMAL_TAG, event in 0..=MAX_EVENT_TAG) {
        for tag in [Tag::Normal(normal), Tag::Event(event)] {
            let text = tag.to_string();
            prop_assert_eq!(text.len(), 5);
            prop_assert_eq!(text.parse::<Tag>().unwrap(), tag);
        }
    }

    #[test]
    fn test_allocator_follows_pool_sequences(
        queues in prop::collection::vec(prop::bool::ANY, 1..=500)
    ) {
        let mut tags = TagAllocator::new();
        let mut expected_normal = 0u32;
        let mut expected_event = 0u16;

        for fast in queues {
            if fast {
                expected_event = expected_event % MAX_EVENT_TAG + 1;
                prop_assert_eq!(tags.next(Queue::Fast), Tag::Event(expected_event));
            } else {
                expected_normal = expected_normal % MAX_NORMAL_TAG + 1;
                prop_assert_eq!(tags.next(Queue::Normal), Tag::Normal(expected_normal));
            }
        }
    }

    #[test]
    fn test_allocator_never_hands_out_zero(skip in 0u32..30_000) {
        let mut tags = TagAllocator::new();
        for _ in 0..skip {
            tags.next(Queue::Fast);
        }
        let tag = tags.next(Queue::Fast);
        prop_assert!(!tag.is_unsolicited());
        prop_assert_eq!(tag, Tag::Event((skip % MAX_EVENT_TAG as u32) as u16 + 1));
    }
}
