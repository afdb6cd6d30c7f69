//! Property tests for the relay's fragment filter

use chatrelay_core::providers::openai::streaming::{
    FragmentFilter, FrameOutcome, DONE_MARKER, STARTUP_FILTER_FRAGMENTS,
};
use proptest::prelude::*;

fn frame(content: &str) -> String {
    serde_json::json!({ "choices": [{ "delta": { "content": content } }] }).to_string()
}

fn run(contents: &[String]) -> Vec<String> {
    let mut filter = FragmentFilter::new();
    contents
        .iter()
        .filter_map(|c| match filter.process(&frame(c)) {
            FrameOutcome::Emit(fragment) => Some(fragment),
            _ => None,
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_startup_fragments_have_no_newlines(contents in prop::collection::vec("[a-c\n]{0,4}", 0..12)) {
        let emitted = run(&contents);
        for fragment in emitted.iter().take(STARTUP_FILTER_FRAGMENTS) {
            prop_assert!(!fragment.contains('\n'));
        }
        for fragment in &emitted {
            prop_assert!(!fragment.is_empty());
        }
    }

    #[test]
    fn prop_emitted_is_subsequence_of_input(contents in prop::collection::vec("[a-c\n]{0,4}", 0..12)) {
        let emitted = run(&contents);
        let mut remaining = contents.iter();
        for fragment in &emitted {
            prop_assert!(remaining.any(|c| c == fragment));
        }
    }

    #[test]
    fn prop_nothing_after_done(
        before in prop::collection::vec("[a-z]{1,4}", 0..6),
        after in prop::collection::vec("[a-z]{1,4}", 1..6),
    ) {
        let mut filter = FragmentFilter::new();
        for c in &before {
            filter.process(&frame(c));
        }
        prop_assert_eq!(filter.process(DONE_MARKER), FrameOutcome::Done);
        for c in &after {
            prop_assert_eq!(filter.process(&frame(c)), FrameOutcome::Done);
        }
    }

    #[test]
    fn prop_arbitrary_data_never_panics(data in ".{0,64}") {
        let mut filter = FragmentFilter::new();
        let _ = filter.process(&data);
    }
}
