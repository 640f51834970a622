//! TextBuffer public API property tests

use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;
use text_buffer::{Position, TextBuffer};
use unicode_segmentation::UnicodeSegmentation;

fn lines_text() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-zé ]{0,6}", 1..6).prop_map(|lines| lines.join("\n"))
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn positions_round_trip(text in lines_text()) {
        let buffer: TextBuffer = text.parse().unwrap();
        for offset in 0..=text.len() {
            let Position { line_number, column } = buffer.get_position_at(offset);
            prop_assert_eq!(buffer.get_offset_at(line_number, column), offset);
            prop_assert!(column <= buffer.get_line_max_column(line_number));
        }
    }

    #[test]
    fn lines_match_split(text in lines_text()) {
        let buffer: TextBuffer = text.parse().unwrap();
        let expected: Vec<String> = text.split('\n').map(str::to_owned).collect();
        prop_assert_eq!(buffer.get_lines_content(), expected);
    }

    #[test]
    fn grapheme_steps_are_inverse(text in lines_text()) {
        let buffer: TextBuffer = text.parse().unwrap();
        let mut offset = 0;
        while offset < buffer.get_length() {
            let next = buffer.next_grapheme_offset(offset);
            prop_assert!(next > offset);
            prop_assert_eq!(buffer.prev_grapheme_offset(next), offset);
            offset = next;
        }
    }

    #[test]
    fn grapheme_steps_match_full_segmentation(text in long_lines_text()) {
        let buffer: TextBuffer = text.parse().unwrap();
        let expected: Vec<usize> = text
            .grapheme_indices(true)
            .map(|(i, _)| i)
            .skip(1)
            .chain(std::iter::once(text.len()))
            .collect();

        let mut forward = Vec::new();
        let mut offset = 0;
        while offset < buffer.get_length() {
            offset = buffer.next_grapheme_offset(offset);
            forward.push(offset);
        }
        if text.is_empty() {
            prop_assert!(forward.is_empty());
        } else {
            prop_assert_eq!(&forward, &expected);
        }

        let mut backward = Vec::new();
        let mut offset = buffer.get_length();
        while offset > 0 {
            offset = buffer.prev_grapheme_offset(offset);
            backward.push(offset);
        }
        let mut starts: Vec<usize> = text.grapheme_indices(true).map(|(i, _)| i).collect();
        starts.reverse();
        prop_assert_eq!(backward, starts);
    }
}
