//! Property-based tests for the blob tokenizer.
//!
//! Generated inputs check that:
//! 1. N well-formed records separated by filler yield exactly N blobs
//! 2. Two tokenizers over identical input yield identical blobs
//! 3. Cutting the input short only ever drops the trailing record

#![warn(clippy::all)]

use blobstream::BlobTokenizer;
use proptest::prelude::*;

fn blobs(input: &str, open: &str, close: &str) -> Vec<String> {
    BlobTokenizer::chars(input.as_bytes(), open, close)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

/// Record bodies never contain '<', so they cannot hold a marker
fn body_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9 \n\t=;\"'&>/é€]{0,40}").expect("valid regex")
}

/// Filler between records never contains the first unit of the open marker
fn filler_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z \n\t>/]{0,20}").expect("valid regex")
}

fn records_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec((filler_strategy(), body_strategy()), 0..20)
}

fn render(records: &[(String, String)], open: &str, close: &str) -> String {
    let mut input = String::new();
    for (filler, body) in records {
        input.push_str(filler);
        input.push_str(open);
        input.push_str(body);
        input.push_str(close);
    }
    input
}

proptest! {
    #[test]
    fn well_formed_records_yield_one_blob_each(records in records_strategy()) {
        let input = render(&records, "<rec>", "</rec>");
        let out = blobs(&input, "<rec>", "</rec>");

        prop_assert_eq!(out.len(), records.len());
        for (blob, (_, body)) in out.iter().zip(&records) {
            prop_assert_eq!(blob, &format!("<rec>{body}</rec>"));
        }
    }

    #[test]
    fn identical_streams_yield_identical_blobs(input in "[<>a-z/\\[\\] ]{0,200}") {
        prop_assert_eq!(blobs(&input, "<a>", "</a>"), blobs(&input, "<a>", "</a>"));
        prop_assert_eq!(blobs(&input, "[[", "]]"), blobs(&input, "[[", "]]"));
    }

    #[test]
    fn every_blob_is_delimited(input in "[<>ab/ ]{0,200}") {
        for blob in blobs(&input, "<a>", "</a>") {
            prop_assert!(blob.starts_with("<a>"));
            prop_assert!(blob.ends_with("</a>"));
        }
    }

    #[test]
    fn truncation_drops_only_the_last_record(
        records in prop::collection::vec((filler_strategy(), body_strategy()), 1..10),
        cut in 1usize..6,
    ) {
        let input = render(&records, "<rec>", "</rec>");
        // Cut inside the final close marker ("</rec>" is all ASCII)
        let truncated = &input[..input.len() - cut];
        let out = blobs(truncated, "<rec>", "</rec>");
        prop_assert_eq!(out.len(), records.len() - 1);
    }

    #[test]
    fn single_unit_markers(parts in prop::collection::vec("[xyz]{0,5}", 0..10)) {
        let input: String = parts.iter().map(|p| format!("a{p}b")).collect();
        prop_assert_eq!(blobs(&input, "a", "b").len(), parts.len());
    }
}
