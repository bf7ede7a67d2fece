//! Integration tests for blobstream
//!
//! These tests drive the public API the way a downstream consumer would:
//! build a tokenizer over a reader, pull blobs, and hand them on.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::fs::{self, File};
use std::io::{self, BufReader, Cursor, Read};

use blobstream::process::{extract, for_each_blob};
use blobstream::{BlobError, BlobTokenizer, ByteSource, CharSource, Config, OutputFormat, UnitMode};
use pretty_assertions::assert_eq;

const PAGES: &str = "tests/data/pages.xml";

fn collect(input: &str, open: &str, close: &str) -> Vec<String> {
    BlobTokenizer::chars(input.as_bytes(), open, close)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

fn assert_delimited(blobs: &[String], open: &str, close: &str) {
    for blob in blobs {
        assert!(blob.starts_with(open), "should start with {open}: {blob:?}");
        assert!(blob.ends_with(close), "should end with {close}: {blob:?}");
    }
}

#[test]
fn test_should_iterate_over_blobs() {
    let cases = [
        ("<i>1</i><i>2</i><i>3</i>", "<i>", "</i>"),
        ("<list> <i>\n\t1</i>\n<i>2</i><i>3</i><list>", "<i>", "</i>"),
        ("<i>\n\t1</i>\n<i>2</i><i>3</i><list>", "<i>", "</i>"),
        ("[[]]]    [[    ]]] [[[]] ", "[[", "]]"),
    ];

    for (input, open, close) in cases {
        let blobs = collect(input, open, close);
        assert_eq!(blobs.len(), 3, "input {input:?}");
        assert_delimited(&blobs, open, close);
    }
}

#[test]
fn test_scenario_items() {
    assert_eq!(
        collect("<i>1</i><i>2</i><i>3</i>", "<i>", "</i>"),
        vec!["<i>1</i>", "<i>2</i>", "<i>3</i>"]
    );
}

#[test]
fn test_scenario_brackets_no_backtrack() {
    assert_eq!(
        collect("[[]]]    [[    ]]] [[[]] ", "[[", "]]"),
        vec!["[[]]", "[[    ]]", "[[[]]"]
    );
}

#[test]
fn test_parse_wikipedia_sample() {
    let file = File::open(PAGES).unwrap();
    let mut count = 0;
    for page in BlobTokenizer::chars(BufReader::new(file), "<page>", "</page>").unwrap() {
        let page = page.unwrap();
        assert!(page.starts_with("<page>"));
        assert!(page.ends_with("</page>"));
        assert!(page.contains("<title>"));
        count += 1;
    }
    assert_eq!(count, 5);
}

#[test]
fn test_wikipedia_sample_titles_in_order() {
    let file = File::open(PAGES).unwrap();
    let titles: Vec<String> = BlobTokenizer::chars(BufReader::new(file), "<title>", "</title>")
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert_eq!(
        titles,
        vec![
            "<title>Anarchism</title>",
            "<title>Autism</title>",
            "<title>Albedo</title>",
            "<title>A</title>",
            "<title>Alabama</title>",
        ]
    );
}

#[test]
fn test_bytes_and_chars_agree_on_ascii_markers() {
    let input = fs::read(PAGES).unwrap();
    let chars: Vec<String> = BlobTokenizer::chars(&input[..], "<page>", "</page>")
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let bytes: Vec<Vec<u8>> = BlobTokenizer::bytes(&input[..], b"<page>", b"</page>")
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    let chars_as_bytes: Vec<Vec<u8>> = chars.into_iter().map(String::into_bytes).collect();
    assert_eq!(chars_as_bytes, bytes);
}

#[test]
fn test_has_next_next_protocol() {
    let mut tokenizer = BlobTokenizer::chars(&b"<a>1</a> <a>2</a>"[..], "<a>", "</a>").unwrap();
    let mut seen = Vec::new();
    while tokenizer.has_next().unwrap() {
        seen.push(tokenizer.next_blob().unwrap());
    }
    assert_eq!(seen, vec!["<a>1</a>", "<a>2</a>"]);
    assert!(matches!(tokenizer.next_blob(), Err(BlobError::Exhausted)));
}

#[test]
fn test_unterminated_tail_keeps_prior_blobs() {
    assert_eq!(
        collect("<r>1</r><r>2</r><r>never closed", "<r>", "</r>"),
        vec!["<r>1</r>", "<r>2</r>"]
    );
}

#[test]
fn test_consumer_parses_each_blob_independently() {
    // A downstream consumer only ever sees one record at a time
    let input = "<rec>id=1;name=a</rec>\n<rec>id=2;name=b</rec>\n";
    let ids: Vec<u32> = BlobTokenizer::chars(input.as_bytes(), "<rec>", "</rec>")
        .unwrap()
        .map(|blob| {
            let blob = blob.unwrap();
            let body = &blob["<rec>".len()..blob.len() - "</rec>".len()];
            body.split(';')
                .find_map(|kv| kv.strip_prefix("id="))
                .unwrap()
                .parse()
                .unwrap()
        })
        .collect();
    assert_eq!(ids, vec![1, 2]);
}

/// Reader that hands out at most one byte per call, then fails
struct TrickleThenFail {
    data: Cursor<Vec<u8>>,
}

impl Read for TrickleThenFail {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.data.read(&mut buf[..1])? {
            0 => Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer reset")),
            n => Ok(n),
        }
    }
}

#[test]
fn test_read_fault_mid_blob() {
    let reader = BufReader::new(TrickleThenFail {
        data: Cursor::new(b"<i>1</i><i>2".to_vec()),
    });
    let mut tokenizer = BlobTokenizer::new(CharSource::new(reader), "<i>".into(), "</i>".into())
        .unwrap();

    assert_eq!(tokenizer.next_blob().unwrap(), "<i>1</i>");
    match tokenizer.next_blob() {
        Err(BlobError::Read(e)) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
        other => panic!("expected read fault, got {other:?}"),
    }
    assert!(tokenizer.next().is_none());
}

#[test]
fn test_source_returned_to_caller() {
    let mut tokenizer = BlobTokenizer::new(
        ByteSource::new(Cursor::new(b"<x>1</x>left".to_vec())),
        b"<x>".to_vec(),
        b"</x>".to_vec(),
    )
    .unwrap();
    assert_eq!(tokenizer.next_blob().unwrap(), b"<x>1</x>");

    let mut cursor = tokenizer.into_source().into_inner();
    let mut rest = String::new();
    cursor.read_to_string(&mut rest).unwrap();
    assert_eq!(rest, "left");
}

#[test]
fn test_extract_pages_as_json() {
    let config = Config {
        output: OutputFormat::Json,
        ..Default::default()
    };
    let file = File::open(PAGES).unwrap();
    let mut output = Vec::new();
    let stats = extract(BufReader::new(file), &mut output, &config, PAGES).unwrap();

    assert_eq!(stats.blobs, 5);
    let text = String::from_utf8(output).unwrap();
    let decoded: Vec<String> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(decoded.len(), 5);
    assert!(decoded[2].contains("Rückstrahlung"));
    assert!(decoded.iter().all(|p| p.starts_with("<page>")));
}

#[test]
fn test_for_each_blob_with_limit_in_byte_mode() {
    let config = Config {
        open: "<page>".to_string(),
        close: "</page>".to_string(),
        unit: UnitMode::Bytes,
        limit: Some(2),
        ..Default::default()
    };
    let mut sizes = Vec::new();
    let file = File::open(PAGES).unwrap();
    let stats = for_each_blob(BufReader::new(file), &config, PAGES, |index, blob| {
        sizes.push((index, blob.len()));
        Ok(())
    })
    .unwrap();

    assert_eq!(stats.blobs, 2);
    assert_eq!(sizes.len(), 2);
    assert_eq!(sizes[0].0, 1);
    assert_eq!(sizes[1].0, 2);
}

#[test]
fn test_extract_input_cut_mid_character_is_not_an_error() {
    // Dump truncated inside the two-byte 'é'
    let input: &[u8] = b"<page>Caf\xc3\xa9</page><page>caf\xc3";
    let mut output = Vec::new();
    let stats = extract(input, &mut output, &Config::default(), "cut.xml").unwrap();
    assert_eq!(stats.blobs, 1);
    assert_eq!(String::from_utf8(output).unwrap(), "<page>Café</page>\n");
}
