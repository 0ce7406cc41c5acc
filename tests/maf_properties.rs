//! Property-based tests for the MAF reader/writer
//!
//! Parsed blocks survive a write/parse round trip, and the forward-strand
//! coordinate transform is consistent on both strands.

use maf_compare::formats::maf::{MafBlock, MafItem, MafReader, MafRow, MafWriter, Strand};
use proptest::prelude::*;
use std::io::BufReader;

fn arb_strand() -> impl Strategy<Value = Strand> {
    prop_oneof![Just(Strand::Plus), Just(Strand::Minus)]
}

fn arb_row(cols: usize) -> impl Strategy<Value = MafRow> {
    (
        "[a-z]{2,6}(\\.chr[0-9])?",
        prop::collection::vec(prop::sample::select(vec!['A', 'C', 'G', 'T', 'N', '-']), cols),
        arb_strand(),
        0u64..1000,
    )
        .prop_map(move |(name, chars, strand, start)| {
            let text: String = chars.into_iter().collect();
            let length = text.bytes().filter(|&b| b != b'-').count() as u64;
            MafRow {
                name,
                start,
                length,
                strand,
                source_length: start + length + 50,
                text,
                line_number: 0,
            }
        })
}

fn arb_maf_block() -> impl Strategy<Value = MafBlock> {
    (1usize..=8, 1usize..=40)
        .prop_flat_map(|(rows, cols)| prop::collection::vec(arb_row(cols), rows))
        .prop_map(|rows| MafBlock {
            metadata: vec![("score".to_string(), "0.0".to_string())],
            rows,
            passthrough: Vec::new(),
            line_number: 0,
        })
}

proptest! {
    /// write then parse reproduces every field of every row
    #[test]
    fn prop_write_parse_roundtrip(block in arb_maf_block()) {
        let mut out = Vec::new();
        MafWriter::new(&mut out).write_block(&block).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut reader = MafReader::new(BufReader::new(text.as_bytes()));
        let parsed = reader.next_block().unwrap().unwrap();
        prop_assert_eq!(parsed.rows.len(), block.rows.len());
        for (parsed_row, row) in parsed.rows.iter().zip(block.rows.iter()) {
            prop_assert_eq!(&parsed_row.name, &row.name);
            prop_assert_eq!(parsed_row.start, row.start);
            prop_assert_eq!(parsed_row.length, row.length);
            prop_assert_eq!(parsed_row.strand, row.strand);
            prop_assert_eq!(parsed_row.source_length, row.source_length);
            prop_assert_eq!(&parsed_row.text, &row.text);
        }
    }

    /// the forward-strand anchor stays inside the source sequence and
    /// inverts cleanly
    #[test]
    fn prop_positive_start_in_bounds(block in arb_maf_block()) {
        for row in &block.rows {
            let anchor = row.positive_start();
            prop_assert!(anchor + row.length <= row.source_length);
            // recover the MAF start from the anchor
            let back = match row.strand {
                Strand::Plus => anchor,
                Strand::Minus => row.source_length - anchor - row.length,
            };
            prop_assert_eq!(back, row.start);
        }
    }

    /// derived arrays line up with the rows
    #[test]
    fn prop_derived_views_consistent(block in arb_maf_block()) {
        let names = block.names();
        let strands = block.strands();
        let starts = block.starts();
        let sources = block.source_lengths();
        let anchors = block.positive_starts();
        let matrix = block.sequence_matrix();
        for (i, row) in block.rows.iter().enumerate() {
            prop_assert_eq!(names[i], row.name.as_str());
            prop_assert_eq!(strands[i], row.strand);
            prop_assert_eq!(starts[i], row.start);
            prop_assert_eq!(sources[i], row.source_length);
            prop_assert_eq!(anchors[i], row.positive_start());
            prop_assert_eq!(matrix[i], row.text.as_bytes());
        }
    }
}

#[test]
fn test_header_roundtrip_passthrough() {
    let input = "track name=euArc visibility=pack\n\
                 ##maf version=1 scoring=tba.v8\n\
                 # extra comment\n\
                 \n\
                 a score=1.0\n\
                 s hg16.chr7 0 3 + 10 ACG\n\
                 s mm4.chr6  0 3 + 10 ACG\n";
    let mut reader = MafReader::new(BufReader::new(input.as_bytes()));
    let mut out = Vec::new();
    {
        let mut writer = MafWriter::new(&mut out);
        while let Some(item) = reader.next_item().unwrap() {
            match item {
                MafItem::Header(lines) => writer.write_header(&lines).unwrap(),
                MafItem::Block(block) => writer.write_block(&block).unwrap(),
            }
        }
    }
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("track name=euArc visibility=pack\n##maf version=1"));
    assert!(text.contains("# extra comment\n"));
    assert!(text.contains("a score=1.0\n"));
}
