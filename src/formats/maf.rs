//! MAF (Multiple Alignment Format) adapter
//!
//! Streaming block-at-a-time reader and writer for alignment MAF files
//! as described at <https://genome.ucsc.edu/FAQ/FAQformat.html#format5>.
//!
//! A MAF file is a header (optional `track` line, `##maf` line, `#`
//! comments) followed by paragraphs: an `a` line, then `s` lines (plus
//! pass-through `i`/`e`/`q`/`h` lines), terminated by a blank line or EOF.

use crate::core::error::{MafParseError, MafResult};
use crate::core::io::{open_reader, LineIterator};
use std::io::{BufRead, Write};
use std::path::Path;

/// Strand of an aligned row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strand {
    #[default]
    Plus,
    Minus,
}

impl Strand {
    /// Parse strand from a field, accepting only `+` and `-`
    pub fn from_field(s: &str) -> Option<Strand> {
        match s {
            "+" => Some(Strand::Plus),
            "-" => Some(Strand::Minus),
            _ => None,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Strand::Plus => '+',
            Strand::Minus => '-',
        }
    }
}

/// A single `s` line of an alignment block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MafRow {
    /// Sequence name of the form `species[.chromosome]`
    pub name: String,
    /// Start within the source sequence, relative to `strand`
    pub start: u64,
    /// Number of non-gap bases in `text`
    pub length: u64,
    pub strand: Strand,
    /// Full length of the source sequence
    pub source_length: u64,
    /// Gapped sequence text
    pub text: String,
    /// 1-based line number in the input, 0 for synthesized rows
    pub line_number: usize,
}

impl MafRow {
    /// Species key: the name truncated at the first `.`
    pub fn species_key(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }

    /// Forward-strand offset of the row anchor
    ///
    /// `+` rows anchor at `start`; `-` rows at
    /// `source_length - start - length`.
    pub fn positive_start(&self) -> u64 {
        match self.strand {
            Strand::Plus => self.start,
            Strand::Minus => self.source_length - self.start - self.length,
        }
    }

    /// Number of gap characters in the row text
    pub fn gap_count(&self) -> usize {
        self.text.bytes().filter(|&b| b == b'-').count()
    }
}

/// One alignment block: an `a` line plus its rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MafBlock {
    /// `key=value` pairs from the `a` line, in order
    pub metadata: Vec<(String, String)>,
    pub rows: Vec<MafRow>,
    /// `i`/`e`/`q`/`h` lines preserved verbatim
    pub passthrough: Vec<String>,
    /// 1-based line number of the `a` line
    pub line_number: usize,
}

impl MafBlock {
    /// Number of columns shared by every row (0 for a row-less block)
    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, |r| r.text.len())
    }

    /// Row-major view of the sequence texts as bytes
    pub fn sequence_matrix(&self) -> Vec<&[u8]> {
        self.rows.iter().map(|r| r.text.as_bytes()).collect()
    }

    /// Sequence-name array
    pub fn names(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.name.as_str()).collect()
    }

    /// Strand array
    pub fn strands(&self) -> Vec<Strand> {
        self.rows.iter().map(|r| r.strand).collect()
    }

    /// Start array (strand-relative MAF starts)
    pub fn starts(&self) -> Vec<u64> {
        self.rows.iter().map(|r| r.start).collect()
    }

    /// Source-length array
    pub fn source_lengths(&self) -> Vec<u64> {
        self.rows.iter().map(|r| r.source_length).collect()
    }

    /// Positive-coord start array (forward-strand anchors)
    pub fn positive_starts(&self) -> Vec<u64> {
        self.rows.iter().map(|r| r.positive_start()).collect()
    }

    /// Look up an `a`-line metadata value by key
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// One item out of the reader: the file header, or a block
#[derive(Debug, Clone, PartialEq)]
pub enum MafItem {
    /// Header lines (`track`, `##maf`, `#` comments), verbatim
    Header(Vec<String>),
    Block(MafBlock),
}

/// Pull-style MAF reader
pub struct MafReader<R: BufRead> {
    lines: LineIterator<R>,
    /// Lookahead line carried over from header scanning
    pending: Option<(usize, String)>,
    header_done: bool,
}

impl MafReader<Box<dyn BufRead + Send>> {
    /// Open a MAF file, transparently decompressing gzip/bzip2 input
    pub fn from_path<P: AsRef<Path>>(path: P) -> MafResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MafParseError::FileNotFound(path.to_path_buf()));
        }
        Ok(MafReader::new(open_reader(path)?))
    }
}

impl<R: BufRead> MafReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: LineIterator::new(reader),
            pending: None,
            header_done: false,
        }
    }

    /// Yield the next item: the header first (if any), then one block at a
    /// time. Returns `Ok(None)` at EOF.
    pub fn next_item(&mut self) -> MafResult<Option<MafItem>> {
        if !self.header_done {
            self.header_done = true;
            let header = self.read_header()?;
            if !header.is_empty() {
                return Ok(Some(MafItem::Header(header)));
            }
        }
        match self.read_block()? {
            Some(block) => Ok(Some(MafItem::Block(block))),
            None => Ok(None),
        }
    }

    /// Iterate over blocks only, discarding the header item
    pub fn next_block(&mut self) -> MafResult<Option<MafBlock>> {
        loop {
            match self.next_item()? {
                Some(MafItem::Header(_)) => continue,
                Some(MafItem::Block(block)) => return Ok(Some(block)),
                None => return Ok(None),
            }
        }
    }

    fn take_line(&mut self) -> MafResult<Option<(usize, String)>> {
        if let Some(pending) = self.pending.take() {
            return Ok(Some(pending));
        }
        match self.lines.next_line() {
            Some(Ok(line)) => {
                let line = line.to_string();
                let n = self.lines.line_number();
                Ok(Some((n, line)))
            }
            Some(Err(e)) => Err(MafParseError::Io(e)),
            None => Ok(None),
        }
    }

    fn read_header(&mut self) -> MafResult<Vec<String>> {
        let mut header = Vec::new();
        loop {
            match self.take_line()? {
                Some((_, line)) if line.trim().is_empty() => continue,
                Some((_, line))
                    if line.starts_with('#') || line.starts_with("track") =>
                {
                    header.push(line);
                }
                Some((n, line)) if line.starts_with('a') => {
                    self.pending = Some((n, line));
                    return Ok(header);
                }
                Some((n, line)) => return Err(MafParseError::unexpected(n, &line)),
                None => return Ok(header),
            }
        }
    }

    fn read_block(&mut self) -> MafResult<Option<MafBlock>> {
        // Find the next a line, skipping blanks and stray comments
        let (a_number, a_line) = loop {
            match self.take_line()? {
                Some((_, line)) if line.trim().is_empty() => continue,
                Some((_, line)) if line.starts_with('#') => continue,
                Some((n, line)) if line.starts_with('a') => break (n, line),
                Some((n, line)) => return Err(MafParseError::unexpected(n, &line)),
                None => return Ok(None),
            }
        };

        let mut block = MafBlock {
            metadata: parse_a_line(&a_line),
            line_number: a_number,
            ..MafBlock::default()
        };

        loop {
            match self.take_line()? {
                Some((_, line)) if line.trim().is_empty() => break,
                Some((n, line)) if line.starts_with("s ") || line.starts_with("s\t") => {
                    let row = parse_s_line(&line, n)?;
                    if let Some(first) = block.rows.first() {
                        if row.text.len() != first.text.len() {
                            return Err(MafParseError::RaggedBlock {
                                line: n,
                                expected: first.text.len(),
                                found: row.text.len(),
                            });
                        }
                    }
                    block.rows.push(row);
                }
                Some((_, line))
                    if matches!(line.bytes().next(), Some(b'i' | b'e' | b'q' | b'h')) =>
                {
                    block.passthrough.push(line);
                }
                Some((n, line)) => return Err(MafParseError::unexpected(n, &line)),
                None => break, // EOF terminates the block
            }
        }
        Ok(Some(block))
    }
}

/// Parse `a key1=value1 key2=value2` metadata
fn parse_a_line(line: &str) -> Vec<(String, String)> {
    line.split_whitespace()
        .skip(1)
        .map(|token| match token.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (token.to_string(), String::new()),
        })
        .collect()
}

/// Parse `s name start length strand sourceLength sequence`
fn parse_s_line(line: &str, line_number: usize) -> MafResult<MafRow> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 7 {
        return Err(MafParseError::WrongFieldCount {
            line: line_number,
            found: fields.len(),
        });
    }

    let name = fields[1].to_string();
    let start: u64 = fields[2]
        .parse()
        .map_err(|_| MafParseError::invalid_number(line_number, "start", fields[2]))?;
    let length: u64 = fields[3]
        .parse()
        .map_err(|_| MafParseError::invalid_number(line_number, "length", fields[3]))?;
    let strand = Strand::from_field(fields[4]).ok_or_else(|| MafParseError::InvalidStrand {
        line: line_number,
        strand: fields[4].to_string(),
    })?;
    let source_length: u64 = fields[5]
        .parse()
        .map_err(|_| MafParseError::invalid_number(line_number, "sourceLength", fields[5]))?;
    let text = fields[6].to_string();

    let non_gap = text.bytes().filter(|&b| b != b'-').count() as u64;
    if non_gap != length {
        return Err(MafParseError::InvalidRow {
            line: line_number,
            name,
            message: format!("{} non-gap characters but length field is {}", non_gap, length),
        });
    }
    if start + length > source_length {
        return Err(MafParseError::InvalidRow {
            line: line_number,
            name,
            message: format!(
                "start {} + length {} exceeds sourceLength {}",
                start, length, source_length
            ),
        });
    }

    Ok(MafRow {
        name,
        start,
        length,
        strand,
        source_length,
        text,
        line_number,
    })
}

/// MAF writer that re-serialises blocks with one blank line between them
pub struct MafWriter<W: Write> {
    inner: W,
    header_written: bool,
}

impl<W: Write> MafWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            header_written: false,
        }
    }

    /// Pass through an existing header
    pub fn write_header(&mut self, lines: &[String]) -> std::io::Result<()> {
        for line in lines {
            writeln!(self.inner, "{}", line)?;
        }
        writeln!(self.inner)?;
        self.header_written = true;
        Ok(())
    }

    /// Emit the default `##maf version=1` header
    pub fn write_default_header(&mut self) -> std::io::Result<()> {
        writeln!(self.inner, "##maf version=1")?;
        writeln!(self.inner)?;
        self.header_written = true;
        Ok(())
    }

    pub fn write_block(&mut self, block: &MafBlock) -> std::io::Result<()> {
        if !self.header_written {
            self.write_default_header()?;
        }
        write!(self.inner, "a")?;
        for (k, v) in &block.metadata {
            write!(self.inner, " {}={}", k, v)?;
        }
        writeln!(self.inner)?;
        for row in &block.rows {
            writeln!(
                self.inner,
                "s {} {} {} {} {} {}",
                row.name,
                row.start,
                row.length,
                row.strand.to_char(),
                row.source_length,
                row.text
            )?;
        }
        for line in &block.passthrough {
            writeln!(self.inner, "{}", line)?;
        }
        writeln!(self.inner)?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn reader(content: &str) -> MafReader<BufReader<&[u8]>> {
        MafReader::new(BufReader::new(content.as_bytes()))
    }

    const SIMPLE: &str = "\
##maf version=1 scoring=tba.v8
# tba.v8 alignment

a score=23262.0
s hg16.chr7    27578828 38 + 158545518 AAAGGGAATGTTAACCAAATGAATTGTCTCTTACGGTG
s panTro1.chr6 28741140 38 + 161576975 AAAGGGAATGTTAACCAAATGAATTGTCTCTTACGGTG

a score=5062.0
s hg16.chr7    27699739 6 + 158545518 TAAAGA
s panTro1.chr6 28862317 6 + 161576975 TAAAGA
";

    #[test]
    fn test_header_then_blocks() {
        let mut r = reader(SIMPLE);
        match r.next_item().unwrap() {
            Some(MafItem::Header(lines)) => {
                assert_eq!(lines.len(), 2);
                assert!(lines[0].starts_with("##maf"));
            }
            other => panic!("expected header, got {:?}", other),
        }
        let b1 = r.next_block().unwrap().unwrap();
        assert_eq!(b1.rows.len(), 2);
        assert_eq!(b1.metadata_value("score"), Some("23262.0"));
        assert_eq!(b1.column_count(), 38);
        let b2 = r.next_block().unwrap().unwrap();
        assert_eq!(b2.rows[0].length, 6);
        assert!(r.next_block().unwrap().is_none());
    }

    #[test]
    fn test_block_terminated_by_eof() {
        let mut r = reader("a\ns seq1 0 3 + 10 ACG\ns seq2 0 3 + 10 ACG");
        let block = r.next_block().unwrap().unwrap();
        assert_eq!(block.rows.len(), 2);
        assert!(r.next_block().unwrap().is_none());
    }

    #[test]
    fn test_multiple_blank_lines_skipped() {
        let mut r = reader("a\ns seq1 0 1 + 5 A\n\n\n\na\ns seq2 0 1 + 5 C\n");
        assert_eq!(r.next_block().unwrap().unwrap().rows[0].name, "seq1");
        assert_eq!(r.next_block().unwrap().unwrap().rows[0].name, "seq2");
        assert!(r.next_block().unwrap().is_none());
    }

    #[test]
    fn test_passthrough_lines_kept() {
        let mut r = reader(
            "a\ns seq1 0 3 + 10 ACG\ni seq1 N 0 C 0\nq seq1 999\ne seq2 0 3 + 10 C\n",
        );
        let block = r.next_block().unwrap().unwrap();
        assert_eq!(block.rows.len(), 1);
        assert_eq!(block.passthrough.len(), 3);
    }

    #[test]
    fn test_wrong_field_count() {
        let mut r = reader("a\ns seq1 0 3 + ACG\n");
        assert!(matches!(
            r.next_block(),
            Err(MafParseError::WrongFieldCount { found: 6, .. })
        ));
    }

    #[test]
    fn test_invalid_strand() {
        let mut r = reader("a\ns seq1 0 3 * 10 ACG\n");
        assert!(matches!(
            r.next_block(),
            Err(MafParseError::InvalidStrand { .. })
        ));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut r = reader("a\ns seq1 0 4 + 10 AC-G\n");
        assert!(matches!(r.next_block(), Err(MafParseError::InvalidRow { .. })));
    }

    #[test]
    fn test_start_plus_length_bounds() {
        let mut r = reader("a\ns seq1 8 3 + 10 ACG\n");
        assert!(matches!(r.next_block(), Err(MafParseError::InvalidRow { .. })));
    }

    #[test]
    fn test_ragged_block_rejected() {
        let mut r = reader("a\ns seq1 0 3 + 10 ACG\ns seq2 0 4 + 10 ACGT\n");
        assert!(matches!(
            r.next_block(),
            Err(MafParseError::RaggedBlock { .. })
        ));
    }

    #[test]
    fn test_positive_start() {
        let row = MafRow {
            name: "seq".into(),
            start: 2,
            length: 3,
            strand: Strand::Minus,
            source_length: 5,
            text: "CGT".into(),
            line_number: 0,
        };
        // sourceLength - start - length = 5 - 2 - 3
        assert_eq!(row.positive_start(), 0);
    }

    #[test]
    fn test_writer_roundtrip() {
        let mut r = reader(SIMPLE);
        let mut out = Vec::new();
        {
            let mut w = MafWriter::new(&mut out);
            while let Some(item) = r.next_item().unwrap() {
                match item {
                    MafItem::Header(lines) => w.write_header(&lines).unwrap(),
                    MafItem::Block(block) => w.write_block(&block).unwrap(),
                }
            }
        }
        let text = String::from_utf8(out).unwrap();
        let mut r2 = reader(&text);
        // reparses to the same two blocks
        let b1 = r2.next_block().unwrap().unwrap();
        assert_eq!(b1.rows[0].start, 27578828);
        let b2 = r2.next_block().unwrap().unwrap();
        assert_eq!(b2.rows[1].name, "panTro1.chr6");
    }

    #[test]
    fn test_default_header_emitted() {
        let block = MafBlock {
            rows: vec![MafRow {
                name: "s1".into(),
                start: 0,
                length: 1,
                strand: Strand::Plus,
                source_length: 1,
                text: "A".into(),
                line_number: 0,
            }],
            ..MafBlock::default()
        };
        let mut out = Vec::new();
        MafWriter::new(&mut out).write_block(&block).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("##maf version=1\n"));
    }

    #[test]
    fn test_species_key() {
        let mut r = reader("a\ns hg16.chr7 0 1 + 5 A\ns baboon 0 1 + 5 A\n");
        let block = r.next_block().unwrap().unwrap();
        assert_eq!(block.rows[0].species_key(), "hg16");
        assert_eq!(block.rows[1].species_key(), "baboon");
    }
}
