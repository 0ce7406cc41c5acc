//! Transitive-closure engine
//!
//! Treats every aligned column as evidence that bases are equivalent. Two
//! passes over the MAF: the first collects every sequence into an
//! `N`-filled reservoir and registers pinch-graph threads; the second
//! pinches every aligned run of every block into the thread set. The
//! closed alignment is then emitted, one MAF block per pinch block.

use crate::core::dna::{complement_base, revcomp_inplace};
use crate::core::error::{MafCompareError, MafParseError, Result};
use crate::core::pinch::PinchThreadSet;
use crate::formats::maf::{MafBlock, MafReader, MafRow, Strand};
use log::info;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

/// Pinches between periodic `join_trivial_boundaries` calls, bounding the
/// segment count during long runs
pub const PINCH_JOIN_THRESHOLD: u64 = 50_000_000;

/// Forward-strand reservoir of every sequence seen in the input
///
/// Buffers are allocated lazily at the declared `sourceLength` and filled
/// with `N`; every observed base is written at its forward-strand offset.
#[derive(Default)]
pub struct Reservoir {
    buffers: HashMap<String, Vec<u8>>,
}

impl Reservoir {
    pub fn sequence(&self, name: &str) -> Option<&[u8]> {
        self.buffers.get(name).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Copy the non-gap characters of one row into its buffer
    ///
    /// A `-` row is reverse complemented first, so the buffer always holds
    /// the forward strand. Disagreement with a previously observed non-`N`
    /// character is fatal.
    fn add_row(&mut self, row: &MafRow) -> Result<()> {
        let buffer = self
            .buffers
            .entry(row.name.clone())
            .or_insert_with(|| vec![b'N'; row.source_length as usize]);
        if buffer.len() as u64 != row.source_length {
            return Err(MafCompareError::MalformedMaf(MafParseError::InvalidRow {
                line: row.line_number,
                name: row.name.clone(),
                message: format!(
                    "sourceLength {} disagrees with previously declared {}",
                    row.source_length,
                    buffer.len()
                ),
            }));
        }

        let mut text = row.text.as_bytes().to_vec();
        if row.strand == Strand::Minus {
            revcomp_inplace(&mut text);
        }
        let start = row.positive_start() as usize;
        let mut p = 0usize;
        for &ch in &text {
            if ch == b'-' {
                continue;
            }
            let observed = ch.to_ascii_uppercase();
            let existing = buffer[start + p];
            if existing != b'N' && existing != observed {
                return Err(MafCompareError::InconsistentSequence {
                    name: row.name.clone(),
                    position: (start + p) as u64,
                    observed: observed as char,
                    existing: existing as char,
                    line: row.line_number,
                });
            }
            buffer[start + p] = observed;
            p += 1;
        }
        Ok(())
    }
}

/// Pass 1: fill the reservoir and create one thread per sequence
pub fn build_reservoir<P: AsRef<Path>>(
    path: P,
    reservoir: &mut Reservoir,
    threads: &mut PinchThreadSet,
) -> Result<()> {
    let mut reader = MafReader::from_path(path)?;
    while let Some(block) = reader.next_block()? {
        for row in &block.rows {
            threads.add_thread(&row.name, row.source_length);
            reservoir.add_row(row)?;
        }
    }
    Ok(())
}

/// A maximal non-gap run of one reference row, in block-local columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fragment {
    /// Index into the sorted row order
    ref_row: usize,
    start: usize,
    end: usize, // inclusive
}

/// Greedy comparison order: cover every non-gap column exactly once with
/// the fewest fragments, preferring earlier rows
///
/// Row `r` claims the non-gap runs of whatever column regions rows before
/// it left gapped; its gap runs within those regions become the todo list
/// of row `r + 1`.
fn comparison_order(matrix: &[&[u8]], column_count: usize) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    if column_count == 0 || matrix.is_empty() {
        return fragments;
    }
    let mut todo: Vec<(usize, usize)> = vec![(0, column_count - 1)];
    let mut row = 0;
    while !todo.is_empty() && row < matrix.len() {
        let mut next_todo = Vec::new();
        for &(start, end) in &todo {
            let mut run_start = None;
            let mut gap_start = None;
            for i in start..=end {
                if matrix[row][i] == b'-' {
                    if let Some(s) = run_start.take() {
                        fragments.push(Fragment {
                            ref_row: row,
                            start: s,
                            end: i - 1,
                        });
                    }
                    if gap_start.is_none() {
                        gap_start = Some(i);
                    }
                } else {
                    if let Some(g) = gap_start.take() {
                        next_todo.push((g, i - 1));
                    }
                    if run_start.is_none() {
                        run_start = Some(i);
                    }
                }
            }
            if let Some(s) = run_start {
                fragments.push(Fragment {
                    ref_row: row,
                    start: s,
                    end,
                });
            }
            if let Some(g) = gap_start {
                next_todo.push((g, end));
            }
        }
        todo = next_todo;
        row += 1;
    }
    fragments
}

/// Transform an ungapped row-local coordinate to the forward-strand start
/// of a run of `run_length` bases
fn global_positive_start(row: &MafRow, local: u64, run_length: u64) -> u64 {
    match row.strand {
        Strand::Plus => row.start + local,
        Strand::Minus => row.source_length - row.start - local - run_length,
    }
}

/// Number of non-gap characters strictly before each column of a row;
/// the per-row cache behind local-to-ungapped coordinate translation
fn prefix_ungapped(text: &[u8]) -> Vec<u64> {
    let mut prefix = Vec::with_capacity(text.len());
    let mut count = 0u64;
    for &ch in text {
        prefix.push(count);
        if ch != b'-' {
            count += 1;
        }
    }
    prefix
}

/// Pass 2 driver state
pub struct ClosureBuilder {
    threads: PinchThreadSet,
    pinch_count: u64,
}

impl ClosureBuilder {
    pub fn new(threads: PinchThreadSet) -> Self {
        Self {
            threads,
            pinch_count: 0,
        }
    }

    /// Pinch every aligned run of one block into the thread set
    pub fn add_block(&mut self, block: &MafBlock) {
        if block.rows.len() < 2 {
            return;
        }
        // denser rows first: they become pinch references and minimise the
        // number of pinches
        let mut order: Vec<usize> = (0..block.rows.len()).collect();
        order.sort_by_key(|&r| block.rows[r].gap_count());
        let matrix: Vec<&[u8]> = order
            .iter()
            .map(|&r| block.rows[r].text.as_bytes())
            .collect();
        let prefixes: Vec<Vec<u64>> = matrix.iter().map(|row| prefix_ungapped(row)).collect();

        let fragments = comparison_order(&matrix, block.column_count());
        for fragment in fragments {
            for other in (fragment.ref_row + 1)..order.len() {
                self.pinch_pair(block, &order, &matrix, &prefixes, &fragment, other);
            }
        }
    }

    /// Pinch the gap-free runs shared by a reference fragment and one
    /// other row
    fn pinch_pair(
        &mut self,
        block: &MafBlock,
        order: &[usize],
        matrix: &[&[u8]],
        prefixes: &[Vec<u64>],
        fragment: &Fragment,
        other: usize,
    ) {
        let ref_maf_row = &block.rows[order[fragment.ref_row]];
        let other_maf_row = &block.rows[order[other]];
        let same_strand = ref_maf_row.strand == other_maf_row.strand;
        let other_text = matrix[other];

        let mut run_start = None;
        for pos in fragment.start..=fragment.end {
            if other_text[pos] == b'-' {
                if let Some(s) = run_start.take() {
                    self.emit_pinch(
                        ref_maf_row,
                        other_maf_row,
                        prefixes[fragment.ref_row][s],
                        prefixes[other][s],
                        (pos - s) as u64,
                        same_strand,
                    );
                }
            } else if run_start.is_none() {
                run_start = Some(pos);
            }
        }
        if let Some(s) = run_start {
            self.emit_pinch(
                ref_maf_row,
                other_maf_row,
                prefixes[fragment.ref_row][s],
                prefixes[other][s],
                (fragment.end + 1 - s) as u64,
                same_strand,
            );
        }
    }

    fn emit_pinch(
        &mut self,
        ref_row: &MafRow,
        other_row: &MafRow,
        ref_local: u64,
        other_local: u64,
        length: u64,
        same_strand: bool,
    ) {
        let a = self
            .threads
            .get_thread(&ref_row.name)
            .expect("thread registered in pass 1");
        let b = self
            .threads
            .get_thread(&other_row.name)
            .expect("thread registered in pass 1");
        let start_a = global_positive_start(ref_row, ref_local, length);
        let start_b = global_positive_start(other_row, other_local, length);
        self.threads.pinch(a, b, start_a, start_b, length, same_strand);
        self.pinch_count += 1;
        if self.pinch_count > PINCH_JOIN_THRESHOLD {
            self.threads.join_trivial_boundaries();
            self.pinch_count = 0;
        }
    }

    /// Final join, returning the finished thread set
    pub fn finish(mut self) -> PinchThreadSet {
        self.threads.join_trivial_boundaries();
        self.threads
    }
}

/// Emit the closed alignment: `a degree=<k>` per block, one `s` line per
/// segment, fields padded per block
pub fn report_closure<W: Write>(
    threads: &PinchThreadSet,
    reservoir: &Reservoir,
    mut out: W,
) -> std::io::Result<()> {
    writeln!(out, "##maf version=1")?;
    writeln!(out, "# maf-compare closure v{}", env!("CARGO_PKG_VERSION"))?;
    writeln!(out)?;

    let name_width = (0..threads.thread_count() as u32)
        .map(|t| threads.thread_name(t).len())
        .max()
        .unwrap_or(0)
        + 2;

    for block in threads.block_ids() {
        let segments = threads.block_segments(block);
        let mut start_width = 0;
        let mut length_width = 0;
        let mut source_width = 0;
        let rows: Vec<(String, u64, u64, char, u64)> = segments
            .iter()
            .map(|seg| {
                let source_length = threads.thread_length(seg.thread);
                let (start, strand) = if seg.forward {
                    (seg.start, '+')
                } else {
                    (source_length - seg.start - seg.length, '-')
                };
                (
                    threads.thread_name(seg.thread).to_string(),
                    start,
                    seg.length,
                    strand,
                    source_length,
                )
            })
            .collect();
        for (_, start, length, _, source_length) in &rows {
            start_width = start_width.max(decimal_width(*start));
            length_width = length_width.max(decimal_width(*length));
            source_width = source_width.max(decimal_width(*source_length));
        }

        writeln!(out, "a degree={}", segments.len())?;
        for (seg, (name, start, length, strand, source_length)) in
            segments.iter().zip(rows.iter())
        {
            let buffer = reservoir
                .sequence(name)
                .expect("reservoir holds every thread");
            let mut seq: Vec<u8> =
                buffer[seg.start as usize..(seg.start + seg.length) as usize].to_vec();
            if !seg.forward {
                seq.reverse();
                for b in seq.iter_mut() {
                    *b = complement_base(*b);
                }
            }
            writeln!(
                out,
                "s {:<nw$} {:>sw$} {:>lw$} {} {:>ow$} {}",
                name,
                start,
                length,
                strand,
                source_length,
                String::from_utf8_lossy(&seq),
                nw = name_width,
                sw = start_width,
                lw = length_width,
                ow = source_width,
            )?;
        }
        writeln!(out)?;
    }
    writeln!(out)?;
    Ok(())
}

fn decimal_width(mut n: u64) -> usize {
    let mut width = 1;
    while n >= 10 {
        n /= 10;
        width += 1;
    }
    width
}

/// Run the whole transitive closure: two passes over `path`, then report
pub fn transitive_closure<P: AsRef<Path>, W: Write>(path: P, out: W) -> Result<()> {
    let path = path.as_ref();
    let mut reservoir = Reservoir::default();
    let mut threads = PinchThreadSet::new();
    build_reservoir(path, &mut reservoir, &mut threads)?;
    info!(
        "pass 1 complete: {} sequences in the reservoir",
        reservoir.len()
    );

    let mut builder = ClosureBuilder::new(threads);
    let mut reader = MafReader::from_path(path)?;
    while let Some(block) = reader.next_block()? {
        builder.add_block(&block);
    }
    let threads = builder.finish();
    info!(
        "pass 2 complete: {} threads, {} segments",
        threads.thread_count(),
        threads.segment_count()
    );

    report_closure(&threads, &reservoir, out)?;
    Ok(())
}
