//! Homology tester
//!
//! Probes the second MAF for the pairs sampled from the first. A sampled
//! pair is a hit when some column of the probed file aligns both of its
//! positions; with a positional slack `near > 0`, one side at a time may be
//! off by up to `near` bases while the other side matches exactly.

use crate::core::error::Result;
use crate::core::sample::{AlignedPair, BlockWalker};
use crate::formats::maf::{MafBlock, MafReader};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// `pos - near` guarded against underflow
#[inline]
fn lower_bound(pos: u64, near: u64) -> u64 {
    pos.saturating_sub(near)
}

/// Record into `positives` every sampled pair matched by the aligned pair
/// `(s1:p1, s2:p2)` observed in the probed file
///
/// The slack window is applied to each side in turn while the other side is
/// held exact, so a pair can match through either end but never through
/// both simultaneously.
fn record_near_pair(
    sampled: &BTreeSet<AlignedPair>,
    positives: &mut HashSet<AlignedPair>,
    near: u64,
    s1: &str,
    p1: u64,
    s2: &str,
    p2: u64,
) {
    for q in lower_bound(p1, near)..=p1 + near {
        let probe = AlignedPair::new(s1, s2, q, p2);
        if sampled.contains(&probe) {
            positives.insert(probe);
        }
    }
    if near > 0 {
        for q in lower_bound(p2, near)..=p2 + near {
            let probe = AlignedPair::new(s1, s2, p1, q);
            if sampled.contains(&probe) {
                positives.insert(probe);
            }
        }
    }
}

/// Probe one block: every in-column pair of legitimate non-gap positions is
/// tested against the sampled set
pub fn walk_block_testing_homology(
    block: &MafBlock,
    legit: &HashSet<String>,
    sampled: &BTreeSet<AlignedPair>,
    positives: &mut HashSet<AlignedPair>,
    near: u64,
) {
    if block.rows.len() < 2 {
        return;
    }
    let mut walker = BlockWalker::new(block, legit);
    if walker.legit_count() < 2 {
        return;
    }
    for c in 0..walker.column_count {
        let rows = walker.cull_column(c);
        for i in 0..rows.len() {
            for j in (i + 1)..rows.len() {
                let r1 = rows[i];
                let r2 = rows[j];
                record_near_pair(
                    sampled,
                    positives,
                    near,
                    walker.names[r1],
                    walker.positions[r1],
                    walker.names[r2],
                    walker.positions[r2],
                );
            }
        }
        walker.advance(c);
    }
}

/// Probe a whole MAF file, returning the set of sampled pairs found in it
pub fn perform_homology_tests<P: AsRef<Path>>(
    path: P,
    legit: &HashSet<String>,
    sampled: &BTreeSet<AlignedPair>,
    near: u64,
) -> Result<HashSet<AlignedPair>> {
    let mut positives = HashSet::new();
    let mut reader = MafReader::from_path(path)?;
    while let Some(block) = reader.next_block()? {
        walk_block_testing_homology(&block, legit, sampled, &mut positives, near);
    }
    Ok(positives)
}
