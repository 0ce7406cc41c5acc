//! Pair counting engine
//!
//! Exact enumeration of the number of homology pairs in a MAF restricted to
//! a legitimate-sequence set, plus the closed-form codec between linear pair
//! indices and (row, row) pairs used by the column sampler.
//!
//! A column with `k` legitimate non-gap rows contributes `C(k, 2)` pairs;
//! the file total is the sum over all columns of all blocks.

use crate::core::error::Result;
use crate::formats::maf::{MafBlock, MafReader};
use std::collections::HashSet;
use std::path::Path;

/// `C(n, 2)`, the number of unordered pairs among `n` items
#[inline]
pub fn choose_two(n: u64) -> u64 {
    if n < 2 {
        0
    } else {
        (n * (n - 1)) >> 1
    }
}

/// Precomputed `C(k, 2)` for `k <= 100`, accelerating the per-column loop
pub struct ChooseTwoTable {
    table: [u64; 101],
}

impl ChooseTwoTable {
    pub fn new() -> Self {
        let mut table = [0u64; 101];
        for (k, slot) in table.iter_mut().enumerate() {
            *slot = choose_two(k as u64);
        }
        Self { table }
    }

    #[inline]
    pub fn get(&self, k: u64) -> u64 {
        if k <= 100 {
            self.table[k as usize]
        } else {
            choose_two(k)
        }
    }
}

impl Default for ChooseTwoTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Which rows of a block name a legitimate sequence
pub fn legit_rows(block: &MafBlock, legit: &HashSet<String>) -> Vec<bool> {
    block
        .rows
        .iter()
        .map(|row| legit.contains(&row.name))
        .collect()
}

/// Count of legitimate non-gap rows in column `c`
#[inline]
pub fn count_legit_gapless(matrix: &[&[u8]], c: usize, legit_rows: &[bool]) -> u64 {
    let mut k = 0;
    for (r, row) in matrix.iter().enumerate() {
        if legit_rows[r] && row[c] != b'-' {
            k += 1;
        }
    }
    k
}

/// Exact number of homology pairs in one block
pub fn walk_block_counting_pairs(
    block: &MafBlock,
    legit: &HashSet<String>,
    table: &ChooseTwoTable,
) -> u64 {
    if block.rows.is_empty() {
        return 0;
    }
    let matrix = block.sequence_matrix();
    let legit_rows = legit_rows(block, legit);
    let mut count = 0;
    for c in 0..block.column_count() {
        count += table.get(count_legit_gapless(&matrix, c, &legit_rows));
    }
    count
}

/// Exact number of homology pairs in a MAF file
pub fn count_pairs_in_maf<P: AsRef<Path>>(path: P, legit: &HashSet<String>) -> Result<u64> {
    let table = ChooseTwoTable::new();
    let mut reader = MafReader::from_path(path)?;
    let mut count = 0;
    while let Some(block) = reader.next_block()? {
        count += walk_block_counting_pairs(&block, legit, &table);
    }
    Ok(count)
}

/// Collect every sequence name appearing in a MAF along with its declared
/// source length
pub fn collect_names<P: AsRef<Path>>(
    path: P,
    names: &mut HashSet<String>,
    lengths: &mut std::collections::HashMap<String, u64>,
) -> Result<()> {
    let mut reader = MafReader::from_path(path)?;
    while let Some(block) = reader.next_block()? {
        for row in &block.rows {
            names.insert(row.name.clone());
            if let Some(&existing) = lengths.get(&row.name) {
                if existing != row.source_length {
                    log::warn!(
                        "sequence {} declared with sourceLength {} and {}, keeping {}",
                        row.name,
                        existing,
                        row.source_length,
                        existing
                    );
                }
            } else {
                lengths.insert(row.name.clone(), row.source_length);
            }
        }
    }
    Ok(())
}

/// Map a pair of row indices `(r, c)` with `r < c < n` to its linear index
/// in the row-by-row enumeration of the upper triangle
#[inline]
pub fn pair_index(r: u64, c: u64, n: u64) -> u64 {
    debug_assert!(r < c && c < n);
    r * n - (r * (r + 1)) / 2 + c - r - 1
}

/// Inverse of [`pair_index`]: recover `(r, c)` from a linear index
///
/// Uses the closed-form triangular decode; a correction step absorbs any
/// floating-point rounding at row boundaries.
pub fn pair_from_index(i: u64, n: u64) -> (u64, u64) {
    debug_assert!(n >= 2);
    debug_assert!(i < choose_two(n));
    let two_n_minus_1 = 2 * n - 1;
    let disc = (two_n_minus_1 * two_n_minus_1 - 8 * i) as f64;
    let mut r = ((two_n_minus_1 as f64 - disc.sqrt()) / 2.0).floor() as u64;
    // first linear index of row r is pair_index(r, r + 1)
    let row_start = |r: u64| r * n - (r * (r + 1)) / 2;
    while r + 1 < n - 1 && i >= row_start(r + 1) {
        r += 1;
    }
    while r > 0 && i < row_start(r) {
        r -= 1;
    }
    let c = i - (r * n - (r * (r + 1)) / 2) + r + 1;
    debug_assert!(r < n && c < n);
    (r, c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn block(content: &str) -> MafBlock {
        MafReader::new(BufReader::new(content.as_bytes()))
            .next_block()
            .unwrap()
            .unwrap()
    }

    fn legit(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_choose_two() {
        assert_eq!(choose_two(0), 0);
        assert_eq!(choose_two(1), 0);
        assert_eq!(choose_two(2), 1);
        assert_eq!(choose_two(3), 3);
        assert_eq!(choose_two(5), 10);
    }

    #[test]
    fn test_table_matches_formula() {
        let table = ChooseTwoTable::new();
        for k in 0..=100 {
            assert_eq!(table.get(k), choose_two(k));
        }
        assert_eq!(table.get(1000), choose_two(1000));
    }

    #[test]
    fn test_count_identical_block() {
        // three full rows over 4 columns, one row gapped in the last
        let b = block(
            "a\n\
             s spA 0 5 + 10 ACGTA\n\
             s spB 0 5 + 10 ACGTA\n\
             s spC 0 4 + 10 ACGT-\n",
        );
        let table = ChooseTwoTable::new();
        let names = legit(&["spA", "spB", "spC"]);
        // C(3,2)*4 + C(2,2)*1 = 13
        assert_eq!(walk_block_counting_pairs(&b, &names, &table), 13);
    }

    #[test]
    fn test_count_respects_legit_filter() {
        let b = block(
            "a\n\
             s spA 0 3 + 10 ACG\n\
             s spB 0 3 + 10 ACG\n\
             s spC 0 3 + 10 ACG\n",
        );
        let table = ChooseTwoTable::new();
        assert_eq!(
            walk_block_counting_pairs(&b, &legit(&["spA", "spB"]), &table),
            3
        );
        assert_eq!(walk_block_counting_pairs(&b, &legit(&["spA"]), &table), 0);
    }

    #[test]
    fn test_count_duplicate_names() {
        // duplicated species still count pair-per-column
        let b = block(
            "a\n\
             s spA 0 2 + 10 AC\n\
             s spA 2 2 + 10 AC\n",
        );
        let table = ChooseTwoTable::new();
        assert_eq!(walk_block_counting_pairs(&b, &legit(&["spA"]), &table), 2);
    }

    #[test]
    fn test_pair_index_roundtrip_small() {
        for n in 2u64..=12 {
            let mut i = 0;
            for r in 0..n {
                for c in (r + 1)..n {
                    assert_eq!(pair_index(r, c, n), i, "n={} r={} c={}", n, r, c);
                    assert_eq!(pair_from_index(i, n), (r, c), "n={} i={}", n, i);
                    i += 1;
                }
            }
            assert_eq!(i, choose_two(n));
        }
    }

    #[test]
    fn test_pair_index_boundaries() {
        let n = 1000;
        let m = choose_two(n);
        for &i in &[0, 1, n - 2, n - 1, m / 2, m - 2, m - 1] {
            let (r, c) = pair_from_index(i, n);
            assert!(r < c && c < n);
            assert_eq!(pair_index(r, c, n), i);
        }
    }
}
