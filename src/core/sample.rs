//! Column sampler
//!
//! Uniform sampling over the homology pairs of a MAF file. Every aligned
//! pair is accepted independently with probability `p = samples / total`;
//! dense columns are handled analytically with a single binomial draw so a
//! column with thousands of rows never materialises all of its pairs.

use crate::core::error::Result;
use crate::core::pairs::{count_legit_gapless, legit_rows, pair_from_index, ChooseTwoTable};
use crate::formats::maf::{MafBlock, MafReader};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Binomial, Distribution};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// Columns with at most this many pairs are sampled by brute force
const BRUTE_FORCE_LIMIT: u64 = 4;

/// A canonicalised homology pair: two forward-strand positions drawn from
/// the same column
///
/// Ordering (and therefore the layout of the sampled-pair set) is
/// `(seq1, seq2, pos1, pos2)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AlignedPair {
    pub seq1: String,
    pub seq2: String,
    pub pos1: u64,
    pub pos2: u64,
}

impl AlignedPair {
    /// Build a pair in canonical form: `seq1 < seq2`, and `pos1 < pos2`
    /// when the sequences are equal
    pub fn new(seq1: &str, seq2: &str, pos1: u64, pos2: u64) -> Self {
        if seq1 > seq2 || (seq1 == seq2 && pos1 > pos2) {
            AlignedPair {
                seq1: seq2.to_string(),
                seq2: seq1.to_string(),
                pos1: pos2,
                pos2: pos1,
            }
        } else {
            AlignedPair {
                seq1: seq1.to_string(),
                seq2: seq2.to_string(),
                pos1,
                pos2,
            }
        }
    }

    /// The sequence-name key of this pair
    pub fn name_key(&self) -> (String, String) {
        (self.seq1.clone(), self.seq2.clone())
    }
}

/// Column-by-column walker over a block, maintaining the forward-strand
/// position accumulator for every row
///
/// Positions start at the row's positive-coord anchor and advance by one
/// each time the row shows a non-gap character.
pub struct BlockWalker<'a> {
    pub matrix: Vec<&'a [u8]>,
    pub names: Vec<&'a str>,
    pub legit_rows: Vec<bool>,
    pub positions: Vec<u64>,
    pub column_count: usize,
}

impl<'a> BlockWalker<'a> {
    pub fn new(block: &'a MafBlock, legit: &HashSet<String>) -> Self {
        Self {
            matrix: block.sequence_matrix(),
            names: block.names(),
            legit_rows: legit_rows(block, legit),
            positions: block.positive_starts(),
            column_count: block.column_count(),
        }
    }

    /// Number of legitimate rows
    pub fn legit_count(&self) -> usize {
        self.legit_rows.iter().filter(|&&b| b).count()
    }

    /// Row indices of the legitimate non-gap rows of column `c`
    pub fn cull_column(&self, c: usize) -> Vec<usize> {
        (0..self.matrix.len())
            .filter(|&r| self.legit_rows[r] && self.matrix[r][c] != b'-')
            .collect()
    }

    /// Advance the position accumulator past column `c`
    pub fn advance(&mut self, c: usize) {
        for (r, row) in self.matrix.iter().enumerate() {
            if row[c] != b'-' {
                self.positions[r] += 1;
            }
        }
    }
}

/// Samples pairs from MAF blocks with a fixed accept probability
pub struct PairSampler<'a> {
    accept_probability: f64,
    table: &'a ChooseTwoTable,
    rng: &'a mut StdRng,
}

impl<'a> PairSampler<'a> {
    pub fn new(accept_probability: f64, table: &'a ChooseTwoTable, rng: &'a mut StdRng) -> Self {
        Self {
            accept_probability: accept_probability.clamp(0.0, 1.0),
            table,
            rng,
        }
    }

    /// Sample pairs from every column of `block` into `pairs`
    pub fn sample_block(
        &mut self,
        block: &MafBlock,
        legit: &HashSet<String>,
        pairs: &mut BTreeSet<AlignedPair>,
    ) {
        if block.rows.len() < 2 {
            return;
        }
        let mut walker = BlockWalker::new(block, legit);
        if walker.legit_count() < 2 {
            return;
        }
        for c in 0..walker.column_count {
            let num_pairs = self.table.get(count_legit_gapless(
                &walker.matrix,
                c,
                &walker.legit_rows,
            ));
            if num_pairs > 0 {
                let rows = walker.cull_column(c);
                if num_pairs <= BRUTE_FORCE_LIMIT {
                    self.sample_column_brute_force(&walker, &rows, num_pairs, pairs);
                } else {
                    self.sample_column_analytic(&walker, &rows, num_pairs, pairs);
                }
            }
            walker.advance(c);
        }
    }

    /// Flip one coin per pair; used for sparse columns
    fn sample_column_brute_force(
        &mut self,
        walker: &BlockWalker,
        rows: &[usize],
        num_pairs: u64,
        pairs: &mut BTreeSet<AlignedPair>,
    ) {
        for i in 0..num_pairs {
            if self.rng.gen::<f64>() <= self.accept_probability {
                pairs.insert(self.pair_at(walker, rows, i));
            }
        }
    }

    /// Draw the number of accepted pairs once, then choose that many
    /// distinct linear indices; when more than half the pairs are accepted,
    /// sample the complement instead
    fn sample_column_analytic(
        &mut self,
        walker: &BlockWalker,
        rows: &[usize],
        num_pairs: u64,
        pairs: &mut BTreeSet<AlignedPair>,
    ) {
        let binomial = Binomial::new(num_pairs, self.accept_probability)
            .expect("accept probability is clamped to [0, 1]");
        let n = binomial.sample(self.rng);
        if n == 0 {
            return;
        }
        let (draw, complement) = if n as f64 > num_pairs as f64 / 2.0 && num_pairs > n {
            (num_pairs - n, true)
        } else {
            (n, false)
        };

        let mut chosen: HashSet<u64> = HashSet::with_capacity(draw as usize);
        while (chosen.len() as u64) < draw {
            chosen.insert(self.rng.gen_range(0..num_pairs));
        }

        if complement {
            for i in 0..num_pairs {
                if !chosen.contains(&i) {
                    pairs.insert(self.pair_at(walker, rows, i));
                }
            }
        } else {
            for &i in &chosen {
                pairs.insert(self.pair_at(walker, rows, i));
            }
        }
    }

    fn pair_at(&self, walker: &BlockWalker, rows: &[usize], i: u64) -> AlignedPair {
        let (r, c) = pair_from_index(i, rows.len() as u64);
        let r1 = rows[r as usize];
        let r2 = rows[c as usize];
        AlignedPair::new(
            walker.names[r1],
            walker.names[r2],
            walker.positions[r1],
            walker.positions[r2],
        )
    }
}

/// Sample pairs uniformly from a whole MAF file
pub fn sample_pairs_from_maf<P: AsRef<Path>>(
    path: P,
    legit: &HashSet<String>,
    accept_probability: f64,
    rng: &mut StdRng,
) -> Result<BTreeSet<AlignedPair>> {
    let table = ChooseTwoTable::new();
    let mut sampler = PairSampler::new(accept_probability, &table, rng);
    let mut pairs = BTreeSet::new();
    let mut reader = MafReader::from_path(path)?;
    while let Some(block) = reader.next_block()? {
        sampler.sample_block(&block, legit, &mut pairs);
    }
    Ok(pairs)
}
