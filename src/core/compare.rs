//! Pair-sampling homology comparator
//!
//! Drives one full comparison of two MAF files: count pairs, derive the
//! accept probability, sample from A, probe B, aggregate, and symmetrically
//! for the other direction. The output is a deterministic function of
//! (MAF content, sample size, seed, near, intervals, bin length).

use crate::core::error::Result;
use crate::core::homology::perform_homology_tests;
use crate::core::pairs::{collect_names, count_pairs_in_maf};
use crate::core::results::{
    add_roll_ups, aggregate_all, enumerate_homology_results, ResultCounts, ResultMap,
};
use crate::core::sample::sample_pairs_from_maf;
use crate::formats::bed::IntervalSet;
use crate::formats::wig::{build_wiggle_containers, WiggleContainer};
use crate::formats::xml::{ReportAttributes, XmlReportWriter};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Options of one comparison run
pub struct CompareOptions {
    /// Target number of sampled pairs per direction
    pub samples: u64,
    /// Positional slack applied to one pair member at a time
    pub near: u64,
    /// RNG seed; drawn from entropy when unset and always reported
    pub seed: Option<u64>,
    /// Bed files restricting result classification
    pub bed_files: Vec<PathBuf>,
    /// (reference pattern, partner pattern) pairs for wiggle output
    pub wiggle_pairs: Vec<(String, String)>,
    pub wiggle_bin_length: u64,
    /// Explicit legitimate-sequence list overriding the name intersection
    pub legit_sequences: Option<Vec<String>>,
    /// Pre-computed pair totals, skipping the counting passes
    pub number_of_pairs: Option<(u64, u64)>,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            samples: 1_000_000,
            near: 0,
            seed: None,
            bed_files: Vec::new(),
            wiggle_pairs: Vec::new(),
            wiggle_bin_length: 100_000,
            legit_sequences: None,
            number_of_pairs: None,
        }
    }
}

/// Everything produced by [`compare_mafs`], ready for XML serialisation
pub struct ComparisonReport {
    pub seed: u64,
    pub number_of_pairs_in_maf1: u64,
    pub number_of_pairs_in_maf2: u64,
    pub results_ab: ResultMap,
    pub results_ba: ResultMap,
    pub aggregate_ab: ResultCounts,
    pub aggregate_ba: ResultCounts,
    pub wiggles: Vec<WiggleContainer>,
}

/// The legitimate-sequence set: names present in both files (or the
/// explicit override), plus the sequence-length table of both files
pub fn build_legit_set(
    maf1: &Path,
    maf2: &Path,
    explicit: Option<&[String]>,
) -> Result<(HashSet<String>, HashMap<String, u64>)> {
    let mut names1 = HashSet::new();
    let mut names2 = HashSet::new();
    let mut lengths = HashMap::new();
    collect_names(maf1, &mut names1, &mut lengths)?;
    collect_names(maf2, &mut names2, &mut lengths)?;

    let legit: HashSet<String> = match explicit {
        Some(list) => {
            let requested: HashSet<String> = list.iter().cloned().collect();
            for name in &requested {
                if !names1.contains(name) || !names2.contains(name) {
                    warn!("requested sequence {} is not present in both files", name);
                }
            }
            requested
        }
        None => names1.intersection(&names2).cloned().collect(),
    };
    Ok((legit, lengths))
}

/// One comparison direction: sample from `maf_a`, probe `maf_b`
#[allow(clippy::too_many_arguments)]
fn compare_direction(
    maf_a: &Path,
    maf_b: &Path,
    num_pairs: u64,
    legit: &HashSet<String>,
    intervals: &IntervalSet,
    wiggles: &mut [WiggleContainer],
    is_a_to_b: bool,
    options: &CompareOptions,
    rng: &mut StdRng,
) -> Result<(ResultMap, ResultCounts)> {
    info!(
        "sampling from {} and probing {}",
        maf_a.display(),
        maf_b.display()
    );
    if num_pairs == 0 {
        // zero pairs in the source file: an empty result set, not an error
        warn!("no pairs to sample in {}", maf_a.display());
        return Ok((ResultMap::new(), ResultCounts::default()));
    }
    let accept_probability = (options.samples as f64 / num_pairs as f64).min(1.0);
    let sampled = sample_pairs_from_maf(maf_a, legit, accept_probability, rng)?;
    info!("sampled {} pairs of {}", sampled.len(), num_pairs);
    let positives = perform_homology_tests(maf_b, legit, &sampled, options.near)?;
    let mut results =
        enumerate_homology_results(&sampled, &positives, intervals, wiggles, is_a_to_b);
    let aggregate = aggregate_all(&results);
    add_roll_ups(&mut results, legit);
    Ok((results, aggregate))
}

/// Run the full two-direction comparison
pub fn compare_mafs(maf1: &Path, maf2: &Path, options: &CompareOptions) -> Result<ComparisonReport> {
    let seed = options.seed.unwrap_or_else(rand::random);
    info!("random seed {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let (legit, lengths) =
        build_legit_set(maf1, maf2, options.legit_sequences.as_deref())?;
    info!("{} legitimate sequences", legit.len());

    let intervals = if options.bed_files.is_empty() {
        IntervalSet::empty()
    } else {
        IntervalSet::from_bed_files(&options.bed_files)?
    };

    let mut wiggles =
        build_wiggle_containers(&options.wiggle_pairs, &lengths, options.wiggle_bin_length);

    let (num_pairs_1, num_pairs_2) = match options.number_of_pairs {
        Some(pair) => pair,
        None => (
            count_pairs_in_maf(maf1, &legit)?,
            count_pairs_in_maf(maf2, &legit)?,
        ),
    };
    info!("pairs: {} in maf1, {} in maf2", num_pairs_1, num_pairs_2);

    let (results_ab, aggregate_ab) = compare_direction(
        maf1,
        maf2,
        num_pairs_1,
        &legit,
        &intervals,
        &mut wiggles,
        true,
        options,
        &mut rng,
    )?;
    let (results_ba, aggregate_ba) = compare_direction(
        maf2,
        maf1,
        num_pairs_2,
        &legit,
        &intervals,
        &mut wiggles,
        false,
        options,
        &mut rng,
    )?;

    Ok(ComparisonReport {
        seed,
        number_of_pairs_in_maf1: num_pairs_1,
        number_of_pairs_in_maf2: num_pairs_2,
        results_ab,
        results_ba,
        aggregate_ab,
        aggregate_ba,
        wiggles,
    })
}

/// Serialise a finished comparison into the XML report
pub fn write_report<W: Write>(
    report: &ComparisonReport,
    maf1: &Path,
    maf2: &Path,
    options: &CompareOptions,
    out: W,
) -> std::io::Result<()> {
    let bed_string = if options.bed_files.is_empty() {
        None
    } else {
        Some(
            options
                .bed_files
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(","),
        )
    };
    let wiggle_string = if options.wiggle_pairs.is_empty() {
        None
    } else {
        Some(
            options
                .wiggle_pairs
                .iter()
                .map(|(a, b)| format!("{},{}", a, b))
                .collect::<Vec<_>>()
                .join(","),
        )
    };

    let maf1_name = maf1.display().to_string();
    let maf2_name = maf2.display().to_string();
    let mut writer = XmlReportWriter::new(out);
    writer.write_document_header()?;
    writer.write_root_open(&ReportAttributes {
        number_of_samples: options.samples,
        near: options.near,
        seed: report.seed,
        maf1: &maf1_name,
        maf2: &maf2_name,
        number_of_pairs_in_maf1: report.number_of_pairs_in_maf1,
        number_of_pairs_in_maf2: report.number_of_pairs_in_maf2,
        bed_files: bed_string.as_deref(),
        wiggle_pairs: wiggle_string.as_deref(),
        wiggle_bin_length: options.wiggle_bin_length,
    })?;
    let has_bed = !options.bed_files.is_empty();
    writer.write_homology_tests(
        &maf1_name,
        &maf2_name,
        &report.results_ab,
        &report.aggregate_ab,
        has_bed,
    )?;
    writer.write_homology_tests(
        &maf2_name,
        &maf1_name,
        &report.results_ba,
        &report.aggregate_ba,
        has_bed,
    )?;
    writer.write_wiggles(&report.wiggles)?;
    writer.write_root_close()?;
    Ok(())
}
