//! Result aggregator
//!
//! Rolls the per-pair hit/miss outcomes of the homology tester up into
//! sequence-pair records, with the four interval-mask partitions and the
//! `self` / per-sequence aggregate summaries.

use crate::core::sample::AlignedPair;
use crate::formats::bed::IntervalSet;
use crate::formats::wig::{pattern_matches, WiggleContainer};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Counters for one ordered sequence-name pair
///
/// Invariants maintained by construction:
/// `in_all = in_both + in_a + in_b + in_neither` and
/// `total = total_both + total_a + total_b + total_neither`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultCounts {
    pub in_all: u64,
    pub in_both: u64,
    pub in_a: u64,
    pub in_b: u64,
    pub in_neither: u64,
    pub total: u64,
    pub total_both: u64,
    pub total_a: u64,
    pub total_b: u64,
    pub total_neither: u64,
}

impl ResultCounts {
    /// Fold another record into this one
    pub fn add(&mut self, other: &ResultCounts) {
        self.in_all += other.in_all;
        self.in_both += other.in_both;
        self.in_a += other.in_a;
        self.in_b += other.in_b;
        self.in_neither += other.in_neither;
        self.total += other.total;
        self.total_both += other.total_both;
        self.total_a += other.total_a;
        self.total_b += other.total_b;
        self.total_neither += other.total_neither;
    }

    /// Count one tested pair
    pub fn record(&mut self, found: bool, in1: bool, in2: bool) {
        match (in1, in2) {
            (true, true) => {
                self.total_both += 1;
                if found {
                    self.in_both += 1;
                }
            }
            (true, false) => {
                self.total_a += 1;
                if found {
                    self.in_a += 1;
                }
            }
            (false, true) => {
                self.total_b += 1;
                if found {
                    self.in_b += 1;
                }
            }
            (false, false) => {
                self.total_neither += 1;
                if found {
                    self.in_neither += 1;
                }
            }
        }
        self.total += 1;
        if found {
            self.in_all += 1;
        }
    }

    /// Whether the conservation invariants hold
    pub fn conserved(&self) -> bool {
        self.in_all == self.in_both + self.in_a + self.in_b + self.in_neither
            && self.total == self.total_both + self.total_a + self.total_b + self.total_neither
            && self.in_all <= self.total
            && self.in_both <= self.total_both
            && self.in_a <= self.total_a
            && self.in_b <= self.total_b
            && self.in_neither <= self.total_neither
    }
}

/// Results keyed by canonical ordered sequence-name pair
pub type ResultMap = BTreeMap<(String, String), ResultCounts>;

/// Canonicalise a name pair the same way sampled pairs are canonicalised
fn name_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Classify every sampled pair and build the per-sequence-pair records
///
/// `is_a_to_b` selects which wiggle direction the pair outcomes feed.
pub fn enumerate_homology_results(
    sampled: &BTreeSet<AlignedPair>,
    positives: &HashSet<AlignedPair>,
    intervals: &IntervalSet,
    wiggles: &mut [WiggleContainer],
    is_a_to_b: bool,
) -> ResultMap {
    let mut results = ResultMap::new();
    for pair in sampled {
        let found = positives.contains(pair);
        let in1 = intervals.contains(&pair.seq1, pair.pos1);
        let in2 = intervals.contains(&pair.seq2, pair.pos2);
        results
            .entry(pair.name_key())
            .or_default()
            .record(found, in1, in2);

        for wc in wiggles.iter_mut() {
            if wc.reference == pair.seq1 && pattern_matches(&wc.partner, &pair.seq2) {
                wc.record(pair.pos1, found, is_a_to_b);
            } else if wc.reference == pair.seq2 && pattern_matches(&wc.partner, &pair.seq1) {
                wc.record(pair.pos2, found, is_a_to_b);
            }
        }
    }
    results
}

/// Sum every record of the map into one overall record
pub fn aggregate_all(results: &ResultMap) -> ResultCounts {
    let mut agg = ResultCounts::default();
    for counts in results.values() {
        debug_assert!(counts.conserved());
        agg.add(counts);
    }
    agg
}

/// Add the `self` record (all records with `seq1 = seq2`) and one
/// `aggregate` record per legitimate sequence mentioning it on either side
pub fn add_roll_ups(results: &mut ResultMap, legit: &HashSet<String>) {
    let mut self_counts = ResultCounts::default();
    for ((s1, s2), counts) in results.iter() {
        if s1 == s2 {
            self_counts.add(counts);
        }
    }

    let mut additions: Vec<((String, String), ResultCounts)> = Vec::new();
    additions.push((name_key("self", "self"), self_counts));

    let mut names: Vec<&String> = legit.iter().collect();
    names.sort();
    for name in names {
        let mut agg = ResultCounts::default();
        for ((s1, s2), counts) in results.iter() {
            if s1 == name || s2 == name {
                agg.add(counts);
            }
        }
        additions.push((name_key(name, "aggregate"), agg));
    }

    for (key, counts) in additions {
        results.insert(key, counts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(s1: &str, s2: &str, p1: u64, p2: u64) -> AlignedPair {
        AlignedPair::new(s1, s2, p1, p2)
    }

    #[test]
    fn test_record_partitions() {
        let mut counts = ResultCounts::default();
        counts.record(true, true, true);
        counts.record(true, true, false);
        counts.record(false, false, true);
        counts.record(true, false, false);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.in_all, 3);
        assert_eq!(counts.total_both, 1);
        assert_eq!(counts.in_both, 1);
        assert_eq!(counts.total_a, 1);
        assert_eq!(counts.total_b, 1);
        assert_eq!(counts.in_b, 0);
        assert_eq!(counts.total_neither, 1);
        assert!(counts.conserved());
    }

    #[test]
    fn test_enumerate_counts_each_pair_once() {
        let sampled: BTreeSet<AlignedPair> = [
            pair("X", "Y", 0, 0),
            pair("X", "Y", 1, 1),
            pair("X", "Z", 0, 0),
        ]
        .into_iter()
        .collect();
        let positives: HashSet<AlignedPair> = [pair("X", "Y", 0, 0)].into_iter().collect();
        let intervals = IntervalSet::empty();
        let results =
            enumerate_homology_results(&sampled, &positives, &intervals, &mut [], true);

        let xy = &results[&("X".to_string(), "Y".to_string())];
        assert_eq!(xy.total, 2);
        assert_eq!(xy.in_all, 1);
        let xz = &results[&("X".to_string(), "Z".to_string())];
        assert_eq!(xz.total, 1);
        assert_eq!(xz.in_all, 0);
        assert!(xy.conserved() && xz.conserved());
    }

    #[test]
    fn test_roll_ups() {
        let sampled: BTreeSet<AlignedPair> = [
            pair("X", "X", 0, 5),
            pair("X", "Y", 0, 0),
            pair("Y", "Z", 1, 1),
        ]
        .into_iter()
        .collect();
        let positives: HashSet<AlignedPair> =
            [pair("X", "X", 0, 5), pair("X", "Y", 0, 0)].into_iter().collect();
        let intervals = IntervalSet::empty();
        let mut results =
            enumerate_homology_results(&sampled, &positives, &intervals, &mut [], true);
        let legit: HashSet<String> =
            ["X", "Y", "Z"].iter().map(|s| s.to_string()).collect();
        add_roll_ups(&mut results, &legit);

        let self_record = &results[&name_key("self", "self")];
        assert_eq!(self_record.total, 1);
        assert_eq!(self_record.in_all, 1);

        let x_agg = &results[&name_key("X", "aggregate")];
        assert_eq!(x_agg.total, 2);
        assert_eq!(x_agg.in_all, 2);
        let z_agg = &results[&name_key("Z", "aggregate")];
        assert_eq!(z_agg.total, 1);
        assert_eq!(z_agg.in_all, 0);
    }

    #[test]
    fn test_wiggle_updates() {
        let sampled: BTreeSet<AlignedPair> =
            [pair("ref", "other", 150, 3), pair("ref", "other", 250, 9)]
                .into_iter()
                .collect();
        let positives: HashSet<AlignedPair> =
            [pair("ref", "other", 150, 3)].into_iter().collect();
        let intervals = IntervalSet::empty();
        let mut wiggles = vec![WiggleContainer::new("ref".into(), "other".into(), 300, 100)];
        enumerate_homology_results(&sampled, &positives, &intervals, &mut wiggles, true);
        assert_eq!(wiggles[0].present_a_to_b, vec![0, 1, 0]);
        assert_eq!(wiggles[0].absent_a_to_b, vec![0, 0, 1]);
        assert_eq!(wiggles[0].present_b_to_a, vec![0, 0, 0]);
    }

    #[test]
    fn test_interval_partitioning() {
        use std::io::Write;
        let mut bed = tempfile::NamedTempFile::new().unwrap();
        writeln!(bed, "X\t0\t10").unwrap();
        bed.flush().unwrap();
        let intervals = IntervalSet::from_bed_files(&[bed.path()]).unwrap();

        let sampled: BTreeSet<AlignedPair> = [
            pair("X", "Y", 5, 5),  // X in interval, Y not
            pair("X", "Y", 50, 5), // neither
        ]
        .into_iter()
        .collect();
        let positives = HashSet::new();
        let results =
            enumerate_homology_results(&sampled, &positives, &intervals, &mut [], true);
        let xy = &results[&("X".to_string(), "Y".to_string())];
        assert_eq!(xy.total_a, 1);
        assert_eq!(xy.total_neither, 1);
        assert!(xy.conserved());
    }
}
