//! Wiggle bin containers
//!
//! Optional per-position roll-up of homology results along a reference
//! sequence: fixed-length bins counting present/absent pairs in each
//! comparison direction. Rendered into the XML report as count arrays.

use std::collections::HashMap;

/// Match a sequence name against a wiggle pattern
///
/// A trailing `*` makes the pattern a prefix match; otherwise the match is
/// exact.
pub fn pattern_matches(pattern: &str, name: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => pattern == name,
    }
}

/// Binned counts for one (reference sequence, partner pattern) pair
#[derive(Debug, Clone)]
pub struct WiggleContainer {
    /// Concrete reference sequence name
    pub reference: String,
    /// Partner pattern (exact name or trailing-`*` prefix)
    pub partner: String,
    pub ref_length: u64,
    pub bin_length: u64,
    pub present_a_to_b: Vec<u64>,
    pub present_b_to_a: Vec<u64>,
    pub absent_a_to_b: Vec<u64>,
    pub absent_b_to_a: Vec<u64>,
}

impl WiggleContainer {
    pub fn new(reference: String, partner: String, ref_length: u64, bin_length: u64) -> Self {
        let num_bins = ref_length.div_ceil(bin_length).max(1) as usize;
        Self {
            reference,
            partner,
            ref_length,
            bin_length,
            present_a_to_b: vec![0; num_bins],
            present_b_to_a: vec![0; num_bins],
            absent_a_to_b: vec![0; num_bins],
            absent_b_to_a: vec![0; num_bins],
        }
    }

    pub fn num_bins(&self) -> usize {
        self.present_a_to_b.len()
    }

    /// Record one tested pair at the reference's positive-coord position
    pub fn record(&mut self, ref_pos: u64, present: bool, a_to_b: bool) {
        let bin = ((ref_pos / self.bin_length) as usize).min(self.num_bins() - 1);
        match (present, a_to_b) {
            (true, true) => self.present_a_to_b[bin] += 1,
            (true, false) => self.present_b_to_a[bin] += 1,
            (false, true) => self.absent_a_to_b[bin] += 1,
            (false, false) => self.absent_b_to_a[bin] += 1,
        }
    }
}

/// Build one container per (reference pattern, partner pattern) pair and
/// per known sequence matching the reference pattern
///
/// Containers come out in pattern order, then sorted by reference name, so
/// the report layout is deterministic.
pub fn build_wiggle_containers(
    pattern_pairs: &[(String, String)],
    sequence_lengths: &HashMap<String, u64>,
    bin_length: u64,
) -> Vec<WiggleContainer> {
    let mut sorted_names: Vec<&String> = sequence_lengths.keys().collect();
    sorted_names.sort();

    let mut containers = Vec::new();
    for (ref_pattern, partner_pattern) in pattern_pairs {
        for name in &sorted_names {
            if pattern_matches(ref_pattern, name) {
                containers.push(WiggleContainer::new(
                    (*name).clone(),
                    partner_pattern.clone(),
                    sequence_lengths[*name],
                    bin_length,
                ));
            }
        }
    }
    containers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_matches() {
        assert!(pattern_matches("hg18.chr7", "hg18.chr7"));
        assert!(!pattern_matches("hg18.chr7", "hg18.chr1"));
        assert!(pattern_matches("hg18*", "hg18.chr1"));
        assert!(pattern_matches("*", "anything"));
        assert!(!pattern_matches("mm9*", "hg18.chr1"));
    }

    #[test]
    fn test_bin_count() {
        let wc = WiggleContainer::new("r".into(), "p".into(), 1000, 100);
        assert_eq!(wc.num_bins(), 10);
        let wc = WiggleContainer::new("r".into(), "p".into(), 1001, 100);
        assert_eq!(wc.num_bins(), 11);
        let wc = WiggleContainer::new("r".into(), "p".into(), 50, 100);
        assert_eq!(wc.num_bins(), 1);
    }

    #[test]
    fn test_record_bins() {
        let mut wc = WiggleContainer::new("r".into(), "p".into(), 300, 100);
        wc.record(0, true, true);
        wc.record(99, true, true);
        wc.record(100, false, true);
        wc.record(299, true, false);
        assert_eq!(wc.present_a_to_b, vec![2, 0, 0]);
        assert_eq!(wc.absent_a_to_b, vec![0, 1, 0]);
        assert_eq!(wc.present_b_to_a, vec![0, 0, 1]);
    }

    #[test]
    fn test_build_containers() {
        let mut lengths = HashMap::new();
        lengths.insert("hg18.chr1".to_string(), 250);
        lengths.insert("hg18.chr2".to_string(), 150);
        lengths.insert("mm9.chr1".to_string(), 100);
        let pairs = vec![("hg18*".to_string(), "mm9*".to_string())];
        let containers = build_wiggle_containers(&pairs, &lengths, 100);
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].reference, "hg18.chr1");
        assert_eq!(containers[0].num_bins(), 3);
        assert_eq!(containers[1].reference, "hg18.chr2");
    }
}
