//! Property-based tests for DNA utilities

use maf_compare::core::dna::{complement_base, is_alignment_char, revcomp, revcomp_inplace};
use proptest::prelude::*;

/// Generate a random aligned sequence over IUPAC codes plus gaps
fn alignment_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            'A', 'C', 'G', 'T', 'a', 'c', 'g', 't', 'R', 'Y', 'S', 'W', 'K', 'M', 'B', 'V',
            'D', 'H', 'N', 'n', 'X', '-',
        ]),
        0..100,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    /// revcomp(revcomp(s)) == s for IUPAC + gap strings
    #[test]
    fn prop_revcomp_involution(seq in alignment_strategy()) {
        prop_assert_eq!(revcomp(&revcomp(&seq)), seq);
    }

    /// Complementing twice is the identity on every alignment character
    #[test]
    fn prop_complement_involution(base in prop::sample::select(
        "ACGTacgtRYSWKMBVDHNnXx-".as_bytes().to_vec()
    )) {
        prop_assert_eq!(complement_base(complement_base(base)), base);
    }

    /// Length and gap positions are preserved (mirrored) by revcomp
    #[test]
    fn prop_revcomp_preserves_length_and_gaps(seq in alignment_strategy()) {
        let rc = revcomp(&seq);
        prop_assert_eq!(rc.len(), seq.len());
        let gaps: Vec<usize> = seq
            .bytes()
            .enumerate()
            .filter(|(_, b)| *b == b'-')
            .map(|(i, _)| i)
            .collect();
        for i in gaps {
            prop_assert_eq!(rc.as_bytes()[seq.len() - 1 - i], b'-');
        }
    }

    /// In-place and functional revcomp agree
    #[test]
    fn prop_revcomp_inplace_equivalent(seq in alignment_strategy()) {
        let functional = revcomp(&seq);
        let mut bytes = seq.into_bytes();
        revcomp_inplace(&mut bytes);
        prop_assert_eq!(functional.into_bytes(), bytes);
    }

    /// revcomp maps the alignment alphabet onto itself
    #[test]
    fn prop_revcomp_closed_over_alphabet(seq in alignment_strategy()) {
        prop_assert!(revcomp(&seq).bytes().all(is_alignment_char));
    }
}

#[cfg(test)]
mod edge_cases {
    use super::*;

    #[test]
    fn test_known_complements() {
        assert_eq!(revcomp("ACGT"), "ACGT"); // palindrome
        assert_eq!(revcomp("MRYK"), "MRYK"); // IUPAC palindrome
        assert_eq!(revcomp("AAA--T"), "A--TTT");
    }

    #[test]
    fn test_x_and_n_pass_through() {
        assert_eq!(revcomp("NXN"), "NXN");
        assert_eq!(complement_base(b'X'), b'X');
    }
}
