//! Core engines
//!
//! This module contains the pair counting and sampling engines, the
//! homology tester and result aggregator, the union-find and pinch graph,
//! the transitive-closure driver, and the LCA / trio decoder.

pub mod closure;
pub mod compare;
pub mod disjoint_set;
pub mod dna;
pub mod error;
pub mod homology;
pub mod io;
pub mod pairs;
pub mod pinch;
pub mod results;
pub mod sample;
pub mod tree;

pub use closure::{transitive_closure, ClosureBuilder, Reservoir, PINCH_JOIN_THRESHOLD};
pub use compare::{compare_mafs, write_report, CompareOptions, ComparisonReport};
pub use disjoint_set::DisjointSet;
pub use error::{MafCompareError, MafParseError, MafResult, Result};
pub use homology::perform_homology_tests;
pub use io::{
    detect_compression, open_reader, CompressionFormat, LineIterator, MappedReader,
    DEFAULT_BUFFER_SIZE, LARGE_BUFFER_SIZE, MMAP_THRESHOLD,
};
pub use pairs::{choose_two, count_pairs_in_maf, walk_block_counting_pairs, ChooseTwoTable};
pub use pinch::{PinchThreadSet, SegmentView, ThreadId};
pub use results::{enumerate_homology_results, ResultCounts, ResultMap};
pub use sample::{sample_pairs_from_maf, AlignedPair, PairSampler};
pub use tree::{tree_from_maf, TrioDecoder, TrioTopology};
