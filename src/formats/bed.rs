//! BED format adapter
//!
//! Parses three-column `name start end` interval files (zero-based,
//! half-open) into per-sequence interval indexes used to mask homology
//! results. Overlapping intervals for the same sequence are a fatal input
//! error.

use crate::core::error::{MafCompareError, Result};
use crate::core::io::open_reader;
use memchr::memchr;
use rust_lapper::{Interval, Lapper};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

type Iv = Interval<u64, u32>;

/// Per-sequence sets of non-overlapping `[start, end)` intervals
#[derive(Default, Debug)]
pub struct IntervalSet {
    lappers: HashMap<String, Lapper<u64, u32>>,
    is_empty: bool,
}

impl IntervalSet {
    /// An interval set containing nothing; `contains` is always false
    pub fn empty() -> Self {
        Self {
            lappers: HashMap::new(),
            is_empty: true,
        }
    }

    /// Whether any bed file contributed intervals
    pub fn has_intervals(&self) -> bool {
        !self.is_empty && !self.lappers.is_empty()
    }

    /// Load one or more bed files (comma-separated paths accepted by the CLI
    /// arrive here as a slice)
    pub fn from_bed_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut raw: HashMap<String, Vec<(u64, u64)>> = HashMap::new();
        for path in paths {
            parse_bed_into(path.as_ref(), &mut raw)?;
        }

        let mut lappers = HashMap::new();
        for (name, mut intervals) in raw {
            intervals.sort_unstable();
            // adjacent intervals may touch, they may not overlap
            for pair in intervals.windows(2) {
                let (s1, e1) = pair[0];
                let (s2, e2) = pair[1];
                if s2 < e1 {
                    return Err(MafCompareError::OverlappingInterval {
                        name,
                        start1: s1,
                        end1: e1,
                        start2: s2,
                        end2: e2,
                    });
                }
            }
            let ivs: Vec<Iv> = intervals
                .into_iter()
                .map(|(start, stop)| Iv { start, stop, val: 0 })
                .collect();
            lappers.insert(name, Lapper::new(ivs));
        }
        Ok(Self {
            lappers,
            is_empty: false,
        })
    }

    /// Whether `pos` of sequence `name` falls inside any interval
    pub fn contains(&self, name: &str, pos: u64) -> bool {
        match self.lappers.get(name) {
            Some(lapper) => lapper.find(pos, pos + 1).next().is_some(),
            None => false,
        }
    }
}

fn parse_bed_into(path: &Path, raw: &mut HashMap<String, Vec<(u64, u64)>>) -> Result<()> {
    let reader = open_reader(path)?;
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = idx + 1;
        let trimmed = line.trim_end();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("track") {
            continue;
        }
        let (name, start, end) = parse_bed_line(trimmed.as_bytes(), line_number)?;
        if end <= start {
            return Err(MafCompareError::InvalidBed {
                line: line_number,
                message: format!("end {} must be greater than start {}", end, start),
            });
        }
        raw.entry(name).or_default().push((start, end));
    }
    Ok(())
}

/// Parse the first three fields of a bed line; extra columns are ignored
fn parse_bed_line(line: &[u8], line_number: usize) -> Result<(String, u64, u64)> {
    // bed is tab-delimited in the wild but whitespace-delimited files exist;
    // fall back to whitespace splitting when no tab is present
    let fields: Vec<&str> = if memchr(b'\t', line).is_some() {
        std::str::from_utf8(line)
            .map_err(|_| MafCompareError::InvalidBed {
                line: line_number,
                message: "line is not valid UTF-8".to_string(),
            })?
            .split('\t')
            .collect()
    } else {
        std::str::from_utf8(line)
            .map_err(|_| MafCompareError::InvalidBed {
                line: line_number,
                message: "line is not valid UTF-8".to_string(),
            })?
            .split_whitespace()
            .collect()
    };

    if fields.len() < 3 {
        return Err(MafCompareError::InvalidBed {
            line: line_number,
            message: format!("expected at least 3 fields, found {}", fields.len()),
        });
    }
    let start: u64 = fields[1].parse().map_err(|_| MafCompareError::InvalidBed {
        line: line_number,
        message: format!("invalid start '{}'", fields[1]),
    })?;
    let end: u64 = fields[2].parse().map_err(|_| MafCompareError::InvalidBed {
        line: line_number,
        message: format!("invalid end '{}'", fields[2]),
    })?;
    Ok((fields[0].to_string(), start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn bed_file(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn test_contains() {
        let f = bed_file("seq1\t10\t20\nseq1\t30\t40\nseq2\t0\t5\n");
        let set = IntervalSet::from_bed_files(&[f.path()]).unwrap();
        assert!(set.contains("seq1", 10));
        assert!(set.contains("seq1", 19));
        assert!(!set.contains("seq1", 20)); // half-open
        assert!(!set.contains("seq1", 25));
        assert!(set.contains("seq2", 0));
        assert!(!set.contains("seq3", 0));
    }

    #[test]
    fn test_touching_intervals_allowed() {
        let f = bed_file("seq1\t10\t20\nseq1\t20\t30\n");
        let set = IntervalSet::from_bed_files(&[f.path()]).unwrap();
        assert!(set.contains("seq1", 29));
    }

    #[test]
    fn test_overlap_is_fatal() {
        let f = bed_file("seq1\t10\t20\nseq1\t15\t30\n");
        let err = IntervalSet::from_bed_files(&[f.path()]).unwrap_err();
        assert!(matches!(err, MafCompareError::OverlappingInterval { .. }));
    }

    #[test]
    fn test_overlap_across_files() {
        let f1 = bed_file("seq1\t10\t20\n");
        let f2 = bed_file("seq1\t5\t12\n");
        let err = IntervalSet::from_bed_files(&[f1.path(), f2.path()]).unwrap_err();
        assert!(matches!(err, MafCompareError::OverlappingInterval { .. }));
    }

    #[test]
    fn test_space_delimited_fallback() {
        let f = bed_file("seq1 10 20\n");
        let set = IntervalSet::from_bed_files(&[f.path()]).unwrap();
        assert!(set.contains("seq1", 15));
    }

    #[test]
    fn test_comments_skipped() {
        let f = bed_file("# comment\ntrack name=test\nseq1\t0\t5\n");
        let set = IntervalSet::from_bed_files(&[f.path()]).unwrap();
        assert!(set.contains("seq1", 3));
    }

    #[test]
    fn test_bad_coordinates() {
        let f = bed_file("seq1\t20\t10\n");
        assert!(IntervalSet::from_bed_files(&[f.path()]).is_err());
    }

    #[test]
    fn test_empty_set() {
        let set = IntervalSet::empty();
        assert!(!set.has_intervals());
        assert!(!set.contains("anything", 0));
    }
}
