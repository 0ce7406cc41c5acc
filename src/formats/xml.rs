//! XML report writer
//!
//! Serialises comparison results into the `<alignmentComparisons>` document
//! consumed by downstream alignment-evaluation pipelines. Layout, tag names
//! and tab indentation follow the established report format; pair records
//! are enumerated in reverse key order.

use crate::core::results::{ResultCounts, ResultMap};
use crate::formats::wig::WiggleContainer;
use itertools::Itertools;
use std::io::{self, Write};

/// Attributes of the report root element
pub struct ReportAttributes<'a> {
    pub number_of_samples: u64,
    pub near: u64,
    pub seed: u64,
    pub maf1: &'a str,
    pub maf2: &'a str,
    pub number_of_pairs_in_maf1: u64,
    pub number_of_pairs_in_maf2: u64,
    pub bed_files: Option<&'a str>,
    pub wiggle_pairs: Option<&'a str>,
    pub wiggle_bin_length: u64,
}

/// Writer for the XML comparison report
pub struct XmlReportWriter<W: Write> {
    inner: W,
}

impl<W: Write> XmlReportWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    fn indent(&mut self, level: usize) -> io::Result<()> {
        for _ in 0..level {
            write!(self.inner, "\t")?;
        }
        Ok(())
    }

    pub fn write_document_header(&mut self) -> io::Result<()> {
        writeln!(
            self.inner,
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\" ?>"
        )
    }

    pub fn write_root_open(&mut self, attrs: &ReportAttributes) -> io::Result<()> {
        write!(
            self.inner,
            "<alignmentComparisons numberOfSamples=\"{}\" near=\"{}\" seed=\"{}\" \
             maf1=\"{}\" maf2=\"{}\" numberOfPairsInMaf1=\"{}\" numberOfPairsInMaf2=\"{}\"",
            attrs.number_of_samples,
            attrs.near,
            attrs.seed,
            attrs.maf1,
            attrs.maf2,
            attrs.number_of_pairs_in_maf1,
            attrs.number_of_pairs_in_maf2,
        )?;
        if let Some(bed) = attrs.bed_files {
            write!(self.inner, " bedFiles=\"{}\"", bed)?;
        }
        if let Some(wiggle) = attrs.wiggle_pairs {
            write!(
                self.inner,
                " wigglePairs=\"{}\" wiggleBinLength=\"{}\"",
                wiggle, attrs.wiggle_bin_length
            )?;
        }
        writeln!(
            self.inner,
            " version=\"{}\">",
            env!("CARGO_PKG_VERSION")
        )
    }

    pub fn write_root_close(&mut self) -> io::Result<()> {
        writeln!(self.inner, "</alignmentComparisons>")
    }

    /// One `<homologyTests>` section: the results of sampling from `file_a`
    /// and probing `file_b`
    ///
    /// `results` must already contain the roll-up records; `aggregate` is
    /// the sum over the base records only. The four partition tags are
    /// emitted only when bed files were supplied.
    pub fn write_homology_tests(
        &mut self,
        file_a: &str,
        file_b: &str,
        results: &ResultMap,
        aggregate: &ResultCounts,
        has_bed: bool,
    ) -> io::Result<()> {
        let mut level = 1;
        self.indent(level)?;
        writeln!(
            self.inner,
            "<homologyTests fileA=\"{}\" fileB=\"{}\">",
            file_a, file_b
        )?;
        level += 1;

        self.write_aggregate_results(level, aggregate, has_bed)?;

        self.indent(level)?;
        writeln!(self.inner, "<homologyPairTests>")?;
        level += 1;
        for ((seq1, seq2), counts) in results.iter().rev() {
            self.indent(level)?;
            writeln!(
                self.inner,
                "<homologyTest sequenceA=\"{}\" sequenceB=\"{}\">",
                seq1, seq2
            )?;
            level += 1;
            self.write_aggregate_results(level, counts, has_bed)?;
            self.indent(level)?;
            writeln!(self.inner, "<singleHomologyTests>")?;
            level += 1;
            self.indent(level)?;
            writeln!(
                self.inner,
                "<singleHomologyTest sequenceA=\"{}\" sequenceB=\"{}\">",
                seq1, seq2
            )?;
            level += 1;
            self.write_aggregate_results(level, counts, has_bed)?;
            level -= 1;
            self.indent(level)?;
            writeln!(self.inner, "</singleHomologyTest>")?;
            level -= 1;
            self.indent(level)?;
            writeln!(self.inner, "</singleHomologyTests>")?;
            level -= 1;
            self.indent(level)?;
            writeln!(self.inner, "</homologyTest>")?;
        }
        level -= 1;
        self.indent(level)?;
        writeln!(self.inner, "</homologyPairTests>")?;
        level -= 1;
        self.indent(level)?;
        writeln!(self.inner, "</homologyTests>")?;
        debug_assert_eq!(level, 1);
        Ok(())
    }

    fn write_aggregate_results(
        &mut self,
        level: usize,
        counts: &ResultCounts,
        has_bed: bool,
    ) -> io::Result<()> {
        self.indent(level)?;
        writeln!(self.inner, "<aggregateResults>")?;
        self.write_result(level + 1, "all", counts.total, counts.in_all)?;
        if has_bed {
            self.write_result(level + 1, "both", counts.total_both, counts.in_both)?;
            self.write_result(level + 1, "A", counts.total_a, counts.in_a)?;
            self.write_result(level + 1, "B", counts.total_b, counts.in_b)?;
            self.write_result(level + 1, "neither", counts.total_neither, counts.in_neither)?;
        }
        self.indent(level)?;
        writeln!(self.inner, "</aggregateResults>")
    }

    fn write_result(
        &mut self,
        level: usize,
        tag: &str,
        total: u64,
        total_true: u64,
    ) -> io::Result<()> {
        debug_assert!(total >= total_true);
        let average = if total == 0 {
            0.0
        } else {
            total_true as f64 / total as f64
        };
        self.indent(level)?;
        writeln!(
            self.inner,
            "<{} totalTests=\"{}\" totalTrue=\"{}\" totalFalse=\"{}\" average=\"{:.6}\"/>",
            tag,
            total,
            total_true,
            total - total_true,
            average
        )
    }

    /// Wiggle sections, one `<wigglePair>` per container
    pub fn write_wiggles(&mut self, wiggles: &[WiggleContainer]) -> io::Result<()> {
        for wc in wiggles {
            self.indent(1)?;
            writeln!(
                self.inner,
                "<wigglePair reference=\"{}\" partner=\"{}\" referenceLength=\"{}\" \
                 binLength=\"{}\" numBins=\"{}\">",
                wc.reference,
                wc.partner,
                wc.ref_length,
                wc.bin_length,
                wc.num_bins()
            )?;
            self.write_wiggle_array("presentAtoB", &wc.present_a_to_b)?;
            self.write_wiggle_array("presentBtoA", &wc.present_b_to_a)?;
            self.write_wiggle_array("absentAtoB", &wc.absent_a_to_b)?;
            self.write_wiggle_array("absentBtoA", &wc.absent_b_to_a)?;
            self.indent(1)?;
            writeln!(self.inner, "</wigglePair>")?;
        }
        Ok(())
    }

    fn write_wiggle_array(&mut self, tag: &str, values: &[u64]) -> io::Result<()> {
        self.indent(2)?;
        writeln!(self.inner, "<{}>{}</{}>", tag, values.iter().join(","), tag)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
