//! File format adapters
//!
//! Adapters for the formats the toolkit reads and writes: alignment MAF,
//! BED interval masks, wiggle bin containers, and the XML report.

pub mod bed;
pub mod maf;
pub mod wig;
pub mod xml;

pub use bed::IntervalSet;
pub use maf::{MafBlock, MafItem, MafReader, MafRow, MafWriter, Strand};
pub use wig::{build_wiggle_containers, pattern_matches, WiggleContainer};
pub use xml::{ReportAttributes, XmlReportWriter};
