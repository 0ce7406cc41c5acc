//! Error types for maf-compare
//!
//! Defines all error types used throughout the library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for maf-compare operations
#[derive(Debug, Error)]
pub enum MafCompareError {
    /// MAF parsing errors
    #[error("Malformed MAF: {0}")]
    MalformedMaf(#[from] MafParseError),

    /// The same (sequence, offset) observed twice with different characters
    #[error(
        "Inconsistent sequence: {name} position {position} is '{observed}' \
         but was previously observed as '{existing}' (line {line})"
    )]
    InconsistentSequence {
        name: String,
        position: u64,
        observed: char,
        existing: char,
        line: usize,
    },

    /// Bed file contains overlapping intervals for the same sequence
    #[error(
        "Overlapping intervals for sequence {name}: [{start1}, {end1}) and [{start2}, {end2})"
    )]
    OverlappingInterval {
        name: String,
        start1: u64,
        end1: u64,
        start2: u64,
        end2: u64,
    },

    /// Bed parsing errors
    #[error("Invalid BED line {line}: {message}")]
    InvalidBed { line: usize, message: String },

    /// Newick tree cannot be parsed or has a degenerate shape
    #[error("Invalid tree: {0}")]
    InvalidTree(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during MAF parsing
#[derive(Debug, Error)]
pub enum MafParseError {
    /// Unrecognised line type inside or outside a block
    #[error("Unexpected line {line}: {content}")]
    UnexpectedLine { line: usize, content: String },

    /// An s line with the wrong number of fields
    #[error("s line at line {line} has {found} fields, expected 7")]
    WrongFieldCount { line: usize, found: usize },

    /// Failed to parse an integer field
    #[error("Invalid {field} value '{value}' at line {line}")]
    InvalidNumber {
        line: usize,
        field: &'static str,
        value: String,
    },

    /// Strand other than '+' or '-'
    #[error("Invalid strand '{strand}' at line {line}, expected '+' or '-'")]
    InvalidStrand { line: usize, strand: String },

    /// Row fails an internal consistency check
    #[error("Invalid row for {name} at line {line}: {message}")]
    InvalidRow {
        line: usize,
        name: String,
        message: String,
    },

    /// Rows of one block disagree on column count
    #[error("Ragged block at line {line}: row has {found} columns, block has {expected}")]
    RaggedBlock {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// File not found
    #[error("MAF file not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error during parsing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MafParseError {
    /// Create an unexpected-line error, truncating long content
    pub fn unexpected(line: usize, content: &str) -> Self {
        MafParseError::UnexpectedLine {
            line,
            content: content.chars().take(100).collect(),
        }
    }

    pub fn invalid_number(line: usize, field: &'static str, value: &str) -> Self {
        MafParseError::InvalidNumber {
            line,
            field,
            value: value.to_string(),
        }
    }
}

/// Result type alias for maf-compare operations
pub type Result<T> = std::result::Result<T, MafCompareError>;

/// Result type alias for MAF parsing operations
pub type MafResult<T> = std::result::Result<T, MafParseError>;
