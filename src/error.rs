//! Error handling for NextClip
//!
//! Every variant here is fatal for a run. Conditions that only affect
//! accounting (ambiguous bases, pairs too short after trimming, a diagnostic
//! log that cannot be opened) are counted or logged instead.

use thiserror::Error;

/// Error type for all NextClip operations
#[derive(Error, Debug)]
pub enum NextClipError {
    /// I/O errors (opening inputs, writing outputs)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// FASTQ parsing error reported by needletail
    #[error("FASTQ parsing error: {0}")]
    Fastq(#[from] needletail::errors::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Parse error for numeric or other structured values
    #[error("Parse error: {0}")]
    Parse(String),

    /// Adaptor containing something other than A, C, G or T
    #[error("Bad nucleotide '{base}' in adaptor {adaptor}")]
    InvalidBase { base: char, adaptor: String },

    /// Sequence and quality strings of a record disagree in length
    #[error("Read {id}: sequence length {bases} does not match quality length {qualities}")]
    QualityLength {
        id: String,
        bases: usize,
        qualities: usize,
    },

    /// Mate identifiers do not agree
    #[error("Headers don't match up: {first} and {second}")]
    MateIdMismatch { first: String, second: String },

    /// One input file ran out of records before the other
    #[error("Only managed to get one read, {file} has no mate for it")]
    UnpairedRead { file: String },

    /// Statistics requested before any pair was processed
    #[error("Number of read pairs < 1")]
    NoReadPairs,

    /// Fingerprint table has no free slot left
    #[error("Fingerprint table is full ({capacity} slots), raise the expected number of reads")]
    TableFull { capacity: usize },

    /// Fingerprint table slot array could not be allocated
    #[error("Cannot allocate a fingerprint table of {capacity} slots, lower the expected number of reads")]
    TableAllocation { capacity: usize },
}

impl NextClipError {
    /// Create a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a Parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Create a MateIdMismatch error from raw identifiers
    pub fn mate_id_mismatch(first: &[u8], second: &[u8]) -> Self {
        Self::MateIdMismatch {
            first: String::from_utf8_lossy(first).into_owned(),
            second: String::from_utf8_lossy(second).into_owned(),
        }
    }
}

/// Result type alias for NextClip operations
pub type Result<T> = std::result::Result<T, NextClipError>;
