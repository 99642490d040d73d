//! Sequenced reads and paired FASTQ input
//!
//! A read keeps its original sequence and quality buffers untouched and
//! trims by shrinking an explicit length field.

use crate::error::{NextClipError, Result};
use needletail::{FastxReader, parse_fastx_file};
use std::path::{Path, PathBuf};
use tracing::info;

/// One FASTQ record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencedRead {
    id: Vec<u8>,
    bases: Vec<u8>,
    qualities: Vec<u8>,
    len: usize,
    trimmed: bool,
}

impl SequencedRead {
    /// Create a read, rejecting records whose quality string length differs
    /// from the sequence length.
    pub fn new(id: impl Into<Vec<u8>>, bases: impl Into<Vec<u8>>, qualities: impl Into<Vec<u8>>) -> Result<Self> {
        let (id, bases, qualities) = (id.into(), bases.into(), qualities.into());
        if bases.len() != qualities.len() {
            return Err(NextClipError::QualityLength {
                id: String::from_utf8_lossy(&id).into_owned(),
                bases: bases.len(),
                qualities: qualities.len(),
            });
        }
        let len = bases.len();
        Ok(Self {
            id,
            bases,
            qualities,
            len,
            trimmed: false,
        })
    }

    /// Full header line without the leading `@`
    pub fn id(&self) -> &[u8] {
        &self.id
    }

    /// Bases up to the current length
    pub fn bases(&self) -> &[u8] {
        &self.bases[..self.len]
    }

    /// Qualities up to the current length
    pub fn qualities(&self) -> &[u8] {
        &self.qualities[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Length as read from the input, before any trimming
    pub fn original_len(&self) -> usize {
        self.bases.len()
    }

    /// Whether the read has already been trimmed
    pub fn is_trimmed(&self) -> bool {
        self.trimmed
    }

    /// Cut the read (and its qualities) down to `len` bases.
    ///
    /// A read is trimmed at most once per pair.
    pub fn truncate(&mut self, len: usize) {
        debug_assert!(!self.trimmed, "read trimmed twice");
        self.len = self.len.min(len);
        self.trimmed = true;
    }

    /// Remove `amount` bases from the end, stopping at an empty read
    pub fn trim_tail(&mut self, amount: usize) {
        self.truncate(self.len.saturating_sub(amount));
    }
}

/// Check that two mate identifiers agree up to the first whitespace or
/// control character of the first mate.
pub fn mates_agree(first: &[u8], second: &[u8]) -> bool {
    for (&a, &b) in first.iter().zip(second) {
        if a != b {
            return false;
        }
        if a <= b' ' {
            break;
        }
    }
    true
}

/// Reads two FASTQ files (plain or compressed) record by record in lock-step
pub struct PairedReader {
    readers: [Box<dyn FastxReader>; 2],
    paths: [PathBuf; 2],
}

impl PairedReader {
    pub fn open<P: AsRef<Path>>(first: P, second: P) -> Result<Self> {
        let paths = [first.as_ref().to_path_buf(), second.as_ref().to_path_buf()];
        info!(file = %paths[0].display(), "Opening input file");
        let one = parse_fastx_file(&paths[0])?;
        info!(file = %paths[1].display(), "Opening input file");
        let two = parse_fastx_file(&paths[1])?;
        Ok(Self {
            readers: [one, two],
            paths,
        })
    }

    fn next_read(&mut self, mate: usize) -> Option<Result<SequencedRead>> {
        let record = match self.readers[mate].next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e.into())),
        };
        let qualities = record.qual().unwrap_or_default().to_vec();
        Some(SequencedRead::new(record.id(), record.seq().into_owned(), qualities))
    }

    /// Next pair of mates, `None` once both files are exhausted.
    pub fn next_pair(&mut self) -> Option<Result<[SequencedRead; 2]>> {
        let one = self.next_read(0);
        let two = self.next_read(1);
        match (one, two) {
            (None, None) => None,
            (Some(Err(e)), _) | (_, Some(Err(e))) => Some(Err(e)),
            (Some(Ok(_)), None) => Some(Err(NextClipError::UnpairedRead {
                file: self.paths[0].display().to_string(),
            })),
            (None, Some(Ok(_))) => Some(Err(NextClipError::UnpairedRead {
                file: self.paths[1].display().to_string(),
            })),
            (Some(Ok(one)), Some(Ok(two))) => {
                if mates_agree(one.id(), two.id()) {
                    Some(Ok([one, two]))
                } else {
                    Some(Err(NextClipError::mate_id_mismatch(one.id(), two.id())))
                }
            }
        }
    }
}

impl Iterator for PairedReader {
    type Item = Result<[SequencedRead; 2]>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_pair()
    }
}
