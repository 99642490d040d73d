//! NextClip: junction clipping, categorisation and PCR-duplicate marking for
//! Nextera long mate pair libraries.

pub mod alignment;
pub mod category;
pub mod config;
pub mod duplicate;
pub mod error;
pub mod kmer;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod read;
pub mod stats;
pub mod table;

use crate::error::{NextClipError, Result};

/// Complement of an upper-case nucleotide, `None` for anything else
pub fn complement(base: u8) -> Option<u8> {
    match base {
        b'A' => Some(b'T'),
        b'C' => Some(b'G'),
        b'G' => Some(b'C'),
        b'T' => Some(b'A'),
        _ => None,
    }
}

/// Reverse complement of an A/C/G/T sequence
pub fn reverse_complement(sequence: &[u8]) -> Result<Vec<u8>> {
    sequence
        .iter()
        .rev()
        .map(|&b| {
            complement(b).ok_or_else(|| NextClipError::InvalidBase {
                base: b as char,
                adaptor: String::from_utf8_lossy(sequence).into_owned(),
            })
        })
        .collect()
}

/// Two-bit code used for packed k-mers (A=0, C=1, G=2, T=3)
#[inline]
pub fn nucleotide_code(base: u8) -> Option<u8> {
    match base {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' => Some(3),
        _ => None,
    }
}

/// Convert a two-bit code back to its nucleotide
#[inline]
pub fn code_to_nucleotide(code: u8) -> u8 {
    match code & 0b11 {
        0 => b'A',
        1 => b'C',
        2 => b'G',
        _ => b'T',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(b"CTGTCTCTTATACACATCT").unwrap(), b"AGATGTGTATAAGAGACAG");
        assert_eq!(reverse_complement(b"AAAA").unwrap(), b"TTTT");
        assert!(matches!(
            reverse_complement(b"ACNT"),
            Err(NextClipError::InvalidBase { base: 'N', .. })
        ));
    }

    #[test]
    fn test_nucleotide_codes() {
        for &base in b"ACGT" {
            assert_eq!(code_to_nucleotide(nucleotide_code(base).unwrap()), base);
        }
        assert_eq!(nucleotide_code(b'N'), None);
        assert_eq!(nucleotide_code(b'a'), None);
    }
}
