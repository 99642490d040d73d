//! Packed k-mer fingerprints of read pairs
//!
//! A fingerprint samples four windows of `k` bases: mate 1 at offset 0 and at
//! half its length, then mate 2 at the same offsets. The windows are
//! concatenated in that order and packed two bits per base into 128 bits.
//! Two pairs that agree on all four windows share a fingerprint even if the
//! rest of their sequence differs.

use crate::config::MAX_FINGERPRINT_KMER;
use crate::error::{NextClipError, Result};
use crate::{code_to_nucleotide, nucleotide_code};

/// Number of windows sampled per pair
pub const WINDOWS_PER_PAIR: usize = 4;

/// Composite k-mer key of a read pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Fingerprint {
    /// Packed bases, high word first
    words: [u64; 2],
}

impl Fingerprint {
    /// Pack an A/C/G/T sequence of at most 64 bases.
    ///
    /// Returns `None` on any other symbol or when the sequence is too long.
    pub fn from_sequence(sequence: &[u8]) -> Option<Self> {
        if sequence.len() > WINDOWS_PER_PAIR * MAX_FINGERPRINT_KMER {
            return None;
        }
        let mut packed = 0u128;
        for &base in sequence {
            packed = (packed << 2) | u128::from(nucleotide_code(base)?);
        }
        Some(Self::from_u128(packed))
    }

    fn from_u128(packed: u128) -> Self {
        Self {
            words: [(packed >> 64) as u64, packed as u64],
        }
    }

    pub fn as_u128(&self) -> u128 {
        (u128::from(self.words[0]) << 64) | u128::from(self.words[1])
    }

    /// Unpack back to `length` bases
    pub fn to_sequence(&self, length: usize) -> Vec<u8> {
        let packed = self.as_u128();
        (0..length)
            .rev()
            .map(|i| code_to_nucleotide((packed >> (2 * i)) as u8))
            .collect()
    }
}

/// Builds fingerprints for read pairs with a fixed window length
#[derive(Debug, Clone, Copy)]
pub struct FingerprintSampler {
    k: usize,
}

impl FingerprintSampler {
    /// Fails unless `1 <= k <= MAX_FINGERPRINT_KMER`
    pub fn new(k: usize) -> Result<Self> {
        if k == 0 || k > MAX_FINGERPRINT_KMER {
            return Err(NextClipError::config(format!(
                "fingerprint k-mer size {} is invalid (must be between 1 and {})",
                k, MAX_FINGERPRINT_KMER
            )));
        }
        Ok(Self { k })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Total bases in a fingerprint
    pub fn total_length(&self) -> usize {
        WINDOWS_PER_PAIR * self.k
    }

    /// Whether a mate is long enough to hold both of its windows
    pub fn fits(&self, mate: &[u8]) -> bool {
        mate.len() / 2 + self.k <= mate.len()
    }

    fn windows<'a>(&self, mate: &'a [u8]) -> [&'a [u8]; 2] {
        let middle = mate.len() / 2;
        [&mate[..self.k], &mate[middle..middle + self.k]]
    }

    /// The concatenated windows, or `None` when a mate is too short
    pub fn sample(&self, mate1: &[u8], mate2: &[u8]) -> Option<Vec<u8>> {
        if !self.fits(mate1) || !self.fits(mate2) {
            return None;
        }
        let mut sampled = Vec::with_capacity(self.total_length());
        for window in self.windows(mate1).into_iter().chain(self.windows(mate2)) {
            sampled.extend_from_slice(window);
        }
        Some(sampled)
    }

    /// Fingerprint of a pair, `None` when a mate is too short or a sampled
    /// window holds a base other than A, C, G or T.
    pub fn fingerprint(&self, mate1: &[u8], mate2: &[u8]) -> Option<Fingerprint> {
        Fingerprint::from_sequence(&self.sample(mate1, mate2)?)
    }
}
