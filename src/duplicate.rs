//! PCR duplicate detection and base composition
//!
//! Every pair passes through `DuplicateDetector::check` before alignment.
//! Pairs with a base other than A, C, G or T are counted and skipped; all
//! other pairs contribute to the GC statistics and are fingerprinted.

use crate::error::Result;
use crate::kmer::{Fingerprint, FingerprintSampler};
use crate::table::FingerprintTable;
use tracing::trace;

/// Number of GC-percentage buckets (0 to 100 inclusive)
pub const GC_BUCKETS: usize = 101;

/// How the duplicate check classified a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateStatus {
    /// First time this fingerprint was seen
    Unique,
    /// Fingerprint seen before; `count` includes this pair
    Duplicate { fingerprint: Fingerprint, count: u32 },
    /// A mate holds a non-ACGT base
    Ambiguous,
    /// A mate is too short for both fingerprint windows
    TooShort,
}

impl DuplicateStatus {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, DuplicateStatus::Duplicate { .. })
    }
}

/// Base composition and duplicate counters gathered over a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionStats {
    pub gc_bases: u64,
    pub at_bases: u64,
    /// Per mate, number of reads at each whole GC percentage
    pub gc_content: [[u64; GC_BUCKETS]; 2],
    pub pairs_containing_n: u64,
    /// Pairs that could not be fingerprinted (ambiguous or too short)
    pub invalid_for_duplicate: u64,
    /// Occurrences beyond the first of any fingerprint
    pub duplicates: u64,
}

impl Default for CompositionStats {
    fn default() -> Self {
        Self {
            gc_bases: 0,
            at_bases: 0,
            gc_content: [[0; GC_BUCKETS]; 2],
            pairs_containing_n: 0,
            invalid_for_duplicate: 0,
            duplicates: 0,
        }
    }
}

impl CompositionStats {
    /// Overall GC percentage of counted bases, 0 when nothing was counted
    pub fn gc_percent(&self) -> f64 {
        let total = self.gc_bases + self.at_bases;
        if total == 0 {
            0.0
        } else {
            100.0 * self.gc_bases as f64 / total as f64
        }
    }
}

/// Number of G and C bases, or `None` if any base is not A, C, G or T
fn count_gc(bases: &[u8]) -> Option<usize> {
    bases.iter().try_fold(0usize, |gc, &b| match b {
        b'G' | b'C' => Some(gc + 1),
        b'A' | b'T' => Some(gc),
        _ => None,
    })
}

pub struct DuplicateDetector {
    sampler: FingerprintSampler,
    table: FingerprintTable,
    stats: CompositionStats,
}

impl DuplicateDetector {
    /// Fails on an invalid window length or when the table cannot be allocated
    pub fn new(kmer_size: usize, expected_pairs: usize) -> Result<Self> {
        Ok(Self {
            sampler: FingerprintSampler::new(kmer_size)?,
            table: FingerprintTable::with_expected(expected_pairs)?,
            stats: CompositionStats::default(),
        })
    }

    pub fn sampler(&self) -> &FingerprintSampler {
        &self.sampler
    }

    pub fn table(&self) -> &FingerprintTable {
        &self.table
    }

    pub fn stats(&self) -> &CompositionStats {
        &self.stats
    }

    fn record_composition(&mut self, mates: [&[u8]; 2], gc: [usize; 2]) {
        for (mate, (bases, gc)) in mates.iter().zip(gc).enumerate() {
            self.stats.gc_bases += gc as u64;
            self.stats.at_bases += (bases.len() - gc) as u64;
            if !bases.is_empty() {
                self.stats.gc_content[mate][gc * 100 / bases.len()] += 1;
            }
        }
    }

    /// Classify a pair against every pair checked so far.
    ///
    /// Fails only when the fingerprint table has no room for a new entry.
    pub fn check(&mut self, mate1: &[u8], mate2: &[u8]) -> Result<DuplicateStatus> {
        let (Some(gc1), Some(gc2)) = (count_gc(mate1), count_gc(mate2)) else {
            self.stats.pairs_containing_n += 1;
            self.stats.invalid_for_duplicate += 1;
            return Ok(DuplicateStatus::Ambiguous);
        };
        self.record_composition([mate1, mate2], [gc1, gc2]);

        let Some(fingerprint) = self.sampler.fingerprint(mate1, mate2) else {
            self.stats.invalid_for_duplicate += 1;
            return Ok(DuplicateStatus::TooShort);
        };

        let lookup = self.table.find_or_insert(fingerprint)?;
        if lookup.existed {
            self.stats.duplicates += 1;
            trace!(count = lookup.count, "Duplicate pair");
            Ok(DuplicateStatus::Duplicate {
                fingerprint,
                count: lookup.count,
            })
        } else {
            Ok(DuplicateStatus::Unique)
        }
    }
}
