//! Fixed-capacity fingerprint table
//!
//! Open addressing with linear probing over a power-of-two slot array that
//! is sized once from the expected number of pairs and never grows. The only
//! mutating operation is `find_or_insert`, so each fingerprint has exactly
//! one entry and exactly one caller ever sees it as new.

use crate::error::{NextClipError, Result};
use crate::kmer::Fingerprint;
use tracing::info;

/// Fraction of slots expected to be occupied at the configured pair count
pub const TARGET_LOAD_FACTOR: f64 = 0.8;

/// Smallest table ever allocated
const MIN_CAPACITY: usize = 64;

/// Fixed seeds so slot placement is reproducible across runs
const HASH_SEEDS: [u64; 4] = [0x51f3b5b8, 0x9e3779b9, 0x2545f491, 0x6c62272e];

/// One stored fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintEntry {
    pub key: Fingerprint,
    /// Number of pairs seen with this fingerprint, at least 1
    pub count: u32,
}

/// Result of a find-or-insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup {
    /// The fingerprint was already stored before this call
    pub existed: bool,
    /// Occurrence count after this call
    pub count: u32,
}

/// Slot count for an expected number of entries: the next power of two
/// above `expected / TARGET_LOAD_FACTOR`.
///
/// Fails when that count does not fit in `usize`.
pub fn capacity_for(expected: usize) -> Result<usize> {
    let required = (expected as f64 / TARGET_LOAD_FACTOR).ceil();
    let too_large = || {
        NextClipError::config(format!(
            "expected number of reads {} is too large for the fingerprint table",
            expected
        ))
    };
    if required >= usize::MAX as f64 {
        return Err(too_large());
    }
    (required as usize)
        .max(MIN_CAPACITY)
        .checked_next_power_of_two()
        .ok_or_else(too_large)
}

#[derive(Debug)]
pub struct FingerprintTable {
    slots: Vec<Option<FingerprintEntry>>,
    mask: usize,
    len: usize,
    hasher: ahash::RandomState,
}

impl FingerprintTable {
    /// Allocate a table for roughly `expected` fingerprints.
    ///
    /// Fails with `TableAllocation` when the slot array cannot be allocated.
    pub fn with_expected(expected: usize) -> Result<Self> {
        let capacity = capacity_for(expected)?;
        let entry_size = std::mem::size_of::<Option<FingerprintEntry>>();
        info!(
            expected,
            capacity,
            entry_size,
            memory_mb = capacity.saturating_mul(entry_size) / (1024 * 1024),
            "Creating hash table for duplicate storage"
        );

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| NextClipError::TableAllocation { capacity })?;
        slots.resize(capacity, None);

        Ok(Self {
            slots,
            mask: capacity - 1,
            len: 0,
            hasher: ahash::RandomState::with_seeds(HASH_SEEDS[0], HASH_SEEDS[1], HASH_SEEDS[2], HASH_SEEDS[3]),
        })
    }

    fn home_slot(&self, key: &Fingerprint) -> usize {
        (self.hasher.hash_one(key) as usize) & self.mask
    }

    /// Index of the slot holding `key`, or of the empty slot where it belongs
    fn probe(&self, key: &Fingerprint) -> Option<usize> {
        let start = self.home_slot(key);
        (0..self.capacity())
            .map(|step| (start + step) & self.mask)
            .find(|&slot| match &self.slots[slot] {
                Some(entry) => entry.key == *key,
                None => true,
            })
    }

    /// Count one more occurrence of `key`, inserting it with count 1 if new.
    ///
    /// Fails with `TableFull` only when the key is absent and no slot is free.
    pub fn find_or_insert(&mut self, key: Fingerprint) -> Result<Lookup> {
        let capacity = self.capacity();
        let slot = self.probe(&key).ok_or(NextClipError::TableFull { capacity })?;
        match &mut self.slots[slot] {
            Some(entry) => {
                entry.count = entry.count.saturating_add(1);
                Ok(Lookup {
                    existed: true,
                    count: entry.count,
                })
            }
            empty @ None => {
                *empty = Some(FingerprintEntry { key, count: 1 });
                self.len += 1;
                Ok(Lookup {
                    existed: false,
                    count: 1,
                })
            }
        }
    }

    pub fn get(&self, key: &Fingerprint) -> Option<&FingerprintEntry> {
        self.probe(key).and_then(|slot| self.slots[slot].as_ref())
    }

    /// Number of distinct fingerprints stored
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.capacity() as f64
    }

    pub fn entries(&self) -> impl Iterator<Item = &FingerprintEntry> {
        self.slots.iter().flatten()
    }

    /// `histogram[n]` is the number of fingerprints seen exactly `n` times.
    /// Counts of `max_count` or more share the last bucket.
    pub fn occurrence_histogram(&self, max_count: usize) -> Vec<u64> {
        let mut histogram = vec![0u64; max_count + 1];
        for entry in self.entries() {
            histogram[(entry.count as usize).min(max_count)] += 1;
        }
        histogram
    }

    /// Occurrences beyond the first, summed over all fingerprints
    pub fn duplicate_occurrences(&self) -> u64 {
        self.entries().map(|e| u64::from(e.count) - 1).sum()
    }

    /// Largest occurrence count stored
    pub fn max_count(&self) -> u32 {
        self.entries().map(|e| e.count).max().unwrap_or(0)
    }
}
