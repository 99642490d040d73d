//! Pair categorisation, relaxed rescue and end trimming
//!
//! A pair is first given a base category from the two strict verdicts. If
//! category E is enabled, a B or C pair then gets one chance to move to E by
//! passing the relaxed thresholds on its rejected mate. Trimming follows from
//! the final decision.

use crate::alignment::{AcceptancePolicy, AlignmentResult};
use crate::config::ClipConfig;
use crate::read::SequencedRead;
use std::fmt;

/// Classification of a read pair by where the junction was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Junction accepted in both mates
    A,
    /// Junction accepted in mate 2 only
    B,
    /// Junction accepted in mate 1 only
    C,
    /// Junction accepted in neither mate
    D,
    /// B or C pair whose rejected mate passed the relaxed thresholds
    E,
}

impl Category {
    pub const ALL: [Category; 5] = [Category::A, Category::B, Category::C, Category::D, Category::E];

    /// Base category from the strict verdicts of mate 1 and mate 2
    pub fn from_acceptance(mate1: bool, mate2: bool) -> Self {
        match (mate1, mate2) {
            (true, true) => Category::A,
            (false, true) => Category::B,
            (true, false) => Category::C,
            (false, false) => Category::D,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn letter(self) -> char {
        (b'A' + self as u8) as char
    }

    /// Mate whose junction was rejected in a single-sided category
    pub fn rejected_mate(self) -> Option<usize> {
        match self {
            Category::B => Some(0),
            Category::C => Some(1),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Outcome of categorising one pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categorization {
    pub category: Category,
    /// Base category the pair was rescued from, when it ended up in E
    pub rescued_from: Option<Category>,
    /// Lengths of both mates after trimming
    pub lengths: [usize; 2],
    /// Both mates are at least the minimum usable length
    pub usable: bool,
}

impl Categorization {
    pub fn min_length(&self) -> usize {
        self.lengths[0].min(self.lengths[1])
    }
}

/// Decides categories and applies the trims that go with them
#[derive(Debug, Clone)]
pub struct Categorizer {
    policy: AcceptancePolicy,
    use_category_e: bool,
    trim_ends: usize,
    min_length: usize,
}

impl Categorizer {
    pub fn new(config: &ClipConfig) -> Self {
        Self {
            policy: AcceptancePolicy::from_config(config),
            use_category_e: config.use_category_e,
            trim_ends: config.trim_ends,
            min_length: config.min_length,
        }
    }

    /// Try to move a B or C pair into E by re-checking its rejected mate.
    ///
    /// On success the rescued mate is cut at the start of its relaxed match.
    fn rescue(&self, base: Category, reads: &mut [SequencedRead; 2], results: &mut [AlignmentResult; 2]) -> Option<usize> {
        if !self.use_category_e {
            return None;
        }
        let mate = base.rejected_mate()?;
        if self.policy.relaxed_check(&mut results[mate]) {
            reads[mate].truncate(results[mate].read_start);
            Some(mate)
        } else {
            None
        }
    }

    /// Categorise a pair, trimming mates in place.
    ///
    /// Mates with an accepted junction are expected to have been cut at the
    /// junction already; only untrimmed mates are rescued or end-trimmed.
    pub fn categorize(&self, reads: &mut [SequencedRead; 2], results: &mut [AlignmentResult; 2]) -> Categorization {
        let base = Category::from_acceptance(results[0].accepted, results[1].accepted);

        let (category, rescued_from) = match self.rescue(base, reads, results) {
            Some(_) => (Category::E, Some(base)),
            None => (base, None),
        };

        if self.trim_ends > 0 {
            for (read, result) in reads.iter_mut().zip(results.iter()) {
                if !result.accepted && !read.is_trimmed() {
                    read.trim_tail(self.trim_ends);
                }
            }
        }

        let lengths = [reads[0].len(), reads[1].len()];
        Categorization {
            category,
            rescued_from,
            lengths,
            usable: lengths.iter().all(|&l| l >= self.min_length),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchThresholds;

    fn read(bases: &str) -> SequencedRead {
        SequencedRead::new("pair", bases, "I".repeat(bases.len())).unwrap()
    }

    fn result(matches: [usize; 2], read_start: usize, accepted: bool) -> AlignmentResult {
        let mut result = AlignmentResult::unaligned(60);
        result.score = (matches[0] + matches[1]) as i32;
        result.matches = matches;
        result.total_matches = matches[0] + matches[1];
        result.read_start = read_start;
        result.accepted = accepted;
        result
    }

    fn config(use_category_e: bool) -> ClipConfig {
        ClipConfig {
            use_category_e,
            min_length: 25,
            trim_ends: 19,
            ..Default::default()
        }
    }

    fn sixty() -> String {
        "ACGTTGCA".repeat(8)[..60].to_string()
    }

    #[test]
    fn test_base_category_table() {
        assert_eq!(Category::from_acceptance(true, true), Category::A);
        assert_eq!(Category::from_acceptance(false, true), Category::B);
        assert_eq!(Category::from_acceptance(true, false), Category::C);
        assert_eq!(Category::from_acceptance(false, false), Category::D);
        assert_eq!(Category::E.letter(), 'E');
        assert_eq!(Category::C.index(), 2);
    }

    #[test]
    fn test_category_a_is_not_trimmed_again() {
        let categorizer = Categorizer::new(&config(false));
        let mut reads = [read(&sixty()), read(&sixty())];
        reads[0].truncate(40);
        reads[1].truncate(30);
        let mut results = [result([19, 19], 40, true), result([19, 19], 30, true)];

        let outcome = categorizer.categorize(&mut reads, &mut results);
        assert_eq!(outcome.category, Category::A);
        assert_eq!(outcome.lengths, [40, 30]);
        assert!(outcome.usable);
    }

    #[test]
    fn test_category_b_trims_rejected_mate() {
        let categorizer = Categorizer::new(&config(false));
        let mut reads = [read(&sixty()), read(&sixty())];
        reads[1].truncate(35);
        let mut results = [result([17, 0], 12, false), result([19, 19], 35, true)];

        let outcome = categorizer.categorize(&mut reads, &mut results);
        assert_eq!(outcome.category, Category::B);
        assert_eq!(outcome.rescued_from, None);
        assert_eq!(outcome.lengths, [41, 35]);
        assert!(reads.iter().all(|r| r.is_trimmed()));
    }

    #[test]
    fn test_category_c_rescued_into_e() {
        let categorizer = Categorizer::new(&config(true));
        let mut reads = [read(&sixty()), read(&sixty())];
        reads[0].truncate(50);
        let mut results = [result([19, 19], 50, true), result([17, 0], 33, false)];

        let outcome = categorizer.categorize(&mut reads, &mut results);
        assert_eq!(outcome.category, Category::E);
        assert_eq!(outcome.rescued_from, Some(Category::C));
        assert_eq!(outcome.lengths, [50, 33]);
        assert!(results[1].accepted);
    }

    #[test]
    fn test_failed_rescue_falls_back_to_end_trim() {
        let categorizer = Categorizer::new(&config(true));
        let mut reads = [read(&sixty()), read(&sixty())];
        reads[1].truncate(45);
        let mut results = [result([10, 10], 5, false), result([19, 19], 45, true)];

        let outcome = categorizer.categorize(&mut reads, &mut results);
        assert_eq!(outcome.category, Category::B);
        assert_eq!(outcome.lengths, [41, 45]);
    }

    #[test]
    fn test_category_d_trims_both_and_flags_short() {
        let categorizer = Categorizer::new(&config(false));
        let mut reads = [read(&sixty()), read(&sixty()[..40])];
        let mut results = [result([3, 2], 0, false), result([2, 2], 0, false)];

        let outcome = categorizer.categorize(&mut reads, &mut results);
        assert_eq!(outcome.category, Category::D);
        assert_eq!(outcome.lengths, [41, 21]);
        assert_eq!(outcome.min_length(), 21);
        assert!(!outcome.usable);
    }

    #[test]
    fn test_zero_trim_leaves_reads() {
        let categorizer = Categorizer::new(&ClipConfig {
            trim_ends: 0,
            ..config(false)
        });
        let mut reads = [read(&sixty()), read(&sixty())];
        let mut results = [result([0, 0], 0, false), result([0, 0], 0, false)];

        let outcome = categorizer.categorize(&mut reads, &mut results);
        assert_eq!(outcome.lengths, [60, 60]);
        assert!(reads.iter().all(|r| !r.is_trimmed()));
    }

    #[test]
    fn test_rescue_respects_relaxed_thresholds() {
        let categorizer = Categorizer::new(&ClipConfig {
            relaxed: MatchThresholds::new(30, 16),
            ..config(true)
        });
        let mut reads = [read(&sixty()), read(&sixty())];
        reads[1].truncate(40);
        let mut results = [result([16, 0], 20, false), result([19, 19], 40, true)];

        let outcome = categorizer.categorize(&mut reads, &mut results);
        assert_eq!(outcome.category, Category::E);
        assert_eq!(outcome.rescued_from, Some(Category::B));
        assert_eq!(outcome.lengths, [20, 40]);
    }
}
