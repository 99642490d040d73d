//! Run counters and the end-of-run summary

use crate::category::{Categorization, Category};
use crate::config::{ClipConfig, MatchThresholds};
use crate::duplicate::CompositionStats;
use crate::error::{NextClipError, Result};
use std::fmt;

const NUM_CATEGORIES: usize = Category::ALL.len();

fn bump(histogram: &mut Vec<u64>, index: usize) {
    if histogram.len() <= index {
        histogram.resize(index + 1, 0);
    }
    histogram[index] += 1;
}

/// Counters accumulated while processing pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipStats {
    pub num_read_pairs: u64,
    pub adaptor_found: [u64; 2],
    pub no_adaptor: [u64; 2],
    /// Mates whose junction starts at or beyond the minimum length
    pub long_enough: [u64; 2],
    pub too_short: [u64; 2],
    pub by_category: [u64; NUM_CATEGORIES],
    pub by_category_long_enough: [u64; NUM_CATEGORIES],
    pub by_category_too_short: [u64; NUM_CATEGORIES],
    /// Rescues into E, indexed by the category the pair came from
    pub relaxed_hits: [u64; NUM_CATEGORIES],
    pub duplicates_not_written: u64,
    /// Per category and mate, trimmed read lengths
    pub read_lengths: [[Vec<u64>; 2]; NUM_CATEGORIES],
    /// Per category, the shorter trimmed mate of each pair
    pub pair_lengths: [Vec<u64>; NUM_CATEGORIES],
    /// Longest untrimmed read seen
    pub max_read_length: usize,
}

impl ClipStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a new pair and note its untrimmed lengths
    pub fn record_pair(&mut self, lengths: [usize; 2]) {
        self.num_read_pairs += 1;
        self.max_read_length = self.max_read_length.max(lengths[0]).max(lengths[1]);
    }

    /// Count an accepted junction in one mate
    pub fn record_junction(&mut self, mate: usize, long_enough: bool) {
        self.adaptor_found[mate] += 1;
        if long_enough {
            self.long_enough[mate] += 1;
        } else {
            self.too_short[mate] += 1;
        }
    }

    pub fn record_no_junction(&mut self, mate: usize) {
        self.no_adaptor[mate] += 1;
    }

    pub fn record_categorization(&mut self, outcome: &Categorization) {
        let c = outcome.category.index();
        self.by_category[c] += 1;
        if let Some(source) = outcome.rescued_from {
            self.relaxed_hits[source.index()] += 1;
        }
        for (mate, &len) in outcome.lengths.iter().enumerate() {
            bump(&mut self.read_lengths[c][mate], len);
        }
        bump(&mut self.pair_lengths[c], outcome.min_length());
        if outcome.usable {
            self.by_category_long_enough[c] += 1;
        } else {
            self.by_category_too_short[c] += 1;
        }
    }

    /// Pairs that went through categorisation
    pub fn categorized_pairs(&self) -> u64 {
        self.by_category.iter().sum()
    }

    /// Count of reads of exactly `length` for a category and mate
    pub fn read_length_count(&self, category: Category, mate: usize, length: usize) -> u64 {
        self.read_lengths[category.index()][mate].get(length).copied().unwrap_or(0)
    }

    /// Count of pairs whose shorter mate is exactly `length`
    pub fn pair_length_count(&self, category: Category, length: usize) -> u64 {
        self.pair_lengths[category.index()].get(length).copied().unwrap_or(0)
    }
}

/// A count and its share of all read pairs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proportion {
    pub count: u64,
    pub percent: f64,
}

impl Proportion {
    fn of(count: u64, total: u64) -> Self {
        Self {
            count,
            percent: 100.0 * count as f64 / total as f64,
        }
    }
}

impl fmt::Display for Proportion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{:.2} %", self.count, self.percent)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MateSummary {
    pub adaptor_found: Proportion,
    pub long_enough: Proportion,
    pub too_short: Proportion,
    pub no_adaptor: Proportion,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub category: Category,
    pub total: Proportion,
    pub long_enough: Proportion,
    pub too_short: Proportion,
}

/// Final figures of a run, printed as the summary report
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub strict: MatchThresholds,
    /// Present when category E is in use
    pub relaxed: Option<MatchThresholds>,
    pub min_length: usize,
    pub trim_ends: usize,
    pub read_pairs: u64,
    pub duplicates: Proportion,
    pub pairs_containing_n: Proportion,
    pub mates: [MateSummary; 2],
    pub categories: Vec<CategorySummary>,
    pub total_usable: Proportion,
    pub all_long_enough: Proportion,
    pub all_too_short: Proportion,
    pub duplicates_not_written: Proportion,
    pub b_became_e: Proportion,
    pub c_became_e: Proportion,
    pub gc_percent: f64,
}

impl Summary {
    pub fn compute(config: &ClipConfig, stats: &ClipStats, composition: &CompositionStats) -> Result<Self> {
        let pairs = stats.num_read_pairs;
        if pairs < 1 {
            return Err(NextClipError::NoReadPairs);
        }
        let of = |count: u64| Proportion::of(count, pairs);

        let mates = [0, 1].map(|m| MateSummary {
            adaptor_found: of(stats.adaptor_found[m]),
            long_enough: of(stats.long_enough[m]),
            too_short: of(stats.too_short[m]),
            no_adaptor: of(stats.no_adaptor[m]),
        });

        let categories = Category::ALL[..config.num_categories()]
            .iter()
            .map(|&category| {
                let c = category.index();
                CategorySummary {
                    category,
                    total: of(stats.by_category[c]),
                    long_enough: of(stats.by_category_long_enough[c]),
                    too_short: of(stats.by_category_too_short[c]),
                }
            })
            .collect();

        let usable: u64 = [Category::A, Category::B, Category::C, Category::E]
            .iter()
            .map(|c| stats.by_category_long_enough[c.index()])
            .sum();

        Ok(Self {
            strict: config.strict,
            relaxed: config.use_category_e.then_some(config.relaxed),
            min_length: config.min_length,
            trim_ends: config.trim_ends,
            read_pairs: pairs,
            duplicates: of(composition.duplicates),
            pairs_containing_n: of(composition.pairs_containing_n),
            mates,
            categories,
            total_usable: of(usable),
            all_long_enough: of(stats.by_category_long_enough.iter().sum()),
            all_too_short: of(stats.by_category_too_short.iter().sum()),
            duplicates_not_written: of(stats.duplicates_not_written),
            b_became_e: of(stats.relaxed_hits[Category::B.index()]),
            c_became_e: of(stats.relaxed_hits[Category::C.index()]),
            gc_percent: composition.gc_percent(),
        })
    }
}

fn line(f: &mut fmt::Formatter<'_>, label: &str, value: impl fmt::Display) -> fmt::Result {
    writeln!(f, "{:>28}: {}", label, value)
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\nSUMMARY\n")?;
        line(f, "Strict match parameters", self.strict)?;
        if let Some(relaxed) = self.relaxed {
            line(f, "Relaxed match parameters", relaxed)?;
        }
        line(f, "Minimum read size", self.min_length)?;
        line(f, "Trim ends", self.trim_ends)?;
        writeln!(f)?;
        line(f, "Number of read pairs", self.read_pairs)?;
        line(f, "Number of duplicate pairs", self.duplicates)?;
        line(f, "Number of pairs containing N", self.pairs_containing_n)?;

        for (i, mate) in self.mates.iter().enumerate() {
            let r = i + 1;
            line(f, &format!("R{} Num reads with adaptor", r), mate.adaptor_found)?;
            line(f, &format!("R{} long adaptor reads", r), mate.long_enough)?;
            line(f, &format!("R{} reads too short", r), mate.too_short)?;
            line(f, &format!("R{} Num reads no adaptor", r), mate.no_adaptor)?;
        }

        for summary in &self.categories {
            let c = summary.category;
            line(f, &format!("Total pairs in category {}", c), summary.total)?;
            line(f, &format!("{} pairs long enough", c), summary.long_enough)?;
            line(f, &format!("{} pairs too short", c), summary.too_short)?;
        }

        line(f, "Total usable pairs", self.total_usable)?;
        line(f, "All long enough", self.all_long_enough)?;
        line(f, "All categories too short", self.all_too_short)?;
        line(f, "Duplicates not written", self.duplicates_not_written)?;
        if self.relaxed.is_some() {
            line(f, "Category B became E", self.b_became_e)?;
            line(f, "Category C became E", self.c_became_e)?;
        }
        line(f, "Overall GC content", format!("{:.2} %", self.gc_percent))?;
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(category: Category, lengths: [usize; 2], usable: bool) -> Categorization {
        Categorization {
            category,
            rescued_from: None,
            lengths,
            usable,
        }
    }

    #[test]
    fn test_histograms_grow_on_demand() {
        let mut stats = ClipStats::new();
        stats.record_categorization(&outcome(Category::D, [81, 40], true));
        stats.record_categorization(&outcome(Category::D, [81, 12], false));

        assert_eq!(stats.read_length_count(Category::D, 0, 81), 2);
        assert_eq!(stats.read_length_count(Category::D, 1, 12), 1);
        assert_eq!(stats.read_length_count(Category::A, 0, 81), 0);
        assert_eq!(stats.pair_length_count(Category::D, 40), 1);
        assert_eq!(stats.pair_length_count(Category::D, 500), 0);
        assert_eq!(stats.by_category_long_enough[Category::D.index()], 1);
        assert_eq!(stats.by_category_too_short[Category::D.index()], 1);
        assert_eq!(stats.categorized_pairs(), 2);
    }

    #[test]
    fn test_rescue_is_counted_by_source() {
        let mut stats = ClipStats::new();
        stats.record_categorization(&Categorization {
            rescued_from: Some(Category::C),
            ..outcome(Category::E, [30, 30], true)
        });
        assert_eq!(stats.relaxed_hits[Category::C.index()], 1);
        assert_eq!(stats.by_category[Category::E.index()], 1);
    }

    #[test]
    fn test_summary_requires_pairs() {
        let result = Summary::compute(&ClipConfig::default(), &ClipStats::new(), &CompositionStats::default());
        assert!(matches!(result, Err(NextClipError::NoReadPairs)));
    }

    #[test]
    fn test_summary_percentages() {
        let config = ClipConfig {
            use_category_e: true,
            ..Default::default()
        };
        let mut stats = ClipStats::new();
        for _ in 0..4 {
            stats.record_pair([100, 100]);
        }
        stats.record_categorization(&outcome(Category::A, [40, 50], true));
        stats.record_categorization(&outcome(Category::B, [30, 81], true));
        stats.record_categorization(&outcome(Category::D, [81, 81], true));
        stats.record_categorization(&outcome(Category::C, [10, 81], false));
        let composition = CompositionStats {
            gc_bases: 1,
            at_bases: 3,
            duplicates: 1,
            ..Default::default()
        };

        let summary = Summary::compute(&config, &stats, &composition).unwrap();
        assert_eq!(summary.read_pairs, 4);
        assert_eq!(summary.categories.len(), 5);
        assert_eq!(summary.total_usable, Proportion { count: 2, percent: 50.0 });
        assert_eq!(summary.all_long_enough.count, 3);
        assert_eq!(summary.all_too_short.count, 1);
        assert_eq!(summary.duplicates.percent, 25.0);
        assert_eq!(summary.gc_percent, 25.0);

        let report = summary.to_string();
        assert!(report.contains("     Strict match parameters: 34, 18\n"));
        assert!(report.contains("    Relaxed match parameters: 32, 17\n"));
        assert!(report.contains("          Total usable pairs: 2\t50.00 %\n"));
        assert!(report.contains("         Category B became E: 0\t0.00 %\n"));
        assert!(report.contains("          Overall GC content: 25.00 %\n"));
    }

    #[test]
    fn test_report_without_category_e() {
        let mut stats = ClipStats::new();
        stats.record_pair([50, 50]);
        stats.record_categorization(&outcome(Category::D, [31, 31], true));
        let summary = Summary::compute(&ClipConfig::default(), &stats, &CompositionStats::default()).unwrap();

        let report = summary.to_string();
        assert_eq!(summary.categories.len(), 4);
        assert!(!report.contains("Relaxed"));
        assert!(!report.contains("category E"));
        assert!(report.contains("   Total pairs in category D: 1\t100.00 %\n"));
        assert!(report.contains("          Overall GC content: 0.00 %\n"));
    }
}
