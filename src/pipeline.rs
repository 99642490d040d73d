//! Sequential pair-processing pipeline
//!
//! Each pair is fully handled before the next is read: duplicate check,
//! junction search on both mates, junction trimming, categorisation and
//! (for usable pairs) output. The fingerprint table is the only state that
//! lives across pairs.

use crate::alignment::{AlignmentResult, JunctionLocator};
use crate::category::{Categorization, Categorizer};
use crate::config::ClipConfig;
use crate::duplicate::{DuplicateDetector, DuplicateStatus};
use crate::error::Result;
use crate::output::{
    AlignmentLog, CategoryWriters, PairSink, write_duplicate_table, write_gc_histograms, write_length_histograms,
};
use crate::read::{PairedReader, SequencedRead};
use crate::stats::{ClipStats, Summary};
use std::path::Path;
use tracing::{debug, info};

/// Pairs between progress messages
const PROGRESS_INTERVAL: u64 = 1_000_000;

/// What happened to one pair
#[derive(Debug, Clone, PartialEq)]
pub struct PairOutcome {
    pub duplicate: DuplicateStatus,
    /// `None` when the pair was dropped as a duplicate before alignment
    pub categorization: Option<Categorization>,
    pub alignments: Option<[AlignmentResult; 2]>,
    /// The trimmed pair, as written when usable
    pub reads: [SequencedRead; 2],
}

impl PairOutcome {
    pub fn written(&self) -> bool {
        self.categorization.as_ref().is_some_and(|c| c.usable)
    }
}

/// Processes read pairs one at a time into a sink
pub struct PairProcessor<S: PairSink> {
    remove_duplicates: bool,
    min_length: usize,
    locator: JunctionLocator,
    categorizer: Categorizer,
    detector: DuplicateDetector,
    stats: ClipStats,
    sink: S,
    log: AlignmentLog,
}

impl<S: PairSink> PairProcessor<S> {
    pub fn new(config: &ClipConfig, sink: S, log: AlignmentLog) -> Result<Self> {
        Ok(Self {
            remove_duplicates: config.remove_duplicates,
            min_length: config.min_length,
            locator: JunctionLocator::from_config(config)?,
            categorizer: Categorizer::new(config),
            detector: DuplicateDetector::new(config.kmer_size, config.approximate_pairs)?,
            stats: ClipStats::new(),
            sink,
            log,
        })
    }

    pub fn stats(&self) -> &ClipStats {
        &self.stats
    }

    pub fn detector(&self) -> &DuplicateDetector {
        &self.detector
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Find, record and cut the junction in each mate
    fn clip_junctions(&mut self, reads: &mut [SequencedRead; 2]) -> Result<[AlignmentResult; 2]> {
        let results = [
            self.locator.locate(reads[0].bases()),
            self.locator.locate(reads[1].bases()),
        ];
        for (mate, (read, result)) in reads.iter_mut().zip(&results).enumerate() {
            self.log.record_alignment(read, result, self.locator.template())?;
            if result.accepted {
                self.stats.record_junction(mate, result.read_start >= self.min_length);
                read.truncate(result.read_start);
            } else {
                self.stats.record_no_junction(mate);
            }
        }
        Ok(results)
    }

    pub fn process_pair(&mut self, mut reads: [SequencedRead; 2]) -> Result<PairOutcome> {
        self.stats.record_pair([reads[0].len(), reads[1].len()]);

        let duplicate = self.detector.check(reads[0].bases(), reads[1].bases())?;
        if let DuplicateStatus::Duplicate { fingerprint, .. } = duplicate {
            let sequence = fingerprint.to_sequence(self.detector.sampler().total_length());
            self.log.record_duplicate(&sequence, &reads)?;
        }

        if self.remove_duplicates && duplicate.is_duplicate() {
            self.stats.duplicates_not_written += 1;
            return Ok(PairOutcome {
                duplicate,
                categorization: None,
                alignments: None,
                reads,
            });
        }

        let mut results = self.clip_junctions(&mut reads)?;
        let categorization = self.categorizer.categorize(&mut reads, &mut results);
        self.stats.record_categorization(&categorization);
        self.log.record_category(categorization.category)?;

        if categorization.usable {
            self.sink.write_pair(categorization.category, &reads)?;
        }

        Ok(PairOutcome {
            duplicate,
            categorization: Some(categorization),
            alignments: Some(results),
            reads,
        })
    }

    /// Flush all outputs and hand back the counters
    pub fn finish(mut self) -> Result<(ClipStats, DuplicateDetector, S)> {
        self.sink.finish()?;
        self.log.finish()?;
        Ok((self.stats, self.detector, self.sink))
    }
}

/// Run the whole tool: read both inputs, write every output file and
/// return the summary.
pub fn run(
    config: &ClipConfig,
    inputs: [&Path; 2],
    output_prefix: &Path,
    log_file: Option<&Path>,
) -> Result<Summary> {
    info!(adaptor = %config.adaptor, strict = %config.strict, "Starting NextClip");

    let log = log_file.map_or_else(AlignmentLog::disabled, AlignmentLog::open);
    let writers = CategoryWriters::create(output_prefix, config.num_categories())?;
    let mut processor = PairProcessor::new(config, writers, log)?;

    for pair in PairedReader::open(inputs[0], inputs[1])? {
        processor.process_pair(pair?)?;
        let processed = processor.stats().num_read_pairs;
        if processed % PROGRESS_INTERVAL == 0 {
            info!(pairs = processed, "Processed read pairs");
        }
    }

    let (stats, detector, _) = processor.finish()?;
    let composition = detector.stats();
    info!(
        pairs = stats.num_read_pairs,
        gc_bases = composition.gc_bases,
        at_bases = composition.at_bases,
        "Finished reading input"
    );
    let table = detector.table();
    debug!(
        entries = table.len(),
        capacity = table.capacity(),
        load_factor = table.load_factor(),
        "Fingerprint table usage"
    );

    let summary = Summary::compute(config, &stats, composition)?;

    write_length_histograms(output_prefix, &stats, config.num_categories());
    write_gc_histograms(output_prefix, composition);
    write_duplicate_table(output_prefix, table, composition, stats.num_read_pairs);

    Ok(summary)
}
