//! Output files: category FASTQ streams, the diagnostic alignment log and
//! the end-of-run tables.
//!
//! Category streams are required and any failure there is fatal. The
//! diagnostic log and the histogram tables are best effort: a file that
//! cannot be written is reported with `warn!` and skipped.

use crate::alignment::{AlignmentResult, SearchTemplate};
use crate::category::Category;
use crate::duplicate::{CompositionStats, GC_BUCKETS};
use crate::error::Result;
use crate::read::SequencedRead;
use crate::stats::ClipStats;
use crate::table::FingerprintTable;
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Occurrence counts at or above this are folded into the last table row
pub const MAX_DUPLICATES: usize = 100;

/// `prefix` with `suffix` appended to its final component
pub fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut path = OsString::from(prefix.as_os_str());
    path.push(suffix);
    PathBuf::from(path)
}

/// Write one FASTQ record using the read's current length
pub fn write_fastq<W: Write>(writer: &mut W, read: &SequencedRead) -> io::Result<()> {
    writer.write_all(b"@")?;
    writer.write_all(read.id())?;
    writer.write_all(b"\n")?;
    writer.write_all(read.bases())?;
    writer.write_all(b"\n+\n")?;
    writer.write_all(read.qualities())?;
    writer.write_all(b"\n")
}

/// Destination for pairs that survive categorisation
pub trait PairSink {
    fn write_pair(&mut self, category: Category, reads: &[SequencedRead; 2]) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// One pair of FASTQ files per category in use
pub struct CategoryWriters {
    writers: Vec<[BufWriter<File>; 2]>,
}

impl CategoryWriters {
    pub fn fastq_path(prefix: &Path, category: Category, mate: usize) -> PathBuf {
        with_suffix(prefix, &format!("_{}_R{}.fastq", category, mate + 1))
    }

    pub fn create(prefix: &Path, num_categories: usize) -> Result<Self> {
        let mut writers = Vec::with_capacity(num_categories);
        for &category in &Category::ALL[..num_categories] {
            let open = |mate| -> Result<BufWriter<File>> {
                let path = Self::fastq_path(prefix, category, mate);
                info!(file = %path.display(), "Opening output file");
                Ok(BufWriter::new(File::create(&path)?))
            };
            writers.push([open(0)?, open(1)?]);
        }
        Ok(Self { writers })
    }
}

impl PairSink for CategoryWriters {
    fn write_pair(&mut self, category: Category, reads: &[SequencedRead; 2]) -> Result<()> {
        let writers = &mut self.writers[category.index()];
        for (writer, read) in writers.iter_mut().zip(reads) {
            write_fastq(writer, read)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        for writer in self.writers.iter_mut().flatten() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Match bar and template track drawn under a read
pub fn render_alignment(read: &[u8], template: &[u8], position: isize) -> (String, String) {
    read.iter()
        .enumerate()
        .map(|(i, &base)| {
            let p = i as isize - position;
            match usize::try_from(p).ok().and_then(|p| template.get(p)) {
                Some(&t) => (if t == base { '|' } else { ' ' }, t as char),
                None => (' ', ' '),
            }
        })
        .unzip()
}

fn open_optional(path: &Path, what: &str) -> Option<BufWriter<File>> {
    match File::create(path) {
        Ok(file) => Some(BufWriter::new(file)),
        Err(e) => {
            warn!(file = %path.display(), error = %e, "Could not open {}, continuing without it", what);
            None
        }
    }
}

/// Optional per-pair diagnostic log and its companion duplicate log
#[derive(Default)]
pub struct AlignmentLog {
    log: Option<BufWriter<File>>,
    pcr: Option<BufWriter<File>>,
}

impl AlignmentLog {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Open `path` and `<path>.pcr.txt`. Either may fail independently.
    pub fn open(path: &Path) -> Self {
        Self {
            log: open_optional(path, "alignment log"),
            pcr: open_optional(&with_suffix(path, ".pcr.txt"), "duplicate log"),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.log.is_some()
    }

    pub fn record_alignment(&mut self, read: &SequencedRead, result: &AlignmentResult, template: &SearchTemplate) -> Result<()> {
        let Some(log) = self.log.as_mut() else {
            return Ok(());
        };
        let bases = read.bases();
        writeln!(log, "\n    Id: {}", String::from_utf8_lossy(read.id()))?;
        writeln!(log, "  Read: {}", String::from_utf8_lossy(bases))?;
        if result.is_aligned() {
            let (bar, track) = render_alignment(bases, template.sequence(), result.position);
            writeln!(log, "        {}", bar)?;
            writeln!(log, "        {}", track)?;
        } else {
            writeln!(log, "        No alignment")?;
        }
        writeln!(
            log,
            " Match: read base {} to {}, transposon base {} to {}",
            result.read_start, result.read_end, result.template_start, result.template_end
        )?;
        writeln!(
            log,
            " Score: {} Id {:.2} length {} (breakdown {},{} matches {},{} mismatches {},{} lengths {:.2},{:.2} identity)",
            result.score,
            result.total_identity,
            result.total_alignment_length,
            result.matches[0],
            result.matches[1],
            result.mismatches[0],
            result.mismatches[1],
            result.alignment_length[0],
            result.alignment_length[1],
            result.identity[0],
            result.identity[1]
        )?;
        writeln!(log, "Result: {}", if result.accepted { "GOOD ALIGNMENT" } else { "BAD" })?;
        Ok(())
    }

    pub fn record_category(&mut self, category: Category) -> Result<()> {
        if let Some(log) = self.log.as_mut() {
            writeln!(log, "\n-------------------- Category {} --------------------", category)?;
        }
        Ok(())
    }

    pub fn record_duplicate(&mut self, fingerprint: &[u8], reads: &[SequencedRead; 2]) -> Result<()> {
        if let Some(pcr) = self.pcr.as_mut() {
            writeln!(pcr, "Match: {}", String::from_utf8_lossy(fingerprint))?;
            writeln!(pcr, "   R1: {}", String::from_utf8_lossy(reads[0].bases()))?;
            writeln!(pcr, "   R2: {}\n", String::from_utf8_lossy(reads[1].bases()))?;
        }
        Ok(())
    }

    pub fn finish(&mut self) -> Result<()> {
        if let Some(log) = self.log.as_mut() {
            writeln!(log, "\nDONE")?;
            log.flush()?;
        }
        if let Some(pcr) = self.pcr.as_mut() {
            pcr.flush()?;
        }
        Ok(())
    }
}

/// Create `path` and fill it with `body`, warning instead of failing
fn write_table<F>(path: &Path, body: F)
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let written = File::create(path).map(BufWriter::new).and_then(|mut writer| {
        body(&mut writer)?;
        writer.flush()
    });
    if let Err(e) = written {
        warn!(file = %path.display(), error = %e, "Could not write histogram file");
    }
}

/// Number of pairs whose shorter mate is at least each length, for 1..=max
fn cumulative_from_top(counts: impl Fn(usize) -> u64, max: usize) -> Vec<u64> {
    let mut cumulative = vec![0u64; max + 2];
    for length in (1..=max).rev() {
        cumulative[length] = cumulative[length + 1] + counts(length);
    }
    cumulative
}

/// Per-category read and pair length histograms
pub fn write_length_histograms(prefix: &Path, stats: &ClipStats, num_categories: usize) {
    let max = stats.max_read_length;
    for &category in &Category::ALL[..num_categories] {
        for mate in 0..2 {
            let path = with_suffix(prefix, &format!("_{}_R{}_hist.txt", category, mate + 1));
            write_table(&path, |w| {
                for length in 1..=max {
                    writeln!(w, "{}\t{}", length, stats.read_length_count(category, mate, length))?;
                }
                Ok(())
            });
        }

        let path = with_suffix(prefix, &format!("_{}_pair_hist.txt", category));
        let cumulative = cumulative_from_top(|length| stats.pair_length_count(category, length), max);
        write_table(&path, |w| {
            for length in 1..=max {
                writeln!(
                    w,
                    "{}\t{}\t{}",
                    length,
                    stats.pair_length_count(category, length),
                    cumulative[length]
                )?;
            }
            Ok(())
        });
    }
}

/// GC percentage histograms in bins of two; 100 % shares the last bin
pub fn gc_bins(histogram: &[u64; GC_BUCKETS]) -> Vec<(usize, u64)> {
    (0..GC_BUCKETS - 1)
        .step_by(2)
        .map(|bin| {
            let mut count = histogram[bin] + histogram[bin + 1];
            if bin + 2 == GC_BUCKETS - 1 {
                count += histogram[GC_BUCKETS - 1];
            }
            (bin, count)
        })
        .collect()
}

pub fn write_gc_histograms(prefix: &Path, composition: &CompositionStats) {
    for (mate, histogram) in composition.gc_content.iter().enumerate() {
        let path = with_suffix(prefix, &format!("_R{}_gc.txt", mate + 1));
        write_table(&path, |w| {
            for (bin, count) in gc_bins(histogram) {
                writeln!(w, "{}\t{}", bin, count)?;
            }
            Ok(())
        });
    }
}

/// One row of the duplicate-occurrence table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuplicateRow {
    pub occurrences: usize,
    /// Pairs in fingerprints seen exactly `occurrences` times
    pub pairs: u64,
    pub percent: f64,
}

/// Rows for occurrence counts 1 up to the largest seen (capped below
/// `MAX_DUPLICATES`). Row 1 also carries the pairs that could not be
/// fingerprinted; its percentage does not.
pub fn duplicate_rows(table: &FingerprintTable, invalid_for_duplicate: u64, read_pairs: u64) -> Vec<DuplicateRow> {
    let histogram = table.occurrence_histogram(MAX_DUPLICATES - 1);
    if table.max_count() as usize >= MAX_DUPLICATES {
        warn!(
            largest = table.max_count(),
            "Occurrence counts of {} or more are reported as {}",
            MAX_DUPLICATES,
            MAX_DUPLICATES - 1
        );
    }
    let last = (table.max_count() as usize).min(MAX_DUPLICATES - 1);

    (1..=last)
        .map(|n| {
            let pairs = n as u64 * histogram[n];
            DuplicateRow {
                occurrences: n,
                pairs: if n == 1 { pairs + invalid_for_duplicate } else { pairs },
                percent: 100.0 * pairs as f64 / read_pairs as f64,
            }
        })
        .collect()
}

pub fn write_duplicate_table(prefix: &Path, table: &FingerprintTable, composition: &CompositionStats, read_pairs: u64) {
    let path = with_suffix(prefix, "_duplicates.txt");
    let rows = duplicate_rows(table, composition.invalid_for_duplicate, read_pairs);
    write_table(&path, |w| {
        writeln!(w, "n\tCount\tPercent")?;
        for row in &rows {
            writeln!(w, "{}\t{}\t{:.2}", row.occurrences, row.pairs, row.percent)?;
        }
        Ok(())
    });
}
