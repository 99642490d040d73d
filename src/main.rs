use clap::Parser;
use nextclip::config::{ClipConfig, MatchThresholds};
use nextclip::error::Result;
use nextclip::logging::{LogLevel, init_logging};
use nextclip::pipeline;
use std::path::PathBuf;
use std::process::ExitCode;

fn parse_thresholds(s: &str) -> std::result::Result<MatchThresholds, String> {
    s.parse().map_err(|e: nextclip::error::NextClipError| e.to_string())
}

fn parse_log_level(s: &str) -> std::result::Result<LogLevel, String> {
    s.parse().map_err(|e: nextclip::error::NextClipError| e.to_string())
}

/// Clip and analyse Illumina Nextera Long Mate Pair reads
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input FASTQ R1 file
    #[arg(short = 'i', long = "input_one")]
    input_one: PathBuf,

    /// Input FASTQ R2 file
    #[arg(short = 'j', long = "input_two")]
    input_two: PathBuf,

    /// Prefix for output files
    #[arg(short = 'o', long = "output_prefix")]
    output_prefix: PathBuf,

    /// Log filename for per-read alignment details
    #[arg(short = 'l', long = "log")]
    log: Option<PathBuf>,

    /// Minimum usable read length (default 25)
    #[arg(short = 'm', long = "min_length")]
    min_length: Option<usize>,

    /// Approximate number of reads (default 20,000,000)
    #[arg(short = 'n', long = "number_of_reads")]
    number_of_reads: Option<usize>,

    /// Adaptor sequence (default CTGTCTCTTATACACATCT)
    #[arg(short = 's', long = "adaptor_sequence")]
    adaptor: Option<String>,

    /// Trim ends of non-matching reads by this amount (default 19)
    #[arg(short = 't', long = "trim_ends")]
    trim_ends: Option<usize>,

    /// Strict alignment matches (default '34,18')
    #[arg(short = 'x', long = "strict_match", value_parser = parse_thresholds)]
    strict: Option<MatchThresholds>,

    /// Relaxed alignment matches (default '32,17')
    #[arg(short = 'y', long = "relaxed_match", value_parser = parse_thresholds)]
    relaxed: Option<MatchThresholds>,

    /// Use category E
    #[arg(short = 'e', long = "use_category_e")]
    use_category_e: bool,

    /// Remove PCR duplicates
    #[arg(short = 'd', long = "remove_duplicates")]
    remove_duplicates: bool,

    /// Length of each fingerprint window used for duplicate detection (default 11)
    #[arg(short = 'k', long = "kmer_size")]
    kmer_size: Option<usize>,

    /// TOML configuration file; command-line options take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level", value_parser = parse_log_level)]
    log_level: Option<LogLevel>,
}

impl Args {
    /// Layer the command line over the file (or built-in) configuration
    fn into_config(self) -> Result<ClipConfig> {
        let mut config = match &self.config {
            Some(path) => ClipConfig::load_from_file(path)?,
            None => ClipConfig::default(),
        };

        if let Some(adaptor) = self.adaptor {
            config.adaptor = adaptor;
        }
        if let Some(strict) = self.strict {
            config.strict = strict;
        }
        if let Some(relaxed) = self.relaxed {
            config.relaxed = relaxed;
        }
        if let Some(min_length) = self.min_length {
            config.min_length = min_length;
        }
        if let Some(trim_ends) = self.trim_ends {
            config.trim_ends = trim_ends;
        }
        if let Some(pairs) = self.number_of_reads {
            config.approximate_pairs = pairs;
        }
        if let Some(k) = self.kmer_size {
            config.kmer_size = k;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        config.use_category_e |= self.use_category_e;
        config.remove_duplicates |= self.remove_duplicates;

        config.validate()
    }
}

fn run(args: Args) -> Result<()> {
    let inputs = [args.input_one.clone(), args.input_two.clone()];
    let output_prefix = args.output_prefix.clone();
    let log = args.log.clone();
    let config = args.into_config()?;
    init_logging(&config.logging)?;

    let summary = pipeline::run(
        &config,
        [inputs[0].as_path(), inputs[1].as_path()],
        &output_prefix,
        log.as_deref(),
    )?;
    print!("{}", summary);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}
