//! Configuration for a NextClip run
//!
//! A `ClipConfig` is built once (defaults, then an optional TOML file, then
//! command-line flags), validated, and handed by reference to every
//! component. Nothing reads configuration from ambient state.

use crate::error::{NextClipError, Result};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Nextera junction adaptor
pub const DEFAULT_ADAPTOR: &str = "CTGTCTCTTATACACATCT";

/// Largest k-mer window that still lets four windows pack into 128 bits
pub const MAX_FINGERPRINT_KMER: usize = 16;

/// Largest accepted read-pair estimate; sizes a table of 2^31 slots
pub const MAX_APPROXIMATE_PAIRS: usize = 1_000_000_000;

/// Acceptance cutoffs for a scored alignment.
///
/// An alignment passes when its total match count reaches `double`, or when
/// either template half on its own reaches `single`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchThresholds {
    pub double: usize,
    pub single: usize,
}

impl MatchThresholds {
    pub const fn new(double: usize, single: usize) -> Self {
        Self { double, single }
    }
}

impl FromStr for MatchThresholds {
    type Err = NextClipError;

    /// Parse the `double,single` form used on the command line.
    fn from_str(s: &str) -> Result<Self> {
        let (double, single) = s
            .split_once(',')
            .ok_or_else(|| NextClipError::parse(format!("match thresholds '{}' are not of the format 'a,b'", s)))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<usize>()
                .map_err(|e| NextClipError::parse(format!("invalid match threshold '{}': {}", v, e)))
        };
        Ok(Self::new(parse(double)?, parse(single)?))
    }
}

impl fmt::Display for MatchThresholds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.double, self.single)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    /// Junction adaptor; the search template is this plus its reverse complement
    pub adaptor: String,
    /// Thresholds every alignment is checked against
    pub strict: MatchThresholds,
    /// Looser thresholds, only used to rescue B/C pairs into category E
    pub relaxed: MatchThresholds,
    /// Minimum usable read length after trimming
    pub min_length: usize,
    /// Bases trimmed from the end of mates with no accepted junction
    pub trim_ends: usize,
    /// Enable the relaxed rescue into category E
    pub use_category_e: bool,
    /// Expected number of read pairs, used to size the fingerprint table
    pub approximate_pairs: usize,
    /// Drop duplicate pairs instead of only counting them
    pub remove_duplicates: bool,
    /// Length of each of the four fingerprint windows
    pub kmer_size: usize,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            adaptor: DEFAULT_ADAPTOR.to_string(),
            strict: MatchThresholds::new(34, 18),
            relaxed: MatchThresholds::new(32, 17),
            min_length: 25,
            trim_ends: 19,
            use_category_e: false,
            approximate_pairs: 20_000_000,
            remove_duplicates: false,
            kmer_size: 11,
            logging: LoggingConfig::default(),
        }
    }
}

impl ClipConfig {
    /// Load configuration from a TOML file. Missing fields keep their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            NextClipError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| NextClipError::config(format!("TOML parse error: {}", e)))
    }

    /// Normalise and check every field. Returns the validated configuration.
    pub fn validate(mut self) -> Result<Self> {
        self.adaptor = self.adaptor.trim().to_ascii_uppercase();
        if self.adaptor.is_empty() {
            return Err(NextClipError::config("Adaptor sequence is empty"));
        }
        if let Some(base) = self.adaptor.chars().find(|c| !matches!(c, 'A' | 'C' | 'G' | 'T')) {
            return Err(NextClipError::InvalidBase {
                base,
                adaptor: self.adaptor.clone(),
            });
        }

        for (name, thresholds) in [("strict", self.strict), ("relaxed", self.relaxed)] {
            if thresholds.double == 0 || thresholds.single == 0 {
                return Err(NextClipError::config(format!(
                    "{} match thresholds must be positive, got {}",
                    name, thresholds
                )));
            }
        }

        if self.kmer_size == 0 || self.kmer_size > MAX_FINGERPRINT_KMER {
            return Err(NextClipError::config(format!(
                "fingerprint k-mer size {} is invalid (must be between 1 and {})",
                self.kmer_size, MAX_FINGERPRINT_KMER
            )));
        }
        if self.approximate_pairs == 0 {
            return Err(NextClipError::config("approximate number of reads must be positive"));
        }
        if self.approximate_pairs > MAX_APPROXIMATE_PAIRS {
            return Err(NextClipError::config(format!(
                "approximate number of reads {} is above the maximum of {}",
                self.approximate_pairs, MAX_APPROXIMATE_PAIRS
            )));
        }

        Ok(self)
    }

    /// Number of categories in use: four, or five with category E
    pub fn num_categories(&self) -> usize {
        if self.use_category_e { 5 } else { 4 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ClipConfig::default().validate().unwrap();
        assert_eq!(config.adaptor, DEFAULT_ADAPTOR);
        assert_eq!(config.strict, MatchThresholds::new(34, 18));
        assert_eq!(config.relaxed, MatchThresholds::new(32, 17));
        assert_eq!(config.num_categories(), 4);
    }

    #[test]
    fn test_threshold_parsing() {
        assert_eq!("34,18".parse::<MatchThresholds>().unwrap(), MatchThresholds::new(34, 18));
        assert_eq!(" 6, 4".parse::<MatchThresholds>().unwrap(), MatchThresholds::new(6, 4));
        assert!("34".parse::<MatchThresholds>().is_err());
        assert!("a,b".parse::<MatchThresholds>().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = ClipConfig {
            adaptor: "ACGN".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(NextClipError::InvalidBase { base: 'N', .. })));

        let config = ClipConfig {
            relaxed: MatchThresholds::new(0, 17),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ClipConfig {
            kmer_size: 17,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ClipConfig {
            approximate_pairs: usize::MAX,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(NextClipError::Config(_))));

        let config = ClipConfig {
            approximate_pairs: MAX_APPROXIMATE_PAIRS,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = ClipConfig {
            adaptor: "acgt".to_string(),
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap().adaptor, "ACGT");
    }

    #[test]
    fn test_toml_overrides() {
        let config = ClipConfig::from_toml_str(
            r#"
            adaptor = "AAAA"
            min_length = 5
            use_category_e = true
            strict = { double = 6, single = 4 }
            relaxed = { double = 5, single = 3 }

            [logging]
            level = "debug"
            "#,
        )
        .unwrap()
        .validate()
        .unwrap();

        assert_eq!(config.adaptor, "AAAA");
        assert_eq!(config.min_length, 5);
        assert_eq!(config.strict, MatchThresholds::new(6, 4));
        assert_eq!(config.relaxed, MatchThresholds::new(5, 3));
        assert_eq!(config.trim_ends, 19);
        assert_eq!(config.num_categories(), 5);
        assert_eq!(config.logging.level, crate::logging::LogLevel::Debug);
    }
}
