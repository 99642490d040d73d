use nextclip::config::{ClipConfig, MatchThresholds};
use nextclip::error::NextClipError;
use nextclip::logging::LogLevel;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_partial_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
adaptor = "ctgtctcttatacacatct"
trim_ends = 0
remove_duplicates = true
relaxed = {{ double = 30, single = 16 }}

[logging]
level = "warn"
"#
    )
    .unwrap();
    file.flush().unwrap();

    let config = ClipConfig::load_from_file(file.path()).unwrap().validate().unwrap();
    assert_eq!(config.adaptor, "CTGTCTCTTATACACATCT");
    assert_eq!(config.trim_ends, 0);
    assert!(config.remove_duplicates);
    assert_eq!(config.relaxed, MatchThresholds::new(30, 16));
    assert_eq!(config.strict, MatchThresholds::new(34, 18));
    assert_eq!(config.min_length, 25);
    assert_eq!(config.logging.level, LogLevel::Warn);
}

#[test]
fn test_bad_config_files() {
    let err = ClipConfig::load_from_file("/nonexistent/nextclip.toml").unwrap_err();
    assert!(matches!(err, NextClipError::Config(_)));

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "min_length = \"long\"").unwrap();
    file.flush().unwrap();
    let err = ClipConfig::load_from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("TOML parse error"));
}
