//! Junction location by exhaustive ungapped scanning
//!
//! The search template (adaptor followed by its reverse complement) is slid
//! across the read at every offset that leaves at least `MIN_OVERLAP` bases
//! of overlap. Each offset is scored by its exact base matches and the best
//! offset is kept. Ties keep the earliest offset found, so the lowest offset
//! wins among equal scores.

use crate::config::{ClipConfig, MatchThresholds};
use crate::error::Result;
use crate::reverse_complement;

/// Minimum number of overlapping bases between read and template
pub const MIN_OVERLAP: isize = 5;

/// Score of a read that could not be compared at any offset
pub const NO_ALIGNMENT: i32 = -1;

/// Adaptor followed by its reverse complement.
///
/// Template positions below `boundary` belong to part 0 (the adaptor), the
/// rest to part 1 (its reverse complement).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTemplate {
    sequence: Vec<u8>,
    boundary: usize,
}

impl SearchTemplate {
    /// Build the template from an adaptor made only of A, C, G and T
    pub fn from_adaptor(adaptor: &str) -> Result<Self> {
        let forward = adaptor.as_bytes();
        let mut sequence = forward.to_vec();
        sequence.extend(reverse_complement(forward)?);
        Ok(Self {
            sequence,
            boundary: forward.len(),
        })
    }

    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// First template index of part 1
    pub fn boundary(&self) -> usize {
        self.boundary
    }

    /// Which half of the template a position falls in
    #[inline]
    pub fn part(&self, position: usize) -> usize {
        usize::from(position >= self.boundary)
    }
}

/// Best-scoring placement of the template on one read
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentResult {
    /// Length of the read that was scanned
    pub read_size: usize,
    /// Number of matching bases, or `NO_ALIGNMENT`
    pub score: i32,
    /// Read index of template position 0; negative when the template starts before the read
    pub position: isize,
    pub matches: [usize; 2],
    pub mismatches: [usize; 2],
    pub alignment_length: [usize; 2],
    pub identity: [f64; 2],
    pub total_matches: usize,
    pub total_alignment_length: usize,
    pub total_identity: f64,
    /// First and last matched read index
    pub read_start: usize,
    pub read_end: usize,
    /// First and last matched template index
    pub template_start: usize,
    pub template_end: usize,
    pub accepted: bool,
}

impl AlignmentResult {
    /// Result for a read with no comparable offset
    pub fn unaligned(read_size: usize) -> Self {
        Self {
            read_size,
            score: NO_ALIGNMENT,
            position: -1,
            matches: [0; 2],
            mismatches: [0; 2],
            alignment_length: [0; 2],
            identity: [0.0; 2],
            total_matches: 0,
            total_alignment_length: 0,
            total_identity: 0.0,
            read_start: 0,
            read_end: 0,
            template_start: 0,
            template_end: 0,
            accepted: false,
        }
    }

    pub fn is_aligned(&self) -> bool {
        self.score != NO_ALIGNMENT
    }
}

/// `100 * matches / length`, with zero for an empty alignment
fn percent_identity(matches: usize, length: usize) -> f64 {
    if length == 0 {
        0.0
    } else {
        100.0 * matches as f64 / length as f64
    }
}

impl MatchThresholds {
    /// Accept when the total reaches `double` or either part reaches `single`
    pub fn accepts(&self, result: &AlignmentResult) -> bool {
        result.total_matches >= self.double
            || result.matches[0] >= self.single
            || result.matches[1] >= self.single
    }
}

/// Strict and relaxed thresholds applied to scored alignments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptancePolicy {
    pub strict: MatchThresholds,
    pub relaxed: MatchThresholds,
}

impl AcceptancePolicy {
    pub fn from_config(config: &ClipConfig) -> Self {
        Self {
            strict: config.strict,
            relaxed: config.relaxed,
        }
    }

    /// Record the strict verdict on the result
    pub fn strict_check(&self, result: &mut AlignmentResult) {
        result.accepted = self.strict.accepts(result);
    }

    /// Re-check with relaxed thresholds. Never revokes an earlier acceptance.
    pub fn relaxed_check(&self, result: &mut AlignmentResult) -> bool {
        if self.relaxed.accepts(result) {
            result.accepted = true;
        }
        result.accepted
    }
}

/// Per-offset tallies gathered during the scan
#[derive(Default)]
struct OffsetTally {
    matches: [usize; 2],
    mismatches: [usize; 2],
    span: Option<(usize, usize, usize, usize)>,
}

/// Scans reads for the junction template
#[derive(Debug, Clone)]
pub struct JunctionLocator {
    template: SearchTemplate,
    policy: AcceptancePolicy,
}

impl JunctionLocator {
    pub fn new(template: SearchTemplate, policy: AcceptancePolicy) -> Self {
        Self { template, policy }
    }

    pub fn from_config(config: &ClipConfig) -> Result<Self> {
        Ok(Self::new(
            SearchTemplate::from_adaptor(&config.adaptor)?,
            AcceptancePolicy::from_config(config),
        ))
    }

    pub fn template(&self) -> &SearchTemplate {
        &self.template
    }

    pub fn policy(&self) -> &AcceptancePolicy {
        &self.policy
    }

    fn tally(&self, read: &[u8], offset: isize) -> OffsetTally {
        let mut tally = OffsetTally::default();
        let template = self.template.sequence();
        // Only template positions that land inside the read are compared.
        let first = (-offset).max(0) as usize;
        let last = (read.len() as isize - offset).clamp(0, template.len() as isize) as usize;

        for p in first..last {
            let r = (offset + p as isize) as usize;
            let part = self.template.part(p);
            if template[p] == read[r] {
                tally.matches[part] += 1;
                tally.span = Some(match tally.span {
                    None => (r, r, p, p),
                    Some((r_start, _, t_start, _)) => (r_start, r, t_start, p),
                });
            } else {
                tally.mismatches[part] += 1;
            }
        }
        tally
    }

    /// Find the best-scoring template offset in `read` and apply the strict check.
    pub fn locate(&self, read: &[u8]) -> AlignmentResult {
        let t_length = self.template.len() as isize;
        let boundary = self.template.boundary();
        let mut result = AlignmentResult::unaligned(read.len());

        for offset in (MIN_OVERLAP - t_length)..=(read.len() as isize - MIN_OVERLAP) {
            let tally = self.tally(read, offset);
            let score = (tally.matches[0] + tally.matches[1]) as i32;
            if score <= result.score {
                continue;
            }

            let (read_start, read_end, template_start, template_end) = tally.span.unwrap_or_default();
            result.score = score;
            result.position = offset;
            result.matches = tally.matches;
            result.mismatches = tally.mismatches;
            result.read_start = read_start;
            result.read_end = read_end;
            result.template_start = template_start;
            result.template_end = template_end;
            result.total_matches = score as usize;

            if tally.span.is_some() {
                result.alignment_length = [
                    boundary.saturating_sub(template_start),
                    (template_end + 1).saturating_sub(boundary),
                ];
                result.total_alignment_length = 1 + template_end - template_start;
            } else {
                result.alignment_length = [0; 2];
                result.total_alignment_length = 0;
            }
            result.identity = [
                percent_identity(tally.matches[0], result.alignment_length[0]),
                percent_identity(tally.matches[1], result.alignment_length[1]),
            ];
            result.total_identity = percent_identity(result.total_matches, result.total_alignment_length);
            self.policy.strict_check(&mut result);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator(adaptor: &str, strict: MatchThresholds) -> JunctionLocator {
        JunctionLocator::new(
            SearchTemplate::from_adaptor(adaptor).unwrap(),
            AcceptancePolicy {
                strict,
                relaxed: strict,
            },
        )
    }

    fn aligned(matches: [usize; 2]) -> AlignmentResult {
        let mut result = AlignmentResult::unaligned(50);
        result.score = (matches[0] + matches[1]) as i32;
        result.matches = matches;
        result.total_matches = matches[0] + matches[1];
        result
    }

    #[test]
    fn test_template_construction() {
        let template = SearchTemplate::from_adaptor("CTGTCTCTTATACACATCT").unwrap();
        assert_eq!(template.sequence(), b"CTGTCTCTTATACACATCTAGATGTGTATAAGAGACAG");
        assert_eq!(template.boundary(), 19);
        assert_eq!(template.part(18), 0);
        assert_eq!(template.part(19), 1);
    }

    #[test]
    fn test_exact_junction_in_middle() {
        let locator = locator("AAAA", MatchThresholds::new(6, 4));
        let result = locator.locate(b"GGAAAATTTTGG");

        assert_eq!(result.position, 2);
        assert_eq!(result.score, 8);
        assert_eq!(result.matches, [4, 4]);
        assert_eq!(result.mismatches, [0, 0]);
        assert_eq!(result.total_matches, 8);
        assert_eq!(result.total_alignment_length, 8);
        assert_eq!(result.alignment_length, [4, 4]);
        assert_eq!(result.total_identity, 100.0);
        assert_eq!(result.identity, [100.0, 100.0]);
        assert_eq!((result.read_start, result.read_end), (2, 9));
        assert_eq!((result.template_start, result.template_end), (0, 7));
        assert!(result.accepted);
    }

    #[test]
    fn test_ties_keep_lowest_offset() {
        // Offsets -3 through 4 all score four matches; the earliest one wins.
        let locator = locator("AAAA", MatchThresholds::new(100, 100));
        let read = b"TTTTTTTTTTTT";
        let first = locator.locate(read);
        let second = locator.locate(read);
        assert_eq!(first, second);
        assert_eq!(first.score, 4);
        assert_eq!(first.position, -3);
        assert_eq!(first.matches, [0, 4]);
        assert_eq!((first.read_start, first.read_end), (1, 4));
        assert_eq!(first.alignment_length, [0, 4]);
        assert!(!first.accepted);
    }

    #[test]
    fn test_template_overhanging_read_start() {
        // Only the reverse-complement half is present at the read start.
        let locator = locator("CTGTCTCTTATACACATCT", MatchThresholds::new(34, 18));
        let read = b"AGATGTGTATAAGAGACAGGCCGCCGGCCGCGCGCCGGCCGCCGGCG";
        let result = locator.locate(read);

        assert_eq!(result.position, -19);
        assert_eq!(result.matches, [0, 19]);
        assert_eq!(result.alignment_length, [0, 19]);
        assert_eq!(result.identity, [0.0, 100.0]);
        assert_eq!(result.read_start, 0);
        assert!(result.accepted);
    }

    #[test]
    fn test_single_match_has_unit_length() {
        let locator = locator("AAAA", MatchThresholds::new(6, 4));
        let result = locator.locate(b"CCCCCCTCCCCC");
        assert_eq!(result.total_matches, 1);
        assert_eq!(result.total_alignment_length, 1);
        assert_eq!(result.total_identity, 100.0);
        assert!(result.identity.iter().all(|&i| (0.0..=100.0).contains(&i)));
    }

    #[test]
    fn test_read_too_short_to_scan() {
        let locator = locator("AAAA", MatchThresholds::new(6, 4));
        let result = locator.locate(b"");
        assert!(!result.is_aligned());
        assert_eq!(result.score, NO_ALIGNMENT);
        assert_eq!(result.total_matches, 0);
        assert!(!result.accepted);
    }

    #[test]
    fn test_no_match_offsets_score_zero() {
        let locator = locator("AAAA", MatchThresholds::new(6, 4));
        let result = locator.locate(b"CCCCCCCCCC");
        assert!(result.is_aligned());
        assert_eq!(result.score, 0);
        assert_eq!(result.total_alignment_length, 0);
        assert_eq!(result.total_identity, 0.0);
    }

    #[test]
    fn test_acceptance_boundaries() {
        let thresholds = MatchThresholds::new(34, 18);
        assert!(thresholds.accepts(&aligned([17, 17])));
        assert!(!thresholds.accepts(&aligned([17, 16])));
        assert!(thresholds.accepts(&aligned([18, 0])));
        assert!(thresholds.accepts(&aligned([0, 18])));
        assert!(!thresholds.accepts(&aligned([17, 0])));
    }

    #[test]
    fn test_relaxed_check_rescues() {
        let policy = AcceptancePolicy {
            strict: MatchThresholds::new(34, 18),
            relaxed: MatchThresholds::new(32, 17),
        };
        let mut result = aligned([17, 0]);
        policy.strict_check(&mut result);
        assert!(!result.accepted);
        assert!(policy.relaxed_check(&mut result));
        assert!(result.accepted);

        let mut result = aligned([16, 15]);
        assert!(!policy.relaxed_check(&mut result));
    }
}
