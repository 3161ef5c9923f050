//! Splitting a training run into segments around evaluation boundaries.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// One training invocation covering the half-open range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub start: u64,
    pub end: u64,
    /// True when the segment starts a fresh run at iteration 0.
    pub is_first_segment: bool,
    /// Run render + metrics at `end` once the segment has trained.
    pub evaluate_after: bool,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.start, self.end)
    }
}

/// Evaluation boundaries for a run resuming at `start`.
///
/// Test and save points are merged, deduplicated and clipped to `(start, total)`;
/// `total` is appended so the last boundary always reaches the target. Empty when
/// `start >= total`.
pub fn evaluation_boundaries(start: u64, total: u64, test_points: &[u64], save_points: &[u64]) -> Vec<u64> {
    if start >= total {
        return Vec::new();
    }
    let merged: BTreeSet<u64> = test_points.iter().chain(save_points).copied().collect();
    let mut boundaries: Vec<u64> = merged.into_iter().filter(|&p| start < p && p < total).collect();
    if boundaries.last().is_none_or(|&max| max < total) {
        boundaries.push(total);
    }
    boundaries
}

/// Compute the ordered training segments for a run.
///
/// Returns nothing when `start >= total`; the caller still owes a final render and
/// metrics pass in that case.
pub fn schedule(
    start: u64,
    total: u64,
    test_points: &[u64],
    save_points: &[u64],
    intermediate_eval: bool,
) -> Vec<Segment> {
    if start >= total {
        return Vec::new();
    }

    if !intermediate_eval {
        return vec![Segment { start, end: total, is_first_segment: start == 0, evaluate_after: false }];
    }

    let mut segments = Vec::new();
    let mut previous = start;
    for boundary in evaluation_boundaries(start, total, test_points, save_points) {
        if previous >= boundary {
            continue;
        }
        segments.push(Segment {
            start: previous,
            end: boundary,
            is_first_segment: previous == 0,
            evaluate_after: true,
        });
        previous = boundary;
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: u64, end: u64, evaluate_after: bool) -> Segment {
        Segment { start, end, is_first_segment: start == 0, evaluate_after }
    }

    #[test]
    fn test_default_job_splits_at_7000() {
        let segments = schedule(0, 30000, &[7000, 30000], &[7000, 30000], true);
        assert_eq!(segments, vec![seg(0, 7000, true), seg(7000, 30000, true)]);
        assert!(segments[0].is_first_segment);
        assert!(!segments[1].is_first_segment);
    }

    #[test]
    fn test_already_complete_has_no_segments() {
        assert!(schedule(30000, 30000, &[7000, 30000], &[7000, 30000], true).is_empty());
        assert!(schedule(35000, 30000, &[], &[], false).is_empty());
    }

    #[test]
    fn test_no_boundaries_once_target_reached() {
        assert!(evaluation_boundaries(30000, 30000, &[7000], &[]).is_empty());
        assert!(evaluation_boundaries(40000, 30000, &[7000, 30000], &[35000]).is_empty());
    }

    #[test]
    fn test_intermediate_eval_disabled_is_single_segment() {
        assert_eq!(schedule(0, 30000, &[7000], &[15000], false), vec![seg(0, 30000, false)]);

        let resumed = schedule(7000, 30000, &[7000], &[15000], false);
        assert_eq!(resumed, vec![seg(7000, 30000, false)]);
        assert!(!resumed[0].is_first_segment);
    }

    #[test]
    fn test_resume_skips_satisfied_points() {
        let segments = schedule(7000, 30000, &[1000, 7000, 20000], &[7000], true);
        assert_eq!(segments, vec![seg(7000, 20000, true), seg(20000, 30000, true)]);
    }

    #[test]
    fn test_points_beyond_total_are_dropped() {
        let segments = schedule(0, 10000, &[5000, 50000], &[], true);
        assert_eq!(segments, vec![seg(0, 5000, true), seg(5000, 10000, true)]);
    }

    #[test]
    fn test_empty_points_yield_one_segment_to_total() {
        assert_eq!(schedule(0, 3000, &[], &[], true), vec![seg(0, 3000, true)]);
    }

    #[test]
    fn test_boundaries_strictly_increasing_within_range() {
        let cases: [(u64, u64, &[u64], &[u64]); 5] = [
            (0, 30000, &[7000, 30000], &[7000, 30000]),
            (7000, 30000, &[7000, 7000, 100], &[29999]),
            (0, 1, &[0, 1, 2], &[]),
            (500, 1000, &[], &[]),
            (0, 100, &[10, 20, 20, 30, 100, 200], &[15, 25]),
        ];
        for (start, total, test, save) in cases {
            let boundaries = evaluation_boundaries(start, total, test, save);
            assert!(boundaries.windows(2).all(|w| w[0] < w[1]), "{boundaries:?}");
            assert!(boundaries.iter().all(|&b| start < b && b <= total), "{boundaries:?}");
            assert_eq!(boundaries.last().copied(), Some(total));

            let segments = schedule(start, total, test, save, true);
            assert_eq!(segments.first().map(|s| s.start), Some(start));
            assert_eq!(segments.last().map(|s| s.end), Some(total));
            assert!(segments.windows(2).all(|w| w[0].end == w[1].start));
            assert!(segments.iter().all(|s| s.start < s.end && s.evaluate_after));
        }
    }
}
