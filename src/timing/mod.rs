pub mod source;

pub use source::{AudioTimingSource, JsonTimingSource, SuraTimings};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ReelError, Result};
use crate::layout::Line;

/// One reciter-timed word: `(mark, start_ms, end_ms)`. Stored on disk as a
/// three-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(u32, u64, u64)", into = "(u32, u64, u64)")]
pub struct Segment {
    pub mark: u32,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl Segment {
    pub fn new(mark: u32, start_ms: u64, end_ms: u64) -> Self {
        Self {
            mark,
            start_ms,
            end_ms,
        }
    }
}

impl From<(u32, u64, u64)> for Segment {
    fn from((mark, start_ms, end_ms): (u32, u64, u64)) -> Self {
        Self::new(mark, start_ms, end_ms)
    }
}

impl From<Segment> for (u32, u64, u64) {
    fn from(s: Segment) -> Self {
        (s.mark, s.start_ms, s.end_ms)
    }
}

/// A word position with repetitions collapsed into one interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedSegment {
    pub mark: u32,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// Timing data for one verse, in milliseconds of the sura's audio file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseTiming {
    #[serde(default)]
    pub segments: Vec<Segment>,
    pub timestamp_from: u64,
    pub timestamp_to: u64,
}

/// An absolute `[start, end]` interval in milliseconds, `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl TimeWindow {
    /// Build a window, widening a degenerate one to a single millisecond.
    pub fn new(start_ms: u64, end_ms: u64) -> Self {
        if end_ms <= start_ms {
            warn!("Degenerate time window {start_ms}..{end_ms}ms, widening to 1ms");
            return Self {
                start_ms,
                end_ms: start_ms + 1,
            };
        }
        Self { start_ms, end_ms }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }
}

/// Collapse reciter repetitions into a monotonic timeline.
///
/// A segment whose mark does not move past the previous entry's mark is a
/// restatement of an earlier word: the previous entry is extended to end
/// where the restatement ends. Segments that start no later than the
/// previous entry are folded in the same way so that start times stay
/// strictly increasing.
pub fn merge_segments(segments: &[Segment]) -> Vec<MergedSegment> {
    let mut merged: Vec<MergedSegment> = Vec::with_capacity(segments.len());

    for segment in segments {
        match merged.last_mut() {
            Some(last) if last.mark >= segment.mark || segment.start_ms <= last.start_ms => {
                last.end_ms = segment.end_ms.max(last.start_ms);
            }
            _ => merged.push(MergedSegment {
                mark: segment.mark,
                start_ms: segment.start_ms,
                end_ms: segment.end_ms.max(segment.start_ms),
            }),
        }
    }

    merged
}

/// Time window covered by a line's words.
///
/// Word indices past the end of the timing data clamp to the last merged
/// segment; verse-end markers usually carry no timing of their own.
pub fn window_for(line: &Line, merged: &[MergedSegment]) -> Option<TimeWindow> {
    let last = merged.last()?;
    let start_ms = merged
        .get(line.word_start)
        .map(|s| s.start_ms)
        .unwrap_or(last.start_ms);
    let end_ms = merged
        .get(line.word_end)
        .map(|s| s.end_ms)
        .unwrap_or(last.end_ms);

    Some(TimeWindow::new(start_ms, end_ms))
}

/// [`window_for`] for a specific verse, failing when it has no timing at all.
pub fn verse_window_for(
    line: &Line,
    merged: &[MergedSegment],
    sura: u32,
    ayah: u32,
) -> Result<TimeWindow> {
    window_for(line, merged).ok_or(ReelError::TimingDataMissing { sura, ayah })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(word_start: usize, word_end: usize) -> Line {
        Line {
            word_start,
            word_end,
            text: String::new(),
        }
    }

    #[test]
    fn test_merge_repeated_mark() {
        let segments = vec![
            Segment::new(0, 100, 200),
            Segment::new(0, 150, 300),
            Segment::new(1, 300, 400),
        ];
        let merged = merge_segments(&segments);
        assert_eq!(
            merged,
            vec![
                MergedSegment { mark: 0, start_ms: 100, end_ms: 300 },
                MergedSegment { mark: 1, start_ms: 300, end_ms: 400 },
            ]
        );
    }

    #[test]
    fn test_merge_reciter_goes_back() {
        // Reciter reads words 1, 2, 3, then restarts from word 2.
        let segments = vec![
            Segment::new(1, 0, 500),
            Segment::new(2, 500, 900),
            Segment::new(3, 900, 1400),
            Segment::new(2, 1500, 1900),
            Segment::new(3, 1900, 2400),
            Segment::new(4, 2400, 3000),
        ];
        let merged = merge_segments(&segments);
        assert_eq!(merged.len(), 4);
        assert_eq!(merged[2], MergedSegment { mark: 3, start_ms: 900, end_ms: 2400 });
        assert_eq!(merged[3].start_ms, 2400);
    }

    #[test]
    fn test_merge_is_monotonic() {
        let segments = vec![
            Segment::new(1, 500, 600),
            Segment::new(2, 100, 200),
            Segment::new(3, 700, 650),
            Segment::new(4, 800, 900),
            Segment::new(4, 850, 1000),
        ];
        let merged = merge_segments(&segments);
        for pair in merged.windows(2) {
            assert!(pair[1].start_ms > pair[0].start_ms);
        }
        for s in &merged {
            assert!(s.end_ms >= s.start_ms);
        }
    }

    #[test]
    fn test_zero_length_word_folds_into_next() {
        // Word 2 has no duration; word 3 starts at the same instant and is
        // folded into it so start times keep strictly increasing.
        let merged = merge_segments(&[
            Segment::new(1, 0, 400),
            Segment::new(2, 400, 400),
            Segment::new(3, 400, 800),
            Segment::new(4, 800, 1200),
        ]);
        assert_eq!(
            merged,
            vec![
                MergedSegment { mark: 1, start_ms: 0, end_ms: 400 },
                MergedSegment { mark: 2, start_ms: 400, end_ms: 800 },
                MergedSegment { mark: 4, start_ms: 800, end_ms: 1200 },
            ]
        );
        // Later word indices shift down by one; the last line clamps.
        assert_eq!(
            window_for(&line(2, 3), &merged),
            Some(TimeWindow { start_ms: 800, end_ms: 1200 })
        );
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_segments(&[]).is_empty());
    }

    #[test]
    fn test_window_for_line() {
        let merged = merge_segments(&[
            Segment::new(1, 0, 400),
            Segment::new(2, 400, 800),
            Segment::new(3, 800, 1200),
        ]);
        assert_eq!(
            window_for(&line(0, 1), &merged),
            Some(TimeWindow { start_ms: 0, end_ms: 800 })
        );
        assert_eq!(
            window_for(&line(2, 2), &merged),
            Some(TimeWindow { start_ms: 800, end_ms: 1200 })
        );
    }

    #[test]
    fn test_window_clamps_past_timing_data() {
        let merged = merge_segments(&[Segment::new(1, 0, 400), Segment::new(2, 400, 800)]);
        assert_eq!(
            window_for(&line(1, 2), &merged),
            Some(TimeWindow { start_ms: 400, end_ms: 800 })
        );
        assert_eq!(
            window_for(&line(1, 50), &merged),
            Some(TimeWindow { start_ms: 400, end_ms: 800 })
        );
    }

    #[test]
    fn test_window_without_timing() {
        assert_eq!(window_for(&line(0, 0), &[]), None);
        assert!(matches!(
            verse_window_for(&line(0, 0), &[], 2, 255),
            Err(ReelError::TimingDataMissing { sura: 2, ayah: 255 })
        ));
    }

    #[test]
    fn test_degenerate_window_is_widened() {
        let window = TimeWindow::new(500, 500);
        assert_eq!(window.start_ms, 500);
        assert_eq!(window.end_ms, 501);
        assert_eq!(window.duration_ms(), 1);
    }

    #[test]
    fn test_verse_timing_from_json() {
        let timing: VerseTiming = serde_json::from_str(
            r#"{"verse_key":"1:1","timestamp_from":0,"timestamp_to":6493,
                "duration":6493,"segments":[[1,0,630],[2,630,1840]]}"#,
        )
        .unwrap();
        assert_eq!(timing.segments.len(), 2);
        assert_eq!(timing.segments[1], Segment::new(2, 630, 1840));
        assert_eq!(timing.timestamp_to, 6493);
    }
}
