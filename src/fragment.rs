//! The fragment/timekeeping engine: tracks which runs of data records
//! share a contiguous linear time base, and validates contiguity against
//! the declared file type.

use crate::error::EdfError;

/// Gaps smaller than this are treated as floating-point noise around an
/// otherwise contiguous boundary.
pub const CONTIGUITY_TOLERANCE_SECONDS: f64 = 1e-3;

/// A maximal run of contiguous data records sharing a linear time base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub start_record_index: usize,
    pub end_record_index: usize,
    pub start_time: f64,
    pub data_record_length: f64,
}

impl Fragment {
    pub fn duration(&self) -> f64 {
        (self.end_record_index - self.start_record_index + 1) as f64 * self.data_record_length
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration()
    }

    /// Expected start time of the record at `record_index`, assuming it
    /// falls within this fragment's contiguous run.
    pub fn expected_start_time(&self, record_index: usize) -> f64 {
        self.start_time + (record_index - self.start_record_index) as f64 * self.data_record_length
    }
}

/// The sorted, non-overlapping set of fragments covering
/// `[0, number_of_data_records)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    fragments: Vec<Fragment>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Processes one record's recorded start time against the fragment
    /// engine's expectation, per the decision table in the file
    /// orchestrator's read contract. `allows_gaps` is true only for
    /// EDF+D; `has_standard_signals` and `duration` gate whether a gap
    /// is a hard contiguity failure or an accepted annotations-only
    /// time reset.
    pub fn observe_record(
        &mut self,
        record_index: usize,
        recorded_start_time: f64,
        allows_gaps: bool,
        has_standard_signals: bool,
        duration_of_data_record: f64,
    ) -> Result<(), EdfError> {
        if self.fragments.is_empty() {
            self.fragments.push(Fragment {
                start_record_index: record_index,
                end_record_index: record_index,
                start_time: recorded_start_time,
                data_record_length: duration_of_data_record,
            });
            return Ok(());
        }

        let current = self.fragments.last_mut().unwrap();
        let expected = current.expected_start_time(record_index);
        let gap = recorded_start_time - expected;

        if gap.abs() < CONTIGUITY_TOLERANCE_SECONDS {
            current.end_record_index = record_index;
            return Ok(());
        }

        if gap < 0.0 {
            return Err(EdfError::Order { record_index });
        }

        if allows_gaps {
            self.fragments.push(Fragment {
                start_record_index: record_index,
                end_record_index: record_index,
                start_time: recorded_start_time,
                data_record_length: duration_of_data_record,
            });
            return Ok(());
        }

        if has_standard_signals && duration_of_data_record > 0.0 {
            return Err(EdfError::Contiguity { record_index, gap_seconds: gap });
        }

        // Annotations-only time reset: accepted, recorded as a new fragment.
        self.fragments.push(Fragment {
            start_record_index: record_index,
            end_record_index: record_index,
            start_time: recorded_start_time,
            data_record_length: duration_of_data_record,
        });
        Ok(())
    }

    /// `data_record_start_time` for the record about to be written at
    /// `record_index`, consulting the fragment covering that index.
    pub fn data_record_start_time(&self, record_index: usize) -> f64 {
        self.fragment_covering(record_index)
            .map(|f| f.expected_start_time(record_index))
            .unwrap_or(record_index as f64 * self.fragments.first().map(|f| f.data_record_length).unwrap_or(0.0))
    }

    fn fragment_covering(&self, record_index: usize) -> Option<&Fragment> {
        self.fragments
            .iter()
            .rev()
            .find(|f| f.start_record_index <= record_index)
    }

    /// Creates or updates a fragment so the record at `data_record_index`
    /// begins at `start_time`. If `start_time > 0` and no fragment yet
    /// exists at index 0, a fragment starting at 0 is inserted first.
    pub fn mark_fragment(&mut self, data_record_index: usize, start_time: f64, data_record_length: f64) {
        if start_time > 0.0 && !self.fragments.iter().any(|f| f.start_record_index == 0) {
            self.fragments.push(Fragment {
                start_record_index: 0,
                end_record_index: 0,
                start_time: 0.0,
                data_record_length,
            });
        }

        if let Some(existing) = self
            .fragments
            .iter_mut()
            .find(|f| f.start_record_index == data_record_index)
        {
            existing.start_time = start_time;
            existing.data_record_length = data_record_length;
        } else {
            self.fragments.push(Fragment {
                start_record_index: data_record_index,
                end_record_index: data_record_index,
                start_time,
                data_record_length,
            });
        }

        self.sort_and_recompute_ends(usize::MAX);
    }

    /// Re-sorts fragments by start index and recomputes each one's
    /// `end_record_index` from the next fragment's start (or
    /// `total_records - 1` for the last one).
    pub fn recompute_end_indices(&mut self, total_records: usize) {
        self.sort_and_recompute_ends(total_records);
    }

    fn sort_and_recompute_ends(&mut self, total_records: usize) {
        self.fragments.sort_by_key(|f| f.start_record_index);
        let starts: Vec<usize> = self.fragments.iter().map(|f| f.start_record_index).collect();
        for (i, fragment) in self.fragments.iter_mut().enumerate() {
            fragment.end_record_index = starts
                .get(i + 1)
                .map(|next| next.saturating_sub(1))
                .unwrap_or(total_records.saturating_sub(1).max(fragment.start_record_index));
        }
    }

    /// True for plain EDF and EDF+C: every record must belong to the
    /// single implicit fragment with no gaps.
    pub fn is_contiguous(&self) -> bool {
        self.fragments.len() <= 1
    }

    pub fn push_raw(&mut self, fragment: Fragment) {
        self.fragments.push(fragment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_contiguous_run_stays_one_fragment() {
        let mut timeline = Timeline::new();
        timeline.observe_record(0, 0.0, false, true, 1.0).unwrap();
        timeline.observe_record(1, 1.0, false, true, 1.0).unwrap();
        assert_eq!(timeline.fragments().len(), 1);
        assert!(timeline.is_contiguous());
    }

    #[test]
    fn edf_plus_d_gap_opens_new_fragment() {
        let mut timeline = Timeline::new();
        timeline.observe_record(0, 0.0, true, true, 1.0).unwrap();
        timeline.observe_record(1, 1.5, true, true, 1.0).unwrap();
        timeline.recompute_end_indices(2);
        assert_eq!(timeline.fragments().len(), 2);
        assert_eq!(timeline.fragments()[0].start_time, 0.0);
        assert_eq!(timeline.fragments()[1].start_time, 1.5);
    }

    #[test]
    fn gap_without_discontinuous_support_is_contiguity_error() {
        let mut timeline = Timeline::new();
        timeline.observe_record(0, 0.0, false, true, 1.0).unwrap();
        let err = timeline.observe_record(1, 1.5, false, true, 1.0).unwrap_err();
        match err {
            EdfError::Contiguity { record_index, gap_seconds } => {
                assert_eq!(record_index, 1);
                assert!((gap_seconds - 0.5).abs() < 1e-9);
            }
            other => panic!("expected Contiguity, got {other:?}"),
        }
    }

    #[test]
    fn order_violation_is_rejected() {
        let mut timeline = Timeline::new();
        timeline.observe_record(0, 2.0, false, true, 1.0).unwrap();
        let err = timeline.observe_record(1, 1.0, false, true, 1.0).unwrap_err();
        assert!(matches!(err, EdfError::Order { record_index: 1 }));
    }

    #[test]
    fn mark_fragment_inserts_leading_zero_fragment() {
        let mut timeline = Timeline::new();
        timeline.mark_fragment(5, 12.0, 1.0);
        timeline.recompute_end_indices(6);
        assert_eq!(timeline.fragments().len(), 2);
        assert_eq!(timeline.fragments()[0].start_record_index, 0);
        assert_eq!(timeline.fragments()[1].start_record_index, 5);
        assert_eq!(timeline.fragments()[1].start_time, 12.0);
    }
}
