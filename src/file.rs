//! The file orchestrator: streams a complete EDF/EDF+ file in a single
//! pass over `read`/`write`, owns the decoded `Signal` list, and tracks
//! the fragment timeline that record contiguity is checked against.

use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use chrono::{Duration, NaiveDateTime};

use crate::error::EdfError;
use crate::fragment::{Fragment, Timeline, CONTIGUITY_TOLERANCE_SECONDS};
use crate::headers::file_header::{FileHeader, FileType, RECORD_COUNT_OFFSET};
use crate::headers::signal_header::SignalAttributes;
use crate::record::{self, WriteCursors};
use crate::signal::{AnnotationSignal, Signal};
use crate::tal::AnnotationRecord;

/// A decoded EDF/EDF+ file: header, signals (standard ones first, then
/// annotation ones), and the fragment timeline observed while reading or
/// built up while editing.
#[derive(Debug, Clone)]
pub struct EdfFile {
    pub header: FileHeader,
    pub signals: Vec<Signal>,
    timeline: Timeline,
    warnings: Vec<String>,
}

impl Default for EdfFile {
    fn default() -> Self {
        Self {
            header: FileHeader::new(),
            signals: Vec::new(),
            timeline: Timeline::new(),
            warnings: Vec::new(),
        }
    }
}

impl EdfFile {
    pub fn new() -> Self {
        Self::default()
    }

    fn start_datetime(&self) -> NaiveDateTime {
        NaiveDateTime::new(self.header.start_date, self.header.start_time)
    }

    /// Non-fatal observations made while reading (an EDF+C timekeeping
    /// drift, or an annotations-only file whose timekeeping TAL carries no
    /// defining event).
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// The contiguous runs of data records observed while reading, or
    /// built up while editing. A plain EDF/EDF+C file has at most one.
    pub fn fragments(&self) -> &[Fragment] {
        self.timeline.fragments()
    }

    /// Reads a complete file: the header, then data records until
    /// `number_of_data_records` is exhausted (or, if that field was the
    /// `-1` streaming sentinel, until EOF).
    ///
    /// Records are decoded in the header's original per-index signal
    /// order, since that's the order bytes appear on disk; once decoding
    /// completes the signals are partitioned into standard-then-annotation
    /// order, matching the order `FileHeader::update_signal_fields` and
    /// the write-time record loop expect.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self, EdfError> {
        let header = FileHeader::read(reader)?;
        reader.seek(SeekFrom::Start(header.header_record_size() as u64))?;

        let mut physical_order = header.allocate_signals(header.number_of_data_records);
        let has_standard_signals = physical_order.iter().any(|s| !s.is_annotation());
        let duration = header.duration_of_data_record;
        let allows_gaps = header.file_type.allows_gaps();
        let is_edf_plus_continuous = header.file_type == FileType::EdfPlusContinuous;

        let mut timeline = Timeline::new();
        let mut warnings = Vec::new();
        let mut record_index = 0usize;
        let mut warned_missing_event = false;

        loop {
            if let Some(total) = header.number_of_data_records {
                if record_index >= total {
                    break;
                }
            }

            let offset = reader.stream_position()?;
            let recorded = match record::decode_record(reader, &mut physical_order, offset) {
                Ok(value) => value,
                Err(EdfError::Io(ref io_err))
                    if header.number_of_data_records.is_none()
                        && io_err.kind() == ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => return Err(e),
            };

            let start_time = recorded.unwrap_or(record_index as f64 * duration);

            if is_edf_plus_continuous {
                if let Some(onset) = recorded {
                    let expected = record_index as f64 * duration;
                    let drift = (onset - expected).abs();
                    if drift > 0.0 && drift < CONTIGUITY_TOLERANCE_SECONDS {
                        warnings.push(format!(
                            "record {record_index}: timekeeping onset drifts {drift:.6}s from the computed start"
                        ));
                    }
                }
            }

            if !has_standard_signals && !warned_missing_event {
                if let Some(last) = physical_order
                    .iter()
                    .find_map(|s| s.as_annotation())
                    .and_then(|ann| ann.records.last())
                {
                    if last.is_timekeeping && last.descriptions.is_empty() {
                        warnings.push(
                            "annotations-only file: timekeeping TAL carries no defining event".to_string(),
                        );
                        warned_missing_event = true;
                    }
                }
            }

            timeline.observe_record(record_index, start_time, allows_gaps, has_standard_signals, duration)?;
            record_index += 1;
        }

        timeline.recompute_end_indices(record_index);

        let (standard, annotation): (Vec<Signal>, Vec<Signal>) =
            physical_order.into_iter().partition(|s| !s.is_annotation());
        let signals: Vec<Signal> = standard.into_iter().chain(annotation).collect();

        let mut header = header;
        header.number_of_data_records = Some(record_index);

        Ok(EdfFile {
            header,
            signals,
            timeline,
            warnings,
        })
    }

    /// Streams the header and every data record to `writer` in a single
    /// pass: the header is written with a `0` record-count placeholder,
    /// then patched in place once the true count is known.
    ///
    /// `signals` is assumed already in standard-then-annotation order;
    /// synthesized timekeeping TALs are regenerated from the fragment
    /// timeline rather than carried over from a prior read.
    pub fn write<W: Write + Seek>(&mut self, writer: &mut W) -> Result<(), EdfError> {
        for signal in &mut self.signals {
            if let Signal::Annotation(ann) = signal {
                ann.records.retain(|r| !r.is_timekeeping);
            }
        }

        if self.header.file_type.is_edf_plus() && !self.signals.iter().any(|s| s.is_annotation()) {
            self.signals.push(Signal::Annotation(AnnotationSignal::new(
                SignalAttributes::new_annotation(8),
            )));
        }

        if !self.header.file_type.allows_gaps() && !self.timeline.is_contiguous() {
            let fragments = self.timeline.fragments();
            let offender = fragments.get(1);
            let record_index = offender.map(|f| f.start_record_index).unwrap_or(0);
            let gap_seconds = match (fragments.first(), offender) {
                (Some(prev), Some(cur)) => cur.start_time - prev.end_time(),
                _ => 0.0,
            };
            return Err(EdfError::Contiguity { record_index, gap_seconds });
        }

        let has_standard = self.signals.iter().any(|s| !s.is_annotation());
        let has_annotation = self.signals.iter().any(|s| s.is_annotation());

        self.header.update_signal_fields(&self.signals);
        self.header.number_of_data_records = Some(0);

        let start_pos = writer.stream_position()?;
        self.header.write(writer)?;

        let mut cursors = WriteCursors::for_signals(&self.signals);
        let mut record_index = 0usize;

        loop {
            if cursors.is_drained(&self.signals) {
                break;
            }
            if has_standard
                && has_annotation
                && cursors.standard_drained(&self.signals)
                && cursors.annotation_pending(&self.signals)
            {
                return Err(EdfError::Overflow);
            }

            let record_start_time = self.timeline.data_record_start_time(record_index);
            record::encode_record(writer, &self.signals, &mut cursors, record_start_time)?;
            record_index += 1;
        }

        self.header.number_of_data_records = Some(record_index);
        let end_pos = writer.stream_position()?;
        writer.seek(SeekFrom::Start(start_pos + RECORD_COUNT_OFFSET))?;
        writer.write_all(crate::headers::field::pad_ascii(&record_index.to_string(), 8).as_bytes())?;
        writer.seek(SeekFrom::Start(end_pos))?;

        Ok(())
    }

    /// Appends `other`'s data records after this file's, offsetting its
    /// onsets by the wall-clock gap between the two recordings' start
    /// times. Promotes this file to EDF+D if that gap isn't a seamless
    /// continuation of the current record cadence. Fails with
    /// `IncompatibleHeader` if the headers don't line up or `other` starts
    /// before this file's current end time (`calculate_end_time`), which
    /// already accounts for any fragments already present.
    pub fn append(&mut self, other: &EdfFile) -> Result<(), EdfError> {
        if !self.header.is_compatible_with(&other.header) {
            return Err(EdfError::IncompatibleHeader);
        }

        if other.start_datetime() < self.calculate_end_time() {
            return Err(EdfError::IncompatibleHeader);
        }

        let offset_seconds = (other.start_datetime() - self.start_datetime()).num_milliseconds() as f64 / 1000.0;

        let base_records = self.header.number_of_data_records.unwrap_or(0);
        let duration = self.header.duration_of_data_record;
        let expected_seconds =
            (self.calculate_end_time() - self.start_datetime()).num_milliseconds() as f64 / 1000.0;
        if (offset_seconds - expected_seconds).abs() >= CONTIGUITY_TOLERANCE_SECONDS {
            self.header.file_type = FileType::EdfPlusDiscontinuous;
        }

        self.timeline.mark_fragment(base_records, offset_seconds, duration);

        let mut other_standard = other.signals.iter().filter_map(|s| s.as_standard());
        for signal in self.signals.iter_mut().filter(|s| !s.is_annotation()) {
            if let (Signal::Standard(mine), Some(theirs)) = (signal, other_standard.next()) {
                mine.samples.extend_from_slice(&theirs.samples);
            }
        }

        let merged_records: Vec<AnnotationRecord> = other
            .signals
            .iter()
            .filter_map(|s| s.as_annotation())
            .flat_map(|a| a.user_records())
            .cloned()
            .map(|mut r| {
                r.onset += offset_seconds;
                r
            })
            .collect();

        if let Some(Signal::Annotation(first_annotation)) =
            self.signals.iter_mut().find(|s| s.is_annotation())
        {
            first_annotation.records.extend(merged_records);
        }

        let total_records = base_records + other.header.number_of_data_records.unwrap_or(0);
        self.header.number_of_data_records = Some(total_records);
        self.timeline.recompute_end_indices(total_records);

        Ok(())
    }

    /// Looks up a standard signal by label, or the annotation signal if
    /// `label` is `"EDF Annotations"`.
    pub fn get_signal_by_name(&self, label: &str, ignore_case: bool) -> Option<&Signal> {
        let matches = |candidate: &str| {
            if ignore_case {
                candidate.eq_ignore_ascii_case(label)
            } else {
                candidate == label
            }
        };
        self.signals.iter().find(|s| matches(s.label()))
    }

    /// Wall-clock end time: the start time plus the last fragment's end
    /// offset, or `number_of_data_records * duration` if no fragment was
    /// ever observed.
    pub fn calculate_end_time(&self) -> NaiveDateTime {
        let seconds = self
            .timeline
            .fragments()
            .last()
            .map(|f| f.end_time())
            .unwrap_or_else(|| {
                self.header.number_of_data_records.unwrap_or(0) as f64 * self.header.duration_of_data_record
            });
        self.start_datetime() + Duration::milliseconds((seconds * 1000.0).round() as i64)
    }

    /// Marks the data record at `data_record_index` as the start of a new
    /// fragment beginning at `start_time` seconds from the file's start,
    /// inserting a leading fragment at record 0 if one doesn't already
    /// exist.
    pub fn mark_fragment(&mut self, data_record_index: usize, start_time: f64) {
        self.timeline
            .mark_fragment(data_record_index, start_time, self.header.duration_of_data_record);
        let total = self
            .header
            .number_of_data_records
            .unwrap_or(data_record_index + 1)
            .max(data_record_index + 1);
        self.timeline.recompute_end_indices(total);
    }
}
