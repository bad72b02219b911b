//! The fixed 256-byte prelude plus the ten per-signal arrays.

use std::io::{Read, Seek, SeekFrom, Write};

use chrono::{NaiveDate, NaiveTime};

use crate::error::EdfError;
use crate::headers::field::{self, DateTimeField};
use crate::headers::patient::{self, PatientId};
use crate::headers::recording::{self, RecordingId};
use crate::headers::signal_header::{self, SignalAttributes};
use crate::signal::{AnnotationSignal, Signal, StandardSignal};

/// Byte offset of the number-of-data-records field, patched in place once
/// the true count is known at the end of a write pass.
pub const RECORD_COUNT_OFFSET: u64 = 236;

const VERSION_WIDTH: usize = 8;
const DATE_WIDTH: usize = 8;
const TIME_WIDTH: usize = 8;
const HEADER_SIZE_WIDTH: usize = 8;
const RESERVED_WIDTH: usize = 44;
const RECORD_COUNT_WIDTH: usize = 8;
const RECORD_DURATION_WIDTH: usize = 8;
const SIGNAL_COUNT_WIDTH: usize = 4;

const PRELUDE_SIZE: u64 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Edf,
    EdfPlusContinuous,
    EdfPlusDiscontinuous,
}

impl FileType {
    pub fn is_edf_plus(&self) -> bool {
        !matches!(self, FileType::Edf)
    }

    /// EDF+D is the only file type allowed to contain non-contiguous
    /// data records.
    pub fn allows_gaps(&self) -> bool {
        matches!(self, FileType::EdfPlusDiscontinuous)
    }

    fn reserved_text(&self) -> &'static str {
        match self {
            FileType::Edf => "",
            FileType::EdfPlusContinuous => "EDF+C",
            FileType::EdfPlusDiscontinuous => "EDF+D",
        }
    }

    fn from_reserved(reserved: &str) -> Self {
        if reserved.starts_with("EDF+D") {
            FileType::EdfPlusDiscontinuous
        } else if reserved.starts_with("EDF+C") {
            FileType::EdfPlusContinuous
        } else {
            FileType::Edf
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    pub version: String,
    pub patient_id: PatientId,
    pub recording_id: RecordingId,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub file_type: FileType,
    /// `None` mirrors the on-disk `-1` sentinel written while streaming.
    pub number_of_data_records: Option<usize>,
    pub duration_of_data_record: f64,
    pub signals: Vec<SignalAttributes>,
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            version: "0".to_string(),
            patient_id: PatientId::new(),
            recording_id: RecordingId::new(),
            start_date: NaiveDate::from_ymd_opt(1985, 1, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            file_type: FileType::Edf,
            number_of_data_records: None,
            duration_of_data_record: 1.0,
            signals: Vec::new(),
        }
    }
}

impl FileHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total header size in bytes: `256 * (1 + N)`.
    pub fn header_record_size(&self) -> usize {
        PRELUDE_SIZE as usize * (1 + self.signals.len())
    }

    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self, EdfError> {
        reader.seek(SeekFrom::Start(0))?;

        let version = read_ascii(reader, VERSION_WIDTH)?.trim().to_string();
        let patient_id = PatientId::deserialize(read_ascii(reader, patient::WIDTH)?.trim())?;
        let recording_id = RecordingId::deserialize(read_ascii(reader, recording::WIDTH)?.trim())?;

        let date_offset = VERSION_WIDTH as u64 + patient::WIDTH as u64 + recording::WIDTH as u64;
        let date_field = DateTimeField::new();
        let start_date_raw = read_ascii(reader, DATE_WIDTH)?;
        let start_date = date_field.parse_date(&start_date_raw, date_offset)?;
        let start_time_raw = read_ascii(reader, TIME_WIDTH)?;
        let start_time = date_field.parse_time(&start_time_raw, date_offset + DATE_WIDTH as u64)?;

        let header_size_offset = date_offset + DATE_WIDTH as u64 + TIME_WIDTH as u64;
        let header_size_raw = read_ascii(reader, HEADER_SIZE_WIDTH)?;
        let _header_size = field::parse_integer(&header_size_raw, "header_record_size", header_size_offset)?;

        let reserved_offset = header_size_offset + HEADER_SIZE_WIDTH as u64;
        let reserved_raw = read_ascii(reader, RESERVED_WIDTH)?;
        let file_type = FileType::from_reserved(reserved_raw.trim_end());

        reader.seek(SeekFrom::Start(RECORD_COUNT_OFFSET))?;
        let record_count_raw = read_ascii(reader, RECORD_COUNT_WIDTH)?;
        let record_count = field::parse_integer(&record_count_raw, "number_of_data_records", RECORD_COUNT_OFFSET)?;
        let number_of_data_records = if record_count < 0 {
            None
        } else {
            Some(record_count as usize)
        };

        let duration_offset = RECORD_COUNT_OFFSET + RECORD_COUNT_WIDTH as u64;
        let duration_raw = read_ascii(reader, RECORD_DURATION_WIDTH)?;
        let duration_of_data_record = field::parse_float(&duration_raw, "duration_of_data_record", duration_offset)?;

        let signal_count_offset = duration_offset + RECORD_DURATION_WIDTH as u64;
        let signal_count_raw = read_ascii(reader, SIGNAL_COUNT_WIDTH)?;
        let signal_count = field::parse_integer(&signal_count_raw, "number_of_signals", signal_count_offset)? as usize;

        let mut signals = vec![SignalAttributes::default(); signal_count];

        for signal in &mut signals {
            signal.label = read_ascii(reader, signal_header::LABEL_WIDTH)?.trim_end().to_string();
        }
        for signal in &mut signals {
            signal.transducer = read_ascii(reader, signal_header::TRANSDUCER_WIDTH)?
                .trim_end()
                .to_string();
        }
        for signal in &mut signals {
            signal.physical_dimension = read_ascii(reader, signal_header::PHYSICAL_DIMENSION_WIDTH)?
                .trim_end()
                .to_string();
        }
        for signal in &mut signals {
            let raw = read_ascii(reader, 8)?;
            signal.physical_minimum = field::parse_float(&raw, "physical_minimum", 0)?;
        }
        for signal in &mut signals {
            let raw = read_ascii(reader, 8)?;
            signal.physical_maximum = field::parse_float(&raw, "physical_maximum", 0)?;
        }
        for signal in &mut signals {
            let raw = read_ascii(reader, 8)?;
            signal.digital_minimum = field::parse_integer(&raw, "digital_minimum", 0)? as i32;
        }
        for signal in &mut signals {
            let raw = read_ascii(reader, 8)?;
            signal.digital_maximum = field::parse_integer(&raw, "digital_maximum", 0)? as i32;
        }
        for signal in &mut signals {
            signal.prefilter = read_ascii(reader, signal_header::PREFILTER_WIDTH)?
                .trim_end()
                .to_string();
        }
        for signal in &mut signals {
            let raw = read_ascii(reader, 8)?;
            signal.samples_per_record = field::parse_integer(&raw, "samples_per_record", 0)? as usize;
        }
        for signal in &mut signals {
            signal.reserved = read_ascii(reader, signal_header::RESERVED_WIDTH)?
                .trim_end()
                .to_string();
        }

        for signal in &signals {
            signal.validate(reserved_offset)?;
        }

        Ok(FileHeader {
            version,
            patient_id,
            recording_id,
            start_date,
            start_time,
            file_type,
            number_of_data_records,
            duration_of_data_record,
            signals,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), EdfError> {
        if self.file_type.is_edf_plus() && !self.signals.iter().any(|s| s.is_annotation()) {
            return Err(EdfError::format(
                "signals",
                0,
                "an EDF+ file must have at least one annotation signal",
            ));
        }

        let date_field = DateTimeField::new();
        let mut header = String::with_capacity(self.header_record_size());

        header.push_str(&field::pad_ascii(&self.version, VERSION_WIDTH));
        header.push_str(&field::pad_ascii(&self.patient_id.serialize()?, patient::WIDTH));
        header.push_str(&field::pad_ascii(&self.recording_id.serialize()?, recording::WIDTH));
        header.push_str(&field::pad_ascii(&date_field.format_date(self.start_date), DATE_WIDTH));
        header.push_str(&field::pad_ascii(&date_field.format_time(self.start_time), TIME_WIDTH));
        header.push_str(&field::pad_ascii(
            &self.header_record_size().to_string(),
            HEADER_SIZE_WIDTH,
        ));
        header.push_str(&field::pad_ascii(self.file_type.reserved_text(), RESERVED_WIDTH));
        header.push_str(&field::pad_ascii(
            &self
                .number_of_data_records
                .map(|c| c as i64)
                .unwrap_or(-1)
                .to_string(),
            RECORD_COUNT_WIDTH,
        ));
        header.push_str(&field::format_float(
            self.duration_of_data_record,
            RECORD_DURATION_WIDTH,
            "duration_of_data_record",
        )?);
        header.push_str(&field::pad_ascii(&self.signals.len().to_string(), SIGNAL_COUNT_WIDTH));

        for signal in &self.signals {
            header.push_str(&field::pad_ascii(&signal.label, signal_header::LABEL_WIDTH));
        }
        for signal in &self.signals {
            header.push_str(&field::pad_ascii(&signal.transducer, signal_header::TRANSDUCER_WIDTH));
        }
        for signal in &self.signals {
            header.push_str(&field::pad_ascii(
                &signal.physical_dimension,
                signal_header::PHYSICAL_DIMENSION_WIDTH,
            ));
        }
        for signal in &self.signals {
            header.push_str(&field::format_float(signal.physical_minimum, 8, "physical_minimum")?);
        }
        for signal in &self.signals {
            header.push_str(&field::format_float(signal.physical_maximum, 8, "physical_maximum")?);
        }
        for signal in &self.signals {
            header.push_str(&field::format_integer(
                signal.digital_minimum as i64,
                8,
                "digital_minimum",
            )?);
        }
        for signal in &self.signals {
            header.push_str(&field::format_integer(
                signal.digital_maximum as i64,
                8,
                "digital_maximum",
            )?);
        }
        for signal in &self.signals {
            header.push_str(&field::pad_ascii(&signal.prefilter, signal_header::PREFILTER_WIDTH));
        }
        for signal in &self.signals {
            header.push_str(&field::format_integer(
                signal.samples_per_record as i64,
                8,
                "samples_per_record",
            )?);
        }
        for signal in &self.signals {
            header.push_str(&field::pad_ascii(&signal.reserved, signal_header::RESERVED_WIDTH));
        }

        if !field::is_printable_ascii(&header) {
            return Err(EdfError::format(
                "header",
                0,
                "header must be printable ASCII",
            ));
        }

        writer.write_all(header.as_bytes())?;
        Ok(())
    }

    /// Sets N to `standard.len + annotation.len` and projects each
    /// per-signal attribute array as the concatenation of standard
    /// signals' then annotation signals' corresponding field, in that
    /// order. `signals` is expected to already carry that grouping (the
    /// file orchestrator maintains it); this still groups defensively by
    /// variant rather than trusting caller order.
    pub fn update_signal_fields(&mut self, signals: &[Signal]) {
        let standard = signals.iter().filter(|s| !s.is_annotation()).map(|s| s.attributes().clone());
        let annotation = signals.iter().filter(|s| s.is_annotation()).map(|s| s.attributes().clone());
        self.signals = standard.chain(annotation).collect();
    }

    /// For each declared signal, constructs an Annotation Signal if its
    /// label is `"EDF Annotations"`, else a Standard Signal.
    pub fn allocate_signals(&self, prealloc_records: Option<usize>) -> Vec<Signal> {
        self.signals
            .iter()
            .map(|attrs| {
                let capacity = prealloc_records
                    .map(|records| records * attrs.samples_per_record)
                    .unwrap_or(0);
                if attrs.is_annotation() {
                    Signal::Annotation(AnnotationSignal::new(attrs.clone()))
                } else {
                    Signal::Standard(StandardSignal::with_capacity(attrs.clone(), capacity))
                }
            })
            .collect()
    }

    /// True iff N, the record duration (within 1e-4 s) and every
    /// per-signal attribute agree by serialized text.
    pub fn is_compatible_with(&self, other: &FileHeader) -> bool {
        if self.signals.len() != other.signals.len() {
            return false;
        }
        if (self.duration_of_data_record - other.duration_of_data_record).abs() >= 1e-4 {
            return false;
        }
        self.signals.iter().zip(&other.signals).all(|(a, b)| {
            a.label == b.label
                && a.transducer == b.transducer
                && a.physical_dimension == b.physical_dimension
                && format!("{}", a.physical_minimum) == format!("{}", b.physical_minimum)
                && format!("{}", a.physical_maximum) == format!("{}", b.physical_maximum)
                && a.digital_minimum == b.digital_minimum
                && a.digital_maximum == b.digital_maximum
                && a.prefilter == b.prefilter
                && a.samples_per_record == b.samples_per_record
        })
    }
}

fn read_ascii<R: Read>(reader: &mut R, width: usize) -> Result<String, EdfError> {
    let mut buf = vec![0u8; width];
    reader.read_exact(&mut buf)?;
    Ok(buf.iter().map(|b| *b as char).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::patient::Sex;
    use std::io::Cursor;

    fn sample_header() -> FileHeader {
        let mut header = FileHeader::new();
        header.start_date = NaiveDate::from_ymd_opt(1987, 9, 16).unwrap();
        header.start_time = NaiveTime::from_hms_opt(20, 35, 0).unwrap();
        header.file_type = FileType::EdfPlusContinuous;
        header.duration_of_data_record = 1.0;
        header.number_of_data_records = Some(2);
        header.patient_id = PatientId::with_fields(
            Some("MCH-0234567".to_string()),
            Some(Sex::Female),
            Some(NaiveDate::from_ymd_opt(1987, 9, 16).unwrap()),
            Some("Haagse Harry".to_string()),
        );
        header.signals = vec![
            SignalAttributes::new()
                .with_label("EEG Fpz-Cz")
                .with_physical_range(-440.0, 510.0)
                .with_digital_range(-2048, 2047)
                .with_samples_per_record(150),
            SignalAttributes::new_annotation(8),
        ];
        header
    }

    #[test]
    fn roundtrip() {
        let header = sample_header();
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        assert_eq!(buf.len(), header.header_record_size());

        let mut cursor = Cursor::new(buf);
        let parsed = FileHeader::read(&mut cursor).unwrap();
        assert_eq!(parsed.start_date, header.start_date);
        assert_eq!(parsed.file_type, header.file_type);
        assert_eq!(parsed.signals.len(), 2);
        assert_eq!(parsed.signals[0].label, "EEG Fpz-Cz");
        assert!(parsed.signals[1].is_annotation());
    }

    #[test]
    fn header_record_size_matches_formula() {
        let header = sample_header();
        assert_eq!(header.header_record_size(), 256 * (1 + 2));
    }

    #[test]
    fn rejects_edf_plus_without_annotation_signal() {
        let mut header = sample_header();
        header.signals.truncate(1);
        let mut buf = Vec::new();
        assert!(header.write(&mut buf).is_err());
    }
}
