/*!
`edf-format` is a pure Rust library for reading, writing and editing EDF/EDF+
files. It is based on the official specification [here](https://www.edfplus.info/).
Reading and writing work against any `Read + Seek` / `Write + Seek` stream, so
the crate has no opinion on where the bytes actually live.

**This library is an unofficial implementation.**

# Examples
To get started using this crate, follow the examples below. They outline how
to create, write and read back a basic EDF+ file with one regular signal and
one annotations signal. To see all available fields and functions, take a
look at the individual module documentations.

## Create and write an EDF+ file

```no_run
use std::fs::File;
use std::io::BufWriter;

use chrono::{NaiveDate, NaiveTime};

use edf_format::file::EdfFile;
use edf_format::headers::file_header::FileType;
use edf_format::headers::{PatientId, RecordingId, SignalAttributes};
use edf_format::signal::{AnnotationSignal, Signal, StandardSignal};

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut edf = EdfFile::new();
    edf.header.file_type = FileType::EdfPlusContinuous;
    edf.header.start_date = NaiveDate::from_ymd_opt(2026, 2, 13).unwrap();
    edf.header.start_time = NaiveTime::from_hms_opt(17, 30, 0).unwrap();
    edf.header.duration_of_data_record = 1.0;
    edf.header.patient_id = PatientId::with_fields(
        Some("PAT-CODE1".to_string()),
        None,
        None,
        Some("PAT-NAME".to_string()),
    );
    edf.header.recording_id = RecordingId::new();

    let attrs = SignalAttributes::new()
        .with_label("Signal")
        .with_transducer("AgAgCl cup electrodes")
        .with_physical_dimension("uV")
        .with_physical_range(-440.0, 510.0)
        .with_digital_range(-2048, 2047)
        .with_samples_per_record(100);
    let mut signal = StandardSignal::new(attrs);
    signal.samples = (0..500).map(|v| (v % 100) as f64).collect();

    edf.signals = vec![
        Signal::Standard(signal),
        Signal::Annotation(AnnotationSignal::new(SignalAttributes::new_annotation(80))),
    ];
    edf.header.update_signal_fields(&edf.signals);

    let mut writer = BufWriter::new(File::create("recording.edf")?);
    edf.write(&mut writer)?;

    Ok(())
}
```

## Read an EDF+ file

```no_run
use std::fs::File;
use std::io::BufReader;

use edf_format::file::EdfFile;

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = BufReader::new(File::open("recording.edf")?);
    let edf = EdfFile::read(&mut reader)?;

    println!("{:#?}", edf.header);
    for warning in edf.warnings() {
        eprintln!("warning: {warning}");
    }

    // The signal order matches standard signals first, then annotations.
    for signal in &edf.signals {
        if let Some(standard) = signal.as_standard() {
            println!("{}: {} samples", signal.label(), standard.samples.len());
        }
    }

    Ok(())
}
```
*/

pub mod error;
pub mod file;
pub mod fragment;
pub mod headers;
pub mod record;
pub mod signal;
pub mod tal;
mod tests;
pub(crate) mod utils;
