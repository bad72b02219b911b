//! Per-record driver: decodes or encodes one data record, one signal's
//! block at a time, in declared signal order.

use std::io::{Read, Write};

use crate::error::EdfError;
use crate::signal::Signal;
use crate::tal::{self, AnnotationRecord};

/// Reads one data record's worth of bytes for every signal, in order,
/// appending decoded values onto each signal. Returns the record's
/// timekeeping onset, read from the first TAL of the first annotation
/// signal encountered (`None` if the record has no annotation signal).
pub fn decode_record<R: Read>(
    reader: &mut R,
    signals: &mut [Signal],
    stream_offset: u64,
) -> Result<Option<f64>, EdfError> {
    let mut recorded_start_time = None;
    let mut seen_annotation_signal = false;

    for signal in signals.iter_mut() {
        match signal {
            Signal::Standard(standard) => {
                let mut raw = vec![0u8; standard.attributes.samples_per_record * 2];
                reader.read_exact(&mut raw)?;
                standard.samples.reserve(standard.attributes.samples_per_record);
                for chunk in raw.chunks_exact(2) {
                    let value = i16::from_le_bytes([chunk[0], chunk[1]]);
                    standard.samples.push(standard.dequantize(value));
                }
            }
            Signal::Annotation(annotation) => {
                let mut raw = vec![0u8; annotation.budget()];
                reader.read_exact(&mut raw)?;
                let records = tal::decode_block(&raw, stream_offset)?;

                if !seen_annotation_signal {
                    seen_annotation_signal = true;
                    match records.first() {
                        Some(first) if first.is_timekeeping => {
                            recorded_start_time = Some(first.onset);
                        }
                        _ => {
                            return Err(EdfError::format(
                                "annotation.timekeeping",
                                stream_offset,
                                "first TAL of the first annotation signal must be a timekeeping entry",
                            ));
                        }
                    }
                }

                annotation.records.extend(records);
            }
        }
    }

    Ok(recorded_start_time)
}

/// Cursor tracking how much of each signal's sequence has been consumed
/// by the write loop so far.
#[derive(Debug, Default)]
pub struct WriteCursors {
    standard: Vec<usize>,
    annotation: Vec<usize>,
}

impl WriteCursors {
    pub fn for_signals(signals: &[Signal]) -> Self {
        let mut standard = Vec::new();
        let mut annotation = Vec::new();
        for signal in signals {
            match signal {
                Signal::Standard(_) => standard.push(0),
                Signal::Annotation(_) => annotation.push(0),
            }
        }
        Self { standard, annotation }
    }

    /// True once every standard signal has emitted all of its samples
    /// and every annotation signal has emitted all of its user records.
    pub fn is_drained(&self, signals: &[Signal]) -> bool {
        let mut s = self.standard.iter();
        let mut a = self.annotation.iter();
        signals.iter().all(|signal| match signal {
            Signal::Standard(std) => *s.next().unwrap() >= std.samples.len(),
            Signal::Annotation(ann) => {
                *a.next().unwrap() >= ann.records.iter().filter(|r| !r.is_timekeeping).count()
            }
        })
    }

    /// True once every standard signal in `signals` has emitted all of its
    /// samples. Vacuously true when there are no standard signals.
    pub fn standard_drained(&self, signals: &[Signal]) -> bool {
        let mut s = self.standard.iter();
        signals.iter().all(|signal| match signal {
            Signal::Standard(std) => *s.next().unwrap() >= std.samples.len(),
            Signal::Annotation(_) => true,
        })
    }

    /// True if any annotation signal in `signals` still has unemitted user
    /// records.
    pub fn annotation_pending(&self, signals: &[Signal]) -> bool {
        let mut a = self.annotation.iter();
        signals.iter().any(|signal| match signal {
            Signal::Annotation(ann) => {
                *a.next().unwrap() < ann.records.iter().filter(|r| !r.is_timekeeping).count()
            }
            Signal::Standard(_) => false,
        })
    }
}

/// Writes one data record: for each standard signal, the next
/// `samples_per_record` samples (padded with `digital_min` if the signal
/// has run out); for each annotation signal, a synthesized timekeeping
/// TAL (only on the first such signal) followed by as many pending user
/// annotations as fit the remaining budget.
pub fn encode_record<W: Write>(
    writer: &mut W,
    signals: &[Signal],
    cursors: &mut WriteCursors,
    record_start_time: f64,
) -> Result<(), EdfError> {
    let mut standard_index = 0usize;
    let mut annotation_index = 0usize;
    let mut wrote_timekeeping = false;

    for signal in signals {
        match signal {
            Signal::Standard(standard) => {
                let cursor = &mut cursors.standard[standard_index];
                standard_index += 1;
                let mut buf = Vec::with_capacity(standard.attributes.samples_per_record * 2);
                for _ in 0..standard.attributes.samples_per_record {
                    let raw = if *cursor < standard.samples.len() {
                        let value = standard.quantize(standard.samples[*cursor]);
                        *cursor += 1;
                        value
                    } else {
                        standard.attributes.digital_minimum as i16
                    };
                    buf.extend_from_slice(&raw.to_le_bytes());
                }
                writer.write_all(&buf)?;
            }
            Signal::Annotation(annotation) => {
                let cursor = &mut cursors.annotation[annotation_index];
                annotation_index += 1;
                let budget = annotation.budget();

                let user_records: Vec<&AnnotationRecord> =
                    annotation.records.iter().filter(|r| !r.is_timekeeping).collect();

                let mut to_emit: Vec<AnnotationRecord> = Vec::new();
                if !wrote_timekeeping {
                    wrote_timekeeping = true;
                    to_emit.push(AnnotationRecord::timekeeping(record_start_time));
                }

                let mut used: usize = to_emit.iter().map(|r| r.byte_size()).sum();
                while *cursor < user_records.len() {
                    let candidate = user_records[*cursor];
                    let size = candidate.byte_size();
                    if size > budget {
                        return Err(EdfError::Capacity {
                            signal: annotation.attributes.label.trim_end().to_string(),
                            size,
                            budget,
                        });
                    }
                    if used + size > budget {
                        break;
                    }
                    used += size;
                    to_emit.push(candidate.clone());
                    *cursor += 1;
                }

                let refs: Vec<&AnnotationRecord> = to_emit.iter().collect();
                let block = tal::encode_block(&refs, budget);
                writer.write_all(&block)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::SignalAttributes;
    use crate::signal::{AnnotationSignal, StandardSignal};
    use std::io::Cursor;

    #[test]
    fn standard_signal_roundtrip() {
        let attrs = SignalAttributes::new()
            .with_physical_range(-5.0, 5.0)
            .with_digital_range(-32768, 32767)
            .with_samples_per_record(2);
        let mut write_signal = vec![Signal::Standard(StandardSignal::new(attrs.clone()))];
        if let Signal::Standard(s) = &mut write_signal[0] {
            s.samples = vec![0.0, 5.0];
        }
        let mut cursors = WriteCursors::for_signals(&write_signal);
        let mut buf = Vec::new();
        encode_record(&mut buf, &write_signal, &mut cursors, 0.0).unwrap();
        assert_eq!(buf, vec![0x00, 0x00, 0xFF, 0x7F]);

        let mut read_signal = vec![Signal::Standard(StandardSignal::new(attrs))];
        let mut cursor = Cursor::new(buf);
        decode_record(&mut cursor, &mut read_signal, 0).unwrap();
        if let Signal::Standard(s) = &read_signal[0] {
            assert_eq!(s.samples, vec![0.0, 5.0]);
        }
    }

    #[test]
    fn annotation_signal_emits_timekeeping_then_user_records() {
        // Budget must fit both the synthesized timekeeping TAL and the user
        // annotation below; 16 samples -> 32 bytes comfortably covers both.
        let attrs = SignalAttributes::new_annotation(16);
        let mut signal = Signal::Annotation(AnnotationSignal::new(attrs));
        if let Signal::Annotation(a) = &mut signal {
            a.records
                .push(AnnotationRecord::new(1.0, Some(0.5), vec!["Arousal".to_string()]));
        }
        let signals = vec![signal];
        let mut cursors = WriteCursors::for_signals(&signals);
        let mut buf = Vec::new();
        encode_record(&mut buf, &signals, &mut cursors, 0.0).unwrap();

        let mut read_back = vec![Signal::Annotation(AnnotationSignal::new(
            SignalAttributes::new_annotation(16),
        ))];
        let mut cursor = Cursor::new(buf);
        let start = decode_record(&mut cursor, &mut read_back, 0).unwrap();
        assert_eq!(start, Some(0.0));
        if let Signal::Annotation(a) = &read_back[0] {
            let user: Vec<_> = a.user_records().collect();
            assert_eq!(user.len(), 1);
            assert_eq!(user[0].descriptions, vec!["Arousal".to_string()]);
        }
    }

    #[test]
    fn oversized_annotation_fails_capacity() {
        let attrs = SignalAttributes::new_annotation(8);
        let mut signal = Signal::Annotation(AnnotationSignal::new(attrs));
        if let Signal::Annotation(a) = &mut signal {
            a.records.push(AnnotationRecord::new(0.0, None, vec!["x".repeat(200)]));
        }
        let signals = vec![signal];
        let mut cursors = WriteCursors::for_signals(&signals);
        let mut buf = Vec::new();
        let err = encode_record(&mut buf, &signals, &mut cursors, 0.0).unwrap_err();
        assert!(matches!(err, EdfError::Capacity { .. }));
    }

    #[test]
    fn missing_timekeeping_tal_is_rejected() {
        let attrs = SignalAttributes::new_annotation(8);
        let mut signals = vec![Signal::Annotation(AnnotationSignal::new(attrs))];
        let block = vec![0u8; 16];
        let mut cursor = Cursor::new(block);
        let err = decode_record(&mut cursor, &mut signals, 0).unwrap_err();
        assert!(matches!(err, EdfError::Format { .. }));
    }
}
