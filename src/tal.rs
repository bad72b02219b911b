//! Timestamped Annotation List (TAL) grammar: the byte-framed payload
//! carried by annotation signals.

use std::str::FromStr;

use crate::error::EdfError;

const DESCRIPTION_DELIMITER: u8 = 0x14;
const DURATION_DELIMITER: u8 = 0x15;
const TERMINATOR: u8 = 0x00;

/// One onset/duration/description group. Several descriptions can share
/// one onset and duration (they arrive back to back between `0x14` bytes
/// in the same TAL).
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    pub onset: f64,
    pub duration: Option<f64>,
    pub descriptions: Vec<String>,
    pub linked_channel: Option<String>,
    pub is_timekeeping: bool,
}

impl AnnotationRecord {
    pub fn new(onset: f64, duration: Option<f64>, descriptions: Vec<String>) -> Self {
        Self {
            onset,
            duration,
            descriptions,
            linked_channel: None,
            is_timekeeping: false,
        }
    }

    pub fn with_linked_channel(mut self, channel: impl Into<String>) -> Self {
        self.linked_channel = Some(channel.into());
        self
    }

    pub(crate) fn timekeeping(onset: f64) -> Self {
        Self {
            onset,
            duration: None,
            descriptions: Vec::new(),
            linked_channel: None,
            is_timekeeping: true,
        }
    }

    /// Number of bytes this record occupies once serialized as a TAL,
    /// per the formula in the data-record codec contract.
    pub fn byte_size(&self) -> usize {
        // `{:?}` rather than `{}`: Display drops the decimal point for whole
        // numbers (`1` instead of `1.0`), but the TAL grammar always carries
        // one.
        let onset_digits = format!("{:?}", self.onset.abs()).len();
        let mut size = 1 + onset_digits;
        if let Some(duration) = self.duration {
            size += 1 + format!("{duration:?}").len();
        }
        size += 1; // description delimiter opening the description list
        if self.descriptions.is_empty() {
            // Timekeeping TALs carry no description text, but the grammar
            // still wants a closing delimiter: `Onset 0x14 0x14 0x00`.
            size += 1;
        } else {
            for description in &self.descriptions {
                size += description.len();
                if let Some(channel) = &self.linked_channel {
                    size += 2 + channel.len();
                }
                size += 1; // trailing description delimiter
            }
        }
        size += 1; // terminator
        size
    }

    fn serialize_into(&self, buf: &mut Vec<u8>) {
        let sign = if self.onset >= 0.0 { '+' } else { '-' };
        buf.extend(format!("{sign}{:?}", self.onset.abs()).into_bytes());
        if let Some(duration) = self.duration {
            buf.push(DURATION_DELIMITER);
            buf.extend(format!("{duration:?}").into_bytes());
        }
        buf.push(DESCRIPTION_DELIMITER);
        if self.descriptions.is_empty() {
            buf.push(DESCRIPTION_DELIMITER);
        } else {
            for description in &self.descriptions {
                if let Some(channel) = &self.linked_channel {
                    buf.extend(format!("{description}@@{channel}").into_bytes());
                } else {
                    buf.extend(description.as_bytes());
                }
                buf.push(DESCRIPTION_DELIMITER);
            }
        }
        buf.push(TERMINATOR);
    }

    fn parse(onset_duration: &str, descriptions: &[&[u8]], field_offset: u64) -> Result<Self, EdfError> {
        let mut parts = onset_duration.splitn(2, DURATION_DELIMITER as char);
        let onset_text = parts.next().unwrap_or_default();
        let duration_text = parts.next();

        let onset = f64::from_str(onset_text)
            .map_err(|e| EdfError::format("annotation.onset", field_offset, e.to_string()))?;
        let duration = duration_text
            .map(f64::from_str)
            .transpose()
            .map_err(|e| EdfError::format("annotation.duration", field_offset, e.to_string()))?;

        // A TAL whose first description slot is empty is a timekeeping TAL.
        // Some annotations-only files tack on a "defining event" reason as
        // a second description slot; that's permitted but not required.
        if descriptions.is_empty() || descriptions[0].is_empty() {
            let reasons = descriptions
                .iter()
                .skip(1)
                .map(|d| String::from_utf8_lossy(d).to_string())
                .collect();
            return Ok(AnnotationRecord {
                onset,
                duration,
                descriptions: reasons,
                linked_channel: None,
                is_timekeeping: true,
            });
        }

        let mut linked_channel = None;
        let mut parsed_descriptions = Vec::with_capacity(descriptions.len());
        for raw in descriptions {
            let text = String::from_utf8_lossy(raw).to_string();
            if let Some((description, channel)) = text.split_once("@@") {
                linked_channel = Some(channel.to_string());
                parsed_descriptions.push(description.to_string());
            } else {
                parsed_descriptions.push(text);
            }
        }

        Ok(AnnotationRecord {
            onset,
            duration,
            descriptions: parsed_descriptions,
            linked_channel,
            is_timekeeping: false,
        })
    }
}

/// Parses a 2·samples-per-record byte block into a sequence of TALs.
/// Each TAL is `Onset Duration? 0x14 Description* 0x14 0x00`; groups are
/// located by their closing `0x14 0x00` pair and `0x00` padding between
/// groups (and trailing the block) is skipped.
pub fn decode_block(data: &[u8], field_offset: u64) -> Result<Vec<AnnotationRecord>, EdfError> {
    let mut records = Vec::new();
    let mut cursor = 0usize;

    while cursor < data.len() {
        if data[cursor] == TERMINATOR {
            cursor += 1;
            continue;
        }

        let start = cursor;
        let mut end = None;
        let mut i = cursor;
        while i + 1 < data.len() {
            if data[i] == DESCRIPTION_DELIMITER && data[i + 1] == TERMINATOR {
                end = Some(i);
                break;
            }
            i += 1;
        }
        let Some(end) = end else {
            return Err(EdfError::format(
                "annotation",
                field_offset + start as u64,
                "TAL not terminated before end of block",
            ));
        };

        let group = &data[start..end];
        let header_end = group.iter().position(|b| *b == DESCRIPTION_DELIMITER);
        let Some(header_end) = header_end else {
            return Err(EdfError::format(
                "annotation",
                field_offset + start as u64,
                "TAL missing description delimiter",
            ));
        };
        let onset_duration = std::str::from_utf8(&group[..header_end])
            .map_err(|e| EdfError::format("annotation", field_offset + start as u64, e.to_string()))?;

        let rest = &group[header_end + 1..];
        let descriptions: Vec<&[u8]> = if rest.is_empty() {
            vec![&[][..]]
        } else {
            rest.split(|b| *b == DESCRIPTION_DELIMITER).collect()
        };

        records.push(AnnotationRecord::parse(
            onset_duration,
            &descriptions,
            field_offset + start as u64,
        )?);
        cursor = end + 2;
    }

    Ok(records)
}

/// Serializes `records` into a byte block padded with `0x00` to exactly
/// `budget` bytes. Records are written in order until the next one would
/// overflow `budget`; the caller is responsible for deferring records
/// that don't fit to a later record and for failing with `CapacityError`
/// if a single record can never fit.
pub fn encode_block(records: &[&AnnotationRecord], budget: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(budget);
    for record in records {
        record.serialize_into(&mut buf);
    }
    buf.resize(budget, TERMINATOR);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timekeeping_roundtrip() {
        let record = AnnotationRecord::timekeeping(30.0);
        let block = encode_block(&[&record], 16);
        let decoded = decode_block(&block, 0).unwrap();
        assert_eq!(decoded.len(), 1);
        assert!(decoded[0].is_timekeeping);
        assert_eq!(decoded[0].onset, 30.0);
    }

    #[test]
    fn annotation_with_duration_and_description() {
        let record = AnnotationRecord::new(1.0, Some(0.5), vec!["Arousal".to_string()]);
        let mut buf = Vec::new();
        record.serialize_into(&mut buf);
        assert_eq!(
            buf,
            b"+1.0\x150.5\x14Arousal\x14\x00".to_vec()
        );
        let decoded = decode_block(&buf, 0).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].onset, 1.0);
        assert_eq!(decoded[0].duration, Some(0.5));
        assert_eq!(decoded[0].descriptions, vec!["Arousal".to_string()]);
    }

    #[test]
    fn linked_channel_extraction() {
        let record = AnnotationRecord::new(0.0, None, vec!["Spike".to_string()]).with_linked_channel("EEG Fpz-Cz");
        let mut buf = Vec::new();
        record.serialize_into(&mut buf);
        let decoded = decode_block(&buf, 0).unwrap();
        assert_eq!(decoded[0].descriptions, vec!["Spike".to_string()]);
        assert_eq!(decoded[0].linked_channel.as_deref(), Some("EEG Fpz-Cz"));
    }

    #[test]
    fn byte_size_matches_serialized_length() {
        let record = AnnotationRecord::new(1.0, Some(0.5), vec!["Arousal".to_string()]);
        let mut buf = Vec::new();
        record.serialize_into(&mut buf);
        assert_eq!(record.byte_size(), buf.len());
    }

    #[test]
    fn timekeeping_with_defining_event_reason() {
        let decoded = decode_block(b"+30\x14\x14Recording starts\x14\x00", 0).unwrap();
        assert_eq!(decoded.len(), 1);
        assert!(decoded[0].is_timekeeping);
        assert_eq!(decoded[0].descriptions, vec!["Recording starts".to_string()]);
    }

    #[test]
    fn multiple_tals_in_one_block() {
        let a = AnnotationRecord::timekeeping(0.0);
        let b = AnnotationRecord::new(0.2, None, vec!["Spike".to_string()]);
        let mut buf = Vec::new();
        a.serialize_into(&mut buf);
        b.serialize_into(&mut buf);
        buf.resize(32, 0);
        let decoded = decode_block(&buf, 0).unwrap();
        assert_eq!(decoded.len(), 2);
        assert!(decoded[0].is_timekeeping);
        assert_eq!(decoded[1].descriptions, vec!["Spike".to_string()]);
    }

    #[test]
    fn negative_onset_sign() {
        let record = AnnotationRecord::timekeeping(-0.489);
        let mut buf = Vec::new();
        record.serialize_into(&mut buf);
        assert!(buf.starts_with(b"-0.489"));
    }
}
