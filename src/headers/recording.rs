//! Recording-ID structured subfield string (80 bytes).

use chrono::NaiveDate;

use crate::error::EdfError;
use crate::utils::{deserialize_field, serialize_field};

pub const WIDTH: usize = 80;

/// The Recording-ID field, decomposed into its EDF+ subfields when the raw
/// text matches `Startdate <dd-MMM-yyyy> ...`; otherwise kept verbatim.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordingId {
    pub startdate: Option<NaiveDate>,
    pub admin_code: Option<String>,
    pub technician: Option<String>,
    pub equipment: Option<String>,
    pub additional: Vec<Option<String>>,
    opaque: Option<String>,
}

impl RecordingId {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fields(
        startdate: Option<NaiveDate>,
        admin_code: Option<String>,
        technician: Option<String>,
        equipment: Option<String>,
    ) -> Self {
        RecordingId {
            startdate,
            admin_code,
            technician,
            equipment,
            additional: Vec::new(),
            opaque: None,
        }
    }

    pub fn is_opaque(&self) -> bool {
        self.opaque.is_some()
    }

    pub fn deserialize(value: &str) -> Result<Self, EdfError> {
        let parts: Vec<&str> = value.split_ascii_whitespace().collect();

        if parts.len() < 5 || parts[0] != "Startdate" {
            return Ok(RecordingId {
                opaque: Some(value.to_string()),
                ..Default::default()
            });
        }

        let startdate = deserialize_field(parts[1])
            .map(|v| NaiveDate::parse_from_str(&v, "%d-%b-%Y"))
            .transpose()
            .map_err(|e| EdfError::format("recording_id.startdate", 96, e.to_string()))?;

        Ok(RecordingId {
            startdate,
            admin_code: deserialize_field(parts[2]),
            technician: deserialize_field(parts[3]),
            equipment: deserialize_field(parts[4]),
            additional: parts[5..].iter().map(|p| deserialize_field(p)).collect(),
            opaque: None,
        })
    }

    pub fn serialize(&self) -> Result<String, EdfError> {
        let value = if let Some(opaque) = &self.opaque {
            opaque.clone()
        } else {
            let startdate = serialize_field(
                self.startdate
                    .map(|d| d.format("%d-%b-%Y").to_string().to_uppercase()),
            );
            let admin_code = serialize_field(self.admin_code.clone());
            let technician = serialize_field(self.technician.clone());
            let equipment = serialize_field(self.equipment.clone());

            let mut additional = self
                .additional
                .iter()
                .cloned()
                .map(serialize_field)
                .collect::<Vec<_>>()
                .join(" ");
            if !additional.is_empty() {
                additional = format!(" {additional}");
            }

            format!("Startdate {startdate} {admin_code} {technician} {equipment}{additional}")
        };

        if value.len() > WIDTH {
            return Err(EdfError::format(
                "recording_id",
                96,
                format!("serialized recording id is {} bytes, limit is {WIDTH}", value.len()),
            ));
        }
        if !value.bytes().all(|b| matches!(b, 0x20..=0x7E)) {
            return Err(EdfError::format(
                "recording_id",
                96,
                "recording id must be printable ASCII",
            ));
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_roundtrip() {
        let id = RecordingId::with_fields(
            Some(NaiveDate::from_ymd_opt(2002, 3, 2).unwrap()),
            Some("EMG561".to_string()),
            Some("BK".to_string()),
            Some("Biosemi".to_string()),
        );
        let text = id.serialize().unwrap();
        assert_eq!(text, "Startdate 02-MAR-2002 EMG561 BK Biosemi");
        let parsed = RecordingId::deserialize(&text).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn opaque_fallback_without_startdate_marker() {
        let id = RecordingId::deserialize("unrelated free text here").unwrap();
        assert!(id.is_opaque());
    }
}
