//! Patient-ID structured subfield string (80 bytes).

use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::EdfError;
use crate::utils::{deserialize_field, serialize_field};

pub const WIDTH: usize = 80;

/// The Patient-ID field, decomposed into its EDF+ subfields when the raw
/// text matches the structured shape (at least four whitespace-separated
/// tokens); otherwise the original text is kept verbatim as `opaque`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PatientId {
    pub code: Option<String>,
    pub sex: Option<Sex>,
    pub birthdate: Option<NaiveDate>,
    pub name: Option<String>,
    pub additional: Vec<Option<String>>,
    opaque: Option<String>,
}

impl PatientId {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a structured Patient-ID directly, bypassing the opaque
    /// fallback path.
    pub fn with_fields(
        code: Option<String>,
        sex: Option<Sex>,
        birthdate: Option<NaiveDate>,
        name: Option<String>,
    ) -> Self {
        PatientId {
            code,
            sex,
            birthdate,
            name,
            additional: Vec::new(),
            opaque: None,
        }
    }

    /// True when this value degraded to an opaque string on read (fewer
    /// than four tokens, so it wasn't decomposed).
    pub fn is_opaque(&self) -> bool {
        self.opaque.is_some()
    }

    pub fn deserialize(value: &str) -> Result<Self, EdfError> {
        let parts: Vec<&str> = value.split_ascii_whitespace().collect();

        if parts.len() < 4 {
            return Ok(PatientId {
                opaque: Some(value.to_string()),
                ..Default::default()
            });
        }

        let sex = match deserialize_field(parts[1]) {
            Some(raw) => Some(Sex::from_str(&raw)?),
            None => None,
        };
        let birthdate = deserialize_field(parts[2])
            .map(|v| NaiveDate::parse_from_str(&v, "%d-%b-%Y"))
            .transpose()
            .map_err(|e| EdfError::format("patient_id.birthdate", 16, e.to_string()))?;

        Ok(PatientId {
            code: deserialize_field(parts[0]),
            sex,
            birthdate,
            name: deserialize_field(parts[3]),
            additional: parts[4..].iter().map(|p| deserialize_field(p)).collect(),
            opaque: None,
        })
    }

    pub fn serialize(&self) -> Result<String, EdfError> {
        let value = if let Some(opaque) = &self.opaque {
            opaque.clone()
        } else {
            let code = serialize_field(self.code.clone());
            let sex = serialize_field(self.sex.as_ref().map(|s| s.to_string()));
            let birthdate =
                serialize_field(self.birthdate.map(|d| d.format("%d-%b-%Y").to_string().to_uppercase()));
            let name = serialize_field(self.name.clone());

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

            format!("{code} {sex} {birthdate} {name}{additional}")
        };

        if value.len() > WIDTH {
            return Err(EdfError::format(
                "patient_id",
                16,
                format!("serialized patient id is {} bytes, limit is {WIDTH}", value.len()),
            ));
        }
        if !value.bytes().all(|b| matches!(b, 0x20..=0x7E)) {
            return Err(EdfError::format(
                "patient_id",
                16,
                "patient id must be printable ASCII",
            ));
        }

        Ok(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Female,
    Male,
}

impl Display for Sex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Female => write!(f, "F"),
            Self::Male => write!(f, "M"),
        }
    }
}

impl FromStr for Sex {
    type Err = EdfError;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "F" => Ok(Self::Female),
            "M" => Ok(Self::Male),
            other => Err(EdfError::format(
                "patient_id.sex",
                16,
                format!("expected `F` or `M`, found `{other}`"),
            )),
        }
    }
}
