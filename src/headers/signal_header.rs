//! The ten per-signal header attributes, shared by both `Signal` variants.

use crate::error::EdfError;
use crate::headers::field::truncate_ascii;

pub const LABEL_WIDTH: usize = 16;
pub const TRANSDUCER_WIDTH: usize = 80;
pub const PHYSICAL_DIMENSION_WIDTH: usize = 8;
pub const PREFILTER_WIDTH: usize = 80;
pub const RESERVED_WIDTH: usize = 32;

pub const ANNOTATION_LABEL: &str = "EDF Annotations";

/// Per-signal header fields. Standard and Annotation signals both carry
/// one of these; only the interpretation of `samples_per_record` (sample
/// count vs. half the byte budget) differs between them.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalAttributes {
    pub label: String,
    pub transducer: String,
    pub physical_dimension: String,
    pub physical_minimum: f64,
    pub physical_maximum: f64,
    pub digital_minimum: i32,
    pub digital_maximum: i32,
    pub prefilter: String,
    pub samples_per_record: usize,
    pub(crate) reserved: String,
}

impl Default for SignalAttributes {
    fn default() -> Self {
        Self {
            label: String::new(),
            transducer: String::new(),
            physical_dimension: String::new(),
            physical_minimum: -1.0,
            physical_maximum: 1.0,
            digital_minimum: -32768,
            digital_maximum: 32767,
            prefilter: String::new(),
            samples_per_record: 0,
            reserved: String::new(),
        }
    }
}

impl SignalAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes for a freshly allocated annotation signal with a byte
    /// budget of `2 * samples_per_record` per data record.
    pub fn new_annotation(samples_per_record: usize) -> Self {
        Self {
            label: ANNOTATION_LABEL.to_string(),
            samples_per_record,
            ..Self::default()
        }
    }

    pub fn is_annotation(&self) -> bool {
        self.label.trim_end() == ANNOTATION_LABEL
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = truncate_ascii(&label.into(), LABEL_WIDTH);
        self
    }

    pub fn with_transducer(mut self, transducer: impl Into<String>) -> Self {
        self.transducer = truncate_ascii(&transducer.into(), TRANSDUCER_WIDTH);
        self
    }

    pub fn with_physical_dimension(mut self, dimension: impl Into<String>) -> Self {
        self.physical_dimension = truncate_ascii(&dimension.into(), PHYSICAL_DIMENSION_WIDTH);
        self
    }

    pub fn with_physical_range(mut self, min: f64, max: f64) -> Self {
        self.physical_minimum = min;
        self.physical_maximum = max;
        self
    }

    pub fn with_digital_range(mut self, min: i32, max: i32) -> Self {
        self.digital_minimum = min;
        self.digital_maximum = max;
        self
    }

    pub fn with_prefilter(mut self, prefilter: impl Into<String>) -> Self {
        self.prefilter = truncate_ascii(&prefilter.into(), PREFILTER_WIDTH);
        self
    }

    pub fn with_samples_per_record(mut self, samples_per_record: usize) -> Self {
        self.samples_per_record = samples_per_record;
        self
    }

    /// Rejects a digital range that's empty or inverted and a physical
    /// range collapsed to a single point: both differences are used as a
    /// divisor by the linear calibration in `crate::signal`, so either one
    /// being zero (or the digital one negative) would divide by zero or
    /// silently flip the sign of every decoded sample.
    pub fn validate(&self, offset: u64) -> Result<(), EdfError> {
        if self.digital_minimum >= self.digital_maximum {
            return Err(EdfError::format(
                "digital_minimum",
                offset,
                format!(
                    "digital_minimum ({}) must be less than digital_maximum ({})",
                    self.digital_minimum, self.digital_maximum
                ),
            ));
        }
        if self.physical_minimum == self.physical_maximum {
            return Err(EdfError::format(
                "physical_minimum",
                offset,
                "physical_minimum must differ from physical_maximum",
            ));
        }
        Ok(())
    }
}
