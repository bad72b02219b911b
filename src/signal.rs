//! The polymorphic signal model: Standard (physical-unit samples) and
//! Annotation (TAL records), tagged rather than inherited so the record
//! loop can dispatch on the variant directly.

use crate::headers::SignalAttributes;
use crate::tal::AnnotationRecord;

/// A standard or annotation channel. Both variants carry the same ten
/// per-signal header attributes; only the payload differs.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Standard(StandardSignal),
    Annotation(AnnotationSignal),
}

impl Signal {
    pub fn attributes(&self) -> &SignalAttributes {
        match self {
            Signal::Standard(s) => &s.attributes,
            Signal::Annotation(a) => &a.attributes,
        }
    }

    pub fn attributes_mut(&mut self) -> &mut SignalAttributes {
        match self {
            Signal::Standard(s) => &mut s.attributes,
            Signal::Annotation(a) => &mut a.attributes,
        }
    }

    pub fn label(&self) -> &str {
        self.attributes().label.trim_end()
    }

    pub fn is_annotation(&self) -> bool {
        matches!(self, Signal::Annotation(_))
    }

    pub fn as_standard(&self) -> Option<&StandardSignal> {
        match self {
            Signal::Standard(s) => Some(s),
            Signal::Annotation(_) => None,
        }
    }

    pub fn as_standard_mut(&mut self) -> Option<&mut StandardSignal> {
        match self {
            Signal::Standard(s) => Some(s),
            Signal::Annotation(_) => None,
        }
    }

    pub fn as_annotation(&self) -> Option<&AnnotationSignal> {
        match self {
            Signal::Annotation(a) => Some(a),
            Signal::Standard(_) => None,
        }
    }

    pub fn as_annotation_mut(&mut self) -> Option<&mut AnnotationSignal> {
        match self {
            Signal::Annotation(a) => Some(a),
            Signal::Standard(_) => None,
        }
    }
}

/// Maps a raw int16 sample into physical units:
/// `phys = lerp(physical_min, physical_max, (raw - digital_min)/(digital_max - digital_min))`.
/// Out-of-range raw values are permitted and extrapolated by the same formula.
pub fn dequantize(raw: i16, attributes: &SignalAttributes) -> f64 {
    let digital_span = (attributes.digital_maximum - attributes.digital_minimum) as f64;
    let fraction = (raw as f64 - attributes.digital_minimum as f64) / digital_span;
    attributes.physical_minimum + fraction * (attributes.physical_maximum - attributes.physical_minimum)
}

/// Inverse of [`dequantize`], rounded and clipped into the int16 range.
pub fn quantize(physical: f64, attributes: &SignalAttributes) -> i16 {
    let physical_span = attributes.physical_maximum - attributes.physical_minimum;
    let fraction = (physical - attributes.physical_minimum) / physical_span;
    let raw = attributes.digital_minimum as f64
        + fraction * (attributes.digital_maximum - attributes.digital_minimum) as f64;
    // Round half-to-even so exact-midpoint samples on an asymmetric digital
    // range (e.g. i16's -32768..32767) land on the nearer representable
    // endpoint rather than always away from zero.
    raw.round_ties_even().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandardSignal {
    pub attributes: SignalAttributes,
    pub samples: Vec<f64>,
}

impl StandardSignal {
    pub fn new(attributes: SignalAttributes) -> Self {
        Self {
            attributes,
            samples: Vec::new(),
        }
    }

    pub fn with_capacity(attributes: SignalAttributes, capacity: usize) -> Self {
        Self {
            attributes,
            samples: Vec::with_capacity(capacity),
        }
    }

    pub fn dequantize(&self, raw: i16) -> f64 {
        dequantize(raw, &self.attributes)
    }

    pub fn quantize(&self, physical: f64) -> i16 {
        quantize(physical, &self.attributes)
    }

    /// Derived sampling frequency given the file's data-record duration.
    pub fn sample_frequency(&self, duration_of_data_record: f64) -> Option<f64> {
        if duration_of_data_record > 0.0 {
            Some(self.attributes.samples_per_record as f64 / duration_of_data_record)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationSignal {
    pub attributes: SignalAttributes,
    pub records: Vec<AnnotationRecord>,
}

impl AnnotationSignal {
    pub fn new(attributes: SignalAttributes) -> Self {
        Self {
            attributes,
            records: Vec::new(),
        }
    }

    /// Byte budget per data record: `2 * samples_per_record`.
    pub fn budget(&self) -> usize {
        2 * self.attributes.samples_per_record
    }

    /// User-visible annotations, filtering out the synthesized
    /// timekeeping entries.
    pub fn user_records(&self) -> impl Iterator<Item = &AnnotationRecord> {
        self.records.iter().filter(|r| !r.is_timekeeping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs() -> SignalAttributes {
        SignalAttributes::new()
            .with_physical_range(-5.0, 5.0)
            .with_digital_range(-32768, 32767)
    }

    #[test]
    fn quantize_is_invertible_modulo_rounding() {
        let attrs = attrs();
        for raw in [-32768i16, -100, 0, 100, 32767] {
            let phys = dequantize(raw, &attrs);
            let back = quantize(phys, &attrs);
            assert!((back as i32 - raw as i32).abs() <= 1);
        }
    }

    #[test]
    fn scenario_minimal_edf_samples() {
        let attrs = attrs();
        assert_eq!(quantize(0.0, &attrs), 0);
        assert_eq!(quantize(5.0, &attrs), 32767);
    }

    #[test]
    fn annotation_budget_is_double_samples_per_record() {
        let signal = AnnotationSignal::new(SignalAttributes::new_annotation(8));
        assert_eq!(signal.budget(), 16);
    }
}
