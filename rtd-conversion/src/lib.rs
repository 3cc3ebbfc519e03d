#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]
//! # rtd-conversion
//! A no-std conversion between the ratio codes of an RTD-to-digital converter,
//! platinum RTD resistance and temperature in degrees Celsius.
//!
//! Converters such as the MAX31865 report the RTD resistance as a 15-bit fraction
//! of a precision reference resistor. [raw_to_temperature] turns such a code into
//! Celsius by solving the Callendar-Van Dusen equation: exactly, through its quadratic
//! form, at and above 0 °C, and through a 5th-order approximating polynomial below it.
//!
//! [Calibration] bundles the nominal RTD resistance and the reference resistor for
//! the common board combinations.

mod calibration;
mod cvd;

pub use calibration::Calibration;
pub use cvd::{
    polynomial_temperature, quadratic_temperature, resistance_to_temperature,
    temperature_to_resistance,
};

/// Callendar-Van Dusen `A` coefficient for IEC 60751 platinum.
pub const RTD_A: f32 = 3.9083e-3;

/// Callendar-Van Dusen `B` coefficient for IEC 60751 platinum.
pub const RTD_B: f32 = -5.775e-7;

/// Callendar-Van Dusen `C` coefficient, only used below 0 °C.
pub const RTD_C: f32 = -4.183e-12;

/// Full scale of the 15-bit ratio code: a code of `RATIO_FULL_SCALE` would equal
/// the reference resistance.
pub const RATIO_FULL_SCALE: f32 = 32768.0;

/// Largest 15-bit ratio code.
pub const RATIO_MAX: u16 = 0x7fff;

/// Resistance in ohms encoded by the raw 16-bit RTD register value.
///
/// Bit 0 of `raw` is the converter's fault flag and is discarded.
pub fn raw_to_resistance(raw: u16, reference: f32) -> f32 {
    ratio_to_resistance(raw >> 1, reference)
}

/// Resistance in ohms encoded by a 15-bit ratio code.
pub fn ratio_to_resistance(ratio: u16, reference: f32) -> f32 {
    (ratio as f32 / RATIO_FULL_SCALE) * reference
}

/// The 15-bit ratio code closest to `ohms`, clamped to the code range.
pub fn resistance_to_ratio(ohms: f32, reference: f32) -> u16 {
    let code = libm::roundf(ohms / reference * RATIO_FULL_SCALE);
    if code <= 0.0 {
        0
    } else if code >= RATIO_MAX as f32 {
        RATIO_MAX
    } else {
        code as u16
    }
}

/// Temperature in degrees Celsius for the raw 16-bit RTD register value.
///
/// # Arguments
/// * `raw` - RTD register contents, fault flag in bit 0 and the ratio in bits 15..1.
/// * `nominal` - RTD resistance at 0 °C, usually 100 or 1000 ohms.
/// * `reference` - Reference resistor paired with the RTD, usually 430 or 4300 ohms.
pub fn raw_to_temperature(raw: u16, nominal: f32, reference: f32) -> f32 {
    resistance_to_temperature(raw_to_resistance(raw, reference), nominal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_bit_is_ignored() {
        assert_eq!(
            raw_to_resistance(0x5d90, 430.0),
            raw_to_resistance(0x5d91, 430.0)
        );
    }

    #[test]
    fn ratio_codes_clamp() {
        assert_eq!(resistance_to_ratio(-3.0, 430.0), 0);
        assert_eq!(resistance_to_ratio(430.0, 430.0), RATIO_MAX);
        assert_eq!(resistance_to_ratio(1000.0, 430.0), RATIO_MAX);
        assert_eq!(resistance_to_ratio(215.0, 430.0), 16384);
    }

    #[test]
    fn one_fifty_degrees() {
        // ratio 0x2ec8 = 11976, 157.16 ohm on a 430 ohm reference
        let t = raw_to_temperature(0x5d90, 100.0, 430.0);
        assert!((t - 150.0).abs() < 0.5, "got {t}");
    }
}
