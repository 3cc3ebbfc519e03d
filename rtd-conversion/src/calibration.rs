use crate::{
    raw_to_resistance, raw_to_temperature, resistance_to_ratio, temperature_to_resistance,
};

/// Calibration of one RTD measurement bridge.
///
/// Not stored by any device; pass it with each conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// RTD resistance at 0 °C, in ohms.
    pub nominal: f32,
    /// Reference resistor paired with the RTD, in ohms.
    pub reference: f32,
}

impl Calibration {
    /// PT100 element with a 430 ohm reference.
    pub const PT100_430: Self = Self::new(100.0, 430.0);
    /// PT1000 element with a 4300 ohm reference.
    pub const PT1000_4300: Self = Self::new(1000.0, 4300.0);

    /// Creates a new calibration from the nominal and reference resistances.
    pub const fn new(nominal: f32, reference: f32) -> Self {
        Self { nominal, reference }
    }

    /// Resistance in ohms of a raw RTD register value.
    pub fn resistance(&self, raw: u16) -> f32 {
        raw_to_resistance(raw, self.reference)
    }

    /// Temperature in degrees Celsius of a raw RTD register value.
    pub fn temperature(&self, raw: u16) -> f32 {
        raw_to_temperature(raw, self.nominal, self.reference)
    }

    /// 15-bit ratio code the converter reports for a resistance of `ohms`.
    pub fn ratio_for_resistance(&self, ohms: f32) -> u16 {
        resistance_to_ratio(ohms, self.reference)
    }

    /// 15-bit ratio code the converter reports at `celsius`.
    ///
    /// Useful for programming fault thresholds in temperature terms.
    pub fn ratio_for_temperature(&self, celsius: f32) -> u16 {
        self.ratio_for_resistance(temperature_to_resistance(celsius, self.nominal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_codes_invert() {
        for cal in [Calibration::PT100_430, Calibration::PT1000_4300] {
            for t in [-180.0f32, -40.0, 0.0, 25.0, 150.0, 600.0] {
                let raw = cal.ratio_for_temperature(t) << 1;
                let back = cal.temperature(raw);
                // one code is about 0.034 C on these bridges
                assert!((back - t).abs() < 0.05, "{t} C came back as {back}");
            }
        }
    }
}
