use crate::error::UnsupportedWires;
use bitfield_struct::bitfield;
use rtd_conversion::{Calibration, RATIO_MAX};

/// Addresses of the MAX31865 registers.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// Configuration register.
    Config = 0x00,
    /// RTD resistance data, most significant byte.
    RtdMsb = 0x01,
    /// RTD resistance data, least significant byte.
    RtdLsb = 0x02,
    /// High fault threshold, most significant byte.
    HighFaultMsb = 0x03,
    /// High fault threshold, least significant byte.
    HighFaultLsb = 0x04,
    /// Low fault threshold, most significant byte.
    LowFaultMsb = 0x05,
    /// Low fault threshold, least significant byte.
    LowFaultLsb = 0x06,
    /// Fault status register (read only).
    FaultStatus = 0x07,
}

impl Register {
    /// Address byte of a read transaction: top bit clear.
    pub const fn read_address(self) -> u8 {
        self as u8 & 0x7f
    }

    /// Address byte of a write transaction: top bit set.
    pub const fn write_address(self) -> u8 {
        self as u8 | 0x80
    }
}

/// RTD lead configuration.
///
/// The chip only distinguishes 3-wire from the rest; [`Wires::Two`] and
/// [`Wires::Four`] program the same bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wires {
    /// 2-wire RTD.
    Two,
    /// 3-wire RTD.
    Three,
    /// 4-wire RTD.
    Four,
}

impl Wires {
    /// Number of leads.
    pub const fn count(self) -> u8 {
        match self {
            Wires::Two => 2,
            Wires::Three => 3,
            Wires::Four => 4,
        }
    }
}

impl TryFrom<u8> for Wires {
    type Error = UnsupportedWires;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Wires::Two),
            3 => Ok(Wires::Three),
            4 => Ok(Wires::Four),
            n => Err(UnsupportedWires(n)),
        }
    }
}

/// Mains rejection of the converter's digital filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoiseFilter {
    /// Reject 50 Hz.
    Hz50,
    /// Reject 60 Hz (power-on default).
    #[default]
    Hz60,
}

#[bitfield(u8)]
#[derive(PartialEq, Eq)]
/// # Configuration register
///
/// Read-modify-write only: every driver operation changes its own bits and writes
/// the whole byte back. The fault-status clear and one-shot bits are self-clearing.
pub struct Configuration {
    /// Selects the 50 Hz filter when set, 60 Hz when clear.
    pub filter_50hz: bool,
    /// Fault status clear. Writing 1 clears the fault status register; the bit
    /// returns to 0 by itself.
    pub fault_clear: bool,
    /// Fault detection cycle control. Left at 0 (no detection cycle running) by
    /// this driver.
    #[bits(2)]
    pub fault_cycle: u8,
    /// 3-wire RTD when set, 2- or 4-wire when clear.
    pub three_wire: bool,
    /// Writing 1 with bias enabled starts a single conversion; the bit returns to 0
    /// when the conversion is done.
    pub one_shot: bool,
    /// Conversions run continuously at the filter rate when set.
    pub auto_convert: bool,
    /// V_BIAS on: the chip drives excitation current through the RTD.
    pub bias: bool,
}

impl Configuration {
    /// Program the lead configuration.
    pub const fn with_wires(self, wires: Wires) -> Self {
        self.with_three_wire(matches!(wires, Wires::Three))
    }

    /// Program the mains filter.
    pub const fn with_noise_filter(self, filter: NoiseFilter) -> Self {
        self.with_filter_50hz(matches!(filter, NoiseFilter::Hz50))
    }

    /// The selected mains filter.
    pub const fn noise_filter(&self) -> NoiseFilter {
        if self.filter_50hz() {
            NoiseFilter::Hz50
        } else {
            NoiseFilter::Hz60
        }
    }

    /// The byte that clears the fault status: fault-clear bit set, one-shot and
    /// fault detection cycle bits (mask `0x2c`) cleared, everything else kept.
    pub const fn with_fault_clear_pulse(self) -> Self {
        self.with_one_shot(false)
            .with_fault_cycle(0)
            .with_fault_clear(true)
    }

    /// The value the chip holds once its self-clearing bits have fired.
    pub(crate) const fn settled(self) -> Self {
        self.with_fault_clear(false).with_one_shot(false)
    }
}

#[bitfield(u8)]
#[derive(PartialEq, Eq)]
/// # Fault status register
///
/// Independent latched fault flags. They stay set until cleared through the
/// configuration register.
pub struct FaultStatus {
    #[bits(2)]
    __: u8,
    /// Overvoltage or undervoltage on any input.
    pub over_under_voltage: bool,
    /// RTDIN- < 0.85 x V_BIAS, FORCE- open.
    pub rtd_in_low: bool,
    /// REFIN- < 0.85 x V_BIAS, FORCE- open.
    pub ref_in_high: bool,
    /// REFIN- > 0.85 x V_BIAS.
    pub ref_in_low: bool,
    /// RTD ratio below the low fault threshold.
    pub low_threshold: bool,
    /// RTD ratio above the high fault threshold.
    pub high_threshold: bool,
}

impl FaultStatus {
    /// Whether any fault flag is set.
    pub const fn has_fault(&self) -> bool {
        self.into_bits() & 0xfc != 0
    }

    /// The faults that are set, most significant flag first.
    pub fn faults(self) -> impl Iterator<Item = Fault> {
        Fault::ALL
            .into_iter()
            .filter(move |fault| self.into_bits() & fault.mask() != 0)
    }
}

/// A single fault condition from the fault status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// RTD high threshold exceeded.
    HighThreshold,
    /// RTD below the low threshold.
    LowThreshold,
    /// REFIN- > 0.85 x V_BIAS.
    RefInLow,
    /// REFIN- < 0.85 x V_BIAS with FORCE- open.
    RefInHigh,
    /// RTDIN- < 0.85 x V_BIAS with FORCE- open.
    RtdInLow,
    /// Overvoltage or undervoltage.
    OverUnderVoltage,
}

impl Fault {
    const ALL: [Fault; 6] = [
        Fault::HighThreshold,
        Fault::LowThreshold,
        Fault::RefInLow,
        Fault::RefInHigh,
        Fault::RtdInLow,
        Fault::OverUnderVoltage,
    ];

    /// Bit of this fault in the fault status register.
    pub const fn mask(self) -> u8 {
        match self {
            Fault::HighThreshold => 0x80,
            Fault::LowThreshold => 0x40,
            Fault::RefInLow => 0x20,
            Fault::RefInHigh => 0x10,
            Fault::RtdInLow => 0x08,
            Fault::OverUnderVoltage => 0x04,
        }
    }

    /// Human-readable description.
    pub const fn description(self) -> &'static str {
        match self {
            Fault::HighThreshold => "RTD high threshold",
            Fault::LowThreshold => "RTD low threshold",
            Fault::RefInLow => "REFIN- > 0.85 x bias",
            Fault::RefInHigh => "REFIN- < 0.85 x bias, FORCE- open",
            Fault::RtdInLow => "RTDIN- < 0.85 x bias, FORCE- open",
            Fault::OverUnderVoltage => "under/over voltage",
        }
    }
}

#[bitfield(u16)]
#[derive(PartialEq, Eq)]
/// # RTD data registers
///
/// Contents of RTD MSB:LSB after a conversion. The fault flag is set when the
/// conversion tripped a fault; the fault status register has the details.
pub struct RtdData {
    /// Fault flag.
    pub fault: bool,
    /// Resistance as a 15-bit fraction of the reference resistor.
    #[bits(15)]
    pub ratio: u16,
}

impl RtdData {
    /// Decode the two bytes read from RTD MSB onwards.
    pub const fn from_be_bytes(bytes: [u8; 2]) -> Self {
        Self::from_bits(u16::from_be_bytes(bytes))
    }

    /// Resistance in ohms.
    pub fn resistance(&self, calibration: &Calibration) -> f32 {
        calibration.resistance(self.into_bits())
    }

    /// Temperature in degrees Celsius.
    pub fn temperature(&self, calibration: &Calibration) -> f32 {
        calibration.temperature(self.into_bits())
    }
}

/// Register bytes for a 15-bit threshold ratio, most significant first.
pub(crate) const fn threshold_bytes(ratio: u16) -> [u8; 2] {
    RtdData::new()
        .with_ratio(ratio & RATIO_MAX)
        .into_bits()
        .to_be_bytes()
}
