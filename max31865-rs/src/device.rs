use crate::{
    Max31865Error, Max31865Result, RegisterTransport,
    registers::{Configuration, FaultStatus, NoiseFilter, Register, RtdData, Wires, threshold_bytes},
};
use embedded_hal::{delay::DelayNs, digital::OutputPin};
use rtd_conversion::Calibration;

/// Time for the bias current and input filter to settle after V_BIAS is switched on.
pub const BIAS_SETTLE_MS: u32 = 10;

/// Time allowed for a one-shot conversion; covers the 50 Hz filter worst case.
pub const CONVERSION_MS: u32 = 65;

/// A MAX31865 RTD-to-digital converter on a shared SPI bus.
///
/// Owns the chip-select pin of the chip and a cache of its configuration register.
/// Every operation borrows the bus transport for its whole duration, so several
/// devices can share one [`RegisterTransport`] without their transactions
/// interleaving.
pub struct Max31865<CS> {
    pub(crate) cs: CS,
    pub(crate) wires: Wires,
    pub(crate) config: Configuration,
}

impl<CS> Max31865<CS> {
    /// Creates a new device bound to a chip-select pin and an RTD lead configuration.
    ///
    /// Does not talk to the chip; call [`initialize`](Self::initialize) before use.
    pub fn new(cs: CS, wires: Wires) -> Self {
        Self {
            cs,
            wires,
            config: Configuration::new(),
        }
    }

    /// The lead configuration this device was set up for.
    pub fn wires(&self) -> Wires {
        self.wires
    }

    /// Last configuration read from or written to the chip, without bus traffic.
    pub fn cached_configuration(&self) -> Configuration {
        self.config
    }

    /// Gives the chip-select pin back.
    pub fn release(self) -> CS {
        self.cs
    }
}

impl<CS: OutputPin> Max31865<CS> {
    /// Bring the chip to the state the driver expects.
    ///
    /// Sets the lead configuration, switches bias off, selects one-shot mode and
    /// clears the faults, whatever state the chip was in. Calling it again is harmless.
    pub fn initialize<B: RegisterTransport>(
        &mut self,
        bus: &mut B,
    ) -> Max31865Result<(), B::BusError> {
        self.set_wires(bus, self.wires)?;
        self.set_bias(bus, false)?;
        self.set_auto_convert(bus, false)?;
        self.clear_faults(bus)?;
        log::debug!(
            "MAX31865 initialized for {}-wire RTD, config {:#04x}",
            self.wires.count(),
            self.config.into_bits()
        );
        Ok(())
    }

    /// Read the configuration register, refreshing the cached copy.
    pub fn configuration<B: RegisterTransport>(
        &mut self,
        bus: &mut B,
    ) -> Max31865Result<Configuration, B::BusError> {
        let mut val = [0; 1];
        bus.read_registers(&mut self.cs, Register::Config, &mut val)?;
        self.config = Configuration::from_bits(val[0]);
        Ok(self.config)
    }

    fn modify<B: RegisterTransport>(
        &mut self,
        bus: &mut B,
        f: impl FnOnce(Configuration) -> Configuration,
    ) -> Max31865Result<(), B::BusError> {
        let next = f(self.configuration(bus)?);
        bus.write_register(&mut self.cs, Register::Config, next.into_bits())?;
        self.config = next.settled();
        Ok(())
    }

    /// Set the RTD lead configuration.
    pub fn set_wires<B: RegisterTransport>(
        &mut self,
        bus: &mut B,
        wires: Wires,
    ) -> Max31865Result<(), B::BusError> {
        self.modify(bus, |cfg| cfg.with_wires(wires))?;
        self.wires = wires;
        Ok(())
    }

    /// Switch the RTD bias current on or off.
    pub fn set_bias<B: RegisterTransport>(
        &mut self,
        bus: &mut B,
        enable: bool,
    ) -> Max31865Result<(), B::BusError> {
        self.modify(bus, |cfg| cfg.with_bias(enable))
    }

    /// Select continuous conversions (`true`) or one-shot mode (`false`).
    pub fn set_auto_convert<B: RegisterTransport>(
        &mut self,
        bus: &mut B,
        enable: bool,
    ) -> Max31865Result<(), B::BusError> {
        self.modify(bus, |cfg| cfg.with_auto_convert(enable))
    }

    /// Select the mains rejection filter.
    pub fn set_filter<B: RegisterTransport>(
        &mut self,
        bus: &mut B,
        filter: NoiseFilter,
    ) -> Max31865Result<(), B::BusError> {
        self.modify(bus, |cfg| cfg.with_noise_filter(filter))
    }

    /// Clear the fault status register and re-arm fault detection.
    pub fn clear_faults<B: RegisterTransport>(
        &mut self,
        bus: &mut B,
    ) -> Max31865Result<(), B::BusError> {
        self.modify(bus, Configuration::with_fault_clear_pulse)
    }

    /// Read the fault status register.
    pub fn read_fault_status<B: RegisterTransport>(
        &mut self,
        bus: &mut B,
    ) -> Max31865Result<FaultStatus, B::BusError> {
        let mut val = [0; 1];
        bus.read_registers(&mut self.cs, Register::FaultStatus, &mut val)?;
        Ok(FaultStatus::from_bits(val[0]))
    }

    /// Run a single conversion and read the RTD data registers.
    ///
    /// Clears faults, switches bias on, waits [`BIAS_SETTLE_MS`], triggers the
    /// conversion, waits [`CONVERSION_MS`], reads the result and switches bias off
    /// again. Bias is switched off even when an earlier step failed; the first error
    /// is the one returned.
    ///
    /// The fault flag is left in the result.
    ///
    /// # Errors
    /// [`Max31865Error::AutoConvertActive`] if the chip is free-running; nothing is
    /// changed on the chip in that case.
    pub fn read_raw_conversion<B: RegisterTransport, D: DelayNs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
    ) -> Max31865Result<RtdData, B::BusError> {
        if self.configuration(bus)?.auto_convert() {
            return Err(Max31865Error::AutoConvertActive);
        }
        let res = self.one_shot(bus, delay);
        let cleanup = self.set_bias(bus, false);
        match (res, cleanup) {
            (Ok(data), Ok(())) => {
                log::debug!("RTD ratio {:#06x}, fault {}", data.ratio(), data.fault());
                Ok(data)
            }
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(_)) => {
                log::warn!("MAX31865 bias could not be switched off after a failed conversion");
                Err(e)
            }
        }
    }

    fn one_shot<B: RegisterTransport, D: DelayNs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
    ) -> Max31865Result<RtdData, B::BusError> {
        self.clear_faults(bus)?;
        self.set_bias(bus, true)?;
        delay.delay_ms(BIAS_SETTLE_MS);
        self.modify(bus, |cfg| cfg.with_one_shot(true))?;
        delay.delay_ms(CONVERSION_MS);
        let mut buf = [0; 2];
        bus.read_registers(&mut self.cs, Register::RtdMsb, &mut buf)?;
        Ok(RtdData::from_be_bytes(buf))
    }

    /// Run a single conversion and convert it to a temperature.
    pub fn measure_temperature<B: RegisterTransport, D: DelayNs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        calibration: &Calibration,
    ) -> Max31865Result<Measurement, B::BusError> {
        let raw = self.read_raw_conversion(bus, delay)?;
        Ok(Measurement::new(raw, calibration))
    }

    /// Program the fault thresholds as 15-bit ratio codes.
    ///
    /// See [`Calibration::ratio_for_temperature`] to derive them from temperatures.
    pub fn set_fault_thresholds<B: RegisterTransport>(
        &mut self,
        bus: &mut B,
        low: u16,
        high: u16,
    ) -> Max31865Result<(), B::BusError> {
        let [high_msb, high_lsb] = threshold_bytes(high);
        let [low_msb, low_lsb] = threshold_bytes(low);
        bus.write_register(&mut self.cs, Register::HighFaultMsb, high_msb)?;
        bus.write_register(&mut self.cs, Register::HighFaultLsb, high_lsb)?;
        bus.write_register(&mut self.cs, Register::LowFaultMsb, low_msb)?;
        bus.write_register(&mut self.cs, Register::LowFaultLsb, low_lsb)
    }

    /// Read the fault thresholds as `(low, high)` 15-bit ratio codes.
    pub fn fault_thresholds<B: RegisterTransport>(
        &mut self,
        bus: &mut B,
    ) -> Max31865Result<(u16, u16), B::BusError> {
        let mut buf = [0; 4];
        bus.read_registers(&mut self.cs, Register::HighFaultMsb, &mut buf)?;
        let high = RtdData::from_be_bytes([buf[0], buf[1]]).ratio();
        let low = RtdData::from_be_bytes([buf[2], buf[3]]).ratio();
        Ok((low, high))
    }
}

/// A converted RTD reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// RTD data registers as read, fault flag included.
    pub raw: RtdData,
    /// RTD resistance in ohms.
    pub resistance: f32,
    /// Temperature in degrees Celsius.
    pub celsius: f32,
}

impl Measurement {
    /// Converts raw RTD data with the given calibration.
    pub fn new(raw: RtdData, calibration: &Calibration) -> Self {
        Self {
            raw,
            resistance: raw.resistance(calibration),
            celsius: raw.temperature(calibration),
        }
    }

    /// Whether the conversion flagged a fault; read the fault status for details.
    pub fn has_fault(&self) -> bool {
        self.raw.fault()
    }
}
