use crate::{
    Max31865Error, Max31865Result, Measurement, RegisterTransportAsync,
    device::{BIAS_SETTLE_MS, CONVERSION_MS},
    registers::{Configuration, FaultStatus, NoiseFilter, Register, RtdData, Wires, threshold_bytes},
};
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use rtd_conversion::Calibration;

/// A MAX31865 RTD-to-digital converter on a shared SPI bus, driven asynchronously.
///
/// Mirrors [`Max31865`](crate::Max31865) over a [`RegisterTransportAsync`].
pub struct Max31865Async<CS> {
    pub(crate) cs: CS,
    pub(crate) wires: Wires,
    pub(crate) config: Configuration,
}

impl<CS> Max31865Async<CS> {
    /// Creates a new instance of [`Max31865Async`] bound to a chip-select pin.
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

    /// Last configuration read from or written to the chip.
    pub fn cached_configuration(&self) -> Configuration {
        self.config
    }

    /// Gives the chip-select pin back.
    pub fn release(self) -> CS {
        self.cs
    }
}

impl<CS: OutputPin> Max31865Async<CS> {
    /// Bring the chip to the state the driver expects, asynchronously.
    pub async fn initialize<B: RegisterTransportAsync>(
        &mut self,
        bus: &mut B,
    ) -> Max31865Result<(), B::BusError> {
        self.set_wires(bus, self.wires).await?;
        self.set_bias(bus, false).await?;
        self.set_auto_convert(bus, false).await?;
        self.clear_faults(bus).await?;
        log::debug!(
            "MAX31865 initialized for {}-wire RTD, config {:#04x}",
            self.wires.count(),
            self.config.into_bits()
        );
        Ok(())
    }

    /// Read the configuration register, refreshing the cached copy.
    pub async fn configuration<B: RegisterTransportAsync>(
        &mut self,
        bus: &mut B,
    ) -> Max31865Result<Configuration, B::BusError> {
        let mut val = [0; 1];
        bus.read_registers(&mut self.cs, Register::Config, &mut val).await?;
        self.config = Configuration::from_bits(val[0]);
        Ok(self.config)
    }

    async fn modify<B: RegisterTransportAsync>(
        &mut self,
        bus: &mut B,
        f: impl FnOnce(Configuration) -> Configuration,
    ) -> Max31865Result<(), B::BusError> {
        let next = f(self.configuration(bus).await?);
        bus.write_register(&mut self.cs, Register::Config, next.into_bits()).await?;
        self.config = next.settled();
        Ok(())
    }

    /// Set the RTD lead configuration.
    pub async fn set_wires<B: RegisterTransportAsync>(
        &mut self,
        bus: &mut B,
        wires: Wires,
    ) -> Max31865Result<(), B::BusError> {
        self.modify(bus, |cfg| cfg.with_wires(wires)).await?;
        self.wires = wires;
        Ok(())
    }

    /// Switch the RTD bias current on or off.
    pub async fn set_bias<B: RegisterTransportAsync>(
        &mut self,
        bus: &mut B,
        enable: bool,
    ) -> Max31865Result<(), B::BusError> {
        self.modify(bus, |cfg| cfg.with_bias(enable)).await
    }

    /// Select continuous conversions (`true`) or one-shot mode (`false`).
    pub async fn set_auto_convert<B: RegisterTransportAsync>(
        &mut self,
        bus: &mut B,
        enable: bool,
    ) -> Max31865Result<(), B::BusError> {
        self.modify(bus, |cfg| cfg.with_auto_convert(enable)).await
    }

    /// Select the mains rejection filter.
    pub async fn set_filter<B: RegisterTransportAsync>(
        &mut self,
        bus: &mut B,
        filter: NoiseFilter,
    ) -> Max31865Result<(), B::BusError> {
        self.modify(bus, |cfg| cfg.with_noise_filter(filter)).await
    }

    /// Clear the fault status register and re-arm fault detection.
    pub async fn clear_faults<B: RegisterTransportAsync>(
        &mut self,
        bus: &mut B,
    ) -> Max31865Result<(), B::BusError> {
        self.modify(bus, Configuration::with_fault_clear_pulse).await
    }

    /// Read the fault status register.
    pub async fn read_fault_status<B: RegisterTransportAsync>(
        &mut self,
        bus: &mut B,
    ) -> Max31865Result<FaultStatus, B::BusError> {
        let mut val = [0; 1];
        bus.read_registers(&mut self.cs, Register::FaultStatus, &mut val).await?;
        Ok(FaultStatus::from_bits(val[0]))
    }

    /// Run a single conversion and read the RTD data registers.
    ///
    /// Same sequence and cleanup guarantee as
    /// [`Max31865::read_raw_conversion`](crate::Max31865::read_raw_conversion); a
    /// transfer timeout aborts the sequence like any other transport fault.
    pub async fn read_raw_conversion<B: RegisterTransportAsync, D: DelayNs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
    ) -> Max31865Result<RtdData, B::BusError> {
        if self.configuration(bus).await?.auto_convert() {
            return Err(Max31865Error::AutoConvertActive);
        }
        let res = self.one_shot(bus, delay).await;
        let cleanup = self.set_bias(bus, false).await;
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

    async fn one_shot<B: RegisterTransportAsync, D: DelayNs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
    ) -> Max31865Result<RtdData, B::BusError> {
        self.clear_faults(bus).await?;
        self.set_bias(bus, true).await?;
        delay.delay_ms(BIAS_SETTLE_MS).await;
        self.modify(bus, |cfg| cfg.with_one_shot(true)).await?;
        delay.delay_ms(CONVERSION_MS).await;
        let mut buf = [0; 2];
        bus.read_registers(&mut self.cs, Register::RtdMsb, &mut buf).await?;
        Ok(RtdData::from_be_bytes(buf))
    }

    /// Run a single conversion and convert it to a temperature.
    pub async fn measure_temperature<B: RegisterTransportAsync, D: DelayNs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        calibration: &Calibration,
    ) -> Max31865Result<Measurement, B::BusError> {
        let raw = self.read_raw_conversion(bus, delay).await?;
        Ok(Measurement::new(raw, calibration))
    }

    /// Program the fault thresholds as 15-bit ratio codes.
    pub async fn set_fault_thresholds<B: RegisterTransportAsync>(
        &mut self,
        bus: &mut B,
        low: u16,
        high: u16,
    ) -> Max31865Result<(), B::BusError> {
        let [high_msb, high_lsb] = threshold_bytes(high);
        let [low_msb, low_lsb] = threshold_bytes(low);
        bus.write_register(&mut self.cs, Register::HighFaultMsb, high_msb).await?;
        bus.write_register(&mut self.cs, Register::HighFaultLsb, high_lsb).await?;
        bus.write_register(&mut self.cs, Register::LowFaultMsb, low_msb).await?;
        bus.write_register(&mut self.cs, Register::LowFaultLsb, low_lsb).await
    }

    /// Read the fault thresholds as `(low, high)` 15-bit ratio codes.
    pub async fn fault_thresholds<B: RegisterTransportAsync>(
        &mut self,
        bus: &mut B,
    ) -> Max31865Result<(u16, u16), B::BusError> {
        let mut buf = [0; 4];
        bus.read_registers(&mut self.cs, Register::HighFaultMsb, &mut buf).await?;
        let high = RtdData::from_be_bytes([buf[0], buf[1]]).ratio();
        let low = RtdData::from_be_bytes([buf[2], buf[3]]).ratio();
        Ok((low, high))
    }
}
