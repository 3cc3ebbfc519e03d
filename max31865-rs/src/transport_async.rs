#![allow(async_fn_in_trait)]
use crate::{Max31865Error, Max31865Result, registers::Register, transport::release};
use embassy_futures::select::{Either, select};
use embedded_hal::digital::OutputPin;
use embedded_hal_async::{delay::DelayNs, spi::SpiBus};

/// Addressed register access to one MAX31865 on a shared bus, asynchronously.
///
/// Same framing and serialization rules as
/// [`RegisterTransport`](crate::RegisterTransport).
pub trait RegisterTransportAsync {
    /// Error of the underlying bus.
    type BusError;

    /// Read `buf.len()` consecutive registers starting at `reg` asynchronously.
    async fn read_registers<CS: OutputPin>(
        &mut self,
        cs: &mut CS,
        reg: Register,
        buf: &mut [u8],
    ) -> Max31865Result<(), Self::BusError>;

    /// Write `value` to `reg` asynchronously.
    async fn write_register<CS: OutputPin>(
        &mut self,
        cs: &mut CS,
        reg: Register,
        value: u8,
    ) -> Max31865Result<(), Self::BusError>;
}

/// Register transport over an asynchronous SPI bus.
///
/// Takes ownership of the bus (implementing [`SpiBus`](embedded_hal_async::spi::SpiBus))
/// and a timer implementing [`DelayNs`](embedded_hal_async::delay::DelayNs) that bounds
/// how long a transfer may take to complete.
pub struct SpiTransportAsync<SPI, D> {
    spi: SPI,
    delay: D,
    timeout_us: u32,
}

impl<SPI, D> SpiTransportAsync<SPI, D> {
    /// Creates a new transport with a 10 ms transfer timeout.
    pub fn new(spi: SPI, delay: D) -> Self {
        Self {
            spi,
            delay,
            timeout_us: 10_000,
        }
    }

    /// Set the transfer timeout.
    ///
    /// A transaction whose bus transfer has not completed after `timeout_us`
    /// microseconds is abandoned, its chip-select released, and
    /// [`Max31865Error::Timeout`] returned.
    pub fn with_timeout_us(mut self, timeout_us: u32) -> Self {
        self.timeout_us = timeout_us;
        self
    }

    /// Gives the bus and the timer back.
    pub fn release(self) -> (SPI, D) {
        (self.spi, self.delay)
    }
}

impl<SPI: SpiBus, D: DelayNs> RegisterTransportAsync for SpiTransportAsync<SPI, D> {
    type BusError = SPI::Error;

    async fn read_registers<CS: OutputPin>(
        &mut self,
        cs: &mut CS,
        reg: Register,
        buf: &mut [u8],
    ) -> Max31865Result<(), SPI::Error> {
        debug_assert!(!buf.is_empty(), "read of zero registers");
        cs.set_low().map_err(|_| Max31865Error::ChipSelect)?;
        let spi = &mut self.spi;
        let transfer = async {
            spi.write(&[reg.read_address()]).await?;
            spi.read(buf).await?;
            spi.flush().await?;
            Ok::<(), SPI::Error>(())
        };
        match select(transfer, self.delay.delay_us(self.timeout_us)).await {
            Either::First(res) => release(cs, res),
            Either::Second(()) => abandon(cs),
        }
    }

    async fn write_register<CS: OutputPin>(
        &mut self,
        cs: &mut CS,
        reg: Register,
        value: u8,
    ) -> Max31865Result<(), SPI::Error> {
        cs.set_low().map_err(|_| Max31865Error::ChipSelect)?;
        let spi = &mut self.spi;
        let transfer = async {
            spi.write(&[reg.write_address(), value]).await?;
            spi.flush().await?;
            Ok::<(), SPI::Error>(())
        };
        match select(transfer, self.delay.delay_us(self.timeout_us)).await {
            Either::First(res) => release(cs, res),
            Either::Second(()) => abandon(cs),
        }
    }
}

/// Release chip-select after a transfer that never completed; the timeout is
/// reported whether or not the release worked.
fn abandon<CS: OutputPin, E>(cs: &mut CS) -> Max31865Result<(), E> {
    if cs.set_high().is_err() {
        log::warn!("MAX31865 chip-select could not be released after a transfer timeout");
    }
    Err(Max31865Error::Timeout)
}
