use crate::{Max31865Error, Max31865Result, registers::Register};
use embedded_hal::{digital::OutputPin, spi::SpiBus};

/// Addressed register access to one MAX31865 on a shared bus.
///
/// Each call is one complete transaction: chip-select asserted, address and data
/// exchanged, completion awaited, chip-select released. Nothing serializes several
/// calls against each other; hold the transport by `&mut` (or behind a lock) for the
/// duration of a multi-register sequence.
pub trait RegisterTransport {
    /// Error of the underlying bus.
    type BusError;

    /// Read `buf.len()` consecutive registers starting at `reg` from the chip selected
    /// by `cs`.
    fn read_registers<CS: OutputPin>(
        &mut self,
        cs: &mut CS,
        reg: Register,
        buf: &mut [u8],
    ) -> Max31865Result<(), Self::BusError>;

    /// Write `value` to `reg` of the chip selected by `cs`.
    fn write_register<CS: OutputPin>(
        &mut self,
        cs: &mut CS,
        reg: Register,
        value: u8,
    ) -> Max31865Result<(), Self::BusError>;
}

/// Register transport over a blocking SPI bus shared by several chips.
///
/// The bus must be configured for SPI mode 1 or 3, at most 5 MHz, with hardware
/// chip-select disabled: each device drives its own chip-select pin.
pub struct SpiTransport<SPI> {
    spi: SPI,
}

impl<SPI> SpiTransport<SPI> {
    /// Creates a new transport on the given SPI bus.
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Gives the bus back.
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI: SpiBus> RegisterTransport for SpiTransport<SPI> {
    type BusError = SPI::Error;

    fn read_registers<CS: OutputPin>(
        &mut self,
        cs: &mut CS,
        reg: Register,
        buf: &mut [u8],
    ) -> Max31865Result<(), SPI::Error> {
        debug_assert!(!buf.is_empty(), "read of zero registers");
        cs.set_low().map_err(|_| Max31865Error::ChipSelect)?;
        let res = self
            .spi
            .write(&[reg.read_address()])
            .and_then(|_| self.spi.read(buf))
            .and_then(|_| self.spi.flush());
        release(cs, res)
    }

    fn write_register<CS: OutputPin>(
        &mut self,
        cs: &mut CS,
        reg: Register,
        value: u8,
    ) -> Max31865Result<(), SPI::Error> {
        cs.set_low().map_err(|_| Max31865Error::ChipSelect)?;
        let res = self
            .spi
            .write(&[reg.write_address(), value])
            .and_then(|_| self.spi.flush());
        release(cs, res)
    }
}

/// De-assert chip-select whatever the transfer did, then report the transfer
/// error first.
pub(crate) fn release<CS: OutputPin, E>(
    cs: &mut CS,
    res: Result<(), E>,
) -> Max31865Result<(), E> {
    let released = cs.set_high();
    res.map_err(Max31865Error::Bus)?;
    released.map_err(|_| Max31865Error::ChipSelect)
}
