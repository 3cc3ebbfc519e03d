#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]

/*! # MAX31865
 *
 * Driver for the Analog Devices MAX31865 RTD-to-digital converter.
 *
 * Several chips can share one SPI bus. The bus is wrapped once in a register
 * transport ([`SpiTransport`] or [`SpiTransportAsync`]); each chip is a [`Max31865`]
 * (or [`Max31865Async`]) owning its chip-select pin and borrowing the transport for
 * every operation.
 *
 * ```ignore
 * let mut bus = SpiTransport::new(spi);
 * let mut rtd = Max31865::new(cs, Wires::Three);
 * rtd.initialize(&mut bus)?;
 * let reading = rtd.measure_temperature(&mut bus, &mut delay, &Calibration::PT100_430)?;
 * ```
 */

mod device;
mod device_async;
mod error;
mod registers;
mod transport;
mod transport_async;

pub use device::{BIAS_SETTLE_MS, CONVERSION_MS, Max31865, Measurement};
pub use device_async::Max31865Async;
pub use error::{Max31865Error, UnsupportedWires};
pub use registers::{Configuration, Fault, FaultStatus, NoiseFilter, Register, RtdData, Wires};
pub use rtd_conversion::Calibration;
pub use transport::{RegisterTransport, SpiTransport};
pub use transport_async::{RegisterTransportAsync, SpiTransportAsync};

/// Results of MAX31865-specific function calls.
pub type Max31865Result<T, E> = Result<T, Max31865Error<E>>;
