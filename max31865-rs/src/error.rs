use core::fmt;

#[derive(Debug)]
/// MAX31865 driver errors.
///
/// Fault conditions reported by the chip itself are not errors; they come back as
/// [`FaultStatus`](crate::FaultStatus) or the fault flag of
/// [`RtdData`](crate::RtdData).
pub enum Max31865Error<E> {
    /// SPI bus errors.
    Bus(E),
    /// Driving the chip-select line failed.
    ChipSelect,
    /// The bus transfer did not complete in time.
    Timeout,
    /// A one-shot conversion was requested while the chip is in auto-convert mode.
    AutoConvertActive,
    /// The wire count is not 2, 3 or 4.
    UnsupportedWires(u8),
}

impl<E> Max31865Error<E> {
    /// Whether the error means the chip could not be talked to, as opposed to
    /// being asked for something it cannot do.
    pub fn is_transport_fault(&self) -> bool {
        matches!(self, Self::Bus(_) | Self::ChipSelect | Self::Timeout)
    }
}

impl<E: fmt::Debug> fmt::Display for Max31865Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "SPI transfer failed: {e:?}"),
            Self::ChipSelect => f.write_str("chip-select line could not be driven"),
            Self::Timeout => f.write_str("SPI transfer timed out"),
            Self::AutoConvertActive => {
                f.write_str("one-shot conversion requested while auto-convert is enabled")
            }
            Self::UnsupportedWires(n) => write!(f, "unsupported RTD wire count {n}"),
        }
    }
}

/// A wire count other than 2, 3 or 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedWires(pub u8);

impl fmt::Display for UnsupportedWires {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported RTD wire count {}, expected 2, 3 or 4", self.0)
    }
}

impl core::error::Error for UnsupportedWires {}

impl<E> From<UnsupportedWires> for Max31865Error<E> {
    fn from(value: UnsupportedWires) -> Self {
        Self::UnsupportedWires(value.0)
    }
}
