#![allow(dead_code)]
//! A simulated board: MAX31865 chips sharing one SPI bus, each behind its own
//! chip-select line.

use std::{cell::RefCell, convert::Infallible, rc::Rc};

use embedded_hal::{
    digital::{self, OutputPin},
    spi,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeSpiError;

impl spi::Error for FakeSpiError {
    fn kind(&self) -> spi::ErrorKind {
        spi::ErrorKind::Other
    }
}

/// Register-level model of one chip.
#[derive(Debug, Default)]
pub struct Chip {
    pub regs: [u8; 8],
    /// Ratio code the next conversion reports.
    pub ratio: u16,
    /// Fault bits the next conversion latches.
    pub conversion_faults: u8,
    pub conversions: usize,
    pub conversions_without_bias: usize,
    pub config_writes: Vec<u8>,
}

impl Chip {
    pub fn config(&self) -> u8 {
        self.regs[0]
    }

    pub fn bias(&self) -> bool {
        self.regs[0] & 0x80 != 0
    }

    fn write(&mut self, addr: usize, value: u8) {
        match addr {
            0 => self.write_config(value),
            3..=6 => self.regs[addr] = value,
            _ => {}
        }
    }

    fn write_config(&mut self, value: u8) {
        self.config_writes.push(value);
        let mut cfg = value;
        if cfg & 0x02 != 0 {
            self.regs[7] = 0;
            cfg &= !0x02;
        }
        if cfg & 0x20 != 0 {
            cfg &= !0x20;
            self.conversions += 1;
            if cfg & 0x80 != 0 {
                self.regs[7] |= self.conversion_faults;
                let data = (self.ratio << 1) | (self.conversion_faults != 0) as u16;
                self.regs[1..3].copy_from_slice(&data.to_be_bytes());
            } else {
                self.conversions_without_bias += 1;
            }
        }
        self.regs[0] = cfg;
    }
}

#[derive(Debug, Default)]
struct Frame {
    addr: Option<u8>,
    offset: usize,
    failed: bool,
    stalled: bool,
}

#[derive(Debug, Default)]
pub struct Board {
    pub chips: Vec<Chip>,
    selected: Option<usize>,
    frame: Frame,
    /// Chip-select assertions so far.
    pub frames: usize,
    /// Frames (1-based) whose transfers fail.
    pub fail_frames: Vec<usize>,
    /// Frame (1-based) whose transfers never complete.
    pub stall_frame: Option<usize>,
}

impl Board {
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn any_bias(&self) -> bool {
        self.chips.iter().any(Chip::bias)
    }

    fn select(&mut self, index: usize) {
        if let Some(other) = self.selected {
            panic!("chip-select {index} asserted while {other} is active");
        }
        self.frames += 1;
        self.frame = Frame {
            failed: self.fail_frames.contains(&self.frames),
            stalled: self.stall_frame == Some(self.frames),
            ..Default::default()
        };
        self.selected = Some(index);
    }

    fn deselect(&mut self, index: usize) {
        if self.selected == Some(index) {
            self.selected = None;
        }
    }

    fn stalled(&self) -> bool {
        self.selected.is_some() && self.frame.stalled
    }

    fn write(&mut self, words: &[u8]) -> Result<(), FakeSpiError> {
        let index = self.selected.expect("SPI write without chip-select");
        if self.frame.failed {
            return Err(FakeSpiError);
        }
        for &byte in words {
            match self.frame.addr {
                None => self.frame.addr = Some(byte),
                Some(addr) if addr & 0x80 != 0 => {
                    let reg = (addr & 0x7f) as usize + self.frame.offset;
                    self.chips[index].write(reg, byte);
                    self.frame.offset += 1;
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn read(&mut self, words: &mut [u8]) -> Result<(), FakeSpiError> {
        let index = self.selected.expect("SPI read without chip-select");
        if self.frame.failed {
            return Err(FakeSpiError);
        }
        let addr = self.frame.addr.expect("SPI read before the address byte");
        assert_eq!(addr & 0x80, 0, "read with the write bit set");
        for word in words.iter_mut() {
            let reg = (addr as usize + self.frame.offset) % 8;
            *word = self.chips[index].regs[reg];
            self.frame.offset += 1;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), FakeSpiError> {
        if self.frame.failed {
            Err(FakeSpiError)
        } else {
            Ok(())
        }
    }
}

pub type SharedBoard = Rc<RefCell<Board>>;

/// A board with `chips` chips, the bus and one chip-select per chip.
pub fn board(chips: usize) -> (SharedBoard, FakeSpi, Vec<FakeCs>) {
    let board = Rc::new(RefCell::new(Board {
        chips: (0..chips).map(|_| Chip::default()).collect(),
        ..Default::default()
    }));
    let cs = (0..chips)
        .map(|index| FakeCs {
            board: board.clone(),
            index,
        })
        .collect();
    (board.clone(), FakeSpi { board }, cs)
}

pub struct FakeCs {
    board: SharedBoard,
    index: usize,
}

impl digital::ErrorType for FakeCs {
    type Error = Infallible;
}

impl digital::OutputPin for FakeCs {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.board.borrow_mut().select(self.index);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.board.borrow_mut().deselect(self.index);
        Ok(())
    }
}

/// Chip-select that drives its line but reports an error on every release.
pub struct FailingRelease(pub FakeCs);

impl digital::ErrorType for FailingRelease {
    type Error = digital::ErrorKind;
}

impl digital::OutputPin for FailingRelease {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_low().map_err(|e| match e {})
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_high().map_err(|e| match e {})?;
        Err(digital::ErrorKind::Other)
    }
}

pub struct FakeSpi {
    board: SharedBoard,
}

impl FakeSpi {
    pub fn into_async(self) -> FakeSpiAsync {
        FakeSpiAsync { board: self.board }
    }
}

impl spi::ErrorType for FakeSpi {
    type Error = FakeSpiError;
}

impl spi::SpiBus for FakeSpi {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.board.borrow_mut().read(words)
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        self.board.borrow_mut().write(words)
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.board.borrow_mut().write(write)?;
        read.fill(0);
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.board.borrow_mut().write(words)?;
        words.fill(0);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.board.borrow_mut().flush()
    }
}

pub struct FakeSpiAsync {
    board: SharedBoard,
}

impl FakeSpiAsync {
    async fn stall_if_asked(&self) {
        if self.board.borrow().stalled() {
            core::future::pending::<()>().await;
        }
    }
}

impl spi::ErrorType for FakeSpiAsync {
    type Error = FakeSpiError;
}

impl embedded_hal_async::spi::SpiBus for FakeSpiAsync {
    async fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.stall_if_asked().await;
        self.board.borrow_mut().read(words)
    }

    async fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        self.stall_if_asked().await;
        self.board.borrow_mut().write(words)
    }

    async fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.stall_if_asked().await;
        self.board.borrow_mut().write(write)?;
        read.fill(0);
        Ok(())
    }

    async fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.stall_if_asked().await;
        self.board.borrow_mut().write(words)?;
        words.fill(0);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.stall_if_asked().await;
        self.board.borrow_mut().flush()
    }
}

/// Delay that returns at once, noting each millisecond wait and whether any chip
/// had bias on at the time.
pub struct RecordingDelay {
    board: SharedBoard,
    pub waits: Vec<(u32, bool)>,
}

impl RecordingDelay {
    pub fn new(board: &SharedBoard) -> Self {
        Self {
            board: board.clone(),
            waits: Vec::new(),
        }
    }

    fn record(&mut self, ms: u32) {
        let bias = self.board.borrow().any_bias();
        self.waits.push((ms, bias));
    }
}

impl embedded_hal::delay::DelayNs for RecordingDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.record(ms);
    }
}

impl embedded_hal_async::delay::DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, _ns: u32) {}

    async fn delay_ms(&mut self, ms: u32) {
        self.record(ms);
    }
}

/// Timer for the async transport timeout: expires immediately, so any transfer
/// that is not ready on its first poll times out.
pub struct Expired;

impl embedded_hal_async::delay::DelayNs for Expired {
    async fn delay_ns(&mut self, _ns: u32) {}
}
