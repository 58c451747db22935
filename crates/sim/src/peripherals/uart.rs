// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serial_bridge::hal::{
    BaudDivisor, ClockSource, FifoLevel, FrameFormat, InterruptFlags, PeripheralId, ReadOutcome,
    WriteOutcome,
};
use serial_bridge::BaudRate;
use std::collections::VecDeque;

/// FIFO-level UART model.
///
/// The receive side raises `RECEIVE` when the FIFO reaches its trigger level
/// and drops it once reads take the FIFO back below. `RECEIVE_TIMEOUT` is
/// raised when the line goes idle with data still queued and drops when the
/// FIFO empties. The transmit side never drains by itself; units stay queued
/// until [`Uart::shift_out`] moves them onto the wire.
#[derive(Debug)]
pub struct Uart {
    id: PeripheralId,
    depth: usize,
    rx: VecDeque<u8>,
    tx: VecDeque<u8>,
    wire: Vec<u8>,
    raw: InterruptFlags,
    mask: InterruptFlags,
    rx_trigger: FifoLevel,
    clock_source: ClockSource,
    frame: Option<FrameFormat>,
    baud: Option<BaudRate>,
    clock_hz: u32,
    divisor: Option<BaudDivisor>,
    overruns: u32,
    /// Good reads left before one read comes back empty.
    spurious_after: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UartSnapshot {
    pub peripheral: PeripheralId,
    pub depth: usize,
    pub rx: Vec<u8>,
    pub tx: Vec<u8>,
    pub wire: Vec<u8>,
    pub raw_flags: u32,
    pub mask: u32,
    pub baud: Option<u32>,
    pub actual_baud: Option<u32>,
    pub word_length: Option<u8>,
    pub overruns: u32,
}

impl Uart {
    pub fn new(id: PeripheralId, depth: usize) -> Self {
        Self {
            id,
            depth,
            rx: VecDeque::with_capacity(depth),
            tx: VecDeque::with_capacity(depth),
            wire: Vec::new(),
            raw: InterruptFlags::empty(),
            mask: InterruptFlags::empty(),
            rx_trigger: FifoLevel::Half,
            clock_source: ClockSource::System,
            frame: None,
            baud: None,
            clock_hz: 0,
            divisor: None,
            overruns: 0,
            spurious_after: None,
        }
    }

    pub fn id(&self) -> PeripheralId {
        self.id
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn set_clock_source(&mut self, source: ClockSource) {
        self.clock_source = source;
    }

    pub fn clock_source(&self) -> ClockSource {
        self.clock_source
    }

    /// Program line control and the baud-rate generator. Flushes both FIFOs.
    pub fn set_frame(&mut self, clock_hz: u32, baud: BaudRate, frame: FrameFormat) {
        self.rx.clear();
        self.tx.clear();
        self.frame = Some(frame);
        self.baud = Some(baud);
        self.clock_hz = clock_hz;
        self.divisor = Some(BaudDivisor::new(clock_hz, baud));
    }

    pub fn frame(&self) -> Option<FrameFormat> {
        self.frame
    }

    pub fn divisor(&self) -> Option<BaudDivisor> {
        self.divisor
    }

    pub fn set_rx_trigger(&mut self, level: FifoLevel) {
        self.rx_trigger = level;
    }

    fn rx_threshold(&self) -> usize {
        self.rx_trigger.threshold(self.depth)
    }

    pub fn enable_interrupts(&mut self, flags: InterruptFlags) {
        self.mask |= flags;
    }

    pub fn disable_interrupts(&mut self, flags: InterruptFlags) {
        self.mask &= !flags;
    }

    /// Conditions enabled at the peripheral.
    pub fn enabled(&self) -> InterruptFlags {
        self.mask
    }

    pub fn status(&self, masked: bool) -> InterruptFlags {
        if masked {
            self.raw & self.mask
        } else {
            self.raw
        }
    }

    pub fn clear(&mut self, flags: InterruptFlags) {
        self.raw &= !flags;
    }

    /// An enabled condition is asserted.
    pub fn irq_pending(&self) -> bool {
        !self.status(true).is_empty()
    }

    /// A unit arrives on the receive line. Returns `false` on overrun.
    pub fn push_rx(&mut self, unit: u8) -> bool {
        if self.rx.len() >= self.depth {
            self.overruns += 1;
            self.raw |= InterruptFlags::OVERRUN_ERROR;
            return false;
        }
        let mask = self
            .frame
            .map(|f| f.word_length.mask())
            .unwrap_or(u8::MAX);
        self.rx.push_back(unit & mask);
        if self.rx.len() >= self.rx_threshold() {
            self.raw |= InterruptFlags::RECEIVE;
        }
        true
    }

    /// The receive line has been quiet for the timeout period.
    pub fn line_idle(&mut self) {
        if !self.rx.is_empty() {
            self.raw |= InterruptFlags::RECEIVE_TIMEOUT;
        }
    }

    pub fn rx_available(&self) -> bool {
        !self.rx.is_empty()
    }

    pub fn read(&mut self) -> ReadOutcome {
        if let Some(left) = self.spurious_after {
            if left == 0 {
                self.spurious_after = None;
                return ReadOutcome::Empty;
            }
            self.spurious_after = Some(left - 1);
        }

        let Some(unit) = self.rx.pop_front() else {
            return ReadOutcome::Empty;
        };
        if self.rx.len() < self.rx_threshold() {
            self.raw &= !InterruptFlags::RECEIVE;
        }
        if self.rx.is_empty() {
            self.raw &= !InterruptFlags::RECEIVE_TIMEOUT;
        }
        ReadOutcome::Data(unit)
    }

    pub fn write(&mut self, unit: u8) -> WriteOutcome {
        if self.tx.len() >= self.depth {
            return WriteOutcome::Full;
        }
        self.tx.push_back(unit);
        WriteOutcome::Queued
    }

    /// Move up to `count` units (all when `None`) from the transmit FIFO onto the wire.
    pub fn shift_out(&mut self, count: Option<usize>) -> usize {
        let n = count.unwrap_or(self.tx.len()).min(self.tx.len());
        self.wire.extend(self.tx.drain(..n));
        n
    }

    /// Everything written for transmission so far: already on the wire, then still queued.
    pub fn transmitted(&self) -> Vec<u8> {
        self.wire.iter().chain(self.tx.iter()).copied().collect()
    }

    pub fn rx_len(&self) -> usize {
        self.rx.len()
    }

    pub fn tx_len(&self) -> usize {
        self.tx.len()
    }

    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    /// After `after` more successful reads, the next read reports empty once.
    pub fn inject_spurious_empty(&mut self, after: usize) {
        self.spurious_after = Some(after);
    }

    pub fn to_snapshot(&self) -> UartSnapshot {
        UartSnapshot {
            peripheral: self.id,
            depth: self.depth,
            rx: self.rx.iter().copied().collect(),
            tx: self.tx.iter().copied().collect(),
            wire: self.wire.clone(),
            raw_flags: self.raw.bits(),
            mask: self.mask.bits(),
            baud: self.baud.map(BaudRate::bps),
            actual_baud: self.divisor.map(|d| d.actual_bps(self.clock_hz)),
            word_length: self.frame.map(|f| f.word_length.bits()),
            overruns: self.overruns,
        }
    }
}

impl crate::Peripheral for Uart {
    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self.to_snapshot()).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_bridge::hal::WordLength;

    fn uart(depth: usize) -> Uart {
        let mut uart = Uart::new(PeripheralId::Uart0, depth);
        uart.set_frame(16_000_000, BaudRate::new(115_200), FrameFormat::EIGHT_N_ONE);
        uart.set_rx_trigger(FifoLevel::OneEighth);
        uart.enable_interrupts(InterruptFlags::RECEIVE | InterruptFlags::RECEIVE_TIMEOUT);
        uart
    }

    #[test]
    fn test_receive_raises_at_trigger_level() {
        let mut uart = uart(16);
        uart.push_rx(1);
        assert!(!uart.irq_pending());
        uart.push_rx(2);
        assert_eq!(uart.status(true), InterruptFlags::RECEIVE);

        assert_eq!(uart.read(), ReadOutcome::Data(1));
        assert!(!uart.irq_pending());
        assert_eq!(uart.rx_len(), 1);
    }

    #[test]
    fn test_timeout_needs_queued_data() {
        let mut uart = uart(16);
        uart.line_idle();
        assert!(!uart.irq_pending());

        uart.push_rx(7);
        uart.line_idle();
        assert_eq!(uart.status(true), InterruptFlags::RECEIVE_TIMEOUT);
        assert_eq!(uart.read(), ReadOutcome::Data(7));
        assert!(!uart.irq_pending());
    }

    #[test]
    fn test_masked_status_hides_disabled_conditions() {
        let mut uart = uart(16);
        uart.disable_interrupts(InterruptFlags::RECEIVE_TIMEOUT);
        uart.push_rx(1);
        uart.line_idle();
        assert_eq!(uart.status(false), InterruptFlags::RECEIVE_TIMEOUT);
        assert!(uart.status(true).is_empty());
    }

    #[test]
    fn test_full_rx_fifo_overruns() {
        let mut uart = uart(4);
        for unit in 0..4 {
            assert!(uart.push_rx(unit));
        }
        assert!(!uart.push_rx(4));
        assert_eq!(uart.overruns(), 1);
        assert!(uart.status(false).contains(InterruptFlags::OVERRUN_ERROR));
        assert_eq!(uart.rx_len(), 4);
    }

    #[test]
    fn test_tx_fifo_reports_full() {
        let mut uart = uart(2);
        assert_eq!(uart.write(b'a'), WriteOutcome::Queued);
        assert_eq!(uart.write(b'b'), WriteOutcome::Queued);
        assert_eq!(uart.write(b'c'), WriteOutcome::Full);

        assert_eq!(uart.shift_out(Some(1)), 1);
        assert_eq!(uart.write(b'd'), WriteOutcome::Queued);
        assert_eq!(uart.transmitted(), b"abd");
        assert_eq!(uart.shift_out(None), 2);
        assert_eq!(uart.tx_len(), 0);
    }

    #[test]
    fn test_spurious_empty_fires_once() {
        let mut uart = uart(16);
        for unit in [1, 2, 3] {
            uart.push_rx(unit);
        }
        uart.inject_spurious_empty(1);
        assert_eq!(uart.read(), ReadOutcome::Data(1));
        assert_eq!(uart.read(), ReadOutcome::Empty);
        assert!(uart.rx_available());
        assert_eq!(uart.read(), ReadOutcome::Data(2));
    }

    #[test]
    fn test_word_length_masks_received_units() {
        let mut uart = uart(16);
        let frame = FrameFormat {
            word_length: WordLength::Seven,
            ..FrameFormat::EIGHT_N_ONE
        };
        uart.set_frame(16_000_000, BaudRate::new(9_600), frame);
        uart.push_rx(0xFF);
        assert_eq!(uart.read(), ReadOutcome::Data(0x7F));
    }
}
