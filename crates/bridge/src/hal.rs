// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Hardware capability consumed by the bridge.
//!
//! Everything the configurator and the transfer engine need from the chip is
//! expressed through [`SerialHal`] (peripheral level) and [`CorePlatform`]
//! (core level). The firmware implements both on top of raw registers; the
//! simulator implements them on top of modelled FIFOs.

use crate::descriptor::{BaudRate, ChannelRole};

/// Physical UART instance. Each maps to exactly one register block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PeripheralId {
    Uart0,
    Uart1,
    Uart2,
    Uart3,
    Uart4,
    Uart5,
    Uart6,
    Uart7,
}

impl PeripheralId {
    pub const ALL: [PeripheralId; 8] = [
        PeripheralId::Uart0,
        PeripheralId::Uart1,
        PeripheralId::Uart2,
        PeripheralId::Uart3,
        PeripheralId::Uart4,
        PeripheralId::Uart5,
        PeripheralId::Uart6,
        PeripheralId::Uart7,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::ALL.len() {
            Some(Self::ALL[index])
        } else {
            None
        }
    }
}

/// GPIO port (pin controller) instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Port {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Port {
    pub const ALL: [Port; 6] = [Port::A, Port::B, Port::C, Port::D, Port::E, Port::F];

    pub const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pin {
    pub port: Port,
    pub number: u8,
}

impl Pin {
    pub const fn new(port: Port, number: u8) -> Self {
        Self { port, number }
    }
}

/// Port-control mux value selecting a pin's alternate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AltFunction(pub u8);

/// A gateable clock domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockDomain {
    Port(Port),
    Serial(PeripheralId),
}

/// Clock feeding a UART's baud-rate generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ClockSource {
    /// The system clock as set up by [`CorePlatform::set_system_clock`].
    System,
    /// The 16 MHz precision internal oscillator.
    PrecisionInternal,
}

impl ClockSource {
    pub const PRECISION_INTERNAL_HZ: u32 = 16_000_000;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordLength {
    Five,
    Six,
    Seven,
    Eight,
}

impl WordLength {
    pub const fn bits(self) -> u8 {
        match self {
            WordLength::Five => 5,
            WordLength::Six => 6,
            WordLength::Seven => 7,
            WordLength::Eight => 8,
        }
    }

    /// Mask applied to a received unit of this width.
    pub const fn mask(self) -> u8 {
        ((1u16 << self.bits()) - 1) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopBits {
    One,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Parity {
    None,
    Even,
    Odd,
    /// Parity bit always set.
    One,
    /// Parity bit always clear.
    Zero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameFormat {
    pub word_length: WordLength,
    pub stop_bits: StopBits,
    pub parity: Parity,
}

impl FrameFormat {
    /// 8 data bits, no parity, 1 stop bit.
    pub const EIGHT_N_ONE: FrameFormat = FrameFormat {
        word_length: WordLength::Eight,
        stop_bits: StopBits::One,
        parity: Parity::None,
    };
}

/// Baud-rate generator divisor for 16x oversampling, in whole and 1/64 parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaudDivisor {
    pub integer: u32,
    pub fraction: u32,
}

impl BaudDivisor {
    /// `clock_hz / (16 * baud)`, rounded to the nearest 1/64.
    pub const fn new(clock_hz: u32, baud: BaudRate) -> Self {
        let div = ((clock_hz as u64 * 8 / baud.bps() as u64) + 1) / 2;
        Self {
            integer: (div / 64) as u32,
            fraction: (div % 64) as u32,
        }
    }

    /// Rate the generator really produces from `clock_hz`.
    pub const fn actual_bps(&self, clock_hz: u32) -> u32 {
        let sixty_fourths = self.integer as u64 * 64 + self.fraction as u64;
        if sixty_fourths == 0 {
            return 0;
        }
        (clock_hz as u64 * 4 / sixty_fourths) as u32
    }
}

/// Receive FIFO fill level that asserts the data-available condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FifoLevel {
    OneEighth,
    OneQuarter,
    Half,
    ThreeQuarters,
    SevenEighths,
}

impl FifoLevel {
    /// Number of entries at which a FIFO of `depth` entries reaches this level.
    pub const fn threshold(self, depth: usize) -> usize {
        let eighths = match self {
            FifoLevel::OneEighth => 1,
            FifoLevel::OneQuarter => 2,
            FifoLevel::Half => 4,
            FifoLevel::ThreeQuarters => 6,
            FifoLevel::SevenEighths => 7,
        };
        let level = depth * eighths / 8;
        if level == 0 {
            1
        } else {
            level
        }
    }
}

bitflags::bitflags! {
    /// UART interrupt conditions. Bit positions follow the TM4C123 UARTIM layout.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InterruptFlags: u32 {
        /// Receive FIFO reached its trigger level.
        const RECEIVE = 1 << 4;
        /// Transmit FIFO drained to its trigger level.
        const TRANSMIT = 1 << 5;
        /// Receive FIFO non-empty and the line went idle.
        const RECEIVE_TIMEOUT = 1 << 6;
        const FRAMING_ERROR = 1 << 7;
        const PARITY_ERROR = 1 << 8;
        const BREAK_ERROR = 1 << 9;
        const OVERRUN_ERROR = 1 << 10;
    }
}

/// Result of a non-blocking read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Data(u8),
    /// Nothing to read, even if availability was reported a moment earlier.
    Empty,
}

/// Result of a non-blocking write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Queued,
    Full,
}

/// Fixed system clock policy: source oscillator, PLL use and divider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemClock {
    pub crystal_hz: u32,
    pub use_pll: bool,
    pub divisor: u32,
}

impl SystemClock {
    /// PLL output frequency after its fixed /2 post divider.
    pub const PLL_HZ: u32 = 200_000_000;

    pub const fn frequency(&self) -> u32 {
        let input = if self.use_pll {
            Self::PLL_HZ
        } else {
            self.crystal_hz
        };
        input / self.divisor
    }
}

/// Peripheral-level hardware operations used by the configurator and engine.
pub trait SerialHal {
    /// Enable clocking for a domain. Must be idempotent.
    fn enable_clock_domain(&mut self, domain: ClockDomain);
    fn bind_pin(&mut self, pin: Pin, function: AltFunction);
    fn set_clock_source(&mut self, id: PeripheralId, source: ClockSource);
    /// Input frequency delivered by `source`.
    fn clock_frequency(&self, source: ClockSource) -> u32;
    fn set_frame(&mut self, id: PeripheralId, clock_hz: u32, baud: BaudRate, frame: FrameFormat);
    fn set_fifo_trigger(&mut self, id: PeripheralId, level: FifoLevel);
    fn enable_interrupts(&mut self, id: PeripheralId, flags: InterruptFlags);
    fn disable_interrupts(&mut self, id: PeripheralId, flags: InterruptFlags);
    /// Route the peripheral's interrupt line to the engine serving `role`.
    fn bind_handler(&mut self, id: PeripheralId, role: ChannelRole);
    /// Pending interrupt causes; `masked` restricts them to enabled conditions.
    fn interrupt_status(&self, id: PeripheralId, masked: bool) -> InterruptFlags;
    fn clear_interrupts(&mut self, id: PeripheralId, flags: InterruptFlags);
    fn rx_available(&self, id: PeripheralId) -> bool;
    fn read(&mut self, id: PeripheralId) -> ReadOutcome;
    fn write(&mut self, id: PeripheralId, unit: u8) -> WriteOutcome;
}

/// Core-level operations used only by the bootstrap.
pub trait CorePlatform {
    fn set_system_clock(&mut self, clock: SystemClock);
    fn enable_global_interrupts(&mut self);
    /// Suspend the core until an interrupt has been serviced.
    fn wait_for_interrupt(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_thresholds_for_sixteen_entries() {
        assert_eq!(FifoLevel::OneEighth.threshold(16), 2);
        assert_eq!(FifoLevel::OneQuarter.threshold(16), 4);
        assert_eq!(FifoLevel::Half.threshold(16), 8);
        assert_eq!(FifoLevel::ThreeQuarters.threshold(16), 12);
        assert_eq!(FifoLevel::SevenEighths.threshold(16), 14);
    }

    #[test]
    fn fifo_threshold_never_zero() {
        assert_eq!(FifoLevel::OneEighth.threshold(4), 1);
        assert_eq!(FifoLevel::OneEighth.threshold(1), 1);
    }

    #[test]
    fn system_clock_with_pll_and_div4_is_50mhz() {
        let clock = SystemClock {
            crystal_hz: 16_000_000,
            use_pll: true,
            divisor: 4,
        };
        assert_eq!(clock.frequency(), 50_000_000);

        let raw = SystemClock {
            use_pll: false,
            ..clock
        };
        assert_eq!(raw.frequency(), 4_000_000);
    }

    #[test]
    fn divisor_for_115200_at_50mhz() {
        let div = BaudDivisor::new(50_000_000, BaudRate::new(115_200));
        assert_eq!(div, BaudDivisor { integer: 27, fraction: 8 });
        let actual = div.actual_bps(50_000_000);
        assert!(actual.abs_diff(115_200) < 115_200 / 100);
    }

    #[test]
    fn divisor_for_internal_oscillator() {
        let div = BaudDivisor::new(ClockSource::PRECISION_INTERNAL_HZ, BaudRate::new(9_600));
        assert_eq!(div.integer, 104);
        assert_eq!(div.fraction, 11);
    }

    #[test]
    fn word_length_masks() {
        assert_eq!(WordLength::Eight.mask(), 0xFF);
        assert_eq!(WordLength::Seven.mask(), 0x7F);
        assert_eq!(WordLength::Five.mask(), 0x1F);
    }

    #[test]
    fn peripheral_index_roundtrip() {
        for id in PeripheralId::ALL {
            assert_eq!(PeripheralId::from_index(id.index()), Some(id));
        }
        assert_eq!(PeripheralId::from_index(8), None);
    }
}
