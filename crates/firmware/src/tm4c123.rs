// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Register-level `SerialHal` for the TM4C123GH6PM.

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use cortex_m::interrupt::InterruptNumber;
use cortex_m::peripheral::NVIC;
use serial_bridge::descriptor::{BaudRate, ChannelRole};
use serial_bridge::hal::{
    AltFunction, BaudDivisor, ClockDomain, ClockSource, CorePlatform, FifoLevel, FrameFormat,
    InterruptFlags, Parity, PeripheralId, Pin, Port, ReadOutcome, SerialHal, StopBits,
    SystemClock, WordLength, WriteOutcome,
};

// System control
const SYSCTL_BASE: usize = 0x400F_E000;
const SYSCTL_RIS: usize = SYSCTL_BASE + 0x050;
const SYSCTL_RCC: usize = SYSCTL_BASE + 0x060;
const SYSCTL_RCC2: usize = SYSCTL_BASE + 0x070;
const SYSCTL_RCGCGPIO: usize = SYSCTL_BASE + 0x608;
const SYSCTL_RCGCUART: usize = SYSCTL_BASE + 0x618;
const SYSCTL_PRGPIO: usize = SYSCTL_BASE + 0xA08;
const SYSCTL_PRUART: usize = SYSCTL_BASE + 0xA18;

const RIS_PLLLRIS: u32 = 1 << 6;
const RCC_MOSCDIS: u32 = 1 << 0;
const RCC_OSCSRC_MASK: u32 = 0x3 << 4;
const RCC_XTAL_MASK: u32 = 0x1F << 6;
const RCC_BYPASS: u32 = 1 << 11;
const RCC_PWRDN: u32 = 1 << 13;
const RCC_USESYSDIV: u32 = 1 << 22;
const RCC_SYSDIV_SHIFT: u32 = 23;
const RCC_SYSDIV_MASK: u32 = 0xF << RCC_SYSDIV_SHIFT;
const RCC2_USERCC2: u32 = 1 << 31;

// GPIO (APB aperture)
const GPIO_BASES: [usize; 6] = [
    0x4000_4000, // A
    0x4000_5000, // B
    0x4000_6000, // C
    0x4000_7000, // D
    0x4002_4000, // E
    0x4002_5000, // F
];
const GPIO_AFSEL: usize = 0x420;
const GPIO_DEN: usize = 0x51C;
const GPIO_PCTL: usize = 0x52C;

// UART
const UART0_BASE: usize = 0x4000_C000;
const UART_STRIDE: usize = 0x1000;
const UART_DR: usize = 0x000;
const UART_FR: usize = 0x018;
const UART_IBRD: usize = 0x024;
const UART_FBRD: usize = 0x028;
const UART_LCRH: usize = 0x02C;
const UART_CTL: usize = 0x030;
const UART_IFLS: usize = 0x034;
const UART_IM: usize = 0x038;
const UART_RIS: usize = 0x03C;
const UART_MIS: usize = 0x040;
const UART_ICR: usize = 0x044;
const UART_CC: usize = 0xFC8;

const FR_BUSY: u32 = 1 << 3;
const FR_RXFE: u32 = 1 << 4;
const FR_TXFF: u32 = 1 << 5;

const LCRH_PEN: u32 = 1 << 1;
const LCRH_EPS: u32 = 1 << 2;
const LCRH_STP2: u32 = 1 << 3;
const LCRH_FEN: u32 = 1 << 4;
const LCRH_WLEN_SHIFT: u32 = 5;
const LCRH_SPS: u32 = 1 << 7;

const CTL_UARTEN: u32 = 1 << 0;
const CTL_TXE: u32 = 1 << 8;
const CTL_RXE: u32 = 1 << 9;

const IFLS_RX_SHIFT: u32 = 3;
const IFLS_RX_MASK: u32 = 0x7 << IFLS_RX_SHIFT;

const CC_SYSTEM: u32 = 0x0;
const CC_PIOSC: u32 = 0x5;

/// Value of the RCC XTAL field for a supported crystal frequency.
pub const fn xtal_code(crystal_hz: u32) -> Option<u32> {
    match crystal_hz {
        4_000_000 => Some(0x06),
        8_000_000 => Some(0x0E),
        10_000_000 => Some(0x10),
        12_000_000 => Some(0x11),
        16_000_000 => Some(0x15),
        20_000_000 => Some(0x18),
        25_000_000 => Some(0x1A),
        _ => None,
    }
}

/// NVIC line of each UART, indexed by `PeripheralId`.
const UART_IRQ: [u16; 8] = [5, 6, 33, 59, 60, 61, 62, 63];

/// Engine bound to each UART's interrupt line. 0 means unbound, otherwise role + 1.
static HANDLER_ROLES: [AtomicU8; 8] = [
    AtomicU8::new(0),
    AtomicU8::new(0),
    AtomicU8::new(0),
    AtomicU8::new(0),
    AtomicU8::new(0),
    AtomicU8::new(0),
    AtomicU8::new(0),
    AtomicU8::new(0),
];

/// Reset default is the precision internal oscillator.
static SYSTEM_HZ: AtomicU32 = AtomicU32::new(ClockSource::PRECISION_INTERNAL_HZ);

#[derive(Debug, Clone, Copy)]
pub struct UartIrq(u16);

// SAFETY: every value is a valid TM4C123 external interrupt number.
unsafe impl InterruptNumber for UartIrq {
    fn number(self) -> u16 {
        self.0
    }
}

impl UartIrq {
    pub const fn of(id: PeripheralId) -> Self {
        Self(UART_IRQ[id.index()])
    }
}

/// Role whose engine services `id`, as recorded by `bind_handler`.
pub fn bound_role(id: PeripheralId) -> Option<ChannelRole> {
    match HANDLER_ROLES[id.index()].load(Ordering::Acquire) {
        1 => Some(ChannelRole::A),
        2 => Some(ChannelRole::B),
        _ => None,
    }
}

#[inline(always)]
fn read_reg(addr: usize) -> u32 {
    unsafe { core::ptr::read_volatile(addr as *const u32) }
}

#[inline(always)]
fn write_reg(addr: usize, value: u32) {
    unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
}

#[inline(always)]
fn modify_reg(addr: usize, f: impl FnOnce(u32) -> u32) {
    write_reg(addr, f(read_reg(addr)));
}

const fn uart_reg(id: PeripheralId, offset: usize) -> usize {
    UART0_BASE + id.index() * UART_STRIDE + offset
}

const fn gpio_reg(port: Port, offset: usize) -> usize {
    GPIO_BASES[port.index()] + offset
}

/// Handle to the on-chip peripherals. Zero-sized; all state lives in hardware
/// or in the statics above.
#[derive(Debug, Default)]
pub struct Tm4c123;

impl Tm4c123 {
    pub const fn new() -> Self {
        Self
    }
}

impl SerialHal for Tm4c123 {
    fn enable_clock_domain(&mut self, domain: ClockDomain) {
        let (gate, ready, bit) = match domain {
            ClockDomain::Port(port) => (SYSCTL_RCGCGPIO, SYSCTL_PRGPIO, 1 << port.index()),
            ClockDomain::Serial(id) => (SYSCTL_RCGCUART, SYSCTL_PRUART, 1 << id.index()),
        };
        modify_reg(gate, |v| v | bit);
        while read_reg(ready) & bit == 0 {}
    }

    fn bind_pin(&mut self, pin: Pin, function: AltFunction) {
        let bit = 1u32 << pin.number;
        let shift = u32::from(pin.number) * 4;
        modify_reg(gpio_reg(pin.port, GPIO_AFSEL), |v| v | bit);
        modify_reg(gpio_reg(pin.port, GPIO_PCTL), |v| {
            (v & !(0xF << shift)) | ((u32::from(function.0) & 0xF) << shift)
        });
        modify_reg(gpio_reg(pin.port, GPIO_DEN), |v| v | bit);
    }

    fn set_clock_source(&mut self, id: PeripheralId, source: ClockSource) {
        let cc = match source {
            ClockSource::System => CC_SYSTEM,
            ClockSource::PrecisionInternal => CC_PIOSC,
        };
        write_reg(uart_reg(id, UART_CC), cc);
    }

    fn clock_frequency(&self, source: ClockSource) -> u32 {
        match source {
            ClockSource::System => SYSTEM_HZ.load(Ordering::Relaxed),
            ClockSource::PrecisionInternal => ClockSource::PRECISION_INTERNAL_HZ,
        }
    }

    fn set_frame(&mut self, id: PeripheralId, clock_hz: u32, baud: BaudRate, frame: FrameFormat) {
        // Quiesce: finish the current character, flush the FIFOs, disable.
        while read_reg(uart_reg(id, UART_FR)) & FR_BUSY != 0 {}
        modify_reg(uart_reg(id, UART_LCRH), |v| v & !LCRH_FEN);
        modify_reg(uart_reg(id, UART_CTL), |v| {
            v & !(CTL_UARTEN | CTL_TXE | CTL_RXE)
        });

        let div = BaudDivisor::new(clock_hz, baud);
        write_reg(uart_reg(id, UART_IBRD), div.integer);
        write_reg(uart_reg(id, UART_FBRD), div.fraction);

        let wlen = match frame.word_length {
            WordLength::Five => 0,
            WordLength::Six => 1,
            WordLength::Seven => 2,
            WordLength::Eight => 3,
        };
        let stop = match frame.stop_bits {
            StopBits::One => 0,
            StopBits::Two => LCRH_STP2,
        };
        let parity = match frame.parity {
            Parity::None => 0,
            Parity::Even => LCRH_PEN | LCRH_EPS,
            Parity::Odd => LCRH_PEN,
            Parity::One => LCRH_PEN | LCRH_SPS,
            Parity::Zero => LCRH_PEN | LCRH_EPS | LCRH_SPS,
        };
        write_reg(
            uart_reg(id, UART_LCRH),
            (wlen << LCRH_WLEN_SHIFT) | stop | parity | LCRH_FEN,
        );

        write_reg(uart_reg(id, UART_FR), 0);
        modify_reg(uart_reg(id, UART_CTL), |v| v | CTL_UARTEN | CTL_TXE | CTL_RXE);
    }

    fn set_fifo_trigger(&mut self, id: PeripheralId, level: FifoLevel) {
        let sel = match level {
            FifoLevel::OneEighth => 0,
            FifoLevel::OneQuarter => 1,
            FifoLevel::Half => 2,
            FifoLevel::ThreeQuarters => 3,
            FifoLevel::SevenEighths => 4,
        };
        modify_reg(uart_reg(id, UART_IFLS), |v| {
            (v & !IFLS_RX_MASK) | (sel << IFLS_RX_SHIFT)
        });
    }

    fn enable_interrupts(&mut self, id: PeripheralId, flags: InterruptFlags) {
        modify_reg(uart_reg(id, UART_IM), |v| v | flags.bits());
    }

    fn disable_interrupts(&mut self, id: PeripheralId, flags: InterruptFlags) {
        modify_reg(uart_reg(id, UART_IM), |v| v & !flags.bits());
    }

    fn bind_handler(&mut self, id: PeripheralId, role: ChannelRole) {
        HANDLER_ROLES[id.index()].store(role as u8 + 1, Ordering::Release);
        // SAFETY: the engine for `role` is ready to run as soon as the line opens.
        unsafe { NVIC::unmask(UartIrq::of(id)) };
    }

    fn interrupt_status(&self, id: PeripheralId, masked: bool) -> InterruptFlags {
        let reg = if masked { UART_MIS } else { UART_RIS };
        InterruptFlags::from_bits_truncate(read_reg(uart_reg(id, reg)))
    }

    fn clear_interrupts(&mut self, id: PeripheralId, flags: InterruptFlags) {
        write_reg(uart_reg(id, UART_ICR), flags.bits());
    }

    fn rx_available(&self, id: PeripheralId) -> bool {
        read_reg(uart_reg(id, UART_FR)) & FR_RXFE == 0
    }

    fn read(&mut self, id: PeripheralId) -> ReadOutcome {
        if read_reg(uart_reg(id, UART_FR)) & FR_RXFE != 0 {
            return ReadOutcome::Empty;
        }
        // Upper DR bits carry per-character error flags; only the data is forwarded.
        ReadOutcome::Data(read_reg(uart_reg(id, UART_DR)) as u8)
    }

    fn write(&mut self, id: PeripheralId, unit: u8) -> WriteOutcome {
        if read_reg(uart_reg(id, UART_FR)) & FR_TXFF != 0 {
            return WriteOutcome::Full;
        }
        write_reg(uart_reg(id, UART_DR), u32::from(unit));
        WriteOutcome::Queued
    }
}

impl CorePlatform for Tm4c123 {
    fn set_system_clock(&mut self, clock: SystemClock) {
        let xtal = xtal_code(clock.crystal_hz).unwrap_or(0x15);

        // Run from the raw oscillator while the PLL is reprogrammed.
        let mut rcc = read_reg(SYSCTL_RCC);
        rcc |= RCC_BYPASS;
        rcc &= !RCC_USESYSDIV;
        write_reg(SYSCTL_RCC, rcc);
        modify_reg(SYSCTL_RCC2, |v| v & !RCC2_USERCC2);

        rcc &= !(RCC_XTAL_MASK | RCC_OSCSRC_MASK | RCC_MOSCDIS | RCC_PWRDN);
        rcc |= xtal << 6;
        if !clock.use_pll {
            rcc |= RCC_PWRDN;
        }
        write_reg(SYSCTL_RCC, rcc);

        rcc &= !RCC_SYSDIV_MASK;
        rcc |= ((clock.divisor - 1) << RCC_SYSDIV_SHIFT) & RCC_SYSDIV_MASK;
        rcc |= RCC_USESYSDIV;
        if clock.use_pll {
            while read_reg(SYSCTL_RIS) & RIS_PLLLRIS == 0 {}
            rcc &= !RCC_BYPASS;
        }
        write_reg(SYSCTL_RCC, rcc);

        SYSTEM_HZ.store(clock.frequency(), Ordering::Relaxed);
    }

    fn enable_global_interrupts(&mut self) {
        // SAFETY: no peripheral line is unmasked yet; each is opened by
        // `bind_handler` once its engine is ready.
        unsafe { cortex_m::interrupt::enable() };
    }

    fn wait_for_interrupt(&mut self) {
        cortex_m::asm::wfi();
    }
}
