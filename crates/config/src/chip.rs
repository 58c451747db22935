// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! TM4C123GH6PM facts the manifest is validated against.

use serial_bridge::hal::{PeripheralId, Port};

/// One valid routing of a UART's RX/TX onto GPIO pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartPins {
    pub peripheral: PeripheralId,
    pub port: Port,
    pub rx: u8,
    pub tx: u8,
    /// GPIOPCTL value for both pins.
    pub mux: u8,
}

const fn pins(peripheral: PeripheralId, port: Port, rx: u8, tx: u8, mux: u8) -> UartPins {
    UartPins {
        peripheral,
        port,
        rx,
        tx,
        mux,
    }
}

pub const UART_PIN_MAP: &[UartPins] = &[
    pins(PeripheralId::Uart0, Port::A, 0, 1, 1),
    pins(PeripheralId::Uart1, Port::B, 0, 1, 1),
    pins(PeripheralId::Uart1, Port::C, 4, 5, 2),
    pins(PeripheralId::Uart2, Port::D, 6, 7, 1),
    pins(PeripheralId::Uart3, Port::C, 6, 7, 1),
    pins(PeripheralId::Uart4, Port::C, 4, 5, 1),
    pins(PeripheralId::Uart5, Port::E, 4, 5, 1),
    pins(PeripheralId::Uart6, Port::D, 4, 5, 1),
    pins(PeripheralId::Uart7, Port::E, 0, 1, 1),
];

/// Crystal frequencies the RCC XTAL field can describe.
pub const SUPPORTED_CRYSTALS_HZ: &[u32] = &[
    4_000_000, 8_000_000, 10_000_000, 12_000_000, 16_000_000, 20_000_000, 25_000_000,
];

/// Largest RCC SYSDIV value plus one.
pub const MAX_SYSTEM_DIVISOR: u32 = 16;

/// Smallest divisor keeping the PLL-derived clock within the 80 MHz limit.
pub const MIN_PLL_DIVISOR: u32 = 3;

/// Depth of each UART FIFO on the real part.
pub const UART_FIFO_DEPTH: usize = 16;

pub fn routing(peripheral: PeripheralId, port: Port, rx: u8, tx: u8, mux: u8) -> Option<UartPins> {
    UART_PIN_MAP.iter().copied().find(|p| {
        p.peripheral == peripheral && p.port == port && p.rx == rx && p.tx == tx && p.mux == mux
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launchpad_routings_exist() {
        assert!(routing(PeripheralId::Uart0, Port::A, 0, 1, 1).is_some());
        assert!(routing(PeripheralId::Uart1, Port::B, 0, 1, 1).is_some());
        assert!(routing(PeripheralId::Uart1, Port::A, 0, 1, 1).is_none());
    }

    #[test]
    fn test_shared_pins_resolve_by_mux() {
        assert!(routing(PeripheralId::Uart1, Port::C, 4, 5, 2).is_some());
        assert!(routing(PeripheralId::Uart1, Port::C, 4, 5, 1).is_none());
    }
}
