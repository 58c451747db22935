// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serial_bridge::hal::{ClockDomain, ClockSource, SystemClock};

/// System control: run-mode clock gating and the system clock.
///
/// Gating mirrors RCGCGPIO / RCGCUART: one bit per port or UART instance.
#[derive(Debug, Default, serde::Serialize)]
pub struct SysCtl {
    rcgc_gpio: u8,
    rcgc_uart: u8,
    system_hz: Option<u32>,
}

impl SysCtl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_system_clock(&mut self, clock: SystemClock) {
        self.system_hz = Some(clock.frequency());
    }

    /// `None` until the system clock has been programmed.
    pub fn system_hz(&self) -> Option<u32> {
        self.system_hz
    }

    pub fn source_hz(&self, source: ClockSource) -> u32 {
        match source {
            // Out of reset the core runs from the internal oscillator.
            ClockSource::System => self
                .system_hz
                .unwrap_or(ClockSource::PRECISION_INTERNAL_HZ),
            ClockSource::PrecisionInternal => ClockSource::PRECISION_INTERNAL_HZ,
        }
    }

    pub fn enable(&mut self, domain: ClockDomain) {
        match domain {
            ClockDomain::Port(port) => self.rcgc_gpio |= 1 << port.index(),
            ClockDomain::Serial(id) => self.rcgc_uart |= 1 << id.index(),
        }
    }

    pub fn is_enabled(&self, domain: ClockDomain) -> bool {
        match domain {
            ClockDomain::Port(port) => self.rcgc_gpio & (1 << port.index()) != 0,
            ClockDomain::Serial(id) => self.rcgc_uart & (1 << id.index()) != 0,
        }
    }
}

impl crate::Peripheral for SysCtl {
    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
