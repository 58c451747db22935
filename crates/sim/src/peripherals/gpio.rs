// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serial_bridge::hal::{AltFunction, Pin, Port};

/// Alternate-function state of one GPIO port (AFSEL, DEN and PCTL).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PortMux {
    pub afsel: u8,
    pub den: u8,
    /// Four bits of mux selector per pin.
    pub pctl: u32,
}

#[derive(Debug, Default, serde::Serialize)]
pub struct Gpio {
    ports: [PortMux; 6],
}

impl Gpio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, pin: Pin, function: AltFunction) {
        let port = &mut self.ports[pin.port.index()];
        let bit = 1u8 << pin.number;
        let shift = u32::from(pin.number) * 4;
        port.afsel |= bit;
        port.den |= bit;
        port.pctl = (port.pctl & !(0xF << shift)) | (u32::from(function.0 & 0xF) << shift);
    }

    /// Function currently routed to `pin`, if it is in alternate-function mode.
    pub fn function_of(&self, pin: Pin) -> Option<AltFunction> {
        let port = &self.ports[pin.port.index()];
        let bit = 1u8 << pin.number;
        if port.afsel & bit == 0 || port.den & bit == 0 {
            return None;
        }
        Some(AltFunction(
            ((port.pctl >> (u32::from(pin.number) * 4)) & 0xF) as u8,
        ))
    }

    pub fn port(&self, port: Port) -> PortMux {
        self.ports[port.index()]
    }
}

impl crate::Peripheral for Gpio {
    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_sets_afsel_den_and_pctl() {
        let mut gpio = Gpio::new();
        gpio.bind(Pin::new(Port::C, 4), AltFunction(2));
        gpio.bind(Pin::new(Port::C, 5), AltFunction(2));

        let mux = gpio.port(Port::C);
        assert_eq!(mux.afsel, 0b0011_0000);
        assert_eq!(mux.den, 0b0011_0000);
        assert_eq!(mux.pctl, 0x0022_0000);
        assert_eq!(gpio.function_of(Pin::new(Port::C, 4)), Some(AltFunction(2)));
        assert_eq!(gpio.function_of(Pin::new(Port::C, 6)), None);
    }

    #[test]
    fn test_rebinding_replaces_selector() {
        let mut gpio = Gpio::new();
        let pin = Pin::new(Port::A, 1);
        gpio.bind(pin, AltFunction(2));
        gpio.bind(pin, AltFunction(1));
        assert_eq!(gpio.function_of(pin), Some(AltFunction(1)));
    }
}
