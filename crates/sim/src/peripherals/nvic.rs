// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serial_bridge::hal::PeripheralId;
use serial_bridge::ChannelRole;

/// UART interrupt lines of the NVIC plus the core's global interrupt mask.
///
/// A line is serviced only when it is unmasked, has a handler bound and
/// global interrupts are enabled.
#[derive(Debug, Default, serde::Serialize)]
pub struct Nvic {
    global_enabled: bool,
    unmasked: [bool; 8],
    handlers: [Option<ChannelRole>; 8],
}

impl Nvic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable_global(&mut self) {
        self.global_enabled = true;
    }

    pub fn global_enabled(&self) -> bool {
        self.global_enabled
    }

    /// Bind the line's handler to `role` and unmask it.
    pub fn bind(&mut self, id: PeripheralId, role: ChannelRole) {
        self.handlers[id.index()] = Some(role);
        self.unmasked[id.index()] = true;
    }

    pub fn handler(&self, id: PeripheralId) -> Option<ChannelRole> {
        self.handlers[id.index()]
    }

    pub fn is_enabled(&self, id: PeripheralId) -> bool {
        self.unmasked[id.index()]
    }

    /// Handler to run for `id` if an asserted peripheral interrupt would be taken now.
    pub fn would_take(&self, id: PeripheralId) -> Option<ChannelRole> {
        if !self.global_enabled || !self.is_enabled(id) {
            return None;
        }
        self.handler(id)
    }
}

impl crate::Peripheral for Nvic {
    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
