// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Ordered record of every hardware operation the board performed.

use serde::Serialize;
use serial_bridge::hal::{ClockSource, FifoLevel, PeripheralId, Port};
use serial_bridge::ChannelRole;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HalEvent {
    SystemClock {
        hz: u32,
    },
    GlobalInterruptsEnabled,
    PortClockEnabled {
        port: Port,
    },
    UartClockEnabled {
        peripheral: PeripheralId,
    },
    PinBound {
        port: Port,
        pin: u8,
        function: u8,
    },
    ClockSourceSelected {
        peripheral: PeripheralId,
        source: ClockSource,
    },
    FrameSet {
        peripheral: PeripheralId,
        clock_hz: u32,
        baud: u32,
        ibrd: u32,
        fbrd: u32,
    },
    FifoTriggerSet {
        peripheral: PeripheralId,
        level: FifoLevel,
    },
    InterruptsEnabled {
        peripheral: PeripheralId,
        flags: u32,
    },
    InterruptsDisabled {
        peripheral: PeripheralId,
        flags: u32,
    },
    HandlerBound {
        peripheral: PeripheralId,
        role: ChannelRole,
    },
    InterruptTaken {
        peripheral: PeripheralId,
        role: ChannelRole,
    },
    InterruptsCleared {
        peripheral: PeripheralId,
        flags: u32,
    },
    Read {
        peripheral: PeripheralId,
        unit: Option<u8>,
    },
    Write {
        peripheral: PeripheralId,
        unit: u8,
        queued: bool,
    },
    WaitForInterrupt,
}

impl HalEvent {
    /// Peripheral the event touched, if any.
    pub fn peripheral(&self) -> Option<PeripheralId> {
        match self {
            HalEvent::UartClockEnabled { peripheral }
            | HalEvent::ClockSourceSelected { peripheral, .. }
            | HalEvent::FrameSet { peripheral, .. }
            | HalEvent::FifoTriggerSet { peripheral, .. }
            | HalEvent::InterruptsEnabled { peripheral, .. }
            | HalEvent::InterruptsDisabled { peripheral, .. }
            | HalEvent::HandlerBound { peripheral, .. }
            | HalEvent::InterruptTaken { peripheral, .. }
            | HalEvent::InterruptsCleared { peripheral, .. }
            | HalEvent::Read { peripheral, .. }
            | HalEvent::Write { peripheral, .. } => Some(*peripheral),
            _ => None,
        }
    }
}

/// Hardware misuse the real chip would punish with a bus fault or silence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "fault", rename_all = "snake_case")]
pub enum Fault {
    /// Register access to a UART whose clock is gated off.
    UnclockedUart {
        peripheral: PeripheralId,
        operation: &'static str,
    },
    /// Pin configuration on a port whose clock is gated off.
    UnclockedPort { port: Port, pin: u8 },
    /// Handler bound while no interrupt condition was enabled at the peripheral.
    HandlerBeforeEnable { peripheral: PeripheralId },
}

#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct Trace {
    events: Vec<HalEvent>,
}

impl Trace {
    pub fn push(&mut self, event: HalEvent) {
        tracing::trace!(?event, "hal");
        self.events.push(event);
    }

    pub fn events(&self) -> &[HalEvent] {
        &self.events
    }

    pub fn position(&self, pred: impl Fn(&HalEvent) -> bool) -> Option<usize> {
        self.events.iter().position(pred)
    }
}
