// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::descriptor::{ChannelRole, PeripheralDescriptor};
use crate::hal::{InterruptFlags, ReadOutcome, SerialHal, WriteOutcome};

/// What one interrupt service did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Causes that were pending and cleared on entry.
    pub cause: InterruptFlags,
    pub received: u32,
    pub forwarded: u32,
    pub echoed: u32,
    pub dropped: u32,
    pub echo_dropped: u32,
    /// The receive queue reported data but the read came back empty.
    pub ended_early: bool,
}

impl DrainReport {
    const fn new(cause: InterruptFlags) -> Self {
        Self {
            cause,
            received: 0,
            forwarded: 0,
            echoed: 0,
            dropped: 0,
            echo_dropped: 0,
            ended_early: false,
        }
    }
}

/// Lifetime counters of one engine instance.
#[derive(Debug)]
pub struct EngineStats {
    invocations: AtomicU32,
    received: AtomicU32,
    forwarded: AtomicU32,
    echoed: AtomicU32,
    dropped: AtomicU32,
    echo_dropped: AtomicU32,
    early_terminations: AtomicU32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatsSnapshot {
    pub invocations: u32,
    pub received: u32,
    pub forwarded: u32,
    pub echoed: u32,
    pub dropped: u32,
    pub echo_dropped: u32,
    pub early_terminations: u32,
}

impl EngineStats {
    pub const fn new() -> Self {
        Self {
            invocations: AtomicU32::new(0),
            received: AtomicU32::new(0),
            forwarded: AtomicU32::new(0),
            echoed: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            echo_dropped: AtomicU32::new(0),
            early_terminations: AtomicU32::new(0),
        }
    }

    fn record(&self, report: &DrainReport) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        self.received.fetch_add(report.received, Ordering::Relaxed);
        self.forwarded.fetch_add(report.forwarded, Ordering::Relaxed);
        self.echoed.fetch_add(report.echoed, Ordering::Relaxed);
        self.dropped.fetch_add(report.dropped, Ordering::Relaxed);
        self.echo_dropped
            .fetch_add(report.echo_dropped, Ordering::Relaxed);
        if report.ended_early {
            self.early_terminations.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            invocations: self.invocations.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            echoed: self.echoed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            echo_dropped: self.echo_dropped.load(Ordering::Relaxed),
            early_terminations: self.early_terminations.load(Ordering::Relaxed),
        }
    }
}

impl Default for EngineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Receive-drain/forward logic run from one channel's interrupt.
#[derive(Debug)]
pub struct TransferEngine {
    role: ChannelRole,
    echo: bool,
    stats: EngineStats,
}

impl TransferEngine {
    pub const fn new(role: ChannelRole, echo: bool) -> Self {
        Self {
            role,
            echo,
            stats: EngineStats::new(),
        }
    }

    pub const fn role(&self) -> ChannelRole {
        self.role
    }

    pub const fn echo(&self) -> bool {
        self.echo
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Drain `source` into `destination`.
    ///
    /// Pending causes are cleared before the first read, so a unit arriving
    /// while we drain re-asserts the interrupt. Writes never block: a full
    /// transmit queue drops the unit and only bumps a counter.
    pub fn service<H: SerialHal>(
        &self,
        hal: &mut H,
        source: &PeripheralDescriptor,
        destination: &PeripheralDescriptor,
    ) -> DrainReport {
        let cause = hal.interrupt_status(source.id, true);
        hal.clear_interrupts(source.id, cause);

        let mut report = DrainReport::new(cause);
        while hal.rx_available(source.id) {
            let unit = match hal.read(source.id) {
                ReadOutcome::Data(unit) => unit,
                ReadOutcome::Empty => {
                    report.ended_early = true;
                    break;
                }
            };
            report.received += 1;

            match hal.write(destination.id, unit) {
                WriteOutcome::Queued => report.forwarded += 1,
                WriteOutcome::Full => report.dropped += 1,
            }

            if self.echo {
                match hal.write(source.id, unit) {
                    WriteOutcome::Queued => report.echoed += 1,
                    WriteOutcome::Full => report.echo_dropped += 1,
                }
            }
        }

        self.stats.record(&report);
        report
    }
}
