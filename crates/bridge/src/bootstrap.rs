// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::configurator::configure;
use crate::descriptor::{ChannelPair, ChannelRole, PeripheralDescriptor};
use crate::engine::{DrainReport, StatsSnapshot, TransferEngine};
use crate::hal::{ClockSource, CorePlatform, PeripheralId, SerialHal, SystemClock};

/// Baud-rate generator oversampling factor.
pub const OVERSAMPLING: u32 = 16;

/// Per-channel echo policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EchoPolicy {
    pub a: bool,
    pub b: bool,
}

impl EchoPolicy {
    pub const NONE: EchoPolicy = EchoPolicy { a: false, b: false };

    pub const fn for_role(&self, role: ChannelRole) -> bool {
        match role {
            ChannelRole::A => self.a,
            ChannelRole::B => self.b,
        }
    }
}

/// Everything decided at build time: system clock, the channel pair, echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    pub system_clock: SystemClock,
    pub pair: ChannelPair,
    pub echo: EchoPolicy,
}

impl BridgeConfig {
    /// Panics (a build failure in const context) if a channel's baud-rate
    /// generator clock is too slow for its baud rate.
    pub const fn new(system_clock: SystemClock, pair: ChannelPair, echo: EchoPolicy) -> Self {
        if !Self::clock_supports(&system_clock, pair.get(ChannelRole::A))
            || !Self::clock_supports(&system_clock, pair.get(ChannelRole::B))
        {
            panic!("baud rate exceeds clock / 16");
        }
        Self {
            system_clock,
            pair,
            echo,
        }
    }

    pub const fn source_frequency(system_clock: &SystemClock, source: ClockSource) -> u32 {
        match source {
            ClockSource::System => system_clock.frequency(),
            ClockSource::PrecisionInternal => ClockSource::PRECISION_INTERNAL_HZ,
        }
    }

    pub const fn clock_supports(system_clock: &SystemClock, descriptor: &PeripheralDescriptor) -> bool {
        let clock_hz = Self::source_frequency(system_clock, descriptor.link.clock_source) as u64;
        clock_hz >= descriptor.link.baud.bps() as u64 * OVERSAMPLING as u64
    }
}

/// The whole bridge: immutable configuration plus the two engine instances.
///
/// Meant to live in a `static`; nothing in it is mutated except the engines'
/// atomic counters.
#[derive(Debug)]
pub struct Bridge {
    config: BridgeConfig,
    engines: [TransferEngine; 2],
}

impl Bridge {
    pub const fn new(config: BridgeConfig) -> Self {
        Self {
            engines: [
                TransferEngine::new(ChannelRole::A, config.echo.a),
                TransferEngine::new(ChannelRole::B, config.echo.b),
            ],
            config,
        }
    }

    pub const fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub const fn engine(&self, role: ChannelRole) -> &TransferEngine {
        &self.engines[role.index()]
    }

    /// Clock the core, open the global interrupt mask, then bring up A and B.
    pub fn start<P: SerialHal + CorePlatform>(&self, platform: &mut P) {
        platform.set_system_clock(self.config.system_clock);
        platform.enable_global_interrupts();
        for role in ChannelRole::BOTH {
            configure(platform, self.config.pair.get(role));
        }
    }

    /// Start the bridge and idle between interrupts forever.
    pub fn run<P: SerialHal + CorePlatform>(&self, platform: &mut P) -> ! {
        self.start(platform);
        loop {
            platform.wait_for_interrupt();
        }
    }

    /// Interrupt entry for the channel playing `role`.
    pub fn on_interrupt<H: SerialHal>(&self, hal: &mut H, role: ChannelRole) -> DrainReport {
        let (source, destination) = self.config.pair.route(role);
        self.engine(role).service(hal, source, destination)
    }

    /// Interrupt entry by UART instance. `None` if the bridge does not own it.
    pub fn dispatch<H: SerialHal>(&self, hal: &mut H, id: PeripheralId) -> Option<DrainReport> {
        let role = self.config.pair.role_of(id)?;
        Some(self.on_interrupt(hal, role))
    }

    pub fn stats(&self, role: ChannelRole) -> StatsSnapshot {
        self.engine(role).stats()
    }
}
