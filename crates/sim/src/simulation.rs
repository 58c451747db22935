// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serial_bridge::hal::PeripheralId;
use serial_bridge::{Bridge, ChannelRole, CorePlatform, DrainReport, StatsSnapshot};
use serial_bridge_config::scenario::Step;
use serial_bridge_config::BridgeManifest;

use crate::board::SimBoard;
use crate::{SimError, SimResult};

/// The bridge firmware logic running on a simulated board.
#[derive(Debug)]
pub struct Simulation {
    bridge: Bridge,
    board: SimBoard,
    started: bool,
}

impl Simulation {
    pub fn from_manifest(manifest: &BridgeManifest, max_interrupts: u64) -> SimResult<Self> {
        let config = manifest.bridge_config()?;
        tracing::info!(
            "Bridge '{}': {:?} <-> {:?}, system clock {} Hz",
            manifest.name,
            config.pair.get(ChannelRole::A).id,
            config.pair.get(ChannelRole::B).id,
            config.system_clock.frequency()
        );
        Ok(Self {
            bridge: Bridge::new(config),
            board: SimBoard::new(manifest.fifo_depth, max_interrupts),
            started: false,
        })
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn board(&self) -> &SimBoard {
        &self.board
    }

    /// Direct access for driving the lines without taking interrupts.
    pub fn board_mut(&mut self) -> &mut SimBoard {
        &mut self.board
    }

    /// Take every pending interrupt.
    pub fn service(&mut self) -> SimResult<Vec<DrainReport>> {
        self.board.service_pending(&self.bridge)
    }

    /// Run the bootstrap, then one idle-loop iteration.
    pub fn start(&mut self) -> SimResult<()> {
        self.bridge.start(&mut self.board);
        self.started = true;
        self.board.service_pending(&self.bridge)?;
        self.board.wait_for_interrupt();
        Ok(())
    }

    fn channel(&self, role: ChannelRole) -> SimResult<PeripheralId> {
        if !self.started {
            return Err(SimError::NotConfigured(role));
        }
        Ok(self.bridge.config().pair.get(role).id)
    }

    /// Units arrive one at a time on `role`'s receive line; interrupts are
    /// taken as soon as they assert. With `idle`, the line then goes quiet
    /// so a short tail is picked up by the receive timeout.
    pub fn send(&mut self, role: ChannelRole, units: &[u8], idle: bool) -> SimResult<()> {
        let id = self.channel(role)?;
        for unit in units {
            self.board.receive(id, &[*unit]);
            self.board.service_pending(&self.bridge)?;
        }
        if idle {
            self.board.line_idle(id);
            self.board.service_pending(&self.bridge)?;
        }
        Ok(())
    }

    /// Shift queued units out of `role`'s transmit FIFO.
    pub fn transmit(&mut self, role: ChannelRole, count: Option<usize>) -> SimResult<usize> {
        let id = self.channel(role)?;
        Ok(self.board.shift_out(id, count))
    }

    pub fn spurious_empty(&mut self, role: ChannelRole, after: usize) -> SimResult<()> {
        let id = self.channel(role)?;
        self.board.inject_spurious_empty(id, after);
        Ok(())
    }

    pub fn apply(&mut self, step: &Step) -> anyhow::Result<()> {
        match step {
            Step::Send(step) => {
                let send = &step.send;
                self.send(send.channel, &send.units()?, send.idle)?;
            }
            Step::Transmit(step) => {
                self.transmit(step.transmit.channel, step.transmit.count)?;
            }
            Step::SpuriousEmpty(step) => {
                let spurious = &step.spurious_empty;
                self.spurious_empty(spurious.channel, spurious.after)?;
            }
        }
        Ok(())
    }

    /// Everything `role`'s UART has been asked to transmit, in order.
    pub fn transmitted(&self, role: ChannelRole) -> Vec<u8> {
        self.board
            .transmitted(self.bridge.config().pair.get(role).id)
    }

    pub fn stats(&self, role: ChannelRole) -> StatsSnapshot {
        self.bridge.stats(role)
    }

    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "board": self.board.snapshot(),
            "stats": {
                "a": self.stats(ChannelRole::A),
                "b": self.stats(ChannelRole::B),
            },
        })
    }
}
