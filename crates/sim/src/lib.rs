// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Simulated TM4C123 board implementing the bridge's hardware capability.
//!
//! The board models what the bridge can observe: UART FIFOs and interrupt
//! flags, clock gating, pin muxing, the NVIC and the core interrupt mask.
//! Every hardware operation is appended to an ordered trace.

pub mod board;
pub mod peripherals;
pub mod simulation;
pub mod trace;

pub use board::SimBoard;
pub use simulation::Simulation;
pub use trace::{Fault, HalEvent, Trace};

use serial_bridge::ChannelRole;
use serial_bridge_config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("invalid bridge configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("channel {0:?} has not been configured; call start() first")]
    NotConfigured(ChannelRole),
    #[error("interrupt storm: more than {limit} interrupt services")]
    InterruptStorm { limit: u64 },
}

pub type SimResult<T> = Result<T, SimError>;

/// A modelled block that can report its state for result artifacts.
pub trait Peripheral: std::fmt::Debug {
    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}
