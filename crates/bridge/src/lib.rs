// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#![cfg_attr(not(test), no_std)]

//! Interrupt-driven bridge between two UARTs.
//!
//! Bytes received on one channel are forwarded, without blocking, to the
//! transmit FIFO of the other, optionally echoed back. All buffering is the
//! hardware FIFOs'; the only software state is per-engine counters.

pub mod bootstrap;
pub mod configurator;
pub mod descriptor;
pub mod engine;
pub mod hal;


pub use bootstrap::{Bridge, BridgeConfig, EchoPolicy};
pub use configurator::configure;
pub use descriptor::{
    BaudRate, ChannelPair, ChannelRole, InterruptPolicy, LinkParams, PeripheralDescriptor,
    PinBinding,
};
pub use engine::{DrainReport, StatsSnapshot, TransferEngine};
pub use hal::{CorePlatform, SerialHal};
