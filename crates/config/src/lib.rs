// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod chip;
pub mod scenario;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serial_bridge::hal::{
    AltFunction, ClockSource, FifoLevel, FrameFormat, InterruptFlags, Parity, PeripheralId, Port,
    StopBits, SystemClock, WordLength,
};
use serial_bridge::{
    BaudRate, BridgeConfig, ChannelPair, ChannelRole, EchoPolicy, InterruptPolicy, LinkParams,
    PeripheralDescriptor, PinBinding,
};
use std::path::Path;

pub use scenario::{load_scenario, LoadedScenario, ScenarioScript};

pub const SCHEMA_VERSION: &str = "1.0";

/// Default schema version for YAML configs
fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

fn default_crystal_hz() -> u32 {
    16_000_000
}

fn default_true() -> bool {
    true
}

fn default_divisor() -> u32 {
    4
}

fn default_fifo_depth() -> usize {
    chip::UART_FIFO_DEPTH
}

fn default_word_length() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_parity() -> Parity {
    Parity::None
}

fn default_clock_source() -> ClockSource {
    ClockSource::System
}

fn default_interrupts() -> Vec<InterruptCondition> {
    vec![InterruptCondition::Receive, InterruptCondition::ReceiveTimeout]
}

fn default_rx_trigger() -> FifoLevel {
    FifoLevel::OneEighth
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unsupported schema_version '{0}'. Supported versions: '1.0'")]
    UnsupportedSchema(String),
    #[error("channel {channel:?}: unsupported baud rate {baud}; supported: {supported:?}")]
    UnsupportedBaud {
        channel: ChannelRole,
        baud: u32,
        supported: &'static [u32],
    },
    #[error("channel {channel:?}: word length must be 5..=8 bits, got {bits}")]
    WordLength { channel: ChannelRole, bits: u8 },
    #[error("channel {channel:?}: stop bits must be 1 or 2, got {bits}")]
    StopBits { channel: ChannelRole, bits: u8 },
    #[error("channel {channel:?}: {peripheral:?} cannot be routed to port {port:?} pins rx={rx} tx={tx} with mux {mux}")]
    PinMux {
        channel: ChannelRole,
        peripheral: PeripheralId,
        port: Port,
        rx: u8,
        tx: u8,
        mux: u8,
    },
    #[error("channel {channel:?}: no interrupt conditions enabled, the channel would never be drained")]
    NoInterrupts { channel: ChannelRole },
    #[error("both channels use {0:?}")]
    SharedPeripheral(PeripheralId),
    #[error("channel {channel:?}: {baud} baud needs at least {needed_hz} Hz, clock source gives {clock_hz} Hz")]
    ClockTooSlow {
        channel: ChannelRole,
        baud: u32,
        clock_hz: u32,
        needed_hz: u64,
    },
    #[error("invalid system clock: {0}")]
    SystemClock(String),
    #[error("fifo_depth must be between 1 and 256, got {0}")]
    FifoDepth(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptCondition {
    #[serde(alias = "rx", alias = "data_available")]
    Receive,
    #[serde(alias = "rt", alias = "timeout")]
    ReceiveTimeout,
}

impl InterruptCondition {
    pub fn flag(self) -> InterruptFlags {
        match self {
            InterruptCondition::Receive => InterruptFlags::RECEIVE,
            InterruptCondition::ReceiveTimeout => InterruptFlags::RECEIVE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SystemClockConfig {
    #[serde(default = "default_crystal_hz")]
    pub crystal_hz: u32,
    #[serde(default = "default_true")]
    pub use_pll: bool,
    #[serde(default = "default_divisor")]
    pub divisor: u32,
}

impl Default for SystemClockConfig {
    fn default() -> Self {
        Self {
            crystal_hz: default_crystal_hz(),
            use_pll: true,
            divisor: default_divisor(),
        }
    }
}

impl SystemClockConfig {
    pub fn validate(&self) -> Result<SystemClock, ConfigError> {
        if !chip::SUPPORTED_CRYSTALS_HZ.contains(&self.crystal_hz) {
            return Err(ConfigError::SystemClock(format!(
                "crystal {} Hz not supported; supported: {:?}",
                self.crystal_hz,
                chip::SUPPORTED_CRYSTALS_HZ
            )));
        }
        if self.divisor == 0 || self.divisor > chip::MAX_SYSTEM_DIVISOR {
            return Err(ConfigError::SystemClock(format!(
                "divisor must be 1..={}, got {}",
                chip::MAX_SYSTEM_DIVISOR,
                self.divisor
            )));
        }
        if self.use_pll && self.divisor < chip::MIN_PLL_DIVISOR {
            return Err(ConfigError::SystemClock(format!(
                "divisor {} with PLL exceeds the 80 MHz limit",
                self.divisor
            )));
        }
        Ok(SystemClock {
            crystal_hz: self.crystal_hz,
            use_pll: self.use_pll,
            divisor: self.divisor,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    pub peripheral: PeripheralId,
    pub port: Port,
    pub rx_pin: u8,
    pub tx_pin: u8,
    pub pin_mux: u8,
    pub baud: u32,
    #[serde(default = "default_word_length")]
    pub word_length: u8,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default = "default_parity")]
    pub parity: Parity,
    #[serde(default = "default_clock_source")]
    pub clock_source: ClockSource,
    #[serde(default = "default_interrupts")]
    pub interrupts: Vec<InterruptCondition>,
    #[serde(default = "default_rx_trigger")]
    pub rx_trigger: FifoLevel,
    #[serde(default)]
    pub echo: bool,
}

impl ChannelConfig {
    /// Build the descriptor for this channel playing `role`.
    pub fn descriptor(&self, role: ChannelRole) -> Result<PeripheralDescriptor, ConfigError> {
        let baud = BaudRate::checked(self.baud).ok_or(ConfigError::UnsupportedBaud {
            channel: role,
            baud: self.baud,
            supported: &BaudRate::SUPPORTED,
        })?;

        let word_length = match self.word_length {
            5 => WordLength::Five,
            6 => WordLength::Six,
            7 => WordLength::Seven,
            8 => WordLength::Eight,
            bits => return Err(ConfigError::WordLength { channel: role, bits }),
        };
        let stop_bits = match self.stop_bits {
            1 => StopBits::One,
            2 => StopBits::Two,
            bits => return Err(ConfigError::StopBits { channel: role, bits }),
        };

        if chip::routing(
            self.peripheral,
            self.port,
            self.rx_pin,
            self.tx_pin,
            self.pin_mux,
        )
        .is_none()
        {
            return Err(ConfigError::PinMux {
                channel: role,
                peripheral: self.peripheral,
                port: self.port,
                rx: self.rx_pin,
                tx: self.tx_pin,
                mux: self.pin_mux,
            });
        }

        let conditions = self
            .interrupts
            .iter()
            .fold(InterruptFlags::empty(), |acc, c| acc | c.flag());
        if conditions.is_empty() {
            return Err(ConfigError::NoInterrupts { channel: role });
        }

        Ok(PeripheralDescriptor {
            id: self.peripheral,
            pins: PinBinding {
                port: self.port,
                rx: self.rx_pin,
                tx: self.tx_pin,
                function: AltFunction(self.pin_mux),
            },
            link: LinkParams {
                baud,
                frame: FrameFormat {
                    word_length,
                    stop_bits,
                    parity: self.parity,
                },
                clock_source: self.clock_source,
            },
            interrupts: InterruptPolicy {
                conditions,
                rx_trigger: self.rx_trigger,
            },
            role,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelsConfig {
    pub a: ChannelConfig,
    pub b: ChannelConfig,
}

impl ChannelsConfig {
    pub fn get(&self, role: ChannelRole) -> &ChannelConfig {
        match role {
            ChannelRole::A => &self.a,
            ChannelRole::B => &self.b,
        }
    }
}

/// Host-side description of a bridge build: what the firmware's board
/// constants say, in a form the simulator and CLI can load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    #[serde(default)]
    pub system_clock: SystemClockConfig,
    /// Entries per UART FIFO in the simulated board.
    #[serde(default = "default_fifo_depth")]
    pub fifo_depth: usize,
    pub channels: ChannelsConfig,
}

impl BridgeManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read bridge manifest at {:?}", path))?;
        let manifest = Self::from_yaml(&content)
            .with_context(|| format!("Invalid bridge manifest {:?}", path))?;
        tracing::debug!("Loaded bridge manifest '{}' from {:?}", manifest.name, path);
        Ok(manifest)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let manifest: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Bridge Manifest YAML")?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bridge_config().map(|_| ())
    }

    pub fn echo(&self) -> EchoPolicy {
        EchoPolicy {
            a: self.channels.a.echo,
            b: self.channels.b.echo,
        }
    }

    /// Apply every build-time rule and produce the bridge configuration.
    pub fn bridge_config(&self) -> Result<BridgeConfig, ConfigError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ConfigError::UnsupportedSchema(self.schema_version.clone()));
        }
        if self.fifo_depth == 0 || self.fifo_depth > 256 {
            return Err(ConfigError::FifoDepth(self.fifo_depth));
        }

        let system_clock = self.system_clock.validate()?;
        let a = self.channels.a.descriptor(ChannelRole::A)?;
        let b = self.channels.b.descriptor(ChannelRole::B)?;

        // Roles are assigned above; only a shared UART can fail the pairing.
        let pair =
            ChannelPair::checked(a, b).map_err(|_| ConfigError::SharedPeripheral(a.id))?;

        for descriptor in [&a, &b] {
            if !BridgeConfig::clock_supports(&system_clock, descriptor) {
                let baud = descriptor.link.baud.bps();
                return Err(ConfigError::ClockTooSlow {
                    channel: descriptor.role,
                    baud,
                    clock_hz: BridgeConfig::source_frequency(
                        &system_clock,
                        descriptor.link.clock_source,
                    ),
                    needed_hz: u64::from(baud) * u64::from(serial_bridge::bootstrap::OVERSAMPLING),
                });
            }
        }

        Ok(BridgeConfig::new(system_clock, pair, self.echo()))
    }
}
