// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::hal::{
    AltFunction, ClockSource, FifoLevel, FrameFormat, InterruptFlags, PeripheralId, Pin, Port,
};

/// Baud rate restricted to the rates the bridge is qualified for.
///
/// [`BaudRate::new`] is a `const fn` that panics on an unsupported rate, so a
/// descriptor built in a `const`/`static` initializer fails the build instead
/// of producing an image with a bad link configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BaudRate(u32);

impl BaudRate {
    pub const SUPPORTED: [u32; 8] = [
        9_600, 19_200, 38_400, 57_600, 115_200, 230_400, 460_800, 921_600,
    ];

    pub const fn new(bps: u32) -> Self {
        match Self::checked(bps) {
            Some(rate) => rate,
            None => panic!("unsupported baud rate"),
        }
    }

    pub const fn checked(bps: u32) -> Option<Self> {
        let mut i = 0;
        while i < Self::SUPPORTED.len() {
            if Self::SUPPORTED[i] == bps {
                return Some(Self(bps));
            }
            i += 1;
        }
        None
    }

    pub const fn bps(self) -> u32 {
        self.0
    }
}

/// One side of the bridge. Also names the engine instance serving that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ChannelRole {
    A,
    B,
}

impl ChannelRole {
    pub const BOTH: [ChannelRole; 2] = [ChannelRole::A, ChannelRole::B];

    pub const fn peer(self) -> ChannelRole {
        match self {
            ChannelRole::A => ChannelRole::B,
            ChannelRole::B => ChannelRole::A,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Receive/transmit pins of one channel and the mux value routing them to the UART.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinBinding {
    pub port: Port,
    pub rx: u8,
    pub tx: u8,
    pub function: AltFunction,
}

impl PinBinding {
    pub const fn rx_pin(&self) -> Pin {
        Pin::new(self.port, self.rx)
    }

    pub const fn tx_pin(&self) -> Pin {
        Pin::new(self.port, self.tx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkParams {
    pub baud: BaudRate,
    pub frame: FrameFormat,
    pub clock_source: ClockSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptPolicy {
    pub conditions: InterruptFlags,
    pub rx_trigger: FifoLevel,
}

impl InterruptPolicy {
    /// Data-available plus receive-timeout, so a short burst below the
    /// trigger level is still drained once the line goes idle.
    pub const RX_AND_TIMEOUT: InterruptPolicy = InterruptPolicy {
        conditions: InterruptFlags::RECEIVE.union(InterruptFlags::RECEIVE_TIMEOUT),
        rx_trigger: FifoLevel::OneEighth,
    };
}

/// Immutable description of one bridge channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeripheralDescriptor {
    pub id: PeripheralId,
    pub pins: PinBinding,
    pub link: LinkParams,
    pub interrupts: InterruptPolicy,
    /// Engine bound to this channel's interrupt line.
    pub role: ChannelRole,
}

impl PeripheralDescriptor {
    /// The descriptor this channel forwards to.
    pub const fn peer(&self) -> ChannelRole {
        self.role.peer()
    }
}

/// The two descriptors of the bridge, paired symmetrically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPair {
    a: PeripheralDescriptor,
    b: PeripheralDescriptor,
}

impl ChannelPair {
    /// Pair two descriptors. Panics (a build failure in const context) unless
    /// `a` carries role A, `b` carries role B and they name different UARTs.
    pub const fn new(a: PeripheralDescriptor, b: PeripheralDescriptor) -> Self {
        match Self::checked(a, b) {
            Ok(pair) => pair,
            Err(PairingError::RoleMismatch) => panic!("channel roles must be A then B"),
            Err(PairingError::SharedPeripheral) => {
                panic!("both channels use the same UART instance")
            }
        }
    }

    pub const fn checked(
        a: PeripheralDescriptor,
        b: PeripheralDescriptor,
    ) -> Result<Self, PairingError> {
        if !matches!(a.role, ChannelRole::A) || !matches!(b.role, ChannelRole::B) {
            return Err(PairingError::RoleMismatch);
        }
        if a.id as usize == b.id as usize {
            return Err(PairingError::SharedPeripheral);
        }
        Ok(Self { a, b })
    }

    pub const fn get(&self, role: ChannelRole) -> &PeripheralDescriptor {
        match role {
            ChannelRole::A => &self.a,
            ChannelRole::B => &self.b,
        }
    }

    /// Source and destination for the engine serving `role`.
    pub const fn route(&self, role: ChannelRole) -> (&PeripheralDescriptor, &PeripheralDescriptor) {
        (self.get(role), self.get(role.peer()))
    }

    pub fn role_of(&self, id: PeripheralId) -> Option<ChannelRole> {
        ChannelRole::BOTH.into_iter().find(|role| self.get(*role).id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingError {
    RoleMismatch,
    SharedPeripheral,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::FrameFormat;

    fn descriptor(id: PeripheralId, role: ChannelRole) -> PeripheralDescriptor {
        PeripheralDescriptor {
            id,
            pins: PinBinding {
                port: Port::A,
                rx: 0,
                tx: 1,
                function: AltFunction(1),
            },
            link: LinkParams {
                baud: BaudRate::new(115_200),
                frame: FrameFormat::EIGHT_N_ONE,
                clock_source: ClockSource::System,
            },
            interrupts: InterruptPolicy::RX_AND_TIMEOUT,
            role,
        }
    }

    #[test]
    fn supported_baud_rates_are_accepted() {
        for bps in BaudRate::SUPPORTED {
            assert_eq!(BaudRate::checked(bps).map(BaudRate::bps), Some(bps));
        }
    }

    #[test]
    fn unsupported_baud_rate_is_rejected() {
        assert_eq!(BaudRate::checked(14_400), None);
        assert_eq!(BaudRate::checked(0), None);
    }

    #[test]
    #[should_panic(expected = "unsupported baud rate")]
    fn unsupported_baud_rate_panics() {
        let _ = BaudRate::new(31_250);
    }

    #[test]
    fn pair_is_symmetric() {
        let pair = ChannelPair::new(
            descriptor(PeripheralId::Uart0, ChannelRole::A),
            descriptor(PeripheralId::Uart1, ChannelRole::B),
        );
        for role in ChannelRole::BOTH {
            let (src, dst) = pair.route(role);
            assert_eq!(src.role, role);
            assert_eq!(src.peer(), dst.role);
            assert_eq!(dst.peer(), src.role);
        }
        assert_eq!(pair.role_of(PeripheralId::Uart1), Some(ChannelRole::B));
        assert_eq!(pair.role_of(PeripheralId::Uart2), None);
    }

    #[test]
    fn pair_rejects_swapped_roles() {
        let err = ChannelPair::checked(
            descriptor(PeripheralId::Uart0, ChannelRole::B),
            descriptor(PeripheralId::Uart1, ChannelRole::A),
        )
        .unwrap_err();
        assert_eq!(err, PairingError::RoleMismatch);
    }

    #[test]
    fn pair_rejects_shared_uart() {
        let err = ChannelPair::checked(
            descriptor(PeripheralId::Uart3, ChannelRole::A),
            descriptor(PeripheralId::Uart3, ChannelRole::B),
        )
        .unwrap_err();
        assert_eq!(err, PairingError::SharedPeripheral);
    }
}
