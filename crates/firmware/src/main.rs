#![no_std]
// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.
#![no_main]

//! UART0 <-> UART1 bridge for the EK-TM4C123GXL.
//!
//! UART0 (PA0/PA1) is the console routed through the debug USB bridge and
//! echoes what it receives; UART1 (PB0/PB1) is the auxiliary line.

mod tm4c123;
mod vectors;

use cortex_m_rt::entry;
use panic_halt as _;
use serial_bridge::hal::{AltFunction, ClockSource, FrameFormat, PeripheralId, Port, SystemClock};
use serial_bridge::{
    BaudRate, Bridge, BridgeConfig, ChannelPair, ChannelRole, EchoPolicy, InterruptPolicy,
    LinkParams, PeripheralDescriptor, PinBinding,
};

use tm4c123::Tm4c123;

/// 16 MHz crystal through the PLL, divided by 4: 50 MHz.
const SYSTEM_CLOCK: SystemClock = SystemClock {
    crystal_hz: 16_000_000,
    use_pll: true,
    divisor: 4,
};

const _: () = assert!(
    tm4c123::xtal_code(SYSTEM_CLOCK.crystal_hz).is_some(),
    "unsupported crystal frequency"
);

const CONSOLE_BAUD: BaudRate = BaudRate::new(115_200);
const AUX_BAUD: BaudRate = BaudRate::new(115_200);

const ECHO: EchoPolicy = EchoPolicy { a: true, b: false };

const CONSOLE: PeripheralDescriptor = PeripheralDescriptor {
    id: PeripheralId::Uart0,
    pins: PinBinding {
        port: Port::A,
        rx: 0,
        tx: 1,
        function: AltFunction(1),
    },
    link: LinkParams {
        baud: CONSOLE_BAUD,
        frame: FrameFormat::EIGHT_N_ONE,
        clock_source: ClockSource::System,
    },
    interrupts: InterruptPolicy::RX_AND_TIMEOUT,
    role: ChannelRole::A,
};

const AUX: PeripheralDescriptor = PeripheralDescriptor {
    id: PeripheralId::Uart1,
    pins: PinBinding {
        port: Port::B,
        rx: 0,
        tx: 1,
        function: AltFunction(1),
    },
    link: LinkParams {
        baud: AUX_BAUD,
        frame: FrameFormat::EIGHT_N_ONE,
        clock_source: ClockSource::System,
    },
    interrupts: InterruptPolicy::RX_AND_TIMEOUT,
    role: ChannelRole::B,
};

static BRIDGE: Bridge = Bridge::new(BridgeConfig::new(
    SYSTEM_CLOCK,
    ChannelPair::new(CONSOLE, AUX),
    ECHO,
));

/// Interrupt body shared by every UART vector.
fn service(id: PeripheralId) {
    let mut hal = Tm4c123::new();
    if let Some(role) = tm4c123::bound_role(id) {
        BRIDGE.on_interrupt(&mut hal, role);
    }
}

#[entry]
fn main() -> ! {
    let mut hal = Tm4c123::new();
    BRIDGE.run(&mut hal)
}
