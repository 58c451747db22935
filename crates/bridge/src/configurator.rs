// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::descriptor::PeripheralDescriptor;
use crate::hal::{ClockDomain, SerialHal};

/// Bring one channel up from reset.
///
/// The order is fixed: clocks, pins, clock source, frame and baud, FIFO
/// trigger, peripheral interrupt enable, and last the handler binding that
/// unmasks the line. Global interrupts are already enabled when this runs, so
/// the line must not be routed before the peripheral is fully armed.
pub fn configure<H: SerialHal>(hal: &mut H, descriptor: &PeripheralDescriptor) {
    let id = descriptor.id;
    let pins = &descriptor.pins;
    let link = &descriptor.link;

    hal.enable_clock_domain(ClockDomain::Port(pins.port));
    hal.enable_clock_domain(ClockDomain::Serial(id));

    hal.bind_pin(pins.rx_pin(), pins.function);
    hal.bind_pin(pins.tx_pin(), pins.function);

    hal.set_clock_source(id, link.clock_source);
    let clock_hz = hal.clock_frequency(link.clock_source);
    hal.set_frame(id, clock_hz, link.baud, link.frame);

    hal.set_fifo_trigger(id, descriptor.interrupts.rx_trigger);

    hal.enable_interrupts(id, descriptor.interrupts.conditions);
    hal.bind_handler(id, descriptor.role);
}
