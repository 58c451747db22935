// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serial_bridge::hal::{
    AltFunction, BaudDivisor, ClockDomain, ClockSource, CorePlatform, FifoLevel, FrameFormat,
    InterruptFlags, PeripheralId, Pin, ReadOutcome, SerialHal, SystemClock, WriteOutcome,
};
use serial_bridge::{BaudRate, Bridge, ChannelRole, DrainReport};

use crate::peripherals::gpio::Gpio;
use crate::peripherals::nvic::Nvic;
use crate::peripherals::sysctl::SysCtl;
use crate::peripherals::uart::Uart;
use crate::trace::{Fault, HalEvent, Trace};
use crate::{Peripheral, SimError, SimResult};

/// A TM4C123-shaped board: eight UARTs, six GPIO ports, clock gating and an NVIC.
#[derive(Debug)]
pub struct SimBoard {
    sysctl: SysCtl,
    gpio: Gpio,
    nvic: Nvic,
    uarts: Vec<Uart>,
    trace: Trace,
    faults: Vec<Fault>,
    services: u64,
    max_services: u64,
}

impl SimBoard {
    pub fn new(fifo_depth: usize, max_services: u64) -> Self {
        Self {
            sysctl: SysCtl::new(),
            gpio: Gpio::new(),
            nvic: Nvic::new(),
            uarts: PeripheralId::ALL
                .iter()
                .map(|id| Uart::new(*id, fifo_depth))
                .collect(),
            trace: Trace::default(),
            faults: Vec::new(),
            services: 0,
            max_services,
        }
    }

    pub fn uart(&self, id: PeripheralId) -> &Uart {
        &self.uarts[id.index()]
    }

    pub fn gpio(&self) -> &Gpio {
        &self.gpio
    }

    pub fn nvic(&self) -> &Nvic {
        &self.nvic
    }

    pub fn sysctl(&self) -> &SysCtl {
        &self.sysctl
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }

    /// Interrupt services performed so far.
    pub fn services(&self) -> u64 {
        self.services
    }

    fn fault(&mut self, fault: Fault) {
        tracing::warn!(?fault, "hardware fault");
        self.faults.push(fault);
    }

    /// The UART, after checking its clock; an access to a gated UART is a fault.
    fn uart_mut(&mut self, id: PeripheralId, operation: &'static str) -> &mut Uart {
        if !self.sysctl.is_enabled(ClockDomain::Serial(id)) {
            self.fault(Fault::UnclockedUart {
                peripheral: id,
                operation,
            });
        }
        &mut self.uarts[id.index()]
    }

    /// Units arrive on `id`'s receive line back to back. Returns how many
    /// were lost to a full receive FIFO.
    pub fn receive(&mut self, id: PeripheralId, units: &[u8]) -> usize {
        let uart = &mut self.uarts[id.index()];
        let lost = units.iter().filter(|unit| !uart.push_rx(**unit)).count();
        if lost > 0 {
            tracing::warn!("{:?}: {} units lost to receive overrun", id, lost);
        }
        lost
    }

    pub fn line_idle(&mut self, id: PeripheralId) {
        self.uarts[id.index()].line_idle();
    }

    pub fn shift_out(&mut self, id: PeripheralId, count: Option<usize>) -> usize {
        self.uarts[id.index()].shift_out(count)
    }

    pub fn transmitted(&self, id: PeripheralId) -> Vec<u8> {
        self.uart(id).transmitted()
    }

    pub fn inject_spurious_empty(&mut self, id: PeripheralId, after: usize) {
        self.uarts[id.index()].inject_spurious_empty(after);
    }

    /// Lowest-numbered UART line the core would take an interrupt from now.
    pub fn pending_line(&self) -> Option<(PeripheralId, ChannelRole)> {
        PeripheralId::ALL.into_iter().find_map(|id| {
            if self.uart(id).irq_pending() {
                self.nvic.would_take(id).map(|role| (id, role))
            } else {
                None
            }
        })
    }

    /// Take interrupts until none is pending, dispatching each line to the
    /// engine bound to it.
    pub fn service_pending(&mut self, bridge: &Bridge) -> SimResult<Vec<DrainReport>> {
        let mut reports = Vec::new();
        while let Some((id, role)) = self.pending_line() {
            if self.services >= self.max_services {
                return Err(SimError::InterruptStorm {
                    limit: self.max_services,
                });
            }
            self.services += 1;
            self.trace.push(HalEvent::InterruptTaken {
                peripheral: id,
                role,
            });
            let report = bridge.on_interrupt(self, role);
            tracing::debug!(
                "{:?} ({:?}): received {} forwarded {} dropped {}",
                id,
                role,
                report.received,
                report.forwarded,
                report.dropped
            );
            reports.push(report);
        }
        Ok(reports)
    }

    pub fn snapshot(&self) -> serde_json::Value {
        let uarts: serde_json::Map<String, serde_json::Value> = self
            .uarts
            .iter()
            .filter(|u| self.sysctl.is_enabled(ClockDomain::Serial(u.id())))
            .map(|u| (format!("{:?}", u.id()).to_lowercase(), u.snapshot()))
            .collect();
        serde_json::json!({
            "sysctl": self.sysctl.snapshot(),
            "gpio": self.gpio.snapshot(),
            "nvic": self.nvic.snapshot(),
            "uarts": uarts,
            "faults": self.faults,
            "services": self.services,
        })
    }
}

impl SerialHal for SimBoard {
    fn enable_clock_domain(&mut self, domain: ClockDomain) {
        self.sysctl.enable(domain);
        self.trace.push(match domain {
            ClockDomain::Port(port) => HalEvent::PortClockEnabled { port },
            ClockDomain::Serial(peripheral) => HalEvent::UartClockEnabled { peripheral },
        });
    }

    fn bind_pin(&mut self, pin: Pin, function: AltFunction) {
        if !self.sysctl.is_enabled(ClockDomain::Port(pin.port)) {
            self.fault(Fault::UnclockedPort {
                port: pin.port,
                pin: pin.number,
            });
        }
        self.gpio.bind(pin, function);
        self.trace.push(HalEvent::PinBound {
            port: pin.port,
            pin: pin.number,
            function: function.0,
        });
    }

    fn set_clock_source(&mut self, id: PeripheralId, source: ClockSource) {
        self.uart_mut(id, "set_clock_source").set_clock_source(source);
        self.trace.push(HalEvent::ClockSourceSelected {
            peripheral: id,
            source,
        });
    }

    fn clock_frequency(&self, source: ClockSource) -> u32 {
        self.sysctl.source_hz(source)
    }

    fn set_frame(&mut self, id: PeripheralId, clock_hz: u32, baud: BaudRate, frame: FrameFormat) {
        self.uart_mut(id, "set_frame").set_frame(clock_hz, baud, frame);
        let divisor = BaudDivisor::new(clock_hz, baud);
        self.trace.push(HalEvent::FrameSet {
            peripheral: id,
            clock_hz,
            baud: baud.bps(),
            ibrd: divisor.integer,
            fbrd: divisor.fraction,
        });
    }

    fn set_fifo_trigger(&mut self, id: PeripheralId, level: FifoLevel) {
        self.uart_mut(id, "set_fifo_trigger").set_rx_trigger(level);
        self.trace.push(HalEvent::FifoTriggerSet {
            peripheral: id,
            level,
        });
    }

    fn enable_interrupts(&mut self, id: PeripheralId, flags: InterruptFlags) {
        self.uart_mut(id, "enable_interrupts")
            .enable_interrupts(flags);
        self.trace.push(HalEvent::InterruptsEnabled {
            peripheral: id,
            flags: flags.bits(),
        });
    }

    fn disable_interrupts(&mut self, id: PeripheralId, flags: InterruptFlags) {
        self.uart_mut(id, "disable_interrupts")
            .disable_interrupts(flags);
        self.trace.push(HalEvent::InterruptsDisabled {
            peripheral: id,
            flags: flags.bits(),
        });
    }

    fn bind_handler(&mut self, id: PeripheralId, role: ChannelRole) {
        if self.uart(id).enabled().is_empty() {
            self.fault(Fault::HandlerBeforeEnable { peripheral: id });
        }
        self.nvic.bind(id, role);
        self.trace.push(HalEvent::HandlerBound {
            peripheral: id,
            role,
        });
    }

    fn interrupt_status(&self, id: PeripheralId, masked: bool) -> InterruptFlags {
        self.uart(id).status(masked)
    }

    fn clear_interrupts(&mut self, id: PeripheralId, flags: InterruptFlags) {
        self.uart_mut(id, "clear_interrupts").clear(flags);
        self.trace.push(HalEvent::InterruptsCleared {
            peripheral: id,
            flags: flags.bits(),
        });
    }

    fn rx_available(&self, id: PeripheralId) -> bool {
        self.uart(id).rx_available()
    }

    fn read(&mut self, id: PeripheralId) -> ReadOutcome {
        let outcome = self.uart_mut(id, "read").read();
        self.trace.push(HalEvent::Read {
            peripheral: id,
            unit: match outcome {
                ReadOutcome::Data(unit) => Some(unit),
                ReadOutcome::Empty => None,
            },
        });
        outcome
    }

    fn write(&mut self, id: PeripheralId, unit: u8) -> WriteOutcome {
        let outcome = self.uart_mut(id, "write").write(unit);
        if outcome == WriteOutcome::Full {
            tracing::warn!("{:?}: transmit FIFO full, unit {:#04x} dropped", id, unit);
        }
        self.trace.push(HalEvent::Write {
            peripheral: id,
            unit,
            queued: outcome == WriteOutcome::Queued,
        });
        outcome
    }
}

impl CorePlatform for SimBoard {
    fn set_system_clock(&mut self, clock: SystemClock) {
        self.sysctl.set_system_clock(clock);
        self.trace.push(HalEvent::SystemClock {
            hz: clock.frequency(),
        });
    }

    fn enable_global_interrupts(&mut self) {
        self.nvic.enable_global();
        self.trace.push(HalEvent::GlobalInterruptsEnabled);
    }

    fn wait_for_interrupt(&mut self) {
        self.trace.push(HalEvent::WaitForInterrupt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_bridge::hal::Port;

    #[test]
    fn test_gated_accesses_fault() {
        let mut board = SimBoard::new(16, 10);
        board.bind_pin(Pin::new(Port::A, 0), AltFunction(1));
        board.write(PeripheralId::Uart3, 0x55);

        assert_eq!(
            board.faults(),
            &[
                Fault::UnclockedPort {
                    port: Port::A,
                    pin: 0
                },
                Fault::UnclockedUart {
                    peripheral: PeripheralId::Uart3,
                    operation: "write"
                },
            ]
        );
    }

    #[test]
    fn test_binding_before_enable_faults() {
        let mut board = SimBoard::new(16, 10);
        board.enable_clock_domain(ClockDomain::Serial(PeripheralId::Uart2));
        board.bind_handler(PeripheralId::Uart2, ChannelRole::A);
        assert_eq!(
            board.faults(),
            &[Fault::HandlerBeforeEnable {
                peripheral: PeripheralId::Uart2
            }]
        );
    }

    #[test]
    fn test_no_line_taken_without_global_enable() {
        let mut board = SimBoard::new(16, 10);
        let id = PeripheralId::Uart0;
        board.enable_clock_domain(ClockDomain::Serial(id));
        board.enable_interrupts(id, InterruptFlags::RECEIVE);
        board.bind_handler(id, ChannelRole::A);
        board.receive(id, &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(board.pending_line(), None);

        board.enable_global_interrupts();
        assert_eq!(board.pending_line(), Some((id, ChannelRole::A)));
    }
}
