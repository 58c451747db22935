// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serial_bridge::hal::{InterruptFlags, PeripheralId, Port};
use serial_bridge::ChannelRole;
use serial_bridge_config::{BridgeManifest, ScenarioScript};
use serial_bridge_sim::{HalEvent, SimError, Simulation};

fn manifest(echo_a: bool, echo_b: bool) -> BridgeManifest {
    let yaml = format!(
        r#"
schema_version: "1.0"
name: "properties"
channels:
  a:
    peripheral: uart0
    port: a
    rx_pin: 0
    tx_pin: 1
    pin_mux: 1
    baud: 115200
    echo: {echo_a}
  b:
    peripheral: uart1
    port: b
    rx_pin: 0
    tx_pin: 1
    pin_mux: 1
    baud: 115200
    echo: {echo_b}
"#
    );
    BridgeManifest::from_yaml(&yaml).unwrap()
}

fn started(echo_a: bool, echo_b: bool) -> Simulation {
    let mut sim = Simulation::from_manifest(&manifest(echo_a, echo_b), 10_000).unwrap();
    sim.start().unwrap();
    sim
}

fn kind(event: &HalEvent) -> &'static str {
    match event {
        HalEvent::SystemClock { .. } => "system_clock",
        HalEvent::GlobalInterruptsEnabled => "global_enable",
        HalEvent::PortClockEnabled { .. } => "port_clock",
        HalEvent::UartClockEnabled { .. } => "uart_clock",
        HalEvent::PinBound { .. } => "pin",
        HalEvent::ClockSourceSelected { .. } => "clock_source",
        HalEvent::FrameSet { .. } => "frame",
        HalEvent::FifoTriggerSet { .. } => "fifo_trigger",
        HalEvent::InterruptsEnabled { .. } => "irq_enable",
        HalEvent::InterruptsDisabled { .. } => "irq_disable",
        HalEvent::HandlerBound { .. } => "handler",
        HalEvent::InterruptTaken { .. } => "taken",
        HalEvent::InterruptsCleared { .. } => "clear",
        HalEvent::Read { .. } => "read",
        HalEvent::Write { .. } => "write",
        HalEvent::WaitForInterrupt => "wfi",
    }
}

#[test]
fn test_bootstrap_trace_order() {
    let sim = started(false, false);
    let kinds: Vec<&str> = sim.board().trace().events().iter().map(kind).collect();

    let channel = [
        "port_clock",
        "uart_clock",
        "pin",
        "pin",
        "clock_source",
        "frame",
        "fifo_trigger",
        "irq_enable",
        "handler",
    ];
    let mut expected = vec!["system_clock", "global_enable"];
    expected.extend(channel);
    expected.extend(channel);
    expected.push("wfi");
    assert_eq!(kinds, expected);

    // Channel A is brought up first.
    let first_handler = sim
        .board()
        .trace()
        .position(|e| matches!(e, HalEvent::HandlerBound { .. }))
        .unwrap();
    assert_eq!(
        sim.board().trace().events()[first_handler],
        HalEvent::HandlerBound {
            peripheral: PeripheralId::Uart0,
            role: ChannelRole::A
        }
    );
}

#[test]
fn test_interrupt_enable_precedes_handler_binding() {
    let sim = started(false, false);
    let trace = sim.board().trace();
    let global = trace
        .position(|e| matches!(e, HalEvent::GlobalInterruptsEnabled))
        .unwrap();

    for id in [PeripheralId::Uart0, PeripheralId::Uart1] {
        let first_touch = trace
            .position(|e| e.peripheral() == Some(id))
            .unwrap();
        let enabled = trace
            .position(|e| matches!(e, HalEvent::InterruptsEnabled { peripheral, .. } if *peripheral == id))
            .unwrap();
        let bound = trace
            .position(|e| matches!(e, HalEvent::HandlerBound { peripheral, .. } if *peripheral == id))
            .unwrap();
        assert!(global < first_touch, "{:?} configured before global enable", id);
        assert!(enabled < bound, "{:?} handler bound before enable", id);
    }
    assert!(sim.board().faults().is_empty());
}

#[test]
fn test_board_state_after_start() {
    let sim = started(false, false);
    let board = sim.board();

    assert_eq!(board.sysctl().system_hz(), Some(50_000_000));
    assert_eq!(board.gpio().port(Port::A).afsel, 0b11);
    assert_eq!(board.gpio().port(Port::B).pctl, 0x11);
    assert_eq!(board.nvic().handler(PeripheralId::Uart1), Some(ChannelRole::B));
    assert_eq!(board.nvic().handler(PeripheralId::Uart2), None);

    let uart0 = board.uart(PeripheralId::Uart0);
    let divisor = uart0.divisor().unwrap();
    assert_eq!((divisor.integer, divisor.fraction), (27, 8));
    assert_eq!(
        uart0.enabled(),
        InterruptFlags::RECEIVE | InterruptFlags::RECEIVE_TIMEOUT
    );
}

#[test]
fn test_sequence_is_forwarded_in_order() {
    let mut sim = started(false, false);
    sim.send(ChannelRole::A, b"bridge", true).unwrap();

    assert_eq!(sim.transmitted(ChannelRole::B), b"bridge");
    let stats = sim.stats(ChannelRole::A);
    assert_eq!(stats.received, 6);
    assert_eq!(stats.forwarded, 6);
    assert_eq!(stats.dropped, 0);
    assert_eq!(sim.stats(ChannelRole::B), Default::default());
}

#[test]
fn test_echo_writes_to_both_queues() {
    let mut sim = started(true, false);
    sim.send(ChannelRole::A, b"ping", true).unwrap();

    assert_eq!(sim.transmitted(ChannelRole::B), b"ping");
    assert_eq!(sim.transmitted(ChannelRole::A), b"ping");
    assert_eq!(sim.stats(ChannelRole::A).echoed, 4);
}

#[test]
fn test_echo_off_leaves_source_silent() {
    let mut sim = started(false, false);
    sim.send(ChannelRole::A, b"ping", true).unwrap();
    assert!(sim.transmitted(ChannelRole::A).is_empty());
}

#[test]
fn test_echo_is_per_channel() {
    let mut sim = started(true, false);
    sim.send(ChannelRole::B, b"pong", true).unwrap();

    assert_eq!(sim.transmitted(ChannelRole::A), b"pong");
    assert!(sim.transmitted(ChannelRole::B).is_empty());
}

#[test]
fn test_spurious_empty_ends_drain() {
    let mut sim = started(false, false);
    sim.board_mut().receive(PeripheralId::Uart0, b"12345");
    sim.spurious_empty(ChannelRole::A, 3).unwrap();

    let reports = sim.service().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].forwarded, 3);
    assert!(reports[0].ended_early);
    assert_eq!(sim.transmitted(ChannelRole::B), b"123");

    // The remaining units are still queued and drain on the next timeout.
    sim.board_mut().line_idle(PeripheralId::Uart0);
    sim.service().unwrap();
    assert_eq!(sim.transmitted(ChannelRole::B), b"12345");
    assert_eq!(sim.stats(ChannelRole::A).early_terminations, 1);
}

#[test]
fn test_overflow_drops_and_counts() {
    let mut sim = started(false, false);
    let burst: Vec<u8> = (0..20).collect();
    sim.send(ChannelRole::A, &burst, true).unwrap();

    assert_eq!(sim.transmitted(ChannelRole::B), &burst[..16]);
    let stats = sim.stats(ChannelRole::A);
    assert_eq!(stats.received, 20);
    assert_eq!(stats.forwarded, 16);
    assert_eq!(stats.dropped, 4);
}

#[test]
fn test_shifting_out_frees_capacity() {
    let mut sim = started(false, false);
    let burst: Vec<u8> = (0..16).collect();
    sim.send(ChannelRole::A, &burst, true).unwrap();
    assert_eq!(sim.transmit(ChannelRole::B, Some(4)).unwrap(), 4);

    sim.send(ChannelRole::A, b"wxyz!", true).unwrap();
    let tx = sim.transmitted(ChannelRole::B);
    assert_eq!(tx.len(), 20);
    assert_eq!(&tx[16..], b"wxyz");
    assert_eq!(sim.stats(ChannelRole::A).dropped, 1);
}

#[test]
fn test_single_unit_echo_off() {
    let mut sim = started(false, false);
    sim.send(ChannelRole::A, &[0x41], true).unwrap();

    assert_eq!(sim.transmitted(ChannelRole::B), vec![0x41]);
    assert!(sim.transmitted(ChannelRole::A).is_empty());
}

#[test]
fn test_single_unit_echo_on() {
    let mut sim = started(true, false);
    sim.send(ChannelRole::A, &[0x41], true).unwrap();

    assert_eq!(sim.transmitted(ChannelRole::B), vec![0x41]);
    assert_eq!(sim.transmitted(ChannelRole::A), vec![0x41]);
}

#[test]
fn test_unit_below_trigger_waits_for_idle() {
    let mut sim = started(false, false);
    sim.send(ChannelRole::A, &[0x41], false).unwrap();
    assert!(sim.transmitted(ChannelRole::B).is_empty());
    assert_eq!(sim.board().uart(PeripheralId::Uart0).rx_len(), 1);

    sim.board_mut().line_idle(PeripheralId::Uart0);
    sim.service().unwrap();
    assert_eq!(sim.transmitted(ChannelRole::B), vec![0x41]);
}

#[test]
fn test_interrupt_storm_is_reported() {
    let mut sim = Simulation::from_manifest(&manifest(false, false), 2).unwrap();
    sim.start().unwrap();
    let err = sim.send(ChannelRole::A, b"abcdef", true).unwrap_err();
    assert!(matches!(err, SimError::InterruptStorm { limit: 2 }));
}

#[test]
fn test_channels_need_start() {
    let mut sim = Simulation::from_manifest(&manifest(false, false), 100).unwrap();
    let err = sim.send(ChannelRole::B, b"x", true).unwrap_err();
    assert!(matches!(err, SimError::NotConfigured(ChannelRole::B)));
}

#[test]
fn test_invalid_manifest_is_a_config_error() {
    let mut manifest = manifest(false, false);
    manifest.channels.b.peripheral = PeripheralId::Uart0;
    manifest.channels.b.port = Port::A;
    let err = Simulation::from_manifest(&manifest, 100).unwrap_err();
    assert!(matches!(err, SimError::Config(_)));
}

#[test]
fn test_snapshot_reports_stats_and_uarts() {
    let mut sim = started(true, false);
    sim.send(ChannelRole::A, b"ok", true).unwrap();

    let snapshot = sim.snapshot();
    assert_eq!(snapshot["stats"]["a"]["forwarded"], 2);
    assert_eq!(snapshot["board"]["uarts"]["uart1"]["tx"], serde_json::json!([111, 107]));
    assert!(snapshot["board"]["uarts"]["uart2"].is_null());
}

#[test]
fn test_script_steps_drive_the_board() {
    let script = ScenarioScript::from_yaml(
        r#"
schema_version: "1.0"
manifest: "unused.yaml"
steps:
  - spurious_empty: { channel: b, after: 1 }
  - send: { channel: b, bytes: [0x6f, 0x6b] }
  - transmit: { channel: a, count: 1 }
"#,
    )
    .unwrap();

    let mut sim = started(false, false);
    for step in &script.steps {
        sim.apply(step).unwrap();
    }

    assert_eq!(sim.transmitted(ChannelRole::A), b"ok".to_vec());
    assert_eq!(sim.stats(ChannelRole::B).early_terminations, 1);
    let uart0 = &sim.snapshot()["board"]["uarts"]["uart0"];
    assert_eq!(uart0["wire"], serde_json::json!([111]));
}
