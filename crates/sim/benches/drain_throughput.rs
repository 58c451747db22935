// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use criterion::{criterion_group, criterion_main, Criterion};
use serial_bridge::hal::PeripheralId;
use serial_bridge::ChannelRole;
use serial_bridge_config::BridgeManifest;
use serial_bridge_sim::Simulation;

const MANIFEST: &str = r#"
schema_version: "1.0"
name: "bench"
fifo_depth: 256
channels:
  a:
    peripheral: uart0
    port: a
    rx_pin: 0
    tx_pin: 1
    pin_mux: 1
    baud: 921600
    rx_trigger: seven_eighths
    echo: true
  b:
    peripheral: uart1
    port: b
    rx_pin: 0
    tx_pin: 1
    pin_mux: 1
    baud: 921600
"#;

fn bench_drain(c: &mut Criterion) {
    let manifest = BridgeManifest::from_yaml(MANIFEST).unwrap();
    let burst: Vec<u8> = (0..=255).collect();

    c.bench_function("drain_full_fifo", |b| {
        b.iter(|| {
            let mut sim = Simulation::from_manifest(&manifest, u64::MAX).unwrap();
            sim.start().unwrap();
            sim.board_mut().receive(PeripheralId::Uart0, &burst);
            sim.service().unwrap();
            assert_eq!(sim.stats(ChannelRole::A).forwarded, 256);
        });
    });
}

criterion_group!(benches, bench_drain);
criterion_main!(benches);
