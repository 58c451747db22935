// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serial_bridge_config::scenario::Assertion;
use serial_bridge_sim::Simulation;

use crate::report::AssertionResult;

/// Check one assertion against the state the scenario left behind.
pub fn evaluate(assertion: &Assertion, sim: &Simulation) -> AssertionResult {
    let (passed, observed) = match assertion {
        Assertion::TxEquals(a) => {
            let tx = sim.transmitted(a.tx_equals.channel);
            let passed = a
                .tx_equals
                .expected()
                .map(|expected| expected == tx)
                .unwrap_or(false);
            (passed, serde_json::json!(tx))
        }
        Assertion::TxEmpty(a) => {
            let tx = sim.transmitted(a.tx_empty);
            (tx.is_empty(), serde_json::json!(tx))
        }
        Assertion::Counter(a) => {
            let value = a.counter.name.read(&sim.stats(a.counter.channel));
            (value == a.counter.equals, serde_json::json!(value))
        }
        Assertion::NoFaults(a) => {
            let faults = sim.board().faults();
            (
                faults.is_empty() == a.no_faults,
                serde_json::to_value(faults).unwrap_or(serde_json::Value::Null),
            )
        }
    };

    if !passed {
        tracing::error!("Assertion failed: {:?} (observed {})", assertion, observed);
    }

    AssertionResult {
        assertion: assertion.clone(),
        passed,
        observed,
    }
}
