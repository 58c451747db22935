// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Result artifacts of a scenario run: `result.json`, `snapshot.json`,
//! `trace.json` and a JUnit report.

use serde::{Deserialize, Serialize};
use serial_bridge::StatsSnapshot;
use serial_bridge_config::scenario::Assertion;
use std::path::{Path, PathBuf};
use tracing::error;

pub const RESULT_SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pass,
    Fail,
    Error,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AssertionResult {
    pub assertion: Assertion,
    pub passed: bool,
    pub observed: serde_json::Value,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct PerChannel<T> {
    pub a: T,
    pub b: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TestConfig {
    pub script: PathBuf,
    pub manifest: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TestResult {
    pub result_schema_version: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub steps_executed: usize,
    pub interrupts_serviced: u64,
    pub transmitted: PerChannel<Vec<u8>>,
    pub stats: PerChannel<StatsSnapshot>,
    pub faults: usize,
    pub assertions: Vec<AssertionResult>,
    pub config: TestConfig,
}

impl TestResult {
    /// Result for a run that never got past loading its inputs.
    pub fn config_error(config: TestConfig, message: String) -> Self {
        Self {
            result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
            status: Status::Error,
            message: Some(message),
            steps_executed: 0,
            interrupts_serviced: 0,
            transmitted: PerChannel::default(),
            stats: PerChannel::default(),
            faults: 0,
            assertions: Vec::new(),
            config,
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) {
    match std::fs::File::create(path) {
        Ok(f) => {
            if let Err(e) = serde_json::to_writer_pretty(f, value) {
                error!("Failed to write {:?}: {}", path, e);
            }
        }
        Err(e) => error!("Failed to create {:?}: {}", path, e),
    }
}

/// Write every artifact into `output_dir`. Failures are logged, never fatal.
pub fn write_outputs(
    output_dir: &Path,
    result: &TestResult,
    snapshot: Option<&serde_json::Value>,
    trace: Option<&serde_json::Value>,
    duration: std::time::Duration,
) {
    if let Err(e) = std::fs::create_dir_all(output_dir) {
        error!("Failed to create output directory {:?}: {}", output_dir, e);
        return;
    }

    write_json(&output_dir.join("result.json"), result);
    if let Some(snapshot) = snapshot {
        write_json(&output_dir.join("snapshot.json"), snapshot);
    }
    if let Some(trace) = trace {
        write_json(&output_dir.join("trace.json"), trace);
    }

    let junit_path = output_dir.join("junit.xml");
    if let Err(e) = write_junit_xml(&junit_path, result, duration) {
        error!("Failed to write {:?}: {}", junit_path, e);
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub fn assertion_short_name(assertion: &Assertion) -> String {
    match assertion {
        Assertion::TxEquals(a) => format!("tx_equals {:?}", a.tx_equals.channel),
        Assertion::TxEmpty(a) => format!("tx_empty {:?}", a.tx_empty),
        Assertion::Counter(a) => format!(
            "counter {:?}.{:?} == {}",
            a.counter.channel, a.counter.name, a.counter.equals
        ),
        Assertion::NoFaults(a) => format!("no_faults {}", a.no_faults),
    }
}

pub fn write_junit_xml(
    path: &Path,
    result: &TestResult,
    duration: std::time::Duration,
) -> std::io::Result<()> {
    let time_secs = duration.as_secs_f64();
    let mut details = String::new();
    details.push_str(&format!(
        "result_schema_version={}\n",
        RESULT_SCHEMA_VERSION
    ));
    if let Some(msg) = &result.message {
        details.push_str(&format!("message={}\n", msg));
    }
    details.push_str(&format!("script={}\n", result.config.script.display()));
    if let Some(manifest) = &result.config.manifest {
        details.push_str(&format!("manifest={}\n", manifest.display()));
    }
    details.push_str(&format!("steps_executed={}\n", result.steps_executed));
    details.push_str(&format!(
        "interrupts_serviced={}\n",
        result.interrupts_serviced
    ));

    let mut tests = 1u64;
    let mut failures = 0u64;
    let mut errors = 0u64;
    let mut testcases = String::new();

    testcases.push_str(&format!(
        "  <testcase classname=\"serial-bridge\" name=\"run\" time=\"{:.6}\">\n",
        time_secs
    ));
    if result.status == Status::Error {
        errors += 1;
        testcases.push_str(&format!(
            "    <error message=\"{}\">{}</error>\n",
            xml_escape(result.message.as_deref().unwrap_or("error")),
            xml_escape(&details)
        ));
    }
    testcases.push_str("  </testcase>\n");

    for (idx, a) in result.assertions.iter().enumerate() {
        tests += 1;
        let name = format!("assertion {}: {}", idx + 1, assertion_short_name(&a.assertion));
        testcases.push_str(&format!(
            "  <testcase classname=\"serial-bridge\" name=\"{}\" time=\"0.000000\">\n",
            xml_escape(&name)
        ));
        if !a.passed {
            failures += 1;
            testcases.push_str(&format!(
                "    <failure message=\"assertion failed\">{}</failure>\n",
                xml_escape(&format!("{}\nobserved={}\n\n{}", name, a.observed, details))
            ));
        }
        testcases.push_str("  </testcase>\n");
    }

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!(
        r#"<testsuite name="serial-bridge" tests="{}" failures="{}" errors="{}" time="{:.6}">"#,
        tests, failures, errors, time_secs
    ));
    xml.push('\n');
    xml.push_str(&testcases);
    xml.push_str("</testsuite>\n");

    std::fs::write(path, xml)
}
