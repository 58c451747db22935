// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Scenario scripts: what to feed the simulated board and what to expect.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serial_bridge::{ChannelRole, StatsSnapshot};
use std::path::{Path, PathBuf};

use crate::{BridgeManifest, SCHEMA_VERSION};

fn default_max_interrupts() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioLimits {
    /// Interrupt services allowed over the whole run before it is aborted.
    #[serde(default = "default_max_interrupts")]
    pub max_interrupts: u64,
}

impl Default for ScenarioLimits {
    fn default() -> Self {
        Self {
            max_interrupts: default_max_interrupts(),
        }
    }
}

/// Units given either as `text` or as raw `bytes`; exactly one must be set.
pub fn payload_units(text: &Option<String>, bytes: &Option<Vec<u8>>) -> Result<Vec<u8>> {
    match (text, bytes) {
        (Some(text), None) => Ok(text.as_bytes().to_vec()),
        (None, Some(bytes)) => Ok(bytes.clone()),
        (Some(_), Some(_)) => anyhow::bail!("Give either 'text' or 'bytes', not both"),
        (None, None) => anyhow::bail!("One of 'text' or 'bytes' is required"),
    }
}

/// Units arrive on the channel's receive line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendDetails {
    pub channel: ChannelRole,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub bytes: Option<Vec<u8>>,
    /// Let the line go idle afterwards so the receive timeout fires.
    #[serde(default = "default_true")]
    pub idle: bool,
}

impl SendDetails {
    pub fn units(&self) -> Result<Vec<u8>> {
        payload_units(&self.text, &self.bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendStep {
    pub send: SendDetails,
}

/// Shift units out of the channel's transmit FIFO onto its wire; all of
/// them when `count` is omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransmitDetails {
    pub channel: ChannelRole,
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransmitStep {
    pub transmit: TransmitDetails,
}

/// Make a read come back empty after `after` good reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpuriousEmptyDetails {
    pub channel: ChannelRole,
    pub after: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpuriousEmptyStep {
    pub spurious_empty: SpuriousEmptyDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Send(SendStep),
    Transmit(TransmitStep),
    SpuriousEmpty(SpuriousEmptyStep),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterName {
    Invocations,
    Received,
    Forwarded,
    Echoed,
    Dropped,
    EchoDropped,
    EarlyTerminations,
}

impl CounterName {
    pub fn read(self, stats: &StatsSnapshot) -> u32 {
        match self {
            CounterName::Invocations => stats.invocations,
            CounterName::Received => stats.received,
            CounterName::Forwarded => stats.forwarded,
            CounterName::Echoed => stats.echoed,
            CounterName::Dropped => stats.dropped,
            CounterName::EchoDropped => stats.echo_dropped,
            CounterName::EarlyTerminations => stats.early_terminations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TxEqualsDetails {
    pub channel: ChannelRole,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub bytes: Option<Vec<u8>>,
}

impl TxEqualsDetails {
    pub fn expected(&self) -> Result<Vec<u8>> {
        payload_units(&self.text, &self.bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TxEqualsAssertion {
    pub tx_equals: TxEqualsDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TxEmptyAssertion {
    pub tx_empty: ChannelRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CounterDetails {
    pub channel: ChannelRole,
    pub name: CounterName,
    pub equals: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CounterAssertion {
    pub counter: CounterDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoFaultsAssertion {
    pub no_faults: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Assertion {
    TxEquals(TxEqualsAssertion),
    TxEmpty(TxEmptyAssertion),
    Counter(CounterAssertion),
    NoFaults(NoFaultsAssertion),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioScript {
    pub schema_version: String,
    /// Bridge manifest, relative to the script's directory.
    pub manifest: String,
    #[serde(default)]
    pub limits: ScenarioLimits,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub assertions: Vec<Assertion>,
}

impl ScenarioScript {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let script: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Scenario Script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != SCHEMA_VERSION {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if self.manifest.trim().is_empty() {
            anyhow::bail!("Input 'manifest' path cannot be empty");
        }

        if self.limits.max_interrupts == 0 {
            anyhow::bail!("Limit 'max_interrupts' must be greater than zero");
        }

        for (index, step) in self.steps.iter().enumerate() {
            if let Step::Send(step) = step {
                step.send
                    .units()
                    .with_context(|| format!("Step {} (send)", index))?;
            }
        }

        for (index, assertion) in self.assertions.iter().enumerate() {
            if let Assertion::TxEquals(a) = assertion {
                a.tx_equals
                    .expected()
                    .with_context(|| format!("Assertion {} (tx_equals)", index))?;
            }
        }

        Ok(())
    }

    /// Manifest path resolved against the directory holding the script.
    pub fn manifest_path(&self, script_path: &Path) -> PathBuf {
        let manifest = Path::new(&self.manifest);
        if manifest.is_absolute() {
            return manifest.to_path_buf();
        }
        script_path
            .parent()
            .map(|dir| dir.join(manifest))
            .unwrap_or_else(|| manifest.to_path_buf())
    }
}

/// A script together with the manifest it points at.
#[derive(Debug, Clone)]
pub struct LoadedScenario {
    pub script: ScenarioScript,
    pub manifest_path: PathBuf,
    pub manifest: BridgeManifest,
}

/// Load a scenario script and the bridge manifest it references.
pub fn load_scenario<P: AsRef<Path>>(path: P) -> Result<LoadedScenario> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario script at {:?}", path))?;
    let script = ScenarioScript::from_yaml(&contents)
        .with_context(|| format!("Invalid scenario script {:?}", path))?;

    let manifest_path = script.manifest_path(path);
    let manifest = BridgeManifest::from_file(&manifest_path)?;
    tracing::debug!(
        "Loaded scenario {:?}: {} steps, {} assertions",
        path,
        script.steps.len(),
        script.assertions.len()
    );

    Ok(LoadedScenario {
        script,
        manifest_path,
        manifest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_script() {
        let yaml = r#"
schema_version: "1.0"
manifest: "launchpad.yaml"
limits:
  max_interrupts: 50
steps:
  - send: { channel: a, text: "A" }
  - transmit: { channel: b }
  - spurious_empty: { channel: b, after: 3 }
  - send: { channel: b, bytes: [1, 2, 3, 4], idle: false }
assertions:
  - tx_equals: { channel: b, text: "A" }
  - tx_empty: a
  - counter: { channel: a, name: forwarded, equals: 1 }
  - no_faults: true
"#;
        let script = ScenarioScript::from_yaml(yaml).unwrap();
        assert_eq!(script.limits.max_interrupts, 50);
        assert_eq!(script.steps.len(), 4);
        assert_eq!(
            script.steps[0],
            Step::Send(SendStep {
                send: SendDetails {
                    channel: ChannelRole::A,
                    text: Some("A".into()),
                    bytes: None,
                    idle: true,
                }
            })
        );
        assert_eq!(
            script.steps[1],
            Step::Transmit(TransmitStep {
                transmit: TransmitDetails {
                    channel: ChannelRole::B,
                    count: None
                }
            })
        );
        assert_eq!(
            script.steps[2],
            Step::SpuriousEmpty(SpuriousEmptyStep {
                spurious_empty: SpuriousEmptyDetails {
                    channel: ChannelRole::B,
                    after: 3
                }
            })
        );
        match &script.steps[3] {
            Step::Send(step) => {
                assert_eq!(step.send.bytes, Some(vec![1, 2, 3, 4]));
                assert!(!step.send.idle);
            }
            other => panic!("expected a send step, got {:?}", other),
        }
        assert!(matches!(script.assertions[1], Assertion::TxEmpty(_)));
        assert!(matches!(script.assertions[2], Assertion::Counter(_)));
        assert!(matches!(script.assertions[3], Assertion::NoFaults(_)));
    }

    #[test]
    fn test_invalid_version() {
        let yaml = r#"
schema_version: "2.0"
manifest: "m.yaml"
"#;
        let err = ScenarioScript::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("Unsupported schema_version"));
    }

    #[test]
    fn test_empty_manifest_path() {
        let yaml = r#"
schema_version: "1.0"
manifest: " "
"#;
        let err = ScenarioScript::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("manifest"));
    }

    #[test]
    fn test_zero_interrupt_limit() {
        let yaml = r#"
schema_version: "1.0"
manifest: "m.yaml"
limits:
  max_interrupts: 0
"#;
        let err = ScenarioScript::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("max_interrupts"));
    }

    #[test]
    fn test_send_needs_exactly_one_payload() {
        let both = r#"
schema_version: "1.0"
manifest: "m.yaml"
steps:
  - send: { channel: a, text: "x", bytes: [1] }
"#;
        let err = ScenarioScript::from_yaml(both).unwrap_err();
        assert!(format!("{:#}", err).contains("not both"));

        let neither = r#"
schema_version: "1.0"
manifest: "m.yaml"
steps:
  - send: { channel: a }
"#;
        assert!(ScenarioScript::from_yaml(neither).is_err());
    }

    #[test]
    fn test_hex_bytes_and_partial_transmit() {
        let yaml = r#"
schema_version: "1.0"
manifest: "m.yaml"
steps:
  - send: { channel: a, bytes: [0x41, 0x0d] }
  - transmit: { channel: b, count: 1 }
"#;
        let script = ScenarioScript::from_yaml(yaml).unwrap();
        match &script.steps[0] {
            Step::Send(step) => assert_eq!(step.send.units().unwrap(), vec![0x41, 0x0d]),
            other => panic!("expected a send step, got {:?}", other),
        }
        match &script.steps[1] {
            Step::Transmit(step) => assert_eq!(step.transmit.count, Some(1)),
            other => panic!("expected a transmit step, got {:?}", other),
        }
    }

    #[test]
    fn test_misspelled_step_field_is_rejected() {
        let yaml = r#"
schema_version: "1.0"
manifest: "m.yaml"
steps:
  - send: { channel: a, txt: "x" }
"#;
        assert!(ScenarioScript::from_yaml(yaml).is_err());

        let unknown_step = r#"
schema_version: "1.0"
manifest: "m.yaml"
steps:
  - recieve: { channel: a, text: "x" }
"#;
        assert!(ScenarioScript::from_yaml(unknown_step).is_err());
    }

    #[test]
    fn test_counter_names_map_to_stats() {
        let stats = StatsSnapshot {
            forwarded: 3,
            echo_dropped: 2,
            early_terminations: 1,
            ..StatsSnapshot::default()
        };
        assert_eq!(CounterName::Forwarded.read(&stats), 3);
        assert_eq!(CounterName::EchoDropped.read(&stats), 2);
        assert_eq!(CounterName::EarlyTerminations.read(&stats), 1);
        assert_eq!(CounterName::Dropped.read(&stats), 0);
    }

    #[test]
    fn test_manifest_path_is_relative_to_script() {
        let script = ScenarioScript {
            schema_version: "1.0".into(),
            manifest: "boards/launchpad.yaml".into(),
            limits: ScenarioLimits::default(),
            steps: Vec::new(),
            assertions: Vec::new(),
        };
        assert_eq!(
            script.manifest_path(Path::new("/ci/scenarios/echo.yaml")),
            PathBuf::from("/ci/scenarios/boards/launchpad.yaml")
        );
    }
}
