// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

mod assertions;
mod report;

use clap::{Parser, Subcommand};
use serial_bridge::ChannelRole;
use serial_bridge_config::{load_scenario, BridgeManifest};
use serial_bridge_sim::{SimError, Simulation};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};

use report::{PerChannel, Status, TestConfig, TestResult, RESULT_SCHEMA_VERSION};

const EXIT_PASS: u8 = 0;
const EXIT_ASSERT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const DEFAULT_MAX_INTERRUPTS: u64 = 10_000;

#[derive(Parser, Debug)]
#[command(author, version, about = "SerialBridge board simulator", long_about = None)]
struct Cli {
    /// Log every interrupt service and hardware fault
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deterministic, CI-friendly runner driven by a scenario script (YAML).
    Test(TestArgs),

    /// Bring the bridge up from a manifest and inject units on its lines.
    Run(RunArgs),
}

#[derive(Parser, Debug)]
struct TestArgs {
    /// Path to the scenario script (YAML)
    #[arg(short = 'c', long)]
    script: PathBuf,

    /// Override the script's interrupt limit
    #[arg(long)]
    max_interrupts: Option<u64>,

    /// Directory to write artifacts (result.json, snapshot.json, trace.json, junit.xml)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Path to the bridge manifest (YAML)
    #[arg(short, long)]
    manifest: PathBuf,

    /// Units to receive, as `<channel>:<hex>`, e.g. `a:41` or `b:48690d0a` (repeatable).
    /// All `--send` injections are delivered, in order, before any `--text`.
    #[arg(long, value_parser = parse_injection)]
    send: Vec<Injection>,

    /// Text to receive, as `<channel>:<text>` (repeatable), delivered after every `--send`
    #[arg(long, value_parser = parse_text_injection)]
    text: Vec<Injection>,

    #[arg(long, default_value_t = DEFAULT_MAX_INTERRUPTS)]
    max_interrupts: u64,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Injection {
    channel: ChannelRole,
    units: Vec<u8>,
}

fn parse_channel(s: &str) -> Result<ChannelRole, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "a" => Ok(ChannelRole::A),
        "b" => Ok(ChannelRole::B),
        other => Err(format!("Unknown channel '{}'; expected 'a' or 'b'", other)),
    }
}

fn parse_injection(s: &str) -> Result<Injection, String> {
    let (channel, hex) = s
        .split_once(':')
        .ok_or_else(|| format!("Expected <channel>:<hex>, got '{}'", s))?;
    let hex: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    let hex = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(&hex);
    if !hex.is_ascii() {
        return Err(format!("Hex payload '{}' contains non-hex characters", hex));
    }
    if hex.is_empty() || hex.len() % 2 != 0 {
        return Err(format!("Hex payload '{}' must have an even number of digits", hex));
    }
    let units = (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| format!("Invalid hex '{}': {}", &hex[i..i + 2], e))
        })
        .collect::<Result<Vec<u8>, String>>()?;
    Ok(Injection {
        channel: parse_channel(channel)?,
        units,
    })
}

fn parse_text_injection(s: &str) -> Result<Injection, String> {
    let (channel, text) = s
        .split_once(':')
        .ok_or_else(|| format!("Expected <channel>:<text>, got '{}'", s))?;
    Ok(Injection {
        channel: parse_channel(channel)?,
        units: text.as_bytes().to_vec(),
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level based on --trace flag.
    // Logs go to stderr; stdout carries only command output.
    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Test(args) => run_test(args),
        Commands::Run(args) => run_inject(args),
    }
}

fn exit_code_for(err: &SimError) -> u8 {
    match err {
        SimError::Config(_) => EXIT_CONFIG_ERROR,
        _ => EXIT_RUNTIME_ERROR,
    }
}

fn hex(units: &[u8]) -> String {
    units
        .iter()
        .map(|u| format!("{:02x}", u))
        .collect::<Vec<_>>()
        .join(" ")
}

fn run_test(args: TestArgs) -> ExitCode {
    let started_at = Instant::now();
    let loaded = match load_scenario(&args.script) {
        Ok(loaded) => loaded,
        Err(e) => {
            let msg = format!("{:#}", e);
            error!("{}", msg);
            if let Some(dir) = &args.output_dir {
                let config = TestConfig {
                    script: args.script.clone(),
                    manifest: None,
                };
                report::write_outputs(
                    dir,
                    &TestResult::config_error(config, msg),
                    None,
                    None,
                    started_at.elapsed(),
                );
            }
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let config = TestConfig {
        script: args.script.clone(),
        manifest: Some(loaded.manifest_path.clone()),
    };
    let max_interrupts = args
        .max_interrupts
        .unwrap_or(loaded.script.limits.max_interrupts);

    let mut sim = match Simulation::from_manifest(&loaded.manifest, max_interrupts) {
        Ok(sim) => sim,
        Err(e) => {
            let msg = e.to_string();
            error!("{}", msg);
            if let Some(dir) = &args.output_dir {
                report::write_outputs(
                    dir,
                    &TestResult::config_error(config, msg),
                    None,
                    None,
                    started_at.elapsed(),
                );
            }
            return ExitCode::from(exit_code_for(&e));
        }
    };

    let mut message = None;
    let mut steps_executed = 0;
    match sim.start() {
        Ok(()) => {
            for (index, step) in loaded.script.steps.iter().enumerate() {
                if let Err(e) = sim.apply(step) {
                    let msg = format!("Step {} failed: {:#}", index, e);
                    error!("{}", msg);
                    message = Some(msg);
                    break;
                }
                steps_executed += 1;
            }
        }
        Err(e) => {
            error!("Bridge start failed: {}", e);
            message = Some(e.to_string());
        }
    }
    let runtime_error = message.is_some();

    let assertions: Vec<_> = loaded
        .script
        .assertions
        .iter()
        .map(|a| assertions::evaluate(a, &sim))
        .collect();
    let all_passed = assertions.iter().all(|a| a.passed);

    let status = if runtime_error {
        Status::Error
    } else if !all_passed {
        Status::Fail
    } else {
        Status::Pass
    };

    let result = TestResult {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status,
        message,
        steps_executed,
        interrupts_serviced: sim.board().services(),
        transmitted: PerChannel {
            a: sim.transmitted(ChannelRole::A),
            b: sim.transmitted(ChannelRole::B),
        },
        stats: PerChannel {
            a: sim.stats(ChannelRole::A),
            b: sim.stats(ChannelRole::B),
        },
        faults: sim.board().faults().len(),
        assertions,
        config,
    };

    println!("a tx: {}", hex(&result.transmitted.a));
    println!("b tx: {}", hex(&result.transmitted.b));
    info!(
        "Scenario finished: {:?} ({} steps, {} interrupts, {}/{} assertions passed)",
        result.status,
        result.steps_executed,
        result.interrupts_serviced,
        result.assertions.iter().filter(|a| a.passed).count(),
        result.assertions.len()
    );

    if let Some(dir) = &args.output_dir {
        let trace = serde_json::to_value(sim.board().trace()).ok();
        report::write_outputs(
            dir,
            &result,
            Some(&sim.snapshot()),
            trace.as_ref(),
            started_at.elapsed(),
        );
    }

    match status {
        Status::Error => ExitCode::from(EXIT_RUNTIME_ERROR),
        Status::Fail => ExitCode::from(EXIT_ASSERT_FAIL),
        Status::Pass => ExitCode::from(EXIT_PASS),
    }
}

fn run_inject(args: RunArgs) -> ExitCode {
    let manifest = match BridgeManifest::from_file(&args.manifest) {
        Ok(m) => m,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let mut sim = match Simulation::from_manifest(&manifest, args.max_interrupts) {
        Ok(sim) => sim,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(exit_code_for(&e));
        }
    };

    let injections = args.send.iter().chain(args.text.iter());
    let outcome = sim.start().and_then(|()| {
        for injection in injections {
            info!(
                "Channel {:?} receives {}",
                injection.channel,
                hex(&injection.units)
            );
            sim.send(injection.channel, &injection.units, true)?;
        }
        Ok(())
    });
    if let Err(e) = outcome {
        error!("{}", e);
        return ExitCode::from(exit_code_for(&e));
    }

    if args.json {
        let out = serde_json::json!({
            "bridge": manifest.name,
            "transmitted": {
                "a": sim.transmitted(ChannelRole::A),
                "b": sim.transmitted(ChannelRole::B),
            },
            "stats": {
                "a": sim.stats(ChannelRole::A),
                "b": sim.stats(ChannelRole::B),
            },
            "faults": sim.board().faults(),
        });
        match serde_json::to_string_pretty(&out) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                error!("Failed to serialize output: {}", e);
                return ExitCode::from(EXIT_RUNTIME_ERROR);
            }
        }
    } else {
        for role in ChannelRole::BOTH {
            let stats = sim.stats(role);
            println!(
                "{:?} tx: {}  (forwarded {}, echoed {}, dropped {})",
                role,
                hex(&sim.transmitted(role)),
                stats.forwarded,
                stats.echoed,
                stats.dropped + stats.echo_dropped
            );
        }
    }

    ExitCode::from(EXIT_PASS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_injection_hex() {
        assert_eq!(
            parse_injection("a:41").unwrap(),
            Injection {
                channel: ChannelRole::A,
                units: vec![0x41]
            }
        );
        assert_eq!(parse_injection("B:0x0d0A").unwrap().units, vec![0x0d, 0x0a]);
        assert_eq!(parse_injection("b:de ad").unwrap().units, vec![0xde, 0xad]);
    }

    #[test]
    fn test_parse_injection_rejects_bad_input() {
        assert!(parse_injection("41").is_err());
        assert!(parse_injection("c:41").is_err());
        assert!(parse_injection("a:4").is_err());
        assert!(parse_injection("a:zz").is_err());
    }

    #[test]
    fn test_parse_injection_rejects_non_ascii() {
        let err = parse_injection("a:1\u{e9}1").unwrap_err();
        assert!(err.contains("non-hex"));
        assert!(parse_injection("b:\u{e9}\u{e9}").is_err());
    }

    #[test]
    fn test_parse_text_injection() {
        let injection = parse_text_injection("b:hi:there").unwrap();
        assert_eq!(injection.channel, ChannelRole::B);
        assert_eq!(injection.units, b"hi:there");
    }
}
