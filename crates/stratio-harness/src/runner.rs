//! Scenario execution engine.
//!
//! [`ScenarioRunner`] replays [`StreamScenario`] scripts against a real
//! stack: a `MemoryStream` seeded with the scenario bytes, a
//! `BufferedRandom` on top, and a `TextStream` above that when the scenario
//! carries a text block. Each step's expectation is checked inline; the
//! first divergence fails the scenario and is rendered as a diff.

use std::io::SeekFrom;
use std::time::Instant;

use stratio_core::buffered::{BufferedRandom, ReadOutcome};
use stratio_core::codec::{Encoding, ErrorPolicy};
use stratio_core::error::StreamError;
use stratio_core::raw::MemoryStream;
use stratio_core::text::{NewlineMode, TextConfig, TextPosition, TextSeek, TextStream};

use crate::diff::render_diff;
use crate::fixtures::{ScenarioSet, Step, StreamScenario};
use crate::structured_log::{Layer, LogEmitter, LogEntry, LogLevel, Outcome, SuiteKind};
use crate::verify::VerificationResult;

/// Runs a scenario set and collects verification results.
pub struct ScenarioRunner {
    /// Name of the test campaign, recorded as the log gate.
    pub campaign: String,
}

/// The stack under test for one scenario.
enum Driver {
    Bytes(BufferedRandom<MemoryStream>),
    Text(TextStream<BufferedRandom<MemoryStream>>),
}

/// A stored position token. Slots are layer-typed; replaying a byte offset
/// through the text layer (or vice versa) is a scenario bug.
#[derive(Clone, Copy)]
enum Slot {
    Byte(u64),
    Text(TextPosition),
}

/// First divergence of a scenario, in display form.
struct StepError {
    expected: String,
    actual: String,
}

fn fail(expected: impl Into<String>, actual: impl Into<String>) -> StepError {
    StepError {
        expected: expected.into(),
        actual: actual.into(),
    }
}

impl ScenarioRunner {
    /// Create a new runner.
    #[must_use]
    pub fn new(campaign: impl Into<String>) -> Self {
        Self {
            campaign: campaign.into(),
        }
    }

    /// Run all scenarios in a set and return results.
    pub fn run(&self, set: &ScenarioSet) -> Vec<VerificationResult> {
        set.scenarios
            .iter()
            .map(|scenario| {
                self.run_scenario(scenario, None)
                    .unwrap_or_else(|err| VerificationResult {
                        case_name: scenario.name.clone(),
                        contract: scenario.contract.clone(),
                        passed: false,
                        expected: "scenario executes".to_string(),
                        actual: format!("log emission failed: {err}"),
                        diff: None,
                    })
            })
            .collect()
    }

    /// Run all scenarios, emitting a JSONL evidence trail per step.
    pub fn run_logged(
        &self,
        set: &ScenarioSet,
        emitter: &mut LogEmitter,
    ) -> std::io::Result<Vec<VerificationResult>> {
        let mut results = Vec::with_capacity(set.scenarios.len());
        for scenario in &set.scenarios {
            results.push(self.run_scenario(scenario, Some(&mut *emitter))?);
        }
        Ok(results)
    }

    fn run_scenario(
        &self,
        scenario: &StreamScenario,
        mut emitter: Option<&mut LogEmitter>,
    ) -> std::io::Result<VerificationResult> {
        let layer = if scenario.text.is_some() {
            Layer::Text
        } else {
            Layer::Buffered
        };
        let started = Instant::now();

        if let Some(em) = emitter.as_deref_mut() {
            let mut entry = LogEntry::new("", LogLevel::Info, "scenario_start")
                .with_suite(SuiteKind::Conformance)
                .with_gate(self.campaign.clone())
                .with_scenario(&scenario.name)
                .with_capacity(scenario.capacity as u64);
            if let Some(text) = &scenario.text {
                entry = entry.with_chunk_size(text.chunk_size as u64);
            }
            em.emit_entry(entry)?;
        }

        let mut driver = match build_driver(scenario) {
            Ok(driver) => driver,
            Err(detail) => {
                if let Some(em) = emitter.as_deref_mut() {
                    em.emit_entry(
                        LogEntry::new("", LogLevel::Error, "scenario_end")
                            .with_suite(SuiteKind::Conformance)
                            .with_scenario(&scenario.name)
                            .with_outcome(Outcome::Error),
                    )?;
                }
                return Ok(VerificationResult {
                    case_name: scenario.name.clone(),
                    contract: scenario.contract.clone(),
                    passed: false,
                    expected: "scenario constructs".to_string(),
                    actual: detail,
                    diff: None,
                });
            }
        };

        let mut slots: Vec<Option<Slot>> = Vec::new();
        let mut failure: Option<(usize, StepError)> = None;

        for (index, step) in scenario.steps.iter().enumerate() {
            let step_started = Instant::now();
            let outcome = apply_step(&mut driver, &mut slots, step);
            let latency = u64::try_from(step_started.elapsed().as_nanos()).unwrap_or(u64::MAX);

            if let Some(em) = emitter.as_deref_mut() {
                let (level, log_outcome) = if outcome.is_ok() {
                    (LogLevel::Debug, Outcome::Pass)
                } else {
                    (LogLevel::Error, Outcome::Fail)
                };
                let mut entry = LogEntry::new("", level, "scenario_step")
                    .with_suite(SuiteKind::Conformance)
                    .with_scenario(&scenario.name)
                    .with_latency_ns(latency)
                    .with_outcome(log_outcome);
                if let Some(op) = step_operation(step) {
                    entry = entry.with_op(layer, op);
                }
                em.emit_entry(entry)?;
            }

            if let Err(err) = outcome {
                failure = Some((index, err));
                break;
            }
        }

        let duration = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let result = match failure {
            None => {
                let note = format!("completed {} steps", scenario.steps.len());
                VerificationResult {
                    case_name: scenario.name.clone(),
                    contract: scenario.contract.clone(),
                    passed: true,
                    expected: note.clone(),
                    actual: note,
                    diff: None,
                }
            }
            Some((index, err)) => VerificationResult {
                case_name: scenario.name.clone(),
                contract: scenario.contract.clone(),
                passed: false,
                expected: format!("step {}: {}", index + 1, err.expected),
                actual: format!("step {}: {}", index + 1, err.actual),
                diff: Some(render_diff(&err.expected, &err.actual)),
            },
        };

        if let Some(em) = emitter {
            let (level, log_outcome) = if result.passed {
                (LogLevel::Info, Outcome::Pass)
            } else {
                (LogLevel::Error, Outcome::Fail)
            };
            em.emit_entry(
                LogEntry::new("", level, "scenario_end")
                    .with_suite(SuiteKind::Conformance)
                    .with_scenario(&scenario.name)
                    .with_duration_ms(duration)
                    .with_outcome(log_outcome),
            )?;
        }

        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Stack construction
// ---------------------------------------------------------------------------

fn parse_encoding(label: &str) -> Option<Encoding> {
    match label {
        "utf-8" | "utf8" => Some(Encoding::Utf8),
        "ascii" | "us-ascii" => Some(Encoding::Ascii),
        "latin-1" | "latin1" | "iso-8859-1" => Some(Encoding::Latin1),
        _ => None,
    }
}

fn parse_policy(label: &str) -> Option<ErrorPolicy> {
    match label {
        "strict" => Some(ErrorPolicy::Strict),
        "replace" => Some(ErrorPolicy::Replace),
        "ignore" => Some(ErrorPolicy::Ignore),
        _ => None,
    }
}

fn build_driver(scenario: &StreamScenario) -> Result<Driver, String> {
    let raw = MemoryStream::from_bytes(scenario.seed.clone());
    let buffer = BufferedRandom::with_capacity(scenario.capacity, raw)
        .map_err(|e| format!("byte layer construction failed: {e}"))?;

    let Some(opts) = &scenario.text else {
        return Ok(Driver::Bytes(buffer));
    };

    let encoding = parse_encoding(&opts.encoding)
        .ok_or_else(|| format!("unknown encoding label '{}'", opts.encoding))?;
    let policy =
        parse_policy(&opts.policy).ok_or_else(|| format!("unknown policy label '{}'", opts.policy))?;
    let newline = NewlineMode::parse(opts.newline.as_deref())
        .ok_or_else(|| format!("unknown newline argument {:?}", opts.newline))?;

    let config = TextConfig {
        encoding,
        policy,
        newline,
        line_buffering: opts.line_buffering,
        write_through: opts.write_through,
        chunk_size: opts.chunk_size,
    };
    Ok(Driver::Text(TextStream::with_config(buffer, config)))
}

// ---------------------------------------------------------------------------
// Step execution
// ---------------------------------------------------------------------------

/// Bounded-vocab operation label for a step, for the log trail.
fn step_operation(step: &Step) -> Option<&'static str> {
    match step {
        Step::ReadBytes { .. } | Step::Read { .. } | Step::ExpectEof | Step::ExpectReadError { .. } => {
            Some("read")
        }
        Step::ReadLine { .. } => Some("read_line"),
        Step::Peek { .. } => Some("peek"),
        Step::WriteBytes { .. } | Step::Write { .. } => Some("write"),
        Step::Truncate { .. } => Some("truncate"),
        Step::Flush => Some("flush"),
        Step::Tell { .. } => Some("tell"),
        Step::Seek { .. } | Step::SeekStart | Step::SeekEnd => Some("seek"),
        Step::ExpectContents { .. } | Step::ExpectNewlines { .. } => None,
    }
}

fn error_kind(err: &StreamError) -> &'static str {
    match err {
        StreamError::Unsupported(_) => "unsupported",
        StreamError::Closed => "closed",
        StreamError::WouldBlock { .. } => "would_block",
        StreamError::MalformedPosition(_) => "malformed_position",
        StreamError::Decode(_) => "decode",
        StreamError::Encode(_) => "encode",
        StreamError::Invariant(_) => "invariant",
        StreamError::Io(_) => "io",
    }
}

fn apply_step(
    driver: &mut Driver,
    slots: &mut Vec<Option<Slot>>,
    step: &Step,
) -> Result<(), StepError> {
    match step {
        Step::ReadBytes { n, expect } => {
            let Driver::Bytes(buffer) = driver else {
                return Err(fail("a byte-layer scenario", "scenario has a text block"));
            };
            match buffer.read(*n) {
                Ok(ReadOutcome::Bytes(got)) if got == *expect => Ok(()),
                Ok(ReadOutcome::Bytes(got)) => {
                    Err(fail(format!("{expect:?}"), format!("{got:?}")))
                }
                Ok(ReadOutcome::Eof) => Err(fail(format!("{expect:?}"), "eof")),
                Ok(ReadOutcome::WouldBlock) => Err(fail(format!("{expect:?}"), "would_block")),
                Err(e) => Err(fail(format!("{expect:?}"), format!("error: {e}"))),
            }
        }
        Step::Peek { n, expect_prefix } => {
            let Driver::Bytes(buffer) = driver else {
                return Err(fail("a byte-layer scenario", "scenario has a text block"));
            };
            match buffer.peek(*n) {
                Ok(got) if got.starts_with(expect_prefix) => Ok(()),
                Ok(got) => Err(fail(
                    format!("prefix {expect_prefix:?}"),
                    format!("{got:?}"),
                )),
                Err(e) => Err(fail(format!("prefix {expect_prefix:?}"), format!("error: {e}"))),
            }
        }
        Step::WriteBytes { data } => {
            let Driver::Bytes(buffer) = driver else {
                return Err(fail("a byte-layer scenario", "scenario has a text block"));
            };
            match buffer.write(data) {
                Ok(accepted) if accepted == data.len() => Ok(()),
                Ok(accepted) => Err(fail(
                    format!("{} bytes accepted", data.len()),
                    format!("{accepted} bytes accepted"),
                )),
                Err(e) => Err(fail("write succeeds", format!("error: {e}"))),
            }
        }
        Step::Truncate { at } => {
            let Driver::Bytes(buffer) = driver else {
                return Err(fail("a byte-layer scenario", "scenario has a text block"));
            };
            buffer
                .truncate(*at)
                .map(|_| ())
                .map_err(|e| fail("truncate succeeds", format!("error: {e}")))
        }
        Step::Read { n, expect } => {
            let text = require_text(driver)?;
            match text.read(*n) {
                Ok(got) if got == *expect => Ok(()),
                Ok(got) => Err(fail(format!("{expect:?}"), format!("{got:?}"))),
                Err(e) => Err(fail(format!("{expect:?}"), format!("error: {e}"))),
            }
        }
        Step::ReadLine { limit, expect } => {
            let text = require_text(driver)?;
            match text.read_line(*limit) {
                Ok(got) if got == *expect => Ok(()),
                Ok(got) => Err(fail(format!("{expect:?}"), format!("{got:?}"))),
                Err(e) => Err(fail(format!("{expect:?}"), format!("error: {e}"))),
            }
        }
        Step::Write { data } => {
            let text = require_text(driver)?;
            let chars = data.chars().count();
            match text.write(data) {
                Ok(written) if written == chars => Ok(()),
                Ok(written) => Err(fail(
                    format!("{chars} chars written"),
                    format!("{written} chars written"),
                )),
                Err(e) => Err(fail("write succeeds", format!("error: {e}"))),
            }
        }
        Step::Flush => match driver {
            Driver::Bytes(buffer) => buffer
                .flush()
                .map_err(|e| fail("flush succeeds", format!("error: {e}"))),
            Driver::Text(text) => text
                .flush()
                .map_err(|e| fail("flush succeeds", format!("error: {e}"))),
        },
        Step::Tell { slot } => {
            let value = match driver {
                Driver::Bytes(buffer) => Slot::Byte(
                    buffer
                        .tell()
                        .map_err(|e| fail("tell succeeds", format!("error: {e}")))?,
                ),
                Driver::Text(text) => Slot::Text(
                    text.tell()
                        .map_err(|e| fail("tell succeeds", format!("error: {e}")))?,
                ),
            };
            if slots.len() <= *slot {
                slots.resize(*slot + 1, None);
            }
            slots[*slot] = Some(value);
            Ok(())
        }
        Step::Seek { slot } => {
            let stored = slots.get(*slot).copied().flatten().ok_or_else(|| {
                fail("a stored position token", format!("slot {slot} is empty"))
            })?;
            match (&mut *driver, stored) {
                (Driver::Bytes(buffer), Slot::Byte(pos)) => buffer
                    .seek(SeekFrom::Start(pos))
                    .map(|_| ())
                    .map_err(|e| fail("seek succeeds", format!("error: {e}"))),
                (Driver::Text(text), Slot::Text(token)) => text
                    .seek(TextSeek::Absolute(token))
                    .map(|_| ())
                    .map_err(|e| fail("seek succeeds", format!("error: {e}"))),
                _ => Err(fail(
                    "a token for this layer",
                    "slot holds a token from the other layer",
                )),
            }
        }
        Step::SeekStart => match driver {
            Driver::Bytes(buffer) => buffer
                .seek(SeekFrom::Start(0))
                .map(|_| ())
                .map_err(|e| fail("seek succeeds", format!("error: {e}"))),
            Driver::Text(text) => text
                .seek(TextSeek::Absolute(TextPosition::START))
                .map(|_| ())
                .map_err(|e| fail("seek succeeds", format!("error: {e}"))),
        },
        Step::SeekEnd => match driver {
            Driver::Bytes(buffer) => buffer
                .seek(SeekFrom::End(0))
                .map(|_| ())
                .map_err(|e| fail("seek succeeds", format!("error: {e}"))),
            Driver::Text(text) => text
                .seek(TextSeek::End)
                .map(|_| ())
                .map_err(|e| fail("seek succeeds", format!("error: {e}"))),
        },
        Step::ExpectEof => match driver {
            Driver::Bytes(buffer) => match buffer.read(Some(1)) {
                Ok(ReadOutcome::Eof) => Ok(()),
                Ok(ReadOutcome::Bytes(got)) => Err(fail("eof", format!("{got:?}"))),
                Ok(ReadOutcome::WouldBlock) => Err(fail("eof", "would_block")),
                Err(e) => Err(fail("eof", format!("error: {e}"))),
            },
            Driver::Text(text) => match text.read(Some(1)) {
                Ok(got) if got.is_empty() => Ok(()),
                Ok(got) => Err(fail("eof", format!("{got:?}"))),
                Err(e) => Err(fail("eof", format!("error: {e}"))),
            },
        },
        Step::ExpectContents { data } => {
            let buffer = match driver {
                Driver::Bytes(buffer) => {
                    buffer
                        .flush()
                        .map_err(|e| fail("flush succeeds", format!("error: {e}")))?;
                    &*buffer
                }
                Driver::Text(text) => {
                    text.flush()
                        .map_err(|e| fail("flush succeeds", format!("error: {e}")))?;
                    text.byte_stream()
                        .ok_or_else(|| fail("an attached byte layer", "stream was detached"))?
                }
            };
            let got = drain_contents(buffer)?;
            if got == *data {
                Ok(())
            } else {
                Err(fail(format!("{data:?}"), format!("{got:?}")))
            }
        }
        Step::ExpectNewlines { seen } => {
            let text = require_text(driver)?;
            let Some(counts) = text.newlines_seen() else {
                return Err(fail(
                    "a terminator-tracking text stream",
                    "newline mode does not track terminators",
                ));
            };
            let mut got: Vec<&str> = Vec::new();
            if counts.lf {
                got.push("lf");
            }
            if counts.cr {
                got.push("cr");
            }
            if counts.crlf {
                got.push("crlf");
            }
            let mut want: Vec<&str> = seen.iter().map(String::as_str).collect();
            got.sort_unstable();
            want.sort_unstable();
            if got == want {
                Ok(())
            } else {
                Err(fail(format!("{want:?}"), format!("{got:?}")))
            }
        }
        Step::ExpectReadError { kind } => {
            let text = require_text(driver)?;
            match text.read(None) {
                Err(e) if error_kind(&e) == kind => Ok(()),
                Err(e) => Err(fail(
                    format!("a {kind} error"),
                    format!("a {} error: {e}", error_kind(&e)),
                )),
                Ok(got) => Err(fail(format!("a {kind} error"), format!("read succeeded: {got:?}"))),
            }
        }
    }
}

fn require_text(
    driver: &mut Driver,
) -> Result<&mut TextStream<BufferedRandom<MemoryStream>>, StepError> {
    match driver {
        Driver::Text(text) => Ok(text),
        Driver::Bytes(_) => Err(fail("a text-layer scenario", "scenario has no text block")),
    }
}

/// Read the raw stream's full contents, then put the position back.
fn drain_contents(buffer: &BufferedRandom<MemoryStream>) -> Result<Vec<u8>, StepError> {
    let here = buffer
        .tell()
        .map_err(|e| fail("tell succeeds", format!("error: {e}")))?;
    buffer
        .seek(SeekFrom::Start(0))
        .map_err(|e| fail("seek succeeds", format!("error: {e}")))?;
    let got = match buffer.read(None) {
        Ok(ReadOutcome::Bytes(bytes)) => bytes,
        Ok(ReadOutcome::Eof) => Vec::new(),
        Ok(ReadOutcome::WouldBlock) => return Err(fail("contents", "would_block")),
        Err(e) => return Err(fail("contents", format!("error: {e}"))),
    };
    buffer
        .seek(SeekFrom::Start(here))
        .map_err(|e| fail("seek succeeds", format!("error: {e}")))?;
    Ok(got)
}
