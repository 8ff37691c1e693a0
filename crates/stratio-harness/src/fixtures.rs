//! Scenario fixtures: declarative scripts run against the stream stack.
//!
//! A [`StreamScenario`] seeds an in-memory raw stream, layers a buffered
//! stream (and optionally a text stream) on top, and then replays a list of
//! [`Step`]s with inline expectations. Scenarios are plain data so they can
//! be shipped as JSON, diffed, and replayed byte-for-byte.

use serde::{Deserialize, Serialize};

use crate::structured_log::now_utc;

/// Text-layer configuration for a scenario, as fixture-friendly strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextOptions {
    /// Codec label: `utf-8`, `ascii`, or `latin-1`.
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// Undecodable-input policy: `strict`, `replace`, or `ignore`.
    #[serde(default = "default_policy")]
    pub policy: String,
    /// Newline argument: absent selects universal mode, `""` selects
    /// preserve mode, and a literal terminator selects exact mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newline: Option<String>,
    /// Bytes requested from the byte layer per decode step.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub line_buffering: bool,
    #[serde(default)]
    pub write_through: bool,
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_policy() -> String {
    "strict".to_string()
}

fn default_chunk_size() -> usize {
    8192
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            encoding: default_encoding(),
            policy: default_policy(),
            newline: None,
            chunk_size: default_chunk_size(),
            line_buffering: false,
            write_through: false,
        }
    }
}

/// One scripted operation with its inline expectation.
///
/// Byte-layer steps (`read_bytes`, `peek`, `write_bytes`, `truncate`) are
/// only valid in scenarios without a `text` block; character steps (`read`,
/// `read_line`, `write`, `expect_newlines`, `expect_read_error`) require
/// one. The rest work on either layer. `expect_contents` inspects the raw
/// stream after a flush and restores the position it found, so it is safe
/// as a final step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    ReadBytes {
        #[serde(default)]
        n: Option<usize>,
        expect: Vec<u8>,
    },
    Peek {
        n: usize,
        expect_prefix: Vec<u8>,
    },
    WriteBytes {
        data: Vec<u8>,
    },
    Truncate {
        #[serde(default)]
        at: Option<u64>,
    },
    Read {
        #[serde(default)]
        n: Option<usize>,
        expect: String,
    },
    ReadLine {
        #[serde(default)]
        limit: Option<usize>,
        expect: String,
    },
    Write {
        data: String,
    },
    Flush,
    /// Store the current position token in a numbered slot.
    Tell {
        slot: usize,
    },
    /// Seek to a previously stored position token.
    Seek {
        slot: usize,
    },
    SeekStart,
    SeekEnd,
    /// The next read must come back empty.
    ExpectEof,
    /// Flush, then the raw stream must hold exactly these bytes.
    ExpectContents {
        data: Vec<u8>,
    },
    /// The set of terminator kinds observed so far (`lf`, `cr`, `crlf`).
    ExpectNewlines {
        seen: Vec<String>,
    },
    /// The next read must fail with this error kind.
    ExpectReadError {
        kind: String,
    },
}

/// A single conformance scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamScenario {
    /// Scenario identifier.
    pub name: String,
    /// Behavior family exercised (e.g. `buffered.read`, `text.position`).
    pub contract: String,
    /// Initial raw stream contents.
    #[serde(default)]
    pub seed: Vec<u8>,
    /// Byte-layer buffer capacity.
    pub capacity: usize,
    /// Present when the scenario drives the text layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextOptions>,
    /// Scripted operations, in order.
    pub steps: Vec<Step>,
}

/// A collection of scenarios for a behavior family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSet {
    /// Schema version.
    pub version: String,
    /// Family name.
    pub family: String,
    /// UTC timestamp of materialization.
    pub captured_at: String,
    /// Individual scenarios.
    pub scenarios: Vec<StreamScenario>,
}

impl ScenarioSet {
    /// Load a scenario set from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the scenario set to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load a scenario set from a file path.
    pub fn from_file(path: &std::path::Path) -> Result<Self, crate::HarnessError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }
}

// ---------------------------------------------------------------------------
// Built-in library
// ---------------------------------------------------------------------------

fn byte_scenario(
    name: &str,
    contract: &str,
    seed: &[u8],
    capacity: usize,
    steps: Vec<Step>,
) -> StreamScenario {
    StreamScenario {
        name: name.to_string(),
        contract: contract.to_string(),
        seed: seed.to_vec(),
        capacity,
        text: None,
        steps,
    }
}

fn text_scenario(
    name: &str,
    contract: &str,
    seed: &[u8],
    capacity: usize,
    text: TextOptions,
    steps: Vec<Step>,
) -> StreamScenario {
    StreamScenario {
        name: name.to_string(),
        contract: contract.to_string(),
        seed: seed.to_vec(),
        capacity,
        text: Some(text),
        steps,
    }
}

/// The shipped scenario library covering the buffered and text layers.
#[must_use]
pub fn builtin() -> ScenarioSet {
    let scenarios = vec![
        byte_scenario(
            "read_serves_repeat_hits_from_one_fill",
            "buffered.read",
            &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
            8,
            vec![
                Step::ReadBytes {
                    n: Some(4),
                    expect: vec![0, 1, 2, 3],
                },
                Step::ReadBytes {
                    n: Some(4),
                    expect: vec![4, 5, 6, 7],
                },
                Step::ReadBytes {
                    n: None,
                    expect: vec![8, 9],
                },
                Step::ExpectEof,
            ],
        ),
        byte_scenario(
            "peek_is_not_consumption",
            "buffered.read",
            &[10, 20, 30, 40],
            4,
            vec![
                Step::Peek {
                    n: 2,
                    expect_prefix: vec![10, 20],
                },
                Step::ReadBytes {
                    n: Some(2),
                    expect: vec![10, 20],
                },
                Step::ReadBytes {
                    n: None,
                    expect: vec![30, 40],
                },
                Step::ExpectEof,
            ],
        ),
        byte_scenario(
            "writes_coalesce_until_flush",
            "buffered.write",
            &[],
            8,
            vec![
                Step::WriteBytes {
                    data: vec![1, 2, 3],
                },
                Step::WriteBytes { data: vec![4, 5] },
                Step::Flush,
                Step::ExpectContents {
                    data: vec![1, 2, 3, 4, 5],
                },
            ],
        ),
        byte_scenario(
            "overfull_write_drains_through_a_tiny_buffer",
            "buffered.write",
            &[],
            2,
            vec![
                Step::WriteBytes {
                    data: vec![1, 2, 3, 4, 5],
                },
                Step::ExpectContents {
                    data: vec![1, 2, 3, 4, 5],
                },
            ],
        ),
        byte_scenario(
            "byte_position_slots_replay",
            "buffered.seek",
            &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
            4,
            vec![
                Step::ReadBytes {
                    n: Some(3),
                    expect: vec![0, 1, 2],
                },
                Step::Tell { slot: 0 },
                Step::ReadBytes {
                    n: None,
                    expect: vec![3, 4, 5, 6, 7, 8, 9],
                },
                Step::Seek { slot: 0 },
                Step::ReadBytes {
                    n: None,
                    expect: vec![3, 4, 5, 6, 7, 8, 9],
                },
                Step::ExpectEof,
            ],
        ),
        byte_scenario(
            "truncate_discards_the_tail",
            "buffered.truncate",
            &[1, 2, 3, 4, 5],
            4,
            vec![
                Step::ReadBytes {
                    n: Some(2),
                    expect: vec![1, 2],
                },
                Step::Truncate { at: Some(3) },
                Step::ExpectContents {
                    data: vec![1, 2, 3],
                },
            ],
        ),
        byte_scenario(
            "interleaved_write_read_stays_coherent",
            "buffered.mixed",
            b"ABCD",
            4,
            vec![
                Step::ReadBytes {
                    n: Some(2),
                    expect: vec![b'A', b'B'],
                },
                Step::WriteBytes {
                    data: vec![b'X', b'Y'],
                },
                Step::ExpectContents {
                    data: vec![b'A', b'B', b'X', b'Y'],
                },
                Step::SeekStart,
                Step::ReadBytes {
                    n: None,
                    expect: vec![b'A', b'B', b'X', b'Y'],
                },
                Step::ExpectEof,
            ],
        ),
        text_scenario(
            "universal_translates_all_terminators",
            "text.newline",
            b"a\r\nb\rc\nd",
            8,
            TextOptions::default(),
            vec![
                Step::Read {
                    n: None,
                    expect: "a\nb\nc\nd".to_string(),
                },
                Step::ExpectNewlines {
                    seen: vec!["lf".to_string(), "cr".to_string(), "crlf".to_string()],
                },
            ],
        ),
        text_scenario(
            "preserve_reports_without_rewriting",
            "text.newline",
            b"a\r\nb\rc\nd",
            8,
            TextOptions {
                newline: Some(String::new()),
                ..TextOptions::default()
            },
            vec![
                Step::Read {
                    n: None,
                    expect: "a\r\nb\rc\nd".to_string(),
                },
                Step::ExpectNewlines {
                    seen: vec!["lf".to_string(), "cr".to_string(), "crlf".to_string()],
                },
            ],
        ),
        text_scenario(
            "exact_crlf_splits_only_on_crlf",
            "text.newline",
            b"x\r\ny\nz\r\n",
            8,
            TextOptions {
                newline: Some("\r\n".to_string()),
                ..TextOptions::default()
            },
            vec![
                Step::ReadLine {
                    limit: None,
                    expect: "x\r\n".to_string(),
                },
                Step::ReadLine {
                    limit: None,
                    expect: "y\nz\r\n".to_string(),
                },
                Step::ExpectEof,
            ],
        ),
        text_scenario(
            "crlf_straddling_chunks_is_one_terminator",
            "text.newline",
            b"a\r\nb",
            8,
            TextOptions {
                chunk_size: 1,
                ..TextOptions::default()
            },
            vec![
                Step::Read {
                    n: Some(3),
                    expect: "a\nb".to_string(),
                },
                Step::ExpectNewlines {
                    seen: vec!["crlf".to_string()],
                },
                Step::ExpectEof,
            ],
        ),
        text_scenario(
            "exact_crlf_write_rewrites_lf",
            "text.write",
            &[],
            8,
            TextOptions {
                newline: Some("\r\n".to_string()),
                ..TextOptions::default()
            },
            vec![
                Step::Write {
                    data: "a\nb\n".to_string(),
                },
                Step::Flush,
                Step::ExpectContents {
                    data: b"a\r\nb\r\n".to_vec(),
                },
            ],
        ),
        text_scenario(
            "position_tokens_replay_multibyte_text",
            "text.position",
            "\u{e9}1\u{e9}2".as_bytes(),
            4,
            TextOptions {
                chunk_size: 1,
                ..TextOptions::default()
            },
            vec![
                Step::Read {
                    n: Some(2),
                    expect: "\u{e9}1".to_string(),
                },
                Step::Tell { slot: 0 },
                Step::Read {
                    n: None,
                    expect: "\u{e9}2".to_string(),
                },
                Step::Seek { slot: 0 },
                Step::Read {
                    n: None,
                    expect: "\u{e9}2".to_string(),
                },
                Step::ExpectEof,
            ],
        ),
        text_scenario(
            "line_limit_caps_consumption",
            "text.read",
            b"abcdef\n",
            8,
            TextOptions::default(),
            vec![
                Step::ReadLine {
                    limit: Some(3),
                    expect: "abc".to_string(),
                },
                Step::ReadLine {
                    limit: None,
                    expect: "def\n".to_string(),
                },
                Step::ExpectEof,
            ],
        ),
        text_scenario(
            "strict_policy_rejects_invalid_utf8",
            "text.codec",
            &[0x61, 0xFF, 0x62],
            8,
            TextOptions::default(),
            vec![Step::ExpectReadError {
                kind: "decode".to_string(),
            }],
        ),
        text_scenario(
            "replace_policy_substitutes_invalid_utf8",
            "text.codec",
            &[0x61, 0xFF, 0x62],
            8,
            TextOptions {
                policy: "replace".to_string(),
                ..TextOptions::default()
            },
            vec![Step::Read {
                n: None,
                expect: "a\u{FFFD}b".to_string(),
            }],
        ),
        text_scenario(
            "latin1_maps_every_byte",
            "text.codec",
            &[0x61, 0xE9, 0x62],
            8,
            TextOptions {
                encoding: "latin-1".to_string(),
                ..TextOptions::default()
            },
            vec![Step::Read {
                n: None,
                expect: "a\u{e9}b".to_string(),
            }],
        ),
    ];

    ScenarioSet {
        version: "v1".to_string(),
        family: "stream-stack".to_string(),
        captured_at: now_utc(),
        scenarios,
    }
}
