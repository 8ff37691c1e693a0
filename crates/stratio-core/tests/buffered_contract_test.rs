use std::fs;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use stratio_core::buffered::{BufferedRandom, BufferedReader, BufferedWriter, ReadOutcome};
use stratio_core::error::StreamResult;
use stratio_core::raw::{MemoryStream, RawRead, RawStream, RawWrite};

/// Raw transfer counters shared with the harnessed stream.
#[derive(Default)]
struct Stats {
    reads: usize,
    writes: usize,
    bytes_written: Vec<u8>,
}

/// Memory-backed raw stream that counts every raw transfer.
struct CountingRaw {
    mem: MemoryStream,
    stats: Arc<Mutex<Stats>>,
}

impl CountingRaw {
    fn new(data: Vec<u8>) -> (Self, Arc<Mutex<Stats>>) {
        let stats = Arc::new(Mutex::new(Stats::default()));
        (
            Self {
                mem: MemoryStream::from_bytes(data),
                stats: Arc::clone(&stats),
            },
            stats,
        )
    }
}

impl RawStream for CountingRaw {
    fn read(&mut self, max: usize) -> StreamResult<RawRead> {
        self.stats.lock().unwrap().reads += 1;
        self.mem.read(max)
    }

    fn readall(&mut self) -> StreamResult<RawRead> {
        self.stats.lock().unwrap().reads += 1;
        self.mem.readall()
    }

    fn has_readall(&self) -> bool {
        true
    }

    fn write(&mut self, data: &[u8]) -> StreamResult<RawWrite> {
        let outcome = self.mem.write(data)?;
        let mut stats = self.stats.lock().unwrap();
        stats.writes += 1;
        if let RawWrite::Accepted(n) = outcome {
            stats.bytes_written.extend_from_slice(&data[..n]);
        }
        Ok(outcome)
    }

    fn seek(&mut self, pos: SeekFrom) -> StreamResult<u64> {
        self.mem.seek(pos)
    }

    fn readable(&self) -> bool {
        true
    }

    fn writable(&self) -> bool {
        true
    }

    fn seekable(&self) -> bool {
        true
    }
}

fn workspace_root() -> PathBuf {
    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest.parent().unwrap().parent().unwrap().to_path_buf()
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn write_evidence(root: &PathBuf, stem: &str, log_lines: &[String], mismatches: &[String]) {
    let out_dir = root.join("target/conformance");
    fs::create_dir_all(&out_dir).expect("create target/conformance");
    let log_path = out_dir.join(format!("{stem}.log.jsonl"));
    let report_path = out_dir.join(format!("{stem}.report.json"));

    fs::write(&log_path, format!("{}\n", log_lines.join("\n"))).expect("write jsonl log");

    let total = log_lines.len();
    let report = format!(
        concat!(
            "{{\n",
            "  \"ok\": {},\n",
            "  \"total_cases\": {},\n",
            "  \"passed_cases\": {},\n",
            "  \"failed_cases\": {},\n",
            "  \"log_jsonl\": \"{}\",\n",
            "  \"mismatches\": [\n{}\n  ]\n",
            "}}\n"
        ),
        mismatches.is_empty(),
        total,
        total - mismatches.len(),
        mismatches.len(),
        log_path
            .strip_prefix(root)
            .unwrap_or(&log_path)
            .to_string_lossy(),
        mismatches
            .iter()
            .map(|m| format!("    \"{}\"", m.replace('"', "\\\"")))
            .collect::<Vec<_>>()
            .join(",\n")
    );
    fs::write(&report_path, report).expect("write report json");
}

// ---------------------------------------------------------------------------
// Read-side transfer matrix
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
struct ReadCase {
    name: &'static str,
    capacity: usize,
    payload_len: usize,
    /// Raw read calls for draining byte by byte: one refill per capacity
    /// span, plus the final end-of-data probe.
    expected_raw_reads: usize,
}

fn read_cases() -> Vec<ReadCase> {
    vec![
        ReadCase {
            name: "below_capacity",
            capacity: 8,
            payload_len: 7,
            expected_raw_reads: 2,
        },
        ReadCase {
            name: "exactly_capacity",
            capacity: 8,
            payload_len: 8,
            expected_raw_reads: 2,
        },
        ReadCase {
            name: "one_over_capacity",
            capacity: 8,
            payload_len: 9,
            expected_raw_reads: 3,
        },
        ReadCase {
            name: "degenerate_capacity",
            capacity: 1,
            payload_len: 3,
            expected_raw_reads: 4,
        },
        ReadCase {
            name: "small_payload_large_buffer",
            capacity: 4096,
            payload_len: 11,
            expected_raw_reads: 2,
        },
        ReadCase {
            name: "many_spans",
            capacity: 16,
            payload_len: 100,
            expected_raw_reads: 8,
        },
    ]
}

#[test]
fn single_byte_reads_amortize_raw_transfers() {
    let root = workspace_root();
    let mut log_lines = Vec::new();
    let mut mismatches = Vec::new();

    for case in read_cases() {
        let payload = pattern(case.payload_len);
        let (raw, stats) = CountingRaw::new(payload.clone());
        let reader = BufferedReader::with_capacity(case.capacity, raw).unwrap();

        let t0 = Instant::now();
        let mut drained = Vec::new();
        loop {
            match reader.read(Some(1)).unwrap() {
                ReadOutcome::Bytes(chunk) => drained.extend_from_slice(&chunk),
                ReadOutcome::Eof => break,
                ReadOutcome::WouldBlock => unreachable!("memory streams never stall"),
            }
        }
        let timing_ns = t0.elapsed().as_nanos();

        let raw_reads = stats.lock().unwrap().reads;
        let ok = drained == payload && raw_reads == case.expected_raw_reads;
        if !ok {
            mismatches.push(format!(
                "{}: expected(intact=true, raw_reads={}) got(intact={}, raw_reads={})",
                case.name,
                case.expected_raw_reads,
                drained == payload,
                raw_reads
            ));
        }

        log_lines.push(format!(
            "{{\"trace_id\":\"buffered-read-matrix:{}\",\"capacity\":{},\"payload_len\":{},\"raw_reads\":{},\"expected_raw_reads\":{},\"timing_ns\":{},\"status\":\"{}\"}}",
            case.name,
            case.capacity,
            case.payload_len,
            raw_reads,
            case.expected_raw_reads,
            timing_ns,
            if ok { "ok" } else { "mismatch" }
        ));
    }

    write_evidence(&root, "buffered_read_matrix", &log_lines, &mismatches);
    assert!(
        mismatches.is_empty(),
        "read transfer matrix mismatch(es): {:?}",
        mismatches
    );
}

// ---------------------------------------------------------------------------
// Write-side coalescing matrix
// ---------------------------------------------------------------------------

struct WriteCase {
    name: &'static str,
    capacity: usize,
    write_sizes: &'static [usize],
    /// Raw writes forced while the writes were submitted (buffer passed
    /// capacity), before the explicit flush.
    expected_raw_writes_before_flush: usize,
    expected_total_raw_writes: usize,
}

fn write_cases() -> Vec<WriteCase> {
    vec![
        WriteCase {
            name: "held_below_capacity",
            capacity: 8,
            write_sizes: &[7],
            expected_raw_writes_before_flush: 0,
            expected_total_raw_writes: 1,
        },
        WriteCase {
            name: "held_at_capacity",
            capacity: 8,
            write_sizes: &[8],
            expected_raw_writes_before_flush: 0,
            expected_total_raw_writes: 1,
        },
        WriteCase {
            name: "one_over_pushes_down",
            capacity: 8,
            write_sizes: &[9],
            expected_raw_writes_before_flush: 1,
            expected_total_raw_writes: 1,
        },
        WriteCase {
            name: "coalesces_three_small_writes",
            capacity: 8,
            write_sizes: &[3, 3, 3],
            expected_raw_writes_before_flush: 1,
            expected_total_raw_writes: 1,
        },
        WriteCase {
            name: "two_small_writes_one_transfer",
            capacity: 8,
            write_sizes: &[3, 3],
            expected_raw_writes_before_flush: 0,
            expected_total_raw_writes: 1,
        },
        WriteCase {
            name: "every_write_overflows",
            capacity: 2,
            write_sizes: &[3, 3],
            expected_raw_writes_before_flush: 2,
            expected_total_raw_writes: 2,
        },
        WriteCase {
            name: "hello_world_sized",
            capacity: 4096,
            write_sizes: &[11],
            expected_raw_writes_before_flush: 0,
            expected_total_raw_writes: 1,
        },
    ]
}

#[test]
fn coalesced_writes_reach_raw_intact_and_batched() {
    let root = workspace_root();
    let mut log_lines = Vec::new();
    let mut mismatches = Vec::new();

    for case in write_cases() {
        let total_len: usize = case.write_sizes.iter().sum();
        let payload = pattern(total_len);
        let (raw, stats) = CountingRaw::new(Vec::new());
        let writer = BufferedWriter::with_capacity(case.capacity, raw).unwrap();

        let t0 = Instant::now();
        let mut offset = 0usize;
        for &size in case.write_sizes {
            let accepted = writer.write(&payload[offset..offset + size]).unwrap();
            assert_eq!(accepted, size);
            offset += size;
        }
        let before_flush = stats.lock().unwrap().writes;
        writer.flush().unwrap();
        writer.close().unwrap();
        let timing_ns = t0.elapsed().as_nanos();

        let (total_writes, intact) = {
            let stats = stats.lock().unwrap();
            (stats.writes, stats.bytes_written == payload)
        };
        let ok = intact
            && before_flush == case.expected_raw_writes_before_flush
            && total_writes == case.expected_total_raw_writes;
        if !ok {
            mismatches.push(format!(
                "{}: expected(intact=true, before_flush={}, total={}) got(intact={}, before_flush={}, total={})",
                case.name,
                case.expected_raw_writes_before_flush,
                case.expected_total_raw_writes,
                intact,
                before_flush,
                total_writes
            ));
        }

        log_lines.push(format!(
            "{{\"trace_id\":\"buffered-write-matrix:{}\",\"capacity\":{},\"total_len\":{},\"raw_writes_before_flush\":{},\"raw_writes_total\":{},\"timing_ns\":{},\"status\":\"{}\"}}",
            case.name,
            case.capacity,
            total_len,
            before_flush,
            total_writes,
            timing_ns,
            if ok { "ok" } else { "mismatch" }
        ));
    }

    write_evidence(&root, "buffered_write_matrix", &log_lines, &mismatches);
    assert!(
        mismatches.is_empty(),
        "write coalescing matrix mismatch(es): {:?}",
        mismatches
    );
}

// ---------------------------------------------------------------------------
// Positioning stability
// ---------------------------------------------------------------------------

#[test]
fn peek_does_not_consume_and_seek_to_tell_is_stable() {
    let payload = pattern(64);
    let (raw, stats) = CountingRaw::new(payload.clone());
    let stream = BufferedRandom::with_capacity(16, raw).unwrap();

    let first = stream.peek(4).unwrap();
    let second = stream.peek(4).unwrap();
    assert_eq!(first[..4], second[..4]);
    // Both peeks are served by the same single raw transfer.
    assert_eq!(stats.lock().unwrap().reads, 1);

    let ReadOutcome::Bytes(head) = stream.read(Some(4)).unwrap() else {
        panic!("payload has data");
    };
    assert_eq!(head, payload[..4]);

    let here = stream.tell().unwrap();
    let ReadOutcome::Bytes(next) = stream.read(Some(8)).unwrap() else {
        panic!("payload has data");
    };
    stream.seek(SeekFrom::Start(here)).unwrap();
    let ReadOutcome::Bytes(again) = stream.read(Some(8)).unwrap() else {
        panic!("payload has data");
    };
    assert_eq!(next, again);
    assert_eq!(stream.tell().unwrap(), here + 8);
}
