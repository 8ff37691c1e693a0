//! Text-layer decode, line-splitting, and position benchmarks.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use stratio_core::buffered::BufferedRandom;
use stratio_core::raw::MemoryStream;
use stratio_core::text::{NewlineMode, Terminator, TextConfig, TextPosition, TextSeek, TextStream};

fn text_stream(seed: Vec<u8>, newline: NewlineMode) -> TextStream<BufferedRandom<MemoryStream>> {
    let buffer = BufferedRandom::with_capacity(8192, MemoryStream::from_bytes(seed))
        .expect("memory stream opens");
    TextStream::with_config(
        buffer,
        TextConfig {
            newline,
            ..TextConfig::default()
        },
    )
}

fn ascii_seed(lines: usize) -> Vec<u8> {
    "the quick brown fox jumps over the lazy dog\n"
        .repeat(lines)
        .into_bytes()
}

fn mixed_terminator_seed(lines: usize) -> Vec<u8> {
    let mut out = String::new();
    for i in 0..lines {
        out.push_str("the quick brown fox jumps over the lazy dog");
        out.push_str(match i % 3 {
            0 => "\n",
            1 => "\r\n",
            _ => "\r",
        });
    }
    out.into_bytes()
}

fn multibyte_seed(lines: usize) -> Vec<u8> {
    "þessi lína er full af tvíbæta stöfum: áéíóúýðæö\n"
        .repeat(lines)
        .into_bytes()
}

fn bench_decode_throughput(c: &mut Criterion) {
    let inputs = [
        ("ascii", ascii_seed(1500)),
        ("multibyte", multibyte_seed(1200)),
    ];
    let mut group = c.benchmark_group("text_decode");

    for (label, seed) in inputs {
        let len = seed.len();
        let mut stream = text_stream(seed, NewlineMode::Universal);
        group.throughput(Throughput::Bytes(len as u64));

        group.bench_with_input(BenchmarkId::new("read_all", label), &len, |b, _| {
            b.iter(|| {
                stream
                    .seek(TextSeek::Absolute(TextPosition::START))
                    .expect("rewind");
                black_box(stream.read(None).expect("seed decodes"));
            });
        });
    }
    group.finish();
}

fn bench_read_line_modes(c: &mut Criterion) {
    let lines = 2000;
    let cases = [
        ("universal", mixed_terminator_seed(lines), NewlineMode::Universal),
        ("preserve", mixed_terminator_seed(lines), NewlineMode::Preserve),
        (
            "exact_crlf",
            "line ends with a pair\r\n".repeat(lines).into_bytes(),
            NewlineMode::Exact(Terminator::CrLf),
        ),
    ];
    let mut group = c.benchmark_group("read_line");

    for (label, seed, mode) in cases {
        let len = seed.len();
        let mut stream = text_stream(seed, mode);
        group.throughput(Throughput::Bytes(len as u64));

        group.bench_with_input(BenchmarkId::new("mode", label), &len, |b, _| {
            b.iter(|| {
                stream
                    .seek(TextSeek::Absolute(TextPosition::START))
                    .expect("rewind");
                let mut count = 0usize;
                loop {
                    let line = stream.read_line(None).expect("lines decode");
                    if line.is_empty() {
                        break;
                    }
                    count += 1;
                }
                black_box(count);
            });
        });
    }
    group.finish();
}

fn bench_write_translation(c: &mut Criterion) {
    let cases = [
        ("universal", NewlineMode::Universal),
        ("exact_crlf", NewlineMode::Exact(Terminator::CrLf)),
    ];
    let line = "the quick brown fox jumps over the lazy dog\n";
    let writes = 500;
    let mut group = c.benchmark_group("text_write");

    for (label, mode) in cases {
        let mut stream = text_stream(Vec::new(), mode);
        group.throughput(Throughput::Bytes((line.len() * writes) as u64));

        group.bench_with_input(BenchmarkId::new("mode", label), &writes, |b, _| {
            b.iter(|| {
                stream
                    .seek(TextSeek::Absolute(TextPosition::START))
                    .expect("rewind");
                for _ in 0..writes {
                    stream.write(line).expect("memory stream accepts writes");
                }
                stream.flush().expect("flush drains");
            });
        });
    }
    group.finish();
}

fn bench_position_replay(c: &mut Criterion) {
    let mut stream = text_stream(multibyte_seed(400), NewlineMode::Universal);
    stream.read(Some(5000)).expect("seed decodes");
    let token = stream.tell().expect("position snapshots");

    c.bench_function("seek_token_replay", |b| {
        b.iter(|| {
            stream
                .seek(TextSeek::Absolute(TextPosition::START))
                .expect("rewind");
            black_box(
                stream
                    .seek(TextSeek::Absolute(token))
                    .expect("token replays"),
            );
        });
    });
}

criterion_group!(
    benches,
    bench_decode_throughput,
    bench_read_line_modes,
    bench_write_translation,
    bench_position_replay
);
criterion_main!(benches);
