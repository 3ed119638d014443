use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::Criterion;
use sluice::decode::{ChunkDecoder, Decoded, RecordFraming};

const STATUS: &str = r#"{"created_at":"Wed Aug 27 13:08:45 +0000 2008","id":114749583439036416,"text":"Tweet Button, Follow Button, and Web Intents javascript now support SSL http:\/\/t.co\/9fbA0oYy ^TS","source":"web","truncated":false,"user":{"id":6253282,"screen_name":"twitterapi","followers_count":1000000,"lang":"en"},"entities":{"hashtags":[],"urls":[{"url":"http:\/\/t.co\/9fbA0oYy","expanded_url":"https:\/\/dev.twitter.com\/blog\/rest-api-and-ssl","indices":[60,79]}]}}"#;

/// A length-delimited body of `n` statuses, re-chunked into chunks of `chunk_len` bytes.
fn stream_body(n: usize, chunk_len: usize) -> Vec<u8> {
    let mut payload = Vec::new();
    for _ in 0..n {
        payload.extend_from_slice(format!("{}\r\n{}\r\n", STATUS.len() + 2, STATUS).as_bytes());
    }
    let mut body = Vec::new();
    for chunk in payload.chunks(chunk_len) {
        body.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        body.extend_from_slice(chunk);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(b"0\r\n\r\n");
    body
}

/// Feed `body` to a fresh decoder `read_len` bytes at a time, as socket reads would.
fn decode(body: &[u8], read_len: usize) -> usize {
    let mut decoder = ChunkDecoder::new(RecordFraming::Length);
    let mut decoded = Vec::with_capacity(64);
    let mut records = 0;
    for read in body.chunks(read_len) {
        decoder.feed(read, &mut decoded).expect("well-formed body");
        records += decoded
            .drain(..)
            .filter(|item| matches!(item, Decoded::Record(_)))
            .count();
    }
    records
}

fn criterion_benchmark(c: &mut Criterion) {
    let body = stream_body(1_000, 1_000);

    let mut group = c.benchmark_group("decode 1,000 statuses");
    group.bench_function("16 KiB reads", |b| {
        b.iter(|| decode(black_box(&body), 16 * 1024))
    });
    group.bench_function("1 KiB reads", |b| b.iter(|| decode(black_box(&body), 1024)));
    group.bench_function("64 byte reads", |b| b.iter(|| decode(black_box(&body), 64)));
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
