//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Benchmarks for telnetcodec performance

use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use whatmud_telnetcodec::{Negotiation, TelnetCodec, TelnetOption, consts};
use tokio_util::codec::Decoder;

// ============================================================================
// Decoding Benchmarks
// ============================================================================

fn bench_decode_data_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_data_sizes");

    for size in [64usize, 1024, 16 * 1024] {
        let input: Vec<u8> = (0..size).map(|i| b'a' + (i % 26) as u8).collect();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            let mut codec = TelnetCodec::new();
            b.iter(|| {
                let mut buffer = BytesMut::from(&input[..]);
                while let Some(event) = codec.decode(&mut buffer).unwrap() {
                    black_box(event);
                }
            });
        });
    }

    group.finish();
}

fn bench_decode_mixed_content(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_mixed_content");

    let mut input = Vec::new();
    for _ in 0..32 {
        input.extend_from_slice(b"look at the fountain\r\n");
        input.extend_from_slice(&[consts::IAC, consts::IAC]);
        input.extend_from_slice(&[consts::IAC, consts::SB, consts::option::CHARSET, 2]);
        input.extend_from_slice(b"UTF-8");
        input.extend_from_slice(&[consts::IAC, consts::SE, consts::IAC, consts::NOP]);
    }
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("session_traffic", |b| {
        let mut codec = TelnetCodec::new();
        b.iter(|| {
            let mut buffer = BytesMut::from(&input[..]);
            while let Some(event) = codec.decode(&mut buffer).unwrap() {
                black_box(event);
            }
        });
    });

    group.finish();
}

// ============================================================================
// Outbound Benchmarks
// ============================================================================

fn bench_send_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("send_text");
    let text = "You see a fountain here.\nExits: north, south.\n".repeat(16);

    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("nvt_text", |b| {
        let mut codec = TelnetCodec::new();
        b.iter(|| {
            codec.send_text(black_box(text.as_bytes()));
            black_box(codec.poll_event());
        });
    });

    group.finish();
}

fn bench_accept_negotiation(c: &mut Criterion) {
    c.bench_function("accept_negotiation", |b| {
        b.iter(|| {
            let mut codec = TelnetCodec::new();
            for entry in codec.table().clone().iter() {
                codec.negotiate(Negotiation::Will, entry.option);
            }
            codec.negotiate(Negotiation::Do, TelnetOption::SuppressGoAhead);
            while let Some(event) = codec.poll_event() {
                black_box(event);
            }
        });
    });
}

criterion_group!(
    decode_benches,
    bench_decode_data_sizes,
    bench_decode_mixed_content
);
criterion_group!(outbound_benches, bench_send_text, bench_accept_negotiation);
criterion_main!(decode_benches, outbound_benches);
