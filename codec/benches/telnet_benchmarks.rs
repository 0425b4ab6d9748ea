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

//! Benchmarks for comtel-codec performance

use bytes::BytesMut;
use comtel_codec::{AlwaysAccept, TelnetCodec, TelnetFrame, TelnetOption, consts};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tokio_util::codec::{Decoder, Encoder};

// ============================================================================
// Encoding Benchmarks
// ============================================================================

fn bench_encode_data(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_data");

    for size in [64usize, 1024, 16384] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("plain", size), &size, |b, &size| {
            let mut codec = TelnetCodec::new();
            let data = vec![b'a'; size];
            let mut buffer = BytesMut::with_capacity(size * 2);
            b.iter(|| {
                buffer.clear();
                codec.encode(black_box(&data[..]), &mut buffer).unwrap();
            });
        });
        group.bench_with_input(BenchmarkId::new("iac_heavy", size), &size, |b, &size| {
            let mut codec = TelnetCodec::new();
            let data = vec![consts::IAC; size];
            let mut buffer = BytesMut::with_capacity(size * 2);
            b.iter(|| {
                buffer.clear();
                codec.encode(black_box(&data[..]), &mut buffer).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_encode_negotiation(c: &mut Criterion) {
    c.bench_function("encode_negotiation_frame", |b| {
        let mut codec = TelnetCodec::new();
        let mut buffer = BytesMut::with_capacity(64);
        b.iter(|| {
            buffer.clear();
            codec
                .encode(
                    black_box(TelnetFrame::Will(TelnetOption::ComPort)),
                    &mut buffer,
                )
                .unwrap();
        });
    });
}

// ============================================================================
// Decoding Benchmarks
// ============================================================================

fn bench_decode_data(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_data");

    for size in [64usize, 1024, 16384] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("plain", size), &size, |b, &size| {
            let mut codec = TelnetCodec::new();
            let data = vec![b'a'; size];
            b.iter(|| {
                let mut src = BytesMut::from(&data[..]);
                while let Some(event) = codec.decode(&mut src).unwrap() {
                    black_box(event);
                }
            });
        });
    }

    group.finish();
}

fn bench_decode_negotiation(c: &mut Criterion) {
    c.bench_function("decode_negotiation_frame", |b| {
        let mut codec = TelnetCodec::new();
        codec.register(TelnetOption::SuppressGoAhead, Box::new(AlwaysAccept));
        let wire = [consts::IAC, consts::WILL, consts::option::SGA];
        b.iter(|| {
            let mut src = BytesMut::from(&wire[..]);
            while let Some(event) = codec.decode(&mut src).unwrap() {
                black_box(event);
            }
            while let Some(reply) = codec.take_reply() {
                black_box(reply);
            }
        });
    });
}

fn bench_decode_subnegotiation(c: &mut Criterion) {
    c.bench_function("decode_comport_subnegotiation", |b| {
        let mut codec = TelnetCodec::new();
        let wire = [
            consts::IAC,
            consts::SB,
            consts::option::COM_PORT,
            101,
            0x00,
            0x00,
            0x25,
            0x80,
            consts::IAC,
            consts::SE,
        ];
        b.iter(|| {
            let mut src = BytesMut::from(&wire[..]);
            while let Some(event) = codec.decode(&mut src).unwrap() {
                black_box(event);
            }
        });
    });
}

criterion_group!(
    benches,
    bench_encode_data,
    bench_encode_negotiation,
    bench_decode_data,
    bench_decode_negotiation,
    bench_decode_subnegotiation
);
criterion_main!(benches);
