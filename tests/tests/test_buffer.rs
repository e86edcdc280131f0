// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use knot_core::buffer::{Reader, Writer};
use knot_core::codec;
use knot_core::error::Error;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_var_i32_sizes() {
    let mut writer = Writer::default();
    assert_eq!(writer.write_var_i32(0, false).unwrap(), 1);
    assert_eq!(writer.write_var_i32(-64, false).unwrap(), 1);
    assert_eq!(writer.write_var_i32(64, false).unwrap(), 2);
    assert_eq!(writer.write_var_i32(-65, false).unwrap(), 2);
    assert_eq!(writer.write_var_i32(127, true).unwrap(), 1);
    assert_eq!(writer.write_var_i32(-1, true).unwrap(), 5);
    assert_eq!(writer.write_var_i32(i32::MIN, false).unwrap(), 5);
    assert_eq!(writer.len(), 17);

    let mut reader = Reader::new(writer.as_slice());
    assert_eq!(reader.read_var_i32(false).unwrap(), 0);
    assert_eq!(reader.read_var_i32(false).unwrap(), -64);
    assert_eq!(reader.read_var_i32(false).unwrap(), 64);
    assert_eq!(reader.read_var_i32(false).unwrap(), -65);
    assert_eq!(reader.read_var_i32(true).unwrap(), 127);
    assert_eq!(reader.read_var_i32(true).unwrap(), -1);
    assert_eq!(reader.read_var_i32(false).unwrap(), i32::MIN);
    assert_eq!(reader.remaining(), 0);
}

#[test]
fn test_boundary_values() {
    let values = [
        0,
        63,
        -63,
        64,
        -64,
        8191,
        8192,
        -8192,
        -8193,
        i32::MAX,
        i32::MIN,
    ];
    for optimize_positive in [true, false] {
        let mut writer = Writer::default();
        for value in values {
            let written = writer.write_var_i32(value, optimize_positive).unwrap();
            assert_eq!(written, codec::var_i32_size(value, optimize_positive));
            let wide = writer.write_var_i64(value as i64, optimize_positive).unwrap();
            assert_eq!(wide, codec::var_i64_size(value as i64, optimize_positive));
        }
        let mut reader = Reader::new(writer.as_slice());
        for value in values {
            assert_eq!(reader.read_var_i32(optimize_positive).unwrap(), value);
            assert_eq!(reader.read_var_i64(optimize_positive).unwrap(), value as i64);
        }
    }
}

#[test]
fn test_var_u64_ninth_byte_is_full() {
    let mut writer = Writer::default();
    assert_eq!(writer.write_var_u64((1 << 56) - 1).unwrap(), 8);
    assert_eq!(writer.write_var_u64(1 << 56).unwrap(), 9);
    assert_eq!(writer.write_var_u64(u64::MAX).unwrap(), 9);
    assert_eq!(writer.write_var_i64(i64::MIN, false).unwrap(), 9);

    let mut reader = Reader::new(writer.as_slice());
    assert_eq!(reader.read_var_u64().unwrap(), (1 << 56) - 1);
    assert_eq!(reader.read_var_u64().unwrap(), 1 << 56);
    assert_eq!(reader.read_var_u64().unwrap(), u64::MAX);
    assert_eq!(reader.read_var_i64(false).unwrap(), i64::MIN);
}

#[test]
fn test_random_varints() {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let values: Vec<(i32, i64)> = (0..1000).map(|_| (rng.gen(), rng.gen())).collect();

    let mut writer = Writer::default();
    for (small, large) in &values {
        writer.write_var_i32(*small, false).unwrap();
        writer.write_var_i64(*large, true).unwrap();
    }
    let mut reader = Reader::new(writer.as_slice());
    for (small, large) in &values {
        assert_eq!(reader.read_var_i32(false).unwrap(), *small);
        assert_eq!(reader.read_var_i64(true).unwrap(), *large);
    }
}

#[test]
fn test_string_encodings() {
    let mut writer = Writer::default();
    assert_eq!(writer.write_string(None).unwrap(), 1);
    assert_eq!(writer.write_str("").unwrap(), 1);
    assert_eq!(writer.write_str("hello").unwrap(), 6);
    // é is one UTF-16 unit in two bytes
    assert_eq!(writer.write_str("héllo").unwrap(), 7);
    // a surrogate pair is two units of three bytes each
    assert_eq!(writer.write_str("😀").unwrap(), 7);
    writer.write_str("日本語").unwrap();
    assert_eq!(writer.as_slice()[0], 0);
    assert_eq!(writer.as_slice()[1], 1);

    let mut reader = Reader::new(writer.as_slice());
    assert_eq!(reader.read_string().unwrap(), None);
    assert_eq!(reader.read_str().unwrap(), "");
    assert_eq!(reader.read_str().unwrap(), "hello");
    assert_eq!(reader.read_str().unwrap(), "héllo");
    assert_eq!(reader.read_str().unwrap(), "😀");
    assert_eq!(reader.read_str().unwrap(), "日本語");
}

#[test]
fn test_variable_floats() {
    let mut writer = Writer::default();
    let short = writer.write_var_f32(1.5, 1000.0, true).unwrap();
    assert!(short < 4);
    // not exact at this precision, falls back to the IEEE-754 bytes
    assert_eq!(writer.write_var_f32(0.123_456_7, 10.0, true).unwrap(), 5);
    writer.write_var_f64(-2.25, 100.0, false).unwrap();
    assert_eq!(writer.write_var_f64(f64::NAN, 100.0, false).unwrap(), 9);

    let mut reader = Reader::new(writer.as_slice());
    assert_eq!(reader.read_var_f32(1000.0, true).unwrap(), 1.5);
    assert_eq!(reader.read_var_f32(10.0, true).unwrap(), 0.123_456_7);
    assert_eq!(reader.read_var_f64(100.0, false).unwrap(), -2.25);
    assert!(reader.read_var_f64(100.0, false).unwrap().is_nan());
}

#[test]
fn test_underflow_and_overflow() {
    let mut reader = Reader::new(&[0x80, 0x80]);
    assert!(matches!(
        reader.read_var_u32(),
        Err(Error::BufferUnderflow { .. })
    ));

    let mut writer = Writer::bounded(4);
    writer.write_var_u32(u32::MAX >> 4).unwrap();
    assert!(matches!(
        writer.write_u8(1),
        Err(Error::BufferOverflow { .. })
    ));
}

#[test]
fn test_reader_marks() {
    let mut writer = Writer::default();
    writer.write_var_u32(300).unwrap();
    writer.write_str("abc").unwrap();

    let mut reader = Reader::new(writer.as_slice());
    reader.mark();
    assert_eq!(reader.read_var_u32().unwrap(), 300);
    reader.position_to_mark().unwrap();
    assert_eq!(reader.read_var_u32().unwrap(), 300);
    assert!(matches!(reader.position_to_mark(), Err(Error::MarkMisuse(_))));
    assert_eq!(reader.read_str().unwrap(), "abc");
}

#[test]
fn test_length_prefix() {
    let mut writer = Writer::default();
    let prefix = writer.begin_length_prefix().unwrap();
    writer.write_str("payload").unwrap();
    assert_eq!(writer.end_length_prefix(prefix).unwrap(), 8);
    assert_eq!(&writer.as_slice()[..4], &8u32.to_le_bytes());
}

#[test]
fn test_stream_round_trip() {
    let sink = SharedSink::default();
    let mut writer = Writer::with_sink(sink.clone(), 16);
    for i in 0..100 {
        writer.write_var_i32(i * 1000, false).unwrap();
    }
    writer.write_str("a string longer than the staging buffer").unwrap();
    writer.close().unwrap();
    let bytes = sink.0.lock().unwrap().clone();

    let mut reader = Reader::from_source(Cursor::new(bytes), 16);
    for i in 0..100 {
        assert_eq!(reader.read_var_i32(false).unwrap(), i * 1000);
    }
    assert_eq!(
        reader.read_str().unwrap(),
        "a string longer than the staging buffer"
    );
    assert!(reader.read_u8().is_err());
}

#[test]
fn test_chunked_round_trip() {
    let sink = SharedSink::default();
    let mut writer = Writer::chunked(sink.clone(), 16);
    for i in 0..40u32 {
        writer.write_var_u32(i).unwrap();
        writer.write_str("chunk").unwrap();
    }
    writer.end_chunks().unwrap();
    writer.write_str("next").unwrap();
    writer.end_chunks().unwrap();
    let bytes = sink.0.lock().unwrap().clone();

    let mut reader = Reader::chunked(Cursor::new(bytes), 16);
    for i in 0..40u32 {
        assert_eq!(reader.read_var_u32().unwrap(), i);
        assert_eq!(reader.read_str().unwrap(), "chunk");
    }
    assert!(matches!(reader.read_u8(), Err(Error::BufferUnderflow { .. })));
    reader.next_chunks().unwrap();
    assert_eq!(reader.read_str().unwrap(), "next");
}
