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

use super::{Mark, MIN_STREAM_BUFFER_SIZE};
use crate::codec::{self, MAX_VAR_INT_SIZE, MAX_VAR_LONG_SIZE, NULL_STRING_LENGTH};
use crate::error::Error;
use byteorder::{ByteOrder, LittleEndian};
use std::io::{ErrorKind, Read};

macro_rules! read_fixed {
    ($($name:ident -> $ty:ty => $method:ident;)*) => {
        $(
            #[inline(always)]
            pub fn $name(&mut self) -> Result<$ty, Error> {
                const SIZE: usize = std::mem::size_of::<$ty>();
                self.require(SIZE)?;
                let value = LittleEndian::$method(&self.bf[self.cursor..self.cursor + SIZE]);
                self.cursor += SIZE;
                Ok(value)
            }
        )*
    };
}

#[derive(Default)]
struct ChunkState {
    remaining: usize,
    ended: bool,
}

/// Input buffer over a byte slice or a pull source.
///
/// Only `bf[cursor..limit]` is readable. Source-backed readers refill when a read
/// runs past `limit`, discarding consumed bytes first unless a mark still
/// points at them.
pub struct Reader {
    bf: Vec<u8>,
    cursor: usize,
    limit: usize,
    source: Option<Box<dyn Read + Send>>,
    chunks: Option<ChunkState>,
    fill_size: usize,
    marks: Vec<Mark>,
    segment: usize,
    consumed: u64,
}

impl Default for Reader {
    fn default() -> Self {
        Reader::from_vec(Vec::new())
    }
}

impl Reader {
    pub fn new(bf: &[u8]) -> Reader {
        Reader::from_vec(bf.to_vec())
    }

    pub fn from_vec(bf: Vec<u8>) -> Reader {
        Reader {
            limit: bf.len(),
            bf,
            cursor: 0,
            source: None,
            chunks: None,
            fill_size: 0,
            marks: Vec::new(),
            segment: 0,
            consumed: 0,
        }
    }

    /// Reader that pulls up to `buffer_size` bytes at a time from `source`.
    pub fn from_source<R: Read + Send + 'static>(source: R, buffer_size: usize) -> Reader {
        let mut reader = Reader::from_vec(Vec::with_capacity(buffer_size));
        reader.source = Some(Box::new(source));
        reader.fill_size = buffer_size.max(MIN_STREAM_BUFFER_SIZE);
        reader
    }

    /// Reader over `(varint length, bytes)* 0` framing. The terminator reads as
    /// end of input until [`Reader::next_chunks`] moves on to the next set.
    pub fn chunked<R: Read + Send + 'static>(source: R, buffer_size: usize) -> Reader {
        let mut reader = Reader::from_source(source, buffer_size);
        reader.chunks = Some(ChunkState::default());
        reader
    }

    /// Replaces the content with a copy of `bf`, keeping the allocation.
    pub fn init(&mut self, bf: &[u8]) {
        self.reset();
        self.bf.extend_from_slice(bf);
        self.limit = self.bf.len();
    }

    pub fn reset(&mut self) {
        self.bf.clear();
        self.cursor = 0;
        self.limit = 0;
        self.source = None;
        self.chunks = None;
        self.marks.clear();
        self.consumed = 0;
    }

    /// Read position inside the current segment.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes consumed since creation, discarded segments included.
    pub fn total(&self) -> u64 {
        self.consumed + self.cursor as u64
    }

    /// Bytes buffered and not yet read.
    pub fn remaining(&self) -> usize {
        self.limit - self.cursor
    }

    /// Narrows the readable window of an in-memory reader to `bf[..limit]`.
    pub fn set_limit(&mut self, limit: usize) -> Result<(), Error> {
        if self.source.is_some() {
            return Err(Error::unsupported("set_limit on a source-backed reader"));
        }
        if limit < self.cursor || limit > self.bf.len() {
            return Err(Error::invalid_data(format!(
                "limit {limit} outside {}..={}",
                self.cursor,
                self.bf.len()
            )));
        }
        self.limit = limit;
        Ok(())
    }

    pub fn slice_after_cursor(&self) -> &[u8] {
        &self.bf[self.cursor..self.limit]
    }

    #[inline(always)]
    fn require(&mut self, required: usize) -> Result<(), Error> {
        if self.limit - self.cursor >= required {
            return Ok(());
        }
        self.require_slow(required)
    }

    #[cold]
    fn require_slow(&mut self, required: usize) -> Result<(), Error> {
        self.fill(required)?;
        let available = self.limit - self.cursor;
        if available >= required {
            Ok(())
        } else {
            Err(Error::buffer_underflow(self.cursor, required, available))
        }
    }

    fn fill(&mut self, required: usize) -> Result<(), Error> {
        if self.source.is_none() {
            return Ok(());
        }
        self.compact();
        while self.limit - self.cursor < required {
            let want = self.fill_size.max(required - (self.limit - self.cursor));
            let start = self.bf.len();
            self.bf.resize(start + want, 0);
            let read = self.read_source(start);
            let read = match read {
                Ok(n) => n,
                Err(e) => {
                    self.bf.truncate(start);
                    return Err(e);
                }
            };
            self.bf.truncate(start + read);
            self.limit = self.bf.len();
            if read == 0 {
                break;
            }
        }
        Ok(())
    }

    fn compact(&mut self) {
        if !self.marks.is_empty() || self.cursor == 0 {
            return;
        }
        self.bf.truncate(self.limit);
        self.bf.drain(..self.cursor);
        self.consumed += self.cursor as u64;
        self.limit -= self.cursor;
        self.cursor = 0;
        self.segment += 1;
    }

    fn read_source(&mut self, start: usize) -> Result<usize, Error> {
        let Some(source) = self.source.as_mut() else {
            return Ok(0);
        };
        let buf = &mut self.bf[start..];
        let Some(state) = self.chunks.as_mut() else {
            return read_retrying(source, buf);
        };
        if state.remaining == 0 {
            if state.ended {
                return Ok(0);
            }
            match read_chunk_length(source)? {
                None | Some(0) => {
                    state.ended = true;
                    return Ok(0);
                }
                Some(len) => state.remaining = len,
            }
        }
        let n = state.remaining.min(buf.len());
        let read = read_retrying(source, &mut buf[..n])?;
        if read == 0 {
            return Err(Error::invalid_data(format!(
                "chunk truncated with {} byte(s) missing",
                state.remaining
            )));
        }
        state.remaining -= read;
        Ok(read)
    }

    /// Discards the rest of the current chunk set and positions the reader at
    /// the start of the next one.
    pub fn next_chunks(&mut self) -> Result<(), Error> {
        if self.chunks.is_none() {
            return Err(Error::unsupported("next_chunks on a reader without chunked framing"));
        }
        if !self.marks.is_empty() {
            return Err(Error::mark_misuse("next_chunks with outstanding marks"));
        }
        self.cursor = self.limit;
        self.compact();
        loop {
            let start = self.bf.len();
            self.bf.resize(start + self.fill_size, 0);
            let read = self.read_source(start);
            self.bf.truncate(start);
            if read? == 0 {
                break;
            }
        }
        if let Some(state) = self.chunks.as_mut() {
            *state = ChunkState::default();
        }
        Ok(())
    }

    #[inline(always)]
    pub fn read_u8(&mut self) -> Result<u8, Error> {
        self.require(1)?;
        let value = self.bf[self.cursor];
        self.cursor += 1;
        Ok(value)
    }

    #[inline(always)]
    pub fn read_i8(&mut self) -> Result<i8, Error> {
        Ok(self.read_u8()? as i8)
    }

    #[inline(always)]
    pub fn read_bool(&mut self) -> Result<bool, Error> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::invalid_data(format!("invalid bool byte {other}"))),
        }
    }

    read_fixed! {
        read_u16 -> u16 => read_u16;
        read_i16 -> i16 => read_i16;
        read_u32 -> u32 => read_u32;
        read_i32 -> i32 => read_i32;
        read_u64 -> u64 => read_u64;
        read_i64 -> i64 => read_i64;
        read_f32 -> f32 => read_f32;
        read_f64 -> f64 => read_f64;
    }

    pub fn read_var_u32(&mut self) -> Result<u32, Error> {
        let mut result = 0u32;
        for group in 0..MAX_VAR_INT_SIZE {
            let byte = self.read_u8()?;
            result |= ((byte & 0x7F) as u32) << (7 * group);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(Error::malformed_varint(format!(
            "no terminating byte within {MAX_VAR_INT_SIZE} bytes before position {}",
            self.cursor
        )))
    }

    #[inline(always)]
    pub fn read_var_i32(&mut self, optimize_positive: bool) -> Result<i32, Error> {
        Ok(codec::decode_i32(self.read_var_u32()?, optimize_positive))
    }

    pub fn read_var_u64(&mut self) -> Result<u64, Error> {
        let mut result = 0u64;
        for group in 0..MAX_VAR_LONG_SIZE - 1 {
            let byte = self.read_u8()?;
            result |= ((byte & 0x7F) as u64) << (7 * group);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        // The ninth byte carries 8 payload bits and always terminates.
        let byte = self.read_u8()?;
        Ok(result | (byte as u64) << 56)
    }

    #[inline(always)]
    pub fn read_var_i64(&mut self, optimize_positive: bool) -> Result<i64, Error> {
        Ok(codec::decode_i64(self.read_var_u64()?, optimize_positive))
    }

    pub fn read_char(&mut self) -> Result<char, Error> {
        let code = self.read_var_u32()?;
        char::from_u32(code)
            .ok_or_else(|| Error::invalid_data(format!("invalid char code point 0x{code:x}")))
    }

    /// True if a complete 32-bit varint is available without running past the
    /// limit (refilling from the source first).
    pub fn can_read_var_i32(&mut self) -> Result<bool, Error> {
        self.can_read_var(MAX_VAR_INT_SIZE)
    }

    /// True if a complete 64-bit varint is available.
    pub fn can_read_var_i64(&mut self) -> Result<bool, Error> {
        self.can_read_var(MAX_VAR_LONG_SIZE)
    }

    fn can_read_var(&mut self, max_size: usize) -> Result<bool, Error> {
        if self.limit - self.cursor < max_size {
            self.fill(max_size)?;
        }
        let window = &self.bf[self.cursor..self.limit];
        if max_size == MAX_VAR_LONG_SIZE && window.len() >= MAX_VAR_LONG_SIZE {
            return Ok(true);
        }
        Ok(window.iter().take(max_size).any(|byte| byte & 0x80 == 0))
    }

    pub fn read_var_f32(&mut self, precision: f32, optimize_positive: bool) -> Result<f32, Error> {
        let raw = self.read_var_u64()?;
        if raw & 1 == 0 {
            let mapped = u32::try_from(raw >> 1)
                .map_err(|_| Error::invalid_data("fixed-point float exceeds 32 bits"))?;
            return Ok(codec::fixed_to_f32(
                codec::decode_i32(mapped, optimize_positive),
                precision,
            ));
        }
        if raw != 1 {
            return Err(Error::invalid_data(format!("invalid float flag {raw}")));
        }
        self.read_f32()
    }

    pub fn read_var_f64(&mut self, precision: f64, optimize_positive: bool) -> Result<f64, Error> {
        let raw = self.read_var_u64()?;
        if raw & 1 == 0 {
            return Ok(codec::fixed_to_f64(
                codec::decode_i64(raw >> 1, optimize_positive),
                precision,
            ));
        }
        if raw != 1 {
            return Err(Error::invalid_data(format!("invalid double flag {raw}")));
        }
        self.read_f64()
    }

    /// Reads a string written by `Writer::write_string`; `None` for the null sentinel.
    pub fn read_string(&mut self) -> Result<Option<String>, Error> {
        let prefix = self.read_var_u32()?;
        if prefix == NULL_STRING_LENGTH {
            return Ok(None);
        }
        let count = (prefix - 1) as usize;
        if self.limit - self.cursor >= count {
            let bytes = &self.bf[self.cursor..self.cursor + count];
            if bytes.is_ascii() {
                let s = std::str::from_utf8(bytes)
                    .map_err(|e| Error::invalid_data(e.to_string()))?
                    .to_owned();
                self.cursor += count;
                return Ok(Some(s));
            }
        }
        let mut units = Vec::with_capacity(count.min(self.limit - self.cursor));
        for _ in 0..count {
            units.push(self.read_utf16_unit()?);
        }
        String::from_utf16(&units)
            .map(Some)
            .map_err(|_| Error::invalid_data("string holds an unpaired surrogate"))
    }

    /// Reads a string that must not be null.
    pub fn read_str(&mut self) -> Result<String, Error> {
        self.read_string()?
            .ok_or_else(|| Error::invalid_data("unexpected null string"))
    }

    fn read_utf16_unit(&mut self) -> Result<u16, Error> {
        let b1 = self.read_u8()? as u16;
        match b1 >> 4 {
            0..=7 => Ok(b1),
            12 | 13 => {
                let b2 = self.read_u8()? as u16;
                Ok(((b1 & 0x1F) << 6) | (b2 & 0x3F))
            }
            14 => {
                let b2 = self.read_u8()? as u16;
                let b3 = self.read_u8()? as u16;
                Ok(((b1 & 0x0F) << 12) | ((b2 & 0x3F) << 6) | (b3 & 0x3F))
            }
            _ => Err(Error::invalid_data(format!(
                "invalid string lead byte 0x{b1:02x}"
            ))),
        }
    }

    /// Borrows the next `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&[u8], Error> {
        self.require(len)?;
        let start = self.cursor;
        self.cursor += len;
        Ok(&self.bf[start..self.cursor])
    }

    /// Fills `out` completely.
    pub fn read_into(&mut self, out: &mut [u8]) -> Result<(), Error> {
        self.require(out.len())?;
        out.copy_from_slice(&self.bf[self.cursor..self.cursor + out.len()]);
        self.cursor += out.len();
        Ok(())
    }

    pub fn skip(&mut self, len: usize) -> Result<(), Error> {
        self.require(len)?;
        self.cursor += len;
        Ok(())
    }

    /// Saves the current position on the mark stack. While marks are
    /// outstanding, refills keep the bytes they point at.
    pub fn mark(&mut self) -> Mark {
        let mark = Mark {
            segment: self.segment,
            offset: self.cursor,
        };
        self.marks.push(mark);
        mark
    }

    /// Pops the newest mark and moves the position back to it.
    pub fn position_to_mark(&mut self) -> Result<Mark, Error> {
        let mark = self
            .marks
            .pop()
            .ok_or_else(|| Error::mark_misuse("position_to_mark without an outstanding mark"))?;
        if mark.segment != self.segment || mark.offset > self.limit {
            return Err(Error::mark_misuse(format!(
                "mark {mark:?} is stale in segment {}",
                self.segment
            )));
        }
        self.cursor = mark.offset;
        Ok(mark)
    }

    /// Pops the newest mark without moving the position.
    pub fn release_mark(&mut self) -> Result<Mark, Error> {
        self.marks
            .pop()
            .ok_or_else(|| Error::mark_misuse("release_mark without an outstanding mark"))
    }

    pub fn outstanding_marks(&self) -> usize {
        self.marks.len()
    }
}

fn read_retrying<R: Read + ?Sized>(source: &mut R, buf: &mut [u8]) -> Result<usize, Error> {
    loop {
        match source.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::io(e)),
        }
    }
}

/// Reads a chunk header one byte at a time; `None` at a clean end of input.
fn read_chunk_length<R: Read + ?Sized>(source: &mut R) -> Result<Option<usize>, Error> {
    let mut length = 0u32;
    for group in 0..MAX_VAR_INT_SIZE {
        let mut byte = [0u8; 1];
        if read_retrying(source, &mut byte)? == 0 {
            return if group == 0 {
                Ok(None)
            } else {
                Err(Error::invalid_data("chunk header truncated"))
            };
        }
        length |= ((byte[0] & 0x7F) as u32) << (7 * group);
        if byte[0] & 0x80 == 0 {
            return Ok(Some(length as usize));
        }
    }
    Err(Error::malformed_varint("chunk header longer than 5 bytes"))
}
