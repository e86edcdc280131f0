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

use super::{Mark, LENGTH_PREFIX_SIZE, MIN_STREAM_BUFFER_SIZE};
use crate::codec::{self, MAX_VAR_INT_SIZE, MAX_VAR_LONG_SIZE, NULL_STRING_LENGTH};
use crate::error::Error;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::Write;

const DEFAULT_INITIAL_CAPACITY: usize = 32;

macro_rules! write_fixed {
    ($($name:ident($ty:ty) => $method:ident;)*) => {
        $(
            #[inline(always)]
            pub fn $name(&mut self, value: $ty) -> Result<(), Error> {
                self.require(std::mem::size_of::<$ty>())?;
                self.bf.$method::<LittleEndian>(value)?;
                Ok(())
            }
        )*
    };
}

/// Output buffer.
///
/// The buffered bytes live in `bf`; `capacity` is the logical size that a write
/// may fill before the buffer has to grow, flush, or fail.
pub struct Writer {
    bf: Vec<u8>,
    capacity: usize,
    max_capacity: Option<usize>,
    sink: Option<Box<dyn Write + Send>>,
    chunked: bool,
    chunk_open: bool,
    closed: bool,
    marks: Vec<Mark>,
    segment: usize,
    flushed: u64,
}

impl Default for Writer {
    fn default() -> Self {
        Writer::with_capacity(DEFAULT_INITIAL_CAPACITY, None)
    }
}

impl Writer {
    /// Growable buffer. With `max_capacity` set, growing past it is an overflow.
    pub fn with_capacity(initial: usize, max_capacity: Option<usize>) -> Writer {
        let capacity = max_capacity.map_or(initial, |max| initial.min(max));
        Writer {
            bf: Vec::with_capacity(capacity),
            capacity,
            max_capacity,
            sink: None,
            chunked: false,
            chunk_open: false,
            closed: false,
            marks: Vec::new(),
            segment: 0,
            flushed: 0,
        }
    }

    /// Fixed-size buffer: the `capacity + 1`-th byte overflows.
    pub fn bounded(capacity: usize) -> Writer {
        Writer::with_capacity(capacity, Some(capacity))
    }

    /// Buffer that pushes its content to `sink` whenever `buffer_size` bytes are pending.
    pub fn with_sink<W: Write + Send + 'static>(sink: W, buffer_size: usize) -> Writer {
        let mut writer = Writer::with_capacity(buffer_size.max(MIN_STREAM_BUFFER_SIZE), None);
        writer.sink = Some(Box::new(sink));
        writer
    }

    /// Sink-backed buffer that frames every flush as `varint(length) bytes`.
    /// [`Writer::end_chunks`] terminates a chunk set with `0`.
    pub fn chunked<W: Write + Send + 'static>(sink: W, chunk_size: usize) -> Writer {
        let mut writer = Writer::with_sink(sink, chunk_size);
        writer.chunked = true;
        writer
    }

    /// Clears buffered bytes and marks, keeping the allocation.
    pub fn reset(&mut self) {
        self.bf.clear();
        self.marks.clear();
        self.chunk_open = false;
        self.closed = false;
        self.flushed = 0;
    }

    pub fn dump(&self) -> Vec<u8> {
        self.bf.clone()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.bf
    }

    /// Bytes currently buffered.
    pub fn len(&self) -> usize {
        self.bf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bf.is_empty()
    }

    /// Write position inside the current segment.
    pub fn position(&self) -> usize {
        self.bf.len()
    }

    /// Bytes written since creation or the last reset, flushed ones included.
    pub fn total(&self) -> u64 {
        self.flushed + self.bf.len() as u64
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_capacity(&self) -> Option<usize> {
        self.max_capacity
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    #[inline(always)]
    fn require(&mut self, required: usize) -> Result<(), Error> {
        if self.capacity - self.bf.len() >= required {
            return Ok(());
        }
        self.grow(required)
    }

    #[cold]
    fn grow(&mut self, required: usize) -> Result<(), Error> {
        // A sink takes the pending bytes unless a mark still needs them.
        if self.sink.is_some() && self.marks.is_empty() && !self.bf.is_empty() {
            self.flush_buffer()?;
            if self.capacity >= required {
                return Ok(());
            }
        }
        let position = self.bf.len();
        let needed = position
            .checked_add(required)
            .ok_or_else(|| Error::buffer_overflow(position, required, usize::MAX))?;
        if let Some(max) = self.max_capacity {
            if needed > max {
                return Err(Error::buffer_overflow(position, required, max));
            }
        }
        let mut new_capacity = needed.max(self.capacity.saturating_mul(2));
        if let Some(max) = self.max_capacity {
            new_capacity = new_capacity.min(max);
        }
        self.bf.reserve(new_capacity - position);
        self.capacity = new_capacity;
        Ok(())
    }

    /// Appends raw bytes. Sink-backed writers stream large slices through the
    /// staging buffer instead of growing it.
    pub fn write_bytes(&mut self, v: &[u8]) -> Result<usize, Error> {
        if self.sink.is_some() && self.marks.is_empty() {
            let mut rest = v;
            while !rest.is_empty() {
                let room = self.capacity - self.bf.len();
                if room == 0 {
                    self.flush_buffer()?;
                    continue;
                }
                let n = room.min(rest.len());
                self.bf.extend_from_slice(&rest[..n]);
                rest = &rest[n..];
            }
        } else {
            self.require(v.len())?;
            self.bf.extend_from_slice(v);
        }
        Ok(v.len())
    }

    /// Writes `len` zero bytes.
    pub fn skip(&mut self, len: usize) -> Result<(), Error> {
        self.require(len)?;
        self.bf.resize(self.bf.len() + len, 0);
        Ok(())
    }

    /// Overwrites already written bytes of the current segment.
    pub fn set_bytes(&mut self, offset: usize, data: &[u8]) -> Result<(), Error> {
        let len = self.bf.len();
        let target = self
            .bf
            .get_mut(offset..offset + data.len())
            .ok_or_else(|| Error::buffer_underflow(offset, data.len(), len.saturating_sub(offset)))?;
        target.copy_from_slice(data);
        Ok(())
    }

    #[inline(always)]
    pub fn write_u8(&mut self, value: u8) -> Result<(), Error> {
        self.require(1)?;
        self.bf.push(value);
        Ok(())
    }

    #[inline(always)]
    pub fn write_i8(&mut self, value: i8) -> Result<(), Error> {
        self.write_u8(value as u8)
    }

    #[inline(always)]
    pub fn write_bool(&mut self, value: bool) -> Result<(), Error> {
        self.write_u8(value as u8)
    }

    write_fixed! {
        write_u16(u16) => write_u16;
        write_i16(i16) => write_i16;
        write_u32(u32) => write_u32;
        write_i32(i32) => write_i32;
        write_u64(u64) => write_u64;
        write_i64(i64) => write_i64;
        write_f32(f32) => write_f32;
        write_f64(f64) => write_f64;
    }

    #[inline(always)]
    pub fn write_var_u32(&mut self, value: u32) -> Result<usize, Error> {
        let mut out = [0u8; MAX_VAR_INT_SIZE];
        let size = codec::encode_var_u32(value, &mut out);
        self.require(size)?;
        self.bf.extend_from_slice(&out[..size]);
        Ok(size)
    }

    /// Writes a 1-5 byte varint and returns its length.
    #[inline(always)]
    pub fn write_var_i32(&mut self, value: i32, optimize_positive: bool) -> Result<usize, Error> {
        self.write_var_u32(codec::encode_i32(value, optimize_positive))
    }

    #[inline(always)]
    pub fn write_var_u64(&mut self, value: u64) -> Result<usize, Error> {
        let mut out = [0u8; MAX_VAR_LONG_SIZE];
        let size = codec::encode_var_u64(value, &mut out);
        self.require(size)?;
        self.bf.extend_from_slice(&out[..size]);
        Ok(size)
    }

    /// Writes a 1-9 byte varint and returns its length.
    #[inline(always)]
    pub fn write_var_i64(&mut self, value: i64, optimize_positive: bool) -> Result<usize, Error> {
        self.write_var_u64(codec::encode_i64(value, optimize_positive))
    }

    pub fn write_char(&mut self, value: char) -> Result<usize, Error> {
        self.write_var_u32(value as u32)
    }

    /// Writes `value * precision` as a varint when that is lossless, otherwise a
    /// fallback flag followed by the 4 IEEE-754 bytes. Returns the byte count.
    pub fn write_var_f32(
        &mut self,
        value: f32,
        precision: f32,
        optimize_positive: bool,
    ) -> Result<usize, Error> {
        match codec::f32_to_fixed(value, precision) {
            Some(fixed) => {
                self.write_var_u64((codec::encode_i32(fixed, optimize_positive) as u64) << 1)
            }
            None => {
                self.require(5)?;
                self.bf.push(1);
                self.bf.write_f32::<LittleEndian>(value)?;
                Ok(5)
            }
        }
    }

    /// 64-bit counterpart of [`Writer::write_var_f32`].
    pub fn write_var_f64(
        &mut self,
        value: f64,
        precision: f64,
        optimize_positive: bool,
    ) -> Result<usize, Error> {
        let mapped = codec::f64_to_fixed(value, precision)
            .map(|fixed| codec::encode_i64(fixed, optimize_positive))
            .filter(|mapped| mapped >> 63 == 0);
        match mapped {
            Some(mapped) => self.write_var_u64(mapped << 1),
            None => {
                self.require(9)?;
                self.bf.push(1);
                self.bf.write_f64::<LittleEndian>(value)?;
                Ok(9)
            }
        }
    }

    /// Writes a nullable string: `varint(char_count + 1)` then every UTF-16 unit
    /// as 1, 2 or 3 bytes. `None` is the single byte `0`.
    pub fn write_string(&mut self, value: Option<&str>) -> Result<usize, Error> {
        let Some(s) = value else {
            return self.write_var_u32(NULL_STRING_LENGTH);
        };
        if s.is_ascii() {
            let prefix = self.write_var_u32(Self::string_length_prefix(s.len())?)?;
            self.write_bytes(s.as_bytes())?;
            return Ok(prefix + s.len());
        }
        let units = s.encode_utf16().count();
        let mut written = self.write_var_u32(Self::string_length_prefix(units)?)?;
        for unit in s.encode_utf16() {
            written += self.write_utf16_unit(unit)?;
        }
        Ok(written)
    }

    pub fn write_str(&mut self, value: &str) -> Result<usize, Error> {
        self.write_string(Some(value))
    }

    fn string_length_prefix(units: usize) -> Result<u32, Error> {
        u32::try_from(units)
            .ok()
            .and_then(|n| n.checked_add(1))
            .ok_or_else(|| Error::unsupported(format!("string of {units} chars is too long")))
    }

    #[inline(always)]
    fn write_utf16_unit(&mut self, unit: u16) -> Result<usize, Error> {
        let u = unit as u32;
        let size = codec::utf16_unit_size(unit);
        self.require(size)?;
        match size {
            1 => self.bf.push(u as u8),
            2 => {
                self.bf.push((0xC0 | ((u >> 6) & 0x1F)) as u8);
                self.bf.push((0x80 | (u & 0x3F)) as u8);
            }
            _ => {
                self.bf.push((0xE0 | ((u >> 12) & 0x0F)) as u8);
                self.bf.push((0x80 | ((u >> 6) & 0x3F)) as u8);
                self.bf.push((0x80 | (u & 0x3F)) as u8);
            }
        }
        Ok(size)
    }

    /// Saves the current position on the mark stack.
    pub fn mark(&mut self) -> Mark {
        let mark = Mark {
            segment: self.segment,
            offset: self.bf.len(),
        };
        self.marks.push(mark);
        mark
    }

    /// Pops the newest mark and discards everything written after it.
    pub fn position_to_mark(&mut self) -> Result<Mark, Error> {
        let mark = self
            .marks
            .pop()
            .ok_or_else(|| Error::mark_misuse("position_to_mark without an outstanding mark"))?;
        if mark.segment != self.segment {
            return Err(Error::mark_misuse(format!(
                "mark of segment {} restored in segment {}",
                mark.segment, self.segment
            )));
        }
        self.bf.truncate(mark.offset);
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

    /// Writes a 4-byte length placeholder to be patched by [`Writer::end_length_prefix`].
    ///
    /// The placeholder holds a mark, so the writer keeps it buffered (growing if
    /// needed) until the prefix is closed.
    pub fn begin_length_prefix(&mut self) -> Result<Mark, Error> {
        self.require(LENGTH_PREFIX_SIZE)?;
        let mark = self.mark();
        self.bf.extend_from_slice(&[0; LENGTH_PREFIX_SIZE]);
        Ok(mark)
    }

    /// Patches the placeholder opened by `prefix` with the number of bytes written
    /// since, and returns that number.
    pub fn end_length_prefix(&mut self, prefix: Mark) -> Result<usize, Error> {
        if self.marks.last() != Some(&prefix) {
            return Err(Error::mark_misuse("length prefix closed out of order"));
        }
        self.marks.pop();
        if prefix.segment != self.segment {
            return Err(Error::unsupported(
                "length prefix was flushed before it could be patched",
            ));
        }
        let start = prefix.offset + LENGTH_PREFIX_SIZE;
        let len = self.bf.len() - start;
        let len32 = u32::try_from(len)
            .map_err(|_| Error::unsupported(format!("block of {len} bytes exceeds a u32 prefix")))?;
        LittleEndian::write_u32(&mut self.bf[prefix.offset..start], len32);
        Ok(len)
    }

    /// Pushes buffered bytes to the sink. A no-op without a sink or without
    /// pending bytes; fails while marks are outstanding.
    pub fn flush(&mut self) -> Result<(), Error> {
        if !self.marks.is_empty() {
            return Err(Error::mark_misuse(format!(
                "flush with {} outstanding mark(s)",
                self.marks.len()
            )));
        }
        self.flush_buffer()?;
        if let Some(sink) = self.sink.as_mut() {
            sink.flush()?;
        }
        Ok(())
    }

    fn flush_buffer(&mut self) -> Result<(), Error> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };
        if self.bf.is_empty() {
            return Ok(());
        }
        if self.chunked {
            let mut header = [0u8; MAX_VAR_INT_SIZE];
            let len = u32::try_from(self.bf.len())
                .map_err(|_| Error::unsupported("chunk exceeds u32::MAX bytes"))?;
            let size = codec::encode_var_u32(len, &mut header);
            sink.write_all(&header[..size])?;
            self.chunk_open = true;
        }
        sink.write_all(&self.bf)?;
        log::trace!("flushed {} byte(s) to sink", self.bf.len());
        self.flushed += self.bf.len() as u64;
        self.bf.clear();
        self.segment += 1;
        Ok(())
    }

    /// Flushes and writes the `0` chunk terminator.
    pub fn end_chunks(&mut self) -> Result<(), Error> {
        if !self.chunked {
            return Err(Error::unsupported("end_chunks on a writer without chunked framing"));
        }
        self.flush()?;
        if let Some(sink) = self.sink.as_mut() {
            sink.write_all(&[0])?;
            sink.flush()?;
        }
        self.chunk_open = false;
        Ok(())
    }

    /// Flushes, terminates an open chunk set, and marks the writer closed.
    /// Calling it again does nothing.
    pub fn close(&mut self) -> Result<(), Error> {
        if self.closed {
            return Ok(());
        }
        self.flush()?;
        if self.chunked && self.chunk_open {
            self.end_chunks()?;
        }
        self.closed = true;
        Ok(())
    }

    /// Detaches the sink, leaving an in-memory writer behind.
    pub fn take_sink(&mut self) -> Option<Box<dyn Write + Send>> {
        self.chunked = false;
        self.sink.take()
    }
}
