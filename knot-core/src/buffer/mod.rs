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

//! Byte buffers and the bit-exact encodings written into them.
//!
//! [`Writer`] and [`Reader`] are the only places that touch raw bytes. Both are
//! bounds-checked: a write past the capacity bound is a
//! [`BufferOverflow`](crate::error::Error::BufferOverflow), a read past the
//! limit is a [`BufferUnderflow`](crate::error::Error::BufferUnderflow).
//!
//! Either side can be backed by a stream. A sink-backed writer flushes when its
//! buffer fills up, a source-backed reader refills when it runs dry, and both
//! support the chunked framing `(length, bytes)* 0` for content whose size is
//! not known up front.

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;

/// Saved position returned by `mark()`.
///
/// `segment` counts how many times the buffer discarded bytes it had already
/// flushed or consumed; `offset` is relative to the current segment. A mark taken
/// before a discard can no longer be restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    pub segment: usize,
    pub offset: usize,
}

/// Default size of the staging buffer of stream-backed readers and writers.
pub const DEFAULT_STREAM_BUFFER_SIZE: usize = 4096;
/// Smallest staging buffer; every fixed-width value and varint fits in it.
pub const MIN_STREAM_BUFFER_SIZE: usize = 16;
/// Width of the placeholder written by `Writer::begin_length_prefix`.
pub const LENGTH_PREFIX_SIZE: usize = 4;
